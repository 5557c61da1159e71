use anyhow::{Context, Result};

use shoplist_api_client::SessionProvider;

use crate::backend;
use crate::config;

pub async fn run_login(email: Option<String>) -> Result<()> {
    let mut cfg = config::load()?;
    let be = backend::build(&cfg)?;

    let email = match email {
        Some(email) => email,
        None => dialoguer::Input::new()
            .with_prompt("Email")
            .interact_text()
            .context("read email")?,
    };
    let password = dialoguer::Password::new()
        .with_prompt("Password")
        .interact()
        .context("read password")?;

    let resp = be
        .session
        .sign_in(&email, &password)
        .await
        .context("sign-in failed")?;

    cfg.session.access_token = resp.access_token;
    cfg.session.user_id = Some(resp.user.id);
    cfg.session.email = resp.user.email.clone();
    config::save(&cfg)?;

    println!("Signed in as {}", resp.user.email);
    Ok(())
}

pub async fn run_logout() -> Result<()> {
    let mut cfg = config::load()?;
    if !cfg.session.is_signed_in() {
        println!("Not signed in");
        return Ok(());
    }
    let be = backend::build(&cfg)?;
    be.session.sign_out().await;

    cfg.session.clear();
    config::save(&cfg)?;

    println!("Signed out");
    Ok(())
}

pub async fn run_whoami() -> Result<()> {
    let cfg = config::load()?;
    let be = backend::build(&cfg)?;

    match be.session.current_user().await? {
        Some(user) => println!("{} ({})", user.email, user.id),
        None => println!("Not signed in"),
    }
    Ok(())
}
