use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use shoplist_core::config::ClientConfig;

pub fn config_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("app", "shoplist", "shoplist")
        .context("could not determine the user config directory")?;
    Ok(dirs.config_dir().join("shoplist.toml"))
}

pub fn load() -> Result<ClientConfig> {
    load_from(&config_path()?)
}

pub fn load_from(path: &Path) -> Result<ClientConfig> {
    if !path.exists() {
        return Ok(ClientConfig::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

pub fn save(cfg: &ClientConfig) -> Result<()> {
    save_to(&config_path()?, cfg)
}

pub fn save_to(path: &Path, cfg: &ClientConfig) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let text = toml::to_string_pretty(cfg)?;
    std::fs::write(path, text).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn show_config() -> Result<()> {
    let cfg = load()?;
    println!("config file: {}", config_path()?.display());
    println!("server.url = {}", cfg.server.url);
    println!("feed.poll_interval_ms = {}", cfg.feed.poll_interval_ms);
    if cfg.session.is_signed_in() {
        println!("signed in as {}", cfg.session.email);
    } else {
        println!("not signed in");
    }
    Ok(())
}

pub fn set_config(server: Option<String>, poll_interval_ms: Option<u64>) -> Result<()> {
    let mut cfg = load()?;
    if let Some(server) = server {
        cfg.server.url = server.trim_end_matches('/').to_string();
        println!("server.url = {}", cfg.server.url);
    }
    if let Some(ms) = poll_interval_ms {
        cfg.feed.poll_interval_ms = ms;
        println!("feed.poll_interval_ms = {ms}");
    }
    save(&cfg)
}
