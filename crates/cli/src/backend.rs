use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use uuid::Uuid;

use shoplist_api_client::{ApiClient, HttpSession, HttpStore, PollingFeed};
use shoplist_core::config::ClientConfig;

/// Everything a command needs to talk to the backend, built once from the
/// persisted configuration.
pub struct Backend {
    pub session: HttpSession,
    pub store: HttpStore,
    pub feed: PollingFeed,
}

pub fn build(cfg: &ClientConfig) -> Result<Backend> {
    let api = Arc::new(ApiClient::new(
        &cfg.server.url,
        Duration::from_secs(cfg.server.request_timeout_secs),
    )?);
    if cfg.session.is_signed_in() {
        api.set_auth(cfg.session.access_token.clone());
    }
    Ok(Backend {
        session: HttpSession::new(Arc::clone(&api)),
        store: HttpStore::new(Arc::clone(&api)),
        feed: PollingFeed::new(api, cfg.feed.clone()),
    })
}

/// The signed-in owner id, or a hint to run `shoplist login`.
pub fn owner_id(cfg: &ClientConfig) -> Result<Uuid> {
    match cfg.session.user_id {
        Some(id) if cfg.session.is_signed_in() => Ok(id),
        _ => bail!("not signed in; run `shoplist login` first"),
    }
}
