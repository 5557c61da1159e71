//! Shared client configuration types.
//!
//! Both the CLI and any embedding application read/write `shoplist.toml`
//! using these types. Path resolution and persistence live with the
//! binaries; this module only defines the shape and the defaults.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Top-level client configuration (persisted as `shoplist.toml`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub feed: FeedSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_server_url")]
    pub url: String,
    /// Per-request timeout for store calls.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Persisted session state from the last successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionSettings {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub email: String,
}

impl SessionSettings {
    pub fn is_signed_in(&self) -> bool {
        !self.access_token.is_empty()
    }

    pub fn clear(&mut self) {
        self.access_token.clear();
        self.user_id = None;
        self.email.clear();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSettings {
    /// How often the change feed polls for new events.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How many events one poll may return.
    #[serde(default = "default_poll_limit")]
    pub poll_limit: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_limit: default_poll_limit(),
        }
    }
}

// ── Serde default functions ─────────────────────────────────────────────

fn default_server_url() -> String {
    "https://api.shoplist.app".to_string()
}
fn default_request_timeout() -> u64 {
    15
}
fn default_poll_interval_ms() -> u64 {
    1000
}
fn default_poll_limit() -> u32 {
    100
}
