use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use crate::client::{ApiClient, LoginRequest, LoginResponse};
use crate::error::ApiResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(User),
    SignedOut,
}

/// Session Provider contract: who is signed in, and a stream of
/// sign-in/sign-out notifications. Dropping the receiver unsubscribes.
#[allow(async_fn_in_trait)]
pub trait SessionProvider {
    async fn current_user(&self) -> ApiResult<Option<User>>;

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;
}

/// Session provider backed by the backend auth endpoints.
#[derive(Clone)]
pub struct HttpSession {
    api: Arc<ApiClient>,
    events: broadcast::Sender<AuthEvent>,
}

impl HttpSession {
    pub fn new(api: Arc<ApiClient>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self { api, events }
    }

    /// Adopt a token persisted from an earlier sign-in. Whether it is still
    /// valid shows up on the next `current_user` call.
    pub fn restore(&self, token: String) {
        self.api.set_auth(token);
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        let resp = self
            .api
            .login(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        self.api.set_auth(resp.access_token.clone());
        info!("signed in as {}", resp.user.email);
        let _ = self.events.send(AuthEvent::SignedIn(resp.user.clone()));
        Ok(resp)
    }

    /// Sign out locally and best-effort revoke the token server-side.
    /// The local session ends even if the revocation call fails.
    pub async fn sign_out(&self) {
        if let Err(e) = self.api.logout().await {
            warn!("server-side logout failed: {e}");
        }
        self.api.clear_auth();
        let _ = self.events.send(AuthEvent::SignedOut);
    }
}

impl SessionProvider for HttpSession {
    async fn current_user(&self) -> ApiResult<Option<User>> {
        if self.api.auth_token().is_none() {
            return Ok(None);
        }
        match self.api.me().await {
            Ok(user) => Ok(Some(user)),
            Err(e) if e.is_auth() => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}
