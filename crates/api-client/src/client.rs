use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shoplist_core::{ChangeEvent, ListItem, ShoppingList, Table};

use crate::error::{ApiError, ApiResult};
use crate::feed::ChangeScope;
use crate::retry::{RetryConfig, retry_request};
use crate::session::User;

/// Typed HTTP client for the shoplist backend.
///
/// One instance is shared (via `Arc`) by the session, store, and feed
/// wrappers; the bearer token set after sign-in is visible to all of them.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    auth_token: RwLock<Option<String>>,
    retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub user: User,
}

/// One page of the backend change log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePullResponse {
    pub events: Vec<ChangeEvent>,
    pub next_cursor: u64,
}

impl ApiClient {
    /// Create a new client with the given base URL and per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token: RwLock::new(None),
            retry: RetryConfig::default(),
        })
    }

    pub fn set_auth(&self, token: String) {
        *self.auth_token.write().expect("auth token lock poisoned") = Some(token);
    }

    pub fn clear_auth(&self) {
        *self.auth_token.write().expect("auth token lock poisoned") = None;
    }

    pub fn auth_token(&self) -> Option<String> {
        self.auth_token
            .read()
            .expect("auth token lock poisoned")
            .clone()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn token_or_bail(&self) -> ApiResult<String> {
        self.auth_token().ok_or(ApiError::MissingToken)
    }

    // ── Auth ──────────────────────────────────────────────────────────────

    pub async fn login(&self, req: &LoginRequest) -> ApiResult<LoginResponse> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(req)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn me(&self) -> ApiResult<User> {
        let token = self.token_or_bail()?;
        let resp = self
            .client
            .get(self.url("/auth/me"))
            .bearer_auth(token)
            .send()
            .await?;
        parse_response(resp).await
    }

    pub async fn logout(&self) -> ApiResult<()> {
        let token = self.token_or_bail()?;
        let resp = self
            .client
            .post(self.url("/auth/logout"))
            .bearer_auth(token)
            .send()
            .await?;
        expect_ok(resp).await
    }

    // ── Rows ──────────────────────────────────────────────────────────────

    pub async fn select_lists(&self, owner: Uuid) -> ApiResult<Vec<ShoppingList>> {
        self.select_rows(Table::Lists, &format!("owner=eq.{owner}"))
            .await
    }

    pub async fn select_items(&self, list_id: Uuid) -> ApiResult<Vec<ListItem>> {
        self.select_rows(Table::Items, &format!("list_id=eq.{list_id}"))
            .await
    }

    async fn select_rows<R: serde::de::DeserializeOwned>(
        &self,
        table: Table,
        filter: &str,
    ) -> ApiResult<Vec<R>> {
        let token = self.token_or_bail()?;
        let url = format!(
            "{}?{}&order=created_at.desc",
            self.url(&format!("/rest/{table}")),
            filter,
        );
        let resp = self.client.get(url).bearer_auth(token).send().await?;
        parse_response(resp).await
    }

    /// Insert a fully-formed row (ids are generated client-side so the
    /// echoed change event dedups against the optimistic insert).
    pub async fn insert_row<R: Serialize>(&self, table: Table, row: &R) -> ApiResult<()> {
        let token = self.token_or_bail()?;
        let url = self.url(&format!("/rest/{table}"));
        let body = serde_json::to_value(row)?;
        let resp = retry_request(&self.retry, || {
            self.client
                .post(&url)
                .bearer_auth(&token)
                .json(&body)
                .send()
        })
        .await?;
        expect_ok(resp).await
    }

    pub async fn update_row(
        &self,
        table: Table,
        id: Uuid,
        patch: &serde_json::Value,
    ) -> ApiResult<()> {
        let token = self.token_or_bail()?;
        let url = self.url(&format!("/rest/{table}/{id}"));
        let resp = retry_request(&self.retry, || {
            self.client
                .patch(&url)
                .bearer_auth(&token)
                .json(patch)
                .send()
        })
        .await?;
        expect_ok(resp).await
    }

    pub async fn delete_row(&self, table: Table, id: Uuid) -> ApiResult<()> {
        let token = self.token_or_bail()?;
        let url = self.url(&format!("/rest/{table}/{id}"));
        let resp = retry_request(&self.retry, || {
            self.client.delete(&url).bearer_auth(&token).send()
        })
        .await?;
        expect_ok(resp).await
    }

    // ── Change log ────────────────────────────────────────────────────────

    /// Pull change events after `cursor` for the given scope. A `None`
    /// cursor returns no events, just the current head of the log.
    pub async fn pull_changes(
        &self,
        scope: ChangeScope,
        cursor: Option<u64>,
        limit: u32,
    ) -> ApiResult<ChangePullResponse> {
        let token = self.token_or_bail()?;
        let mut query = vec![
            ("scope".to_string(), scope.to_query()),
            ("limit".to_string(), limit.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor".to_string(), cursor.to_string()));
        }
        let resp = self
            .client
            .get(self.url("/changes"))
            .bearer_auth(token)
            .query(&query)
            .send()
            .await?;
        parse_response(resp).await
    }
}

/// Parse an HTTP response: deserialize the body on 2xx, otherwise surface
/// the status and the backend's `{message}` body.
async fn parse_response<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> ApiResult<T> {
    let status = resp.status();
    if !status.is_success() {
        return Err(error_from(status, resp).await);
    }
    Ok(resp.json().await?)
}

async fn expect_ok(resp: reqwest::Response) -> ApiResult<()> {
    let status = resp.status();
    if !status.is_success() {
        return Err(error_from(status, resp).await);
    }
    Ok(())
}

async fn error_from(status: reqwest::StatusCode, resp: reqwest::Response) -> ApiError {
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(body);
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}
