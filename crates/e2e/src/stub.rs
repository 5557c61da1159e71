//! In-process stub of the shoplist backend: auth, row CRUD, and a
//! monotonically increasing change log served over real HTTP.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use shoplist_core::{ChangeEvent, ChangeKind, ListItem, Record, ShoppingList, Table};

/// Shared stub state. Clone freely; tests keep one handle to seed users
/// and inspect rows while the server serves requests.
#[derive(Clone, Default)]
pub struct StubBackend {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    users: Vec<StubUser>,
    tokens: HashMap<String, Uuid>,
    lists: Vec<ShoppingList>,
    items: Vec<ListItem>,
    log: Vec<ChangeEvent>,
}

struct StubUser {
    id: Uuid,
    email: String,
    password: String,
}

impl StubBackend {
    pub fn add_user(&self, email: &str, password: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.lock().users.push(StubUser {
            id,
            email: email.to_string(),
            password: password.to_string(),
        });
        id
    }

    pub fn lists(&self) -> Vec<ShoppingList> {
        self.lock().lists.clone()
    }

    pub fn items(&self) -> Vec<ListItem> {
        self.lock().items.clone()
    }

    pub fn change_log_len(&self) -> usize {
        self.lock().log.len()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("stub state mutex poisoned")
    }
}

impl Inner {
    fn record_change<R: Record>(&mut self, kind: ChangeKind, new: Option<&R>, old: Option<&R>) {
        let seq = self.log.len() as u64 + 1;
        self.log.push(ChangeEvent {
            kind,
            table: R::TABLE,
            new: new.map(|r| serde_json::to_value(r).expect("record serializes")),
            old: old.map(|r| serde_json::to_value(r).expect("record serializes")),
            seq,
        });
    }

    fn authed_user(&self, headers: &HeaderMap) -> Result<Uuid, ApiErr> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiErr::unauthorized("missing bearer token"))?;
        self.tokens
            .get(token)
            .copied()
            .ok_or_else(|| ApiErr::unauthorized("invalid token"))
    }
}

/// Build the stub router.
pub fn router(state: StubBackend) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/rest/lists", get(select_lists).post(insert_list))
        .route(
            "/api/rest/lists/{id}",
            axum::routing::patch(patch_list).delete(delete_list),
        )
        .route("/api/rest/items", get(select_items).post(insert_item))
        .route(
            "/api/rest/items/{id}",
            axum::routing::patch(patch_item).delete(delete_item),
        )
        .route("/api/changes", get(pull_changes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind an ephemeral port and serve the stub in a background task.
/// Returns the base URL clients should point at.
pub async fn spawn() -> anyhow::Result<(String, StubBackend)> {
    let state = StubBackend::default();
    let app = router(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("stub server stopped: {e}");
        }
    });
    Ok((base_url, state))
}

// ── Errors ──────────────────────────────────────────────────────────────

/// `{"message": "..."}` error responses, the shape the client parses.
struct ApiErr {
    status: StatusCode,
    message: String,
}

impl ApiErr {
    fn unauthorized(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.into(),
        }
    }

    fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    fn conflict(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.into(),
        }
    }
}

impl IntoResponse for ApiErr {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "message": self.message }))).into_response()
    }
}

// ── Auth routes ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

async fn login(
    State(state): State<StubBackend>,
    Json(body): Json<LoginBody>,
) -> Result<Json<Value>, ApiErr> {
    let mut inner = state.lock();
    let user = inner
        .users
        .iter()
        .find(|u| u.email == body.email && u.password == body.password)
        .ok_or_else(|| ApiErr::unauthorized("invalid email or password"))?;
    let (id, email) = (user.id, user.email.clone());

    let token = Uuid::new_v4().simple().to_string();
    inner.tokens.insert(token.clone(), id);

    Ok(Json(json!({
        "access_token": token,
        "user": { "id": id, "email": email },
    })))
}

async fn me(State(state): State<StubBackend>, headers: HeaderMap) -> Result<Json<Value>, ApiErr> {
    let inner = state.lock();
    let user_id = inner.authed_user(&headers)?;
    let user = inner
        .users
        .iter()
        .find(|u| u.id == user_id)
        .ok_or_else(|| ApiErr::unauthorized("unknown user"))?;
    Ok(Json(json!({ "id": user.id, "email": user.email })))
}

async fn logout(
    State(state): State<StubBackend>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiErr> {
    let mut inner = state.lock();
    inner.authed_user(&headers)?;
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();
    inner.tokens.remove(&token);
    Ok(StatusCode::NO_CONTENT)
}

// ── List routes ─────────────────────────────────────────────────────────

fn eq_filter(params: &HashMap<String, String>, key: &str) -> Option<Uuid> {
    params
        .get(key)
        .and_then(|v| v.strip_prefix("eq."))
        .and_then(|v| Uuid::parse_str(v).ok())
}

async fn select_lists(
    State(state): State<StubBackend>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ShoppingList>>, ApiErr> {
    let inner = state.lock();
    inner.authed_user(&headers)?;
    let owner =
        eq_filter(&params, "owner").ok_or_else(|| ApiErr::bad_request("owner filter required"))?;

    let mut lists: Vec<_> = inner
        .lists
        .iter()
        .filter(|l| l.owner == owner)
        .cloned()
        .collect();
    lists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(lists))
}

async fn insert_list(
    State(state): State<StubBackend>,
    headers: HeaderMap,
    Json(list): Json<ShoppingList>,
) -> Result<(StatusCode, Json<ShoppingList>), ApiErr> {
    let mut inner = state.lock();
    inner.authed_user(&headers)?;
    if inner.lists.iter().any(|l| l.id == list.id) {
        return Err(ApiErr::conflict("list id already exists"));
    }
    inner.record_change(ChangeKind::Insert, Some(&list), None);
    inner.lists.push(list.clone());
    Ok((StatusCode::CREATED, Json(list)))
}

async fn patch_list(
    State(state): State<StubBackend>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(patch): Json<Value>,
) -> Result<StatusCode, ApiErr> {
    let mut inner = state.lock();
    inner.authed_user(&headers)?;
    let Some(pos) = inner.lists.iter().position(|l| l.id == id) else {
        return Err(ApiErr::not_found("no such list"));
    };

    let mut updated = inner.lists[pos].clone();
    if let Some(name) = patch.get("name").and_then(|v| v.as_str()) {
        updated.name = name.to_string();
    }
    updated.updated_at = chrono::Utc::now();

    inner.record_change(ChangeKind::Update, Some(&updated), None);
    inner.lists[pos] = updated;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_list(
    State(state): State<StubBackend>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiErr> {
    let mut inner = state.lock();
    inner.authed_user(&headers)?;
    let Some(pos) = inner.lists.iter().position(|l| l.id == id) else {
        return Err(ApiErr::not_found("no such list"));
    };

    // Cascade: the items go first, each with its own delete event.
    let orphaned: Vec<_> = inner.items.iter().filter(|i| i.list_id == id).cloned().collect();
    for item in &orphaned {
        inner.record_change(ChangeKind::Delete, None, Some(item));
    }
    inner.items.retain(|i| i.list_id != id);

    let removed = inner.lists.remove(pos);
    inner.record_change(ChangeKind::Delete, None, Some(&removed));
    Ok(StatusCode::NO_CONTENT)
}

// ── Item routes ─────────────────────────────────────────────────────────

async fn select_items(
    State(state): State<StubBackend>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ListItem>>, ApiErr> {
    let inner = state.lock();
    inner.authed_user(&headers)?;
    let list_id = eq_filter(&params, "list_id")
        .ok_or_else(|| ApiErr::bad_request("list_id filter required"))?;

    let mut items: Vec<_> = inner
        .items
        .iter()
        .filter(|i| i.list_id == list_id)
        .cloned()
        .collect();
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(Json(items))
}

async fn insert_item(
    State(state): State<StubBackend>,
    headers: HeaderMap,
    Json(item): Json<ListItem>,
) -> Result<(StatusCode, Json<ListItem>), ApiErr> {
    let mut inner = state.lock();
    inner.authed_user(&headers)?;
    if !inner.lists.iter().any(|l| l.id == item.list_id) {
        return Err(ApiErr::bad_request("no such list"));
    }
    if inner.items.iter().any(|i| i.id == item.id) {
        return Err(ApiErr::conflict("item id already exists"));
    }
    inner.record_change(ChangeKind::Insert, Some(&item), None);
    inner.items.push(item.clone());
    Ok((StatusCode::CREATED, Json(item)))
}

async fn patch_item(
    State(state): State<StubBackend>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(patch): Json<Value>,
) -> Result<StatusCode, ApiErr> {
    let mut inner = state.lock();
    inner.authed_user(&headers)?;
    let Some(pos) = inner.items.iter().position(|i| i.id == id) else {
        return Err(ApiErr::not_found("no such item"));
    };

    let mut updated = inner.items[pos].clone();
    if let Some(name) = patch.get("name").and_then(|v| v.as_str()) {
        updated.name = name.to_string();
    }
    if let Some(checked) = patch.get("is_checked").and_then(|v| v.as_bool()) {
        updated.is_checked = checked;
    }
    updated.updated_at = chrono::Utc::now();

    inner.record_change(ChangeKind::Update, Some(&updated), None);
    inner.items[pos] = updated;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_item(
    State(state): State<StubBackend>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiErr> {
    let mut inner = state.lock();
    inner.authed_user(&headers)?;
    let Some(pos) = inner.items.iter().position(|i| i.id == id) else {
        return Err(ApiErr::not_found("no such item"));
    };
    let removed = inner.items.remove(pos);
    inner.record_change(ChangeKind::Delete, None, Some(&removed));
    Ok(StatusCode::NO_CONTENT)
}

// ── Change log ──────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct ChangesQuery {
    scope: String,
    cursor: Option<u64>,
    limit: Option<u32>,
}

enum Scope {
    Owner(Uuid),
    List(Uuid),
}

fn parse_scope(s: &str) -> Option<Scope> {
    let (kind, id) = s.split_once(':')?;
    let id = Uuid::parse_str(id).ok()?;
    match kind {
        "owner" => Some(Scope::Owner(id)),
        "list" => Some(Scope::List(id)),
        _ => None,
    }
}

fn row_field(event: &ChangeEvent, key: &str) -> Option<Uuid> {
    let row = event.new.as_ref().or(event.old.as_ref())?;
    row.get(key)
        .and_then(|v| v.as_str())
        .and_then(|v| Uuid::parse_str(v).ok())
}

fn matches_scope(event: &ChangeEvent, scope: &Scope) -> bool {
    match scope {
        Scope::Owner(owner) => {
            event.table == Table::Lists && row_field(event, "owner") == Some(*owner)
        }
        Scope::List(list_id) => match event.table {
            Table::Items => row_field(event, "list_id") == Some(*list_id),
            Table::Lists => row_field(event, "id") == Some(*list_id),
        },
    }
}

async fn pull_changes(
    State(state): State<StubBackend>,
    headers: HeaderMap,
    Query(query): Query<ChangesQuery>,
) -> Result<Json<Value>, ApiErr> {
    let inner = state.lock();
    inner.authed_user(&headers)?;

    let head = inner.log.len() as u64;
    let Some(cursor) = query.cursor else {
        // Cursorless pull anchors a fresh subscription at the head.
        return Ok(Json(json!({ "events": [], "next_cursor": head })));
    };

    let scope =
        parse_scope(&query.scope).ok_or_else(|| ApiErr::bad_request("malformed scope"))?;
    let limit = query.limit.unwrap_or(100).max(1) as usize;

    let events: Vec<_> = inner
        .log
        .iter()
        .filter(|e| e.seq > cursor && matches_scope(e, &scope))
        .take(limit)
        .cloned()
        .collect();

    // A full page may have been truncated by `limit`; resume right after
    // the last delivered event instead of skipping to the head.
    let next_cursor = if events.len() == limit {
        events.last().map(|e| e.seq).unwrap_or(head)
    } else {
        head
    };

    Ok(Json(json!({ "events": events, "next_cursor": next_cursor })))
}
