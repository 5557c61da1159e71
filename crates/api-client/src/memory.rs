//! In-memory implementations of the backend contracts, for tests.

use std::sync::{Arc, Mutex};

use tokio::sync::{broadcast, mpsc, watch};
use uuid::Uuid;

use shoplist_core::{ChangeEvent, ChangeKind, ListItem, Record, ShoppingList};

use crate::error::{ApiError, ApiResult};
use crate::feed::{ChangeFeed, ChangeScope, FeedSubscription};
use crate::session::{AuthEvent, SessionProvider, User};
use crate::store::DataStore;

// ── Session ─────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MemorySession {
    user: Arc<Mutex<Option<User>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl Default for MemorySession {
    fn default() -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            user: Arc::new(Mutex::new(None)),
            events,
        }
    }
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user: User) -> Self {
        let session = Self::new();
        *session.user.lock().unwrap() = Some(user);
        session
    }

    pub fn sign_in(&self, user: User) {
        *self.user.lock().unwrap() = Some(user.clone());
        let _ = self.events.send(AuthEvent::SignedIn(user));
    }

    pub fn sign_out(&self) {
        *self.user.lock().unwrap() = None;
        let _ = self.events.send(AuthEvent::SignedOut);
    }
}

impl SessionProvider for MemorySession {
    async fn current_user(&self) -> ApiResult<Option<User>> {
        Ok(self.user.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }
}

/// User fixture.
pub fn user(email: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: email.to_string(),
    }
}

// ── Store ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<StoreInner>>,
}

#[derive(Default)]
struct StoreInner {
    lists: Vec<ShoppingList>,
    items: Vec<ListItem>,
    fail_next: Option<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_lists(&self, lists: Vec<ShoppingList>) {
        self.inner.lock().unwrap().lists = lists;
    }

    pub fn seed_items(&self, items: Vec<ListItem>) {
        self.inner.lock().unwrap().items = items;
    }

    /// Make the next store call fail with an HTTP 500 carrying `message`.
    pub fn fail_next(&self, message: &str) {
        self.inner.lock().unwrap().fail_next = Some(message.to_string());
    }

    pub fn lists(&self) -> Vec<ShoppingList> {
        self.inner.lock().unwrap().lists.clone()
    }

    pub fn items(&self) -> Vec<ListItem> {
        self.inner.lock().unwrap().items.clone()
    }

    fn check_failure(inner: &mut StoreInner) -> ApiResult<()> {
        if let Some(message) = inner.fail_next.take() {
            return Err(ApiError::Status {
                status: 500,
                message,
            });
        }
        Ok(())
    }
}

impl DataStore for MemoryStore {
    async fn fetch_lists(&self, owner: Uuid) -> ApiResult<Vec<ShoppingList>> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;
        let mut lists: Vec<_> = inner
            .lists
            .iter()
            .filter(|l| l.owner == owner)
            .cloned()
            .collect();
        lists.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(lists)
    }

    async fn insert_list(&self, list: &ShoppingList) -> ApiResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;
        inner.lists.push(list.clone());
        Ok(())
    }

    async fn rename_list(&self, id: Uuid, name: &str) -> ApiResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;
        if let Some(list) = inner.lists.iter_mut().find(|l| l.id == id) {
            list.name = name.to_string();
        }
        Ok(())
    }

    async fn delete_list(&self, id: Uuid) -> ApiResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;
        inner.lists.retain(|l| l.id != id);
        inner.items.retain(|i| i.list_id != id);
        Ok(())
    }

    async fn fetch_items(&self, list_id: Uuid) -> ApiResult<Vec<ListItem>> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;
        let mut items: Vec<_> = inner
            .items
            .iter()
            .filter(|i| i.list_id == list_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    async fn insert_item(&self, item: &ListItem) -> ApiResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;
        inner.items.push(item.clone());
        Ok(())
    }

    async fn set_item_checked(&self, id: Uuid, is_checked: bool) -> ApiResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;
        if let Some(item) = inner.items.iter_mut().find(|i| i.id == id) {
            item.is_checked = is_checked;
        }
        Ok(())
    }

    async fn delete_item(&self, id: Uuid) -> ApiResult<()> {
        let mut inner = self.inner.lock().unwrap();
        Self::check_failure(&mut inner)?;
        inner.items.retain(|i| i.id != id);
        Ok(())
    }
}

// ── Feed ────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryFeed {
    inner: Arc<Mutex<FeedInner>>,
}

#[derive(Default)]
struct FeedInner {
    subscribers: Vec<Subscriber>,
    seq: u64,
    refuse: Option<String>,
}

struct Subscriber {
    tx: mpsc::UnboundedSender<ChangeEvent>,
    released: watch::Receiver<bool>,
}

impl Subscriber {
    fn is_live(&self) -> bool {
        !*self.released.borrow() && !self.tx.is_closed()
    }
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `subscribe` call fail until further notice.
    pub fn refuse(&self, message: &str) {
        self.inner.lock().unwrap().refuse = Some(message.to_string());
    }

    /// Open subscriptions that have not been released.
    pub fn active_subscriptions(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        inner.subscribers.retain(Subscriber::is_live);
        inner.subscribers.len()
    }

    pub fn push_insert<R: Record>(&self, row: &R) {
        self.push::<R>(ChangeKind::Insert, Some(row), None);
    }

    pub fn push_update<R: Record>(&self, row: &R) {
        self.push::<R>(ChangeKind::Update, Some(row), None);
    }

    pub fn push_delete<R: Record>(&self, row: &R) {
        self.push::<R>(ChangeKind::Delete, None, Some(row));
    }

    /// Deliver one event to every live subscriber. Scope filtering is the
    /// backend's job; the fakes deliver broadly and let the reconciler's
    /// own dispatch prove it ignores what it did not ask for.
    fn push<R: Record>(&self, kind: ChangeKind, new: Option<&R>, old: Option<&R>) {
        let mut inner = self.inner.lock().unwrap();
        inner.seq += 1;
        let event = ChangeEvent {
            kind,
            table: R::TABLE,
            new: new.map(|r| serde_json::to_value(r).expect("record serializes")),
            old: old.map(|r| serde_json::to_value(r).expect("record serializes")),
            seq: inner.seq,
        };
        inner.subscribers.retain(Subscriber::is_live);
        for sub in &inner.subscribers {
            let _ = sub.tx.send(event.clone());
        }
    }
}

impl ChangeFeed for MemoryFeed {
    async fn subscribe(&self, scope: ChangeScope) -> ApiResult<FeedSubscription> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.refuse.clone() {
            return Err(ApiError::Status {
                status: 503,
                message,
            });
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let (released_tx, released_rx) = watch::channel(false);
        inner.subscribers.push(Subscriber {
            tx,
            released: released_rx,
        });
        Ok(FeedSubscription::new(scope, rx, released_tx))
    }
}
