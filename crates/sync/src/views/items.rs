use tracing::{debug, warn};
use uuid::Uuid;

use shoplist_api_client::{
    AuthEvent, ChangeFeed, ChangeScope, DataStore, SessionProvider, User,
};
use shoplist_core::{
    ChangeEvent, ChangeKind, ListItem, ShoppingList, SyncError, SyncResult, Table,
};

use crate::collection::Applied;
use crate::reconciler::{Reconciler, fetch_error};
use crate::subscription::SubscriptionSlot;
use crate::views::confirm_user;

/// What one feed event meant to an items view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemsOutcome {
    Items(Applied),
    /// The viewed list itself changed (rename).
    ListChanged,
    /// The viewed list was deleted remotely. The view has torn itself
    /// down; presentation navigates back to the list of lists.
    ListGone,
    Ignored,
}

impl ItemsOutcome {
    pub fn changed(&self) -> bool {
        match self {
            Self::Items(applied) => applied.changed(),
            Self::ListChanged | Self::ListGone => true,
            Self::Ignored => false,
        }
    }
}

/// Live view over the items of one list.
pub struct ItemsView<S, F> {
    user: User,
    list: ShoppingList,
    store: S,
    feed: F,
    reconciler: Reconciler<ListItem>,
    subscription: SubscriptionSlot,
}

impl<S: DataStore, F: ChangeFeed> ItemsView<S, F> {
    pub async fn open<P: SessionProvider>(
        session: &P,
        store: S,
        feed: F,
        list: ShoppingList,
    ) -> SyncResult<Self> {
        let user = confirm_user(session).await?;
        let mut view = Self {
            user,
            list,
            store,
            feed,
            reconciler: Reconciler::new(),
            subscription: SubscriptionSlot::new(),
        };
        view.reload().await?;
        view.subscribe().await;
        Ok(view)
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn list(&self) -> &ShoppingList {
        &self.list
    }

    pub fn items(&self) -> &[ListItem] {
        self.reconciler.records()
    }

    pub fn get(&self, id: Uuid) -> Option<&ListItem> {
        self.reconciler.get(id)
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_subscribed()
    }

    pub async fn reload(&mut self) -> SyncResult<()> {
        let items = self
            .store
            .fetch_items(self.list.id)
            .await
            .map_err(fetch_error)?;
        self.reconciler.seed(items);
        Ok(())
    }

    pub async fn subscribe(&mut self) {
        if !self.reconciler.is_active() || !self.subscription.begin() {
            return;
        }
        match self.feed.subscribe(ChangeScope::List(self.list.id)).await {
            Ok(handle) => self.subscription.established(handle),
            Err(e) => {
                self.subscription.failed();
                warn!("{}", SyncError::SubscriptionUnavailable(e.to_string()));
            }
        }
    }

    pub async fn next_change(&mut self) -> Option<ChangeEvent> {
        let Some(sub) = self.subscription.active_mut() else {
            return std::future::pending().await;
        };
        let event = sub.recv().await;
        if event.is_none() {
            debug!("items feed ended, dropping to manual reload");
            self.subscription.release();
        }
        event
    }

    /// Merge one feed event. Item changes reconcile into the collection;
    /// changes to the viewed list itself rename it or end the view.
    pub fn apply_change(&mut self, event: &ChangeEvent) -> ItemsOutcome {
        if !self.reconciler.is_active() {
            return ItemsOutcome::Ignored;
        }
        match event.table {
            Table::Items => self.apply_item_change(event),
            Table::Lists => self.apply_list_change(event),
        }
    }

    fn apply_item_change(&mut self, event: &ChangeEvent) -> ItemsOutcome {
        let change = match event.decode::<ListItem>() {
            Ok(change) => change,
            Err(e) => {
                warn!("dropping undecodable items change: {e}");
                return ItemsOutcome::Ignored;
            }
        };
        // Scope filtering is the backend's job; re-check so a stray event
        // for another list can never land here.
        let belongs = match change.kind {
            ChangeKind::Delete => change.old.as_ref(),
            _ => change.new.as_ref(),
        }
        .is_some_and(|row| row.list_id == self.list.id);
        if !belongs {
            return ItemsOutcome::Ignored;
        }
        ItemsOutcome::Items(self.reconciler.apply(&change))
    }

    fn apply_list_change(&mut self, event: &ChangeEvent) -> ItemsOutcome {
        let change = match event.decode::<ShoppingList>() {
            Ok(change) => change,
            Err(e) => {
                warn!("dropping undecodable lists change: {e}");
                return ItemsOutcome::Ignored;
            }
        };
        match change.kind {
            ChangeKind::Delete if change.target_id() == Some(self.list.id) => {
                self.dispose();
                ItemsOutcome::ListGone
            }
            ChangeKind::Update | ChangeKind::Insert => match change.new {
                Some(new) if new.id == self.list.id => {
                    self.list = new;
                    ItemsOutcome::ListChanged
                }
                _ => ItemsOutcome::Ignored,
            },
            _ => ItemsOutcome::Ignored,
        }
    }

    /// Add an item, visible immediately; rolled back if the store call
    /// fails. The echoed INSERT event dedups by id.
    pub async fn add(&mut self, name: &str) -> SyncResult<ListItem> {
        let item = ListItem::new(self.list.id, name);
        let added = item.clone();
        self.reconciler
            .mutate(
                |c| {
                    c.insert_front(item);
                },
                self.store.insert_item(&added),
            )
            .await?;
        Ok(added)
    }

    /// Flip `is_checked`, optimistically. Returns the new state.
    pub async fn toggle(&mut self, id: Uuid) -> SyncResult<bool> {
        let Some(current) = self.reconciler.get(id) else {
            return Err(SyncError::Mutation(format!("unknown item {id}")));
        };
        let mut toggled = current.clone();
        toggled.is_checked = !toggled.is_checked;
        toggled.updated_at = chrono::Utc::now();
        let checked = toggled.is_checked;
        self.reconciler
            .mutate(
                |c| {
                    c.update(toggled);
                },
                self.store.set_item_checked(id, checked),
            )
            .await?;
        Ok(checked)
    }

    pub async fn remove(&mut self, id: Uuid) -> SyncResult<()> {
        self.reconciler
            .mutate(
                |c| {
                    c.remove(id);
                },
                self.store.delete_item(id),
            )
            .await
    }

    pub fn handle_auth_event(&mut self, event: &AuthEvent) -> bool {
        match event {
            AuthEvent::SignedOut => self.dispose(),
            AuthEvent::SignedIn(_) => false,
        }
    }

    pub fn dispose(&mut self) -> bool {
        let first = self.reconciler.dispose();
        if first {
            self.subscription.release();
        }
        first
    }
}
