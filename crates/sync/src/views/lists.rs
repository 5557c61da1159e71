use tracing::{debug, warn};
use uuid::Uuid;

use shoplist_api_client::{
    AuthEvent, ChangeFeed, ChangeScope, DataStore, SessionProvider, User,
};
use shoplist_core::{ChangeEvent, ShoppingList, SyncError, SyncResult, Table};

use crate::collection::Applied;
use crate::reconciler::{Reconciler, fetch_error};
use crate::subscription::SubscriptionSlot;
use crate::views::confirm_user;

/// Live view over every list the signed-in user owns.
pub struct ListsView<S, F> {
    owner: User,
    store: S,
    feed: F,
    reconciler: Reconciler<ShoppingList>,
    subscription: SubscriptionSlot,
}

impl<S: DataStore, F: ChangeFeed> ListsView<S, F> {
    /// Confirm the session, take the initial snapshot, and go live. A feed
    /// failure degrades to manual reload; a fetch failure is fatal to the
    /// view and retried by reopening it.
    pub async fn open<P: SessionProvider>(session: &P, store: S, feed: F) -> SyncResult<Self> {
        let owner = confirm_user(session).await?;
        let mut view = Self {
            owner,
            store,
            feed,
            reconciler: Reconciler::new(),
            subscription: SubscriptionSlot::new(),
        };
        view.reload().await?;
        view.subscribe().await;
        Ok(view)
    }

    pub fn owner(&self) -> &User {
        &self.owner
    }

    pub fn lists(&self) -> &[ShoppingList] {
        self.reconciler.records()
    }

    pub fn get(&self, id: Uuid) -> Option<&ShoppingList> {
        self.reconciler.get(id)
    }

    pub fn is_live(&self) -> bool {
        self.subscription.is_subscribed()
    }

    /// Refetch the snapshot. Discarded silently if the view was disposed
    /// while the fetch was in flight.
    pub async fn reload(&mut self) -> SyncResult<()> {
        let lists = self
            .store
            .fetch_lists(self.owner.id)
            .await
            .map_err(fetch_error)?;
        self.reconciler.seed(lists);
        Ok(())
    }

    /// Open the change feed for this owner. Idempotent; a transport
    /// failure logs and leaves the view usable without live updates.
    pub async fn subscribe(&mut self) {
        if !self.reconciler.is_active() || !self.subscription.begin() {
            return;
        }
        match self.feed.subscribe(ChangeScope::Owner(self.owner.id)).await {
            Ok(handle) => self.subscription.established(handle),
            Err(e) => {
                self.subscription.failed();
                warn!("{}", SyncError::SubscriptionUnavailable(e.to_string()));
            }
        }
    }

    /// Next feed event; pends forever when the view has no live feed so it
    /// can sit in a select loop unconditionally.
    pub async fn next_change(&mut self) -> Option<ChangeEvent> {
        let Some(sub) = self.subscription.active_mut() else {
            return std::future::pending().await;
        };
        let event = sub.recv().await;
        if event.is_none() {
            debug!("lists feed ended, dropping to manual reload");
            self.subscription.release();
        }
        event
    }

    pub fn apply_change(&mut self, event: &ChangeEvent) -> Applied {
        if event.table != Table::Lists {
            return Applied::Ignored;
        }
        match event.decode::<ShoppingList>() {
            Ok(change) => self.reconciler.apply(&change),
            Err(e) => {
                warn!("dropping undecodable lists change: {e}");
                Applied::Ignored
            }
        }
    }

    /// Create a list, visible immediately; rolled back if the store call
    /// fails. The echoed INSERT event dedups by id.
    pub async fn create(&mut self, name: &str) -> SyncResult<ShoppingList> {
        let list = ShoppingList::new(self.owner.id, name);
        let created = list.clone();
        self.reconciler
            .mutate(
                |c| {
                    c.insert_front(list);
                },
                self.store.insert_list(&created),
            )
            .await?;
        Ok(created)
    }

    pub async fn rename(&mut self, id: Uuid, name: &str) -> SyncResult<()> {
        let Some(current) = self.reconciler.get(id) else {
            return Err(SyncError::Mutation(format!("unknown list {id}")));
        };
        let mut renamed = current.clone();
        renamed.name = name.to_string();
        renamed.updated_at = chrono::Utc::now();
        self.reconciler
            .mutate(
                |c| {
                    c.update(renamed);
                },
                self.store.rename_list(id, name),
            )
            .await
    }

    pub async fn delete(&mut self, id: Uuid) -> SyncResult<()> {
        self.reconciler
            .mutate(
                |c| {
                    c.remove(id);
                },
                self.store.delete_list(id),
            )
            .await
    }

    /// A SIGNED_OUT event tears the view down; true means presentation
    /// should move to the unauthenticated state (first time only).
    pub fn handle_auth_event(&mut self, event: &AuthEvent) -> bool {
        match event {
            AuthEvent::SignedOut => self.dispose(),
            AuthEvent::SignedIn(_) => false,
        }
    }

    /// Idempotent teardown: releases the subscription once and makes every
    /// later fetch or event callback a no-op.
    pub fn dispose(&mut self) -> bool {
        let first = self.reconciler.dispose();
        if first {
            self.subscription.release();
        }
        first
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoplist_api_client::memory::{MemoryFeed, MemorySession, MemoryStore, user};
    use shoplist_core::testing;

    async fn signed_in_view(
        store: MemoryStore,
        feed: MemoryFeed,
    ) -> (ListsView<MemoryStore, MemoryFeed>, MemorySession) {
        let session = MemorySession::signed_in(user("a@b.c"));
        let view = ListsView::open(&session, store, feed).await.unwrap();
        (view, session)
    }

    #[tokio::test]
    async fn open_requires_a_session() {
        let session = MemorySession::new();
        let result = ListsView::open(&session, MemoryStore::new(), MemoryFeed::new()).await;
        assert!(matches!(result, Err(SyncError::AuthRequired)));
    }

    #[tokio::test]
    async fn open_with_empty_store_yields_an_empty_view() {
        let (view, _session) = signed_in_view(MemoryStore::new(), MemoryFeed::new()).await;
        assert!(view.lists().is_empty());
        assert!(view.is_live());
    }

    #[tokio::test]
    async fn create_is_visible_immediately_and_echo_dedups() {
        let feed = MemoryFeed::new();
        let (mut view, _session) = signed_in_view(MemoryStore::new(), feed.clone()).await;

        let created = view.create("Courses").await.unwrap();
        assert_eq!(view.lists().len(), 1);

        feed.push_insert(&created);
        let event = view.next_change().await.unwrap();
        assert!(!view.apply_change(&event).changed());
        assert_eq!(view.lists().len(), 1);
    }

    #[tokio::test]
    async fn failed_create_rolls_back() {
        let store = MemoryStore::new();
        let (mut view, _session) = signed_in_view(store.clone(), MemoryFeed::new()).await;

        store.fail_next("backend down");
        let result = view.create("Courses").await;

        assert!(matches!(result, Err(SyncError::Mutation(_))));
        assert!(view.lists().is_empty());
        assert!(store.lists().is_empty());
    }

    #[tokio::test]
    async fn remote_insert_from_another_session_lands_in_front() {
        let feed = MemoryFeed::new();
        let (mut view, _session) = signed_in_view(MemoryStore::new(), feed.clone()).await;
        view.create("Mine").await.unwrap();

        let other = testing::list_for(view.owner().id, "Theirs");
        feed.push_insert(&other);
        let event = view.next_change().await.unwrap();

        assert!(view.apply_change(&event).changed());
        assert_eq!(view.lists()[0].id, other.id);
        assert_eq!(view.lists().len(), 2);
    }

    #[tokio::test]
    async fn sign_out_releases_the_subscription_exactly_once() {
        let feed = MemoryFeed::new();
        let (mut view, _session) = signed_in_view(MemoryStore::new(), feed.clone()).await;
        assert_eq!(feed.active_subscriptions(), 1);

        assert!(view.handle_auth_event(&AuthEvent::SignedOut));
        assert_eq!(feed.active_subscriptions(), 0);

        // A second SIGNED_OUT must not redirect or unsubscribe again.
        assert!(!view.handle_auth_event(&AuthEvent::SignedOut));
        assert_eq!(feed.active_subscriptions(), 0);
    }

    #[tokio::test]
    async fn feed_refusal_degrades_to_manual_reload() {
        let store = MemoryStore::new();
        let feed = MemoryFeed::new();
        feed.refuse("realtime down");

        let (mut view, _session) = signed_in_view(store.clone(), feed).await;
        assert!(!view.is_live());

        store.seed_lists(vec![testing::list_for(view.owner().id, "Courses")]);
        view.reload().await.unwrap();
        assert_eq!(view.lists().len(), 1);
    }

    #[tokio::test]
    async fn reload_after_dispose_is_discarded() {
        let store = MemoryStore::new();
        let (mut view, _session) = signed_in_view(store.clone(), MemoryFeed::new()).await;

        view.dispose();
        store.seed_lists(vec![testing::list_for(view.owner().id, "late")]);
        view.reload().await.unwrap();

        assert!(view.lists().is_empty());
    }
}
