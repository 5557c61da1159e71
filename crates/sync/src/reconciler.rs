use uuid::Uuid;

use shoplist_api_client::{ApiError, ApiResult};
use shoplist_core::{Record, RowChange, SyncError, SyncResult};

use crate::collection::{Applied, ReconciledCollection};
use crate::lifecycle::Lifecycle;

/// One table's reconciled state plus the lifecycle gating every mutation.
///
/// Single-writer by construction: the owning view is the only code that
/// ever holds `&mut` access, so fetches, user mutations, and feed events
/// may interleave in any order without racing on the collection itself.
pub struct Reconciler<R: Record> {
    collection: ReconciledCollection<R>,
    lifecycle: Lifecycle,
}

impl<R: Record> Default for Reconciler<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Reconciler<R> {
    pub fn new() -> Self {
        Self {
            collection: ReconciledCollection::new(),
            lifecycle: Lifecycle::new(),
        }
    }

    pub fn records(&self) -> &[R] {
        self.collection.records()
    }

    pub fn get(&self, id: Uuid) -> Option<&R> {
        self.collection.get(id)
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Adopt a fetched snapshot. A fetch that resolves after disposal is
    /// discarded silently; returns whether the snapshot was taken.
    pub fn seed(&mut self, records: Vec<R>) -> bool {
        if !self.lifecycle.is_active() {
            return false;
        }
        self.collection.replace(records);
        true
    }

    /// Merge one change event; a no-op after disposal.
    pub fn apply(&mut self, change: &RowChange<R>) -> Applied {
        if !self.lifecycle.is_active() {
            return Applied::Ignored;
        }
        self.collection.apply(change)
    }

    /// Apply `local` to the collection immediately, then run `remote`.
    /// On remote failure the exact pre-mutation collection is restored and
    /// the failure surfaces as a transient error; the echoed change event
    /// for the success case dedups via `apply`.
    pub async fn mutate<T, Fut>(
        &mut self,
        local: impl FnOnce(&mut ReconciledCollection<R>),
        remote: Fut,
    ) -> SyncResult<T>
    where
        Fut: Future<Output = ApiResult<T>>,
    {
        if !self.lifecycle.is_active() {
            return Err(SyncError::Mutation("view is closed".to_string()));
        }

        let before = self.collection.snapshot();
        local(&mut self.collection);

        match remote.await {
            Ok(value) => Ok(value),
            Err(e) => {
                if self.lifecycle.is_active() {
                    self.collection.restore(before);
                }
                Err(mutation_error(e))
            }
        }
    }

    /// Returns true on the first call only.
    pub fn dispose(&mut self) -> bool {
        self.lifecycle.dispose()
    }
}

fn mutation_error(e: ApiError) -> SyncError {
    if e.is_auth() {
        SyncError::AuthRequired
    } else {
        SyncError::Mutation(e.to_string())
    }
}

/// Classify an initial-load failure.
pub(crate) fn fetch_error(e: ApiError) -> SyncError {
    if e.is_auth() {
        SyncError::AuthRequired
    } else {
        SyncError::Fetch(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoplist_core::{ChangeKind, ListItem, testing};

    fn seeded(n: usize) -> (Reconciler<ListItem>, Uuid) {
        let list_id = Uuid::new_v4();
        let mut reconciler = Reconciler::new();
        let items: Vec<_> = (0..n)
            .map(|i| testing::item(list_id, &format!("item-{i}")))
            .collect();
        reconciler.seed(items);
        (reconciler, list_id)
    }

    fn insert_change(item: &ListItem) -> RowChange<ListItem> {
        RowChange {
            kind: ChangeKind::Insert,
            new: Some(item.clone()),
            old: None,
        }
    }

    #[tokio::test]
    async fn failed_remote_call_rolls_back_bit_for_bit() {
        let (mut reconciler, list_id) = seeded(3);
        let before = reconciler.records().to_vec();
        let item = testing::item(list_id, "Milk");

        let result: SyncResult<()> = reconciler
            .mutate(
                |c| {
                    c.insert_front(item);
                },
                async {
                    Err(ApiError::Status {
                        status: 500,
                        message: "backend down".into(),
                    })
                },
            )
            .await;

        assert!(matches!(result, Err(SyncError::Mutation(_))));
        assert_eq!(reconciler.records(), before.as_slice());
    }

    #[tokio::test]
    async fn successful_mutation_keeps_the_optimistic_state() {
        let (mut reconciler, list_id) = seeded(1);
        let item = testing::item(list_id, "Milk");
        let expected = item.clone();

        reconciler
            .mutate(
                |c| {
                    c.insert_front(item);
                },
                async { Ok(()) },
            )
            .await
            .unwrap();

        assert_eq!(reconciler.records()[0], expected);

        // The echoed event for the same id is absorbed.
        assert_eq!(reconciler.apply(&insert_change(&expected)), Applied::Ignored);
        assert_eq!(reconciler.records().len(), 2);
    }

    #[tokio::test]
    async fn auth_rejection_surfaces_as_auth_required() {
        let (mut reconciler, list_id) = seeded(0);
        let item = testing::item(list_id, "Milk");

        let result: SyncResult<()> = reconciler
            .mutate(
                |c| {
                    c.insert_front(item);
                },
                async {
                    Err(ApiError::Status {
                        status: 401,
                        message: "token expired".into(),
                    })
                },
            )
            .await;

        assert!(matches!(result, Err(SyncError::AuthRequired)));
        assert!(reconciler.records().is_empty());
    }

    #[tokio::test]
    async fn disposed_reconciler_ignores_everything() {
        let (mut reconciler, list_id) = seeded(2);
        let before = reconciler.records().to_vec();
        assert!(reconciler.dispose());
        assert!(!reconciler.dispose());

        let item = testing::item(list_id, "late");
        assert_eq!(reconciler.apply(&insert_change(&item)), Applied::Ignored);
        assert!(!reconciler.seed(vec![item.clone()]));

        let result: SyncResult<()> = reconciler
            .mutate(
                |c| {
                    c.insert_front(item);
                },
                async { Ok(()) },
            )
            .await;
        assert!(result.is_err());

        assert_eq!(reconciler.records(), before.as_slice());
    }
}
