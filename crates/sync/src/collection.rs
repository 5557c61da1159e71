use uuid::Uuid;

use shoplist_core::{ChangeKind, Record, RowChange};

/// What applying one change did to the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Inserted,
    Updated,
    Removed,
    /// Duplicate insert, update/delete for an absent id, or an undecodable
    /// payload. The collection is untouched.
    Ignored,
}

impl Applied {
    pub fn changed(self) -> bool {
        self != Self::Ignored
    }
}

/// Ordered, deduplicated snapshot of one table's records for a view.
///
/// Order is descending creation time: fetches arrive that way and inserts
/// go to the front. Updates never move a record. The latest state per
/// record is whatever was applied last, never a timestamp comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledCollection<R> {
    records: Vec<R>,
}

impl<R: Record> Default for ReconciledCollection<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> ReconciledCollection<R> {
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.records.iter().any(|r| r.id() == id)
    }

    pub fn get(&self, id: Uuid) -> Option<&R> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Replace the whole collection with a fetched snapshot, keeping the
    /// first occurrence of any duplicated id.
    pub fn replace(&mut self, records: Vec<R>) {
        self.records.clear();
        for record in records {
            if !self.contains(record.id()) {
                self.records.push(record);
            }
        }
    }

    /// Prepend a record unless its id is already present. The no-op case
    /// is what absorbs the echo of an optimistic insert.
    pub fn insert_front(&mut self, record: R) -> bool {
        if self.contains(record.id()) {
            return false;
        }
        self.records.insert(0, record);
        true
    }

    /// Replace the record with the same id, in place. False if absent.
    pub fn update(&mut self, record: R) -> bool {
        match self.records.iter_mut().find(|r| r.id() == record.id()) {
            Some(slot) => {
                *slot = record;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: Uuid) -> Option<R> {
        let pos = self.records.iter().position(|r| r.id() == id)?;
        Some(self.records.remove(pos))
    }

    /// Merge one typed change. Inserts dedup by id, updates for unknown ids
    /// are dropped (an update racing ahead of its insert), deletes for
    /// absent ids are no-ops.
    pub fn apply(&mut self, change: &RowChange<R>) -> Applied {
        match change.kind {
            ChangeKind::Insert => match &change.new {
                Some(row) if self.insert_front(row.clone()) => Applied::Inserted,
                _ => Applied::Ignored,
            },
            ChangeKind::Update => match &change.new {
                Some(row) if self.update(row.clone()) => Applied::Updated,
                _ => Applied::Ignored,
            },
            ChangeKind::Delete => match change.old.as_ref().map(Record::id) {
                Some(id) if self.remove(id).is_some() => Applied::Removed,
                _ => Applied::Ignored,
            },
        }
    }

    pub fn snapshot(&self) -> Vec<R> {
        self.records.clone()
    }

    pub fn restore(&mut self, snapshot: Vec<R>) {
        self.records = snapshot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoplist_core::{ListItem, testing};
    use uuid::Uuid;

    fn insert_change(item: &ListItem) -> RowChange<ListItem> {
        RowChange {
            kind: ChangeKind::Insert,
            new: Some(item.clone()),
            old: None,
        }
    }

    fn update_change(item: &ListItem) -> RowChange<ListItem> {
        RowChange {
            kind: ChangeKind::Update,
            new: Some(item.clone()),
            old: None,
        }
    }

    fn delete_change(item: &ListItem) -> RowChange<ListItem> {
        RowChange {
            kind: ChangeKind::Delete,
            new: None,
            old: Some(item.clone()),
        }
    }

    fn seeded(n: usize) -> (ReconciledCollection<ListItem>, Uuid) {
        let list_id = Uuid::new_v4();
        let mut collection = ReconciledCollection::new();
        for i in 0..n {
            collection.insert_front(testing::item(list_id, &format!("item-{i}")));
        }
        (collection, list_id)
    }

    #[test]
    fn applying_the_same_insert_twice_is_idempotent() {
        let (mut collection, list_id) = seeded(2);
        let item = testing::item(list_id, "Milk");

        assert_eq!(collection.apply(&insert_change(&item)), Applied::Inserted);
        let after_once = collection.clone();

        assert_eq!(collection.apply(&insert_change(&item)), Applied::Ignored);
        assert_eq!(collection, after_once);
    }

    #[test]
    fn no_two_records_ever_share_an_id() {
        let (mut collection, list_id) = seeded(3);
        let item = testing::item(list_id, "Milk");

        collection.apply(&insert_change(&item));
        let mut changed = item.clone();
        changed.is_checked = true;
        collection.apply(&insert_change(&changed));
        collection.apply(&update_change(&changed));

        let ids: Vec<_> = collection.records().iter().map(|r| r.id).collect();
        let mut deduped = ids.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
    }

    #[test]
    fn update_keeps_the_record_in_place() {
        let (mut collection, _) = seeded(3);
        let target = collection.records()[1].clone();
        let position = |c: &ReconciledCollection<ListItem>, id| {
            c.records().iter().position(|r| r.id == id).unwrap()
        };
        let before = position(&collection, target.id);

        let mut renamed = target.clone();
        renamed.name = "renamed".into();
        assert_eq!(collection.apply(&update_change(&renamed)), Applied::Updated);

        assert_eq!(position(&collection, target.id), before);
        assert_eq!(collection.get(target.id).unwrap().name, "renamed");
    }

    #[test]
    fn update_racing_ahead_of_its_insert_is_dropped() {
        let (mut collection, list_id) = seeded(1);
        let unseen = testing::item(list_id, "not fetched yet");

        assert_eq!(collection.apply(&update_change(&unseen)), Applied::Ignored);
        assert!(!collection.contains(unseen.id));
    }

    #[test]
    fn delete_for_an_absent_id_is_a_noop() {
        let (mut collection, list_id) = seeded(2);
        let before = collection.clone();
        let unseen = testing::item(list_id, "gone");

        assert_eq!(collection.apply(&delete_change(&unseen)), Applied::Ignored);
        assert_eq!(collection, before);
    }

    #[test]
    fn insert_goes_to_the_front() {
        let (mut collection, list_id) = seeded(2);
        let item = testing::item(list_id, "newest");

        collection.apply(&insert_change(&item));
        assert_eq!(collection.records()[0].id, item.id);
    }

    #[test]
    fn replace_drops_duplicate_ids_from_a_snapshot() {
        let list_id = Uuid::new_v4();
        let item = testing::item(list_id, "Milk");
        let mut collection = ReconciledCollection::new();

        collection.replace(vec![item.clone(), item.clone()]);
        assert_eq!(collection.len(), 1);
    }

    #[test]
    fn snapshot_and_restore_round_trip() {
        let (mut collection, list_id) = seeded(2);
        let before = collection.snapshot();

        collection.apply(&insert_change(&testing::item(list_id, "extra")));
        collection.restore(before.clone());

        assert_eq!(collection.records(), before.as_slice());
    }
}
