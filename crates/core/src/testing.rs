use chrono::{TimeZone, Utc};
use uuid::Uuid;

use crate::record::{ListItem, ShoppingList};

/// List owned by a fresh user, created at a deterministic-but-increasing
/// timestamp so collections order the way production data does.
pub fn list(name: &str) -> ShoppingList {
    list_for(Uuid::new_v4(), name)
}

/// List with a fixed owner.
pub fn list_for(owner: Uuid, name: &str) -> ShoppingList {
    let at = next_timestamp();
    ShoppingList {
        id: Uuid::new_v4(),
        name: name.to_string(),
        owner,
        created_at: at,
        updated_at: at,
    }
}

/// Unchecked item under the given list.
pub fn item(list_id: Uuid, name: &str) -> ListItem {
    let at = next_timestamp();
    ListItem {
        id: Uuid::new_v4(),
        list_id,
        name: name.to_string(),
        is_checked: false,
        created_at: at,
        updated_at: at,
    }
}

fn next_timestamp() -> chrono::DateTime<Utc> {
    use std::sync::atomic::{AtomicU32, Ordering};
    static COUNTER: AtomicU32 = AtomicU32::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap() + chrono::Duration::seconds(n as i64)
}
