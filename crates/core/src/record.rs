use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::change::Table;

/// A row that can live in a reconciled collection.
///
/// Implementors are plain data: equality is field-for-field, which is what
/// rollback verification and echo deduplication rely on.
pub trait Record:
    Clone + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Backing-store table this record type maps to.
    const TABLE: Table;

    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
}

/// A named shopping list owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShoppingList {
    pub id: Uuid,
    pub name: String,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShoppingList {
    /// Fresh list with a client-generated id, so the optimistic insert and
    /// the echoed change event agree on identity.
    pub fn new(owner: Uuid, name: &str) -> Self {
        let at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            owner,
            created_at: at,
            updated_at: at,
        }
    }
}

impl Record for ShoppingList {
    const TABLE: Table = Table::Lists;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// One entry within a list. `is_checked` is toggled by any collaborator
/// with access to the list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: Uuid,
    pub list_id: Uuid,
    pub name: String,
    pub is_checked: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ListItem {
    /// Fresh unchecked item with a client-generated id.
    pub fn new(list_id: Uuid, name: &str) -> Self {
        let at = Utc::now();
        Self {
            id: Uuid::new_v4(),
            list_id,
            name: name.to_string(),
            is_checked: false,
            created_at: at,
            updated_at: at,
        }
    }
}

impl Record for ListItem {
    const TABLE: Table = Table::Items;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_round_trips_through_json() {
        let list = crate::testing::list("Courses");
        let json = serde_json::to_string(&list).unwrap();
        let back: ShoppingList = serde_json::from_str(&json).unwrap();
        assert_eq!(list, back);
    }

    #[test]
    fn item_maps_to_items_table() {
        assert_eq!(ListItem::TABLE, Table::Items);
        assert_eq!(ShoppingList::TABLE, Table::Lists);
    }
}
