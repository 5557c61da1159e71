pub mod change;
pub mod config;
pub mod error;
pub mod record;

pub use change::{ChangeEvent, ChangeKind, RowChange, Table};
pub use error::{SyncError, SyncResult};
pub use record::{ListItem, Record, ShoppingList};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
