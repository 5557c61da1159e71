pub mod collection;
pub mod lifecycle;
pub mod reconciler;
pub mod subscription;
pub mod views;

pub use collection::{Applied, ReconciledCollection};
pub use lifecycle::Lifecycle;
pub use reconciler::Reconciler;
pub use subscription::{SubscriptionSlot, SubscriptionState};
pub use views::{ItemsOutcome, ItemsView, ListsView};
