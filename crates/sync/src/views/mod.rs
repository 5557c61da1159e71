mod items;
mod lists;

pub use items::{ItemsOutcome, ItemsView};
pub use lists::ListsView;

use shoplist_api_client::{SessionProvider, User};
use shoplist_core::{SyncError, SyncResult};

/// Views open only once the session provider confirms a signed-in user.
pub(crate) async fn confirm_user<P: SessionProvider>(session: &P) -> SyncResult<User> {
    match session.current_user().await {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(SyncError::AuthRequired),
        Err(e) if e.is_auth() => Err(SyncError::AuthRequired),
        Err(e) => Err(SyncError::Fetch(e.to_string())),
    }
}
