/// View-level failure taxonomy. Every remote failure is caught at its call
/// site and folded into one of these variants before presentation sees it.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// No active session where one is required; presentation redirects to
    /// sign-in.
    #[error("sign-in required")]
    AuthRequired,

    /// The initial snapshot fetch failed. Retryable as a whole-view reload.
    #[error("loading failed: {0}")]
    Fetch(String),

    /// A single add/toggle/delete failed. The optimistic change has already
    /// been rolled back when this surfaces.
    #[error("change failed: {0}")]
    Mutation(String),

    /// The change feed could not be established. The view stays usable
    /// without live updates.
    #[error("live updates unavailable: {0}")]
    SubscriptionUnavailable(String),
}

pub type SyncResult<T> = std::result::Result<T, SyncError>;

impl SyncError {
    /// Whether the view as a whole is still usable after this error.
    /// Only a failed initial load takes the view down to its error state.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Fetch(_))
    }
}
