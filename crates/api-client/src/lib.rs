pub mod client;
pub mod error;
pub mod feed;
pub mod retry;
pub mod session;
pub mod store;

pub use client::{ApiClient, ChangePullResponse, LoginRequest, LoginResponse};
pub use error::{ApiError, ApiResult};
pub use feed::{ChangeFeed, ChangeScope, FeedSubscription, PollingFeed};
pub use session::{AuthEvent, HttpSession, SessionProvider, User};
pub use store::{DataStore, HttpStore};

#[cfg(any(test, feature = "testing"))]
pub mod memory;
