use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};
use uuid::Uuid;

use shoplist_core::ChangeEvent;
use shoplist_core::config::FeedSettings;

use crate::client::ApiClient;
use crate::error::ApiResult;

/// Slice of the change log a subscription covers: every list a user owns,
/// or one list together with its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    Owner(Uuid),
    List(Uuid),
}

impl ChangeScope {
    pub fn to_query(self) -> String {
        match self {
            Self::Owner(id) => format!("owner:{id}"),
            Self::List(id) => format!("list:{id}"),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (kind, id) = s.split_once(':')?;
        let id = Uuid::parse_str(id).ok()?;
        match kind {
            "owner" => Some(Self::Owner(id)),
            "list" => Some(Self::List(id)),
            _ => None,
        }
    }
}

/// Change Feed contract: open one live subscription per scope.
#[allow(async_fn_in_trait)]
pub trait ChangeFeed {
    async fn subscribe(&self, scope: ChangeScope) -> ApiResult<FeedSubscription>;
}

/// Handle to one open subscription. Events arrive in log order; releasing
/// (or dropping) the handle stops delivery and the transport behind it.
pub struct FeedSubscription {
    scope: ChangeScope,
    events: mpsc::UnboundedReceiver<ChangeEvent>,
    shutdown: watch::Sender<bool>,
}

impl FeedSubscription {
    pub(crate) fn new(
        scope: ChangeScope,
        events: mpsc::UnboundedReceiver<ChangeEvent>,
        shutdown: watch::Sender<bool>,
    ) -> Self {
        Self {
            scope,
            events,
            shutdown,
        }
    }

    pub fn scope(&self) -> ChangeScope {
        self.scope
    }

    /// Next event, or `None` once the transport has stopped.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Drain without waiting; used by views that poll between renders.
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.events.try_recv().ok()
    }

    pub fn release(self) {
        // Drop does the signalling.
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Change feed that maps cursor-based pulls of the backend change log onto
/// per-event delivery. Poll failures are logged and retried on the next
/// tick; they never end the subscription.
pub struct PollingFeed {
    api: Arc<ApiClient>,
    settings: FeedSettings,
}

impl PollingFeed {
    pub fn new(api: Arc<ApiClient>, settings: FeedSettings) -> Self {
        Self { api, settings }
    }
}

impl ChangeFeed for PollingFeed {
    async fn subscribe(&self, scope: ChangeScope) -> ApiResult<FeedSubscription> {
        // The head pull both validates the subscription and anchors the
        // cursor, so only post-subscribe changes are delivered.
        let head = self
            .api
            .pull_changes(scope, None, self.settings.poll_limit)
            .await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(run_poll_loop(
            Arc::clone(&self.api),
            scope,
            head.next_cursor,
            Duration::from_millis(self.settings.poll_interval_ms),
            self.settings.poll_limit,
            tx,
            shutdown_rx,
        ));

        debug!("subscribed to changes for {scope:?}");
        Ok(FeedSubscription::new(scope, rx, shutdown_tx))
    }
}

async fn run_poll_loop(
    api: Arc<ApiClient>,
    scope: ChangeScope,
    mut cursor: u64,
    interval: Duration,
    limit: u32,
    tx: mpsc::UnboundedSender<ChangeEvent>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut tick = tokio::time::interval(interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                match api.pull_changes(scope, Some(cursor), limit).await {
                    Ok(pull) => {
                        cursor = pull.next_cursor;
                        for event in pull.events {
                            if tx.send(event).is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => warn!("change poll for {scope:?} failed, will retry: {e}"),
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    debug!("feed subscription for {scope:?} released");
                    break;
                }
            }
        }
    }
}
