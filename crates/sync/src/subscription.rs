use shoplist_api_client::FeedSubscription;

/// Feed subscription lifecycle, as an explicit machine instead of "is the
/// handle present" checks. Transitions outside the arrows below are
/// rejected, which is what makes subscribe and release idempotent.
///
/// Unsubscribed -> Subscribing -> Subscribed -> Unsubscribing -> Unsubscribed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    Unsubscribed,
    Subscribing,
    Subscribed,
    Unsubscribing,
}

#[derive(Default)]
pub struct SubscriptionSlot {
    state: SubscriptionState,
    handle: Option<FeedSubscription>,
}

impl Default for SubscriptionState {
    fn default() -> Self {
        Self::Unsubscribed
    }
}

impl SubscriptionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    pub fn is_subscribed(&self) -> bool {
        self.state == SubscriptionState::Subscribed
    }

    /// Start subscribing. False (and no transition) unless currently
    /// unsubscribed, so a second caller cannot open a duplicate.
    pub fn begin(&mut self) -> bool {
        if self.state != SubscriptionState::Unsubscribed {
            return false;
        }
        self.state = SubscriptionState::Subscribing;
        true
    }

    /// The transport came up. Outside of Subscribing the handle is released
    /// on the spot rather than stored, keeping the one-subscription rule.
    pub fn established(&mut self, handle: FeedSubscription) {
        if self.state != SubscriptionState::Subscribing {
            handle.release();
            return;
        }
        self.handle = Some(handle);
        self.state = SubscriptionState::Subscribed;
    }

    /// The transport could not be established.
    pub fn failed(&mut self) {
        if self.state == SubscriptionState::Subscribing {
            self.state = SubscriptionState::Unsubscribed;
        }
    }

    /// Release the live handle exactly once. True when a handle was
    /// actually released; later calls are no-ops.
    pub fn release(&mut self) -> bool {
        match self.state {
            SubscriptionState::Subscribed => {
                self.state = SubscriptionState::Unsubscribing;
                if let Some(handle) = self.handle.take() {
                    handle.release();
                }
                self.state = SubscriptionState::Unsubscribed;
                true
            }
            // An in-flight subscribe that gets torn down: established()
            // will find the slot no longer Subscribing and drop the handle.
            SubscriptionState::Subscribing => {
                self.state = SubscriptionState::Unsubscribed;
                false
            }
            _ => false,
        }
    }

    pub fn active_mut(&mut self) -> Option<&mut FeedSubscription> {
        match self.state {
            SubscriptionState::Subscribed => self.handle.as_mut(),
            _ => None,
        }
    }
}
