//! Subscription handle and entry types.

use crate::pattern::Pattern;
use crate::types::{InstanceId, Sample, SubscriptionId};
use std::fmt;

/// Callback invoked with the topic and sample of each matching frame.
pub(crate) type Callback = Box<dyn Fn(&str, Sample) + Send + Sync>;

/// A registered pattern and its callback.
pub(crate) struct Subscription {
    pub(crate) id: SubscriptionId,
    pub(crate) pattern: Pattern,
    callback: Callback,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, pattern: Pattern, callback: Callback) -> Self {
        Self {
            id,
            pattern,
            callback,
        }
    }

    pub(crate) fn invoke(&self, topic: &str, sample: Sample) {
        (self.callback)(topic, sample)
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

/// Caller-held token for a registered subscription.
///
/// Not `Clone`: `unsubscribe` consumes it, so a handle cannot be released
/// twice. Dropping a handle without unsubscribing leaves the subscription
/// registered until its instance goes away.
#[must_use = "dropping the handle leaves the subscription registered"]
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub(crate) id: SubscriptionId,
    pub(crate) instance: InstanceId,
}

impl SubscriptionHandle {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The instance whose registry holds this subscription.
    pub fn instance(&self) -> InstanceId {
        self.instance
    }
}

/// How an unsubscribed entry was released.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// The registry held the last reference; freed during unsubscribe.
    Immediate,
    /// A dispatch is still running its callback and frees it on return.
    Deferred,
}
