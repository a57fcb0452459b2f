//! Subscription registry for received frames.
//!
//! Each instance owns one registry. Subscriptions are reference counted:
//! the registry holds one reference, and every in-flight dispatch holds a
//! transient one while its callback runs. A subscription is freed when the
//! last reference goes, either inside `unsubscribe` or right after the
//! callback that was still running returns.
//!
//! Callbacks never run under the registry lock, so a callback may itself
//! subscribe or unsubscribe. Once closed, the registry refuses new
//! subscriptions; the check and the close share the registry lock.
//!
//! # Example
//!
//! ```ignore
//! let registry = SubscriptionRegistry::new(InstanceId(1));
//! let handle = registry.insert("sensor.*".into(), |topic, sample| {
//!     println!("{} = {}", topic, sample);
//! })?;
//!
//! registry.dispatch("sensor.kitchen.temp", Sample::Value(21.5));
//!
//! registry.remove(handle)?;
//! ```

mod registry;
mod types;

pub use registry::SubscriptionRegistry;
pub use types::{Release, SubscriptionHandle};
