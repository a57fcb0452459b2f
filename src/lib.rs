//! # lps
//!
//! Local-network publish/subscribe for scalar telemetry. Processes on one
//! network segment exchange `f64` samples addressed by hierarchical topics
//! over UDP multicast.
//!
//! ## Core Concepts
//!
//! - **Domain**: a 3-byte tag; instances only see frames of their own domain
//! - **Topic**: a string such as `sensor.kitchen.temp`, up to 255 bytes
//! - **Pattern**: a topic glob where `*` matches any run of bytes
//! - **Sample**: a value, counter, or request-value carrying an `f64`
//!
//! Delivery is best effort. There is no acknowledgement, retention, or
//! ordering beyond what the network preserves.
//!
//! ## Example
//!
//! ```ignore
//! use lps::{Lps, Sample};
//!
//! let lps = Lps::start("lps")?;
//!
//! let sub = lps.subscribe("sensor.*", |topic, sample| {
//!     println!("{} = {}", topic, sample);
//! })?;
//!
//! lps.publish("sensor.kitchen.temp", Sample::Value(21.5))?;
//!
//! lps.unsubscribe(sub)?;
//! lps.stop()?;
//! ```

pub mod config;
pub mod error;
pub mod lps;
pub mod pattern;
mod receiver;
pub mod stats;
pub mod subscriptions;
pub mod transport;
pub mod types;
pub mod wire;

// Re-exports
pub use config::{LpsConfig, ReleasePolicy, DEFAULT_GROUP, DEFAULT_PORT};
pub use error::{LpsError, Result, SetupStage};
pub use lps::Lps;
pub use pattern::{glob_match, Pattern};
pub use stats::{LpsStats, StatsSnapshot};
pub use subscriptions::{Release, SubscriptionHandle, SubscriptionRegistry};
pub use transport::{MemoryBus, MemoryTransport, MulticastTransport, Transport};
pub use types::*;
pub use wire::{encode_frame, DecodeError, Frame, MAX_TOPIC_LEN};
