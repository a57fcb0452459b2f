//! Instance configuration and wire constants.

use crate::error::{LpsError, Result};
use crate::types::DomainTag;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Multicast group shared with existing deployments.
pub const DEFAULT_GROUP: Ipv4Addr = Ipv4Addr::new(239, 255, 255, 210);

/// UDP port shared with existing deployments.
pub const DEFAULT_PORT: u16 = 9988;

/// Receive capacity: one standard Ethernet MTU.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 1500;

/// Default receive timeout between cancellation checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Default domain used when none is given.
pub const DEFAULT_DOMAIN: &str = "lps";

/// What `stop` does with subscriptions the caller has not released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Leave them registered; the caller unsubscribes each handle.
    #[default]
    Retain,
    /// Drain the registry during stop.
    AutoRelease,
}

/// Instance configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LpsConfig {
    /// Domain tag (1 to 3 bytes).
    pub domain: String,

    /// Multicast group to join and publish to.
    pub group: Ipv4Addr,

    /// UDP port to bind and publish to.
    pub port: u16,

    /// Local interface for the group membership and outgoing datagrams.
    /// `0.0.0.0` lets the OS choose.
    pub interface: Ipv4Addr,

    /// Deliver our own publishes to local listeners.
    pub multicast_loop: bool,

    /// Multicast hop limit. 1 keeps traffic on the local segment.
    pub multicast_ttl: u32,

    /// Largest datagram accepted by the receiver.
    /// Default: 1500
    pub recv_buffer_size: usize,

    /// Receive timeout; bounds how long `stop` waits for the receiver.
    /// Default: 100ms
    pub poll_interval: Duration,

    /// Subscription handling on stop.
    pub release_policy: ReleasePolicy,
}

impl Default for LpsConfig {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            group: DEFAULT_GROUP,
            port: DEFAULT_PORT,
            interface: Ipv4Addr::UNSPECIFIED,
            multicast_loop: true,
            multicast_ttl: 1,
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            release_policy: ReleasePolicy::Retain,
        }
    }
}

impl LpsConfig {
    /// Default configuration for the given domain.
    pub fn with_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Default::default()
        }
    }

    /// Check the configuration and parse the domain tag.
    pub fn validate(&self) -> Result<DomainTag> {
        let domain = DomainTag::new(&self.domain)?;

        if self.recv_buffer_size < crate::wire::FRAME_HEADER_LEN {
            return Err(LpsError::InvalidConfig(format!(
                "recv_buffer_size {} is smaller than a frame header ({} bytes)",
                self.recv_buffer_size,
                crate::wire::FRAME_HEADER_LEN
            )));
        }

        if self.poll_interval.is_zero() {
            return Err(LpsError::InvalidConfig(
                "poll_interval must be non-zero".to_string(),
            ));
        }

        Ok(domain)
    }
}
