//! Error types for lps instances.

use crate::types::{InstanceId, SubscriptionId};
use std::fmt;
use thiserror::Error;

/// Step of transport setup that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupStage {
    /// Creating the UDP socket.
    Socket,
    /// Enabling address reuse.
    ReuseAddress,
    /// Binding to the wildcard address.
    Bind,
    /// Joining the multicast group.
    JoinGroup,
    /// Any other socket option (loopback, TTL, interface, timeout).
    SocketOption,
}

impl fmt::Display for SetupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SetupStage::Socket => "socket",
            SetupStage::ReuseAddress => "reuse address",
            SetupStage::Bind => "bind",
            SetupStage::JoinGroup => "multicast join",
            SetupStage::SocketOption => "socket option",
        };
        f.write_str(name)
    }
}

/// Main error type for lps operations.
#[derive(Debug, Error)]
pub enum LpsError {
    #[error("Transport setup failed at {stage}: {source}")]
    Setup {
        stage: SetupStage,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid domain: {0:?} (must be 1 to 3 bytes)")]
    InvalidDomain(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Topic too long: {len} bytes (max {max})")]
    TopicTooLong { len: usize, max: usize },

    #[error("Topic contains a NUL byte at offset {offset}")]
    TopicContainsNul { offset: usize },

    #[error("stop() called from the instance's own receiver thread")]
    StopFromReceiver,

    #[error("Instance is stopped")]
    Stopped,

    #[error("Subscription belongs to {got}, not {expected}")]
    WrongInstance {
        expected: InstanceId,
        got: InstanceId,
    },

    #[error("Subscription not registered: {0}")]
    NotSubscribed(SubscriptionId),
}

impl LpsError {
    pub(crate) fn setup(stage: SetupStage) -> impl FnOnce(std::io::Error) -> Self {
        move |source| LpsError::Setup { stage, source }
    }
}

/// Result type for lps operations.
pub type Result<T> = std::result::Result<T, LpsError>;
