//! Core types shared by the codec, registry and instance.

use crate::error::{LpsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of the domain tag on the wire.
pub const DOMAIN_LEN: usize = 3;

/// Three-byte namespace prefix that keeps deployments on one segment apart.
///
/// Domains shorter than three bytes are zero-padded, the same bytes a C
/// peer produces with `strncpy`. Longer domains are rejected rather than
/// silently truncated.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DomainTag([u8; DOMAIN_LEN]);

impl DomainTag {
    /// Build a tag from a 1 to 3 byte string.
    pub fn new(domain: &str) -> Result<Self> {
        let bytes = domain.as_bytes();
        if bytes.is_empty() || bytes.len() > DOMAIN_LEN || bytes.contains(&0) {
            return Err(LpsError::InvalidDomain(domain.to_string()));
        }
        let mut tag = [0u8; DOMAIN_LEN];
        tag[..bytes.len()].copy_from_slice(bytes);
        Ok(DomainTag(tag))
    }

    /// Wrap raw tag bytes as read off the wire.
    pub fn from_bytes(bytes: [u8; DOMAIN_LEN]) -> Self {
        DomainTag(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; DOMAIN_LEN] {
        &self.0
    }
}

impl fmt::Debug for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DomainTag({:?})", self.to_string())
    }
}

impl fmt::Display for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(DOMAIN_LEN);
        write!(f, "{}", String::from_utf8_lossy(&self.0[..end]))
    }
}

/// Semantic category of a published value. Ordinals are part of the wire format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Kind {
    Value = 0,
    Counter = 1,
    RequestValue = 2,
}

impl Kind {
    /// Parse a wire kind byte.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Kind::Value),
            1 => Some(Kind::Counter),
            2 => Some(Kind::RequestValue),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Value => "value",
            Kind::Counter => "counter",
            Kind::RequestValue => "request",
        };
        f.write_str(name)
    }
}

/// A published value tagged with its kind.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Sample {
    /// Current reading of a gauge.
    Value(f64),
    /// Monotonic or accumulated count.
    Counter(f64),
    /// A value some peer is asked to adopt.
    RequestValue(f64),
}

impl Sample {
    /// Pair a kind with its value.
    pub fn new(kind: Kind, value: f64) -> Self {
        match kind {
            Kind::Value => Sample::Value(value),
            Kind::Counter => Sample::Counter(value),
            Kind::RequestValue => Sample::RequestValue(value),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Sample::Value(_) => Kind::Value,
            Sample::Counter(_) => Kind::Counter,
            Sample::RequestValue(_) => Kind::RequestValue,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            Sample::Value(v) | Sample::Counter(v) | Sample::RequestValue(v) => v,
        }
    }
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.kind(), self.value())
    }
}

/// An owned received message, as delivered to channel subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub topic: String,
    pub sample: Sample,
}

/// Unique identifier for an instance within this process.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InstanceId(pub u64);

impl fmt::Debug for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceId({})", self.0)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instance {}", self.0)
    }
}

/// Unique identifier for a subscription within its instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
