//! Per-instance traffic counters.

use crate::wire::DecodeError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters updated by the receiver and publishers.
#[derive(Debug, Default)]
pub struct LpsStats {
    received: AtomicU64,
    discarded_short: AtomicU64,
    discarded_domain: AtomicU64,
    discarded_kind: AtomicU64,
    discarded_malformed: AtomicU64,
    dispatched: AtomicU64,
    callbacks: AtomicU64,
    published: AtomicU64,
    rejected: AtomicU64,
}

impl LpsStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_discard(&self, reason: &DecodeError) {
        let counter = match reason {
            DecodeError::TooShort { .. } | DecodeError::TruncatedValue { .. } => {
                &self.discarded_short
            }
            DecodeError::DomainMismatch { .. } => &self.discarded_domain,
            DecodeError::UnknownKind(_) => &self.discarded_kind,
            DecodeError::InvalidTopic | DecodeError::Oversized { .. } => &self.discarded_malformed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dispatch(&self, callbacks: usize) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        self.callbacks.fetch_add(callbacks as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_published(&self) {
        self.published.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            discarded_short: self.discarded_short.load(Ordering::Relaxed),
            discarded_domain: self.discarded_domain.load(Ordering::Relaxed),
            discarded_kind: self.discarded_kind.load(Ordering::Relaxed),
            discarded_malformed: self.discarded_malformed.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            callbacks: self.callbacks.load(Ordering::Relaxed),
            published: self.published.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`LpsStats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Datagrams read from the transport.
    pub received: u64,
    /// Too short for a header or a value.
    pub discarded_short: u64,
    /// Addressed to another domain.
    pub discarded_domain: u64,
    /// Unknown kind byte.
    pub discarded_kind: u64,
    /// Oversized, or topic not UTF-8.
    pub discarded_malformed: u64,
    /// Frames decoded and matched against the registry.
    pub dispatched: u64,
    /// Callback invocations.
    pub callbacks: u64,
    /// Datagrams sent.
    pub published: u64,
    /// Publish calls rejected before sending.
    pub rejected: u64,
}

impl StatsSnapshot {
    /// All discarded datagrams.
    pub fn discarded(&self) -> u64 {
        self.discarded_short
            + self.discarded_domain
            + self.discarded_kind
            + self.discarded_malformed
    }
}
