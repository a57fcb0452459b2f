//! Background receive loop.
//!
//! One loop per instance, on its own thread, for the instance's lifetime.
//! Datagrams are handled strictly in arrival order: decode, snapshot the
//! matching subscriptions, run their callbacks, then read the next one.
//!
//! Cancellation is cooperative. The transport's receive returns at least
//! once per poll interval, and the loop checks the run flag before every
//! read and again before dispatching what it read. Once the flag is
//! cleared no new dispatch begins.

use crate::stats::LpsStats;
use crate::subscriptions::SubscriptionRegistry;
use crate::transport::{is_timeout, Transport};
use crate::types::DomainTag;
use crate::wire::{DecodeError, Frame};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub(crate) struct ReceiverLoop {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) domain: DomainTag,
    pub(crate) registry: Arc<SubscriptionRegistry>,
    pub(crate) stats: Arc<LpsStats>,
    pub(crate) running: Arc<AtomicBool>,
    /// Largest datagram accepted.
    pub(crate) capacity: usize,
    /// Back-off after an unexpected receive error.
    pub(crate) poll_interval: Duration,
}

impl ReceiverLoop {
    /// Run until the run flag is cleared.
    pub(crate) fn run(self) {
        tracing::info!(domain = %self.domain, "receiver started");

        // One spare byte exposes datagrams larger than the capacity.
        let mut buf = vec![0u8; self.capacity + 1];

        while self.running.load(Ordering::Acquire) {
            let len = match self.transport.recv(&mut buf) {
                Ok(len) => len,
                Err(e) if is_timeout(&e) => continue,
                Err(e) => {
                    tracing::warn!(domain = %self.domain, "receive error: {}", e);
                    thread::sleep(self.poll_interval);
                    continue;
                }
            };

            if !self.running.load(Ordering::Acquire) {
                break;
            }

            self.handle_datagram(&buf[..len]);
        }

        tracing::info!(domain = %self.domain, "receiver stopped");
    }

    /// Decode one datagram and dispatch it. Returns the callbacks invoked.
    pub(crate) fn handle_datagram(&self, datagram: &[u8]) -> usize {
        self.stats.record_received();

        let decoded = if datagram.len() > self.capacity {
            Err(DecodeError::Oversized {
                capacity: self.capacity,
            })
        } else {
            Frame::decode(datagram, &self.domain)
        };

        match decoded {
            Ok(frame) => {
                let invoked = self.registry.dispatch(frame.topic, frame.sample);
                self.stats.record_dispatch(invoked);
                invoked
            }
            Err(reason) => {
                tracing::trace!(
                    domain = %self.domain,
                    len = datagram.len(),
                    %reason,
                    "discarded datagram"
                );
                self.stats.record_discard(&reason);
                0
            }
        }
    }
}
