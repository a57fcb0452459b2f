//! In-process transport simulating one network segment.
//!
//! Every datagram sent on a [`MemoryBus`] is copied to every attached
//! endpoint, the sender included, the way a multicast group with loopback
//! enabled behaves. Nothing is dropped or reordered.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use super::Transport;

/// A shared segment that endpoints attach to.
#[derive(Clone, Default)]
pub struct MemoryBus {
    endpoints: Arc<Mutex<Vec<Sender<Vec<u8>>>>>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new endpoint whose `recv` waits at most `poll_interval`.
    pub fn attach(&self, poll_interval: Duration) -> MemoryTransport {
        let (tx, rx) = unbounded();
        self.endpoints.lock().push(tx);
        MemoryTransport {
            bus: self.clone(),
            inbox: rx,
            poll_interval,
        }
    }

    /// Deliver raw bytes to every attached endpoint.
    ///
    /// Returns the number of endpoints reached. Detached endpoints are
    /// pruned.
    pub fn inject(&self, datagram: &[u8]) -> usize {
        let mut endpoints = self.endpoints.lock();
        endpoints.retain(|tx| tx.send(datagram.to_vec()).is_ok());
        endpoints.len()
    }

    /// Number of endpoints still attached (as of the last send).
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.lock().len()
    }
}

/// One endpoint on a [`MemoryBus`].
pub struct MemoryTransport {
    bus: MemoryBus,
    inbox: Receiver<Vec<u8>>,
    poll_interval: Duration,
}

impl MemoryTransport {
    /// Take the next datagram, waiting up to `timeout`.
    pub fn recv_datagram(&self, timeout: Duration) -> Option<Vec<u8>> {
        self.inbox.recv_timeout(timeout).ok()
    }

    /// Datagrams waiting to be received.
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }
}

impl Transport for MemoryTransport {
    fn send(&self, datagram: &[u8]) -> io::Result<usize> {
        self.bus.inject(datagram);
        Ok(datagram.len())
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        match self.inbox.recv_timeout(self.poll_interval) {
            Ok(datagram) => {
                let len = datagram.len().min(buf.len());
                buf[..len].copy_from_slice(&datagram[..len]);
                Ok(len)
            }
            Err(RecvTimeoutError::Timeout) => Err(io::ErrorKind::TimedOut.into()),
            Err(RecvTimeoutError::Disconnected) => Err(io::ErrorKind::NotConnected.into()),
        }
    }
}
