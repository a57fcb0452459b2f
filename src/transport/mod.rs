//! Datagram transports.
//!
//! An instance talks to the network through a [`Transport`]: a shared
//! handle that can send one datagram to the group and receive one
//! datagram with a bounded wait. [`MulticastTransport`] is the UDP
//! implementation; [`MemoryBus`] connects instances inside one process.

mod memory;
mod multicast;

pub use memory::{MemoryBus, MemoryTransport};
pub use multicast::MulticastTransport;

use std::io;

/// A datagram channel shared by the receiver thread and publishers.
pub trait Transport: Send + Sync + 'static {
    /// Send one datagram to every listener on the segment.
    fn send(&self, datagram: &[u8]) -> io::Result<usize>;

    /// Receive one datagram into `buf`, returning its length.
    ///
    /// Must return within roughly one poll interval; a wait with nothing
    /// to read ends in `WouldBlock` or `TimedOut`. Datagrams longer than
    /// `buf` are truncated to `buf.len()`.
    fn recv(&self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Whether a receive error only means nothing arrived in time.
pub(crate) fn is_timeout(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut | io::ErrorKind::Interrupted
    )
}
