//! UDP multicast transport.

use crate::config::LpsConfig;
use crate::error::{LpsError, Result, SetupStage};
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{Ipv4Addr, SocketAddrV4, UdpSocket};

use super::Transport;

/// A UDP socket bound to the group port and joined to the group.
///
/// Receives on the wildcard address with a read timeout of the configured
/// poll interval, and sends every datagram to the group.
#[derive(Debug)]
pub struct MulticastTransport {
    socket: UdpSocket,
    destination: SocketAddrV4,
}

impl MulticastTransport {
    /// Create, configure, bind and join.
    ///
    /// On failure the socket is closed before the error is returned.
    pub fn open(config: &LpsConfig) -> Result<Self> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
            .map_err(LpsError::setup(SetupStage::Socket))?;

        socket
            .set_reuse_address(true)
            .map_err(LpsError::setup(SetupStage::ReuseAddress))?;

        let local = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, config.port);
        socket
            .bind(&local.into())
            .map_err(LpsError::setup(SetupStage::Bind))?;

        socket
            .join_multicast_v4(&config.group, &config.interface)
            .map_err(LpsError::setup(SetupStage::JoinGroup))?;

        Self::configure(&socket, config).map_err(LpsError::setup(SetupStage::SocketOption))?;

        tracing::info!(
            group = %config.group,
            port = config.port,
            interface = %config.interface,
            "joined multicast group"
        );

        Ok(Self {
            socket: socket.into(),
            destination: SocketAddrV4::new(config.group, config.port),
        })
    }

    fn configure(socket: &Socket, config: &LpsConfig) -> io::Result<()> {
        socket.set_multicast_loop_v4(config.multicast_loop)?;
        socket.set_multicast_ttl_v4(config.multicast_ttl)?;
        if !config.interface.is_unspecified() {
            socket.set_multicast_if_v4(&config.interface)?;
        }
        socket.set_read_timeout(Some(config.poll_interval))?;
        Ok(())
    }

    /// Group address and port datagrams are sent to.
    pub fn destination(&self) -> SocketAddrV4 {
        self.destination
    }
}

impl Transport for MulticastTransport {
    fn send(&self, datagram: &[u8]) -> io::Result<usize> {
        self.socket.send_to(datagram, self.destination)
    }

    fn recv(&self, buf: &mut [u8]) -> io::Result<usize> {
        self.socket.recv(buf)
    }
}
