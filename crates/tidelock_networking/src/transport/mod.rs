//! # Transport Layer
//!
//! Thin non-blocking UDP wrapper. Bind failure is fatal at startup;
//! steady-state send failures are logged, counted and dropped — with
//! wholesale snapshots, the next broadcast supersedes anything lost.

use crate::MAX_PACKET_SIZE;
use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tracing::debug;

/// Transport startup failure.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The UDP socket could not be bound or configured.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        /// Requested bind address.
        addr: SocketAddr,
        /// Underlying OS error.
        source: io::Error,
    },
}

/// Per-socket traffic counters, scoped to this transport instance.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransportStats {
    /// Packets sent.
    pub packets_sent: u64,
    /// Packets received.
    pub packets_received: u64,
    /// Bytes sent.
    pub bytes_sent: u64,
    /// Bytes received.
    pub bytes_received: u64,
    /// Send errors (logged and dropped).
    pub send_errors: u64,
    /// Receive errors other than would-block.
    pub recv_errors: u64,
}

/// Non-blocking UDP socket wrapper.
pub struct UdpTransport {
    socket: std::net::UdpSocket,
    local_addr: SocketAddr,
    recv_buffer: [u8; MAX_PACKET_SIZE],
    stats: TransportStats,
}

impl UdpTransport {
    /// Binds a non-blocking socket to `addr`.
    pub fn bind(addr: SocketAddr) -> Result<Self, TransportError> {
        let socket = std::net::UdpSocket::bind(addr)
            .map_err(|source| TransportError::Bind { addr, source })?;
        socket
            .set_nonblocking(true)
            .map_err(|source| TransportError::Bind { addr, source })?;
        let local_addr = socket
            .local_addr()
            .map_err(|source| TransportError::Bind { addr, source })?;

        Ok(Self {
            socket,
            local_addr,
            recv_buffer: [0u8; MAX_PACKET_SIZE],
            stats: TransportStats::default(),
        })
    }

    /// The locally bound address (useful when binding port 0).
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sends one datagram to `addr`.
    ///
    /// Failures are non-fatal during steady state: logged at debug,
    /// counted, and otherwise dropped.
    pub fn send_to(&mut self, data: &[u8], addr: SocketAddr) {
        match self.socket.send_to(data, addr) {
            Ok(n) => {
                self.stats.packets_sent += 1;
                self.stats.bytes_sent += n as u64;
            }
            Err(e) => {
                self.stats.send_errors += 1;
                debug!(%addr, error = %e, "dropped outbound packet");
            }
        }
    }

    /// Receives one datagram if available.
    ///
    /// `None` when the socket would block (no data) or on a transient
    /// receive error; the caller just polls again next iteration.
    pub fn recv(&mut self) -> Option<(&[u8], SocketAddr)> {
        match self.socket.recv_from(&mut self.recv_buffer) {
            Ok((len, addr)) => {
                self.stats.packets_received += 1;
                self.stats.bytes_received += len as u64;
                Some((&self.recv_buffer[..len], addr))
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => None,
            Err(e) => {
                self.stats.recv_errors += 1;
                debug!(error = %e, "receive error");
                None
            }
        }
    }

    /// Traffic counters for this socket.
    #[must_use]
    pub const fn stats(&self) -> &TransportStats {
        &self.stats
    }
}
