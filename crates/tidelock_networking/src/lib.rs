//! # Tidelock Networking
//!
//! The authoritative wire: compact binary protocol, non-blocking UDP
//! transport, fixed-timestep server loop and client reconciliation.
//!
//! ## Design
//!
//! - The server owns the one true world; clients mirror it from
//!   broadcast snapshots and may only veto their own position locally
//! - Single-threaded cooperative loop: drain packets, run systems,
//!   emit snapshot, in strict order within each tick
//! - Plain UDP, no reliability layer: snapshots are wholesale state,
//!   so a lost packet is simply superseded by the next one

#![deny(unsafe_code)]
#![deny(clippy::all)]

pub mod client;
pub mod protocol;
pub mod server;
pub mod transport;

/// Maximum size of any packet in bytes. Chosen to stay under typical
/// path MTU after UDP/IP headers.
pub const MAX_PACKET_SIZE: usize = 1400;

/// Default simulation tick rate in Hz.
pub const DEFAULT_TICK_RATE: u32 = 60;

/// Default snapshot broadcast rate in Hz, deliberately below the tick
/// rate.
pub const DEFAULT_SNAPSHOT_RATE: u32 = 20;

pub use client::GameClient;
pub use protocol::{Packet, PacketHeader, PacketKind, PayloadReader, PayloadWriter};
pub use server::{GameServer, ServerConfig};
pub use transport::{TransportError, UdpTransport};
