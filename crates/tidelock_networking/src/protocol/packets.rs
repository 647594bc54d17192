//! # Packet Definitions
//!
//! Every packet starts with a one-byte kind followed by the fixed
//! header. The kind values are wire-stable; renumbering is a breaking
//! protocol change.

use super::codec::SnapshotEntity;
use bytemuck::{Pod, Zeroable};
use tidelock_core::{Entity, Vec2};

/// Packet kind discriminant, written as the first byte of every
/// packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    /// Client requests a session; payload optionally carries a spawn
    /// position.
    Connect = 0,
    /// Server confirms the session and assigns an entity.
    ConnectAck = 1,
    /// Either side tears the session down.
    Disconnect = 2,
    /// Keep-alive; refreshes the server-side timeout clock.
    Heartbeat = 3,
    /// One logical input sample (desired velocity).
    Input = 4,
    /// Authoritative world state for replicated entities.
    Snapshot = 5,
}

impl PacketKind {
    /// Parses a wire byte, `None` for unknown values.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Connect),
            1 => Some(Self::ConnectAck),
            2 => Some(Self::Disconnect),
            3 => Some(Self::Heartbeat),
            4 => Some(Self::Input),
            5 => Some(Self::Snapshot),
            _ => None,
        }
    }
}

/// Fixed header following the kind byte: sender sequence number plus
/// the server tick (or a client timestamp on client-originated
/// packets).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
#[repr(C)]
pub struct PacketHeader {
    /// Monotonic per-sender sequence number.
    pub sequence: u32,
    /// Server tick for server packets, client timestamp otherwise.
    pub tick: u32,
}

impl PacketHeader {
    /// Creates a header.
    #[inline]
    #[must_use]
    pub const fn new(sequence: u32, tick: u32) -> Self {
        Self { sequence, tick }
    }
}

/// Total bytes preceding any payload: kind byte plus header.
pub const HEADER_SIZE: usize = 1 + std::mem::size_of::<PacketHeader>();

/// One input sample: the velocity the client wants applied to its
/// entity this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct InputState {
    /// Desired X velocity in world units per second.
    pub vel_x: f32,
    /// Desired Y velocity in world units per second.
    pub vel_y: f32,
}

impl InputState {
    /// Creates an input sample.
    #[inline]
    #[must_use]
    pub const fn new(vel_x: f32, vel_y: f32) -> Self {
        Self { vel_x, vel_y }
    }

    /// The desired velocity as a vector.
    #[inline]
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        Vec2::new(self.vel_x, self.vel_y)
    }
}

/// A fully decoded packet.
#[derive(Clone, Debug, PartialEq)]
pub enum Packet {
    /// Session request with an optional spawn position.
    Connect(PacketHeader, Option<Vec2>),
    /// Session confirmation carrying the assigned entity.
    ConnectAck(PacketHeader, Entity),
    /// Session teardown.
    Disconnect(PacketHeader),
    /// Keep-alive.
    Heartbeat(PacketHeader),
    /// Input sample.
    Input(PacketHeader, InputState),
    /// World snapshot.
    Snapshot(PacketHeader, Vec<SnapshotEntity>),
}

impl Packet {
    /// The wire kind of this packet.
    #[must_use]
    pub const fn kind(&self) -> PacketKind {
        match self {
            Self::Connect(..) => PacketKind::Connect,
            Self::ConnectAck(..) => PacketKind::ConnectAck,
            Self::Disconnect(..) => PacketKind::Disconnect,
            Self::Heartbeat(..) => PacketKind::Heartbeat,
            Self::Input(..) => PacketKind::Input,
            Self::Snapshot(..) => PacketKind::Snapshot,
        }
    }

    /// The packet header.
    #[must_use]
    pub const fn header(&self) -> &PacketHeader {
        match self {
            Self::Connect(h, _)
            | Self::ConnectAck(h, _)
            | Self::Disconnect(h)
            | Self::Heartbeat(h)
            | Self::Input(h, _)
            | Self::Snapshot(h, _) => h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trip() {
        for value in 0u8..=5 {
            let kind = PacketKind::from_u8(value).unwrap();
            assert_eq!(kind as u8, value);
        }
        assert_eq!(PacketKind::from_u8(6), None);
        assert_eq!(PacketKind::from_u8(255), None);
    }

    #[test]
    fn header_is_eight_bytes() {
        assert_eq!(std::mem::size_of::<PacketHeader>(), 8);
        assert_eq!(HEADER_SIZE, 9);
    }
}
