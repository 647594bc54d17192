//! # Payload Codec
//!
//! Append-only writer and cursor reader over a fixed packet buffer.
//!
//! ## Design
//!
//! - Pre-allocated buffers, no heap allocations while encoding
//! - Scalars copied in **native byte order**: the protocol is
//!   same-architecture-only (a documented portability constraint)
//! - Snapshot entities frame each component as `tag:u16, size:u16,
//!   payload`, so a reader can skip types it does not recognize and
//!   the cursor can be forcibly resynchronized after every entry

use super::packets::{InputState, Packet, PacketHeader, PacketKind};
use crate::MAX_PACKET_SIZE;
use bytemuck::{bytes_of, Pod};
use tidelock_core::ecs::component::{Collider, Component, Position, Velocity};
use tidelock_core::{Entity, Vec2};

/// Upper bound on decoded snapshot entities, against hostile counts.
const MAX_SNAPSHOT_ENTITIES: u32 = 1024;

/// A component in wire form. Closed set: encoding and decoding are a
/// `match` over these variants, keyed by the core component tags.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WireComponent {
    /// World position.
    Position(Vec2),
    /// Current velocity.
    Velocity(Vec2),
    /// Collision half-extents and flags.
    Collider {
        /// AABB half-extents.
        half_extents: Vec2,
        /// Immovable collider.
        is_static: bool,
        /// Non-blocking overlap volume.
        is_trigger: bool,
    },
}

impl WireComponent {
    /// Wire tag for this component.
    #[must_use]
    pub const fn tag(&self) -> u16 {
        match self {
            Self::Position(_) => Position::TAG,
            Self::Velocity(_) => Velocity::TAG,
            Self::Collider { .. } => Collider::TAG,
        }
    }

    /// Encoded payload size in bytes.
    #[must_use]
    pub const fn size(&self) -> u16 {
        match self {
            Self::Position(_) | Self::Velocity(_) => 8,
            Self::Collider { .. } => 10,
        }
    }

    fn write(&self, writer: &mut PayloadWriter) -> bool {
        match *self {
            Self::Position(v) | Self::Velocity(v) => {
                writer.write_f32(v.x) && writer.write_f32(v.y)
            }
            Self::Collider {
                half_extents,
                is_static,
                is_trigger,
            } => {
                writer.write_f32(half_extents.x)
                    && writer.write_f32(half_extents.y)
                    && writer.write_u8(u8::from(is_static))
                    && writer.write_u8(u8::from(is_trigger))
            }
        }
    }

    /// Decodes a component with the given tag. `None` for unknown
    /// tags; the caller skips them via the size prefix.
    fn read(tag: u16, reader: &mut PayloadReader<'_>) -> Option<Self> {
        match tag {
            t if t == Position::TAG => {
                Some(Self::Position(Vec2::new(reader.read_f32()?, reader.read_f32()?)))
            }
            t if t == Velocity::TAG => {
                Some(Self::Velocity(Vec2::new(reader.read_f32()?, reader.read_f32()?)))
            }
            t if t == Collider::TAG => Some(Self::Collider {
                half_extents: Vec2::new(reader.read_f32()?, reader.read_f32()?),
                is_static: reader.read_u8()? != 0,
                is_trigger: reader.read_u8()? != 0,
            }),
            _ => None,
        }
    }
}

/// One decoded snapshot entity: whichever recognized components its
/// wire entry carried.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapshotEntity {
    /// Entity id on the server.
    pub entity_id: u32,
    /// Decoded position, if present.
    pub position: Option<Vec2>,
    /// Decoded velocity, if present.
    pub velocity: Option<Vec2>,
    /// Decoded collider (half-extents, static, trigger), if present.
    pub collider: Option<(Vec2, bool, bool)>,
}

impl SnapshotEntity {
    /// Creates an entry with no components.
    #[must_use]
    pub fn new(entity_id: u32) -> Self {
        Self {
            entity_id,
            ..Self::default()
        }
    }

    fn apply(&mut self, component: WireComponent) {
        match component {
            WireComponent::Position(v) => self.position = Some(v),
            WireComponent::Velocity(v) => self.velocity = Some(v),
            WireComponent::Collider {
                half_extents,
                is_static,
                is_trigger,
            } => self.collider = Some((half_extents, is_static, is_trigger)),
        }
    }
}

/// Payload writer over a pre-allocated packet buffer.
///
/// Designed to be reused across serializations; `reset` rewinds it.
pub struct PayloadWriter {
    buffer: [u8; MAX_PACKET_SIZE],
    position: usize,
}

impl PayloadWriter {
    /// Creates a writer with a fresh buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; MAX_PACKET_SIZE],
            position: 0,
        }
    }

    /// Rewinds for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Bytes written so far.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.position
    }

    /// True if nothing has been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// The written bytes.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> bool {
        if self.position >= MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position] = value;
        self.position += 1;
        true
    }

    /// Writes a u16 in native byte order.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> bool {
        if self.position + 2 > MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position..self.position + 2].copy_from_slice(&value.to_ne_bytes());
        self.position += 2;
        true
    }

    /// Writes a u32 in native byte order.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> bool {
        if self.position + 4 > MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position..self.position + 4].copy_from_slice(&value.to_ne_bytes());
        self.position += 4;
        true
    }

    /// Writes an f32 in native byte order.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> bool {
        if self.position + 4 > MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position..self.position + 4].copy_from_slice(&value.to_ne_bytes());
        self.position += 4;
        true
    }

    /// Writes a Pod value byte-for-byte.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) -> bool {
        let bytes = bytes_of(value);
        if self.position + bytes.len() > MAX_PACKET_SIZE {
            return false;
        }
        self.buffer[self.position..self.position + bytes.len()].copy_from_slice(bytes);
        self.position += bytes.len();
        true
    }

    fn write_preamble(&mut self, kind: PacketKind, header: &PacketHeader) -> bool {
        self.reset();
        self.write_u8(kind as u8) && self.write_pod(header)
    }

    /// Serializes a CONNECT packet with an optional spawn position.
    pub fn serialize_connect(&mut self, header: &PacketHeader, spawn: Option<Vec2>) -> bool {
        if !self.write_preamble(PacketKind::Connect, header) {
            return false;
        }
        match spawn {
            Some(pos) => {
                self.write_u8(1) && self.write_f32(pos.x) && self.write_f32(pos.y)
            }
            None => self.write_u8(0),
        }
    }

    /// Serializes a CONNECT_ACK carrying the assigned entity.
    pub fn serialize_connect_ack(&mut self, header: &PacketHeader, entity: Entity) -> bool {
        self.write_preamble(PacketKind::ConnectAck, header)
            && self.write_u32(entity.id)
            && self.write_u32(entity.generation)
    }

    /// Serializes a DISCONNECT packet.
    pub fn serialize_disconnect(&mut self, header: &PacketHeader) -> bool {
        self.write_preamble(PacketKind::Disconnect, header)
    }

    /// Serializes a HEARTBEAT packet.
    pub fn serialize_heartbeat(&mut self, header: &PacketHeader) -> bool {
        self.write_preamble(PacketKind::Heartbeat, header)
    }

    /// Serializes an INPUT packet.
    pub fn serialize_input(&mut self, header: &PacketHeader, input: &InputState) -> bool {
        self.write_preamble(PacketKind::Input, header) && self.write_pod(input)
    }
}

impl Default for PayloadWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializes a SNAPSHOT packet.
///
/// Layout after the preamble: `entity_count:u32`, then per entity
/// `entity_id:u32, component_count:u8`, then per component
/// `tag:u16, size:u16, payload`.
pub fn write_snapshot(
    writer: &mut PayloadWriter,
    header: &PacketHeader,
    entities: &[(u32, Vec<WireComponent>)],
) -> bool {
    if !writer.write_preamble(PacketKind::Snapshot, header) {
        return false;
    }
    if !writer.write_u32(entities.len() as u32) {
        return false;
    }
    for (entity_id, components) in entities {
        if components.len() > u8::MAX as usize {
            return false;
        }
        if !writer.write_u32(*entity_id) || !writer.write_u8(components.len() as u8) {
            return false;
        }
        for component in components {
            if !writer.write_u16(component.tag()) || !writer.write_u16(component.size()) {
                return false;
            }
            let start = writer.len();
            if !component.write(writer) {
                return false;
            }
            debug_assert_eq!(writer.len() - start, component.size() as usize);
        }
    }
    true
}

/// Decodes a snapshot payload (after the preamble has been consumed).
///
/// Unknown component tags are skipped via their size prefix. After
/// every component entry the cursor is forcibly set to
/// `data_start + size`, so one misbehaving entry cannot corrupt the
/// reads that follow. A truncated packet yields `None` and the caller
/// discards it whole.
pub fn read_snapshot(reader: &mut PayloadReader<'_>) -> Option<Vec<SnapshotEntity>> {
    let entity_count = reader.read_u32()?;
    let mut entities = Vec::with_capacity(entity_count.min(MAX_SNAPSHOT_ENTITIES) as usize);
    for _ in 0..entity_count {
        let entity_id = reader.read_u32()?;
        let component_count = reader.read_u8()?;
        let mut entity = SnapshotEntity::new(entity_id);
        for _ in 0..component_count {
            let tag = reader.read_u16()?;
            let size = reader.read_u16()? as usize;
            let data_start = reader.position();
            if reader.remaining() < size {
                return None;
            }
            if let Some(component) = WireComponent::read(tag, reader) {
                entity.apply(component);
            }
            // Resynchronize to the declared component boundary.
            reader.set_position(data_start + size);
        }
        entities.push(entity);
    }
    Some(entities)
}

/// Sequential cursor over received packet bytes.
///
/// Every read returns `None` if insufficient bytes remain; nothing
/// panics on malformed input.
pub struct PayloadReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PayloadReader<'a> {
    /// Creates a reader over a received datagram.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    /// Bytes left to read.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    /// Current cursor offset.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Moves the cursor, clamped to the buffer end.
    #[inline]
    pub fn set_position(&mut self, position: usize) {
        self.position = position.min(self.buffer.len());
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        let value = *self.buffer.get(self.position)?;
        self.position += 1;
        Some(value)
    }

    /// Reads a u16 in native byte order.
    #[inline]
    pub fn read_u16(&mut self) -> Option<u16> {
        let bytes = self
            .buffer
            .get(self.position..self.position + 2)?
            .try_into()
            .ok()?;
        self.position += 2;
        Some(u16::from_ne_bytes(bytes))
    }

    /// Reads a u32 in native byte order.
    #[inline]
    pub fn read_u32(&mut self) -> Option<u32> {
        let bytes = self
            .buffer
            .get(self.position..self.position + 4)?
            .try_into()
            .ok()?;
        self.position += 4;
        Some(u32::from_ne_bytes(bytes))
    }

    /// Reads an f32 in native byte order.
    #[inline]
    pub fn read_f32(&mut self) -> Option<f32> {
        self.read_u32().map(f32::from_bits)
    }

    /// Reads a Pod value byte-for-byte.
    #[inline]
    pub fn read_pod<T: Pod + Copy>(&mut self) -> Option<T> {
        let size = std::mem::size_of::<T>();
        let slice = self.buffer.get(self.position..self.position + size)?;
        self.position += size;
        bytemuck::try_pod_read_unaligned(slice).ok()
    }

    /// Decodes a complete packet, or `None` if it is malformed or of
    /// an unknown kind. The caller discards the whole datagram on
    /// `None`; nothing is partially applied.
    pub fn deserialize(&mut self) -> Option<Packet> {
        let kind = PacketKind::from_u8(self.read_u8()?)?;
        let header = self.read_pod::<PacketHeader>()?;

        match kind {
            PacketKind::Connect => {
                let spawn = if self.read_u8()? != 0 {
                    Some(Vec2::new(self.read_f32()?, self.read_f32()?))
                } else {
                    None
                };
                Some(Packet::Connect(header, spawn))
            }
            PacketKind::ConnectAck => {
                let entity = Entity::new(self.read_u32()?, self.read_u32()?);
                Some(Packet::ConnectAck(header, entity))
            }
            PacketKind::Disconnect => Some(Packet::Disconnect(header)),
            PacketKind::Heartbeat => Some(Packet::Heartbeat(header)),
            PacketKind::Input => {
                let input = self.read_pod::<InputState>()?;
                Some(Packet::Input(header, input))
            }
            PacketKind::Snapshot => {
                let entities = read_snapshot(self)?;
                Some(Packet::Snapshot(header, entities))
            }
        }
    }
}
