//! # Game Client
//!
//! Mirrors the authoritative world from snapshots. Remote entities are
//! replaced wholesale each snapshot and rendered through
//! interpolation; the client's own entity goes through a local
//! collision veto so a bad authoritative position cannot shove the
//! player inside a wall while the server sorts itself out.

pub mod interpolation;

pub use interpolation::SnapshotInterpolator;

use crate::protocol::{InputState, Packet, PacketHeader, PayloadReader, PayloadWriter, SnapshotEntity};
use crate::transport::{TransportError, UdpTransport};
use std::collections::HashMap;
use std::net::SocketAddr;
use tidelock_core::{Aabb, Entity, Vec2};
use tracing::{debug, info, trace, warn};

/// Client connection lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ClientState {
    /// No session.
    #[default]
    Disconnected,
    /// CONNECT sent, awaiting the ack.
    Connecting,
    /// Session established; an entity is assigned.
    Connected,
}

/// A replicated entity other than the client's own.
#[derive(Debug)]
pub struct RemoteEntity {
    /// Server-side entity id.
    pub entity_id: u32,
    /// Render-time position blender.
    pub interpolator: SnapshotInterpolator,
    /// Last snapshotted velocity.
    pub velocity: Vec2,
}

/// Client-side session and world mirror.
pub struct GameClient {
    transport: UdpTransport,
    server_addr: SocketAddr,
    state: ClientState,
    entity: Option<Entity>,
    sequence: u32,
    remotes: HashMap<u32, RemoteEntity>,
    statics: HashMap<u32, Aabb>,
    local_position: Vec2,
    half_extents: Vec2,
    last_valid_position: Option<Vec2>,
    server_position_invalid: bool,
    offending_collider: Option<Aabb>,
    look_ahead_dt: f32,
    snapshot_interval: f32,
    writer: PayloadWriter,
}

impl GameClient {
    /// Creates a client bound to an ephemeral local port, targeting
    /// `server_addr`.
    pub fn new(server_addr: SocketAddr) -> Result<Self, TransportError> {
        let bind: SocketAddr = if server_addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let transport = UdpTransport::bind(bind)?;
        Ok(Self {
            transport,
            server_addr,
            state: ClientState::Disconnected,
            entity: None,
            sequence: 0,
            remotes: HashMap::new(),
            statics: HashMap::new(),
            local_position: Vec2::ZERO,
            half_extents: Vec2::new(0.5, 0.5),
            last_valid_position: None,
            server_position_invalid: false,
            offending_collider: None,
            look_ahead_dt: 1.0 / crate::DEFAULT_TICK_RATE as f32,
            snapshot_interval: 1.0 / crate::DEFAULT_SNAPSHOT_RATE as f32,
            writer: PayloadWriter::new(),
        })
    }

    /// Overrides the player collider half-extents used by the local
    /// veto and the input pre-check.
    #[must_use]
    pub fn with_half_extents(mut self, half_extents: Vec2) -> Self {
        self.half_extents = half_extents;
        self
    }

    /// Overrides how far ahead (in seconds) the input pre-check
    /// projects the desired velocity.
    #[must_use]
    pub fn with_look_ahead(mut self, look_ahead_dt: f32) -> Self {
        self.look_ahead_dt = look_ahead_dt;
        self
    }

    /// Matches the interpolation pacing to the server's snapshot rate
    /// in Hz.
    #[must_use]
    pub fn with_snapshot_rate(mut self, snapshot_rate: u32) -> Self {
        self.snapshot_interval = 1.0 / snapshot_rate.max(1) as f32;
        self
    }

    /// Preloads a static collider (map geometry known up front).
    pub fn add_static_collider(&mut self, id: u32, bounds: Aabb) {
        self.statics.insert(id, bounds);
    }

    /// The locally bound address.
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Current lifecycle state.
    #[inline]
    #[must_use]
    pub const fn state(&self) -> ClientState {
        self.state
    }

    /// The server-assigned entity, once connected.
    #[inline]
    #[must_use]
    pub const fn entity(&self) -> Option<Entity> {
        self.entity
    }

    /// The client's own accepted position.
    #[inline]
    #[must_use]
    pub const fn local_position(&self) -> Vec2 {
        self.local_position
    }

    /// True while the latest authoritative position for the own entity
    /// failed the local collision veto.
    #[inline]
    #[must_use]
    pub const fn server_position_invalid(&self) -> bool {
        self.server_position_invalid
    }

    /// Number of mirrored remote entities.
    #[must_use]
    pub fn remote_count(&self) -> usize {
        self.remotes.len()
    }

    /// Interpolated render position of a remote entity.
    #[must_use]
    pub fn remote_position(&self, entity_id: u32) -> Option<Vec2> {
        self.remotes.get(&entity_id).map(|r| r.interpolator.position())
    }

    /// Sends a CONNECT, optionally requesting a spawn position.
    pub fn connect(&mut self, spawn: Option<Vec2>) {
        let header = self.next_header();
        if self.writer.serialize_connect(&header, spawn) {
            self.transport.send_to(self.writer.as_slice(), self.server_addr);
            self.state = ClientState::Connecting;
            info!(server = %self.server_addr, "connect requested");
        }
    }

    /// Sends a keep-alive.
    pub fn heartbeat(&mut self) {
        let header = self.next_header();
        if self.writer.serialize_heartbeat(&header) {
            self.transport.send_to(self.writer.as_slice(), self.server_addr);
        }
    }

    /// Sends a DISCONNECT and drops the session locally.
    pub fn disconnect(&mut self) {
        let header = self.next_header();
        if self.writer.serialize_disconnect(&header) {
            self.transport.send_to(self.writer.as_slice(), self.server_addr);
        }
        self.state = ClientState::Disconnected;
        self.entity = None;
        self.remotes.clear();
    }

    /// Sends an input sample after the local pre-check, returning the
    /// velocity actually sent.
    ///
    /// Two gates apply. While the server position is vetoed, only
    /// movement leading away from the offending collider goes through.
    /// Otherwise, a desired velocity whose one-step projection lands
    /// the player collider inside known static geometry is replaced
    /// with zero rather than burning a round trip on a doomed move.
    pub fn send_input(&mut self, desired: Vec2) -> Vec2 {
        let velocity = self.gate_input(desired);
        let header = self.next_header();
        let input = InputState::new(velocity.x, velocity.y);
        if self.writer.serialize_input(&header, &input) {
            self.transport.send_to(self.writer.as_slice(), self.server_addr);
        }
        velocity
    }

    fn gate_input(&self, desired: Vec2) -> Vec2 {
        if self.server_position_invalid {
            if let Some(offending) = self.offending_collider {
                // A unit step along the desired direction must clear
                // the collider that caused the veto.
                let probe = Aabb::from_center(
                    self.local_position + desired.normalized(),
                    self.half_extents,
                );
                if probe.intersects(&offending) {
                    trace!("input suppressed while server position is vetoed");
                    return Vec2::ZERO;
                }
            }
            return desired;
        }
        if desired == Vec2::ZERO {
            return desired;
        }
        let projected = Aabb::from_center(
            self.local_position + desired * self.look_ahead_dt,
            self.half_extents,
        );
        if self.statics.values().any(|wall| projected.intersects(wall)) {
            trace!("input pre-check hit static geometry, sending stop");
            return Vec2::ZERO;
        }
        desired
    }

    /// Drains every queued inbound datagram and applies it.
    pub fn poll(&mut self) {
        loop {
            let decoded = {
                let Some((data, addr)) = self.transport.recv() else {
                    break;
                };
                if addr != self.server_addr {
                    trace!(%addr, "ignoring packet from unknown peer");
                    continue;
                }
                match PayloadReader::new(data).deserialize() {
                    Some(packet) => packet,
                    None => {
                        warn!(len = data.len(), "discarded malformed packet");
                        continue;
                    }
                }
            };
            self.handle_packet(decoded);
        }
    }

    fn handle_packet(&mut self, packet: Packet) {
        match packet {
            Packet::ConnectAck(_, entity) => {
                if self.state != ClientState::Connected {
                    info!(entity = entity.id, generation = entity.generation, "connected");
                }
                self.entity = Some(entity);
                self.state = ClientState::Connected;
            }
            Packet::Snapshot(_, entities) => self.apply_snapshot(entities),
            Packet::Disconnect(_) => {
                info!("server closed the session");
                self.state = ClientState::Disconnected;
                self.entity = None;
                self.remotes.clear();
            }
            other => {
                trace!(kind = ?other.kind(), "ignoring client-bound packet");
            }
        }
    }

    /// Advances interpolation by local frame time.
    pub fn advance(&mut self, dt: f32) {
        for remote in self.remotes.values_mut() {
            remote.interpolator.advance(dt);
        }
    }

    fn next_header(&mut self) -> PacketHeader {
        self.sequence = self.sequence.wrapping_add(1);
        PacketHeader::new(self.sequence, 0)
    }

    /// Applies one authoritative snapshot: remote entities are
    /// replaced wholesale (absent ids drop out), static geometry is
    /// learned from static colliders, and the own entity runs through
    /// the local collision veto.
    fn apply_snapshot(&mut self, entities: Vec<SnapshotEntity>) {
        let own_id = self.entity.map(|e| e.id);
        let interval = self.snapshot_interval;
        let mut next = HashMap::with_capacity(entities.len());

        for entry in entities {
            if let (Some(pos), Some((half, true, false))) = (entry.position, entry.collider) {
                self.statics.insert(entry.entity_id, Aabb::from_center(pos, half));
            }

            if Some(entry.entity_id) == own_id {
                if let Some(pos) = entry.position {
                    self.reconcile_own_position(pos);
                }
                continue;
            }

            let Some(pos) = entry.position else { continue };
            let mut remote = self.remotes.remove(&entry.entity_id).unwrap_or_else(|| {
                RemoteEntity {
                    entity_id: entry.entity_id,
                    interpolator: SnapshotInterpolator::new(pos, interval),
                    velocity: Vec2::ZERO,
                }
            });
            remote.interpolator.push(pos);
            if let Some(vel) = entry.velocity {
                remote.velocity = vel;
            }
            next.insert(entry.entity_id, remote);
        }

        self.remotes = next;
    }

    /// Accepts or vetoes the authoritative position for the own
    /// entity. A position intersecting known static geometry is held
    /// back in favor of the last valid one until a clean snapshot
    /// arrives.
    fn reconcile_own_position(&mut self, authoritative: Vec2) {
        let bounds = Aabb::from_center(authoritative, self.half_extents);
        let offending = self.statics.values().find(|wall| bounds.intersects(wall));

        if let Some(&wall) = offending {
            if !self.server_position_invalid {
                debug!(
                    x = authoritative.x,
                    y = authoritative.y,
                    "authoritative position vetoed by local collision"
                );
            }
            self.server_position_invalid = true;
            self.offending_collider = Some(wall);
            if let Some(last_valid) = self.last_valid_position {
                self.local_position = last_valid;
            }
        } else {
            self.server_position_invalid = false;
            self.offending_collider = None;
            self.local_position = authoritative;
            self.last_valid_position = Some(authoritative);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> GameClient {
        let client = GameClient::new("127.0.0.1:7777".parse().unwrap()).unwrap();
        let mut client = client.with_look_ahead(1.0 / 60.0);
        client.entity = Some(Entity::new(3, 0));
        client.state = ClientState::Connected;
        client
    }

    fn wall_entry(id: u32, center: Vec2, half: Vec2) -> SnapshotEntity {
        SnapshotEntity {
            entity_id: id,
            position: Some(center),
            velocity: None,
            collider: Some((half, true, false)),
        }
    }

    fn own_entry(pos: Vec2) -> SnapshotEntity {
        SnapshotEntity {
            entity_id: 3,
            position: Some(pos),
            velocity: Some(Vec2::ZERO),
            collider: Some((Vec2::new(0.5, 0.5), false, false)),
        }
    }

    #[test]
    fn colliding_snapshot_position_is_vetoed() {
        let mut client = test_client();
        // Clean snapshot establishes a valid position and the wall.
        client.apply_snapshot(vec![
            wall_entry(10, Vec2::new(15.0, 15.0), Vec2::new(5.0, 5.0)),
            own_entry(Vec2::new(15.0, 5.0)),
        ]);
        assert!(!client.server_position_invalid());
        assert_eq!(client.local_position(), Vec2::new(15.0, 5.0));

        // Authoritative position inside the wall: held back.
        client.apply_snapshot(vec![
            wall_entry(10, Vec2::new(15.0, 15.0), Vec2::new(5.0, 5.0)),
            own_entry(Vec2::new(15.0, 12.0)),
        ]);
        assert!(client.server_position_invalid());
        assert_eq!(client.local_position(), Vec2::new(15.0, 5.0));
    }

    #[test]
    fn clean_snapshot_clears_the_veto() {
        let mut client = test_client();
        client.apply_snapshot(vec![
            wall_entry(10, Vec2::new(15.0, 15.0), Vec2::new(5.0, 5.0)),
            own_entry(Vec2::new(15.0, 12.0)),
        ]);
        assert!(client.server_position_invalid());

        client.apply_snapshot(vec![
            wall_entry(10, Vec2::new(15.0, 15.0), Vec2::new(5.0, 5.0)),
            own_entry(Vec2::new(15.0, 5.0)),
        ]);
        assert!(!client.server_position_invalid());
        assert_eq!(client.local_position(), Vec2::new(15.0, 5.0));
    }

    #[test]
    fn input_toward_offending_collider_is_suppressed() {
        let mut client = test_client();
        // Clean snapshot below the wall establishes the last valid
        // position, then an embedded one forces the veto.
        client.apply_snapshot(vec![
            wall_entry(10, Vec2::new(15.0, 15.0), Vec2::new(5.0, 5.0)),
            own_entry(Vec2::new(15.0, 9.0)),
        ]);
        client.apply_snapshot(vec![
            wall_entry(10, Vec2::new(15.0, 15.0), Vec2::new(5.0, 5.0)),
            own_entry(Vec2::new(15.0, 12.0)),
        ]);
        assert!(client.server_position_invalid());

        // Toward the wall: suppressed.
        assert_eq!(client.gate_input(Vec2::new(0.0, 10.0)), Vec2::ZERO);
        // Away from the wall: allowed.
        assert_eq!(
            client.gate_input(Vec2::new(0.0, -10.0)),
            Vec2::new(0.0, -10.0)
        );
    }

    #[test]
    fn pre_check_zeroes_input_projected_into_a_wall() {
        let mut client = test_client();
        client.apply_snapshot(vec![
            wall_entry(10, Vec2::new(15.0, 15.0), Vec2::new(5.0, 5.0)),
            own_entry(Vec2::new(15.0, 9.4)),
        ]);
        assert!(!client.server_position_invalid());

        // One look-ahead step at 30 u/s crosses into the wall.
        assert_eq!(client.gate_input(Vec2::new(0.0, 30.0)), Vec2::ZERO);
        // Sliding along the face stays clear.
        assert_eq!(
            client.gate_input(Vec2::new(30.0, 0.0)),
            Vec2::new(30.0, 0.0)
        );
    }

    #[test]
    fn snapshot_replaces_remote_entities_wholesale() {
        let mut client = test_client();
        client.apply_snapshot(vec![
            SnapshotEntity {
                entity_id: 7,
                position: Some(Vec2::new(1.0, 1.0)),
                velocity: None,
                collider: None,
            },
            SnapshotEntity {
                entity_id: 8,
                position: Some(Vec2::new(2.0, 2.0)),
                velocity: None,
                collider: None,
            },
        ]);
        assert_eq!(client.remote_count(), 2);

        // Entity 8 is gone from the next snapshot: it drops out.
        client.apply_snapshot(vec![SnapshotEntity {
            entity_id: 7,
            position: Some(Vec2::new(1.5, 1.0)),
            velocity: None,
            collider: None,
        }]);
        assert_eq!(client.remote_count(), 1);
        assert!(client.remote_position(7).is_some());
        assert!(client.remote_position(8).is_none());
    }

    #[test]
    fn interpolation_paces_to_the_configured_snapshot_rate() {
        let mut client = test_client().with_snapshot_rate(60);
        let remote = |pos: Vec2| SnapshotEntity {
            entity_id: 7,
            position: Some(pos),
            velocity: None,
            collider: None,
        };
        client.apply_snapshot(vec![remote(Vec2::ZERO)]);
        client.apply_snapshot(vec![remote(Vec2::new(12.0, 0.0))]);

        // Half of the 60 Hz interval: halfway between the samples.
        client.advance(1.0 / 120.0);
        assert_eq!(client.remote_position(7), Some(Vec2::new(6.0, 0.0)));
    }

    #[test]
    fn own_entity_is_never_a_remote() {
        let mut client = test_client();
        client.apply_snapshot(vec![own_entry(Vec2::new(1.0, 1.0))]);
        assert_eq!(client.remote_count(), 0);
        assert_eq!(client.local_position(), Vec2::new(1.0, 1.0));
    }
}
