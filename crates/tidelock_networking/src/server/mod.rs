//! # Authoritative Server
//!
//! Owns the one true world. Each tick, in strict order: drain every
//! queued datagram, apply latched inputs (silence means stop), sweep
//! timeouts, then run the system schedule (collision before movement).
//! Snapshots broadcast on their own slower clock, identical for every
//! session.

pub mod config;
pub mod session;
pub mod tick;

pub use config::{ConfigError, MapCollider, MapData, ServerConfig};
pub use session::{Session, SessionTable};
pub use tick::{TickClock, MAX_FRAME_TIME};

use crate::protocol::{
    write_snapshot, Packet, PacketHeader, PayloadReader, PayloadWriter, WireComponent,
};
use crate::transport::{TransportError, UdpTransport};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tidelock_core::{
    Collider, CollisionResponse, CollisionSystem, MovementSystem, Position, Replicated, Scheduler,
    Vec2, Velocity, World,
};
use tracing::{debug, info, trace, warn};

/// Server startup failure.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The UDP socket could not be bound.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The configuration or map file is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The configured bind address does not parse.
    #[error("invalid bind address: {0}")]
    Addr(#[from] std::net::AddrParseError),
}

/// The authoritative game server.
pub struct GameServer {
    config: ServerConfig,
    transport: UdpTransport,
    world: World,
    scheduler: Scheduler,
    sessions: SessionTable,
    clock: TickClock,
    writer: PayloadWriter,
    sequence: u32,
    snapshot_interval: f32,
    snapshot_accumulator: f32,
    spawn_points: Vec<Vec2>,
    spawn_counter: usize,
    stop: Arc<AtomicBool>,
}

impl GameServer {
    /// Creates a server: binds the socket, seeds static map geometry,
    /// and registers the collision-then-movement schedule.
    pub fn new(config: ServerConfig, map: &MapData) -> Result<Self, ServerError> {
        let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port).parse()?;
        let transport = UdpTransport::bind(addr)?;

        let mut world = World::new();
        for collider in &map.colliders {
            let entity = world.spawn();
            world.positions.insert(
                entity.id,
                Position::new(collider.center[0], collider.center[1]),
            );
            let component = if collider.trigger {
                Collider::trigger(collider.half_extents[0], collider.half_extents[1])
            } else {
                Collider::fixed(collider.half_extents[0], collider.half_extents[1])
            };
            world.colliders.insert(entity.id, component);
            // Static geometry rides in snapshots too: clients learn it
            // for their local collision veto.
            world.replicated.insert(entity.id, Replicated);
        }

        let mut scheduler = Scheduler::new();
        scheduler.register(Box::new(
            CollisionSystem::new(CollisionResponse::VetoVelocity)
                .with_world_bounds(config.world_bounds()),
        ));
        scheduler.register(Box::new(MovementSystem::new()));

        let clock = TickClock::new(config.tick_rate);
        let sessions = SessionTable::new(config.max_players);
        let spawn_points: Vec<Vec2> = map.spawn_positions().collect();
        let snapshot_interval = 1.0 / config.snapshot_rate.max(1) as f32;

        info!(
            addr = %transport.local_addr(),
            tick_rate = config.tick_rate,
            snapshot_rate = config.snapshot_rate,
            colliders = map.colliders.len(),
            "server listening"
        );

        Ok(Self {
            config,
            transport,
            world,
            scheduler,
            sessions,
            clock,
            writer: PayloadWriter::new(),
            sequence: 0,
            snapshot_interval,
            snapshot_accumulator: 0.0,
            spawn_points,
            spawn_counter: 0,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The locally bound address (useful when binding port 0).
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// Ticks executed so far.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.clock.tick_count()
    }

    /// Live session count.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// The simulated world (read access for tooling).
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Shared stop flag: set it from anywhere to end `run`
    /// cooperatively at the next loop iteration.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Runs until the stop flag is set.
    pub fn run(&mut self) {
        while !self.stop.load(Ordering::Relaxed) {
            self.frame();
            // Yield between frames; ticks are paced by the clock.
            std::thread::sleep(Duration::from_millis(1));
        }
        info!(ticks = self.clock.tick_count(), "server stopped");
    }

    /// Advances by the wall-clock time since the last frame.
    pub fn frame(&mut self) {
        let elapsed = self.clock.begin_frame();
        self.advance(elapsed);
    }

    /// Advances by an explicit elapsed time in seconds. Runs every due
    /// tick, then emits a snapshot if the slower snapshot clock came
    /// due.
    pub fn step(&mut self, elapsed: f32) {
        let accumulated = self.clock.accumulate(elapsed);
        self.advance(accumulated);
    }

    fn advance(&mut self, elapsed: f32) {
        while self.clock.try_tick() {
            self.tick();
        }
        self.snapshot_accumulator += elapsed;
        if self.snapshot_accumulator >= self.snapshot_interval {
            // Snapshots are wholesale state, so a long frame emits one
            // and forfeits the backlog rather than bursting duplicates.
            self.snapshot_accumulator =
                (self.snapshot_accumulator - self.snapshot_interval).min(self.snapshot_interval);
            self.broadcast_snapshot();
        }
    }

    /// One fixed-timestep tick.
    fn tick(&mut self) {
        self.process_network();
        self.apply_inputs();
        self.sweep_timeouts();
        let dt = self.clock.fixed_dt();
        self.scheduler.update(&mut self.world, dt);
    }

    /// Drains every queued inbound datagram before any system runs.
    fn process_network(&mut self) {
        loop {
            let decoded = {
                let Some((data, addr)) = self.transport.recv() else {
                    break;
                };
                match PayloadReader::new(data).deserialize() {
                    Some(packet) => (addr, packet),
                    None => {
                        warn!(%addr, len = data.len(), "discarded malformed packet");
                        continue;
                    }
                }
            };
            self.handle_packet(decoded.0, decoded.1);
        }
    }

    fn handle_packet(&mut self, addr: SocketAddr, packet: Packet) {
        match packet {
            Packet::Connect(_, spawn) => self.handle_connect(addr, spawn),
            Packet::Disconnect(_) => {
                if let Some(session) = self.sessions.remove(&addr) {
                    self.world.destroy(session.entity);
                    info!(%addr, entity = session.entity.id, "session disconnected");
                }
            }
            Packet::Heartbeat(_) => {
                if let Some(session) = self.sessions.get_mut(&addr) {
                    session.touch();
                }
            }
            Packet::Input(_, input) => {
                if let Some(session) = self.sessions.get_mut(&addr) {
                    session.store_input(input);
                    session.touch();
                }
            }
            Packet::ConnectAck(..) | Packet::Snapshot(..) => {
                trace!(%addr, kind = ?packet.kind(), "ignoring server-bound packet");
            }
        }
    }

    fn handle_connect(&mut self, addr: SocketAddr, spawn: Option<Vec2>) {
        if let Some(session) = self.sessions.get(&addr) {
            // Duplicate CONNECT (retry or reordering): re-ack, never
            // spawn a second entity.
            let entity = session.entity;
            debug!(%addr, "duplicate connect, re-acking");
            self.send_connect_ack(addr, entity);
            return;
        }
        if self.sessions.is_full() {
            warn!(%addr, capacity = self.config.max_players, "connect rejected: server full");
            return;
        }

        let position = spawn.unwrap_or_else(|| self.next_spawn_point());
        let half = self.config.player_half();
        let entity = self.world.spawn();
        self.world
            .positions
            .insert(entity.id, Position::new(position.x, position.y));
        self.world.velocities.insert(entity.id, Velocity::default());
        self.world
            .colliders
            .insert(entity.id, Collider::dynamic(half.x, half.y));
        self.world.replicated.insert(entity.id, Replicated);

        self.sessions.insert(addr, entity);
        info!(%addr, entity = entity.id, x = position.x, y = position.y, "session connected");
        self.send_connect_ack(addr, entity);
    }

    /// Deterministic spawn rotation: configured spawn points round-
    /// robin, else a fixed per-count offset.
    fn next_spawn_point(&mut self) -> Vec2 {
        let count = self.spawn_counter;
        self.spawn_counter += 1;
        if self.spawn_points.is_empty() {
            Vec2::new(100.0 + count as f32 * 50.0, 100.0)
        } else {
            self.spawn_points[count % self.spawn_points.len()]
        }
    }

    fn send_connect_ack(&mut self, addr: SocketAddr, entity: tidelock_core::Entity) {
        let header = PacketHeader::new(self.next_sequence(), self.clock.tick_count() as u32);
        if self.writer.serialize_connect_ack(&header, entity) {
            self.transport.send_to(self.writer.as_slice(), addr);
        }
    }

    /// Applies each session's latched input, or zeroes velocity when
    /// nothing arrived this pass: silence means stop.
    fn apply_inputs(&mut self) {
        for session in self.sessions.iter_mut() {
            let Some(velocity) = self.world.velocities.get_mut(session.entity.id) else {
                continue;
            };
            match session.take_input() {
                Some(input) => velocity.value = input.velocity(),
                None => velocity.value = Vec2::ZERO,
            }
        }
    }

    /// Drops sessions whose heartbeat age exceeds the configured
    /// timeout; their entities go through the normal destroy path.
    fn sweep_timeouts(&mut self) {
        let timeout = Duration::from_secs_f32(self.config.connection_timeout_secs);
        for addr in self.sessions.timed_out(timeout) {
            if let Some(session) = self.sessions.remove(&addr) {
                self.world.destroy(session.entity);
                warn!(%addr, entity = session.entity.id, "session timed out");
            }
        }
    }

    /// Serializes the replicated subset once and sends the same bytes
    /// to every session.
    fn broadcast_snapshot(&mut self) {
        if self.sessions.is_empty() {
            return;
        }
        let entities: Vec<(u32, Vec<WireComponent>)> = self
            .world
            .replicated_entities()
            .map(|id| {
                let mut components = Vec::with_capacity(3);
                if let Some(pos) = self.world.positions.get(id) {
                    components.push(WireComponent::Position(pos.value));
                }
                if let Some(vel) = self.world.velocities.get(id) {
                    components.push(WireComponent::Velocity(vel.value));
                }
                if let Some(coll) = self.world.colliders.get(id) {
                    components.push(WireComponent::Collider {
                        half_extents: coll.half_extents,
                        is_static: coll.is_static(),
                        is_trigger: coll.is_trigger(),
                    });
                }
                (id, components)
            })
            .collect();

        let header = PacketHeader::new(self.next_sequence(), self.clock.tick_count() as u32);
        if !write_snapshot(&mut self.writer, &header, &entities) {
            warn!(entities = entities.len(), "snapshot too large, dropped");
            return;
        }
        for session in self.sessions.iter() {
            self.transport.send_to(self.writer.as_slice(), session.addr);
        }
        trace!(entities = entities.len(), bytes = self.writer.len(), "snapshot broadcast");
    }

    fn next_sequence(&mut self) -> u32 {
        self.sequence = self.sequence.wrapping_add(1);
        self.sequence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::InputState;

    fn test_server(map: &MapData) -> GameServer {
        let config = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::default()
        };
        GameServer::new(config, map).unwrap()
    }

    fn peer(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    fn connect_header() -> PacketHeader {
        PacketHeader::new(1, 0)
    }

    #[test]
    fn connect_spawns_one_entity_and_session() {
        let mut server = test_server(&MapData::default());
        server.handle_packet(
            peer(4000),
            Packet::Connect(connect_header(), Some(Vec2::new(2.0, 3.0))),
        );

        assert_eq!(server.session_count(), 1);
        assert_eq!(server.world().entity_count(), 1);
        let entity = server.sessions.get(&peer(4000)).unwrap().entity;
        assert_eq!(
            server.world().positions.get(entity.id).map(|p| p.value),
            Some(Vec2::new(2.0, 3.0))
        );
        assert!(server.world().replicated.contains(entity.id));
    }

    #[test]
    fn duplicate_connect_does_not_respawn() {
        let mut server = test_server(&MapData::default());
        server.handle_packet(peer(4000), Packet::Connect(connect_header(), None));
        server.handle_packet(peer(4000), Packet::Connect(connect_header(), None));

        assert_eq!(server.session_count(), 1);
        assert_eq!(server.world().entity_count(), 1);
    }

    #[test]
    fn connect_beyond_capacity_is_rejected() {
        let config = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            max_players: 1,
            ..ServerConfig::default()
        };
        let mut server = GameServer::new(config, &MapData::default()).unwrap();
        server.handle_packet(peer(4000), Packet::Connect(connect_header(), None));
        server.handle_packet(peer(4001), Packet::Connect(connect_header(), None));

        assert_eq!(server.session_count(), 1);
        assert_eq!(server.world().entity_count(), 1);
    }

    #[test]
    fn fallback_spawns_are_deterministic_offsets() {
        let mut server = test_server(&MapData::default());
        assert_eq!(server.next_spawn_point(), Vec2::new(100.0, 100.0));
        assert_eq!(server.next_spawn_point(), Vec2::new(150.0, 100.0));
        assert_eq!(server.next_spawn_point(), Vec2::new(200.0, 100.0));
    }

    #[test]
    fn silence_means_stop() {
        let mut server = test_server(&MapData::default());
        let addr = peer(4000);
        server.handle_packet(addr, Packet::Connect(connect_header(), Some(Vec2::ZERO)));
        let entity = server.sessions.get(&addr).unwrap().entity;

        // Tick with an input: the entity moves.
        server.handle_packet(addr, Packet::Input(connect_header(), InputState::new(6.0, 0.0)));
        let dt = server.clock.fixed_dt();
        server.step(dt);
        let after_input = server.world().positions.get(entity.id).unwrap().value;
        assert!(after_input.x > 0.0);
        assert_eq!(
            server.world().velocities.get(entity.id).unwrap().value,
            Vec2::new(6.0, 0.0)
        );

        // Tick without input: velocity is explicitly zeroed.
        server.step(dt);
        assert_eq!(
            server.world().velocities.get(entity.id).unwrap().value,
            Vec2::ZERO
        );
        let after_silence = server.world().positions.get(entity.id).unwrap().value;
        assert_eq!(after_silence, after_input);
    }

    #[test]
    fn timed_out_session_releases_its_entity() {
        let config = ServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            connection_timeout_secs: 0.0,
            ..ServerConfig::default()
        };
        let mut server = GameServer::new(config, &MapData::default()).unwrap();
        server.handle_packet(peer(4000), Packet::Connect(connect_header(), None));
        assert_eq!(server.session_count(), 1);

        server.step(server.clock.fixed_dt());
        assert_eq!(server.session_count(), 0);
        assert_eq!(server.world().entity_count(), 0);
    }

    #[test]
    fn map_colliders_are_seeded_as_static_entities() {
        let map: MapData = toml::from_str(
            r#"
            [[colliders]]
            center = [15.0, 15.0]
            half_extents = [5.0, 5.0]
            "#,
        )
        .unwrap();
        let server = test_server(&map);
        assert_eq!(server.world().entity_count(), 1);
        let (id, collider) = server.world().colliders.iter().next().unwrap();
        assert!(collider.is_static());
        assert_eq!(
            server.world().positions.get(id).map(|p| p.value),
            Some(Vec2::new(15.0, 15.0))
        );
        // Walls replicate so clients can learn them from snapshots.
        assert!(server.world().replicated.contains(id));
        let replicated: Vec<u32> = server.world().replicated_entities().collect();
        assert_eq!(replicated, vec![id]);
    }

    #[test]
    fn snapshot_backlog_is_forfeited_not_accumulated() {
        let mut server = test_server(&MapData::default());
        // Frames much longer than the snapshot interval, repeatedly.
        for _ in 0..10 {
            server.step(0.09);
        }
        assert!(server.snapshot_accumulator <= server.snapshot_interval + 1e-6);
    }
}
