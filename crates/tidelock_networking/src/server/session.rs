//! # Session Table
//!
//! One session per peer address; each owns exactly one entity for its
//! lifetime. Input is latched: consumed once per tick, so a session
//! that sent nothing this pass reads as "stop".

use crate::protocol::InputState;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tidelock_core::Entity;

/// A connected client.
#[derive(Debug)]
pub struct Session {
    /// Peer address, the session key.
    pub addr: SocketAddr,
    /// The one entity this session owns.
    pub entity: Entity,
    /// Wall-clock time of the last heartbeat (or any packet).
    pub last_heartbeat: Instant,
    /// Latest unconsumed input sample.
    last_input: Option<InputState>,
    /// False once teardown has started.
    pub connected: bool,
}

impl Session {
    fn new(addr: SocketAddr, entity: Entity) -> Self {
        Self {
            addr,
            entity,
            last_heartbeat: Instant::now(),
            last_input: None,
            connected: true,
        }
    }

    /// Stores the latest input sample; a newer sample in the same
    /// pass overwrites the older one.
    pub fn store_input(&mut self, input: InputState) {
        self.last_input = Some(input);
    }

    /// Takes the latched input, leaving `None`.
    ///
    /// Called exactly once per tick: silence since the last call means
    /// the entity stops.
    pub fn take_input(&mut self) -> Option<InputState> {
        self.last_input.take()
    }

    /// Refreshes the timeout clock.
    pub fn touch(&mut self) {
        self.last_heartbeat = Instant::now();
    }

    /// True if the heartbeat age exceeds `timeout`.
    #[must_use]
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_heartbeat.elapsed() > timeout
    }
}

/// All live sessions, keyed by peer address.
#[derive(Debug)]
pub struct SessionTable {
    sessions: HashMap<SocketAddr, Session>,
    capacity: usize,
}

impl SessionTable {
    /// Creates a table with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: HashMap::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of live sessions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// True if no sessions exist.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// True if no more sessions can be accepted.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.sessions.len() >= self.capacity
    }

    /// Creates a session for `addr` owning `entity`.
    pub fn insert(&mut self, addr: SocketAddr, entity: Entity) -> &mut Session {
        self.sessions
            .entry(addr)
            .or_insert_with(|| Session::new(addr, entity))
    }

    /// Looks up a session by address.
    #[must_use]
    pub fn get(&self, addr: &SocketAddr) -> Option<&Session> {
        self.sessions.get(addr)
    }

    /// Mutable lookup by address.
    pub fn get_mut(&mut self, addr: &SocketAddr) -> Option<&mut Session> {
        self.sessions.get_mut(addr)
    }

    /// Removes a session, returning it for entity teardown.
    pub fn remove(&mut self, addr: &SocketAddr) -> Option<Session> {
        self.sessions.remove(addr)
    }

    /// Iterates all sessions.
    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    /// Iterates all sessions mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    /// Addresses whose heartbeat age exceeds `timeout`. Evaluated once
    /// per tick by the sweep.
    #[must_use]
    pub fn timed_out(&self, timeout: Duration) -> Vec<SocketAddr> {
        self.sessions
            .values()
            .filter(|s| s.is_timed_out(timeout))
            .map(|s| s.addr)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    #[test]
    fn capacity_is_enforced_by_caller_via_is_full() {
        let mut table = SessionTable::new(2);
        table.insert(addr(1), Entity::new(0, 0));
        assert!(!table.is_full());
        table.insert(addr(2), Entity::new(1, 0));
        assert!(table.is_full());
    }

    #[test]
    fn input_is_latched_and_consumed_once() {
        let mut table = SessionTable::new(4);
        let session = table.insert(addr(1), Entity::new(0, 0));

        session.store_input(InputState::new(1.0, 0.0));
        session.store_input(InputState::new(2.0, 0.0));

        // Latest sample wins; the latch then drains.
        assert_eq!(session.take_input(), Some(InputState::new(2.0, 0.0)));
        assert_eq!(session.take_input(), None);
    }

    #[test]
    fn timeout_sweep_finds_stale_sessions() {
        let mut table = SessionTable::new(4);
        table.insert(addr(1), Entity::new(0, 0));

        assert!(table.timed_out(Duration::from_secs(5)).is_empty());
        assert_eq!(table.timed_out(Duration::ZERO), vec![addr(1)]);
    }

    #[test]
    fn duplicate_insert_keeps_original_entity() {
        let mut table = SessionTable::new(4);
        table.insert(addr(1), Entity::new(0, 0));
        let session = table.insert(addr(1), Entity::new(9, 9));
        assert_eq!(session.entity, Entity::new(0, 0));
        assert_eq!(table.len(), 1);
    }
}
