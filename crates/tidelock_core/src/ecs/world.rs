//! # ECS World
//!
//! The central container: entity registry plus one named sparse set per
//! component type. The server loop is the sole owner during simulation.

use super::component::{Collider, Position, Replicated, Velocity};
use super::entity::{Entity, EntityRegistry};
use super::sparse::SparseSet;
use crate::math::Aabb;

/// Container for all simulation state.
///
/// Component storages are public: systems iterate them directly by
/// entity id. Generation checks happen at the `Entity`-taking API edges.
#[derive(Debug, Default)]
pub struct World {
    registry: EntityRegistry,

    // =========================================================================
    // Component Storages - Add new component types here
    // =========================================================================
    /// Position storage.
    pub positions: SparseSet<Position>,
    /// Velocity storage.
    pub velocities: SparseSet<Velocity>,
    /// Collider storage.
    pub colliders: SparseSet<Collider>,
    /// Replication marker storage.
    pub replicated: SparseSet<Replicated>,
}

impl World {
    /// Creates an empty world.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    /// Spawns a new entity with no components.
    #[inline]
    pub fn spawn(&mut self) -> Entity {
        self.registry.create()
    }

    /// Destroys an entity and removes all of its components.
    ///
    /// Stale or already-destroyed handles are a no-op.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.registry.destroy(entity) {
            return false;
        }
        self.positions.remove(entity.id);
        self.velocities.remove(entity.id);
        self.colliders.remove(entity.id);
        self.replicated.remove(entity.id);
        true
    }

    /// True if the handle refers to a live entity.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.registry.is_alive(entity)
    }

    /// Position of a live entity, or `None` for stale handles.
    #[inline]
    #[must_use]
    pub fn position_of(&self, entity: Entity) -> Option<&Position> {
        if !self.registry.is_alive(entity) {
            return None;
        }
        self.positions.get(entity.id)
    }

    /// Mutable velocity of a live entity, or `None` for stale handles.
    #[inline]
    pub fn velocity_of_mut(&mut self, entity: Entity) -> Option<&mut Velocity> {
        if !self.registry.is_alive(entity) {
            return None;
        }
        self.velocities.get_mut(entity.id)
    }

    /// Current AABB of an entity holding position + collider.
    #[inline]
    #[must_use]
    pub fn bounds_of(&self, id: u32) -> Option<Aabb> {
        let pos = self.positions.get(id)?;
        let coll = self.colliders.get(id)?;
        Some(Aabb::from_center(pos.value, coll.half_extents))
    }

    /// Ids of entities holding both position and collider, in the
    /// colliders' dense order.
    pub fn physics_entities(&self) -> impl Iterator<Item = u32> + '_ {
        self.colliders
            .iter()
            .map(|(id, _)| id)
            .filter(|&id| self.positions.contains(id))
    }

    /// Ids of replicated entities that have a position, in the marker
    /// storage's dense order.
    pub fn replicated_entities(&self) -> impl Iterator<Item = u32> + '_ {
        self.replicated
            .iter()
            .map(|(id, _)| id)
            .filter(|&id| self.positions.contains(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;

    #[test]
    fn spawn_destroy_clears_components() {
        let mut world = World::new();
        let e = world.spawn();
        world.positions.insert(e.id, Position::new(1.0, 2.0));
        world.velocities.insert(e.id, Velocity::new(3.0, 4.0));

        assert!(world.destroy(e));
        assert!(!world.is_alive(e));
        assert!(!world.positions.contains(e.id));
        assert!(!world.velocities.contains(e.id));
    }

    #[test]
    fn stale_handle_reports_absence() {
        let mut world = World::new();
        let a = world.spawn();
        world.positions.insert(a.id, Position::new(1.0, 1.0));
        world.destroy(a);

        // Slot reused by a new entity.
        let b = world.spawn();
        world.positions.insert(b.id, Position::new(9.0, 9.0));
        assert_eq!(b.id, a.id);

        assert!(world.position_of(a).is_none());
        assert_eq!(
            world.position_of(b).map(|p| p.value),
            Some(Vec2::new(9.0, 9.0))
        );
    }

    #[test]
    fn physics_query_needs_both_components() {
        let mut world = World::new();
        let with_both = world.spawn();
        world.positions.insert(with_both.id, Position::new(0.0, 0.0));
        world.colliders.insert(with_both.id, Collider::dynamic(0.5, 0.5));

        let collider_only = world.spawn();
        world
            .colliders
            .insert(collider_only.id, Collider::fixed(1.0, 1.0));

        let ids: Vec<u32> = world.physics_entities().collect();
        assert_eq!(ids, vec![with_both.id]);
    }

    #[test]
    fn bounds_from_position_and_half_extents() {
        let mut world = World::new();
        let e = world.spawn();
        world.positions.insert(e.id, Position::new(5.0, 5.0));
        world.colliders.insert(e.id, Collider::dynamic(1.0, 2.0));

        let bounds = world.bounds_of(e.id).unwrap();
        assert_eq!(bounds.min, Vec2::new(4.0, 3.0));
        assert_eq!(bounds.max, Vec2::new(6.0, 7.0));
    }
}
