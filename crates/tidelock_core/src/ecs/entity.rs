//! # Entity Registry
//!
//! Entities are `{id, generation}` pairs. Destroyed ids go on a free list
//! and are handed out again with a bumped generation, so a stale handle
//! held across destroy/reuse can never alias the new entity.

use bytemuck::{Pod, Zeroable};

/// A handle to an entity.
///
/// The generation is bumped when the id is *reused*, not when the entity
/// is destroyed. Validity checks always compare against the registry's
/// current stored generation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(C)]
pub struct Entity {
    /// Slot index, reused after destroy.
    pub id: u32,
    /// Reuse counter for this slot.
    pub generation: u32,
}

impl Entity {
    /// Creates a handle from raw parts (e.g. decoded from the wire).
    #[inline]
    #[must_use]
    pub const fn new(id: u32, generation: u32) -> Self {
        Self { id, generation }
    }
}

/// Allocates and recycles entity ids.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    /// Current generation per allocated id.
    generations: Vec<u32>,
    /// Whether the slot currently holds a live entity.
    alive: Vec<bool>,
    /// Destroyed ids awaiting reuse.
    free_ids: Vec<u32>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.generations.len() - self.free_ids.len()
    }

    /// True if no entities are alive.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Creates an entity, reusing a freed id if one exists.
    ///
    /// Reuse bumps the stored generation, invalidating any handle that
    /// still refers to the slot's previous occupant.
    pub fn create(&mut self) -> Entity {
        if let Some(id) = self.free_ids.pop() {
            let slot = id as usize;
            let generation = self.generations[slot].wrapping_add(1);
            self.generations[slot] = generation;
            self.alive[slot] = true;
            Entity { id, generation }
        } else {
            let id = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            Entity { id, generation: 0 }
        }
    }

    /// Destroys an entity, returning its id to the free list.
    ///
    /// Destroying an invalid or already-destroyed entity is a no-op.
    /// Returns whether anything was destroyed.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        let slot = entity.id as usize;
        if !self.is_valid(entity) || !self.alive[slot] {
            return false;
        }
        self.alive[slot] = false;
        self.free_ids.push(entity.id);
        true
    }

    /// True if the handle's generation matches the slot's current one.
    ///
    /// A destroyed-but-not-yet-reused id still validates here; callers
    /// that need liveness should consult component presence instead.
    #[inline]
    #[must_use]
    pub fn is_valid(&self, entity: Entity) -> bool {
        match self.generations.get(entity.id as usize) {
            Some(&generation) => generation == entity.generation,
            None => false,
        }
    }

    /// True if the slot currently holds a live entity with this generation.
    #[inline]
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.is_valid(entity) && self.alive[entity.id as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_ids_are_sequential_generation_zero() {
        let mut registry = EntityRegistry::new();
        let a = registry.create();
        let b = registry.create();
        assert_eq!(a, Entity::new(0, 0));
        assert_eq!(b, Entity::new(1, 0));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn reuse_bumps_generation_and_invalidates_old_handle() {
        let mut registry = EntityRegistry::new();
        let a = registry.create();
        assert!(registry.destroy(a));

        let b = registry.create();
        assert_eq!(b.id, a.id);
        assert_eq!(b.generation, a.generation + 1);
        assert!(!registry.is_valid(a));
        assert!(registry.is_valid(b));
    }

    #[test]
    fn generation_unchanged_until_reuse() {
        let mut registry = EntityRegistry::new();
        let a = registry.create();
        registry.destroy(a);
        // Not yet reused: the stored generation still matches.
        assert!(registry.is_valid(a));
        assert!(!registry.is_alive(a));
    }

    #[test]
    fn double_destroy_is_noop() {
        let mut registry = EntityRegistry::new();
        let a = registry.create();
        assert!(registry.destroy(a));
        assert!(!registry.destroy(a));
        // Only one reuse of the slot.
        let b = registry.create();
        let c = registry.create();
        assert_eq!(b.id, a.id);
        assert_ne!(c.id, a.id);
    }

    #[test]
    fn destroy_stale_handle_is_noop() {
        let mut registry = EntityRegistry::new();
        let a = registry.create();
        registry.destroy(a);
        let b = registry.create();
        // Stale handle to the reused slot must not destroy the new entity.
        assert!(!registry.destroy(a));
        assert!(registry.is_alive(b));
    }

    #[test]
    fn out_of_range_id_is_invalid() {
        let registry = EntityRegistry::new();
        assert!(!registry.is_valid(Entity::new(42, 0)));
    }
}
