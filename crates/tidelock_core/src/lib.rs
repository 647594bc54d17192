//! # Tidelock Core
//!
//! Authoritative simulation foundation:
//! - Generation-safe entity registry with id reuse
//! - Sparse-set component storage (dense iteration, O(1) removal)
//! - Priority-ordered system scheduler (collision before movement)
//! - BVH broad phase, MTV narrow phase, world-boundary clamp
//!
//! ## Architecture Rules
//!
//! 1. **The server owns the truth** - clients only mirror it
//! 2. **Rebuild-then-query** - the BVH is transient per tick
//! 3. **Systems never fail** - best-effort clamped state changes only

#![deny(unsafe_code)]
#![deny(clippy::all)]

pub mod ecs;
pub mod math;
pub mod physics;

pub use ecs::{
    Collider, Component, Entity, EntityRegistry, Position, Replicated, Scheduler, SparseSet,
    System, Velocity, World,
};
pub use math::{Aabb, Vec2};
pub use physics::{
    Bvh, CollisionResponse, CollisionSystem, MovementSystem, COLLISION_DAMPING, COLLISION_EPSILON,
};
