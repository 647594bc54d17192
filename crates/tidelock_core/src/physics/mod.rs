//! # Physics
//!
//! Rebuild-then-query collision, executed every tick:
//! BVH broad phase over projected bounds, MTV narrow phase, and a
//! world-boundary clamp. The server-authoritative variant zeroes
//! velocity and leaves integration to the movement system.

pub mod bvh;
pub mod collision;
pub mod movement;

pub use bvh::Bvh;
pub use collision::{
    deflect_velocity, mtv_correction, CollisionResponse, CollisionSystem, TriggerOverlap,
    COLLISION_DAMPING, COLLISION_EPSILON,
};
pub use movement::MovementSystem;
