//! # Entity Component System
//!
//! Generation-safe entities, one sparse set per component type, and a
//! priority-ordered scheduler. Component types form a closed set known
//! at compile time; each carries a small integer wire tag.

pub mod component;
pub mod entity;
pub mod schedule;
pub mod sparse;
pub mod world;

pub use component::{Collider, Component, Position, Replicated, Velocity};
pub use entity::{Entity, EntityRegistry};
pub use schedule::{Scheduler, System};
pub use sparse::SparseSet;
pub use world::World;
