//! Movement integration: the last word on position each tick.

use crate::ecs::schedule::{System, MOVEMENT_PRIORITY};
use crate::ecs::world::World;

/// Integrates `position += velocity * dt` for every entity holding
/// both. Runs at priority [`MOVEMENT_PRIORITY`], strictly after
/// collision, so a vetoed axis simply does not advance.
#[derive(Debug, Default)]
pub struct MovementSystem;

impl MovementSystem {
    /// Creates the integrator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl System for MovementSystem {
    fn priority(&self) -> i32 {
        MOVEMENT_PRIORITY
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        for (id, vel) in world.velocities.iter() {
            if let Some(pos) = world.positions.get_mut(id) {
                pos.value += vel.value * dt;
            }
        }
    }
}
