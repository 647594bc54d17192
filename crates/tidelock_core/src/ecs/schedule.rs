//! # System Scheduler
//!
//! Systems carry an integer priority; lower runs first. Collision must
//! register at a strictly lower priority than movement so it can veto
//! velocity before integration. That ordering is a convention, not a
//! type-system guarantee.

use super::world::World;

/// Priority used by the collision system.
pub const COLLISION_PRIORITY: i32 = 50;
/// Priority used by the movement integrator.
pub const MOVEMENT_PRIORITY: i32 = 100;

/// A simulation system run once per tick.
///
/// Systems do not signal errors; they make best-effort clamped state
/// changes only.
pub trait System {
    /// Ordering key; lower runs first. Tie order is unspecified.
    fn priority(&self) -> i32;

    /// Advances this system by one fixed timestep.
    fn update(&mut self, world: &mut World, dt: f32);
}

/// Runs registered systems in ascending priority order.
#[derive(Default)]
pub struct Scheduler {
    systems: Vec<Box<dyn System>>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a system and re-sorts by priority.
    pub fn register(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
        self.systems.sort_by_key(|s| s.priority());
    }

    /// Runs every system once, in priority order.
    pub fn update(&mut self, world: &mut World, dt: f32) {
        for system in &mut self.systems {
            system.update(world, dt);
        }
    }

    /// Number of registered systems.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// True if no systems are registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}
