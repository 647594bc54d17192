//! # Collision Resolution
//!
//! Broad phase over a per-tick BVH of projected bounds, MTV narrow
//! phase, world-boundary clamp. Two response modes share the pipeline:
//! push-out (correct position, deflect velocity) and the server's
//! velocity veto (zero the blocked axis, let the movement integrator
//! run right after).

use super::bvh::Bvh;
use crate::ecs::schedule::{System, COLLISION_PRIORITY};
use crate::ecs::world::World;
use crate::math::{Aabb, Vec2};

/// Push-out margin to keep resolved bounds from re-penetrating due to
/// floating point error.
pub const COLLISION_EPSILON: f32 = 0.01;

/// Velocity damping applied after a resolution, against jitter.
pub const COLLISION_DAMPING: f32 = 0.8;

/// Below this speed an entity is treated as stationary.
const SPEED_THRESHOLD: f32 = 1e-3;

/// A trigger volume overlap observed during the last update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TriggerOverlap {
    /// The moving entity.
    pub entity: u32,
    /// The trigger it overlapped.
    pub trigger: u32,
}

/// Minimum translation pushing `bounds` out of `other`, along the axis
/// of smaller overlap, padded by [`COLLISION_EPSILON`].
///
/// Coincident centers have no meaningful overlap axis; the fallback
/// pushes along +X scaled by the summed half-extents.
#[must_use]
pub fn mtv_correction(bounds: &Aabb, other: &Aabb) -> Vec2 {
    let delta = bounds.center() - other.center();
    if delta.length() <= 1e-3 {
        let magnitude =
            bounds.half_extents().length() + other.half_extents().length() + COLLISION_EPSILON;
        return Vec2::new(magnitude, 0.0);
    }

    let overlap_x = bounds.overlap_x(other);
    let overlap_y = bounds.overlap_y(other);
    if overlap_x < overlap_y {
        let push = overlap_x + COLLISION_EPSILON;
        Vec2::new(if delta.x < 0.0 { -push } else { push }, 0.0)
    } else {
        let push = overlap_y + COLLISION_EPSILON;
        Vec2::new(0.0, if delta.y < 0.0 { -push } else { push })
    }
}

/// Removes the velocity component parallel to `correction` (projected
/// out via dot product) and damps the remainder.
#[must_use]
pub fn deflect_velocity(vel: Vec2, correction: Vec2) -> Vec2 {
    let dir = correction.normalized();
    let along = dir * vel.dot(dir);
    (vel - along) * COLLISION_DAMPING
}

/// How the resolver responds to a detected collision.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CollisionResponse {
    /// Move the position out along the MTV and deflect velocity.
    PushOut,
    /// Zero the velocity on the blocked axis and leave position alone;
    /// the movement integrator runs immediately after and simply will
    /// not advance into the obstacle.
    VetoVelocity,
}

/// Collision system. Registers at priority [`COLLISION_PRIORITY`],
/// strictly before movement.
pub struct CollisionSystem {
    bvh: Bvh,
    response: CollisionResponse,
    world_bounds: Option<Aabb>,
    scratch: Vec<(u32, Aabb)>,
    hits: Vec<u32>,
    trigger_overlaps: Vec<TriggerOverlap>,
}

impl CollisionSystem {
    /// Creates a resolver with the given response mode and no world
    /// boundary.
    #[must_use]
    pub fn new(response: CollisionResponse) -> Self {
        Self {
            bvh: Bvh::new(),
            response,
            world_bounds: None,
            scratch: Vec::new(),
            hits: Vec::new(),
            trigger_overlaps: Vec::new(),
        }
    }

    /// Clamps all physics entities so their half-extents stay inside
    /// `bounds`.
    #[must_use]
    pub fn with_world_bounds(mut self, bounds: Aabb) -> Self {
        self.world_bounds = Some(bounds);
        self
    }

    /// Trigger overlaps observed during the most recent update.
    #[must_use]
    pub fn trigger_overlaps(&self) -> &[TriggerOverlap] {
        &self.trigger_overlaps
    }

    fn clamp_to_world_bounds(&self, world: &mut World) {
        let Some(bounds) = self.world_bounds else {
            return;
        };
        for (id, coll) in world.colliders.iter() {
            let Some(pos) = world.positions.get_mut(id) else {
                continue;
            };
            let half = coll.half_extents;
            pos.value.x = pos
                .value
                .x
                .clamp(bounds.min.x + half.x, bounds.max.x - half.x);
            pos.value.y = pos
                .value
                .y
                .clamp(bounds.min.y + half.y, bounds.max.y - half.y);
        }
    }
}

impl System for CollisionSystem {
    fn priority(&self) -> i32 {
        COLLISION_PRIORITY
    }

    fn update(&mut self, world: &mut World, dt: f32) {
        self.trigger_overlaps.clear();

        // Rebuild: current AABB of everything with position + collider.
        self.scratch.clear();
        for id in world.physics_entities() {
            if let Some(bounds) = world.bounds_of(id) {
                self.scratch.push((id, bounds));
            }
        }
        self.bvh.build(&self.scratch);

        // Dynamic movers only.
        let movers: Vec<(u32, Vec2)> = self
            .scratch
            .iter()
            .filter_map(|&(id, _)| {
                let coll = world.colliders.get(id)?;
                if coll.is_static() || coll.is_trigger() {
                    return None;
                }
                let vel = world.velocities.get(id)?.value;
                if vel.length() <= SPEED_THRESHOLD {
                    return None;
                }
                Some((id, vel))
            })
            .collect();

        for (id, vel) in movers {
            let Some(bounds) = world.bounds_of(id) else {
                continue;
            };
            let step = vel * dt;
            let projected = bounds.translated(step);

            // Broad phase: current and next-tick bounds together.
            self.bvh.query(&bounds.union(&projected), &mut self.hits);

            let mut correction = Vec2::ZERO;
            let mut block_x = false;
            let mut block_y = false;
            for &other_id in &self.hits {
                if other_id == id {
                    continue;
                }
                let Some(other_coll) = world.colliders.get(other_id) else {
                    continue;
                };
                let Some(other_bounds) = world.bounds_of(other_id) else {
                    continue;
                };
                if other_coll.is_trigger() {
                    if projected.intersects(&other_bounds) {
                        self.trigger_overlaps.push(TriggerOverlap {
                            entity: id,
                            trigger: other_id,
                        });
                    }
                    continue;
                }

                match self.response {
                    CollisionResponse::PushOut => {
                        if bounds.intersects(&other_bounds) {
                            correction += mtv_correction(&bounds, &other_bounds);
                        }
                    }
                    CollisionResponse::VetoVelocity => {
                        if !projected.intersects(&other_bounds) {
                            continue;
                        }
                        // Test each axis of motion separately so the
                        // entity can still slide along the free axis.
                        let x_hit = bounds
                            .translated(Vec2::new(step.x, 0.0))
                            .intersects(&other_bounds);
                        let y_hit = bounds
                            .translated(Vec2::new(0.0, step.y))
                            .intersects(&other_bounds);
                        if x_hit {
                            block_x = true;
                        }
                        if y_hit {
                            block_y = true;
                        }
                        if !x_hit && !y_hit {
                            // Corner case: only the diagonal penetrates.
                            block_x = true;
                            block_y = true;
                        }
                    }
                }
            }

            match self.response {
                CollisionResponse::PushOut => {
                    if correction != Vec2::ZERO {
                        if let Some(pos) = world.positions.get_mut(id) {
                            pos.value += correction;
                        }
                        if let Some(v) = world.velocities.get_mut(id) {
                            v.value = deflect_velocity(v.value, correction);
                        }
                    }
                }
                CollisionResponse::VetoVelocity => {
                    if block_x || block_y {
                        if let Some(v) = world.velocities.get_mut(id) {
                            if block_x {
                                v.value.x = 0.0;
                            }
                            if block_y {
                                v.value.y = 0.0;
                            }
                        }
                    }
                }
            }
        }

        self.clamp_to_world_bounds(world);
    }
}
