//! # Component Types
//!
//! Components are pure data, `Copy`, and form a closed set. Each wire-
//! visible component carries a `u16` tag used by the snapshot codec; the
//! tag namespace is append-only.

use crate::math::Vec2;
use bytemuck::{Pod, Zeroable};

/// Marker trait for components replicable over the wire.
///
/// Components must be `Pod` so the codec can copy them byte-for-byte
/// into packet buffers.
pub trait Component: Copy + Pod + Zeroable + Default + Send + Sync + 'static {
    /// Wire tag for this component type. Append-only namespace.
    const TAG: u16;
}

/// World-space position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Position {
    /// Position in world units.
    pub value: Vec2,
}

impl Component for Position {
    const TAG: u16 = 1;
}

impl Position {
    /// Creates a position.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self {
            value: Vec2::new(x, y),
        }
    }
}

/// Movement in world units per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Velocity {
    /// Velocity in world units per second.
    pub value: Vec2,
}

impl Component for Velocity {
    const TAG: u16 = 2;
}

impl Velocity {
    /// Creates a velocity.
    #[inline]
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self {
            value: Vec2::new(x, y),
        }
    }
}

/// Collision bounds: fixed half-extents around the entity's position.
///
/// `is_static` marks immovable colliders (walls); `is_trigger` marks
/// overlap volumes that never block movement. Flags are stored as bytes
/// so the whole component stays `Pod`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Collider {
    /// Half-extents of the AABB.
    pub half_extents: Vec2,
    is_static: u8,
    is_trigger: u8,
    _padding: [u8; 2],
}

impl Component for Collider {
    const TAG: u16 = 3;
}

impl Collider {
    /// A movable, blocking collider.
    #[inline]
    #[must_use]
    pub const fn dynamic(half_x: f32, half_y: f32) -> Self {
        Self {
            half_extents: Vec2::new(half_x, half_y),
            is_static: 0,
            is_trigger: 0,
            _padding: [0; 2],
        }
    }

    /// An immovable, blocking collider (walls, obstacles).
    #[inline]
    #[must_use]
    pub const fn fixed(half_x: f32, half_y: f32) -> Self {
        Self {
            half_extents: Vec2::new(half_x, half_y),
            is_static: 1,
            is_trigger: 0,
            _padding: [0; 2],
        }
    }

    /// A non-blocking overlap volume.
    #[inline]
    #[must_use]
    pub const fn trigger(half_x: f32, half_y: f32) -> Self {
        Self {
            half_extents: Vec2::new(half_x, half_y),
            is_static: 0,
            is_trigger: 1,
            _padding: [0; 2],
        }
    }

    /// True if this collider never moves.
    #[inline]
    #[must_use]
    pub const fn is_static(&self) -> bool {
        self.is_static != 0
    }

    /// True if this collider detects overlap but never blocks.
    #[inline]
    #[must_use]
    pub const fn is_trigger(&self) -> bool {
        self.is_trigger != 0
    }
}

/// Marker selecting an entity for snapshot replication.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Replicated;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collider_flags() {
        assert!(Collider::fixed(1.0, 1.0).is_static());
        assert!(!Collider::fixed(1.0, 1.0).is_trigger());
        assert!(Collider::trigger(1.0, 1.0).is_trigger());
        assert!(!Collider::dynamic(1.0, 1.0).is_static());
    }

    #[test]
    fn wire_tags_are_distinct() {
        assert_ne!(Position::TAG, Velocity::TAG);
        assert_ne!(Velocity::TAG, Collider::TAG);
    }

    #[test]
    fn component_sizes() {
        assert_eq!(std::mem::size_of::<Position>(), 8);
        assert_eq!(std::mem::size_of::<Velocity>(), 8);
        assert_eq!(std::mem::size_of::<Collider>(), 12);
    }
}
