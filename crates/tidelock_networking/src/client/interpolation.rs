//! # Snapshot Interpolation
//!
//! Remote entities render between the last two snapshot positions
//! instead of teleporting on arrival. The interpolant runs on local
//! frame time and clamps at the newest snapshot when the next one is
//! late.

use tidelock_core::Vec2;

/// Blends an entity's position between its two most recent snapshots.
#[derive(Clone, Copy, Debug)]
pub struct SnapshotInterpolator {
    prev: Vec2,
    curr: Vec2,
    snapshot_interval: f32,
    time_since_snapshot: f32,
}

impl SnapshotInterpolator {
    /// Creates an interpolator seeded at `position` (both endpoints),
    /// expecting snapshots every `snapshot_interval` seconds.
    #[must_use]
    pub const fn new(position: Vec2, snapshot_interval: f32) -> Self {
        Self {
            prev: position,
            curr: position,
            snapshot_interval,
            time_since_snapshot: 0.0,
        }
    }

    /// Feeds a fresh snapshot position: the previous target becomes
    /// the blend origin and the clock restarts.
    pub fn push(&mut self, position: Vec2) {
        self.prev = self.curr;
        self.curr = position;
        self.time_since_snapshot = 0.0;
    }

    /// Advances local frame time.
    pub fn advance(&mut self, dt: f32) {
        self.time_since_snapshot += dt;
    }

    /// The blended position at the current local time.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        if self.snapshot_interval <= 0.0 {
            return self.curr;
        }
        let t = (self.time_since_snapshot / self.snapshot_interval).clamp(0.0, 1.0);
        self.prev + (self.curr - self.prev) * t
    }

    /// The newest snapshot position, unblended.
    #[inline]
    #[must_use]
    pub const fn target(&self) -> Vec2 {
        self.curr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blends_halfway_at_half_the_interval() {
        let mut interp = SnapshotInterpolator::new(Vec2::ZERO, 0.1);
        interp.push(Vec2::new(10.0, 0.0));
        interp.advance(0.05);
        assert_eq!(interp.position(), Vec2::new(5.0, 0.0));
    }

    #[test]
    fn clamps_at_the_newest_snapshot() {
        let mut interp = SnapshotInterpolator::new(Vec2::ZERO, 0.1);
        interp.push(Vec2::new(10.0, 0.0));
        interp.advance(0.5);
        assert_eq!(interp.position(), Vec2::new(10.0, 0.0));
    }

    #[test]
    fn push_rotates_the_endpoints() {
        let mut interp = SnapshotInterpolator::new(Vec2::ZERO, 0.1);
        interp.push(Vec2::new(4.0, 0.0));
        interp.push(Vec2::new(8.0, 0.0));
        // Clock restarted: we are back at the blend origin.
        assert_eq!(interp.position(), Vec2::new(4.0, 0.0));
        interp.advance(0.1);
        assert_eq!(interp.position(), Vec2::new(8.0, 0.0));
    }
}
