//! # Fixed-Timestep Clock
//!
//! Accumulator-driven tick pacing. Frame time is clamped before
//! accumulation so a stall cannot snowball into an ever-growing tick
//! backlog (the spiral of death); absent clamping, the tick count for
//! N seconds of frames is exactly `floor(N / fixed_dt)` regardless of
//! how the frames were sliced.

use std::time::Instant;

/// Longest frame the accumulator will accept, in seconds.
pub const MAX_FRAME_TIME: f32 = 0.1;

/// Fixed-timestep accumulator clock.
#[derive(Debug)]
pub struct TickClock {
    fixed_dt: f32,
    accumulator: f32,
    tick_count: u64,
    last_frame: Instant,
}

impl TickClock {
    /// Creates a clock ticking at `tick_rate` Hz.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        Self {
            fixed_dt: 1.0 / tick_rate.max(1) as f32,
            accumulator: 0.0,
            tick_count: 0,
            last_frame: Instant::now(),
        }
    }

    /// The fixed timestep in seconds.
    #[inline]
    #[must_use]
    pub const fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Ticks executed so far.
    #[inline]
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Measures the wall-clock frame since the last call and feeds it
    /// to the accumulator. Returns the clamped elapsed seconds.
    pub fn begin_frame(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.accumulate(elapsed)
    }

    /// Feeds elapsed seconds to the accumulator, clamped to
    /// [`MAX_FRAME_TIME`]. Returns the amount actually accumulated.
    pub fn accumulate(&mut self, elapsed: f32) -> f32 {
        let clamped = elapsed.min(MAX_FRAME_TIME);
        self.accumulator += clamped;
        clamped
    }

    /// Consumes one fixed timestep if the accumulator holds one.
    ///
    /// Call in a loop: `while clock.try_tick() { step() }`.
    pub fn try_tick(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            self.tick_count += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(clock: &mut TickClock) -> u64 {
        let mut ticks = 0;
        while clock.try_tick() {
            ticks += 1;
        }
        ticks
    }

    #[test]
    fn tick_count_is_floor_of_elapsed_over_dt() {
        let mut clock = TickClock::new(60);
        // 2.5 simulated seconds delivered in irregular sub-clamp slices.
        let frames = [0.013, 0.04, 0.002, 0.09, 0.055];
        let mut total = 0.0f32;
        let mut ticks = 0u64;
        while total < 2.5 {
            for &frame in &frames {
                if total >= 2.5 {
                    break;
                }
                clock.accumulate(frame);
                total += frame;
                ticks += drain(&mut clock);
            }
        }
        let expected = (total / clock.fixed_dt()).floor() as u64;
        assert_eq!(ticks, expected);
        assert_eq!(clock.tick_count(), expected);
    }

    #[test]
    fn identical_totals_give_identical_tick_counts() {
        // Same elapsed time, different frame slicing: same tick count.
        let mut a = TickClock::new(60);
        let mut b = TickClock::new(60);

        // 1.205 s total, chosen well clear of a tick boundary.
        let mut ticks_a = 0;
        for _ in 0..100 {
            a.accumulate(0.01205);
            ticks_a += drain(&mut a);
        }
        let mut ticks_b = 0;
        for _ in 0..20 {
            b.accumulate(0.06025);
            ticks_b += drain(&mut b);
        }
        assert_eq!(ticks_a, ticks_b);
        assert_eq!(ticks_a, 72);
    }

    #[test]
    fn stall_is_clamped_to_max_frame_time() {
        let mut clock = TickClock::new(60);
        let accumulated = clock.accumulate(3.0);
        assert!((accumulated - MAX_FRAME_TIME).abs() < f32::EPSILON);
        // A 3 second stall produces at most a tenth of a second of
        // catch-up ticks.
        assert_eq!(drain(&mut clock), 6);
    }

    #[test]
    fn no_tick_until_a_full_step_accumulates() {
        let mut clock = TickClock::new(60);
        clock.accumulate(0.01);
        assert!(!clock.try_tick());
        clock.accumulate(0.01);
        assert!(clock.try_tick());
        assert!(!clock.try_tick());
    }
}
