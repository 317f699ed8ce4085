use std::time::{Duration, Instant};

use crate::paint::Color;

/// Parameters of the animated clear color.
///
/// Every elapsed `step` subtracts `decay_per_step` from each color channel of
/// `initial` (alpha excluded) until it reaches zero.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorAnimation {
    pub initial: Color,
    pub decay_per_step: f32,
    pub step: Duration,
}

impl Default for ColorAnimation {
    fn default() -> Self {
        Self {
            initial: Color::rgba(0.0, 0.2, 0.4, 1.0),
            decay_per_step: 0.005,
            step: Duration::from_millis(100),
        }
    }
}

/// Clear color after `steps` decay steps.
///
/// Monotonically non-increasing per channel and always within `[0, 1]`.
pub fn color_at(animation: &ColorAnimation, steps: u32) -> Color {
    let decay = animation.decay_per_step.max(0.0) * steps as f32;
    let i = animation.initial.clamped();
    Color::rgba(
        (i.r - decay).max(0.0),
        (i.g - decay).max(0.0),
        (i.b - decay).max(0.0),
        i.a,
    )
}

/// Time-gated animation clock.
///
/// Steps advance only when a whole `step` interval has elapsed since the last
/// tick, independent of frame rate. The tick baseline moves by whole intervals
/// so step boundaries stay aligned to the starting instant.
#[derive(Debug, Clone)]
pub struct ClockState {
    animation: ColorAnimation,
    last_tick: Instant,
    steps: u32,
}

impl ClockState {
    pub fn new(animation: ColorAnimation) -> Self {
        Self::starting_at(animation, Instant::now())
    }

    pub fn starting_at(animation: ColorAnimation, now: Instant) -> Self {
        Self {
            animation,
            last_tick: now,
            steps: 0,
        }
    }

    pub fn animation(&self) -> &ColorAnimation {
        &self.animation
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn last_tick(&self) -> Instant {
        self.last_tick
    }

    /// Restarts the animation from its initial color.
    pub fn reset(&mut self) {
        self.last_tick = Instant::now();
        self.steps = 0;
    }

    /// Advances from wall time; returns the step count.
    pub fn advance(&mut self) -> u32 {
        self.advance_to(Instant::now())
    }

    /// Advances to `now`; returns the step count.
    pub fn advance_to(&mut self, now: Instant) -> u32 {
        let step = self.animation.step.max(Duration::from_millis(1));
        let elapsed = now.saturating_duration_since(self.last_tick);
        if elapsed < step {
            return self.steps;
        }

        let whole = elapsed.as_nanos() / step.as_nanos();
        let whole = u32::try_from(whole).unwrap_or(u32::MAX);
        self.steps = self.steps.saturating_add(whole);
        self.last_tick += step * whole;
        self.steps
    }

    /// Current clear color.
    pub fn color(&self) -> Color {
        color_at(&self.animation, self.steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn same_interval_yields_identical_color() {
        let t0 = Instant::now();
        let mut clock = ClockState::starting_at(ColorAnimation::default(), t0);

        clock.advance_to(t0 + ms(10));
        let a = clock.color();
        clock.advance_to(t0 + ms(99));
        let b = clock.color();

        assert_eq!(a, b);
        assert_eq!(clock.steps(), 0);
    }

    #[test]
    fn adjacent_intervals_differ_by_one_step() {
        let anim = ColorAnimation::default();
        let t0 = Instant::now();
        let mut clock = ClockState::starting_at(anim, t0);

        clock.advance_to(t0 + ms(150));
        let a = clock.color();
        clock.advance_to(t0 + ms(250));
        let b = clock.color();

        assert_eq!(clock.steps(), 2);
        assert!((a.b - b.b - anim.decay_per_step).abs() < EPS);
        assert!((a.g - b.g - anim.decay_per_step).abs() < EPS);
        assert_eq!(a.a, b.a);
    }

    #[test]
    fn boundaries_stay_aligned_to_start() {
        let t0 = Instant::now();
        let mut clock = ClockState::starting_at(ColorAnimation::default(), t0);

        assert_eq!(clock.advance_to(t0 + ms(130)), 1);
        // 130ms → 199ms is still the second interval.
        assert_eq!(clock.advance_to(t0 + ms(199)), 1);
        assert_eq!(clock.advance_to(t0 + ms(200)), 2);
    }

    #[test]
    fn stall_catches_up_whole_intervals() {
        let t0 = Instant::now();
        let mut clock = ClockState::starting_at(ColorAnimation::default(), t0);
        assert_eq!(clock.advance_to(t0 + ms(1_050)), 10);
    }

    #[test]
    fn time_going_backwards_is_ignored() {
        let t0 = Instant::now() + ms(500);
        let mut clock = ClockState::starting_at(ColorAnimation::default(), t0);
        assert_eq!(clock.advance_to(t0 - ms(200)), 0);
    }

    #[test]
    fn color_is_monotonic_and_in_range() {
        let anim = ColorAnimation {
            initial: Color::rgba(0.9, 0.5, 0.1, 1.0),
            decay_per_step: 0.03,
            step: ms(100),
        };

        let mut prev = color_at(&anim, 0);
        assert_eq!(prev, anim.initial);
        for steps in 1..200 {
            let c = color_at(&anim, steps);
            assert!(c.in_range(), "out of range at step {steps}: {c:?}");
            assert!(c.r <= prev.r && c.g <= prev.g && c.b <= prev.b);
            prev = c;
        }
        assert_eq!(prev, Color::rgba(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn out_of_range_initial_is_clamped() {
        let anim = ColorAnimation {
            initial: Color::rgba(2.0, -1.0, 0.5, 3.0),
            ..ColorAnimation::default()
        };
        assert!(color_at(&anim, 0).in_range());
        assert!(color_at(&anim, u32::MAX).in_range());
    }

    #[test]
    fn reset_restores_initial_color() {
        let anim = ColorAnimation::default();
        let t0 = Instant::now();
        let mut clock = ClockState::starting_at(anim, t0);
        clock.advance_to(t0 + ms(500));
        assert_ne!(clock.color(), anim.initial);

        clock.reset();
        assert_eq!(clock.steps(), 0);
        assert_eq!(clock.color(), anim.initial);
    }
}
