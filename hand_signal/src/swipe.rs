//! Horizontal swipe detection on the wrist track of an open hand.
//!
//! Tracking starts when five fingers are first seen.  A swipe fires when the
//! wrist has travelled far enough *and* fast enough since the window origin;
//! the window restarts after every swipe and after `window` seconds without
//! one, so slow drift never accumulates into a false swipe.

use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SwipeParams {
    /// Horizontal displacement (normalized image units).
    pub min_distance: f32,
    /// Average horizontal speed over the window (units / s).
    pub min_velocity: f32,
    /// Seconds before an unfinished window restarts at the current position.
    pub window: f64,
    /// Seconds after a swipe during which no further swipe fires.
    pub cooldown: f64,
}

impl Default for SwipeParams {
    fn default() -> Self {
        SwipeParams {
            min_distance: 0.15,
            min_velocity: 0.5,
            window: 1.5,
            cooldown: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

#[derive(Clone, Debug)]
pub struct SwipeTracker {
    params: SwipeParams,
    /// Window origin: (wrist x, timestamp).
    origin: Option<(f32, f64)>,
    last_swipe: Option<f64>,
}

impl SwipeTracker {
    pub fn new(params: SwipeParams) -> Self {
        SwipeTracker {
            params,
            origin: None,
            last_swipe: None,
        }
    }

    /// Feed the wrist x of an open hand at time `t`.
    pub fn update(&mut self, x: f32, t: f64) -> Option<SwipeDirection> {
        let (x0, t0) = *self.origin.get_or_insert((x, t));
        let elapsed = t - t0;

        if elapsed > self.params.window {
            self.origin = Some((x, t));
            return None;
        }

        let dx = x - x0;
        if dx.abs() <= self.params.min_distance || elapsed <= 0.0 {
            return None;
        }
        if (dx.abs() as f64 / elapsed) < self.params.min_velocity as f64 {
            return None;
        }

        self.origin = Some((x, t));
        let cooling = self
            .last_swipe
            .is_some_and(|last| t - last < self.params.cooldown);
        if cooling {
            return None;
        }
        self.last_swipe = Some(t);
        Some(if dx > 0.0 { SwipeDirection::Right } else { SwipeDirection::Left })
    }

    /// Forget the current window (the open hand went away).  The cooldown
    /// survives.
    pub fn reset(&mut self) {
        self.origin = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sweep(tracker: &mut SwipeTracker, from: f32, step: f32, t0: f64, frames: usize) -> Vec<SwipeDirection> {
        (0..frames)
            .filter_map(|i| tracker.update(from + step * i as f32, t0 + i as f64 * 0.05))
            .collect()
    }

    #[test]
    fn fast_right_motion_fires_once() {
        let mut t = SwipeTracker::new(SwipeParams::default());
        let events = sweep(&mut t, 0.3, 0.05, 0.0, 6);
        assert_eq!(events, vec![SwipeDirection::Right]);
    }

    #[test]
    fn repeat_within_cooldown_is_suppressed() {
        let mut t = SwipeTracker::new(SwipeParams::default());
        let mut events = sweep(&mut t, 0.3, 0.05, 0.0, 6);
        // jump back and repeat the same motion, still inside the 1 s cooldown
        events.extend(sweep(&mut t, 0.3, 0.05, 0.3, 6));
        assert_eq!(events, vec![SwipeDirection::Right]);
    }

    #[test]
    fn fires_again_after_cooldown() {
        let mut t = SwipeTracker::new(SwipeParams::default());
        let first = sweep(&mut t, 0.3, 0.05, 0.0, 6);
        t.reset();
        let second = sweep(&mut t, 0.7, -0.05, 2.0, 6);
        assert_eq!(first, vec![SwipeDirection::Right]);
        assert_eq!(second, vec![SwipeDirection::Left]);
    }

    #[test]
    fn slow_drift_never_fires() {
        let mut t = SwipeTracker::new(SwipeParams::default());
        // 0.004 per 50 ms = 0.08 units/s, well under the speed floor
        let events = sweep(&mut t, 0.1, 0.004, 0.0, 200);
        assert!(events.is_empty());
    }

    #[test]
    fn window_restarts_after_timeout() {
        let mut t = SwipeTracker::new(SwipeParams::default());
        assert_eq!(t.update(0.3, 0.0), None);
        // 2 s later: window expired, origin moves to 0.5 instead of firing
        assert_eq!(t.update(0.5, 2.0), None);
        assert_eq!(t.update(0.52, 2.05), None);
    }
}
