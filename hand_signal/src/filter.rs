//! One Euro filter bank: adaptive low-pass jitter removal per landmark axis.
//!
//! Smooth when the point is still (low cutoff), responsive when it moves
//! fast (cutoff rises with the filtered speed).  One filter per
//! (hand slot, landmark, axis); the bank is bounded by
//! `MAX_HANDS × 21 × 3` and is cleared whenever the hands disappear so a
//! stale derivative never leaks into the next detected hand.

use std::f32::consts::PI;

use serde::Deserialize;
use tracing::debug;

use crate::landmark::{Hand, LandmarkFrame, LANDMARK_COUNT, MAX_HANDS};

// ════════════════════════════════════════════════════════════════════════════
// Parameters
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterParams {
    /// Fallback sampling frequency (Hz) when successive timestamps are
    /// missing or not increasing.
    pub frequency: f32,
    /// Minimum cutoff frequency (Hz); lower is smoother at rest.
    pub min_cutoff: f32,
    /// Speed coefficient; higher means less lag during fast motion.
    pub beta: f32,
    /// Cutoff for the derivative estimate (Hz).
    pub d_cutoff: f32,
}

impl Default for FilterParams {
    fn default() -> Self {
        FilterParams {
            frequency: 20.0,
            min_cutoff: 1.0,
            beta: 5.0,
            d_cutoff: 1.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// OneEuroFilter
// ════════════════════════════════════════════════════════════════════════════

/// Adaptive low-pass filter for a single scalar signal.
#[derive(Clone, Debug)]
pub struct OneEuroFilter {
    params: FilterParams,
    x_prev: f32,
    dx_prev: f32,
    /// `None` until the first sample has been seen.
    t_prev: Option<f64>,
}

impl OneEuroFilter {
    pub fn new(params: FilterParams) -> Self {
        OneEuroFilter {
            params,
            x_prev: 0.0,
            dx_prev: 0.0,
            t_prev: None,
        }
    }

    fn smoothing_factor(t_e: f32, cutoff: f32) -> f32 {
        let r = 2.0 * PI * cutoff * t_e;
        r / (r + 1.0)
    }

    /// Filter one sample taken at `t` seconds.  The first sample passes
    /// through unmodified.
    pub fn filter(&mut self, x: f32, t: f64) -> f32 {
        let Some(t_prev) = self.t_prev else {
            self.x_prev = x;
            self.dx_prev = 0.0;
            self.t_prev = Some(t);
            return x;
        };

        let elapsed = t - t_prev;
        let t_e = if elapsed > 0.0 {
            elapsed as f32
        } else {
            1.0 / self.params.frequency.max(f32::EPSILON)
        };

        // 1. Low-passed derivative
        let a_d = Self::smoothing_factor(t_e, self.params.d_cutoff);
        let dx = (x - self.x_prev) / t_e;
        let dx_hat = a_d * dx + (1.0 - a_d) * self.dx_prev;

        // 2. Cutoff follows speed
        let cutoff = self.params.min_cutoff + self.params.beta * dx_hat.abs();
        let a = Self::smoothing_factor(t_e, cutoff);

        // 3. Primary low-pass
        let x_hat = a * x + (1.0 - a) * self.x_prev;

        self.x_prev = x_hat;
        self.dx_prev = dx_hat;
        self.t_prev = Some(t.max(t_prev));
        x_hat
    }

    pub fn is_warm(&self) -> bool {
        self.t_prev.is_some()
    }

    pub fn reset(&mut self) {
        self.t_prev = None;
        self.dx_prev = 0.0;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FilterKey
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    fn index(self) -> usize {
        self as usize
    }
}

/// Identifies one filtered scalar: which hand slot, which landmark, which axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FilterKey {
    pub hand: usize,
    pub landmark: usize,
    pub axis: Axis,
}

impl FilterKey {
    pub fn new(hand: usize, landmark: usize, axis: Axis) -> Self {
        FilterKey { hand, landmark, axis }
    }

    /// Dense slot index, or `None` when the key is outside the fixed bounds.
    fn slot(self) -> Option<usize> {
        if self.hand >= MAX_HANDS || self.landmark >= LANDMARK_COUNT {
            return None;
        }
        Some((self.hand * LANDMARK_COUNT + self.landmark) * 3 + self.axis.index())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FilterBank
// ════════════════════════════════════════════════════════════════════════════

const BANK_SLOTS: usize = MAX_HANDS * LANDMARK_COUNT * 3;

/// Lazily populated filters keyed by [`FilterKey`].
pub struct FilterBank {
    params: FilterParams,
    slots: Vec<Option<OneEuroFilter>>,
}

impl FilterBank {
    pub fn new(params: FilterParams) -> Self {
        FilterBank {
            params,
            slots: vec![None; BANK_SLOTS],
        }
    }

    /// Filter one raw value.  Keys outside the bounded key space pass
    /// through unfiltered.
    pub fn filter(&mut self, key: FilterKey, raw: f32, t: f64) -> f32 {
        let Some(slot) = key.slot() else { return raw };
        let params = self.params;
        self.slots[slot]
            .get_or_insert_with(|| OneEuroFilter::new(params))
            .filter(raw, t)
    }

    /// Filter every coordinate of `hand` as hand slot `slot`.
    pub fn filter_hand(&mut self, slot: usize, hand: &Hand, t: f64) -> Hand {
        let mut out = *hand;
        for (landmark, p) in out.points.iter_mut().enumerate() {
            p.x = self.filter(FilterKey::new(slot, landmark, Axis::X), p.x, t);
            p.y = self.filter(FilterKey::new(slot, landmark, Axis::Y), p.y, t);
            p.z = self.filter(FilterKey::new(slot, landmark, Axis::Z), p.z, t);
        }
        out
    }

    /// Filter a whole frame.  An empty frame invalidates the bank.
    pub fn filter_frame(&mut self, frame: &LandmarkFrame) -> LandmarkFrame {
        if frame.is_empty() {
            if self.active_len() > 0 {
                debug!(filters = self.active_len(), "hands lost; clearing filter bank");
                self.clear();
            }
            return LandmarkFrame::empty(frame.timestamp);
        }
        let hands = frame
            .hands
            .iter()
            .enumerate()
            .map(|(slot, hand)| self.filter_hand(slot, hand, frame.timestamp))
            .collect();
        LandmarkFrame::new(frame.timestamp, hands)
    }

    /// Drop every filter state.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }

    /// Number of filters allocated so far.
    pub fn active_len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
