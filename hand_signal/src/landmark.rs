//! Landmark frames as produced by a hand detector.
//!
//! A frame carries 0–2 hands; each hand is exactly 21 points whose indices
//! have a fixed anatomical meaning.  x/y are normalized image coordinates
//! (y grows downward), z is a small relative depth.

use glam::Vec3;
use tracing::debug;

use crate::error::FrameError;

// ════════════════════════════════════════════════════════════════════════════
// Landmark indices
// ════════════════════════════════════════════════════════════════════════════

pub const LANDMARK_COUNT: usize = 21;
pub const MAX_HANDS: usize = 2;

pub const WRIST: usize = 0;
pub const THUMB_CMC: usize = 1;
pub const THUMB_MCP: usize = 2;
pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const INDEX_PIP: usize = 6;
pub const INDEX_DIP: usize = 7;
pub const INDEX_TIP: usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP: usize = 13;
pub const RING_PIP: usize = 14;
pub const RING_DIP: usize = 15;
pub const RING_TIP: usize = 16;
pub const PINKY_MCP: usize = 17;
pub const PINKY_PIP: usize = 18;
pub const PINKY_DIP: usize = 19;
pub const PINKY_TIP: usize = 20;

/// Tips in thumb → pinky order.
pub const FINGERTIPS: [usize; 5] = [THUMB_TIP, INDEX_TIP, MIDDLE_TIP, RING_TIP, PINKY_TIP];

/// (tip, pip) pairs for the four non-thumb fingers.
pub const FINGER_JOINTS: [(usize, usize); 4] = [
    (INDEX_TIP, INDEX_PIP),
    (MIDDLE_TIP, MIDDLE_PIP),
    (RING_TIP, RING_PIP),
    (PINKY_TIP, PINKY_PIP),
];

/// Hand skeleton connections, used for overlay drawing.
pub const HAND_SKELETON: [(usize, usize); 21] = [
    (WRIST, THUMB_CMC), (THUMB_CMC, THUMB_MCP), (THUMB_MCP, THUMB_IP), (THUMB_IP, THUMB_TIP),
    (WRIST, INDEX_MCP), (INDEX_MCP, INDEX_PIP), (INDEX_PIP, INDEX_DIP), (INDEX_DIP, INDEX_TIP),
    (WRIST, MIDDLE_MCP), (MIDDLE_MCP, MIDDLE_PIP), (MIDDLE_PIP, MIDDLE_DIP), (MIDDLE_DIP, MIDDLE_TIP),
    (WRIST, RING_MCP), (RING_MCP, RING_PIP), (RING_PIP, RING_DIP), (RING_DIP, RING_TIP),
    (WRIST, PINKY_MCP), (PINKY_MCP, PINKY_PIP), (PINKY_PIP, PINKY_DIP), (PINKY_DIP, PINKY_TIP),
    (INDEX_MCP, PINKY_MCP),
];

// ════════════════════════════════════════════════════════════════════════════
// Hand
// ════════════════════════════════════════════════════════════════════════════

/// One structurally valid hand: 21 finite points.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hand {
    pub points: [Vec3; LANDMARK_COUNT],
}

impl Hand {
    pub fn new(points: [Vec3; LANDMARK_COUNT]) -> Self {
        Hand { points }
    }

    #[inline]
    pub fn point(&self, index: usize) -> Vec3 {
        self.points[index]
    }

    #[inline]
    pub fn wrist(&self) -> Vec3 {
        self.points[WRIST]
    }

    /// Every point scaled by `k` around the wrist.
    pub fn scaled_about_wrist(&self, k: f32) -> Hand {
        let wrist = self.wrist();
        let mut points = self.points;
        for p in points.iter_mut() {
            *p = wrist + (*p - wrist) * k;
        }
        Hand { points }
    }
}

impl TryFrom<&[Vec3]> for Hand {
    type Error = FrameError;

    fn try_from(raw: &[Vec3]) -> Result<Self, Self::Error> {
        if raw.len() != LANDMARK_COUNT {
            return Err(FrameError::WrongLandmarkCount {
                got: raw.len(),
                expected: LANDMARK_COUNT,
            });
        }
        let mut points = [Vec3::ZERO; LANDMARK_COUNT];
        for (index, (dst, src)) in points.iter_mut().zip(raw).enumerate() {
            if !src.is_finite() {
                return Err(FrameError::NonFinite { index });
            }
            *dst = *src;
        }
        Ok(Hand { points })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkFrame
// ════════════════════════════════════════════════════════════════════════════

/// Result of one detector invocation.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LandmarkFrame {
    /// Monotonic timestamp in seconds.
    pub timestamp: f64,
    pub hands: Vec<Hand>,
}

impl LandmarkFrame {
    /// Build a frame from already-validated hands; extras beyond
    /// [`MAX_HANDS`] are dropped.
    pub fn new(timestamp: f64, mut hands: Vec<Hand>) -> Self {
        hands.truncate(MAX_HANDS);
        LandmarkFrame { timestamp, hands }
    }

    pub fn empty(timestamp: f64) -> Self {
        LandmarkFrame { timestamp, hands: Vec::new() }
    }

    /// Assemble a frame from raw per-hand point lists.
    ///
    /// Fails closed: if any of the (first two) hands is malformed the whole
    /// frame is reported as having no hands.  Partial frames are common
    /// during occlusion and are not worth surfacing as errors.
    pub fn from_raw(timestamp: f64, raw: &[Vec<Vec3>]) -> Self {
        let mut hands = Vec::with_capacity(MAX_HANDS);
        for points in raw.iter().take(MAX_HANDS) {
            match Hand::try_from(points.as_slice()) {
                Ok(hand) => hands.push(hand),
                Err(e) => {
                    debug!(error = %e, "malformed hand; treating frame as empty");
                    return LandmarkFrame::empty(timestamp);
                }
            }
        }
        LandmarkFrame { timestamp, hands }
    }

    pub fn hand_count(&self) -> usize {
        self.hands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hands.is_empty()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_hand(offset: f32) -> Vec<Vec3> {
        (0..LANDMARK_COUNT)
            .map(|i| Vec3::new(offset + i as f32 * 0.01, 0.5, 0.0))
            .collect()
    }

    #[test]
    fn from_raw_keeps_valid_hands() {
        let frame = LandmarkFrame::from_raw(1.0, &[raw_hand(0.1), raw_hand(0.5)]);
        assert_eq!(frame.hand_count(), 2);
        assert_eq!(frame.hands[1].point(0).x, 0.5);
    }

    #[test]
    fn from_raw_drops_third_hand() {
        let frame = LandmarkFrame::from_raw(1.0, &[raw_hand(0.1), raw_hand(0.3), raw_hand(0.5)]);
        assert_eq!(frame.hand_count(), 2);
    }

    #[test]
    fn short_hand_fails_closed() {
        let mut short = raw_hand(0.1);
        short.pop();
        let frame = LandmarkFrame::from_raw(2.0, &[raw_hand(0.4), short]);
        assert!(frame.is_empty());
        assert_eq!(frame.timestamp, 2.0);
    }

    #[test]
    fn nan_point_fails_closed() {
        let mut bad = raw_hand(0.1);
        bad[7].y = f32::NAN;
        assert_eq!(
            Hand::try_from(bad.as_slice()),
            Err(FrameError::NonFinite { index: 7 })
        );
        assert!(LandmarkFrame::from_raw(0.0, &[bad]).is_empty());
    }

    #[test]
    fn scaling_about_wrist_keeps_wrist_fixed() {
        let hand = Hand::try_from(raw_hand(0.2).as_slice()).unwrap();
        let scaled = hand.scaled_about_wrist(2.0);
        assert_eq!(scaled.wrist(), hand.wrist());
        let d0 = hand.point(INDEX_TIP).distance(hand.wrist());
        let d1 = scaled.point(INDEX_TIP).distance(scaled.wrist());
        assert!((d1 - 2.0 * d0).abs() < 1e-5);
    }
}
