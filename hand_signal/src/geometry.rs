//! Scale-normalized hand geometry.
//!
//! Every threshold here is a fraction of the hand's own scale (mean of palm
//! width and palm length), so the same pose classifies the same way whether
//! the hand is near the camera or far from it.

use std::f32::consts::PI;

use glam::{Vec2, Vec3};
use serde::Deserialize;

use crate::landmark::*;

// ════════════════════════════════════════════════════════════════════════════
// Thresholds
// ════════════════════════════════════════════════════════════════════════════

/// Detection thresholds, all expressed in units of hand scale.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeometryThresholds {
    /// Floor for the hand scale (normalized image units).
    pub min_scale: f32,
    /// Horizontal thumb-tip/thumb-IP offset for an extended thumb.
    pub thumb_extension: f32,
    /// How far a fingertip must sit above its PIP joint to count as extended.
    pub finger_extension: f32,
    /// Thumb-tip/index-tip distance below which the hand pinches.
    pub pinch: f32,
    /// Fingertip/palm-center distance below which a finger is folded into a fist.
    pub fist_radius: f32,
    /// Index and middle tips must rise this far above their PIPs for a peace sign.
    pub peace_raise: f32,
    /// Ring and pinky tips must stay this close to the palm center for a peace sign.
    pub peace_fold_radius: f32,
    /// Mean tip distance (in scales) mapped to openness 0.0.
    pub closed_spread: f32,
    /// Mean tip distance (in scales) mapped to openness 1.0.
    pub open_spread: f32,
}

impl Default for GeometryThresholds {
    fn default() -> Self {
        GeometryThresholds {
            min_scale: 1e-3,
            thumb_extension: 0.15,
            finger_extension: 0.1,
            pinch: 0.35,
            fist_radius: 0.55,
            peace_raise: 0.2,
            peace_fold_radius: 0.6,
            closed_spread: 0.4,
            open_spread: 1.3,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Per-hand measurements
// ════════════════════════════════════════════════════════════════════════════

/// Mean of palm width (index base ↔ pinky base) and palm length
/// (middle base ↔ wrist), floor-clamped.
pub fn hand_scale(hand: &Hand, min_scale: f32) -> f32 {
    let width = hand.point(INDEX_MCP).distance(hand.point(PINKY_MCP));
    let length = hand.point(MIDDLE_MCP).distance(hand.point(WRIST));
    ((width + length) * 0.5).max(min_scale)
}

/// Mean of the wrist and the four finger bases.
pub fn palm_center(hand: &Hand) -> Vec3 {
    let sum = hand.point(WRIST)
        + hand.point(INDEX_MCP)
        + hand.point(MIDDLE_MCP)
        + hand.point(RING_MCP)
        + hand.point(PINKY_MCP);
    sum / 5.0
}

/// Which digits are extended.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerState {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerState {
    pub fn count(&self) -> u8 {
        [self.thumb, self.index, self.middle, self.ring, self.pinky]
            .iter()
            .filter(|&&e| e)
            .count() as u8
    }
}

pub fn extended_fingers(hand: &Hand, scale: f32, th: &GeometryThresholds) -> FingerState {
    let thumb_dx = (hand.point(THUMB_TIP).x - hand.point(THUMB_IP).x).abs();
    let raised = |(tip, pip): (usize, usize)| {
        hand.point(pip).y - hand.point(tip).y > th.finger_extension * scale
    };
    FingerState {
        thumb: thumb_dx > th.thumb_extension * scale,
        index: raised(FINGER_JOINTS[0]),
        middle: raised(FINGER_JOINTS[1]),
        ring: raised(FINGER_JOINTS[2]),
        pinky: raised(FINGER_JOINTS[3]),
    }
}

/// Pinch center when thumb and index tips touch, else `None`.
pub fn pinch(hand: &Hand, scale: f32, th: &GeometryThresholds) -> Option<Vec3> {
    let thumb = hand.point(THUMB_TIP);
    let index = hand.point(INDEX_TIP);
    (thumb.distance(index) < th.pinch * scale).then(|| (thumb + index) * 0.5)
}

/// At least four of five fingertips folded onto the palm.
pub fn is_fist(hand: &Hand, scale: f32, th: &GeometryThresholds) -> bool {
    let center = palm_center(hand);
    let folded = FINGERTIPS
        .iter()
        .filter(|&&tip| hand.point(tip).distance(center) < th.fist_radius * scale)
        .count();
    folded >= 4
}

/// Index and middle raised, ring and pinky folded.
pub fn is_peace(hand: &Hand, scale: f32, th: &GeometryThresholds) -> bool {
    let center = palm_center(hand);
    let raised = |tip: usize, pip: usize| {
        hand.point(pip).y - hand.point(tip).y > th.peace_raise * scale
    };
    let folded = |tip: usize| hand.point(tip).distance(center) < th.peace_fold_radius * scale;
    raised(INDEX_TIP, INDEX_PIP)
        && raised(MIDDLE_TIP, MIDDLE_PIP)
        && folded(RING_TIP)
        && folded(PINKY_TIP)
}

/// Continuous palm rotation signal (radians).
///
/// In-plane angle of the index→pinky axis, plus half the sideways tilt of
/// the palm normal (cross product of the two palm edges).  The normal's
/// z sign is discarded so left and right hands agree.
pub fn palm_twist(hand: &Hand) -> f32 {
    let wrist = hand.point(WRIST);
    let edge_index = hand.point(INDEX_MCP) - wrist;
    let edge_pinky = hand.point(PINKY_MCP) - wrist;
    let normal = edge_index.cross(edge_pinky);

    let axis = hand.point(PINKY_MCP) - hand.point(INDEX_MCP);
    let in_plane = axis.y.atan2(axis.x);
    let tilt = normal.x.atan2(normal.z.abs().max(f32::EPSILON));
    in_plane + 0.5 * tilt
}

/// 0.0 (closed) … 1.0 (fully spread), from mean fingertip spread.
pub fn openness(hand: &Hand, scale: f32, th: &GeometryThresholds) -> f32 {
    let center = palm_center(hand);
    let spread = FINGERTIPS
        .iter()
        .map(|&tip| hand.point(tip).distance(center))
        .sum::<f32>()
        / (FINGERTIPS.len() as f32 * scale);
    let span = (th.open_spread - th.closed_spread).max(f32::EPSILON);
    ((spread - th.closed_spread) / span).clamp(0.0, 1.0)
}

// ════════════════════════════════════════════════════════════════════════════
// HandFeatures
// ════════════════════════════════════════════════════════════════════════════

/// Everything the classifier needs from one hand, recomputed every frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HandFeatures {
    pub scale: f32,
    pub fingers: FingerState,
    pub extended: u8,
    pub pinch: Option<Vec3>,
    pub fist: bool,
    pub peace: bool,
    pub twist: f32,
    pub openness: f32,
    pub palm_center: Vec3,
    pub wrist: Vec3,
}

impl HandFeatures {
    pub fn analyze(hand: &Hand, th: &GeometryThresholds) -> Self {
        let scale = hand_scale(hand, th.min_scale);
        let fingers = extended_fingers(hand, scale, th);
        HandFeatures {
            scale,
            fingers,
            extended: fingers.count(),
            pinch: pinch(hand, scale, th),
            fist: is_fist(hand, scale, th),
            peace: is_peace(hand, scale, th),
            twist: palm_twist(hand),
            openness: openness(hand, scale, th),
            palm_center: palm_center(hand),
            wrist: hand.wrist(),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Aggregate over all tracked hands
// ════════════════════════════════════════════════════════════════════════════

/// Per-hand metrics averaged (not summed) over the tracked hands.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AggregateFeatures {
    pub hand_count: usize,
    pub openness: f32,
    /// Mean hand scale in normalized image units.
    pub hand_size: f32,
    /// Mean palm offset from the image center, y up, each axis in [-1, 1].
    pub direction: Vec2,
    /// Tilt of the line through both palms (y up), in (-π/2, π/2].  The
    /// vector is taken left to right, so hand order does not matter.
    pub inter_hand_angle: Option<f32>,
}

pub fn aggregate(features: &[HandFeatures]) -> AggregateFeatures {
    if features.is_empty() {
        return AggregateFeatures::default();
    }
    let n = features.len() as f32;
    let openness = features.iter().map(|f| f.openness).sum::<f32>() / n;
    let hand_size = features.iter().map(|f| f.scale).sum::<f32>() / n;
    let direction = features
        .iter()
        .map(|f| Vec2::new(f.palm_center.x - 0.5, 0.5 - f.palm_center.y) * 2.0)
        .sum::<Vec2>()
        / n;
    let inter_hand_angle = match features {
        [a, b, ..] => {
            let mut d = b.palm_center - a.palm_center;
            if d.x < 0.0 || (d.x == 0.0 && d.y > 0.0) {
                d = -d;
            }
            Some((-d.y).atan2(d.x))
        }
        _ => None,
    };
    AggregateFeatures {
        hand_count: features.len(),
        openness,
        hand_size,
        direction: direction.clamp(Vec2::splat(-1.0), Vec2::splat(1.0)),
        inter_hand_angle,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TwistTracker
// ════════════════════════════════════════════════════════════════════════════

/// Turns successive palm-twist angles into an angular velocity (rad/s).
#[derive(Clone, Debug, Default)]
pub struct TwistTracker {
    last: Option<(f32, f64)>,
}

impl TwistTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, angle: f32, t: f64) -> f32 {
        let velocity = match self.last {
            Some((prev, t_prev)) if t > t_prev => {
                wrap_angle(angle - prev) / (t - t_prev) as f32
            }
            _ => 0.0,
        };
        self.last = Some((angle, t));
        velocity
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Wrap into (-π, π].
pub fn wrap_angle(a: f32) -> f32 {
    let wrapped = (a + PI).rem_euclid(2.0 * PI) - PI;
    if wrapped <= -PI { wrapped + 2.0 * PI } else { wrapped }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{HandPose, SyntheticHand};
    use std::f32::consts::FRAC_PI_2;

    fn features(pose: HandPose) -> HandFeatures {
        HandFeatures::analyze(&SyntheticHand::new(pose).build(), &GeometryThresholds::default())
    }

    #[test]
    fn finger_counts_per_pose() {
        assert_eq!(features(HandPose::Fist).extended, 0);
        for n in 1..=5 {
            assert_eq!(features(HandPose::Fingers(n)).extended, n, "pose {n}");
        }
        assert_eq!(features(HandPose::Peace).extended, 2);
        assert_eq!(features(HandPose::Pinch).extended, 3);
    }

    #[test]
    fn finger_count_invariant_to_scale() {
        let th = GeometryThresholds::default();
        for pose in HandPose::ALL {
            let hand = SyntheticHand::new(pose).build();
            let base = HandFeatures::analyze(&hand, &th).extended;
            for k in [0.4, 0.75, 1.6, 2.5] {
                let scaled = HandFeatures::analyze(&hand.scaled_about_wrist(k), &th).extended;
                assert_eq!(scaled, base, "{pose:?} at scale {k}");
            }
        }
    }

    #[test]
    fn mirrored_hand_counts_the_same() {
        for pose in HandPose::ALL {
            let plain = SyntheticHand::new(pose).build();
            let mirrored = SyntheticHand::new(pose).mirrored(true).build();
            let th = GeometryThresholds::default();
            assert_eq!(
                HandFeatures::analyze(&plain, &th).extended,
                HandFeatures::analyze(&mirrored, &th).extended
            );
        }
    }

    #[test]
    fn pinch_and_fist_flags() {
        let p = features(HandPose::Pinch);
        assert!(p.pinch.is_some());
        assert!(!p.fist);

        let f = features(HandPose::Fist);
        assert!(f.fist);

        assert!(features(HandPose::Fingers(5)).pinch.is_none());
        assert!(!features(HandPose::Fingers(5)).fist);
    }

    #[test]
    fn peace_only_for_peace_pose() {
        for pose in HandPose::ALL {
            assert_eq!(features(pose).peace, pose == HandPose::Peace, "{pose:?}");
        }
    }

    #[test]
    fn openness_orders_fist_below_open_palm() {
        let fist = features(HandPose::Fist).openness;
        let open = features(HandPose::Fingers(5)).openness;
        assert!(fist < 0.2, "fist openness {fist}");
        assert!(open > 0.8, "open openness {open}");
    }

    #[test]
    fn scale_is_floor_clamped() {
        let collapsed = Hand::new([Vec3::splat(0.5); LANDMARK_COUNT]);
        assert_eq!(hand_scale(&collapsed, 1e-3), 1e-3);
    }

    #[test]
    fn aggregate_averages_two_hands() {
        let th = GeometryThresholds::default();
        let a = HandFeatures::analyze(&SyntheticHand::new(HandPose::Fist).at(0.25, 0.6).build(), &th);
        let b = HandFeatures::analyze(&SyntheticHand::new(HandPose::Fingers(5)).at(0.75, 0.6).build(), &th);
        let agg = aggregate(&[a, b]);
        assert_eq!(agg.hand_count, 2);
        assert!((agg.openness - (a.openness + b.openness) / 2.0).abs() < 1e-6);
        assert!((agg.hand_size - (a.scale + b.scale) / 2.0).abs() < 1e-6);
        let angle = agg.inter_hand_angle.unwrap();
        assert!(angle.abs() < 0.1, "side by side hands should be level: {angle}");
    }

    #[test]
    fn inter_hand_angle_ignores_hand_order() {
        let th = GeometryThresholds::default();
        let left = HandFeatures::analyze(&SyntheticHand::new(HandPose::Fist).at(0.25, 0.7).build(), &th);
        let right = HandFeatures::analyze(&SyntheticHand::new(HandPose::Fist).at(0.75, 0.5).build(), &th);
        let forward = aggregate(&[left, right]).inter_hand_angle.unwrap();
        let swapped = aggregate(&[right, left]).inter_hand_angle.unwrap();
        assert!((forward - swapped).abs() < 1e-6);
        // right hand higher in the image: line rises to the right
        assert!(forward > 0.0 && forward < FRAC_PI_2);
    }

    #[test]
    fn aggregate_single_hand_has_no_angle() {
        let agg = aggregate(&[features(HandPose::Peace)]);
        assert_eq!(agg.hand_count, 1);
        assert!(agg.inter_hand_angle.is_none());
    }

    #[test]
    fn twist_tracker_wraps_across_pi() {
        let mut t = TwistTracker::new();
        assert_eq!(t.update(3.0, 0.0), 0.0);
        let v = t.update(-3.0, 0.5);
        let expected = wrap_angle(-6.0) / 0.5;
        assert!((v - expected).abs() < 1e-5);
        assert!(v > 0.0);
    }

    #[test]
    fn palm_twist_follows_in_plane_rotation() {
        let upright = palm_twist(&SyntheticHand::new(HandPose::Fingers(5)).build());
        let rotated = palm_twist(&SyntheticHand::new(HandPose::Fingers(5)).rotated(0.5).build());
        assert!((wrap_angle(rotated - upright) - 0.5).abs() < 1e-3);
    }
}
