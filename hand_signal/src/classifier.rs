//! Rule-based gesture classifier.
//!
//! Fixed-priority decision tree over the primary hand's features; the first
//! matching branch wins:
//!
//! | # | Condition | Gesture | Confidence |
//! |---|---|---|---|
//! | 1 | five fingers, wrist swiped | `swipe-left` / `swipe-right` | 0.90 |
//! | 1 | five fingers | `expand-rotate` | 0.80 |
//! | 2 | fist | `rotate` | 0.85 |
//! | 3 | pinch | `attract` | 0.90 |
//! | 4 | peace sign | `pulse` | 0.85 |
//! | 5 | one finger | `collapse` | 0.80 |
//! | 6 | anything else | `wind` (finger count as metadata) | 0.70 |
//!
//! No hands → `auto`.

use crate::geometry::{GeometryThresholds, HandFeatures};
use crate::swipe::{SwipeDirection, SwipeParams, SwipeTracker};

// ════════════════════════════════════════════════════════════════════════════
// Gesture
// ════════════════════════════════════════════════════════════════════════════

/// Labels the rule-based classifier can emit.  Other sources may emit
/// labels outside this set; those are carried as plain strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Gesture {
    Auto,
    ExpandRotate,
    SwipeLeft,
    SwipeRight,
    Rotate,
    Attract,
    Pulse,
    Collapse,
    Wind,
}

impl Gesture {
    pub const ALL: [Gesture; 9] = [
        Gesture::Auto,
        Gesture::ExpandRotate,
        Gesture::SwipeLeft,
        Gesture::SwipeRight,
        Gesture::Rotate,
        Gesture::Attract,
        Gesture::Pulse,
        Gesture::Collapse,
        Gesture::Wind,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Gesture::Auto => "auto",
            Gesture::ExpandRotate => "expand-rotate",
            Gesture::SwipeLeft => "swipe-left",
            Gesture::SwipeRight => "swipe-right",
            Gesture::Rotate => "rotate",
            Gesture::Attract => "attract",
            Gesture::Pulse => "pulse",
            Gesture::Collapse => "collapse",
            Gesture::Wind => "wind",
        }
    }

    pub fn from_label(label: &str) -> Option<Gesture> {
        Gesture::ALL.into_iter().find(|g| g.label() == label)
    }

    /// Designer-assigned certainty of each branch.
    pub fn heuristic_confidence(self) -> f32 {
        match self {
            Gesture::Auto => 0.5,
            Gesture::SwipeLeft | Gesture::SwipeRight | Gesture::Attract => 0.9,
            Gesture::Rotate | Gesture::Pulse => 0.85,
            Gesture::ExpandRotate | Gesture::Collapse => 0.8,
            Gesture::Wind => 0.7,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Classification
// ════════════════════════════════════════════════════════════════════════════

/// One per-frame classification result.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f32,
    /// Extended-finger count of the primary hand (display metadata).
    pub fingers: u8,
}

impl Classification {
    pub fn new(label: impl Into<String>, confidence: f32, fingers: u8) -> Self {
        Classification {
            label: label.into(),
            confidence: confidence.clamp(0.0, 1.0),
            fingers,
        }
    }

    pub fn from_gesture(gesture: Gesture, fingers: u8) -> Self {
        Self::new(gesture.label(), gesture.heuristic_confidence(), fingers)
    }

    pub fn auto() -> Self {
        Self::from_gesture(Gesture::Auto, 0)
    }

    pub fn gesture(&self) -> Option<Gesture> {
        Gesture::from_label(&self.label)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// RuleClassifier
// ════════════════════════════════════════════════════════════════════════════

pub struct RuleClassifier {
    thresholds: GeometryThresholds,
    swipe: SwipeTracker,
}

impl RuleClassifier {
    pub fn new(thresholds: GeometryThresholds, swipe: SwipeParams) -> Self {
        RuleClassifier {
            thresholds,
            swipe: SwipeTracker::new(swipe),
        }
    }

    pub fn thresholds(&self) -> &GeometryThresholds {
        &self.thresholds
    }

    /// Forget any swipe in progress.
    pub fn reset(&mut self) {
        self.swipe.reset();
    }

    /// Classify the primary (first) hand of a frame.
    pub fn classify(&mut self, hands: &[HandFeatures], timestamp: f64) -> Classification {
        let Some(primary) = hands.first() else {
            self.swipe.reset();
            return Classification::auto();
        };
        let fingers = primary.extended;

        if fingers == 5 {
            let gesture = match self.swipe.update(primary.wrist.x, timestamp) {
                Some(SwipeDirection::Left) => Gesture::SwipeLeft,
                Some(SwipeDirection::Right) => Gesture::SwipeRight,
                None => Gesture::ExpandRotate,
            };
            return Classification::from_gesture(gesture, fingers);
        }
        self.swipe.reset();

        let gesture = if primary.fist {
            Gesture::Rotate
        } else if primary.pinch.is_some() {
            Gesture::Attract
        } else if primary.peace {
            Gesture::Pulse
        } else if fingers == 1 {
            Gesture::Collapse
        } else {
            Gesture::Wind
        };
        Classification::from_gesture(gesture, fingers)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::{HandPose, SyntheticHand};

    fn classify(pose: HandPose) -> Classification {
        let th = GeometryThresholds::default();
        let mut c = RuleClassifier::new(th, SwipeParams::default());
        let f = HandFeatures::analyze(&SyntheticHand::new(pose).build(), &th);
        c.classify(&[f], 0.0)
    }

    #[test]
    fn decision_tree_branches() {
        assert_eq!(classify(HandPose::Fingers(5)).label, "expand-rotate");
        assert_eq!(classify(HandPose::Fist).label, "rotate");
        assert_eq!(classify(HandPose::Pinch).label, "attract");
        assert_eq!(classify(HandPose::Peace).label, "pulse");
        assert_eq!(classify(HandPose::Fingers(1)).label, "collapse");
        for n in 2..=4 {
            let c = classify(HandPose::Fingers(n));
            assert_eq!(c.label, "wind");
            assert_eq!(c.fingers, n);
            assert_eq!(c.confidence, 0.7);
        }
    }

    #[test]
    fn no_hands_is_auto() {
        let mut c = RuleClassifier::new(GeometryThresholds::default(), SwipeParams::default());
        assert_eq!(c.classify(&[], 0.0).label, "auto");
    }

    #[test]
    fn only_primary_hand_is_classified() {
        let th = GeometryThresholds::default();
        let mut c = RuleClassifier::new(th, SwipeParams::default());
        let fist = HandFeatures::analyze(&SyntheticHand::new(HandPose::Fist).build(), &th);
        let peace = HandFeatures::analyze(&SyntheticHand::new(HandPose::Peace).build(), &th);
        assert_eq!(c.classify(&[peace, fist], 0.0).label, "pulse");
    }

    #[test]
    fn open_hand_swipe_right() {
        let th = GeometryThresholds::default();
        let mut c = RuleClassifier::new(th, SwipeParams::default());
        let labels: Vec<String> = (0..6)
            .map(|i| {
                let hand = SyntheticHand::new(HandPose::Fingers(5)).at(0.3 + 0.05 * i as f32, 0.8);
                let f = HandFeatures::analyze(&hand.build(), &th);
                c.classify(&[f], i as f64 * 0.05).label
            })
            .collect();
        assert_eq!(labels.iter().filter(|l| *l == "swipe-right").count(), 1);
        assert!(labels.iter().all(|l| l == "expand-rotate" || l == "swipe-right"));
    }

    #[test]
    fn labels_round_trip() {
        for g in Gesture::ALL {
            assert_eq!(Gesture::from_label(g.label()), Some(g));
        }
        assert_eq!(Gesture::from_label("thumbs-up"), None);
    }

    #[test]
    fn confidence_is_clamped() {
        assert_eq!(Classification::new("x", 1.7, 0).confidence, 1.0);
        assert_eq!(Classification::new("x", -0.2, 0).confidence, 0.0);
    }
}
