//! # hand_signal
//!
//! Turns a noisy stream of tracked hand landmarks into stable control
//! decisions.
//!
//! ```text
//! LandmarkFrame ─► FilterBank ─► HandFeatures ─► RuleClassifier ─► fuse() ─► GestureStateMachine
//!                                      │                                  ▲
//!                                      └────────► ModeSwitcher            └─ AsyncClassifier (optional)
//! ```
//!
//! * [`FilterBank`] — one One-Euro filter per (hand, landmark, axis).
//! * [`HandFeatures`] — scale-normalized finger/pinch/fist/peace/twist metrics.
//! * [`RuleClassifier`] — fixed-priority decision tree, plus swipe detection.
//! * [`fuse`] / [`AsyncClassifier`] — optional external classifier that only
//!   wins when it is confident, and never blocks the caller.
//! * [`GestureStateMachine`] — enter/exit/decay hysteresis on labels.
//! * [`ModeSwitcher`] — coarse dwell + cooldown switch keyed off matching
//!   two-hand finger counts.
//!
//! ## Quick start
//!
//! ```rust
//! use hand_signal::{
//!     FilterBank, FilterParams, GeometryThresholds, GestureStateMachine,
//!     HandFeatures, HysteresisParams, LandmarkFrame, RuleClassifier, SwipeParams,
//! };
//! use hand_signal::synthetic::{HandPose, SyntheticHand};
//!
//! let mut filters = FilterBank::new(FilterParams::default());
//! let mut classifier = RuleClassifier::new(GeometryThresholds::default(), SwipeParams::default());
//! let mut state = GestureStateMachine::new(HysteresisParams::default());
//!
//! let hand = SyntheticHand::new(HandPose::Peace).build();
//! for i in 0..10 {
//!     let frame = LandmarkFrame::new(i as f64 * 0.05, vec![hand]);
//!     let filtered = filters.filter_frame(&frame);
//!     let features: Vec<HandFeatures> = filtered.hands.iter()
//!         .map(|h| HandFeatures::analyze(h, &GeometryThresholds::default()))
//!         .collect();
//!     let result = classifier.classify(&features, frame.timestamp);
//!     state.observe(&result.label);
//! }
//! assert_eq!(state.active_label(), "pulse");
//! ```

pub mod error;
pub mod landmark;
pub mod filter;
pub mod geometry;
pub mod swipe;
pub mod classifier;
pub mod fusion;
pub mod hysteresis;
pub mod synthetic;

pub use error::{ClassifierError, FrameError};
pub use landmark::{Hand, LandmarkFrame, LANDMARK_COUNT, MAX_HANDS};
pub use filter::{Axis, FilterBank, FilterKey, FilterParams, OneEuroFilter};
pub use geometry::{
    aggregate, AggregateFeatures, FingerState, GeometryThresholds, HandFeatures, TwistTracker,
};
pub use swipe::{SwipeDirection, SwipeParams, SwipeTracker};
pub use classifier::{Classification, Gesture, RuleClassifier};
pub use fusion::{fuse, AsyncClassifier, ExternalClassifier, LatestResult};
pub use hysteresis::{
    GestureState, GestureStateMachine, HysteresisParams, ModeSwitchParams, ModeSwitcher,
};
