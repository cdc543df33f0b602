//! # gesture_particles
//!
//! A particle field shaped by hand gestures.  Landmark frames from a
//! detection thread go through the `hand_signal` pipeline; the resulting
//! gesture drives a set of smoothed control channels, and two-hand finger
//! counts switch the `particle_physics` regime.
//!
//! ## Gesture → control mapping
//!
//! | Gesture | Hand shape | Effect |
//! |---|---|---|
//! | expand-rotate | open hand (5) | expansion follows openness, swirl follows direction |
//! | swipe-left / swipe-right | open hand moving fast | one-shot explosion + swirl kick |
//! | rotate | fist | spin follows palm twist |
//! | attract | pinch | particles drawn to the pinch point |
//! | pulse | peace sign | rhythmic pulse |
//! | collapse | one finger | field contracts |
//! | wind | anything else | wind along hand direction |
//! | auto | no hands | idle breathing and slow swirl |
//!
//! Both hands showing the same finger count for a moment switches the
//! physics mode (see `particle_physics`).
//!
//! ## Feature flags
//!
//! * (default) — **Simulation mode**: keyboard and mouse drive synthetic hands.
//! * `leap` — **Hardware mode**: polls a real LeapMotion controller via LeapC.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Action |
//! |---|---|
//! | `0` | Fist |
//! | `1`–`5` | Extended finger count |
//! | `P` / `V` | Pinch / peace |
//! | `H` | Hide the hands |
//! | mouse | Move the hand |
//! | `Tab` | Toggle the mirrored second hand |
//! | `R` / `E` hold | Twist the hands |
//! | `G` | Toggle gesture detection |
//! | `C` | Stop / restart detection |
//! | `M` | Cycle physics mode |
//! | `Q` / `Esc` | Quit |

pub mod error;
pub mod controls;
pub mod context;
pub mod source;
pub mod visualizer;
pub mod app;

pub use error::{AppError, SourceError};
pub use controls::{Channel, ControlSmoother, ControlState, GestureCues, SmoothingParams};
pub use context::{to_world, PipelineParams, SimulationContext, WORLD_HALF_EXTENT};
pub use source::{spawn_detection, DetectionHandle, LandmarkSource, SimInput, SimLandmarkSource};
pub use app::{AppConfig, run};
#[cfg(feature = "leap")]
pub use source::LeapLandmarkSource;
