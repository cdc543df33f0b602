//! Debouncing state machines.
//!
//! [`GestureStateMachine`] stabilizes the per-frame gesture label with an
//! enter/exit/decay hysteresis.  [`ModeSwitcher`] is the coarser cousin that
//! decides physics-mode switches from matching two-hand finger counts.

use serde::Deserialize;
use tracing::debug;

use crate::classifier::Gesture;

// ════════════════════════════════════════════════════════════════════════════
// Gesture label hysteresis
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct HysteresisParams {
    /// Confidence a newly committed label is seeded just above.
    pub enter: f32,
    /// Confidence at or below which the active label gives way.
    pub exit: f32,
    /// Confidence lost per disagreeing frame.
    pub decay: f32,
    /// Confidence gained per agreeing frame.
    pub intensity: f32,
}

impl Default for HysteresisParams {
    fn default() -> Self {
        HysteresisParams {
            enter: 0.6,
            exit: 0.3,
            decay: 0.15,
            intensity: 0.15,
        }
    }
}

impl HysteresisParams {
    /// Confidence a label starts with when it becomes active.
    pub fn seed(&self) -> f32 {
        (self.enter + self.intensity).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GestureState {
    pub active_label: String,
    pub confidence: f32,
}

impl GestureState {
    /// Idle, held as firmly as a freshly committed label.
    pub fn idle(params: &HysteresisParams) -> Self {
        GestureState {
            active_label: Gesture::Auto.label().to_string(),
            confidence: params.seed(),
        }
    }
}

impl Default for GestureState {
    fn default() -> Self {
        GestureState::idle(&HysteresisParams::default())
    }
}

#[derive(Clone, Debug)]
pub struct GestureStateMachine {
    params: HysteresisParams,
    state: GestureState,
}

impl GestureStateMachine {
    pub fn new(params: HysteresisParams) -> Self {
        GestureStateMachine {
            params,
            state: GestureState::idle(&params),
        }
    }

    /// Feed one frame's label.  Returns `true` when the active label changed.
    pub fn observe(&mut self, label: &str) -> bool {
        let p = &self.params;
        let s = &mut self.state;
        if s.active_label == label {
            s.confidence = (s.confidence + p.intensity).min(1.0);
            return false;
        }
        s.confidence = (s.confidence - p.decay).max(0.0);
        if s.confidence > p.exit {
            return false;
        }
        debug!(from = %s.active_label, to = label, "gesture label committed");
        s.active_label = label.to_string();
        s.confidence = p.seed();
        true
    }

    pub fn state(&self) -> &GestureState {
        &self.state
    }

    pub fn active_label(&self) -> &str {
        &self.state.active_label
    }

    pub fn confidence(&self) -> f32 {
        self.state.confidence
    }

    pub fn reset(&mut self) {
        self.state = GestureState::idle(&self.params);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Two-hand mode switching
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ModeSwitchParams {
    /// Seconds both hands must hold the same count.
    pub dwell: f64,
    /// Seconds after a switch before another may fire.
    pub cooldown: f64,
}

impl Default for ModeSwitchParams {
    fn default() -> Self {
        ModeSwitchParams {
            dwell: 0.8,
            cooldown: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Candidate {
    count: u8,
    since: f64,
    fired: bool,
}

#[derive(Clone, Debug)]
pub struct ModeSwitcher {
    params: ModeSwitchParams,
    candidate: Option<Candidate>,
    last_switch: Option<f64>,
}

impl ModeSwitcher {
    pub fn new(params: ModeSwitchParams) -> Self {
        ModeSwitcher {
            params,
            candidate: None,
            last_switch: None,
        }
    }

    /// Feed per-hand extended-finger counts at time `t`.  Returns the count
    /// to switch to once both hands have agreed for the dwell time.
    ///
    /// A held pose fires once; it must be broken and re-formed to fire again.
    pub fn observe(&mut self, counts: &[u8], t: f64) -> Option<u8> {
        let count = match counts {
            [a, b] if a == b => *a,
            _ => {
                self.candidate = None;
                return None;
            }
        };

        if !matches!(self.candidate, Some(c) if c.count == count) {
            self.candidate = Some(Candidate {
                count,
                since: t,
                fired: false,
            });
        }
        let Some(c) = self.candidate.as_mut() else {
            return None;
        };

        if c.fired || t - c.since < self.params.dwell {
            return None;
        }
        if let Some(last) = self.last_switch {
            if t - last < self.params.cooldown {
                return None;
            }
        }
        c.fired = true;
        self.last_switch = Some(t);
        debug!(count, "two-hand mode switch");
        Some(count)
    }

    pub fn reset(&mut self) {
        self.candidate = None;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
