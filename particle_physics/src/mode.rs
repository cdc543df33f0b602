//! Physics regimes and their constant bundles.

use serde::Deserialize;
use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PhysicsMode {
    #[default]
    Normal,
    Gravity,
    Magnetic,
    Fluid,
    Quantum,
    AntiGravity,
}

impl PhysicsMode {
    pub const ALL: [PhysicsMode; 6] = [
        PhysicsMode::Normal,
        PhysicsMode::Gravity,
        PhysicsMode::Magnetic,
        PhysicsMode::Fluid,
        PhysicsMode::Quantum,
        PhysicsMode::AntiGravity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PhysicsMode::Normal => "normal",
            PhysicsMode::Gravity => "gravity",
            PhysicsMode::Magnetic => "magnetic",
            PhysicsMode::Fluid => "fluid",
            PhysicsMode::Quantum => "quantum",
            PhysicsMode::AntiGravity => "anti-gravity",
        }
    }

    /// Two-hand finger count → mode.  Counts above five have no mode.
    pub fn from_finger_count(count: u8) -> Option<PhysicsMode> {
        Self::ALL.get(count as usize).copied()
    }

    /// Next mode in cycle order (manual switching).
    pub fn next(self) -> PhysicsMode {
        let i = Self::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn params(self) -> ModeParams {
        let base = ModeParams::default();
        match self {
            PhysicsMode::Normal => base,
            PhysicsMode::Gravity => ModeParams {
                gravity: -6.0,
                floor: Some(-4.0),
                bounce: 0.6,
                impact_friction: 0.8,
                friction: 0.99,
                turbulence: 0.02,
                ..base
            },
            PhysicsMode::AntiGravity => ModeParams {
                gravity: 3.0,
                ceiling: Some(4.0),
                bounce: 0.4,
                impact_friction: 0.85,
                friction: 0.995,
                viscosity: 0.97,
                turbulence: 0.03,
                ..base
            },
            PhysicsMode::Magnetic => ModeParams {
                friction: 0.96,
                turbulence: 0.01,
                attraction_strength: 4.0,
                attraction_range: 3.0,
                attraction_falloff: 1.5,
                ..base
            },
            PhysicsMode::Fluid => ModeParams {
                gravity: -1.5,
                floor: Some(-4.0),
                bounce: 0.2,
                impact_friction: 0.7,
                friction: 0.99,
                viscosity: 0.9,
                turbulence: 0.015,
                surface_tension: 2.0,
                cohesion_radius: 0.35,
                ..base
            },
            PhysicsMode::Quantum => ModeParams {
                friction: 0.95,
                turbulence: 0.08,
                attraction_strength: 1.5,
                attraction_range: 4.0,
                attraction_falloff: 1.5,
                jump_chance: 0.002,
                jump_radius: 0.6,
                phase_chance: 0.005,
                entangle_chance: 0.001,
                entangle_strength: 0.5,
                ..base
            },
        }
    }
}

impl fmt::Display for PhysicsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric constants of one regime.  Retention factors are per step
/// multipliers in (0, 1]; `1.0` means no damping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ModeParams {
    /// Signed vertical acceleration (negative pulls down).
    pub gravity: f32,
    pub floor: Option<f32>,
    pub ceiling: Option<f32>,
    /// Fraction of vertical speed kept on a floor/ceiling hit.
    pub bounce: f32,
    /// Horizontal retention on impact.
    pub impact_friction: f32,
    pub friction: f32,
    pub viscosity: f32,
    /// Per-axis random velocity jitter amplitude.
    pub turbulence: f32,

    pub attraction_strength: f32,
    pub attraction_range: f32,
    pub attraction_falloff: f32,

    pub jump_chance: f32,
    pub jump_radius: f32,
    pub phase_chance: f32,
    pub entangle_chance: f32,
    pub entangle_strength: f32,

    pub surface_tension: f32,
    pub cohesion_radius: f32,
}

impl Default for ModeParams {
    fn default() -> Self {
        ModeParams {
            gravity: 0.0,
            floor: None,
            ceiling: None,
            bounce: 0.0,
            impact_friction: 1.0,
            friction: 1.0,
            viscosity: 1.0,
            turbulence: 0.0,
            attraction_strength: 0.0,
            attraction_range: 0.0,
            attraction_falloff: 1.5,
            jump_chance: 0.0,
            jump_radius: 0.0,
            phase_chance: 0.0,
            entangle_chance: 0.0,
            entangle_strength: 0.0,
            surface_tension: 0.0,
            cohesion_radius: 0.0,
        }
    }
}

impl ModeParams {
    pub fn attracts(&self) -> bool {
        self.attraction_strength > 0.0 && self.attraction_range > 0.0
    }

    pub fn is_quantum(&self) -> bool {
        self.jump_chance > 0.0 || self.phase_chance > 0.0 || self.entangle_chance > 0.0
    }

    pub fn has_cohesion(&self) -> bool {
        self.surface_tension > 0.0 && self.cohesion_radius > 0.0
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
