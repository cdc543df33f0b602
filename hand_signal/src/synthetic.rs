//! Synthetic 21-point hands for the simulated landmark source and tests.
//!
//! Layouts are in "hand units" (palm length ≈ 1, y grows downward like image
//! space) and get placed, rotated, mirrored and sized by [`SyntheticHand`].

use glam::{Vec2, Vec3};
use rand::Rng;

use crate::landmark::{Hand, LANDMARK_COUNT};

/// A static pose the generator knows how to lay out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandPose {
    Fist,
    /// `n` digits extended: 1 = index, 2 = thumb + index,
    /// 3 = index..ring, 4 = index..pinky, 5 = all.  0 is a fist.
    Fingers(u8),
    /// Thumb and index tips touching, remaining three fingers extended.
    Pinch,
    /// Index and middle extended, others folded.
    Peace,
}

impl HandPose {
    pub const ALL: [HandPose; 8] = [
        HandPose::Fist,
        HandPose::Fingers(1),
        HandPose::Fingers(2),
        HandPose::Fingers(3),
        HandPose::Fingers(4),
        HandPose::Fingers(5),
        HandPose::Pinch,
        HandPose::Peace,
    ];

    pub fn name(self) -> String {
        match self {
            HandPose::Fist | HandPose::Fingers(0) => "fist".to_string(),
            HandPose::Fingers(n) => format!("{n} fingers"),
            HandPose::Pinch => "pinch".to_string(),
            HandPose::Peace => "peace".to_string(),
        }
    }
}

#[derive(Clone, Copy)]
enum Thumb {
    Extended,
    Curled,
    Pinching,
}

#[derive(Clone, Copy)]
enum Finger {
    Extended,
    Curled,
    Pinching,
}

/// thumb + [index, middle, ring, pinky]
fn digit_layout(pose: HandPose) -> (Thumb, [Finger; 4]) {
    use Finger::{Curled as C, Extended as E};
    match pose {
        HandPose::Fist | HandPose::Fingers(0) => (Thumb::Curled, [C, C, C, C]),
        HandPose::Fingers(1) => (Thumb::Curled, [E, C, C, C]),
        HandPose::Fingers(2) => (Thumb::Extended, [E, C, C, C]),
        HandPose::Fingers(3) => (Thumb::Curled, [E, E, E, C]),
        HandPose::Fingers(4) => (Thumb::Curled, [E, E, E, E]),
        HandPose::Fingers(_) => (Thumb::Extended, [E, E, E, E]),
        HandPose::Pinch => (Thumb::Pinching, [Finger::Pinching, E, E, E]),
        HandPose::Peace => (Thumb::Curled, [E, E, C, C]),
    }
}

const FINGER_BASES: [Vec2; 4] = [
    Vec2::new(-0.35, -1.0),
    Vec2::new(-0.10, -1.05),
    Vec2::new(0.12, -1.0),
    Vec2::new(0.33, -0.9),
];
const FINGER_LENGTHS: [f32; 4] = [1.0, 1.1, 1.0, 0.85];

fn layout(pose: HandPose) -> [Vec2; LANDMARK_COUNT] {
    let mut pts = [Vec2::ZERO; LANDMARK_COUNT];
    let (thumb, fingers) = digit_layout(pose);

    pts[1] = Vec2::new(-0.25, -0.25);
    pts[2] = Vec2::new(-0.45, -0.45);
    let (ip, tip) = match thumb {
        Thumb::Extended => (Vec2::new(-0.65, -0.6), Vec2::new(-0.85, -0.72)),
        Thumb::Curled => (Vec2::new(-0.4, -0.62), Vec2::new(-0.3, -0.72)),
        Thumb::Pinching => (Vec2::new(-0.55, -0.8), Vec2::new(-0.58, -1.1)),
    };
    pts[3] = ip;
    pts[4] = tip;

    for (f, state) in fingers.iter().enumerate() {
        let base = FINGER_BASES[f];
        let len = FINGER_LENGTHS[f];
        let up = |d: f32| base + Vec2::new(0.0, -d);
        let joints = match state {
            Finger::Extended => [up(0.45 * len), up(0.75 * len), up(len)],
            Finger::Curled => [up(0.35), up(0.1), up(-0.3)],
            Finger::Pinching => [
                Vec2::new(-0.42, -1.38),
                Vec2::new(-0.55, -1.38),
                Vec2::new(-0.6, -1.18),
            ],
        };
        let mcp = 5 + f * 4;
        pts[mcp] = base;
        pts[mcp + 1..mcp + 4].copy_from_slice(&joints);
    }
    pts
}

// ════════════════════════════════════════════════════════════════════════════
// SyntheticHand
// ════════════════════════════════════════════════════════════════════════════

/// Builder placing a [`HandPose`] in normalized image space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticHand {
    pub pose: HandPose,
    pub wrist: Vec2,
    /// Palm length in normalized image units.
    pub size: f32,
    pub mirrored: bool,
    /// In-plane rotation about the wrist (radians).
    pub rotation: f32,
}

impl SyntheticHand {
    pub fn new(pose: HandPose) -> Self {
        SyntheticHand {
            pose,
            wrist: Vec2::new(0.5, 0.8),
            size: 0.18,
            mirrored: false,
            rotation: 0.0,
        }
    }

    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.wrist = Vec2::new(x, y);
        self
    }

    pub fn size(mut self, size: f32) -> Self {
        self.size = size;
        self
    }

    pub fn mirrored(mut self, mirrored: bool) -> Self {
        self.mirrored = mirrored;
        self
    }

    pub fn rotated(mut self, radians: f32) -> Self {
        self.rotation = radians;
        self
    }

    pub fn build(&self) -> Hand {
        let (sin, cos) = self.rotation.sin_cos();
        let mut points = [Vec3::ZERO; LANDMARK_COUNT];
        for (dst, p) in points.iter_mut().zip(layout(self.pose)) {
            let x = if self.mirrored { -p.x } else { p.x };
            let r = Vec2::new(x * cos - p.y * sin, x * sin + p.y * cos);
            let img = self.wrist + r * self.size;
            *dst = Vec3::new(img.x, img.y, 0.0);
        }
        Hand::new(points)
    }

    /// Same as [`build`](Self::build) with uniform ±`amount` noise per coordinate.
    pub fn build_with_jitter<R: Rng>(&self, rng: &mut R, amount: f32) -> Hand {
        let mut hand = self.build();
        if amount > 0.0 {
            for p in hand.points.iter_mut() {
                *p += Vec3::new(
                    rng.gen_range(-amount..=amount),
                    rng.gen_range(-amount..=amount),
                    rng.gen_range(-amount..=amount),
                );
            }
        }
        hand
    }
}
