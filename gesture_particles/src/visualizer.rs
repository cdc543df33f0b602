//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                                                          │
//! │     particle field (perspective, additive)               │
//! │        + hand skeleton overlay (image space)             │
//! │        + attractor markers                               │
//! │                                                          │
//! ├──────────────────────────────────────────────────────────┤
//! │  status: gesture · confidence · mode · fps               │
//! │  key legend                                              │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! The controls are applied here, as a per-particle displacement on top of
//! the simulated positions.

use std::sync::mpsc::Sender;

use glam::{Quat, Vec2, Vec3};
use minifb::{Key, KeyRepeat, MouseMode, Window, WindowOptions};

use hand_signal::landmark::HAND_SKELETON;
use hand_signal::synthetic::HandPose;
use hand_signal::{GestureState, LandmarkFrame};
use particle_physics::PhysicsMode;

use crate::controls::ControlState;
use crate::error::AppError;
use crate::source::{loop_period, SimInput};

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

/// Render frame cap used when none (or a non-finite one) is configured.
pub const DEFAULT_FRAME_HZ: f64 = 60.0;

pub const WIN_W:     usize = 960;
pub const WIN_H:     usize = 640;
const STATUS_H:      usize = 40;
const VIEW_H:        usize = WIN_H - STATUS_H;
const STATUS_Y:      usize = VIEW_H;
const CAMERA_Z:      f32   = 12.0;
const FOCAL:         f32   = 520.0;
const BG_COLOR:      u32   = 0xFF0B0B1A;
const TEXT_BG:       u32   = 0xFF0F3460;
const SKELETON:      u32   = 0xFF55FF99;
const ATTRACTOR:     u32   = 0xFFFFD700;   // gold
const TWIST_STEP:    f32   = 0.08;         // radians per held-key repeat

const PALETTE: [u32; 4] = [0xFF4FC3F7, 0xFFFF8A65, 0xFFBA68C8, 0xFF81C784];

// ════════════════════════════════════════════════════════════════════════════
// Commands and frame snapshot
// ════════════════════════════════════════════════════════════════════════════

/// Window input that the application loop acts on (everything else goes to
/// the simulated landmark source).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    ToggleGestures,
    ToggleDetection,
    CycleMode,
}

/// Everything drawn in one frame.
pub struct FrameView<'a> {
    pub positions:        &'a [Vec3],
    pub species:          &'a [u8],
    pub controls:         &'a ControlState,
    pub clock:            f64,
    pub landmarks:        &'a LandmarkFrame,
    pub attractors:       &'a [Vec3],
    pub gesture:          &'a GestureState,
    pub mode:             PhysicsMode,
    pub fps:              f32,
    pub detecting:        bool,
    pub gestures_enabled: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:    Window,
    buf:       Vec<u32>,
    sim_tx:    Option<Sender<SimInput>>,
    // Last state sent to the simulator, replayed to a restarted source.
    pose:      Option<HandPose>,
    two_hands: bool,
    pointer:   Option<Vec2>,
}

impl Visualizer {
    pub fn new(frame_hz: f64) -> Result<Self, AppError> {
        let mut window = Window::new(
            "Gesture Particles",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        ).map_err(|e| AppError::Window(e.to_string()))?;

        window.limit_update_rate(Some(loop_period(frame_hz, DEFAULT_FRAME_HZ, 10.0, 240.0)));

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx: None,
            pose: None,
            two_hands: false,
            pointer: None,
        })
    }

    /// Route simulated input to a (new) source and bring it up to date.
    pub fn set_sim_sender(&mut self, tx: Option<Sender<SimInput>>) {
        self.sim_tx = tx;
        self.send(SimInput::Pose(self.pose));
        self.send(SimInput::TwoHands(self.two_hands));
        if let Some(p) = self.pointer {
            self.send(SimInput::Pointer(p));
        }
    }

    /// Returns false when the window should close.
    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Whether the window has focus.
    pub fn is_active(&mut self) -> bool { self.window.is_active() }

    /// Poll keyboard/mouse; simulator input is forwarded, the rest returned.
    pub fn poll_input(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        if !self.window.is_open() {
            commands.push(Command::Quit);
            return commands;
        }

        let mut inputs = Vec::new();
        {
            // Keys that trigger on first press only
            let one_shot = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);
            // Keys that repeat while held
            let held = |k: Key| self.window.is_key_pressed(k, KeyRepeat::Yes);

            if one_shot(Key::Q) || one_shot(Key::Escape) {
                commands.push(Command::Quit);
            }
            if one_shot(Key::G) { commands.push(Command::ToggleGestures); }
            if one_shot(Key::C) { commands.push(Command::ToggleDetection); }
            if one_shot(Key::M) { commands.push(Command::CycleMode); }

            let poses = [
                (Key::Key0, Some(HandPose::Fist)),
                (Key::Key1, Some(HandPose::Fingers(1))),
                (Key::Key2, Some(HandPose::Fingers(2))),
                (Key::Key3, Some(HandPose::Fingers(3))),
                (Key::Key4, Some(HandPose::Fingers(4))),
                (Key::Key5, Some(HandPose::Fingers(5))),
                (Key::P, Some(HandPose::Pinch)),
                (Key::V, Some(HandPose::Peace)),
                (Key::H, None),
            ];
            for (key, pose) in poses {
                if one_shot(key) {
                    inputs.push(SimInput::Pose(pose));
                }
            }
            if one_shot(Key::Tab) {
                inputs.push(SimInput::TwoHands(!self.two_hands));
            }
            if held(Key::R) { inputs.push(SimInput::Twist(TWIST_STEP)); }
            if held(Key::E) { inputs.push(SimInput::Twist(-TWIST_STEP)); }
        }

        if let Some((mx, my)) = self.window.get_mouse_pos(MouseMode::Discard) {
            let p = Vec2::new(mx / WIN_W as f32, my / VIEW_H as f32);
            if self.pointer.map_or(true, |old| old.distance(p) > 1e-3) {
                inputs.push(SimInput::Pointer(p));
            }
        }

        for input in inputs {
            match &input {
                SimInput::Pose(pose) => self.pose = *pose,
                SimInput::TwoHands(on) => self.two_hands = *on,
                SimInput::Pointer(p) => self.pointer = Some(*p),
                SimInput::Twist(_) => {}
            }
            self.send(input);
        }
        commands
    }

    fn send(&self, input: SimInput) {
        if let Some(tx) = &self.sim_tx {
            let _ = tx.send(input);
        }
    }

    /// Render one frame.
    pub fn render(&mut self, view: &FrameView) {
        // Clear
        self.buf.fill(BG_COLOR);

        // ── Particles ─────────────────────────────────────────────────────
        for (i, p) in view.positions.iter().enumerate() {
            let q = displace(*p, view.controls, view.clock);
            if let Some((x, y, depth)) = project(q) {
                let species = view.species.get(i).copied().unwrap_or(0) as usize;
                let color = PALETTE[species % PALETTE.len()];
                let intensity = (0.35 + 0.5 * (1.0 - depth / (2.0 * CAMERA_Z))).clamp(0.1, 0.9);
                self.add_pixel(x, y, color, intensity);
            }
        }

        // ── Attractor markers ─────────────────────────────────────────────
        for a in view.attractors {
            if let Some((x, y, _)) = project(*a) {
                self.draw_diamond(x, y, 3, ATTRACTOR);
            }
        }

        // ── Hand skeletons (image space) ──────────────────────────────────
        for hand in &view.landmarks.hands {
            let to_px = |i: usize| {
                let p = hand.point(i);
                ((p.x * WIN_W as f32) as isize, (p.y * VIEW_H as f32) as isize)
            };
            for &(a, b) in HAND_SKELETON.iter() {
                let (x0, y0) = to_px(a);
                let (x1, y1) = to_px(b);
                self.draw_line(x0, y0, x1, y1, SKELETON);
            }
        }

        // ── Status bar ────────────────────────────────────────────────────
        self.fill_rect(0, STATUS_Y, WIN_W, STATUS_H, TEXT_BG);
        let status = format!(
            "GESTURE {}  {:.2}   MODE {}   FPS {:.0}   PARTICLES {}   DETECT {}   GESTURES {}",
            view.gesture.active_label,
            view.gesture.confidence,
            view.mode,
            view.fps,
            view.positions.len(),
            if view.detecting { "ON" } else { "OFF" },
            if view.gestures_enabled { "ON" } else { "OFF" },
        );
        self.draw_label(&status, 10, STATUS_Y + 8, 0xFFEEEEEE);

        // ── Key legend ────────────────────────────────────────────────────
        self.draw_label(
            "0-5 P V=pose  H=hide  TAB=two hands  R/E=twist  G=gestures  C=detection  M=mode  Q=quit",
            10, WIN_H - 12, 0xFF888888,
        );

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H).ok();
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, color: u32) {
        for row in y..(y+h).min(WIN_H) {
            for col in x..(x+w).min(WIN_W) {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn set_pixel(&mut self, x: usize, y: usize, color: u32) {
        if x < WIN_W && y < WIN_H {
            self.buf[y * WIN_W + x] = color;
        }
    }

    fn add_pixel(&mut self, x: usize, y: usize, color: u32, intensity: f32) {
        if x < WIN_W && y < VIEW_H {
            let px = &mut self.buf[y * WIN_W + x];
            *px = add_color(*px, color, intensity);
        }
    }

    fn draw_line(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, color: u32) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            if x >= 0 && y >= 0 && (y as usize) < VIEW_H {
                self.set_pixel(x as usize, y as usize, color);
            }
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    fn draw_diamond(&mut self, cx: usize, cy: usize, r: usize, color: u32) {
        for dy in 0..=r as isize {
            let dx = r as isize - dy;
            for &(sx, sy) in &[
                (cx as isize + dx, cy as isize + dy),
                (cx as isize - dx, cy as isize + dy),
                (cx as isize + dx, cy as isize - dy),
                (cx as isize - dx, cy as isize - dy),
            ] {
                if sx >= 0 && sy >= 0 && (sy as usize) < VIEW_H {
                    self.set_pixel(sx as usize, sy as usize, color);
                }
            }
        }
    }

    /// Minimal bitmap font: 3×5 characters for status rendering.
    /// Each character is encoded as 5 rows × 3 bits.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel(cx + col, y + row, color);
                    }
                }
            }
            cx += 4; // 3 wide + 1 gap
            if cx + 4 > WIN_W { break; }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Control displacement and projection
// ────────────────────────────────────────────────────────────────────────────

/// Apply the smoothed controls to one simulated position.
pub(crate) fn displace(p: Vec3, c: &ControlState, clock: f64) -> Vec3 {
    let t = clock as f32;
    let mut q = p * c.expansion.current * (1.0 + 1.5 * c.explosion.current);

    // swirl twists outer particles further than inner ones
    let radius = Vec2::new(q.x, q.z).length();
    q = Quat::from_rotation_y(c.rotation_angle + c.swirl.current * radius * 0.35) * q;

    let wiggle = c.wiggle.current * 0.15;
    q.x += (q.y * 3.0 + t * 4.0).sin() * wiggle;
    q.y += (q.x * 3.0 + t * 5.2).cos() * wiggle;

    q *= 1.0 + 0.12 * c.pulse.current * (t * 8.0).sin();
    q += c.wind.current * 0.4;

    let strength = c.attractor_strength.current;
    if strength > 0.0 {
        let d = c.attractor_position.current - q;
        q += d * (strength * 0.35 / (1.0 + 0.1 * d.length_squared()));
    }
    q
}

/// World → pixel (x, y) plus camera depth; `None` when off screen.
pub(crate) fn project(q: Vec3) -> Option<(usize, usize, f32)> {
    let depth = CAMERA_Z - q.z;
    if depth <= 0.1 {
        return None;
    }
    let s = FOCAL / depth;
    let x = WIN_W as f32 / 2.0 + q.x * s;
    let y = VIEW_H as f32 / 2.0 - q.y * s;
    if x < 0.0 || y < 0.0 || x >= WIN_W as f32 || y >= VIEW_H as f32 {
        return None;
    }
    Some((x as usize, y as usize, depth))
}

/// Additive blend of `color × intensity` onto `dst`, saturating per channel.
fn add_color(dst: u32, color: u32, intensity: f32) -> u32 {
    let channel = |shift: u32| {
        let d = (dst >> shift) & 0xFF;
        let c = (((color >> shift) & 0xFF) as f32 * intensity) as u32;
        (d + c).min(0xFF) << shift
    };
    0xFF000000 | channel(16) | channel(8) | channel(0)
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0' => [0b111, 0b101, 0b101, 0b101, 0b111],
        '1' => [0b010, 0b110, 0b010, 0b010, 0b111],
        '2' => [0b111, 0b001, 0b111, 0b100, 0b111],
        '3' => [0b111, 0b001, 0b111, 0b001, 0b111],
        '4' => [0b101, 0b101, 0b111, 0b001, 0b001],
        '5' => [0b111, 0b100, 0b111, 0b001, 0b111],
        '6' => [0b111, 0b100, 0b111, 0b101, 0b111],
        '7' => [0b111, 0b001, 0b001, 0b001, 0b001],
        '8' => [0b111, 0b101, 0b111, 0b101, 0b111],
        '9' => [0b111, 0b101, 0b111, 0b001, 0b111],
        'a' | 'A' => [0b111, 0b101, 0b111, 0b101, 0b101],
        'b' | 'B' => [0b110, 0b101, 0b110, 0b101, 0b110],
        'c' | 'C' => [0b111, 0b100, 0b100, 0b100, 0b111],
        'd' | 'D' => [0b110, 0b101, 0b101, 0b101, 0b110],
        'e' | 'E' => [0b111, 0b100, 0b111, 0b100, 0b111],
        'f' | 'F' => [0b111, 0b100, 0b111, 0b100, 0b100],
        'g' | 'G' => [0b111, 0b100, 0b101, 0b101, 0b111],
        'h' | 'H' => [0b101, 0b101, 0b111, 0b101, 0b101],
        'i' | 'I' => [0b111, 0b010, 0b010, 0b010, 0b111],
        'j' | 'J' => [0b001, 0b001, 0b001, 0b101, 0b111],
        'k' | 'K' => [0b101, 0b101, 0b110, 0b101, 0b101],
        'l' | 'L' => [0b100, 0b100, 0b100, 0b100, 0b111],
        'm' | 'M' => [0b101, 0b111, 0b101, 0b101, 0b101],
        'n' | 'N' => [0b111, 0b101, 0b101, 0b101, 0b101],
        'o' | 'O' => [0b111, 0b101, 0b101, 0b101, 0b111],
        'p' | 'P' => [0b111, 0b101, 0b111, 0b100, 0b100],
        'q' | 'Q' => [0b111, 0b101, 0b101, 0b111, 0b001],
        'r' | 'R' => [0b110, 0b101, 0b110, 0b101, 0b101],
        's' | 'S' => [0b111, 0b100, 0b111, 0b001, 0b111],
        't' | 'T' => [0b111, 0b010, 0b010, 0b010, 0b010],
        'u' | 'U' => [0b101, 0b101, 0b101, 0b101, 0b111],
        'v' | 'V' => [0b101, 0b101, 0b101, 0b010, 0b010],
        'w' | 'W' => [0b101, 0b101, 0b101, 0b111, 0b101],
        'x' | 'X' => [0b101, 0b101, 0b010, 0b101, 0b101],
        'y' | 'Y' => [0b101, 0b101, 0b111, 0b010, 0b010],
        'z' | 'Z' => [0b111, 0b001, 0b010, 0b100, 0b111],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '+' => [0b000, 0b010, 0b111, 0b010, 0b000],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        _   => [0b000, 0b000, 0b010, 0b000, 0b000], // fallback dot
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
