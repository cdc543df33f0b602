//! Landmark sources and the throttled detection loop.
//!
//! The public interface is [`LandmarkFrame`]s delivered over a `mpsc`
//! channel.  Consumers don't need to know whether frames came from real
//! hardware or the keyboard/mouse simulator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use glam::Vec2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use hand_signal::synthetic::{HandPose, SyntheticHand};
use hand_signal::LandmarkFrame;

use crate::error::SourceError;

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource trait — unified interface for hw and sim
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can produce a [`LandmarkFrame`] on request.
pub trait LandmarkSource: Send + 'static {
    /// Detect hands for the frame at `timestamp` (seconds, monotonic).
    fn detect_for_frame(&mut self, timestamp: f64) -> Result<LandmarkFrame, SourceError>;

    fn name(&self) -> &'static str;

    /// Release the underlying capture resource.
    fn close(&mut self) {}
}

// ════════════════════════════════════════════════════════════════════════════
// Detection loop
// ════════════════════════════════════════════════════════════════════════════

/// Handle to a running detection thread.  Dropping it stops the thread.
pub struct DetectionHandle {
    rx: Receiver<LandmarkFrame>,
    paused: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

/// Detection rate used when none (or a non-finite one) is configured.
pub const DEFAULT_DETECT_HZ: f64 = 20.0;

/// Period of a loop running `hz` times per second, clamped to
/// `[min_hz, max_hz]`.  Non-finite rates fall back to `fallback_hz`.
pub(crate) fn loop_period(hz: f64, fallback_hz: f64, min_hz: f64, max_hz: f64) -> Duration {
    let hz = if hz.is_finite() { hz } else { fallback_hz };
    Duration::from_secs_f64(1.0 / hz.clamp(min_hz, max_hz))
}

/// Spawn `source` on its own thread, polled `hz` times per second.
pub fn spawn_detection<S: LandmarkSource>(mut source: S, hz: f64) -> DetectionHandle {
    let (tx, rx) = mpsc::channel();
    let paused = Arc::new(AtomicBool::new(false));
    let stop = Arc::new(AtomicBool::new(false));
    let interval = loop_period(hz, DEFAULT_DETECT_HZ, 1.0, 240.0);

    let thread_paused = Arc::clone(&paused);
    let thread_stop = Arc::clone(&stop);
    let worker = thread::spawn(move || {
        info!(source = source.name(), hz, "detection started");
        let epoch = Instant::now();
        let mut failing = false;
        let mut next = Instant::now();

        while !thread_stop.load(Ordering::Relaxed) {
            if !thread_paused.load(Ordering::Relaxed) {
                let t = epoch.elapsed().as_secs_f64();
                let frame = match source.detect_for_frame(t) {
                    Ok(frame) => {
                        if failing {
                            info!(source = source.name(), "landmark source recovered");
                            failing = false;
                        }
                        frame
                    }
                    Err(e) => {
                        if !failing {
                            warn!(source = source.name(), "landmark source failed: {e}");
                            failing = true;
                        }
                        LandmarkFrame::empty(t)
                    }
                };
                if tx.send(frame).is_err() {
                    break;
                }
            }
            next += interval;
            let now = Instant::now();
            if next > now {
                thread::sleep(next - now);
            } else {
                next = now;
            }
        }

        source.close();
        info!(source = source.name(), "detection stopped");
    });

    DetectionHandle {
        rx,
        paused,
        stop,
        worker: Some(worker),
    }
}

impl DetectionHandle {
    /// The most recent frame since the last poll; older ones are dropped.
    pub fn poll_latest(&self) -> Option<LandmarkFrame> {
        let mut latest = None;
        loop {
            match self.rx.try_recv() {
                Ok(frame) => latest = Some(frame),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        latest
    }

    /// Skip detection without tearing the source down.
    pub fn pause(&self, paused: bool) {
        if self.paused.swap(paused, Ordering::Relaxed) != paused {
            debug!(paused, "detection pause toggled");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Stop the thread and release the source.  Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("detection thread panicked");
            }
        }
    }
}

impl Drop for DetectionHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource — keyboard/mouse simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the simulation window.
#[derive(Clone, Debug, PartialEq)]
pub enum SimInput {
    /// Show `pose` on every simulated hand; `None` hides the hands.
    Pose(Option<HandPose>),
    /// Primary wrist position in normalized image coordinates.
    Pointer(Vec2),
    /// Add a mirrored second hand.
    TwoHands(bool),
    /// Rotate the hands in-plane by this many radians.
    Twist(f32),
}

/// Synthetic hands driven by [`SimInput`] events (from the visualizer's
/// window), with a little seeded jitter so the filters have work to do.
pub struct SimLandmarkSource {
    rx: Receiver<SimInput>,
    pose: Option<HandPose>,
    wrist: Vec2,
    two_hands: bool,
    rotation: f32,
    jitter: f32,
    rng: StdRng,
}

impl SimLandmarkSource {
    pub fn new(rx: Receiver<SimInput>, seed: u64) -> Self {
        SimLandmarkSource {
            rx,
            pose: None,
            wrist: Vec2::new(0.5, 0.75),
            two_hands: false,
            rotation: 0.0,
            jitter: 0.002,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_jitter(mut self, amount: f32) -> Self {
        self.jitter = amount.max(0.0);
        self
    }

    fn apply(&mut self, input: SimInput) {
        match input {
            SimInput::Pose(pose) => self.pose = pose,
            SimInput::Pointer(p) => self.wrist = p.clamp(Vec2::ZERO, Vec2::ONE),
            SimInput::TwoHands(on) => self.two_hands = on,
            SimInput::Twist(delta) => self.rotation += delta,
        }
    }
}

impl LandmarkSource for SimLandmarkSource {
    fn detect_for_frame(&mut self, timestamp: f64) -> Result<LandmarkFrame, SourceError> {
        loop {
            match self.rx.try_recv() {
                Ok(input) => self.apply(input),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => return Err(SourceError::Disconnected),
            }
        }

        let Some(pose) = self.pose else {
            return Ok(LandmarkFrame::empty(timestamp));
        };

        let primary = SyntheticHand::new(pose)
            .at(self.wrist.x, self.wrist.y)
            .rotated(self.rotation);
        let mut hands = vec![primary.build_with_jitter(&mut self.rng, self.jitter)];
        if self.two_hands {
            let second = SyntheticHand::new(pose)
                .at(1.0 - self.wrist.x, self.wrist.y)
                .mirrored(true)
                .rotated(-self.rotation);
            hands.push(second.build_with_jitter(&mut self.rng, self.jitter));
        }
        Ok(LandmarkFrame::new(timestamp, hands))
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandHold — last tracked hands with an expiry
// ════════════════════════════════════════════════════════════════════════════

/// Hands from the newest tracking frame, valid for `max_age` seconds.
/// Once they expire they are dropped, so a stalled device reads as "no
/// hands" instead of freezing the last pose.
#[cfg_attr(not(feature = "leap"), allow(dead_code))]
#[derive(Clone, Debug)]
pub(crate) struct HandHold {
    hands: Vec<hand_signal::Hand>,
    seen_at: Option<f64>,
    max_age: f64,
}

#[cfg_attr(not(feature = "leap"), allow(dead_code))]
impl HandHold {
    pub(crate) fn new(max_age: f64) -> Self {
        HandHold {
            hands: Vec::new(),
            seen_at: None,
            max_age,
        }
    }

    pub(crate) fn refresh(&mut self, hands: Vec<hand_signal::Hand>, t: f64) {
        self.hands = hands;
        self.seen_at = Some(t);
    }

    /// Hands still valid at `t`, or `None` once the hold has expired.
    pub(crate) fn current(&mut self, t: f64) -> Option<&[hand_signal::Hand]> {
        match self.seen_at {
            Some(seen) if t - seen <= self.max_age => Some(&self.hands),
            _ => {
                self.hands.clear();
                self.seen_at = None;
                None
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapLandmarkSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Landmark source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
///
/// Leap reports bones in millimetres above the device.  Each digit's bone
/// joints are laid onto the 21-point layout (thumb CMC…tip, then MCP, PIP,
/// DIP, tip for each finger) and projected into normalized image space as
/// if a camera looked down at the hands from above.
///
/// The device streams faster than detection runs, so every call drains the
/// queued messages and keeps only the newest tracking frame.
#[cfg(feature = "leap")]
pub struct LeapLandmarkSource {
    connection: leaprs::Connection,
    hold: HandHold,
}

#[cfg(feature = "leap")]
impl LeapLandmarkSource {
    /// Horizontal half-width of the tracked volume (mm).
    const HALF_WIDTH: f32 = 200.0;
    const MIN_HEIGHT: f32 = 80.0;
    const MAX_HEIGHT: f32 = 450.0;
    /// Seconds without a tracking frame before the device counts as gone.
    const STALE_AFTER: f64 = 0.5;
    /// Upper bound on messages drained per call.
    const MAX_DRAIN: usize = 256;

    pub fn open() -> Result<Self, SourceError> {
        use leaprs::{Connection, ConnectionConfig};

        let mut connection = Connection::create(ConnectionConfig::default())
            .map_err(|e| SourceError::Unavailable(format!("{e:?}")))?;
        connection
            .open()
            .map_err(|e| SourceError::Unavailable(format!("{e:?}")))?;
        Ok(LeapLandmarkSource {
            connection,
            hold: HandHold::new(Self::STALE_AFTER),
        })
    }

    fn to_image(x: f32, y: f32, z: f32) -> glam::Vec3 {
        let span = Self::MAX_HEIGHT - Self::MIN_HEIGHT;
        glam::Vec3::new(
            0.5 + x / (2.0 * Self::HALF_WIDTH),
            1.0 - (y - Self::MIN_HEIGHT) / span,
            z / span,
        )
    }
}

#[cfg(feature = "leap")]
impl LandmarkSource for LeapLandmarkSource {
    fn detect_for_frame(&mut self, timestamp: f64) -> Result<LandmarkFrame, SourceError> {
        use leaprs::Event;

        // Drain everything queued; a poll error means the queue is empty
        // (or the device is gone, which the hold expiry catches).
        let mut newest: Option<Vec<Vec<glam::Vec3>>> = None;
        for _ in 0..Self::MAX_DRAIN {
            let msg = match self.connection.poll(0) {
                Ok(m) => m,
                Err(_) => break,
            };
            if let Event::Tracking(frame) = msg.event() {
                let mut raw: Vec<Vec<glam::Vec3>> = Vec::new();
                for hand in frame.hands() {
                    let digits: Vec<_> = hand.digits().collect();
                    if digits.len() < 5 {
                        continue;
                    }
                    let mut points = Vec::with_capacity(hand_signal::LANDMARK_COUNT);
                    let wrist = digits[2].metacarpal().prev_joint();
                    points.push(Self::to_image(wrist.x, wrist.y, wrist.z));

                    let thumb = &digits[0];
                    for joint in [
                        thumb.metacarpal().next_joint(),
                        thumb.proximal().next_joint(),
                        thumb.intermediate().next_joint(),
                        thumb.distal().next_joint(),
                    ] {
                        points.push(Self::to_image(joint.x, joint.y, joint.z));
                    }
                    for digit in &digits[1..5] {
                        for joint in [
                            digit.proximal().prev_joint(),
                            digit.intermediate().prev_joint(),
                            digit.distal().prev_joint(),
                            digit.distal().next_joint(),
                        ] {
                            points.push(Self::to_image(joint.x, joint.y, joint.z));
                        }
                    }
                    raw.push(points);
                }
                newest = Some(raw);
            }
        }

        if let Some(raw) = newest {
            let assembled = LandmarkFrame::from_raw(timestamp, &raw);
            self.hold.refresh(assembled.hands, timestamp);
        }

        match self.hold.current(timestamp) {
            Some(hands) => Ok(LandmarkFrame::new(timestamp, hands.to_vec())),
            None => Err(SourceError::Unavailable("no tracking frames".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "leap"
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting {
        n: usize,
        fail: bool,
        closed: Arc<AtomicBool>,
    }

    impl LandmarkSource for Counting {
        fn detect_for_frame(&mut self, t: f64) -> Result<LandmarkFrame, SourceError> {
            self.n += 1;
            if self.fail {
                return Err(SourceError::PermissionDenied);
            }
            Ok(LandmarkFrame::empty(t))
        }

        fn name(&self) -> &'static str {
            "counting"
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::Relaxed);
        }
    }

    #[test]
    fn sim_source_follows_inputs() {
        let (tx, rx) = mpsc::channel();
        let mut src = SimLandmarkSource::new(rx, 1).with_jitter(0.0);
        assert!(src.detect_for_frame(0.0).unwrap().is_empty());

        tx.send(SimInput::Pose(Some(HandPose::Fist))).unwrap();
        tx.send(SimInput::Pointer(Vec2::new(0.3, 0.6))).unwrap();
        let f = src.detect_for_frame(0.05).unwrap();
        assert_eq!(f.hand_count(), 1);
        assert_eq!(f.hands[0].wrist().truncate(), Vec2::new(0.3, 0.6));

        tx.send(SimInput::TwoHands(true)).unwrap();
        let f = src.detect_for_frame(0.1).unwrap();
        assert_eq!(f.hand_count(), 2);
        assert!((f.hands[1].wrist().x - 0.7).abs() < 1e-6);

        tx.send(SimInput::Pose(None)).unwrap();
        assert!(src.detect_for_frame(0.15).unwrap().is_empty());
    }

    #[test]
    fn sim_source_reports_closed_channel() {
        let (tx, rx) = mpsc::channel();
        let mut src = SimLandmarkSource::new(rx, 1);
        drop(tx);
        assert_eq!(src.detect_for_frame(0.0), Err(SourceError::Disconnected));
    }

    #[test]
    fn detection_delivers_latest_frame() {
        let closed = Arc::new(AtomicBool::new(false));
        let src = Counting { n: 0, fail: false, closed: Arc::clone(&closed) };
        let mut handle = spawn_detection(src, 100.0);
        thread::sleep(Duration::from_millis(100));
        let frame = handle.poll_latest().expect("frames should arrive");
        assert!(frame.timestamp > 0.0);
        handle.stop();
        assert!(!handle.is_running());
        assert!(closed.load(Ordering::Relaxed));
        handle.stop();
    }

    #[test]
    fn failing_source_yields_empty_frames() {
        let closed = Arc::new(AtomicBool::new(false));
        let src = Counting { n: 0, fail: true, closed };
        let handle = spawn_detection(src, 100.0);
        thread::sleep(Duration::from_millis(60));
        let frame = handle.poll_latest().expect("loop keeps running");
        assert!(frame.is_empty());
    }

    #[test]
    fn paused_detection_sends_nothing() {
        let closed = Arc::new(AtomicBool::new(false));
        let src = Counting { n: 0, fail: false, closed };
        let handle = spawn_detection(src, 100.0);
        handle.pause(true);
        assert!(handle.is_paused());
        thread::sleep(Duration::from_millis(30));
        handle.poll_latest();
        thread::sleep(Duration::from_millis(60));
        assert!(handle.poll_latest().is_none());
        handle.pause(false);
        thread::sleep(Duration::from_millis(60));
        assert!(handle.poll_latest().is_some());
    }

    #[test]
    fn non_finite_rates_fall_back() {
        let fallback = Duration::from_secs_f64(1.0 / DEFAULT_DETECT_HZ);
        assert_eq!(loop_period(f64::NAN, DEFAULT_DETECT_HZ, 1.0, 240.0), fallback);
        assert_eq!(loop_period(f64::INFINITY, DEFAULT_DETECT_HZ, 1.0, 240.0), fallback);
        assert_eq!(loop_period(0.0, DEFAULT_DETECT_HZ, 1.0, 240.0), Duration::from_secs(1));
        assert_eq!(
            loop_period(1000.0, DEFAULT_DETECT_HZ, 1.0, 240.0),
            Duration::from_secs_f64(1.0 / 240.0)
        );
    }

    #[test]
    fn nan_rate_detection_still_runs() {
        let closed = Arc::new(AtomicBool::new(false));
        let src = Counting { n: 0, fail: false, closed };
        let mut handle = spawn_detection(src, f64::NAN);
        thread::sleep(Duration::from_millis(150));
        assert!(handle.poll_latest().is_some());
        handle.stop();
    }

    #[test]
    fn hand_hold_keeps_fresh_hands() {
        let hand = hand_signal::synthetic::SyntheticHand::new(HandPose::Fist).build();
        let mut hold = HandHold::new(0.5);
        assert!(hold.current(0.0).is_none());
        hold.refresh(vec![hand], 1.0);
        assert_eq!(hold.current(1.2).map(<[_]>::len), Some(1));
        assert_eq!(hold.current(1.5).map(<[_]>::len), Some(1));
    }

    #[test]
    fn stale_hands_are_dropped() {
        let hand = hand_signal::synthetic::SyntheticHand::new(HandPose::Fist).build();
        let mut hold = HandHold::new(0.5);
        hold.refresh(vec![hand], 1.0);
        assert!(hold.current(1.6).is_none());
        // expired hands do not come back
        assert!(hold.current(1.0).is_none());

        hold.refresh(Vec::new(), 2.0);
        assert_eq!(hold.current(2.1).map(<[_]>::len), Some(0));
    }
}
