//! Optional external classifier, fused with the rule-based result.
//!
//! The external model runs on its own worker thread.  The caller submits the
//! filtered hands each frame without blocking and picks up whatever result
//! has resolved since, one frame late.  Absence, slowness, errors and panics
//! in the model all degrade to the rule-based label.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::{Arc, Mutex, TryLockError};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::classifier::Classification;
use crate::error::ClassifierError;
use crate::landmark::Hand;

/// A learned classifier over filtered landmarks.
///
/// `Ok(None)` means the model had nothing to say about this frame.
pub trait ExternalClassifier: Send + 'static {
    fn classify(
        &mut self,
        hands: &[Hand],
        threshold: f32,
    ) -> Result<Option<Classification>, ClassifierError>;
}

/// The external result replaces the rule result only when its confidence
/// strictly exceeds `threshold`.
pub fn fuse(
    rule: Classification,
    external: Option<&Classification>,
    threshold: f32,
) -> Classification {
    match external {
        Some(ext) if ext.confidence > threshold => ext.clone(),
        _ => rule,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LatestResult — single-slot handoff from the worker
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Default)]
pub struct LatestResult(Arc<Mutex<Option<Classification>>>);

impl LatestResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, result: Option<Classification>) {
        let mut slot = match self.0.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *slot = result;
    }

    /// Take the resolved result, if any.  Never blocks: a slot that is being
    /// written right now reads as empty.
    pub fn take(&self) -> Option<Classification> {
        match self.0.try_lock() {
            Ok(mut g) => g.take(),
            Err(TryLockError::Poisoned(p)) => p.into_inner().take(),
            Err(TryLockError::WouldBlock) => None,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AsyncClassifier
// ════════════════════════════════════════════════════════════════════════════

pub struct AsyncClassifier {
    tx: Option<SyncSender<Vec<Hand>>>,
    latest: LatestResult,
    threshold: f32,
    worker: Option<JoinHandle<()>>,
}

impl AsyncClassifier {
    pub fn spawn<C: ExternalClassifier>(mut classifier: C, threshold: f32) -> Self {
        // One queued request at most; anything beyond that is dropped.
        let (tx, rx) = mpsc::sync_channel::<Vec<Hand>>(1);
        let latest = LatestResult::new();
        let slot = latest.clone();

        let worker = thread::Builder::new()
            .name("gesture-classifier".into())
            .spawn(move || {
                while let Ok(hands) = rx.recv() {
                    let outcome =
                        catch_unwind(AssertUnwindSafe(|| classifier.classify(&hands, threshold)));
                    match outcome {
                        Ok(Ok(result)) => slot.publish(result),
                        Ok(Err(e)) => {
                            debug!("external classifier: {e}");
                            slot.publish(None);
                        }
                        Err(_) => {
                            warn!("external classifier panicked; falling back to rules");
                            slot.publish(None);
                        }
                    }
                }
                debug!("classifier worker exiting");
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!("could not start classifier worker: {e}");
                None
            }
        };

        AsyncClassifier {
            tx: worker.as_ref().map(|_| tx),
            latest,
            threshold,
            worker,
        }
    }

    /// Queue a frame for classification.  Returns `false` when the request
    /// was dropped because the worker is still busy (or gone).
    pub fn submit(&self, hands: &[Hand]) -> bool {
        let Some(tx) = &self.tx else { return false };
        match tx.try_send(hands.to_vec()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => {
                debug!("classifier worker disconnected");
                false
            }
        }
    }

    /// Most recent resolved result, consumed on read.
    pub fn latest(&self) -> Option<Classification> {
        self.latest.take()
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }
}

impl Drop for AsyncClassifier {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    struct Fixed(f32);
    impl ExternalClassifier for Fixed {
        fn classify(&mut self, _: &[Hand], _: f32) -> Result<Option<Classification>, ClassifierError> {
            Ok(Some(Classification::new("thumbs-up", self.0, 0)))
        }
    }

    struct Failing;
    impl ExternalClassifier for Failing {
        fn classify(&mut self, _: &[Hand], _: f32) -> Result<Option<Classification>, ClassifierError> {
            Err(ClassifierError::Inference("model not loaded".into()))
        }
    }

    struct Panicking;
    impl ExternalClassifier for Panicking {
        fn classify(&mut self, _: &[Hand], _: f32) -> Result<Option<Classification>, ClassifierError> {
            panic!("boom")
        }
    }

    struct Slow;
    impl ExternalClassifier for Slow {
        fn classify(&mut self, _: &[Hand], _: f32) -> Result<Option<Classification>, ClassifierError> {
            thread::sleep(Duration::from_millis(200));
            Ok(None)
        }
    }

    fn wait_for(c: &AsyncClassifier) -> Option<Classification> {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if let Some(r) = c.latest() {
                return Some(r);
            }
            thread::sleep(Duration::from_millis(5));
        }
        None
    }

    #[test]
    fn fuse_requires_strictly_greater_confidence() {
        let rule = Classification::new("wind", 0.7, 3);
        let at = Classification::new("thumbs-up", 0.7, 0);
        let above = Classification::new("thumbs-up", 0.71, 0);
        assert_eq!(fuse(rule.clone(), Some(&at), 0.7).label, "wind");
        assert_eq!(fuse(rule.clone(), Some(&above), 0.7).label, "thumbs-up");
        assert_eq!(fuse(rule, None, 0.7).label, "wind");
    }

    #[test]
    fn worker_result_arrives_and_is_consumed_once() {
        let c = AsyncClassifier::spawn(Fixed(0.95), 0.7);
        assert!(c.submit(&[]));
        let r = wait_for(&c).expect("worker should resolve");
        assert_eq!(r.label, "thumbs-up");
        assert!(c.latest().is_none());
    }

    #[test]
    fn errors_and_panics_fall_back_silently() {
        let c = AsyncClassifier::spawn(Failing, 0.7);
        c.submit(&[]);
        thread::sleep(Duration::from_millis(50));
        assert!(c.latest().is_none());

        let c = AsyncClassifier::spawn(Panicking, 0.7);
        c.submit(&[]);
        thread::sleep(Duration::from_millis(50));
        assert!(c.latest().is_none());
        // worker survived the panic
        thread::sleep(Duration::from_millis(20));
        assert!(c.submit(&[]));
    }

    #[test]
    fn submit_never_blocks_on_a_slow_model() {
        let c = AsyncClassifier::spawn(Slow, 0.7);
        let start = Instant::now();
        let accepted: Vec<bool> = (0..3).map(|_| c.submit(&[])).collect();
        assert!(start.elapsed() < Duration::from_millis(100));
        assert!(accepted.contains(&false));
    }

    #[test]
    fn latest_result_slot() {
        let slot = LatestResult::new();
        assert!(slot.take().is_none());
        slot.publish(Some(Classification::auto()));
        assert_eq!(slot.take().map(|c| c.label), Some("auto".to_string()));
        assert!(slot.take().is_none());
    }
}
