//! Frame evaluation loop.
//!
//! `IntrusionMonitor::tick` is the whole loop body: take a frame, run the detector,
//! classify person detections against the ROI scaled to that frame, publish the
//! result. The driver (timer thread, animation callback, test harness) only decides
//! when to call it.
//!
//! Rules enforced here:
//!
//! - At most one evaluation is in flight. A tick that arrives while another is
//!   running returns `TickOutcome::Busy` and does nothing; nothing is queued.
//! - An evaluation snapshots the ROI before detection. A `set_roi` during a slow
//!   detector call affects the next evaluation, not the current one.
//! - Ticks without a frame, or with a failing detector, keep the last intrusion
//!   state. The alert never drops to "secure" just because a frame was missed.
//! - Intrusion flag, last evaluation, and counters change together under one lock.

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::detect::{DetectedObject, DetectorBackend, PERSON_LABEL};
use crate::ingest::FrameSource;
use crate::region::OverlapPath;
use crate::roi::{Roi, RoiHandle, ScaledRoi};

/// Per-object result for one frame.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Classification {
    pub object: DetectedObject,
    pub intersecting: bool,
    /// Which overlap condition fired, when intersecting.
    pub path: Option<OverlapPath>,
}

/// Everything derived from one (ROI, frame, detections) triple.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FrameEvaluation {
    pub frame_seq: u64,
    pub width: u32,
    pub height: u32,
    pub scaled_roi: ScaledRoi,
    /// Target-class objects only, in detector order.
    pub classifications: Vec<Classification>,
    /// OR over `classifications[..].intersecting`.
    pub intrusion: bool,
}

impl FrameEvaluation {
    pub fn intersecting_count(&self) -> usize {
        self.classifications.iter().filter(|c| c.intersecting).count()
    }
}

/// Classify one frame's detections against the ROI scaled to that frame.
///
/// Pure: the same inputs always give the same evaluation.
pub fn evaluate_frame(
    roi: &Roi,
    frame_seq: u64,
    width: u32,
    height: u32,
    objects: &[DetectedObject],
    target_label: &str,
) -> FrameEvaluation {
    let scaled_roi = roi.scale(width as f64, height as f64);

    let classifications: Vec<Classification> = objects
        .iter()
        .filter(|obj| obj.is_class(target_label))
        .map(|obj| {
            let path = scaled_roi.overlap_path(&obj.bbox);
            Classification {
                object: obj.clone(),
                intersecting: path.is_some(),
                path,
            }
        })
        .collect();

    let intrusion = classifications.iter().any(|c| c.intersecting);

    FrameEvaluation {
        frame_seq,
        width,
        height,
        scaled_roi,
        classifications,
        intrusion,
    }
}

/// Consumer of evaluation results (renderer, alarm, logger).
pub trait AlertSink: Send {
    fn on_evaluation(&mut self, evaluation: &FrameEvaluation);
}

impl<F> AlertSink for F
where
    F: FnMut(&FrameEvaluation) + Send,
{
    fn on_evaluation(&mut self, evaluation: &FrameEvaluation) {
        self(evaluation)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorPhase {
    Idle,
    Evaluating,
}

/// Result of a single `tick`.
#[derive(Clone, Debug, PartialEq)]
pub enum TickOutcome {
    /// Another evaluation is still in flight.
    Busy,
    /// The source had no frame ready.
    NotReady,
    /// The detector failed for this frame.
    DetectorUnavailable,
    Evaluated(FrameEvaluation),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MonitorStats {
    pub ticks: u64,
    pub evaluations: u64,
    pub skipped_busy: u64,
    pub not_ready: u64,
    pub detector_failures: u64,
    /// Transitions from secure to intrusion.
    pub alerts_raised: u64,
}

#[derive(Default)]
struct SharedState {
    intrusion: bool,
    last: Option<FrameEvaluation>,
    stats: MonitorStats,
}

/// Owns the active ROI, the detector handle, and the published intrusion state.
pub struct IntrusionMonitor {
    roi: RoiHandle,
    detector: Arc<Mutex<dyn DetectorBackend>>,
    target_label: String,
    in_flight: AtomicBool,
    camera_ready: AtomicBool,
    state: Mutex<SharedState>,
    sinks: Mutex<Vec<Box<dyn AlertSink>>>,
}

impl IntrusionMonitor {
    pub fn new(roi: RoiHandle, detector: Arc<Mutex<dyn DetectorBackend>>) -> Self {
        Self {
            roi,
            detector,
            target_label: PERSON_LABEL.to_string(),
            in_flight: AtomicBool::new(false),
            camera_ready: AtomicBool::new(false),
            state: Mutex::new(SharedState::default()),
            sinks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_backend<B: DetectorBackend + 'static>(roi: RoiHandle, backend: B) -> Self {
        Self::new(roi, Arc::new(Mutex::new(backend)))
    }

    /// Count objects with this label instead of "person".
    pub fn with_target_label(mut self, label: impl Into<String>) -> Self {
        self.target_label = label.into();
        self
    }

    pub fn roi_handle(&self) -> &RoiHandle {
        &self.roi
    }

    /// Replace the active ROI. In-flight evaluations keep their snapshot.
    pub fn set_roi(&self, roi: Roi) -> Result<()> {
        log::info!("roi replaced ({} vertices)", roi.vertices().len());
        self.roi.set_roi(roi)
    }

    pub fn subscribe<S: AlertSink + 'static>(&self, sink: S) -> Result<()> {
        self.sinks
            .lock()
            .map_err(|_| anyhow!("sink list lock poisoned"))?
            .push(Box::new(sink));
        Ok(())
    }

    pub fn phase(&self) -> MonitorPhase {
        if self.in_flight.load(Ordering::Acquire) {
            MonitorPhase::Evaluating
        } else {
            MonitorPhase::Idle
        }
    }

    /// True once the source has delivered its first frame.
    pub fn camera_ready(&self) -> bool {
        self.camera_ready.load(Ordering::Acquire)
    }

    /// Last published intrusion state; `false` before the first evaluation.
    pub fn intrusion(&self) -> Result<bool> {
        Ok(self.lock_state()?.intrusion)
    }

    pub fn last_evaluation(&self) -> Result<Option<FrameEvaluation>> {
        Ok(self.lock_state()?.last.clone())
    }

    pub fn stats(&self) -> Result<MonitorStats> {
        Ok(self.lock_state()?.stats.clone())
    }

    /// Run one step of the evaluation loop.
    ///
    /// Returns `Err` only when the frame source fails or a lock is poisoned.
    pub fn tick(&self, source: &mut dyn FrameSource) -> Result<TickOutcome> {
        self.lock_state()?.stats.ticks += 1;

        let Some(_in_flight) = InFlightGuard::acquire(&self.in_flight) else {
            self.lock_state()?.stats.skipped_busy += 1;
            log::debug!("tick skipped: evaluation still in flight");
            return Ok(TickOutcome::Busy);
        };

        let Some(frame) = source.next_frame()? else {
            self.lock_state()?.stats.not_ready += 1;
            return Ok(TickOutcome::NotReady);
        };

        if !self.camera_ready.swap(true, Ordering::AcqRel) {
            log::info!("camera ready: first frame {}x{}", frame.width, frame.height);
        }

        let roi = self.roi.snapshot()?;

        let detected = {
            let mut detector = self
                .detector
                .lock()
                .map_err(|_| anyhow!("detector lock poisoned"))?;
            frame.inference_view().run_detector(&mut *detector)
        };
        let objects = match detected {
            Ok(objects) => objects,
            Err(e) => {
                log::warn!("detector unavailable for frame {}: {:#}", frame.seq, e);
                self.lock_state()?.stats.detector_failures += 1;
                return Ok(TickOutcome::DetectorUnavailable);
            }
        };

        let evaluation = evaluate_frame(
            &roi,
            frame.seq,
            frame.width,
            frame.height,
            &objects,
            &self.target_label,
        );
        self.publish(&evaluation)?;
        Ok(TickOutcome::Evaluated(evaluation))
    }

    fn publish(&self, evaluation: &FrameEvaluation) -> Result<()> {
        {
            let mut state = self.lock_state()?;
            let was_intrusion = state.intrusion;
            state.intrusion = evaluation.intrusion;
            state.last = Some(evaluation.clone());
            state.stats.evaluations += 1;

            if evaluation.intrusion && !was_intrusion {
                state.stats.alerts_raised += 1;
                log::warn!(
                    "INTRUSION: {} of {} {} detections inside roi (frame {})",
                    evaluation.intersecting_count(),
                    evaluation.classifications.len(),
                    self.target_label,
                    evaluation.frame_seq
                );
            } else if !evaluation.intrusion && was_intrusion {
                log::info!("SECURE: roi clear (frame {})", evaluation.frame_seq);
            }
        }

        let mut sinks = self
            .sinks
            .lock()
            .map_err(|_| anyhow!("sink list lock poisoned"))?;
        for sink in sinks.iter_mut() {
            sink.on_evaluation(evaluation);
        }
        Ok(())
    }

    fn lock_state(&self) -> Result<std::sync::MutexGuard<'_, SharedState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("monitor state lock poisoned"))
    }
}

/// Holds the in-flight flag for the duration of one evaluation.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::ScriptedBackend;
    use crate::frame::RawFrame;
    use crate::geometry::BoundingBox;
    use std::collections::VecDeque;
    use std::sync::mpsc;

    /// Serves a fixed queue of frames; `None` entries mean "not ready".
    struct QueueSource {
        frames: VecDeque<Option<(u32, u32)>>,
        seq: u64,
    }

    impl QueueSource {
        fn new(frames: Vec<Option<(u32, u32)>>) -> Self {
            Self {
                frames: frames.into(),
                seq: 0,
            }
        }
    }

    impl FrameSource for QueueSource {
        fn next_frame(&mut self) -> Result<Option<RawFrame>> {
            match self.frames.pop_front().flatten() {
                Some((w, h)) => {
                    self.seq += 1;
                    Ok(Some(RawFrame::new(vec![0u8; 3], w, h, self.seq)))
                }
                None => Ok(None),
            }
        }
    }

    fn inside() -> DetectedObject {
        DetectedObject::person(BoundingBox::new(400.0, 400.0, 50.0, 50.0))
    }

    fn outside() -> DetectedObject {
        DetectedObject::person(BoundingBox::new(0.0, 0.0, 50.0, 50.0))
    }

    #[test]
    fn evaluate_frame_filters_target_class() {
        let car = DetectedObject::new("car", BoundingBox::new(400.0, 400.0, 50.0, 50.0));
        let eval = evaluate_frame(&Roi::default(), 1, 1000, 1000, &[car], PERSON_LABEL);
        assert!(eval.classifications.is_empty());
        assert!(!eval.intrusion);
    }

    #[test]
    fn evaluate_frame_ors_classifications() {
        let eval = evaluate_frame(
            &Roi::default(),
            1,
            1000,
            1000,
            &[outside(), inside()],
            PERSON_LABEL,
        );
        assert_eq!(eval.classifications.len(), 2);
        assert!(!eval.classifications[0].intersecting);
        assert!(eval.classifications[1].intersecting);
        assert!(eval.intrusion);
        assert_eq!(eval.intersecting_count(), 1);
    }

    #[test]
    fn serialized_evaluation_carries_overlap_path() {
        let eval = evaluate_frame(
            &Roi::default(),
            1,
            1000,
            1000,
            &[outside(), inside()],
            PERSON_LABEL,
        );
        let json = serde_json::to_value(&eval).unwrap();
        assert_eq!(json["classifications"][0]["path"], serde_json::Value::Null);
        assert_eq!(json["classifications"][1]["path"], "CornerInPolygon");
    }

    #[test]
    fn custom_target_label_is_honoured() {
        let roi = RoiHandle::new(Roi::default());
        let car = DetectedObject::new("car", BoundingBox::new(400.0, 400.0, 50.0, 50.0));
        let monitor =
            IntrusionMonitor::with_backend(roi, ScriptedBackend::repeating(vec![car, outside()]))
                .with_target_label("car");
        let mut source = QueueSource::new(vec![Some((1000, 1000))]);
        match monitor.tick(&mut source).unwrap() {
            TickOutcome::Evaluated(eval) => {
                assert_eq!(eval.classifications.len(), 1);
                assert!(eval.intrusion);
            }
            other => panic!("expected evaluation, got {:?}", other),
        }
    }

    #[test]
    fn not_ready_and_detector_failures_preserve_state() {
        let backend =
            ScriptedBackend::new(vec![Some(vec![inside()]), None, Some(vec![outside()])]).unwrap();
        let monitor = IntrusionMonitor::with_backend(RoiHandle::new(Roi::default()), backend);
        let mut source = QueueSource::new(vec![
            Some((1000, 1000)),
            None,
            Some((1000, 1000)),
            Some((1000, 1000)),
        ]);

        assert_eq!(monitor.last_evaluation().unwrap(), None);

        let first = match monitor.tick(&mut source).unwrap() {
            TickOutcome::Evaluated(eval) => eval,
            other => panic!("expected evaluation, got {:?}", other),
        };
        assert!(monitor.intrusion().unwrap());
        assert_eq!(monitor.last_evaluation().unwrap().as_ref(), Some(&first));

        assert_eq!(monitor.tick(&mut source).unwrap(), TickOutcome::NotReady);
        assert!(monitor.intrusion().unwrap());
        assert_eq!(monitor.last_evaluation().unwrap().as_ref(), Some(&first));

        assert_eq!(
            monitor.tick(&mut source).unwrap(),
            TickOutcome::DetectorUnavailable
        );
        assert!(monitor.intrusion().unwrap());
        let kept = monitor.last_evaluation().unwrap().unwrap();
        assert_eq!(kept.frame_seq, 1);
        assert!(kept.intrusion);

        assert!(matches!(
            monitor.tick(&mut source).unwrap(),
            TickOutcome::Evaluated(_)
        ));
        assert!(!monitor.intrusion().unwrap());
        let latest = monitor.last_evaluation().unwrap().unwrap();
        assert_eq!(latest.frame_seq, 3);
        assert!(!latest.intrusion);

        let stats = monitor.stats().unwrap();
        assert_eq!(stats.ticks, 4);
        assert_eq!(stats.evaluations, 2);
        assert_eq!(stats.not_ready, 1);
        assert_eq!(stats.detector_failures, 1);
        assert_eq!(stats.alerts_raised, 1);
        assert_eq!(monitor.phase(), MonitorPhase::Idle);
    }

    #[test]
    fn camera_ready_after_first_frame() {
        let monitor = IntrusionMonitor::with_backend(
            RoiHandle::new(Roi::default()),
            ScriptedBackend::repeating(vec![]),
        );
        let mut source = QueueSource::new(vec![None, Some((10, 10))]);
        monitor.tick(&mut source).unwrap();
        assert!(!monitor.camera_ready());
        monitor.tick(&mut source).unwrap();
        assert!(monitor.camera_ready());
    }

    #[test]
    fn sinks_receive_each_evaluation() {
        let monitor = IntrusionMonitor::with_backend(
            RoiHandle::new(Roi::default()),
            ScriptedBackend::repeating(vec![inside()]),
        );
        let (tx, rx) = mpsc::channel();
        monitor
            .subscribe(move |eval: &FrameEvaluation| {
                let _ = tx.send((eval.frame_seq, eval.intrusion));
            })
            .unwrap();

        let mut source = QueueSource::new(vec![Some((1000, 1000)), None, Some((1000, 1000))]);
        for _ in 0..3 {
            monitor.tick(&mut source).unwrap();
        }
        let seen: Vec<_> = rx.try_iter().collect();
        assert_eq!(seen, vec![(1, true), (2, true)]);
    }

    /// Blocks inside `detect` until released, so tests can act mid-evaluation.
    struct GatedBackend {
        started: mpsc::Sender<()>,
        release: mpsc::Receiver<()>,
        objects: Vec<DetectedObject>,
    }

    impl DetectorBackend for GatedBackend {
        fn name(&self) -> &'static str {
            "gated"
        }

        fn detect(&mut self, _: &[u8], _: u32, _: u32) -> Result<Vec<DetectedObject>> {
            let _ = self.started.send(());
            self.release
                .recv()
                .map_err(|_| anyhow!("gate closed"))?;
            Ok(self.objects.clone())
        }
    }

    #[test]
    fn concurrent_tick_is_skipped_and_roi_snapshot_is_kept() {
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let backend = GatedBackend {
            started: started_tx,
            release: release_rx,
            objects: vec![inside()],
        };
        let monitor = Arc::new(IntrusionMonitor::with_backend(
            RoiHandle::new(Roi::default()),
            backend,
        ));

        let worker = {
            let monitor = Arc::clone(&monitor);
            std::thread::spawn(move || {
                let mut source = QueueSource::new(vec![Some((1000, 1000))]);
                monitor.tick(&mut source)
            })
        };

        started_rx.recv().unwrap();
        assert_eq!(monitor.phase(), MonitorPhase::Evaluating);

        let mut other = QueueSource::new(vec![Some((1000, 1000))]);
        assert_eq!(monitor.tick(&mut other).unwrap(), TickOutcome::Busy);

        // Replace the ROI with one far from the detection while detection is pending.
        let corner = Roi::from_pairs(&[(0.9, 0.9), (1.0, 0.9), (1.0, 1.0)]).unwrap();
        monitor.set_roi(corner.clone()).unwrap();

        release_tx.send(()).unwrap();
        let outcome = worker.join().unwrap().unwrap();
        match outcome {
            TickOutcome::Evaluated(eval) => {
                assert!(eval.intrusion, "evaluation must use the roi captured at start");
                assert_eq!(eval.scaled_roi, Roi::default().scale(1000.0, 1000.0));
            }
            other => panic!("expected evaluation, got {:?}", other),
        }
        assert_eq!(monitor.phase(), MonitorPhase::Idle);
        assert_eq!(*monitor.roi_handle().snapshot().unwrap(), corner);
        assert_eq!(monitor.stats().unwrap().skipped_busy, 1);
    }
}
