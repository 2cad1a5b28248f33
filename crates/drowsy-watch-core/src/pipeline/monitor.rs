//! Single-threaded frame pipeline.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::frame::Frame;
use super::published::{PublishedSnapshot, PublishedState, StateSubscription};
use crate::analysis::{
    mouth_ratio, AlertStateMachine, OpennessEstimator, RateLimiter, Transition,
    DEFAULT_MIN_INTERVAL,
};
use crate::domain::{
    DetectedFace, DetectionState, FrameSignal, ImageInfo, OutcomeKind, Thresholds,
};
use crate::error::PipelineError;
use crate::ports::{FaceDetector, ImageClassifier};

/// Tunables for a [`DrowsinessMonitor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    /// Alert state machine thresholds.
    pub thresholds: Thresholds,
    /// Minimum interval between analyzed frames.
    pub min_interval: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            min_interval: DEFAULT_MIN_INTERVAL,
        }
    }
}

/// What happened to one submitted frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// Dropped before analysis.
    Throttled,
    /// No face found; the awake signal was applied.
    NoFace {
        /// State machine step.
        transition: Transition,
    },
    /// The first face was analyzed.
    Analyzed {
        /// Measured signal.
        signal: FrameSignal,
        /// State machine step.
        transition: Transition,
    },
    /// Face detection failed; state untouched.
    DetectorFailed {
        /// Failure description.
        reason: String,
    },
    /// Openness estimation failed; state untouched.
    ClassifierFailed {
        /// Failure description.
        reason: String,
    },
}

impl FrameOutcome {
    /// Returns the serializable outcome kind.
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::Throttled => OutcomeKind::Throttled,
            Self::NoFace { .. } => OutcomeKind::NoFace,
            Self::Analyzed { .. } => OutcomeKind::Analyzed,
            Self::DetectorFailed { .. } => OutcomeKind::DetectorFailed,
            Self::ClassifierFailed { .. } => OutcomeKind::ClassifierFailed,
        }
    }

    /// Returns the state machine step, if the frame reached it.
    #[must_use]
    pub const fn transition(&self) -> Option<Transition> {
        match self {
            Self::NoFace { transition } | Self::Analyzed { transition, .. } => Some(*transition),
            _ => None,
        }
    }

    /// Returns the signal fed to the state machine, if any.
    #[must_use]
    pub const fn signal(&self) -> Option<FrameSignal> {
        match self {
            Self::NoFace { .. } => Some(FrameSignal::NO_FACE),
            Self::Analyzed { signal, .. } => Some(*signal),
            _ => None,
        }
    }

    /// Returns the failure description for skipped frames.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::DetectorFailed { reason } | Self::ClassifierFailed { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Turns camera frames into a published drowsiness state.
///
/// Owns the rate limiter, the alert state machine and the published values.
/// All mutation goes through `&mut self`, so a monitor shared between
/// threads must be wrapped by a [`MonitorWorker`](super::MonitorWorker).
pub struct DrowsinessMonitor<D, C> {
    detector: D,
    estimator: OpennessEstimator<C>,
    limiter: RateLimiter,
    machine: AlertStateMachine,
    published: PublishedState,
}

impl<D: FaceDetector, C: ImageClassifier> DrowsinessMonitor<D, C> {
    /// Creates a monitor in the initial state.
    #[must_use]
    pub fn new(detector: D, classifier: C, config: MonitorConfig) -> Self {
        info!(
            "Drowsiness monitor ready (min interval {:?}, classifier input {}px)",
            config.min_interval,
            classifier.input_size()
        );
        Self {
            detector,
            estimator: OpennessEstimator::new(classifier),
            limiter: RateLimiter::new(config.min_interval),
            machine: AlertStateMachine::new(config.thresholds),
            published: PublishedState::new(),
        }
    }

    /// Returns read-only handles to the published values.
    #[must_use]
    pub fn subscribe(&self) -> StateSubscription {
        self.published.subscribe()
    }

    /// Returns the current published values.
    #[must_use]
    pub fn snapshot(&self) -> PublishedSnapshot {
        self.published.snapshot()
    }

    /// Returns the internal detection state.
    #[must_use]
    pub const fn state(&self) -> DetectionState {
        self.machine.state()
    }

    /// Runs one camera frame through the pipeline.
    ///
    /// The frame is dropped (and so released) before this returns, whatever
    /// the outcome.
    pub fn process_frame(&mut self, frame: Frame) -> FrameOutcome {
        if !self.limiter.admit(frame.timestamp()) {
            return FrameOutcome::Throttled;
        }

        let info = frame.info();
        let faces = match self.detector.detect(info) {
            Ok(faces) => faces,
            Err(e) => {
                let e = PipelineError::Detector(e);
                warn!("Skipping {}: {e}", info.path);
                return FrameOutcome::DetectorFailed {
                    reason: e.to_string(),
                };
            }
        };

        let Some(face) = faces.first() else {
            debug!("No face in {}", info.path);
            let transition = self.apply(FrameSignal::NO_FACE);
            return FrameOutcome::NoFace { transition };
        };
        if faces.len() > 1 {
            debug!("{} faces in {}, using the first", faces.len(), info.path);
        }

        match self.measure(info, face) {
            Ok(signal) => {
                let transition = self.apply(signal);
                FrameOutcome::Analyzed { signal, transition }
            }
            Err(e) => {
                error!("Skipping {}: {e}", info.path);
                FrameOutcome::ClassifierFailed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Estimates eye openness for a still image without touching any state.
    ///
    /// See [`analyze_still`].
    #[must_use]
    pub fn analyze_still(&self, info: &ImageInfo) -> f64 {
        analyze_still(&self.detector, &self.estimator, info)
    }

    fn measure(&self, info: &ImageInfo, face: &DetectedFace) -> Result<FrameSignal, PipelineError> {
        let mouth = mouth_ratio(&face.landmarks);
        let openness = self.estimator.estimate(info, face.bbox)?;
        Ok(FrameSignal::new(openness, mouth))
    }

    fn apply(&mut self, signal: FrameSignal) -> Transition {
        let transition = self.machine.step(signal);
        self.published.publish(signal, transition.current.alert_level);
        transition
    }
}

/// Estimates eye openness for a single still image.
///
/// Bypasses the rate limiter and the state machine. Returns 1.0 if no face is
/// found or if detection or estimation fails.
#[must_use]
pub fn analyze_still<D, C>(
    detector: &D,
    estimator: &OpennessEstimator<C>,
    info: &ImageInfo,
) -> f64
where
    D: FaceDetector + ?Sized,
    C: ImageClassifier,
{
    info!("Analyzing still image {}", info.path);

    let faces = match detector.detect(info) {
        Ok(faces) => faces,
        Err(e) => {
            error!("Still image {}: {}", info.path, PipelineError::Detector(e));
            return FrameSignal::NO_FACE.openness;
        }
    };

    let Some(face) = faces.first() else {
        warn!("No face found in still image {}", info.path);
        return FrameSignal::NO_FACE.openness;
    };

    match estimator.estimate(info, face.bbox) {
        Ok(openness) => {
            info!("Still image {}: openness {openness:.3}", info.path);
            openness
        }
        Err(e) => {
            error!("Still image {}: {e}", info.path);
            FrameSignal::NO_FACE.openness
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Instant;

    use image::DynamicImage;

    use super::*;
    use crate::domain::{AlertLevel, BoundingBox, LandmarkKind, Landmarks, Point};
    use crate::ports::ImageTensor;

    struct OneFace(Landmarks);

    impl FaceDetector for OneFace {
        fn detect(&self, _image: &ImageInfo) -> anyhow::Result<Vec<DetectedFace>> {
            Ok(vec![
                DetectedFace::new(BoundingBox::new(2, 2, 12, 12)).with_landmarks(self.0)
            ])
        }
    }

    struct NoFaces;

    impl FaceDetector for NoFaces {
        fn detect(&self, _image: &ImageInfo) -> anyhow::Result<Vec<DetectedFace>> {
            Ok(Vec::new())
        }
    }

    struct Scripted(Mutex<Vec<anyhow::Result<Vec<f32>>>>);

    impl Scripted {
        fn new(mut outputs: Vec<anyhow::Result<Vec<f32>>>) -> Self {
            outputs.reverse();
            Self(Mutex::new(outputs))
        }
    }

    impl ImageClassifier for Scripted {
        fn input_size(&self) -> u32 {
            4
        }

        fn classify(&self, _input: &ImageTensor) -> anyhow::Result<Vec<f32>> {
            self.0.lock().unwrap().pop().unwrap_or_else(|| Ok(vec![1.0]))
        }
    }

    fn frame(at: Instant) -> Frame {
        Frame::new(
            ImageInfo::new("f.png", DynamicImage::new_rgb8(16, 16)),
            at,
        )
    }

    fn yawning() -> Landmarks {
        Landmarks::default()
            .with(LandmarkKind::MouthLeft, Point::new(0.0, 0.0))
            .with(LandmarkKind::MouthRight, Point::new(10.0, 0.0))
            .with(LandmarkKind::NoseBase, Point::new(5.0, -10.0))
            .with(LandmarkKind::MouthBottom, Point::new(5.0, 10.0))
    }

    #[test]
    fn test_analyzed_frame_publishes() {
        let mut monitor = DrowsinessMonitor::new(
            OneFace(yawning()),
            Scripted::new(vec![Ok(vec![0.2])]),
            MonitorConfig::default(),
        );

        let outcome = monitor.process_frame(frame(Instant::now()));
        assert_eq!(outcome.kind(), OutcomeKind::Analyzed);

        let signal = outcome.signal().unwrap();
        assert!((signal.openness - 0.2).abs() < 1e-6);
        // vertical = |(5,0) - (5,10)| = 10, horizontal = 10
        assert!((signal.mouth_ratio - 1.0).abs() < 1e-9);

        let snap = monitor.snapshot();
        assert!((snap.openness - 0.2).abs() < 1e-6);
        assert!((snap.mouth_ratio - 1.0).abs() < 1e-9);
        assert_eq!(monitor.state().frame_counter, 1);
    }

    #[test]
    fn test_throttled_frame_is_released_and_ignored() {
        let mut monitor = DrowsinessMonitor::new(
            OneFace(Landmarks::default()),
            Scripted::new(vec![Ok(vec![0.1]), Ok(vec![0.1])]),
            MonitorConfig::default(),
        );
        let released = Arc::new(AtomicUsize::new(0));
        let start = Instant::now();

        monitor.process_frame(frame(start));
        let r = Arc::clone(&released);
        let outcome = monitor.process_frame(
            frame(start + Duration::from_millis(10)).with_release(move || {
                r.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(outcome, FrameOutcome::Throttled);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(monitor.state().frame_counter, 1);
    }

    #[test]
    fn test_no_face_applies_awake_signal() {
        let mut monitor = DrowsinessMonitor::new(
            NoFaces,
            Scripted::new(vec![]),
            MonitorConfig::default(),
        );
        let outcome = monitor.process_frame(frame(Instant::now()));
        assert_eq!(outcome.kind(), OutcomeKind::NoFace);
        assert_eq!(outcome.signal(), Some(FrameSignal::NO_FACE));
        assert_eq!(monitor.snapshot(), PublishedSnapshot::default());
    }

    #[test]
    fn test_classifier_failure_leaves_state() {
        let mut monitor = DrowsinessMonitor::new(
            OneFace(yawning()),
            Scripted::new(vec![Err(anyhow::anyhow!("boom"))]),
            MonitorConfig::default(),
        );
        let outcome = monitor.process_frame(frame(Instant::now()));

        assert_eq!(outcome.kind(), OutcomeKind::ClassifierFailed);
        assert!(outcome.error().unwrap().contains("boom"));
        assert_eq!(monitor.state(), DetectionState::default());
        assert_eq!(monitor.snapshot(), PublishedSnapshot::default());
    }

    #[test]
    fn test_still_path_fails_open() {
        let monitor = DrowsinessMonitor::new(
            NoFaces,
            Scripted::new(vec![]),
            MonitorConfig::default(),
        );
        let info = ImageInfo::new("still.png", DynamicImage::new_rgb8(8, 8));
        assert!((monitor.analyze_still(&info) - 1.0).abs() < f64::EPSILON);

        let failing = DrowsinessMonitor::new(
            OneFace(Landmarks::default()),
            Scripted::new(vec![Err(anyhow::anyhow!("boom"))]),
            MonitorConfig::default(),
        );
        assert!((failing.analyze_still(&info) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_still_path_does_not_touch_state() {
        let monitor = DrowsinessMonitor::new(
            OneFace(Landmarks::default()),
            Scripted::new(vec![Ok(vec![0.1])]),
            MonitorConfig::default(),
        );
        let info = ImageInfo::new("still.png", DynamicImage::new_rgb8(8, 8));
        assert!((monitor.analyze_still(&info) - 0.1).abs() < 1e-6);
        assert_eq!(monitor.state(), DetectionState::default());
        assert_eq!(monitor.snapshot().alert_level, AlertLevel::None);
    }
}
