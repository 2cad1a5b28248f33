//! Mock implementations of core port traits.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use drowsy_watch_core::analysis::DEFAULT_INPUT_SIZE;
use drowsy_watch_core::domain::{AlertLevel, DetectedFace, FrameReport, ImageInfo};
use drowsy_watch_core::pipeline::Frame;
use drowsy_watch_core::ports::{
    FaceDetector, ImageClassifier, ImageSource, ImageTensor, MonitorEvent, ProgressSink,
    ReportOutput,
};

type Scripted<T> = Result<T, String>;

/// Pops the next scripted answer, or repeats the fallback once the script runs out.
fn next<T: Clone>(
    script: &Mutex<VecDeque<Scripted<T>>>,
    fallback: &Scripted<T>,
) -> anyhow::Result<T> {
    let answer = script
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
        .unwrap_or_else(|| fallback.clone());
    answer.map_err(|e| anyhow::anyhow!(e))
}

/// Mock implementation of `FaceDetector` for testing.
///
/// Answers each call from a script, then repeats a fallback answer.
pub struct MockFaceDetector {
    script: Mutex<VecDeque<Scripted<Vec<DetectedFace>>>>,
    fallback: Scripted<Vec<DetectedFace>>,
    calls: AtomicUsize,
}

impl MockFaceDetector {
    /// Reports the same faces for every frame.
    #[must_use]
    pub fn always(faces: Vec<DetectedFace>) -> Self {
        Self::scripted(Vec::new(), Ok(faces))
    }

    /// Never finds a face.
    #[must_use]
    pub fn no_face() -> Self {
        Self::always(Vec::new())
    }

    /// Fails every call with `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self::scripted(Vec::new(), Err(message.to_string()))
    }

    /// Answers from `script` in order, then with `fallback`.
    #[must_use]
    pub fn scripted(
        script: Vec<Scripted<Vec<DetectedFace>>>,
        fallback: Scripted<Vec<DetectedFace>>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
        }
    }

    /// Returns the number of `detect` calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FaceDetector for MockFaceDetector {
    fn detect(&self, _image: &ImageInfo) -> anyhow::Result<Vec<DetectedFace>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        next(&self.script, &self.fallback)
    }
}

/// Mock implementation of `ImageClassifier` for testing.
///
/// Reports scripted openness values in output slot 0.
pub struct MockClassifier {
    script: Mutex<VecDeque<Scripted<Vec<f32>>>>,
    fallback: Scripted<Vec<f32>>,
    input_size: u32,
    calls: AtomicUsize,
}

impl MockClassifier {
    /// Reports `openness` for every input.
    #[must_use]
    pub fn constant(openness: f32) -> Self {
        Self::scripted(Vec::new(), Ok(vec![openness, 1.0 - openness]))
    }

    /// Reports each of `values` once, then repeats the last one.
    #[must_use]
    pub fn sequence(values: &[f32]) -> Self {
        let last = values.last().copied().unwrap_or(1.0);
        let script = values.iter().map(|&v| Ok(vec![v, 1.0 - v])).collect();
        Self::scripted(script, Ok(vec![last, 1.0 - last]))
    }

    /// Fails every call with `message`.
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self::scripted(Vec::new(), Err(message.to_string()))
    }

    /// Answers from `script` in order, then with `fallback`.
    #[must_use]
    pub fn scripted(script: Vec<Scripted<Vec<f32>>>, fallback: Scripted<Vec<f32>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            input_size: DEFAULT_INPUT_SIZE,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sets the reported input size.
    #[must_use]
    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size;
        self
    }

    /// Returns the number of `classify` calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ImageClassifier for MockClassifier {
    fn input_size(&self) -> u32 {
        self.input_size
    }

    fn classify(&self, input: &ImageTensor) -> anyhow::Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::ensure!(
            input.width == self.input_size && input.height == self.input_size,
            "unexpected input {}x{}",
            input.width,
            input.height
        );
        next(&self.script, &self.fallback)
    }
}

/// Counts frame releases.
///
/// Frames built with [`ReleaseCounter::frame`] bump the shared counter when
/// they are released.
#[derive(Debug, Clone, Default)]
pub struct ReleaseCounter {
    released: Arc<AtomicUsize>,
}

impl ReleaseCounter {
    /// Creates a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps `info` in a frame that counts its release.
    #[must_use]
    pub fn frame(&self, info: ImageInfo, timestamp: Instant) -> Frame {
        let released = Arc::clone(&self.released);
        Frame::new(info, timestamp).with_release(move || {
            released.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// Returns the number of releases so far.
    #[must_use]
    pub fn count(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

/// Mock implementation of `ImageSource` for testing.
///
/// Yields pre-built images and tracks iteration for assertions.
pub struct MockImageSource {
    images: Vec<ImageInfo>,
    iteration_count: AtomicUsize,
}

impl MockImageSource {
    /// Creates a new mock source with the given images.
    #[must_use]
    pub const fn new(images: Vec<ImageInfo>) -> Self {
        Self {
            images,
            iteration_count: AtomicUsize::new(0),
        }
    }

    /// Creates an empty mock source.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Returns the number of times the source has been iterated.
    #[must_use]
    pub fn iteration_count(&self) -> usize {
        self.iteration_count.load(Ordering::SeqCst)
    }
}

impl ImageSource for MockImageSource {
    fn images(&self) -> Box<dyn Iterator<Item = anyhow::Result<ImageInfo>> + Send + '_> {
        self.iteration_count.fetch_add(1, Ordering::SeqCst);
        Box::new(self.images.iter().cloned().map(Ok))
    }

    fn count_hint(&self) -> Option<usize> {
        Some(self.images.len())
    }
}

/// Mock implementation of `ReportOutput` for testing.
///
/// Captures reports for later assertions.
#[derive(Default)]
pub struct MockReportOutput {
    reports: Mutex<Vec<FrameReport>>,
    flush_count: AtomicUsize,
}

impl MockReportOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured reports.
    #[must_use]
    pub fn reports(&self) -> Vec<FrameReport> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flush_count.load(Ordering::SeqCst)
    }
}

impl ReportOutput for MockReportOutput {
    fn write(&self, report: &FrameReport) -> anyhow::Result<()> {
        self.reports
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(report.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        self.flush_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Mock implementation of `ProgressSink` for testing.
///
/// Captures events for later assertions.
#[derive(Default)]
pub struct MockProgressSink {
    events: Mutex<Vec<MonitorEvent>>,
}

impl MockProgressSink {
    /// Creates a new mock progress sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all captured events.
    #[must_use]
    pub fn events(&self) -> Vec<MonitorEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the number of `Frame` events.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, MonitorEvent::Frame { .. }))
            .count()
    }

    /// Returns the `(from, to)` pairs of all `AlertChanged` events.
    #[must_use]
    pub fn alert_changes(&self) -> Vec<(AlertLevel, AlertLevel)> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::AlertChanged { from, to, .. } => Some((*from, *to)),
                _ => None,
            })
            .collect()
    }

    /// Returns whether a `Finished` event was received.
    #[must_use]
    pub fn has_finished(&self) -> bool {
        self.events()
            .iter()
            .any(|e| matches!(e, MonitorEvent::Finished { .. }))
    }
}

impl ProgressSink for MockProgressSink {
    fn on_event(&self, event: MonitorEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use drowsy_watch_core::domain::{BoundingBox, DetectionState, OutcomeKind, SessionSummary};

    use super::*;

    fn info() -> ImageInfo {
        ImageInfo::new("test.png", image::DynamicImage::new_rgb8(10, 10))
    }

    fn tensor(size: u32) -> ImageTensor {
        ImageTensor {
            width: size,
            height: size,
            channels: 3,
            data: vec![0.0; (size * size * 3) as usize],
        }
    }

    #[test]
    fn test_detector_script_then_fallback() {
        let face = DetectedFace::new(BoundingBox::new(0, 0, 5, 5));
        let detector = MockFaceDetector::scripted(
            vec![Err("lost".into()), Ok(vec![face.clone()])],
            Ok(Vec::new()),
        );

        assert!(detector.detect(&info()).is_err());
        assert_eq!(detector.detect(&info()).unwrap(), vec![face]);
        assert!(detector.detect(&info()).unwrap().is_empty());
        assert_eq!(detector.calls(), 3);
    }

    #[test]
    fn test_classifier_sequence_repeats_last() {
        let classifier = MockClassifier::sequence(&[0.1, 0.9]).with_input_size(4);
        let input = tensor(4);

        assert!((classifier.classify(&input).unwrap()[0] - 0.1).abs() < 1e-6);
        assert!((classifier.classify(&input).unwrap()[0] - 0.9).abs() < 1e-6);
        assert!((classifier.classify(&input).unwrap()[0] - 0.9).abs() < 1e-6);
        assert_eq!(classifier.calls(), 3);
    }

    #[test]
    fn test_classifier_checks_input_size() {
        let classifier = MockClassifier::constant(0.5).with_input_size(4);
        assert!(classifier.classify(&tensor(8)).is_err());
    }

    #[test]
    fn test_release_counter() {
        let counter = ReleaseCounter::new();
        let frame = counter.frame(info(), Instant::now());
        assert_eq!(counter.count(), 0);
        drop(frame);
        assert_eq!(counter.count(), 1);
    }

    #[test]
    fn test_mock_image_source() {
        let source = MockImageSource::new(vec![info()]);
        assert_eq!(source.count_hint(), Some(1));
        assert_eq!(source.images().count(), 1);
        assert_eq!(source.iteration_count(), 1);
        assert_eq!(MockImageSource::empty().images().count(), 0);
    }

    #[test]
    fn test_mock_report_output() {
        let output = MockReportOutput::new();
        let report = FrameReport::new(
            0,
            "test.png",
            OutcomeKind::Throttled,
            None,
            DetectionState::default(),
        );
        output.write(&report).unwrap();
        output.flush().unwrap();

        assert_eq!(output.reports(), vec![report]);
        assert_eq!(output.flush_count(), 1);
    }

    #[test]
    fn test_mock_progress_sink() {
        let sink = MockProgressSink::new();
        sink.on_event(MonitorEvent::Started { total: Some(1) });
        sink.on_event(MonitorEvent::AlertChanged {
            index: 0,
            from: AlertLevel::None,
            to: AlertLevel::Low,
        });
        sink.on_event(MonitorEvent::Finished {
            summary: SessionSummary::default(),
        });

        assert_eq!(sink.frame_count(), 0);
        assert_eq!(sink.alert_changes(), vec![(AlertLevel::None, AlertLevel::Low)]);
        assert!(sink.has_finished());
    }
}
