//! Dedicated analysis thread that serializes frame processing.

use std::thread::{self, JoinHandle};

use anyhow::{anyhow, Context};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;
use tracing::{debug, error, trace, warn};

use super::frame::Frame;
use super::monitor::{DrowsinessMonitor, FrameOutcome};
use super::published::StateSubscription;
use crate::domain::{DetectionState, FrameSignal, ImageInfo};
use crate::ports::{FaceDetector, ImageClassifier};

/// Frames that may wait for the worker before new ones are throttled.
pub const DEFAULT_QUEUE_CAPACITY: usize = 4;

const WORKER_THREAD_NAME: &str = "drowsy-watch-worker";

enum Job {
    Frame {
        frame: Frame,
        reply: oneshot::Sender<FrameOutcome>,
    },
    Still {
        info: ImageInfo,
        reply: oneshot::Sender<f64>,
    },
}

impl Job {
    /// Answers a job the worker has no room for.
    fn reject(self) {
        match self {
            Self::Frame { frame, reply } => {
                drop(frame);
                deliver(reply, FrameOutcome::Throttled, "Frame outcome");
            }
            Self::Still { info, reply } => {
                warn!("Monitor worker busy, assuming open eyes for {}", info.path);
                deliver(reply, FrameSignal::NO_FACE.openness, "Still openness");
            }
        }
    }
}

/// Sends `value` to a submitter that may have stopped listening.
fn deliver<T>(reply: oneshot::Sender<T>, value: T, what: &str) {
    if reply.send(value).is_err() {
        trace!("{what} discarded, submitter went away");
    }
}

/// Owns a [`DrowsinessMonitor`] on a dedicated thread.
///
/// Frames are processed one at a time in submission order, so detection
/// state and published values are only ever mutated from that thread. When
/// the queue is full a new frame is released at once and answered with
/// [`FrameOutcome::Throttled`].
pub struct MonitorWorker {
    sender: Option<mpsc::Sender<Job>>,
    subscription: StateSubscription,
    handle: Option<JoinHandle<DetectionState>>,
}

impl MonitorWorker {
    /// Starts the worker thread with the default queue capacity.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn<D, C>(monitor: DrowsinessMonitor<D, C>) -> anyhow::Result<Self>
    where
        D: FaceDetector + 'static,
        C: ImageClassifier + 'static,
    {
        Self::spawn_with_capacity(monitor, DEFAULT_QUEUE_CAPACITY)
    }

    /// Starts the worker thread with room for `capacity` pending jobs (at least one).
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn_with_capacity<D, C>(
        mut monitor: DrowsinessMonitor<D, C>,
        capacity: usize,
    ) -> anyhow::Result<Self>
    where
        D: FaceDetector + 'static,
        C: ImageClassifier + 'static,
    {
        let (sender, mut receiver) = mpsc::channel::<Job>(capacity.max(1));
        let subscription = monitor.subscribe();

        let handle = thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                debug!("Monitor worker started");
                while let Some(job) = receiver.blocking_recv() {
                    match job {
                        Job::Frame { frame, reply } => {
                            let outcome = monitor.process_frame(frame);
                            deliver(reply, outcome, "Frame outcome");
                        }
                        Job::Still { info, reply } => {
                            let openness = monitor.analyze_still(&info);
                            deliver(reply, openness, "Still openness");
                        }
                    }
                }
                let state = monitor.state();
                debug!("Monitor worker stopped in state {state:?}");
                state
            })
            .context("Failed to spawn monitor worker thread")?;

        Ok(Self {
            sender: Some(sender),
            subscription,
            handle: Some(handle),
        })
    }

    /// Queues a frame for analysis.
    ///
    /// The receiver resolves exactly once with the frame's outcome. It
    /// errors only if the worker has stopped, in which case the frame has
    /// already been released.
    pub fn submit(&self, frame: Frame) -> oneshot::Receiver<FrameOutcome> {
        let (reply, receiver) = oneshot::channel();
        self.enqueue(Job::Frame { frame, reply });
        receiver
    }

    /// Queues a still image for one-shot openness estimation.
    ///
    /// Resolves to 1.0 if the worker is too busy to take the job.
    pub fn analyze_still(&self, info: ImageInfo) -> oneshot::Receiver<f64> {
        let (reply, receiver) = oneshot::channel();
        self.enqueue(Job::Still { info, reply });
        receiver
    }

    /// Returns read-only handles to the published values.
    #[must_use]
    pub fn subscribe(&self) -> StateSubscription {
        self.subscription.clone()
    }

    /// Stops accepting jobs, drains the queue and joins the thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the worker thread panicked.
    pub fn shutdown(mut self) -> anyhow::Result<DetectionState> {
        self.sender.take();
        let handle = self
            .handle
            .take()
            .ok_or_else(|| anyhow!("Monitor worker already stopped"))?;
        handle
            .join()
            .map_err(|_| anyhow!("Monitor worker thread panicked"))
    }

    fn enqueue(&self, job: Job) {
        let Some(sender) = &self.sender else {
            return;
        };
        match sender.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(job)) => {
                debug!("Monitor worker queue full, throttling");
                job.reject();
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Monitor worker has stopped, dropping job");
            }
        }
    }
}

impl Drop for MonitorWorker {
    fn drop(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("Monitor worker thread panicked");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{mpsc as std_mpsc, Arc, Mutex};
    use std::time::{Duration, Instant};

    use image::DynamicImage;

    use super::*;
    use crate::domain::{AlertLevel, BoundingBox, DetectedFace, OutcomeKind};
    use crate::pipeline::MonitorConfig;
    use crate::ports::ImageTensor;

    /// Reports one face per frame, optionally waiting for a permit first.
    struct Gated(Option<Mutex<std_mpsc::Receiver<()>>>);

    impl FaceDetector for Gated {
        fn detect(&self, _image: &ImageInfo) -> anyhow::Result<Vec<DetectedFace>> {
            if let Some(gate) = &self.0 {
                gate.lock().unwrap().recv()?;
            }
            Ok(vec![DetectedFace::new(BoundingBox::new(0, 0, 8, 8))])
        }
    }

    struct Closed;

    impl ImageClassifier for Closed {
        fn input_size(&self) -> u32 {
            4
        }

        fn classify(&self, _input: &ImageTensor) -> anyhow::Result<Vec<f32>> {
            Ok(vec![0.1])
        }
    }

    fn config() -> MonitorConfig {
        MonitorConfig {
            min_interval: Duration::ZERO,
            ..MonitorConfig::default()
        }
    }

    fn counted_frame(counter: &Arc<AtomicUsize>) -> Frame {
        let c = Arc::clone(counter);
        Frame::new(
            ImageInfo::new("w.png", DynamicImage::new_rgb8(8, 8)),
            Instant::now(),
        )
        .with_release(move || {
            c.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_frames_processed_in_order() {
        let monitor = DrowsinessMonitor::new(Gated(None), Closed, config());
        let worker = MonitorWorker::spawn_with_capacity(monitor, 64).unwrap();
        let released = Arc::new(AtomicUsize::new(0));

        let receivers: Vec<_> = (0..30)
            .map(|_| worker.submit(counted_frame(&released)))
            .collect();
        let counters: Vec<u32> = receivers
            .into_iter()
            .map(|rx| {
                rx.blocking_recv()
                    .unwrap()
                    .transition()
                    .unwrap()
                    .current
                    .frame_counter
            })
            .collect();

        assert_eq!(counters, (1..=30).collect::<Vec<_>>());
        assert_eq!(
            *worker.subscribe().alert_level.borrow(),
            AlertLevel::Critical
        );

        let state = worker.shutdown().unwrap();
        assert_eq!(state.frame_counter, 30);
        assert_eq!(released.load(Ordering::SeqCst), 30);
    }

    #[test]
    fn test_full_queue_throttles() {
        let (permits, gate) = std_mpsc::channel();
        let monitor = DrowsinessMonitor::new(Gated(Some(Mutex::new(gate))), Closed, config());
        let worker = MonitorWorker::spawn_with_capacity(monitor, 1).unwrap();
        let released = Arc::new(AtomicUsize::new(0));

        let receivers: Vec<_> = (0..3)
            .map(|_| worker.submit(counted_frame(&released)))
            .collect();
        for _ in 0..3 {
            permits.send(()).unwrap();
        }

        let kinds: Vec<OutcomeKind> = receivers
            .into_iter()
            .map(|rx| rx.blocking_recv().unwrap().kind())
            .collect();

        assert_eq!(kinds[0], OutcomeKind::Analyzed);
        assert!(kinds.contains(&OutcomeKind::Throttled));

        drop(worker);
        assert_eq!(released.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_still_analysis_through_worker() {
        let monitor = DrowsinessMonitor::new(Gated(None), Closed, config());
        let worker = MonitorWorker::spawn(monitor).unwrap();

        let info = ImageInfo::new("still.png", DynamicImage::new_rgb8(8, 8));
        let openness = worker.analyze_still(info).blocking_recv().unwrap();
        assert!((openness - 0.1).abs() < 1e-6);

        assert_eq!(worker.shutdown().unwrap(), DetectionState::default());
    }

    #[test]
    fn test_rejected_jobs_tolerate_departed_submitters() {
        let released = Arc::new(AtomicUsize::new(0));
        let (reply, receiver) = oneshot::channel();
        drop(receiver);
        Job::Frame {
            frame: counted_frame(&released),
            reply,
        }
        .reject();
        assert_eq!(released.load(Ordering::SeqCst), 1);

        let (reply, receiver) = oneshot::channel();
        drop(receiver);
        Job::Still {
            info: ImageInfo::new("busy.png", DynamicImage::new_rgb8(8, 8)),
            reply,
        }
        .reject();
    }

    #[test]
    fn test_worker_survives_dropped_receivers() {
        let monitor = DrowsinessMonitor::new(Gated(None), Closed, config());
        let worker = MonitorWorker::spawn_with_capacity(monitor, 8).unwrap();
        let released = Arc::new(AtomicUsize::new(0));

        drop(worker.submit(counted_frame(&released)));
        drop(worker.analyze_still(ImageInfo::new("gone.png", DynamicImage::new_rgb8(8, 8))));

        let outcome = worker.submit(counted_frame(&released)).blocking_recv().unwrap();
        assert_eq!(outcome.transition().unwrap().current.frame_counter, 2);

        let state = worker.shutdown().unwrap();
        assert_eq!(state.frame_counter, 2);
        assert_eq!(released.load(Ordering::SeqCst), 2);
    }
}
