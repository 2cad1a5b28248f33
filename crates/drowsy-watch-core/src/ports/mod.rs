//! Port definitions for hexagonal architecture.
//!
//! These traits define the boundaries between the detection core and the
//! face detector, classifier, frame sources and outputs plugged into it.

mod classifier;
mod face_detector;
mod image_source;
mod progress;
mod report_output;

pub use classifier::{ImageClassifier, ImageTensor};
pub use face_detector::FaceDetector;
pub use image_source::ImageSource;
pub use progress::{MonitorEvent, ProgressSink};
pub use report_output::ReportOutput;
