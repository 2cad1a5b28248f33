//! Test support utilities for drowsy-watch.
//!
//! Provides scripted mocks for every core port, synthetic frame and pose
//! builders, and writers for small model artifacts that load through the
//! real inference code.
//!
//! # Example
//!
//! ```
//! use drowsy_watch_test_support::{MockClassifier, MockFaceDetector, PoseBuilder};
//!
//! // Every frame shows one yawning face with half-closed eyes.
//! let face = PoseBuilder::centered(200, 200).yawning().build();
//! let detector = MockFaceDetector::always(vec![face]);
//! let classifier = MockClassifier::constant(0.4);
//! ```

mod builders;
mod mocks;
mod weights;

pub use builders::{PoseBuilder, SyntheticImageBuilder};
pub use mocks::{
    MockClassifier, MockFaceDetector, MockImageSource, MockProgressSink, MockReportOutput,
    ReleaseCounter,
};
pub use weights::{openness_bias, write_labels, write_model_dir, write_openness_weights};
