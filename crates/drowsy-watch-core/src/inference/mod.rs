//! Candle-backed implementations of the detector and classifier ports.
//!
//! - [`EyeOpennessModel`]: small CNN scoring a 160x160 face crop
//! - [`BlazeFace`]: short-range face detector with six keypoints

mod blazeface;
mod device;
mod eye_openness;
mod loader;
mod utils;

pub use blazeface::{BlazeFace, BLAZEFACE_INPUT_SIZE, DEFAULT_SCORE_THRESHOLD};
pub use device::select_device;
pub use eye_openness::{EyeOpennessModel, EyeOpennessNet};
pub use loader::{load_labels, load_safetensors};
pub use utils::{sigmoid, softmax};
