//! Inference device selection.

use candle_core::Device;
use tracing::info;

/// Returns the device models are loaded onto.
///
/// With `prefer_gpu`, tries Metal then CUDA when the matching feature is
/// compiled in. Falls back to the CPU.
#[must_use]
pub fn select_device(prefer_gpu: bool) -> Device {
    if prefer_gpu {
        #[cfg(feature = "metal")]
        {
            if let Ok(device) = Device::new_metal(0) {
                info!("Using Metal device for inference");
                return device;
            }
        }

        #[cfg(feature = "cuda")]
        {
            if let Ok(device) = Device::new_cuda(0) {
                info!("Using CUDA device for inference");
                return device;
            }
        }
    }

    info!("Using CPU for inference");
    Device::Cpu
}
