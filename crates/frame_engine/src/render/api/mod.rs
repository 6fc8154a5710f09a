//! Collaborator interfaces of the frame subsystem
//!
//! The orchestrator is generic over these traits so the same state machine
//! drives the Vulkan backend and the in-memory test device.

pub mod device;
pub mod recorder;

pub use device::{
    DeviceResult, ImageSharing, PresentDesc, PresentationDevice, QueueFamilies, SubmitDesc, SwapchainDesc,
};
pub use recorder::{CommandRecorder, RenderTarget};
