//! Frame pacing and presentation-surface lifecycle
//!
//! - [`surface`]: what the surface supports and how a configuration is picked
//! - [`swapchain`]: presentable images with their views, render pass and framebuffers
//! - [`ring`]: per-frame-in-flight fences, semaphores and command buffers
//! - [`orchestrator`]: the per-frame state machine tying them together

pub mod orchestrator;
pub mod ring;
pub mod surface;
pub mod swapchain;

#[cfg(test)]
pub(crate) mod testing;

pub use orchestrator::{FrameOrchestrator, FrameOutcome, FrameState, RecreateReasons};
pub use ring::{FrameRing, FrameSlot};
pub use surface::SurfaceCapabilities;
pub use swapchain::SwapChain;
