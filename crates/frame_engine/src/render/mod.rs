//! # Rendering
//!
//! Frame pacing and presentation for a single window.
//!
//! - [`api`]: the device and recorder seams the frame loop is written against
//! - [`frame`]: surface descriptor, swap chain, frame ring and orchestrator
//! - [`window`]: the window seam and its GLFW implementation
//! - [`backends`]: the Vulkan implementation of the device seam
//! - [`error`]: the fatal error taxonomy
//!
//! The orchestrator only needs `Rc<impl PresentationDevice>`, so the whole
//! state machine runs against an in-memory device in tests.

pub mod api;
pub mod backends;
pub mod error;
pub mod frame;
pub mod window;

pub use api::{CommandRecorder, PresentationDevice, QueueFamilies, RenderTarget};
pub use backends::vulkan::{ClearPassRecorder, TrianglePassRecorder, VulkanContext, VulkanDevice};
pub use error::{FramePhase, RecordError, RenderError, RenderResult};
pub use frame::{FrameOrchestrator, FrameOutcome, FrameState, RecreateReasons, SurfaceCapabilities};
pub use window::{GlfwWindow, WindowSurface};
