//! # Frame Engine
//!
//! Vulkan frame pacing and swapchain lifecycle for a desktop window.
//!
//! A [`FrameOrchestrator`](render::FrameOrchestrator) owns a ring of frames in
//! flight and a swap chain. Each call to `render_one_frame` waits for the
//! slot's previous submission, acquires an image, lets a
//! [`CommandRecorder`](render::CommandRecorder) fill the slot's command buffer,
//! submits and presents. Stale swapchains are rebuilt in place, and a
//! minimized window blocks rebuilding until it has an area again.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::rc::Rc;
//! use frame_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let window = GlfwWindow::new(&config.window)?;
//!     let context = VulkanContext::new(&window, &config.renderer)?;
//!     let device = Rc::new(VulkanDevice::new(context));
//!     let recorder = ClearPassRecorder::new(&device, config.renderer.clear_color);
//!
//!     let mut frames = FrameOrchestrator::initialize(
//!         device,
//!         window,
//!         recorder,
//!         config.renderer.max_frames_in_flight,
//!     )?;
//!     while !frames.window().should_close() {
//!         frames.window_mut().poll_events();
//!         for event in frames.window_mut().drain_events() {
//!             if event.is_resize() {
//!                 frames.notify_resized();
//!             }
//!         }
//!         frames.render_one_frame()?;
//!     }
//!     frames.shutdown()?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod core;
pub mod events;
pub mod foundation;
pub mod render;

/// Commonly used types
pub mod prelude {
    pub use crate::core::{ApplicationConfig, Config, EngineConfig, RendererConfig, WindowConfig};
    pub use crate::events::{KeyAction, WindowEvent};
    pub use crate::foundation::time::{FixedTimestep, Timer};
    pub use crate::render::{
        ClearPassRecorder, CommandRecorder, FrameOrchestrator, FrameOutcome, GlfwWindow, PresentationDevice,
        RenderError, RenderResult, TrianglePassRecorder, VulkanContext, VulkanDevice, WindowSurface,
    };
}
