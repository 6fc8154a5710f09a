//! Rendering backends
//!
//! Vulkan is the only backend; the frame subsystem sees it through
//! [`PresentationDevice`](crate::render::api::PresentationDevice).

/// Vulkan backend built on ash
pub mod vulkan;
