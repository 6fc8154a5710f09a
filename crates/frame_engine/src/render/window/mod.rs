//! Window layer
//!
//! [`WindowSurface`] is what the frame loop needs from a window. [`GlfwWindow`]
//! is the desktop implementation and also creates the Vulkan surface.

pub mod backend;
pub mod glfw_window;

pub use backend::WindowSurface;
pub use glfw_window::{GlfwWindow, WindowError, WindowResult};
