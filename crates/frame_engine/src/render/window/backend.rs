//! Window contract consumed by the frame orchestrator

use crate::events::WindowEvent;

/// Window state the frame loop depends on
///
/// Implemented by [`GlfwWindow`](super::GlfwWindow) and by test doubles.
pub trait WindowSurface {
    /// Current framebuffer size in pixels
    fn framebuffer_size(&self) -> (u32, u32);

    /// Whether the window is minimized (iconified)
    fn is_minimized(&self) -> bool;

    /// Pump pending OS events without blocking
    fn poll_events(&mut self);

    /// Pump OS events, blocking until at least one arrives if the platform can
    ///
    /// Used while waiting for a minimized window to come back.
    fn wait_events(&mut self) {
        self.poll_events();
    }

    /// Take every event produced since the last call
    fn drain_events(&mut self) -> Vec<WindowEvent>;

    /// Whether there is anything to present into
    fn has_presentable_area(&self) -> bool {
        let (width, height) = self.framebuffer_size();
        !self.is_minimized() && width > 0 && height > 0
    }
}
