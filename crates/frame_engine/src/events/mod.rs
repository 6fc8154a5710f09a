//! Discrete window events
//!
//! The window produces these values; the application drains them once per
//! tick and reacts. Nothing is dispatched through stored callbacks.

use glfw::{Key, Modifiers};

/// What happened to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyAction {
    /// Key went down
    Pressed,
    /// Key went up
    Released,
    /// Key is held and the OS repeated it
    Repeated,
}

/// Event produced by the window system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowEvent {
    /// The user asked to close the window
    Closed,
    /// The framebuffer changed size (pixels)
    Resized {
        /// New width
        width: u32,
        /// New height
        height: u32,
    },
    /// The window was minimized (`true`) or restored (`false`)
    Minimized(bool),
    /// Keyboard input
    Key {
        /// Key identifier
        key: Key,
        /// Transition
        action: KeyAction,
        /// Held modifiers
        modifiers: Modifiers,
    },
}

impl WindowEvent {
    /// Whether this event invalidates the current swapchain size
    pub fn is_resize(&self) -> bool {
        matches!(self, WindowEvent::Resized { .. } | WindowEvent::Minimized(false))
    }

    /// Whether this is a press of `key`
    pub fn is_key_pressed(&self, key: Key) -> bool {
        matches!(self, WindowEvent::Key { key: k, action: KeyAction::Pressed, .. } if *k == key)
    }
}
