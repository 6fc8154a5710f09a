//! GLFW window for Vulkan presentation
//!
//! Opens a window without a client API, pumps the GLFW event queue and turns
//! the raw GLFW events into [`WindowEvent`] values. Also owns the bits of GLFW
//! that Vulkan setup needs: the required instance extensions and surface
//! creation.

use ash::vk;
use thiserror::Error;

use crate::core::config::WindowConfig;
use crate::events::{KeyAction, WindowEvent};
use crate::render::window::WindowSurface;

/// Window system errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW could not be initialized
    #[error("GLFW initialization failed")]
    InitializationFailed,

    /// The window could not be opened
    #[error("window creation failed")]
    CreationFailed,

    /// GLFW cannot report the instance extensions Vulkan needs
    #[error("Vulkan is not supported by the window system")]
    VulkanUnsupported,

    /// Vulkan surface creation failed
    #[error("failed to create Vulkan surface: {0:?}")]
    SurfaceCreation(vk::Result),
}

/// Result type for window operations
pub type WindowResult<T> = Result<T, WindowError>;

fn log_glfw_error(error: glfw::Error, description: String) {
    log::error!("GLFW error {:?}: {}", error, description);
}

/// GLFW window wrapper
pub struct GlfwWindow {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl GlfwWindow {
    /// Open a window described by `config`
    pub fn new(config: &WindowConfig) -> WindowResult<Self> {
        let mut glfw = glfw::init(log_glfw_error).map_err(|_| WindowError::InitializationFailed)?;

        glfw.window_hint(glfw::WindowHint::ClientApi(glfw::ClientApiHint::NoApi));
        glfw.window_hint(glfw::WindowHint::Resizable(config.resizable));
        glfw.window_hint(glfw::WindowHint::Maximized(config.maximized));

        let (mut window, events) = glfw
            .create_window(config.width, config.height, &config.title, glfw::WindowMode::Windowed)
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_close_polling(true);
        window.set_framebuffer_size_polling(true);
        window.set_iconify_polling(true);

        log::debug!(
            "Opened window '{}' ({}x{}, resizable: {})",
            config.title,
            config.width,
            config.height,
            config.resizable
        );

        Ok(Self { glfw, window, events })
    }

    /// Whether the user asked to close the window
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Request or cancel closing
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Instance extensions GLFW needs to create a surface
    pub fn required_instance_extensions(&self) -> WindowResult<Vec<String>> {
        self.glfw
            .get_required_instance_extensions()
            .ok_or(WindowError::VulkanUnsupported)
    }

    /// Create a Vulkan surface for this window
    pub fn create_vulkan_surface(&self, instance: vk::Instance) -> WindowResult<vk::SurfaceKHR> {
        let mut surface = vk::SurfaceKHR::null();
        let result = self.window.create_window_surface(instance, std::ptr::null(), &mut surface);

        if result == vk::Result::SUCCESS {
            Ok(surface)
        } else {
            Err(WindowError::SurfaceCreation(result))
        }
    }
}

impl WindowSurface for GlfwWindow {
    fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (clamp_dimension(width), clamp_dimension(height))
    }

    fn is_minimized(&self) -> bool {
        self.window.is_iconified()
    }

    fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    fn wait_events(&mut self) {
        self.glfw.wait_events();
    }

    fn drain_events(&mut self) -> Vec<WindowEvent> {
        glfw::flush_messages(&self.events)
            .filter_map(|(_, event)| translate_event(event))
            .collect()
    }
}

fn clamp_dimension(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

/// Map a GLFW event onto the events the application cares about
pub(crate) fn translate_event(event: glfw::WindowEvent) -> Option<WindowEvent> {
    match event {
        glfw::WindowEvent::Close => Some(WindowEvent::Closed),
        glfw::WindowEvent::FramebufferSize(width, height) => Some(WindowEvent::Resized {
            width: clamp_dimension(width),
            height: clamp_dimension(height),
        }),
        glfw::WindowEvent::Iconify(minimized) => Some(WindowEvent::Minimized(minimized)),
        glfw::WindowEvent::Key(key, _, action, modifiers) => {
            let action = match action {
                glfw::Action::Press => KeyAction::Pressed,
                glfw::Action::Release => KeyAction::Released,
                glfw::Action::Repeat => KeyAction::Repeated,
            };
            Some(WindowEvent::Key { key, action, modifiers })
        }
        _ => None,
    }
}
