//! # Application Configuration
//!
//! Everything the demo needs to start: logging, the window and the renderer.
//! Each section has builder-style setters and a `Default`, and the whole tree
//! is checked by [`Config::validate`] when loaded from disk.
//!
//! Missing keys in a file fall back to their defaults, so a config file only
//! has to name what it changes:
//!
//! ```toml
//! [window]
//! width = 1920
//! height = 1080
//!
//! [renderer]
//! max_frames_in_flight = 3
//! ```

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError, ConfigFormat};

/// Upper bound on frames in flight
pub const MAX_FRAMES_IN_FLIGHT: usize = 8;

/// # Engine Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level used when `RUST_LOG` is not set
    pub log_level: String,
}

impl EngineConfig {
    /// Create an engine configuration with the default log level
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Parsed log level
    pub fn level_filter(&self) -> Result<log::LevelFilter, ConfigError> {
        self.log_level
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.log_level)))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Window Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Title bar text
    pub title: String,
    /// Initial width in screen coordinates
    pub width: u32,
    /// Initial height in screen coordinates
    pub height: u32,
    /// Whether the user may resize the window
    pub resizable: bool,
    /// Whether the window opens maximized
    pub maximized: bool,
}

impl WindowConfig {
    /// Create a window configuration with a title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            width: 1280,
            height: 720,
            resizable: true,
            maximized: false,
        }
    }

    /// Set initial size
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Allow or forbid resizing
    pub fn with_resizable(mut self, resizable: bool) -> Self {
        self.resizable = resizable;
        self
    }

    /// Open maximized
    pub fn with_maximized(mut self, maximized: bool) -> Self {
        self.maximized = maximized;
        self
    }

    /// Validate the window section
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.title.is_empty() {
            return Err(ConfigError::Invalid("window title cannot be empty".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "window size must be nonzero, got {}x{}",
                self.width, self.height
            )));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self::new("Frame Engine")
    }
}

/// # Renderer Configuration
///
/// Vulkan instance metadata, pacing and debug settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Application name for Vulkan instance creation
    pub application_name: String,
    /// Number of frame slots the CPU may record ahead of the GPU
    pub max_frames_in_flight: usize,
    /// Whether to enable the validation layer; `None` follows the build type
    pub enable_validation: Option<bool>,
    /// Color the swapchain image is cleared to (RGBA)
    pub clear_color: [f32; 4],
    /// Directory holding `triangle.vert.spv` and `triangle.frag.spv`
    pub shader_dir: Option<String>,
}

impl RendererConfig {
    /// Create a renderer configuration
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            application_name: app_name.into(),
            max_frames_in_flight: 2,
            enable_validation: None,
            clear_color: [0.02, 0.02, 0.05, 1.0],
            shader_dir: None,
        }
    }

    /// Set maximum frames in flight
    pub fn with_max_frames_in_flight(mut self, frames: usize) -> Self {
        self.max_frames_in_flight = frames;
        self
    }

    /// Enable or disable validation layers
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = Some(enabled);
        self
    }

    /// Set clear color
    pub fn with_clear_color(mut self, color: [f32; 4]) -> Self {
        self.clear_color = color;
        self
    }

    /// Set the compiled shader directory
    pub fn with_shader_dir(mut self, dir: impl Into<String>) -> Self {
        self.shader_dir = Some(dir.into());
        self
    }

    /// Whether validation should be turned on for this build
    pub fn validation_enabled(&self) -> bool {
        self.enable_validation.unwrap_or(cfg!(debug_assertions))
    }

    /// Validate the renderer section
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_name.is_empty() {
            return Err(ConfigError::Invalid("application name cannot be empty".to_string()));
        }
        if self.shader_dir.as_deref() == Some("") {
            return Err(ConfigError::Invalid("shader directory cannot be empty".to_string()));
        }
        if !(1..=MAX_FRAMES_IN_FLIGHT).contains(&self.max_frames_in_flight) {
            return Err(ConfigError::Invalid(format!(
                "max frames in flight must be within 1..={}, got {}",
                MAX_FRAMES_IN_FLIGHT, self.max_frames_in_flight
            )));
        }
        Ok(())
    }
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self::new("Frame Engine")
    }
}

/// # Complete Application Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Window configuration
    pub window: WindowConfig,
    /// Rendering system configuration
    pub renderer: RendererConfig,
}

impl ApplicationConfig {
    /// Create a configuration whose window title and application name match
    pub fn new(app_name: impl Into<String>) -> Self {
        let app_name = app_name.into();
        Self {
            engine: EngineConfig::default(),
            window: WindowConfig::new(app_name.clone()),
            renderer: RendererConfig::new(app_name),
        }
    }
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self::new("Frame Engine")
    }
}

impl Config for ApplicationConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.engine.level_filter()?;
        self.window.validate()?;
        self.renderer.validate()
    }
}
