//! # Core Engine Module
//!
//! Shared configuration types used by the window, the renderer and the demo.

pub mod config;

pub use config::{
    ApplicationConfig,
    Config,
    ConfigError,
    ConfigFormat,
    EngineConfig,
    RendererConfig,
    WindowConfig,
};
