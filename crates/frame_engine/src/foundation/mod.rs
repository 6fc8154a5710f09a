//! Foundation module
//!
//! - Logging setup
//! - Frame timing and the fixed-timestep accumulator

pub mod logging;
pub mod time;
