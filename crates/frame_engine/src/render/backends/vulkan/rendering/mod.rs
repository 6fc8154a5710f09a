//! Command recorders for the Vulkan backend

pub mod clear_pass;
pub mod shader;
pub mod triangle_pass;

pub use clear_pass::ClearPassRecorder;
pub use shader::{GraphicsPipeline, ShaderModule};
pub use triangle_pass::{RenderPassBound, TrianglePassRecorder};
