//! Render-command recorder seam

use ash::vk;
use crate::render::error::RecordError;

/// Everything a recorder needs to draw into the acquired swapchain image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    /// Index of the image within the swapchain
    pub image_index: u32,
    /// Swapchain image
    pub image: vk::Image,
    /// View of `image`
    pub image_view: vk::ImageView,
    /// Render pass compatible with `framebuffer`
    pub render_pass: vk::RenderPass,
    /// Framebuffer wrapping `image_view`
    pub framebuffer: vk::Framebuffer,
    /// Image extent
    pub extent: vk::Extent2D,
    /// Image format
    pub format: vk::Format,
}

impl RenderTarget {
    /// Full-image render area
    pub fn render_area(&self) -> vk::Rect2D {
        vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent: self.extent,
        }
    }
}

/// Fills one command buffer per frame
///
/// The command buffer has already been reset when `record` is called; the
/// recorder begins and ends it. A failure is fatal for the frame.
pub trait CommandRecorder {
    /// Record the frame's commands
    fn record(&mut self, command_buffer: vk::CommandBuffer, target: &RenderTarget) -> Result<(), RecordError>;
}

impl<F> CommandRecorder for F
where
    F: FnMut(vk::CommandBuffer, &RenderTarget) -> Result<(), RecordError>,
{
    fn record(&mut self, command_buffer: vk::CommandBuffer, target: &RenderTarget) -> Result<(), RecordError> {
        self(command_buffer, target)
    }
}
