//! Clear-only frame recorder

use ash::vk;

use crate::render::api::{CommandRecorder, RenderTarget};
use crate::render::backends::vulkan::initialization::DebugLabels;
use crate::render::backends::vulkan::VulkanDevice;
use crate::render::error::RecordError;

/// Records a render pass that only clears the swapchain image
pub struct ClearPassRecorder {
    device: ash::Device,
    labels: DebugLabels,
    clear_color: [f32; 4],
}

impl ClearPassRecorder {
    /// Recorder clearing to `clear_color` (linear RGBA)
    pub fn new(device: &VulkanDevice, clear_color: [f32; 4]) -> Self {
        Self {
            device: device.raw().clone(),
            labels: device.labels().clone(),
            clear_color,
        }
    }

    /// Color used from the next recorded frame on
    pub fn set_clear_color(&mut self, clear_color: [f32; 4]) {
        self.clear_color = clear_color;
    }

    /// Current clear color
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    fn clear_values(&self) -> [vk::ClearValue; 1] {
        [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        }]
    }
}

impl CommandRecorder for ClearPassRecorder {
    fn record(&mut self, command_buffer: vk::CommandBuffer, target: &RenderTarget) -> Result<(), RecordError> {
        let begin_info = vk::CommandBufferBeginInfo::builder().flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        unsafe { self.device.begin_command_buffer(command_buffer, &begin_info) }
            .map_err(|result| RecordError::from_vk("begin command buffer", result))?;

        self.labels.begin_command_label(command_buffer, "CommandBuffer");

        let clear_values = self.clear_values();
        let pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(target.render_pass)
            .framebuffer(target.framebuffer)
            .render_area(target.render_area())
            .clear_values(&clear_values);

        self.labels.insert_command_label(command_buffer, "Begin render pass");
        unsafe {
            self.device
                .cmd_begin_render_pass(command_buffer, &pass_info, vk::SubpassContents::INLINE);
            self.device.cmd_end_render_pass(command_buffer);
        }
        self.labels.insert_command_label(command_buffer, "End render pass");

        self.labels.end_command_label(command_buffer);

        unsafe { self.device.end_command_buffer(command_buffer) }
            .map_err(|result| RecordError::from_vk("end command buffer", result))
    }
}
