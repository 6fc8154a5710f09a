//! Triangle recorder
//!
//! Draws a single vertex-shader-generated triangle over the cleared image.
//! The pipeline is tied to the swapchain's render pass and rebuilt the first
//! time a frame arrives with a different one.

use std::path::Path;
use std::rc::Rc;

use ash::vk;

use super::shader::{GraphicsPipeline, ShaderModule};
use crate::render::api::{CommandRecorder, RenderTarget};
use crate::render::backends::vulkan::VulkanDevice;
use crate::render::error::{RecordError, RenderResult};

/// Vertex shader file name inside the shader directory
pub const TRIANGLE_VERTEX_SHADER: &str = "triangle.vert.spv";
/// Fragment shader file name inside the shader directory
pub const TRIANGLE_FRAGMENT_SHADER: &str = "triangle.frag.spv";

/// A value built against one render pass
///
/// Asking for it with a different render pass drops the old value before the
/// new one is built.
pub struct RenderPassBound<P> {
    render_pass: vk::RenderPass,
    value: Option<P>,
    builds: usize,
}

impl<P> RenderPassBound<P> {
    /// Nothing built yet
    pub fn new() -> Self {
        Self {
            render_pass: vk::RenderPass::null(),
            value: None,
            builds: 0,
        }
    }

    /// The value for `render_pass`, building it when missing or stale
    pub fn get_or_rebuild<E>(
        &mut self,
        render_pass: vk::RenderPass,
        build: impl FnOnce(vk::RenderPass) -> Result<P, E>,
    ) -> Result<&P, E> {
        if self.render_pass != render_pass {
            self.value = None;
        }
        let value = match self.value.take() {
            Some(value) => value,
            None => {
                let value = build(render_pass)?;
                self.render_pass = render_pass;
                self.builds += 1;
                value
            }
        };
        Ok(self.value.insert(value))
    }

    /// Render pass the current value was built for
    pub fn render_pass(&self) -> Option<vk::RenderPass> {
        self.value.as_ref().map(|_| self.render_pass)
    }

    /// How many times a value has been built
    pub fn builds(&self) -> usize {
        self.builds
    }
}

impl<P> Default for RenderPassBound<P> {
    fn default() -> Self {
        Self::new()
    }
}

/// Clears the image and draws one triangle
pub struct TrianglePassRecorder {
    // Field order is drop order: Vulkan objects go before the device.
    pipeline: RenderPassBound<GraphicsPipeline>,
    vertex_shader: ShaderModule,
    fragment_shader: ShaderModule,
    device: Rc<VulkanDevice>,
    clear_color: [f32; 4],
}

impl TrianglePassRecorder {
    /// Load `triangle.vert.spv` and `triangle.frag.spv` from `shader_dir`
    pub fn new(device: Rc<VulkanDevice>, shader_dir: impl AsRef<Path>, clear_color: [f32; 4]) -> RenderResult<Self> {
        let shader_dir = shader_dir.as_ref();
        let vertex_shader = ShaderModule::from_file(
            device.raw(),
            device.labels(),
            shader_dir.join(TRIANGLE_VERTEX_SHADER),
            "Triangle VertexShader",
        )?;
        let fragment_shader = ShaderModule::from_file(
            device.raw(),
            device.labels(),
            shader_dir.join(TRIANGLE_FRAGMENT_SHADER),
            "Triangle FragmentShader",
        )?;

        log::info!("Loaded triangle shaders from {}", shader_dir.display());
        Ok(Self {
            pipeline: RenderPassBound::new(),
            vertex_shader,
            fragment_shader,
            device,
            clear_color,
        })
    }

    /// Color used from the next recorded frame on
    pub fn set_clear_color(&mut self, clear_color: [f32; 4]) {
        self.clear_color = clear_color;
    }

    /// Current clear color
    pub fn clear_color(&self) -> [f32; 4] {
        self.clear_color
    }

    /// Times the pipeline has been built so far
    pub fn pipeline_builds(&self) -> usize {
        self.pipeline.builds()
    }
}

impl CommandRecorder for TrianglePassRecorder {
    fn record(&mut self, command_buffer: vk::CommandBuffer, target: &RenderTarget) -> Result<(), RecordError> {
        // A new render pass only shows up after a swapchain rebuild, which
        // drains the device first, so the old pipeline is no longer in use.
        let device = &self.device;
        let (vertex_shader, fragment_shader) = (&self.vertex_shader, &self.fragment_shader);
        let pipeline = self
            .pipeline
            .get_or_rebuild(target.render_pass, |render_pass| {
                GraphicsPipeline::new(
                    device.raw(),
                    device.labels(),
                    render_pass,
                    vertex_shader,
                    fragment_shader,
                    "Triangle",
                )
            })
            .map_err(|result| RecordError::from_vk("triangle pipeline creation failed", result))?
            .handle();

        let raw = self.device.raw();
        let labels = self.device.labels();

        let begin_info = vk::CommandBufferBeginInfo::builder();
        unsafe { raw.begin_command_buffer(command_buffer, &begin_info) }
            .map_err(|result| RecordError::from_vk("begin command buffer", result))?;

        labels.begin_command_label(command_buffer, "CommandBuffer");

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.clear_color,
            },
        }];
        let pass_info = vk::RenderPassBeginInfo::builder()
            .render_pass(target.render_pass)
            .framebuffer(target.framebuffer)
            .render_area(target.render_area())
            .clear_values(&clear_values);

        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: target.extent.width as f32,
            height: target.extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };

        labels.insert_command_label(command_buffer, "Begin render pass");
        unsafe {
            raw.cmd_begin_render_pass(command_buffer, &pass_info, vk::SubpassContents::INLINE);

            labels.insert_command_label(command_buffer, "Bind pipeline");
            raw.cmd_bind_pipeline(command_buffer, vk::PipelineBindPoint::GRAPHICS, pipeline);

            labels.insert_command_label(command_buffer, "Set viewport");
            raw.cmd_set_viewport(command_buffer, 0, &[viewport]);

            labels.insert_command_label(command_buffer, "Set scissor");
            raw.cmd_set_scissor(command_buffer, 0, &[target.render_area()]);

            labels.insert_command_label(command_buffer, "Draw");
            raw.cmd_draw(command_buffer, 3, 1, 0, 0);

            labels.insert_command_label(command_buffer, "End render pass");
            raw.cmd_end_render_pass(command_buffer);
        }

        labels.end_command_label(command_buffer);

        unsafe { raw.end_command_buffer(command_buffer) }
            .map_err(|result| RecordError::from_vk("end command buffer", result))
    }
}
