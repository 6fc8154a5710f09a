//! SPIR-V shader modules and the swapchain graphics pipeline
//!
//! Both wrappers destroy their handles on drop through a cloned
//! `ash::Device`; whoever owns them keeps the device alive for longer.

use std::io::Cursor;
use std::path::Path;

use ash::vk;

use crate::render::backends::vulkan::initialization::DebugLabels;
use crate::render::error::{RenderError, RenderResult};

/// First word of every SPIR-V module
const SPIRV_MAGIC: u32 = 0x0723_0203;

fn entry_point() -> &'static std::ffi::CStr {
    unsafe { std::ffi::CStr::from_bytes_with_nul_unchecked(b"main\0") }
}

/// Decode SPIR-V bytes into words, fixing up byte order
pub fn parse_spirv(bytes: &[u8]) -> Result<Vec<u32>, String> {
    let words = ash::util::read_spv(&mut Cursor::new(bytes)).map_err(|err| format!("invalid SPIR-V: {}", err))?;
    match words.first() {
        Some(&SPIRV_MAGIC) => Ok(words),
        Some(word) => Err(format!("invalid SPIR-V magic number {:#010x}", word)),
        None => Err("empty SPIR-V module".to_string()),
    }
}

/// Owned `vk::ShaderModule`
pub struct ShaderModule {
    device: ash::Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Create a shader module from SPIR-V bytecode
    pub fn from_bytes(device: &ash::Device, labels: &DebugLabels, bytes: &[u8], name: &str) -> RenderResult<Self> {
        let code = parse_spirv(bytes).map_err(|reason| RenderError::init(format!("{}: {}", name, reason)))?;

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&code);
        let module = unsafe { device.create_shader_module(&create_info, None) }
            .map_err(|result| RenderError::init(format!("{}: shader module creation failed: {:?}", name, result)))?;
        labels.name_object(module, name);

        log::debug!("Created shader module {} ({} words)", name, code.len());
        Ok(Self {
            device: device.clone(),
            module,
        })
    }

    /// Load a shader module from a `.spv` file
    pub fn from_file(
        device: &ash::Device,
        labels: &DebugLabels,
        path: impl AsRef<Path>,
        name: &str,
    ) -> RenderResult<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|err| RenderError::init(format!("failed to read shader {}: {}", path.display(), err)))?;
        Self::from_bytes(device, labels, &bytes, name)
    }

    /// Raw handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    fn stage_info(&self, stage: vk::ShaderStageFlags) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .stage(stage)
            .module(self.module)
            .name(entry_point())
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe { self.device.destroy_shader_module(self.module, None) };
    }
}

/// Graphics pipeline drawing into the swapchain's render pass
///
/// No vertex input; the vertex shader generates its own positions.
/// Viewport and scissor are dynamic, so only a new render pass requires a
/// new pipeline.
pub struct GraphicsPipeline {
    device: ash::Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Build a pipeline for subpass 0 of `render_pass`
    pub fn new(
        device: &ash::Device,
        labels: &DebugLabels,
        render_pass: vk::RenderPass,
        vertex_shader: &ShaderModule,
        fragment_shader: &ShaderModule,
        name: &str,
    ) -> Result<Self, vk::Result> {
        let shader_stages = [
            vertex_shader.stage_info(vk::ShaderStageFlags::VERTEX),
            fragment_shader.stage_info(vk::ShaderStageFlags::FRAGMENT),
        ];

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let vertex_input = vk::PipelineVertexInputStateCreateInfo::builder();
        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(vk::CullModeFlags::BACK)
            .front_face(vk::FrontFace::CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1)
            .min_sample_shading(1.0);

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(true)
            .src_color_blend_factor(vk::BlendFactor::SRC_ALPHA)
            .dst_color_blend_factor(vk::BlendFactor::ONE_MINUS_SRC_ALPHA)
            .color_blend_op(vk::BlendOp::ADD)
            .src_alpha_blend_factor(vk::BlendFactor::ONE)
            .dst_alpha_blend_factor(vk::BlendFactor::ZERO)
            .alpha_blend_op(vk::BlendOp::ADD)
            .build()];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .logic_op(vk::LogicOp::COPY)
            .attachments(&color_blend_attachments);

        let layout_info = vk::PipelineLayoutCreateInfo::builder();
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None) }?;
        labels.name_object(layout, &format!("{} Layout", name));

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0)
            .base_pipeline_index(-1);

        let created = unsafe { device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None) };
        let pipeline = match created.map(|pipelines| pipelines.into_iter().next()) {
            Ok(Some(pipeline)) => pipeline,
            Ok(None) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(vk::Result::ERROR_UNKNOWN);
            }
            Err((_, result)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(result);
            }
        };
        labels.name_object(pipeline, name);

        log::debug!("Created graphics pipeline {} for render pass {:?}", name, render_pass);
        Ok(Self {
            device: device.clone(),
            pipeline,
            layout,
        })
    }

    /// Raw pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Pipeline layout
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
        log::debug!("Destroyed graphics pipeline {:?}", self.pipeline);
    }
}
