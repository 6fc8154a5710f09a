//! Presentation device over a live Vulkan context

use ash::vk;

use super::initialization::{DebugLabels, VulkanContext};
use super::query_list;
use crate::render::api::{DeviceResult, PresentDesc, PresentationDevice, QueueFamilies, SubmitDesc, SwapchainDesc};

/// [`PresentationDevice`] backed by ash
///
/// Every created object gets the label it was created with as its debug name
/// when debug utils are available.
pub struct VulkanDevice {
    labels: DebugLabels,
    context: VulkanContext,
}

impl VulkanDevice {
    /// Wrap a context
    pub fn new(context: VulkanContext) -> Self {
        let labels = DebugLabels::new(context.debug_utils().cloned(), context.device().device().handle());
        Self { labels, context }
    }

    /// Underlying context
    pub fn context(&self) -> &VulkanContext {
        &self.context
    }

    /// Debug names and labels for this device
    pub fn labels(&self) -> &DebugLabels {
        &self.labels
    }

    /// Device-level function table
    pub fn raw(&self) -> &ash::Device {
        self.context.device().device()
    }
}

impl PresentationDevice for VulkanDevice {
    fn queue_families(&self) -> QueueFamilies {
        self.context.device().families()
    }

    fn surface_capabilities(&self) -> DeviceResult<vk::SurfaceCapabilitiesKHR> {
        let surface = self.context.surface();
        unsafe {
            surface
                .loader()
                .get_physical_device_surface_capabilities(self.context.physical_device().device, surface.handle())
        }
    }

    fn surface_formats(&self) -> DeviceResult<Vec<vk::SurfaceFormatKHR>> {
        let surface = self.context.surface();
        let physical = self.context.physical_device().device;
        let fp = surface.loader().fp();
        unsafe {
            query_list(|count, out| (fp.get_physical_device_surface_formats_khr)(physical, surface.handle(), count, out))
        }
    }

    fn surface_present_modes(&self) -> DeviceResult<Vec<vk::PresentModeKHR>> {
        let surface = self.context.surface();
        let physical = self.context.physical_device().device;
        let fp = surface.loader().fp();
        unsafe {
            query_list(|count, out| {
                (fp.get_physical_device_surface_present_modes_khr)(physical, surface.handle(), count, out)
            })
        }
    }

    fn create_swapchain(&self, desc: &SwapchainDesc, label: &str) -> DeviceResult<vk::SwapchainKHR> {
        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(self.context.surface().handle())
            .min_image_count(desc.min_image_count)
            .image_format(desc.format.format)
            .image_color_space(desc.format.color_space)
            .image_extent(desc.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(desc.sharing.mode())
            .queue_family_indices(desc.sharing.family_indices())
            .pre_transform(desc.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(desc.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let swapchain = unsafe { self.context.device().swapchain_loader().create_swapchain(&create_info, None)? };
        self.labels.name_object(swapchain, label);
        Ok(swapchain)
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> DeviceResult<Vec<vk::Image>> {
        let device = self.raw().handle();
        let fp = self.context.device().swapchain_loader().fp();
        let images = unsafe { query_list(|count, out| (fp.get_swapchain_images_khr)(device, swapchain, count, out))? };
        for (index, &image) in images.iter().enumerate() {
            self.labels.name_object(image, &format!("Swapchain image {}", index));
        }
        Ok(images)
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        unsafe { self.context.device().swapchain_loader().destroy_swapchain(swapchain, None) };
    }

    fn create_image_view(&self, image: vk::Image, format: vk::Format, label: &str) -> DeviceResult<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .components(vk::ComponentMapping {
                r: vk::ComponentSwizzle::IDENTITY,
                g: vk::ComponentSwizzle::IDENTITY,
                b: vk::ComponentSwizzle::IDENTITY,
                a: vk::ComponentSwizzle::IDENTITY,
            })
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask: vk::ImageAspectFlags::COLOR,
                base_mip_level: 0,
                level_count: 1,
                base_array_layer: 0,
                layer_count: 1,
            });

        let view = unsafe { self.raw().create_image_view(&create_info, None)? };
        self.labels.name_object(view, label);
        Ok(view)
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        unsafe { self.raw().destroy_image_view(view, None) };
    }

    fn create_render_pass(&self, format: vk::Format, label: &str) -> DeviceResult<vk::RenderPass> {
        let attachments = [vk::AttachmentDescription::builder()
            .format(format)
            .samples(vk::SampleCountFlags::TYPE_1)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::PRESENT_SRC_KHR)
            .build()];

        let color_refs = [vk::AttachmentReference {
            attachment: 0,
            layout: vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        }];

        let subpasses = [vk::SubpassDescription::builder()
            .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
            .color_attachments(&color_refs)
            .build()];

        // the layout transition must wait for the acquire semaphore, which is
        // waited on at COLOR_ATTACHMENT_OUTPUT
        let dependencies = [vk::SubpassDependency::builder()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::empty())
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_access_mask(vk::AccessFlags::COLOR_ATTACHMENT_WRITE)
            .build()];

        let create_info = vk::RenderPassCreateInfo::builder()
            .attachments(&attachments)
            .subpasses(&subpasses)
            .dependencies(&dependencies);

        let render_pass = unsafe { self.raw().create_render_pass(&create_info, None)? };
        self.labels.name_object(render_pass, label);
        Ok(render_pass)
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        unsafe { self.raw().destroy_render_pass(render_pass, None) };
    }

    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
        label: &str,
    ) -> DeviceResult<vk::Framebuffer> {
        let attachments = [view];
        let create_info = vk::FramebufferCreateInfo::builder()
            .render_pass(render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        let framebuffer = unsafe { self.raw().create_framebuffer(&create_info, None)? };
        self.labels.name_object(framebuffer, label);
        Ok(framebuffer)
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        unsafe { self.raw().destroy_framebuffer(framebuffer, None) };
    }

    fn create_fence(&self, signaled: bool, label: &str) -> DeviceResult<vk::Fence> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::builder().flags(flags);

        let fence = unsafe { self.raw().create_fence(&create_info, None)? };
        self.labels.name_object(fence, label);
        Ok(fence)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        unsafe { self.raw().destroy_fence(fence, None) };
    }

    fn create_semaphore(&self, label: &str) -> DeviceResult<vk::Semaphore> {
        let create_info = vk::SemaphoreCreateInfo::builder();
        let semaphore = unsafe { self.raw().create_semaphore(&create_info, None)? };
        self.labels.name_object(semaphore, label);
        Ok(semaphore)
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        unsafe { self.raw().destroy_semaphore(semaphore, None) };
    }

    fn allocate_command_buffers(&self, count: u32, label: &str) -> DeviceResult<Vec<vk::CommandBuffer>> {
        let allocate_info = vk::CommandBufferAllocateInfo::builder()
            .command_pool(self.context.command_pool())
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count);

        let buffers = unsafe { self.raw().allocate_command_buffers(&allocate_info)? };
        if let [single] = buffers.as_slice() {
            self.labels.name_object(*single, label);
        } else {
            for (index, &buffer) in buffers.iter().enumerate() {
                self.labels.name_object(buffer, &format!("{} {}", label, index));
            }
        }
        Ok(buffers)
    }

    fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        unsafe { self.raw().free_command_buffers(self.context.command_pool(), command_buffers) };
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> DeviceResult<()> {
        unsafe { self.raw().wait_for_fences(&[fence], true, timeout_ns) }
    }

    fn reset_fence(&self, fence: vk::Fence) -> DeviceResult<()> {
        unsafe { self.raw().reset_fences(&[fence]) }
    }

    fn reset_command_buffer(&self, command_buffer: vk::CommandBuffer) -> DeviceResult<()> {
        unsafe {
            self.raw()
                .reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())
        }
    }

    fn acquire_next_image(&self, swapchain: vk::SwapchainKHR, signal: vk::Semaphore) -> DeviceResult<(u32, bool)> {
        unsafe {
            self.context
                .device()
                .swapchain_loader()
                .acquire_next_image(swapchain, u64::MAX, signal, vk::Fence::null())
        }
    }

    fn submit(&self, desc: &SubmitDesc) -> DeviceResult<()> {
        let wait_semaphores = [desc.wait_semaphore];
        let wait_stages = [desc.wait_stage];
        let command_buffers = [desc.command_buffer];
        let signal_semaphores = [desc.signal_semaphore];

        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();

        let queue = self.context.device().graphics_queue();
        self.labels.begin_queue_label(queue, "GraphicsQueue");
        self.labels.insert_queue_label(queue, "Submit render commands");
        let result = unsafe { self.raw().queue_submit(queue, &[submit_info], desc.fence) };
        self.labels.end_queue_label(queue);
        result
    }

    fn present(&self, desc: &PresentDesc) -> DeviceResult<bool> {
        let wait_semaphores = [desc.wait_semaphore];
        let swapchains = [desc.swapchain];
        let image_indices = [desc.image_index];

        let present_info = vk::PresentInfoKHR::builder()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        let queue = self.context.device().present_queue();
        self.labels.begin_queue_label(queue, "PresentQueue");
        self.labels.insert_queue_label(queue, "Present swap chain image to the surface");
        let result = unsafe { self.context.device().swapchain_loader().queue_present(queue, &present_info) };
        self.labels.end_queue_label(queue);
        result
    }

    fn wait_idle(&self) -> DeviceResult<()> {
        unsafe { self.raw().device_wait_idle() }
    }
}
