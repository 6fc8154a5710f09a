//! Device seam used by the frame subsystem
//!
//! The frame ring, swapchain and orchestrator only talk to the GPU through
//! [`PresentationDevice`]. Results are raw driver codes so that the callers,
//! not the device, decide what is stale and what is fatal.

use ash::vk;

/// Result of a single driver call
pub type DeviceResult<T> = Result<T, vk::Result>;

/// Queue families chosen during device setup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueFamilies {
    /// Family the graphics queue belongs to
    pub graphics: u32,
    /// Family the presentation queue belongs to
    pub present: u32,
}

impl QueueFamilies {
    /// Create a family pair
    pub fn new(graphics: u32, present: u32) -> Self {
        Self { graphics, present }
    }

    /// Whether graphics and presentation share one family
    pub fn is_unified(&self) -> bool {
        self.graphics == self.present
    }

    /// Sharing mode swapchain images need for this family pair
    pub fn image_sharing(&self) -> ImageSharing {
        if self.is_unified() {
            ImageSharing::Exclusive
        } else {
            ImageSharing::Concurrent([self.graphics, self.present])
        }
    }
}

/// How swapchain images are shared between queue families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSharing {
    /// Owned by a single family; no family list is passed to the driver
    Exclusive,
    /// Accessible from both listed families without ownership transfers
    Concurrent([u32; 2]),
}

impl ImageSharing {
    /// Vulkan sharing mode
    pub fn mode(&self) -> vk::SharingMode {
        match self {
            ImageSharing::Exclusive => vk::SharingMode::EXCLUSIVE,
            ImageSharing::Concurrent(_) => vk::SharingMode::CONCURRENT,
        }
    }

    /// Queue family indices to hand to the driver (empty when exclusive)
    pub fn family_indices(&self) -> &[u32] {
        match self {
            ImageSharing::Exclusive => &[],
            ImageSharing::Concurrent(families) => families,
        }
    }
}

/// Parameters for one swapchain creation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainDesc {
    /// Minimum number of images requested from the presentation engine
    pub min_image_count: u32,
    /// Pixel format and color space of every image
    pub format: vk::SurfaceFormatKHR,
    /// Presentation mode
    pub present_mode: vk::PresentModeKHR,
    /// Image extent
    pub extent: vk::Extent2D,
    /// Surface transform reported by the capabilities query
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    /// Queue family sharing
    pub sharing: ImageSharing,
}

/// One graphics-queue submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitDesc {
    /// Command buffer to execute
    pub command_buffer: vk::CommandBuffer,
    /// Semaphore the submission waits on
    pub wait_semaphore: vk::Semaphore,
    /// Pipeline stage at which the wait applies
    pub wait_stage: vk::PipelineStageFlags,
    /// Semaphore signaled when the commands complete
    pub signal_semaphore: vk::Semaphore,
    /// Fence signaled when the commands complete
    pub fence: vk::Fence,
}

/// One presentation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresentDesc {
    /// Swapchain owning the image
    pub swapchain: vk::SwapchainKHR,
    /// Index of the image within the swapchain
    pub image_index: u32,
    /// Semaphore presentation waits on
    pub wait_semaphore: vk::Semaphore,
}

/// Narrow view of a logical device, its queues and its surface
///
/// Creation calls take a debug label that implementations may attach to the
/// object; it has no semantic effect.
pub trait PresentationDevice {
    /// Queue family relationship established at device creation
    fn queue_families(&self) -> QueueFamilies;

    /// Surface capabilities for the current window state
    fn surface_capabilities(&self) -> DeviceResult<vk::SurfaceCapabilitiesKHR>;

    /// Supported surface formats, in driver order
    fn surface_formats(&self) -> DeviceResult<Vec<vk::SurfaceFormatKHR>>;

    /// Supported present modes, in driver order
    fn surface_present_modes(&self) -> DeviceResult<Vec<vk::PresentModeKHR>>;

    /// Create a swapchain
    fn create_swapchain(&self, desc: &SwapchainDesc, label: &str) -> DeviceResult<vk::SwapchainKHR>;

    /// Images owned by a swapchain, in presentation-engine order
    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> DeviceResult<Vec<vk::Image>>;

    /// Destroy a swapchain
    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR);

    /// Create a 2D color view of a swapchain image
    fn create_image_view(&self, image: vk::Image, format: vk::Format, label: &str) -> DeviceResult<vk::ImageView>;

    /// Destroy an image view
    fn destroy_image_view(&self, view: vk::ImageView);

    /// Create the single-subpass color render pass for a format
    fn create_render_pass(&self, format: vk::Format, label: &str) -> DeviceResult<vk::RenderPass>;

    /// Destroy a render pass
    fn destroy_render_pass(&self, render_pass: vk::RenderPass);

    /// Create a framebuffer binding one view to a render pass
    fn create_framebuffer(
        &self,
        render_pass: vk::RenderPass,
        view: vk::ImageView,
        extent: vk::Extent2D,
        label: &str,
    ) -> DeviceResult<vk::Framebuffer>;

    /// Destroy a framebuffer
    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer);

    /// Create a fence, optionally already signaled
    fn create_fence(&self, signaled: bool, label: &str) -> DeviceResult<vk::Fence>;

    /// Destroy a fence
    fn destroy_fence(&self, fence: vk::Fence);

    /// Create a binary semaphore
    fn create_semaphore(&self, label: &str) -> DeviceResult<vk::Semaphore>;

    /// Destroy a semaphore
    fn destroy_semaphore(&self, semaphore: vk::Semaphore);

    /// Allocate primary command buffers from the graphics pool
    fn allocate_command_buffers(&self, count: u32, label: &str) -> DeviceResult<Vec<vk::CommandBuffer>>;

    /// Return command buffers to the graphics pool
    fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]);

    /// Block until a fence is signaled or the timeout expires
    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> DeviceResult<()>;

    /// Return a fence to the unsignaled state
    fn reset_fence(&self, fence: vk::Fence) -> DeviceResult<()>;

    /// Reset a command buffer so it can be recorded again
    fn reset_command_buffer(&self, command_buffer: vk::CommandBuffer) -> DeviceResult<()>;

    /// Acquire the next image; `Ok((index, suboptimal))`
    fn acquire_next_image(&self, swapchain: vk::SwapchainKHR, signal: vk::Semaphore) -> DeviceResult<(u32, bool)>;

    /// Submit one command buffer to the graphics queue
    fn submit(&self, desc: &SubmitDesc) -> DeviceResult<()>;

    /// Queue an image for presentation; `Ok(suboptimal)`
    fn present(&self, desc: &PresentDesc) -> DeviceResult<bool>;

    /// Block until all queues are idle
    fn wait_idle(&self) -> DeviceResult<()>;
}
