//! Swap chain
//!
//! Owns the presentable images together with everything sized by them: one
//! view and one framebuffer per image and the render pass the framebuffers
//! are built against. The whole set is torn down and rebuilt in place when
//! the surface goes stale.

use std::rc::Rc;

use ash::vk;

use crate::render::api::{PresentationDevice, QueueFamilies, RenderTarget, SwapchainDesc};
use crate::render::error::{FramePhase, RenderError, RenderResult};
use crate::render::frame::surface::SurfaceCapabilities;

/// Presentable images and their per-image render targets
pub struct SwapChain<D: PresentationDevice> {
    device: Rc<D>,
    families: QueueFamilies,
    handle: vk::SwapchainKHR,
    format: vk::SurfaceFormatKHR,
    present_mode: vk::PresentModeKHR,
    extent: vk::Extent2D,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    render_pass: vk::RenderPass,
    framebuffers: Vec<vk::Framebuffer>,
}

fn creation_failed(reason: &'static str) -> impl FnOnce(vk::Result) -> RenderError {
    move |result| RenderError::classify(FramePhase::Recreate, result, |result| RenderError::creation(reason, result))
}

impl<D: PresentationDevice> SwapChain<D> {
    /// Create a swap chain for the given surface snapshot and window size
    ///
    /// Anything created before a failure is destroyed before returning.
    pub fn build(device: Rc<D>, caps: &SurfaceCapabilities, window_size: (u32, u32)) -> RenderResult<Self> {
        let families = device.queue_families();
        let mut chain = Self {
            device,
            families,
            handle: vk::SwapchainKHR::null(),
            format: vk::SurfaceFormatKHR::default(),
            present_mode: vk::PresentModeKHR::FIFO,
            extent: vk::Extent2D::default(),
            images: Vec::new(),
            image_views: Vec::new(),
            render_pass: vk::RenderPass::null(),
            framebuffers: Vec::new(),
        };
        chain.populate(caps, window_size)?;
        Ok(chain)
    }

    /// Tear down and recreate against a fresh surface snapshot, keeping this value
    pub fn rebuild(&mut self, caps: &SurfaceCapabilities, window_size: (u32, u32)) -> RenderResult<()> {
        self.teardown();
        if let Err(err) = self.populate(caps, window_size) {
            self.teardown();
            return Err(err);
        }
        Ok(())
    }

    fn populate(&mut self, caps: &SurfaceCapabilities, window_size: (u32, u32)) -> RenderResult<()> {
        let desc: SwapchainDesc = caps.swapchain_desc(window_size, self.families);
        let device = Rc::clone(&self.device);

        self.format = desc.format;
        self.present_mode = desc.present_mode;
        self.extent = desc.extent;

        self.handle = device
            .create_swapchain(&desc, "Swapchain")
            .map_err(creation_failed("swapchain rejected by driver"))?;

        self.images = device
            .swapchain_images(self.handle)
            .map_err(creation_failed("swapchain image query failed"))?;
        if (self.images.len() as u32) < desc.min_image_count {
            return Err(RenderError::SwapChainCreation {
                reason: format!(
                    "driver returned {} images, {} requested",
                    self.images.len(),
                    desc.min_image_count
                ),
                result: None,
            });
        }

        for (index, &image) in self.images.iter().enumerate() {
            let view = device
                .create_image_view(image, desc.format.format, &format!("Swapchain image view {}", index))
                .map_err(creation_failed("image view creation failed"))?;
            self.image_views.push(view);
        }

        self.render_pass = device
            .create_render_pass(desc.format.format, "Swapchain render pass")
            .map_err(creation_failed("render pass creation failed"))?;

        for (index, &view) in self.image_views.iter().enumerate() {
            let framebuffer = device
                .create_framebuffer(self.render_pass, view, desc.extent, &format!("Swapchain framebuffer {}", index))
                .map_err(creation_failed("framebuffer creation failed"))?;
            self.framebuffers.push(framebuffer);
        }

        log::info!(
            "Swapchain built: {}x{}, {} images, {:?}/{:?}, {:?}, {:?} sharing",
            self.extent.width,
            self.extent.height,
            self.images.len(),
            self.format.format,
            self.format.color_space,
            self.present_mode,
            desc.sharing.mode()
        );
        Ok(())
    }

    /// Destroy views, framebuffers, the render pass and then the swapchain
    ///
    /// The caller must make sure the GPU no longer uses any of them.
    pub fn teardown(&mut self) {
        for view in self.image_views.drain(..) {
            self.device.destroy_image_view(view);
        }
        for framebuffer in self.framebuffers.drain(..) {
            self.device.destroy_framebuffer(framebuffer);
        }
        if self.render_pass != vk::RenderPass::null() {
            self.device.destroy_render_pass(self.render_pass);
            self.render_pass = vk::RenderPass::null();
        }
        if self.handle != vk::SwapchainKHR::null() {
            self.device.destroy_swapchain(self.handle);
            self.handle = vk::SwapchainKHR::null();
            log::debug!("Swapchain destroyed");
        }
        self.images.clear();
    }

    /// Raw swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    /// Image format and color space
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.format
    }

    /// Presentation mode
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    /// Image extent
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    /// Number of presentable images
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Render pass every framebuffer is compatible with
    pub fn render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    /// Render target for an acquired image
    pub fn render_target(&self, image_index: u32) -> Option<RenderTarget> {
        let index = image_index as usize;
        Some(RenderTarget {
            image_index,
            image: *self.images.get(index)?,
            image_view: *self.image_views.get(index)?,
            render_pass: self.render_pass,
            framebuffer: *self.framebuffers.get(index)?,
            extent: self.extent,
            format: self.format.format,
        })
    }
}

impl<D: PresentationDevice> Drop for SwapChain<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}
