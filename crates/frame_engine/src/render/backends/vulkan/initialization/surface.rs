//! Window surface ownership

use ash::extensions::khr;
use ash::vk;

use crate::render::error::RenderResult;
use crate::render::window::GlfwWindow;

/// A `VkSurfaceKHR` together with the loader that destroys it
pub struct Surface {
    loader: khr::Surface,
    handle: vk::SurfaceKHR,
}

impl Surface {
    /// Create the surface for `window` through GLFW
    pub fn new(entry: &ash::Entry, instance: &ash::Instance, window: &GlfwWindow) -> RenderResult<Self> {
        let loader = khr::Surface::new(entry, instance);
        let handle = window.create_vulkan_surface(instance.handle())?;
        log::debug!("Created window surface");
        Ok(Self { loader, handle })
    }

    /// Raw surface handle
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// `VK_KHR_surface` entry points
    pub fn loader(&self) -> &khr::Surface {
        &self.loader
    }

    /// Whether `queue_family` of `physical_device` can present to this surface
    pub fn supports_present(&self, physical_device: vk::PhysicalDevice, queue_family: u32) -> bool {
        unsafe {
            self.loader
                .get_physical_device_surface_support(physical_device, queue_family, self.handle)
                .unwrap_or(false)
        }
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe {
            self.loader.destroy_surface(self.handle, None);
        }
        log::debug!("Destroyed window surface");
    }
}
