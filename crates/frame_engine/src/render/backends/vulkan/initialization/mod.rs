//! Vulkan bring-up: instance, surface, devices and debug utilities

pub mod context;
pub mod debug;
pub mod surface;

pub use context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanInstance};
pub use debug::DebugLabels;
pub use surface::Surface;
