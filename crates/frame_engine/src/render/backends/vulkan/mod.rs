//! Vulkan backend
//!
//! Instance and device bootstrap, the ash implementation of
//! [`PresentationDevice`](crate::render::api::PresentationDevice), and
//! command recorders that clear the image or draw a triangle.

/// Instance, physical/logical device and debug-utils setup
pub mod initialization;

/// `PresentationDevice` over a live Vulkan context
pub mod device;

/// Command recorders
pub mod rendering;

pub use device::VulkanDevice;
pub use initialization::context::{LogicalDevice, PhysicalDeviceInfo, VulkanContext, VulkanInstance};
pub use initialization::debug::DebugLabels;
pub use rendering::{ClearPassRecorder, TrianglePassRecorder};

use ash::vk;

use crate::render::api::DeviceResult;

/// Run a Vulkan "count, then fill" enumeration and return the items in order
///
/// `fill` is called with a null pointer to read the count and then with a
/// buffer of that capacity. A fill that reports `INCOMPLETE` (the list grew in
/// between) starts over.
///
/// # Safety
///
/// `fill` must behave like a Vulkan enumeration entry point: when given a
/// non-null pointer it writes at most `*count` elements and updates `*count`
/// to the number written.
pub(crate) unsafe fn query_list<T, F>(mut fill: F) -> DeviceResult<Vec<T>>
where
    F: FnMut(&mut u32, *mut T) -> vk::Result,
{
    loop {
        let mut count = 0u32;
        fill(&mut count, std::ptr::null_mut()).result()?;

        let mut items: Vec<T> = Vec::with_capacity(count as usize);
        let result = fill(&mut count, items.as_mut_ptr());
        if result == vk::Result::INCOMPLETE {
            continue;
        }
        result.result()?;
        items.set_len(count as usize);
        return Ok(items);
    }
}
