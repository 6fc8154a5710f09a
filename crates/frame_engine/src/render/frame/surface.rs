//! Presentation surface descriptor
//!
//! Snapshot of what the surface accepts right now, plus the selection rules
//! that turn it into a swapchain configuration. Queried again before every
//! swapchain build since any of it may change with the window.

use ash::vk;

use crate::render::api::{PresentationDevice, QueueFamilies, SwapchainDesc};
use crate::render::error::{FramePhase, RenderError, RenderResult};

/// `current_extent.width` value meaning "the swapchain decides the size"
pub const EXTENT_FROM_WINDOW: u32 = u32::MAX;

/// Preferred surface format
pub const PREFERRED_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_SRGB,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// What a surface supports, as reported by the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceCapabilities {
    min_image_count: u32,
    max_image_count: u32,
    current_extent: vk::Extent2D,
    min_extent: vk::Extent2D,
    max_extent: vk::Extent2D,
    current_transform: vk::SurfaceTransformFlagsKHR,
    formats: Vec<vk::SurfaceFormatKHR>,
    present_modes: Vec<vk::PresentModeKHR>,
}

impl SurfaceCapabilities {
    /// Query the surface through `device`
    ///
    /// Fails with `UnsupportedSurface` when the device lists no formats or no
    /// present modes.
    pub fn query<D: PresentationDevice>(device: &D) -> RenderResult<Self> {
        let query_failed = |what: &'static str| {
            move |result: vk::Result| {
                RenderError::classify(FramePhase::Recreate, result, |result| {
                    RenderError::creation(format!("surface {} query failed", what), result)
                })
            }
        };

        let capabilities = device.surface_capabilities().map_err(query_failed("capabilities"))?;
        let formats = device.surface_formats().map_err(query_failed("format"))?;
        let present_modes = device.surface_present_modes().map_err(query_failed("present mode"))?;

        Self::new(&capabilities, formats, present_modes)
    }

    /// Build a snapshot from raw query results
    pub fn new(
        capabilities: &vk::SurfaceCapabilitiesKHR,
        formats: Vec<vk::SurfaceFormatKHR>,
        present_modes: Vec<vk::PresentModeKHR>,
    ) -> RenderResult<Self> {
        if formats.is_empty() {
            return Err(RenderError::UnsupportedSurface {
                reason: "no surface formats reported".to_string(),
            });
        }
        if present_modes.is_empty() {
            return Err(RenderError::UnsupportedSurface {
                reason: "no present modes reported".to_string(),
            });
        }

        Ok(Self {
            min_image_count: capabilities.min_image_count,
            max_image_count: capabilities.max_image_count,
            current_extent: capabilities.current_extent,
            min_extent: capabilities.min_image_extent,
            max_extent: capabilities.max_image_extent,
            current_transform: capabilities.current_transform,
            formats,
            present_modes,
        })
    }

    /// Smallest image count the surface accepts
    pub fn min_image_count(&self) -> u32 {
        self.min_image_count
    }

    /// Largest image count the surface accepts; 0 means no limit
    pub fn max_image_count(&self) -> u32 {
        self.max_image_count
    }

    /// Extent the surface currently has
    pub fn current_extent(&self) -> vk::Extent2D {
        self.current_extent
    }

    /// Transform to present with
    pub fn current_transform(&self) -> vk::SurfaceTransformFlagsKHR {
        self.current_transform
    }

    /// Supported formats in device order
    pub fn formats(&self) -> &[vk::SurfaceFormatKHR] {
        &self.formats
    }

    /// Supported present modes in device order
    pub fn present_modes(&self) -> &[vk::PresentModeKHR] {
        &self.present_modes
    }

    /// sRGB BGRA when available, else the first listed format
    pub fn choose_format(&self) -> vk::SurfaceFormatKHR {
        self.formats
            .iter()
            .copied()
            .find(|format| *format == PREFERRED_FORMAT)
            .unwrap_or(self.formats[0])
    }

    /// Mailbox when available, else FIFO
    pub fn choose_present_mode(&self) -> vk::PresentModeKHR {
        self.present_modes
            .iter()
            .copied()
            .find(|&mode| mode == vk::PresentModeKHR::MAILBOX)
            .unwrap_or(vk::PresentModeKHR::FIFO)
    }

    /// Surface extent, or the window size clamped into the supported range
    pub fn choose_extent(&self, window_size: (u32, u32)) -> vk::Extent2D {
        if self.current_extent.width != EXTENT_FROM_WINDOW {
            return self.current_extent;
        }

        let (width, height) = window_size;
        vk::Extent2D {
            width: width.clamp(self.min_extent.width, self.max_extent.width.max(self.min_extent.width)),
            height: height.clamp(self.min_extent.height, self.max_extent.height.max(self.min_extent.height)),
        }
    }

    /// One more image than the minimum, capped by the maximum when there is one
    pub fn choose_image_count(&self) -> u32 {
        let wanted = self.min_image_count.saturating_add(1);
        if self.max_image_count != 0 {
            wanted.min(self.max_image_count)
        } else {
            wanted
        }
    }

    /// Full swapchain configuration for the given window size and queues
    pub fn swapchain_desc(&self, window_size: (u32, u32), families: QueueFamilies) -> SwapchainDesc {
        SwapchainDesc {
            min_image_count: self.choose_image_count(),
            format: self.choose_format(),
            present_mode: self.choose_present_mode(),
            extent: self.choose_extent(window_size),
            pre_transform: self.current_transform,
            sharing: families.image_sharing(),
        }
    }
}
