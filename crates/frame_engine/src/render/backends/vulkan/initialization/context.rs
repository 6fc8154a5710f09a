//! Vulkan context management
//!
//! Instance, surface, physical and logical device, and the graphics command
//! pool. Each piece is an owning wrapper; a failure part-way through
//! [`VulkanContext::new`] drops whatever was already built.

use std::collections::BTreeSet;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use ash::extensions::ext::DebugUtils;
use ash::extensions::khr::Swapchain as SwapchainLoader;
use ash::{vk, Device, Entry, Instance};

use super::debug;
use super::surface::Surface;
use crate::core::RendererConfig;
use crate::render::api::QueueFamilies;
use crate::render::backends::vulkan::query_list;
use crate::render::error::{FramePhase, RenderError, RenderResult};
use crate::render::window::GlfwWindow;

fn validation_layer() -> &'static CStr {
    unsafe { CStr::from_bytes_with_nul_unchecked(b"VK_LAYER_KHRONOS_validation\0") }
}

fn engine_name() -> &'static CStr {
    unsafe { CStr::from_bytes_with_nul_unchecked(b"FrameEngine\0") }
}

/// Score bonus for discrete GPUs during device selection
const DISCRETE_GPU_BONUS: u32 = 1000;

fn api_error(what: &'static str) -> impl Fn(vk::Result) -> RenderError {
    move |result| {
        RenderError::classify(FramePhase::Initialization, result, |result| {
            RenderError::init(format!("{}: {:?}", what, result))
        })
    }
}

/// Vulkan instance with the optional validation messenger
pub struct VulkanInstance {
    entry: Entry,
    instance: Instance,
    debug_utils: Option<DebugUtils>,
    debug_messenger: vk::DebugUtilsMessengerEXT,
}

impl VulkanInstance {
    /// Create an instance with the extensions GLFW needs
    ///
    /// Validation is enabled when the config asks for it and the layer is
    /// installed; a missing layer only produces a warning.
    pub fn new(window: &GlfwWindow, config: &RendererConfig) -> RenderResult<Self> {
        let entry = unsafe { Entry::load() }
            .map_err(|err| RenderError::init(format!("failed to load Vulkan: {}", err)))?;

        let validation = config.validation_enabled() && Self::has_validation_layer(&entry);

        let app_name = CString::new(config.application_name.as_str())
            .map_err(|_| RenderError::init("application name contains a NUL byte"))?;
        let app_info = vk::ApplicationInfo::builder()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(engine_name())
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_0);

        let window_extensions = window
            .required_instance_extensions()?
            .into_iter()
            .map(CString::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| RenderError::init("window extension name contains a NUL byte"))?;
        let mut extensions: Vec<*const c_char> = window_extensions.iter().map(|name| name.as_ptr()).collect();
        if validation {
            extensions.push(DebugUtils::name().as_ptr());
        }

        let layers: Vec<*const c_char> = if validation {
            vec![validation_layer().as_ptr()]
        } else {
            Vec::new()
        };

        let enabled_features = [vk::ValidationFeatureEnableEXT::SYNCHRONIZATION_VALIDATION];
        let mut validation_features = vk::ValidationFeaturesEXT::builder().enabled_validation_features(&enabled_features);

        let mut create_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);
        if validation {
            create_info = create_info.push_next(&mut validation_features);
        }

        let instance = unsafe { entry.create_instance(&create_info, None) }.map_err(api_error("instance creation failed"))?;

        let (debug_utils, debug_messenger) = if validation {
            let loader = DebugUtils::new(&entry, &instance);
            let messenger_info = debug::messenger_create_info();
            match unsafe { loader.create_debug_utils_messenger(&messenger_info, None) } {
                Ok(messenger) => (Some(loader), messenger),
                Err(result) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(api_error("debug messenger creation failed")(result));
                }
            }
        } else {
            (None, vk::DebugUtilsMessengerEXT::null())
        };

        log::info!(
            "Vulkan instance created (validation {})",
            if validation { "on" } else { "off" }
        );

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    fn has_validation_layer(entry: &Entry) -> bool {
        let layers = unsafe { entry.enumerate_instance_layer_properties() }.unwrap_or_default();
        let found = layers
            .iter()
            .any(|layer| unsafe { CStr::from_ptr(layer.layer_name.as_ptr()) } == validation_layer());
        if !found {
            log::warn!("Validation requested but {:?} is not installed", validation_layer());
        }
        found
    }

    /// Loader entry points
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Instance-level function table
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// Debug-utils loader when validation is on
    pub fn debug_utils(&self) -> Option<&DebugUtils> {
        self.debug_utils.as_ref()
    }
}

impl Drop for VulkanInstance {
    fn drop(&mut self) {
        unsafe {
            if let Some(debug_utils) = &self.debug_utils {
                debug_utils.destroy_debug_utils_messenger(self.debug_messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        log::debug!("Destroyed Vulkan instance");
    }
}

/// A physical device that can render to and present on the window surface
#[derive(Debug, Clone)]
pub struct PhysicalDeviceInfo {
    /// Physical device handle
    pub device: vk::PhysicalDevice,
    /// Properties and limits
    pub properties: vk::PhysicalDeviceProperties,
    /// Graphics and present queue families
    pub families: QueueFamilies,
    /// Suitability score; higher is better
    pub rating: u32,
}

impl PhysicalDeviceInfo {
    /// Pick the highest-rated suitable device
    pub fn select_suitable_device(instance: &Instance, surface: &Surface) -> RenderResult<Self> {
        let devices = unsafe { instance.enumerate_physical_devices() }
            .map_err(api_error("physical device enumeration failed"))?;

        let best = devices
            .into_iter()
            .filter_map(|device| Self::evaluate_device(instance, device, surface))
            .max_by_key(|info| info.rating)
            .ok_or_else(|| RenderError::init("no GPU can present to the window surface"))?;

        log::info!(
            "Selected GPU: {} ({:?}, rating {}, graphics family {}, present family {})",
            best.name(),
            best.properties.device_type,
            best.rating,
            best.families.graphics,
            best.families.present
        );
        Ok(best)
    }

    /// Device name as reported by the driver
    pub fn name(&self) -> String {
        unsafe { CStr::from_ptr(self.properties.device_name.as_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    fn evaluate_device(instance: &Instance, device: vk::PhysicalDevice, surface: &Surface) -> Option<Self> {
        let properties = unsafe { instance.get_physical_device_properties(device) };
        let name = unsafe { CStr::from_ptr(properties.device_name.as_ptr()) }.to_string_lossy();

        let Some(families) = Self::find_queue_families(instance, device, surface) else {
            log::debug!("{}: no graphics or present queue family", name);
            return None;
        };

        if !Self::supports_swapchain(instance, device) {
            log::debug!("{}: VK_KHR_swapchain missing", name);
            return None;
        }

        let fp = surface.loader().fp();
        let formats = unsafe {
            query_list(|count, out| {
                (fp.get_physical_device_surface_formats_khr)(device, surface.handle(), count, out)
            })
        };
        let modes = unsafe {
            query_list(|count, out| {
                (fp.get_physical_device_surface_present_modes_khr)(device, surface.handle(), count, out)
            })
        };
        match (formats, modes) {
            (Ok(formats), Ok(modes)) if !formats.is_empty() && !modes.is_empty() => {}
            _ => {
                log::debug!("{}: surface reports no formats or present modes", name);
                return None;
            }
        }

        let mut rating = properties.limits.max_image_dimension2_d;
        if properties.device_type == vk::PhysicalDeviceType::DISCRETE_GPU {
            rating = rating.saturating_add(DISCRETE_GPU_BONUS);
        }

        Some(Self {
            device,
            properties,
            families,
            rating,
        })
    }

    fn find_queue_families(instance: &Instance, device: vk::PhysicalDevice, surface: &Surface) -> Option<QueueFamilies> {
        let families = unsafe { instance.get_physical_device_queue_family_properties(device) };

        let graphics = families
            .iter()
            .position(|family| family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS))?
            as u32;

        // prefer presenting from the graphics family so images stay exclusive
        let present = if surface.supports_present(device, graphics) {
            graphics
        } else {
            (0..families.len() as u32).find(|&index| surface.supports_present(device, index))?
        };

        Some(QueueFamilies::new(graphics, present))
    }

    fn supports_swapchain(instance: &Instance, device: vk::PhysicalDevice) -> bool {
        let enumerate = instance.fp_v1_0().enumerate_device_extension_properties;
        let extensions = unsafe { query_list(|count, out| enumerate(device, std::ptr::null(), count, out)) };

        extensions.map_or(false, |extensions| {
            extensions
                .iter()
                .any(|ext| unsafe { CStr::from_ptr(ext.extension_name.as_ptr()) } == SwapchainLoader::name())
        })
    }
}

/// Logical device with its graphics and present queues
pub struct LogicalDevice {
    device: Device,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    families: QueueFamilies,
    swapchain_loader: SwapchainLoader,
}

impl LogicalDevice {
    /// Create the device with one queue per unique family and `VK_KHR_swapchain`
    pub fn new(instance: &Instance, physical: &PhysicalDeviceInfo) -> RenderResult<Self> {
        let families = physical.families;
        let unique: BTreeSet<u32> = [families.graphics, families.present].into_iter().collect();

        let priorities = [1.0f32];
        let queue_infos: Vec<vk::DeviceQueueCreateInfo> = unique
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::builder()
                    .queue_family_index(family)
                    .queue_priorities(&priorities)
                    .build()
            })
            .collect();

        let extensions = [SwapchainLoader::name().as_ptr()];
        let features = vk::PhysicalDeviceFeatures::default();

        let create_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_infos)
            .enabled_extension_names(&extensions)
            .enabled_features(&features);

        let device = unsafe { instance.create_device(physical.device, &create_info, None) }
            .map_err(api_error("logical device creation failed"))?;

        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };
        let swapchain_loader = SwapchainLoader::new(instance, &device);

        log::debug!("Created logical device with {} queue(s)", queue_infos.len());

        Ok(Self {
            device,
            graphics_queue,
            present_queue,
            families,
            swapchain_loader,
        })
    }

    /// Device-level function table
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Queue graphics work is submitted to
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Queue images are presented from
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Graphics and present families
    pub fn families(&self) -> QueueFamilies {
        self.families
    }

    /// `VK_KHR_swapchain` entry points
    pub fn swapchain_loader(&self) -> &SwapchainLoader {
        &self.swapchain_loader
    }
}

impl Drop for LogicalDevice {
    fn drop(&mut self) {
        unsafe {
            if let Err(result) = self.device.device_wait_idle() {
                log::warn!("Device idle wait before destruction failed: {:?}", result);
            }
            self.device.destroy_device(None);
        }
        log::debug!("Destroyed logical device");
    }
}

/// Everything the presentation device needs from Vulkan
///
/// Fields drop in declaration order after [`Drop::drop`] released the pool:
/// device, then surface, then messenger and instance.
pub struct VulkanContext {
    command_pool: vk::CommandPool,
    physical_device: PhysicalDeviceInfo,
    device: LogicalDevice,
    surface: Surface,
    instance: VulkanInstance,
}

impl VulkanContext {
    /// Bring up Vulkan for `window`
    pub fn new(window: &GlfwWindow, config: &RendererConfig) -> RenderResult<Self> {
        let instance = VulkanInstance::new(window, config)?;
        let surface = Surface::new(instance.entry(), instance.instance(), window)?;
        let physical_device = PhysicalDeviceInfo::select_suitable_device(instance.instance(), &surface)?;
        let device = LogicalDevice::new(instance.instance(), &physical_device)?;

        let pool_info = vk::CommandPoolCreateInfo::builder()
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER)
            .queue_family_index(physical_device.families.graphics);
        let command_pool = unsafe { device.device().create_command_pool(&pool_info, None) }
            .map_err(api_error("command pool creation failed"))?;

        Ok(Self {
            command_pool,
            physical_device,
            device,
            surface,
            instance,
        })
    }

    /// Loader entry points
    pub fn entry(&self) -> &Entry {
        self.instance.entry()
    }

    /// Instance-level function table
    pub fn instance(&self) -> &Instance {
        self.instance.instance()
    }

    /// Debug-utils loader when validation is on
    pub fn debug_utils(&self) -> Option<&DebugUtils> {
        self.instance.debug_utils()
    }

    /// Window surface
    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    /// Selected physical device
    pub fn physical_device(&self) -> &PhysicalDeviceInfo {
        &self.physical_device
    }

    /// Logical device and queues
    pub fn device(&self) -> &LogicalDevice {
        &self.device
    }

    /// Pool command buffers are allocated from
    pub fn command_pool(&self) -> vk::CommandPool {
        self.command_pool
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            if let Err(result) = self.device.device().device_wait_idle() {
                log::warn!("Device idle wait during context teardown failed: {:?}", result);
            }
            self.device.device().destroy_command_pool(self.command_pool, None);
        }
    }
}
