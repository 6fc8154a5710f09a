//! Validation messages and debug labels
//!
//! The messenger forwards validation-layer output into `log`. [`DebugLabels`]
//! names objects and brackets queue and command-buffer work so captures in
//! RenderDoc and friends are readable. Without the debug-utils extension every
//! call is a no-op.

use std::ffi::{CStr, CString};

use ash::extensions::ext::DebugUtils;
use ash::vk::{self, Handle};

const QUEUE_LABEL_COLOR: [f32; 4] = [0.4, 0.6, 1.0, 1.0];
const COMMAND_LABEL_COLOR: [f32; 4] = [1.0, 0.8, 0.2, 1.0];

/// Messenger create info routing every severity to [`debug_callback`]
pub fn messenger_create_info() -> vk::DebugUtilsMessengerCreateInfoEXT {
    vk::DebugUtilsMessengerCreateInfoEXT::builder()
        .message_severity(
            vk::DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(debug_callback))
        .build()
}

/// Validation-layer callback
pub unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if callback_data.is_null() || (*callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*callback_data).p_message).to_string_lossy();

    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        log::error!("[Vulkan] {:?} - {}", message_type, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        log::warn!("[Vulkan] {:?} - {}", message_type, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        log::debug!("[Vulkan] {:?} - {}", message_type, message);
    } else {
        log::trace!("[Vulkan] {:?} - {}", message_type, message);
    }

    vk::FALSE
}

/// Object names and queue/command labels through `VK_EXT_debug_utils`
#[derive(Clone)]
pub struct DebugLabels {
    loader: Option<DebugUtils>,
    device: vk::Device,
}

impl DebugLabels {
    /// Labels backed by `loader`, or no-ops when it is `None`
    pub fn new(loader: Option<DebugUtils>, device: vk::Device) -> Self {
        Self { loader, device }
    }

    /// Labels that do nothing
    pub fn disabled() -> Self {
        Self {
            loader: None,
            device: vk::Device::null(),
        }
    }

    /// Whether labels reach the driver
    pub fn is_enabled(&self) -> bool {
        self.loader.is_some()
    }

    /// Attach a debug name to a Vulkan object
    pub fn name_object<H: Handle>(&self, handle: H, name: &str) {
        let Some(loader) = &self.loader else { return };
        let Ok(name) = CString::new(name) else { return };

        let info = vk::DebugUtilsObjectNameInfoEXT::builder()
            .object_type(H::TYPE)
            .object_handle(handle.as_raw())
            .object_name(&name);
        if let Err(result) = unsafe { loader.set_debug_utils_object_name(self.device, &*info) } {
            log::debug!("Failed to name object {:?}: {:?}", name, result);
        }
    }

    /// Open a labeled region on a queue
    pub fn begin_queue_label(&self, queue: vk::Queue, name: &str) {
        self.with_label(name, QUEUE_LABEL_COLOR, |loader, label| unsafe {
            loader.queue_begin_debug_utils_label(queue, label)
        });
    }

    /// Mark a single point on a queue
    pub fn insert_queue_label(&self, queue: vk::Queue, name: &str) {
        self.with_label(name, QUEUE_LABEL_COLOR, |loader, label| unsafe {
            loader.queue_insert_debug_utils_label(queue, label)
        });
    }

    /// Close the innermost labeled region on a queue
    pub fn end_queue_label(&self, queue: vk::Queue) {
        if let Some(loader) = &self.loader {
            unsafe { loader.queue_end_debug_utils_label(queue) };
        }
    }

    /// Open a labeled region in a command buffer
    pub fn begin_command_label(&self, command_buffer: vk::CommandBuffer, name: &str) {
        self.with_label(name, COMMAND_LABEL_COLOR, |loader, label| unsafe {
            loader.cmd_begin_debug_utils_label(command_buffer, label)
        });
    }

    /// Mark a single point in a command buffer
    pub fn insert_command_label(&self, command_buffer: vk::CommandBuffer, name: &str) {
        self.with_label(name, COMMAND_LABEL_COLOR, |loader, label| unsafe {
            loader.cmd_insert_debug_utils_label(command_buffer, label)
        });
    }

    /// Close the innermost labeled region in a command buffer
    pub fn end_command_label(&self, command_buffer: vk::CommandBuffer) {
        if let Some(loader) = &self.loader {
            unsafe { loader.cmd_end_debug_utils_label(command_buffer) };
        }
    }

    fn with_label<F>(&self, name: &str, color: [f32; 4], emit: F)
    where
        F: FnOnce(&DebugUtils, &vk::DebugUtilsLabelEXT),
    {
        let Some(loader) = &self.loader else { return };
        let Ok(name) = CString::new(name) else { return };

        let label = vk::DebugUtilsLabelEXT::builder().label_name(&name).color(color);
        emit(loader, &*label);
    }
}
