//! Validation-layer message routing.

use std::ffi::{c_void, CStr};

use ash::vk;

use crate::error::Result;

/// `VK_EXT_debug_utils` messenger forwarding validation output to `tracing`.
pub struct DebugMessenger {
    loader: ash::ext::debug_utils::Instance,
    messenger: vk::DebugUtilsMessengerEXT,
}

impl DebugMessenger {
    /// Attach a messenger for warnings and errors of every message type.
    ///
    /// # Safety
    /// The instance must have been created with `VK_EXT_debug_utils` enabled.
    pub unsafe fn new(entry: &ash::Entry, instance: &ash::Instance) -> Result<Self> {
        let loader = ash::ext::debug_utils::Instance::new(entry, instance);

        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(vulkan_debug_callback));

        let messenger = unsafe { loader.create_debug_utils_messenger(&create_info, None)? };

        Ok(Self { loader, messenger })
    }

    /// Destroy the messenger.
    ///
    /// # Safety
    /// Must be called before the owning instance is destroyed.
    pub unsafe fn destroy(&self) {
        unsafe {
            self.loader
                .destroy_debug_utils_messenger(self.messenger, None);
        }
    }
}

/// Report a validation message. Never asks the driver to abort the call.
unsafe extern "system" fn vulkan_debug_callback(
    severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT<'_>,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    let message = if callback_data.is_null() || unsafe { (*callback_data).p_message.is_null() } {
        std::borrow::Cow::Borrowed("<no message>")
    } else {
        // SAFETY: the driver passes a NUL-terminated string valid for this call.
        unsafe { CStr::from_ptr((*callback_data).p_message) }.to_string_lossy()
    };

    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        tracing::error!(target: "hearth_gpu::validation", ?message_type, "{message}");
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        tracing::warn!(target: "hearth_gpu::validation", ?message_type, "{message}");
    } else {
        tracing::debug!(target: "hearth_gpu::validation", ?message_type, "{message}");
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_never_aborts() {
        let message = c"validation says hi";
        let data = vk::DebugUtilsMessengerCallbackDataEXT {
            p_message: message.as_ptr(),
            ..Default::default()
        };

        let result = unsafe {
            vulkan_debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
                vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION,
                &data,
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
    }

    #[test]
    fn callback_tolerates_missing_data() {
        let result = unsafe {
            vulkan_debug_callback(
                vk::DebugUtilsMessageSeverityFlagsEXT::WARNING,
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL,
                std::ptr::null(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
    }
}
