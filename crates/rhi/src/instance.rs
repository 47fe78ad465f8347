//! Vulkan instance management.
//!
//! Handles `VkInstance` creation, the surface extensions required by the
//! window system, the optional Khronos validation layer and the debug
//! messenger that forwards validation output into `tracing`.
//!
//! # Example
//!
//! ```no_run
//! use viewer_rhi::instance::Instance;
//!
//! # fn example() -> Result<(), viewer_rhi::RhiError> {
//! // Headless instance (no surface extensions), validation in debug builds.
//! let instance = Instance::new(cfg!(debug_assertions), None)?;
//! let _entry = instance.entry();
//! # Ok(())
//! # }
//! ```

use std::ffi::CStr;

use ash::{Entry, vk};
use raw_window_handle::RawDisplayHandle;
use tracing::{Level, debug, error, info, warn};

use crate::error::{RhiError, RhiResult};

const VALIDATION_LAYER_NAME: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Vulkan instance with optional validation support.
///
/// Dropping the instance destroys the debug messenger first, then the
/// instance itself. Every object created from it (surface, device) must be
/// gone by then.
pub struct Instance {
    entry: Entry,
    instance: ash::Instance,
    debug_utils: Option<ash::ext::debug_utils::Instance>,
    debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
}

impl Instance {
    /// Creates a new Vulkan instance.
    ///
    /// # Arguments
    ///
    /// * `enable_validation` - Request `VK_LAYER_KHRONOS_validation`. When the
    ///   layer is not installed a warning is logged and creation continues.
    /// * `display_handle` - Display the instance will present to. Its
    ///   surface extensions are enabled; `None` creates a headless instance.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the Vulkan loader cannot be found
    /// - the window system's surface extensions cannot be enumerated
    /// - instance or debug messenger creation fails
    pub fn new(
        enable_validation: bool,
        display_handle: Option<RawDisplayHandle>,
    ) -> RhiResult<Self> {
        let entry = unsafe { Entry::load()? };

        let validation_available =
            enable_validation && Self::is_validation_layer_available(&entry)?;
        if enable_validation && !validation_available {
            warn!("Validation layer requested but not available, proceeding without it");
        }

        let app_info = vk::ApplicationInfo::default()
            .application_name(c"Vulkan Viewer")
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"No Engine")
            .engine_version(vk::make_api_version(0, 1, 0, 0))
            .api_version(vk::API_VERSION_1_1);

        let mut extensions = match display_handle {
            Some(handle) => ash_window::enumerate_required_extensions(handle)?.to_vec(),
            None => Vec::new(),
        };
        if validation_available {
            extensions.push(ash::ext::debug_utils::NAME.as_ptr());
        }

        let layers = if validation_available {
            vec![VALIDATION_LAYER_NAME.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&extensions)
            .enabled_layer_names(&layers);

        let instance = unsafe { entry.create_instance(&create_info, None)? };

        info!(
            "Vulkan instance created ({} extensions, validation: {})",
            extensions.len(),
            validation_available
        );

        let (debug_utils, debug_messenger) = if validation_available {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            match Self::setup_debug_messenger(&debug_utils) {
                Ok(messenger) => (Some(debug_utils), Some(messenger)),
                Err(e) => {
                    unsafe { instance.destroy_instance(None) };
                    return Err(e);
                }
            }
        } else {
            (None, None)
        };

        Ok(Self {
            entry,
            instance,
            debug_utils,
            debug_messenger,
        })
    }

    #[inline]
    pub fn handle(&self) -> &ash::Instance {
        &self.instance
    }

    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Returns whether the debug messenger is active.
    #[inline]
    pub fn has_validation(&self) -> bool {
        self.debug_messenger.is_some()
    }

    fn is_validation_layer_available(entry: &Entry) -> RhiResult<bool> {
        let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };

        Ok(available_layers.iter().any(|layer| {
            layer
                .layer_name_as_c_str()
                .is_ok_and(|name| name == VALIDATION_LAYER_NAME)
        }))
    }

    fn setup_debug_messenger(
        debug_utils: &ash::ext::debug_utils::Instance,
    ) -> RhiResult<vk::DebugUtilsMessengerEXT> {
        let create_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
            .message_severity(
                vk::DebugUtilsMessageSeverityFlagsEXT::INFO
                    | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                    | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            )
            .message_type(
                vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                    | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                    | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            )
            .pfn_user_callback(Some(debug_callback));

        let messenger = unsafe { debug_utils.create_debug_utils_messenger(&create_info, None)? };
        debug!("Debug messenger created");

        Ok(messenger)
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        unsafe {
            if let (Some(debug_utils), Some(messenger)) = (&self.debug_utils, self.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }
            self.instance.destroy_instance(None);
        }
        info!("Vulkan instance destroyed");
    }
}

/// Maps a validation message severity onto a tracing level.
fn severity_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Level {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        Level::ERROR
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        Level::WARN
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        Level::DEBUG
    } else {
        Level::TRACE
    }
}

/// Validation layer callback; forwards every message to `tracing`.
///
/// # Safety
///
/// Called by the Vulkan loader with a valid (or null) callback data pointer.
unsafe extern "system" fn debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::ffi::c_void,
) -> vk::Bool32 {
    if p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = unsafe { &*p_callback_data };
    let message = if callback_data.p_message.is_null() {
        std::borrow::Cow::Borrowed("(no message)")
    } else {
        unsafe { CStr::from_ptr(callback_data.p_message).to_string_lossy() }
    };

    let kind = match message_type {
        vk::DebugUtilsMessageTypeFlagsEXT::GENERAL => "General",
        vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION => "Validation",
        vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE => "Performance",
        _ => "Unknown",
    };

    match severity_level(message_severity) {
        Level::ERROR => error!("[Vulkan {}] {}", kind, message),
        Level::WARN => warn!("[Vulkan {}] {}", kind, message),
        Level::DEBUG => debug!("[Vulkan {}] {}", kind, message),
        _ => tracing::trace!("[Vulkan {}] {}", kind, message),
    }

    vk::FALSE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_instance_creation() {
        match Instance::new(false, None) {
            Ok(instance) => assert!(!instance.has_validation()),
            Err(RhiError::Loading(_)) => {
                eprintln!("Skipping test: Vulkan not available");
            }
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    #[test]
    fn test_severity_level_mapping() {
        use vk::DebugUtilsMessageSeverityFlagsEXT as Severity;

        assert_eq!(severity_level(Severity::ERROR), Level::ERROR);
        assert_eq!(severity_level(Severity::WARNING), Level::WARN);
        assert_eq!(severity_level(Severity::INFO), Level::DEBUG);
        assert_eq!(severity_level(Severity::VERBOSE), Level::TRACE);
    }
}
