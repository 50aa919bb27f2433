//! Vulkan instance creation.

use std::ffi::{c_char, CStr, CString};

use ash::vk;
use raw_window_handle::RawDisplayHandle;

use crate::error::{GpuError, Result};

/// Engine name reported to the driver.
const ENGINE_NAME: &CStr = c"Hearth";

/// Application identity reported in `VkApplicationInfo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppInfo {
    pub name: String,
    pub version: (u32, u32, u32),
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "Hearth".to_string(),
            version: (0, 1, 0),
        }
    }
}

/// Validation layers to enable in debug builds.
pub fn validation_layers() -> Vec<&'static CStr> {
    vec![c"VK_LAYER_KHRONOS_validation"]
}

/// Instance extensions a window surface needs on this platform.
///
/// Always starts with `VK_KHR_surface`, followed by the platform surface
/// extension for `display`.
pub fn surface_extensions(display: RawDisplayHandle) -> Result<Vec<&'static CStr>> {
    let raw = ash_window::enumerate_required_extensions(display)
        .map_err(|e| GpuError::SurfaceUnsupported(format!("unsupported display: {e}")))?;

    let mut extensions = vec![ash::khr::surface::NAME];
    for &ptr in raw {
        // SAFETY: ash-window hands out pointers to static NUL-terminated names.
        let name = unsafe { CStr::from_ptr(ptr) };
        if !extensions.contains(&name) {
            extensions.push(name);
        }
    }
    Ok(extensions)
}

/// Names in `required` that are absent from `available`.
pub fn missing_extensions<'a>(available: &[&CStr], required: &[&'a CStr]) -> Vec<&'a CStr> {
    required
        .iter()
        .copied()
        .filter(|name| !available.contains(name))
        .collect()
}

/// Enumerate the names of all instance extensions the loader exposes.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn available_instance_extensions(entry: &ash::Entry) -> Result<Vec<CString>> {
    let properties = unsafe { entry.enumerate_instance_extension_properties(None)? };
    Ok(properties
        .iter()
        .filter_map(|p| p.extension_name_as_c_str().ok().map(CStr::to_owned))
        .collect())
}

/// Create a Vulkan instance.
///
/// `surface_extensions` must be present in the loader's extension list or
/// the call fails with [`GpuError::SurfaceUnsupported`]. `VK_EXT_debug_utils`
/// is added when `enable_validation` is set and the loader offers it; the
/// returned flag reports whether it was enabled.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
pub unsafe fn create_instance(
    entry: &ash::Entry,
    app: &AppInfo,
    surface_extensions: &[&CStr],
    enable_validation: bool,
) -> Result<(ash::Instance, bool)> {
    let app_name = CString::new(app.name.as_str())
        .map_err(|_| GpuError::InvalidState("application name contains a NUL byte".into()))?;
    let (major, minor, patch) = app.version;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, major, minor, patch))
        .engine_name(ENGINE_NAME)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_0);

    let available = unsafe { available_instance_extensions(entry)? };
    let available: Vec<&CStr> = available.iter().map(CString::as_c_str).collect();

    let missing = missing_extensions(&available, surface_extensions);
    if !missing.is_empty() {
        let names: Vec<_> = missing.iter().map(|n| n.to_string_lossy()).collect();
        return Err(GpuError::SurfaceUnsupported(names.join(", ")));
    }

    let mut extensions: Vec<&CStr> = surface_extensions.to_vec();

    let debug_utils = enable_validation && available.contains(&ash::ext::debug_utils::NAME);
    if enable_validation && !debug_utils {
        tracing::warn!("VK_EXT_debug_utils not available, validation messages disabled");
    }
    if debug_utils {
        extensions.push(ash::ext::debug_utils::NAME);
    }

    let layers = if enable_validation {
        unsafe { available_layers(entry, &validation_layers())? }
    } else {
        vec![]
    };

    let extension_names: Vec<*const c_char> = extensions.iter().map(|e| e.as_ptr()).collect();
    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names);

    let instance = unsafe { entry.create_instance(&create_info, None)? };

    tracing::debug!(
        extensions = ?extensions,
        layers = ?layers,
        "Vulkan instance created"
    );

    Ok((instance, debug_utils))
}

/// Keep only the requested layers the loader actually provides.
unsafe fn available_layers(
    entry: &ash::Entry,
    requested: &[&'static CStr],
) -> Result<Vec<&'static CStr>> {
    let available = unsafe { entry.enumerate_instance_layer_properties()? };

    let mut layers = Vec::with_capacity(requested.len());
    for &layer in requested {
        let found = available
            .iter()
            .any(|props| props.layer_name_as_c_str().ok() == Some(layer));
        if found {
            layers.push(layer);
        } else {
            tracing::warn!("Validation layer {} not available", layer.to_string_lossy());
        }
    }
    Ok(layers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_extensions_reports_only_absent_names() {
        let available = [ash::khr::surface::NAME, ash::ext::debug_utils::NAME];
        let required = [ash::khr::surface::NAME, ash::khr::win32_surface::NAME];

        let missing = missing_extensions(&available, &required);
        assert_eq!(missing, vec![ash::khr::win32_surface::NAME]);
    }

    #[test]
    fn nothing_missing_when_all_present() {
        let available = [ash::khr::surface::NAME, ash::khr::xlib_surface::NAME];
        let required = [ash::khr::xlib_surface::NAME];
        assert!(missing_extensions(&available, &required).is_empty());
    }

    #[test]
    fn default_app_info_names_the_framework() {
        let info = AppInfo::default();
        assert_eq!(info.name, "Hearth");
        assert_eq!(info.version, (0, 1, 0));
    }
}
