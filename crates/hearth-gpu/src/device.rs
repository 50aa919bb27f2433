//! Physical device selection and logical device creation.

use std::collections::BTreeSet;
use std::ffi::{c_char, CStr};

use ash::vk;

use crate::error::{GpuError, Result};
use crate::instance::validation_layers;
use crate::surface::Surface;

/// Device extensions a selected GPU must support.
///
/// Swapchains need `VK_KHR_surface` on the instance, so headless contexts
/// require nothing.
pub fn required_device_extensions(presentable: bool) -> Vec<&'static CStr> {
    if presentable {
        vec![ash::khr::swapchain::NAME]
    } else {
        vec![]
    }
}

/// Every entry of `required` appears in `available`.
pub fn supports_extensions(available: &[&CStr], required: &[&CStr]) -> bool {
    required.iter().all(|ext| available.contains(ext))
}

/// Queue family indices discovered on a physical device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: Option<u32>,
    pub present: Option<u32>,
}

impl QueueFamilyIndices {
    /// Scan queue family properties.
    ///
    /// `supports_present` is asked for each family index; headless callers
    /// can answer `true` so presentation collapses onto the graphics family.
    pub fn find(
        families: &[vk::QueueFamilyProperties],
        mut supports_present: impl FnMut(u32) -> bool,
    ) -> Self {
        let mut indices = Self::default();

        for (i, family) in families.iter().enumerate() {
            let i = i as u32;
            if family.queue_count == 0 {
                continue;
            }

            if indices.graphics.is_none() && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
            {
                indices.graphics = Some(i);
            }

            if indices.present.is_none() && supports_present(i) {
                indices.present = Some(i);
            }

            if indices.is_complete() {
                break;
            }
        }

        indices
    }

    /// Both a graphics and a present family were found.
    pub fn is_complete(&self) -> bool {
        self.graphics.is_some() && self.present.is_some()
    }

    /// Resolve into concrete indices, if complete.
    pub fn resolve(&self) -> Option<QueueFamilies> {
        Some(QueueFamilies {
            graphics: self.graphics?,
            present: self.present?,
        })
    }
}

/// Resolved graphics and present queue family indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFamilies {
    pub graphics: u32,
    pub present: u32,
}

impl QueueFamilies {
    /// Distinct family indices, graphics and present collapsing when equal.
    pub fn unique(&self) -> Vec<u32> {
        let set: BTreeSet<u32> = [self.graphics, self.present].into_iter().collect();
        set.into_iter().collect()
    }

    /// Graphics and present live on different families.
    pub fn is_split(&self) -> bool {
        self.graphics != self.present
    }
}

/// Selection weight for a device type. Discrete GPUs win over everything.
pub fn device_type_score(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 50,
        vk::PhysicalDeviceType::CPU => 10,
        _ => 1,
    }
}

/// Pick the highest scoring candidate.
///
/// Equal scores go to the later candidate, matching a plain overwrite scan
/// over the enumeration order.
pub fn pick_best<T>(candidates: impl IntoIterator<Item = (T, u32)>) -> Option<T> {
    let mut best: Option<(T, u32)> = None;
    for (candidate, score) in candidates {
        match &best {
            Some((_, best_score)) if score < *best_score => {}
            _ => best = Some((candidate, score)),
        }
    }
    best.map(|(candidate, _)| candidate)
}

/// A physical device that passed the suitability checks.
#[derive(Debug, Clone)]
pub struct DeviceCandidate {
    pub physical_device: vk::PhysicalDevice,
    pub name: String,
    pub device_type: vk::PhysicalDeviceType,
    pub families: QueueFamilies,
}

/// Select a suitable physical device.
///
/// A device is suitable when its queue families are complete and it exposes
/// every extension in `extensions`. Among suitable devices the one with the
/// best [`device_type_score`] wins.
///
/// # Safety
/// The instance (and surface, when given) must be valid.
pub unsafe fn select_physical_device(
    instance: &ash::Instance,
    surface: Option<&Surface>,
    extensions: &[&CStr],
) -> Result<DeviceCandidate> {
    let devices = unsafe { instance.enumerate_physical_devices()? };
    if devices.is_empty() {
        return Err(GpuError::NoSuitableDevice);
    }

    let mut candidates = Vec::new();
    for device in devices {
        match unsafe { check_device(instance, device, surface, extensions)? } {
            Some(candidate) => {
                let score = device_type_score(candidate.device_type);
                tracing::debug!(name = %candidate.name, score, "Suitable GPU");
                candidates.push((candidate, score));
            }
            None => tracing::debug!(?device, "Skipping unsuitable GPU"),
        }
    }

    pick_best(candidates).ok_or(GpuError::NoSuitableDevice)
}

/// Check a single device, returning its description when suitable.
unsafe fn check_device(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: Option<&Surface>,
    required: &[&CStr],
) -> Result<Option<DeviceCandidate>> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let name = properties
        .device_name_as_c_str()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "<unnamed>".to_string());

    let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };
    let indices = QueueFamilyIndices::find(&queue_families, |family| match surface {
        Some(surface) => surface.supports_present(device, family),
        None => true,
    });

    let Some(families) = indices.resolve() else {
        return Ok(None);
    };

    let extensions = match unsafe { instance.enumerate_device_extension_properties(device) } {
        Ok(extensions) => extensions,
        Err(e) => {
            tracing::warn!(name = %name, "Failed to enumerate device extensions: {e}");
            return Ok(None);
        }
    };
    let available: Vec<&CStr> = extensions
        .iter()
        .filter_map(|e| e.extension_name_as_c_str().ok())
        .collect();
    if !supports_extensions(&available, required) {
        return Ok(None);
    }

    Ok(Some(DeviceCandidate {
        physical_device: device,
        name,
        device_type: properties.device_type,
        families,
    }))
}

/// Create the logical device with one queue per unique family.
///
/// # Safety
/// The instance and physical device must be valid.
pub unsafe fn create_logical_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    families: QueueFamilies,
    extensions: &[&CStr],
    enable_validation: bool,
) -> Result<ash::Device> {
    let queue_priority = 1.0_f32;
    let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = families
        .unique()
        .into_iter()
        .map(|family| {
            vk::DeviceQueueCreateInfo::default()
                .queue_family_index(family)
                .queue_priorities(std::slice::from_ref(&queue_priority))
        })
        .collect();

    let extension_names: Vec<*const c_char> = extensions
        .iter()
        .map(|ext| ext.as_ptr())
        .collect();

    // Device layers are deprecated but older loaders still read them.
    let layers = if enable_validation {
        validation_layers()
    } else {
        vec![]
    };
    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    let features = vk::PhysicalDeviceFeatures::default();

    let create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(&queue_create_infos)
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);
    #[allow(deprecated)]
    let create_info = create_info.enabled_layer_names(&layer_names);

    let device = unsafe { instance.create_device(physical_device, &create_info, None)? };
    Ok(device)
}
