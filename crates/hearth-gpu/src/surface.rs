//! Surface management for windowed rendering.
//!
//! Wraps the `VkSurfaceKHR` created from a window's raw handles and the
//! queries the swapchain negotiation needs.

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::error::{GpuError, Result};

/// A presentable surface bound to one window.
///
/// Destroyed explicitly by the owning [`RenderContext`](crate::RenderContext)
/// after the device, never on its own.
#[derive(Clone)]
pub struct Surface {
    pub(crate) loader: ash::khr::surface::Instance,
    pub(crate) handle: vk::SurfaceKHR,
}

impl Surface {
    /// Create a surface for `window`.
    ///
    /// # Safety
    /// The instance must have been created with the window's surface
    /// extensions, and the window must outlive the surface.
    pub unsafe fn new<W>(entry: &ash::Entry, instance: &ash::Instance, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display.as_raw(),
                window_handle.as_raw(),
                None,
            )
        }
        .map_err(|e| GpuError::SurfaceCreation(e.to_string()))?;

        let loader = ash::khr::surface::Instance::new(entry, instance);

        Ok(Self { loader, handle })
    }

    /// Raw surface handle.
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Whether `family` on `physical_device` can present to this surface.
    pub fn supports_present(&self, physical_device: vk::PhysicalDevice, family: u32) -> bool {
        // SAFETY: the surface and physical device come from the same instance.
        unsafe {
            self.loader
                .get_physical_device_surface_support(physical_device, family, self.handle)
        }
        .unwrap_or(false)
    }

    /// Query capabilities, formats and present modes for `physical_device`.
    pub fn support(&self, physical_device: vk::PhysicalDevice) -> Result<SurfaceSupport> {
        // SAFETY: the surface and physical device come from the same instance.
        unsafe {
            let capabilities = self
                .loader
                .get_physical_device_surface_capabilities(physical_device, self.handle)?;
            let formats = self
                .loader
                .get_physical_device_surface_formats(physical_device, self.handle)?;
            let present_modes = self
                .loader
                .get_physical_device_surface_present_modes(physical_device, self.handle)?;

            Ok(SurfaceSupport {
                capabilities,
                formats,
                present_modes,
            })
        }
    }

    /// Destroy the surface.
    ///
    /// # Safety
    /// No swapchain may still reference the surface.
    pub(crate) unsafe fn destroy(&self) {
        unsafe { self.loader.destroy_surface(self.handle, None) };
    }
}

/// What a physical device offers for a surface.
#[derive(Debug, Clone, Default)]
pub struct SurfaceSupport {
    /// Raw surface capabilities.
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    /// Supported surface formats.
    pub formats: Vec<vk::SurfaceFormatKHR>,
    /// Supported present modes.
    pub present_modes: Vec<vk::PresentModeKHR>,
}
