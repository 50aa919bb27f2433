//! Render context: instance, surface, device and queues.

use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::debug::DebugMessenger;
use crate::device::{
    create_logical_device, required_device_extensions, select_physical_device, QueueFamilies,
};
use crate::error::{GpuError, Result};
use crate::instance::{create_instance, surface_extensions, AppInfo};
use crate::surface::Surface;

/// Root of every GPU resource lifetime.
///
/// Everything else in this crate holds a clone of [`RenderContext::device`]
/// and must be dropped before the context.
pub struct RenderContext {
    // Entry must be kept alive for the lifetime of the context
    #[allow(dead_code)]
    entry: ash::Entry,
    instance: ash::Instance,
    debug_messenger: Option<DebugMessenger>,
    surface: Option<Surface>,
    physical_device: vk::PhysicalDevice,
    device_name: String,
    device: Arc<ash::Device>,
    queue_families: QueueFamilies,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
}

impl RenderContext {
    /// Start configuring a context.
    pub fn builder() -> RenderContextBuilder {
        RenderContextBuilder::new()
    }

    /// Logical device handle, shared with every resource wrapper.
    pub fn device(&self) -> &Arc<ash::Device> {
        &self.device
    }

    /// Vulkan instance handle.
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    /// Selected physical device.
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// Name reported by the selected GPU.
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Window surface, `None` for headless contexts.
    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    /// Graphics and present queue family indices.
    pub fn queue_families(&self) -> QueueFamilies {
        self.queue_families
    }

    /// Queue used for draw submissions.
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// Queue used for presentation.
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    /// Memory heaps and types of the selected GPU.
    pub fn memory_properties(&self) -> vk::PhysicalDeviceMemoryProperties {
        // SAFETY: the physical device was enumerated from this instance.
        unsafe {
            self.instance
                .get_physical_device_memory_properties(self.physical_device)
        }
    }

    /// Wait for device to be idle.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn wait_idle(&self) -> Result<()> {
        unsafe {
            self.device.device_wait_idle()?;
        }
        Ok(())
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            self.device.destroy_device(None);
            if let Some(surface) = &self.surface {
                surface.destroy();
            }
            if let Some(messenger) = &self.debug_messenger {
                messenger.destroy();
            }
            self.instance.destroy_instance(None);
        }
        tracing::debug!("Render context destroyed");
    }
}

/// Builder for creating a render context.
pub struct RenderContextBuilder {
    app: AppInfo,
    enable_validation: bool,
}

impl Default for RenderContextBuilder {
    fn default() -> Self {
        Self {
            app: AppInfo::default(),
            enable_validation: cfg!(debug_assertions),
        }
    }
}

impl RenderContextBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app.name = name.into();
        self
    }

    /// Set the application version.
    pub fn app_version(mut self, major: u32, minor: u32, patch: u32) -> Self {
        self.app.version = (major, minor, patch);
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.enable_validation = enable;
        self
    }

    /// Build a context presenting to `window`.
    pub fn build<W>(self, window: &W) -> Result<RenderContext>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let display = window
            .display_handle()
            .map_err(|e| GpuError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let extensions = surface_extensions(display.as_raw())?;

        self.build_inner(&extensions, |entry, instance| {
            // SAFETY: the instance was created with the window's surface extensions.
            unsafe { Surface::new(entry, instance, window) }.map(Some)
        })
    }

    /// Build a context without a surface.
    ///
    /// Presentation collapses onto the graphics family; swapchains cannot be
    /// created from a headless context.
    pub fn build_headless(self) -> Result<RenderContext> {
        self.build_inner(&[], |_, _| Ok(None))
    }

    fn build_inner(
        self,
        extensions: &[&std::ffi::CStr],
        make_surface: impl FnOnce(&ash::Entry, &ash::Instance) -> Result<Option<Surface>>,
    ) -> Result<RenderContext> {
        // Load Vulkan entry point
        let entry =
            unsafe { ash::Entry::load() }.map_err(|e| GpuError::Loading(e.to_string()))?;

        let (instance, debug_utils) =
            unsafe { create_instance(&entry, &self.app, extensions, self.enable_validation)? };

        // Anything created past this point is torn down by hand on failure.
        let mut debug_messenger = None;
        let mut surface = None;

        let result = (|| {
            if debug_utils {
                debug_messenger = Some(unsafe { DebugMessenger::new(&entry, &instance)? });
            }
            surface = make_surface(&entry, &instance)?;

            let device_extensions = required_device_extensions(surface.is_some());
            let candidate = unsafe {
                select_physical_device(&instance, surface.as_ref(), &device_extensions)?
            };
            let device = unsafe {
                create_logical_device(
                    &instance,
                    candidate.physical_device,
                    candidate.families,
                    &device_extensions,
                    self.enable_validation,
                )?
            };
            Ok::<_, GpuError>((candidate, device))
        })();

        let (candidate, device) = match result {
            Ok(parts) => parts,
            Err(e) => {
                unsafe {
                    if let Some(surface) = &surface {
                        surface.destroy();
                    }
                    if let Some(messenger) = &debug_messenger {
                        messenger.destroy();
                    }
                    instance.destroy_instance(None);
                }
                return Err(e);
            }
        };

        let families = candidate.families;
        let graphics_queue = unsafe { device.get_device_queue(families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(families.present, 0) };

        tracing::info!(
            gpu = %candidate.name,
            device_type = ?candidate.device_type,
            graphics_family = families.graphics,
            present_family = families.present,
            "Selected GPU"
        );

        Ok(RenderContext {
            entry,
            instance,
            debug_messenger,
            surface,
            physical_device: candidate.physical_device,
            device_name: candidate.name,
            device: Arc::new(device),
            queue_families: families,
            graphics_queue,
            present_queue,
        })
    }
}
