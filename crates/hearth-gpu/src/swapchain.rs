//! Swapchain negotiation, presentation and rebuild.

use std::sync::Arc;

use ash::vk;

use crate::context::RenderContext;
use crate::device::QueueFamilies;
use crate::error::{GpuError, Result};
use crate::surface::{Surface, SurfaceSupport};
use crate::sync::Semaphore;

/// Upper bound on swapchain images the engine asks for.
pub const MAX_SWAPCHAIN_IMAGES: u32 = 3;

/// Format used when the driver leaves the choice to the application.
pub const FALLBACK_SURFACE_FORMAT: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
    format: vk::Format::B8G8R8A8_UNORM,
    color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
};

/// How many images the swapchain should rotate through.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferStrategy {
    Single = 1,
    #[default]
    Double = 2,
    Triple = 3,
}

impl BufferStrategy {
    /// Number of images this strategy asks for.
    #[must_use]
    pub const fn image_count(self) -> u32 {
        self as u32
    }
}

/// What the application wants from a swapchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainRequest {
    pub width: u32,
    pub height: u32,
    pub format: vk::Format,
    pub strategy: BufferStrategy,
    pub vsync: bool,
}

impl Default for SwapchainRequest {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            format: vk::Format::B8G8R8A8_SRGB,
            strategy: BufferStrategy::Double,
            vsync: true,
        }
    }
}

/// Select the surface format.
///
/// A lone `UNDEFINED` entry means any format is acceptable, in which case
/// [`FALLBACK_SURFACE_FORMAT`] is used. Otherwise an exact match on `desired`
/// with the sRGB nonlinear color space wins, falling back to the first entry.
pub fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
    desired: vk::Format,
) -> Option<vk::SurfaceFormatKHR> {
    if let [only] = available {
        if only.format == vk::Format::UNDEFINED {
            return Some(FALLBACK_SURFACE_FORMAT);
        }
    }

    available
        .iter()
        .find(|f| f.format == desired && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
        .or_else(|| available.first())
        .copied()
}

/// Select the present mode.
pub fn choose_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if !vsync {
        // Prefer mailbox, then immediate
        for preferred in [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE] {
            if available.contains(&preferred) {
                return preferred;
            }
        }
    }
    // FIFO is always supported
    vk::PresentModeKHR::FIFO
}

/// Calculate swapchain extent.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// Number of images to request.
///
/// Starts from the driver's recommendation of `min_image_count + 1`, trims it
/// to the buffering strategy without going under the driver minimum, honors a
/// non-zero `max_image_count`, and never exceeds [`MAX_SWAPCHAIN_IMAGES`].
pub fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR, strategy: BufferStrategy) -> u32 {
    let minimum = capabilities.min_image_count.max(1);
    let mut count = (minimum + 1).min(strategy.image_count()).max(minimum);

    if capabilities.max_image_count > 0 {
        count = count.min(capabilities.max_image_count);
    }

    count.min(MAX_SWAPCHAIN_IMAGES)
}

/// Image sharing mode for the given queue families.
pub fn choose_sharing_mode(families: QueueFamilies) -> vk::SharingMode {
    if families.is_split() {
        vk::SharingMode::CONCURRENT
    } else {
        vk::SharingMode::EXCLUSIVE
    }
}

/// Outcome of negotiating a request against what the surface supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainSettings {
    pub surface_format: vk::SurfaceFormatKHR,
    pub present_mode: vk::PresentModeKHR,
    pub extent: vk::Extent2D,
    pub image_count: u32,
    pub sharing_mode: vk::SharingMode,
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
}

impl SwapchainSettings {
    /// Negotiate `request` against `support`.
    pub fn negotiate(
        support: &SurfaceSupport,
        request: &SwapchainRequest,
        families: QueueFamilies,
    ) -> Result<Self> {
        let surface_format = choose_surface_format(&support.formats, request.format)
            .ok_or_else(|| GpuError::SwapchainCreation("surface reports no formats".into()))?;

        Ok(Self {
            surface_format,
            present_mode: choose_present_mode(&support.present_modes, request.vsync),
            extent: choose_extent(&support.capabilities, request.width, request.height),
            image_count: choose_image_count(&support.capabilities, request.strategy),
            sharing_mode: choose_sharing_mode(families),
            pre_transform: support.capabilities.current_transform,
        })
    }

    /// Images of the negotiated extent can be created.
    ///
    /// A minimized window may report a zero-sized surface, which Vulkan
    /// rejects as a swapchain extent.
    pub fn is_presentable(&self) -> bool {
        self.extent.width > 0 && self.extent.height > 0
    }
}

/// Result of [`SwapChain::acquire_next_image`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image is ready; the image-available semaphore will be signaled.
    Ready { image_index: u32, suboptimal: bool },
    /// The swapchain was stale and has been rebuilt; drop this frame.
    Rebuilt,
    /// The surface has no area, so no swapchain exists yet; drop this frame.
    Deferred,
}

/// Result of [`SwapChain::present`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Presented,
    /// Presentation reported staleness and the swapchain has been rebuilt.
    Rebuilt,
}

/// Presentable images for one surface plus the acquire/present semaphores.
pub struct SwapChain {
    device: Arc<ash::Device>,
    loader: ash::khr::swapchain::Device,
    surface: Surface,
    physical_device: vk::PhysicalDevice,
    families: QueueFamilies,
    request: SwapchainRequest,

    handle: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    settings: SwapchainSettings,
    generation: u64,

    image_available: Semaphore,
    render_finished: Semaphore,
}

impl SwapChain {
    /// Create a swapchain for the context's surface.
    pub fn new(context: &RenderContext, request: SwapchainRequest) -> Result<Self> {
        let surface = context
            .surface()
            .cloned()
            .ok_or_else(|| GpuError::InvalidState("render context has no surface".into()))?;

        let device = context.device().clone();
        let loader = ash::khr::swapchain::Device::new(context.instance(), &device);

        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;

        let mut swapchain = Self {
            device,
            loader,
            surface,
            physical_device: context.physical_device(),
            families: context.queue_families(),
            request,
            handle: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            settings: SwapchainSettings {
                surface_format: FALLBACK_SURFACE_FORMAT,
                present_mode: vk::PresentModeKHR::FIFO,
                extent: vk::Extent2D::default(),
                image_count: 0,
                sharing_mode: vk::SharingMode::EXCLUSIVE,
                pre_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            },
            generation: 0,
            image_available,
            render_finished,
        };

        swapchain.create_swapchain()?;
        swapchain.create_image_views()?;
        if swapchain.is_deferred() {
            tracing::info!("Surface has no area, swapchain creation deferred");
        }

        tracing::info!(
            width = swapchain.settings.extent.width,
            height = swapchain.settings.extent.height,
            images = swapchain.images.len(),
            format = ?swapchain.settings.surface_format.format,
            present_mode = ?swapchain.settings.present_mode,
            "Swapchain created"
        );

        Ok(swapchain)
    }

    /// Raw swapchain handle.
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    /// Negotiated settings.
    pub fn settings(&self) -> &SwapchainSettings {
        &self.settings
    }

    /// Image format.
    pub fn format(&self) -> vk::Format {
        self.settings.surface_format.format
    }

    /// Image extent.
    pub fn extent(&self) -> vk::Extent2D {
        self.settings.extent
    }

    /// Buffering strategy requested at creation.
    pub fn strategy(&self) -> BufferStrategy {
        self.request.strategy
    }

    /// Driver-owned presentable images.
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// One color view per image.
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }

    /// Bumped on every rebuild; dependents compare it to know when to recreate.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// No swapchain exists because the surface reported a zero extent.
    pub fn is_deferred(&self) -> bool {
        self.handle == vk::SwapchainKHR::null()
    }

    /// Semaphore signaled when an acquired image becomes available.
    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available.handle()
    }

    /// Semaphore presentation waits on.
    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished.handle()
    }

    /// Acquire the next image, signaling [`Self::image_available`].
    ///
    /// Blocks without a timeout. An out-of-date swapchain is rebuilt at the
    /// current request size and the frame is reported as dropped. A deferred
    /// swapchain is retried first and reports [`AcquireOutcome::Deferred`]
    /// while the surface still has no area.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn acquire_next_image(&mut self) -> Result<AcquireOutcome> {
        if self.is_deferred() {
            self.rebuild(self.request.width, self.request.height)?;
            return Ok(if self.is_deferred() {
                AcquireOutcome::Deferred
            } else {
                AcquireOutcome::Rebuilt
            });
        }

        // SAFETY: the swapchain and semaphore belong to this device.
        let result = unsafe {
            self.loader.acquire_next_image(
                self.handle,
                u64::MAX,
                self.image_available.handle(),
                vk::Fence::null(),
            )
        };

        match result {
            Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Ready {
                image_index,
                suboptimal,
            }),
            // OUT_OF_DATE means no image was acquired
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                tracing::warn!("Swapchain out of date on acquire, rebuilding");
                self.rebuild(self.request.width, self.request.height)?;
                Ok(AcquireOutcome::Rebuilt)
            }
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Present `image_index`, waiting on [`Self::render_finished`].
    ///
    /// Out-of-date or suboptimal results rebuild the swapchain.
    #[cfg_attr(
        feature = "profiling-tracy",
        tracing::instrument(level = "trace", skip_all)
    )]
    pub fn present(&mut self, queue: vk::Queue, image_index: u32) -> Result<PresentOutcome> {
        if self.is_deferred() {
            return Err(GpuError::InvalidState("present on a deferred swapchain".into()));
        }

        let wait_semaphores = [self.render_finished.handle()];
        let swapchains = [self.handle];
        let image_indices = [image_index];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        // SAFETY: the queue belongs to this device and the image was acquired.
        let result = unsafe { self.loader.queue_present(queue, &present_info) };

        match result {
            Ok(false) => Ok(PresentOutcome::Presented),
            Ok(true) | Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                tracing::warn!("Swapchain stale on present, rebuilding");
                self.rebuild(self.request.width, self.request.height)?;
                Ok(PresentOutcome::Rebuilt)
            }
            Err(e) => Err(GpuError::from(e)),
        }
    }

    /// Recreate the swapchain and its views at a new resolution.
    ///
    /// Waits for the device to go idle first. Device, surface and semaphores
    /// are kept. If the surface has no area the swapchain stays deferred.
    pub fn rebuild(&mut self, width: u32, height: u32) -> Result<()> {
        // SAFETY: the device outlives this swapchain.
        unsafe { self.device.device_wait_idle()? };

        self.destroy_swapchain();

        self.request.width = width;
        self.request.height = height;
        self.create_swapchain()?;
        self.create_image_views()?;
        self.generation += 1;

        if self.is_deferred() {
            tracing::debug!(generation = self.generation, "Swapchain deferred, surface has no area");
            return Ok(());
        }

        tracing::info!(
            width = self.settings.extent.width,
            height = self.settings.extent.height,
            generation = self.generation,
            "Swapchain rebuilt"
        );
        Ok(())
    }

    /// Leaves the handle null when the negotiated extent has no area.
    fn create_swapchain(&mut self) -> Result<()> {
        let support = self.surface.support(self.physical_device)?;
        let settings = SwapchainSettings::negotiate(&support, &self.request, self.families)?;
        if !settings.is_presentable() {
            self.settings = settings;
            return Ok(());
        }

        let queue_family_indices = [self.families.graphics, self.families.present];
        let mut create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(self.surface.handle())
            .min_image_count(settings.image_count)
            .image_format(settings.surface_format.format)
            .image_color_space(settings.surface_format.color_space)
            .image_extent(settings.extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(settings.sharing_mode)
            .pre_transform(settings.pre_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(settings.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());
        if settings.sharing_mode == vk::SharingMode::CONCURRENT {
            create_info = create_info.queue_family_indices(&queue_family_indices);
        }

        // SAFETY: the surface and device come from the same context.
        let handle = unsafe { self.loader.create_swapchain(&create_info, None) }
            .map_err(|e| GpuError::SwapchainCreation(e.to_string()))?;

        // SAFETY: the swapchain was just created.
        let images = match unsafe { self.loader.get_swapchain_images(handle) } {
            Ok(images) => images,
            Err(e) => {
                unsafe { self.loader.destroy_swapchain(handle, None) };
                return Err(e.into());
            }
        };

        if images.len() as u32 > settings.image_count {
            tracing::debug!(
                requested = settings.image_count,
                returned = images.len(),
                "Driver returned more swapchain images than requested"
            );
        }

        self.handle = handle;
        self.images = images;
        self.settings = settings;
        Ok(())
    }

    fn create_image_views(&mut self) -> Result<()> {
        let format = self.settings.surface_format.format;
        let mut views = Vec::with_capacity(self.images.len());

        for &image in &self.images {
            let view_info = vk::ImageViewCreateInfo::default()
                .image(image)
                .view_type(vk::ImageViewType::TYPE_2D)
                .format(format)
                .components(vk::ComponentMapping::default())
                .subresource_range(
                    vk::ImageSubresourceRange::default()
                        .aspect_mask(vk::ImageAspectFlags::COLOR)
                        .base_mip_level(0)
                        .level_count(1)
                        .base_array_layer(0)
                        .layer_count(1),
                );

            // SAFETY: the image belongs to this device's swapchain.
            match unsafe { self.device.create_image_view(&view_info, None) } {
                Ok(view) => views.push(view),
                Err(e) => {
                    for view in views {
                        unsafe { self.device.destroy_image_view(view, None) };
                    }
                    return Err(e.into());
                }
            }
        }

        self.image_views = views;
        Ok(())
    }

    fn destroy_swapchain(&mut self) {
        // SAFETY: callers wait for the device to go idle first.
        unsafe {
            for view in self.image_views.drain(..) {
                self.device.destroy_image_view(view, None);
            }
            if self.handle != vk::SwapchainKHR::null() {
                self.loader.destroy_swapchain(self.handle, None);
            }
        }
        self.handle = vk::SwapchainKHR::null();
        self.images.clear();
    }
}

impl Drop for SwapChain {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
        }
        self.destroy_swapchain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(format: vk::Format, color_space: vk::ColorSpaceKHR) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space,
        }
    }

    fn caps(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: vk::Extent2D {
                width: u32::MAX,
                height: u32::MAX,
            },
            min_image_extent: vk::Extent2D {
                width: 64,
                height: 48,
            },
            max_image_extent: vk::Extent2D {
                width: 1920,
                height: 1080,
            },
            ..Default::default()
        }
    }

    const SHARED: QueueFamilies = QueueFamilies {
        graphics: 0,
        present: 0,
    };

    #[test]
    fn undefined_format_falls_back_to_bgra_unorm() {
        let available = [format(vk::Format::UNDEFINED, vk::ColorSpaceKHR::SRGB_NONLINEAR)];
        let chosen = choose_surface_format(&available, vk::Format::R8G8B8A8_SRGB).unwrap();
        assert_eq!(chosen.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(chosen.color_space, vk::ColorSpaceKHR::SRGB_NONLINEAR);
    }

    #[test]
    fn exact_format_match_wins() {
        let wanted = format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR);
        let available = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT),
            wanted,
        ];
        let chosen = choose_surface_format(&available, vk::Format::B8G8R8A8_SRGB).unwrap();
        assert_eq!(chosen, wanted);
    }

    #[test]
    fn no_match_uses_first_format() {
        let available = [
            format(vk::Format::R8G8B8A8_UNORM, vk::ColorSpaceKHR::SRGB_NONLINEAR),
            format(vk::Format::A2B10G10R10_UNORM_PACK32, vk::ColorSpaceKHR::HDR10_ST2084_EXT),
        ];
        let chosen = choose_surface_format(&available, vk::Format::B8G8R8A8_SRGB).unwrap();
        assert_eq!(chosen, available[0]);
    }

    #[test]
    fn no_formats_yields_none() {
        assert_eq!(choose_surface_format(&[], vk::Format::B8G8R8A8_SRGB), None);
    }

    #[test]
    fn mailbox_preferred_without_vsync() {
        let available = [
            vk::PresentModeKHR::FIFO,
            vk::PresentModeKHR::IMMEDIATE,
            vk::PresentModeKHR::MAILBOX,
        ];
        assert_eq!(choose_present_mode(&available, false), vk::PresentModeKHR::MAILBOX);
    }

    #[test]
    fn immediate_when_mailbox_missing() {
        let available = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(choose_present_mode(&available, false), vk::PresentModeKHR::IMMEDIATE);
    }

    #[test]
    fn vsync_always_fifo() {
        let lists: [&[vk::PresentModeKHR]; 3] = [
            &[],
            &[vk::PresentModeKHR::MAILBOX],
            &[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO_RELAXED],
        ];
        for available in lists {
            assert_eq!(choose_present_mode(available, true), vk::PresentModeKHR::FIFO);
        }
        assert_eq!(choose_present_mode(&[], false), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn sentinel_extent_is_clamped() {
        let capabilities = caps(2, 4);

        let big = choose_extent(&capabilities, 4000, 3000);
        assert_eq!(big, vk::Extent2D { width: 1920, height: 1080 });

        let small = choose_extent(&capabilities, 1, 1);
        assert_eq!(small, vk::Extent2D { width: 64, height: 48 });

        let inside = choose_extent(&capabilities, 800, 600);
        assert_eq!(inside, vk::Extent2D { width: 800, height: 600 });
    }

    #[test]
    fn concrete_extent_is_used_verbatim() {
        let mut capabilities = caps(2, 4);
        capabilities.current_extent = vk::Extent2D {
            width: 1024,
            height: 768,
        };

        for (w, h) in [(1, 1), (800, 600), (10_000, 10_000)] {
            assert_eq!(choose_extent(&capabilities, w, h), capabilities.current_extent);
        }
    }

    #[test]
    fn image_count_never_exceeds_three() {
        let strategies = [BufferStrategy::Single, BufferStrategy::Double, BufferStrategy::Triple];
        for strategy in strategies {
            for min in 0..=8 {
                for max in [0, min, min + 1, 16] {
                    let count = choose_image_count(&caps(min, max), strategy);
                    assert!(
                        count <= MAX_SWAPCHAIN_IMAGES,
                        "{strategy:?} min={min} max={max} gave {count}"
                    );
                    assert!(count >= 1);
                }
            }
        }
    }

    #[test]
    fn image_count_follows_strategy_within_driver_limits() {
        assert_eq!(choose_image_count(&caps(2, 4), BufferStrategy::Double), 2);
        assert_eq!(choose_image_count(&caps(2, 4), BufferStrategy::Triple), 3);
        assert_eq!(choose_image_count(&caps(1, 0), BufferStrategy::Single), 1);
        // Driver minimum beats a smaller strategy
        assert_eq!(choose_image_count(&caps(2, 0), BufferStrategy::Single), 2);
        // Driver maximum beats a larger strategy
        assert_eq!(choose_image_count(&caps(1, 2), BufferStrategy::Triple), 2);
    }

    #[test]
    fn sharing_mode_follows_family_split() {
        assert_eq!(choose_sharing_mode(SHARED), vk::SharingMode::EXCLUSIVE);
        let split = QueueFamilies {
            graphics: 0,
            present: 2,
        };
        assert_eq!(choose_sharing_mode(split), vk::SharingMode::CONCURRENT);
    }

    #[test]
    fn double_buffered_negotiation_without_vsync() {
        let support = SurfaceSupport {
            capabilities: caps(2, 4),
            formats: vec![format(vk::Format::UNDEFINED, vk::ColorSpaceKHR::SRGB_NONLINEAR)],
            present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
        };
        let request = SwapchainRequest {
            width: 1280,
            height: 720,
            format: vk::Format::B8G8R8A8_SRGB,
            strategy: BufferStrategy::Double,
            vsync: false,
        };

        let settings = SwapchainSettings::negotiate(&support, &request, SHARED).unwrap();
        assert_eq!(settings.surface_format.format, vk::Format::B8G8R8A8_UNORM);
        assert_eq!(settings.present_mode, vk::PresentModeKHR::MAILBOX);
        assert_eq!(settings.image_count, 2);
        assert_eq!(settings.extent, vk::Extent2D { width: 1280, height: 720 });
        assert_eq!(settings.sharing_mode, vk::SharingMode::EXCLUSIVE);
    }

    #[test]
    fn zero_sized_surface_defers_creation() {
        let mut capabilities = caps(2, 4);
        let formats = vec![format(vk::Format::B8G8R8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR)];

        for (width, height) in [(0, 0), (0, 600), (800, 0)] {
            capabilities.current_extent = vk::Extent2D { width, height };
            let support = SurfaceSupport {
                capabilities,
                formats: formats.clone(),
                present_modes: vec![vk::PresentModeKHR::FIFO],
            };
            let settings =
                SwapchainSettings::negotiate(&support, &SwapchainRequest::default(), SHARED)
                    .unwrap();
            assert_eq!(settings.extent, vk::Extent2D { width, height });
            assert!(!settings.is_presentable(), "{width}x{height} should defer");
        }

        capabilities.current_extent = vk::Extent2D {
            width: 800,
            height: 600,
        };
        let support = SurfaceSupport {
            capabilities,
            formats,
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        let settings =
            SwapchainSettings::negotiate(&support, &SwapchainRequest::default(), SHARED).unwrap();
        assert!(settings.is_presentable());
    }

    #[test]
    fn negotiation_fails_without_formats() {
        let support = SurfaceSupport {
            capabilities: caps(2, 4),
            formats: vec![],
            present_modes: vec![vk::PresentModeKHR::FIFO],
        };
        let err = SwapchainSettings::negotiate(&support, &SwapchainRequest::default(), SHARED)
            .unwrap_err();
        assert!(matches!(err, GpuError::SwapchainCreation(_)));
    }

    #[test]
    fn strategy_counts() {
        assert_eq!(BufferStrategy::Single.image_count(), 1);
        assert_eq!(BufferStrategy::Double.image_count(), 2);
        assert_eq!(BufferStrategy::Triple.image_count(), 3);
        assert_eq!(BufferStrategy::default(), BufferStrategy::Double);
    }
}
