//! Framebuffers binding image views to a render pass.

use std::sync::Arc;

use ash::vk;

use crate::error::{require_handle, GpuError, Result};
use crate::render_pass::RenderPass;

/// Owned `VkFramebuffer`.
pub struct FrameBuffer {
    device: Arc<ash::Device>,
    handle: vk::Framebuffer,
    extent: vk::Extent2D,
}

impl FrameBuffer {
    /// Create a single-layer framebuffer over `attachments`.
    pub fn new(
        device: Arc<ash::Device>,
        render_pass: &RenderPass,
        attachments: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<Self> {
        let render_pass = require_handle(render_pass.handle(), "render pass")?;
        for &view in attachments {
            require_handle(view, "framebuffer attachment")?;
        }
        if extent.width == 0 || extent.height == 0 {
            return Err(GpuError::FramebufferCreation(format!(
                "zero-sized extent {}x{}",
                extent.width, extent.height
            )));
        }

        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(render_pass)
            .attachments(attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);

        // SAFETY: render pass and views belong to this device.
        let handle = unsafe { device.create_framebuffer(&create_info, None) }
            .map_err(|e| GpuError::FramebufferCreation(e.to_string()))?;

        Ok(Self {
            device,
            handle,
            extent,
        })
    }

    /// One framebuffer per swapchain image view.
    pub fn for_views(
        device: &Arc<ash::Device>,
        render_pass: &RenderPass,
        views: &[vk::ImageView],
        extent: vk::Extent2D,
    ) -> Result<Vec<Self>> {
        views
            .iter()
            .map(|&view| Self::new(device.clone(), render_pass, &[view], extent))
            .collect()
    }

    /// Raw framebuffer handle.
    pub fn handle(&self) -> vk::Framebuffer {
        self.handle
    }

    /// Size the framebuffer was created with.
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }
}

impl Drop for FrameBuffer {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_framebuffer(self.handle, None);
        }
    }
}
