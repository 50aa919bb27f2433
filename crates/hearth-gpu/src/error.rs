//! GPU error types.

use ash::vk;
use thiserror::Error;

/// GPU-related errors.
#[derive(Error, Debug)]
pub enum GpuError {
    /// Vulkan error.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan loader could not be found or initialized.
    #[error("Failed to load Vulkan: {0}")]
    Loading(String),

    /// No suitable GPU found.
    #[error("No suitable GPU found")]
    NoSuitableDevice,

    /// Required extension not supported.
    #[error("Required extension not supported: {0}")]
    ExtensionNotSupported(String),

    /// The instance cannot present to window surfaces.
    #[error("Surface presentation not supported: {0}")]
    SurfaceUnsupported(String),

    /// Surface creation failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Swapchain creation failed.
    #[error("Swapchain creation failed: {0}")]
    SwapchainCreation(String),

    /// Shader module could not be loaded.
    #[error("Shader load failed: {0}")]
    ShaderLoad(String),

    /// Pipeline or pipeline layout creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// Render pass creation failed.
    #[error("Render pass creation failed: {0}")]
    RenderPassCreation(String),

    /// Framebuffer creation failed.
    #[error("Framebuffer creation failed: {0}")]
    FramebufferCreation(String),

    /// Descriptor pool, layout or set creation failed.
    #[error("Descriptor creation failed: {0}")]
    DescriptorCreation(String),

    /// Buffer creation or upload failed.
    #[error("Buffer error: {0}")]
    Buffer(String),

    /// No memory type satisfies the requested property flags.
    #[error("No suitable memory type for filter {type_filter:#b} with {properties:?}")]
    NoSuitableMemoryType {
        type_filter: u32,
        properties: vk::MemoryPropertyFlags,
    },

    /// A required handle argument was null.
    #[error("Null handle passed for {0}")]
    NullHandle(&'static str),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, GpuError>;

/// Reject null Vulkan handles with [`GpuError::NullHandle`].
pub(crate) fn require_handle<H: vk::Handle + Copy>(handle: H, what: &'static str) -> Result<H> {
    if handle.as_raw() == 0 {
        Err(GpuError::NullHandle(what))
    } else {
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;

    #[test]
    fn null_handles_are_rejected() {
        let err = require_handle(vk::Buffer::null(), "vertex buffer").unwrap_err();
        assert!(matches!(err, GpuError::NullHandle("vertex buffer")));
        assert_eq!(err.to_string(), "Null handle passed for vertex buffer");
    }

    #[test]
    fn non_null_handles_pass_through() {
        let buffer = vk::Buffer::from_raw(42);
        assert_eq!(require_handle(buffer, "buffer").unwrap(), buffer);
    }
}
