//! Vulkan layer for the Hearth framework.
//!
//! This crate provides:
//! - Instance, debug messenger, surface and device setup ([`RenderContext`])
//! - Swapchain negotiation and rebuild on staleness ([`SwapChain`])
//! - RAII wrappers for fences, semaphores, buffers, descriptors, render passes,
//!   framebuffers, shader modules and pipelines
//! - Fence-guarded command recording and submission ([`CommandBuffer`])
//!
//! Every wrapper holds an `Arc<ash::Device>` and destroys its object on drop,
//! so owners must drop them in reverse order of construction.

pub mod command;
pub mod context;
pub mod debug;
pub mod descriptors;
pub mod device;
pub mod error;
pub mod framebuffer;
pub mod instance;
pub mod memory;
pub mod pipeline;
pub mod render_pass;
pub mod shader;
pub mod surface;
pub mod swapchain;
pub mod sync;

pub use ash::vk;

pub use command::{CommandBuffer, CommandPool, SubmitSync};
pub use context::{RenderContext, RenderContextBuilder};
pub use descriptors::{
    BufferBinding, DescriptorPool, DescriptorSet, DescriptorSetLayout, DescriptorSetLayoutBuilder,
};
pub use device::QueueFamilies;
pub use error::{GpuError, Result};
pub use framebuffer::FrameBuffer;
pub use memory::{BufferDesc, ResourceBuffer};
pub use pipeline::{
    GraphicsPipelineConfig, Pipeline, PipelineDesc, PipelineLayout, VertexAttribute, VertexBinding,
};
pub use render_pass::{RenderPass, RenderPassDesc};
pub use shader::ShaderModule;
pub use swapchain::{AcquireOutcome, BufferStrategy, PresentOutcome, SwapChain, SwapchainRequest};
pub use sync::{Fence, Semaphore};
