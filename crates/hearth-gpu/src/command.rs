//! Command buffer management.

use std::sync::Arc;

use ash::vk;
use bytemuck::Pod;

use crate::descriptors::DescriptorSet;
use crate::error::{require_handle, GpuError, Result};
use crate::framebuffer::FrameBuffer;
use crate::memory::ResourceBuffer;
use crate::pipeline::{Pipeline, PipelineLayout};
use crate::render_pass::RenderPass;
use crate::sync::Fence;

/// Largest payload `vkCmdUpdateBuffer` accepts.
pub const MAX_INLINE_UPDATE: usize = 65536;

/// Command pool for allocating command buffers.
pub struct CommandPool {
    device: Arc<ash::Device>,
    pool: vk::CommandPool,
    queue_family: u32,
}

impl CommandPool {
    /// Create a pool whose buffers can be reset individually.
    pub fn new(device: Arc<ash::Device>, queue_family: u32) -> Result<Self> {
        let create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(queue_family)
            .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

        // SAFETY: the device is alive for as long as the Arc is held.
        let pool = unsafe { device.create_command_pool(&create_info, None)? };

        Ok(Self {
            device,
            pool,
            queue_family,
        })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::CommandPool {
        self.pool
    }

    /// Get the queue family index.
    pub fn queue_family(&self) -> u32 {
        self.queue_family
    }
}

impl Drop for CommandPool {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_command_pool(self.pool, None);
        }
    }
}

/// Semaphores a submission waits on and signals.
#[derive(Debug, Clone, Copy)]
pub struct SubmitSync {
    pub wait: vk::Semaphore,
    pub wait_stage: vk::PipelineStageFlags,
    pub signal: vk::Semaphore,
}

impl SubmitSync {
    /// Wait for an acquired swapchain image before writing color, then
    /// signal that rendering finished.
    pub fn color_output(wait: vk::Semaphore, signal: vk::Semaphore) -> Self {
        Self {
            wait,
            wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            signal,
        }
    }
}

/// A primary command buffer guarded by its own fence.
///
/// The fence is created signaled so the first [`begin`](Self::begin) does
/// not block. Every [`submit`](Self::submit) signals it again. Waits are
/// skipped while no submission is in flight, so a recording that failed
/// after the fence reset never blocks later frames.
pub struct CommandBuffer {
    device: Arc<ash::Device>,
    pool: vk::CommandPool,
    handle: vk::CommandBuffer,
    fence: Fence,
    recording: bool,
    in_flight: bool,
}

impl CommandBuffer {
    /// Allocate one primary buffer from `pool`.
    pub fn new(device: Arc<ash::Device>, pool: &CommandPool) -> Result<Self> {
        let pool_handle = require_handle(pool.handle(), "command pool")?;

        let alloc_info = vk::CommandBufferAllocateInfo::default()
            .command_pool(pool_handle)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(1);

        // SAFETY: the pool belongs to this device.
        let buffers = unsafe { device.allocate_command_buffers(&alloc_info)? };
        let handle = buffers[0];

        let fence = match Fence::new(device.clone(), true) {
            Ok(fence) => fence,
            Err(e) => {
                unsafe { device.free_command_buffers(pool_handle, &buffers) };
                return Err(e);
            }
        };

        Ok(Self {
            device,
            pool: pool_handle,
            handle,
            fence,
            recording: false,
            in_flight: false,
        })
    }

    /// Raw command buffer handle.
    pub fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }

    /// Raw handle of the recording fence.
    pub fn fence(&self) -> vk::Fence {
        self.fence.handle()
    }

    /// Whether commands are currently being recorded.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Wait for the previous submission, reset the fence and start recording.
    pub fn begin(&mut self) -> Result<()> {
        if self.recording {
            return Err(GpuError::InvalidState("command buffer is already recording".into()));
        }

        self.wait()?;
        self.fence.reset()?;

        let begin_info = vk::CommandBufferBeginInfo::default()
            .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
        // SAFETY: the fence wait above guarantees the buffer is not pending.
        unsafe { self.device.begin_command_buffer(self.handle, &begin_info)? };

        self.recording = true;
        Ok(())
    }

    /// Finish recording.
    pub fn end(&mut self) -> Result<()> {
        self.ensure_recording()?;
        // SAFETY: the buffer is in the recording state.
        unsafe { self.device.end_command_buffer(self.handle)? };
        self.recording = false;
        Ok(())
    }

    /// Drop a partial recording and return to the initial state.
    pub fn abort(&mut self) -> Result<()> {
        self.ensure_recording()?;
        // SAFETY: the pool allows per-buffer resets and nothing is in flight.
        unsafe {
            self.device
                .reset_command_buffer(self.handle, vk::CommandBufferResetFlags::empty())?;
        }
        self.recording = false;
        Ok(())
    }

    /// Block until the last submission has completed.
    pub fn wait(&mut self) -> Result<()> {
        if self.in_flight {
            self.fence.wait(u64::MAX)?;
            self.in_flight = false;
        }
        Ok(())
    }

    /// A submission has not been waited on yet.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Submit the recorded commands to `queue`, signaling the recording fence.
    #[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
    pub fn submit(&mut self, queue: vk::Queue, sync: Option<SubmitSync>) -> Result<()> {
        if self.recording {
            return Err(GpuError::InvalidState("cannot submit while recording".into()));
        }
        let queue = require_handle(queue, "queue")?;

        let command_buffers = [self.handle];
        let (wait, stages, signal) = match sync {
            Some(sync) => (
                vec![require_handle(sync.wait, "wait semaphore")?],
                vec![sync.wait_stage],
                vec![require_handle(sync.signal, "signal semaphore")?],
            ),
            None => (Vec::new(), Vec::new(), Vec::new()),
        };

        let submit_info = vk::SubmitInfo::default()
            .command_buffers(&command_buffers)
            .wait_semaphores(&wait)
            .wait_dst_stage_mask(&stages)
            .signal_semaphores(&signal);

        // SAFETY: recording has ended and every handle belongs to this device.
        unsafe {
            self.device
                .queue_submit(queue, &[submit_info], self.fence.handle())?;
        }
        self.in_flight = true;
        Ok(())
    }

    /// Begin `render_pass` on `framebuffer`, clearing the first attachment.
    pub fn begin_render_pass(
        &self,
        render_pass: &RenderPass,
        framebuffer: &FrameBuffer,
        clear_color: [f32; 4],
    ) -> Result<()> {
        self.ensure_recording()?;
        let render_pass = require_handle(render_pass.handle(), "render pass")?;
        let framebuffer_handle = require_handle(framebuffer.handle(), "framebuffer")?;

        let clear_values = [vk::ClearValue {
            color: vk::ClearColorValue {
                float32: clear_color,
            },
        }];
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(render_pass)
            .framebuffer(framebuffer_handle)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: framebuffer.extent(),
            })
            .clear_values(&clear_values);

        // SAFETY: the buffer is recording; handles were checked above.
        unsafe {
            self.device
                .cmd_begin_render_pass(self.handle, &begin_info, vk::SubpassContents::INLINE);
        }
        Ok(())
    }

    /// End the current render pass.
    pub fn end_render_pass(&self) -> Result<()> {
        self.ensure_recording()?;
        unsafe { self.device.cmd_end_render_pass(self.handle) };
        Ok(())
    }

    /// Bind a graphics pipeline.
    pub fn bind_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        self.ensure_recording()?;
        let pipeline = require_handle(pipeline.handle(), "pipeline")?;
        unsafe {
            self.device
                .cmd_bind_pipeline(self.handle, vk::PipelineBindPoint::GRAPHICS, pipeline);
        }
        Ok(())
    }

    /// Bind `buffer` as the vertex buffer at binding 0.
    pub fn bind_vertex_buffer(&self, buffer: &ResourceBuffer) -> Result<()> {
        self.ensure_recording()?;
        let buffer = require_handle(buffer.handle(), "vertex buffer")?;
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(self.handle, 0, &[buffer], &[0]);
        }
        Ok(())
    }

    /// Bind `buffer` as a 32-bit index buffer.
    pub fn bind_index_buffer(&self, buffer: &ResourceBuffer) -> Result<()> {
        self.ensure_recording()?;
        let buffer = require_handle(buffer.handle(), "index buffer")?;
        unsafe {
            self.device
                .cmd_bind_index_buffer(self.handle, buffer, 0, vk::IndexType::UINT32);
        }
        Ok(())
    }

    /// Bind one descriptor set at set index 0.
    pub fn bind_descriptor_set(&self, layout: &PipelineLayout, set: &DescriptorSet) -> Result<()> {
        self.ensure_recording()?;
        let layout = require_handle(layout.handle(), "pipeline layout")?;
        let set = require_handle(set.handle(), "descriptor set")?;
        unsafe {
            self.device.cmd_bind_descriptor_sets(
                self.handle,
                vk::PipelineBindPoint::GRAPHICS,
                layout,
                0,
                &[set],
                &[],
            );
        }
        Ok(())
    }

    /// Non-indexed draw.
    pub fn draw(&self, vertex_count: u32, instance_count: u32) -> Result<()> {
        self.ensure_recording()?;
        unsafe {
            self.device
                .cmd_draw(self.handle, vertex_count, instance_count, 0, 0);
        }
        Ok(())
    }

    /// Indexed draw using the bound index buffer.
    pub fn draw_indexed(&self, index_count: u32, instance_count: u32) -> Result<()> {
        self.ensure_recording()?;
        unsafe {
            self.device
                .cmd_draw_indexed(self.handle, index_count, instance_count, 0, 0, 0);
        }
        Ok(())
    }

    /// Set the dynamic viewport to cover `extent`.
    pub fn update_viewport(&self, extent: vk::Extent2D) -> Result<()> {
        self.ensure_recording()?;
        let viewport = vk::Viewport {
            x: 0.0,
            y: 0.0,
            width: extent.width as f32,
            height: extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        unsafe { self.device.cmd_set_viewport(self.handle, 0, &[viewport]) };
        Ok(())
    }

    /// Set the dynamic scissor to cover `extent`.
    pub fn update_scissor(&self, extent: vk::Extent2D) -> Result<()> {
        self.ensure_recording()?;
        let scissor = vk::Rect2D {
            offset: vk::Offset2D { x: 0, y: 0 },
            extent,
        };
        unsafe { self.device.cmd_set_scissor(self.handle, 0, &[scissor]) };
        Ok(())
    }

    /// Record an inline update of `buffer` at `offset`.
    ///
    /// Must be recorded outside a render pass.
    pub fn update_buffer<T: Pod>(
        &self,
        buffer: &ResourceBuffer,
        offset: vk::DeviceSize,
        data: &[T],
    ) -> Result<()> {
        self.ensure_recording()?;
        let buffer = require_handle(buffer.handle(), "update buffer")?;
        let bytes: &[u8] = bytemuck::cast_slice(data);
        check_inline_update(offset, bytes.len())?;
        unsafe {
            self.device
                .cmd_update_buffer(self.handle, buffer, offset, bytes);
        }
        Ok(())
    }

    fn ensure_recording(&self) -> Result<()> {
        if self.recording {
            Ok(())
        } else {
            Err(GpuError::InvalidState("command buffer is not recording".into()))
        }
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.free_command_buffers(self.pool, &[self.handle]);
        }
    }
}

/// Validate an inline buffer update against API limits.
fn check_inline_update(offset: vk::DeviceSize, len: usize) -> Result<()> {
    if len == 0 || len > MAX_INLINE_UPDATE {
        return Err(GpuError::Buffer(format!(
            "inline update of {len} bytes, expected 1..={MAX_INLINE_UPDATE}"
        )));
    }
    if len % 4 != 0 || offset % 4 != 0 {
        return Err(GpuError::Buffer(format!(
            "inline update at offset {offset} with {len} bytes is not 4-byte aligned"
        )));
    }
    Ok(())
}
