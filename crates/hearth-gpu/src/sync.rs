//! Synchronization primitives.

use std::sync::Arc;

use ash::vk;

use crate::error::Result;

/// Owned `VkFence`, destroyed on drop.
///
/// A fence is the GPU → CPU signal: the GPU signals it when a submission
/// completes and the CPU waits on it.
pub struct Fence {
    device: Arc<ash::Device>,
    handle: vk::Fence,
}

impl Fence {
    /// Create a fence, optionally in the signaled state.
    pub fn new(device: Arc<ash::Device>, signaled: bool) -> Result<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::default().flags(flags);
        // SAFETY: the device is alive for as long as the Arc is held.
        let handle = unsafe { device.create_fence(&create_info, None)? };
        Ok(Self { device, handle })
    }

    /// Raw fence handle.
    pub fn handle(&self) -> vk::Fence {
        self.handle
    }

    /// Block until the fence is signaled or `timeout_ns` elapses.
    #[cfg_attr(feature = "profiling-tracy", tracing::instrument(level = "trace", skip_all))]
    pub fn wait(&self, timeout_ns: u64) -> Result<()> {
        // SAFETY: the fence belongs to this device.
        unsafe { self.device.wait_for_fences(&[self.handle], true, timeout_ns)? };
        Ok(())
    }

    /// Reset the fence to the unsignaled state.
    pub fn reset(&self) -> Result<()> {
        // SAFETY: the fence belongs to this device.
        unsafe { self.device.reset_fences(&[self.handle])? };
        Ok(())
    }

    /// Whether the fence is currently signaled, without blocking.
    pub fn is_signaled(&self) -> Result<bool> {
        // SAFETY: the fence belongs to this device.
        Ok(unsafe { self.device.get_fence_status(self.handle)? })
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        // SAFETY: owners guarantee the fence is no longer pending.
        unsafe { self.device.destroy_fence(self.handle, None) };
    }
}

/// Owned `VkSemaphore`, destroyed on drop. Orders queue operations on the GPU.
pub struct Semaphore {
    device: Arc<ash::Device>,
    handle: vk::Semaphore,
}

impl Semaphore {
    /// Create a binary semaphore.
    pub fn new(device: Arc<ash::Device>) -> Result<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();
        // SAFETY: the device is alive for as long as the Arc is held.
        let handle = unsafe { device.create_semaphore(&create_info, None)? };
        Ok(Self { device, handle })
    }

    /// Raw semaphore handle.
    pub fn handle(&self) -> vk::Semaphore {
        self.handle
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        // SAFETY: owners guarantee no queue operation still references it.
        unsafe { self.device.destroy_semaphore(self.handle, None) };
    }
}
