//! GPU buffer memory.

use std::sync::Arc;

use ash::vk;
use bytemuck::Pod;

use crate::context::RenderContext;
use crate::error::{GpuError, Result};

/// Index of the first memory type allowed by `type_filter` that has all of
/// `properties`.
pub fn find_memory_type(
    memory: &vk::PhysicalDeviceMemoryProperties,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> Option<u32> {
    memory
        .memory_types
        .iter()
        .take(memory.memory_type_count as usize)
        .enumerate()
        .find(|&(i, ty)| type_filter & (1 << i) != 0 && ty.property_flags.contains(properties))
        .map(|(i, _)| i as u32)
}

/// Parameters for [`ResourceBuffer::new`].
#[derive(Debug, Clone, Copy)]
pub struct BufferDesc {
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub memory_properties: vk::MemoryPropertyFlags,
}

impl BufferDesc {
    /// Host-visible, host-coherent buffer of `size` bytes.
    pub fn host_visible(size: vk::DeviceSize, usage: vk::BufferUsageFlags) -> Self {
        Self {
            size,
            usage,
            memory_properties: vk::MemoryPropertyFlags::HOST_VISIBLE
                | vk::MemoryPropertyFlags::HOST_COHERENT,
        }
    }
}

/// A buffer with its own dedicated memory allocation.
pub struct ResourceBuffer {
    device: Arc<ash::Device>,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    usage: vk::BufferUsageFlags,
}

impl ResourceBuffer {
    /// Create a buffer and bind freshly allocated memory to it.
    pub fn new(context: &RenderContext, desc: &BufferDesc) -> Result<Self> {
        if desc.size == 0 {
            return Err(GpuError::Buffer("buffer size must be non-zero".into()));
        }

        let device = context.device().clone();

        let buffer_info = vk::BufferCreateInfo::default()
            .size(desc.size)
            .usage(desc.usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        // SAFETY: the device is alive for as long as the Arc is held.
        let buffer = unsafe { device.create_buffer(&buffer_info, None) }
            .map_err(|e| GpuError::Buffer(format!("create failed: {e}")))?;

        let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_properties = context.memory_properties();

        let Some(memory_type) = find_memory_type(
            &memory_properties,
            requirements.memory_type_bits,
            desc.memory_properties,
        ) else {
            unsafe { device.destroy_buffer(buffer, None) };
            return Err(GpuError::NoSuitableMemoryType {
                type_filter: requirements.memory_type_bits,
                properties: desc.memory_properties,
            });
        };

        let alloc_info = vk::MemoryAllocateInfo::default()
            .allocation_size(requirements.size)
            .memory_type_index(memory_type);

        let memory = match unsafe { device.allocate_memory(&alloc_info, None) } {
            Ok(memory) => memory,
            Err(e) => {
                unsafe { device.destroy_buffer(buffer, None) };
                return Err(GpuError::Buffer(format!("allocation failed: {e}")));
            }
        };

        if let Err(e) = unsafe { device.bind_buffer_memory(buffer, memory, 0) } {
            unsafe {
                device.destroy_buffer(buffer, None);
                device.free_memory(memory, None);
            }
            return Err(GpuError::Buffer(format!("bind failed: {e}")));
        }

        tracing::debug!(size = desc.size, usage = ?desc.usage, memory_type, "Buffer created");

        Ok(Self {
            device,
            buffer,
            memory,
            size: desc.size,
            usage: desc.usage,
        })
    }

    /// Create a host-visible buffer and fill it with `data`.
    pub fn with_data<T: Pod>(
        context: &RenderContext,
        usage: vk::BufferUsageFlags,
        data: &[T],
    ) -> Result<Self> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        let buffer = Self::new(context, &BufferDesc::host_visible(bytes.len() as u64, usage))?;
        buffer.write(0, data)?;
        Ok(buffer)
    }

    /// Raw buffer handle.
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Size in bytes.
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Usage flags the buffer was created with.
    pub fn usage(&self) -> vk::BufferUsageFlags {
        self.usage
    }

    /// Copy `data` into the buffer at `offset` through a temporary mapping.
    ///
    /// The buffer must be host-visible and host-coherent.
    pub fn write<T: Pod>(&self, offset: vk::DeviceSize, data: &[T]) -> Result<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);

        let end = offset
            .checked_add(bytes.len() as u64)
            .ok_or_else(|| GpuError::Buffer("offset overflow".into()))?;
        if end > self.size {
            return Err(GpuError::Buffer(format!(
                "write of {} bytes at {offset} exceeds buffer size {}",
                bytes.len(),
                self.size
            )));
        }
        if bytes.is_empty() {
            return Ok(());
        }

        // SAFETY: the range was checked against the buffer size and the
        // memory is host-visible by construction of the descriptor.
        unsafe {
            let ptr = self.device.map_memory(
                self.memory,
                offset,
                bytes.len() as u64,
                vk::MemoryMapFlags::empty(),
            )?;
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            self.device.unmap_memory(self.memory);
        }

        Ok(())
    }
}

impl Drop for ResourceBuffer {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut props = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (slot, &flags) in props.memory_types.iter_mut().zip(types) {
            slot.property_flags = flags;
        }
        props
    }

    const HOST: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
        vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw()
            | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
    );

    #[test]
    fn first_matching_type_wins() {
        let props = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            HOST,
            HOST | vk::MemoryPropertyFlags::HOST_CACHED,
        ]);
        assert_eq!(find_memory_type(&props, 0b111, HOST), Some(1));
    }

    #[test]
    fn type_filter_excludes_types() {
        let props = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            HOST,
            HOST | vk::MemoryPropertyFlags::HOST_CACHED,
        ]);
        assert_eq!(find_memory_type(&props, 0b100, HOST), Some(2));
        assert_eq!(find_memory_type(&props, 0b001, HOST), None);
    }

    #[test]
    fn types_past_the_count_are_ignored() {
        let mut props = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        props.memory_types[1].property_flags = HOST;
        assert_eq!(find_memory_type(&props, u32::MAX, HOST), None);
    }

    #[test]
    fn host_visible_desc_is_coherent() {
        let desc = BufferDesc::host_visible(64, vk::BufferUsageFlags::UNIFORM_BUFFER);
        assert_eq!(desc.memory_properties, HOST);
        assert_eq!(desc.size, 64);
    }
}
