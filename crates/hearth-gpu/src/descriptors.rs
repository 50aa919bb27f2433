//! Descriptor set management.

use std::sync::Arc;

use ash::vk;

use crate::error::{require_handle, GpuError, Result};
use crate::memory::ResourceBuffer;

/// Owned `VkDescriptorSetLayout`.
pub struct DescriptorSetLayout {
    device: Arc<ash::Device>,
    handle: vk::DescriptorSetLayout,
}

impl DescriptorSetLayout {
    /// Raw layout handle.
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.handle
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_descriptor_set_layout(self.handle, None);
        }
    }
}

/// Descriptor set layout builder.
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding<'static>>,
}

impl DescriptorSetLayoutBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding.
    #[must_use]
    pub fn binding(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        count: u32,
        stage_flags: vk::ShaderStageFlags,
    ) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::default()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(count)
                .stage_flags(stage_flags),
        );
        self
    }

    /// Add a uniform buffer binding.
    #[must_use]
    pub fn uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.binding(binding, vk::DescriptorType::UNIFORM_BUFFER, 1, stage_flags)
    }

    /// Add a storage buffer binding.
    #[must_use]
    pub fn storage_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.binding(binding, vk::DescriptorType::STORAGE_BUFFER, 1, stage_flags)
    }

    /// Pool sizes covering one set with these bindings.
    pub fn pool_sizes(&self) -> Vec<vk::DescriptorPoolSize> {
        let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();
        for binding in &self.bindings {
            match sizes.iter_mut().find(|s| s.ty == binding.descriptor_type) {
                Some(size) => size.descriptor_count += binding.descriptor_count,
                None => sizes.push(
                    vk::DescriptorPoolSize::default()
                        .ty(binding.descriptor_type)
                        .descriptor_count(binding.descriptor_count),
                ),
            }
        }
        sizes
    }

    /// Build the descriptor set layout.
    pub fn build(&self, device: Arc<ash::Device>) -> Result<DescriptorSetLayout> {
        let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&self.bindings);

        // SAFETY: the device is alive for as long as the Arc is held.
        let handle = unsafe { device.create_descriptor_set_layout(&layout_info, None) }
            .map_err(|e| GpuError::DescriptorCreation(format!("set layout: {e}")))?;

        Ok(DescriptorSetLayout { device, handle })
    }
}

/// Descriptor pool for allocating descriptor sets.
pub struct DescriptorPool {
    device: Arc<ash::Device>,
    pool: vk::DescriptorPool,
}

impl DescriptorPool {
    /// Create a new descriptor pool whose sets can be freed individually.
    pub fn new(
        device: Arc<ash::Device>,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> Result<Self> {
        if max_sets == 0 || pool_sizes.is_empty() {
            return Err(GpuError::DescriptorCreation(
                "pool needs at least one set and one pool size".into(),
            ));
        }

        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes)
            .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET);

        // SAFETY: the device is alive for as long as the Arc is held.
        let pool = unsafe { device.create_descriptor_pool(&create_info, None) }
            .map_err(|e| GpuError::DescriptorCreation(format!("pool: {e}")))?;
        Ok(Self { device, pool })
    }

    /// Get the raw pool handle.
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

/// A buffer to bind into a descriptor set.
#[derive(Clone, Copy)]
pub struct BufferBinding<'a> {
    pub binding: u32,
    pub descriptor_type: vk::DescriptorType,
    pub buffer: &'a ResourceBuffer,
    pub offset: vk::DeviceSize,
    pub range: vk::DeviceSize,
}

impl<'a> BufferBinding<'a> {
    /// Bind the whole of `buffer` as a uniform buffer.
    pub fn uniform(binding: u32, buffer: &'a ResourceBuffer) -> Self {
        Self {
            binding,
            descriptor_type: vk::DescriptorType::UNIFORM_BUFFER,
            buffer,
            offset: 0,
            range: vk::WHOLE_SIZE,
        }
    }
}

/// A descriptor set allocated from a [`DescriptorPool`], freed on drop.
///
/// Must be dropped before its pool.
pub struct DescriptorSet {
    device: Arc<ash::Device>,
    pool: vk::DescriptorPool,
    handle: vk::DescriptorSet,
}

impl DescriptorSet {
    /// Allocate one set with `layout` from `pool`.
    pub fn new(
        device: Arc<ash::Device>,
        pool: &DescriptorPool,
        layout: &DescriptorSetLayout,
    ) -> Result<Self> {
        let pool_handle = require_handle(pool.handle(), "descriptor pool")?;
        let layouts = [require_handle(layout.handle(), "descriptor set layout")?];

        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(pool_handle)
            .set_layouts(&layouts);

        // SAFETY: pool and layout belong to this device.
        let sets = unsafe { device.allocate_descriptor_sets(&alloc_info) }
            .map_err(|e| GpuError::DescriptorCreation(format!("set allocation: {e}")))?;

        Ok(Self {
            device,
            pool: pool_handle,
            handle: sets[0],
        })
    }

    /// Raw set handle.
    pub fn handle(&self) -> vk::DescriptorSet {
        self.handle
    }

    /// Point the set's bindings at `buffers`.
    pub fn update_buffers(&self, buffers: &[BufferBinding<'_>]) -> Result<()> {
        let infos = buffers
            .iter()
            .map(|b| {
                Ok(vk::DescriptorBufferInfo::default()
                    .buffer(require_handle(b.buffer.handle(), "descriptor buffer")?)
                    .offset(b.offset)
                    .range(b.range))
            })
            .collect::<Result<Vec<_>>>()?;

        let writes: Vec<vk::WriteDescriptorSet> = buffers
            .iter()
            .zip(&infos)
            .map(|(b, info)| {
                vk::WriteDescriptorSet::default()
                    .dst_set(self.handle)
                    .dst_binding(b.binding)
                    .descriptor_type(b.descriptor_type)
                    .buffer_info(std::slice::from_ref(info))
            })
            .collect();

        // SAFETY: the set and buffers belong to this device.
        unsafe { self.device.update_descriptor_sets(&writes, &[]) };
        Ok(())
    }
}

impl Drop for DescriptorSet {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            let _ = self.device.free_descriptor_sets(self.pool, &[self.handle]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_sizes_merge_by_type() {
        let builder = DescriptorSetLayoutBuilder::new()
            .uniform_buffer(0, vk::ShaderStageFlags::VERTEX)
            .storage_buffer(1, vk::ShaderStageFlags::FRAGMENT)
            .uniform_buffer(2, vk::ShaderStageFlags::FRAGMENT);

        let sizes = builder.pool_sizes();
        assert_eq!(sizes.len(), 2);

        let uniform = sizes
            .iter()
            .find(|s| s.ty == vk::DescriptorType::UNIFORM_BUFFER)
            .unwrap();
        assert_eq!(uniform.descriptor_count, 2);

        let storage = sizes
            .iter()
            .find(|s| s.ty == vk::DescriptorType::STORAGE_BUFFER)
            .unwrap();
        assert_eq!(storage.descriptor_count, 1);
    }

    #[test]
    fn empty_builder_has_no_pool_sizes() {
        assert!(DescriptorSetLayoutBuilder::new().pool_sizes().is_empty());
    }
}
