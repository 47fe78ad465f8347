//! Descriptor layouts, pools and set updates.
//!
//! - [`DescriptorSetLayout`] describes the bindings a shader expects.
//! - [`DescriptorPool`] is sized from a layout's bindings and a set count, so
//!   every set the pool will ever hand out is accounted for up front.
//! - [`DescriptorWrites`] collects buffer and image writes for one set and
//!   flushes them in a single `vkUpdateDescriptorSets` call.
//!
//! Sets allocated from a pool are released when the pool is destroyed; they
//! are never freed individually.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ash::vk;
//! use viewer_rhi::device::Device;
//! use viewer_rhi::descriptor::{binding, DescriptorPool, DescriptorSetLayout, DescriptorWrites};
//!
//! # fn example(device: Arc<Device>, ubo: vk::Buffer) -> Result<(), viewer_rhi::RhiError> {
//! let bindings = [binding::uniform_buffer(0, vk::ShaderStageFlags::VERTEX)];
//! let layout = DescriptorSetLayout::new(device.clone(), &bindings)?;
//! let pool = DescriptorPool::for_layout(device.clone(), &layout, 3)?;
//! let sets = pool.allocate(&layout, 3)?;
//!
//! for set in sets {
//!     DescriptorWrites::new(set)
//!         .uniform_buffer(0, ubo, 64)
//!         .submit(&device);
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Single-descriptor layout binding constructors.
pub mod binding {
    use ash::vk;

    pub fn uniform_buffer(
        binding: u32,
        stages: vk::ShaderStageFlags,
    ) -> vk::DescriptorSetLayoutBinding<'static> {
        vk::DescriptorSetLayoutBinding::default()
            .binding(binding)
            .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
            .descriptor_count(1)
            .stage_flags(stages)
    }

    pub fn combined_image_sampler(
        binding: u32,
        stages: vk::ShaderStageFlags,
    ) -> vk::DescriptorSetLayoutBinding<'static> {
        vk::DescriptorSetLayoutBinding::default()
            .binding(binding)
            .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
            .descriptor_count(1)
            .stage_flags(stages)
    }
}

/// Computes pool sizes that cover `set_count` sets of the given bindings.
///
/// Descriptor types that appear in several bindings are merged into one
/// entry. Order follows first appearance.
pub fn pool_sizes(
    bindings: &[vk::DescriptorSetLayoutBinding<'_>],
    set_count: u32,
) -> Vec<vk::DescriptorPoolSize> {
    let mut sizes: Vec<vk::DescriptorPoolSize> = Vec::new();

    for b in bindings {
        let count = b.descriptor_count * set_count;
        match sizes.iter_mut().find(|s| s.ty == b.descriptor_type) {
            Some(size) => size.descriptor_count += count,
            None => sizes.push(
                vk::DescriptorPoolSize::default()
                    .ty(b.descriptor_type)
                    .descriptor_count(count),
            ),
        }
    }

    sizes
}

/// Descriptor set layout wrapper.
///
/// Keeps a copy of its bindings so that pools can be sized from it.
pub struct DescriptorSetLayout {
    device: Arc<Device>,
    layout: vk::DescriptorSetLayout,
    bindings: Vec<vk::DescriptorSetLayoutBinding<'static>>,
}

impl DescriptorSetLayout {
    /// Creates a layout from the given bindings.
    ///
    /// # Errors
    ///
    /// Returns an error if layout creation fails.
    pub fn new(
        device: Arc<Device>,
        bindings: &[vk::DescriptorSetLayoutBinding<'static>],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(bindings);

        let layout = unsafe {
            device
                .handle()
                .create_descriptor_set_layout(&create_info, None)?
        };

        debug!(
            "Created descriptor set layout with {} binding(s)",
            bindings.len()
        );

        Ok(Self {
            device,
            layout,
            bindings: bindings.to_vec(),
        })
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }

    #[inline]
    pub fn bindings(&self) -> &[vk::DescriptorSetLayoutBinding<'static>] {
        &self.bindings
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_set_layout(self.layout, None);
        }
        debug!("Destroyed descriptor set layout");
    }
}

/// Descriptor pool with a fixed set budget.
///
/// # Thread Safety
///
/// Allocation is not internally synchronized; the pool is owned by a single
/// renderer and only touched from the render thread.
pub struct DescriptorPool {
    device: Arc<Device>,
    pool: vk::DescriptorPool,
    max_sets: u32,
}

impl DescriptorPool {
    /// Creates a pool with explicit sizes.
    ///
    /// # Errors
    ///
    /// Returns an error if pool creation fails.
    pub fn new(
        device: Arc<Device>,
        max_sets: u32,
        pool_sizes: &[vk::DescriptorPoolSize],
    ) -> RhiResult<Self> {
        let create_info = vk::DescriptorPoolCreateInfo::default()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes);

        let pool = unsafe { device.handle().create_descriptor_pool(&create_info, None)? };

        debug!(
            "Created descriptor pool: max_sets={}, pool_sizes={}",
            max_sets,
            pool_sizes.len()
        );

        Ok(Self {
            device,
            pool,
            max_sets,
        })
    }

    /// Creates a pool holding exactly `set_count` sets of `layout`.
    pub fn for_layout(
        device: Arc<Device>,
        layout: &DescriptorSetLayout,
        set_count: u32,
    ) -> RhiResult<Self> {
        let sizes = pool_sizes(layout.bindings(), set_count);
        Self::new(device, set_count, &sizes)
    }

    /// Allocates `count` sets that all use `layout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool is exhausted.
    pub fn allocate(
        &self,
        layout: &DescriptorSetLayout,
        count: usize,
    ) -> RhiResult<Vec<vk::DescriptorSet>> {
        let layouts = vec![layout.handle(); count];
        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.pool)
            .set_layouts(&layouts);

        let sets = unsafe { self.device.handle().allocate_descriptor_sets(&alloc_info)? };

        debug!("Allocated {} descriptor set(s)", sets.len());

        Ok(sets)
    }

    #[inline]
    pub fn handle(&self) -> vk::DescriptorPool {
        self.pool
    }

    #[inline]
    pub fn max_sets(&self) -> u32 {
        self.max_sets
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_descriptor_pool(self.pool, None);
        }
        debug!("Destroyed descriptor pool");
    }
}

enum PendingWrite {
    Buffer(u32, vk::DescriptorBufferInfo),
    Image(u32, vk::DescriptorImageInfo),
}

/// Batched writes for one descriptor set.
pub struct DescriptorWrites {
    set: vk::DescriptorSet,
    pending: Vec<PendingWrite>,
}

impl DescriptorWrites {
    pub fn new(set: vk::DescriptorSet) -> Self {
        Self {
            set,
            pending: Vec::new(),
        }
    }

    /// Binds `range` bytes of `buffer` from offset 0.
    pub fn uniform_buffer(
        mut self,
        binding: u32,
        buffer: vk::Buffer,
        range: vk::DeviceSize,
    ) -> Self {
        let info = vk::DescriptorBufferInfo::default()
            .buffer(buffer)
            .offset(0)
            .range(range);
        self.pending.push(PendingWrite::Buffer(binding, info));
        self
    }

    /// Binds a sampled image in `SHADER_READ_ONLY_OPTIMAL`.
    pub fn combined_image_sampler(
        mut self,
        binding: u32,
        view: vk::ImageView,
        sampler: vk::Sampler,
    ) -> Self {
        let info = vk::DescriptorImageInfo::default()
            .sampler(sampler)
            .image_view(view)
            .image_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        self.pending.push(PendingWrite::Image(binding, info));
        self
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Flushes all pending writes.
    pub fn submit(self, device: &Device) {
        if self.pending.is_empty() {
            return;
        }

        // Infos must outlive the write structs that point at them.
        let infos: Vec<(u32, Option<[vk::DescriptorBufferInfo; 1]>, Option<[vk::DescriptorImageInfo; 1]>)> =
            self.pending
                .iter()
                .map(|w| match w {
                    PendingWrite::Buffer(b, info) => (*b, Some([*info]), None),
                    PendingWrite::Image(b, info) => (*b, None, Some([*info])),
                })
                .collect();

        let writes: Vec<vk::WriteDescriptorSet<'_>> = infos
            .iter()
            .map(|(binding, buffer, image)| {
                let write = vk::WriteDescriptorSet::default()
                    .dst_set(self.set)
                    .dst_binding(*binding)
                    .dst_array_element(0);
                match (buffer, image) {
                    (Some(buffer), _) => write
                        .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                        .buffer_info(buffer),
                    (None, Some(image)) => write
                        .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                        .image_info(image),
                    (None, None) => write,
                }
            })
            .collect();

        unsafe {
            device.handle().update_descriptor_sets(&writes, &[]);
        }

        debug!("Wrote {} descriptor(s) to set {:?}", writes.len(), self.set);
    }
}
