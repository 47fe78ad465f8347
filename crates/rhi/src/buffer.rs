//! GPU buffers.
//!
//! A [`BufferSpec`] describes a buffer declaratively (usage flags, memory
//! location, sharing mode). A [`Buffer`] owns the resulting `VkBuffer`
//! together with its `gpu-allocator` allocation and size, and releases both
//! in one step on drop.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use viewer_rhi::buffer::{Buffer, BufferSpec};
//! use viewer_rhi::command::CommandPool;
//! use viewer_rhi::device::Device;
//!
//! # fn example(device: Arc<Device>, pool: &CommandPool) -> Result<(), viewer_rhi::RhiError> {
//! let indices: [u32; 3] = [0, 1, 2];
//! let bytes: &[u8] = bytemuck::cast_slice(&indices);
//!
//! // Device-local, filled through a staging buffer.
//! let index_buffer = Buffer::new_device_local(
//!     device.clone(),
//!     pool,
//!     device.graphics_queue(),
//!     &BufferSpec::index(bytes.len() as u64),
//!     bytes,
//! )?;
//!
//! // Host-visible, written every frame.
//! let uniform = Buffer::new(device, &BufferSpec::uniform(64))?;
//! uniform.write(0, &[0u8; 64])?;
//! # let _ = index_buffer;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use gpu_allocator::MemoryLocation;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use tracing::debug;

use crate::command::CommandPool;
use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// Declarative description of a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferSpec {
    /// Debug name, used for allocator bookkeeping and logs.
    pub name: &'static str,
    pub size: vk::DeviceSize,
    pub usage: vk::BufferUsageFlags,
    pub location: MemoryLocation,
    pub sharing_mode: vk::SharingMode,
}

impl BufferSpec {
    pub fn new(
        name: &'static str,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        location: MemoryLocation,
    ) -> Self {
        Self {
            name,
            size,
            usage,
            location,
            sharing_mode: vk::SharingMode::EXCLUSIVE,
        }
    }

    /// Device-local vertex buffer filled by a transfer.
    pub fn vertex(size: vk::DeviceSize) -> Self {
        Self::new(
            "vertex",
            size,
            vk::BufferUsageFlags::VERTEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
        )
    }

    /// Device-local index buffer filled by a transfer.
    pub fn index(size: vk::DeviceSize) -> Self {
        Self::new(
            "index",
            size,
            vk::BufferUsageFlags::INDEX_BUFFER | vk::BufferUsageFlags::TRANSFER_DST,
            MemoryLocation::GpuOnly,
        )
    }

    /// Host-visible, coherent uniform buffer.
    pub fn uniform(size: vk::DeviceSize) -> Self {
        Self::new(
            "uniform",
            size,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            MemoryLocation::CpuToGpu,
        )
    }

    /// Host-visible transfer source.
    pub fn staging(size: vk::DeviceSize) -> Self {
        Self::new(
            "staging",
            size,
            vk::BufferUsageFlags::TRANSFER_SRC,
            MemoryLocation::CpuToGpu,
        )
    }

    pub fn with_sharing_mode(mut self, sharing_mode: vk::SharingMode) -> Self {
        self.sharing_mode = sharing_mode;
        self
    }

    /// Whether the CPU can write the buffer directly.
    pub fn is_host_visible(&self) -> bool {
        matches!(
            self.location,
            MemoryLocation::CpuToGpu | MemoryLocation::GpuToCpu
        )
    }
}

/// Buffer handle, backing allocation and size as one owned value.
pub struct Buffer {
    device: Arc<Device>,
    buffer: vk::Buffer,
    allocation: Option<Allocation>,
    size: vk::DeviceSize,
    name: &'static str,
}

impl Buffer {
    /// Creates a buffer and binds freshly allocated memory to it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `spec.size` is zero
    /// - buffer creation fails
    /// - no memory type satisfies `spec.location`
    pub fn new(device: Arc<Device>, spec: &BufferSpec) -> RhiResult<Self> {
        if spec.size == 0 {
            return Err(RhiError::OutOfBounds(format!(
                "{} buffer size must be greater than 0",
                spec.name
            )));
        }

        let buffer_info = vk::BufferCreateInfo::default()
            .size(spec.size)
            .usage(spec.usage)
            .sharing_mode(spec.sharing_mode);

        let buffer = unsafe { device.handle().create_buffer(&buffer_info, None)? };
        let requirements = unsafe { device.handle().get_buffer_memory_requirements(buffer) };

        let allocation = device.allocator().and_then(|mut allocator| {
            Ok(allocator.allocate(&AllocationCreateDesc {
                name: spec.name,
                requirements,
                location: spec.location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            })?)
        });

        // Construct first so Drop releases the buffer if binding fails.
        let mut this = Self {
            device,
            buffer,
            allocation: None,
            size: spec.size,
            name: spec.name,
        };
        let allocation = allocation?;
        let bind = unsafe {
            this.device
                .handle()
                .bind_buffer_memory(buffer, allocation.memory(), allocation.offset())
        };
        this.allocation = Some(allocation);
        bind?;

        debug!("Created {} buffer: {} bytes", spec.name, spec.size);

        Ok(this)
    }

    /// Creates a host-visible buffer holding `data`.
    pub fn with_data(device: Arc<Device>, spec: &BufferSpec, data: &[u8]) -> RhiResult<Self> {
        let buffer = Self::new(device, spec)?;
        buffer.write(0, data)?;
        Ok(buffer)
    }

    /// Creates a device-local buffer and fills it with `data` through a
    /// temporary staging buffer. Blocks until the copy has completed.
    pub fn new_device_local(
        device: Arc<Device>,
        pool: &CommandPool,
        queue: vk::Queue,
        spec: &BufferSpec,
        data: &[u8],
    ) -> RhiResult<Self> {
        let size = data.len() as vk::DeviceSize;
        let staging = Self::with_data(device.clone(), &BufferSpec::staging(size), data)?;
        let buffer = Self::new(device, &BufferSpec { size, ..*spec })?;

        pool.submit_one_time(queue, |cmd| {
            cmd.copy_buffer(
                staging.handle(),
                buffer.handle(),
                &[vk::BufferCopy::default().size(size)],
            );
            Ok(())
        })?;

        Ok(buffer)
    }

    /// Copies `data` into the mapped memory at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error if the write exceeds the buffer or the memory is not
    /// host-visible.
    pub fn write(&self, offset: vk::DeviceSize, data: &[u8]) -> RhiResult<()> {
        if data.is_empty() {
            return Ok(());
        }

        let end = offset.checked_add(data.len() as vk::DeviceSize);
        if end.is_none_or(|end| end > self.size) {
            return Err(RhiError::OutOfBounds(format!(
                "write of {} bytes at offset {} exceeds {} buffer of {} bytes",
                data.len(),
                offset,
                self.name,
                self.size
            )));
        }

        let mapped_ptr = self
            .allocation
            .as_ref()
            .and_then(Allocation::mapped_ptr)
            .ok_or_else(|| {
                RhiError::OutOfBounds(format!("{} buffer memory is not mapped", self.name))
            })?;

        // SAFETY: the range was bounds-checked above and the mapping stays
        // valid for the lifetime of the allocation.
        unsafe {
            let dst = mapped_ptr.as_ptr().cast::<u8>().add(offset as usize);
            std::ptr::copy_nonoverlapping(data.as_ptr(), dst, data.len());
        }

        Ok(())
    }

    /// Writes a plain-old-data value at offset 0.
    pub fn write_pod<T: bytemuck::Pod>(&self, value: &T) -> RhiResult<()> {
        self.write(0, bytemuck::bytes_of(value))
    }

    #[inline]
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    #[inline]
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_buffer(self.buffer, None);
        }

        if let Some(allocation) = self.allocation.take() {
            match self.device.allocator() {
                Ok(mut allocator) => {
                    if let Err(e) = allocator.free(allocation) {
                        tracing::error!("Failed to free {} buffer allocation: {:?}", self.name, e);
                    }
                }
                Err(e) => tracing::error!("Leaking {} buffer allocation: {}", self.name, e),
            }
        }

        debug!("Destroyed {} buffer", self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geometry_specs_are_device_local_transfer_targets() {
        for spec in [BufferSpec::vertex(64), BufferSpec::index(64)] {
            assert_eq!(spec.location, MemoryLocation::GpuOnly);
            assert!(spec.usage.contains(vk::BufferUsageFlags::TRANSFER_DST));
            assert!(!spec.is_host_visible());
        }
        assert!(
            BufferSpec::vertex(64)
                .usage
                .contains(vk::BufferUsageFlags::VERTEX_BUFFER)
        );
        assert!(
            BufferSpec::index(64)
                .usage
                .contains(vk::BufferUsageFlags::INDEX_BUFFER)
        );
    }

    #[test]
    fn test_uniform_and_staging_specs_are_host_visible() {
        let uniform = BufferSpec::uniform(128);
        assert!(uniform.is_host_visible());
        assert_eq!(uniform.usage, vk::BufferUsageFlags::UNIFORM_BUFFER);

        let staging = BufferSpec::staging(128);
        assert!(staging.is_host_visible());
        assert_eq!(staging.usage, vk::BufferUsageFlags::TRANSFER_SRC);
    }

    #[test]
    fn test_spec_defaults_to_exclusive_sharing() {
        let spec = BufferSpec::uniform(16);
        assert_eq!(spec.sharing_mode, vk::SharingMode::EXCLUSIVE);

        let shared = spec.with_sharing_mode(vk::SharingMode::CONCURRENT);
        assert_eq!(shared.sharing_mode, vk::SharingMode::CONCURRENT);
        assert_eq!(shared.size, 16);
    }
}
