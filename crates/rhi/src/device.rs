//! Logical device, queues and the GPU memory allocator.
//!
//! The [`Device`] is shared through `Arc` by every GPU object so that an
//! object can destroy itself on drop. The device outlives all of them by
//! construction: each holds a strong reference.
//!
//! # Example
//!
//! ```no_run
//! use ash::vk;
//! use viewer_rhi::device::Device;
//! use viewer_rhi::instance::Instance;
//! use viewer_rhi::physical_device::select_physical_device;
//!
//! # fn example(instance: &Instance, surface: vk::SurfaceKHR) -> Result<(), viewer_rhi::RhiError> {
//! let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
//! let gpu = select_physical_device(instance.handle(), surface, &surface_loader)?;
//! let device = Device::new(instance, &gpu)?;
//!
//! let _graphics = device.graphics_queue();
//! device.wait_idle()?;
//! # Ok(())
//! # }
//! ```

use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};
use std::sync::Arc;

use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use tracing::{debug, info};

use crate::error::{RhiError, RhiResult};
use crate::instance::Instance;
use crate::physical_device::{PhysicalDeviceInfo, QueueFamilyIndices};

/// Device extensions every candidate GPU must support.
pub const DEVICE_EXTENSIONS: &[&std::ffi::CStr] = &[ash::khr::swapchain::NAME];

/// Vulkan logical device wrapper.
///
/// Owns the `VkDevice`, its graphics and present queues (possibly the same
/// queue) and a `gpu-allocator` instance behind a `Mutex`.
pub struct Device {
    device: ash::Device,
    /// Kept for format property queries after selection.
    instance: ash::Instance,
    physical_device: vk::PhysicalDevice,
    /// Dropped explicitly before the device is destroyed.
    allocator: ManuallyDrop<Mutex<Allocator>>,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    queue_families: QueueFamilyIndices,
    msaa_samples: vk::SampleCountFlags,
    max_sampler_anisotropy: f32,
}

impl Device {
    /// Creates the logical device for a selected GPU.
    ///
    /// Enables `VK_KHR_swapchain` and the `samplerAnisotropy` and
    /// `sampleRateShading` features, then initializes the allocator.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the queue family indices are incomplete
    /// - device creation fails
    /// - allocator initialization fails
    pub fn new(instance: &Instance, gpu: &PhysicalDeviceInfo) -> RhiResult<Arc<Self>> {
        let queue_families = gpu.queue_families;
        let (Some(graphics_family), Some(present_family)) =
            (queue_families.graphics_family, queue_families.present_family)
        else {
            return Err(RhiError::NoSuitableGpu);
        };

        let unique_families = queue_families.unique_families();
        let queue_priorities = [1.0f32];

        let queue_create_infos: Vec<vk::DeviceQueueCreateInfo> = unique_families
            .iter()
            .map(|&family| {
                vk::DeviceQueueCreateInfo::default()
                    .queue_family_index(family)
                    .queue_priorities(&queue_priorities)
            })
            .collect();

        debug!(
            "Creating {} queue(s) for families: {:?}",
            queue_create_infos.len(),
            unique_families
        );

        let features = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(true)
            .sample_rate_shading(true);

        let extension_names: Vec<*const std::ffi::c_char> =
            DEVICE_EXTENSIONS.iter().map(|ext| ext.as_ptr()).collect();

        let create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_names)
            .enabled_features(&features);

        let device = unsafe {
            instance
                .handle()
                .create_device(gpu.device, &create_info, None)?
        };

        info!(
            "Logical device created with {} extension(s)",
            DEVICE_EXTENSIONS.len()
        );

        let graphics_queue = unsafe { device.get_device_queue(graphics_family, 0) };
        let present_queue = unsafe { device.get_device_queue(present_family, 0) };
        debug!(
            "Queues retrieved (graphics family {}, present family {})",
            graphics_family, present_family
        );

        let allocator = match Allocator::new(&AllocatorCreateDesc {
            instance: instance.handle().clone(),
            device: device.clone(),
            physical_device: gpu.device,
            debug_settings: Default::default(),
            buffer_device_address: false,
            allocation_sizes: Default::default(),
        }) {
            Ok(allocator) => allocator,
            Err(e) => {
                unsafe { device.destroy_device(None) };
                return Err(e.into());
            }
        };

        info!("GPU memory allocator initialized");

        Ok(Arc::new(Self {
            device,
            instance: instance.handle().clone(),
            physical_device: gpu.device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            present_queue,
            queue_families,
            msaa_samples: gpu.msaa_samples,
            max_sampler_anisotropy: gpu.max_sampler_anisotropy(),
        }))
    }

    #[inline]
    pub fn handle(&self) -> &ash::Device {
        &self.device
    }

    #[inline]
    pub fn instance(&self) -> &ash::Instance {
        &self.instance
    }

    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    #[inline]
    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    /// May be the same handle as [`graphics_queue`](Self::graphics_queue).
    #[inline]
    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    #[inline]
    pub fn queue_families(&self) -> &QueueFamilyIndices {
        &self.queue_families
    }

    /// Sample count used for the color and depth render targets.
    #[inline]
    pub fn msaa_samples(&self) -> vk::SampleCountFlags {
        self.msaa_samples
    }

    #[inline]
    pub fn max_sampler_anisotropy(&self) -> f32 {
        self.max_sampler_anisotropy
    }

    /// Locks the allocator.
    ///
    /// # Errors
    ///
    /// [`RhiError::AllocatorPoisoned`] if a thread panicked while holding it.
    pub fn allocator(&self) -> RhiResult<MutexGuard<'_, Allocator>> {
        self.allocator
            .lock()
            .map_err(|_| RhiError::AllocatorPoisoned)
    }

    /// Format properties of `format` on this device's GPU.
    pub fn format_properties(&self, format: vk::Format) -> vk::FormatProperties {
        unsafe {
            self.instance
                .get_physical_device_format_properties(self.physical_device, format)
        }
    }

    /// Blocks until all queues are idle.
    pub fn wait_idle(&self) -> RhiResult<()> {
        unsafe { self.device.device_wait_idle()? };
        Ok(())
    }

    /// Submits work to the graphics queue.
    ///
    /// # Safety
    ///
    /// - every command buffer in `submit_infos` is fully recorded
    /// - `fence`, if not null, is unsignaled and not used by another submission
    /// - all referenced semaphores follow binary-semaphore signal/wait pairing
    pub unsafe fn submit_graphics(
        &self,
        submit_infos: &[vk::SubmitInfo],
        fence: vk::Fence,
    ) -> RhiResult<()> {
        unsafe {
            self.device
                .queue_submit(self.graphics_queue, submit_infos, fence)?;
        }
        Ok(())
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        unsafe {
            if let Err(e) = self.device.device_wait_idle() {
                tracing::error!("Failed to wait for device idle during drop: {:?}", e);
            }

            // The allocator frees its memory blocks through the device.
            ManuallyDrop::drop(&mut self.allocator);

            self.device.destroy_device(None);
        }
        info!("Logical device destroyed");
    }
}

// SAFETY: the ash function tables and handles are plain data; the allocator
// is only reached through its Mutex.
unsafe impl Send for Device {}
unsafe impl Sync for Device {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_extensions_defined() {
        assert_eq!(DEVICE_EXTENSIONS, &[ash::khr::swapchain::NAME]);
    }

    #[test]
    fn test_device_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Device>();
    }
}
