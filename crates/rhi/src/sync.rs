//! Synchronization primitives.
//!
//! - [`Semaphore`] orders GPU work against GPU work (acquire -> render -> present).
//! - [`Fence`] lets the host wait for GPU completion.
//!
//! Both are owned wrappers that destroy their handle on drop. The caller is
//! responsible for making sure no pending queue operation still references a
//! primitive when it is dropped; the renderer guarantees this with a
//! device-idle wait before tearing down its frame ring.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use viewer_rhi::device::Device;
//! use viewer_rhi::sync::{Fence, Semaphore};
//!
//! # fn example(device: Arc<Device>) -> Result<(), viewer_rhi::RhiError> {
//! let image_acquired = Semaphore::new(device.clone())?;
//! let in_flight = Fence::new(device.clone(), true)?;
//!
//! // Block until the previous submission guarded by this fence completed.
//! in_flight.wait(u64::MAX)?;
//! in_flight.reset()?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use crate::device::Device;
use crate::error::RhiResult;

/// Binary semaphore for GPU-to-GPU ordering.
pub struct Semaphore {
    device: Arc<Device>,
    semaphore: vk::Semaphore,
}

impl Semaphore {
    /// Creates an unsignaled semaphore.
    ///
    /// # Errors
    ///
    /// Returns an error if semaphore creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let create_info = vk::SemaphoreCreateInfo::default();

        let semaphore = unsafe { device.handle().create_semaphore(&create_info, None)? };

        debug!("Created semaphore");

        Ok(Self { device, semaphore })
    }

    #[inline]
    pub fn handle(&self) -> vk::Semaphore {
        self.semaphore
    }
}

impl Drop for Semaphore {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_semaphore(self.semaphore, None);
        }
        debug!("Destroyed semaphore");
    }
}

/// Host-visible completion guard.
///
/// A fence is signaled by a queue submission and waited on by the CPU before
/// it reuses anything that submission referenced.
pub struct Fence {
    device: Arc<Device>,
    fence: vk::Fence,
}

impl Fence {
    /// Creates a new fence.
    ///
    /// A fence created `signaled` lets the first wait return immediately,
    /// which is what a frame slot that has never been submitted needs.
    ///
    /// # Errors
    ///
    /// Returns an error if fence creation fails.
    pub fn new(device: Arc<Device>, signaled: bool) -> RhiResult<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };

        let create_info = vk::FenceCreateInfo::default().flags(flags);

        let fence = unsafe { device.handle().create_fence(&create_info, None)? };

        debug!(
            "Created fence ({})",
            if signaled { "signaled" } else { "unsignaled" }
        );

        Ok(Self { device, fence })
    }

    #[inline]
    pub fn handle(&self) -> vk::Fence {
        self.fence
    }

    /// Blocks until the fence is signaled or `timeout` nanoseconds pass.
    ///
    /// Returns `Ok(true)` when signaled and `Ok(false)` on timeout, so callers
    /// using a finite timeout can decide whether to retry or give up.
    ///
    /// # Errors
    ///
    /// Any result other than success or timeout, e.g. `ERROR_DEVICE_LOST`.
    pub fn wait(&self, timeout: u64) -> RhiResult<bool> {
        let fences = [self.fence];
        match unsafe {
            self.device
                .handle()
                .wait_for_fences(&fences, true, timeout)
        } {
            Ok(()) => Ok(true),
            Err(vk::Result::TIMEOUT) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the fence to the unsignaled state.
    ///
    /// The fence must not be referenced by a pending submission.
    pub fn reset(&self) -> RhiResult<()> {
        let fences = [self.fence];
        unsafe { self.device.handle().reset_fences(&fences)? };
        Ok(())
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        unsafe {
            self.device.handle().destroy_fence(self.fence, None);
        }
        debug!("Destroyed fence");
    }
}
