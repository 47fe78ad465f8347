//! Swapchain management.
//!
//! A [`Swapchain`] owns the `VkSwapchainKHR` and one view per presentable
//! image. It is never modified in place: when the surface changes the owner
//! drops it and builds a new one from freshly queried capabilities.
//!
//! Acquire and present report surface staleness through [`AcquireOutcome`]
//! and [`SurfaceStatus`] rather than as errors. Only results other than
//! success, `SUBOPTIMAL_KHR` and `ERROR_OUT_OF_DATE_KHR` become
//! [`RhiError`]s.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use ash::vk;
//! use viewer_rhi::device::Device;
//! use viewer_rhi::swapchain::{AcquireOutcome, Swapchain};
//!
//! # fn example(
//! #     device: Arc<Device>,
//! #     surface: vk::SurfaceKHR,
//! #     surface_loader: &ash::khr::surface::Instance,
//! #     image_acquired: vk::Semaphore,
//! # ) -> Result<(), viewer_rhi::RhiError> {
//! let swapchain = Swapchain::new(device, surface, surface_loader, vk::Extent2D { width: 800, height: 800 })?;
//!
//! match swapchain.acquire_next_image(image_acquired, u64::MAX)? {
//!     AcquireOutcome::Acquired { image_index, suboptimal } => {
//!         // record and submit for `image_index`; rebuild after presenting if `suboptimal`
//! #       let _ = (image_index, suboptimal);
//!     }
//!     AcquireOutcome::OutOfDate => {
//!         // skip the frame and rebuild
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use ash::vk;
use tracing::{debug, info, warn};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};
use crate::image::create_image_view;

/// What the surface supports for swapchain creation.
#[derive(Debug, Clone)]
pub struct SwapchainSupportDetails {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

impl SwapchainSupportDetails {
    /// Queries swapchain support for a physical device and surface.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the surface queries fail.
    pub fn query(
        physical_device: vk::PhysicalDevice,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
    ) -> RhiResult<Self> {
        let capabilities = unsafe {
            surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?
        };

        let formats = unsafe {
            surface_loader.get_physical_device_surface_formats(physical_device, surface)?
        };

        let present_modes = unsafe {
            surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?
        };

        debug!(
            "Swapchain support: {} formats, {} present modes, image count {}..{}",
            formats.len(),
            present_modes.len(),
            capabilities.min_image_count,
            capabilities.max_image_count
        );

        Ok(Self {
            capabilities,
            formats,
            present_modes,
        })
    }

    /// At least one format and one present mode are available.
    #[inline]
    pub fn is_adequate(&self) -> bool {
        !self.formats.is_empty() && !self.present_modes.is_empty()
    }
}

/// Whether the swapchain still matches the surface after a present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceStatus {
    /// Presented and still matches the surface.
    Optimal,
    /// Presented, but should be rebuilt.
    Suboptimal,
    /// Can no longer present; must be rebuilt.
    OutOfDate,
}

impl SurfaceStatus {
    #[inline]
    pub fn needs_rebuild(self) -> bool {
        self != SurfaceStatus::Optimal
    }
}

/// Result of asking the presentation engine for an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// An image was acquired. The image-acquired semaphore will be signaled.
    Acquired { image_index: u32, suboptimal: bool },
    /// No image was acquired; nothing was signaled.
    OutOfDate,
}

/// Maps a raw acquire result onto [`AcquireOutcome`].
///
/// # Errors
///
/// Any result other than success, suboptimal or out-of-date, including
/// `TIMEOUT` and `NOT_READY`.
pub fn classify_acquire(result: Result<(u32, bool), vk::Result>) -> RhiResult<AcquireOutcome> {
    match result {
        Ok((image_index, suboptimal)) => Ok(AcquireOutcome::Acquired {
            image_index,
            suboptimal,
        }),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(AcquireOutcome::OutOfDate),
        Err(e) => Err(e.into()),
    }
}

/// Maps a raw present result onto [`SurfaceStatus`].
///
/// # Errors
///
/// Any result other than success, suboptimal or out-of-date.
pub fn classify_present(result: Result<bool, vk::Result>) -> RhiResult<SurfaceStatus> {
    match result {
        Ok(false) => Ok(SurfaceStatus::Optimal),
        Ok(true) => Ok(SurfaceStatus::Suboptimal),
        Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(SurfaceStatus::OutOfDate),
        Err(e) => Err(e.into()),
    }
}

/// Swapchain plus one color view per presentable image.
///
/// The images belong to the presentation engine; only the views are
/// destroyed here.
pub struct Swapchain {
    device: Arc<Device>,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: vk::Format,
    color_space: vk::ColorSpaceKHR,
    extent: vk::Extent2D,
    present_mode: vk::PresentModeKHR,
}

impl Swapchain {
    /// Creates a swapchain for `surface`.
    ///
    /// Capabilities, format and present mode are queried fresh on every call.
    /// `requested_extent` is only used when the surface leaves the extent to
    /// the application.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the chosen extent is zero in either dimension
    /// - the surface reports no formats or present modes
    /// - swapchain or image view creation fails
    pub fn new(
        device: Arc<Device>,
        surface: vk::SurfaceKHR,
        surface_loader: &ash::khr::surface::Instance,
        requested_extent: vk::Extent2D,
    ) -> RhiResult<Self> {
        let support =
            SwapchainSupportDetails::query(device.physical_device(), surface, surface_loader)?;

        if !support.is_adequate() {
            return Err(RhiError::Swapchain(
                "Inadequate swapchain support (no formats or present modes)".to_string(),
            ));
        }

        let surface_format = choose_surface_format(&support.formats);
        let present_mode = choose_present_mode(&support.present_modes);
        let extent = choose_extent(&support.capabilities, requested_extent);
        if extent.width == 0 || extent.height == 0 {
            return Err(RhiError::Swapchain(format!(
                "Refusing to create a {}x{} swapchain",
                extent.width, extent.height
            )));
        }
        let image_count = determine_image_count(&support.capabilities);

        let queue_families = device.queue_families();
        let (Some(graphics_family), Some(present_family)) =
            (queue_families.graphics_family, queue_families.present_family)
        else {
            return Err(RhiError::NoSuitableGpu);
        };
        let family_indices = [graphics_family, present_family];

        let (sharing_mode, family_indices) = if graphics_family != present_family {
            (vk::SharingMode::CONCURRENT, &family_indices[..])
        } else {
            (vk::SharingMode::EXCLUSIVE, &[][..])
        };

        let create_info = vk::SwapchainCreateInfoKHR::default()
            .surface(surface)
            .min_image_count(image_count)
            .image_format(surface_format.format)
            .image_color_space(surface_format.color_space)
            .image_extent(extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT)
            .image_sharing_mode(sharing_mode)
            .queue_family_indices(family_indices)
            .pre_transform(support.capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(present_mode)
            .clipped(true);

        let swapchain_loader = ash::khr::swapchain::Device::new(device.instance(), device.handle());
        let swapchain = unsafe { swapchain_loader.create_swapchain(&create_info, None)? };

        // From here on `Drop` cleans up whatever has been created.
        let mut this = Self {
            device,
            swapchain_loader,
            swapchain,
            images: Vec::new(),
            image_views: Vec::new(),
            format: surface_format.format,
            color_space: surface_format.color_space,
            extent,
            present_mode,
        };

        this.images = unsafe { this.swapchain_loader.get_swapchain_images(swapchain)? };
        for &image in &this.images {
            let view = create_image_view(
                &this.device,
                image,
                this.format,
                vk::ImageAspectFlags::COLOR,
                1,
            )?;
            this.image_views.push(view);
        }

        info!(
            "Swapchain created: {}x{}, {:?}, {:?}, {} images",
            extent.width,
            extent.height,
            surface_format.format,
            present_mode,
            this.images.len()
        );

        Ok(this)
    }

    /// Requests the next presentable image.
    ///
    /// `image_acquired` is signaled when the image is ready to be written.
    ///
    /// # Errors
    ///
    /// See [`classify_acquire`].
    pub fn acquire_next_image(
        &self,
        image_acquired: vk::Semaphore,
        timeout: u64,
    ) -> RhiResult<AcquireOutcome> {
        classify_acquire(unsafe {
            self.swapchain_loader.acquire_next_image(
                self.swapchain,
                timeout,
                image_acquired,
                vk::Fence::null(),
            )
        })
    }

    /// Queues `image_index` for presentation once `render_finished` signals.
    ///
    /// # Errors
    ///
    /// See [`classify_present`].
    pub fn present(
        &self,
        queue: vk::Queue,
        image_index: u32,
        render_finished: vk::Semaphore,
    ) -> RhiResult<SurfaceStatus> {
        let swapchains = [self.swapchain];
        let image_indices = [image_index];
        let wait_semaphores = [render_finished];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);

        classify_present(unsafe { self.swapchain_loader.queue_present(queue, &present_info) })
    }

    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }

    #[inline]
    pub fn format(&self) -> vk::Format {
        self.format
    }

    #[inline]
    pub fn color_space(&self) -> vk::ColorSpaceKHR {
        self.color_space
    }

    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.extent
    }

    #[inline]
    pub fn present_mode(&self) -> vk::PresentModeKHR {
        self.present_mode
    }

    #[inline]
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    #[inline]
    pub fn image_views(&self) -> &[vk::ImageView] {
        &self.image_views
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        unsafe {
            for &view in &self.image_views {
                self.device.handle().destroy_image_view(view, None);
            }
            self.swapchain_loader
                .destroy_swapchain(self.swapchain, None);
        }

        info!(
            "Swapchain destroyed (was {}x{}, {} images)",
            self.extent.width,
            self.extent.height,
            self.images.len()
        );
    }
}

/// Prefers `B8G8R8A8_SRGB`/`SRGB_NONLINEAR`, then the UNORM variant, then
/// whatever the surface lists first.
pub fn choose_surface_format(formats: &[vk::SurfaceFormatKHR]) -> vk::SurfaceFormatKHR {
    let find = |format: vk::Format| {
        formats
            .iter()
            .copied()
            .find(|f| f.format == format && f.color_space == vk::ColorSpaceKHR::SRGB_NONLINEAR)
    };

    if let Some(format) = find(vk::Format::B8G8R8A8_SRGB) {
        return format;
    }
    if let Some(format) = find(vk::Format::B8G8R8A8_UNORM) {
        warn!("Using fallback surface format: B8G8R8A8_UNORM");
        return format;
    }

    let first = formats.first().copied().unwrap_or_default();
    warn!("Using first available surface format: {:?}", first.format);
    first
}

/// MAILBOX when offered, otherwise FIFO (always available).
pub fn choose_present_mode(present_modes: &[vk::PresentModeKHR]) -> vk::PresentModeKHR {
    if present_modes.contains(&vk::PresentModeKHR::MAILBOX) {
        vk::PresentModeKHR::MAILBOX
    } else {
        vk::PresentModeKHR::FIFO
    }
}

/// Uses the surface's current extent when it is defined; otherwise clamps
/// each axis of `requested` against that axis's own bounds.
pub fn choose_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    requested: vk::Extent2D,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }

    vk::Extent2D {
        width: requested.width.clamp(
            capabilities.min_image_extent.width,
            capabilities.max_image_extent.width,
        ),
        height: requested.height.clamp(
            capabilities.min_image_extent.height,
            capabilities.max_image_extent.height,
        ),
    }
}

/// One more than the minimum, capped by the maximum (0 means unbounded).
pub fn determine_image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let preferred = capabilities.min_image_count + 1;

    if capabilities.max_image_count > 0 {
        preferred.min(capabilities.max_image_count)
    } else {
        preferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn test_choose_surface_format_prefers_srgb() {
        let formats = [
            surface_format(vk::Format::R8G8B8A8_UNORM),
            surface_format(vk::Format::B8G8R8A8_UNORM),
            surface_format(vk::Format::B8G8R8A8_SRGB),
        ];
        assert_eq!(
            choose_surface_format(&formats).format,
            vk::Format::B8G8R8A8_SRGB
        );
    }

    #[test]
    fn test_choose_surface_format_fallbacks() {
        let formats = [
            surface_format(vk::Format::R8G8B8A8_UNORM),
            surface_format(vk::Format::B8G8R8A8_UNORM),
        ];
        assert_eq!(
            choose_surface_format(&formats).format,
            vk::Format::B8G8R8A8_UNORM
        );

        let formats = [surface_format(vk::Format::R8G8B8A8_UNORM)];
        assert_eq!(
            choose_surface_format(&formats).format,
            vk::Format::R8G8B8A8_UNORM
        );
    }

    #[test]
    fn test_choose_present_mode() {
        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::MAILBOX);

        let modes = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE];
        assert_eq!(choose_present_mode(&modes), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_choose_extent_uses_current() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: extent(1920, 1080),
            min_image_extent: extent(1, 1),
            max_image_extent: extent(4096, 4096),
            ..Default::default()
        };
        assert_eq!(
            choose_extent(&capabilities, extent(800, 600)),
            extent(1920, 1080)
        );
    }

    #[test]
    fn test_choose_extent_clamps_each_axis_independently() {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            current_extent: extent(u32::MAX, u32::MAX),
            min_image_extent: extent(100, 50),
            max_image_extent: extent(2000, 1000),
            ..Default::default()
        };

        // Height must respect its own maximum, not the width's.
        assert_eq!(
            choose_extent(&capabilities, extent(1500, 1500)),
            extent(1500, 1000)
        );
        assert_eq!(
            choose_extent(&capabilities, extent(3000, 20)),
            extent(2000, 50)
        );
        assert_eq!(
            choose_extent(&capabilities, extent(800, 600)),
            extent(800, 600)
        );
    }

    #[test]
    fn test_determine_image_count() {
        let capped = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 2,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&capped), 2);

        let unbounded = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(determine_image_count(&unbounded), 3);
    }

    #[test]
    fn test_swapchain_support_details_is_adequate() {
        let details = |formats: Vec<vk::SurfaceFormatKHR>, modes: Vec<vk::PresentModeKHR>| {
            SwapchainSupportDetails {
                capabilities: vk::SurfaceCapabilitiesKHR::default(),
                formats,
                present_modes: modes,
            }
        };

        assert!(details(vec![Default::default()], vec![vk::PresentModeKHR::FIFO]).is_adequate());
        assert!(!details(vec![], vec![vk::PresentModeKHR::FIFO]).is_adequate());
        assert!(!details(vec![Default::default()], vec![]).is_adequate());
    }

    #[test]
    fn test_classify_acquire() {
        assert_eq!(
            classify_acquire(Ok((2, false))).unwrap(),
            AcquireOutcome::Acquired {
                image_index: 2,
                suboptimal: false
            }
        );
        assert_eq!(
            classify_acquire(Ok((0, true))).unwrap(),
            AcquireOutcome::Acquired {
                image_index: 0,
                suboptimal: true
            }
        );
        assert_eq!(
            classify_acquire(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            AcquireOutcome::OutOfDate
        );
        assert!(matches!(
            classify_acquire(Err(vk::Result::ERROR_DEVICE_LOST)),
            Err(RhiError::Vulkan(vk::Result::ERROR_DEVICE_LOST))
        ));
        assert!(classify_acquire(Err(vk::Result::TIMEOUT)).is_err());
    }

    #[test]
    fn test_classify_present() {
        assert_eq!(classify_present(Ok(false)).unwrap(), SurfaceStatus::Optimal);
        assert_eq!(
            classify_present(Ok(true)).unwrap(),
            SurfaceStatus::Suboptimal
        );
        assert_eq!(
            classify_present(Err(vk::Result::ERROR_OUT_OF_DATE_KHR)).unwrap(),
            SurfaceStatus::OutOfDate
        );
        assert!(classify_present(Err(vk::Result::ERROR_SURFACE_LOST_KHR)).is_err());
    }

    #[test]
    fn test_surface_status_needs_rebuild() {
        assert!(!SurfaceStatus::Optimal.needs_rebuild());
        assert!(SurfaceStatus::Suboptimal.needs_rebuild());
        assert!(SurfaceStatus::OutOfDate.needs_rebuild());
    }
}
