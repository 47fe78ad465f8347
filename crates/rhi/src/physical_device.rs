//! Physical device (GPU) selection and capability queries.
//!
//! Selection walks every GPU and keeps those that:
//! 1. expose a graphics queue family and a family that can present to the surface
//! 2. support `VK_KHR_swapchain`
//! 3. report at least one surface format and one present mode
//! 4. support `samplerAnisotropy` and `sampleRateShading`
//!
//! Among the survivors discrete GPUs win. The chosen device's MSAA sample
//! count is derived from its framebuffer limits at selection time.
//!
//! # Example
//!
//! ```no_run
//! use ash::vk;
//! use viewer_rhi::instance::Instance;
//! use viewer_rhi::physical_device::select_physical_device;
//!
//! # fn example(instance: &Instance, surface: vk::SurfaceKHR) -> Result<(), viewer_rhi::RhiError> {
//! let surface_loader = ash::khr::surface::Instance::new(instance.entry(), instance.handle());
//! let gpu = select_physical_device(instance.handle(), surface, &surface_loader)?;
//! tracing::info!("Rendering on {} with {:?}", gpu.device_name(), gpu.msaa_samples);
//! # Ok(())
//! # }
//! ```

use std::ffi::CStr;

use ash::vk;
use tracing::{debug, info, warn};

use crate::device::DEVICE_EXTENSIONS;
use crate::error::{RhiError, RhiResult};
use crate::swapchain::SwapchainSupportDetails;

/// Depth formats tried in order of preference.
pub const DEPTH_FORMAT_CANDIDATES: [vk::Format; 3] = [
    vk::Format::D32_SFLOAT,
    vk::Format::D32_SFLOAT_S8_UINT,
    vk::Format::D24_UNORM_S8_UINT,
];

/// Queue family indices needed for rendering to a surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics_family: Option<u32>,
    pub present_family: Option<u32>,
}

impl QueueFamilyIndices {
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.graphics_family.is_some() && self.present_family.is_some()
    }

    /// Distinct family indices, graphics first. One queue is created per entry.
    pub fn unique_families(&self) -> Vec<u32> {
        let mut families = Vec::with_capacity(2);

        if let Some(graphics) = self.graphics_family {
            families.push(graphics);
        }
        if let Some(present) = self.present_family
            && !families.contains(&present)
        {
            families.push(present);
        }

        families
    }
}

/// A GPU that passed every suitability check.
#[derive(Clone)]
pub struct PhysicalDeviceInfo {
    pub device: vk::PhysicalDevice,
    pub properties: vk::PhysicalDeviceProperties,
    pub features: vk::PhysicalDeviceFeatures,
    pub memory_properties: vk::PhysicalDeviceMemoryProperties,
    pub queue_families: QueueFamilyIndices,
    /// Highest sample count usable for both color and depth attachments.
    pub msaa_samples: vk::SampleCountFlags,
}

impl PhysicalDeviceInfo {
    pub fn device_name(&self) -> &str {
        self.properties
            .device_name_as_c_str()
            .ok()
            .and_then(|name| name.to_str().ok())
            .unwrap_or("Unknown Device")
    }

    pub fn device_type_name(&self) -> &'static str {
        match self.properties.device_type {
            vk::PhysicalDeviceType::DISCRETE_GPU => "Discrete GPU",
            vk::PhysicalDeviceType::INTEGRATED_GPU => "Integrated GPU",
            vk::PhysicalDeviceType::VIRTUAL_GPU => "Virtual GPU",
            vk::PhysicalDeviceType::CPU => "CPU",
            _ => "Other",
        }
    }

    pub fn api_version(&self) -> (u32, u32, u32) {
        let version = self.properties.api_version;
        (
            vk::api_version_major(version),
            vk::api_version_minor(version),
            vk::api_version_patch(version),
        )
    }

    /// Largest anisotropy the sampler hardware accepts.
    pub fn max_sampler_anisotropy(&self) -> f32 {
        self.properties.limits.max_sampler_anisotropy
    }
}

impl std::fmt::Debug for PhysicalDeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (major, minor, patch) = self.api_version();
        f.debug_struct("PhysicalDeviceInfo")
            .field("name", &self.device_name())
            .field("type", &self.device_type_name())
            .field("api_version", &format!("{}.{}.{}", major, minor, patch))
            .field("queue_families", &self.queue_families)
            .field("msaa_samples", &self.msaa_samples)
            .finish()
    }
}

/// Selects the most suitable GPU for presenting to `surface`.
///
/// # Errors
///
/// Returns [`RhiError::NoSuitableGpu`] if no GPU passes the suitability checks.
pub fn select_physical_device(
    instance: &ash::Instance,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> RhiResult<PhysicalDeviceInfo> {
    let devices = unsafe { instance.enumerate_physical_devices()? };

    if devices.is_empty() {
        warn!("No Vulkan-capable GPUs found");
        return Err(RhiError::NoSuitableGpu);
    }

    info!("Found {} GPU(s)", devices.len());

    let mut best: Option<(PhysicalDeviceInfo, u32)> = None;
    for device in devices {
        let Some(info) = check_device_suitability(instance, device, surface, surface_loader)?
        else {
            continue;
        };
        let score = rate_device(info.properties.device_type);
        debug!(
            "GPU '{}' ({}) - Score: {}",
            info.device_name(),
            info.device_type_name(),
            score
        );
        if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
            best = Some((info, score));
        }
    }

    let (selected, _) = best.ok_or_else(|| {
        warn!("No suitable GPU found with required capabilities");
        RhiError::NoSuitableGpu
    })?;

    let (major, minor, patch) = selected.api_version();
    info!(
        "Selected GPU: '{}' ({}) - Vulkan {}.{}.{}, MSAA {:?}",
        selected.device_name(),
        selected.device_type_name(),
        major,
        minor,
        patch,
        selected.msaa_samples
    );

    Ok(selected)
}

/// Returns `Some` when the device meets every requirement, `None` otherwise.
fn check_device_suitability(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> RhiResult<Option<PhysicalDeviceInfo>> {
    let properties = unsafe { instance.get_physical_device_properties(device) };
    let features = unsafe { instance.get_physical_device_features(device) };
    let memory_properties = unsafe { instance.get_physical_device_memory_properties(device) };

    let device_name = properties
        .device_name_as_c_str()
        .map(CStr::to_string_lossy)
        .unwrap_or_default();

    let queue_families = find_queue_families(instance, device, surface, surface_loader)?;
    if !queue_families.is_complete() {
        debug!(
            "GPU '{}' skipped: missing queue families (graphics={}, present={})",
            device_name,
            queue_families.graphics_family.is_some(),
            queue_families.present_family.is_some()
        );
        return Ok(None);
    }

    if !supports_device_extensions(instance, device)? {
        debug!("GPU '{}' skipped: VK_KHR_swapchain not supported", device_name);
        return Ok(None);
    }

    let support = SwapchainSupportDetails::query(device, surface, surface_loader)?;
    if !support.is_adequate() {
        debug!("GPU '{}' skipped: no surface formats or present modes", device_name);
        return Ok(None);
    }

    if features.sampler_anisotropy == vk::FALSE || features.sample_rate_shading == vk::FALSE {
        debug!(
            "GPU '{}' skipped: missing features (anisotropy={}, sample shading={})",
            device_name, features.sampler_anisotropy, features.sample_rate_shading
        );
        return Ok(None);
    }

    Ok(Some(PhysicalDeviceInfo {
        device,
        properties,
        features,
        memory_properties,
        queue_families,
        msaa_samples: max_usable_sample_count(&properties.limits),
    }))
}

fn find_queue_families(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
    surface_loader: &ash::khr::surface::Instance,
) -> RhiResult<QueueFamilyIndices> {
    let queue_families = unsafe { instance.get_physical_device_queue_family_properties(device) };

    let mut indices = QueueFamilyIndices::default();

    for (i, family) in queue_families.iter().enumerate() {
        let i = i as u32;
        if family.queue_count == 0 {
            continue;
        }

        if indices.graphics_family.is_none()
            && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        {
            indices.graphics_family = Some(i);
        }

        if indices.present_family.is_none() {
            let present_support = unsafe {
                surface_loader.get_physical_device_surface_support(device, i, surface)?
            };
            if present_support {
                indices.present_family = Some(i);
            }
        }

        if indices.is_complete() {
            break;
        }
    }

    Ok(indices)
}

fn supports_device_extensions(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
) -> RhiResult<bool> {
    let available = unsafe { instance.enumerate_device_extension_properties(device)? };

    Ok(DEVICE_EXTENSIONS.iter().all(|required| {
        available
            .iter()
            .any(|ext| ext.extension_name_as_c_str().is_ok_and(|name| name == *required))
    }))
}

fn rate_device(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 1000,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 100,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 10,
        _ => 1,
    }
}

/// Highest sample count supported by both color and depth framebuffers.
pub fn max_usable_sample_count(limits: &vk::PhysicalDeviceLimits) -> vk::SampleCountFlags {
    let counts = limits.framebuffer_color_sample_counts & limits.framebuffer_depth_sample_counts;

    [
        vk::SampleCountFlags::TYPE_64,
        vk::SampleCountFlags::TYPE_32,
        vk::SampleCountFlags::TYPE_16,
        vk::SampleCountFlags::TYPE_8,
        vk::SampleCountFlags::TYPE_4,
        vk::SampleCountFlags::TYPE_2,
    ]
    .into_iter()
    .find(|&samples| counts.contains(samples))
    .unwrap_or(vk::SampleCountFlags::TYPE_1)
}

/// First candidate whose properties for `tiling` include all `features`.
///
/// `properties_of` abstracts the format property query so the choice can be
/// made against any source of format properties.
pub fn choose_supported_format(
    candidates: &[vk::Format],
    tiling: vk::ImageTiling,
    features: vk::FormatFeatureFlags,
    mut properties_of: impl FnMut(vk::Format) -> vk::FormatProperties,
) -> Option<vk::Format> {
    candidates.iter().copied().find(|&format| {
        let props = properties_of(format);
        match tiling {
            vk::ImageTiling::LINEAR => props.linear_tiling_features.contains(features),
            vk::ImageTiling::OPTIMAL => props.optimal_tiling_features.contains(features),
            _ => false,
        }
    })
}

/// Picks the depth attachment format for `device`.
///
/// # Errors
///
/// [`RhiError::UnsupportedFormat`] if no candidate supports optimal-tiling
/// depth/stencil attachments.
pub fn find_depth_format(
    instance: &ash::Instance,
    device: vk::PhysicalDevice,
) -> RhiResult<vk::Format> {
    choose_supported_format(
        &DEPTH_FORMAT_CANDIDATES,
        vk::ImageTiling::OPTIMAL,
        vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
        |format| unsafe { instance.get_physical_device_format_properties(device, format) },
    )
    .ok_or_else(|| RhiError::UnsupportedFormat("no supported depth format".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(color: vk::SampleCountFlags, depth: vk::SampleCountFlags) -> vk::PhysicalDeviceLimits {
        vk::PhysicalDeviceLimits {
            framebuffer_color_sample_counts: color,
            framebuffer_depth_sample_counts: depth,
            ..Default::default()
        }
    }

    #[test]
    fn test_queue_family_indices_complete() {
        let indices = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        };
        assert!(indices.is_complete());
        assert!(!QueueFamilyIndices::default().is_complete());
    }

    #[test]
    fn test_unique_families() {
        let shared = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(0),
        };
        assert_eq!(shared.unique_families(), vec![0]);

        let split = QueueFamilyIndices {
            graphics_family: Some(0),
            present_family: Some(2),
        };
        assert_eq!(split.unique_families(), vec![0, 2]);
    }

    #[test]
    fn test_msaa_uses_common_maximum() {
        let color = vk::SampleCountFlags::TYPE_1
            | vk::SampleCountFlags::TYPE_2
            | vk::SampleCountFlags::TYPE_4
            | vk::SampleCountFlags::TYPE_8;
        let depth = vk::SampleCountFlags::TYPE_1
            | vk::SampleCountFlags::TYPE_2
            | vk::SampleCountFlags::TYPE_4;

        assert_eq!(
            max_usable_sample_count(&limits(color, depth)),
            vk::SampleCountFlags::TYPE_4
        );
    }

    #[test]
    fn test_msaa_falls_back_to_single_sample() {
        let counts = vk::SampleCountFlags::TYPE_1;
        assert_eq!(
            max_usable_sample_count(&limits(counts, counts)),
            vk::SampleCountFlags::TYPE_1
        );
    }

    #[test]
    fn test_choose_supported_format_takes_first_match() {
        let chosen = choose_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            |format| vk::FormatProperties {
                optimal_tiling_features: if format == vk::Format::D32_SFLOAT {
                    vk::FormatFeatureFlags::empty()
                } else {
                    vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT
                },
                ..Default::default()
            },
        );
        assert_eq!(chosen, Some(vk::Format::D32_SFLOAT_S8_UINT));
    }

    #[test]
    fn test_choose_supported_format_respects_tiling() {
        let linear_only = |_| vk::FormatProperties {
            linear_tiling_features: vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            ..Default::default()
        };
        let chosen = choose_supported_format(
            &DEPTH_FORMAT_CANDIDATES,
            vk::ImageTiling::OPTIMAL,
            vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT,
            linear_only,
        );
        assert_eq!(chosen, None);
    }

    #[test]
    fn test_discrete_gpu_preferred() {
        assert!(
            rate_device(vk::PhysicalDeviceType::DISCRETE_GPU)
                > rate_device(vk::PhysicalDeviceType::INTEGRATED_GPU)
        );
    }
}
