//! Uniform buffer layouts shared with the GLSL shaders.
//!
//! All structures are `#[repr(C)]` and `Pod` so they can be copied into
//! mapped memory as bytes. `vec3` members are padded to 16 bytes to match
//! std140.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use viewer_scene::SceneState;

/// Binding 0 (vertex stage).
///
/// # Memory Layout
///
/// - Offset 0: model matrix (64 bytes)
/// - Offset 64: view matrix (64 bytes)
/// - Offset 128: projection matrix (64 bytes)
/// - Total size: 192 bytes
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct MvpUbo {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

impl MvpUbo {
    pub const SIZE: usize = std::mem::size_of::<Self>();
}

/// Binding 2 (fragment stage).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightUbo {
    pub position: Vec3,
    pub _pad0: f32,
    pub color: Vec3,
    pub _pad1: f32,
}

impl LightUbo {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(position: Vec3, color: Vec3) -> Self {
        Self {
            position,
            _pad0: 0.0,
            color,
            _pad1: 0.0,
        }
    }
}

/// Binding 3 (fragment stage): eye position for specular highlights.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct CameraUbo {
    pub position: Vec3,
    pub _pad: f32,
}

impl CameraUbo {
    pub const SIZE: usize = std::mem::size_of::<Self>();

    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            _pad: 0.0,
        }
    }
}

/// Everything written into one image's uniform buffers for a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameUniforms {
    pub mvp: MvpUbo,
    pub light: LightUbo,
    pub camera: CameraUbo,
}

impl FrameUniforms {
    /// Snapshot of `scene` for a swapchain of size `extent`.
    pub fn from_scene(scene: &SceneState, extent: vk::Extent2D) -> Self {
        let aspect = if extent.height == 0 {
            1.0
        } else {
            extent.width as f32 / extent.height as f32
        };

        Self {
            mvp: MvpUbo {
                model: Mat4::IDENTITY,
                view: scene.camera.view_matrix(),
                projection: scene.projection.matrix(aspect),
            },
            light: LightUbo::new(scene.light.position, scene.light.color),
            camera: CameraUbo::new(scene.camera.position),
        }
    }
}
