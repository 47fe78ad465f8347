//! First-person camera and perspective projection.

use glam::{Mat4, Vec3};
use viewer_core::CameraConfig;
use viewer_platform::MovementKeys;

/// Pitch is kept strictly inside the poles so `look_at` never degenerates.
pub const PITCH_LIMIT_DEGREES: f32 = 89.0;

/// Yaw that makes the initial front vector point down -Z.
const INITIAL_YAW_DEGREES: f32 = -90.0;

/// Perspective projection with the Vulkan clip-space Y flip applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Perspective {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for Perspective {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 100.0,
        }
    }
}

impl Perspective {
    /// Projection matrix for the given framebuffer aspect ratio.
    pub fn matrix(&self, aspect: f32) -> Mat4 {
        let mut proj =
            Mat4::perspective_rh(self.fov_y_degrees.to_radians(), aspect, self.near, self.far);
        // Vulkan clip space has +Y pointing down.
        proj.y_axis.y *= -1.0;
        proj
    }
}

/// Yaw/pitch fly camera.
#[derive(Clone, Debug)]
pub struct FpsCamera {
    pub position: Vec3,
    front: Vec3,
    up: Vec3,
    yaw: f32,
    pitch: f32,
    /// World units per second.
    pub speed: f32,
    /// Degrees per pixel of cursor travel.
    pub sensitivity: f32,
}

impl Default for FpsCamera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl FpsCamera {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            position: Vec3::from_array(config.position),
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            yaw: INITIAL_YAW_DEGREES,
            pitch: 0.0,
            speed: config.speed,
            sensitivity: config.sensitivity,
        }
    }

    #[inline]
    pub fn front(&self) -> Vec3 {
        self.front
    }

    #[inline]
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    #[inline]
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn right(&self) -> Vec3 {
        self.front.cross(self.up).normalize()
    }

    /// Moves along front/right for `dt` seconds. Opposing keys cancel.
    pub fn translate(&mut self, keys: MovementKeys, dt: f32) {
        let step = self.speed * dt;
        let right = self.right();

        if keys.forward {
            self.position += step * self.front;
        }
        if keys.backward {
            self.position -= step * self.front;
        }
        if keys.left {
            self.position -= step * right;
        }
        if keys.right {
            self.position += step * right;
        }
    }

    /// Applies a cursor delta in pixels. Screen Y grows downwards, so moving
    /// the cursor up pitches the camera up.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw += dx * self.sensitivity;
        self.pitch = (self.pitch - dy * self.sensitivity)
            .clamp(-PITCH_LIMIT_DEGREES, PITCH_LIMIT_DEGREES);

        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn keys(forward: bool, backward: bool, left: bool, right: bool) -> MovementKeys {
        MovementKeys {
            forward,
            backward,
            left,
            right,
        }
    }

    #[test]
    fn test_default_camera() {
        let camera = FpsCamera::default();
        assert_eq!(camera.position, Vec3::new(2.0, 2.0, 2.0));
        assert_eq!(camera.front(), Vec3::NEG_Z);
        assert_eq!(camera.yaw(), -90.0);
        assert_eq!(camera.speed, 10.0);
    }

    #[test]
    fn test_forward_moves_along_front() {
        let mut camera = FpsCamera::default();
        camera.translate(keys(true, false, false, false), 0.5);
        assert!((camera.position - Vec3::new(2.0, 2.0, -3.0)).length() < EPS);
    }

    #[test]
    fn test_strafe_right_is_positive_x_when_facing_neg_z() {
        let mut camera = FpsCamera::default();
        camera.translate(keys(false, false, false, true), 0.1);
        assert!((camera.position - Vec3::new(3.0, 2.0, 2.0)).length() < EPS);
    }

    #[test]
    fn test_opposing_keys_cancel() {
        let mut camera = FpsCamera::default();
        camera.translate(keys(true, true, true, true), 1.0);
        assert!((camera.position - Vec3::new(2.0, 2.0, 2.0)).length() < EPS);
    }

    #[test]
    fn test_zero_rotation_keeps_initial_front() {
        let mut camera = FpsCamera::default();
        camera.rotate(0.0, 0.0);
        assert!((camera.front() - Vec3::NEG_Z).length() < EPS);
    }

    #[test]
    fn test_cursor_up_pitches_up() {
        let mut camera = FpsCamera::default();
        camera.rotate(0.0, -100.0);
        assert!((camera.pitch() - 10.0).abs() < EPS);
        assert!(camera.front().y > 0.0);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = FpsCamera::default();
        camera.rotate(0.0, -10_000.0);
        assert_eq!(camera.pitch(), PITCH_LIMIT_DEGREES);
        camera.rotate(0.0, 100_000.0);
        assert_eq!(camera.pitch(), -PITCH_LIMIT_DEGREES);
    }

    #[test]
    fn test_projection_flips_y() {
        let proj = Perspective::default().matrix(1.0);
        let unflipped = Mat4::perspective_rh(45f32.to_radians(), 1.0, 0.1, 100.0);
        assert_eq!(proj.y_axis.y, -unflipped.y_axis.y);
        assert_eq!(proj.x_axis.x, unflipped.x_axis.x);
    }
}
