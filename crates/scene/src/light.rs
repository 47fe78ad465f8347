//! Animated point light.

use glam::Vec3;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 5.0),
            color: Vec3::ONE,
        }
    }
}

impl PointLight {
    /// Places the light on its orbit at `elapsed` seconds.
    pub fn animate(&mut self, elapsed: f32) {
        let (sin, cos) = elapsed.sin_cos();
        self.position = Vec3::new(sin, cos, sin);
    }
}
