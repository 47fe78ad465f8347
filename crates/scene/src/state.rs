//! Per-frame scene update.

use tracing::debug;
use viewer_core::{FrameTime, ViewerConfig};
use viewer_platform::MovementKeys;

use crate::camera::{FpsCamera, Perspective};
use crate::light::PointLight;

/// Input gathered since the previous frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameInput {
    pub movement: MovementKeys,
    pub cursor_delta: (f32, f32),
    pub toggle_pause: bool,
}

/// Camera, light and timing that feed the uniform buffers.
#[derive(Clone, Debug)]
pub struct SceneState {
    pub camera: FpsCamera,
    pub light: PointLight,
    pub projection: Perspective,
    paused: bool,
    elapsed: f32,
}

impl Default for SceneState {
    fn default() -> Self {
        Self::from_config(&ViewerConfig::default())
    }
}

impl SceneState {
    pub fn from_config(config: &ViewerConfig) -> Self {
        Self {
            camera: FpsCamera::from_config(&config.camera),
            light: PointLight::default(),
            projection: Perspective {
                fov_y_degrees: config.render.fov_degrees,
                near: config.render.near,
                far: config.render.far,
            },
            paused: false,
            elapsed: 0.0,
        }
    }

    /// While paused mouse-look is ignored; movement and the light still run.
    #[inline]
    pub fn paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Advances the scene by one frame. Returns `true` if the pause state
    /// flipped, so the caller can grab or release the cursor.
    pub fn update(&mut self, input: FrameInput, time: FrameTime) -> bool {
        if input.toggle_pause {
            self.paused = !self.paused;
            debug!("Scene {}", if self.paused { "paused" } else { "resumed" });
        }

        self.camera.translate(input.movement, time.delta);
        if !self.paused {
            let (dx, dy) = input.cursor_delta;
            if dx != 0.0 || dy != 0.0 {
                self.camera.rotate(dx, dy);
            }
        }

        self.elapsed = time.elapsed;
        self.light.animate(time.elapsed);

        input.toggle_pause
    }
}
