//! Scene state driven once per frame: first-person camera, an animated
//! point light, and elapsed time.

pub mod camera;
pub mod light;
pub mod state;

pub use camera::{FpsCamera, Perspective};
pub use light::PointLight;
pub use state::{FrameInput, SceneState};
