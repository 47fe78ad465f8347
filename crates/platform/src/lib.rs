//! Platform layer for the viewer.
//!
//! - Window management via winit
//! - Vulkan surface creation from raw window handles
//! - Input state: movement keys, pause toggle, cursor deltas

mod input;
mod window;

pub use input::{InputState, MovementKeys};
pub use window::{Surface, Window};

pub use winit::event::WindowEvent;
pub use winit::event_loop::EventLoop;
pub use winit::keyboard::KeyCode;
pub use winit::window::CursorGrabMode;
