//! winit application handler driving the presentation loop.

use anyhow::{Context, anyhow};
use tracing::{debug, error, info};
use winit::application::ApplicationHandler;
use winit::event::{DeviceEvent, DeviceId, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::PhysicalKey;
use winit::window::WindowId;

use viewer_core::{FrameClock, ViewerConfig};
use viewer_platform::{CursorGrabMode, InputState, Window};
use viewer_renderer::{LoopControl, PresentationLoop, Renderer};
use viewer_resources::ViewerAssets;
use viewer_scene::{FrameInput, SceneState};

/// State that exists while the window is open.
///
/// The renderer is declared before the window so its surface is destroyed
/// first.
struct Running {
    renderer: Renderer,
    window: Window,
    presentation: PresentationLoop,
    scene: SceneState,
    input: InputState,
    clock: FrameClock,
}

impl Running {
    fn start(
        event_loop: &ActiveEventLoop,
        config: &ViewerConfig,
        assets: &ViewerAssets,
    ) -> anyhow::Result<Self> {
        let window = Window::new(
            event_loop,
            config.window.width,
            config.window.height,
            &config.window.title,
        )
        .context("failed to create window")?;
        let renderer =
            Renderer::new(&window, config, assets).context("failed to initialize renderer")?;
        let presentation = PresentationLoop::new(renderer.build_outcome());

        let mut running = Self {
            renderer,
            window,
            presentation,
            scene: SceneState::from_config(config),
            input: InputState::new(),
            clock: FrameClock::new(),
        };
        running.capture_cursor(true);
        Ok(running)
    }

    /// Grabs or releases the cursor and picks the matching motion source.
    fn capture_cursor(&mut self, captured: bool) {
        let mode = self.window.set_cursor_captured(captured);
        self.input
            .set_relative_motion(matches!(mode, CursorGrabMode::Locked));
        self.input.reset_cursor();
    }

    /// Sleep between events while the surface has no area; poll otherwise.
    fn control_flow(&self) -> ControlFlow {
        if self.presentation.is_waiting_for_surface() {
            ControlFlow::Wait
        } else {
            ControlFlow::Poll
        }
    }

    /// One loop iteration: input, scene update, then a presentation tick.
    fn iterate(&mut self) -> anyhow::Result<LoopControl> {
        let time = self.clock.tick();
        let frame_input = FrameInput {
            movement: self.input.movement(),
            cursor_delta: self.input.take_cursor_delta(),
            toggle_pause: self.input.take_toggle(),
        };

        if self.scene.update(frame_input, time) {
            let paused = self.scene.paused();
            debug!("Pause toggled: {}", paused);
            self.capture_cursor(!paused);
        }

        Ok(self.presentation.tick(&mut self.renderer, &self.scene)?)
    }
}

pub struct ViewerApp {
    config: ViewerConfig,
    assets: ViewerAssets,
    running: Option<Running>,
    started: bool,
    failure: Option<anyhow::Error>,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig, assets: ViewerAssets) -> Self {
        Self {
            config,
            assets,
            running: None,
            started: false,
            failure: None,
        }
    }

    /// Outcome of the run once the event loop has returned.
    pub fn finish(self) -> anyhow::Result<()> {
        match self.failure {
            Some(e) => Err(e),
            None if !self.started => Err(anyhow!("event loop exited before the window opened")),
            None => Ok(()),
        }
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, e: anyhow::Error) {
        error!("{:#}", e);
        self.failure = Some(e);
        self.running = None;
        event_loop.exit();
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.started {
            return;
        }
        self.started = true;

        match Running::start(event_loop, &self.config, &self.assets) {
            Ok(running) => {
                info!("Initialization complete, entering main loop");
                self.running = Some(running);
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested");
                running.presentation.request_close();
            }
            WindowEvent::Resized(size) => {
                debug!("Window resized to {}x{}", size.width, size.height);
                running.renderer.set_framebuffer_size(size.width, size.height);
                running.presentation.notify_resize();
                if size.width > 0 && size.height > 0 {
                    event_loop.set_control_flow(ControlFlow::Poll);
                }
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(key) = event.physical_key {
                    if event.state.is_pressed() {
                        running.input.on_key_pressed(key);
                    } else {
                        running.input.on_key_released(key);
                    }
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                running.input.on_cursor_moved(position.x, position.y);
            }
            _ => {}
        }
    }

    fn device_event(
        &mut self,
        _event_loop: &ActiveEventLoop,
        _device_id: DeviceId,
        event: DeviceEvent,
    ) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            running.input.on_mouse_motion(dx, dy);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(running) = self.running.as_mut() else {
            return;
        };

        match running.iterate() {
            Ok(LoopControl::Continue) => event_loop.set_control_flow(running.control_flow()),
            Ok(LoopControl::Exit) => {
                // Renderer teardown happens here, before the event loop ends.
                self.running = None;
                event_loop.exit();
            }
            Err(e) => self.fail(event_loop, e.context("render loop failed")),
        }
    }
}
