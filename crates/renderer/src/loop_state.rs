//! Presentation loop state machine.
//!
//! Two states: [`LoopState::Rendering`] draws a frame per tick;
//! [`LoopState::Rebuilding`] attempts a rebuild per tick and draws nothing.
//! Any stale frame, an external resize, or a deferred (zero-extent) rebuild
//! moves to or keeps the loop in `Rebuilding`; a completed rebuild always
//! returns it to `Rendering`.
//!
//! While a rebuild stays deferred the loop reports
//! [`PresentationLoop::is_waiting_for_surface`], so the driver can sleep until
//! the next window event instead of polling.
//!
//! A close request is honored only at the top of a tick. If a rebuild is
//! outstanding it is attempted first, then the device is idled and the loop
//! reports [`LoopControl::Exit`]; teardown follows in the owner's `Drop`.

use tracing::{debug, info};
use viewer_scene::SceneState;

use crate::frame_ring::FrameOutcome;
use crate::targets::RebuildOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Rendering,
    Rebuilding,
}

/// What the caller should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Exit,
}

/// Renderer operations driven by the loop.
pub trait FrameBackend {
    type Error;

    /// Runs one pass of the frame ring with `scene` as the uniform source.
    fn draw_frame(&mut self, scene: &SceneState) -> Result<FrameOutcome, Self::Error>;

    /// Runs the rebuild protocol.
    fn rebuild(&mut self) -> Result<RebuildOutcome, Self::Error>;

    /// Blocks until the device has no outstanding work.
    fn wait_idle(&mut self) -> Result<(), Self::Error>;
}

#[derive(Debug)]
pub struct PresentationLoop {
    state: LoopState,
    close_requested: bool,
    resize_pending: bool,
    /// The last rebuild attempt found a zero-area surface.
    deferred: bool,
}

impl PresentationLoop {
    /// Starts in `Rendering` if the initial build produced targets, otherwise
    /// in `Rebuilding`.
    pub fn new(initial: RebuildOutcome) -> Self {
        let state = if initial.is_rebuilt() {
            LoopState::Rendering
        } else {
            LoopState::Rebuilding
        };
        Self {
            state,
            close_requested: false,
            resize_pending: false,
            deferred: !initial.is_rebuilt(),
        }
    }

    #[inline]
    pub fn state(&self) -> LoopState {
        self.state
    }

    #[inline]
    pub fn close_requested(&self) -> bool {
        self.close_requested
    }

    /// True while nothing can progress until the window changes: the loop is
    /// `Rebuilding`, its last attempt was deferred, and no resize or close is
    /// pending.
    pub fn is_waiting_for_surface(&self) -> bool {
        self.state == LoopState::Rebuilding
            && self.deferred
            && !self.resize_pending
            && !self.close_requested
    }

    /// Asks the loop to exit at the top of the next tick.
    pub fn request_close(&mut self) {
        if !self.close_requested {
            debug!("Close requested in state {:?}", self.state);
        }
        self.close_requested = true;
    }

    /// Marks the surface as resized; the next tick rebuilds before drawing.
    pub fn notify_resize(&mut self) {
        self.resize_pending = true;
    }

    /// Advances the loop by one iteration.
    ///
    /// # Errors
    ///
    /// Propagates any fatal error from `backend`.
    pub fn tick<B: FrameBackend>(
        &mut self,
        backend: &mut B,
        scene: &SceneState,
    ) -> Result<LoopControl, B::Error> {
        if self.close_requested {
            if self.state == LoopState::Rebuilding {
                self.try_rebuild(backend)?;
            }
            backend.wait_idle()?;
            info!("Presentation loop finished");
            return Ok(LoopControl::Exit);
        }

        if self.resize_pending {
            self.state = LoopState::Rebuilding;
        }

        match self.state {
            LoopState::Rebuilding => self.try_rebuild(backend)?,
            LoopState::Rendering => {
                let outcome = backend.draw_frame(scene)?;
                if outcome.needs_rebuild() || self.resize_pending {
                    self.state = LoopState::Rebuilding;
                }
            }
        }

        Ok(LoopControl::Continue)
    }

    fn try_rebuild<B: FrameBackend>(&mut self, backend: &mut B) -> Result<(), B::Error> {
        self.resize_pending = false;
        match backend.rebuild()? {
            RebuildOutcome::Rebuilt(_) => {
                self.state = LoopState::Rendering;
                self.deferred = false;
            }
            RebuildOutcome::Deferred => {
                if !self.deferred {
                    debug!("Rebuild deferred until the surface has a nonzero extent");
                }
                self.deferred = true;
            }
        }
        Ok(())
    }
}
