//! Window management using winit, plus the Vulkan surface it backs.

use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle};
use winit::dpi::PhysicalSize;
use winit::event_loop::ActiveEventLoop;
use winit::window::{CursorGrabMode, Window as WinitWindow, WindowAttributes};

use viewer_core::{Error, Result};

/// RAII wrapper for a Vulkan surface.
///
/// The surface is destroyed when dropped. The caller must ensure the Vulkan
/// instance outlives it.
pub struct Surface {
    handle: vk::SurfaceKHR,
    surface_loader: ash::khr::surface::Instance,
}

impl Surface {
    /// Raw surface handle, valid as long as this `Surface` exists.
    #[inline]
    pub fn handle(&self) -> vk::SurfaceKHR {
        self.handle
    }

    /// Loader used to query capabilities, formats and present modes.
    #[inline]
    pub fn loader(&self) -> &ash::khr::surface::Instance {
        &self.surface_loader
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        // SAFETY: the handle was created by ash_window::create_surface from the
        // same instance as the loader, and is destroyed only here.
        unsafe {
            self.surface_loader.destroy_surface(self.handle, None);
        }
        tracing::debug!("Vulkan surface destroyed");
    }
}

/// Application window.
pub struct Window {
    window: Arc<WinitWindow>,
}

impl Window {
    /// Create a resizable window with the given inner size and title.
    pub fn new(event_loop: &ActiveEventLoop, width: u32, height: u32, title: &str) -> Result<Self> {
        let attrs = WindowAttributes::default()
            .with_title(title)
            .with_inner_size(PhysicalSize::new(width, height))
            .with_resizable(true);

        let window = event_loop
            .create_window(attrs)
            .map_err(|e| Error::Window(e.to_string()))?;

        tracing::info!("Window created: {}x{}", width, height);

        Ok(Self {
            window: Arc::new(window),
        })
    }

    /// Current framebuffer size in pixels. Zero in either axis while minimized.
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let size = self.window.inner_size();
        (size.width, size.height)
    }

    /// Raw display handle, needed to pick the instance surface extensions.
    pub fn raw_display_handle(&self) -> Result<RawDisplayHandle> {
        self.window
            .display_handle()
            .map(|handle| handle.as_raw())
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))
    }

    /// Capture (hide and lock) or release the cursor.
    ///
    /// Platforms without `Locked` fall back to `Confined`. Returns the grab
    /// mode now in effect; a failed grab is logged and reported as
    /// [`CursorGrabMode::None`]. While `Locked` the cursor position is frozen
    /// and only raw pointer motion is reported.
    pub fn set_cursor_captured(&self, captured: bool) -> CursorGrabMode {
        let result = if captured {
            self.window
                .set_cursor_grab(CursorGrabMode::Locked)
                .map(|()| CursorGrabMode::Locked)
                .or_else(|_| {
                    self.window
                        .set_cursor_grab(CursorGrabMode::Confined)
                        .map(|()| CursorGrabMode::Confined)
                })
        } else {
            self.window
                .set_cursor_grab(CursorGrabMode::None)
                .map(|()| CursorGrabMode::None)
        };
        self.window.set_cursor_visible(!captured);

        match result {
            Ok(mode) => {
                tracing::debug!("Cursor grab mode: {:?}", mode);
                mode
            }
            Err(e) => {
                tracing::warn!("Cursor grab change failed: {}", e);
                CursorGrabMode::None
            }
        }
    }

    /// Create a Vulkan surface for this window.
    ///
    /// `instance` must outlive the returned [`Surface`].
    pub fn create_surface(&self, entry: &ash::Entry, instance: &ash::Instance) -> Result<Surface> {
        let display_handle = self
            .window
            .display_handle()
            .map_err(|e| Error::Window(format!("Failed to get display handle: {}", e)))?;

        let window_handle = self
            .window
            .window_handle()
            .map_err(|e| Error::Window(format!("Failed to get window handle: {}", e)))?;

        // SAFETY: entry and instance are valid; the handles come from a live
        // winit window. The surface is destroyed in Surface::drop.
        let handle = unsafe {
            ash_window::create_surface(
                entry,
                instance,
                display_handle.as_raw(),
                window_handle.as_raw(),
                None,
            )
            .map_err(|e| Error::Window(format!("Failed to create Vulkan surface: {}", e)))?
        };

        let surface_loader = ash::khr::surface::Instance::new(entry, instance);

        tracing::info!("Vulkan surface created");

        Ok(Surface {
            handle,
            surface_loader,
        })
    }
}
