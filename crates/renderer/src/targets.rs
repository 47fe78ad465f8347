//! Resource dependency graph and the rebuild protocol.
//!
//! Everything whose validity derives from the surface configuration (the
//! swapchain, its views, framebuffers, color/depth targets, render pass,
//! pipeline, per-image uniforms, descriptors and command buffers) lives in a
//! single value owned by [`DependencyGraph`]. A rebuild replaces that value
//! wholesale: wait for the device to go idle, drop the old value (its fields
//! destroy in reverse dependency order), re-query the surface, then create a
//! fresh value. Nothing is patched in place.
//!
//! Geometry, textures, samplers and the command pool are not in the graph and
//! survive every rebuild.

use ash::vk;
use tracing::{debug, info, trace};

/// Source of the surface's current drawable extent.
pub trait ExtentSource {
    type Error;

    /// Extent a swapchain created now would have. Zero in either axis while
    /// the window is minimized.
    fn current_extent(&mut self) -> Result<vk::Extent2D, Self::Error>;
}

/// Creates the surface-dependent resources for a given extent.
pub trait TargetFactory: ExtentSource {
    type Targets: SurfaceDependent;

    /// Blocks until no submitted work references any existing target.
    fn wait_idle(&mut self) -> Result<(), Self::Error>;

    /// Creates every surface-dependent object, in dependency order.
    fn create_targets(&mut self, extent: vk::Extent2D) -> Result<Self::Targets, Self::Error>;
}

/// A built set of surface-dependent resources.
pub trait SurfaceDependent {
    fn summary(&self) -> TargetSummary;
}

/// Swapchain shape of a built target set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSummary {
    pub image_count: usize,
    pub extent: vk::Extent2D,
    pub format: vk::Format,
}

/// What a call to [`DependencyGraph::rebuild`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildOutcome {
    /// Old targets were destroyed and new ones created.
    Rebuilt(TargetSummary),
    /// The surface extent is zero. Old targets are destroyed and nothing was
    /// created; call `rebuild` again once the window has area.
    Deferred,
}

impl RebuildOutcome {
    #[inline]
    pub fn is_rebuilt(&self) -> bool {
        matches!(self, Self::Rebuilt(_))
    }
}

#[inline]
fn is_zero(extent: vk::Extent2D) -> bool {
    extent.width == 0 || extent.height == 0
}

/// Owner of the current surface-dependent resources.
pub struct DependencyGraph<T> {
    targets: Option<T>,
    rebuilds: u64,
}

impl<T> Default for DependencyGraph<T> {
    fn default() -> Self {
        Self {
            targets: None,
            rebuilds: 0,
        }
    }
}

impl<T: SurfaceDependent> DependencyGraph<T> {
    /// Creates an empty graph. Call [`rebuild`](Self::rebuild) to populate it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current targets, `None` before the first successful rebuild or while a
    /// rebuild is deferred.
    #[inline]
    pub fn targets(&self) -> Option<&T> {
        self.targets.as_ref()
    }

    #[inline]
    pub fn summary(&self) -> Option<TargetSummary> {
        self.targets.as_ref().map(SurfaceDependent::summary)
    }

    /// Number of completed rebuilds, including the initial build.
    #[inline]
    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds
    }

    /// Destroys and recreates every surface-dependent resource.
    ///
    /// Safe to call repeatedly. With an unchanged surface each call produces
    /// the same [`TargetSummary`].
    ///
    /// # Errors
    ///
    /// Propagates errors from `factory`. On error the graph is left empty.
    pub fn rebuild<F>(&mut self, factory: &mut F) -> Result<RebuildOutcome, F::Error>
    where
        F: TargetFactory<Targets = T>,
    {
        factory.wait_idle()?;
        if self.targets.take().is_some() {
            debug!("Destroyed surface-dependent resources");
        }

        let extent = factory.current_extent()?;
        if is_zero(extent) {
            trace!(
                "Surface extent is {}x{}, deferring rebuild",
                extent.width, extent.height
            );
            return Ok(RebuildOutcome::Deferred);
        }

        let targets = factory.create_targets(extent)?;
        let summary = targets.summary();
        self.targets = Some(targets);
        self.rebuilds += 1;

        info!(
            "Surface resources built: {}x{}, {:?}, {} images",
            summary.extent.width, summary.extent.height, summary.format, summary.image_count
        );
        Ok(RebuildOutcome::Rebuilt(summary))
    }

    /// Drops the current targets. The device must be idle.
    pub fn teardown(&mut self) {
        if self.targets.take().is_some() {
            debug!("Surface-dependent resources torn down");
        }
    }
}
