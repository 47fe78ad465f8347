//! End-to-end frame scheduling against a simulated GPU.
//!
//! The simulated GPU keeps submitted work pending until its fence is waited
//! on, and fails loudly if a per-image resource is written while a pending
//! submission still reads it, if a fence is reset before being waited, or if
//! targets are created while work is outstanding.

use ash::vk;

use viewer_renderer::{
    DependencyGraph, ExtentSource, FrameBackend, FrameGpu, FrameOutcome, FrameRing,
    LoopControl, LoopState, MAX_FRAMES_IN_FLIGHT, PresentationLoop, RebuildOutcome,
    SurfaceDependent, TargetFactory, TargetSummary,
};
use viewer_rhi::swapchain::{AcquireOutcome, SurfaceStatus};
use viewer_scene::SceneState;

fn extent(width: u32, height: u32) -> vk::Extent2D {
    vk::Extent2D { width, height }
}

struct SimTargets {
    summary: TargetSummary,
}

impl SurfaceDependent for SimTargets {
    fn summary(&self) -> TargetSummary {
        self.summary
    }
}

#[derive(Default)]
struct SimGpu {
    window: vk::Extent2D,
    /// Window sizes reported by successive extent queries before `window`.
    size_script: Vec<vk::Extent2D>,
    /// Image indices handed out by acquire before falling back to round robin.
    acquire_script: Vec<u32>,
    next_image: u32,
    swapchain_extent: Option<vk::Extent2D>,

    pending: [Option<usize>; MAX_FRAMES_IN_FLIGHT],
    fence_signaled: [bool; MAX_FRAMES_IN_FLIGHT],
    max_outstanding: usize,

    creates: Vec<vk::Extent2D>,
    presented: Vec<vk::Extent2D>,
}

impl SimGpu {
    fn new(window: vk::Extent2D) -> Self {
        Self {
            window,
            fence_signaled: [true; MAX_FRAMES_IN_FLIGHT],
            ..Default::default()
        }
    }

    fn outstanding(&self) -> usize {
        self.pending.iter().filter(|p| p.is_some()).count()
    }

    fn complete(&mut self, slot: usize) {
        self.pending[slot] = None;
        self.fence_signaled[slot] = true;
    }

    /// Larger surfaces get three images, smaller ones four, so a resize also
    /// changes the image count.
    fn image_count_for(extent: vk::Extent2D) -> usize {
        if extent.width >= 800 { 3 } else { 4 }
    }
}

impl ExtentSource for SimGpu {
    type Error = String;

    fn current_extent(&mut self) -> Result<vk::Extent2D, String> {
        if !self.size_script.is_empty() {
            self.window = self.size_script.remove(0);
        }
        Ok(self.window)
    }
}

impl TargetFactory for SimGpu {
    type Targets = SimTargets;

    fn wait_idle(&mut self) -> Result<(), String> {
        for slot in 0..MAX_FRAMES_IN_FLIGHT {
            if self.pending[slot].is_some() {
                self.complete(slot);
            }
        }
        Ok(())
    }

    fn create_targets(&mut self, extent: vk::Extent2D) -> Result<SimTargets, String> {
        if self.outstanding() != 0 {
            return Err("targets created while GPU work is pending".into());
        }
        if extent.width == 0 || extent.height == 0 {
            return Err("zero-sized swapchain".into());
        }
        self.creates.push(extent);
        self.swapchain_extent = Some(extent);
        self.next_image = 0;
        Ok(SimTargets {
            summary: TargetSummary {
                image_count: Self::image_count_for(extent),
                extent,
                format: vk::Format::B8G8R8A8_SRGB,
            },
        })
    }
}

struct SimFrame<'a> {
    gpu: &'a mut SimGpu,
    targets: &'a SimTargets,
}

impl FrameGpu for SimFrame<'_> {
    type Error = String;

    fn wait_for_slot(&mut self, slot: usize) -> Result<(), String> {
        if self.gpu.pending[slot].is_none() && !self.gpu.fence_signaled[slot] {
            return Err(format!("wait on slot {slot} would never return"));
        }
        self.gpu.complete(slot);
        Ok(())
    }

    fn acquire_image(&mut self, _slot: usize) -> Result<AcquireOutcome, String> {
        if self.gpu.swapchain_extent != Some(self.gpu.window) {
            return Ok(AcquireOutcome::OutOfDate);
        }
        let count = self.targets.summary.image_count as u32;
        let image_index = if self.gpu.acquire_script.is_empty() {
            let image = self.gpu.next_image % count;
            self.gpu.next_image += 1;
            image
        } else {
            self.gpu.acquire_script.remove(0)
        };
        Ok(AcquireOutcome::Acquired {
            image_index,
            suboptimal: false,
        })
    }

    fn prepare_image(&mut self, image: usize) -> Result<(), String> {
        if image >= self.targets.summary.image_count {
            return Err(format!("image {image} outside per-image arrays"));
        }
        if self.gpu.pending.contains(&Some(image)) {
            return Err(format!("image {image} written while the GPU still reads it"));
        }
        Ok(())
    }

    fn reset_slot(&mut self, slot: usize) -> Result<(), String> {
        if !self.gpu.fence_signaled[slot] {
            return Err(format!("slot {slot} reset without a completed wait"));
        }
        self.gpu.fence_signaled[slot] = false;
        Ok(())
    }

    fn submit(&mut self, slot: usize, image: usize) -> Result<(), String> {
        if self.gpu.fence_signaled[slot] {
            return Err(format!("slot {slot} submitted with a signaled fence"));
        }
        self.gpu.pending[slot] = Some(image);
        self.gpu.max_outstanding = self.gpu.max_outstanding.max(self.gpu.outstanding());
        Ok(())
    }

    fn present(&mut self, _slot: usize, _image: usize) -> Result<SurfaceStatus, String> {
        self.gpu.presented.push(self.targets.summary.extent);
        Ok(SurfaceStatus::Optimal)
    }
}

struct SimRenderer {
    gpu: SimGpu,
    graph: DependencyGraph<SimTargets>,
    ring: FrameRing,
}

impl SimRenderer {
    fn new(window: vk::Extent2D) -> Self {
        Self {
            gpu: SimGpu::new(window),
            graph: DependencyGraph::new(),
            ring: FrameRing::new(0),
        }
    }

    fn start(&mut self) -> PresentationLoop {
        let initial = self.rebuild().unwrap();
        PresentationLoop::new(initial)
    }
}

impl FrameBackend for SimRenderer {
    type Error = String;

    fn draw_frame(&mut self, _scene: &SceneState) -> Result<FrameOutcome, String> {
        let targets = self.graph.targets().ok_or("no targets")?;
        let mut frame = SimFrame {
            gpu: &mut self.gpu,
            targets,
        };
        self.ring.run_frame(&mut frame)
    }

    fn rebuild(&mut self) -> Result<RebuildOutcome, String> {
        let outcome = self.graph.rebuild(&mut self.gpu)?;
        if let RebuildOutcome::Rebuilt(summary) = outcome {
            self.ring.reset_images(summary.image_count);
        }
        Ok(outcome)
    }

    fn wait_idle(&mut self) -> Result<(), String> {
        TargetFactory::wait_idle(&mut self.gpu)
    }
}

fn run(sim: &mut SimRenderer, presentation: &mut PresentationLoop, ticks: usize) {
    let scene = SceneState::default();
    for _ in 0..ticks {
        assert_eq!(
            presentation.tick(sim, &scene).unwrap(),
            LoopControl::Continue
        );
    }
}

#[test]
fn test_outstanding_frames_bounded_by_ring_size() {
    let mut sim = SimRenderer::new(extent(800, 800));
    let mut presentation = sim.start();

    run(&mut sim, &mut presentation, 50);

    assert_eq!(sim.gpu.presented.len(), 50);
    assert_eq!(sim.gpu.max_outstanding, MAX_FRAMES_IN_FLIGHT);
}

#[test]
fn test_repeated_image_waits_before_write() {
    let mut sim = SimRenderer::new(extent(800, 800));
    sim.gpu.acquire_script = vec![0; 8];
    let mut presentation = sim.start();

    run(&mut sim, &mut presentation, 8);

    assert_eq!(sim.gpu.presented.len(), 8);
    assert!(sim.gpu.max_outstanding <= MAX_FRAMES_IN_FLIGHT);
}

#[test]
fn test_out_of_order_images_wait_before_write() {
    let mut sim = SimRenderer::new(extent(800, 800));
    sim.gpu.acquire_script = vec![2, 0, 2, 1, 1, 0, 2, 2];
    let mut presentation = sim.start();

    run(&mut sim, &mut presentation, 8);

    assert_eq!(sim.gpu.presented.len(), 8);
}

#[test]
fn test_zero_extent_waits_for_nonzero_size() {
    let mut sim = SimRenderer::new(extent(800, 600));
    sim.gpu.size_script = vec![extent(0, 0), extent(0, 0), extent(800, 600)];
    let mut presentation = sim.start();

    assert_eq!(presentation.state(), LoopState::Rebuilding);
    assert!(sim.gpu.creates.is_empty());

    run(&mut sim, &mut presentation, 1);
    assert!(sim.gpu.creates.is_empty());
    assert_eq!(presentation.state(), LoopState::Rebuilding);

    run(&mut sim, &mut presentation, 1);
    assert_eq!(sim.gpu.creates, vec![extent(800, 600)]);
    assert_eq!(presentation.state(), LoopState::Rendering);

    run(&mut sim, &mut presentation, 1);
    assert_eq!(sim.gpu.presented, vec![extent(800, 600)]);
}

#[test]
fn test_resize_rebuilds_once_before_next_frame() {
    let mut sim = SimRenderer::new(extent(800, 800));
    let mut presentation = sim.start();

    run(&mut sim, &mut presentation, 5);
    assert_eq!(sim.gpu.presented.len(), 5);
    assert_eq!(sim.ring.image_count(), 3);

    let rebuilds = sim.graph.rebuild_count();
    sim.gpu.window = extent(400, 400);
    presentation.notify_resize();

    while sim.gpu.presented.len() < 6 {
        run(&mut sim, &mut presentation, 1);
    }

    assert_eq!(sim.graph.rebuild_count(), rebuilds + 1);
    assert_eq!(sim.gpu.presented[5], extent(400, 400));
    assert!(sim.gpu.presented[..5].iter().all(|&e| e == extent(800, 800)));
    assert_eq!(sim.ring.image_count(), 4);
    assert_eq!(sim.graph.summary().map(|s| s.image_count), Some(4));
}

#[test]
fn test_unreported_resize_recovers_through_out_of_date() {
    let mut sim = SimRenderer::new(extent(800, 800));
    let mut presentation = sim.start();
    run(&mut sim, &mut presentation, 5);

    let rebuilds = sim.graph.rebuild_count();
    sim.gpu.window = extent(400, 400);

    while sim.gpu.presented.len() < 6 {
        run(&mut sim, &mut presentation, 1);
    }

    assert_eq!(sim.graph.rebuild_count(), rebuilds + 1);
    assert_eq!(sim.gpu.presented[5], extent(400, 400));
}

#[test]
fn test_rebuild_twice_is_idempotent() {
    let mut sim = SimRenderer::new(extent(800, 800));
    let mut presentation = sim.start();
    run(&mut sim, &mut presentation, 3);

    let first = sim.rebuild().unwrap();
    let second = sim.rebuild().unwrap();

    assert!(first.is_rebuilt());
    assert_eq!(first, second);
}

#[test]
fn test_close_during_rebuilding_finishes_rebuild_first() {
    let mut sim = SimRenderer::new(extent(800, 800));
    let mut presentation = sim.start();
    run(&mut sim, &mut presentation, 3);

    sim.gpu.window = extent(400, 400);
    run(&mut sim, &mut presentation, 1);
    assert_eq!(presentation.state(), LoopState::Rebuilding);

    presentation.request_close();
    let control = presentation
        .tick(&mut sim, &SceneState::default())
        .unwrap();

    assert_eq!(control, LoopControl::Exit);
    assert_eq!(sim.gpu.creates.last(), Some(&extent(400, 400)));
    assert_eq!(sim.gpu.outstanding(), 0);
    assert_eq!(sim.gpu.presented.len(), 3);
}

#[test]
fn test_close_while_minimized_exits() {
    let mut sim = SimRenderer::new(extent(800, 800));
    let mut presentation = sim.start();
    run(&mut sim, &mut presentation, 2);

    sim.gpu.window = extent(0, 0);
    presentation.notify_resize();
    run(&mut sim, &mut presentation, 1);
    assert_eq!(presentation.state(), LoopState::Rebuilding);
    assert!(sim.graph.targets().is_none());

    presentation.request_close();
    let control = presentation
        .tick(&mut sim, &SceneState::default())
        .unwrap();

    assert_eq!(control, LoopControl::Exit);
    assert_eq!(sim.gpu.outstanding(), 0);
}
