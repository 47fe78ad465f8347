//! Frame synchronization ring.
//!
//! [`MAX_FRAMES_IN_FLIGHT`] slots are used round-robin. Each slot owns an
//! "image acquired" semaphore, a "render finished" semaphore and an in-flight
//! fence. Slots are independent of swapchain image indices: the ring keeps a
//! per-image table recording which slot last submitted work for each image,
//! so that reacquiring an image still in use by another slot waits for that
//! slot first.
//!
//! # Overview
//!
//! ```text
//! 1. wait(in_flight[slot])
//! 2. acquire image         -- out-of-date: skip frame, slot not advanced
//! 3. wait(in_flight[images_in_flight[image]]) if owned by another slot
//!    images_in_flight[image] = slot
//!    write uniforms + record commands for image
//! 4. reset(in_flight[slot])
//! 5. submit: wait image_acquired @ COLOR_ATTACHMENT_OUTPUT,
//!            signal render_finished + in_flight[slot]
//! 6. present: wait render_finished
//! 7. slot = (slot + 1) % MAX_FRAMES_IN_FLIGHT
//! ```
//!
//! The GPU side is abstracted behind [`FrameGpu`] so the ordering above is
//! checked in tests without a device.

use std::sync::Arc;

use tracing::{debug, trace};

use viewer_rhi::RhiResult;
use viewer_rhi::device::Device;
use viewer_rhi::swapchain::{AcquireOutcome, SurfaceStatus};
use viewer_rhi::sync::{Fence, Semaphore};

/// Maximum number of frames that can be in flight simultaneously.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;

/// Synchronization primitives owned by one frame slot.
pub struct FrameSlot {
    image_acquired: Semaphore,
    render_finished: Semaphore,
    in_flight: Fence,
}

impl FrameSlot {
    fn new(device: Arc<Device>) -> RhiResult<Self> {
        Ok(Self {
            image_acquired: Semaphore::new(device.clone())?,
            render_finished: Semaphore::new(device.clone())?,
            // Signaled so the first wait on a fresh slot returns immediately.
            in_flight: Fence::new(device, true)?,
        })
    }

    /// Signaled by acquire, waited on by submission.
    #[inline]
    pub fn image_acquired(&self) -> &Semaphore {
        &self.image_acquired
    }

    /// Signaled by submission, waited on by presentation.
    #[inline]
    pub fn render_finished(&self) -> &Semaphore {
        &self.render_finished
    }

    /// Signaled when the GPU has finished this slot's last submission.
    #[inline]
    pub fn in_flight(&self) -> &Fence {
        &self.in_flight
    }
}

/// The [`MAX_FRAMES_IN_FLIGHT`] slots of the ring.
///
/// Slots are resize-independent and survive every rebuild.
pub struct FrameSlots {
    slots: Vec<FrameSlot>,
}

impl FrameSlots {
    /// Creates every slot with its fence already signaled.
    ///
    /// # Errors
    ///
    /// Returns an error if any semaphore or fence creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let slots = (0..MAX_FRAMES_IN_FLIGHT)
            .map(|_| FrameSlot::new(device.clone()))
            .collect::<RhiResult<Vec<_>>>()?;
        debug!("Created {} frame slots", slots.len());
        Ok(Self { slots })
    }

    /// Returns slot `index`, which must be below [`MAX_FRAMES_IN_FLIGHT`].
    #[inline]
    pub fn get(&self, index: usize) -> Option<&FrameSlot> {
        self.slots.get(index)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Result of one pass through the ring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Presented and the surface still matches the swapchain.
    Presented,
    /// Presented, but acquire or present reported the surface as suboptimal
    /// or out of date.
    PresentedStale,
    /// Acquire reported out of date; nothing was recorded or submitted.
    Skipped,
}

impl FrameOutcome {
    /// Surface-dependent resources must be rebuilt before the next frame.
    #[inline]
    pub fn needs_rebuild(self) -> bool {
        !matches!(self, Self::Presented)
    }
}

/// GPU operations the ring sequences for one frame.
///
/// Slots are indices below [`MAX_FRAMES_IN_FLIGHT`]; images are swapchain
/// image indices.
pub trait FrameGpu {
    type Error;

    /// Blocks until `slot`'s completion guard is signaled.
    fn wait_for_slot(&mut self, slot: usize) -> Result<(), Self::Error>;

    /// Acquires the next image, signaling `slot`'s image-acquired semaphore.
    fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome, Self::Error>;

    /// Writes `image`'s uniform buffers and records its command buffer.
    ///
    /// Only called once no earlier submission can still be reading them.
    fn prepare_image(&mut self, image: usize) -> Result<(), Self::Error>;

    /// Resets `slot`'s completion guard to unsignaled.
    fn reset_slot(&mut self, slot: usize) -> Result<(), Self::Error>;

    /// Submits `image`'s command buffer, signaling `slot`'s guard on completion.
    fn submit(&mut self, slot: usize, image: usize) -> Result<(), Self::Error>;

    /// Queues `image` for presentation after `slot`'s render-finished signal.
    fn present(&mut self, slot: usize, image: usize) -> Result<SurfaceStatus, Self::Error>;
}

/// Slot cursor plus the per-image "last submitted by" table.
#[derive(Debug, Clone)]
pub struct FrameRing {
    current: usize,
    images_in_flight: Vec<Option<usize>>,
    frames_presented: u64,
}

impl FrameRing {
    /// Creates a ring for a swapchain with `image_count` images.
    pub fn new(image_count: usize) -> Self {
        Self {
            current: 0,
            images_in_flight: vec![None; image_count],
            frames_presented: 0,
        }
    }

    /// Slot the next frame will use.
    #[inline]
    pub fn current_slot(&self) -> usize {
        self.current
    }

    /// Length of the per-image table.
    #[inline]
    pub fn image_count(&self) -> usize {
        self.images_in_flight.len()
    }

    #[inline]
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Slot whose submission last used `image`, if any.
    pub fn image_owner(&self, image: usize) -> Option<usize> {
        self.images_in_flight.get(image).copied().flatten()
    }

    /// Clears and resizes the per-image table after the swapchain was
    /// recreated. The device must be idle.
    pub fn reset_images(&mut self, image_count: usize) {
        self.images_in_flight.clear();
        self.images_in_flight.resize(image_count, None);
        debug!("Frame ring tracking {} swapchain images", image_count);
    }

    fn assign(&mut self, image: usize, slot: usize) {
        if image >= self.images_in_flight.len() {
            self.images_in_flight.resize(image + 1, None);
        }
        self.images_in_flight[image] = Some(slot);
    }

    /// Runs one frame through `gpu`.
    ///
    /// An out-of-date acquire returns [`FrameOutcome::Skipped`] without
    /// touching the slot's fence or advancing the ring, so the same slot is
    /// reused after the rebuild.
    ///
    /// # Errors
    ///
    /// Propagates the first error from `gpu`; the ring is left on the same
    /// slot.
    pub fn run_frame<G: FrameGpu>(&mut self, gpu: &mut G) -> Result<FrameOutcome, G::Error> {
        let slot = self.current;
        gpu.wait_for_slot(slot)?;

        let (image, acquire_suboptimal) = match gpu.acquire_image(slot)? {
            AcquireOutcome::Acquired {
                image_index,
                suboptimal,
            } => (image_index as usize, suboptimal),
            AcquireOutcome::OutOfDate => {
                debug!("Swapchain out of date at acquire, skipping frame");
                return Ok(FrameOutcome::Skipped);
            }
        };

        if let Some(owner) = self.image_owner(image).filter(|&owner| owner != slot) {
            trace!("Image {} still owned by slot {}, waiting", image, owner);
            gpu.wait_for_slot(owner)?;
        }
        self.assign(image, slot);

        gpu.prepare_image(image)?;
        gpu.reset_slot(slot)?;
        gpu.submit(slot, image)?;
        let status = gpu.present(slot, image)?;

        self.current = (slot + 1) % MAX_FRAMES_IN_FLIGHT;
        self.frames_presented += 1;

        if acquire_suboptimal || status.needs_rebuild() {
            debug!("Surface reported {:?} at present", status);
            Ok(FrameOutcome::PresentedStale)
        } else {
            Ok(FrameOutcome::Presented)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        Wait(usize),
        Acquire(usize),
        Prepare(usize),
        Reset(usize),
        Submit(usize, usize),
        Present(usize, usize),
    }

    struct Script {
        acquires: Vec<AcquireOutcome>,
        present: SurfaceStatus,
        calls: Vec<Call>,
    }

    impl Script {
        fn new(acquires: Vec<AcquireOutcome>) -> Self {
            Self {
                acquires,
                present: SurfaceStatus::Optimal,
                calls: Vec::new(),
            }
        }
    }

    impl FrameGpu for Script {
        type Error = ();

        fn wait_for_slot(&mut self, slot: usize) -> Result<(), ()> {
            self.calls.push(Call::Wait(slot));
            Ok(())
        }

        fn acquire_image(&mut self, slot: usize) -> Result<AcquireOutcome, ()> {
            self.calls.push(Call::Acquire(slot));
            if self.acquires.is_empty() {
                return Err(());
            }
            Ok(self.acquires.remove(0))
        }

        fn prepare_image(&mut self, image: usize) -> Result<(), ()> {
            self.calls.push(Call::Prepare(image));
            Ok(())
        }

        fn reset_slot(&mut self, slot: usize) -> Result<(), ()> {
            self.calls.push(Call::Reset(slot));
            Ok(())
        }

        fn submit(&mut self, slot: usize, image: usize) -> Result<(), ()> {
            self.calls.push(Call::Submit(slot, image));
            Ok(())
        }

        fn present(&mut self, slot: usize, image: usize) -> Result<SurfaceStatus, ()> {
            self.calls.push(Call::Present(slot, image));
            Ok(self.present)
        }
    }

    fn acquired(image_index: u32) -> AcquireOutcome {
        AcquireOutcome::Acquired {
            image_index,
            suboptimal: false,
        }
    }

    #[test]
    fn test_frame_steps_in_order() {
        let mut ring = FrameRing::new(3);
        let mut gpu = Script::new(vec![acquired(1)]);

        let outcome = ring.run_frame(&mut gpu).unwrap();

        assert_eq!(outcome, FrameOutcome::Presented);
        assert_eq!(
            gpu.calls,
            vec![
                Call::Wait(0),
                Call::Acquire(0),
                Call::Prepare(1),
                Call::Reset(0),
                Call::Submit(0, 1),
                Call::Present(0, 1),
            ]
        );
        assert_eq!(ring.current_slot(), 1);
        assert_eq!(ring.image_owner(1), Some(0));
    }

    #[test]
    fn test_slots_cycle_round_robin() {
        let mut ring = FrameRing::new(3);
        let mut gpu = Script::new(vec![acquired(0), acquired(1), acquired(2)]);

        for expected in [0, 1, 0] {
            assert_eq!(ring.current_slot(), expected);
            ring.run_frame(&mut gpu).unwrap();
        }
        assert_eq!(ring.frames_presented(), 3);
    }

    #[test]
    fn test_reacquired_image_waits_for_other_slot() {
        let mut ring = FrameRing::new(2);
        let mut gpu = Script::new(vec![acquired(0), acquired(0)]);

        ring.run_frame(&mut gpu).unwrap();
        gpu.calls.clear();
        ring.run_frame(&mut gpu).unwrap();

        // Slot 1 acquires image 0, last submitted by slot 0.
        assert_eq!(
            &gpu.calls[..4],
            &[
                Call::Wait(1),
                Call::Acquire(1),
                Call::Wait(0),
                Call::Prepare(0)
            ]
        );
        assert_eq!(ring.image_owner(0), Some(1));
    }

    #[test]
    fn test_same_slot_image_needs_no_second_wait() {
        let mut ring = FrameRing::new(2);
        let mut gpu = Script::new(vec![acquired(0), acquired(1), acquired(0)]);

        ring.run_frame(&mut gpu).unwrap();
        ring.run_frame(&mut gpu).unwrap();
        gpu.calls.clear();
        ring.run_frame(&mut gpu).unwrap();

        assert_eq!(
            &gpu.calls[..3],
            &[Call::Wait(0), Call::Acquire(0), Call::Prepare(0)]
        );
    }

    #[test]
    fn test_out_of_date_acquire_skips_frame() {
        let mut ring = FrameRing::new(2);
        let mut gpu = Script::new(vec![AcquireOutcome::OutOfDate]);

        let outcome = ring.run_frame(&mut gpu).unwrap();

        assert_eq!(outcome, FrameOutcome::Skipped);
        assert!(outcome.needs_rebuild());
        assert_eq!(gpu.calls, vec![Call::Wait(0), Call::Acquire(0)]);
        assert_eq!(ring.current_slot(), 0);
        assert_eq!(ring.frames_presented(), 0);
    }

    #[test]
    fn test_suboptimal_acquire_still_presents() {
        let mut ring = FrameRing::new(2);
        let mut gpu = Script::new(vec![AcquireOutcome::Acquired {
            image_index: 0,
            suboptimal: true,
        }]);

        let outcome = ring.run_frame(&mut gpu).unwrap();

        assert_eq!(outcome, FrameOutcome::PresentedStale);
        assert!(gpu.calls.contains(&Call::Present(0, 0)));
        assert_eq!(ring.current_slot(), 1);
    }

    #[test]
    fn test_stale_present_requests_rebuild() {
        let mut ring = FrameRing::new(2);
        let mut gpu = Script::new(vec![acquired(0)]);
        gpu.present = SurfaceStatus::OutOfDate;

        assert_eq!(
            ring.run_frame(&mut gpu).unwrap(),
            FrameOutcome::PresentedStale
        );
    }

    #[test]
    fn test_error_leaves_slot_unchanged() {
        let mut ring = FrameRing::new(2);
        let mut gpu = Script::new(vec![]);

        assert!(ring.run_frame(&mut gpu).is_err());
        assert_eq!(ring.current_slot(), 0);
    }

    #[test]
    fn test_reset_images_clears_owners() {
        let mut ring = FrameRing::new(2);
        let mut gpu = Script::new(vec![acquired(1)]);
        ring.run_frame(&mut gpu).unwrap();

        ring.reset_images(4);

        assert_eq!(ring.image_count(), 4);
        assert!((0..4).all(|image| ring.image_owner(image).is_none()));
    }
}
