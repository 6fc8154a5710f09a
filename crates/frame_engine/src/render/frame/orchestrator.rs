//! Frame orchestrator
//!
//! Drives one frame at a time through
//! `Idle -> WaitingOnFence -> AcquiringImage -> Recording -> Submitted -> Presenting -> Idle`,
//! detouring through `Recreating` when the swapchain goes stale during
//! acquisition or presentation.
//!
//! A slot's completion fence is only reset once an image has been acquired
//! for it. If acquisition reports the swapchain out of date, the frame is
//! abandoned with the fence still signaled, so the next attempt waits on it
//! without blocking forever.
//!
//! Once the fence has been reset, or a rebuild has started, an error leaves
//! the slot or the swapchain in a state no later frame can recover from. The
//! orchestrator then latches as failed and refuses every further frame;
//! [`FrameOrchestrator::shutdown`] is still valid and drains the device.

use std::rc::Rc;

use ash::vk;
use bitflags::bitflags;

use crate::render::api::{CommandRecorder, PresentDesc, PresentationDevice, SubmitDesc};
use crate::render::error::{FramePhase, RecordError, RenderError, RenderResult};
use crate::render::frame::ring::{FrameRing, FrameSlot};
use crate::render::frame::surface::SurfaceCapabilities;
use crate::render::frame::swapchain::SwapChain;
use crate::render::window::WindowSurface;

bitflags! {
    /// Why the swapchain is being rebuilt
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RecreateReasons: u8 {
        /// The driver reported the swapchain out of date
        const OUT_OF_DATE = 0b001;
        /// Presentation still works but no longer matches the surface
        const SUBOPTIMAL = 0b010;
        /// The window reported a new size
        const RESIZED = 0b100;
    }
}

/// Where the orchestrator is within a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameState {
    /// Between frames
    Idle,
    /// Blocking on the current slot's completion fence
    WaitingOnFence,
    /// Asking the presentation engine for an image
    AcquiringImage,
    /// Recording the slot's command buffer
    Recording,
    /// Commands handed to the graphics queue
    Submitted,
    /// Handing the image back to the presentation engine
    Presenting,
    /// Rebuilding the swapchain
    Recreating,
}

/// What a call to [`FrameOrchestrator::render_one_frame`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// An image was rendered and queued for presentation
    Presented {
        /// Frame slot used
        slot: usize,
        /// Swapchain image presented
        image_index: u32,
        /// Whether the swapchain was rebuilt after presenting
        recreated: bool,
    },
    /// The swapchain was stale at acquisition; it has been rebuilt and
    /// nothing was rendered
    Skipped,
}

/// Per-frame CPU/GPU synchronization and swapchain lifecycle
pub struct FrameOrchestrator<D: PresentationDevice, W: WindowSurface, R: CommandRecorder> {
    // Field order is drop order. The ring waits for the device to go idle
    // before anything else is released, and the window outlives the device
    // since the surface was created from it.
    ring: FrameRing<D>,
    swapchain: SwapChain<D>,
    device: Rc<D>,
    recorder: R,
    window: W,
    state: FrameState,
    resize_pending: bool,
    frames_presented: u64,
    failed: bool,
    shut_down: bool,
}

impl<D: PresentationDevice, W: WindowSurface, R: CommandRecorder> FrameOrchestrator<D, W, R> {
    /// Build the swapchain and a ring of `slot_count` frame slots
    ///
    /// Blocks while the window has no presentable area.
    pub fn initialize(device: Rc<D>, mut window: W, recorder: R, slot_count: usize) -> RenderResult<Self> {
        // locals drop before parameters, so on an early return the device
        // goes before the window its surface was created from
        let device = device;

        while !window.has_presentable_area() {
            window.wait_events();
        }

        let caps = SurfaceCapabilities::query(device.as_ref())?;
        let swapchain = SwapChain::build(Rc::clone(&device), &caps, window.framebuffer_size())?;
        let ring = FrameRing::create(Rc::clone(&device), slot_count)?;

        log::info!(
            "Frame orchestrator ready: {} frames in flight, {} swapchain images",
            ring.capacity(),
            swapchain.image_count()
        );

        Ok(Self {
            ring,
            swapchain,
            device,
            recorder,
            window,
            state: FrameState::Idle,
            resize_pending: false,
            frames_presented: 0,
            failed: false,
            shut_down: false,
        })
    }

    /// Render and present one frame
    ///
    /// Stale-swapchain conditions are handled internally. Every returned
    /// error is fatal for the renderer. After a failure past the fence reset
    /// or during a rebuild, later calls fail without touching the device.
    pub fn render_one_frame(&mut self) -> RenderResult<FrameOutcome> {
        if self.shut_down {
            return Err(RenderError::init("frame orchestrator has been shut down"));
        }
        if self.failed {
            return Err(RenderError::init(
                "frame orchestrator failed on an earlier frame and can only be shut down",
            ));
        }

        let outcome = self.run_frame();
        if outcome.is_err() {
            self.enter(FrameState::Idle);
        }
        outcome
    }

    fn run_frame(&mut self) -> RenderResult<FrameOutcome> {
        let slot_index = self.ring.current_index();
        let slot = *self
            .ring
            .current()
            .ok_or_else(|| RenderError::init("frame ring has no slots"))?;

        self.enter(FrameState::WaitingOnFence);
        self.device
            .wait_for_fence(slot.completion_fence, u64::MAX)
            .map_err(|result| RenderError::DeviceLost {
                phase: FramePhase::FenceWait,
                result,
            })?;

        self.enter(FrameState::AcquiringImage);
        let image_index = match self.device.acquire_next_image(self.swapchain.handle(), slot.image_acquired) {
            Ok((index, suboptimal)) => {
                if suboptimal {
                    log::trace!("Acquired image {} from a suboptimal swapchain", index);
                }
                index
            }
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                log::warn!("Swapchain out of date at acquisition, skipping frame");
                self.recreate(RecreateReasons::OUT_OF_DATE).map_err(|err| self.fail(err))?;
                self.enter(FrameState::Idle);
                return Ok(FrameOutcome::Skipped);
            }
            Err(result) => {
                return Err(RenderError::classify(FramePhase::Acquire, result, |result| {
                    RenderError::SwapChain {
                        phase: FramePhase::Acquire,
                        result,
                    }
                }));
            }
        };

        let recreated = self.render_acquired(&slot, image_index).map_err(|err| self.fail(err))?;

        self.ring.advance();
        self.frames_presented += 1;
        self.enter(FrameState::Idle);

        Ok(FrameOutcome::Presented {
            slot: slot_index,
            image_index,
            recreated,
        })
    }

    /// Reset, record, submit and present for an acquired image
    ///
    /// Returns whether the swapchain was rebuilt after presenting.
    fn render_acquired(&mut self, slot: &FrameSlot, image_index: u32) -> RenderResult<bool> {
        self.device.reset_fence(slot.completion_fence).map_err(|result| {
            RenderError::classify(FramePhase::FenceReset, result, |result| RenderError::Submission { result })
        })?;

        self.enter(FrameState::Recording);
        let target = self.swapchain.render_target(image_index).ok_or_else(|| {
            RecordError::new(format!(
                "acquired image {} but the swapchain has {} images",
                image_index,
                self.swapchain.image_count()
            ))
        })?;
        self.device.reset_command_buffer(slot.command_buffer).map_err(|result| {
            RenderError::classify(FramePhase::Record, result, |result| {
                RecordError::from_vk("command buffer reset failed", result).into()
            })
        })?;
        self.recorder.record(slot.command_buffer, &target)?;

        self.device
            .submit(&SubmitDesc {
                command_buffer: slot.command_buffer,
                wait_semaphore: slot.image_acquired,
                wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                signal_semaphore: slot.render_finished,
                fence: slot.completion_fence,
            })
            .map_err(|result| {
                RenderError::classify(FramePhase::Submit, result, |result| RenderError::Submission { result })
            })?;
        self.enter(FrameState::Submitted);

        self.enter(FrameState::Presenting);
        let mut reasons = RecreateReasons::empty();
        match self.device.present(&PresentDesc {
            swapchain: self.swapchain.handle(),
            image_index,
            wait_semaphore: slot.render_finished,
        }) {
            Ok(false) => {}
            Ok(true) => reasons |= RecreateReasons::SUBOPTIMAL,
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => reasons |= RecreateReasons::OUT_OF_DATE,
            Err(result) => {
                return Err(RenderError::classify(FramePhase::Present, result, |result| {
                    RenderError::Presentation { result }
                }));
            }
        }
        if self.resize_pending {
            reasons |= RecreateReasons::RESIZED;
        }

        let recreated = !reasons.is_empty();
        if recreated {
            self.recreate(reasons)?;
        }
        Ok(recreated)
    }

    fn recreate(&mut self, reasons: RecreateReasons) -> RenderResult<()> {
        self.enter(FrameState::Recreating);
        log::info!("Recreating swapchain: {:?}", reasons);

        self.device.wait_idle().map_err(|result| {
            RenderError::classify(FramePhase::Recreate, result, |result| RenderError::SwapChain {
                phase: FramePhase::Recreate,
                result,
            })
        })?;

        while !self.window.has_presentable_area() {
            log::trace!("Window has no presentable area, waiting for events");
            self.window.wait_events();
        }

        let caps = SurfaceCapabilities::query(self.device.as_ref())?;
        self.swapchain.rebuild(&caps, self.window.framebuffer_size())?;
        self.resize_pending = false;
        Ok(())
    }

    fn fail(&mut self, err: RenderError) -> RenderError {
        log::error!("Frame orchestrator unusable after {} failure: {}", err.phase(), err);
        self.failed = true;
        err
    }

    /// Request a swapchain rebuild after the next presentation
    ///
    /// Repeated calls before that presentation cause a single rebuild.
    pub fn notify_resized(&mut self) {
        self.resize_pending = true;
    }

    /// Wait for the GPU to finish and release every frame resource
    ///
    /// Safe to call more than once; later calls do nothing.
    pub fn shutdown(&mut self) -> RenderResult<()> {
        if self.shut_down {
            return Ok(());
        }
        self.shut_down = true;
        self.enter(FrameState::Idle);

        let drained = self.ring.destroy();
        self.swapchain.teardown();
        log::info!("Frame orchestrator shut down after {} frames", self.frames_presented);
        drained
    }

    fn enter(&mut self, state: FrameState) {
        if self.state != state {
            log::trace!("Frame state {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Current state
    pub fn state(&self) -> FrameState {
        self.state
    }

    /// Whether a resize is waiting to be applied
    pub fn resize_pending(&self) -> bool {
        self.resize_pending
    }

    /// Frames presented so far
    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Whether an earlier failure left the orchestrator unusable
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Whether [`shutdown`](Self::shutdown) has run
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Current swapchain
    pub fn swapchain(&self) -> &SwapChain<D> {
        &self.swapchain
    }

    /// Frame slots
    pub fn ring(&self) -> &FrameRing<D> {
        &self.ring
    }

    /// Window
    pub fn window(&self) -> &W {
        &self.window
    }

    /// Window, mutably (event draining)
    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    /// Command recorder
    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    /// Command recorder, mutably
    pub fn recorder_mut(&mut self) -> &mut R {
        &mut self.recorder
    }
}

impl<D: PresentationDevice, W: WindowSurface, R: CommandRecorder> Drop for FrameOrchestrator<D, W, R> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::error!("Frame orchestrator teardown during {}: {}", err.phase(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WindowEvent;
    use crate::render::api::RenderTarget;
    use crate::render::frame::testing::{Call, MockDevice, MockRecorder, MockWindow};

    type TestOrchestrator = FrameOrchestrator<MockDevice, MockWindow, MockRecorder>;

    fn setup(device: MockDevice, slots: usize) -> (Rc<MockDevice>, TestOrchestrator) {
        let device = Rc::new(device);
        let window = MockWindow::new(800, 600).observed_by(device.clone());
        let orchestrator = FrameOrchestrator::initialize(device.clone(), window, MockRecorder::new(), slots).unwrap();
        device.clear_calls();
        (device, orchestrator)
    }

    /// The orchestrator refuses frames without touching the device, and a
    /// shutdown still releases everything cleanly
    fn assert_failed_then_shuts_down(device: &MockDevice, frames: &mut TestOrchestrator) {
        assert!(frames.is_failed());
        assert_eq!(frames.state(), FrameState::Idle);
        device.clear_calls();

        for _ in 0..2 {
            let err = frames.render_one_frame().unwrap_err();
            assert!(matches!(err, RenderError::Initialization { .. }), "{:?}", err);
        }
        assert!(device.calls().is_empty(), "{:?}", device.calls());

        frames.shutdown().unwrap();
        assert_eq!(device.live_objects(), 0);
        assert!(device.violations().is_empty(), "{:?}", device.violations());
    }

    fn presented_slot(outcome: FrameOutcome) -> usize {
        match outcome {
            FrameOutcome::Presented { slot, .. } => slot,
            FrameOutcome::Skipped => panic!("frame was skipped"),
        }
    }

    #[test]
    fn test_ring_advances_once_per_frame() {
        let (device, mut frames) = setup(MockDevice::new(), 2);

        let slots: Vec<usize> = (0..5)
            .map(|_| presented_slot(frames.render_one_frame().unwrap()))
            .collect();

        assert_eq!(slots, vec![0, 1, 0, 1, 0]);
        assert_eq!(frames.ring().current_index(), 1);
        assert_eq!(frames.frames_presented(), 5);
        assert_eq!(device.submissions(), 5);
        assert!(device.violations().is_empty(), "{:?}", device.violations());
    }

    #[test]
    fn test_frame_call_order() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        let slot = *frames.ring().current().unwrap();

        frames.render_one_frame().unwrap();

        let calls = device.calls();
        assert_eq!(
            calls,
            vec![
                Call::WaitForFence(slot.completion_fence, u64::MAX),
                Call::Acquire(slot.image_acquired),
                Call::ResetFence(slot.completion_fence),
                Call::ResetCommandBuffer(slot.command_buffer),
                Call::Submit(SubmitDesc {
                    command_buffer: slot.command_buffer,
                    wait_semaphore: slot.image_acquired,
                    wait_stage: vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
                    signal_semaphore: slot.render_finished,
                    fence: slot.completion_fence,
                }),
                Call::Present(PresentDesc {
                    swapchain: frames.swapchain().handle(),
                    image_index: 0,
                    wait_semaphore: slot.render_finished,
                }),
            ]
        );
        assert_eq!(frames.state(), FrameState::Idle);
    }

    #[test]
    fn test_fence_cycles_each_frame() {
        let (device, mut frames) = setup(MockDevice::new(), 1);
        let fence = frames.ring().current().unwrap().completion_fence;

        assert!(device.is_fence_signaled(fence));
        for _ in 0..3 {
            frames.render_one_frame().unwrap();
            // submitted, GPU not yet done
            assert!(!device.is_fence_signaled(fence));
        }
        assert_eq!(device.call_count("reset_fence"), 3);
        assert!(device.violations().is_empty(), "{:?}", device.violations());
    }

    #[test]
    fn test_out_of_date_acquire_never_resets_fence() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        for _ in 0..4 {
            device.push_acquire_result(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));
        }

        for _ in 0..4 {
            assert_eq!(frames.render_one_frame().unwrap(), FrameOutcome::Skipped);
            assert_eq!(frames.ring().current_index(), 0);
            assert_eq!(frames.state(), FrameState::Idle);
        }
        assert_eq!(device.call_count("reset_fence"), 0);
        assert_eq!(device.call_count("create_swapchain"), 4);

        assert_eq!(presented_slot(frames.render_one_frame().unwrap()), 0);
        assert_eq!(device.call_count("reset_fence"), 1);
        assert!(device.violations().is_empty(), "{:?}", device.violations());
    }

    #[test]
    fn test_window_events_drive_resize() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        frames.window_mut().push_event(WindowEvent::Resized { width: 1024, height: 768 });
        frames.window_mut().push_event(WindowEvent::Minimized(true));

        frames.window_mut().poll_events();
        for event in frames.window_mut().drain_events() {
            if event.is_resize() {
                frames.notify_resized();
            }
        }

        assert_eq!(frames.window().poll_count(), 1);
        assert!(frames.window_mut().drain_events().is_empty());
        assert!(frames.resize_pending());
        assert!(matches!(
            frames.render_one_frame().unwrap(),
            FrameOutcome::Presented { recreated: true, .. }
        ));
        assert_eq!(device.call_count("create_swapchain"), 1);
    }

    #[test]
    fn test_repeated_resize_notifications_rebuild_once() {
        let (device, mut frames) = setup(MockDevice::new(), 2);

        frames.notify_resized();
        frames.notify_resized();
        frames.notify_resized();
        assert!(frames.resize_pending());

        let first = frames.render_one_frame().unwrap();
        let second = frames.render_one_frame().unwrap();

        assert!(matches!(first, FrameOutcome::Presented { recreated: true, .. }));
        assert!(matches!(second, FrameOutcome::Presented { recreated: false, .. }));
        assert_eq!(device.call_count("create_swapchain"), 1);
        assert!(!frames.resize_pending());
    }

    #[test]
    fn test_stale_present_rebuilds_and_still_advances() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        device.push_present_result(Ok(true));
        device.push_present_result(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));

        let first = frames.render_one_frame().unwrap();
        let second = frames.render_one_frame().unwrap();

        assert_eq!(
            first,
            FrameOutcome::Presented {
                slot: 0,
                image_index: 0,
                recreated: true
            }
        );
        assert!(matches!(second, FrameOutcome::Presented { slot: 1, recreated: true, .. }));
        assert_eq!(frames.ring().current_index(), 0);
        assert_eq!(device.call_count("create_swapchain"), 2);
        assert!(device.violations().is_empty(), "{:?}", device.violations());
    }

    #[test]
    fn test_out_of_date_mid_run_rebuilds_at_new_size() {
        let (device, mut frames) = setup(MockDevice::new(), 2);

        for _ in 0..4 {
            assert!(matches!(frames.render_one_frame().unwrap(), FrameOutcome::Presented { .. }));
        }

        frames.window_mut().set_size(1024, 768);
        device.set_surface_extent(1024, 768);
        device.push_acquire_result(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));

        assert_eq!(frames.render_one_frame().unwrap(), FrameOutcome::Skipped);
        assert_eq!(frames.swapchain().extent(), vk::Extent2D { width: 1024, height: 768 });

        let sixth = frames.render_one_frame().unwrap();
        assert!(matches!(sixth, FrameOutcome::Presented { recreated: false, .. }));
        let (_, target) = frames.recorder().recorded.last().copied().unwrap();
        assert_eq!(target.extent, vk::Extent2D { width: 1024, height: 768 });
        assert_eq!(device.submissions(), 5);
        assert!(device.violations().is_empty(), "{:?}", device.violations());
    }

    #[test]
    fn test_minimized_window_blocks_recreation() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        frames.render_one_frame().unwrap();

        frames.window_mut().set_size(0, 0);
        frames.window_mut().set_minimized(true);
        frames
            .window_mut()
            .script_waits([((0, 0), true), ((0, 0), true), ((640, 480), false)]);
        device.set_surface_extent(640, 480);
        frames.notify_resized();
        device.clear_calls();

        frames.render_one_frame().unwrap();

        assert_eq!(frames.window().wait_count(), 3);
        let calls = device.calls();
        let kinds: Vec<&str> = calls.iter().map(Call::kind).collect();
        let first_wait = kinds.iter().position(|k| *k == "window_wait").unwrap();
        let rebuild = kinds.iter().position(|k| *k == "create_swapchain").unwrap();
        assert!(kinds[..first_wait].contains(&"wait_idle"));
        assert!(!kinds[first_wait..rebuild].contains(&"submit"));
        assert!(rebuild > first_wait);
        assert_eq!(device.submissions(), 2);
        assert_eq!(frames.swapchain().extent(), vk::Extent2D { width: 640, height: 480 });
    }

    #[test]
    fn test_slot_index_independent_of_image_order() {
        let (device, mut frames) = setup(MockDevice::new().with_image_count(3), 2);
        for image in [2, 0, 1, 2, 0, 1] {
            device.push_acquire_result(Ok((image, false)));
        }

        let outcomes: Vec<(usize, u32)> = (0..6)
            .map(|_| match frames.render_one_frame().unwrap() {
                FrameOutcome::Presented { slot, image_index, .. } => (slot, image_index),
                FrameOutcome::Skipped => panic!("frame was skipped"),
            })
            .collect();

        assert_eq!(outcomes, vec![(0, 2), (1, 0), (0, 1), (1, 2), (0, 0), (1, 1)]);
        assert_eq!(device.presented(), vec![2, 0, 1, 2, 0, 1]);
        assert!(device.violations().is_empty(), "{:?}", device.violations());
    }

    #[test]
    fn test_suboptimal_acquire_renders_normally() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        device.push_acquire_result(Ok((1, true)));

        let outcome = frames.render_one_frame().unwrap();

        assert_eq!(
            outcome,
            FrameOutcome::Presented {
                slot: 0,
                image_index: 1,
                recreated: false
            }
        );
    }

    #[test]
    fn test_fence_wait_failure_is_device_lost() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        device.fail_next_fence_wait(vk::Result::TIMEOUT);

        let err = frames.render_one_frame().unwrap_err();

        assert!(matches!(
            err,
            RenderError::DeviceLost {
                phase: FramePhase::FenceWait,
                ..
            }
        ));
        assert_eq!(frames.state(), FrameState::Idle);
        assert_eq!(device.call_count("acquire"), 0);
    }

    #[test]
    fn test_acquire_failures() {
        let (device, mut frames) = setup(MockDevice::new(), 2);

        device.push_acquire_result(Err(vk::Result::ERROR_SURFACE_LOST_KHR));
        let err = frames.render_one_frame().unwrap_err();
        assert!(matches!(
            err,
            RenderError::SwapChain {
                phase: FramePhase::Acquire,
                result: vk::Result::ERROR_SURFACE_LOST_KHR
            }
        ));

        device.push_acquire_result(Err(vk::Result::ERROR_DEVICE_LOST));
        let err = frames.render_one_frame().unwrap_err();
        assert!(err.is_device_lost());
        assert_eq!(device.call_count("reset_fence"), 0);
    }

    #[test]
    fn test_present_failure_is_presentation_error() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        device.push_present_result(Err(vk::Result::ERROR_SURFACE_LOST_KHR));

        let err = frames.render_one_frame().unwrap_err();

        assert!(matches!(err, RenderError::Presentation { .. }));
        assert_eq!(err.phase(), FramePhase::Present);
        assert_eq!(frames.ring().current_index(), 0);
        assert_failed_then_shuts_down(&device, &mut frames);
    }

    #[test]
    fn test_submit_failure() {
        let (device, mut frames) = setup(MockDevice::new(), 1);
        device.fail_next_submit(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);
        let err = frames.render_one_frame().unwrap_err();
        assert!(matches!(err, RenderError::Submission { .. }));
        assert_failed_then_shuts_down(&device, &mut frames);

        let (device, mut frames) = setup(MockDevice::new(), 2);
        device.fail_next_submit(vk::Result::ERROR_DEVICE_LOST);
        let err = frames.render_one_frame().unwrap_err();
        assert!(matches!(
            err,
            RenderError::DeviceLost {
                phase: FramePhase::Submit,
                ..
            }
        ));
    }

    #[test]
    fn test_recorder_failure_is_fatal() {
        let (device, mut frames) = setup(MockDevice::new(), 1);
        let fence = frames.ring().current().unwrap().completion_fence;
        frames.recorder_mut().fail_next = Some("pipeline missing".to_string());

        let err = frames.render_one_frame().unwrap_err();

        assert!(matches!(err, RenderError::Recording { .. }));
        assert!(err.to_string().contains("pipeline missing"));
        assert_eq!(device.submissions(), 0);
        // the fence was reset and nothing will ever signal it
        assert!(!device.is_fence_signaled(fence));
        assert_failed_then_shuts_down(&device, &mut frames);
    }

    #[test]
    fn test_unknown_image_index_is_fatal() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        device.push_acquire_result(Ok((7, false)));

        let err = frames.render_one_frame().unwrap_err();

        assert!(matches!(err, RenderError::Recording { .. }));
        assert!(err.to_string().contains("acquired image 7"), "{}", err);
        assert_eq!(device.submissions(), 0);
        assert_failed_then_shuts_down(&device, &mut frames);
    }

    #[test]
    fn test_command_buffer_reset_failure_is_fatal() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        device.fail_next_command_buffer_reset(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);

        let err = frames.render_one_frame().unwrap_err();

        assert!(matches!(err, RenderError::Recording { .. }));
        assert_eq!(err.phase(), FramePhase::Record);
        assert!(frames.recorder().recorded.is_empty());
        assert_failed_then_shuts_down(&device, &mut frames);

        let (device, mut frames) = setup(MockDevice::new(), 2);
        device.fail_next_command_buffer_reset(vk::Result::ERROR_DEVICE_LOST);
        let err = frames.render_one_frame().unwrap_err();
        assert!(matches!(
            err,
            RenderError::DeviceLost {
                phase: FramePhase::Record,
                ..
            }
        ));
        assert_failed_then_shuts_down(&device, &mut frames);
    }

    #[test]
    fn test_failed_rebuild_after_out_of_date_acquire() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        let fence = frames.ring().current().unwrap().completion_fence;
        device.push_acquire_result(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));
        device.fail_swapchain_creation(vk::Result::ERROR_INITIALIZATION_FAILED);

        let err = frames.render_one_frame().unwrap_err();

        assert!(matches!(
            err,
            RenderError::SwapChainCreation {
                result: Some(vk::Result::ERROR_INITIALIZATION_FAILED),
                ..
            }
        ));
        assert_eq!(err.phase(), FramePhase::Recreate);
        assert_eq!(frames.ring().current_index(), 0);
        assert_eq!(frames.frames_presented(), 0);
        assert_eq!(frames.swapchain().handle(), vk::SwapchainKHR::null());
        assert!(device.is_fence_signaled(fence));
        assert_eq!(device.call_count("reset_fence"), 0);
        assert_failed_then_shuts_down(&device, &mut frames);
    }

    #[test]
    fn test_failed_rebuild_after_stale_present() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        device.push_present_result(Ok(true));
        device.fail_swapchain_creation(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY);

        let err = frames.render_one_frame().unwrap_err();

        assert!(matches!(err, RenderError::SwapChainCreation { .. }));
        assert_eq!(err.phase(), FramePhase::Recreate);
        assert_eq!(device.submissions(), 1);
        assert_eq!(device.presented(), vec![0]);
        assert_eq!(frames.ring().current_index(), 0);
        assert_eq!(frames.frames_presented(), 0);
        assert_eq!(frames.swapchain().handle(), vk::SwapchainKHR::null());
        assert_failed_then_shuts_down(&device, &mut frames);
    }

    #[test]
    fn test_surface_query_failure_during_rebuild() {
        let (device, mut frames) = setup(MockDevice::new(), 2);
        device.push_acquire_result(Err(vk::Result::ERROR_OUT_OF_DATE_KHR));
        device.fail_next_surface_query(vk::Result::ERROR_SURFACE_LOST_KHR);

        let err = frames.render_one_frame().unwrap_err();

        assert!(matches!(
            err,
            RenderError::SwapChainCreation {
                result: Some(vk::Result::ERROR_SURFACE_LOST_KHR),
                ..
            }
        ));
        assert_eq!(device.call_count("create_swapchain"), 0);
        assert_failed_then_shuts_down(&device, &mut frames);

        let (device, mut frames) = setup(MockDevice::new(), 2);
        frames.notify_resized();
        device.fail_next_surface_query(vk::Result::ERROR_DEVICE_LOST);
        let err = frames.render_one_frame().unwrap_err();
        assert!(matches!(
            err,
            RenderError::DeviceLost {
                phase: FramePhase::Recreate,
                ..
            }
        ));
        assert_failed_then_shuts_down(&device, &mut frames);
    }

    #[test]
    fn test_closure_recorder_sees_render_target() {
        let device = Rc::new(MockDevice::new());
        let window = MockWindow::new(800, 600);
        let mut extents = Vec::new();
        {
            let recorder = |_: vk::CommandBuffer, target: &RenderTarget| -> Result<(), RecordError> {
                extents.push(target.render_area().extent);
                Ok(())
            };
            let mut frames = FrameOrchestrator::initialize(device.clone(), window, recorder, 2).unwrap();
            frames.render_one_frame().unwrap();
            frames.render_one_frame().unwrap();
        }
        assert_eq!(extents, vec![vk::Extent2D { width: 800, height: 600 }; 2]);
    }

    #[test]
    fn test_shutdown_releases_everything_once() {
        let (device, mut frames) = setup(MockDevice::new(), 3);
        for _ in 0..4 {
            frames.render_one_frame().unwrap();
        }

        frames.shutdown().unwrap();
        assert_eq!(device.live_objects(), 0);
        assert!(frames.is_shut_down());

        let calls = device.calls().len();
        frames.shutdown().unwrap();
        assert_eq!(device.calls().len(), calls);

        assert!(frames.render_one_frame().is_err());
        drop(frames);
        assert!(device.violations().is_empty(), "{:?}", device.violations());
    }

    #[test]
    fn test_initialize_waits_for_presentable_window() {
        let device = Rc::new(MockDevice::new());
        let mut window = MockWindow::new(0, 0);
        window.set_minimized(true);
        window.script_waits([((0, 0), true), ((800, 600), false)]);

        let frames = FrameOrchestrator::initialize(device.clone(), window, MockRecorder::new(), 2).unwrap();

        assert_eq!(frames.window().wait_count(), 2);
        assert_eq!(frames.state(), FrameState::Idle);
    }

    #[test]
    fn test_drop_without_shutdown_cleans_up() {
        let (device, frames) = setup(MockDevice::new(), 2);
        drop(frames);
        assert_eq!(device.live_objects(), 0);
    }
}
