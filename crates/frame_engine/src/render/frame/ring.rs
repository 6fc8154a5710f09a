//! Frame ring
//!
//! A fixed set of per-frame synchronization slots. The CPU records into slot
//! `i` while the GPU may still be executing slots `i - 1 ..`; a slot's
//! completion fence gates reuse of its command buffer.

use std::rc::Rc;

use ash::vk;

use crate::render::api::PresentationDevice;
use crate::render::error::{FramePhase, RenderError, RenderResult};

/// Synchronization objects and command buffer owned by one frame in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameSlot {
    /// Command buffer re-recorded every time the slot comes around
    pub command_buffer: vk::CommandBuffer,
    /// Signaled when the slot's last submission finished; created signaled
    pub completion_fence: vk::Fence,
    /// Signaled by the presentation engine when the acquired image is ready
    pub image_acquired: vk::Semaphore,
    /// Signaled when rendering finished, waited on by presentation
    pub render_finished: vk::Semaphore,
}

impl FrameSlot {
    fn fill<D: PresentationDevice>(&mut self, device: &D, index: usize) -> Result<(), vk::Result> {
        self.completion_fence = device.create_fence(true, &format!("Frame {} completion fence", index))?;
        self.image_acquired = device.create_semaphore(&format!("Frame {} image acquired", index))?;
        self.render_finished = device.create_semaphore(&format!("Frame {} render finished", index))?;
        let mut buffers = device.allocate_command_buffers(1, &format!("Frame {} command buffer", index))?;
        self.command_buffer = buffers.pop().ok_or(vk::Result::ERROR_OUT_OF_HOST_MEMORY)?;
        Ok(())
    }

    fn release<D: PresentationDevice>(&mut self, device: &D) {
        if self.command_buffer != vk::CommandBuffer::null() {
            device.free_command_buffers(&[self.command_buffer]);
        }
        if self.render_finished != vk::Semaphore::null() {
            device.destroy_semaphore(self.render_finished);
        }
        if self.image_acquired != vk::Semaphore::null() {
            device.destroy_semaphore(self.image_acquired);
        }
        if self.completion_fence != vk::Fence::null() {
            device.destroy_fence(self.completion_fence);
        }
        *self = FrameSlot::default();
    }
}

/// Fixed-capacity ring of [`FrameSlot`]s
pub struct FrameRing<D: PresentationDevice> {
    device: Rc<D>,
    slots: Vec<FrameSlot>,
    current: usize,
}

impl<D: PresentationDevice> FrameRing<D> {
    /// Create `capacity` slots
    ///
    /// Slots created before a failure are released again before returning.
    pub fn create(device: Rc<D>, capacity: usize) -> RenderResult<Self> {
        if capacity == 0 {
            return Err(RenderError::init("frame ring needs at least one slot"));
        }

        let mut ring = Self {
            device,
            slots: Vec::with_capacity(capacity),
            current: 0,
        };

        for index in 0..capacity {
            let mut slot = FrameSlot::default();
            if let Err(result) = slot.fill(ring.device.as_ref(), index) {
                slot.release(ring.device.as_ref());
                return Err(RenderError::classify(FramePhase::Initialization, result, |result| {
                    RenderError::init(format!("failed to create frame slot {}: {:?}", index, result))
                }));
            }
            ring.slots.push(slot);
        }

        log::debug!("Created frame ring with {} slots", capacity);
        Ok(ring)
    }

    /// Number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Index of the slot the next frame uses
    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The slot the next frame uses; `None` once the ring is destroyed
    pub fn current(&self) -> Option<&FrameSlot> {
        self.slots.get(self.current)
    }

    /// Move to the next slot; returns the new index
    pub fn advance(&mut self) -> usize {
        self.current = (self.current + 1) % self.slots.len().max(1);
        self.current
    }

    /// Every slot, in ring order
    pub fn slots(&self) -> &[FrameSlot] {
        &self.slots
    }

    /// Wait for the device to go idle, then release every slot
    ///
    /// Slots are released even when the idle wait fails; the failure is
    /// still reported.
    pub fn destroy(&mut self) -> RenderResult<()> {
        if self.slots.is_empty() {
            return Ok(());
        }

        let idle = self.device.wait_idle().map_err(|result| RenderError::DeviceLost {
            phase: FramePhase::Shutdown,
            result,
        });

        for slot in &mut self.slots {
            slot.release(self.device.as_ref());
        }
        self.slots.clear();
        self.current = 0;

        log::debug!("Destroyed frame ring");
        idle
    }
}

impl<D: PresentationDevice> Drop for FrameRing<D> {
    fn drop(&mut self) {
        if let Err(err) = self.destroy() {
            log::error!("Frame ring teardown: {}", err);
        }
    }
}
