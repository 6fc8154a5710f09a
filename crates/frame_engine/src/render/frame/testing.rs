//! In-memory doubles for the frame subsystem tests
//!
//! `MockDevice` hands out fake handles and tracks just enough GPU state to
//! catch synchronization mistakes: fence signal state, in-flight command
//! buffers and binary semaphore signal state. Misuse is recorded as a
//! violation instead of panicking so tests can assert on it.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use ash::vk;
use ash::vk::Handle;

use crate::events::WindowEvent;
use crate::render::api::{
    CommandRecorder, DeviceResult, PresentDesc, PresentationDevice, QueueFamilies, RenderTarget, SubmitDesc,
    SwapchainDesc,
};
use crate::render::error::RecordError;
use crate::render::frame::surface::PREFERRED_FORMAT;
use crate::render::window::WindowSurface;

/// Device call as seen by the mock
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SurfaceQuery,
    CreateSwapchain(SwapchainDesc),
    DestroySwapchain(vk::SwapchainKHR),
    CreateImageView,
    DestroyImageView,
    CreateRenderPass,
    DestroyRenderPass,
    CreateFramebuffer,
    DestroyFramebuffer,
    CreateFence,
    DestroyFence,
    CreateSemaphore,
    DestroySemaphore,
    AllocateCommandBuffers(u32),
    FreeCommandBuffers,
    WaitForFence(vk::Fence, u64),
    ResetFence(vk::Fence),
    ResetCommandBuffer(vk::CommandBuffer),
    Acquire(vk::Semaphore),
    Submit(SubmitDesc),
    Present(PresentDesc),
    WaitIdle,
    /// Logged by an observing [`MockWindow`] when it blocks for events
    WindowWait,
}

impl Call {
    pub fn kind(&self) -> &'static str {
        match self {
            Call::SurfaceQuery => "surface_query",
            Call::CreateSwapchain(_) => "create_swapchain",
            Call::DestroySwapchain(_) => "destroy_swapchain",
            Call::CreateImageView => "create_image_view",
            Call::DestroyImageView => "destroy_image_view",
            Call::CreateRenderPass => "create_render_pass",
            Call::DestroyRenderPass => "destroy_render_pass",
            Call::CreateFramebuffer => "create_framebuffer",
            Call::DestroyFramebuffer => "destroy_framebuffer",
            Call::CreateFence => "create_fence",
            Call::DestroyFence => "destroy_fence",
            Call::CreateSemaphore => "create_semaphore",
            Call::DestroySemaphore => "destroy_semaphore",
            Call::AllocateCommandBuffers(_) => "allocate_command_buffers",
            Call::FreeCommandBuffers => "free_command_buffers",
            Call::WaitForFence(..) => "wait_for_fence",
            Call::ResetFence(_) => "reset_fence",
            Call::ResetCommandBuffer(_) => "reset_command_buffer",
            Call::Acquire(_) => "acquire",
            Call::Submit(_) => "submit",
            Call::Present(_) => "present",
            Call::WaitIdle => "wait_idle",
            Call::WindowWait => "window_wait",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FenceState {
    signaled: bool,
    pending: bool,
}

struct State {
    next_id: u64,
    live: HashSet<u64>,
    calls: Vec<Call>,
    violations: Vec<String>,

    families: QueueFamilies,
    capabilities: vk::SurfaceCapabilitiesKHR,
    formats: Vec<vk::SurfaceFormatKHR>,
    present_modes: Vec<vk::PresentModeKHR>,
    image_count: Option<u32>,

    swapchain_images: HashMap<u64, Vec<vk::Image>>,
    last_swapchain_desc: Option<SwapchainDesc>,
    acquire_cursor: u32,

    fences: HashMap<u64, FenceState>,
    in_flight: HashMap<u64, u64>,
    signaled_semaphores: HashSet<u64>,
    submissions: usize,
    presented: Vec<u32>,

    acquire_script: VecDeque<DeviceResult<(u32, bool)>>,
    present_script: VecDeque<DeviceResult<bool>>,
    fence_wait_failure: Option<vk::Result>,
    submit_failure: Option<vk::Result>,
    command_buffer_reset_failure: Option<vk::Result>,
    surface_query_failure: Option<vk::Result>,
    swapchain_failure: Option<vk::Result>,
    semaphore_budget: Option<usize>,
}

/// Scriptable in-memory [`PresentationDevice`]
pub struct MockDevice {
    state: RefCell<State>,
}

impl MockDevice {
    /// Unified queue family, 800x600 surface, min 2 / unbounded images
    pub fn new() -> Self {
        let capabilities = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            current_extent: vk::Extent2D { width: 800, height: 600 },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 8192, height: 8192 },
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            ..Default::default()
        };

        Self {
            state: RefCell::new(State {
                next_id: 1,
                live: HashSet::new(),
                calls: Vec::new(),
                violations: Vec::new(),
                families: QueueFamilies::new(0, 0),
                capabilities,
                formats: vec![PREFERRED_FORMAT],
                present_modes: vec![vk::PresentModeKHR::FIFO, vk::PresentModeKHR::MAILBOX],
                image_count: None,
                swapchain_images: HashMap::new(),
                last_swapchain_desc: None,
                acquire_cursor: 0,
                fences: HashMap::new(),
                in_flight: HashMap::new(),
                signaled_semaphores: HashSet::new(),
                submissions: 0,
                presented: Vec::new(),
                acquire_script: VecDeque::new(),
                present_script: VecDeque::new(),
                fence_wait_failure: None,
                submit_failure: None,
                command_buffer_reset_failure: None,
                surface_query_failure: None,
                swapchain_failure: None,
                semaphore_budget: None,
            }),
        }
    }

    pub fn with_image_count(self, count: u32) -> Self {
        self.state.borrow_mut().image_count = Some(count);
        self
    }

    pub fn with_queue_families(self, families: QueueFamilies) -> Self {
        self.state.borrow_mut().families = families;
        self
    }

    pub fn with_surface_image_bounds(self, min: u32, max: u32) -> Self {
        {
            let mut state = self.state.borrow_mut();
            state.capabilities.min_image_count = min;
            state.capabilities.max_image_count = max;
        }
        self
    }

    pub fn set_surface_extent(&self, width: u32, height: u32) {
        self.state.borrow_mut().capabilities.current_extent = vk::Extent2D { width, height };
    }

    pub fn push_acquire_result(&self, result: DeviceResult<(u32, bool)>) {
        self.state.borrow_mut().acquire_script.push_back(result);
    }

    pub fn push_present_result(&self, result: DeviceResult<bool>) {
        self.state.borrow_mut().present_script.push_back(result);
    }

    pub fn fail_next_fence_wait(&self, result: vk::Result) {
        self.state.borrow_mut().fence_wait_failure = Some(result);
    }

    pub fn fail_next_submit(&self, result: vk::Result) {
        self.state.borrow_mut().submit_failure = Some(result);
    }

    pub fn fail_next_command_buffer_reset(&self, result: vk::Result) {
        self.state.borrow_mut().command_buffer_reset_failure = Some(result);
    }

    pub fn fail_next_surface_query(&self, result: vk::Result) {
        self.state.borrow_mut().surface_query_failure = Some(result);
    }

    pub fn fail_swapchain_creation(&self, result: vk::Result) {
        self.state.borrow_mut().swapchain_failure = Some(result);
    }

    /// Let `count` more semaphores be created, then fail
    pub fn fail_semaphore_creation_after(&self, count: usize) {
        self.state.borrow_mut().semaphore_budget = Some(count);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
    }

    pub fn call_count(&self, kind: &str) -> usize {
        self.state.borrow().calls.iter().filter(|call| call.kind() == kind).count()
    }

    pub fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    pub fn live_objects(&self) -> usize {
        self.state.borrow().live.len()
    }

    pub fn violations(&self) -> Vec<String> {
        self.state.borrow().violations.clone()
    }

    pub fn submissions(&self) -> usize {
        self.state.borrow().submissions
    }

    /// Image indices in presentation order
    pub fn presented(&self) -> Vec<u32> {
        self.state.borrow().presented.clone()
    }

    pub fn is_fence_signaled(&self, fence: vk::Fence) -> bool {
        self.state
            .borrow()
            .fences
            .get(&fence.as_raw())
            .map(|fence| fence.signaled)
            .unwrap_or(false)
    }

    pub fn last_swapchain_desc(&self) -> Option<SwapchainDesc> {
        self.state.borrow().last_swapchain_desc
    }

    fn create<H: Handle>(&self, call: Call) -> H {
        let mut state = self.state.borrow_mut();
        let id = state.next_id;
        state.next_id += 1;
        state.live.insert(id);
        state.calls.push(call);
        H::from_raw(id)
    }

    fn destroy<H: Handle + Copy + std::fmt::Debug>(&self, handle: H, call: Call) {
        let mut state = self.state.borrow_mut();
        state.calls.push(call);
        if !state.live.remove(&handle.as_raw()) {
            state.violations.push(format!("destroyed unknown or dead object {:?}", handle));
        }
    }
}

impl Default for MockDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl PresentationDevice for MockDevice {
    fn queue_families(&self) -> QueueFamilies {
        self.state.borrow().families
    }

    fn surface_capabilities(&self) -> DeviceResult<vk::SurfaceCapabilitiesKHR> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::SurfaceQuery);
        if let Some(result) = state.surface_query_failure.take() {
            return Err(result);
        }
        Ok(state.capabilities)
    }

    fn surface_formats(&self) -> DeviceResult<Vec<vk::SurfaceFormatKHR>> {
        Ok(self.state.borrow().formats.clone())
    }

    fn surface_present_modes(&self) -> DeviceResult<Vec<vk::PresentModeKHR>> {
        Ok(self.state.borrow().present_modes.clone())
    }

    fn create_swapchain(&self, desc: &SwapchainDesc, _label: &str) -> DeviceResult<vk::SwapchainKHR> {
        if let Some(result) = self.state.borrow_mut().swapchain_failure.take() {
            return Err(result);
        }
        let swapchain: vk::SwapchainKHR = self.create(Call::CreateSwapchain(*desc));

        let mut state = self.state.borrow_mut();
        let count = state.image_count.unwrap_or(desc.min_image_count);
        let first = state.next_id;
        state.next_id += u64::from(count);
        let images = (0..u64::from(count)).map(|i| vk::Image::from_raw(first + i)).collect();
        state.swapchain_images.insert(swapchain.as_raw(), images);
        state.last_swapchain_desc = Some(*desc);
        state.acquire_cursor = 0;
        Ok(swapchain)
    }

    fn swapchain_images(&self, swapchain: vk::SwapchainKHR) -> DeviceResult<Vec<vk::Image>> {
        self.state
            .borrow()
            .swapchain_images
            .get(&swapchain.as_raw())
            .cloned()
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)
    }

    fn destroy_swapchain(&self, swapchain: vk::SwapchainKHR) {
        self.destroy(swapchain, Call::DestroySwapchain(swapchain));
        self.state.borrow_mut().swapchain_images.remove(&swapchain.as_raw());
    }

    fn create_image_view(&self, _image: vk::Image, _format: vk::Format, _label: &str) -> DeviceResult<vk::ImageView> {
        Ok(self.create(Call::CreateImageView))
    }

    fn destroy_image_view(&self, view: vk::ImageView) {
        self.destroy(view, Call::DestroyImageView);
    }

    fn create_render_pass(&self, _format: vk::Format, _label: &str) -> DeviceResult<vk::RenderPass> {
        Ok(self.create(Call::CreateRenderPass))
    }

    fn destroy_render_pass(&self, render_pass: vk::RenderPass) {
        self.destroy(render_pass, Call::DestroyRenderPass);
    }

    fn create_framebuffer(
        &self,
        _render_pass: vk::RenderPass,
        _view: vk::ImageView,
        _extent: vk::Extent2D,
        _label: &str,
    ) -> DeviceResult<vk::Framebuffer> {
        Ok(self.create(Call::CreateFramebuffer))
    }

    fn destroy_framebuffer(&self, framebuffer: vk::Framebuffer) {
        self.destroy(framebuffer, Call::DestroyFramebuffer);
    }

    fn create_fence(&self, signaled: bool, _label: &str) -> DeviceResult<vk::Fence> {
        let fence: vk::Fence = self.create(Call::CreateFence);
        self.state.borrow_mut().fences.insert(
            fence.as_raw(),
            FenceState {
                signaled,
                pending: false,
            },
        );
        Ok(fence)
    }

    fn destroy_fence(&self, fence: vk::Fence) {
        self.destroy(fence, Call::DestroyFence);
        let mut state = self.state.borrow_mut();
        if state.fences.remove(&fence.as_raw()).map_or(false, |f| f.pending) {
            state.violations.push(format!("destroyed fence {:?} while in flight", fence));
        }
    }

    fn create_semaphore(&self, _label: &str) -> DeviceResult<vk::Semaphore> {
        {
            let mut state = self.state.borrow_mut();
            match state.semaphore_budget {
                Some(0) => return Err(vk::Result::ERROR_OUT_OF_DEVICE_MEMORY),
                Some(ref mut left) => *left -= 1,
                None => {}
            }
        }
        Ok(self.create(Call::CreateSemaphore))
    }

    fn destroy_semaphore(&self, semaphore: vk::Semaphore) {
        self.destroy(semaphore, Call::DestroySemaphore);
        self.state.borrow_mut().signaled_semaphores.remove(&semaphore.as_raw());
    }

    fn allocate_command_buffers(&self, count: u32, _label: &str) -> DeviceResult<Vec<vk::CommandBuffer>> {
        self.record(Call::AllocateCommandBuffers(count));
        let mut state = self.state.borrow_mut();
        let mut buffers = Vec::new();
        for _ in 0..count {
            let id = state.next_id;
            state.next_id += 1;
            state.live.insert(id);
            buffers.push(vk::CommandBuffer::from_raw(id));
        }
        Ok(buffers)
    }

    fn free_command_buffers(&self, command_buffers: &[vk::CommandBuffer]) {
        for &buffer in command_buffers {
            self.destroy(buffer, Call::FreeCommandBuffers);
        }
    }

    fn wait_for_fence(&self, fence: vk::Fence, timeout_ns: u64) -> DeviceResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::WaitForFence(fence, timeout_ns));
        if let Some(result) = state.fence_wait_failure.take() {
            return Err(result);
        }

        let raw = fence.as_raw();
        let current = state.fences.get(&raw).copied().unwrap_or_default();
        if current.signaled {
            Ok(())
        } else if current.pending {
            state.fences.insert(
                raw,
                FenceState {
                    signaled: true,
                    pending: false,
                },
            );
            state.in_flight.retain(|_, f| *f != raw);
            Ok(())
        } else {
            state
                .violations
                .push(format!("deadlock: waited on fence {:?} with no pending submission", fence));
            Err(vk::Result::TIMEOUT)
        }
    }

    fn reset_fence(&self, fence: vk::Fence) -> DeviceResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::ResetFence(fence));
        let entry = state.fences.entry(fence.as_raw()).or_default();
        let pending = entry.pending;
        entry.signaled = false;
        if pending {
            state.violations.push(format!("reset fence {:?} while in flight", fence));
        }
        Ok(())
    }

    fn reset_command_buffer(&self, command_buffer: vk::CommandBuffer) -> DeviceResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::ResetCommandBuffer(command_buffer));
        if let Some(result) = state.command_buffer_reset_failure.take() {
            return Err(result);
        }
        if state.in_flight.contains_key(&command_buffer.as_raw()) {
            state
                .violations
                .push(format!("reset command buffer {:?} while in flight", command_buffer));
        }
        Ok(())
    }

    fn acquire_next_image(&self, swapchain: vk::SwapchainKHR, signal: vk::Semaphore) -> DeviceResult<(u32, bool)> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Acquire(signal));
        let image_count = state
            .swapchain_images
            .get(&swapchain.as_raw())
            .map(|images| images.len() as u32)
            .ok_or(vk::Result::ERROR_SURFACE_LOST_KHR)?;

        let result = match state.acquire_script.pop_front() {
            Some(result) => result,
            None => {
                let index = state.acquire_cursor % image_count.max(1);
                state.acquire_cursor += 1;
                Ok((index, false))
            }
        };

        if result.is_ok() && !state.signaled_semaphores.insert(signal.as_raw()) {
            state
                .violations
                .push(format!("acquire signaled semaphore {:?} that was already signaled", signal));
        }
        result
    }

    fn submit(&self, desc: &SubmitDesc) -> DeviceResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Submit(*desc));
        if let Some(result) = state.submit_failure.take() {
            return Err(result);
        }

        let fence = state.fences.entry(desc.fence.as_raw()).or_default();
        let misuse = fence.signaled || fence.pending;
        fence.pending = true;
        if misuse {
            state
                .violations
                .push(format!("submitted with fence {:?} that was not reset", desc.fence));
        }
        if !state.signaled_semaphores.remove(&desc.wait_semaphore.as_raw()) {
            state
                .violations
                .push(format!("submission waits on unsignaled semaphore {:?}", desc.wait_semaphore));
        }
        state.signaled_semaphores.insert(desc.signal_semaphore.as_raw());
        state.in_flight.insert(desc.command_buffer.as_raw(), desc.fence.as_raw());
        state.submissions += 1;
        Ok(())
    }

    fn present(&self, desc: &PresentDesc) -> DeviceResult<bool> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Present(*desc));
        if !state.signaled_semaphores.remove(&desc.wait_semaphore.as_raw()) {
            state
                .violations
                .push(format!("present waits on unsignaled semaphore {:?}", desc.wait_semaphore));
        }
        let result = state.present_script.pop_front().unwrap_or(Ok(false));
        if result.is_ok() {
            state.presented.push(desc.image_index);
        }
        result
    }

    fn wait_idle(&self) -> DeviceResult<()> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::WaitIdle);
        for fence in state.fences.values_mut() {
            if fence.pending {
                fence.pending = false;
                fence.signaled = true;
            }
        }
        state.in_flight.clear();
        Ok(())
    }
}

/// Scriptable [`WindowSurface`]
pub struct MockWindow {
    size: (u32, u32),
    minimized: bool,
    waits_script: VecDeque<((u32, u32), bool)>,
    events: Vec<WindowEvent>,
    wait_count: usize,
    poll_count: usize,
    observer: Option<Rc<MockDevice>>,
}

impl MockWindow {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: (width, height),
            minimized: false,
            waits_script: VecDeque::new(),
            events: Vec::new(),
            wait_count: 0,
            poll_count: 0,
            observer: None,
        }
    }

    /// Log every blocking wait into `device`'s call list
    pub fn observed_by(mut self, device: Rc<MockDevice>) -> Self {
        self.observer = Some(device);
        self
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    pub fn set_minimized(&mut self, minimized: bool) {
        self.minimized = minimized;
    }

    /// States the window moves through, one per `wait_events` call
    pub fn script_waits(&mut self, states: impl IntoIterator<Item = ((u32, u32), bool)>) {
        self.waits_script.extend(states);
    }

    pub fn push_event(&mut self, event: WindowEvent) {
        self.events.push(event);
    }

    pub fn wait_count(&self) -> usize {
        self.wait_count
    }

    pub fn poll_count(&self) -> usize {
        self.poll_count
    }
}

impl WindowSurface for MockWindow {
    fn framebuffer_size(&self) -> (u32, u32) {
        self.size
    }

    fn is_minimized(&self) -> bool {
        self.minimized
    }

    fn poll_events(&mut self) {
        self.poll_count += 1;
    }

    fn wait_events(&mut self) {
        self.wait_count += 1;
        assert!(self.wait_count < 1000, "window never became presentable");
        if let Some(device) = &self.observer {
            device.record(Call::WindowWait);
        }
        if let Some((size, minimized)) = self.waits_script.pop_front() {
            self.size = size;
            self.minimized = minimized;
        }
    }

    fn drain_events(&mut self) -> Vec<WindowEvent> {
        std::mem::take(&mut self.events)
    }
}

/// [`CommandRecorder`] that remembers what it was asked to record
#[derive(Default)]
pub struct MockRecorder {
    pub recorded: Vec<(vk::CommandBuffer, RenderTarget)>,
    pub fail_next: Option<String>,
}

impl MockRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CommandRecorder for MockRecorder {
    fn record(&mut self, command_buffer: vk::CommandBuffer, target: &RenderTarget) -> Result<(), RecordError> {
        if let Some(message) = self.fail_next.take() {
            return Err(RecordError::new(message));
        }
        self.recorded.push((command_buffer, *target));
        Ok(())
    }
}
