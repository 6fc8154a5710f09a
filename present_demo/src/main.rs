//! Present demo
//!
//! Opens a window and draws a triangle over a slowly cycling background
//! through the frame orchestrator. Resize, minimize and restore the window to
//! watch the swapchain being rebuilt. Escape or closing the window quits.
//!
//! Shaders come from `renderer.shader_dir`, or from the directory the build
//! script compiled them into. When they cannot be loaded the demo only
//! clears.
//!
//! Usage: `present_demo [config.toml | config.ron]`

use std::f64::consts::TAU;
use std::rc::Rc;

use ash::vk;
use frame_engine::core::{ApplicationConfig, Config};
use frame_engine::events::WindowEvent;
use frame_engine::foundation::logging;
use frame_engine::foundation::time::{FixedTimestep, Timer};
use frame_engine::render::{
    ClearPassRecorder, CommandRecorder, FrameOrchestrator, FrameOutcome, GlfwWindow, RecordError, RenderError,
    RenderResult, RenderTarget, TrianglePassRecorder, VulkanContext, VulkanDevice, WindowSurface,
};
use glfw::Key;

/// Seconds for one trip around the color wheel
const COLOR_PERIOD_SECS: f64 = 8.0;

/// Frames between FPS reports
const FPS_REPORT_INTERVAL: u64 = 600;

/// Where the build script put the compiled shaders
const BUILT_SHADER_DIR: &str = env!("FRAME_ENGINE_SHADER_DIR");

type Frames = FrameOrchestrator<VulkanDevice, GlfwWindow, DemoRecorder>;

/// Triangle when the shaders load, plain clear otherwise
enum DemoRecorder {
    Triangle(TrianglePassRecorder),
    Clear(ClearPassRecorder),
}

impl DemoRecorder {
    fn new(device: &Rc<VulkanDevice>, shader_dir: &str, clear_color: [f32; 4]) -> Self {
        match TrianglePassRecorder::new(Rc::clone(device), shader_dir, clear_color) {
            Ok(recorder) => DemoRecorder::Triangle(recorder),
            Err(err) => {
                log::warn!("Drawing without a triangle: {}", err);
                DemoRecorder::Clear(ClearPassRecorder::new(device, clear_color))
            }
        }
    }

    fn set_clear_color(&mut self, color: [f32; 4]) {
        match self {
            DemoRecorder::Triangle(recorder) => recorder.set_clear_color(color),
            DemoRecorder::Clear(recorder) => recorder.set_clear_color(color),
        }
    }
}

impl CommandRecorder for DemoRecorder {
    fn record(&mut self, command_buffer: vk::CommandBuffer, target: &RenderTarget) -> Result<(), RecordError> {
        match self {
            DemoRecorder::Triangle(recorder) => recorder.record(command_buffer, target),
            DemoRecorder::Clear(recorder) => recorder.record(command_buffer, target),
        }
    }
}

/// What the frame loop does with a window event
#[derive(Debug, PartialEq, Eq)]
enum EventAction {
    Quit,
    Resize,
    Ignore,
}

fn event_action(event: &WindowEvent) -> EventAction {
    match event {
        WindowEvent::Closed => EventAction::Quit,
        event if event.is_key_pressed(Key::Escape) => EventAction::Quit,
        event if event.is_resize() => EventAction::Resize,
        _ => EventAction::Ignore,
    }
}

struct PresentDemo {
    frames: Frames,
    timer: Timer,
    timestep: FixedTimestep,
    base_color: [f32; 4],
    simulated_secs: f64,
}

impl PresentDemo {
    fn new(config: &ApplicationConfig) -> RenderResult<Self> {
        let window = GlfwWindow::new(&config.window)?;
        let context = VulkanContext::new(&window, &config.renderer)?;
        let device = Rc::new(VulkanDevice::new(context));
        let shader_dir = config.renderer.shader_dir.as_deref().unwrap_or(BUILT_SHADER_DIR);
        let recorder = DemoRecorder::new(&device, shader_dir, config.renderer.clear_color);

        let frames = FrameOrchestrator::initialize(device, window, recorder, config.renderer.max_frames_in_flight)?;

        Ok(Self {
            frames,
            timer: Timer::new(),
            timestep: FixedTimestep::default(),
            base_color: config.renderer.clear_color,
            simulated_secs: 0.0,
        })
    }

    fn run(&mut self) -> RenderResult<()> {
        while !self.frames.window().should_close() {
            self.frames.window_mut().poll_events();
            for event in self.frames.window_mut().drain_events() {
                log::trace!("Window event {:?}", event);
                match event_action(&event) {
                    EventAction::Quit => self.frames.window_mut().set_should_close(true),
                    EventAction::Resize => self.frames.notify_resized(),
                    EventAction::Ignore => {}
                }
            }
            if self.frames.window().should_close() {
                break;
            }

            self.timer.update();
            for _ in 0..self.timestep.tick() {
                self.simulated_secs += self.timestep.timestep_secs();
            }
            let color = cycled_color(self.base_color, self.simulated_secs);
            self.frames.recorder_mut().set_clear_color(color);

            if let FrameOutcome::Skipped = self.frames.render_one_frame()? {
                log::debug!("Frame skipped while the swapchain was rebuilt");
            }

            if self.timer.frame_count() % FPS_REPORT_INTERVAL == 0 {
                log::info!(
                    "{} frames presented, {:.1} fps average",
                    self.frames.frames_presented(),
                    self.timer.average_fps()
                );
            }
        }

        Ok(())
    }

    fn shutdown(&mut self) -> RenderResult<()> {
        self.frames.shutdown()
    }
}

/// `base` brightened by three phase-shifted waves, one per channel
fn cycled_color(base: [f32; 4], secs: f64) -> [f32; 4] {
    let phase = TAU * secs / COLOR_PERIOD_SECS;
    let wave = |offset: f64| (0.5 + 0.5 * (phase + offset).sin()) as f32;

    [
        (0.5 * base[0] + 0.5 * wave(0.0)).clamp(0.0, 1.0),
        (0.5 * base[1] + 0.5 * wave(TAU / 3.0)).clamp(0.0, 1.0),
        (0.5 * base[2] + 0.5 * wave(2.0 * TAU / 3.0)).clamp(0.0, 1.0),
        base[3],
    ]
}

fn load_config() -> Result<ApplicationConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => Ok(ApplicationConfig::load_from_file(path)?),
        None => Ok(ApplicationConfig::default()),
    }
}

fn report(context: &str, err: &RenderError) {
    if err.is_device_lost() {
        log::error!("{}: device lost during {}: {}", context, err.phase(), err);
    } else {
        log::error!("{} during {}: {}", context, err.phase(), err);
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config()?;
    logging::init(config.engine.level_filter()?);

    log::info!("Starting present demo");

    let mut demo = match PresentDemo::new(&config) {
        Ok(demo) => demo,
        Err(err) => {
            report("Startup failed", &err);
            return Err(err.into());
        }
    };

    let result = demo.run();
    if let Err(err) = &result {
        report("Frame loop stopped", err);
    }

    if let Err(err) = demo.shutdown() {
        report("Shutdown failed", &err);
    }

    log::info!("Present demo finished");
    result.map_err(Into::into)
}
