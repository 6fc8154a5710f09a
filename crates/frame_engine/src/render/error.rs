//! Error taxonomy for the frame loop
//!
//! Only stale-surface conditions are recovered internally (see
//! [`RecreateReasons`](crate::render::frame::RecreateReasons)). Every variant
//! here aborts the current frame and reaches the caller.

use ash::vk;
use std::fmt;
use thiserror::Error;

/// Phase of the frame loop an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FramePhase {
    /// Device, surface or frame ring setup
    Initialization,
    /// Waiting on a slot's completion fence
    FenceWait,
    /// Resetting a slot's completion fence
    FenceReset,
    /// Acquiring the next presentable image
    Acquire,
    /// Recording the slot's command buffer
    Record,
    /// Submitting to the graphics queue
    Submit,
    /// Presenting on the presentation queue
    Present,
    /// Tearing down and rebuilding the swapchain
    Recreate,
    /// Draining the device at shutdown
    Shutdown,
}

impl fmt::Display for FramePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FramePhase::Initialization => "initialization",
            FramePhase::FenceWait => "fence wait",
            FramePhase::FenceReset => "fence reset",
            FramePhase::Acquire => "image acquisition",
            FramePhase::Record => "command recording",
            FramePhase::Submit => "queue submission",
            FramePhase::Present => "presentation",
            FramePhase::Recreate => "swapchain recreation",
            FramePhase::Shutdown => "shutdown",
        };
        f.write_str(name)
    }
}

/// Failure reported by a [`CommandRecorder`](crate::render::api::CommandRecorder)
#[derive(Error, Debug)]
#[error("{message}")]
pub struct RecordError {
    message: String,
    result: Option<vk::Result>,
}

impl RecordError {
    /// Create a recording error with a description
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            result: None,
        }
    }

    /// Create a recording error from a driver result code
    pub fn from_vk(message: impl Into<String>, result: vk::Result) -> Self {
        Self {
            message: format!("{}: {:?}", message.into(), result),
            result: Some(result),
        }
    }

    /// Driver result code, when the failure came from the driver
    pub fn result(&self) -> Option<vk::Result> {
        self.result
    }
}

/// Fatal errors surfaced by the frame subsystem
#[derive(Error, Debug)]
pub enum RenderError {
    /// The device cannot present to this surface at all
    #[error("surface does not support presentation: {reason}")]
    UnsupportedSurface {
        /// What the device reported missing
        reason: String,
    },

    /// GPU driver or hardware failure; the device must be rebuilt from scratch
    #[error("device lost during {phase}: {result:?}")]
    DeviceLost {
        /// Phase that observed the loss
        phase: FramePhase,
        /// Driver result code
        result: vk::Result,
    },

    /// The driver rejected a swapchain configuration
    #[error("swapchain creation failed: {reason}")]
    SwapChainCreation {
        /// Description of the rejected step
        reason: String,
        /// Driver result code, if the driver reported one
        result: Option<vk::Result>,
    },

    /// Unexpected failure while using an existing swapchain
    #[error("swapchain error during {phase}: {result:?}")]
    SwapChain {
        /// Phase that failed
        phase: FramePhase,
        /// Driver result code
        result: vk::Result,
    },

    /// Unexpected presentation failure
    #[error("presentation failed: {result:?}")]
    Presentation {
        /// Driver result code
        result: vk::Result,
    },

    /// The render-command recorder failed
    #[error("command recording failed: {source}")]
    Recording {
        /// Recorder failure
        #[from]
        source: RecordError,
    },

    /// Queue submission was rejected
    #[error("queue submission failed: {result:?}")]
    Submission {
        /// Driver result code
        result: vk::Result,
    },

    /// Instance, device or ring setup failed
    #[error("initialization failed: {reason}")]
    Initialization {
        /// What failed
        reason: String,
    },

    /// Window system failure
    #[error("window error: {0}")]
    Window(#[from] crate::render::window::WindowError),
}

impl RenderError {
    /// Phase the error belongs to, for top-level reporting
    pub fn phase(&self) -> FramePhase {
        match self {
            RenderError::UnsupportedSurface { .. } => FramePhase::Recreate,
            RenderError::DeviceLost { phase, .. } => *phase,
            RenderError::SwapChainCreation { .. } => FramePhase::Recreate,
            RenderError::SwapChain { phase, .. } => *phase,
            RenderError::Presentation { .. } => FramePhase::Present,
            RenderError::Recording { .. } => FramePhase::Record,
            RenderError::Submission { .. } => FramePhase::Submit,
            RenderError::Initialization { .. } => FramePhase::Initialization,
            RenderError::Window(_) => FramePhase::Initialization,
        }
    }

    /// Whether the device itself has to be thrown away
    pub fn is_device_lost(&self) -> bool {
        matches!(self, RenderError::DeviceLost { .. })
    }

    /// Map a driver code to `DeviceLost` when it is one, else to `fallback`
    pub(crate) fn classify(
        phase: FramePhase,
        result: vk::Result,
        fallback: impl FnOnce(vk::Result) -> RenderError,
    ) -> RenderError {
        if result == vk::Result::ERROR_DEVICE_LOST {
            RenderError::DeviceLost { phase, result }
        } else {
            fallback(result)
        }
    }

    pub(crate) fn creation(reason: impl Into<String>, result: vk::Result) -> RenderError {
        RenderError::SwapChainCreation {
            reason: reason.into(),
            result: Some(result),
        }
    }

    pub(crate) fn init(reason: impl Into<String>) -> RenderError {
        RenderError::Initialization {
            reason: reason.into(),
        }
    }
}

/// Result type for the frame subsystem
pub type RenderResult<T> = Result<T, RenderError>;
