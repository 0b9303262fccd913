//! Per-frame orchestration of an opaque native upscaler inside a real-time render loop.
//!
//! Each frame the scene is rendered at a fraction of native resolution, the low-resolution color
//! buffer and a higher-resolution intermediate buffer are handed to a native backend, and the
//! backend's GPU work item is enqueued on the frame's command stream.
//!
//! - Build an [`UpscalePipeline`] (or an [`UpscaleFeature`], which disables itself when the
//!   native backend is unreachable)
//! - Per frame, [`UpscalePipeline::begin_frame`] (setup), [`FrameContext::execute`], then drop the
//!   context (cleanup)
//! - [`UpscalePipeline::teardown`] releases the buffer and the log callbacks
#![deny(unsafe_code)]

mod foundation;

/// Host-facing settings.
pub mod config;
/// `wgpu` host implementations.
#[cfg(feature = "gpu")]
pub mod gpu;
/// Native backend boundary.
pub mod native;
/// Frame orchestration.
pub mod pipeline;
/// Host engine interfaces and intermediate buffer lifecycle.
pub mod render;
/// Render and upscale scale policy.
pub mod resolution;
/// In-memory host and backend.
pub mod sim;

pub use crate::foundation::core::{ExecutionToken, Extent, NativeHandle, UPSCALE_EVENT_ID};
pub use crate::foundation::error::{UpscaleError, UpscaleResult};

pub use crate::config::{RenderPassEvent, UpscaleSettings};
pub use crate::native::backend::{NativeBackend, NativeBridgeHandles};
pub use crate::native::bridge::{
    BridgeState, BridgeStats, BuffersPushed, LogRegistration, NativeBridge, SkipReason,
};
pub use crate::native::ffi::{CPluginBackend, LogSink, PluginExports};
pub use crate::pipeline::feature::UpscaleFeature;
pub use crate::pipeline::frame::{FrameContext, FrameOutcome};
pub use crate::pipeline::{PROFILER_TAG, PipelineStats, TeardownReport, UpscalePipeline};
pub use crate::render::host::{
    CameraScale, ColorFormat, CommandStream, IntermediateBuffer, RenderDevice, SourceBuffer,
    TargetDesc,
};
pub use crate::render::target::{RenderTargetManager, TargetStats};
pub use crate::resolution::{FrameResolutionPolicy, ResolutionController};
