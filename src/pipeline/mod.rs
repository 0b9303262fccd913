//! Frame orchestration: setup, execute and cleanup around the native upscale step.
//!
//! Known gap: the native protocol never signals when the backend has finished reading frame N's
//! buffers. When the intermediate buffer is reused unchanged, frame N+1 may write it while the
//! backend's previous work item is still in flight. No fence is added here; the protocol does not
//! provide one.

/// Host-facing wrapper that disables itself on boundary failure.
pub mod feature;
/// Scoped per-frame context.
pub mod frame;

use crate::config::{RenderPassEvent, UpscaleSettings};
use crate::foundation::core::Extent;
use crate::foundation::error::UpscaleResult;
use crate::native::backend::NativeBackend;
use crate::native::bridge::{BridgeState, BridgeStats, NativeBridge, SkipReason};
use crate::pipeline::frame::{FrameContext, FrameOutcome};
use crate::render::host::{
    CameraScale, CommandStream, IntermediateBuffer, RenderDevice, SourceBuffer,
};
use crate::render::target::{RenderTargetManager, TargetStats};
use crate::resolution::{FrameResolutionPolicy, ResolutionController};

/// Label of the profiling scope wrapped around the upscale commands.
pub const PROFILER_TAG: &str = "UpscalePass";

/// Frame-level counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct PipelineStats {
    /// Frames that went through setup and cleanup.
    pub frames: u64,
    /// Frames that issued a push+trigger pair.
    pub upscaled: u64,
    /// Frames that rendered without the upscale step.
    pub skipped: u64,
    /// Intermediate buffer counters.
    pub targets: TargetStats,
    /// Boundary counters.
    pub bridge: BridgeStats,
}

/// What teardown released.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct TeardownReport {
    /// The intermediate buffer was released.
    pub buffer_released: bool,
    /// The log callbacks were deregistered.
    pub callbacks_released: bool,
    /// Frames processed before teardown.
    pub frames: u64,
}

/// Composition of the resolution controller, the intermediate-buffer manager and the native
/// bridge, driven once per rendered frame.
#[derive(Debug)]
pub struct UpscalePipeline<D: RenderDevice, B: NativeBackend> {
    settings: UpscaleSettings,
    device: D,
    resolution: ResolutionController,
    targets: RenderTargetManager,
    bridge: NativeBridge<B>,
    frames: u64,
    upscaled: u64,
    skipped: u64,
    torn_down: bool,
}

impl<D: RenderDevice, B: NativeBackend> UpscalePipeline<D, B> {
    /// Connect to the backend and build the pipeline.
    ///
    /// Fails with a boundary error when the backend cannot be driven; callers should treat the
    /// feature as disabled for the session.
    pub fn new(settings: UpscaleSettings, device: D, backend: B) -> UpscaleResult<Self> {
        let bridge = NativeBridge::connect(backend)?;
        let policy = FrameResolutionPolicy::from_settings(&settings);
        tracing::info!(
            render_scale = policy.render_scale(),
            upscale_factor = policy.upscale_factor(),
            pass_event = ?settings.render_pass_event,
            "upscale pipeline ready"
        );
        Ok(Self {
            settings,
            device,
            resolution: ResolutionController::new(policy),
            targets: RenderTargetManager::new(),
            bridge,
            frames: 0,
            upscaled: 0,
            skipped: 0,
            torn_down: false,
        })
    }

    /// Active settings as given by the host.
    pub fn settings(&self) -> &UpscaleSettings {
        &self.settings
    }

    /// Where in the host frame this pass runs.
    pub fn render_pass_event(&self) -> RenderPassEvent {
        self.settings.render_pass_event
    }

    /// Clamped policy in effect.
    pub fn policy(&self) -> &FrameResolutionPolicy {
        self.resolution.policy()
    }

    /// Replace the settings. The next frame setup resizes the intermediate buffer if needed.
    pub fn apply_settings(&mut self, settings: UpscaleSettings) {
        let policy = FrameResolutionPolicy::from_settings(&settings);
        tracing::debug!(
            render_scale = policy.render_scale(),
            upscale_factor = policy.upscale_factor(),
            "upscale settings changed"
        );
        self.resolution.set_policy(policy);
        self.settings = settings;
    }

    /// Current intermediate buffer, if allocated.
    pub fn intermediate(&self) -> Option<&IntermediateBuffer> {
        self.targets.current()
    }

    /// Per-frame bridge state.
    pub fn bridge_state(&self) -> BridgeState {
        self.bridge.state()
    }

    /// Borrow the render device.
    pub fn device(&self) -> &D {
        &self.device
    }

    /// Borrow the native backend.
    pub fn backend(&self) -> &B {
        self.bridge.backend()
    }

    /// Frame and resource counters.
    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            frames: self.frames,
            upscaled: self.upscaled,
            skipped: self.skipped,
            targets: self.targets.stats(),
            bridge: self.bridge.stats(),
        }
    }

    /// Setup phase: write the render scale, size the intermediate buffer, reset the bridge.
    ///
    /// Between cleanup and this call the bridge keeps the previous frame's state.
    ///
    /// An empty base resolution skips the buffer for this frame. A failed allocation is fatal
    /// for the pass and propagates. The render scale has already been written by then, so that
    /// frame renders at the reduced scale without an upscale pass.
    #[tracing::instrument(level = "trace", skip(self, camera), fields(frame = self.frames))]
    pub fn begin_frame(
        &mut self,
        base: Extent,
        camera: &mut dyn CameraScale,
    ) -> UpscaleResult<FrameContext<'_, D, B>> {
        self.bridge.reset();
        self.resolution.apply(camera);

        let intermediate_ready = if base.is_empty() {
            false
        } else {
            self.targets
                .ensure(&mut self.device, base, self.resolution.policy())?;
            true
        };

        Ok(FrameContext::new(self, base, intermediate_ready))
    }

    /// Release the intermediate buffer and the log callbacks, exactly once.
    pub fn teardown(mut self) -> TeardownReport {
        self.teardown_in_place()
    }

    pub(crate) fn run_upscale(
        &mut self,
        cmd: &mut dyn CommandStream,
        source: Option<&SourceBuffer>,
        intermediate_ready: bool,
    ) -> FrameOutcome {
        let Some(source) = source else {
            return FrameOutcome::Skipped(SkipReason::MissingSource);
        };
        let destination = match self.targets.current() {
            Some(d) if intermediate_ready => d,
            _ => return FrameOutcome::Skipped(SkipReason::MissingIntermediate),
        };

        match self.bridge.push_buffers(source, destination) {
            Ok(pushed) => {
                pushed.trigger(cmd);
                FrameOutcome::Upscaled {
                    source: source.extent,
                    destination: destination.extent(),
                }
            }
            Err(reason) => FrameOutcome::Skipped(reason),
        }
    }

    pub(crate) fn finish_frame(&mut self, outcome: FrameOutcome) {
        self.frames = self.frames.saturating_add(1);
        match outcome {
            FrameOutcome::Upscaled { .. } => self.upscaled = self.upscaled.saturating_add(1),
            FrameOutcome::Skipped(reason) => {
                self.skipped = self.skipped.saturating_add(1);
                tracing::trace!(?reason, "frame rendered without upscale");
            }
        }
    }

    fn teardown_in_place(&mut self) -> TeardownReport {
        if self.torn_down {
            return TeardownReport {
                frames: self.frames,
                ..TeardownReport::default()
            };
        }
        self.torn_down = true;

        let buffer_released = self.targets.release(&mut self.device);
        let callbacks_released = self.bridge.release_callbacks();
        tracing::info!(
            frames = self.frames,
            buffer_released,
            callbacks_released,
            "upscale pipeline torn down"
        );
        TeardownReport {
            buffer_released,
            callbacks_released,
            frames: self.frames,
        }
    }
}

impl<D: RenderDevice, B: NativeBackend> Drop for UpscalePipeline<D, B> {
    fn drop(&mut self) {
        self.teardown_in_place();
    }
}
