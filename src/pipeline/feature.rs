use crate::config::{RenderPassEvent, UpscaleSettings};
use crate::foundation::core::Extent;
use crate::foundation::error::UpscaleResult;
use crate::native::backend::NativeBackend;
use crate::pipeline::frame::FrameContext;
use crate::pipeline::{TeardownReport, UpscalePipeline};
use crate::render::host::{CameraScale, RenderDevice};

/// Entry point for a host engine.
///
/// Creation never fails: when the native backend cannot be reached the error is logged once and
/// the feature stays disabled for the session. A disabled feature leaves the camera at native
/// scale and makes no native calls.
#[derive(Debug)]
pub struct UpscaleFeature<D: RenderDevice, B: NativeBackend> {
    settings: UpscaleSettings,
    pipeline: Option<UpscalePipeline<D, B>>,
}

impl<D: RenderDevice, B: NativeBackend> UpscaleFeature<D, B> {
    /// Build the pipeline, or a disabled feature if the boundary is unreachable.
    pub fn create(settings: UpscaleSettings, device: D, backend: B) -> Self {
        let pipeline = match UpscalePipeline::new(settings.clone(), device, backend) {
            Ok(p) => Some(p),
            Err(e) => {
                tracing::error!(error = %e, "upscaling disabled for this session");
                None
            }
        };
        Self { settings, pipeline }
    }

    /// `false` once initialization failed.
    pub fn is_enabled(&self) -> bool {
        self.pipeline.is_some()
    }

    /// Where in the host frame the pass should be scheduled.
    pub fn render_pass_event(&self) -> RenderPassEvent {
        self.settings.render_pass_event
    }

    /// The running pipeline, if enabled.
    pub fn pipeline(&self) -> Option<&UpscalePipeline<D, B>> {
        self.pipeline.as_ref()
    }

    /// Forward a settings change to the running pipeline.
    pub fn apply_settings(&mut self, settings: UpscaleSettings) {
        if let Some(p) = self.pipeline.as_mut() {
            p.apply_settings(settings.clone());
        }
        self.settings = settings;
    }

    /// Start a frame. `Ok(None)` while disabled.
    pub fn begin_frame(
        &mut self,
        base: Extent,
        camera: &mut dyn CameraScale,
    ) -> UpscaleResult<Option<FrameContext<'_, D, B>>> {
        match self.pipeline.as_mut() {
            Some(p) => p.begin_frame(base, camera).map(Some),
            None => Ok(None),
        }
    }

    /// Tear the pipeline down. `None` when the feature was disabled.
    pub fn dispose(self) -> Option<TeardownReport> {
        self.pipeline.map(UpscalePipeline::teardown)
    }
}
