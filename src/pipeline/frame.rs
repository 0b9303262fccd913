use crate::foundation::core::Extent;
use crate::native::backend::NativeBackend;
use crate::native::bridge::SkipReason;
use crate::pipeline::{PROFILER_TAG, UpscalePipeline};
use crate::render::host::{CommandStream, RenderDevice, SourceBuffer};

/// Result of one frame's execute phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum FrameOutcome {
    /// One push+trigger pair was issued.
    Upscaled {
        /// Size of the low-resolution source.
        source: Extent,
        /// Size of the intermediate buffer.
        destination: Extent,
    },
    /// The frame renders without the upscale step.
    Skipped(SkipReason),
}

impl FrameOutcome {
    /// `true` when the native work item was enqueued.
    pub fn is_upscaled(&self) -> bool {
        matches!(self, Self::Upscaled { .. })
    }
}

/// One frame, from setup to cleanup.
///
/// Created by [`UpscalePipeline::begin_frame`] (setup). [`execute`](Self::execute) is the body.
/// Dropping the context is cleanup and runs on every exit path, including early returns and
/// unwinding. Cleanup records the outcome; the bridge state is reset at the next setup.
#[must_use = "dropping the frame context immediately ends the frame"]
pub struct FrameContext<'p, D: RenderDevice, B: NativeBackend> {
    pipeline: &'p mut UpscalePipeline<D, B>,
    base: Extent,
    intermediate_ready: bool,
    outcome: Option<FrameOutcome>,
}

impl<'p, D: RenderDevice, B: NativeBackend> FrameContext<'p, D, B> {
    pub(crate) fn new(
        pipeline: &'p mut UpscalePipeline<D, B>,
        base: Extent,
        intermediate_ready: bool,
    ) -> Self {
        Self {
            pipeline,
            base,
            intermediate_ready,
            outcome: None,
        }
    }

    /// Native resolution this frame was set up for.
    pub fn base(&self) -> Extent {
        self.base
    }

    /// Size the engine should render the scene at this frame.
    pub fn render_extent(&self) -> Extent {
        self.pipeline.policy().render_extent(self.base)
    }

    /// Size of this frame's intermediate buffer, if one is ready.
    pub fn intermediate_extent(&self) -> Option<Extent> {
        if !self.intermediate_ready {
            return None;
        }
        self.pipeline.intermediate().map(|b| b.extent())
    }

    /// Outcome of `execute`, once it ran.
    pub fn outcome(&self) -> Option<FrameOutcome> {
        self.outcome
    }

    /// Execute phase: push both buffers and enqueue the backend's work item on `cmd`.
    ///
    /// Issues at most one push+trigger pair per frame. Without a source or a ready intermediate
    /// buffer no boundary call is made.
    pub fn execute(
        &mut self,
        cmd: &mut dyn CommandStream,
        source: Option<&SourceBuffer>,
    ) -> FrameOutcome {
        if self.outcome.is_some() {
            return FrameOutcome::Skipped(SkipReason::AlreadyExecuted);
        }

        cmd.push_debug_group(PROFILER_TAG);
        let outcome = self
            .pipeline
            .run_upscale(cmd, source, self.intermediate_ready);
        cmd.pop_debug_group();

        self.outcome = Some(outcome);
        outcome
    }
}

impl<D: RenderDevice, B: NativeBackend> Drop for FrameContext<'_, D, B> {
    fn drop(&mut self) {
        let outcome = self
            .outcome
            .unwrap_or(FrameOutcome::Skipped(SkipReason::NotExecuted));
        self.pipeline.finish_frame(outcome);
    }
}
