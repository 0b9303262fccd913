use crate::foundation::core::{ExecutionToken, UPSCALE_EVENT_ID};
use crate::foundation::error::{UpscaleError, UpscaleResult};
use crate::native::backend::{NativeBackend, NativeBridgeHandles};
use crate::native::ffi::LogSink;
use crate::render::host::{CommandStream, IntermediateBuffer, SourceBuffer};

/// Per-frame bridge state: `Idle -> BuffersPushed -> Triggered -> Idle`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub enum BridgeState {
    /// Nothing pushed this frame.
    #[default]
    Idle,
    /// Handles pushed, trigger pending.
    BuffersPushed,
    /// Work item enqueued on the command stream.
    Triggered,
}

/// Why a frame rendered without the upscale step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub enum SkipReason {
    /// The engine provided no source buffer.
    MissingSource,
    /// The source buffer has no native texture behind it.
    MissingSourceHandle,
    /// No correctly sized intermediate buffer this frame (e.g. empty base resolution).
    MissingIntermediate,
    /// A dimension is zero or does not fit the backend's `int`.
    DimensionsOutOfRange,
    /// `execute` already ran for this frame.
    AlreadyExecuted,
    /// The frame ended without `execute` being called.
    NotExecuted,
}

/// Counters for boundary traffic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct BridgeStats {
    /// Successful `SetTextureFromUnity` pushes.
    pub pushes: u64,
    /// Plugin events issued.
    pub triggers: u64,
    /// Pushes skipped because the handles were unusable.
    pub skipped_pushes: u64,
}

/// Proof that the log entry points are registered with a backend.
///
/// Must be given back through [`release`](Self::release); dropping it leaves the callbacks
/// registered.
#[derive(Debug)]
#[must_use = "a log registration must be released on teardown"]
pub struct LogRegistration {
    _registered: (),
}

impl LogRegistration {
    /// Register the forwarding entry points with `backend`.
    pub fn register<B: NativeBackend + ?Sized>(backend: &mut B) -> Self {
        backend.set_log_callback(Some(LogSink::forwarding()));
        Self { _registered: () }
    }

    /// Deregister from `backend`. Consumes the registration, so it runs at most once.
    pub fn release<B: NativeBackend + ?Sized>(self, backend: &mut B) {
        backend.set_log_callback(None);
    }
}

/// Native Backend Bridge.
///
/// Owns the backend, the cached execution token and the log registration. Triggering is only
/// reachable through [`BuffersPushed`], so a trigger without a preceding push cannot be written.
#[derive(Debug)]
pub struct NativeBridge<B: NativeBackend> {
    backend: B,
    token: ExecutionToken,
    registration: Option<LogRegistration>,
    state: BridgeState,
    stats: BridgeStats,
}

impl<B: NativeBackend> NativeBridge<B> {
    /// Register log callbacks and fetch the execution token, once.
    ///
    /// A backend without a render-event function is unusable; the registration is released and
    /// a boundary error returned.
    pub fn connect(mut backend: B) -> UpscaleResult<Self> {
        let registration = LogRegistration::register(&mut backend);
        let Some(token) = backend.render_event_func() else {
            registration.release(&mut backend);
            return Err(UpscaleError::boundary(
                "native backend returned no render event function",
            ));
        };
        tracing::debug!(token = token.raw(), "native bridge connected");
        Ok(Self {
            backend,
            token,
            registration: Some(registration),
            state: BridgeState::Idle,
            stats: BridgeStats::default(),
        })
    }

    /// Current per-frame state.
    pub fn state(&self) -> BridgeState {
        self.state
    }

    /// Cached execution token.
    pub fn token(&self) -> ExecutionToken {
        self.token
    }

    /// Boundary counters.
    pub fn stats(&self) -> BridgeStats {
        self.stats
    }

    /// Borrow the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// `true` while the log callbacks are registered.
    pub fn callbacks_registered(&self) -> bool {
        self.registration.is_some()
    }

    /// Return to `Idle` for the next frame.
    pub fn reset(&mut self) {
        self.state = BridgeState::Idle;
    }

    /// Push source and destination handles to the backend.
    ///
    /// Unusable handles skip the push without touching the backend.
    pub fn push_buffers(
        &mut self,
        source: &SourceBuffer,
        destination: &IntermediateBuffer,
    ) -> Result<BuffersPushed<'_, B>, SkipReason> {
        let Some(handles) = NativeBridgeHandles::describe(source, destination) else {
            self.stats.skipped_pushes = self.stats.skipped_pushes.saturating_add(1);
            let reason = if source.handle.is_none() {
                SkipReason::MissingSourceHandle
            } else {
                SkipReason::DimensionsOutOfRange
            };
            tracing::warn!(
                ?reason,
                source = %source.extent,
                destination = %destination.extent(),
                "skipping native push"
            );
            return Err(reason);
        };

        self.backend.set_texture_from_host(&handles);
        self.state = BridgeState::BuffersPushed;
        self.stats.pushes = self.stats.pushes.saturating_add(1);
        Ok(BuffersPushed { bridge: self })
    }

    /// Deregister the log callbacks. Returns `true` only the first time.
    pub fn release_callbacks(&mut self) -> bool {
        match self.registration.take() {
            Some(registration) => {
                registration.release(&mut self.backend);
                true
            }
            None => false,
        }
    }

    /// Release the callbacks (if still registered) and hand the backend back.
    pub fn shutdown(mut self) -> B {
        self.release_callbacks();
        self.backend
    }
}

/// Handles were pushed this frame; the only way to reach the trigger.
#[must_use = "pushed buffers must be followed by a trigger in the same frame"]
pub struct BuffersPushed<'a, B: NativeBackend> {
    bridge: &'a mut NativeBridge<B>,
}

impl<B: NativeBackend> BuffersPushed<'_, B> {
    /// Record the backend's work item on `cmd`, right after the push.
    ///
    /// Fire-and-forget: nothing waits for the GPU work to complete.
    pub fn trigger(self, cmd: &mut dyn CommandStream) {
        cmd.issue_plugin_event(self.bridge.token, UPSCALE_EVENT_ID);
        self.bridge.state = BridgeState::Triggered;
        self.bridge.stats.triggers = self.bridge.stats.triggers.saturating_add(1);
    }
}
