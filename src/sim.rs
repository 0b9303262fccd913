//! In-memory host engine and native backend.
//!
//! Every allocation and boundary call is appended to a shared [`SimLedger`], in order, so tests
//! and the CLI can check sequencing and leak freedom without a GPU.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::foundation::core::{ExecutionToken, Extent, NativeHandle};
use crate::foundation::error::{UpscaleError, UpscaleResult};
use crate::native::backend::{NativeBackend, NativeBridgeHandles};
use crate::native::ffi::LogSink;
use crate::render::host::{
    CameraScale, CommandStream, IntermediateBuffer, RenderDevice, SourceBuffer, TargetDesc,
};

/// Token handed out by [`SimBackend`].
pub const SIM_EVENT_TOKEN: usize = 0xE7E7;
/// Handle of the engine-owned low-resolution color buffer.
pub const SIM_SOURCE_HANDLE: usize = 0x5_0000;

/// One recorded call.
#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    /// Camera render scale written.
    SetRenderScale(f32),
    /// Render target allocated.
    Allocate {
        /// Device handle.
        handle: NativeHandle,
        /// Size.
        extent: Extent,
    },
    /// Render target released.
    Release {
        /// Device handle.
        handle: NativeHandle,
    },
    /// `SetLogCallback`; `true` registers, `false` deregisters.
    SetLogCallback(bool),
    /// `SetTextureFromUnity`.
    SetTexture(NativeBridgeHandles),
    /// `GetRenderEventFunc`.
    GetRenderEventFunc,
    /// Debug group opened on the command stream.
    PushDebugGroup(String),
    /// Debug group closed.
    PopDebugGroup,
    /// Plugin event recorded on the command stream.
    IssuePluginEvent {
        /// Token passed.
        token: ExecutionToken,
        /// Event id passed.
        event_id: i32,
    },
}

impl SimEvent {
    /// `true` for calls that cross into the native backend.
    pub fn is_native_call(&self) -> bool {
        matches!(
            self,
            Self::SetLogCallback(_)
                | Self::SetTexture(_)
                | Self::GetRenderEventFunc
                | Self::IssuePluginEvent { .. }
        )
    }
}

/// Shared record of everything the simulated host and backend saw.
#[derive(Debug, Default)]
pub struct SimLedger {
    /// Calls in order.
    pub events: Vec<SimEvent>,
    /// Targets currently allocated.
    pub live_targets: BTreeMap<NativeHandle, Extent>,
    next_handle: usize,
    fail_allocations: u32,
    no_render_event: bool,
}

impl SimLedger {
    /// Number of recorded events matching `pred`.
    pub fn count(&self, pred: impl Fn(&SimEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    /// Only the native boundary calls, in order.
    pub fn native_calls(&self) -> Vec<SimEvent> {
        self.events
            .iter()
            .filter(|e| e.is_native_call())
            .cloned()
            .collect()
    }
}

/// Factory for simulated collaborators sharing one ledger.
#[derive(Clone, Debug, Default)]
pub struct SimHost {
    ledger: Arc<Mutex<SimLedger>>,
}

impl SimHost {
    /// Fresh host with an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the ledger for inspection.
    pub fn ledger(&self) -> MutexGuard<'_, SimLedger> {
        lock(&self.ledger)
    }

    /// Make the next `n` allocations fail.
    pub fn fail_allocations(&self, n: u32) {
        lock(&self.ledger).fail_allocations = n;
    }

    /// Make backends from this host return no render-event function.
    pub fn without_render_event(&self) {
        lock(&self.ledger).no_render_event = true;
    }

    /// Render device.
    pub fn device(&self) -> SimDevice {
        SimDevice {
            ledger: Arc::clone(&self.ledger),
        }
    }

    /// Native backend.
    pub fn backend(&self) -> SimBackend {
        SimBackend {
            ledger: Arc::clone(&self.ledger),
            sink: None,
        }
    }

    /// Camera.
    pub fn camera(&self) -> SimCamera {
        SimCamera {
            ledger: Arc::clone(&self.ledger),
            render_scale: 1.0,
        }
    }

    /// Command stream for one frame.
    pub fn command_stream(&self) -> SimCommandStream {
        SimCommandStream {
            ledger: Arc::clone(&self.ledger),
            depth: 0,
        }
    }

    /// The engine's low-resolution color buffer at `extent`.
    pub fn source(&self, extent: Extent) -> SourceBuffer {
        SourceBuffer {
            handle: NativeHandle::new(SIM_SOURCE_HANDLE),
            extent,
        }
    }
}

fn lock(ledger: &Mutex<SimLedger>) -> MutexGuard<'_, SimLedger> {
    ledger.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Simulated [`RenderDevice`].
#[derive(Debug)]
pub struct SimDevice {
    ledger: Arc<Mutex<SimLedger>>,
}

impl RenderDevice for SimDevice {
    fn allocate_color_target(&mut self, desc: &TargetDesc) -> UpscaleResult<IntermediateBuffer> {
        let mut l = lock(&self.ledger);
        if l.fail_allocations > 0 {
            l.fail_allocations -= 1;
            return Err(UpscaleError::allocation(format!(
                "simulated allocation failure for {}",
                desc.extent
            )));
        }
        if desc.extent.is_empty() {
            return Err(UpscaleError::allocation("cannot allocate an empty target"));
        }

        l.next_handle += 1;
        let handle = NativeHandle::new(0x1000 + l.next_handle)
            .ok_or_else(|| UpscaleError::allocation("handle space exhausted"))?;
        l.live_targets.insert(handle, desc.extent);
        l.events.push(SimEvent::Allocate {
            handle,
            extent: desc.extent,
        });
        Ok(IntermediateBuffer::new(handle, desc))
    }

    fn release_color_target(&mut self, target: IntermediateBuffer) {
        let mut l = lock(&self.ledger);
        l.live_targets.remove(&target.handle());
        l.events.push(SimEvent::Release {
            handle: target.handle(),
        });
    }
}

/// Simulated [`NativeBackend`]. Logs through the registered sink like a real plugin.
#[derive(Debug)]
pub struct SimBackend {
    ledger: Arc<Mutex<SimLedger>>,
    sink: Option<LogSink>,
}

impl NativeBackend for SimBackend {
    fn set_log_callback(&mut self, sink: Option<LogSink>) {
        lock(&self.ledger)
            .events
            .push(SimEvent::SetLogCallback(sink.is_some()));
        self.sink = sink;
    }

    fn set_texture_from_host(&mut self, handles: &NativeBridgeHandles) {
        lock(&self.ledger).events.push(SimEvent::SetTexture(*handles));
        if let Some(sink) = &self.sink {
            sink.info(&format!(
                "textures updated: {}x{} -> {}x{}",
                handles.source_width,
                handles.source_height,
                handles.destination_width,
                handles.destination_height
            ));
        }
    }

    fn render_event_func(&mut self) -> Option<ExecutionToken> {
        let mut l = lock(&self.ledger);
        l.events.push(SimEvent::GetRenderEventFunc);
        if l.no_render_event {
            if let Some(sink) = &self.sink {
                sink.error("no graphics device; render event unavailable");
            }
            return None;
        }
        ExecutionToken::new(SIM_EVENT_TOKEN)
    }
}

/// Simulated [`CameraScale`].
#[derive(Debug)]
pub struct SimCamera {
    ledger: Arc<Mutex<SimLedger>>,
    render_scale: f32,
}

impl SimCamera {
    /// Last written render scale (`1.0` until written).
    pub fn render_scale(&self) -> f32 {
        self.render_scale
    }

    /// Size of the buffer the engine renders into for `base`.
    pub fn render_extent(&self, base: Extent) -> Extent {
        base.scaled(self.render_scale)
    }
}

impl CameraScale for SimCamera {
    fn set_render_scale(&mut self, scale: f32) {
        self.render_scale = scale;
        lock(&self.ledger)
            .events
            .push(SimEvent::SetRenderScale(scale));
    }
}

/// Simulated [`CommandStream`].
#[derive(Debug)]
pub struct SimCommandStream {
    ledger: Arc<Mutex<SimLedger>>,
    depth: usize,
}

impl SimCommandStream {
    /// Open debug groups.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl CommandStream for SimCommandStream {
    fn push_debug_group(&mut self, label: &str) {
        self.depth += 1;
        lock(&self.ledger)
            .events
            .push(SimEvent::PushDebugGroup(label.to_owned()));
    }

    fn pop_debug_group(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        lock(&self.ledger).events.push(SimEvent::PopDebugGroup);
    }

    fn issue_plugin_event(&mut self, token: ExecutionToken, event_id: i32) {
        lock(&self.ledger)
            .events
            .push(SimEvent::IssuePluginEvent { token, event_id });
    }
}
