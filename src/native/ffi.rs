//! C ABI of the native upscaling plugin.
//!
//! The plugin exports three functions (`SetLogCallback`, `SetTextureFromUnity`,
//! `GetRenderEventFunc`). Resolving them from a loaded library is the host's job; this module
//! only wraps already-resolved pointers.
#![allow(unsafe_code)]

use std::borrow::Cow;
use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::panic::AssertUnwindSafe;

use crate::foundation::core::ExecutionToken;
use crate::foundation::error::{UpscaleError, UpscaleResult};
use crate::native::backend::{NativeBackend, NativeBridgeHandles};

/// `tracing` target for messages coming from native code.
pub const NATIVE_LOG_TARGET: &str = "upscale_bridge::native";

/// Log entry point: one null-terminated message, possibly null.
pub type LogFn = unsafe extern "C" fn(message: *const c_char);
/// `SetLogCallback(info, error)`.
pub type SetLogCallbackFn = unsafe extern "C" fn(info: Option<LogFn>, error: Option<LogFn>);
/// `SetTextureFromUnity(src, srcW, srcH, dst, dstW, dstH)`.
pub type SetTextureFromUnityFn = unsafe extern "C" fn(
    src: *mut c_void,
    src_w: c_int,
    src_h: c_int,
    dst: *mut c_void,
    dst_w: c_int,
    dst_h: c_int,
);
/// The backend's render-thread work item, invoked by the host with an event id.
pub type RenderEventFn = unsafe extern "C" fn(event_id: c_int);
/// `GetRenderEventFunc()`.
pub type GetRenderEventFuncFn = unsafe extern "C" fn() -> Option<RenderEventFn>;

/// Pair of log entry points handed to the backend.
#[derive(Clone, Copy, Debug)]
pub struct LogSink {
    info: LogFn,
    error: LogFn,
}

impl LogSink {
    /// Entry points that forward into `tracing`.
    pub fn forwarding() -> Self {
        Self {
            info: forward_info,
            error: forward_error,
        }
    }

    /// Wrap arbitrary entry points.
    ///
    /// # Safety
    ///
    /// Both functions must accept a null pointer or a valid null-terminated string, and must stay
    /// callable for as long as the sink exists.
    pub unsafe fn from_raw(info: LogFn, error: LogFn) -> Self {
        Self { info, error }
    }

    /// Informational entry point.
    pub fn info_fn(&self) -> LogFn {
        self.info
    }

    /// Error entry point.
    pub fn error_fn(&self) -> LogFn {
        self.error
    }

    /// Send an informational message the way native code would.
    pub fn info(&self, message: &str) {
        emit(self.info, message);
    }

    /// Send an error message the way native code would.
    pub fn error(&self, message: &str) {
        emit(self.error, message);
    }
}

fn emit(f: LogFn, message: &str) {
    // Empty messages travel as null, matching the plugin's own logger.
    if message.is_empty() {
        // SAFETY: `LogSink` construction guarantees `f` accepts null.
        unsafe { f(std::ptr::null()) };
        return;
    }
    let c = CString::new(message).unwrap_or_else(|e| {
        let mut bytes = e.into_vec();
        bytes.retain(|&b| b != 0);
        CString::new(bytes).unwrap_or_default()
    });
    // SAFETY: `c` outlives the call and is null-terminated.
    unsafe { f(c.as_ptr()) };
}

#[derive(Clone, Copy)]
enum Severity {
    Info,
    Error,
}

/// Informational log entry point registered with the backend.
///
/// # Safety
///
/// `message` must be null or point to a null-terminated string valid for the call.
pub unsafe extern "C" fn forward_info(message: *const c_char) {
    // SAFETY: forwarded caller contract.
    unsafe { forward(Severity::Info, message) }
}

/// Error log entry point registered with the backend.
///
/// # Safety
///
/// `message` must be null or point to a null-terminated string valid for the call.
pub unsafe extern "C" fn forward_error(message: *const c_char) {
    // SAFETY: forwarded caller contract.
    unsafe { forward(Severity::Error, message) }
}

unsafe fn forward(severity: Severity, message: *const c_char) {
    let text: Cow<'_, str> = if message.is_null() {
        Cow::Borrowed("")
    } else {
        // SAFETY: caller guarantees a valid null-terminated string.
        unsafe { CStr::from_ptr(message) }.to_string_lossy()
    };

    // Never unwind into native code.
    let _ = std::panic::catch_unwind(AssertUnwindSafe(|| {
        let text = text.trim_end();
        match severity {
            Severity::Info => tracing::info!(target: NATIVE_LOG_TARGET, "{text}"),
            Severity::Error => tracing::error!(target: NATIVE_LOG_TARGET, "{text}"),
        }
    }));
}

/// Exports resolved from the plugin library. Missing entries stay `None`.
#[derive(Clone, Copy, Debug, Default)]
pub struct PluginExports {
    /// `SetLogCallback`.
    pub set_log_callback: Option<SetLogCallbackFn>,
    /// `SetTextureFromUnity`.
    pub set_texture_from_unity: Option<SetTextureFromUnityFn>,
    /// `GetRenderEventFunc`.
    pub get_render_event_func: Option<GetRenderEventFuncFn>,
}

/// [`NativeBackend`] over the plugin's C exports.
#[derive(Debug)]
pub struct CPluginBackend {
    set_log_callback: SetLogCallbackFn,
    set_texture_from_unity: SetTextureFromUnityFn,
    get_render_event_func: GetRenderEventFuncFn,
}

impl CPluginBackend {
    /// Build a backend from resolved exports.
    ///
    /// A missing export means the plugin is not (fully) loaded, which is a boundary error.
    ///
    /// # Safety
    ///
    /// Every present export must be the plugin function of the declared signature, and the
    /// library must stay loaded for the lifetime of the returned backend.
    pub unsafe fn from_exports(exports: PluginExports) -> UpscaleResult<Self> {
        fn require<T>(f: Option<T>, name: &str) -> UpscaleResult<T> {
            f.ok_or_else(|| {
                UpscaleError::boundary(format!("native plugin export '{name}' is unavailable"))
            })
        }

        Ok(Self {
            set_log_callback: require(exports.set_log_callback, "SetLogCallback")?,
            set_texture_from_unity: require(
                exports.set_texture_from_unity,
                "SetTextureFromUnity",
            )?,
            get_render_event_func: require(exports.get_render_event_func, "GetRenderEventFunc")?,
        })
    }
}

impl NativeBackend for CPluginBackend {
    fn set_log_callback(&mut self, sink: Option<LogSink>) {
        let (info, error) = match sink {
            Some(s) => (Some(s.info_fn()), Some(s.error_fn())),
            None => (None, None),
        };
        // SAFETY: `from_exports` contract.
        unsafe { (self.set_log_callback)(info, error) }
    }

    fn set_texture_from_host(&mut self, handles: &NativeBridgeHandles) {
        let src = std::ptr::with_exposed_provenance_mut::<c_void>(handles.source.raw());
        let dst = std::ptr::with_exposed_provenance_mut::<c_void>(handles.destination.raw());
        // SAFETY: `from_exports` contract; handles are host texture pointers.
        unsafe {
            (self.set_texture_from_unity)(
                src,
                handles.source_width,
                handles.source_height,
                dst,
                handles.destination_width,
                handles.destination_height,
            )
        }
    }

    fn render_event_func(&mut self) -> Option<ExecutionToken> {
        // SAFETY: `from_exports` contract.
        let f = unsafe { (self.get_render_event_func)() }?;
        ExecutionToken::new(f as usize)
    }
}
