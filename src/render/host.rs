//! Interfaces consumed from the host rendering engine.

use crate::foundation::core::{ExecutionToken, Extent, NativeHandle};
use crate::foundation::error::UpscaleResult;

/// Per-camera render-scale setting, written once per frame before scene rendering.
pub trait CameraScale {
    /// Set the fraction of native resolution the camera renders at.
    fn set_render_scale(&mut self, scale: f32);
}

/// Color formats the intermediate buffer may use.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ColorFormat {
    /// 8-bit RGBA, unsigned normalized.
    #[default]
    Rgba8Unorm,
}

impl ColorFormat {
    /// Bytes per pixel.
    pub fn bytes_per_pixel(self) -> u64 {
        match self {
            Self::Rgba8Unorm => 4,
        }
    }
}

/// Allocation request for a color-only render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TargetDesc {
    /// Size in pixels.
    pub extent: Extent,
    /// Color format.
    pub format: ColorFormat,
    /// Depth bits; always `0` for targets requested by this crate.
    pub depth_bits: u32,
    /// Debug label.
    pub label: &'static str,
}

impl TargetDesc {
    /// Color-only descriptor with the default format.
    pub fn color(extent: Extent, label: &'static str) -> Self {
        Self {
            extent,
            format: ColorFormat::default(),
            depth_bits: 0,
            label,
        }
    }

    /// Size of the allocation in bytes.
    pub fn byte_len(&self) -> u64 {
        self.extent
            .pixel_count()
            .saturating_mul(self.format.bytes_per_pixel())
    }
}

/// GPU-resident color buffer produced by a [`RenderDevice`].
///
/// Not `Clone`: releasing moves the buffer back into the device, so a buffer cannot be released
/// twice or used after release.
#[derive(Debug, PartialEq, Eq)]
pub struct IntermediateBuffer {
    handle: NativeHandle,
    extent: Extent,
    format: ColorFormat,
}

impl IntermediateBuffer {
    /// Wrap a freshly allocated target. Called by [`RenderDevice`] implementations.
    pub fn new(handle: NativeHandle, desc: &TargetDesc) -> Self {
        Self {
            handle,
            extent: desc.extent,
            format: desc.format,
        }
    }

    /// Native texture handle usable across the boundary.
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }

    /// Size in pixels.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Color format.
    pub fn format(&self) -> ColorFormat {
        self.format
    }

    /// Size in bytes.
    pub fn byte_len(&self) -> u64 {
        self.extent
            .pixel_count()
            .saturating_mul(self.format.bytes_per_pixel())
    }
}

/// Allocator for render targets that outlive a single frame.
pub trait RenderDevice {
    /// Allocate a color-only render target.
    fn allocate_color_target(&mut self, desc: &TargetDesc) -> UpscaleResult<IntermediateBuffer>;
    /// Give a target back to the device.
    fn release_color_target(&mut self, target: IntermediateBuffer);
}

/// The frame's command stream.
pub trait CommandStream {
    /// Open a named profiling/debug scope.
    fn push_debug_group(&mut self, label: &str);
    /// Close the innermost scope.
    fn pop_debug_group(&mut self);
    /// Record an "issue plugin event" command at the current position in the stream.
    ///
    /// The host runs `token` with `event_id` when the stream executes, possibly on another thread.
    fn issue_plugin_event(&mut self, token: ExecutionToken, event_id: i32);
}

/// Engine-provided low-resolution color buffer for the current frame.
///
/// Borrowed for the execute phase only; never owned by this crate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceBuffer {
    /// Native handle, `None` when the engine has no backing texture this frame.
    pub handle: Option<NativeHandle>,
    /// Size in pixels.
    pub extent: Extent,
}

impl SourceBuffer {
    /// Source backed by a native texture.
    pub fn new(handle: NativeHandle, extent: Extent) -> Self {
        Self {
            handle: Some(handle),
            extent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_targets_have_no_depth() {
        let d = TargetDesc::color(Extent::new(16, 8), "t");
        assert_eq!(d.depth_bits, 0);
        assert_eq!(d.byte_len(), 16 * 8 * 4);
    }
}
