use crate::foundation::core::{ExecutionToken, NativeHandle};
use crate::native::ffi::LogSink;
use crate::render::host::{IntermediateBuffer, SourceBuffer};

/// Handles and dimensions pushed to the backend right before a trigger.
///
/// Lives for a single push; dimensions are already in the backend's C `int` range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NativeBridgeHandles {
    /// Low-resolution source texture.
    pub source: NativeHandle,
    /// Source width in pixels.
    pub source_width: i32,
    /// Source height in pixels.
    pub source_height: i32,
    /// Intermediate (destination) texture.
    pub destination: NativeHandle,
    /// Destination width in pixels.
    pub destination_width: i32,
    /// Destination height in pixels.
    pub destination_height: i32,
}

impl NativeBridgeHandles {
    /// Describe a source/destination pair.
    ///
    /// `None` when the source has no native texture, or a dimension is zero or exceeds `i32::MAX`.
    pub fn describe(source: &SourceBuffer, destination: &IntermediateBuffer) -> Option<Self> {
        fn dim(v: u32) -> Option<i32> {
            i32::try_from(v).ok().filter(|&d| d > 0)
        }

        let src = source.handle?;
        let dst_extent = destination.extent();
        Some(Self {
            source: src,
            source_width: dim(source.extent.width)?,
            source_height: dim(source.extent.height)?,
            destination: destination.handle(),
            destination_width: dim(dst_extent.width)?,
            destination_height: dim(dst_extent.height)?,
        })
    }
}

/// Capability surface of the opaque native upscaler.
///
/// Together with [`CommandStream::issue_plugin_event`](crate::CommandStream::issue_plugin_event)
/// these are the only boundary operations the bridge performs.
pub trait NativeBackend {
    /// Register (`Some`) or deregister (`None`) the log entry points.
    fn set_log_callback(&mut self, sink: Option<LogSink>);
    /// Push this frame's handles and dimensions. Synchronous: the backend observes them before
    /// any later trigger runs.
    fn set_texture_from_host(&mut self, handles: &NativeBridgeHandles);
    /// Token identifying the backend's GPU work item; `None` if the backend exposes none.
    fn render_event_func(&mut self) -> Option<ExecutionToken>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::Extent;
    use crate::render::host::TargetDesc;

    fn dest(w: u32, h: u32) -> IntermediateBuffer {
        IntermediateBuffer::new(
            NativeHandle::new(0x20).unwrap(),
            &TargetDesc::color(Extent::new(w, h), "dst"),
        )
    }

    #[test]
    fn describe_copies_handles_and_sizes() {
        let src = SourceBuffer::new(NativeHandle::new(0x10).unwrap(), Extent::new(400, 300));
        let h = NativeBridgeHandles::describe(&src, &dest(1600, 1200)).unwrap();
        assert_eq!(h.source.raw(), 0x10);
        assert_eq!((h.source_width, h.source_height), (400, 300));
        assert_eq!(h.destination.raw(), 0x20);
        assert_eq!((h.destination_width, h.destination_height), (1600, 1200));
    }

    #[test]
    fn describe_rejects_missing_handle_and_bad_sizes() {
        let no_handle = SourceBuffer {
            handle: None,
            extent: Extent::new(400, 300),
        };
        assert!(NativeBridgeHandles::describe(&no_handle, &dest(8, 8)).is_none());

        let src = SourceBuffer::new(NativeHandle::new(0x10).unwrap(), Extent::new(0, 300));
        assert!(NativeBridgeHandles::describe(&src, &dest(8, 8)).is_none());

        let src = SourceBuffer::new(NativeHandle::new(0x10).unwrap(), Extent::new(4, 3));
        assert!(NativeBridgeHandles::describe(&src, &dest(u32::MAX, 8)).is_none());
    }
}
