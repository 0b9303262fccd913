use crate::foundation::core::Extent;
use crate::foundation::error::{UpscaleError, UpscaleResult};
use crate::render::host::{IntermediateBuffer, RenderDevice, TargetDesc};
use crate::resolution::FrameResolutionPolicy;

/// Debug label given to the intermediate buffer.
pub const INTERMEDIATE_LABEL: &str = "_UpscaledTexture";

/// Allocation counters for the intermediate buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct TargetStats {
    /// Buffers allocated over the manager's lifetime.
    pub allocations: u64,
    /// Buffers released (on resize or teardown).
    pub releases: u64,
    /// `ensure` calls satisfied by the existing buffer.
    pub reuse_hits: u64,
    /// Bytes held by the current buffer, `0` when none.
    pub live_bytes: u64,
}

/// Render Target Lifecycle Manager.
///
/// Sole owner of the intermediate buffer. The buffer survives across frames and is re-created
/// only when the required size changes.
#[derive(Debug, Default)]
pub struct RenderTargetManager {
    current: Option<IntermediateBuffer>,
    stats: TargetStats,
}

impl RenderTargetManager {
    /// Create a manager with no buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// The current buffer, if one is allocated.
    pub fn current(&self) -> Option<&IntermediateBuffer> {
        self.current.as_ref()
    }

    /// Allocation counters.
    pub fn stats(&self) -> TargetStats {
        self.stats
    }

    /// Make sure the intermediate buffer matches `base * upscale_factor`.
    ///
    /// Idempotent while the size is stable. On a size change the stale buffer is released before
    /// the new one is allocated, so the returned handle is not stable across such a call.
    /// If the allocation fails the manager holds no buffer afterwards.
    pub fn ensure(
        &mut self,
        device: &mut dyn RenderDevice,
        base: Extent,
        policy: &FrameResolutionPolicy,
    ) -> UpscaleResult<&IntermediateBuffer> {
        let desc = TargetDesc::color(policy.intermediate_extent(base), INTERMEDIATE_LABEL);

        let reuse = self
            .current
            .as_ref()
            .is_some_and(|b| b.extent() == desc.extent && b.format() == desc.format);
        if reuse {
            self.stats.reuse_hits = self.stats.reuse_hits.saturating_add(1);
        } else {
            if let Some(stale) = self.current.take() {
                tracing::debug!(
                    from = %stale.extent(),
                    to = %desc.extent,
                    "resizing intermediate buffer"
                );
                self.release_buffer(device, stale);
            }

            let buffer = device.allocate_color_target(&desc)?;
            tracing::debug!(
                extent = %buffer.extent(),
                bytes = buffer.byte_len(),
                "allocated intermediate buffer"
            );
            self.stats.allocations = self.stats.allocations.saturating_add(1);
            self.stats.live_bytes = buffer.byte_len();
            self.current = Some(buffer);
        }

        self.current
            .as_ref()
            .ok_or_else(|| UpscaleError::allocation("intermediate buffer missing after ensure"))
    }

    /// Release the buffer. Returns `true` only when a buffer was actually released.
    pub fn release(&mut self, device: &mut dyn RenderDevice) -> bool {
        match self.current.take() {
            Some(buffer) => {
                self.release_buffer(device, buffer);
                true
            }
            None => false,
        }
    }

    fn release_buffer(&mut self, device: &mut dyn RenderDevice, buffer: IntermediateBuffer) {
        self.stats.releases = self.stats.releases.saturating_add(1);
        self.stats.live_bytes = 0;
        device.release_color_target(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::core::NativeHandle;

    #[derive(Default)]
    struct CountingDevice {
        next: usize,
        live: Vec<NativeHandle>,
        allocated: Vec<Extent>,
        released: Vec<NativeHandle>,
        fail: bool,
    }

    impl RenderDevice for CountingDevice {
        fn allocate_color_target(
            &mut self,
            desc: &TargetDesc,
        ) -> UpscaleResult<IntermediateBuffer> {
            if self.fail {
                return Err(UpscaleError::allocation("out of video memory"));
            }
            self.next += 1;
            let h = NativeHandle::new(self.next).unwrap();
            self.live.push(h);
            self.allocated.push(desc.extent);
            Ok(IntermediateBuffer::new(h, desc))
        }

        fn release_color_target(&mut self, target: IntermediateBuffer) {
            self.live.retain(|h| *h != target.handle());
            self.released.push(target.handle());
        }
    }

    #[test]
    fn stable_size_is_idempotent() {
        let mut dev = CountingDevice::default();
        let mut mgr = RenderTargetManager::new();
        let p = FrameResolutionPolicy::new(0.5, 2.0);
        let base = Extent::new(800, 600);

        let first = mgr.ensure(&mut dev, base, &p).unwrap().handle();
        let second = mgr.ensure(&mut dev, base, &p).unwrap().handle();

        assert_eq!(first, second);
        assert_eq!(dev.allocated, vec![Extent::new(1600, 1200)]);
        assert_eq!(mgr.stats().allocations, 1);
        assert_eq!(mgr.stats().reuse_hits, 1);
    }

    #[test]
    fn base_resize_reallocates_exactly_once() {
        let mut dev = CountingDevice::default();
        let mut mgr = RenderTargetManager::new();
        let p = FrameResolutionPolicy::new(0.5, 2.0);

        mgr.ensure(&mut dev, Extent::new(1920, 1080), &p).unwrap();
        mgr.ensure(&mut dev, Extent::new(1280, 720), &p).unwrap();
        mgr.ensure(&mut dev, Extent::new(1280, 720), &p).unwrap();

        assert_eq!(
            dev.allocated,
            vec![Extent::new(3840, 2160), Extent::new(2560, 1440)]
        );
        assert_eq!(dev.released.len(), 1);
        assert_eq!(dev.live.len(), 1);
        assert_eq!(mgr.current().unwrap().extent(), Extent::new(2560, 1440));
    }

    #[test]
    fn policy_change_reallocates() {
        let mut dev = CountingDevice::default();
        let mut mgr = RenderTargetManager::new();
        let base = Extent::new(100, 100);

        mgr.ensure(&mut dev, base, &FrameResolutionPolicy::new(0.5, 2.0))
            .unwrap();
        mgr.ensure(&mut dev, base, &FrameResolutionPolicy::new(0.5, 1.5))
            .unwrap();

        assert_eq!(mgr.current().unwrap().extent(), Extent::new(150, 150));
        assert_eq!(mgr.stats().releases, 1);
    }

    #[test]
    fn release_happens_once() {
        let mut dev = CountingDevice::default();
        let mut mgr = RenderTargetManager::new();
        mgr.ensure(
            &mut dev,
            Extent::new(10, 10),
            &FrameResolutionPolicy::default(),
        )
        .unwrap();

        assert!(mgr.release(&mut dev));
        assert!(!mgr.release(&mut dev));
        assert_eq!(dev.released.len(), 1);
        assert!(dev.live.is_empty());
        assert_eq!(mgr.stats().live_bytes, 0);
    }

    #[test]
    fn failed_allocation_leaves_no_buffer() {
        let mut dev = CountingDevice::default();
        let mut mgr = RenderTargetManager::new();
        let p = FrameResolutionPolicy::new(0.5, 2.0);
        mgr.ensure(&mut dev, Extent::new(10, 10), &p).unwrap();

        dev.fail = true;
        let err = mgr.ensure(&mut dev, Extent::new(20, 20), &p).unwrap_err();

        assert!(matches!(err, UpscaleError::Allocation(_)));
        assert!(mgr.current().is_none());
        assert!(dev.live.is_empty());
    }
}
