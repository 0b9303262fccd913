use std::num::NonZeroUsize;

/// Event id the native backend interprets as "run the upscale".
///
/// The id space belongs to the backend; this is the only id issued.
pub const UPSCALE_EVENT_ID: i32 = 1;

/// Pixel dimensions of a buffer or of the camera target.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Extent {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Extent {
    /// Create an extent.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// `true` when either axis is zero (e.g. a minimized window).
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    pub fn pixel_count(self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Scale both axes by `factor`, rounding the `f32` product half to even.
    ///
    /// A non-empty axis never rounds down to zero.
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            width: scale_axis(self.width, factor),
            height: scale_axis(self.height, factor),
        }
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

fn scale_axis(v: u32, factor: f32) -> u32 {
    if v == 0 {
        return 0;
    }
    // Product in f32, as the host engine computes it. Widening first can move a tie off the half.
    let scaled = (v as f32 * factor).round_ties_even();
    if scaled.is_nan() || scaled < 1.0 {
        1
    } else if scaled >= u32::MAX as f32 {
        u32::MAX
    } else {
        scaled as u32
    }
}

/// Native texture pointer handed across the boundary.
///
/// Null is unrepresentable: a missing texture is `Option::<NativeHandle>::None`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NativeHandle(NonZeroUsize);

impl NativeHandle {
    /// Wrap a raw pointer-width handle; `None` for null.
    pub fn new(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    /// Raw pointer-width value.
    pub fn raw(self) -> usize {
        self.0.get()
    }
}

/// Opaque token identifying the backend's GPU work item.
///
/// Fetched once from the backend and reused every frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExecutionToken(NonZeroUsize);

impl ExecutionToken {
    /// Wrap a raw event-function pointer; `None` for null.
    pub fn new(raw: usize) -> Option<Self> {
        NonZeroUsize::new(raw).map(Self)
    }

    /// Raw pointer-width value, as expected by the host's "issue plugin event" command.
    pub fn raw(self) -> usize {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_rounds_half_to_even() {
        // 5 * 0.5 = 2.5 -> 2, 7 * 0.5 = 3.5 -> 4
        assert_eq!(Extent::new(5, 7).scaled(0.5), Extent::new(2, 4));
        assert_eq!(Extent::new(800, 600).scaled(0.5), Extent::new(400, 300));
        assert_eq!(Extent::new(1280, 720).scaled(2.0), Extent::new(2560, 1440));
    }

    #[test]
    fn scaled_rounds_the_single_precision_product() {
        // 15 * 1.1f32 is a tie in f32 (16.5 -> 16) but 16.50000035.. in f64.
        assert_eq!(Extent::new(15, 15).scaled(1.1), Extent::new(16, 16));
        // 5 * 0.3f32 is exactly 1.5 in f32 -> 2.
        assert_eq!(Extent::new(5, 5).scaled(0.3), Extent::new(2, 2));
    }

    #[test]
    fn scaled_never_collapses_a_non_empty_axis() {
        assert_eq!(Extent::new(1, 3).scaled(0.1), Extent::new(1, 1));
        assert_eq!(Extent::new(0, 3).scaled(2.0), Extent::new(0, 6));
        assert!(Extent::new(0, 3).is_empty());
    }

    #[test]
    fn scaled_saturates() {
        let e = Extent::new(u32::MAX, 2).scaled(4.0);
        assert_eq!(e.width, u32::MAX);
        assert_eq!(e.height, 8);
    }

    #[test]
    fn null_handles_are_unrepresentable() {
        assert!(NativeHandle::new(0).is_none());
        assert!(ExecutionToken::new(0).is_none());
        assert_eq!(NativeHandle::new(0x1000).map(NativeHandle::raw), Some(0x1000));
    }

    #[test]
    fn extent_display_is_w_x_h() {
        assert_eq!(Extent::new(1920, 1080).to_string(), "1920x1080");
    }
}
