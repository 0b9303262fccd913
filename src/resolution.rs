//! Resolution Controller: render scale and intermediate-buffer scale for each frame.

use crate::config::UpscaleSettings;
use crate::foundation::core::Extent;
use crate::render::host::CameraScale;

/// Lowest render scale the controller will ever hand to the camera.
pub const MIN_RENDER_SCALE: f32 = 0.1;
/// Highest render scale (native resolution).
pub const MAX_RENDER_SCALE: f32 = 1.0;
/// Smallest intermediate-buffer multiplier.
pub const MIN_UPSCALE_FACTOR: f32 = 1.0;

/// Validated pair of scales read every frame.
///
/// Both values are always finite and strictly positive. Construction clamps instead of
/// rejecting so a frame is always renderable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameResolutionPolicy {
    render_scale: f32,
    upscale_factor: f32,
}

impl FrameResolutionPolicy {
    /// Build a policy, clamping `render_scale` into `[0.1, 1.0]` and `upscale_factor` to `>= 1`.
    ///
    /// Non-finite inputs fall back to `1.0`.
    pub fn new(render_scale: f32, upscale_factor: f32) -> Self {
        let render_scale = if render_scale.is_finite() {
            render_scale.clamp(MIN_RENDER_SCALE, MAX_RENDER_SCALE)
        } else {
            MAX_RENDER_SCALE
        };
        let upscale_factor = if upscale_factor.is_finite() {
            upscale_factor.max(MIN_UPSCALE_FACTOR)
        } else {
            MIN_UPSCALE_FACTOR
        };
        Self {
            render_scale,
            upscale_factor,
        }
    }

    /// Policy derived from host settings.
    pub fn from_settings(settings: &UpscaleSettings) -> Self {
        Self::new(settings.render_scale, settings.upscale_scale)
    }

    /// Fraction of native resolution to render the scene at.
    pub fn render_scale(&self) -> f32 {
        self.render_scale
    }

    /// Multiplier applied to native resolution to size the intermediate buffer.
    pub fn upscale_factor(&self) -> f32 {
        self.upscale_factor
    }

    /// Size of the low-resolution buffer the engine renders into.
    pub fn render_extent(&self, base: Extent) -> Extent {
        base.scaled(self.render_scale)
    }

    /// Size of the intermediate (upscaled) buffer.
    pub fn intermediate_extent(&self, base: Extent) -> Extent {
        base.scaled(self.upscale_factor)
    }
}

impl Default for FrameResolutionPolicy {
    fn default() -> Self {
        Self::from_settings(&UpscaleSettings::default())
    }
}

/// Owns the active policy and writes the render scale to the camera once per frame.
#[derive(Debug, Default)]
pub struct ResolutionController {
    policy: FrameResolutionPolicy,
}

impl ResolutionController {
    /// Create a controller with the given policy.
    pub fn new(policy: FrameResolutionPolicy) -> Self {
        Self { policy }
    }

    /// Read-only view of the active policy.
    pub fn policy(&self) -> &FrameResolutionPolicy {
        &self.policy
    }

    /// Replace the policy; takes effect at the next frame setup.
    pub fn set_policy(&mut self, policy: FrameResolutionPolicy) {
        self.policy = policy;
    }

    /// Write the render scale to the camera. Must run before scene rendering.
    pub fn apply(&self, camera: &mut dyn CameraScale) {
        camera.set_render_scale(self.policy.render_scale);
    }
}
