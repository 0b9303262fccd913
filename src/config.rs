use crate::foundation::error::{UpscaleError, UpscaleResult};
use std::path::Path;

/// Point in the host frame at which the upscale pass is injected.
///
/// Variants mirror the host engine's injection points; [`order`] gives their numeric position.
///
/// [`order`]: RenderPassEvent::order
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum RenderPassEvent {
    BeforeRendering,
    BeforeRenderingShadows,
    AfterRenderingShadows,
    BeforeRenderingPrePasses,
    AfterRenderingPrePasses,
    BeforeRenderingGbuffer,
    AfterRenderingGbuffer,
    BeforeRenderingDeferredLights,
    AfterRenderingDeferredLights,
    BeforeRenderingOpaques,
    #[default]
    AfterRenderingOpaques,
    BeforeRenderingSkybox,
    AfterRenderingSkybox,
    BeforeRenderingTransparents,
    AfterRenderingTransparents,
    BeforeRenderingPostProcessing,
    AfterRenderingPostProcessing,
    AfterRendering,
}

impl RenderPassEvent {
    /// Numeric position within the frame; lower runs earlier.
    pub fn order(self) -> u32 {
        match self {
            Self::BeforeRendering => 0,
            Self::BeforeRenderingShadows => 50,
            Self::AfterRenderingShadows => 100,
            Self::BeforeRenderingPrePasses => 150,
            Self::AfterRenderingPrePasses => 200,
            Self::BeforeRenderingGbuffer => 210,
            Self::AfterRenderingGbuffer => 220,
            Self::BeforeRenderingDeferredLights => 230,
            Self::AfterRenderingDeferredLights => 240,
            Self::BeforeRenderingOpaques => 250,
            Self::AfterRenderingOpaques => 300,
            Self::BeforeRenderingSkybox => 350,
            Self::AfterRenderingSkybox => 400,
            Self::BeforeRenderingTransparents => 450,
            Self::AfterRenderingTransparents => 500,
            Self::BeforeRenderingPostProcessing => 550,
            Self::AfterRenderingPostProcessing => 600,
            Self::AfterRendering => 1000,
        }
    }
}

/// Host-facing configuration surface.
///
/// Values are stored as given. Range enforcement happens in
/// [`FrameResolutionPolicy`](crate::FrameResolutionPolicy), which clamps instead of rejecting.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpscaleSettings {
    /// When in the frame the upscale pass runs.
    pub render_pass_event: RenderPassEvent,
    /// Intermediate buffer size multiplier relative to native resolution.
    pub upscale_scale: f32,
    /// Fraction of native resolution the scene is rendered at.
    pub render_scale: f32,
}

impl Default for UpscaleSettings {
    fn default() -> Self {
        Self {
            render_pass_event: RenderPassEvent::AfterRenderingOpaques,
            upscale_scale: 2.0,
            render_scale: 0.5,
        }
    }
}

impl UpscaleSettings {
    /// Parse settings from JSON. Missing keys take their defaults.
    pub fn from_json_str(s: &str) -> UpscaleResult<Self> {
        serde_json::from_str(s).map_err(|e| UpscaleError::config(format!("parse settings: {e}")))
    }

    /// Read and parse a JSON settings file.
    pub fn from_json_path(path: &Path) -> UpscaleResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            UpscaleError::config(format!("read settings '{}': {e}", path.display()))
        })?;
        Self::from_json_str(&text)
    }

    /// Serialize as pretty JSON.
    pub fn to_json_pretty(&self) -> UpscaleResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| UpscaleError::config(format!("serialize settings: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_take_defaults() {
        let s = UpscaleSettings::from_json_str(r#"{ "render_scale": 0.75 }"#).unwrap();
        assert_eq!(s.render_scale, 0.75);
        assert_eq!(s.upscale_scale, 2.0);
        assert_eq!(s.render_pass_event, RenderPassEvent::AfterRenderingOpaques);
    }

    #[test]
    fn out_of_range_values_are_accepted_as_given() {
        let s = UpscaleSettings::from_json_str(r#"{ "render_scale": 4.0, "upscale_scale": 0.1 }"#)
            .unwrap();
        assert_eq!(s.render_scale, 4.0);
        assert_eq!(s.upscale_scale, 0.1);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = UpscaleSettings::from_json_str("{ render_scale: ").unwrap_err();
        assert!(matches!(err, UpscaleError::Config(_)));

        let err = UpscaleSettings::from_json_str(r#"{ "renderscale": 0.5 }"#).unwrap_err();
        assert!(err.to_string().contains("configuration error:"));
    }

    #[test]
    fn pass_event_uses_snake_case_names() {
        let s = UpscaleSettings::from_json_str(
            r#"{ "render_pass_event": "before_rendering_post_processing" }"#,
        )
        .unwrap();
        assert_eq!(
            s.render_pass_event,
            RenderPassEvent::BeforeRenderingPostProcessing
        );
        assert!(
            RenderPassEvent::AfterRenderingOpaques.order()
                < RenderPassEvent::BeforeRenderingPostProcessing.order()
        );
    }

    #[test]
    fn pretty_json_reparses() {
        let s = UpscaleSettings::default();
        let text = s.to_json_pretty().unwrap();
        assert!(text.contains("\"after_rendering_opaques\""));
        assert_eq!(UpscaleSettings::from_json_str(&text).unwrap(), s);
    }
}
