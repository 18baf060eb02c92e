//! Viewer configuration.
//!
//! [`StageConfig::default`] reproduces the viewer as shipped: which assets are
//! shown, where the camera starts, how far it may orbit, the lights and the
//! renderer settings.

use std::f32::consts::FRAC_PI_2;

use cgmath::Rad;

use crate::{
    camera::MouseBindings,
    data_structures::light::{DirectionalLight, HemisphereLight},
    normalize::ENV_MAP_INTENSITY,
};

/// Asset paths, relative to the asset root.
#[derive(Clone, Debug, PartialEq)]
pub struct AssetPaths {
    /// Directory the other paths are relative to. Natively it is resolved
    /// against the working directory, on the web against the page origin.
    pub root: String,
    /// Equirectangular HDR used for lighting and reflections.
    pub environment: String,
    /// Static environment model.
    pub scene: String,
    /// Animated avatar model.
    pub avatar: String,
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            root: "assets".to_string(),
            environment: "hdr/interior.hdr".to_string(),
            scene: "model/scene0.gltf".to_string(),
            avatar: "model/masque0.gltf".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov: 45.0,
            near: 0.1,
            far: 1000.0,
            position: [0.0, 0.5, 2.4],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ControlsConfig {
    pub target: [f32; 3],
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: Rad<f32>,
    pub max_polar_angle: Rad<f32>,
    pub enable_damping: bool,
    /// Fraction of the pending rotation and dolly applied per update. A factor
    /// of 1 applies input at once with no decay; the viewer eases with 0.05.
    pub damping_factor: f32,
    pub bindings: MouseBindings,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        // Horizontal orbit only
        Self {
            target: [0.0, 0.6, 0.0],
            min_distance: 1.0,
            max_distance: 10.0,
            min_polar_angle: Rad(FRAC_PI_2),
            max_polar_angle: Rad(FRAC_PI_2),
            enable_damping: true,
            damping_factor: 0.05,
            bindings: MouseBindings::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LightsConfig {
    pub hemisphere: HemisphereLight,
    pub hemisphere_position: [f32; 3],
    pub directional: DirectionalLight,
    pub directional_position: [f32; 3],
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            hemisphere: HemisphereLight::default(),
            hemisphere_position: [0.0, 0.0, 0.0],
            directional: DirectionalLight::default(),
            directional_position: [10.0, 10.0, 10.0],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ShadowFilter {
    /// Single depth comparison per fragment.
    Basic,
    /// 3x3 percentage closer filtering.
    #[default]
    PcfSoft,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShadowSettings {
    pub enabled: bool,
    pub filter: ShadowFilter,
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            filter: ShadowFilter::PcfSoft,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ToneMapping {
    None,
    #[default]
    Cineon,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputEncoding {
    Linear,
    #[default]
    Srgb,
}

/// Vertical gradient drawn behind the scene, top to bottom, as sRGB RGBA.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Gradient {
    pub top: [f32; 4],
    pub bottom: [f32; 4],
}

impl Gradient {
    /// `linear-gradient(180deg, ...)` CSS value for the canvas element.
    pub fn to_css(&self) -> String {
        let rgba = |c: [f32; 4]| {
            format!(
                "rgba({},{},{},{})",
                (c[0] * 255.0).round() as u8,
                (c[1] * 255.0).round() as u8,
                (c[2] * 255.0).round() as u8,
                c[3]
            )
        };
        format!(
            "linear-gradient(180deg, {} 0%, {} 100%)",
            rgba(self.top),
            rgba(self.bottom)
        )
    }
}

impl Default for Gradient {
    fn default() -> Self {
        Self {
            top: [8.0 / 255.0, 10.0 / 255.0, 27.0 / 255.0, 1.0],
            bottom: [39.0 / 255.0, 46.0 / 255.0, 102.0 / 255.0, 1.0],
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct RendererSettings {
    /// 4x multisampling.
    pub antialias: bool,
    /// Transparent clear color so the page shows through on the web.
    pub alpha: bool,
    pub shadows: ShadowSettings,
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
    pub output_encoding: OutputEncoding,
    pub background: Option<Gradient>,
}

impl RendererSettings {
    pub fn sample_count(&self) -> u32 {
        if self.antialias { 4 } else { 1 }
    }
}

impl Default for RendererSettings {
    fn default() -> Self {
        Self {
            antialias: true,
            alpha: true,
            shadows: ShadowSettings::default(),
            tone_mapping: ToneMapping::Cineon,
            exposure: 1.0,
            output_encoding: OutputEncoding::Srgb,
            background: Some(Gradient::default()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StageConfig {
    pub assets: AssetPaths,
    pub camera: CameraConfig,
    pub controls: ControlsConfig,
    pub lights: LightsConfig,
    /// Clip the avatar plays after loading. Falls back to its first clip.
    pub animation_clip: String,
    pub env_map_intensity: f32,
    pub renderer: RendererSettings,
    /// Id of the canvas element the viewer renders into on the web.
    pub canvas_id: String,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            assets: AssetPaths::default(),
            camera: CameraConfig::default(),
            controls: ControlsConfig::default(),
            lights: LightsConfig::default(),
            animation_clip: "anim_masque0_idle0".to_string(),
            env_map_intensity: ENV_MAP_INTENSITY,
            renderer: RendererSettings::default(),
            canvas_id: "canvas".to_string(),
        }
    }
}
