//! Materials, colors and CPU-side images.
//!
//! Loaded glTF assets come with [`SourceMaterial`]s that mirror what the file
//! declares. Before an asset is shown those are replaced by a
//! [`StandardMaterial`] (see [`crate::normalize`]). The replacement is derived
//! from a [`MaterialDescriptor`], a typed and defaulted view of the handful of
//! properties that survive the conversion.

use std::{fmt::Debug, sync::Arc};

/// Linear RGB color.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Color from a `0xRRGGBB` literal.
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xff) as f32 / 255.0;
        let g = ((hex >> 8) & 0xff) as f32 / 255.0;
        let b = (hex & 0xff) as f32 / 255.0;
        Self::new(r, g, b)
    }

    /// Color from hue, saturation and lightness, all in `[0, 1]`.
    ///
    /// The hue wraps around, saturation and lightness are clamped.
    pub fn from_hsl(h: f32, s: f32, l: f32) -> Self {
        let h = h.rem_euclid(1.0);
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        if s == 0.0 {
            return Self::new(l, l, l);
        }
        let max = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let min = 2.0 * l - max;
        Self::new(
            hue_to_channel(min, max, h + 1.0 / 3.0),
            hue_to_channel(min, max, h),
            hue_to_channel(min, max, h - 1.0 / 3.0),
        )
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self::new(self.r * factor, self.g * factor, self.b * factor)
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

fn hue_to_channel(min: f32, max: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return min + (max - min) * 6.0 * t;
    }
    if t < 0.5 {
        return max;
    }
    if t < 2.0 / 3.0 {
        return min + (max - min) * 6.0 * (2.0 / 3.0 - t);
    }
    min
}

impl From<[f32; 3]> for Color {
    fn from(c: [f32; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

/// Decoded 8-bit RGBA image.
pub struct ImageData {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Shared handle to an image used as a texture.
///
/// Two handles are the same texture if they point at the same allocation,
/// which is also how the renderer caches uploads.
#[derive(Clone)]
pub struct TextureHandle(Arc<ImageData>);

impl TextureHandle {
    pub fn new(image: ImageData) -> Self {
        Self(Arc::new(image))
    }

    pub fn image(&self) -> &ImageData {
        &self.0
    }

    pub fn ptr_eq(&self, other: &TextureHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the underlying allocation.
    pub fn key(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }
}

impl PartialEq for TextureHandle {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Debug for TextureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureHandle")
            .field("label", &self.0.label)
            .field("width", &self.0.width)
            .field("height", &self.0.height)
            .finish()
    }
}

/// How an environment image is projected onto directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mapping {
    EquirectangularReflection,
}

/// High dynamic range image used for image based lighting and reflections.
pub struct EnvironmentMap {
    pub label: String,
    pub width: u32,
    pub height: u32,
    /// Linear RGBA texels, row-major, top row first.
    pub texels: Vec<f32>,
    pub mapping: Mapping,
}

impl Debug for EnvironmentMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvironmentMap")
            .field("label", &self.label)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mapping", &self.mapping)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlphaMode {
    #[default]
    Opaque,
    Mask,
    Blend,
}

/// A material as declared by the loaded asset.
///
/// Every property is optional: files are free to leave them out and the
/// defaults are only applied when a [`MaterialDescriptor`] is derived.
#[derive(Clone, Debug, Default)]
pub struct SourceMaterial {
    pub name: Option<String>,
    pub base_color_texture: Option<TextureHandle>,
    pub base_color: Option<[f32; 4]>,
    pub roughness: Option<f32>,
    pub metalness: Option<f32>,
    pub emissive: Option<Color>,
    pub normal_texture: Option<TextureHandle>,
    pub alpha_mode: AlphaMode,
    pub double_sided: bool,
}

/// The properties that drive a [`StandardMaterial`].
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDescriptor {
    pub texture: Option<TextureHandle>,
    pub color: Color,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: Color,
}

impl Default for MaterialDescriptor {
    fn default() -> Self {
        // Neutral values, matching the defaults of a glTF metallic-roughness material
        Self {
            texture: None,
            color: Color::WHITE,
            roughness: 1.0,
            metalness: 1.0,
            emissive: Color::BLACK,
        }
    }
}

impl From<&SourceMaterial> for MaterialDescriptor {
    fn from(source: &SourceMaterial) -> Self {
        let defaults = Self::default();
        Self {
            texture: source.base_color_texture.clone(),
            color: source
                .base_color
                .map(|[r, g, b, _]| Color::new(r, g, b))
                .unwrap_or(defaults.color),
            roughness: source.roughness.unwrap_or(defaults.roughness),
            metalness: source.metalness.unwrap_or(defaults.metalness),
            emissive: source.emissive.unwrap_or(defaults.emissive),
        }
    }
}

impl From<&StandardMaterial> for MaterialDescriptor {
    fn from(standard: &StandardMaterial) -> Self {
        let (texture, color) = match &standard.base {
            BaseAppearance::Texture(texture) => (Some(texture.clone()), Color::WHITE),
            BaseAppearance::Color(color) => (None, *color),
        };
        Self {
            texture,
            color,
            roughness: standard.roughness,
            metalness: standard.metalness,
            emissive: standard.emissive,
        }
    }
}

impl From<&Material> for MaterialDescriptor {
    fn from(material: &Material) -> Self {
        match material {
            Material::Source(source) => source.into(),
            Material::Standard(standard) => standard.as_ref().into(),
        }
    }
}

/// What drives the base color of a surface: a texture or a flat color, never both.
#[derive(Clone, Debug, PartialEq)]
pub enum BaseAppearance {
    Texture(TextureHandle),
    Color(Color),
}

/// The physically based material every mesh is rendered with.
#[derive(Clone, Debug)]
pub struct StandardMaterial {
    pub base: BaseAppearance,
    pub roughness: f32,
    pub metalness: f32,
    pub emissive: Color,
    pub env_map: Option<Arc<EnvironmentMap>>,
    pub env_map_intensity: f32,
}

impl StandardMaterial {
    pub fn new(
        descriptor: MaterialDescriptor,
        env_map: Option<Arc<EnvironmentMap>>,
        env_map_intensity: f32,
    ) -> Self {
        let base = match descriptor.texture {
            Some(texture) => BaseAppearance::Texture(texture),
            None => BaseAppearance::Color(descriptor.color),
        };
        Self {
            base,
            roughness: descriptor.roughness,
            metalness: descriptor.metalness,
            emissive: descriptor.emissive,
            env_map,
            env_map_intensity,
        }
    }

    pub fn map(&self) -> Option<&TextureHandle> {
        match &self.base {
            BaseAppearance::Texture(texture) => Some(texture),
            BaseAppearance::Color(_) => None,
        }
    }

    pub fn color(&self) -> Option<Color> {
        match &self.base {
            BaseAppearance::Texture(_) => None,
            BaseAppearance::Color(color) => Some(*color),
        }
    }

    /// True when this material reflects exactly the given environment.
    pub fn uses_environment(&self, environment: &Arc<EnvironmentMap>) -> bool {
        self.env_map
            .as_ref()
            .is_some_and(|env| Arc::ptr_eq(env, environment))
    }
}

/// Material slot of a mesh node.
#[derive(Clone, Debug)]
pub enum Material {
    Source(SourceMaterial),
    Standard(Arc<StandardMaterial>),
}

impl Material {
    pub fn as_standard(&self) -> Option<&Arc<StandardMaterial>> {
        match self {
            Material::Standard(standard) => Some(standard),
            Material::Source(_) => None,
        }
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::Source(SourceMaterial::default())
    }
}
