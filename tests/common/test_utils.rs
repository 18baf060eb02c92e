use std::{io::Cursor, sync::Arc};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use masque_viewer::{
    camera::PerspectiveCamera,
    data_structures::{
        material::{Color, EnvironmentMap, ImageData, Mapping, SourceMaterial, TextureHandle},
        mesh::{MeshData, ModelVertex},
        scene_graph::Scene,
    },
    render::{DrawList, FrameLights, Renderer},
    resources::{GltfAsset, parse_gltf},
};

/// Renderer double that records what the render loop asks of it.
pub(crate) struct CountingRenderer {
    pub frames: u32,
    pub resizes: Vec<(u32, u32)>,
    pub size: (u32, u32),
    pub fail: bool,
    pub last_draws: usize,
    pub last_lights: FrameLights,
    pub last_camera_position: Option<cgmath::Point3<f32>>,
}

impl CountingRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            frames: 0,
            resizes: Vec::new(),
            size: (width, height),
            fail: false,
            last_draws: 0,
            last_lights: FrameLights::default(),
            last_camera_position: None,
        }
    }

    pub fn failing(width: u32, height: u32) -> Self {
        Self {
            fail: true,
            ..Self::new(width, height)
        }
    }
}

impl Renderer for CountingRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> anyhow::Result<()> {
        self.frames += 1;
        let list = DrawList::collect(scene);
        self.last_draws = list.draws.len();
        self.last_lights = list.lights;
        self.last_camera_position = Some(camera.position);
        if self.fail {
            anyhow::bail!("device lost");
        }
        Ok(())
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
        self.resizes.push((width, height));
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }
}

pub(crate) fn triangle_mesh(name: &str) -> Arc<MeshData> {
    let vertex = |position: [f32; 3]| ModelVertex {
        position,
        tex_coords: [0.0, 0.0],
        normal: [0.0, 0.0, 1.0],
    };
    Arc::new(MeshData::new(
        name,
        vec![
            vertex([0.0, 0.0, 0.0]),
            vertex([1.0, 0.0, 0.0]),
            vertex([0.0, 1.0, 0.0]),
        ],
        vec![0, 1, 2],
    ))
}

pub(crate) fn texture_handle(label: &str) -> TextureHandle {
    TextureHandle::new(ImageData {
        label: label.to_string(),
        width: 1,
        height: 1,
        rgba: vec![255, 255, 255, 255],
    })
}

pub(crate) fn source_material(texture: Option<TextureHandle>) -> SourceMaterial {
    SourceMaterial {
        name: Some("skin".to_string()),
        base_color_texture: texture,
        base_color: Some([0.5, 0.25, 1.0, 1.0]),
        roughness: Some(0.75),
        metalness: Some(0.25),
        emissive: Some(Color::new(0.1, 0.0, 0.0)),
        double_sided: true,
        ..Default::default()
    }
}

pub(crate) fn environment_map(label: &str) -> EnvironmentMap {
    EnvironmentMap {
        label: label.to_string(),
        width: 2,
        height: 1,
        texels: vec![1.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 1.0],
        mapping: Mapping::EquirectangularReflection,
    }
}

pub(crate) fn png_1x1(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(1, 1, image::Rgba(rgba));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .expect("failed to encode png");
    bytes.into_inner()
}

/// A flat (uncompressed) Radiance file where every pixel has the same RGBE value.
pub(crate) fn hdr_bytes(width: u32, height: u32, rgbe: [u8; 4]) -> Vec<u8> {
    let mut bytes = format!(
        "#?RADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y {} +X {}\n",
        height, width
    )
    .into_bytes();
    for _ in 0..width * height {
        bytes.extend_from_slice(&rgbe);
    }
    bytes
}

/// A two node glTF (`Armature` > `Body`) whose body is a single triangle.
///
/// Every clip moves the body from y = 0 to y = 2 over one second.
pub(crate) struct GltfFixture {
    pub texture: bool,
    pub clips: Vec<String>,
    pub external_buffer: bool,
}

impl Default for GltfFixture {
    fn default() -> Self {
        Self {
            texture: true,
            clips: vec!["anim_masque0_idle0".to_string()],
            external_buffer: false,
        }
    }
}

impl GltfFixture {
    pub fn with_clips(clips: &[&str]) -> Self {
        Self {
            clips: clips.iter().map(|clip| clip.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Geometry and animation data the fixture's single buffer holds.
    pub fn buffer() -> Vec<u8> {
        let mut data = Vec::new();
        for f in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            data.extend_from_slice(&f.to_le_bytes());
        }
        for i in [0u16, 1, 2, 0] {
            data.extend_from_slice(&i.to_le_bytes());
        }
        for f in [0.0f32, 1.0] {
            data.extend_from_slice(&f.to_le_bytes());
        }
        for f in [0.0f32, 0.0, 0.0, 0.0, 2.0, 0.0] {
            data.extend_from_slice(&f.to_le_bytes());
        }
        data
    }

    pub fn build(&self) -> Vec<u8> {
        let buffer = Self::buffer();
        let buffer_uri = if self.external_buffer {
            "triangle.bin".to_string()
        } else {
            format!("data:application/octet-stream;base64,{}", BASE64.encode(&buffer))
        };

        let (texture_ref, textures) = if self.texture {
            let png = BASE64.encode(png_1x1([255, 0, 0, 255]));
            (
                r#","baseColorTexture":{"index":0}"#.to_string(),
                format!(
                    r#","textures":[{{"source":0}}],"images":[{{"name":"skin_png","uri":"data:image/png;base64,{}"}}]"#,
                    png
                ),
            )
        } else {
            (String::new(), String::new())
        };

        let animations: Vec<String> = self
            .clips
            .iter()
            .map(|name| {
                format!(
                    r#"{{"name":"{}","channels":[{{"sampler":0,"target":{{"node":0,"path":"translation"}}}}],"samplers":[{{"input":2,"output":3,"interpolation":"LINEAR"}}]}}"#,
                    name
                )
            })
            .collect();

        format!(
            r#"{{
  "asset": {{"version": "2.0"}},
  "scene": 0,
  "scenes": [{{"nodes": [1]}}],
  "nodes": [
    {{"name": "Body", "mesh": 0, "translation": [0.0, 1.0, 0.0]}},
    {{"name": "Armature", "children": [0]}}
  ],
  "meshes": [{{"name": "body", "primitives": [{{"attributes": {{"POSITION": 0}}, "indices": 1, "material": 0}}]}}],
  "materials": [{{
    "name": "skin",
    "pbrMetallicRoughness": {{"baseColorFactor": [0.5, 0.25, 1.0, 1.0], "metallicFactor": 0.25, "roughnessFactor": 0.75{texture_ref}}},
    "emissiveFactor": [0.1, 0.0, 0.0],
    "doubleSided": true
  }}]{textures},
  "buffers": [{{"byteLength": {length}, "uri": "{buffer_uri}"}}],
  "bufferViews": [
    {{"buffer": 0, "byteOffset": 0, "byteLength": 36}},
    {{"buffer": 0, "byteOffset": 36, "byteLength": 6}},
    {{"buffer": 0, "byteOffset": 44, "byteLength": 8}},
    {{"buffer": 0, "byteOffset": 52, "byteLength": 24}}
  ],
  "accessors": [
    {{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}},
    {{"bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR"}},
    {{"bufferView": 2, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [1.0]}},
    {{"bufferView": 3, "componentType": 5126, "count": 2, "type": "VEC3"}}
  ],
  "animations": [{animations}]
}}"#,
            texture_ref = texture_ref,
            textures = textures,
            length = buffer.len(),
            buffer_uri = buffer_uri,
            animations = animations.join(","),
        )
        .into_bytes()
    }

    pub fn asset(&self) -> GltfAsset {
        parse_gltf(&self.build(), "fixture.gltf").expect("fixture should decode")
    }
}

/// A fresh directory below the system temp dir, unique per test and process.
pub(crate) fn asset_root(test: &str) -> std::path::PathBuf {
    let root = std::env::temp_dir().join(format!("masque-viewer-{}-{}", test, std::process::id()));
    if root.exists() {
        std::fs::remove_dir_all(&root).expect("failed to clear asset root");
    }
    std::fs::create_dir_all(&root).expect("failed to create asset root");
    root
}

/// Writes `bytes` to `root/file_name`, creating directories on the way.
pub(crate) fn write_asset(root: &std::path::Path, file_name: &str, bytes: &[u8]) {
    let path = root.join(file_name);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).expect("failed to create asset directory");
    }
    std::fs::write(path, bytes).expect("failed to write asset");
}

pub(crate) fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-4
}
