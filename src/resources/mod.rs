//! Asset loading: glTF models, their textures and animations, and HDR
//! environment images.
//!
//! Loading is asynchronous and reports through [`LoadEvent`]s: any number of
//! [`LoadEvent::InProgress`] followed by exactly one terminal
//! [`LoadEvent::Loaded`] or [`LoadEvent::Failed`]. Decoding itself is
//! synchronous and GPU-free, so assets can be built from memory as well.

use std::sync::Arc;

use anyhow::Context;

use crate::data_structures::{
    material::{AlphaMode, Color, Material, SourceMaterial, TextureHandle},
    scene_graph::Node,
};

pub mod animation;
pub mod mesh;
pub mod texture;

pub use animation::AnimationClip;
pub use texture::{decode_hdr, load_hdr};

/// Progress or outcome of a single asset load.
#[derive(Debug)]
pub enum LoadEvent<T> {
    /// Fraction of the asset received so far, in `[0, 1]`.
    InProgress(f32),
    Loaded(T),
    Failed(String),
}

impl<T> LoadEvent<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadEvent::InProgress(_))
    }
}

/// Log line for a progress report, such as `scene: 40% loaded`.
pub fn progress_message(label: &str, fraction: f32) -> String {
    format!("{}: {:.0}% loaded", label, fraction.clamp(0.0, 1.0) * 100.0)
}

impl<T> From<anyhow::Result<T>> for LoadEvent<T> {
    fn from(result: anyhow::Result<T>) -> Self {
        match result {
            Ok(asset) => LoadEvent::Loaded(asset),
            Err(e) => LoadEvent::Failed(format!("{:#}", e)),
        }
    }
}

/// A decoded glTF file: its node tree and its animation clips.
#[derive(Debug)]
pub struct GltfAsset {
    pub root: Node,
    pub clips: Vec<AnimationClip>,
}

/// Where the bytes behind buffer and image URIs come from.
enum Resolver<'a> {
    /// Only embedded data (GLB chunk and data URIs) is available.
    Embedded,
    /// External URIs are fetched relative to the glTF file below the asset root.
    Relative { root: &'a str, file_name: &'a str },
}

impl Resolver<'_> {
    async fn fetch(&self, uri: &str) -> anyhow::Result<Vec<u8>> {
        if let Some(data) = texture::decode_data_uri(uri) {
            return data;
        }
        match self {
            Resolver::Embedded => Err(anyhow::anyhow!(
                "external reference {} cannot be resolved for an in-memory asset",
                uri
            )),
            Resolver::Relative { root, file_name } => {
                texture::load_binary(root, &texture::resolve_relative(file_name, uri)).await
            }
        }
    }
}

/// Loads a `.gltf` or `.glb` file from the asset root.
pub async fn load_gltf(
    root: &str,
    file_name: &str,
    on_progress: impl FnMut(f32),
) -> anyhow::Result<GltfAsset> {
    let bytes = texture::load_binary_with_progress(root, file_name, on_progress).await?;
    decode_gltf(&bytes, file_name, Resolver::Relative { root, file_name }).await
}

/// Decodes a glTF file whose buffers and images are all embedded.
pub fn parse_gltf(bytes: &[u8], label: &str) -> anyhow::Result<GltfAsset> {
    futures::executor::block_on(decode_gltf(bytes, label, Resolver::Embedded))
}

async fn decode_gltf(bytes: &[u8], label: &str, resolver: Resolver<'_>) -> anyhow::Result<GltfAsset> {
    let gltf = gltf::Gltf::from_slice(bytes).with_context(|| format!("cannot parse {}", label))?;

    let mut buffer_data = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf
                .blob
                .as_deref()
                .map(<[u8]>::to_vec)
                .context("GLB binary chunk is missing")?,
            gltf::buffer::Source::Uri(uri) => resolver.fetch(uri).await?,
        };
        if data.len() < buffer.length() {
            anyhow::bail!(
                "buffer {} of {} holds {} bytes but declares {}",
                buffer.index(),
                label,
                data.len(),
                buffer.length()
            );
        }
        buffer_data.push(data);
    }

    let mut images = Vec::new();
    for image in gltf.images() {
        images.push(load_image(&image, &buffer_data, &resolver, label).await);
    }

    let materials: Vec<SourceMaterial> = gltf
        .materials()
        .map(|material| read_material(&material, &images))
        .collect();
    let clips = animation::read_animations(&gltf.document, &buffer_data);

    // Top level nodes of every scene in the file hang from one group
    let mut root = Node::group();
    for scene in gltf.scenes() {
        for node in scene.nodes() {
            root.add(to_scene_node(&node, &buffer_data, &materials));
        }
    }

    log::info!(
        "Decoded {}: {} meshes, {} animation clips",
        label,
        root.mesh_count(),
        clips.len()
    );
    Ok(GltfAsset { root, clips })
}

/// A broken image only costs its material the texture, not the whole asset.
async fn load_image(
    image: &gltf::Image<'_>,
    buffer_data: &[Vec<u8>],
    resolver: &Resolver<'_>,
    label: &str,
) -> Option<TextureHandle> {
    let name = image
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}#image{}", label, image.index()));
    let decoded = match image.source() {
        gltf::image::Source::View { view, mime_type } => {
            let start = view.offset();
            let end = start + view.length();
            match buffer_data
                .get(view.buffer().index())
                .and_then(|buffer| buffer.get(start..end))
            {
                Some(bytes) => texture::decode_image(bytes, &name, Some(mime_type)),
                None => Err(anyhow::anyhow!("buffer view {} is out of bounds", view.index())),
            }
        }
        gltf::image::Source::Uri { uri, mime_type } => match resolver.fetch(uri).await {
            Ok(bytes) => texture::decode_image(&bytes, &name, mime_type),
            Err(e) => Err(e),
        },
    };
    match decoded {
        Ok(texture) => Some(texture),
        Err(e) => {
            log::warn!("Image {} could not be loaded: {:#}", name, e);
            None
        }
    }
}

fn read_material(material: &gltf::Material, images: &[Option<TextureHandle>]) -> SourceMaterial {
    let pbr = material.pbr_metallic_roughness();
    let base_color_texture = pbr
        .base_color_texture()
        .and_then(|info| image_of(&info.texture(), images));
    let normal_texture = material
        .normal_texture()
        .and_then(|normal| image_of(&normal.texture(), images));
    SourceMaterial {
        name: material.name().map(str::to_string),
        base_color_texture,
        base_color: Some(pbr.base_color_factor()),
        roughness: Some(pbr.roughness_factor()),
        metalness: Some(pbr.metallic_factor()),
        emissive: Some(Color::from(material.emissive_factor())),
        normal_texture,
        alpha_mode: match material.alpha_mode() {
            gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
            gltf::material::AlphaMode::Mask => AlphaMode::Mask,
            gltf::material::AlphaMode::Blend => AlphaMode::Blend,
        },
        double_sided: material.double_sided(),
    }
}

fn image_of(texture: &gltf::Texture<'_>, images: &[Option<TextureHandle>]) -> Option<TextureHandle> {
    images.get(texture.source().index()).cloned().flatten()
}

/**
 * Converts a glTF node and its descendants.
 *
 * A mesh with a single primitive becomes a mesh node. A mesh with several primitives
 * becomes a group with one mesh child per primitive so each keeps its own material.
 */
fn to_scene_node(
    node: &gltf::Node,
    buffer_data: &[Vec<u8>],
    materials: &[SourceMaterial],
) -> Node {
    let mut primitives: Vec<Node> = match node.mesh() {
        Some(gltf_mesh) => {
            let mesh_name = gltf_mesh
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("mesh_{}", gltf_mesh.index()));
            gltf_mesh
                .primitives()
                .filter_map(|primitive| {
                    let mesh = mesh::read_primitive(&mesh_name, &primitive, buffer_data)?;
                    let material = primitive
                        .material()
                        .index()
                        .and_then(|idx| materials.get(idx))
                        .cloned()
                        .unwrap_or_default();
                    Some(Node::mesh(Arc::new(mesh), Material::Source(material)))
                })
                .collect()
        }
        None => Vec::new(),
    };

    let mut scene_node = if primitives.len() == 1 {
        primitives.remove(0)
    } else {
        let mut group = Node::group();
        group.children = primitives;
        group
    };
    scene_node.name = node.name().map(str::to_string);
    scene_node.source_index = Some(node.index());
    let (translation, rotation, scale) = node.transform().decomposed();
    scene_node.transform.position = translation.into();
    let [x, y, z, w] = rotation;
    scene_node.transform.rotation = cgmath::Quaternion::new(w, x, y, z);
    scene_node.transform.scale = scale.into();

    for child in node.children() {
        scene_node.add(to_scene_node(&child, buffer_data, materials));
    }
    scene_node
}
