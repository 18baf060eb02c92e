//! The wgpu implementation of [`Renderer`].
//!
//! Each frame the scene is flattened into a [`DrawList`]. Meshes, materials and
//! textures are uploaded the first time they show up and cached by the address
//! of their shared allocation; the cache keeps a clone of the `Arc` so the
//! address stays valid. Nothing is ever evicted since the scene only grows.
//!
//! A frame is a shadow pass for the directional light followed by one main pass
//! drawing the background gradient and every mesh with the PBR pipeline.

use std::{collections::HashMap, iter, sync::Arc};

use anyhow::Context as _;
use bytemuck::Zeroable;
use cgmath::{EuclideanSpace, InnerSpace, Matrix4, Point3, SquareMatrix, Vector3};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{CameraUniform, OPENGL_TO_WGPU_MATRIX, PerspectiveCamera},
    config::{RendererSettings, ShadowFilter, ToneMapping},
    context::Context,
    data_structures::{
        instance::InstanceRaw,
        material::{EnvironmentMap, StandardMaterial, TextureHandle},
        mesh::MeshData,
        scene_graph::Scene,
        texture::{Texture, create_default_sampler},
    },
    pipelines::{
        background::BackgroundResources,
        basic::{frame_layout, material_layout, mk_pbr_pipeline},
        shadow::ShadowResources,
    },
    render::{DirectionalInstance, DrawList, FrameLights, Renderer},
};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct FrameUniform {
    view_proj: [[f32; 4]; 4],
    light_view_proj: [[f32; 4]; 4],
    view_position: [f32; 4],
    sky_color: [f32; 4],
    ground_color: [f32; 4],
    hemisphere_up: [f32; 4],
    light_color: [f32; 4],
    light_direction: [f32; 4],
    params: [f32; 4],
    shadow_params: [f32; 4],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct MaterialUniform {
    color: [f32; 4],
    emissive: [f32; 4],
    params: [f32; 4],
}

impl From<&StandardMaterial> for MaterialUniform {
    fn from(material: &StandardMaterial) -> Self {
        let (color, has_map) = match material.color() {
            Some(color) => (color.to_array(), 0.0),
            None => ([1.0; 3], 1.0),
        };
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        Self {
            color: [color[0], color[1], color[2], has_map],
            emissive: [material.emissive.r, material.emissive.g, material.emissive.b, 0.0],
            params: [
                material.roughness,
                material.metalness,
                material.env_map_intensity,
                flag(material.env_map.is_some()),
            ],
        }
    }
}

struct GpuMesh {
    _source: Arc<MeshData>,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    num_indices: u32,
}

struct GpuMaterial {
    _source: Arc<StandardMaterial>,
    _buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

struct GpuTexture {
    _source: TextureHandle,
    texture: Texture,
}

struct GpuEnvironment {
    source: Arc<EnvironmentMap>,
    texture: Texture,
}

pub struct WgpuRenderer {
    ctx: Context,
    settings: RendererSettings,
    frame_layout: wgpu::BindGroupLayout,
    material_layout: wgpu::BindGroupLayout,
    pbr_pipeline: wgpu::RenderPipeline,
    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    shadow: ShadowResources,
    background: Option<BackgroundResources>,
    depth_texture: Texture,
    msaa_target: Option<Texture>,
    base_sampler: wgpu::Sampler,
    white: Texture,
    black_environment: Texture,
    environment: Option<GpuEnvironment>,
    meshes: HashMap<usize, GpuMesh>,
    materials: HashMap<usize, GpuMaterial>,
    textures: HashMap<usize, GpuTexture>,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
}

impl std::fmt::Debug for WgpuRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuRenderer")
            .field("size", &self.ctx.size())
            .field("sample_count", &self.ctx.sample_count)
            .field("meshes", &self.meshes.len())
            .field("materials", &self.materials.len())
            .field("textures", &self.textures.len())
            .finish()
    }
}

impl WgpuRenderer {
    pub async fn new(
        window: Arc<Window>,
        settings: RendererSettings,
        shadow_map_size: u32,
    ) -> anyhow::Result<Self> {
        let ctx = Context::new(window, &settings).await?;
        let device = &ctx.device;
        let format = ctx.config.format;
        let sample_count = ctx.sample_count;

        let frame_layout = frame_layout(device);
        let material_layout = material_layout(device);
        let pbr_pipeline = mk_pbr_pipeline(device, format, sample_count, &frame_layout, &material_layout);

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Buffer"),
            contents: bytemuck::cast_slice(&[FrameUniform::zeroed()]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let shadow = ShadowResources::new(device, shadow_map_size);
        let black_environment = Texture::create_black_environment(device, &ctx.queue);
        let frame_bind_group =
            mk_frame_bind_group(device, &frame_layout, &frame_buffer, &shadow.map, &black_environment)?;

        let background = settings
            .background
            .as_ref()
            .map(|gradient| BackgroundResources::new(device, format, sample_count, gradient));
        let (width, height) = ctx.size();
        let depth_texture = Texture::create_depth_texture(device, [width, height], sample_count, "depth_texture");
        let msaa_target = (sample_count > 1)
            .then(|| Texture::create_msaa_target(device, format, [width, height], sample_count));
        let base_sampler = create_default_sampler(device);
        let white = Texture::create_white(device, &ctx.queue);

        let instance_capacity = 64;
        let instance_buffer = mk_instance_buffer(device, instance_capacity);

        log::info!(
            "Renderer ready: {}x{} {:?}, {}x MSAA",
            width,
            height,
            format,
            sample_count
        );

        Ok(Self {
            ctx,
            settings,
            frame_layout,
            material_layout,
            pbr_pipeline,
            frame_buffer,
            frame_bind_group,
            shadow,
            background,
            depth_texture,
            msaa_target,
            base_sampler,
            white,
            black_environment,
            environment: None,
            meshes: HashMap::new(),
            materials: HashMap::new(),
            textures: HashMap::new(),
            instance_buffer,
            instance_capacity,
        })
    }

    pub fn window(&self) -> &Arc<Window> {
        self.ctx.window()
    }

    fn sync_environment(&mut self, environment: Option<&Arc<EnvironmentMap>>) -> anyhow::Result<()> {
        let current = self.environment.as_ref().map(|env| &env.source);
        let unchanged = match (current, environment) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return Ok(());
        }
        self.environment = environment.map(|source| GpuEnvironment {
            source: source.clone(),
            texture: Texture::from_environment(&self.ctx.device, &self.ctx.queue, source),
        });
        let texture = self
            .environment
            .as_ref()
            .map(|env| &env.texture)
            .unwrap_or(&self.black_environment);
        self.frame_bind_group = mk_frame_bind_group(
            &self.ctx.device,
            &self.frame_layout,
            &self.frame_buffer,
            &self.shadow.map,
            texture,
        )?;
        log::debug!("Bound environment {:?}", environment.map(|env| &env.label));
        Ok(())
    }

    fn upload(&mut self, list: &DrawList) {
        for draw in &list.draws {
            let key = Arc::as_ptr(&draw.mesh) as usize;
            if !self.meshes.contains_key(&key) {
                let mesh = upload_mesh(&self.ctx.device, &draw.mesh);
                self.meshes.insert(key, mesh);
            }

            let key = Arc::as_ptr(&draw.material) as usize;
            if self.materials.contains_key(&key) {
                continue;
            }
            if let Some(handle) = draw.material.map() {
                self.textures.entry(handle.key()).or_insert_with(|| GpuTexture {
                    _source: handle.clone(),
                    texture: Texture::from_handle(&self.ctx.device, &self.ctx.queue, handle),
                });
            }
            let view = match draw.material.map() {
                Some(handle) => self
                    .textures
                    .get(&handle.key())
                    .map(|gpu| &gpu.texture.view)
                    .unwrap_or(&self.white.view),
                None => &self.white.view,
            };
            let material = upload_material(
                &self.ctx.device,
                &self.material_layout,
                &draw.material,
                view,
                &self.base_sampler,
            );
            self.materials.insert(key, material);
        }
    }

    fn write_instances(&mut self, list: &DrawList) {
        let instances: Vec<InstanceRaw> = list
            .draws
            .iter()
            .map(|draw| draw.world.to_raw(draw.receive_shadow))
            .collect();
        if instances.len() > self.instance_capacity {
            self.instance_capacity = instances.len().next_power_of_two();
            self.instance_buffer = mk_instance_buffer(&self.ctx.device, self.instance_capacity);
        }
        if !instances.is_empty() {
            self.ctx
                .queue
                .write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&instances));
        }
    }

    fn shadows_active(&self, lights: &FrameLights) -> bool {
        self.settings.shadows.enabled && lights.directional.is_some_and(|light| light.light.cast_shadow)
    }

    fn write_frame(&self, camera: &PerspectiveCamera, lights: &FrameLights) -> Matrix4<f32> {
        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(camera);

        let light_view_proj = lights
            .directional
            .as_ref()
            .map(light_view_proj)
            .unwrap_or_else(Matrix4::identity);

        let mut uniform = FrameUniform::zeroed();
        uniform.view_proj = camera_uniform.view_proj;
        uniform.view_position = camera_uniform.view_position;
        uniform.light_view_proj = light_view_proj.into();
        if let Some(hemisphere) = &lights.hemisphere {
            let light = hemisphere.light;
            uniform.sky_color = rgb_w(light.sky_color.scaled(light.intensity).to_array(), 0.0);
            uniform.ground_color = rgb_w(light.ground_color.scaled(light.intensity).to_array(), 0.0);
            uniform.hemisphere_up = rgb_w(hemisphere.up.into(), 1.0);
        }
        if let Some(directional) = &lights.directional {
            let light = directional.light;
            let towards_light = -directional.direction();
            uniform.light_color = rgb_w(light.color.scaled(light.intensity).to_array(), 1.0);
            uniform.light_direction = rgb_w(
                towards_light.into(),
                if self.shadows_active(lights) { 1.0 } else { 0.0 },
            );
        }
        let shadow_bias = lights
            .directional
            .map(|directional| directional.light.shadow.bias)
            .unwrap_or_default();
        uniform.params = [
            self.settings.exposure,
            match self.settings.tone_mapping {
                ToneMapping::None => 0.0,
                ToneMapping::Cineon => 1.0,
            },
            shadow_bias,
            match self.settings.shadows.filter {
                ShadowFilter::Basic => 0.0,
                ShadowFilter::PcfSoft => 1.0,
            },
        ];
        uniform.shadow_params = [
            1.0 / self.shadow.map_size.max(1) as f32,
            if self.environment.is_some() { 1.0 } else { 0.0 },
            0.0,
            0.0,
        ];
        self.ctx
            .queue
            .write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[uniform]));
        light_view_proj
    }

    fn draw_frame(&mut self, list: &DrawList, light_view_proj: Matrix4<f32>) -> anyhow::Result<()> {
        let output = match self.ctx.surface.get_current_texture() {
            Ok(output) => output,
            // Reconfigure the surface if it's lost or outdated
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.ctx.reconfigure();
                return Ok(());
            }
            Err(e) => return Err(e).context("cannot acquire the next surface texture"),
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        if self.shadows_active(&list.lights) {
            self.shadow.write(&self.ctx.queue, light_view_proj);
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow.map.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                ..Default::default()
            });
            shadow_pass.set_pipeline(&self.shadow.pipeline);
            shadow_pass.set_bind_group(0, &self.shadow.bind_group, &[]);
            shadow_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for (index, draw) in list.draws.iter().enumerate() {
                if !draw.cast_shadow {
                    continue;
                }
                let Some(mesh) = self.meshes.get(&(Arc::as_ptr(&draw.mesh) as usize)) else {
                    continue;
                };
                let instance = index as u32;
                shadow_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                shadow_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                shadow_pass.draw_indexed(0..mesh.num_indices, 0, instance..instance + 1);
            }
        }

        {
            let clear = if self.settings.alpha {
                wgpu::Color::TRANSPARENT
            } else {
                wgpu::Color::BLACK
            };
            let (target, resolve_target) = match &self.msaa_target {
                Some(msaa) => (&msaa.view, Some(&view)),
                None => (&view, None),
            };
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(clear),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                ..Default::default()
            });

            if let Some(background) = &self.background {
                background.draw(&mut render_pass);
            }

            render_pass.set_pipeline(&self.pbr_pipeline);
            render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            render_pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
            for (index, draw) in list.draws.iter().enumerate() {
                let mesh = self.meshes.get(&(Arc::as_ptr(&draw.mesh) as usize));
                let material = self.materials.get(&(Arc::as_ptr(&draw.material) as usize));
                let (Some(mesh), Some(material)) = (mesh, material) else {
                    continue;
                };
                let instance = index as u32;
                render_pass.set_bind_group(1, &material.bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.num_indices, 0, instance..instance + 1);
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

impl Renderer for WgpuRenderer {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> anyhow::Result<()> {
        let list = DrawList::collect(scene);
        self.sync_environment(scene.environment.as_ref())?;
        self.upload(&list);
        self.write_instances(&list);
        let light_view_proj = self.write_frame(camera, &list.lights);
        self.draw_frame(&list, light_view_proj)
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.ctx.resize(width, height);
        let sample_count = self.ctx.sample_count;
        self.depth_texture =
            Texture::create_depth_texture(&self.ctx.device, [width, height], sample_count, "depth_texture");
        if self.msaa_target.is_some() {
            self.msaa_target = Some(Texture::create_msaa_target(
                &self.ctx.device,
                self.ctx.config.format,
                [width, height],
                sample_count,
            ));
        }
    }

    fn size(&self) -> (u32, u32) {
        self.ctx.size()
    }
}

fn rgb_w(rgb: [f32; 3], w: f32) -> [f32; 4] {
    [rgb[0], rgb[1], rgb[2], w]
}

/// View-projection of the directional light's shadow camera.
fn light_view_proj(light: &DirectionalInstance) -> Matrix4<f32> {
    let direction = light.direction();
    let up = if direction.cross(Vector3::unit_y()).magnitude2() < 1e-6 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    let view = Matrix4::look_at_rh(
        Point3::from_vec(light.position),
        Point3::from_vec(light.target),
        up,
    );
    OPENGL_TO_WGPU_MATRIX * light.light.shadow.projection() * view
}

fn mk_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity.max(1) * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn mk_frame_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    frame_buffer: &wgpu::Buffer,
    shadow_map: &Texture,
    environment: &Texture,
) -> anyhow::Result<wgpu::BindGroup> {
    let shadow_sampler = shadow_map
        .sampler
        .as_ref()
        .context("the shadow map has no comparison sampler")?;
    let environment_sampler = environment
        .sampler
        .as_ref()
        .context("the environment texture has no sampler")?;
    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(shadow_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&environment.view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(environment_sampler),
            },
        ],
        label: Some("frame_bind_group"),
    }))
}

fn upload_mesh(device: &wgpu::Device, mesh: &Arc<MeshData>) -> GpuMesh {
    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Vertex Buffer", mesh.name)),
        contents: bytemuck::cast_slice(&mesh.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{:?} Index Buffer", mesh.name)),
        contents: bytemuck::cast_slice(&mesh.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    GpuMesh {
        _source: mesh.clone(),
        vertex_buffer,
        index_buffer,
        num_indices: mesh.indices.len() as u32,
    }
}

fn upload_material(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    material: &Arc<StandardMaterial>,
    base_view: &wgpu::TextureView,
    sampler: &wgpu::Sampler,
) -> GpuMaterial {
    let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Material Buffer"),
        contents: bytemuck::cast_slice(&[MaterialUniform::from(material.as_ref())]),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(base_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
        label: Some("material_bind_group"),
    });
    GpuMaterial {
        _source: material.clone(),
        _buffer: buffer,
        bind_group,
    }
}
