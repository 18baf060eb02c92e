use wgpu::util::DeviceExt;

use crate::{
    config::Gradient,
    data_structures::texture::Texture,
    pipelines::basic::{DepthUsage, mk_render_pipeline},
};

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct GradientUniform {
    top: [f32; 4],
    bottom: [f32; 4],
}

impl From<&Gradient> for GradientUniform {
    fn from(gradient: &Gradient) -> Self {
        let linear = |c: [f32; 4]| [srgb_to_linear(c[0]), srgb_to_linear(c[1]), srgb_to_linear(c[2]), c[3]];
        Self {
            top: linear(gradient.top),
            bottom: linear(gradient.bottom),
        }
    }
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Full screen gradient drawn first in the main pass.
pub struct BackgroundResources {
    pub pipeline: wgpu::RenderPipeline,
    pub bind_group: wgpu::BindGroup,
}

impl BackgroundResources {
    pub fn new(
        device: &wgpu::Device,
        color_format: wgpu::TextureFormat,
        sample_count: u32,
        gradient: &Gradient,
    ) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Background Gradient Buffer"),
            contents: bytemuck::cast_slice(&[GradientUniform::from(gradient)]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("background_bind_group_layout"),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("background_bind_group"),
        });
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Background Pipeline Layout"),
            bind_group_layouts: &[&layout],
            ..Default::default()
        });
        let pipeline = mk_render_pipeline(
            device,
            &pipeline_layout,
            color_format,
            Some(wgpu::BlendState::REPLACE),
            Some(Texture::DEPTH_FORMAT),
            DepthUsage::BACKGROUND,
            sample_count,
            &[],
            wgpu::ShaderModuleDescriptor {
                label: Some("Background Shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("background.wgsl").into()),
            },
        );
        Self {
            pipeline,
            bind_group,
        }
    }

    pub fn draw(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, &self.bind_group, &[]);
        render_pass.draw(0..3, 0..1);
    }
}
