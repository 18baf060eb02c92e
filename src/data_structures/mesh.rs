//! CPU-side mesh geometry.
//!
//! Meshes are decoded once at load time and shared between scene nodes through
//! an `Arc`. The renderer uploads them lazily the first time they are drawn.

pub trait Vertex {
    fn desc() -> wgpu::VertexBufferLayout<'static>;
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ModelVertex {
    pub position: [f32; 3],
    pub tex_coords: [f32; 2],
    pub normal: [f32; 3],
}

impl Vertex for ModelVertex {
    fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ModelVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x2,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 5]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x3,
                },
            ],
        }
    }
}

/// Triangle list geometry of a single glTF primitive.
#[derive(Clone, Debug, Default)]
pub struct MeshData {
    pub name: String,
    pub vertices: Vec<ModelVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(name: impl Into<String>, vertices: Vec<ModelVertex>, indices: Vec<u32>) -> Self {
        Self {
            name: name.into(),
            vertices,
            indices,
        }
    }

    /**
     * Replaces all normals with area-weighted vertex normals computed from the triangles.
     *
     * Used for primitives that ship without a NORMAL attribute.
     */
    pub fn compute_normals(&mut self) {
        let mut normals = vec![cgmath::Vector3::new(0.0f32, 0.0, 0.0); self.vertices.len()];
        for c in self.indices.chunks_exact(3) {
            let (i0, i1, i2) = (c[0] as usize, c[1] as usize, c[2] as usize);
            if i0 >= normals.len() || i1 >= normals.len() || i2 >= normals.len() {
                log::warn!("Mesh {} references a vertex out of bounds.", self.name);
                continue;
            }
            let p0: cgmath::Vector3<f32> = self.vertices[i0].position.into();
            let p1: cgmath::Vector3<f32> = self.vertices[i1].position.into();
            let p2: cgmath::Vector3<f32> = self.vertices[i2].position.into();
            // The cross product's length is twice the triangle area which gives the weighting for free
            let face = (p1 - p0).cross(p2 - p0);
            normals[i0] += face;
            normals[i1] += face;
            normals[i2] += face;
        }
        for (vertex, normal) in self.vertices.iter_mut().zip(normals) {
            use cgmath::InnerSpace;
            vertex.normal = if normal.magnitude2() > 0.0 {
                normal.normalize().into()
            } else {
                [0.0, 1.0, 0.0]
            };
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}
