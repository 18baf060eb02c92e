//! Renderer contract and frame extraction.
//!
//! The render loop only talks to a [`Renderer`]. Backends turn the scene into
//! a [`DrawList`] each frame: one [`Draw`] per visible mesh with its world
//! transform, plus the lights in world space.
//!
//! # Key types
//!
//! - [`Renderer`] is implemented by the wgpu backend and by test doubles
//! - [`Draw`] holds one mesh, its normalized material and world transform
//! - [`FrameLights`] holds the hemisphere and directional light of the frame

use std::sync::Arc;

use cgmath::{InnerSpace, Vector3, Zero};

use crate::{
    camera::PerspectiveCamera,
    data_structures::{
        instance::Instance,
        light::{DirectionalLight, HemisphereLight, Light},
        material::StandardMaterial,
        mesh::MeshData,
        scene_graph::{NodeKind, Scene},
    },
};

/// Something that can draw a scene from a camera into a viewport.
pub trait Renderer {
    /// Draws one frame.
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> anyhow::Result<()>;

    /// Resizes the drawing surface. Zero sizes are ignored by the caller.
    fn set_size(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> anyhow::Result<()> {
        (**self).render(scene, camera)
    }

    fn set_size(&mut self, width: u32, height: u32) {
        (**self).set_size(width, height)
    }

    fn size(&self) -> (u32, u32) {
        (**self).size()
    }
}

#[derive(Clone, Debug)]
pub struct Draw {
    pub mesh: Arc<MeshData>,
    pub material: Arc<StandardMaterial>,
    pub world: Instance,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HemisphereInstance {
    pub light: HemisphereLight,
    /// Direction the sky color comes from.
    pub up: Vector3<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalInstance {
    pub light: DirectionalLight,
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
}

impl DirectionalInstance {
    /// Direction the light travels in.
    pub fn direction(&self) -> Vector3<f32> {
        let direction = self.target - self.position;
        if direction.magnitude2() > 0.0 {
            direction.normalize()
        } else {
            -Vector3::unit_y()
        }
    }
}

/// The first light of each kind found in the scene.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameLights {
    pub hemisphere: Option<HemisphereInstance>,
    pub directional: Option<DirectionalInstance>,
}

#[derive(Clone, Debug, Default)]
pub struct DrawList {
    pub draws: Vec<Draw>,
    pub lights: FrameLights,
}

impl DrawList {
    /**
     * Flattens the scene into world-space draws and lights.
     *
     * Meshes still carrying the material of their source file are skipped; they
     * only exist in a subtree that has not been normalized yet.
     */
    pub fn collect(scene: &Scene) -> Self {
        let mut list = DrawList::default();
        scene.visit_world(&mut |node, world| match &node.kind {
            NodeKind::Mesh(mesh) => match mesh.material.as_standard() {
                Some(material) => list.draws.push(Draw {
                    mesh: mesh.mesh.clone(),
                    material: material.clone(),
                    world: *world,
                    cast_shadow: node.cast_shadow,
                    receive_shadow: node.receive_shadow,
                }),
                None => log::trace!("Skipping mesh {} without a standard material", node.id()),
            },
            NodeKind::Light(Light::Hemisphere(light)) if list.lights.hemisphere.is_none() => {
                // At the origin the sky stays straight up
                let up = if world.position.is_zero() {
                    Vector3::unit_y()
                } else {
                    world.position.normalize()
                };
                list.lights.hemisphere = Some(HemisphereInstance { light: *light, up });
            }
            NodeKind::Light(Light::Directional(light)) if list.lights.directional.is_none() => {
                list.lights.directional = Some(DirectionalInstance {
                    light: *light,
                    position: world.position,
                    target: Vector3::zero(),
                });
            }
            _ => {}
        });
        list
    }
}
