//! Material normalization.
//!
//! Loaded assets keep whatever material their file declared. Before a subtree
//! is attached to the scene, every mesh in it gets a fresh
//! [`StandardMaterial`] built from the few properties we care about and wired
//! to the shared environment map.
//! An environment that arrives later is bound with [`bind_environment`].

use std::sync::Arc;

use crate::data_structures::{
    material::{EnvironmentMap, Material, MaterialDescriptor, StandardMaterial},
    scene_graph::{Node, Scene},
};

/// Reflection strength of the environment map on normalized materials.
pub const ENV_MAP_INTENSITY: f32 = 0.5;

/**
 * Replaces the material of every mesh below (and including) `root`.
 *
 * Texture, color, roughness, metalness and emissive carry over, everything else is
 * dropped. Every mesh casts and receives shadows afterwards. Returns the number of
 * meshes touched.
 */
pub fn normalize_materials(
    root: &mut Node,
    env_map: Option<&Arc<EnvironmentMap>>,
    env_map_intensity: f32,
) -> usize {
    let mut count = 0;
    root.traverse_mut(&mut |node| {
        let Some(mesh) = node.as_mesh_mut() else {
            return;
        };
        let descriptor = MaterialDescriptor::from(&mesh.material);
        mesh.material = Material::Standard(Arc::new(StandardMaterial::new(
            descriptor,
            env_map.cloned(),
            env_map_intensity,
        )));
        node.cast_shadow = true;
        node.receive_shadow = true;
        count += 1;
    });
    log::debug!("Normalized {} materials", count);
    count
}

/**
 * Gives every normalized material without a reflection source the scene's
 * environment, keeping its own intensity.
 *
 * Materials that already reflect an environment are left alone. Returns the
 * number of materials rebound.
 */
pub fn bind_environment(scene: &mut Scene, environment: &Arc<EnvironmentMap>) -> usize {
    let mut count = 0;
    scene.traverse_mut(&mut |node| {
        let Some(mesh) = node.as_mesh_mut() else {
            return;
        };
        let Material::Standard(material) = &mesh.material else {
            return;
        };
        if material.env_map.is_some() {
            return;
        }
        let mut rebound = StandardMaterial::clone(material);
        rebound.env_map = Some(environment.clone());
        mesh.material = Material::Standard(Arc::new(rebound));
        count += 1;
    });
    log::debug!("Bound {} to {} materials", environment.label, count);
    count
}
