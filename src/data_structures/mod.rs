//! Engine data structures: scene graph, meshes, materials, lights and textures.
//!
//! - `scene_graph` holds the node tree rooted at a [`scene_graph::Scene`]
//! - `mesh` contains CPU-side geometry and the vertex layout
//! - `material` contains source/standard materials, colors and images
//! - `light` contains the hemisphere and directional lights
//! - `instance` holds per-node transformation data
//! - `texture` contains GPU texture wrapper and creation utilities

pub mod instance;
pub mod light;
pub mod material;
pub mod mesh;
pub mod scene_graph;
pub mod texture;
