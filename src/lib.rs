//! masque-viewer
//!
//! A cross-platform glTF viewer that shows an animated avatar inside an
//! environment model, lit by a hemisphere light, a shadow casting directional
//! light and an HDR environment map, with orbit controls on the camera. It runs
//! natively and in the browser (WASM + WebGL2).
//!
//! High-level modules
//! - `animation`: clip playback onto the scene graph
//! - `camera`: perspective camera, uniforms and orbit controls
//! - `config`: every tunable of the viewer with its default value
//! - `context`: window, surface and device setup
//! - `data_structures`: scene graph, meshes, materials, lights and textures
//! - `flow`: the winit application and its event loop
//! - `normalize`: conversion of loaded materials into one standard material
//! - `pipelines`: shadow, background and PBR render pipelines
//! - `render`: the renderer seam and the per-frame draw list
//! - `render_loop`: per-frame update and render scheduling
//! - `renderer`: the wgpu renderer
//! - `resources`: asset loading and glTF / HDR decoding
//! - `stage`: scene composition from the loaded assets
//!

pub mod animation;
pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod normalize;
pub mod pipelines;
pub mod render;
pub mod render_loop;
pub mod renderer;
pub mod resources;
pub mod stage;

// Re-exports commonly used types for convenience in downstream code.
pub use cgmath;
pub use config::StageConfig;
pub use flow::run;
pub use winit::event::WindowEvent;
