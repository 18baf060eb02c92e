//! Render pipelines of the wgpu backend.
//!
//! - `basic` holds the lit mesh pipeline, its bind group layouts and the shared pipeline builder
//! - `shadow` renders the directional light's shadow map
//! - `background` draws the gradient behind the scene

pub mod background;
pub mod basic;
pub mod shadow;
