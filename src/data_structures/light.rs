//! Light sources that can be attached to the scene graph.

use crate::data_structures::material::Color;

/// Ambient light blended between a sky and a ground color along the up axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HemisphereLight {
    pub sky_color: Color,
    pub ground_color: Color,
    pub intensity: f32,
}

impl HemisphereLight {
    pub fn new(sky_color: Color, ground_color: Color, intensity: f32) -> Self {
        Self {
            sky_color,
            ground_color,
            intensity,
        }
    }
}

impl Default for HemisphereLight {
    fn default() -> Self {
        Self::new(
            Color::from_hsl(0.6, 1.0, 0.6),
            Color::from_hsl(0.095, 1.0, 0.75),
            0.5,
        )
    }
}

/// Orthographic shadow camera of a directional light.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalShadow {
    pub map_size: u32,
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
    pub near: f32,
    pub far: f32,
    pub bias: f32,
}

impl DirectionalShadow {
    /// A square frustum reaching `extent` in every direction from the light's axis.
    pub fn square(map_size: u32, extent: f32) -> Self {
        Self {
            map_size,
            left: -extent,
            right: extent,
            top: extent,
            bottom: -extent,
            near: 0.5,
            far: 500.0,
            bias: 0.0005,
        }
    }

    pub fn projection(&self) -> cgmath::Matrix4<f32> {
        cgmath::ortho(
            self.left,
            self.right,
            self.bottom,
            self.top,
            self.near,
            self.far,
        )
    }
}

/// Parallel light shining from the node position towards the world origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub color: Color,
    pub intensity: f32,
    pub cast_shadow: bool,
    pub shadow: DirectionalShadow,
}

impl DirectionalLight {
    pub fn new(color: Color, intensity: f32) -> Self {
        Self {
            color,
            intensity,
            cast_shadow: false,
            shadow: DirectionalShadow::square(512, 5.0),
        }
    }
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            color: Color::from_hsl(0.1, 1.0, 0.95),
            intensity: 0.5,
            cast_shadow: true,
            shadow: DirectionalShadow::square(2048, 4.0),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Hemisphere(HemisphereLight),
    Directional(DirectionalLight),
}
