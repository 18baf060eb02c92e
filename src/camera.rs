//! Perspective camera, its GPU uniform and orbit controls.
//!
//! [`OrbitControls`] keep the camera on a sphere around a target point. Input
//! accumulates into a pending rotation and dolly that [`OrbitControls::update`] applies
//! once per frame; with damping enabled only a fraction is applied each frame
//! so the motion settles smoothly after the mouse is released.

use std::f32::consts::PI;

use cgmath::{Deg, InnerSpace, Matrix4, Point3, Rad, Vector3};
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};

use crate::config::{CameraConfig, ControlsConfig};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const EPS: f32 = 0.000001;

#[derive(Clone, Debug)]
pub struct PerspectiveCamera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
    pub fovy: Deg<f32>,
    pub aspect: f32,
    pub znear: f32,
    pub zfar: f32,
    projection: Matrix4<f32>,
}

impl PerspectiveCamera {
    pub fn new(fovy: Deg<f32>, aspect: f32, znear: f32, zfar: f32) -> Self {
        let mut camera = Self {
            position: Point3::new(0.0, 0.0, 1.0),
            target: Point3::new(0.0, 0.0, 0.0),
            up: Vector3::unit_y(),
            fovy,
            aspect,
            znear,
            zfar,
            projection: Matrix4::from_scale(1.0),
        };
        camera.update_projection_matrix();
        camera
    }

    pub fn from_config(config: &CameraConfig, width: u32, height: u32) -> Self {
        let mut camera = Self::new(Deg(config.fov), aspect_of(width, height), config.near, config.far);
        camera.position = config.position.into();
        camera
    }

    /// Sets the aspect ratio from a viewport size and refreshes the projection.
    pub fn set_viewport(&mut self, width: u32, height: u32) {
        self.aspect = aspect_of(width, height);
        self.update_projection_matrix();
    }

    /// Must be called after changing `fovy`, `aspect`, `znear` or `zfar`.
    pub fn update_projection_matrix(&mut self) {
        self.projection = OPENGL_TO_WGPU_MATRIX
            * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar);
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        self.projection
    }

    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection * self.view_matrix()
    }
}

fn aspect_of(width: u32, height: u32) -> f32 {
    width.max(1) as f32 / height.max(1) as f32
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &PerspectiveCamera) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = camera.view_proj().into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseAction {
    Rotate,
    Dolly,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseBindings {
    pub left: Option<MouseAction>,
    pub middle: Option<MouseAction>,
    pub right: Option<MouseAction>,
}

impl MouseBindings {
    fn action(&self, button: MouseButton) -> Option<MouseAction> {
        match button {
            MouseButton::Left => self.left,
            MouseButton::Middle => self.middle,
            MouseButton::Right => self.right,
            _ => None,
        }
    }
}

impl Default for MouseBindings {
    fn default() -> Self {
        Self {
            left: Some(MouseAction::Rotate),
            middle: Some(MouseAction::Dolly),
            right: None,
        }
    }
}

/// Position on a sphere: radius, polar angle from +Y and azimuth around +Y from +Z.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Spherical {
    radius: f32,
    phi: f32,
    theta: f32,
}

impl Spherical {
    fn from_offset(offset: Vector3<f32>) -> Self {
        let radius = offset.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            theta: offset.x.atan2(offset.z),
        }
    }

    fn to_offset(self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }
}

#[derive(Debug)]
pub struct OrbitControls {
    pub target: Point3<f32>,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: Rad<f32>,
    pub max_polar_angle: Rad<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub enabled: bool,
    pub bindings: MouseBindings,
    pending: Spherical,
    /// Pending dolly as the log of the radius scale.
    pending_zoom: f32,
    active: Option<MouseAction>,
    cursor: Option<(f64, f64)>,
    viewport_height: f32,
}

impl OrbitControls {
    pub fn new(target: Point3<f32>) -> Self {
        Self {
            target,
            min_distance: 0.0,
            max_distance: f32::INFINITY,
            min_polar_angle: Rad(0.0),
            max_polar_angle: Rad(PI),
            enable_damping: false,
            damping_factor: 0.05,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            enabled: true,
            bindings: MouseBindings::default(),
            pending: Spherical {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            },
            pending_zoom: 0.0,
            active: None,
            cursor: None,
            viewport_height: 1.0,
        }
    }

    pub fn from_config(config: &ControlsConfig, viewport_height: u32) -> Self {
        let mut controls = Self::new(config.target.into());
        controls.min_distance = config.min_distance;
        controls.max_distance = config.max_distance;
        controls.min_polar_angle = config.min_polar_angle;
        controls.max_polar_angle = config.max_polar_angle;
        controls.enable_damping = config.enable_damping;
        controls.damping_factor = config.damping_factor;
        controls.bindings = config.bindings;
        controls.set_viewport_height(viewport_height);
        controls
    }

    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Orbits horizontally by `angle`.
    pub fn rotate_left(&mut self, angle: Rad<f32>) {
        self.pending.theta -= angle.0;
    }

    /// Orbits vertically by `angle`.
    pub fn rotate_up(&mut self, angle: Rad<f32>) {
        self.pending.phi -= angle.0;
    }

    /// Rotation for a pointer drag of `dx`, `dy` pixels; a drag over the full
    /// viewport height turns a full circle.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        let per_pixel = 2.0 * PI * self.rotate_speed / self.viewport_height;
        self.rotate_left(Rad(per_pixel * dx));
        self.rotate_up(Rad(per_pixel * dy));
    }

    /// Moves towards the target. Steps are scaled by the zoom speed.
    pub fn dolly_in(&mut self, steps: f32) {
        self.pending_zoom += self.zoom_scale().ln() * steps;
    }

    pub fn dolly_out(&mut self, steps: f32) {
        self.pending_zoom -= self.zoom_scale().ln() * steps;
    }

    fn zoom_scale(&self) -> f32 {
        0.95f32.powf(self.zoom_speed)
    }

    /// Feeds a window event into the controls. Returns true if it was consumed.
    pub fn handle_window_event(&mut self, event: &WindowEvent) -> bool {
        match event {
            WindowEvent::Resized(size) => {
                self.set_viewport_height(size.height);
                false
            }
            _ if !self.enabled => false,
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    self.active = self.bindings.action(*button);
                    self.active.is_some()
                }
                ElementState::Released => self.active.take().is_some(),
            },
            WindowEvent::CursorMoved { position, .. } => {
                let current = (position.x, position.y);
                let previous = self.cursor.replace(current);
                match (self.active, previous) {
                    (Some(action), Some((x, y))) => {
                        self.drag(action, (current.0 - x) as f32, (current.1 - y) as f32);
                        true
                    }
                    _ => false,
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32,
                };
                if dy > 0.0 {
                    self.dolly_in(1.0);
                } else if dy < 0.0 {
                    self.dolly_out(1.0);
                }
                dy != 0.0
            }
            _ => false,
        }
    }

    fn drag(&mut self, action: MouseAction, dx: f32, dy: f32) {
        match action {
            MouseAction::Rotate => self.rotate(dx, dy),
            MouseAction::Dolly => {
                if dy > 0.0 {
                    self.dolly_out(1.0);
                } else if dy < 0.0 {
                    self.dolly_in(1.0);
                }
            }
        }
    }

    /**
     * Applies pending input to the camera and points it at the target.
     *
     * The polar angle is clamped to its bounds and the distance to
     * `[min_distance, max_distance]`. Returns true if the camera moved.
     */
    pub fn update(&mut self, camera: &mut PerspectiveCamera) -> bool {
        let offset = camera.position - self.target;
        let mut spherical = Spherical::from_offset(offset);

        let factor = if self.enable_damping {
            self.damping_factor
        } else {
            1.0
        };
        spherical.theta += self.pending.theta * factor;
        spherical.phi += self.pending.phi * factor;

        let (min_polar, max_polar) = (self.min_polar_angle.0, self.max_polar_angle.0);
        spherical.phi = spherical.phi.max(min_polar).min(max_polar);
        spherical.phi = spherical.phi.clamp(EPS, PI - EPS);

        spherical.radius = (spherical.radius * (self.pending_zoom * factor).exp())
            .max(self.min_distance)
            .min(self.max_distance);

        camera.position = self.target + spherical.to_offset();
        camera.target = self.target;

        if self.enable_damping {
            self.pending.theta *= 1.0 - self.damping_factor;
            self.pending.phi *= 1.0 - self.damping_factor;
            self.pending_zoom *= 1.0 - self.damping_factor;
        } else {
            self.pending.theta = 0.0;
            self.pending.phi = 0.0;
            self.pending_zoom = 0.0;
        }

        (camera.position - self.target - offset).magnitude2() > EPS
    }

    /// Rotation not yet applied to the camera, as (azimuth, polar).
    pub fn pending_rotation(&self) -> (Rad<f32>, Rad<f32>) {
        (Rad(self.pending.theta), Rad(self.pending.phi))
    }

    /// Radius scale not yet applied to the camera.
    pub fn pending_dolly(&self) -> f32 {
        self.pending_zoom.exp()
    }
}
