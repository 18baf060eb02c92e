mod common;

use std::f32::consts::{FRAC_PI_2, PI};

use cgmath::{InnerSpace, Point3, Rad};
use common::test_utils::approx;
use masque_viewer::{
    camera::{OrbitControls, PerspectiveCamera},
    config::{CameraConfig, ControlsConfig, StageConfig},
    WindowEvent,
};
use winit::{
    dpi::{PhysicalPosition, PhysicalSize},
    event::{DeviceId, ElementState, MouseButton, MouseScrollDelta, TouchPhase},
};

fn rig() -> (PerspectiveCamera, OrbitControls) {
    let camera = PerspectiveCamera::from_config(&CameraConfig::default(), 800, 600);
    let controls = OrbitControls::from_config(&ControlsConfig::default(), 600);
    (camera, controls)
}

fn device() -> DeviceId {
    // SAFETY: only used to build synthetic events, never handed to winit
    unsafe { DeviceId::dummy() }
}

fn press(button: MouseButton) -> WindowEvent {
    WindowEvent::MouseInput {
        device_id: device(),
        state: ElementState::Pressed,
        button,
    }
}

fn release(button: MouseButton) -> WindowEvent {
    WindowEvent::MouseInput {
        device_id: device(),
        state: ElementState::Released,
        button,
    }
}

fn cursor(x: f64, y: f64) -> WindowEvent {
    WindowEvent::CursorMoved {
        device_id: device(),
        position: PhysicalPosition::new(x, y),
    }
}

/// Presses `button`, drags from `from` to `to` and releases again.
fn drag(controls: &mut OrbitControls, button: MouseButton, from: (f64, f64), to: (f64, f64)) -> bool {
    let pressed = controls.handle_window_event(&press(button));
    controls.handle_window_event(&cursor(from.0, from.1));
    let moved = controls.handle_window_event(&cursor(to.0, to.1));
    controls.handle_window_event(&release(button));
    pressed && moved
}

fn distance(camera: &PerspectiveCamera, controls: &OrbitControls) -> f32 {
    (camera.position - controls.target).magnitude()
}

#[test]
fn should_start_from_configured_pose() {
    let config = StageConfig::default();
    let (camera, controls) = rig();

    assert_eq!(camera.position, Point3::new(0.0, 0.5, 2.4));
    assert_eq!(camera.fovy.0, 45.0);
    assert_eq!(camera.znear, 0.1);
    assert_eq!(camera.zfar, 1000.0);
    assert!(approx(camera.aspect, 800.0 / 600.0));
    assert_eq!(controls.target, Point3::new(0.0, 0.6, 0.0));
    assert_eq!(controls.min_distance, config.controls.min_distance);
    assert_eq!(controls.max_distance, 10.0);
    assert!(controls.enable_damping);
    assert_eq!(controls.damping_factor, 0.05);
    assert_eq!(controls.bindings.right, None);
}

#[test]
fn should_lock_camera_to_the_horizon() {
    let (mut camera, mut controls) = rig();
    let before = distance(&camera, &controls);

    controls.update(&mut camera);

    assert!(approx(camera.position.y, 0.6));
    assert!(approx(distance(&camera, &controls), before));
    assert_eq!(camera.target, controls.target);

    controls.rotate_up(Rad(0.5));
    for _ in 0..10 {
        controls.update(&mut camera);
    }
    assert!(approx(camera.position.y, 0.6));
}

#[test]
fn should_clamp_zoom_to_distance_bounds() {
    let (mut camera, mut controls) = rig();
    controls.enable_damping = false;

    controls.dolly_in(100.0);
    controls.update(&mut camera);
    assert!(approx(distance(&camera, &controls), 1.0));

    controls.dolly_out(200.0);
    controls.update(&mut camera);
    assert!(approx(distance(&camera, &controls), 10.0));
}

#[test]
fn should_damp_rotation() {
    let (mut camera, mut controls) = rig();

    controls.rotate_left(Rad(1.0));
    assert!(controls.update(&mut camera));

    let (azimuth, _) = controls.pending_rotation();
    assert!(approx(azimuth.0, -0.95));

    for _ in 0..500 {
        controls.update(&mut camera);
    }
    let (azimuth, _) = controls.pending_rotation();
    assert!(azimuth.0.abs() < 1e-4);
    // Everything that was pending has been applied by now
    let theta = camera.position.x.atan2(camera.position.z);
    assert!((theta + 1.0).abs() < 1e-3);
}

#[test]
fn should_apply_rotation_at_once_without_damping() {
    let (mut camera, mut controls) = rig();
    controls.enable_damping = false;
    controls.update(&mut camera);
    let radius = distance(&camera, &controls);

    controls.rotate_left(Rad(FRAC_PI_2));
    controls.update(&mut camera);

    assert!(approx(camera.position.x, -radius));
    assert!(camera.position.z.abs() < 1e-4);
    assert_eq!(controls.pending_rotation(), (Rad(0.0), Rad(0.0)));
}

#[test]
fn should_keep_still_camera_still() {
    let (mut camera, mut controls) = rig();
    controls.update(&mut camera);

    assert!(!controls.update(&mut camera));
}

#[test]
fn should_scale_drag_by_viewport_height() {
    let (_, mut controls) = rig();

    let consumed = controls.handle_window_event(&WindowEvent::Resized(PhysicalSize::new(800, 400)));
    assert!(!consumed);

    // Dragging across the full height turns a full circle
    controls.rotate(400.0, 0.0);
    let (azimuth, polar) = controls.pending_rotation();
    assert!(approx(azimuth.0, -2.0 * PI));
    assert!(approx(polar.0, 0.0));
}

#[test]
fn should_follow_viewport_aspect() {
    let (mut camera, _) = rig();
    let before = camera.projection_matrix();

    camera.set_viewport(800, 400);

    assert!(approx(camera.aspect, 2.0));
    assert_ne!(camera.projection_matrix(), before);
}

#[test]
fn should_damp_dolly() {
    let (mut camera, mut controls) = rig();
    let before = distance(&camera, &controls);

    controls.dolly_out(5.0);
    controls.update(&mut camera);
    let first = distance(&camera, &controls);
    controls.update(&mut camera);
    let second = distance(&camera, &controls);

    let settled = before / 0.95f32.powi(5);
    assert!(first > before && first < settled);
    assert!(second > first && second < settled);

    for _ in 0..500 {
        controls.update(&mut camera);
    }
    assert!((distance(&camera, &controls) - settled).abs() < 1e-3);
    assert!(approx(controls.pending_dolly(), 1.0));
}

#[test]
fn should_rotate_on_left_drag() {
    let (mut camera, mut controls) = rig();

    assert!(drag(&mut controls, MouseButton::Left, (100.0, 100.0), (140.0, 100.0)));

    let (azimuth, _) = controls.pending_rotation();
    assert!(approx(azimuth.0, -2.0 * PI * 40.0 / 600.0));
    // Released, so moving on does nothing
    assert!(!controls.handle_window_event(&cursor(300.0, 100.0)));
    assert_eq!(controls.pending_rotation().0, azimuth);
    assert!(controls.update(&mut camera));
}

#[test]
fn should_keep_horizon_under_vertical_drag() {
    let (mut camera, mut controls) = rig();

    assert!(drag(&mut controls, MouseButton::Left, (100.0, 100.0), (100.0, 500.0)));
    assert!(drag(&mut controls, MouseButton::Left, (100.0, 500.0), (100.0, 0.0)));

    for _ in 0..50 {
        controls.update(&mut camera);
        assert!(approx(camera.position.y, 0.6));
    }
}

#[test]
fn should_dolly_on_middle_drag_and_wheel() {
    let (_, mut controls) = rig();

    // Dragging down moves away from the target
    assert!(drag(&mut controls, MouseButton::Middle, (0.0, 100.0), (0.0, 120.0)));
    assert!(approx(controls.pending_dolly(), 1.0 / 0.95));

    let consumed = controls.handle_window_event(&WindowEvent::MouseWheel {
        device_id: device(),
        delta: MouseScrollDelta::LineDelta(0.0, 1.0),
        phase: TouchPhase::Moved,
    });
    assert!(consumed);
    assert!(approx(controls.pending_dolly(), 1.0));
    assert_eq!(controls.pending_rotation(), (Rad(0.0), Rad(0.0)));
}

#[test]
fn should_ignore_right_drag() {
    let (mut camera, mut controls) = rig();
    controls.update(&mut camera);
    let before = camera.position;

    assert!(!controls.handle_window_event(&press(MouseButton::Right)));
    assert!(!controls.handle_window_event(&cursor(0.0, 0.0)));
    assert!(!controls.handle_window_event(&cursor(200.0, 150.0)));
    assert!(!controls.handle_window_event(&release(MouseButton::Right)));

    assert!(!controls.update(&mut camera));
    assert!(approx(camera.position.x, before.x));
    assert!(approx(camera.position.z, before.z));
}
