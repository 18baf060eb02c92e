mod common;

use cgmath::{Vector3, Vector4};
use common::test_utils::approx;
use masque_viewer::{
    config::{OutputEncoding, ShadowFilter, StageConfig, ToneMapping},
    data_structures::{
        light::{DirectionalLight, HemisphereLight},
        material::Color,
    },
    pipelines::background::srgb_to_linear,
    render::DirectionalInstance,
};

fn approx_color(color: Color, expected: [f32; 3]) -> bool {
    approx(color.r, expected[0]) && approx(color.g, expected[1]) && approx(color.b, expected[2])
}

#[test]
fn should_convert_hsl() {
    assert!(approx_color(Color::from_hsl(0.0, 1.0, 0.5), [1.0, 0.0, 0.0]));
    assert!(approx_color(Color::from_hsl(1.0 / 3.0, 1.0, 0.5), [0.0, 1.0, 0.0]));
    assert!(approx_color(Color::from_hsl(0.5, 0.0, 0.25), [0.25, 0.25, 0.25]));
    // Hue wraps around
    assert!(approx_color(Color::from_hsl(1.0, 1.0, 0.5), [1.0, 0.0, 0.0]));
    assert!(approx_color(Color::from_hsl(0.6, 1.0, 0.6), [0.2, 0.52, 1.0]));
    assert!(approx_color(Color::from_hex(0xff8000), [1.0, 128.0 / 255.0, 0.0]));
}

#[test]
fn should_default_to_the_masque_stage() {
    let config = StageConfig::default();

    assert_eq!(config.assets.root, "assets");
    assert_eq!(config.assets.environment, "hdr/interior.hdr");
    assert_eq!(config.assets.scene, "model/scene0.gltf");
    assert_eq!(config.assets.avatar, "model/masque0.gltf");
    assert_eq!(config.animation_clip, "anim_masque0_idle0");
    assert_eq!(config.env_map_intensity, 0.5);
    assert_eq!(config.canvas_id, "canvas");

    let renderer = &config.renderer;
    assert_eq!(renderer.sample_count(), 4);
    assert!(renderer.alpha);
    assert!(renderer.shadows.enabled);
    assert_eq!(renderer.shadows.filter, ShadowFilter::PcfSoft);
    assert_eq!(renderer.tone_mapping, ToneMapping::Cineon);
    assert_eq!(renderer.output_encoding, OutputEncoding::Srgb);
}

#[test]
fn should_describe_background_as_css() {
    let gradient = StageConfig::default().renderer.background.expect("gradient");

    assert_eq!(
        gradient.to_css(),
        "linear-gradient(180deg, rgba(8,10,27,1) 0%, rgba(39,46,102,1) 100%)"
    );
    assert!(approx(srgb_to_linear(0.0), 0.0));
    assert!(approx(srgb_to_linear(1.0), 1.0));
    assert!(srgb_to_linear(0.5) < 0.5);
}

#[test]
fn should_use_warm_shadow_casting_sun() {
    let sun = DirectionalLight::default();
    let sky = HemisphereLight::default();

    assert!(sun.cast_shadow);
    assert_eq!(sun.intensity, 0.5);
    assert_eq!(sky.intensity, 0.5);
    assert_eq!(sun.shadow.map_size, 2048);
    assert_eq!((sun.shadow.left, sun.shadow.right), (-4.0, 4.0));
    assert_eq!((sun.shadow.bottom, sun.shadow.top), (-4.0, 4.0));
    assert!(approx_color(sun.color, [1.0, 0.96, 0.9]));

    // The shadow frustum edge lands on the clip space edge
    let corner = sun.shadow.projection() * Vector4::new(4.0, 4.0, -1.0, 1.0);
    assert!(approx(corner.x, 1.0));
    assert!(approx(corner.y, 1.0));
}

#[test]
fn should_shine_towards_the_origin() {
    let light = DirectionalInstance {
        light: DirectionalLight::default(),
        position: Vector3::new(10.0, 10.0, 10.0),
        target: Vector3::new(0.0, 0.0, 0.0),
    };

    let direction = light.direction();
    let expected = -1.0 / 3.0f32.sqrt();
    assert!(approx(direction.x, expected));
    assert!(approx(direction.y, expected));
    assert!(approx(direction.z, expected));
}
