mod common;

use cgmath::Vector3;
use common::test_utils::{CountingRenderer, GltfFixture, approx};
use masque_viewer::{
    animation::AnimationMixer,
    config::StageConfig,
    data_structures::scene_graph::Node,
    render_loop::{Clock, LoopState, RenderLoop},
    resources::{
        LoadEvent,
        animation::{AnimationClip, Channel, Interpolation, Keyframes},
    },
    stage::{AssetEvent, Stage},
};

fn render_loop(renderer: CountingRenderer) -> RenderLoop<CountingRenderer> {
    let (width, height) = renderer.size;
    RenderLoop::new(Stage::new(StageConfig::default(), width, height), renderer)
}

fn bob_clip() -> AnimationClip {
    AnimationClip::new(
        "bob",
        vec![Channel {
            target: 0,
            interpolation: Interpolation::Linear,
            timestamps: vec![0.0, 1.0],
            keyframes: Keyframes::Translation(vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 1.0, 0.0)]),
        }],
    )
}

fn add_mixer(render_loop: &mut RenderLoop<CountingRenderer>) {
    let stage = render_loop.stage_mut();
    let id = stage.scene.add(Node::group());
    let mut mixer = AnimationMixer::new(id, vec![bob_clip()]);
    mixer.play(0);
    stage.add_mixer(mixer);
}

#[test]
fn should_stay_idle_until_started() {
    let mut render_loop = render_loop(CountingRenderer::new(800, 600));
    let children = render_loop.stage().scene.children().len();

    render_loop.tick();
    render_loop.advance(0.016);
    render_loop.handle_asset_event(AssetEvent::Scene(LoadEvent::Loaded(GltfFixture::default().asset())));

    assert_eq!(render_loop.state(), LoopState::Idle);
    assert_eq!(render_loop.renderer().frames, 0);
    assert_eq!(render_loop.stage().scene.children().len(), children);
}

#[test]
fn should_advance_every_mixer_and_render_once() {
    let mut render_loop = render_loop(CountingRenderer::new(800, 600));
    add_mixer(&mut render_loop);
    add_mixer(&mut render_loop);
    render_loop.animate();

    render_loop.advance(0.016);

    assert_eq!(render_loop.state(), LoopState::Running);
    assert_eq!(render_loop.renderer().frames, 1);
    let mixers = render_loop.stage().mixers();
    assert_eq!(mixers.len(), 2);
    for mixer in mixers {
        assert!(approx(mixer.time(), 0.016));
    }
}

#[test]
fn should_render_on_every_tick() {
    let mut render_loop = render_loop(CountingRenderer::new(800, 600));
    render_loop.start();

    render_loop.tick();
    render_loop.tick();

    assert_eq!(render_loop.renderer().frames, 2);
}

#[test]
fn should_update_controls_before_rendering() {
    let mut render_loop = render_loop(CountingRenderer::new(800, 600));
    render_loop.start();

    render_loop.advance(0.0);

    let position = render_loop
        .renderer()
        .last_camera_position
        .expect("rendered once");
    // The polar angle is locked to the horizon of the orbit target
    assert!(approx(position.y, 0.6));
}

#[test]
fn should_render_lights_from_the_start() {
    let mut render_loop = render_loop(CountingRenderer::new(800, 600));
    render_loop.start();

    render_loop.advance(0.016);

    let lights = render_loop.renderer().last_lights;
    let hemisphere = lights.hemisphere.expect("hemisphere light");
    assert_eq!(hemisphere.up, Vector3::new(0.0, 1.0, 0.0));
    let directional = lights.directional.expect("directional light");
    assert_eq!(directional.position, Vector3::new(10.0, 10.0, 10.0));
    assert!(directional.light.cast_shadow);
    assert_eq!(directional.light.shadow.map_size, 2048);
    assert_eq!(render_loop.renderer().last_draws, 0);
}

#[test]
fn should_draw_loaded_assets() {
    let mut render_loop = render_loop(CountingRenderer::new(800, 600));
    render_loop.start();

    render_loop.handle_asset_event(AssetEvent::Scene(LoadEvent::InProgress(0.5)));
    render_loop.handle_asset_event(AssetEvent::Scene(LoadEvent::Loaded(GltfFixture::default().asset())));
    render_loop.handle_asset_event(AssetEvent::Avatar(LoadEvent::Loaded(GltfFixture::default().asset())));
    render_loop.advance(0.016);

    assert_eq!(render_loop.renderer().last_draws, 2);
    assert_eq!(render_loop.stage().mixers().len(), 1);
}

#[test]
fn should_resize_and_render_right_away() {
    let mut render_loop = render_loop(CountingRenderer::new(800, 600));

    render_loop.resize(1024, 512);
    render_loop.resize(0, 512);

    assert_eq!(render_loop.renderer().resizes, vec![(1024, 512)]);
    assert_eq!(render_loop.renderer().frames, 1);
    assert!(approx(render_loop.stage().camera.aspect, 2.0));
}

#[test]
fn should_survive_render_failures() {
    let mut render_loop = render_loop(CountingRenderer::failing(800, 600));
    add_mixer(&mut render_loop);
    render_loop.start();

    render_loop.advance(0.016);
    render_loop.advance(0.016);

    assert_eq!(render_loop.state(), LoopState::Running);
    assert_eq!(render_loop.renderer().frames, 2);
    assert!(approx(render_loop.stage().mixers()[0].time(), 0.032));
}

#[test]
fn should_shut_down_for_good() {
    let mut render_loop = render_loop(CountingRenderer::new(800, 600));
    let liveness = render_loop.liveness();
    render_loop.start();
    render_loop.advance(0.016);

    render_loop.stop();
    render_loop.start();
    render_loop.tick();
    render_loop.advance(0.016);
    render_loop.resize(640, 480);
    render_loop.handle_asset_event(AssetEvent::Avatar(LoadEvent::Loaded(GltfFixture::default().asset())));

    assert_eq!(render_loop.state(), LoopState::Stopped);
    assert!(!liveness.is_alive());
    assert_eq!(render_loop.renderer().frames, 1);
    assert!(render_loop.renderer().resizes.is_empty());
    assert!(render_loop.stage().mixers().is_empty());
}

#[test]
fn should_report_zero_on_first_clock_read() {
    let mut clock = Clock::new();

    assert_eq!(clock.get_delta(), 0.0);
    assert!(clock.get_delta() >= 0.0);
}
