mod common;

use std::sync::Arc;

use common::test_utils::{GltfFixture, environment_map, source_material, texture_handle, triangle_mesh};
use masque_viewer::{
    config::StageConfig,
    data_structures::{
        material::{BaseAppearance, Color, Material, SourceMaterial, StandardMaterial},
        scene_graph::{Node, Scene},
    },
    normalize::{ENV_MAP_INTENSITY, bind_environment, normalize_materials},
    render::DrawList,
    resources::LoadEvent,
    stage::{AssetEvent, SCENE_NODE_NAME, Stage},
};

fn standard(node: &Node) -> &Arc<StandardMaterial> {
    node.as_mesh()
        .and_then(|mesh| mesh.material.as_standard())
        .expect("normalized mesh")
}

#[test]
fn should_keep_texture_and_drop_color() {
    let texture = texture_handle("skin");
    let mut root = Node::mesh(
        triangle_mesh("body"),
        Material::Source(source_material(Some(texture.clone()))),
    );

    let count = normalize_materials(&mut root, None, ENV_MAP_INTENSITY);

    assert_eq!(count, 1);
    let material = standard(&root);
    assert!(material.map().expect("texture survives").ptr_eq(&texture));
    assert_eq!(material.color(), None);
    assert_eq!(material.roughness, 0.75);
    assert_eq!(material.metalness, 0.25);
    assert_eq!(material.emissive, Color::new(0.1, 0.0, 0.0));
    assert!(material.env_map.is_none());
    assert!(root.cast_shadow);
    assert!(root.receive_shadow);
}

#[test]
fn should_keep_color_without_texture() {
    let mut root = Node::mesh(triangle_mesh("body"), Material::Source(source_material(None)));

    normalize_materials(&mut root, None, ENV_MAP_INTENSITY);

    let material = standard(&root);
    assert_eq!(material.base, BaseAppearance::Color(Color::new(0.5, 0.25, 1.0)));
    assert!(material.map().is_none());
}

#[test]
fn should_fall_back_to_neutral_defaults() {
    let mut root = Node::mesh(triangle_mesh("bare"), Material::Source(SourceMaterial::default()));

    normalize_materials(&mut root, None, ENV_MAP_INTENSITY);

    let material = standard(&root);
    assert_eq!(material.color(), Some(Color::WHITE));
    assert_eq!(material.roughness, 1.0);
    assert_eq!(material.metalness, 1.0);
    assert_eq!(material.emissive, Color::BLACK);
}

#[test]
fn should_share_the_environment_map() {
    let environment = Arc::new(environment_map("interior.hdr"));
    let mut root = Node::group();
    root.add(Node::mesh(triangle_mesh("a"), Material::Source(source_material(None))));
    let mut arm = Node::group().with_name("arm");
    arm.add(Node::mesh(triangle_mesh("b"), Material::Source(source_material(None))));
    root.add(arm);

    let count = normalize_materials(&mut root, Some(&environment), ENV_MAP_INTENSITY);

    assert_eq!(count, 2);
    let mut seen = 0;
    root.traverse(&mut |node| {
        if node.as_mesh().is_none() {
            assert!(!node.cast_shadow, "groups are left alone");
            return;
        }
        let material = standard(node);
        assert!(material.uses_environment(&environment));
        assert_eq!(material.env_map_intensity, 0.5);
        seen += 1;
    });
    assert_eq!(seen, 2);
}

#[test]
fn should_be_stable_when_applied_twice() {
    let texture = texture_handle("skin");
    let mut root = Node::mesh(
        triangle_mesh("body"),
        Material::Source(source_material(Some(texture.clone()))),
    );

    normalize_materials(&mut root, None, ENV_MAP_INTENSITY);
    let first = standard(&root).clone();
    normalize_materials(&mut root, None, ENV_MAP_INTENSITY);
    let second = standard(&root);

    assert!(!Arc::ptr_eq(&first, second), "a fresh material every time");
    assert_eq!(first.base, second.base);
    assert_eq!(first.roughness, second.roughness);
    assert_eq!(first.metalness, second.metalness);
}

#[test]
fn should_light_scene_with_loaded_environment() {
    let mut stage = Stage::new(StageConfig::default(), 800, 600);

    stage.apply(AssetEvent::Environment(LoadEvent::Loaded(environment_map(
        "hdr/interior.hdr",
    ))));
    stage.apply(AssetEvent::Scene(LoadEvent::Loaded(GltfFixture::default().asset())));

    let environment = stage.scene.environment.clone().expect("environment is set");
    let scene_root = stage.scene.find_by_name(SCENE_NODE_NAME).expect("scene node");
    assert!(approx_zero(scene_root.transform.position));
    let body = scene_root.find_by_name("Body").expect("body");
    let material = standard(body);
    assert!(material.uses_environment(&environment));
    assert_eq!(material.env_map_intensity, ENV_MAP_INTENSITY);
    assert!(body.cast_shadow && body.receive_shadow);
}

#[test]
fn should_reflect_environment_loaded_afterwards() {
    let mut stage = Stage::new(StageConfig::default(), 800, 600);

    stage.apply(AssetEvent::Scene(LoadEvent::Loaded(GltfFixture::default().asset())));
    stage.apply(AssetEvent::Avatar(LoadEvent::Loaded(GltfFixture::default().asset())));
    stage.apply(AssetEvent::Environment(LoadEvent::Loaded(environment_map(
        "hdr/interior.hdr",
    ))));

    let environment = stage.scene.environment.clone().expect("environment is set");
    let draws = DrawList::collect(&stage.scene).draws;
    assert_eq!(draws.len(), 2);
    for draw in &draws {
        assert!(draw.material.uses_environment(&environment));
        assert_eq!(draw.material.env_map_intensity, ENV_MAP_INTENSITY);
    }
}

#[test]
fn should_keep_material_properties_when_binding_environment() {
    let mut scene = Scene::new();
    let texture = texture_handle("skin");
    scene.add(Node::mesh(
        triangle_mesh("body"),
        Material::Source(source_material(Some(texture.clone()))),
    ));
    let mut root = Node::group();
    root.add(Node::mesh(
        triangle_mesh("body"),
        Material::Source(source_material(Some(texture.clone()))),
    ));
    normalize_materials(&mut root, None, 0.25);
    scene.add(root);
    let first = Arc::new(environment_map("first.hdr"));
    let second = Arc::new(environment_map("second.hdr"));

    // Only the normalized mesh is rebound
    assert_eq!(bind_environment(&mut scene, &first), 1);
    assert_eq!(bind_environment(&mut scene, &second), 0);

    let body = scene.children()[1].children[0].as_mesh().expect("mesh");
    let material = body.material.as_standard().expect("standard material");
    assert!(material.uses_environment(&first));
    assert!(material.map().expect("texture").ptr_eq(&texture));
    assert_eq!(material.env_map_intensity, 0.25);
    assert_eq!(material.roughness, 0.75);
}

#[test]
fn should_leave_scene_untouched_on_failure() {
    let mut stage = Stage::new(StageConfig::default(), 800, 600);
    let before = stage.scene.children().len();

    stage.apply(AssetEvent::Scene(LoadEvent::Failed("404 Not Found".to_string())));
    stage.apply(AssetEvent::Environment(LoadEvent::Failed("404 Not Found".to_string())));
    stage.apply(AssetEvent::Avatar(LoadEvent::InProgress(0.5)));

    assert_eq!(stage.scene.children().len(), before);
    assert!(stage.scene.environment.is_none());
    assert!(stage.mixers().is_empty());
}

fn approx_zero(v: cgmath::Vector3<f32>) -> bool {
    v.x.abs() < 1e-6 && v.y.abs() < 1e-6 && v.z.abs() < 1e-6
}
