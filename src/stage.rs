//! Scene composition.
//!
//! The [`Stage`] owns everything the viewer shows: the scene graph with its
//! lights and environment, the camera and its controls, and one animation
//! mixer per animated model. Assets arrive as [`AssetEvent`]s in whatever
//! order their loads finish.

use std::sync::Arc;

use crate::{
    animation::{self, AnimationMixer},
    camera::{OrbitControls, PerspectiveCamera},
    config::StageConfig,
    data_structures::{
        light::Light,
        material::EnvironmentMap,
        scene_graph::{Node, NodeId, Scene},
    },
    normalize::{bind_environment, normalize_materials},
    resources::{GltfAsset, LoadEvent, progress_message},
};

/// Name given to the root of the environment model.
pub const SCENE_NODE_NAME: &str = "scene";

/// Progress or result of one of the viewer's asset loads.
#[derive(Debug)]
pub enum AssetEvent {
    Environment(LoadEvent<EnvironmentMap>),
    Scene(LoadEvent<GltfAsset>),
    Avatar(LoadEvent<GltfAsset>),
}

impl AssetEvent {
    pub fn label(&self) -> &'static str {
        match self {
            AssetEvent::Environment(_) => "environment",
            AssetEvent::Scene(_) => "scene",
            AssetEvent::Avatar(_) => "avatar",
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            AssetEvent::Environment(event) => event.is_terminal(),
            AssetEvent::Scene(event) => event.is_terminal(),
            AssetEvent::Avatar(event) => event.is_terminal(),
        }
    }
}

#[derive(Debug)]
pub struct Stage {
    pub scene: Scene,
    pub camera: PerspectiveCamera,
    pub controls: OrbitControls,
    mixers: Vec<AnimationMixer>,
    config: StageConfig,
}

impl Stage {
    /// Sets up the camera, the controls and the lights for a `width` x `height` viewport.
    pub fn new(config: StageConfig, width: u32, height: u32) -> Self {
        let mut scene = Scene::new();
        let lights = &config.lights;
        scene.add(
            Node::light(Light::Hemisphere(lights.hemisphere))
                .with_name("hemisphere_light")
                .with_position(lights.hemisphere_position.into()),
        );
        scene.add(
            Node::light(Light::Directional(lights.directional))
                .with_name("directional_light")
                .with_position(lights.directional_position.into()),
        );

        let camera = PerspectiveCamera::from_config(&config.camera, width, height);
        let controls = OrbitControls::from_config(&config.controls, height);

        Self {
            scene,
            camera,
            controls,
            mixers: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn mixers(&self) -> &[AnimationMixer] {
        &self.mixers
    }

    pub fn add_mixer(&mut self, mixer: AnimationMixer) {
        self.mixers.push(mixer);
    }

    /// Makes `environment` the scene's lighting and the reflection source of
    /// every material, including those normalized before it arrived.
    pub fn set_environment(&mut self, environment: EnvironmentMap) -> Arc<EnvironmentMap> {
        let environment = Arc::new(environment);
        self.scene.environment = Some(environment.clone());
        bind_environment(&mut self.scene, &environment);
        environment
    }

    fn prepare(&self, mut root: Node) -> Node {
        let count = normalize_materials(
            &mut root,
            self.scene.environment.as_ref(),
            self.config.env_map_intensity,
        );
        log::debug!("Prepared {} with {} meshes", root.id(), count);
        root.transform.position = cgmath::Vector3::new(0.0, 0.0, 0.0);
        root
    }

    /// Attaches the environment model. Its animations, if any, are not played.
    pub fn add_scene_asset(&mut self, asset: GltfAsset) -> NodeId {
        if !asset.clips.is_empty() {
            log::debug!("Ignoring {} clips of the scene model", asset.clips.len());
        }
        let mut root = self.prepare(asset.root);
        root.name = Some(SCENE_NODE_NAME.to_string());
        self.scene.add(root)
    }

    /// Attaches the avatar and starts its idle animation.
    pub fn add_avatar(&mut self, asset: GltfAsset) -> NodeId {
        let root = self.prepare(asset.root);
        let id = self.scene.add(root);
        let mixer = animation::drive(id, asset.clips, &self.config.animation_clip);
        self.mixers.push(mixer);
        id
    }

    /// Advances every mixer by `dt` seconds.
    pub fn update_mixers(&mut self, dt: f32) {
        for mixer in self.mixers.iter_mut() {
            mixer.update(dt, &mut self.scene);
        }
    }

    /// Applies a load event. Failures are logged and leave the scene as it was.
    pub fn apply(&mut self, event: AssetEvent) {
        let label = event.label();
        match event {
            AssetEvent::Environment(LoadEvent::Loaded(environment)) => {
                log::info!("Loaded environment {}", environment.label);
                self.set_environment(environment);
            }
            AssetEvent::Scene(LoadEvent::Loaded(asset)) => {
                let id = self.add_scene_asset(asset);
                log::info!("Added scene as {}", id);
            }
            AssetEvent::Avatar(LoadEvent::Loaded(asset)) => {
                let id = self.add_avatar(asset);
                log::info!("Added avatar as {}", id);
            }
            AssetEvent::Environment(LoadEvent::InProgress(fraction))
            | AssetEvent::Scene(LoadEvent::InProgress(fraction))
            | AssetEvent::Avatar(LoadEvent::InProgress(fraction)) => {
                log::info!("{}", progress_message(label, fraction));
            }
            AssetEvent::Environment(LoadEvent::Failed(reason))
            | AssetEvent::Scene(LoadEvent::Failed(reason))
            | AssetEvent::Avatar(LoadEvent::Failed(reason)) => {
                log::error!("Could not load {}: {}", label, reason);
            }
        }
    }
}
