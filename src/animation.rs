//! Animation playback.
//!
//! An [`AnimationMixer`] is bound to the root of one loaded model and owns that
//! model's clips. At most one clip is active at a time; every update advances
//! it and writes the sampled pose onto the nodes of the bound subtree.

use cgmath::VectorSpace;

use crate::{
    data_structures::scene_graph::{Node, NodeId, Scene},
    resources::animation::{AnimationClip, Channel, Interpolation, Keyframes},
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoopMode {
    /// Play once and hold the last pose.
    Once,
    #[default]
    Repeat,
}

#[derive(Clone, Copy, Debug)]
struct Action {
    clip: usize,
    time: f32,
    loop_mode: LoopMode,
}

#[derive(Debug)]
pub struct AnimationMixer {
    root: NodeId,
    clips: Vec<AnimationClip>,
    action: Option<Action>,
    time: f32,
}

impl AnimationMixer {
    pub fn new(root: NodeId, clips: Vec<AnimationClip>) -> Self {
        Self {
            root,
            clips,
            action: None,
            time: 0.0,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    /// Starts the clip at `index` from the beginning, looping forever.
    /// Returns false if there is no such clip.
    pub fn play(&mut self, index: usize) -> bool {
        self.play_with(index, LoopMode::Repeat)
    }

    pub fn play_with(&mut self, index: usize, loop_mode: LoopMode) -> bool {
        if index >= self.clips.len() {
            log::warn!(
                "Mixer of {} has no clip {} ({} clips)",
                self.root,
                index,
                self.clips.len()
            );
            return false;
        }
        self.action = Some(Action {
            clip: index,
            time: 0.0,
            loop_mode,
        });
        true
    }

    pub fn stop(&mut self) {
        self.action = None;
    }

    pub fn active_clip(&self) -> Option<&AnimationClip> {
        self.action.and_then(|action| self.clips.get(action.clip))
    }

    pub fn active_index(&self) -> Option<usize> {
        self.action.map(|action| action.clip)
    }

    /// Total time this mixer has been advanced by, in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Local time of the active clip, in seconds.
    pub fn clip_time(&self) -> Option<f32> {
        let action = self.action?;
        let clip = self.clips.get(action.clip)?;
        Some(local_time(action, clip.duration))
    }

    /// Advances by `dt` seconds and poses the bound subtree.
    pub fn update(&mut self, dt: f32, scene: &mut Scene) {
        self.time += dt;
        let Some(action) = self.action.as_mut() else {
            return;
        };
        action.time += dt;
        let action = *action;
        let Some(clip) = self.clips.get(action.clip) else {
            return;
        };
        let Some(root) = scene.find_mut(self.root) else {
            log::trace!("Mixer root {} is not part of the scene", self.root);
            return;
        };
        apply(clip, local_time(action, clip.duration), root);
    }
}

fn local_time(action: Action, duration: f32) -> f32 {
    if duration <= 0.0 {
        return 0.0;
    }
    match action.loop_mode {
        LoopMode::Repeat => action.time.rem_euclid(duration),
        LoopMode::Once => action.time.min(duration),
    }
}

fn apply(clip: &AnimationClip, time: f32, root: &mut Node) {
    root.traverse_mut(&mut |node| {
        let Some(index) = node.source_index else {
            return;
        };
        for channel in clip.channels.iter().filter(|channel| channel.target == index) {
            match &channel.keyframes {
                Keyframes::Translation(values) => {
                    if let Some(value) = sample(channel, values, time, |a, b, t| a.lerp(b, t)) {
                        node.transform.position = value;
                    }
                }
                Keyframes::Rotation(values) => {
                    if let Some(value) = sample(channel, values, time, |a, b, t| a.slerp(b, t)) {
                        node.transform.rotation = value;
                    }
                }
                Keyframes::Scale(values) => {
                    if let Some(value) = sample(channel, values, time, |a, b, t| a.lerp(b, t)) {
                        node.transform.scale = value;
                    }
                }
                Keyframes::Other => {}
            }
        }
    });
}

/// Value of a channel at `time`, clamped to the first and last keyframe.
fn sample<T: Copy>(
    channel: &Channel,
    values: &[T],
    time: f32,
    interpolate: impl Fn(T, T, f32) -> T,
) -> Option<T> {
    let timestamps = &channel.timestamps;
    let count = timestamps.len().min(values.len());
    if count == 0 {
        return None;
    }
    let next = timestamps[..count].partition_point(|&t| t <= time);
    if next == 0 {
        return Some(values[0]);
    }
    if next >= count {
        return Some(values[count - 1]);
    }
    let (prev, next) = (next - 1, next);
    if channel.interpolation == Interpolation::Step {
        return Some(values[prev]);
    }
    let span = timestamps[next] - timestamps[prev];
    let factor = if span > 0.0 {
        (time - timestamps[prev]) / span
    } else {
        0.0
    };
    Some(interpolate(values[prev], values[next], factor))
}

/// Index of the clip named `name`, else the first clip. `None` without clips.
pub fn select_clip(clips: &[AnimationClip], name: &str) -> Option<usize> {
    if clips.is_empty() {
        return None;
    }
    match clips.iter().position(|clip| clip.name == name) {
        Some(index) => Some(index),
        None => {
            log::debug!(
                "No clip named {}, playing {} instead",
                name,
                clips[0].name
            );
            Some(0)
        }
    }
}

/// Builds the mixer for a freshly loaded model and starts its idle clip.
pub fn drive(root: NodeId, clips: Vec<AnimationClip>, target: &str) -> AnimationMixer {
    let selected = select_clip(&clips, target);
    let mut mixer = AnimationMixer::new(root, clips);
    match selected {
        Some(index) => {
            mixer.play(index);
        }
        None => log::debug!("Model {} has no animations", root),
    }
    mixer
}
