//! Animation clips as read from glTF files.

#[derive(Clone, Debug)]
pub enum Keyframes {
    Translation(Vec<cgmath::Vector3<f32>>),
    Rotation(Vec<cgmath::Quaternion<f32>>),
    Scale(Vec<cgmath::Vector3<f32>>),
    Other,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    /// Only the spline values are kept; the tangents are dropped and the keys
    /// are interpolated linearly.
    CubicSpline,
}

/// Keyframes for one property of one node.
#[derive(Clone, Debug)]
pub struct Channel {
    /// Index of the glTF node this channel animates.
    pub target: usize,
    pub interpolation: Interpolation,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
}

/// An animation clip: a named set of channels and its duration in seconds.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|channel| channel.timestamps.last().copied())
            .fold(0.0f32, f32::max);
        Self {
            name: name.into(),
            duration,
            channels,
        }
    }
}

pub fn read_animations(document: &gltf::Document, buffer_data: &[Vec<u8>]) -> Vec<AnimationClip> {
    document
        .animations()
        .map(|animation| {
            let channels = animation
                .channels()
                .filter_map(|channel| read_channel(&channel, buffer_data))
                .collect();
            let name = animation
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("animation_{}", animation.index()));
            AnimationClip::new(name, channels)
        })
        .collect()
}

fn read_channel(channel: &gltf::animation::Channel, buffer_data: &[Vec<u8>]) -> Option<Channel> {
    let reader = channel.reader(|buffer| buffer_data.get(buffer.index()).map(Vec::as_slice));
    let timestamps: Vec<f32> = match reader.read_inputs() {
        Some(inputs) => inputs.collect(),
        None => {
            log::warn!("No timestamps found in channel {}", channel.index());
            return None;
        }
    };
    let interpolation = match channel.sampler().interpolation() {
        gltf::animation::Interpolation::Linear => Interpolation::Linear,
        gltf::animation::Interpolation::Step => Interpolation::Step,
        gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
    };
    let keyframes = match reader.read_outputs() {
        Some(gltf::animation::util::ReadOutputs::Translations(translations)) => {
            Keyframes::Translation(spline_values(translations.map(Into::into).collect(), interpolation))
        }
        Some(gltf::animation::util::ReadOutputs::Rotations(rotations)) => {
            // glTF stores quaternions as [x, y, z, w]
            let quaternions = rotations
                .into_f32()
                .map(|[x, y, z, w]| cgmath::Quaternion::new(w, x, y, z))
                .collect();
            Keyframes::Rotation(spline_values(quaternions, interpolation))
        }
        Some(gltf::animation::util::ReadOutputs::Scales(scales)) => {
            Keyframes::Scale(spline_values(scales.map(Into::into).collect(), interpolation))
        }
        // TODO: implement morph target weights
        Some(gltf::animation::util::ReadOutputs::MorphTargetWeights(_)) => Keyframes::Other,
        None => {
            log::warn!("No keyframes found in channel {}", channel.index());
            Keyframes::Other
        }
    };
    Some(Channel {
        target: channel.target().node().index(),
        interpolation,
        timestamps,
        keyframes,
    })
}

/// Cubic spline outputs come as (in-tangent, value, out-tangent) triplets.
fn spline_values<T: Copy>(values: Vec<T>, interpolation: Interpolation) -> Vec<T> {
    match interpolation {
        Interpolation::CubicSpline => values.chunks_exact(3).map(|triplet| triplet[1]).collect(),
        _ => values,
    }
}
