//! Keyframe animation of model nodes.
//!
//! Clips hold per-node translation, rotation and scale channels. The mixer
//! plays every clip looped and writes the blended samples into node transforms.

use cgmath::{InnerSpace, Matrix4, Quaternion, Vector3, VectorSpace};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Linear,
    Step,
    /// Hermite spline; values are stored as (in tangent, value, out tangent) triples
    CubicSpline,
}

/// Local transform of one node
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub translation: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            translation: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }
}

impl NodeTransform {
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.translation)
            * Matrix4::from(self.rotation)
            * Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValues {
    Translation(Vec<Vector3<f32>>),
    Rotation(Vec<Quaternion<f32>>),
    Scale(Vec<Vector3<f32>>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    pub node: usize,
    pub interpolation: Interpolation,
    pub times: Vec<f32>,
    pub values: ChannelValues,
}

/// Minimal arithmetic shared by vectors and quaternions
trait Keyframe: Copy {
    fn add(self, other: Self) -> Self;
    fn scale(self, s: f32) -> Self;
    fn blend(self, other: Self, t: f32) -> Self;
    fn finish(self) -> Self {
        self
    }
}

impl Keyframe for Vector3<f32> {
    fn add(self, other: Self) -> Self {
        self + other
    }

    fn scale(self, s: f32) -> Self {
        self * s
    }

    fn blend(self, other: Self, t: f32) -> Self {
        self.lerp(other, t)
    }
}

impl Keyframe for Quaternion<f32> {
    fn add(self, other: Self) -> Self {
        self + other
    }

    fn scale(self, s: f32) -> Self {
        self * s
    }

    fn blend(self, other: Self, t: f32) -> Self {
        // shortest arc
        let other = if self.dot(other) < 0.0 { -other } else { other };
        self.nlerp(other, t)
    }

    fn finish(self) -> Self {
        self.normalize()
    }
}

fn sample_track<T: Keyframe>(times: &[f32], values: &[T], interpolation: Interpolation, time: f32) -> Option<T> {
    let stride = if interpolation == Interpolation::CubicSpline { 3 } else { 1 };
    let count = times.len().min(values.len() / stride);
    if count == 0 {
        return None;
    }
    let value = |k: usize| values[k * stride + stride / 2];

    if time <= times[0] {
        return Some(value(0));
    }
    if time >= times[count - 1] {
        return Some(value(count - 1));
    }

    let next = times[..count].partition_point(|&t| t <= time);
    let prev = next - 1;
    let span = times[next] - times[prev];
    let t = if span > 0.0 { (time - times[prev]) / span } else { 0.0 };

    let sampled = match interpolation {
        Interpolation::Step => value(prev),
        Interpolation::Linear => value(prev).blend(value(next), t),
        Interpolation::CubicSpline => {
            let out_tangent = values[prev * 3 + 2];
            let in_tangent = values[next * 3];
            let (t2, t3) = (t * t, t * t * t);
            value(prev)
                .scale(2.0 * t3 - 3.0 * t2 + 1.0)
                .add(out_tangent.scale((t3 - 2.0 * t2 + t) * span))
                .add(value(next).scale(-2.0 * t3 + 3.0 * t2))
                .add(in_tangent.scale((t3 - t2) * span))
        }
    };
    Some(sampled.finish())
}

/// One sampled channel value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Sample {
    Translation(Vector3<f32>),
    Rotation(Quaternion<f32>),
    Scale(Vector3<f32>),
}

impl Channel {
    pub fn sample(&self, time: f32) -> Option<Sample> {
        match &self.values {
            ChannelValues::Translation(values) => {
                sample_track(&self.times, values, self.interpolation, time).map(Sample::Translation)
            }
            ChannelValues::Rotation(values) => {
                sample_track(&self.times, values, self.interpolation, time).map(Sample::Rotation)
            }
            ChannelValues::Scale(values) => sample_track(&self.times, values, self.interpolation, time).map(Sample::Scale),
        }
    }

    /// Writes the channel's value at `time` into `target`
    pub fn apply(&self, time: f32, target: &mut NodeTransform) {
        match self.sample(time) {
            Some(Sample::Translation(v)) => target.translation = v,
            Some(Sample::Rotation(q)) => target.rotation = q,
            Some(Sample::Scale(v)) => target.scale = v,
            None => {}
        }
    }
}

/// Running weighted mean of one property
#[derive(Debug, Clone, Copy)]
struct Accumulator<T> {
    value: Option<T>,
    weight: f32,
}

impl<T: Keyframe> Accumulator<T> {
    fn new() -> Self {
        Self { value: None, weight: 0.0 }
    }

    fn accumulate(&mut self, value: T, weight: f32) {
        if weight <= 0.0 {
            return;
        }
        self.weight += weight;
        self.value = Some(match self.value {
            Some(mean) => mean.blend(value, weight / self.weight).finish(),
            None => value,
        });
    }
}

/// Per-node blend of every action touching it
#[derive(Debug, Clone, Copy)]
struct NodeBlend {
    translation: Accumulator<Vector3<f32>>,
    rotation: Accumulator<Quaternion<f32>>,
    scale: Accumulator<Vector3<f32>>,
}

impl NodeBlend {
    fn new() -> Self {
        Self {
            translation: Accumulator::new(),
            rotation: Accumulator::new(),
            scale: Accumulator::new(),
        }
    }

    fn add(&mut self, sample: Sample, weight: f32) {
        match sample {
            Sample::Translation(v) => self.translation.accumulate(v, weight),
            Sample::Rotation(q) => self.rotation.accumulate(q, weight),
            Sample::Scale(v) => self.scale.accumulate(v, weight),
        }
    }

    /// Properties no action animated keep their current value
    fn write(&self, target: &mut NodeTransform) {
        if let Some(v) = self.translation.value {
            target.translation = v;
        }
        if let Some(q) = self.rotation.value {
            target.rotation = q;
        }
        if let Some(v) = self.scale.value {
            target.scale = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub channels: Vec<Channel>,
    pub duration: f32,
}

impl AnimationClip {
    pub fn new(name: &str, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0.0f32, f32::max);
        Self {
            name: name.to_string(),
            channels,
            duration,
        }
    }
}

/// Playback state of one clip
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationAction {
    pub clip: usize,
    pub time: f32,
    pub weight: f32,
}

/// Plays every clip looped. Actions animating the same node property are
/// blended by weight, rotations along the shortest arc.
#[derive(Debug, Clone, Default)]
pub struct AnimationMixer {
    clips: Vec<AnimationClip>,
    actions: Vec<AnimationAction>,
}

impl AnimationMixer {
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        let actions = (0..clips.len())
            .map(|clip| AnimationAction {
                clip,
                time: 0.0,
                weight: 1.0,
            })
            .collect();
        Self { clips, actions }
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    pub fn actions(&self) -> &[AnimationAction] {
        &self.actions
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Advances every action by `dt` seconds, wrapping into `[0, duration)`,
    /// and writes the blended samples into `nodes`
    pub fn update(&mut self, dt: f32, nodes: &mut [NodeTransform]) {
        let mut blends = vec![NodeBlend::new(); nodes.len()];
        for action in &mut self.actions {
            let clip = &self.clips[action.clip];
            action.time = if clip.duration > 0.0 {
                (action.time + dt).rem_euclid(clip.duration)
            } else {
                0.0
            };
            for channel in &clip.channels {
                let Some(blend) = blends.get_mut(channel.node) else {
                    continue;
                };
                if let Some(sample) = channel.sample(action.time) {
                    blend.add(sample, action.weight);
                }
            }
        }
        for (node, blend) in nodes.iter_mut().zip(&blends) {
            blend.write(node);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Rad, Rotation3};

    fn slide(interpolation: Interpolation) -> Channel {
        Channel {
            node: 0,
            interpolation,
            times: vec![0.0, 1.0, 2.0],
            values: ChannelValues::Translation(vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(2.0, 0.0, 0.0),
                Vector3::new(2.0, 4.0, 0.0),
            ]),
        }
    }

    #[test]
    fn test_linear_and_step() {
        let mut node = NodeTransform::default();
        slide(Interpolation::Linear).apply(0.5, &mut node);
        assert!((node.translation.x - 1.0).abs() < 1e-6);

        slide(Interpolation::Step).apply(1.5, &mut node);
        assert_eq!(node.translation, Vector3::new(2.0, 0.0, 0.0));

        // clamped outside the keyframe range
        slide(Interpolation::Linear).apply(5.0, &mut node);
        assert_eq!(node.translation, Vector3::new(2.0, 4.0, 0.0));
    }

    #[test]
    fn test_cubic_spline_hits_keyframes_and_uses_tangents() {
        let zero = Vector3::new(0.0, 0.0, 0.0);
        let channel = Channel {
            node: 0,
            interpolation: Interpolation::CubicSpline,
            times: vec![0.0, 1.0],
            values: ChannelValues::Translation(vec![
                zero,
                Vector3::new(0.0, 0.0, 0.0),
                zero,
                zero,
                Vector3::new(1.0, 0.0, 0.0),
                zero,
            ]),
        };
        let mut node = NodeTransform::default();
        channel.apply(1.0, &mut node);
        assert_eq!(node.translation.x, 1.0);
        // zero tangents give smoothstep easing
        channel.apply(0.25, &mut node);
        assert!((node.translation.x - 0.15625).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_stays_normalized() {
        let channel = Channel {
            node: 0,
            interpolation: Interpolation::Linear,
            times: vec![0.0, 1.0],
            values: ChannelValues::Rotation(vec![
                Quaternion::from_angle_y(Rad(0.0)),
                Quaternion::from_angle_y(Rad(std::f32::consts::FRAC_PI_2)),
            ]),
        };
        let mut node = NodeTransform::default();
        channel.apply(0.5, &mut node);
        assert!((node.rotation.magnitude() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_mixer_wraps_time_modulo_duration() {
        let clip = AnimationClip::new("slide", vec![slide(Interpolation::Linear)]);
        assert_eq!(clip.duration, 2.0);
        let mut mixer = AnimationMixer::new(vec![clip]);
        let mut nodes = vec![NodeTransform::default()];

        mixer.update(2.5, &mut nodes);
        assert!((mixer.actions()[0].time - 0.5).abs() < 1e-6);
        assert!((nodes[0].translation.x - 1.0).abs() < 1e-6);

        mixer.update(1.75, &mut nodes);
        assert!((mixer.actions()[0].time - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_channels_for_missing_nodes_are_ignored() {
        let mut channel = slide(Interpolation::Linear);
        channel.node = 7;
        let mut mixer = AnimationMixer::new(vec![AnimationClip::new("stray", vec![channel])]);
        let mut nodes = vec![NodeTransform::default()];
        mixer.update(0.5, &mut nodes);
        assert_eq!(nodes[0], NodeTransform::default());
    }

    fn hold(x: f32) -> AnimationClip {
        let channel = Channel {
            node: 0,
            interpolation: Interpolation::Step,
            times: vec![0.0, 1.0],
            values: ChannelValues::Translation(vec![Vector3::new(x, 0.0, 0.0); 2]),
        };
        AnimationClip::new("hold", vec![channel])
    }

    #[test]
    fn test_overlapping_clips_are_averaged() {
        let mut mixer = AnimationMixer::new(vec![hold(0.0), hold(4.0)]);
        let mut nodes = vec![NodeTransform::default()];
        mixer.update(0.5, &mut nodes);
        assert!((nodes[0].translation.x - 2.0).abs() < 1e-6);
        // untouched properties keep their values
        assert_eq!(nodes[0].scale, Vector3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_three_clips_weigh_equally() {
        let mut mixer = AnimationMixer::new(vec![hold(0.0), hold(3.0), hold(6.0)]);
        let mut nodes = vec![NodeTransform::default()];
        mixer.update(0.5, &mut nodes);
        assert!((nodes[0].translation.x - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_overlapping_rotations_meet_halfway() {
        let turn = |rotation: Quaternion<f32>| {
            let channel = Channel {
                node: 0,
                interpolation: Interpolation::Step,
                times: vec![0.0, 1.0],
                values: ChannelValues::Rotation(vec![rotation; 2]),
            };
            AnimationClip::new("turn", vec![channel])
        };
        // same orientation as a quarter turn, stored on the far hemisphere
        let quarter = -Quaternion::from_angle_y(Rad(std::f32::consts::FRAC_PI_2));
        let mut mixer = AnimationMixer::new(vec![turn(Quaternion::from_angle_y(Rad(0.0))), turn(quarter)]);
        let mut nodes = vec![NodeTransform::default()];
        mixer.update(0.5, &mut nodes);

        let expected = Quaternion::from_angle_y(Rad(std::f32::consts::FRAC_PI_4));
        let rotation = nodes[0].rotation;
        assert!((rotation.magnitude() - 1.0).abs() < 1e-5);
        assert!(rotation.dot(expected).abs() > 1.0 - 1e-5);
    }
}
