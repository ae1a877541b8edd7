//! Global uniform bindings for camera, lights, fog and shadows
//!
//! Bound to slot 0 of every main pass pipeline. The layout of
//! [`GlobalUBOContent`] must match `Globals` in `pbr.wgsl`.

use cgmath::InnerSpace;

use crate::{
    gfx::{
        camera::camera_utils::CameraUniform,
        scene::lights::{LightRig, MAX_DIRECTIONAL_LIGHTS, MAX_POINT_LIGHTS, MAX_SHADOW_LAYERS, MAX_SPOT_LIGHTS},
    },
    wgpu_utils::{
        binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
        binding_types,
        uniform_buffer::UniformBuffer,
    },
};

/// Marks a light without a shadow layer
const NO_SHADOW: f32 = -1.0;

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DirectionalLightRaw {
    /// Unit vector from the surface towards the light
    pub direction: [f32; 4],
    /// rgb * intensity, w = shadow layer or -1
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SpotLightRaw {
    /// xyz, w = range cutoff
    pub position: [f32; 4],
    /// Unit vector from the light towards its target, w = decay
    pub direction: [f32; 4],
    /// rgb * intensity, w = shadow layer or -1
    pub color: [f32; 4],
    /// outer cone cos, inner cone cos
    pub cone: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PointLightRaw {
    /// xyz, w = range cutoff
    pub position: [f32; 4],
    /// rgb * intensity, w = decay
    pub color: [f32; 4],
}

#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GlobalUBOContent {
    pub view_position: [f32; 4],
    pub view_proj: [[f32; 4]; 4],
    /// rgb * intensity
    pub ambient: [f32; 4],
    /// rgb, w = exp2 density (0 disables fog)
    pub fog: [f32; 4],
    /// directional, spot, point and shadow layer counts
    pub counts: [u32; 4],
    pub directional: [DirectionalLightRaw; MAX_DIRECTIONAL_LIGHTS],
    pub spots: [SpotLightRaw; MAX_SPOT_LIGHTS],
    pub points: [PointLightRaw; MAX_POINT_LIGHTS],
    pub shadow_view_proj: [[[f32; 4]; 4]; MAX_SHADOW_LAYERS],
}

fn scaled(color: [f32; 3], intensity: f32, w: f32) -> [f32; 4] {
    [color[0] * intensity, color[1] * intensity, color[2] * intensity, w]
}

impl GlobalUBOContent {
    /// Packs the camera and light rig; shadow layers follow [`LightRig::shadow_casters`]
    pub fn new(camera: &CameraUniform, rig: &LightRig) -> Self {
        let mut content = Self {
            view_position: camera.view_position,
            view_proj: camera.view_proj,
            ambient: scaled(rig.ambient.color, rig.ambient.intensity, 0.0),
            fog: rig
                .fog
                .map(|fog| [fog.color[0], fog.color[1], fog.color[2], fog.density])
                .unwrap_or([0.0; 4]),
            counts: [0; 4],
            directional: [DirectionalLightRaw::default(); MAX_DIRECTIONAL_LIGHTS],
            spots: [SpotLightRaw::default(); MAX_SPOT_LIGHTS],
            points: [PointLightRaw::default(); MAX_POINT_LIGHTS],
            shadow_view_proj: [[[0.0; 4]; 4]; MAX_SHADOW_LAYERS],
        };

        let mut next_layer = 0usize;
        let mut take_layer = |casts: bool| {
            if casts && next_layer < MAX_SHADOW_LAYERS {
                next_layer += 1;
                (next_layer - 1) as f32
            } else {
                NO_SHADOW
            }
        };

        for (slot, light) in rig.directional.iter().take(MAX_DIRECTIONAL_LIGHTS).enumerate() {
            let to_light = (light.position - light.target).normalize();
            content.directional[slot] = DirectionalLightRaw {
                direction: [to_light.x, to_light.y, to_light.z, 0.0],
                color: scaled(light.color, light.intensity, take_layer(light.cast_shadow)),
            };
        }
        for (slot, light) in rig.spots.iter().take(MAX_SPOT_LIGHTS).enumerate() {
            let dir = (light.target - light.position).normalize();
            let (outer, inner) = light.cone_cosines();
            let p = light.position;
            content.spots[slot] = SpotLightRaw {
                position: [p.x, p.y, p.z, light.distance],
                direction: [dir.x, dir.y, dir.z, light.decay],
                color: scaled(light.color, light.intensity, take_layer(light.cast_shadow)),
                cone: [outer, inner, 0.0, 0.0],
            };
        }
        for (slot, light) in rig.points.iter().take(MAX_POINT_LIGHTS).enumerate() {
            let p = light.position;
            content.points[slot] = PointLightRaw {
                position: [p.x, p.y, p.z, light.distance],
                color: scaled(light.color, light.intensity, light.decay),
            };
        }

        let casters = rig.shadow_casters();
        for (layer, matrix) in casters.iter().take(MAX_SHADOW_LAYERS).enumerate() {
            content.shadow_view_proj[layer] = (*matrix).into();
        }

        content.counts = [
            rig.directional.len().min(MAX_DIRECTIONAL_LIGHTS) as u32,
            rig.spots.len().min(MAX_SPOT_LIGHTS) as u32,
            rig.points.len().min(MAX_POINT_LIGHTS) as u32,
            casters.len().min(MAX_SHADOW_LAYERS) as u32,
        ];
        content
    }
}

pub type GlobalUBO = UniformBuffer<GlobalUBOContent>;

/// Uploads camera and lights for the coming frame
pub fn update_global_ubo(ubo: &mut GlobalUBO, queue: &wgpu::Queue, camera: &CameraUniform, rig: &LightRig) {
    ubo.update_content(queue, GlobalUBOContent::new(camera, rig));
}

/// Bind group layout and bind group for the global uniforms
pub struct GlobalBindings {
    bind_group_layout: BindGroupLayoutWithDesc,
    bind_group: wgpu::BindGroup,
}

impl GlobalBindings {
    pub fn new(device: &wgpu::Device, ubo: &GlobalUBO) -> Self {
        let bind_group_layout = BindGroupLayoutBuilder::new()
            .next_binding_rendering(binding_types::uniform())
            .create(device, "Globals Bind Group Layout");
        let bind_group = BindGroupBuilder::new(&bind_group_layout)
            .resource(ubo.binding_resource())
            .create(device, "Global Bind Group");

        GlobalBindings {
            bind_group_layout,
            bind_group,
        }
    }

    pub fn bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.bind_group_layout.layout
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::scene::lights::{DirectionalLight, PointLight, SpotLight};
    use cgmath::{Vector3, Zero};

    fn rig() -> LightRig {
        let spot = |cast_shadow| SpotLight {
            color: [1.0; 3],
            intensity: 10.0,
            position: Vector3::new(0.0, 10.0, 0.0),
            target: Vector3::zero(),
            distance: 100.0,
            angle: 0.5,
            penumbra: 0.3,
            decay: 1.0,
            cast_shadow,
        };
        LightRig {
            directional: vec![DirectionalLight {
                color: [1.0, 0.5, 0.25],
                intensity: 2.0,
                position: Vector3::new(0.0, 5.0, 0.0),
                target: Vector3::zero(),
                cast_shadow: true,
            }],
            spots: vec![spot(false), spot(true)],
            points: vec![PointLight {
                color: [0.0, 0.0, 1.0],
                intensity: 1.2,
                position: Vector3::new(0.0, 0.0, -10.0),
                distance: 40.0,
                decay: 2.0,
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_layout_is_vec4_aligned() {
        assert_eq!(std::mem::size_of::<GlobalUBOContent>() % 16, 0);
        assert_eq!(std::mem::size_of::<SpotLightRaw>(), 64);
    }

    #[test]
    fn test_packing() {
        let content = GlobalUBOContent::new(&CameraUniform::default(), &rig());
        assert_eq!(content.counts, [1, 2, 1, 2]);
        assert_eq!(content.directional[0].color, [2.0, 1.0, 0.5, 0.0]);
        assert_eq!(content.directional[0].direction[1], 1.0);
        // non casting spot gets no layer, the casting one gets the next free layer
        assert_eq!(content.spots[0].color[3], NO_SHADOW);
        assert_eq!(content.spots[1].color[3], 1.0);
        assert_eq!(content.spots[1].direction[1], -1.0);
        assert_eq!(content.points[0].color[3], 2.0);
        assert_eq!(content.fog, [0.0; 4]);
    }
}
