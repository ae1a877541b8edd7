//! Scene lights and fog
//!
//! Light parameters follow the usual real-time conventions: `distance` is a
//! hard range cutoff (0 = infinite), `decay` the falloff exponent, spot `angle`
//! the half-angle of the cone and `penumbra` the softened fraction of it.

use cgmath::{ortho, perspective, EuclideanSpace, InnerSpace, Matrix4, Point3, Rad, Vector3};

use crate::gfx::camera::orbit_camera::OPENGL_TO_WGPU_MATRIX;

pub const MAX_DIRECTIONAL_LIGHTS: usize = 2;
pub const MAX_SPOT_LIGHTS: usize = 4;
pub const MAX_POINT_LIGHTS: usize = 4;
pub const MAX_SHADOW_LAYERS: usize = MAX_DIRECTIONAL_LIGHTS + MAX_SPOT_LIGHTS;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmbientLight {
    /// Linear rgb
    pub color: [f32; 3],
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
    pub cast_shadow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
    pub distance: f32,
    /// Cone half-angle in radians
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
    pub cast_shadow: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub color: [f32; 3],
    pub intensity: f32,
    pub position: Vector3<f32>,
    pub distance: f32,
    pub decay: f32,
}

/// Exponential squared fog: `1 - exp(-(density * depth)^2)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fog {
    pub color: [f32; 3],
    pub density: f32,
}

impl Fog {
    pub fn factor(&self, depth: f32) -> f32 {
        1.0 - (-(self.density * self.density) * depth * depth).exp()
    }
}

/// Orthographic half extent and depth range of directional shadow cameras
const DIRECTIONAL_SHADOW_EXTENT: f32 = 5.0;
const SHADOW_NEAR: f32 = 0.5;
const SHADOW_FAR: f32 = 500.0;

fn light_view(position: Vector3<f32>, target: Vector3<f32>) -> Matrix4<f32> {
    let direction = target - position;
    // looking straight up or down needs another up vector
    let up = if direction.normalize().y.abs() > 0.999 {
        Vector3::unit_z()
    } else {
        Vector3::unit_y()
    };
    Matrix4::look_at_rh(Point3::from_vec(position), Point3::from_vec(target), up)
}

impl DirectionalLight {
    pub fn shadow_view_proj(&self) -> Matrix4<f32> {
        let e = DIRECTIONAL_SHADOW_EXTENT;
        OPENGL_TO_WGPU_MATRIX * ortho(-e, e, -e, e, SHADOW_NEAR, SHADOW_FAR) * light_view(self.position, self.target)
    }
}

impl SpotLight {
    pub fn shadow_view_proj(&self) -> Matrix4<f32> {
        let far = if self.distance > 0.0 { self.distance } else { SHADOW_FAR };
        OPENGL_TO_WGPU_MATRIX
            * perspective(Rad(2.0 * self.angle), 1.0, SHADOW_NEAR, far)
            * light_view(self.position, self.target)
    }

    /// Cosines of the outer cone and of the fully lit inner cone
    pub fn cone_cosines(&self) -> (f32, f32) {
        (self.angle.cos(), (self.angle * (1.0 - self.penumbra)).cos())
    }
}

/// Every light in the scene plus fog
#[derive(Debug, Clone, PartialEq)]
pub struct LightRig {
    pub ambient: AmbientLight,
    pub directional: Vec<DirectionalLight>,
    pub spots: Vec<SpotLight>,
    pub points: Vec<PointLight>,
    pub fog: Option<Fog>,
}

impl Default for LightRig {
    fn default() -> Self {
        Self {
            ambient: AmbientLight {
                color: [1.0; 3],
                intensity: 0.1,
            },
            directional: Vec::new(),
            spots: Vec::new(),
            points: Vec::new(),
            fog: None,
        }
    }
}

impl LightRig {
    /// View-projection matrices of the shadow casters, in shadow layer order:
    /// directional lights first, then spots
    pub fn shadow_casters(&self) -> Vec<Matrix4<f32>> {
        let directional = self
            .directional
            .iter()
            .take(MAX_DIRECTIONAL_LIGHTS)
            .filter(|l| l.cast_shadow)
            .map(DirectionalLight::shadow_view_proj);
        let spots = self
            .spots
            .iter()
            .take(MAX_SPOT_LIGHTS)
            .filter(|l| l.cast_shadow)
            .map(SpotLight::shadow_view_proj);
        directional.chain(spots).collect()
    }

    /// Logs lights dropped because of the fixed uniform capacity
    pub fn warn_overflow(&self) {
        if self.directional.len() > MAX_DIRECTIONAL_LIGHTS {
            log::warn!("only {} directional lights are rendered", MAX_DIRECTIONAL_LIGHTS);
        }
        if self.spots.len() > MAX_SPOT_LIGHTS {
            log::warn!("only {} spot lights are rendered", MAX_SPOT_LIGHTS);
        }
        if self.points.len() > MAX_POINT_LIGHTS {
            log::warn!("only {} point lights are rendered", MAX_POINT_LIGHTS);
        }
    }
}
