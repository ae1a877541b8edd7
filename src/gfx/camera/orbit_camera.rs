use super::camera_utils::{matrix_to_array, Camera, CameraUniform};
use cgmath::*;

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: cgmath::Matrix4<f32> = cgmath::Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.5,
    0.0, 0.0, 0.0, 1.0,
);

/// Rotation and pan input not yet applied to the camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingMotion {
    pub yaw: f32,
    pub pitch: f32,
    pub pan: Vector3<f32>,
}

impl Default for PendingMotion {
    fn default() -> Self {
        Self {
            yaw: 0.0,
            pitch: 0.0,
            pan: Vector3::zero(),
        }
    }
}

impl PendingMotion {
    fn is_settled(&self) -> bool {
        self.yaw.abs() < 1e-6 && self.pitch.abs() < 1e-6 && self.pan.magnitude2() < 1e-12
    }
}

/// Where [`OrbitCamera::reset_to_default`] returns to
#[derive(Debug, Clone, Copy)]
struct HomePose {
    distance: f32,
    pitch: f32,
    yaw: f32,
    target: Vector3<f32>,
}

/// Perspective camera orbiting a target point, Y up.
///
/// With damping enabled, rotation and pan requests accumulate in
/// [`PendingMotion`] and are eased in by [`OrbitCamera::update_controls`],
/// which must then run once per frame.
#[derive(Debug, Clone, Copy)]
pub struct OrbitCamera {
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub eye: Vector3<f32>,
    pub target: Vector3<f32>,
    pub up: Vector3<f32>,
    pub bounds: OrbitCameraBounds,
    pub aspect: f32,
    pub fovy: Rad<f32>,
    pub znear: f32,
    pub zfar: f32,
    /// Fraction of pending motion applied per update; `None` applies input immediately
    pub damping: Option<f32>,
    pub pending: PendingMotion,
    pub uniform: CameraUniform,
    home: HomePose,
}

impl Camera for OrbitCamera {
    fn build_view_projection_matrix(&self) -> Matrix4<f32> {
        let view = Matrix4::look_at_rh(Point3::from_vec(self.eye), Point3::from_vec(self.target), self.up);
        let proj = OPENGL_TO_WGPU_MATRIX * perspective(self.fovy, self.aspect, self.znear, self.zfar);
        proj * view
    }
}

impl OrbitCamera {
    pub fn new(distance: f32, pitch: f32, yaw: f32, target: Vector3<f32>, aspect: f32) -> Self {
        let mut camera = Self {
            distance,
            pitch,
            yaw,
            eye: Vector3::zero(),
            target,
            up: Vector3::unit_y(),
            bounds: OrbitCameraBounds::default(),
            aspect,
            fovy: Deg(60.0f32).into(),
            znear: 0.1,
            zfar: 1000.0,
            damping: None,
            pending: PendingMotion::default(),
            uniform: CameraUniform::default(),
            home: HomePose {
                distance,
                pitch,
                yaw,
                target,
            },
        };
        camera.update();
        camera
    }

    pub fn with_damping(mut self, factor: f32) -> Self {
        self.damping = Some(factor.clamp(0.0, 1.0));
        self
    }

    /// Returns to the pose the camera was created with
    pub fn reset_to_default(&mut self) {
        self.distance = self.home.distance;
        self.pitch = self.home.pitch;
        self.yaw = self.home.yaw;
        self.target = self.home.target;
        self.pending = PendingMotion::default();
        self.update();
    }

    pub fn set_distance(&mut self, distance: f32) {
        self.distance = distance.clamp(
            self.bounds.min_distance.unwrap_or(f32::EPSILON),
            self.bounds.max_distance.unwrap_or(f32::MAX),
        );
        self.update();
    }

    /// Zooms proportionally to the current distance
    pub fn add_distance(&mut self, delta: f32) {
        self.set_distance(self.distance * (1.0 + delta * 0.1));
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.pitch = pitch.clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.update();
    }

    pub fn add_pitch(&mut self, delta: f32) {
        match self.damping {
            Some(_) => self.pending.pitch += delta,
            None => self.set_pitch(self.pitch + delta),
        }
    }

    pub fn set_yaw(&mut self, yaw: f32) {
        let mut bounded_yaw = yaw;
        if let Some(min_yaw) = self.bounds.min_yaw {
            bounded_yaw = bounded_yaw.max(min_yaw);
        }
        if let Some(max_yaw) = self.bounds.max_yaw {
            bounded_yaw = bounded_yaw.min(max_yaw);
        }
        self.yaw = bounded_yaw;
        self.update();
    }

    pub fn add_yaw(&mut self, delta: f32) {
        match self.damping {
            Some(_) => self.pending.yaw += delta,
            None => self.set_yaw(self.yaw + delta),
        }
    }

    /// Pans relative to the view: `delta.0` right, `delta.1` up, scaled by distance
    pub fn pan(&mut self, delta: (f32, f32)) {
        let forward = (self.target - self.eye).normalize();
        let right = forward.cross(self.up).normalize();
        let up = right.cross(forward).normalize();
        let scale = self.distance * 0.1;
        let movement = right * delta.0 * scale + up * delta.1 * scale;

        match self.damping {
            Some(_) => self.pending.pan += movement,
            None => {
                self.target += movement;
                self.update();
            }
        }
    }

    /// Eases pending motion in; a no-op without damping
    pub fn update_controls(&mut self) {
        let Some(factor) = self.damping else {
            return;
        };
        if self.pending.is_settled() {
            self.pending = PendingMotion::default();
            return;
        }

        self.yaw += self.pending.yaw * factor;
        self.pitch = (self.pitch + self.pending.pitch * factor).clamp(self.bounds.min_pitch, self.bounds.max_pitch);
        self.target += self.pending.pan * factor;

        let decay = 1.0 - factor;
        self.pending.yaw *= decay;
        self.pending.pitch *= decay;
        self.pending.pan *= decay;

        self.set_yaw(self.yaw);
    }

    fn update(&mut self) {
        self.eye = calculate_cartesian_eye_position(self.pitch, self.yaw, self.distance, self.target);
    }

    pub fn resize_projection(&mut self, width: u32, height: u32) {
        if height > 0 {
            self.aspect = width as f32 / height as f32;
        }
    }

    pub fn update_view_proj(&mut self) {
        self.uniform.view_position = [self.eye.x, self.eye.y, self.eye.z, 1.0];
        self.uniform.view_proj = matrix_to_array(self.build_view_projection_matrix());
    }
}

#[derive(Debug, Clone, Copy)]
pub struct OrbitCameraBounds {
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub min_yaw: Option<f32>,
    pub max_yaw: Option<f32>,
}

impl Default for OrbitCameraBounds {
    fn default() -> Self {
        Self {
            min_distance: Some(0.5),
            max_distance: Some(60.0),
            min_pitch: -std::f32::consts::FRAC_PI_2 + 0.01,
            max_pitch: std::f32::consts::FRAC_PI_2 - 0.01,
            min_yaw: None,
            max_yaw: None,
        }
    }
}

/// Spherical to cartesian; yaw 0 and pitch 0 put the eye on +Z of the target
fn calculate_cartesian_eye_position(pitch: f32, yaw: f32, distance: f32, target: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(
        distance * yaw.sin() * pitch.cos(),
        distance * pitch.sin(),
        distance * yaw.cos() * pitch.cos(),
    ) + target
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_eye_on_positive_z() {
        let camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::zero(), 1.5);
        assert!((camera.eye - Vector3::new(0.0, 0.0, 10.0)).magnitude() < 1e-5);
        assert!((Rad::from(Deg(60.0f32)).0 - camera.fovy.0).abs() < 1e-6);
    }

    #[test]
    fn test_damping_eases_towards_target() {
        let mut camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::zero(), 1.0).with_damping(0.05);
        camera.add_yaw(1.0);
        assert_eq!(camera.yaw, 0.0);

        camera.update_controls();
        assert!((camera.yaw - 0.05).abs() < 1e-6);
        assert!((camera.pending.yaw - 0.95).abs() < 1e-6);

        for _ in 0..500 {
            camera.update_controls();
        }
        assert!((camera.yaw - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_undamped_applies_immediately() {
        let mut camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::zero(), 1.0);
        camera.add_yaw(0.5);
        assert_eq!(camera.yaw, 0.5);
    }

    #[test]
    fn test_pitch_is_clamped() {
        let mut camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::zero(), 1.0);
        camera.set_pitch(10.0);
        assert!(camera.pitch < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn test_reset_restores_home_pose() {
        let mut camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::zero(), 1.0).with_damping(0.05);
        camera.add_yaw(2.0);
        camera.update_controls();
        camera.set_distance(3.0);
        camera.reset_to_default();
        assert_eq!(camera.distance, 10.0);
        assert_eq!(camera.yaw, 0.0);
        assert_eq!(camera.pending, PendingMotion::default());
    }

    #[test]
    fn test_resize_ignores_zero_height() {
        let mut camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::zero(), 1.0);
        camera.resize_projection(800, 0);
        assert_eq!(camera.aspect, 1.0);
        camera.resize_projection(1200, 800);
        assert_eq!(camera.aspect, 1.5);
    }
}
