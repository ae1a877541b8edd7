//! Floating crystals scattered through the room.

use cgmath::{Euler, Rad, Vector3};
use rand::Rng;

use crate::{
    config::RoomConfig,
    gfx::{
        geometry::generate_octahedron,
        resources::{color_from_hex, Material},
        scene::{Object, ObjectId, Scene, Transform},
    },
};

const FLOAT_AMPLITUDE: f32 = 0.3;

#[derive(Debug, Clone, PartialEq)]
pub struct Crystal {
    pub id: ObjectId,
    pub color: u32,
    pub radius: f32,
    pub position: Vector3<f32>,
    /// Rotation about x and y in radians
    pub rotation: (f32, f32),
    pub float_speed: f32,
    pub base_y: f32,
    pub rot_speed: f32,
}

impl Crystal {
    fn transform(&self) -> Transform {
        Transform {
            translation: self.position,
            rotation: Euler::new(Rad(self.rotation.0), Rad(self.rotation.1), Rad(0.0)),
            ..Default::default()
        }
    }

    fn sync(&self, scene: &mut Scene) {
        if let Some(object) = scene.object_mut(self.id) {
            object.set_transform(self.transform().to_matrix());
        }
    }
}

fn crystal_material(color: u32) -> Material {
    let linear = color_from_hex(color);
    Material::new(&crystal_material_name(color), linear, 0.6, 0.3)
        .with_emission(linear, 1.5)
        .with_transmission(0.4)
        .with_clearcoat(1.0, 0.2)
}

fn crystal_material_name(color: u32) -> String {
    format!("crystal:{:06x}", color)
}

pub struct CrystalField {
    crystals: Vec<Crystal>,
}

impl CrystalField {
    /// Creates `config.crystal_count` crystals, drawing every random value from `rng`
    pub fn spawn(scene: &mut Scene, config: &RoomConfig, rng: &mut impl Rng) -> Self {
        let room = config.room_size;
        let crystals = (0..config.crystal_count)
            .map(|index| {
                let color = config.crystal_color(index);
                let material = crystal_material_name(color);
                if scene.material_manager.get_material(&material).is_none() {
                    scene.add_material(crystal_material(color));
                }

                let radius = 0.25 + rng.random::<f32>() * 0.1;
                let position = Vector3::new(
                    (rng.random::<f32>() - 0.5) * room,
                    (rng.random::<f32>() - 0.5) * room,
                    (rng.random::<f32>() - 0.5) * room,
                );
                let float_speed = 0.5 + rng.random::<f32>();
                let rot_speed = rng.random::<f32>() * 0.02;

                let object = Object::from_geometry(&format!("crystal {}", index), &generate_octahedron(radius))
                    .with_material(&material)
                    .with_shadows(true, false);
                let crystal = Crystal {
                    id: scene.add_object(object),
                    color,
                    radius,
                    position,
                    rotation: (0.0, 0.0),
                    float_speed,
                    base_y: position.y,
                    rot_speed,
                };
                crystal.sync(scene);
                crystal
            })
            .collect();

        Self { crystals }
    }

    pub fn crystals(&self) -> &[Crystal] {
        &self.crystals
    }

    /// Bobs each crystal around its base height and spins it a fixed step
    pub fn update(&mut self, scene: &mut Scene, elapsed: f32) {
        for crystal in &mut self.crystals {
            crystal.position.y = crystal.base_y + (elapsed * crystal.float_speed).sin() * FLOAT_AMPLITUDE;
            crystal.rotation.1 += crystal.rot_speed;
            crystal.rotation.0 += crystal.rot_speed * 0.5;
            crystal.sync(scene);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CRYSTAL_PALETTE;
    use crate::gfx::camera::{CameraController, CameraManager, OrbitCamera};
    use rand::{rngs::StdRng, SeedableRng};

    fn scene() -> Scene {
        let camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::new(0.0, 0.0, 0.0), 1.0);
        Scene::new(CameraManager::new(camera, CameraController::new(0.005, 1.0)))
    }

    fn spawn(seed: u64) -> (Scene, CrystalField) {
        let mut scene = scene();
        let field = CrystalField::spawn(&mut scene, &RoomConfig::default(), &mut StdRng::seed_from_u64(seed));
        (scene, field)
    }

    #[test]
    fn test_parameters_in_range() {
        let (scene, field) = spawn(7);
        assert_eq!(field.crystals().len(), 20);
        assert_eq!(scene.object_count(), 20);
        for crystal in field.crystals() {
            assert!((0.25..0.35).contains(&crystal.radius));
            assert!((0.5..1.5).contains(&crystal.float_speed));
            assert!((0.0..0.02).contains(&crystal.rot_speed));
            for axis in [crystal.position.x, crystal.position.y, crystal.position.z] {
                assert!((-10.0..10.0).contains(&axis));
            }
            assert!(scene.object(crystal.id).is_some_and(|o| o.cast_shadows));
        }
    }

    #[test]
    fn test_palette_alternates_by_index() {
        let (scene, field) = spawn(1);
        for (i, crystal) in field.crystals().iter().enumerate() {
            assert_eq!(crystal.color, CRYSTAL_PALETTE[i % 2]);
        }
        // default plus one material per reachable color
        assert_eq!(scene.material_manager.len(), 3);
    }

    #[test]
    fn test_same_seed_same_layout() {
        let (_, a) = spawn(42);
        let (_, b) = spawn(42);
        let positions = |f: &CrystalField| f.crystals().iter().map(|c| c.position).collect::<Vec<_>>();
        assert_eq!(positions(&a), positions(&b));
    }

    #[test]
    fn test_update_floats_and_spins() {
        let (mut scene, mut field) = spawn(3);
        let first = field.crystals()[0].clone();

        field.update(&mut scene, 1.0);
        field.update(&mut scene, 2.0);
        let crystal = &field.crystals()[0];
        let expected_y = first.base_y + (2.0 * first.float_speed).sin() * FLOAT_AMPLITUDE;
        assert!((crystal.position.y - expected_y).abs() < 1e-5);
        assert!((crystal.rotation.1 - 2.0 * first.rot_speed).abs() < 1e-6);
        assert!((crystal.rotation.0 - first.rot_speed).abs() < 1e-6);
        assert_eq!(crystal.base_y, first.base_y);
        assert!((crystal.position.y - crystal.base_y).abs() <= FLOAT_AMPLITUDE + 1e-6);
    }
}
