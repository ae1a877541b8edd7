//! Room shell and light rig.

use std::{f32::consts::PI, sync::Arc};

use cgmath::Vector3;

use crate::{
    config::RoomConfig,
    gfx::{
        geometry::generate_box_faces,
        resources::{color_from_hex, Material, Side, TextureImage},
        scene::{AmbientLight, DirectionalLight, Fog, LightRig, Object, ObjectId, PointLight, Scene, SpotLight},
    },
};

pub const WALL_COLOR: u32 = 0x111122;
/// Index of the +Z face in [`generate_box_faces`] order
pub const BACK_WALL: usize = 4;
const FACE_NAMES: [&str; 6] = ["+x", "-x", "+y", "-y", "+z", "-z"];

/// Adds the six inward-facing walls. The +Z wall carries the wall texture
/// when it can be loaded and falls back to the plain wall color otherwise.
pub fn build_room(scene: &mut Scene, config: &RoomConfig) -> Vec<ObjectId> {
    let size = config.room_size;
    let faces = generate_box_faces(size, size, size);
    let texture_path = config.wall_texture_path();

    let mut ids = Vec::with_capacity(faces.len());
    for (index, geometry) in faces.iter().enumerate() {
        let name = format!("wall:{}", FACE_NAMES[index]);
        let mut material = Material::standard(&name, WALL_COLOR).with_side(Side::Back);
        if index == BACK_WALL {
            match TextureImage::load(&texture_path) {
                Ok(image) => {
                    log::info!("Loaded wall texture '{}' ({}x{})", texture_path.display(), image.width, image.height);
                    material = Material::new(&name, [1.0; 3], 0.0, 1.0)
                        .with_side(Side::Back)
                        .with_texture(Arc::new(image));
                }
                Err(e) => log::warn!("Wall texture unavailable, using flat color: {}", e),
            }
        }
        scene.add_material(material);

        let wall = Object::from_geometry(&name, geometry)
            .with_material(&name)
            .with_shadows(false, true);
        ids.push(scene.add_object(wall));
    }
    ids
}

fn spot(intensity: f32, angle: f32, position: Vector3<f32>) -> SpotLight {
    SpotLight {
        color: [1.0; 3],
        intensity,
        position,
        target: Vector3::new(0.0, 0.0, 0.0),
        distance: 100.0,
        angle,
        penumbra: 0.3,
        decay: 1.0,
        cast_shadow: true,
    }
}

/// Ambient fill, warm key, four white rim spots, a blue back light and fog
pub fn light_rig() -> LightRig {
    let rig = LightRig {
        ambient: AmbientLight {
            color: color_from_hex(0x222233),
            intensity: 0.3,
        },
        directional: vec![DirectionalLight {
            color: color_from_hex(0xffd580),
            intensity: 1.3,
            position: Vector3::new(-7.0, 5.0, 7.0),
            target: Vector3::new(0.0, 0.0, 0.0),
            cast_shadow: true,
        }],
        spots: vec![
            spot(10.0, PI / 7.0, Vector3::new(-5.0, 10.0, 0.0)),
            spot(10.0, PI / 7.0, Vector3::new(0.0, 10.0, 5.0)),
            spot(10.0, PI / 7.0, Vector3::new(5.0, 10.0, -5.0)),
            spot(8.0, PI / 6.0, Vector3::new(0.0, 10.0, 0.0)),
        ],
        points: vec![PointLight {
            color: color_from_hex(0x4488ff),
            intensity: 1.2,
            position: Vector3::new(0.0, 0.0, -10.0),
            distance: 40.0,
            decay: 2.0,
        }],
        fog: Some(Fog {
            color: color_from_hex(0x0f0f1a),
            density: 0.015,
        }),
    };
    rig.warn_overflow();
    rig
}
