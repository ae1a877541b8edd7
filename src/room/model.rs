//! glTF model loading and placement in the room.

use std::{path::Path, sync::Arc};

use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3};
use gltf::animation::util::ReadOutputs;

use crate::{
    error::{AssetError, AssetResult},
    gfx::{
        geometry::{calculate_vertex_normals, Aabb, GeometryData},
        resources::{Material, Side, TextureImage},
        scene::{Object, ObjectId, Scene},
    },
    room::animation::{AnimationClip, AnimationMixer, Channel, ChannelValues, Interpolation, NodeTransform},
};

pub const MODEL_METALNESS: f32 = 0.2;
pub const MODEL_ROUGHNESS: f32 = 0.7;
const DEFAULT_MATERIAL: &str = "model:default";

#[derive(Debug, Clone)]
pub struct ModelNode {
    pub name: Option<String>,
    pub children: Vec<usize>,
    pub local: NodeTransform,
    pub mesh: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ModelPrimitive {
    pub geometry: GeometryData,
    pub material: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct ModelMaterial {
    /// Linear rgba
    pub base_color: [f32; 4],
    pub texture: Option<Arc<TextureImage>>,
    pub double_sided: bool,
    /// `alphaMode: BLEND`; other modes render opaque
    pub blend: bool,
}

/// CPU side contents of a glTF file
#[derive(Debug, Clone)]
pub struct ModelData {
    pub nodes: Vec<ModelNode>,
    pub roots: Vec<usize>,
    pub meshes: Vec<Vec<ModelPrimitive>>,
    pub materials: Vec<ModelMaterial>,
    pub clips: Vec<AnimationClip>,
}

impl ModelData {
    /// World matrix of every node for the given local transforms.
    /// Nodes not reachable from a root keep the identity.
    pub fn world_matrices(&self, locals: &[NodeTransform]) -> Vec<Matrix4<f32>> {
        let mut world = vec![Matrix4::identity(); self.nodes.len()];
        let mut stack: Vec<(usize, Matrix4<f32>)> = self.roots.iter().map(|&r| (r, Matrix4::identity())).collect();
        let mut visited = vec![false; self.nodes.len()];

        while let Some((index, parent)) = stack.pop() {
            if index >= self.nodes.len() || visited[index] {
                continue;
            }
            visited[index] = true;
            let local = locals.get(index).copied().unwrap_or(self.nodes[index].local);
            world[index] = parent * local.to_matrix();
            stack.extend(self.nodes[index].children.iter().map(|&c| (c, world[index])));
        }
        world
    }

    /// Bounds of every mesh vertex in bind pose
    pub fn bounds(&self) -> Aabb {
        let locals: Vec<NodeTransform> = self.nodes.iter().map(|n| n.local).collect();
        let world = self.world_matrices(&locals);
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(i, node)| node.mesh.map(|m| (i, m)))
            .flat_map(|(i, mesh)| {
                let matrix = world[i];
                self.meshes
                    .get(mesh)
                    .into_iter()
                    .flatten()
                    .map(move |p| p.geometry.bounds().transformed(&matrix))
            })
            .fold(Aabb::empty(), |acc, b| acc.union(&b))
    }

    pub fn primitive_count(&self) -> usize {
        self.meshes.iter().map(Vec::len).sum()
    }
}

/// Uniform scale fitting `bounds` to 60% of the room.
///
/// Empty or flat-to-a-point bounds keep scale 1.
pub fn fit_scale(bounds: &Aabb, room_size: f32) -> f32 {
    let largest = bounds.max_dimension();
    if bounds.is_empty() || !largest.is_finite() || largest <= f32::EPSILON {
        log::warn!("Model bounds are degenerate ({:?}), keeping scale 1", bounds.size());
        return 1.0;
    }
    room_size * 0.6 / largest
}

pub fn load_model(path: &Path) -> AssetResult<ModelData> {
    let (document, buffers, images) = gltf::import(path).map_err(|e| match e {
        gltf::Error::Io(source) => AssetError::Io {
            path: path.to_path_buf(),
            source,
        },
        source => AssetError::Gltf {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let model = from_gltf(&document, &buffers, &images);
    if model.primitive_count() == 0 {
        return Err(AssetError::EmptyModel {
            path: path.to_path_buf(),
        });
    }
    log::info!(
        "Loaded model '{}': {} nodes, {} primitives, {} clips",
        path.display(),
        model.nodes.len(),
        model.primitive_count(),
        model.clips.len()
    );
    Ok(model)
}

fn rgba_pixels(image: &gltf::image::Data) -> Option<Vec<u8>> {
    use gltf::image::Format;

    let pixels = &image.pixels;
    match image.format {
        Format::R8G8B8A8 => Some(pixels.clone()),
        Format::R8G8B8 => Some(pixels.chunks_exact(3).flat_map(|p| [p[0], p[1], p[2], 255]).collect()),
        Format::R8G8 => Some(pixels.chunks_exact(2).flat_map(|p| [p[0], p[0], p[0], p[1]]).collect()),
        Format::R8 => Some(pixels.iter().flat_map(|&l| [l, l, l, 255]).collect()),
        other => {
            log::warn!("Unsupported glTF image format {:?}, texture ignored", other);
            None
        }
    }
}

fn read_primitive(primitive: &gltf::Primitive, buffers: &[gltf::buffer::Data]) -> Option<ModelPrimitive> {
    if primitive.mode() != gltf::mesh::Mode::Triangles {
        log::debug!("Skipping primitive with mode {:?}", primitive.mode());
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));

    let vertices: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    let normals = match reader.read_normals() {
        Some(normals) => normals.collect(),
        None => calculate_vertex_normals(&vertices, &indices),
    };
    let tex_coords = reader
        .read_tex_coords(0)
        .map(|uv| uv.into_f32().collect())
        .unwrap_or_default();

    Some(ModelPrimitive {
        geometry: GeometryData {
            vertices,
            tex_coords,
            normals,
            indices,
        },
        material: primitive.material().index(),
    })
}

fn read_clip(animation: &gltf::Animation, buffers: &[gltf::buffer::Data]) -> AnimationClip {
    let channels = animation
        .channels()
        .filter_map(|channel| {
            let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|data| data.0.as_slice()));
            let times: Vec<f32> = reader.read_inputs()?.collect();
            let values = match reader.read_outputs()? {
                ReadOutputs::Translations(t) => ChannelValues::Translation(t.map(Vector3::from).collect()),
                ReadOutputs::Scales(s) => ChannelValues::Scale(s.map(Vector3::from).collect()),
                ReadOutputs::Rotations(r) => {
                    ChannelValues::Rotation(r.into_f32().map(|[x, y, z, w]| Quaternion::new(w, x, y, z)).collect())
                }
                ReadOutputs::MorphTargetWeights(_) => {
                    log::debug!("Morph target channel ignored");
                    return None;
                }
            };
            let interpolation = match channel.sampler().interpolation() {
                gltf::animation::Interpolation::Linear => Interpolation::Linear,
                gltf::animation::Interpolation::Step => Interpolation::Step,
                gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
            };
            Some(Channel {
                node: channel.target().node().index(),
                interpolation,
                times,
                values,
            })
        })
        .collect();

    AnimationClip::new(animation.name().unwrap_or("clip"), channels)
}

pub fn from_gltf(document: &gltf::Document, buffers: &[gltf::buffer::Data], images: &[gltf::image::Data]) -> ModelData {
    let nodes = document
        .nodes()
        .map(|node| {
            let (translation, [x, y, z, w], scale) = node.transform().decomposed();
            ModelNode {
                name: node.name().map(str::to_string),
                children: node.children().map(|c| c.index()).collect(),
                local: NodeTransform {
                    translation: translation.into(),
                    rotation: Quaternion::new(w, x, y, z),
                    scale: scale.into(),
                },
                mesh: node.mesh().map(|m| m.index()),
            }
        })
        .collect();

    let roots = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => scene.nodes().map(|n| n.index()).collect(),
        None => Vec::new(),
    };

    let meshes = document
        .meshes()
        .map(|mesh| mesh.primitives().filter_map(|p| read_primitive(&p, buffers)).collect())
        .collect();

    let textures: Vec<Option<Arc<TextureImage>>> = images
        .iter()
        .map(|image| rgba_pixels(image).map(|rgba| Arc::new(TextureImage::from_rgba(image.width, image.height, rgba))))
        .collect();

    let materials = document
        .materials()
        .map(|material| {
            let pbr = material.pbr_metallic_roughness();
            let texture = pbr
                .base_color_texture()
                .and_then(|info| textures.get(info.texture().source().index()).cloned().flatten());
            ModelMaterial {
                base_color: pbr.base_color_factor(),
                texture,
                double_sided: material.double_sided(),
                blend: material.alpha_mode() == gltf::material::AlphaMode::Blend,
            }
        })
        .collect();

    let clips = document.animations().map(|a| read_clip(&a, buffers)).collect();

    ModelData {
        nodes,
        roots,
        meshes,
        materials,
        clips,
    }
}

/// A loaded model placed in the scene, with its animation state
pub struct ModelInstance {
    data: ModelData,
    locals: Vec<NodeTransform>,
    root: Matrix4<f32>,
    scale: f32,
    parts: Vec<(ObjectId, usize)>,
    mixer: AnimationMixer,
}

impl ModelInstance {
    /// Adds the model to the scene: positioned a quarter of the room below the
    /// center, fitted to the room, casting and receiving shadows, every clip looping
    pub fn install(scene: &mut Scene, data: ModelData, room_size: f32) -> Self {
        let scale = fit_scale(&data.bounds(), room_size);
        let root = Matrix4::from_translation(Vector3::new(0.0, -room_size * 0.25, 0.0)) * Matrix4::from_scale(scale);

        scene.add_material(Material::new(DEFAULT_MATERIAL, [1.0; 3], MODEL_METALNESS, MODEL_ROUGHNESS));
        for (index, source) in data.materials.iter().enumerate() {
            let [r, g, b, a] = source.base_color;
            let mut material = Material::new(&model_material_name(index), [r, g, b], MODEL_METALNESS, MODEL_ROUGHNESS);
            if source.blend {
                material = material.with_transparency(a);
            }
            if source.double_sided {
                material = material.with_side(Side::Double);
            }
            if let Some(texture) = &source.texture {
                material = material.with_texture(texture.clone());
            }
            scene.add_material(material);
        }

        let locals: Vec<NodeTransform> = data.nodes.iter().map(|n| n.local).collect();
        let world = data.world_matrices(&locals);
        let mut parts = Vec::new();
        for (index, node) in data.nodes.iter().enumerate() {
            let Some(primitives) = node.mesh.and_then(|m| data.meshes.get(m)) else {
                continue;
            };
            let name = node.name.clone().unwrap_or_else(|| format!("model node {}", index));
            for primitive in primitives {
                let material = primitive
                    .material
                    .map(model_material_name)
                    .unwrap_or_else(|| DEFAULT_MATERIAL.to_string());
                let object = Object::from_geometry(&name, &primitive.geometry)
                    .with_material(&material)
                    .with_transform(root * world[index])
                    .with_shadows(true, true);
                parts.push((scene.add_object(object), index));
            }
        }

        let mixer = AnimationMixer::new(data.clips.clone());
        log::info!("Model placed with scale {:.3}, {} clips playing", scale, mixer.clips().len());

        Self {
            data,
            locals,
            root,
            scale,
            parts,
            mixer,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
        self.parts.iter().map(|(id, _)| *id)
    }

    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    /// Advances the mixer and refreshes the transforms of animated parts
    pub fn update(&mut self, scene: &mut Scene, dt: f32) {
        if self.mixer.is_empty() {
            return;
        }
        self.mixer.update(dt, &mut self.locals);
        let world = self.data.world_matrices(&self.locals);
        for (id, node) in &self.parts {
            if let Some(object) = scene.object_mut(*id) {
                object.set_transform(self.root * world[*node]);
            }
        }
    }
}

fn model_material_name(index: usize) -> String {
    format!("model:{}", index)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::gfx::camera::{CameraController, CameraManager, OrbitCamera};
    use crate::gfx::geometry::generate_octahedron;

    /// One triangle spanning (0,0,0)-(2,1,0) on a node at x = 1, with a clip
    /// moving the node from y = 0 to y = 3 over one second
    const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "name": "tri", "mesh": 0, "translation": [1.0, 0.0, 0.0] }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
        "buffers": [{
            "byteLength": 68,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAAAAQAAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAgD8AAAAAAAAAAAAAAAAAAAAAAABAQAAAAAA="
        }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 44, "byteLength": 24 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0, 0, 0], "max": [2, 1, 0] },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0], "max": [1] },
            { "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC3" }
        ],
        "animations": [{
            "name": "bob",
            "channels": [{ "sampler": 0, "target": { "node": 0, "path": "translation" } }],
            "samplers": [{ "input": 1, "output": 2, "interpolation": "LINEAR" }]
        }]
    }"#;

    pub(crate) fn triangle() -> ModelData {
        let (document, buffers, images) = gltf::import_slice(TRIANGLE_GLTF.as_bytes()).unwrap();
        from_gltf(&document, &buffers, &images)
    }

    fn scene() -> Scene {
        let camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::new(0.0, 0.0, 0.0), 1.0);
        Scene::new(CameraManager::new(camera, CameraController::new(0.005, 1.0)))
    }

    #[test]
    fn test_parse_fills_missing_indices_and_normals() {
        let model = triangle();
        assert_eq!(model.roots, vec![0]);
        assert_eq!(model.primitive_count(), 1);
        let geometry = &model.meshes[0][0].geometry;
        assert_eq!(geometry.indices, vec![0, 1, 2]);
        assert_eq!(geometry.normals.len(), 3);
        assert!((geometry.normals[0][2] - 1.0).abs() < 1e-6);
        assert_eq!(model.clips.len(), 1);
        assert_eq!(model.clips[0].duration, 1.0);
    }

    #[test]
    fn test_bounds_include_node_transform() {
        let bounds = triangle().bounds();
        assert!((bounds.min.x - 1.0).abs() < 1e-6);
        assert!((bounds.max.x - 3.0).abs() < 1e-6);
        assert!((bounds.max_dimension() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_scale() {
        let bounds = Aabb::new(Vector3::new(-1.0, 0.0, 0.0), Vector3::new(1.0, 4.0, 1.0));
        let scale = fit_scale(&bounds, 20.0);
        assert!((scale - 3.0).abs() < 1e-6);
        assert!(scale > 0.0);

        assert_eq!(fit_scale(&Aabb::empty(), 20.0), 1.0);
        let point = Aabb::new(Vector3::new(1.0, 1.0, 1.0), Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(fit_scale(&point, 20.0), 1.0);
    }

    #[test]
    fn test_install_places_and_animates() {
        let mut scene = scene();
        let mut instance = ModelInstance::install(&mut scene, triangle(), 20.0);
        // widest extent 2 scaled to 12
        assert!((instance.scale() - 6.0).abs() < 1e-5);

        let id = instance.object_ids().next().unwrap();
        let object = scene.object(id).unwrap();
        assert!(object.cast_shadows && object.receive_shadows);
        assert_eq!(object.get_material_id(), Some(DEFAULT_MATERIAL));
        let material = scene.get_material_for_object(object);
        assert_eq!((material.metallic, material.roughness), (MODEL_METALNESS, MODEL_ROUGHNESS));
        assert!((object.world_bounds().min.y - -5.0).abs() < 1e-4);

        instance.update(&mut scene, 0.5);
        let moved = scene.object(id).unwrap().world_bounds();
        // node y = 1.5 in model space, scaled by 6, root at -5
        assert!((moved.min.y - 4.0).abs() < 1e-4);
    }

    #[test]
    fn test_only_blend_alpha_mode_is_transparent() {
        let json = TRIANGLE_GLTF
            .replace(
                r#""asset": { "version": "2.0" },"#,
                r#""asset": { "version": "2.0" },
                "materials": [
                    { "pbrMetallicRoughness": { "baseColorFactor": [1, 0, 0, 0.5] } },
                    { "alphaMode": "BLEND", "pbrMetallicRoughness": { "baseColorFactor": [0, 1, 0, 0.5] } }
                ],"#,
            )
            .replace(
                r#""primitives": [{ "attributes": { "POSITION": 0 } }]"#,
                r#""primitives": [
                    { "attributes": { "POSITION": 0 }, "material": 0 },
                    { "attributes": { "POSITION": 0 }, "material": 1 }
                ]"#,
            );
        let (document, buffers, images) = gltf::import_slice(json.as_bytes()).unwrap();
        let data = from_gltf(&document, &buffers, &images);
        assert!(!data.materials[0].blend);
        assert!(data.materials[1].blend);

        let mut scene = scene();
        let instance = ModelInstance::install(&mut scene, data, 20.0);
        let ids: Vec<ObjectId> = instance.object_ids().collect();
        assert_eq!(ids.len(), 2);

        let opaque = scene.get_material_for_object(scene.object(ids[0]).unwrap());
        assert!(!opaque.transparent);
        assert_eq!(opaque.opacity, 1.0);
        let blended = scene.get_material_for_object(scene.object(ids[1]).unwrap());
        assert!(blended.transparent);
        assert_eq!(blended.opacity, 0.5);
    }

    #[test]
    fn test_world_matrices_follow_hierarchy() {
        let child = ModelNode {
            name: None,
            children: vec![],
            local: NodeTransform {
                translation: Vector3::new(0.0, 1.0, 0.0),
                ..Default::default()
            },
            mesh: Some(0),
        };
        let parent = ModelNode {
            name: None,
            children: vec![1],
            local: NodeTransform {
                scale: Vector3::new(2.0, 2.0, 2.0),
                ..Default::default()
            },
            mesh: None,
        };
        let model = ModelData {
            nodes: vec![parent, child],
            roots: vec![0],
            meshes: vec![vec![ModelPrimitive {
                geometry: generate_octahedron(0.5),
                material: None,
            }]],
            materials: vec![],
            clips: vec![],
        };
        let bounds = model.bounds();
        assert!((bounds.min.y - 1.0).abs() < 1e-5);
        assert!((bounds.max.y - 3.0).abs() < 1e-5);
    }
}
