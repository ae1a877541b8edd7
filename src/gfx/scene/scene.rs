use std::collections::HashMap;

use wgpu::Device;

use crate::gfx::{
    camera::camera_utils::CameraManager,
    resources::{
        material::{Material, MaterialManager},
        texture_resource::TextureResource,
    },
    scene::{lights::LightRig, object::Object},
};
use crate::wgpu_utils::binding_builder::BindGroupLayoutWithDesc;

/// Stable handle to an object, valid until the object is removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

/// Main scene containing objects, materials, lights and camera
pub struct Scene {
    pub camera_manager: CameraManager,
    pub material_manager: MaterialManager,
    pub lights: LightRig,
    objects: Vec<(ObjectId, Object)>,
    groups: HashMap<String, Vec<ObjectId>>,
    next_id: u64,
}

impl Scene {
    pub fn new(camera_manager: CameraManager) -> Self {
        Self {
            camera_manager,
            material_manager: MaterialManager::new(),
            lights: LightRig::default(),
            objects: Vec::new(),
            groups: HashMap::new(),
            next_id: 0,
        }
    }

    /// Per-frame camera step
    pub fn update(&mut self) {
        self.camera_manager.update();
    }

    pub fn add_object(&mut self, object: Object) -> ObjectId {
        let id = ObjectId(self.next_id);
        self.next_id += 1;
        self.objects.push((id, object));
        id
    }

    /// Adds an object that can later be removed together with its group
    pub fn add_to_group(&mut self, group: &str, object: Object) -> ObjectId {
        let id = self.add_object(object);
        self.groups.entry(group.to_string()).or_default().push(id);
        id
    }

    /// Removes every object of `group`, returning how many were removed
    pub fn clear_group(&mut self, group: &str) -> usize {
        let Some(members) = self.groups.remove(group) else {
            return 0;
        };
        let before = self.objects.len();
        self.objects.retain(|(id, _)| !members.contains(id));
        before - self.objects.len()
    }

    pub fn group(&self, group: &str) -> &[ObjectId] {
        self.groups.get(group).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.iter().find(|(oid, _)| *oid == id).map(|(_, o)| o)
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.iter_mut().find(|(oid, _)| *oid == id).map(|(_, o)| o)
    }

    /// Objects in insertion order
    pub fn objects(&self) -> impl Iterator<Item = &Object> {
        self.objects.iter().map(|(_, o)| o)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn add_material(&mut self, material: Material) -> String {
        self.material_manager.add_material(material)
    }

    pub fn get_material_for_object(&self, object: &Object) -> &Material {
        self.material_manager.get_material_for_object(object.get_material_id())
    }

    /// Creates missing GPU resources and uploads changed uniforms
    pub fn sync_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        object_layout: &BindGroupLayoutWithDesc,
        material_layout: &BindGroupLayoutWithDesc,
        fallback_texture: &TextureResource,
    ) {
        for (_, object) in self.objects.iter_mut() {
            object.sync_gpu_resources(device, queue, object_layout);
        }
        self.material_manager
            .update_all_gpu_resources(device, queue, material_layout, fallback_texture);
    }

    pub fn get_statistics(&self) -> SceneStatistics {
        SceneStatistics {
            object_count: self.objects.len(),
            material_count: self.material_manager.len(),
            total_triangles: self.objects().map(Object::triangle_count).sum(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct SceneStatistics {
    pub object_count: usize,
    pub material_count: usize,
    pub total_triangles: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::{CameraController, OrbitCamera};
    use crate::gfx::geometry::generate_octahedron;
    use cgmath::Vector3;

    fn scene() -> Scene {
        let camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::new(0.0, 0.0, 0.0), 1.0);
        Scene::new(CameraManager::new(camera, CameraController::new(0.005, 1.0)))
    }

    fn crystal(name: &str) -> Object {
        Object::from_geometry(name, &generate_octahedron(0.3))
    }

    #[test]
    fn test_ids_are_stable_across_group_clear() {
        let mut scene = scene();
        let a = scene.add_to_group("text", crystal("a"));
        let b = scene.add_object(crystal("b"));
        assert_ne!(a, b);
        scene.clear_group("text");
        assert_eq!(scene.object(b).map(|o| o.name.as_str()), Some("b"));
        assert!(scene.object(a).is_none());
        // ids are never reused
        let c = scene.add_to_group("text", crystal("c"));
        assert_ne!(c, a);
        assert!(scene.object(a).is_none());
    }

    #[test]
    fn test_clear_group_keeps_other_objects() {
        let mut scene = scene();
        let keep = scene.add_object(crystal("keep"));
        scene.add_to_group("text", crystal("t1"));
        scene.add_to_group("text", crystal("t2"));
        assert_eq!(scene.group("text").len(), 2);

        assert_eq!(scene.clear_group("text"), 2);
        assert_eq!(scene.object_count(), 1);
        assert!(scene.object(keep).is_some());
        assert!(scene.group("text").is_empty());
        assert_eq!(scene.clear_group("text"), 0);
    }

    #[test]
    fn test_statistics() {
        let mut scene = scene();
        scene.add_object(crystal("a"));
        scene.add_material(Material::standard("wall", 0x111122));
        let stats = scene.get_statistics();
        assert_eq!(stats.object_count, 1);
        assert_eq!(stats.material_count, 2);
        assert_eq!(stats.total_triangles, 8);
    }
}
