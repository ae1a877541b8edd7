//! Material system for the forward renderer
//!
//! Materials live in the [`MaterialManager`] and objects reference them by
//! name. One material description covers the three surface kinds the room
//! uses: lit standard surfaces, lit "physical" surfaces with transmission and
//! clearcoat, and unlit flat color.

use std::collections::HashMap;
use std::sync::Arc;

use wgpu::Device;

use super::texture_resource::{TextureImage, TextureResource};
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

pub type MaterialId = String;

/// Converts a `0xRRGGBB` sRGB color into linear RGB
pub fn color_from_hex(hex: u32) -> [f32; 3] {
    let channel = |shift: u32| srgb_to_linear(((hex >> shift) & 0xff) as f32 / 255.0);
    [channel(16), channel(8), channel(0)]
}

pub fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Which faces of a surface are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Side {
    #[default]
    Front,
    /// Only back faces, shaded with flipped normals
    Back,
    Double,
}

impl Side {
    /// Face to cull for this side
    pub fn cull_mode(self) -> Option<wgpu::Face> {
        match self {
            Side::Front => Some(wgpu::Face::Back),
            Side::Back => Some(wgpu::Face::Front),
            Side::Double => None,
        }
    }

    pub(crate) fn key(self) -> &'static str {
        match self {
            Side::Front => "front",
            Side::Back => "back",
            Side::Double => "double",
        }
    }
}

/// GPU uniform data for materials
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    /// Linear rgb, a = opacity
    pub base_color: [f32; 4],
    /// Pre-multiplied by the emissive intensity
    pub emissive: [f32; 4],
    /// metallic, roughness, transmission, clearcoat
    pub surface: [f32; 4],
    /// clearcoat roughness, unlit, has texture, back side
    pub flags: [f32; 4],
}

/// Material bind group layout: uniform, base color texture, sampler
pub fn material_bind_group_layout(device: &Device) -> BindGroupLayoutWithDesc {
    BindGroupLayoutBuilder::new()
        .next_binding_fragment(binding_types::uniform())
        .next_binding_fragment(binding_types::texture_2d())
        .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Filtering))
        .create(device, "Material Bind Group Layout")
}

struct MaterialGpu {
    ubo: UniformBuffer<MaterialUniform>,
    bind_group: wgpu::BindGroup,
    _texture: Option<TextureResource>,
}

/// Surface description with PBR and unlit properties
pub struct Material {
    pub name: String,
    /// Linear rgb
    pub base_color: [f32; 3],
    pub opacity: f32,
    /// Blended and drawn after opaque surfaces, back to front
    pub transparent: bool,
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
    pub emissive_intensity: f32,
    pub transmission: f32,
    pub clearcoat: f32,
    pub clearcoat_roughness: f32,
    /// Ignore lights and output the base color
    pub unlit: bool,
    pub side: Side,
    pub texture: Option<Arc<TextureImage>>,

    gpu: Option<MaterialGpu>,
}

impl Default for Material {
    fn default() -> Self {
        Self::new("default", [0.8, 0.8, 0.8], 0.0, 1.0)
    }
}

impl std::fmt::Debug for Material {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("name", &self.name)
            .field("base_color", &self.base_color)
            .field("opacity", &self.opacity)
            .field("unlit", &self.unlit)
            .field("side", &self.side)
            .finish_non_exhaustive()
    }
}

impl Material {
    /// Creates a lit material
    ///
    /// # Arguments
    /// * `name` - Unique name for this material
    /// * `base_color` - Linear RGB base color
    /// * `metallic` - Metallic factor (0.0 = dielectric, 1.0 = metallic)
    /// * `roughness` - Surface roughness (0.0 = mirror, 1.0 = rough)
    pub fn new(name: &str, base_color: [f32; 3], metallic: f32, roughness: f32) -> Self {
        Self {
            name: name.to_string(),
            base_color,
            opacity: 1.0,
            transparent: false,
            metallic: metallic.clamp(0.0, 1.0),
            roughness: roughness.clamp(0.0, 1.0),
            emissive: [0.0; 3],
            emissive_intensity: 1.0,
            transmission: 0.0,
            clearcoat: 0.0,
            clearcoat_roughness: 0.0,
            unlit: false,
            side: Side::Front,
            texture: None,
            gpu: None,
        }
    }

    /// Lit material from an sRGB hex color
    pub fn standard(name: &str, hex: u32) -> Self {
        Self::new(name, color_from_hex(hex), 0.0, 1.0)
    }

    /// Flat color material that ignores lights
    pub fn unlit(name: &str, hex: u32) -> Self {
        Self {
            unlit: true,
            ..Self::new(name, color_from_hex(hex), 0.0, 1.0)
        }
    }

    pub fn with_emission(mut self, color: [f32; 3], intensity: f32) -> Self {
        self.emissive = color;
        self.emissive_intensity = intensity;
        self
    }

    pub fn with_transmission(mut self, transmission: f32) -> Self {
        self.transmission = transmission.clamp(0.0, 1.0);
        self
    }

    pub fn with_clearcoat(mut self, clearcoat: f32, roughness: f32) -> Self {
        self.clearcoat = clearcoat.clamp(0.0, 1.0);
        self.clearcoat_roughness = roughness.clamp(0.0, 1.0);
        self
    }

    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    pub fn with_transparency(mut self, opacity: f32) -> Self {
        self.transparent = true;
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    pub fn with_texture(mut self, texture: Arc<TextureImage>) -> Self {
        self.texture = Some(texture);
        self
    }

    pub fn uniform(&self) -> MaterialUniform {
        let e = self.emissive_intensity;
        MaterialUniform {
            base_color: [self.base_color[0], self.base_color[1], self.base_color[2], self.opacity],
            emissive: [self.emissive[0] * e, self.emissive[1] * e, self.emissive[2] * e, 0.0],
            surface: [self.metallic, self.roughness, self.transmission, self.clearcoat],
            flags: [
                self.clearcoat_roughness,
                self.unlit as u32 as f32,
                self.texture.is_some() as u32 as f32,
                (self.side == Side::Back) as u32 as f32,
            ],
        }
    }

    /// Pipeline variant this material renders with
    pub fn pipeline_key(&self) -> String {
        let blend = if self.transparent { "blend" } else { "opaque" };
        format!("PBR:{}:{}", self.side.key(), blend)
    }

    /// Creates GPU resources on first use and uploads the current uniform
    pub fn update_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        layout: &BindGroupLayoutWithDesc,
        fallback: &TextureResource,
    ) {
        if self.gpu.is_none() {
            let ubo = UniformBuffer::with_content(device, &format!("{} Material Uniforms", self.name), &self.uniform());
            let texture = self.texture.as_ref().map(|image| {
                TextureResource::create_from_rgba_data(
                    device,
                    queue,
                    &image.rgba,
                    image.width,
                    image.height,
                    &format!("{} texture", self.name),
                )
            });
            let bound = texture.as_ref().unwrap_or(fallback);
            let bind_group = BindGroupBuilder::new(layout)
                .resource(ubo.binding_resource())
                .texture(&bound.view)
                .sampler(&bound.sampler)
                .create(device, &format!("{} Material Bind Group", self.name));
            self.gpu = Some(MaterialGpu {
                ubo,
                bind_group,
                _texture: texture,
            });
        }

        let uniform = self.uniform();
        if let Some(gpu) = &mut self.gpu {
            gpu.ubo.update_content(queue, uniform);
        }
    }

    pub fn get_bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.gpu.as_ref().map(|gpu| &gpu.bind_group)
    }
}

/// Central material storage, always containing a default material
pub struct MaterialManager {
    materials: HashMap<MaterialId, Material>,
    default_material_id: MaterialId,
}

impl Default for MaterialManager {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialManager {
    pub fn new() -> Self {
        let mut materials = HashMap::new();
        materials.insert("default".to_string(), Material::default());
        Self {
            materials,
            default_material_id: "default".to_string(),
        }
    }

    /// Adds or replaces a material, returning its id
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        let id = material.name.clone();
        self.materials.insert(id.clone(), material);
        id
    }

    pub fn get_material(&self, id: &str) -> Option<&Material> {
        self.materials.get(id)
    }

    pub fn get_material_mut(&mut self, id: &str) -> Option<&mut Material> {
        self.materials.get_mut(id)
    }

    pub fn get_default_material(&self) -> &Material {
        &self.materials[&self.default_material_id]
    }

    /// Material for an object, falling back to the default
    pub fn get_material_for_object(&self, material_id: Option<&str>) -> &Material {
        material_id
            .and_then(|id| self.get_material(id))
            .unwrap_or_else(|| self.get_default_material())
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn update_all_gpu_resources(
        &mut self,
        device: &Device,
        queue: &wgpu::Queue,
        layout: &BindGroupLayoutWithDesc,
        fallback: &TextureResource,
    ) {
        for material in self.materials.values_mut() {
            material.update_gpu_resources(device, queue, layout, fallback);
        }
    }
}
