//! wgpu rendering engine for the room
//!
//! Each frame runs one depth-only pass per shadow casting light into a
//! layered shadow map, then a multisampled main pass: opaque objects in
//! scene order, transparent ones back to front without depth writes.

use std::{cmp::Ordering, sync::Arc};

use anyhow::{anyhow, Context};
use cgmath::{InnerSpace, Vector3};

use crate::gfx::{
    resources::{
        global_bindings::{update_global_ubo, GlobalBindings, GlobalUBO},
        material::{material_bind_group_layout, Material, Side},
        texture_resource::{TextureImage, TextureResource},
    },
    scene::{
        lights::MAX_SHADOW_LAYERS,
        object::{object_bind_group_layout, DrawObject, Object},
        scene::Scene,
    },
};
use crate::wgpu_utils::{
    binding_builder::{BindGroupBuilder, BindGroupLayoutBuilder, BindGroupLayoutWithDesc},
    binding_types,
    uniform_buffer::UniformBuffer,
};

use super::pipeline_manager::{PipelineConfig, PipelineManager};

pub const SAMPLE_COUNT: u32 = 4;
const SHADOW_MAP_SIZE: u32 = 2048;
const SHADOW_PIPELINE: &str = "Shadow";
const CLEAR_COLOR: wgpu::Color = wgpu::Color::BLACK;

/// Light view-projection for one shadow layer
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct ShadowPassUniform {
    view_proj: [[f32; 4]; 4],
}

struct ShadowLayer {
    view: wgpu::TextureView,
    ubo: UniformBuffer<ShadowPassUniform>,
    bind_group: wgpu::BindGroup,
}

/// Core rendering engine managing GPU resources and draw calls
pub struct RenderEngine {
    surface: wgpu::Surface<'static>,
    device: Arc<wgpu::Device>,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    depth_texture: TextureResource,
    msaa_target: TextureResource,
    pub pipeline_manager: PipelineManager,
    global_ubo: GlobalUBO,
    global_bindings: GlobalBindings,
    object_layout: BindGroupLayoutWithDesc,
    material_layout: BindGroupLayoutWithDesc,
    fallback_texture: TextureResource,

    // Shadow mapping
    _shadow_map: TextureResource,
    shadow_layers: Vec<ShadowLayer>,
    shadow_bind_group: wgpu::BindGroup,
}

impl RenderEngine {
    /// Creates the device, surface and every pipeline for the given window
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
    ) -> anyhow::Result<RenderEngine> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window).context("failed to create surface")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("no suitable graphics adapter")?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::default(),
                required_limits: wgpu::Limits {
                    max_texture_dimension_2d: 4096,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("failed to create device")?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| anyhow!("surface reports no formats"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_capabilities.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let depth_texture = TextureResource::create_depth_texture(&device, &config, SAMPLE_COUNT, "depth_texture");
        let msaa_target = TextureResource::create_msaa_target(&device, &config, SAMPLE_COUNT);
        let fallback_texture = TextureResource::from_image(&device, &queue, &TextureImage::white(), "White Texture");

        // Shadow map and the per-layer light matrices
        let (shadow_map, layer_views) = TextureResource::create_shadow_map(&device, SHADOW_MAP_SIZE, MAX_SHADOW_LAYERS as u32);
        let shadow_pass_layout = BindGroupLayoutBuilder::new()
            .next_binding_vertex(binding_types::uniform())
            .create(&device, "Shadow Pass Layout");
        let shadow_layers = layer_views
            .into_iter()
            .enumerate()
            .map(|(layer, view)| {
                let ubo = UniformBuffer::<ShadowPassUniform>::new(&device, &format!("Shadow Pass Uniforms {}", layer));
                let bind_group = BindGroupBuilder::new(&shadow_pass_layout)
                    .resource(ubo.binding_resource())
                    .create(&device, &format!("Shadow Pass Bind Group {}", layer));
                ShadowLayer { view, ubo, bind_group }
            })
            .collect();

        let shadow_sample_layout = BindGroupLayoutBuilder::new()
            .next_binding_fragment(binding_types::depth_texture_2d_array())
            .next_binding_fragment(binding_types::sampler(wgpu::SamplerBindingType::Comparison))
            .create(&device, "Shadow Sample Layout");
        let shadow_bind_group = BindGroupBuilder::new(&shadow_sample_layout)
            .texture(&shadow_map.view)
            .sampler(&shadow_map.sampler)
            .create(&device, "Shadow Bind Group");

        let global_ubo = GlobalUBO::new(&device, "Global Uniforms");
        let global_bindings = GlobalBindings::new(&device, &global_ubo);
        let object_layout = object_bind_group_layout(&device);
        let material_layout = material_bind_group_layout(&device);

        let device: Arc<wgpu::Device> = device.into();
        let mut pipeline_manager = PipelineManager::new(device.clone());
        pipeline_manager.load_shader("pbr", include_str!("pbr.wgsl"));
        pipeline_manager.load_shader("shadow", include_str!("shadow_pass.wgsl"));

        // Both faces are rasterized into the shadow map
        pipeline_manager.register_pipeline(
            SHADOW_PIPELINE,
            PipelineConfig::default()
                .with_label("SHADOW")
                .with_shader("shadow")
                .with_vertex_only()
                .with_cull_mode(None)
                .with_depth(TextureResource::DEPTH_FORMAT, true)
                .with_depth_bias(2, 2.0)
                .with_bind_group_layouts(vec![shadow_pass_layout.layout.clone(), object_layout.layout.clone()]),
        );

        for side in [Side::Front, Side::Back, Side::Double] {
            for transparent in [false, true] {
                let mut variant = Material::default().with_side(side);
                variant.transparent = transparent;
                let blend = if transparent {
                    wgpu::BlendState::ALPHA_BLENDING
                } else {
                    wgpu::BlendState::REPLACE
                };
                let key = variant.pipeline_key();
                pipeline_manager.register_pipeline(
                    &key,
                    PipelineConfig::default()
                        .with_label(&key)
                        .with_shader("pbr")
                        .with_cull_mode(side.cull_mode())
                        .with_depth(TextureResource::DEPTH_FORMAT, !transparent)
                        .with_sample_count(SAMPLE_COUNT)
                        .with_color_targets(vec![Some(wgpu::ColorTargetState {
                            format,
                            blend: Some(blend),
                            write_mask: wgpu::ColorWrites::ALL,
                        })])
                        .with_bind_group_layouts(vec![
                            global_bindings.bind_group_layout().clone(),
                            object_layout.layout.clone(),
                            material_layout.layout.clone(),
                            shadow_sample_layout.layout.clone(),
                        ]),
                );
            }
        }

        if let Err(errors) = pipeline_manager.create_all_pipelines() {
            for error in errors {
                log::error!("{}", error);
            }
        }
        let stats = pipeline_manager.get_stats();
        log::info!(
            "Created {} pipelines from {} shaders ({} pending)",
            stats.total_pipelines,
            stats.loaded_shaders,
            stats.pending_pipelines
        );

        Ok(RenderEngine {
            surface,
            device,
            queue,
            config,
            depth_texture,
            msaa_target,
            pipeline_manager,
            global_ubo,
            global_bindings,
            object_layout,
            material_layout,
            fallback_texture,
            _shadow_map: shadow_map,
            shadow_layers,
            shadow_bind_group,
        })
    }

    /// Uploads scene changes and renders one frame
    ///
    /// A lost or outdated surface is reconfigured and the frame skipped.
    /// Only unrecoverable surface errors are returned.
    pub fn render_frame(&mut self, scene: &mut Scene) -> Result<(), wgpu::SurfaceError> {
        scene.sync_gpu_resources(
            &self.device,
            &self.queue,
            &self.object_layout,
            &self.material_layout,
            &self.fallback_texture,
        );
        update_global_ubo(&mut self.global_ubo, &self.queue, &scene.camera_manager.camera.uniform, &scene.lights);

        let casters = scene.lights.shadow_casters();
        for (layer, matrix) in self.shadow_layers.iter_mut().zip(casters.iter()) {
            layer.ubo.update_content(
                &self.queue,
                ShadowPassUniform {
                    view_proj: (*matrix).into(),
                },
            );
        }

        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Surface texture acquisition timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e),
        };
        let surface_view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });

        let scene: &Scene = scene;
        let layer_count = casters.len().min(self.shadow_layers.len());
        for layer in &self.shadow_layers[..layer_count] {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Depth Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &layer.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let Some(pipeline) = self.pipeline_manager.get_pipeline(SHADOW_PIPELINE) else {
                break;
            };
            shadow_pass.set_pipeline(pipeline);
            shadow_pass.set_bind_group(0, &layer.bind_group, &[]);
            for object in scene.objects().filter(|o| o.visible && o.cast_shadows) {
                shadow_pass.draw_object(object);
            }
        }

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Main Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.msaa_target.view,
                    resolve_target: Some(&surface_view),
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Discard,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_bind_group(0, self.global_bindings.bind_group(), &[]);
            render_pass.set_bind_group(3, &self.shadow_bind_group, &[]);

            for object in draw_order(scene, scene.camera_manager.camera.eye) {
                let material = scene.get_material_for_object(object);
                let Some(material_bind_group) = material.get_bind_group() else {
                    log::debug!("Skipping '{}', material '{}' has no GPU resources", object.name, material.name);
                    continue;
                };
                let Some(pipeline) = self.pipeline_manager.get_pipeline(&material.pipeline_key()) else {
                    continue;
                };
                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(2, material_bind_group, &[]);
                render_pass.draw_object(object);
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
        Ok(())
    }

    /// Reconfigures the surface and recreates size dependent targets.
    /// Zero sized requests (minimized windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }

        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);

        self.depth_texture = TextureResource::create_depth_texture(&self.device, &self.config, SAMPLE_COUNT, "depth_texture");
        self.msaa_target = TextureResource::create_msaa_target(&self.device, &self.config, SAMPLE_COUNT);
    }
}

/// Visible objects in draw order: opaque ones as stored in the scene,
/// then transparent ones from farthest to nearest `eye`
pub fn draw_order(scene: &Scene, eye: Vector3<f32>) -> Vec<&Object> {
    let (mut transparent, opaque): (Vec<&Object>, Vec<&Object>) = scene
        .objects()
        .filter(|o| o.visible)
        .partition(|o| scene.get_material_for_object(o).transparent);

    let distance = |object: &Object| {
        let bounds = object.world_bounds();
        if bounds.is_empty() {
            return 0.0;
        }
        ((bounds.min + bounds.max) * 0.5 - eye).magnitude2()
    };
    transparent.sort_by(|a, b| distance(*b).partial_cmp(&distance(*a)).unwrap_or(Ordering::Equal));

    let mut ordered = opaque;
    ordered.extend(transparent);
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::camera::{CameraController, CameraManager, OrbitCamera};
    use crate::gfx::geometry::generate_octahedron;
    use cgmath::Matrix4;

    fn scene() -> Scene {
        let camera = OrbitCamera::new(10.0, 0.0, 0.0, Vector3::new(0.0, 0.0, 0.0), 1.0);
        Scene::new(CameraManager::new(camera, CameraController::new(0.005, 1.0)))
    }

    fn at(name: &str, material: &str, z: f32) -> Object {
        Object::from_geometry(name, &generate_octahedron(0.5))
            .with_material(material)
            .with_transform(Matrix4::from_translation(Vector3::new(0.0, 0.0, z)))
    }

    #[test]
    fn test_transparent_objects_draw_last_back_to_front() {
        let mut scene = scene();
        scene.add_material(Material::unlit("glass", 0x2fa7e7).with_transparency(0.9));
        scene.add_material(Material::standard("wall", 0x111122));

        scene.add_object(at("near glass", "glass", 8.0));
        scene.add_object(at("wall", "wall", 0.0));
        scene.add_object(at("far glass", "glass", -5.0));
        let mut hidden = at("hidden", "wall", 0.0);
        hidden.visible = false;
        scene.add_object(hidden);

        let names: Vec<&str> = draw_order(&scene, Vector3::new(0.0, 0.0, 10.0))
            .iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, vec!["wall", "far glass", "near glass"]);
    }
}
