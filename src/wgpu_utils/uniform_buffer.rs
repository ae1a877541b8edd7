// src/wgpu_utils/uniform_buffer.rs
use std::marker::PhantomData;

use wgpu::util::DeviceExt;

/// Bytes of the last upload; identical content is not written again
#[derive(Debug, Default)]
struct UploadCache {
    bytes: Vec<u8>,
}

impl UploadCache {
    /// Records `next` and reports whether it differs from the previous upload
    fn replace(&mut self, next: &[u8]) -> bool {
        if self.bytes == next {
            return false;
        }
        self.bytes.clear();
        self.bytes.extend_from_slice(next);
        true
    }
}

/// Uniform buffer holding a single `Content` value
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    cache: UploadCache,
    content_type: PhantomData<Content>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    /// Zero-initialised buffer, filled by the first `update_content`
    pub fn new(device: &wgpu::Device, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: std::mem::size_of::<Content>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        UniformBuffer {
            buffer,
            cache: UploadCache::default(),
            content_type: PhantomData,
        }
    }

    pub fn with_content(device: &wgpu::Device, label: &str, content: &Content) -> Self {
        let bytes = bytemuck::bytes_of(content);
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytes,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let mut cache = UploadCache::default();
        cache.replace(bytes);
        UniformBuffer {
            buffer,
            cache,
            content_type: PhantomData,
        }
    }

    /// Writes `content` unless it matches the last upload
    pub fn update_content(&mut self, queue: &wgpu::Queue, content: Content) {
        let bytes = bytemuck::bytes_of(&content);
        if self.cache.replace(bytes) {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }
}
