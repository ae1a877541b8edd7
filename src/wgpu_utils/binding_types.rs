// src/wgpu_utils/binding_types.rs
//! Binding types used by the room's bind group layouts

/// Plain uniform buffer, bound without dynamic offsets
pub fn uniform() -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: None,
    }
}

/// Filtering sampler for color maps, comparison sampler for shadow lookups
pub fn sampler(kind: wgpu::SamplerBindingType) -> wgpu::BindingType {
    wgpu::BindingType::Sampler(kind)
}

/// Filterable color texture, e.g. a material's base color map
pub fn texture_2d() -> wgpu::BindingType {
    color_texture(wgpu::TextureViewDimension::D2)
}

/// Depth array used for layered shadow maps
pub fn depth_texture_2d_array() -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Depth,
        view_dimension: wgpu::TextureViewDimension::D2Array,
        multisampled: false,
    }
}

fn color_texture(view_dimension: wgpu::TextureViewDimension) -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable: true },
        view_dimension,
        multisampled: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadow_bindings() {
        assert!(matches!(
            depth_texture_2d_array(),
            wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Depth,
                view_dimension: wgpu::TextureViewDimension::D2Array,
                ..
            }
        ));
        assert_eq!(
            sampler(wgpu::SamplerBindingType::Comparison),
            wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison)
        );
    }
}
