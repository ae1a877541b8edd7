//! GPU resource management
//!
//! Materials, textures and the global uniform block shared by all draws.

pub mod global_bindings;
pub mod material;
pub mod texture_resource;

pub use global_bindings::{update_global_ubo, GlobalBindings, GlobalUBO, GlobalUBOContent};
pub use material::{color_from_hex, Material, MaterialId, MaterialManager, Side};
pub use texture_resource::{TextureImage, TextureResource};
