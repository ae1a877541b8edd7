//! # Scene Management Module
//!
//! Objects, lights and materials making up what gets rendered.
//!
//! - [`Scene`] - container owning objects, materials, the light rig and the camera
//! - [`Object`] - meshes sharing a transform and a material
//! - [`LightRig`] - ambient, directional, spot and point lights plus fog
//! - [`Vertex3D`] - GPU vertex format
//!
//! Objects are addressed by [`ObjectId`] and can be put in named groups,
//! which is how content that is rebuilt wholesale (like typed text) gets
//! swapped out without touching the rest of the scene.

pub mod lights;
pub mod object;
pub mod scene;
pub mod vertex;

pub use lights::{AmbientLight, DirectionalLight, Fog, LightRig, PointLight, SpotLight};
pub use object::{DrawObject, Mesh, Object, Transform};
pub use scene::{ObjectId, Scene};
pub use vertex::Vertex3D;
