//! Techno Room
//!
//! An interactive 3D room rendered with wgpu and winit: textured walls under
//! a layered light rig with fog, an animated glTF model, extruded neon text
//! typed from the keyboard and a field of floating crystals.

pub mod app;
pub mod assets;
pub mod config;
pub mod error;
pub mod gfx;
pub mod room;
pub mod wgpu_utils;

pub use app::TechnoRoomApp;
