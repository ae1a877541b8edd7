//! # Graphics Module
//!
//! Everything between room state and pixels.
//!
//! - **Camera System** ([`camera`]) - damped orbit camera and its input controller
//! - **Geometry** ([`geometry`]) - box faces, octahedra and extruded glyph meshes
//! - **Rendering Pipeline** ([`rendering`]) - PBR forward rendering with layered shadow maps
//! - **Scene Management** ([`scene`]) - objects, groups and the light rig
//! - **Resource Management** ([`resources`]) - materials, textures and global uniforms
//!
//! ```no_run
//! use techno_room::gfx::{RenderEngine, scene::Scene};
//!
//! // let render_engine = pollster::block_on(RenderEngine::new(window, width, height))?;
//! // render_engine.render_frame(&mut scene)?;
//! ```

pub mod camera;
pub mod geometry;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use camera::orbit_camera::OrbitCamera;
pub use rendering::render_engine::RenderEngine;
