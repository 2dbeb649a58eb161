//! URDF Viewer Renderer
//!
//! WGPU scene graph for the viewer: named robot nodes, orbit camera,
//! ground grid and planar shadows.

pub mod camera;
pub mod grid;
pub mod mesh;
pub mod renderer;

pub use camera::*;
pub use renderer::*;
