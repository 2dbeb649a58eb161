//! URDF Viewer Core
//!
//! This crate contains the robot-loading and joint-state logic:
//! - Path/name utilities for mesh references
//! - Mesh decoding and extension-keyed format dispatch
//! - RobotModel: the loaded chain and its forward kinematics
//! - Joint limit derivation and angle application
//! - Camera framing from loaded geometry bounds
//! - ViewerController: single owner of the current robot

pub mod controller;
pub mod framing;
pub mod joints;
pub mod loader;
pub mod mesh;
pub mod path;
pub mod robot;
pub mod scene;

pub use controller::*;
pub use framing::*;
pub use joints::*;
pub use loader::*;
pub use mesh::*;
pub use path::*;
pub use robot::*;
pub use scene::*;
