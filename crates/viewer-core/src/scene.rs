//! Narrow interface the controller drives the rendering collaborator through

use std::sync::Arc;

use glam::Mat4;
use parking_lot::Mutex;

use crate::framing::CameraFrame;
use crate::mesh::MeshData;

/// One renderable node of a loaded robot: a link with geometry.
#[derive(Debug, Clone)]
pub struct SceneNode {
    pub name: String,
    pub mesh: MeshData,
    pub transform: Mat4,
    pub color: [f32; 4],
    pub cast_shadow: bool,
}

/// Scene-graph operations the controller needs from the renderer.
pub trait SceneGraph {
    /// Attach a robot's nodes under `robot_name`.
    fn add(&mut self, robot_name: &str, nodes: Vec<SceneNode>);
    /// Remove a robot and all of its nodes. Returns whether it existed.
    fn remove(&mut self, robot_name: &str) -> bool;
    fn contains(&self, robot_name: &str) -> bool;
    /// Update the world transform of one node of a robot.
    fn set_node_transform(&mut self, robot_name: &str, node_name: &str, transform: Mat4);
    /// Re-aim the orbit camera at a freshly framed view.
    fn frame_camera(&mut self, frame: CameraFrame);
}

impl<S: SceneGraph> SceneGraph for Arc<Mutex<S>> {
    fn add(&mut self, robot_name: &str, nodes: Vec<SceneNode>) {
        self.lock().add(robot_name, nodes);
    }

    fn remove(&mut self, robot_name: &str) -> bool {
        self.lock().remove(robot_name)
    }

    fn contains(&self, robot_name: &str) -> bool {
        self.lock().contains(robot_name)
    }

    fn set_node_transform(&mut self, robot_name: &str, node_name: &str, transform: Mat4) {
        self.lock().set_node_transform(robot_name, node_name, transform);
    }

    fn frame_camera(&mut self, frame: CameraFrame) {
        self.lock().frame_camera(frame);
    }
}
