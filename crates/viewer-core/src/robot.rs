//! Loaded kinematic chain: joints, links, forward kinematics

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};

use crate::framing::BoundingSphere;
use crate::loader::LoadError;
use crate::mesh::MeshData;

/// Link or joint origin: xyz translation plus rpy rotation (radians).
#[derive(Debug, Clone, Copy, Default)]
pub struct Pose {
    pub xyz: [f32; 3],
    pub rpy: [f32; 3],
}

impl Pose {
    pub fn new(xyz: [f32; 3], rpy: [f32; 3]) -> Self {
        Self { xyz, rpy }
    }

    pub fn to_mat4(&self) -> Mat4 {
        let translation = Vec3::from(self.xyz);
        let rotation = Quat::from_euler(glam::EulerRot::XYZ, self.rpy[0], self.rpy[1], self.rpy[2]);
        Mat4::from_rotation_translation(rotation, translation)
    }
}

impl From<&urdf_rs::Pose> for Pose {
    fn from(urdf_pose: &urdf_rs::Pose) -> Self {
        Self {
            xyz: [
                urdf_pose.xyz.0[0] as f32,
                urdf_pose.xyz.0[1] as f32,
                urdf_pose.xyz.0[2] as f32,
            ],
            rpy: [
                urdf_pose.rpy.0[0] as f32,
                urdf_pose.rpy.0[1] as f32,
                urdf_pose.rpy.0[2] as f32,
            ],
        }
    }
}

/// Joint kind, mapped from the chain description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JointKind {
    Fixed,
    Revolute,
    Continuous,
    Prismatic,
    Floating,
    Planar,
}

impl From<&urdf_rs::JointType> for JointKind {
    fn from(urdf_type: &urdf_rs::JointType) -> Self {
        match urdf_type {
            urdf_rs::JointType::Fixed => JointKind::Fixed,
            urdf_rs::JointType::Revolute => JointKind::Revolute,
            urdf_rs::JointType::Continuous => JointKind::Continuous,
            urdf_rs::JointType::Prismatic => JointKind::Prismatic,
            urdf_rs::JointType::Floating => JointKind::Floating,
            urdf_rs::JointType::Planar => JointKind::Planar,
            urdf_rs::JointType::Spherical => JointKind::Floating,
        }
    }
}

/// One joint of the loaded chain.
#[derive(Debug, Clone)]
pub struct RobotJoint {
    pub name: String,
    pub kind: JointKind,
    pub origin: Pose,
    pub axis: Vec3,
    /// Declared limits, radians.
    pub lower: f64,
    pub upper: f64,
    /// Current actuation value, radians.
    pub value: f64,
    pub parent_link: String,
    pub child_link: String,
}

impl RobotJoint {
    pub fn is_movable(&self) -> bool {
        matches!(
            self.kind,
            JointKind::Revolute | JointKind::Continuous | JointKind::Prismatic
        )
    }

    /// Transform from the parent link frame to the child link frame at the
    /// joint's current value.
    fn local_transform(&self) -> Mat4 {
        let motion = match self.kind {
            JointKind::Revolute | JointKind::Continuous => {
                Mat4::from_quat(Quat::from_axis_angle(self.axis, self.value as f32))
            }
            JointKind::Prismatic => Mat4::from_translation(self.axis * self.value as f32),
            JointKind::Fixed | JointKind::Floating | JointKind::Planar => Mat4::IDENTITY,
        };
        self.origin.to_mat4() * motion
    }
}

/// One link of the loaded chain.
#[derive(Debug, Clone)]
pub struct RobotLink {
    pub name: String,
    pub mesh: Option<MeshData>,
    pub visual_origin: Pose,
    pub color: [f32; 4],
    pub world_transform: Mat4,
}

impl RobotLink {
    /// World transform of the link's renderable geometry.
    pub fn node_transform(&self) -> Mat4 {
        self.world_transform * self.visual_origin.to_mat4()
    }
}

/// A loaded robot: ordered joints, links and their kinematic structure.
#[derive(Debug, Clone)]
pub struct RobotModel {
    name: String,
    joints: Vec<RobotJoint>,
    joint_index: HashMap<String, usize>,
    links: Vec<RobotLink>,
    /// link index -> (joint index, child link index)
    children: HashMap<usize, Vec<(usize, usize)>>,
    /// link index -> joint index leading into it
    parent: HashMap<usize, usize>,
    root_link: usize,
    root_transform: Mat4,
}

impl RobotModel {
    /// Assemble a model from joints and links in declaration order.
    ///
    /// The root link is the one that is not the child of any joint.
    pub fn new(
        name: impl Into<String>,
        joints: Vec<RobotJoint>,
        links: Vec<RobotLink>,
    ) -> Result<Self, LoadError> {
        if links.is_empty() {
            return Err(LoadError::EmptyChain);
        }

        let link_index: HashMap<String, usize> = links
            .iter()
            .enumerate()
            .map(|(idx, link)| (link.name.clone(), idx))
            .collect();
        let joint_index: HashMap<String, usize> = joints
            .iter()
            .enumerate()
            .map(|(idx, joint)| (joint.name.clone(), idx))
            .collect();

        let mut children: HashMap<usize, Vec<(usize, usize)>> = HashMap::new();
        let mut parent: HashMap<usize, usize> = HashMap::new();
        for (joint_idx, joint) in joints.iter().enumerate() {
            let parent_idx = *link_index
                .get(&joint.parent_link)
                .ok_or_else(|| LoadError::LinkNotFound(joint.parent_link.clone()))?;
            let child_idx = *link_index
                .get(&joint.child_link)
                .ok_or_else(|| LoadError::LinkNotFound(joint.child_link.clone()))?;
            children
                .entry(parent_idx)
                .or_default()
                .push((joint_idx, child_idx));
            parent.insert(child_idx, joint_idx);
        }

        let root_link = (0..links.len())
            .find(|idx| !parent.contains_key(idx))
            .ok_or(LoadError::NoRootLink)?;

        let mut model = Self {
            name: name.into(),
            joints,
            joint_index,
            links,
            children,
            parent,
            root_link,
            root_transform: Mat4::IDENTITY,
        };
        model.update_world_transforms();
        Ok(model)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn joints(&self) -> &[RobotJoint] {
        &self.joints
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Joint names in declaration order.
    pub fn joint_names(&self) -> Vec<String> {
        self.joints.iter().map(|j| j.name.clone()).collect()
    }

    pub fn links(&self) -> &[RobotLink] {
        &self.links
    }

    /// Transform applied above the root link (display convention).
    pub fn set_root_transform(&mut self, transform: Mat4) {
        self.root_transform = transform;
        self.update_world_transforms();
    }

    /// Set a joint's actuation value in radians, by name.
    ///
    /// Returns false for unknown joints; values on non-movable joints are
    /// ignored.
    pub fn set_joint_value(&mut self, name: &str, radians: f64) -> bool {
        let Some(&idx) = self.joint_index.get(name) else {
            return false;
        };
        self.set_joint_value_at(idx, radians)
    }

    /// Set a joint's actuation value in radians, by declaration index.
    pub fn set_joint_value_at(&mut self, index: usize, radians: f64) -> bool {
        let Some(joint) = self.joints.get_mut(index) else {
            return false;
        };
        if !joint.is_movable() {
            return false;
        }
        joint.value = radians;
        true
    }

    pub fn joint_value(&self, name: &str) -> Option<f64> {
        self.joint_index.get(name).map(|&idx| self.joints[idx].value)
    }

    /// Recompute every link's world transform from the current joint values.
    pub fn update_world_transforms(&mut self) {
        let mut stack = vec![(self.root_link, self.root_transform)];
        while let Some((link_idx, parent_transform)) = stack.pop() {
            let transform = match self.parent.get(&link_idx) {
                Some(&joint_idx) => parent_transform * self.joints[joint_idx].local_transform(),
                None => parent_transform,
            };
            self.links[link_idx].world_transform = transform;

            if let Some(children) = self.children.get(&link_idx) {
                for &(_, child_idx) in children {
                    stack.push((child_idx, transform));
                }
            }
        }
    }

    /// World-space node transforms for every link with geometry.
    pub fn node_transforms(&self) -> Vec<(String, Mat4)> {
        self.links
            .iter()
            .filter(|link| link.mesh.is_some())
            .map(|link| (link.name.clone(), link.node_transform()))
            .collect()
    }

    /// Axis-aligned bounds of all link geometry in world space.
    pub fn bounding_box(&self) -> (Vec3, Vec3) {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        let mut any = false;
        for link in &self.links {
            let Some(mesh) = &link.mesh else {
                continue;
            };
            any = true;
            let transform = link.node_transform();
            for corner in aabb_corners(mesh.bbox_min, mesh.bbox_max) {
                let p = transform.transform_point3(corner);
                min = min.min(p);
                max = max.max(p);
            }
        }
        if !any {
            return (Vec3::ZERO, Vec3::ZERO);
        }
        (min, max)
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        let (min, max) = self.bounding_box();
        BoundingSphere::from_aabb(min, max)
    }
}

fn aabb_corners(min: Vec3, max: Vec3) -> [Vec3; 8] {
    [
        Vec3::new(min.x, min.y, min.z),
        Vec3::new(max.x, min.y, min.z),
        Vec3::new(min.x, max.y, min.z),
        Vec3::new(max.x, max.y, min.z),
        Vec3::new(min.x, min.y, max.z),
        Vec3::new(max.x, min.y, max.z),
        Vec3::new(min.x, max.y, max.z),
        Vec3::new(max.x, max.y, max.z),
    ]
}
