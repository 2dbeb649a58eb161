//! Joint limit derivation and angle input types

use std::collections::HashMap;

use rand::Rng;

use crate::robot::RobotModel;

/// Range substituted for joints that declare no limits.
const UNBOUNDED_RANGE: (i32, i32) = (-180, 180);

/// Per-joint limits and current angle, degrees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JointInfo {
    pub name: String,
    pub lower: i32,
    pub upper: i32,
    pub degree: i32,
}

/// Derive one [`JointInfo`] per joint, in the chain's declaration order.
///
/// Declared limits are converted from radians to degrees and rounded to the
/// nearest integer. A joint whose converted limits are both zero is treated
/// as unbounded and gets [-180, 180] instead; a true zero-width range is
/// indistinguishable from "no limit declared" under this policy. The
/// initial degree is drawn uniformly from the resulting inclusive range.
pub fn build_joint_infos<R: Rng>(robot: &RobotModel, rng: &mut R) -> Vec<JointInfo> {
    robot
        .joints()
        .iter()
        .map(|joint| {
            let mut lower = joint.lower.to_degrees().round() as i32;
            let mut upper = joint.upper.to_degrees().round() as i32;
            if lower == 0 && upper == 0 {
                (lower, upper) = UNBOUNDED_RANGE;
            }
            // Malformed chains can declare lower > upper; don't panic on them.
            let degree = if lower >= upper {
                lower
            } else {
                rng.gen_range(lower..=upper)
            };
            JointInfo {
                name: joint.name.clone(),
                lower,
                upper,
                degree,
            }
        })
        .collect()
}

/// Joint angle input, aligned by declaration index or by joint name. Degrees.
#[derive(Debug, Clone)]
pub enum JointAngles {
    Positional(Vec<f64>),
    Named(HashMap<String, f64>),
}

impl JointAngles {
    /// Positional angles taken from a joint info sequence.
    pub fn from_infos(infos: &[JointInfo]) -> Self {
        Self::Positional(infos.iter().map(|info| info.degree as f64).collect())
    }
}

/// Joint actuation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum JointError {
    #[error("angle array has {actual} entries but the robot has {expected} joints")]
    IndexMismatch { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use glam::{Mat4, Vec3};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::robot::{JointKind, Pose, RobotJoint, RobotLink};

    fn chain(limits: &[(f64, f64)]) -> RobotModel {
        let mut links = vec![RobotLink {
            name: "link0".to_string(),
            mesh: None,
            visual_origin: Pose::default(),
            color: [0.7, 0.7, 0.7, 1.0],
            world_transform: Mat4::IDENTITY,
        }];
        let mut joints = Vec::new();
        for (idx, &(lower, upper)) in limits.iter().enumerate() {
            links.push(RobotLink {
                name: format!("link{}", idx + 1),
                mesh: None,
                visual_origin: Pose::default(),
                color: [0.7, 0.7, 0.7, 1.0],
                world_transform: Mat4::IDENTITY,
            });
            joints.push(RobotJoint {
                name: format!("joint{idx}"),
                kind: JointKind::Revolute,
                origin: Pose::default(),
                axis: Vec3::Z,
                lower,
                upper,
                value: 0.0,
                parent_link: format!("link{idx}"),
                child_link: format!("link{}", idx + 1),
            });
        }
        RobotModel::new("chain", joints, links).unwrap()
    }

    #[test]
    fn test_one_info_per_joint_in_order() {
        let robot = chain(&[(-1.0, 1.0), (0.0, 2.0), (-0.5, 0.5)]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let infos = build_joint_infos(&robot, &mut rng);
        assert_eq!(infos.len(), 3);
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, ["joint0", "joint1", "joint2"]);
    }

    #[test]
    fn test_limits_converted_and_rounded() {
        let robot = chain(&[(-std::f64::consts::PI, std::f64::consts::FRAC_PI_2)]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let infos = build_joint_infos(&robot, &mut rng);
        assert_eq!(infos[0].lower, -180);
        assert_eq!(infos[0].upper, 90);
    }

    #[test]
    fn test_unbounded_joint_substitution() {
        let robot = chain(&[(0.0, 0.0)]);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let infos = build_joint_infos(&robot, &mut rng);
        assert_eq!(infos[0].lower, -180);
        assert_eq!(infos[0].upper, 180);
    }

    #[test]
    fn test_initial_degree_within_limits() {
        let robot = chain(&[(-1.0, 1.0), (0.0, 0.0), (0.1, 0.2)]);
        for seed in 0..64 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for info in build_joint_infos(&robot, &mut rng) {
                assert!(info.lower <= info.degree && info.degree <= info.upper);
            }
        }
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let robot = chain(&[(-2.0, 2.0), (0.0, 0.0)]);
        let infos_a = build_joint_infos(&robot, &mut ChaCha8Rng::seed_from_u64(42));
        let infos_b = build_joint_infos(&robot, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(infos_a, infos_b);
    }
}
