//! Viewer controller: single owner of the current robot and scene handle

use glam::Mat4;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::framing::frame_camera;
use crate::joints::{JointAngles, JointError, JointInfo, build_joint_infos};
use crate::loader::{FileMap, LoadError, RobotLoader, RobotSource};
use crate::robot::RobotModel;
use crate::scene::{SceneGraph, SceneNode};

/// Vertical field of view the framing math assumes, radians.
const DEFAULT_FOV_Y: f32 = 45.0 * std::f32::consts::PI / 180.0;

/// Called with the freshly derived joint infos on every successful install.
pub type JointObserver = Box<dyn Fn(&[JointInfo]) + Send>;

/// A completed load, stamped with the generation current when it began.
///
/// Loads are not cancelled; a completion whose stamp no longer matches the
/// controller's counter is detected in [`ViewerController::install`] and
/// discarded, so the most recent request wins regardless of completion order.
pub struct LoadOutcome {
    pub generation: u64,
    pub result: Result<RobotModel, LoadError>,
}

struct CurrentRobot {
    model: RobotModel,
    infos: Vec<JointInfo>,
}

/// Owns the current robot, the scene handle, the pose RNG and the load
/// generation counter.
pub struct ViewerController<S: SceneGraph> {
    scene: S,
    loader: RobotLoader,
    current: Option<CurrentRobot>,
    generation: u64,
    observer: Option<JointObserver>,
    rng: StdRng,
    fov_y: f32,
}

impl<S: SceneGraph> ViewerController<S> {
    pub fn new(scene: S) -> Self {
        Self::with_rng(scene, StdRng::from_entropy())
    }

    /// Controller with a deterministic initial-pose RNG.
    pub fn with_seed(scene: S, seed: u64) -> Self {
        Self::with_rng(scene, StdRng::seed_from_u64(seed))
    }

    fn with_rng(scene: S, rng: StdRng) -> Self {
        Self {
            scene,
            loader: RobotLoader::new(),
            current: None,
            generation: 0,
            observer: None,
            rng,
            fov_y: DEFAULT_FOV_Y,
        }
    }

    pub fn set_observer(&mut self, observer: JointObserver) {
        self.observer = Some(observer);
    }

    /// Align framing with the render camera's vertical field of view.
    pub fn set_fov_y(&mut self, fov_y_radians: f32) {
        self.fov_y = fov_y_radians;
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn robot_name(&self) -> Option<&str> {
        self.current.as_ref().map(|c| c.model.name())
    }

    pub fn joint_infos(&self) -> Option<&[JointInfo]> {
        self.current.as_ref().map(|c| c.infos.as_slice())
    }

    /// Begin a load: tear down the current robot and bump the generation.
    ///
    /// Returns the stamp a worker must attach to its [`LoadOutcome`].
    pub fn begin_load(&mut self) -> u64 {
        if let Some(old) = self.current.take() {
            self.scene.remove(old.model.name());
        }
        self.generation += 1;
        self.generation
    }

    /// Load a robot synchronously and install it.
    pub fn load_robot(
        &mut self,
        source: &RobotSource,
        uploaded: Option<&FileMap>,
    ) -> Result<(), LoadError> {
        let generation = self.begin_load();
        let result = self.loader.load(source, uploaded);
        self.install(LoadOutcome { generation, result })?;
        Ok(())
    }

    /// Install a completed load. Returns whether it was installed; stale
    /// generations are discarded.
    pub fn install(&mut self, outcome: LoadOutcome) -> Result<bool, LoadError> {
        if outcome.generation != self.generation {
            warn!(
                stamped = outcome.generation,
                current = self.generation,
                "discarding stale load completion"
            );
            return Ok(false);
        }
        let mut model = outcome.result?;

        // The scene may never hold two robots with the same name.
        if self.scene.contains(model.name()) {
            self.scene.remove(model.name());
        }

        // The chain's up axis is Z, the scene's is Y.
        model.set_root_transform(Mat4::from_rotation_x(-std::f32::consts::FRAC_PI_2));

        let infos = build_joint_infos(&model, &mut self.rng);
        if let Some(observer) = &self.observer {
            observer(&infos);
        }

        self.scene.frame_camera(frame_camera(model.bounding_sphere(), self.fov_y));
        self.scene.add(model.name(), scene_nodes(&model));
        info!(
            robot = %model.name(),
            joints = model.joint_count(),
            "robot attached to scene"
        );

        self.current = Some(CurrentRobot { model, infos });
        Ok(true)
    }

    /// Apply joint angles in degrees, by declaration index or by name.
    ///
    /// A no-op when no robot is loaded. Positional input shorter than the
    /// joint count is an error; joints absent from a named input are left
    /// unchanged.
    pub fn apply_joint_angles(&mut self, angles: &JointAngles) -> Result<(), JointError> {
        let Some(current) = self.current.as_mut() else {
            return Ok(());
        };
        let model = &mut current.model;

        match angles {
            JointAngles::Positional(values) => {
                if values.len() < model.joint_count() {
                    return Err(JointError::IndexMismatch {
                        expected: model.joint_count(),
                        actual: values.len(),
                    });
                }
                for index in 0..model.joint_count() {
                    model.set_joint_value_at(index, values[index].to_radians());
                }
            }
            JointAngles::Named(map) => {
                for (name, degrees) in map {
                    model.set_joint_value(name, degrees.to_radians());
                }
            }
        }

        model.update_world_transforms();
        let robot_name = model.name().to_string();
        let transforms = model.node_transforms();
        for (node_name, transform) in transforms {
            self.scene
                .set_node_transform(&robot_name, &node_name, transform);
        }
        Ok(())
    }

    /// Re-frame the camera on the current robot's bounds.
    pub fn refresh_framing(&mut self) {
        if let Some(current) = &self.current {
            self.scene
                .frame_camera(frame_camera(current.model.bounding_sphere(), self.fov_y));
        }
    }
}

/// Shadow-casting scene nodes for every link with geometry.
fn scene_nodes(model: &RobotModel) -> Vec<SceneNode> {
    model
        .links()
        .iter()
        .filter_map(|link| {
            link.mesh.as_ref().map(|mesh| SceneNode {
                name: link.name.clone(),
                mesh: mesh.clone(),
                transform: link.node_transform(),
                color: link.color,
                cast_shadow: true,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::framing::CameraFrame;

    const ARM_URDF: &str = r#"
<robot name="mini_arm">
  <link name="base_link">
    <visual><geometry><box size="0.2 0.2 0.1"/></geometry></visual>
  </link>
  <link name="upper_arm">
    <visual><geometry><cylinder radius="0.05" length="0.6"/></geometry></visual>
  </link>
  <joint name="shoulder_pan" type="revolute">
    <parent link="base_link"/>
    <child link="upper_arm"/>
    <origin xyz="0 0 0.1" rpy="0 0 0"/>
    <axis xyz="0 0 1"/>
    <limit lower="-1.57" upper="1.57" effort="10" velocity="1"/>
  </joint>
  <joint name="elbow" type="continuous">
    <parent link="upper_arm"/>
    <child link="forearm"/>
    <origin xyz="0 0 0.6" rpy="0 0 0"/>
    <axis xyz="0 1 0"/>
  </joint>
  <link name="forearm">
    <visual><geometry><cylinder radius="0.04" length="0.4"/></geometry></visual>
  </link>
</robot>
"#;

    #[derive(Default)]
    struct RecordingScene {
        robots: HashMap<String, Vec<SceneNode>>,
        most_robots_at_once: usize,
        frames: Vec<CameraFrame>,
        transform_updates: Vec<(String, String, Mat4)>,
    }

    impl SceneGraph for RecordingScene {
        fn add(&mut self, robot_name: &str, nodes: Vec<SceneNode>) {
            self.robots.insert(robot_name.to_string(), nodes);
            self.most_robots_at_once = self.most_robots_at_once.max(self.robots.len());
        }

        fn remove(&mut self, robot_name: &str) -> bool {
            self.robots.remove(robot_name).is_some()
        }

        fn contains(&self, robot_name: &str) -> bool {
            self.robots.contains_key(robot_name)
        }

        fn set_node_transform(&mut self, robot_name: &str, node_name: &str, transform: Mat4) {
            self.transform_updates.push((
                robot_name.to_string(),
                node_name.to_string(),
                transform,
            ));
        }

        fn frame_camera(&mut self, frame: CameraFrame) {
            self.frames.push(frame);
        }
    }

    fn load_arm(controller: &mut ViewerController<RecordingScene>) {
        controller
            .load_robot(&RobotSource::Literal(ARM_URDF.to_string()), None)
            .unwrap();
    }

    #[test]
    fn test_load_attaches_shadow_casting_nodes() {
        let mut controller = ViewerController::with_seed(RecordingScene::default(), 1);
        load_arm(&mut controller);
        let scene = controller.scene();
        let nodes = &scene.robots["mini_arm"];
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().all(|n| n.cast_shadow));
        assert_eq!(scene.frames.len(), 1);
        assert!(scene.frames[0].distance > 0.0);
    }

    #[test]
    fn test_reload_never_keeps_two_robots() {
        let mut controller = ViewerController::with_seed(RecordingScene::default(), 1);
        load_arm(&mut controller);
        load_arm(&mut controller);
        let scene = controller.scene();
        assert_eq!(scene.robots.len(), 1);
        assert_eq!(scene.most_robots_at_once, 1);
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut controller = ViewerController::with_seed(RecordingScene::default(), 1);
        let loader = RobotLoader::new();

        let stale = controller.begin_load();
        let stale_result = loader.load(&RobotSource::Literal(ARM_URDF.to_string()), None);
        // A newer request supersedes the first before it completes.
        load_arm(&mut controller);

        let installed = controller
            .install(LoadOutcome {
                generation: stale,
                result: stale_result,
            })
            .unwrap();
        assert!(!installed);
        assert_eq!(controller.scene().robots.len(), 1);
    }

    #[test]
    fn test_failed_load_leaves_scene_empty() {
        let mut controller = ViewerController::with_seed(RecordingScene::default(), 1);
        let result = controller.load_robot(
            &RobotSource::Literal("<robot name=\"broken\"></robot>".to_string()),
            None,
        );
        assert!(result.is_err());
        assert!(controller.scene().robots.is_empty());
        assert!(controller.joint_infos().is_none());
    }

    #[test]
    fn test_observer_receives_joint_infos() {
        let mut controller = ViewerController::with_seed(RecordingScene::default(), 1);
        let seen = Arc::new(AtomicUsize::new(0));
        let seen_clone = Arc::clone(&seen);
        controller.set_observer(Box::new(move |infos| {
            seen_clone.store(infos.len(), Ordering::SeqCst);
        }));
        load_arm(&mut controller);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_apply_angles_without_robot_is_a_noop() {
        let mut controller = ViewerController::with_seed(RecordingScene::default(), 1);
        let result = controller.apply_joint_angles(&JointAngles::Positional(vec![10.0, 20.0]));
        assert!(result.is_ok());
        assert!(controller.scene().transform_updates.is_empty());
    }

    #[test]
    fn test_apply_angles_short_array_is_an_error() {
        let mut controller = ViewerController::with_seed(RecordingScene::default(), 1);
        load_arm(&mut controller);
        let result = controller.apply_joint_angles(&JointAngles::Positional(vec![10.0]));
        assert!(matches!(
            result,
            Err(JointError::IndexMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_apply_positional_angles() {
        let mut controller = ViewerController::with_seed(RecordingScene::default(), 1);
        load_arm(&mut controller);
        controller
            .apply_joint_angles(&JointAngles::Positional(vec![90.0, -45.0]))
            .unwrap();
        let current = controller.current.as_ref().unwrap();
        assert!(
            (current.model.joint_value("shoulder_pan").unwrap() - 90f64.to_radians()).abs()
                < 1e-12
        );
        assert!(
            (current.model.joint_value("elbow").unwrap() - (-45f64).to_radians()).abs() < 1e-12
        );
        // Every geometry node got a fresh transform.
        assert_eq!(controller.scene().transform_updates.len(), 3);
    }

    #[test]
    fn test_apply_named_angles_leaves_others_unchanged() {
        let mut controller = ViewerController::with_seed(RecordingScene::default(), 1);
        load_arm(&mut controller);
        let mut named = HashMap::new();
        named.insert("elbow".to_string(), 30.0);
        named.insert("no_such_joint".to_string(), 99.0);
        controller
            .apply_joint_angles(&JointAngles::Named(named))
            .unwrap();
        let current = controller.current.as_ref().unwrap();
        assert_eq!(current.model.joint_value("shoulder_pan"), Some(0.0));
        assert!(
            (current.model.joint_value("elbow").unwrap() - 30f64.to_radians()).abs() < 1e-12
        );
    }

    #[test]
    fn test_shared_scene_handle() {
        let scene = Arc::new(Mutex::new(RecordingScene::default()));
        let mut controller = ViewerController::with_seed(Arc::clone(&scene), 1);
        controller
            .load_robot(&RobotSource::Literal(ARM_URDF.to_string()), None)
            .unwrap();
        assert!(scene.lock().contains("mini_arm"));
    }
}
