//! Robot loading: chain description fetch, mesh resolution, model assembly

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use tracing::{debug, info};

use crate::mesh::{MeshData, MeshError, MeshRegistry, primitive};
use crate::path::{FileInfo, PathError};
use crate::robot::{JointKind, Pose, RobotJoint, RobotLink, RobotModel};

/// Uploaded mesh files, keyed by bare file name.
pub type FileMap = HashMap<String, Vec<u8>>;

/// Fallback link color when neither the visual nor the material table
/// declares one.
const DEFAULT_COLOR: [f32; 4] = [0.7, 0.7, 0.7, 1.0];

/// Where the chain description comes from.
#[derive(Debug, Clone)]
pub enum RobotSource {
    /// URDF file on disk; mesh references resolve relative to its directory.
    Path(PathBuf),
    /// URDF over HTTP(S); mesh references resolve relative to its URL.
    Url(String),
    /// Literal URDF document; mesh references resolve relative to the
    /// working directory unless files were uploaded.
    Literal(String),
}

/// Robot loading errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    #[error("failed to parse URDF: {0}")]
    UrdfParse(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("malformed mesh reference: {0}")]
    Path(#[from] PathError),
    #[error("failed to load mesh '{path}': {source}")]
    Mesh { path: String, source: MeshError },
    #[error("package:// URIs are not supported: {0}")]
    PackageUriNotSupported(String),
    #[error("link not found: {0}")]
    LinkNotFound(String),
    #[error("empty URDF: no links defined")]
    EmptyChain,
    #[error("chain has no root link")]
    NoRootLink,
}

/// Per-load strategy turning a mesh reference into raw bytes.
pub trait MeshFetch {
    fn fetch(&self, reference: &str, info: &FileInfo) -> Result<Vec<u8>, MeshError>;
}

/// Resolves references on disk, relative to the chain description's directory.
pub struct DiskFetch {
    pub base_dir: PathBuf,
}

impl MeshFetch for DiskFetch {
    fn fetch(&self, reference: &str, _info: &FileInfo) -> Result<Vec<u8>, MeshError> {
        let path = if Path::new(reference).is_absolute() {
            PathBuf::from(reference)
        } else {
            self.base_dir.join(reference)
        };
        std::fs::read(&path).map_err(|e| MeshError::Io(format!("{}: {}", path.display(), e)))
    }
}

/// Resolves references over HTTP, relative to the chain description's URL.
pub struct HttpFetch {
    pub base_url: String,
}

impl MeshFetch for HttpFetch {
    fn fetch(&self, reference: &str, _info: &FileInfo) -> Result<Vec<u8>, MeshError> {
        let url = if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!(
                "{}/{}",
                self.base_url.trim_end_matches('/'),
                reference.trim_start_matches("./")
            )
        };
        let mut response = ureq::get(&url)
            .call()
            .map_err(|e| MeshError::Io(e.to_string()))?;
        response
            .body_mut()
            .read_to_vec()
            .map_err(|e| MeshError::Io(e.to_string()))
    }
}

/// Serves references from caller-uploaded files, keyed by bare file name.
pub struct UploadedFetch<'a> {
    pub files: &'a FileMap,
}

impl MeshFetch for UploadedFetch<'_> {
    fn fetch(&self, _reference: &str, info: &FileInfo) -> Result<Vec<u8>, MeshError> {
        self.files
            .get(&info.file_name)
            .cloned()
            .ok_or_else(|| MeshError::MissingAsset(info.file_name.clone()))
    }
}

/// Loads a chain description plus all referenced meshes into a [`RobotModel`].
pub struct RobotLoader {
    registry: MeshRegistry,
}

impl RobotLoader {
    pub fn new() -> Self {
        Self {
            registry: MeshRegistry::default(),
        }
    }

    pub fn with_registry(registry: MeshRegistry) -> Self {
        Self { registry }
    }

    pub fn registry_mut(&mut self) -> &mut MeshRegistry {
        &mut self.registry
    }

    /// Load a robot. When `uploaded` is supplied, it replaces the source's
    /// default mesh-fetch strategy for this load only.
    ///
    /// The load completes only once the chain and every referenced mesh has
    /// resolved; any failure aborts the whole load.
    pub fn load(
        &self,
        source: &RobotSource,
        uploaded: Option<&FileMap>,
    ) -> Result<RobotModel, LoadError> {
        let (text, default_fetch) = fetch_chain(source)?;
        let robot =
            urdf_rs::read_from_string(&text).map_err(|e| LoadError::UrdfParse(e.to_string()))?;
        if robot.links.is_empty() {
            return Err(LoadError::EmptyChain);
        }

        let uploaded_fetch;
        let fetch: &dyn MeshFetch = match uploaded {
            Some(files) => {
                uploaded_fetch = UploadedFetch { files };
                &uploaded_fetch
            }
            None => default_fetch.as_ref(),
        };

        self.assemble(robot, fetch)
    }

    fn assemble(
        &self,
        robot: urdf_rs::Robot,
        fetch: &dyn MeshFetch,
    ) -> Result<RobotModel, LoadError> {
        let material_colors: HashMap<String, [f32; 4]> = robot
            .materials
            .iter()
            .filter_map(|m| m.color.as_ref().map(|c| (m.name.clone(), rgba(c))))
            .collect();

        let mut links = Vec::with_capacity(robot.links.len());
        for urdf_link in &robot.links {
            let (mesh, visual_origin, color) =
                self.process_visual(&urdf_link.visual, &material_colors, fetch)?;
            links.push(RobotLink {
                name: urdf_link.name.clone(),
                mesh,
                visual_origin,
                color,
                world_transform: Mat4::IDENTITY,
            });
        }

        let joints: Vec<RobotJoint> = robot
            .joints
            .iter()
            .map(|urdf_joint| RobotJoint {
                name: urdf_joint.name.clone(),
                kind: JointKind::from(&urdf_joint.joint_type),
                origin: Pose::from(&urdf_joint.origin),
                axis: Vec3::new(
                    urdf_joint.axis.xyz.0[0] as f32,
                    urdf_joint.axis.xyz.0[1] as f32,
                    urdf_joint.axis.xyz.0[2] as f32,
                ),
                lower: urdf_joint.limit.lower,
                upper: urdf_joint.limit.upper,
                value: 0.0,
                parent_link: urdf_joint.parent.link.clone(),
                child_link: urdf_joint.child.link.clone(),
            })
            .collect();

        let model = RobotModel::new(robot.name.clone(), joints, links)?;
        info!(
            robot = %robot.name,
            joints = model.joint_count(),
            links = model.links().len(),
            "chain description loaded"
        );
        Ok(model)
    }

    /// First visual element of a link, as mesh data plus origin and color.
    fn process_visual(
        &self,
        visuals: &[urdf_rs::Visual],
        material_colors: &HashMap<String, [f32; 4]>,
        fetch: &dyn MeshFetch,
    ) -> Result<(Option<MeshData>, Pose, [f32; 4]), LoadError> {
        let Some(visual) = visuals.first() else {
            return Ok((None, Pose::default(), DEFAULT_COLOR));
        };

        let origin = Pose::from(&visual.origin);
        let color = visual
            .material
            .as_ref()
            .and_then(|mat| {
                mat.color
                    .as_ref()
                    .map(rgba)
                    .or_else(|| material_colors.get(&mat.name).copied())
            })
            .unwrap_or(DEFAULT_COLOR);

        let mesh = match &visual.geometry {
            urdf_rs::Geometry::Mesh { filename, scale } => {
                let mut mesh = self.fetch_mesh(filename, fetch)?;
                if let Some(s) = scale {
                    mesh.apply_scale([s.0[0] as f32, s.0[1] as f32, s.0[2] as f32]);
                }
                Some(mesh)
            }
            urdf_rs::Geometry::Box { size } => Some(primitive::generate_box([
                size.0[0] as f32,
                size.0[1] as f32,
                size.0[2] as f32,
            ])),
            urdf_rs::Geometry::Cylinder { radius, length } => Some(primitive::generate_cylinder(
                *radius as f32,
                *length as f32,
            )),
            urdf_rs::Geometry::Sphere { radius } => {
                Some(primitive::generate_sphere(*radius as f32))
            }
            urdf_rs::Geometry::Capsule { radius, length } => Some(primitive::generate_capsule(
                *radius as f32,
                *length as f32,
            )),
        };

        Ok((mesh, origin, color))
    }

    fn fetch_mesh(&self, filename: &str, fetch: &dyn MeshFetch) -> Result<MeshData, LoadError> {
        let reference = normalize_reference(filename)?;
        let info = FileInfo::from_path(reference)?;
        debug!(reference = %reference, "fetching mesh");
        let bytes = fetch
            .fetch(reference, &info)
            .map_err(|source| LoadError::Mesh {
                path: filename.to_string(),
                source,
            })?;
        self.registry
            .decode(&info.file_extension, &bytes)
            .map_err(|source| LoadError::Mesh {
                path: filename.to_string(),
                source,
            })
    }
}

impl Default for RobotLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the chain description text and pick the source's default mesh-fetch
/// strategy.
fn fetch_chain(source: &RobotSource) -> Result<(String, Box<dyn MeshFetch>), LoadError> {
    match source {
        RobotSource::Path(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| LoadError::Io(format!("{}: {}", path.display(), e)))?;
            let base_dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            Ok((text, Box::new(DiskFetch { base_dir })))
        }
        RobotSource::Url(url) => {
            let mut response = ureq::get(url)
                .call()
                .map_err(|e| LoadError::Http(e.to_string()))?;
            let text = response
                .body_mut()
                .read_to_string()
                .map_err(|e| LoadError::Http(e.to_string()))?;
            let base_url = url
                .rsplit_once('/')
                .map(|(base, _)| base.to_string())
                .unwrap_or_else(|| url.clone());
            Ok((text, Box::new(HttpFetch { base_url })))
        }
        RobotSource::Literal(text) => Ok((
            text.clone(),
            Box::new(DiskFetch {
                base_dir: PathBuf::from("."),
            }),
        )),
    }
}

/// Reject `package://` references and strip `file://` prefixes.
fn normalize_reference(filename: &str) -> Result<&str, LoadError> {
    if filename.starts_with("package://") {
        return Err(LoadError::PackageUriNotSupported(filename.to_string()));
    }
    Ok(filename.strip_prefix("file://").unwrap_or(filename))
}

fn rgba(color: &urdf_rs::Color) -> [f32; 4] {
    [
        color.rgba.0[0] as f32,
        color.rgba.0[1] as f32,
        color.rgba.0[2] as f32,
        color.rgba.0[3] as f32,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::encode_stl;

    const ARM_URDF: &str = r#"
<robot name="mini_arm">
  <material name="steel">
    <color rgba="0.4 0.45 0.5 1.0"/>
  </material>
  <link name="base_link">
    <visual>
      <geometry><box size="0.2 0.2 0.1"/></geometry>
      <material name="steel"/>
    </visual>
  </link>
  <link name="upper_arm">
    <visual>
      <origin xyz="0 0 0.3" rpy="0 0 0"/>
      <geometry><cylinder radius="0.05" length="0.6"/></geometry>
    </visual>
  </link>
  <joint name="shoulder_pan" type="revolute">
    <parent link="base_link"/>
    <child link="upper_arm"/>
    <origin xyz="0 0 0.1" rpy="0 0 0"/>
    <axis xyz="0 0 1"/>
    <limit lower="-1.57" upper="1.57" effort="10" velocity="1"/>
  </joint>
</robot>
"#;

    fn mesh_urdf(filename: &str) -> String {
        format!(
            r#"
<robot name="mesh_bot">
  <link name="base_link">
    <visual>
      <geometry><mesh filename="{filename}"/></geometry>
    </visual>
  </link>
</robot>
"#
        )
    }

    #[test]
    fn test_load_literal_with_primitives() {
        let loader = RobotLoader::new();
        let model = loader
            .load(&RobotSource::Literal(ARM_URDF.to_string()), None)
            .unwrap();
        assert_eq!(model.name(), "mini_arm");
        assert_eq!(model.joint_count(), 1);
        assert_eq!(model.links().len(), 2);
        assert!(model.links()[0].mesh.is_some());
        // Named material resolved through the robot's material table.
        assert_eq!(model.links()[0].color, [0.4, 0.45, 0.5, 1.0]);
        assert_eq!(model.links()[1].color, DEFAULT_COLOR);
    }

    #[test]
    fn test_load_with_uploaded_mesh() {
        let loader = RobotLoader::new();
        let mut files = FileMap::new();
        files.insert(
            "base.stl".to_string(),
            encode_stl(&primitive::generate_box([0.1, 0.1, 0.1])),
        );
        let model = loader
            .load(
                &RobotSource::Literal(mesh_urdf("meshes/base.stl")),
                Some(&files),
            )
            .unwrap();
        let mesh = model.links()[0].mesh.as_ref().unwrap();
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn test_missing_uploaded_mesh() {
        let loader = RobotLoader::new();
        let files = FileMap::new();
        let result = loader.load(
            &RobotSource::Literal(mesh_urdf("meshes/base.stl")),
            Some(&files),
        );
        assert!(matches!(
            result,
            Err(LoadError::Mesh {
                source: MeshError::MissingAsset(_),
                ..
            })
        ));
    }

    #[test]
    fn test_unsupported_mesh_format() {
        let loader = RobotLoader::new();
        let mut files = FileMap::new();
        files.insert("base.step".to_string(), vec![0u8; 8]);
        let result = loader.load(
            &RobotSource::Literal(mesh_urdf("meshes/base.step")),
            Some(&files),
        );
        assert!(matches!(
            result,
            Err(LoadError::Mesh {
                source: MeshError::UnsupportedFormat(_),
                ..
            })
        ));
    }

    #[test]
    fn test_package_uri_is_rejected() {
        let loader = RobotLoader::new();
        let result = loader.load(
            &RobotSource::Literal(mesh_urdf("package://robot/meshes/base.stl")),
            None,
        );
        assert!(matches!(result, Err(LoadError::PackageUriNotSupported(_))));
    }

    #[test]
    fn test_mesh_reference_without_extension() {
        let loader = RobotLoader::new();
        let result = loader.load(&RobotSource::Literal(mesh_urdf("meshes/base")), None);
        assert!(matches!(result, Err(LoadError::Path(_))));
    }

    #[test]
    fn test_empty_chain() {
        let loader = RobotLoader::new();
        let result = loader.load(
            &RobotSource::Literal(r#"<robot name="empty"></robot>"#.to_string()),
            None,
        );
        assert!(matches!(result, Err(LoadError::EmptyChain)));
    }

    #[test]
    fn test_mesh_scale_applied() {
        let loader = RobotLoader::new();
        let mut files = FileMap::new();
        files.insert(
            "base.stl".to_string(),
            encode_stl(&primitive::generate_box([1.0, 1.0, 1.0])),
        );
        let urdf = r#"
<robot name="scaled">
  <link name="base_link">
    <visual>
      <geometry><mesh filename="base.stl" scale="2 2 2"/></geometry>
    </visual>
  </link>
</robot>
"#;
        let model = loader
            .load(&RobotSource::Literal(urdf.to_string()), Some(&files))
            .unwrap();
        let mesh = model.links()[0].mesh.as_ref().unwrap();
        assert!((mesh.bbox_max.x - 1.0).abs() < 1e-6);
    }
}
