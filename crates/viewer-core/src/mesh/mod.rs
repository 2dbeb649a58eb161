//! Mesh decoding and format dispatch
//!
//! Decoders turn raw mesh file bytes into [`MeshData`]; the registry maps
//! file extensions to decoders and is open to registration of further
//! formats.

mod collada;
mod normals;
mod obj;
pub mod primitive;
mod stl;

use std::collections::HashMap;

use glam::Vec3;

use crate::path::FileInfo;

pub use collada::ColladaDecoder;
pub use obj::ObjDecoder;
pub use stl::StlDecoder;

#[cfg(test)]
pub(crate) use stl::encode_stl;

/// Renderable triangle mesh produced by a decoder.
///
/// Normals are per-face (one per index triple).
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    pub bbox_min: Vec3,
    pub bbox_max: Vec3,
}

impl MeshData {
    pub fn new(vertices: Vec<[f32; 3]>, normals: Vec<[f32; 3]>, indices: Vec<u32>) -> Self {
        let mut mesh = Self {
            vertices,
            normals,
            indices,
            bbox_min: Vec3::ZERO,
            bbox_max: Vec3::ZERO,
        };
        mesh.calculate_bounding_box();
        mesh
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Scale vertices in place (URDF mesh `scale` attribute).
    pub fn apply_scale(&mut self, scale: [f32; 3]) {
        for vertex in &mut self.vertices {
            vertex[0] *= scale[0];
            vertex[1] *= scale[1];
            vertex[2] *= scale[2];
        }
        self.calculate_bounding_box();
    }

    fn calculate_bounding_box(&mut self) {
        let mut min = Vec3::splat(f32::MAX);
        let mut max = Vec3::splat(f32::MIN);
        for vertex in &self.vertices {
            min = min.min(Vec3::from(*vertex));
            max = max.max(Vec3::from(*vertex));
        }
        if self.vertices.is_empty() {
            min = Vec3::ZERO;
            max = Vec3::ZERO;
        }
        self.bbox_min = min;
        self.bbox_max = max;
    }
}

/// Mesh resolution errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum MeshError {
    #[error("uploaded files do not contain '{0}'")]
    MissingAsset(String),
    #[error("unsupported mesh format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to parse mesh: {0}")]
    Parse(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("mesh contains no geometry")]
    EmptyMesh,
}

/// Decodes one mesh file format from raw bytes.
pub trait MeshDecoder: Send + Sync {
    fn decode(&self, bytes: &[u8]) -> Result<MeshData, MeshError>;
}

/// Extension-keyed decoder registry.
pub struct MeshRegistry {
    decoders: HashMap<String, Box<dyn MeshDecoder>>,
}

impl MeshRegistry {
    /// A registry with no formats registered.
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// A registry with the built-in formats: STL, COLLADA and OBJ.
    pub fn with_default_formats() -> Self {
        let mut registry = Self::empty();
        registry.register("stl", Box::new(StlDecoder));
        registry.register("dae", Box::new(ColladaDecoder));
        registry.register("obj", Box::new(ObjDecoder));
        registry
    }

    /// Register a decoder for an extension, replacing any existing one.
    pub fn register(&mut self, extension: &str, decoder: Box<dyn MeshDecoder>) {
        self.decoders
            .insert(extension.to_ascii_lowercase(), decoder);
    }

    pub fn supports(&self, extension: &str) -> bool {
        self.decoders.contains_key(&extension.to_ascii_lowercase())
    }

    /// Dispatch to the decoder registered for `extension`.
    pub fn decode(&self, extension: &str, bytes: &[u8]) -> Result<MeshData, MeshError> {
        let decoder = self
            .decoders
            .get(&extension.to_ascii_lowercase())
            .ok_or_else(|| MeshError::UnsupportedFormat(extension.to_string()))?;
        decoder.decode(bytes)
    }
}

impl Default for MeshRegistry {
    fn default() -> Self {
        Self::with_default_formats()
    }
}

/// Resolve a mesh reference against user-uploaded files.
///
/// Looks the file name up in `files`, then dispatches by extension.
pub fn resolve_mesh(
    info: &FileInfo,
    files: &HashMap<String, Vec<u8>>,
    registry: &MeshRegistry,
) -> Result<MeshData, MeshError> {
    let bytes = files
        .get(&info.file_name)
        .ok_or_else(|| MeshError::MissingAsset(info.file_name.clone()))?;
    registry.decode(&info.file_extension, bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uploaded_cube() -> HashMap<String, Vec<u8>> {
        let mesh = primitive::generate_box([1.0, 1.0, 1.0]);
        let mut files = HashMap::new();
        files.insert("cube.stl".to_string(), stl::encode_stl(&mesh));
        files
    }

    #[test]
    fn test_resolve_mesh_missing_asset() {
        let registry = MeshRegistry::default();
        let info = FileInfo::from_path("meshes/missing.stl").unwrap();
        let result = resolve_mesh(&info, &uploaded_cube(), &registry);
        assert!(matches!(result, Err(MeshError::MissingAsset(_))));
    }

    #[test]
    fn test_resolve_mesh_unsupported_format() {
        let registry = MeshRegistry::default();
        let mut files = uploaded_cube();
        files.insert("cube.step".to_string(), vec![0u8; 4]);
        let info = FileInfo::from_path("meshes/cube.step").unwrap();
        let result = resolve_mesh(&info, &files, &registry);
        assert!(matches!(result, Err(MeshError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_resolve_mesh_decodes_uploaded_stl() {
        let registry = MeshRegistry::default();
        let info = FileInfo::from_path("meshes/cube.stl").unwrap();
        let mesh = resolve_mesh(&info, &uploaded_cube(), &registry).unwrap();
        assert_eq!(mesh.triangle_count(), 12);
        assert!(mesh.bbox_max.x > mesh.bbox_min.x);
    }

    #[test]
    fn test_registry_is_open_to_registration() {
        struct NullDecoder;
        impl MeshDecoder for NullDecoder {
            fn decode(&self, _bytes: &[u8]) -> Result<MeshData, MeshError> {
                Err(MeshError::EmptyMesh)
            }
        }

        let mut registry = MeshRegistry::empty();
        assert!(!registry.supports("ply"));
        registry.register("PLY", Box::new(NullDecoder));
        assert!(registry.supports("ply"));
        assert!(matches!(
            registry.decode("ply", &[]),
            Err(MeshError::EmptyMesh)
        ));
    }

    #[test]
    fn test_apply_scale_rescales_bounds() {
        let mut mesh = primitive::generate_box([1.0, 1.0, 1.0]);
        mesh.apply_scale([2.0, 1.0, 0.5]);
        assert!((mesh.bbox_max.x - 1.0).abs() < 1e-6);
        assert!((mesh.bbox_max.y - 0.5).abs() < 1e-6);
        assert!((mesh.bbox_max.z - 0.25).abs() < 1e-6);
    }
}
