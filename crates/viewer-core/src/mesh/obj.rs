//! OBJ mesh decoding

use std::io::{BufReader, Cursor};

use super::normals::calculate_face_normals;
use super::{MeshData, MeshDecoder, MeshError};

/// Wavefront OBJ decoder. Material libraries are ignored.
pub struct ObjDecoder;

impl MeshDecoder for ObjDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<MeshData, MeshError> {
        let mut reader = BufReader::new(Cursor::new(bytes));
        let (models, _materials) = tobj::load_obj_buf(
            &mut reader,
            &tobj::LoadOptions {
                triangulate: true,
                single_index: true,
                ..Default::default()
            },
            |_| Err(tobj::LoadError::OpenFileFailed),
        )
        .map_err(|e| MeshError::Parse(e.to_string()))?;

        if models.is_empty() {
            return Err(MeshError::EmptyMesh);
        }

        // Combine all models into one mesh.
        let mut vertices: Vec<[f32; 3]> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        for model in &models {
            let mesh = &model.mesh;
            let vertex_offset = vertices.len() as u32;

            for chunk in mesh.positions.chunks(3) {
                if chunk.len() == 3 {
                    vertices.push([chunk[0], chunk[1], chunk[2]]);
                }
            }
            for &idx in &mesh.indices {
                indices.push(vertex_offset + idx);
            }
        }

        if indices.is_empty() {
            return Err(MeshError::EmptyMesh);
        }

        let normals = calculate_face_normals(&vertices, &indices);
        Ok(MeshData::new(vertices, normals, indices))
    }
}
