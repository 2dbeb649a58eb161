//! STL mesh decoding

use std::io::Cursor;

use super::normals::face_normal;
use super::{MeshData, MeshDecoder, MeshError};

/// Triangle-soup (STL) decoder, binary and ASCII.
pub struct StlDecoder;

impl MeshDecoder for StlDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<MeshData, MeshError> {
        let mut reader = Cursor::new(bytes);
        let mesh = stl_io::read_stl(&mut reader).map_err(|e| MeshError::Parse(e.to_string()))?;

        if mesh.faces.is_empty() {
            return Err(MeshError::EmptyMesh);
        }

        let vertices: Vec<[f32; 3]> = mesh
            .vertices
            .iter()
            .map(|v| [v[0], v[1], v[2]])
            .collect();

        let mut normals = Vec::with_capacity(mesh.faces.len());
        let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
        for face in &mesh.faces {
            let n = [face.normal[0], face.normal[1], face.normal[2]];
            // Some exporters write zero normals; recompute those.
            let normal = if n == [0.0, 0.0, 0.0] {
                face_normal(
                    vertices[face.vertices[0]],
                    vertices[face.vertices[1]],
                    vertices[face.vertices[2]],
                )
            } else {
                n
            };
            normals.push(normal);
            for &idx in &face.vertices {
                indices.push(idx as u32);
            }
        }

        Ok(MeshData::new(vertices, normals, indices))
    }
}

/// Encode a mesh as binary STL. Test fixture helper.
#[cfg(test)]
pub(crate) fn encode_stl(mesh: &MeshData) -> Vec<u8> {
    let triangles: Vec<stl_io::Triangle> = mesh
        .indices
        .chunks(3)
        .enumerate()
        .map(|(i, chunk)| {
            let v0 = mesh.vertices[chunk[0] as usize];
            let v1 = mesh.vertices[chunk[1] as usize];
            let v2 = mesh.vertices[chunk[2] as usize];
            let normal = mesh
                .normals
                .get(i)
                .copied()
                .unwrap_or_else(|| face_normal(v0, v1, v2));
            stl_io::Triangle {
                normal: stl_io::Normal::new(normal),
                vertices: [
                    stl_io::Vertex::new(v0),
                    stl_io::Vertex::new(v1),
                    stl_io::Vertex::new(v2),
                ],
            }
        })
        .collect();

    let mut buf = Vec::new();
    stl_io::write_stl(&mut Cursor::new(&mut buf), triangles.iter()).unwrap();
    buf
}
