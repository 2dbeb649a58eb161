//! COLLADA (.dae) mesh decoding

use std::io::Cursor;

use dae_parser::{
    ArrayKind, Document, FloatArray, Geometry, Primitive, Semantic, Source, Vertices,
};

use super::normals::calculate_face_normals;
use super::{MeshData, MeshDecoder, MeshError};

/// COLLADA decoder. Reads `<triangles>` primitives from every geometry in
/// the document; other primitive kinds are skipped.
pub struct ColladaDecoder;

impl MeshDecoder for ColladaDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<MeshData, MeshError> {
        let doc = Document::from_reader(Cursor::new(bytes))
            .map_err(|e| MeshError::Parse(format!("{e:?}")))?;

        let sources = doc
            .local_map::<Source>()
            .map_err(|e| MeshError::Parse(format!("{e:?}")))?;
        let vertices_map = doc
            .local_map::<Vertices>()
            .map_err(|e| MeshError::Parse(format!("{e:?}")))?;

        let mut vertices: Vec<[f32; 3]> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();

        for geometry in doc.iter::<Geometry>() {
            let Some(mesh) = geometry.element.as_mesh() else {
                continue;
            };

            for element in &mesh.elements {
                let Primitive::Triangles(triangles) = element else {
                    continue;
                };
                let Some(prim) = triangles.data.prim.as_deref() else {
                    continue;
                };

                let inputs = &*triangles.inputs;
                let stride = inputs
                    .iter()
                    .map(|input| input.offset as usize)
                    .max()
                    .map_or(1, |max| max + 1);
                let vertex_input = inputs
                    .iter()
                    .find(|input| input.semantic == Semantic::Vertex)
                    .ok_or_else(|| MeshError::Parse("triangles without VERTEX input".into()))?;
                let offset = vertex_input.offset as usize;

                let verts = vertices_map
                    .get_raw(&vertex_input.source)
                    .ok_or_else(|| MeshError::Parse("unresolved vertices source".into()))?;
                let positions = sources
                    .get_raw(&verts.position_input().source)
                    .ok_or_else(|| MeshError::Parse("unresolved position source".into()))?;
                let array = positions
                    .array
                    .as_ref()
                    .and_then(FloatArray::from_array_element)
                    .ok_or_else(|| MeshError::Parse("position source is not a float array".into()))?;

                let vertex_offset = vertices.len() as u32;
                for chunk in array.chunks(3) {
                    if chunk.len() == 3 {
                        vertices.push([chunk[0], chunk[1], chunk[2]]);
                    }
                }
                for vertex in prim.chunks(stride) {
                    indices.push(vertex_offset + vertex[offset]);
                }
            }
        }

        if indices.is_empty() {
            return Err(MeshError::EmptyMesh);
        }

        let normals = calculate_face_normals(&vertices, &indices);
        Ok(MeshData::new(vertices, normals, indices))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Minimal single-triangle COLLADA document.
    const TRIANGLE_DAE: &str = r##"<?xml version="1.0" encoding="utf-8"?>
<COLLADA xmlns="http://www.collada.org/2005/11/COLLADASchema" version="1.4.1">
  <asset>
    <created>2024-01-01T00:00:00</created>
    <modified>2024-01-01T00:00:00</modified>
  </asset>
  <library_geometries>
    <geometry id="tri-mesh" name="tri">
      <mesh>
        <source id="tri-positions">
          <float_array id="tri-positions-array" count="9">0 0 0 1 0 0 0 1 0</float_array>
          <technique_common>
            <accessor source="#tri-positions-array" count="3" stride="3">
              <param name="X" type="float"/>
              <param name="Y" type="float"/>
              <param name="Z" type="float"/>
            </accessor>
          </technique_common>
        </source>
        <vertices id="tri-vertices">
          <input semantic="POSITION" source="#tri-positions"/>
        </vertices>
        <triangles count="1">
          <input semantic="VERTEX" source="#tri-vertices" offset="0"/>
          <p>0 1 2</p>
        </triangles>
      </mesh>
    </geometry>
  </library_geometries>
  <scene/>
</COLLADA>
"##;

    #[test]
    fn test_decode_triangle() {
        let mesh = ColladaDecoder.decode(TRIANGLE_DAE.as_bytes()).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.normals[0], [0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_decode_rejects_non_xml() {
        let result = ColladaDecoder.decode(&[0u8, 1, 2, 3]);
        assert!(matches!(result, Err(MeshError::Parse(_))));
    }
}
