//! GPU mesh upload

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use viewer_core::MeshData;

/// Vertex layout shared by the mesh pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    pub const LAYOUT: wgpu::VertexBufferLayout<'static> = wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[
            wgpu::VertexAttribute {
                offset: 0,
                shader_location: 0,
                format: wgpu::VertexFormat::Float32x3,
            },
            wgpu::VertexAttribute {
                offset: 12,
                shader_location: 1,
                format: wgpu::VertexFormat::Float32x3,
            },
        ],
    };
}

/// A mesh expanded into a flat triangle list and uploaded to the GPU.
///
/// Core meshes carry one normal per face; flattening duplicates vertices so
/// the shading stays faceted without a separate normal stream.
pub struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub vertex_count: u32,
}

impl GpuMesh {
    pub fn new(device: &wgpu::Device, mesh: &MeshData) -> Self {
        let vertices = flatten(mesh);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        Self {
            vertex_buffer,
            vertex_count: vertices.len() as u32,
        }
    }
}

fn flatten(mesh: &MeshData) -> Vec<Vertex> {
    let mut vertices = Vec::with_capacity(mesh.indices.len());
    for (face, chunk) in mesh.indices.chunks(3).enumerate() {
        if chunk.len() != 3 {
            continue;
        }
        let normal = mesh.normals.get(face).copied().unwrap_or([0.0, 0.0, 1.0]);
        for &idx in chunk {
            vertices.push(Vertex {
                position: mesh.vertices[idx as usize],
                normal,
            });
        }
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewer_core::mesh::primitive;

    #[test]
    fn test_flatten_duplicates_per_face() {
        let mesh = primitive::generate_box([1.0, 1.0, 1.0]);
        let vertices = flatten(&mesh);
        assert_eq!(vertices.len(), mesh.triangle_count() * 3);
        // All three corners of a face share its normal.
        assert_eq!(vertices[0].normal, vertices[1].normal);
        assert_eq!(vertices[0].normal, vertices[2].normal);
    }
}
