//! Procedural meshes for URDF primitive geometries

use std::f32::consts::TAU;

use super::MeshData;
use super::normals::calculate_face_normals;

const CYLINDER_SEGMENTS: u32 = 32;
const SPHERE_RINGS: u32 = 16;
const SPHERE_SEGMENTS: u32 = 24;

/// Axis-aligned box centered at the origin.
pub fn generate_box(size: [f32; 3]) -> MeshData {
    let hx = size[0] * 0.5;
    let hy = size[1] * 0.5;
    let hz = size[2] * 0.5;

    let vertices = vec![
        [-hx, -hy, -hz],
        [hx, -hy, -hz],
        [hx, hy, -hz],
        [-hx, hy, -hz],
        [-hx, -hy, hz],
        [hx, -hy, hz],
        [hx, hy, hz],
        [-hx, hy, hz],
    ];

    let indices = vec![
        0, 2, 1, 0, 3, 2, // -z
        4, 5, 6, 4, 6, 7, // +z
        0, 1, 5, 0, 5, 4, // -y
        2, 3, 7, 2, 7, 6, // +y
        0, 4, 7, 0, 7, 3, // -x
        1, 2, 6, 1, 6, 5, // +x
    ];

    let normals = calculate_face_normals(&vertices, &indices);
    MeshData::new(vertices, normals, indices)
}

/// Cylinder along the Z axis, centered at the origin.
pub fn generate_cylinder(radius: f32, length: f32) -> MeshData {
    let n = CYLINDER_SEGMENTS;
    let h = length * 0.5;

    let mut vertices = Vec::with_capacity((n as usize) * 2 + 2);
    for ring_z in [-h, h] {
        for i in 0..n {
            let angle = TAU * i as f32 / n as f32;
            vertices.push([radius * angle.cos(), radius * angle.sin(), ring_z]);
        }
    }
    let bottom_center = vertices.len() as u32;
    vertices.push([0.0, 0.0, -h]);
    let top_center = vertices.len() as u32;
    vertices.push([0.0, 0.0, h]);

    let mut indices = Vec::new();
    for i in 0..n {
        let j = (i + 1) % n;
        // Side
        indices.extend_from_slice(&[i, j, n + i]);
        indices.extend_from_slice(&[j, n + j, n + i]);
        // Caps
        indices.extend_from_slice(&[bottom_center, j, i]);
        indices.extend_from_slice(&[top_center, n + i, n + j]);
    }

    let normals = calculate_face_normals(&vertices, &indices);
    MeshData::new(vertices, normals, indices)
}

/// UV sphere centered at the origin.
pub fn generate_sphere(radius: f32) -> MeshData {
    let rings = SPHERE_RINGS;
    let segments = SPHERE_SEGMENTS;

    let mut vertices = Vec::with_capacity(((rings + 1) * segments) as usize);
    for ring in 0..=rings {
        let phi = std::f32::consts::PI * ring as f32 / rings as f32;
        for segment in 0..segments {
            let theta = TAU * segment as f32 / segments as f32;
            vertices.push([
                radius * phi.sin() * theta.cos(),
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
            ]);
        }
    }

    let index = |ring: u32, segment: u32| ring * segments + segment % segments;
    let mut indices = Vec::new();
    for ring in 0..rings {
        for segment in 0..segments {
            let a = index(ring, segment);
            let b = index(ring + 1, segment);
            let c = index(ring + 1, segment + 1);
            let d = index(ring, segment + 1);
            if ring + 1 < rings {
                indices.extend_from_slice(&[a, b, c]);
            }
            if ring > 0 {
                indices.extend_from_slice(&[a, c, d]);
            }
        }
    }

    let normals = calculate_face_normals(&vertices, &indices);
    MeshData::new(vertices, normals, indices)
}

/// Capsule approximated as a cylinder of the same radius and length.
pub fn generate_capsule(radius: f32, length: f32) -> MeshData {
    generate_cylinder(radius, length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_dimensions() {
        let mesh = generate_box([1.0, 2.0, 4.0]);
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.triangle_count(), 12);
        assert!((mesh.bbox_max.y - 1.0).abs() < 1e-6);
        assert!((mesh.bbox_max.z - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_cylinder_bounds() {
        let mesh = generate_cylinder(0.5, 2.0);
        assert!((mesh.bbox_max.z - 1.0).abs() < 1e-6);
        assert!((mesh.bbox_max.x - 0.5).abs() < 1e-3);
        assert_eq!(mesh.normals.len(), mesh.triangle_count());
    }

    #[test]
    fn test_sphere_bounds() {
        let mesh = generate_sphere(0.25);
        assert!((mesh.bbox_max.x - 0.25).abs() < 1e-2);
        assert!((mesh.bbox_min.z + 0.25).abs() < 1e-2);
        assert_eq!(mesh.normals.len(), mesh.triangle_count());
    }
}
