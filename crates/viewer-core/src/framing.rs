//! Camera framing derived from loaded geometry bounds

use glam::Vec3;

/// Margin so the framed robot does not touch the viewport edges.
const FIT_MARGIN: f32 = 1.25;

/// Sphere enclosing all visible geometry of a loaded model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn from_aabb(min: Vec3, max: Vec3) -> Self {
        let center = (min + max) * 0.5;
        Self {
            center,
            radius: (max - center).length(),
        }
    }
}

/// Orbit placement that keeps a bounding sphere fully in view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    /// Orbit pivot, the bounding center.
    pub target: Vec3,
    /// Distance from the pivot to the camera.
    pub distance: f32,
}

/// Derive the orbit distance and pivot for a bounding sphere.
///
/// The distance scales linearly with the bounding radius so robots of any
/// size fill a comparable share of the viewport.
pub fn frame_camera(bounds: BoundingSphere, fov_y_radians: f32) -> CameraFrame {
    let radius = bounds.radius.max(f32::EPSILON);
    CameraFrame {
        target: bounds.center,
        distance: radius / (fov_y_radians * 0.5).sin() * FIT_MARGIN,
    }
}
