//! Orbit camera

use glam::{Mat4, Vec3};

use viewer_core::CameraFrame;

const MIN_PITCH: f32 = -1.54;
const MAX_PITCH: f32 = 1.54;
const MIN_DISTANCE: f32 = 0.05;

/// Camera uniform passed to every pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    pub view_proj: [[f32; 4]; 4],
}

/// Camera orbiting a target point at yaw/pitch/distance.
pub struct OrbitCamera {
    pub target: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub distance: f32,
    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl OrbitCamera {
    pub fn new(aspect: f32) -> Self {
        Self {
            target: Vec3::ZERO,
            yaw: std::f32::consts::FRAC_PI_4,
            pitch: 0.6,
            distance: 3.0,
            fov_y: 45f32 * std::f32::consts::PI / 180.0,
            aspect,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Camera position in world space.
    pub fn eye(&self) -> Vec3 {
        let offset = Vec3::new(
            self.distance * self.pitch.cos() * self.yaw.sin(),
            self.distance * self.pitch.sin(),
            self.distance * self.pitch.cos() * self.yaw.cos(),
        );
        self.target + offset
    }

    pub fn view_proj(&self) -> Mat4 {
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        let proj = Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far);
        proj * view
    }

    pub fn uniform(&self) -> CameraUniform {
        CameraUniform {
            view_proj: self.view_proj().to_cols_array_2d(),
        }
    }

    /// Rotate around the target by screen-space deltas.
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw -= delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(MIN_PITCH, MAX_PITCH);
    }

    /// Scale the orbit distance; factors below 1.0 zoom in.
    pub fn zoom(&mut self, factor: f32) {
        self.distance = (self.distance * factor).max(MIN_DISTANCE);
    }

    pub fn update_aspect(&mut self, aspect: f32) {
        self.aspect = aspect;
    }

    /// Re-aim at a framed view: pivot to the target, back off to distance.
    pub fn apply_frame(&mut self, frame: CameraFrame) {
        self.target = frame.target;
        self.distance = frame.distance.max(MIN_DISTANCE);
    }
}
