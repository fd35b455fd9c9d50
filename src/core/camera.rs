//! Camera and the per-frame camera snapshot consumed by culling

use crate::core::types::{Mat4, Vec3};

/// Perspective camera described by an eye point and a target
#[derive(Clone, Copy, Debug)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    /// Width / height
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn look_at(eye: Vec3, target: Vec3, up: Vec3) -> Self {
        Self {
            eye,
            target,
            up,
            fov_y: 60.0_f32.to_radians(),
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }

    /// Camera circling `center` at `radius`, `height` above it, `angle`
    /// radians around the y axis from +x
    pub fn orbit(center: Vec3, radius: f32, height: f32, angle: f32) -> Self {
        let eye = center + Vec3::new(angle.cos() * radius, height, angle.sin() * radius);
        Self::look_at(eye, center, Vec3::Y)
    }

    pub fn with_far(mut self, far: f32) -> Self {
        self.far = far;
        self
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, self.up)
    }

    /// wgpu clip space (depth 0..1)
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Snapshot the matrices the culling pass needs this frame
    pub fn state(&self) -> CameraState {
        CameraState {
            view: self.view_matrix(),
            projection: self.projection_matrix(),
            position: self.eye,
        }
    }
}

/// Camera matrices queried once per frame from the host
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraState {
    /// World-to-view matrix
    pub view: Mat4,
    /// View-to-clip matrix (wgpu depth range 0..1)
    pub projection: Mat4,
    /// World position, used for distance cutoffs and LOD selection
    pub position: Vec3,
}

impl CameraState {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }
}
