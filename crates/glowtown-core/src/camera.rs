//! First-person fly camera

use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Near clipping plane
pub const NEAR_PLANE: f32 = 0.1;
/// Far clipping plane
pub const FAR_PLANE: f32 = 100.0;

const MIN_ZOOM: f32 = 1.0;
const MAX_ZOOM: f32 = 45.0;
const PITCH_LIMIT: f32 = 89.0;

/// Keyboard movement direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraMovement {
    Forward,
    Backward,
    Left,
    Right,
}

/// The persisted part of the camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPose {
    pub position: Vec3,
    /// Degrees, -90 looks down -Z
    pub yaw: f32,
    /// Degrees
    pub pitch: f32,
    /// Vertical field of view in degrees
    pub zoom: f32,
}

impl Default for CameraPose {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            yaw: -90.0,
            pitch: 0.0,
            zoom: MAX_ZOOM,
        }
    }
}

/// A yaw/pitch camera driven by WASD, mouse look and scroll zoom
#[derive(Debug, Clone)]
pub struct FirstPersonCamera {
    pub position: Vec3,
    pub front: Vec3,
    pub up: Vec3,
    pub right: Vec3,
    pub world_up: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub movement_speed: f32,
    pub mouse_sensitivity: f32,
    pub zoom: f32,
}

impl Default for FirstPersonCamera {
    fn default() -> Self {
        Self::from_pose(CameraPose::default())
    }
}

impl FirstPersonCamera {
    pub fn from_pose(pose: CameraPose) -> Self {
        let mut camera = Self {
            position: pose.position,
            front: Vec3::NEG_Z,
            up: Vec3::Y,
            right: Vec3::X,
            world_up: Vec3::Y,
            yaw: pose.yaw,
            pitch: pose.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT),
            movement_speed: 2.5,
            mouse_sensitivity: 0.1,
            zoom: pose.zoom.clamp(MIN_ZOOM, MAX_ZOOM),
        };
        camera.update_vectors();
        camera
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            yaw: self.yaw,
            pitch: self.pitch,
            zoom: self.zoom,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, self.up)
    }

    /// View matrix with the translation removed, for the skybox
    pub fn rotation_only_view(&self) -> Mat4 {
        Mat4::from_mat3(Mat3::from_mat4(self.view_matrix()))
    }

    /// Perspective projection with wgpu's [0, 1] depth range
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.zoom.to_radians(), aspect, NEAR_PLANE, FAR_PLANE)
    }

    pub fn process_keyboard(&mut self, direction: CameraMovement, delta_time: f32) {
        let velocity = self.movement_speed * delta_time;
        match direction {
            CameraMovement::Forward => self.position += self.front * velocity,
            CameraMovement::Backward => self.position -= self.front * velocity,
            CameraMovement::Left => self.position -= self.right * velocity,
            CameraMovement::Right => self.position += self.right * velocity,
        }
    }

    /// Apply a mouse delta in pixels. `y_offset` is positive when the mouse moves up.
    pub fn process_mouse_movement(&mut self, x_offset: f32, y_offset: f32, constrain_pitch: bool) {
        self.yaw += x_offset * self.mouse_sensitivity;
        self.pitch += y_offset * self.mouse_sensitivity;

        if constrain_pitch {
            self.pitch = self.pitch.clamp(-PITCH_LIMIT, PITCH_LIMIT);
        }

        self.update_vectors();
    }

    pub fn process_mouse_scroll(&mut self, y_offset: f32) {
        self.zoom = (self.zoom - y_offset).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    fn update_vectors(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(yaw.cos() * pitch.cos(), pitch.sin(), yaw.sin() * pitch.cos())
            .normalize();
        self.right = self.front.cross(self.world_up).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_camera_looks_down_negative_z() {
        let camera = FirstPersonCamera::default();
        assert!((camera.front - Vec3::NEG_Z).length() < 1e-5);
        assert!((camera.right - Vec3::X).length() < 1e-5);
        assert_eq!(camera.position, Vec3::new(0.0, 0.0, 3.0));
    }

    #[test]
    fn keyboard_moves_along_front_and_right() {
        let mut camera = FirstPersonCamera::default();
        camera.process_keyboard(CameraMovement::Forward, 1.0);
        assert!((camera.position - Vec3::new(0.0, 0.0, 0.5)).length() < 1e-5);
        camera.process_keyboard(CameraMovement::Right, 2.0);
        assert!((camera.position - Vec3::new(5.0, 0.0, 0.5)).length() < 1e-5);
    }

    #[test]
    fn pitch_is_constrained() {
        let mut camera = FirstPersonCamera::default();
        camera.process_mouse_movement(0.0, 10_000.0, true);
        assert_eq!(camera.pitch, 89.0);
        camera.process_mouse_movement(0.0, -20_000.0, true);
        assert_eq!(camera.pitch, -89.0);
    }

    #[test]
    fn zoom_is_clamped() {
        let mut camera = FirstPersonCamera::default();
        camera.process_mouse_scroll(100.0);
        assert_eq!(camera.zoom, 1.0);
        camera.process_mouse_scroll(-100.0);
        assert_eq!(camera.zoom, 45.0);
    }

    #[test]
    fn pose_round_trips() {
        let pose = CameraPose {
            position: Vec3::new(1.0, 2.0, 3.0),
            yaw: 30.0,
            pitch: -10.0,
            zoom: 20.0,
        };
        let camera = FirstPersonCamera::from_pose(pose);
        assert_eq!(camera.pose(), pose);
    }

    #[test]
    fn skybox_view_has_no_translation() {
        let camera = FirstPersonCamera::from_pose(CameraPose {
            position: Vec3::new(10.0, -4.0, 7.0),
            ..Default::default()
        });
        let view = camera.rotation_only_view();
        assert_eq!(view.w_axis.truncate(), Vec3::ZERO);
    }

    #[test]
    fn projection_maps_near_plane_to_zero_depth() {
        let camera = FirstPersonCamera::default();
        let near_point = glam::Vec4::new(0.0, 0.0, -NEAR_PLANE, 1.0);
        let clip = camera.projection_matrix(16.0 / 9.0) * near_point;
        assert!((clip.z / clip.w).abs() < 1e-5);
    }
}
