//! Placement of the static scene objects

use glam::{Mat3, Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Translation plus uniform scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObjectTransform {
    pub position: Vec3,
    pub scale: f32,
}

impl Default for ObjectTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            scale: 1.0,
        }
    }
}

impl ObjectTransform {
    pub fn new(position: Vec3, scale: f32) -> Self {
        Self { position, scale }
    }

    /// Model matrix: translate, then scale
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_translation(self.position) * Mat4::from_scale(Vec3::splat(self.scale))
    }
}

/// Inverse-transpose of the upper 3x3, padded to a 4x4 for uniform upload.
/// Falls back to identity for degenerate (zero-scale) matrices.
pub fn normal_matrix(model: Mat4) -> Mat4 {
    let m = Mat3::from_mat4(model);
    if m.determinant().abs() < f32::EPSILON {
        return Mat4::IDENTITY;
    }
    Mat4::from_mat3(m.inverse().transpose())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_scales_then_translates_points() {
        let t = ObjectTransform::new(Vec3::new(1.0, 2.0, 3.0), 0.5);
        let p = t.matrix().transform_point3(Vec3::new(2.0, 0.0, 0.0));
        assert!((p - Vec3::new(2.0, 2.0, 3.0)).length() < 1e-6);
    }

    #[test]
    fn normal_matrix_of_uniform_scale_preserves_direction() {
        let t = ObjectTransform::new(Vec3::new(5.0, 0.0, 0.0), 0.1);
        let n = normal_matrix(t.matrix()).transform_vector3(Vec3::Y).normalize();
        assert!((n - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn degenerate_scale_gives_identity_normal_matrix() {
        let t = ObjectTransform::new(Vec3::ZERO, 0.0);
        assert_eq!(normal_matrix(t.matrix()), Mat4::IDENTITY);
    }
}
