use std::ops::Mul;

use glam::{DMat3, DMat4, DQuat, DVec3};

use crate::GeometryError;

const QUAT_NORM_EPS: f64 = 1e-12;

/// Convert a COLMAP `[qw, qx, qy, qz]` quaternion into a glam quaternion.
pub fn qvec_to_quat(qvec: &[f64; 4]) -> DQuat {
    DQuat::from_xyzw(qvec[1], qvec[2], qvec[3], qvec[0])
}

/// Convert a glam quaternion into COLMAP `[qw, qx, qy, qz]` order.
pub fn quat_to_qvec(q: &DQuat) -> [f64; 4] {
    [q.w, q.x, q.y, q.z]
}

/// Compute the rotation matrix of a quaternion.
///
/// The quaternion is normalized first, so any non-zero scalar multiple maps to the
/// same rotation.
///
/// # Arguments
///
/// * `q` - The quaternion.
///
/// # Returns
///
/// The 3x3 rotation matrix.
pub fn quaternion_to_matrix(q: &DQuat) -> Result<DMat3, GeometryError> {
    let norm = q.length();
    if !norm.is_finite() || norm < QUAT_NORM_EPS {
        return Err(GeometryError::DegenerateQuaternion(norm));
    }
    Ok(DMat3::from_quat(*q / norm))
}

/// Compute the quaternion of a rotation matrix.
///
/// `q` and `-q` are the same rotation; the result is returned with a non-negative
/// `w`, but callers must not rely on matching the sign of an input quaternion.
///
/// PRECONDITION: `r` is orthonormal with determinant +1.
pub fn matrix_to_quaternion(r: &DMat3) -> DQuat {
    let q = DQuat::from_mat3(r).normalize();
    if q.w < 0.0 {
        -q
    } else {
        q
    }
}

/// Camera position in world space from world-to-camera parameters: `-Rᵀ t`.
pub fn camera_center(rotation: &DMat3, translation: &DVec3) -> DVec3 {
    -(rotation.transpose() * *translation)
}

/// Invert a rigid transform: `(R, t) -> (Rᵀ, -Rᵀ t)`.
///
/// Maps world-to-camera parameters to camera-to-world and back.
pub fn invert_rigid(rotation: &DMat3, translation: &DVec3) -> (DMat3, DVec3) {
    let rotation_t = rotation.transpose();
    (rotation_t, -(rotation_t * *translation))
}

/// A rigid transform `x -> R x + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rigid3 {
    /// Rotation part
    pub rotation: DMat3,
    /// Translation part
    pub translation: DVec3,
}

impl Rigid3 {
    /// The identity transform.
    pub const IDENTITY: Self = Self {
        rotation: DMat3::IDENTITY,
        translation: DVec3::ZERO,
    };

    /// Create from a rotation matrix and translation.
    pub fn new(rotation: DMat3, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Create from COLMAP `qvec` (`w, x, y, z`) and `tvec`.
    pub fn from_colmap(qvec: [f64; 4], tvec: [f64; 3]) -> Result<Self, GeometryError> {
        Ok(Self {
            rotation: quaternion_to_matrix(&qvec_to_quat(&qvec))?,
            translation: DVec3::from_array(tvec),
        })
    }

    /// Express as COLMAP `qvec` (`w, x, y, z`) and `tvec`.
    pub fn to_colmap(&self) -> ([f64; 4], [f64; 3]) {
        (
            quat_to_qvec(&matrix_to_quaternion(&self.rotation)),
            self.translation.to_array(),
        )
    }

    /// The inverse transform.
    pub fn inverse(&self) -> Self {
        let (rotation, translation) = invert_rigid(&self.rotation, &self.translation);
        Self {
            rotation,
            translation,
        }
    }

    /// Position of the origin of the source frame expressed in the target frame of
    /// the inverse, i.e. the camera center for a world-to-camera transform.
    pub fn center(&self) -> DVec3 {
        camera_center(&self.rotation, &self.translation)
    }

    /// Apply the transform to a point.
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }

    /// Homogeneous 4x4 matrix.
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_cols(
            self.rotation.x_axis.extend(0.0),
            self.rotation.y_axis.extend(0.0),
            self.rotation.z_axis.extend(0.0),
            self.translation.extend(1.0),
        )
    }

    /// Read the upper 3x4 block of a homogeneous matrix.
    ///
    /// PRECONDITION: the 3x3 block is a rotation.
    pub fn from_matrix(matrix: &DMat4) -> Self {
        Self {
            rotation: DMat3::from_mat4(*matrix),
            translation: matrix.w_axis.truncate(),
        }
    }
}

impl Mul for Rigid3 {
    type Output = Rigid3;

    fn mul(self, rhs: Self) -> Self::Output {
        Self {
            rotation: self.rotation * rhs.rotation,
            translation: self.rotation * rhs.translation + self.translation,
        }
    }
}
