use glam::{DMat3, DMat4, DQuat, DVec3};

use crate::{pose::matrix_to_quaternion, GeometryError};

const AXIS_EPS: f64 = 1e-12;

/// Split the 3x3 block of `matrix` into per-axis scale and an orthonormal rotation.
///
/// Columns are normalized by their lengths, then re-orthonormalized so that shear
/// introduced by non-uniform parent scaling does not leak into the rotation. A
/// mirrored basis is folded into a negative x scale.
pub fn decompose_scaled_rotation(matrix: &DMat4) -> Result<(DVec3, DMat3), GeometryError> {
    if !matrix.is_finite() {
        return Err(GeometryError::NonFinite);
    }
    let block = DMat3::from_mat4(*matrix);
    let mut scale = DVec3::new(
        block.x_axis.length(),
        block.y_axis.length(),
        block.z_axis.length(),
    );
    for axis in 0..3 {
        if scale[axis] < AXIS_EPS {
            return Err(GeometryError::DegenerateAxis {
                axis,
                length: scale[axis],
            });
        }
    }
    if block.determinant() < 0.0 {
        scale.x = -scale.x;
    }

    // Gram-Schmidt on the normalized columns
    let x = block.x_axis / scale.x;
    let y = (block.y_axis - x * x.dot(block.y_axis)).normalize();
    let z = x.cross(y);

    Ok((scale, DMat3::from_cols(x, y, z)))
}

/// A similarity transform `x -> R (s ⊙ x) + t` with per-axis scale.
///
/// Scene nodes carry per-axis scale; COLMAP only has a use for its mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Similarity3 {
    /// Per-axis scale
    pub scale: DVec3,
    /// Rotation
    pub rotation: DQuat,
    /// Translation
    pub translation: DVec3,
}

impl Default for Similarity3 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Similarity3 {
    /// Identity transformation
    pub const IDENTITY: Self = Self {
        scale: DVec3::ONE,
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
    };

    /// Create from per-axis scale, rotation and translation.
    pub fn new(scale: DVec3, rotation: DQuat, translation: DVec3) -> Self {
        Self {
            scale,
            rotation,
            translation,
        }
    }

    /// Create with the same scale on every axis.
    pub fn from_uniform(scale: f64, rotation: DQuat, translation: DVec3) -> Self {
        Self::new(DVec3::splat(scale), rotation, translation)
    }

    /// Decompose a homogeneous matrix of the form `| R·diag(s) t |`.
    pub fn from_matrix(matrix: &DMat4) -> Result<Self, GeometryError> {
        let (scale, rotation) = decompose_scaled_rotation(matrix)?;
        Ok(Self {
            scale,
            rotation: matrix_to_quaternion(&rotation),
            translation: matrix.w_axis.truncate(),
        })
    }

    /// Convert to 4x4 homogeneous transformation matrix
    pub fn to_matrix(&self) -> DMat4 {
        DMat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Arithmetic mean of the three axis scale magnitudes.
    ///
    /// A mirror only flips the sign of one axis and does not change the size
    /// of the scene.
    pub fn mean_scale(&self) -> f64 {
        self.scale.abs().element_sum() / 3.0
    }

    /// Whether all axis scale magnitudes agree within `tolerance`, relative to
    /// the mean.
    pub fn is_uniform(&self, tolerance: f64) -> bool {
        let magnitude = self.scale.abs();
        let spread = magnitude.max_element() - magnitude.min_element();
        spread <= tolerance * self.mean_scale()
    }

    /// Apply to a point.
    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * (self.scale * point) + self.translation
    }
}
