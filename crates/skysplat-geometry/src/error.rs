/// Error types for the geometry module.
#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    /// The quaternion has (near) zero norm and encodes no rotation.
    #[error("degenerate quaternion with norm {0}")]
    DegenerateQuaternion(f64),

    /// A basis column collapsed to zero length, so no rotation can be recovered.
    #[error("degenerate transform: axis {axis} has length {length}")]
    DegenerateAxis {
        /// Column index (0 = x, 1 = y, 2 = z).
        axis: usize,
        /// Column length.
        length: f64,
    },

    /// The matrix contains NaN or infinite entries.
    #[error("transform contains non-finite values")]
    NonFinite,
}
