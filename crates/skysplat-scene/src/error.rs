use skysplat_colmap::ColmapError;
use skysplat_geometry::GeometryError;

/// Fatal errors of the scene layer.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    /// A pose of the input model cannot be turned into a transform.
    #[error("image {pose_id} has an invalid pose: {source}")]
    InvalidPose {
        /// Offending pose id
        pose_id: u32,
        /// Cause
        #[source]
        source: GeometryError,
    },

    /// Reading or writing a model failed.
    #[error(transparent)]
    Colmap(#[from] ColmapError),
}

/// Recoverable, per-entity problems found while reading a binding back.
///
/// These never abort an export; the affected entity passes through unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BindingWarning {
    /// The root node was deleted; the whole model passes through unchanged.
    #[error("root node is missing, model is passed through")]
    MissingRoot,

    /// The root transform could not be decomposed; the whole model passes through.
    #[error("root transform is degenerate: {0}")]
    DegenerateRoot(String),

    /// The point set node was deleted; points pass through unchanged.
    #[error("point set node is missing, points are passed through")]
    MissingPointSet,

    /// The scene node bound to a pose was deleted.
    #[error("scene node for image {pose_id} (camera {camera_id}) is missing, pose is passed through")]
    MissingPoseNode {
        /// Pose id
        pose_id: u32,
        /// Camera id of the pose
        camera_id: u32,
    },

    /// A pose of the model was never bound to the scene.
    #[error("image {pose_id} has no scene node, pose is passed through")]
    UnboundPose {
        /// Pose id
        pose_id: u32,
    },

    /// A bound pose does not exist in the model being exported.
    #[error("scene node for image {pose_id} has no matching image in the model")]
    UnknownPose {
        /// Pose id
        pose_id: u32,
    },

    /// The node transform of a pose could not be decomposed.
    #[error("scene node for image {pose_id} is degenerate: {reason}")]
    DegeneratePose {
        /// Pose id
        pose_id: u32,
        /// Cause
        reason: String,
    },

    /// The root scale differs per axis; intrinsics get the mean.
    #[error("root scale {scale:?} is not uniform, intrinsics scaled by the mean {applied}")]
    NonUniformScale {
        /// Per-axis root scale
        scale: [f64; 3],
        /// Scale applied to intrinsics
        applied: f64,
    },

    /// The point set node no longer matches the bound point ids.
    #[error("point set holds {actual} points but {expected} were bound, points are passed through")]
    PointCountMismatch {
        /// Bound point count
        expected: usize,
        /// Points present in the node
        actual: usize,
    },

    /// Points of the model that were not part of the bound point set.
    #[error("{count} points have no scene counterpart and are passed through")]
    UnboundPoints {
        /// Number of points
        count: usize,
    },
}
