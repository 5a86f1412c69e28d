use std::path::PathBuf;

/// Error types for the COLMAP codec.
#[derive(Debug, thiserror::Error)]
pub enum ColmapError {
    /// Error reading or writing file
    #[error("error reading or writing file: {0}")]
    Io(#[from] std::io::Error),

    /// A required model file is absent.
    #[error("required model file is missing: {}", .0.display())]
    MissingFile(PathBuf),

    /// Neither a complete text nor a complete binary model exists in the directory.
    #[error("no COLMAP model found in {}: expected cameras, images and points3D as .bin or .txt", .0.display())]
    MissingModel(PathBuf),

    /// A record could not be decoded. Wraps the underlying cause with its location.
    #[error("corrupt data in {} at {location}: {source}", .path.display())]
    Corrupt {
        /// File containing the record.
        path: PathBuf,
        /// Human readable location, e.g. `line 12` or `camera record 3`.
        location: String,
        /// What went wrong.
        #[source]
        source: Box<ColmapError>,
    },

    /// Unknown camera model name or id.
    #[error("unknown camera model: {0}")]
    UnknownCameraModel(String),

    /// The number of intrinsic parameters does not match the camera model arity.
    #[error("camera {camera_id} ({model}) expects {expected} parameters, found {actual}")]
    InvalidNumCameraParams {
        /// Camera id.
        camera_id: u32,
        /// Camera model name.
        model: &'static str,
        /// Arity of the model.
        expected: usize,
        /// Parameters present in the record.
        actual: usize,
    },

    /// Wrong number of fields on a record.
    #[error("{record} expects {expected} fields, found {actual}")]
    InvalidFieldCount {
        /// Record kind.
        record: &'static str,
        /// Expected field count (or minimum).
        expected: usize,
        /// Fields present.
        actual: usize,
    },

    /// Parse error
    #[error("parse error: {0}")]
    Parse(String),

    /// Two records of the same kind share one id.
    #[error("duplicate {kind} id {id}")]
    DuplicateId {
        /// Record kind.
        kind: &'static str,
        /// Offending id.
        id: u64,
    },

    /// A pose references a camera that is not in the camera table.
    #[error("image {image_id} references missing camera {camera_id}")]
    DanglingCamera {
        /// Pose id.
        image_id: u32,
        /// Camera id that did not resolve.
        camera_id: u32,
    },
}

impl ColmapError {
    /// Attach a file location to a record level error.
    pub(crate) fn at(self, path: impl Into<PathBuf>, location: impl Into<String>) -> Self {
        // io errors other than truncation are not data corruption
        let passthrough = matches!(
            &self,
            ColmapError::Io(e) if e.kind() != std::io::ErrorKind::UnexpectedEof
        );
        if passthrough {
            return self;
        }
        ColmapError::Corrupt {
            path: path.into(),
            location: location.into(),
            source: Box::new(self),
        }
    }
}
