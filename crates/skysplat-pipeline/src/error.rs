use std::path::PathBuf;

/// An error type for the processing pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Error reading or writing file
    #[error("error reading or writing file: {0}")]
    Io(#[from] std::io::Error),

    /// The external program could not be started.
    #[error("failed to start {tool} for stage {stage}: {source}")]
    Spawn {
        /// Program that was invoked.
        tool: String,
        /// Pipeline stage.
        stage: String,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// The external program exited with a nonzero status.
    #[error("{tool} failed in stage {stage} (exit code {}): {stderr}", .code.map_or("none".to_string(), |c| c.to_string()))]
    ExternalTool {
        /// Program that was invoked.
        tool: String,
        /// Pipeline stage.
        stage: String,
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
        /// Captured standard error.
        stderr: String,
    },

    /// The run was cancelled while a stage was running.
    #[error("stage {stage} was cancelled")]
    Cancelled {
        /// Stage that was interrupted.
        stage: String,
    },

    /// A required input directory does not exist.
    #[error("missing input: {}", .0.display())]
    MissingInput(PathBuf),

    /// The input directory holds no `.jpg`, `.jpeg` or `.png` files.
    #[error("no images found in {}", .0.display())]
    NoImages(PathBuf),

    /// The configuration could not be parsed or written.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The configured camera model is not a COLMAP model.
    #[error(transparent)]
    Colmap(#[from] skysplat_colmap::ColmapError),
}
