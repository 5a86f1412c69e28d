#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # SkySplat Pipeline
//!
//! Photos go through COLMAP (feature extraction, matching, mapping,
//! undistortion), optionally get downscaled copies through ImageMagick, and the
//! resulting model is handed to the Brush trainer. Every tool runs as a child
//! process that can be cancelled through a shared [`CancelToken`].
//!
//! ```no_run
//! use skysplat_pipeline::{stage_input_images, ColmapPipeline, PipelineConfig};
//!
//! let config = PipelineConfig::default();
//! stage_input_images("frames", "flight_colmap_output")?;
//! let pipeline = ColmapPipeline::new(config.colmap.clone(), config.multires.clone());
//! let model = pipeline.run("flight_colmap_output")?;
//! println!("sparse model in {}", model.display());
//! # Ok::<(), skysplat_pipeline::PipelineError>(())
//! ```

/// Brush trainer command line.
pub mod brush;
pub use brush::BrushConfig;

/// COLMAP stages and image staging.
pub mod colmap;
pub use colmap::{stage_input_images, ColmapConfig, ColmapPipeline, ColmapStage, MultiResConfig};

mod command;
pub use command::{run_command, CancelToken, CommandOutput, ExternalCommand};

mod config;
pub use config::PipelineConfig;

mod error;
pub use error::PipelineError;
