#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # SkySplat COLMAP
//!
//! Serialization boundary for COLMAP sparse models. A model directory holds three
//! files (`cameras`, `images`, `points3D`) in either the `.txt` or the `.bin` layout.
//! The codec never changes coordinates; it only moves records between disk and a
//! [`Reconstruction`].
//!
//! ```no_run
//! use skysplat_colmap::{read_model, write_model, ModelFormat};
//!
//! let model = read_model("scene/sparse/0")?;
//! write_model(&model, "scene/sparse_txt", ModelFormat::Text)?;
//! # Ok::<(), skysplat_colmap::ColmapError>(())
//! ```

/// Binary file layout (`cameras.bin`, `images.bin`, `points3D.bin`).
pub mod binary;

mod error;
pub use error::ColmapError;

/// Model level read/write with format detection.
pub mod model;
pub use model::{detect_format, read_model, write_model, ModelFormat};

/// Directory conventions of a processing root.
pub mod paths;

mod reconstruction;
pub use reconstruction::Reconstruction;

/// Text file layout (`cameras.txt`, `images.txt`, `points3D.txt`).
pub mod text;

mod types;
pub use types::*;
