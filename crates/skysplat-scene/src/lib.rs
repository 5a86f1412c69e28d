#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # SkySplat Scene
//!
//! [`SceneBinding::bind`] turns a [`Reconstruction`](skysplat_colmap::Reconstruction)
//! into a small scene graph: one root node the user edits, one camera node per
//! image and one point set node. [`export`] reads the edited scene back and
//! produces a reconstruction whose poses, intrinsics and points reflect the edit.
//!
//! ```no_run
//! use glam::{DQuat, DVec3};
//! use skysplat_geometry::similarity::Similarity3;
//! use skysplat_scene::{export, ExportOptions, SceneBinding};
//!
//! let model = skysplat_colmap::read_model("scene/sparse/0")?;
//! let mut binding = SceneBinding::bind(&model, true)?;
//! binding.set_root_transform(&Similarity3::from_uniform(
//!     2.0,
//!     DQuat::from_rotation_y(0.5),
//!     DVec3::new(0.0, 1.0, 0.0),
//! ));
//! let result = export(&model, &binding, &ExportOptions::default());
//! for warning in &result.warnings {
//!     eprintln!("{warning}");
//! }
//! # Ok::<(), skysplat_scene::SceneError>(())
//! ```

mod binding;
pub use binding::*;

mod error;
pub use error::{BindingWarning, SceneError};

mod export;
pub use export::{export, export_to_dir, ExportOptions, ExportResult};

/// Focal length and principal point layout per camera model.
pub mod intrinsics;

/// Arena scene graph.
pub mod scene;
