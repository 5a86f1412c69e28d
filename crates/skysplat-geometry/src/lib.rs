#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # SkySplat Geometry
//!
//! Rigid and similarity transforms used to move a COLMAP reconstruction in and out
//! of a scene graph.
//!
//! - [`pose`]: quaternion/matrix conversion and world/camera inversion.
//! - [`bridge`]: the fixed `diag(1, -1, -1, 1)` change of basis between COLMAP
//!   (Y down, Z forward) and a Y-up editor with the camera looking down -Z.
//! - [`similarity`]: scale/rotation/translation decomposition of scene matrices.
//!
//! ## Example
//!
//! ```rust
//! use skysplat_geometry::pose::Rigid3;
//! use skysplat_geometry::bridge::CoordinateBridge;
//!
//! // world-to-camera pose as stored by COLMAP
//! let world_from_camera = Rigid3::from_colmap([1.0, 0.0, 0.0, 0.0], [0.0, 0.0, 2.0])
//!     .unwrap()
//!     .inverse();
//! let in_scene = CoordinateBridge::conjugate(&world_from_camera.to_matrix());
//! assert_eq!(in_scene.w_axis.z, 2.0);
//! ```

/// Coordinate convention bridge.
pub mod bridge;

mod error;
pub use error::GeometryError;

/// Pose algebra for rigid transforms.
pub mod pose;

/// Similarity transforms and matrix decomposition.
pub mod similarity;
