#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use skysplat_colmap as colmap;

#[doc(inline)]
pub use skysplat_geometry as geometry;

#[doc(inline)]
pub use skysplat_pipeline as pipeline;

#[doc(inline)]
pub use skysplat_scene as scene;
