use std::collections::BTreeMap;

use crate::{ColmapCamera, ColmapError, ColmapImage, ColmapPoint3d};

/// A COLMAP sparse reconstruction: cameras, posed images and 3D points keyed by id.
///
/// Maps are ordered so serialization emits records in ascending id order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconstruction {
    /// Cameras by camera id
    pub cameras: BTreeMap<u32, ColmapCamera>,
    /// Posed images by image id
    pub images: BTreeMap<u32, ColmapImage>,
    /// Sparse points by point id
    pub points3d: BTreeMap<u64, ColmapPoint3d>,
}

impl Reconstruction {
    /// Build a reconstruction from record lists, rejecting duplicate ids.
    pub fn from_parts(
        cameras: Vec<ColmapCamera>,
        images: Vec<ColmapImage>,
        points3d: Vec<ColmapPoint3d>,
    ) -> Result<Self, ColmapError> {
        let mut model = Self::default();
        for camera in cameras {
            let id = camera.camera_id;
            if model.cameras.insert(id, camera).is_some() {
                return Err(ColmapError::DuplicateId {
                    kind: "camera",
                    id: id as u64,
                });
            }
        }
        for image in images {
            let id = image.image_id;
            if model.images.insert(id, image).is_some() {
                return Err(ColmapError::DuplicateId {
                    kind: "image",
                    id: id as u64,
                });
            }
        }
        for point in points3d {
            let id = point.point3d_id;
            if model.points3d.insert(id, point).is_some() {
                return Err(ColmapError::DuplicateId { kind: "point3D", id });
            }
        }
        Ok(model)
    }

    /// Check camera arity and that every image resolves its camera.
    pub fn validate(&self) -> Result<(), ColmapError> {
        for camera in self.cameras.values() {
            camera.check_params()?;
        }
        for image in self.images.values() {
            if !self.cameras.contains_key(&image.camera_id) {
                return Err(ColmapError::DanglingCamera {
                    image_id: image.image_id,
                    camera_id: image.camera_id,
                });
            }
        }
        Ok(())
    }

    /// Camera used by an image.
    pub fn camera_of(&self, image: &ColmapImage) -> Option<&ColmapCamera> {
        self.cameras.get(&image.camera_id)
    }

    /// Mean number of triangulated observations per image.
    pub fn mean_observations_per_image(&self) -> f64 {
        if self.images.is_empty() {
            return 0.0;
        }
        let total: usize = self.images.values().map(ColmapImage::num_points3d).sum();
        total as f64 / self.images.len() as f64
    }

    /// Mean track length over all points.
    pub fn mean_track_length(&self) -> f64 {
        if self.points3d.is_empty() {
            return 0.0;
        }
        let total: usize = self.points3d.values().map(|p| p.track.len()).sum();
        total as f64 / self.points3d.len() as f64
    }
}
