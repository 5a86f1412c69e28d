use crate::ColmapError;

/// Represents a Colmap camera model id.
///
/// The discriminant is the numeric id used in `cameras.bin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CameraModelId {
    /// Simple pinhole camera model: `f, cx, cy`
    SimplePinhole = 0,
    /// Pinhole camera model: `fx, fy, cx, cy`
    Pinhole = 1,
    /// Simplified radial camera model: `f, cx, cy, k`
    SimpleRadial = 2,
    /// Radial camera model: `f, cx, cy, k1, k2`
    Radial = 3,
    /// OpenCV camera model: `fx, fy, cx, cy, k1, k2, p1, p2`
    OpenCV = 4,
    /// OpenCV fisheye camera model: `fx, fy, cx, cy, k1, k2, k3, k4`
    OpenCVFisheye = 5,
    /// Full OpenCV camera model: `fx, fy, cx, cy, k1, k2, p1, p2, k3, k4, k5, k6`
    FullOpenCV = 6,
    /// Field of view camera model: `fx, fy, cx, cy, omega`
    Fov = 7,
    /// Simple radial fisheye camera model: `f, cx, cy, k`
    SimpleRadialFisheye = 8,
    /// Radial fisheye camera model: `f, cx, cy, k1, k2`
    RadialFisheye = 9,
    /// Thin prism fisheye camera model: `fx, fy, cx, cy, k1, k2, p1, p2, k3, k4, sx1, sy1`
    ThinPrismFisheye = 10,
}

// (model, name, number of params)
const CAMERA_MODELS: [(CameraModelId, &str, usize); 11] = [
    (CameraModelId::SimplePinhole, "SIMPLE_PINHOLE", 3),
    (CameraModelId::Pinhole, "PINHOLE", 4),
    (CameraModelId::SimpleRadial, "SIMPLE_RADIAL", 4),
    (CameraModelId::Radial, "RADIAL", 5),
    (CameraModelId::OpenCV, "OPENCV", 8),
    (CameraModelId::OpenCVFisheye, "OPENCV_FISHEYE", 8),
    (CameraModelId::FullOpenCV, "FULL_OPENCV", 12),
    (CameraModelId::Fov, "FOV", 5),
    (CameraModelId::SimpleRadialFisheye, "SIMPLE_RADIAL_FISHEYE", 4),
    (CameraModelId::RadialFisheye, "RADIAL_FISHEYE", 5),
    (CameraModelId::ThinPrismFisheye, "THIN_PRISM_FISHEYE", 12),
];

impl CameraModelId {
    /// All supported camera models in id order.
    pub fn all() -> impl Iterator<Item = CameraModelId> {
        CAMERA_MODELS.iter().map(|(model, _, _)| *model)
    }

    /// Numeric id as stored in `cameras.bin`.
    pub fn id(self) -> i32 {
        self as i32
    }

    /// Model name as stored in `cameras.txt`.
    pub fn name(self) -> &'static str {
        CAMERA_MODELS[self as usize].1
    }

    /// Number of intrinsic parameters the model carries.
    pub fn num_params(self) -> usize {
        CAMERA_MODELS[self as usize].2
    }

    /// Look up a model from its numeric id.
    pub fn from_id(id: i32) -> Result<Self, ColmapError> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| CAMERA_MODELS.get(idx))
            .map(|(model, _, _)| *model)
            .ok_or_else(|| ColmapError::UnknownCameraModel(format!("id {id}")))
    }

    /// Look up a model from its name.
    pub fn from_name(name: &str) -> Result<Self, ColmapError> {
        CAMERA_MODELS
            .iter()
            .find(|(_, model_name, _)| *model_name == name)
            .map(|(model, _, _)| *model)
            .ok_or_else(|| ColmapError::UnknownCameraModel(name.to_string()))
    }
}

impl std::fmt::Display for CameraModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Represents a camera in the Colmap system.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapCamera {
    /// Camera id
    pub camera_id: u32,
    /// Camera model id
    pub model_id: CameraModelId,
    /// Image width
    pub width: u64,
    /// Image height
    pub height: u64,
    /// Camera parameters, layout depends on `model_id`
    pub params: Vec<f64>,
}

impl ColmapCamera {
    /// Create a camera, checking the parameter count against the model arity.
    pub fn new(
        camera_id: u32,
        model_id: CameraModelId,
        width: u64,
        height: u64,
        params: Vec<f64>,
    ) -> Result<Self, ColmapError> {
        let camera = Self {
            camera_id,
            model_id,
            width,
            height,
            params,
        };
        camera.check_params()?;
        Ok(camera)
    }

    /// Check that the parameter count matches the model arity.
    pub fn check_params(&self) -> Result<(), ColmapError> {
        let expected = self.model_id.num_params();
        if self.params.len() != expected {
            return Err(ColmapError::InvalidNumCameraParams {
                camera_id: self.camera_id,
                model: self.model_id.name(),
                expected,
                actual: self.params.len(),
            });
        }
        Ok(())
    }
}

/// A 2D keypoint observed in an image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2d {
    /// Pixel coordinates
    pub xy: [f64; 2],
    /// Linked 3D point, `None` when the keypoint is not triangulated
    pub point3d_id: Option<u64>,
}

impl Point2d {
    /// Sentinel for an unobserved keypoint, as written on disk.
    pub const INVALID_POINT3D_ID: i64 = -1;

    /// Decode the on-disk id representation.
    pub fn from_raw(xy: [f64; 2], raw_id: i64) -> Result<Self, ColmapError> {
        let point3d_id = match raw_id {
            Self::INVALID_POINT3D_ID => None,
            id => Some(u64::try_from(id).map_err(|_| {
                ColmapError::Parse(format!("invalid point3D id {id}"))
            })?),
        };
        Ok(Self { xy, point3d_id })
    }

    /// Encode the id for disk.
    pub fn raw_point3d_id(&self) -> i64 {
        self.point3d_id
            .map_or(Self::INVALID_POINT3D_ID, |id| id as i64)
    }
}

/// Represents an image in the Colmap system.
///
/// `rotation` and `translation` map a world point into camera space.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapImage {
    /// Image name
    pub name: String,
    /// Image id
    pub image_id: u32,
    /// Camera id
    pub camera_id: u32,
    /// Rotation
    pub rotation: [f64; 4], // qw, qx, qy, qz
    /// Translation
    pub translation: [f64; 3], // x, y, z
    /// Points2d
    pub points2d: Vec<Point2d>,
}

impl ColmapImage {
    /// Number of keypoints linked to a 3D point.
    pub fn num_points3d(&self) -> usize {
        self.points2d
            .iter()
            .filter(|p| p.point3d_id.is_some())
            .count()
    }
}

/// One element of a point track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackElement {
    /// Observing image
    pub image_id: u32,
    /// Index into the image's keypoints
    pub point2d_idx: u32,
}

/// Represents a 3D point in the Colmap system.
#[derive(Debug, Clone, PartialEq)]
pub struct ColmapPoint3d {
    /// Point3d id
    pub point3d_id: u64,
    /// x, y, z coordinates
    pub xyz: [f64; 3],
    /// rgb color
    pub rgb: [u8; 3],
    /// Error
    pub error: f64,
    /// Track
    pub track: Vec<TrackElement>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_table_is_indexed_by_id() {
        for (idx, model) in CameraModelId::all().enumerate() {
            assert_eq!(model.id() as usize, idx);
            assert_eq!(CameraModelId::from_id(model.id()).unwrap(), model);
            assert_eq!(CameraModelId::from_name(model.name()).unwrap(), model);
        }
    }

    #[test]
    fn test_unknown_model() {
        assert!(CameraModelId::from_id(11).is_err());
        assert!(CameraModelId::from_id(-1).is_err());
        assert!(CameraModelId::from_name("EQUIRECTANGULAR").is_err());
    }

    #[test]
    fn test_camera_arity() {
        let ok = ColmapCamera::new(1, CameraModelId::Pinhole, 640, 480, vec![1.0; 4]);
        assert!(ok.is_ok());

        let err = ColmapCamera::new(2, CameraModelId::Pinhole, 640, 480, vec![1.0; 3]);
        match err {
            Err(ColmapError::InvalidNumCameraParams {
                camera_id,
                expected,
                actual,
                ..
            }) => {
                assert_eq!(camera_id, 2);
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_point2d_sentinel() -> Result<(), ColmapError> {
        let unobserved = Point2d::from_raw([1.0, 2.0], -1)?;
        assert_eq!(unobserved.point3d_id, None);
        assert_eq!(unobserved.raw_point3d_id(), -1);

        let observed = Point2d::from_raw([1.0, 2.0], 42)?;
        assert_eq!(observed.point3d_id, Some(42));
        assert!(Point2d::from_raw([0.0, 0.0], -7).is_err());
        Ok(())
    }
}
