use skysplat_colmap::{CameraModelId, ColmapCamera};

/// Indices of the focal length and principal point parameters of a camera model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntrinsicsLayout {
    /// Focal length parameter indices
    pub focal: &'static [usize],
    /// Principal point parameter indices
    pub principal_point: &'static [usize],
}

const SINGLE_FOCAL: IntrinsicsLayout = IntrinsicsLayout {
    focal: &[0],
    principal_point: &[1, 2],
};

const DUAL_FOCAL: IntrinsicsLayout = IntrinsicsLayout {
    focal: &[0, 1],
    principal_point: &[2, 3],
};

// Adding a camera model only needs a row here.
const LAYOUTS: [(CameraModelId, IntrinsicsLayout); 11] = [
    (CameraModelId::SimplePinhole, SINGLE_FOCAL),
    (CameraModelId::Pinhole, DUAL_FOCAL),
    (CameraModelId::SimpleRadial, SINGLE_FOCAL),
    (CameraModelId::Radial, SINGLE_FOCAL),
    (CameraModelId::OpenCV, DUAL_FOCAL),
    (CameraModelId::OpenCVFisheye, DUAL_FOCAL),
    (CameraModelId::FullOpenCV, DUAL_FOCAL),
    (CameraModelId::Fov, DUAL_FOCAL),
    (CameraModelId::SimpleRadialFisheye, SINGLE_FOCAL),
    (CameraModelId::RadialFisheye, SINGLE_FOCAL),
    (CameraModelId::ThinPrismFisheye, DUAL_FOCAL),
];

impl IntrinsicsLayout {
    /// Layout of a camera model.
    pub fn of(model: CameraModelId) -> IntrinsicsLayout {
        LAYOUTS
            .iter()
            .find(|(m, _)| *m == model)
            .map(|(_, layout)| *layout)
            .unwrap_or(IntrinsicsLayout {
                focal: &[],
                principal_point: &[],
            })
    }

    /// All indices that scale with the scene.
    pub fn scaled_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.focal.iter().chain(self.principal_point).copied()
    }
}

/// Multiply focal length and principal point of a camera by `factor`.
///
/// Distortion coefficients are dimensionless and stay as they are. Indices past
/// the end of a malformed parameter list are skipped.
pub fn scale_intrinsics(camera: &ColmapCamera, factor: f64) -> ColmapCamera {
    let mut scaled = camera.clone();
    for idx in IntrinsicsLayout::of(camera.model_id).scaled_indices() {
        if let Some(param) = scaled.params.get_mut(idx) {
            *param *= factor;
        }
    }
    scaled
}
