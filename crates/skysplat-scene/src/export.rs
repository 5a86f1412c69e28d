use std::{collections::BTreeSet, path::Path};

use glam::DQuat;
use skysplat_colmap::{write_model, ModelFormat, Reconstruction};
use skysplat_geometry::{
    bridge::{BridgeSettings, ExportConversion},
    pose::{invert_rigid, matrix_to_quaternion, qvec_to_quat, quat_to_qvec},
    similarity::decompose_scaled_rotation,
};

use crate::{intrinsics::scale_intrinsics, BindingWarning, SceneBinding, SceneError};

// below this the scale factor is treated as 1
const UNIT_SCALE_EPS: f64 = 1e-12;

/// Options of the export re-derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportOptions {
    /// Apply the coordinate bridge on export.
    pub apply_bridge: bool,
    /// Relative spread of the root axis scales tolerated before a
    /// [`BindingWarning::NonUniformScale`] is recorded.
    pub uniform_scale_tolerance: f64,
    /// Multiply focal length and principal point by the root scale.
    pub scale_intrinsics: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            apply_bridge: true,
            uniform_scale_tolerance: 1e-4,
            scale_intrinsics: true,
        }
    }
}

impl ExportOptions {
    /// Set whether the bridge is applied on export.
    pub fn with_apply_bridge(mut self, apply_bridge: bool) -> Self {
        self.apply_bridge = apply_bridge;
        self
    }

    /// Set the non-uniform scale tolerance.
    pub fn with_uniform_scale_tolerance(mut self, tolerance: f64) -> Self {
        self.uniform_scale_tolerance = tolerance;
        self
    }

    /// Set whether intrinsics follow the root scale.
    pub fn with_scale_intrinsics(mut self, scale_intrinsics: bool) -> Self {
        self.scale_intrinsics = scale_intrinsics;
        self
    }
}

/// Re-derived model plus everything that had to be passed through.
#[derive(Debug, Clone)]
pub struct ExportResult {
    /// The re-derived reconstruction, ids unchanged
    pub reconstruction: Reconstruction,
    /// Per-entity problems; affected entities are copied from the original
    pub warnings: Vec<BindingWarning>,
    /// Scale factor applied to intrinsics
    pub applied_scale: f64,
}

/// Re-derive a consistent reconstruction from the edited scene.
///
/// If the root node is gone or degenerate the whole model is returned unchanged
/// together with the warning.
///
/// Poses get new `qvec`/`tvec` from their node's world matrix, cameras used by
/// re-derived poses get intrinsics scaled by the mean root scale, and points are
/// mapped through the point set node. Names, keypoints, colors, errors and tracks
/// are copied unchanged.
pub fn export(
    original: &Reconstruction,
    binding: &SceneBinding,
    options: &ExportOptions,
) -> ExportResult {
    let conversion = BridgeSettings::new(binding.applied_bridge(), options.apply_bridge)
        .export_conversion();
    let read_back = binding.read_back();
    let mut warnings = read_back.warnings;
    let mut output = original.clone();

    // no usable root: nothing is re-derived
    let Some(root) = read_back.root else {
        for warning in &warnings {
            log::warn!("{warning}");
        }
        log::info!("root unavailable, model of {} poses passed through", original.images.len());
        return ExportResult {
            reconstruction: output,
            warnings,
            applied_scale: 1.0,
        };
    };

    let scale = root.mean_scale();
    if !root.is_uniform(options.uniform_scale_tolerance) {
        warnings.push(BindingWarning::NonUniformScale {
            scale: root.scale.to_array(),
            applied: scale,
        });
    }

    // poses
    let mut derived = BTreeSet::new();
    for (pose_id, world) in &read_back.poses {
        let Some(image) = output.images.get_mut(pose_id) else {
            warnings.push(BindingWarning::UnknownPose { pose_id: *pose_id });
            continue;
        };

        let camera_to_world = conversion.pose(world);
        let rotation = match decompose_scaled_rotation(&camera_to_world) {
            Ok((_, rotation)) => rotation,
            Err(e) => {
                warnings.push(BindingWarning::DegeneratePose {
                    pose_id: *pose_id,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        let (r_colmap, t_colmap) = invert_rigid(&rotation, &camera_to_world.w_axis.truncate());

        let q = align_sign(matrix_to_quaternion(&r_colmap), &qvec_to_quat(&image.rotation));
        image.rotation = quat_to_qvec(&q);
        image.translation = t_colmap.to_array();
        derived.insert(*pose_id);

        log::debug!(
            "pose {} ({}): q = {:?}, t = {:?}",
            pose_id,
            image.name,
            image.rotation,
            image.translation
        );
    }

    // poses added after import never got a node
    for pose_id in original.images.keys() {
        if binding.pose_node(*pose_id).is_none() && !was_bound(&warnings, *pose_id) {
            warnings.push(BindingWarning::UnboundPose { pose_id: *pose_id });
        }
    }

    // intrinsics
    let applied_scale = if options.scale_intrinsics && (scale - 1.0).abs() > UNIT_SCALE_EPS {
        let used_cameras = derived
            .iter()
            .filter_map(|id| original.images.get(id))
            .map(|image| image.camera_id)
            .collect::<BTreeSet<_>>();
        for camera_id in used_cameras {
            if let Some(camera) = output.cameras.get_mut(&camera_id) {
                *camera = scale_intrinsics(camera, scale);
            }
        }
        scale
    } else {
        1.0
    };

    // points
    export_points(&mut output, binding, read_back.point_set, conversion, &mut warnings);

    for warning in &warnings {
        log::warn!("{warning}");
    }
    log::info!(
        "re-derived {} of {} poses, intrinsics scale {}, {} warnings",
        derived.len(),
        original.images.len(),
        applied_scale,
        warnings.len()
    );

    ExportResult {
        reconstruction: output,
        warnings,
        applied_scale,
    }
}

/// [`export`] followed by writing the result into `dir`.
pub fn export_to_dir(
    original: &Reconstruction,
    binding: &SceneBinding,
    options: &ExportOptions,
    dir: impl AsRef<Path>,
    format: ModelFormat,
) -> Result<ExportResult, SceneError> {
    let result = export(original, binding, options);
    write_model(&result.reconstruction, dir, format)?;
    Ok(result)
}

fn export_points(
    output: &mut Reconstruction,
    binding: &SceneBinding,
    point_set_world: Option<glam::DMat4>,
    conversion: ExportConversion,
    warnings: &mut Vec<BindingWarning>,
) {
    let (Some(world), Some(points)) = (point_set_world, binding.points()) else {
        // missing point set is already reported by the read back
        return;
    };
    let point_ids = binding.point_ids();
    if point_ids.len() != points.len() {
        warnings.push(BindingWarning::PointCountMismatch {
            expected: point_ids.len(),
            actual: points.len(),
        });
        return;
    }

    let mut moved = 0;
    for (id, position) in point_ids.iter().zip(&points.positions) {
        if let Some(point) = output.points3d.get_mut(id) {
            point.xyz = conversion.point(world.transform_point3(*position)).to_array();
            moved += 1;
        }
    }

    let unbound = output.points3d.len() - moved;
    if unbound > 0 {
        warnings.push(BindingWarning::UnboundPoints { count: unbound });
    }
}

/// Pick the sign of `q` closest to `reference`.
fn align_sign(q: DQuat, reference: &DQuat) -> DQuat {
    if q.dot(*reference) < 0.0 {
        -q
    } else {
        q
    }
}

fn was_bound(warnings: &[BindingWarning], pose_id: u32) -> bool {
    warnings.iter().any(|w| {
        matches!(w, BindingWarning::MissingPoseNode { pose_id: id, .. } if *id == pose_id)
    })
}
