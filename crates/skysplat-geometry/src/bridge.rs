use glam::{DMat4, DVec3, DVec4};

// diagonal of the change of basis
const SIGNS: DVec4 = DVec4::new(1.0, -1.0, -1.0, 1.0);

/// Fixed change of basis `T = diag(1, -1, -1, 1)` between COLMAP and the scene.
///
/// COLMAP cameras look down +Z with +Y pointing down the image; the scene uses Y up
/// with cameras looking down -Z. `T` is its own inverse, so the same operation
/// converts in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoordinateBridge;

impl CoordinateBridge {
    /// The homogeneous bridge matrix.
    pub const MATRIX: DMat4 = DMat4::from_cols_array(&[
        1.0, 0.0, 0.0, 0.0, //
        0.0, -1.0, 0.0, 0.0, //
        0.0, 0.0, -1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Conjugate a pose matrix: `T · M · T⁻¹`.
    ///
    /// Entry `(i, j)` is multiplied by `s_i · s_j` with `s` the diagonal of `T`, which
    /// is exact in floating point, so applying it twice returns `M` bit for bit.
    pub fn conjugate(matrix: &DMat4) -> DMat4 {
        DMat4::from_cols(
            matrix.x_axis * SIGNS * SIGNS.x,
            matrix.y_axis * SIGNS * SIGNS.y,
            matrix.z_axis * SIGNS * SIGNS.z,
            matrix.w_axis * SIGNS * SIGNS.w,
        )
    }

    /// Change the basis of a plain position: `T · p`.
    pub fn point(point: DVec3) -> DVec3 {
        point * SIGNS.truncate()
    }
}

/// Which side of a round trip applied the bridge.
///
/// The import flag is recorded with the scene binding; the export flag is chosen
/// by the caller at export time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BridgeSettings {
    /// The bridge was applied when the model was bound to the scene.
    pub on_import: bool,
    /// The bridge is requested when the model is re-derived from the scene.
    pub on_export: bool,
}

/// Coordinate conversion applied to scene matrices during export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportConversion {
    /// Keep matrices as they are. Either no bridge was used at all, or the caller
    /// asked to keep the editor convention after a bridged import.
    Identity,
    /// Undo the import bridge to return to COLMAP convention (`T⁻¹ = T`).
    UndoImportBridge,
    /// Apply the bridge to an import that was not bridged.
    ApplyBridge,
}

impl BridgeSettings {
    /// Create from the import and export flags.
    pub fn new(on_import: bool, on_export: bool) -> Self {
        Self {
            on_import,
            on_export,
        }
    }

    /// Resolve the conversion for this combination of flags.
    pub fn export_conversion(&self) -> ExportConversion {
        match (self.on_import, self.on_export) {
            (true, true) => ExportConversion::UndoImportBridge,
            (false, false) => ExportConversion::Identity,
            (true, false) => ExportConversion::Identity,
            (false, true) => ExportConversion::ApplyBridge,
        }
    }
}

impl ExportConversion {
    /// Convert a pose matrix.
    pub fn pose(&self, matrix: &DMat4) -> DMat4 {
        match self {
            ExportConversion::Identity => *matrix,
            ExportConversion::UndoImportBridge | ExportConversion::ApplyBridge => {
                CoordinateBridge::conjugate(matrix)
            }
        }
    }

    /// Convert a position.
    pub fn point(&self, point: DVec3) -> DVec3 {
        match self {
            ExportConversion::Identity => point,
            ExportConversion::UndoImportBridge | ExportConversion::ApplyBridge => {
                CoordinateBridge::point(point)
            }
        }
    }
}
