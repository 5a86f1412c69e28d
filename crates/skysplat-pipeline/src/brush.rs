use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use skysplat_colmap::paths::sparse_model_dir;

use crate::ExternalCommand;

const DEFAULT_EXPORT_NAME: &str = "export_{iter}.ply";
const COLMAP_OUTPUT_SUFFIX: &str = "_colmap_output";

/// Settings of the Brush Gaussian splatting trainer.
///
/// Field names follow the trainer's command line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrushConfig {
    /// Trainer executable
    pub executable: PathBuf,

    // training
    /// Total optimisation steps
    pub total_steps: u32,
    /// Weight of the SSIM term in the loss
    pub ssim_weight: f32,
    /// Start learning rate of the means
    pub lr_mean: f64,
    /// Final learning rate of the means
    pub lr_mean_end: f64,
    /// Learning rate of the base color coefficients
    pub lr_coeffs_dc: f64,
    /// Learning rate of the opacity
    pub lr_opac: f64,
    /// Learning rate of the scales
    pub lr_scale: f64,
    /// Learning rate of the rotations
    pub lr_rotation: f64,

    // dataset
    /// Longest image side used for training
    pub max_resolution: u32,
    /// Keep every n-th frame
    pub subsample_frames: u32,
    /// Keep every n-th initial point
    pub subsample_points: u32,
    /// Frame limit, `0` for no limit
    pub max_frames: u32,
    /// Hold out every n-th frame for evaluation, `0` to disable
    pub eval_split_every: u32,

    // refine
    /// Densification interval
    pub refine_every: u32,
    /// Gradient threshold for growing splats
    pub growth_grad_threshold: f32,
    /// Fraction of candidate splats that grow
    pub growth_select_fraction: f32,
    /// Step after which splats stop growing
    pub growth_stop_iter: u32,
    /// Upper bound on the splat count
    pub max_splats: u32,

    // model
    /// Spherical harmonics degree
    pub sh_degree: u32,

    // process
    /// Evaluation interval
    pub eval_every: u32,
    /// Export interval
    pub export_every: u32,
    /// Random seed
    pub seed: u64,
    /// Step to resume from, `0` to start fresh
    pub start_iter: u32,
    /// Open the trainer's viewer
    pub with_viewer: bool,
    /// Write evaluation renders to disk
    pub eval_save_to_disk: bool,

    // export
    /// Directory receiving the exported splats
    pub export_path: Option<PathBuf>,
    /// File name pattern of exports, `{iter}` is replaced by the step
    pub export_name: String,
}

impl Default for BrushConfig {
    fn default() -> Self {
        Self {
            executable: default_brush_executable(),
            total_steps: 30000,
            ssim_weight: 0.2,
            lr_mean: 4e-5,
            lr_mean_end: 4e-7,
            lr_coeffs_dc: 3e-3,
            lr_opac: 3e-2,
            lr_scale: 1e-2,
            lr_rotation: 1e-3,
            max_resolution: 1920,
            subsample_frames: 1,
            subsample_points: 1,
            max_frames: 0,
            eval_split_every: 0,
            refine_every: 150,
            growth_grad_threshold: 0.00085,
            growth_select_fraction: 0.1,
            growth_stop_iter: 12500,
            max_splats: 10_000_000,
            sh_degree: 3,
            eval_every: 1000,
            export_every: 5000,
            seed: 42,
            start_iter: 0,
            with_viewer: false,
            eval_save_to_disk: false,
            export_path: None,
            export_name: DEFAULT_EXPORT_NAME.to_string(),
        }
    }
}

impl BrushConfig {
    /// Set the trainer executable.
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Set the number of training steps.
    pub fn with_total_steps(mut self, total_steps: u32) -> Self {
        self.total_steps = total_steps;
        self
    }

    /// Set the export directory.
    pub fn with_export_path(mut self, export_path: impl Into<PathBuf>) -> Self {
        self.export_path = Some(export_path.into());
        self
    }

    /// Command line training on the dataset at `source`.
    ///
    /// Optional flags are only emitted when they differ from the trainer's
    /// own defaults.
    pub fn command(&self, source: impl AsRef<Path>) -> ExternalCommand {
        let mut cmd = ExternalCommand::new(&self.executable)
            .arg(source.as_ref().as_os_str())
            .opt("--total-steps", self.total_steps)
            .opt("--ssim-weight", self.ssim_weight)
            .opt("--lr-mean", self.lr_mean)
            .opt("--lr-mean-end", self.lr_mean_end)
            .opt("--lr-coeffs-dc", self.lr_coeffs_dc)
            .opt("--lr-opac", self.lr_opac)
            .opt("--lr-scale", self.lr_scale)
            .opt("--lr-rotation", self.lr_rotation)
            .opt("--max-resolution", self.max_resolution)
            .opt("--subsample-frames", self.subsample_frames)
            .opt("--subsample-points", self.subsample_points);

        if self.max_frames > 0 {
            cmd = cmd.opt("--max-frames", self.max_frames);
        }
        if self.eval_split_every > 0 {
            cmd = cmd.opt("--eval-split-every", self.eval_split_every);
        }

        cmd = cmd
            .opt("--refine-every", self.refine_every)
            .opt("--growth-grad-threshold", self.growth_grad_threshold)
            .opt("--growth-select-fraction", self.growth_select_fraction)
            .opt("--growth-stop-iter", self.growth_stop_iter)
            .opt("--max-splats", self.max_splats)
            .opt("--sh-degree", self.sh_degree)
            .opt("--eval-every", self.eval_every)
            .opt("--export-every", self.export_every)
            .opt("--seed", self.seed);

        if self.start_iter > 0 {
            cmd = cmd.opt("--start-iter", self.start_iter);
        }
        if self.with_viewer {
            cmd = cmd.arg("--with-viewer");
        }
        if self.eval_save_to_disk {
            cmd = cmd.arg("--eval-save-to-disk");
        }
        if let Some(export_path) = &self.export_path {
            cmd = cmd.path_opt("--export-path", export_path);
        }
        if self.export_name != DEFAULT_EXPORT_NAME {
            cmd = cmd.opt("--export-name", &self.export_name);
        }
        cmd
    }
}

/// Trainer built from source under `~/projects/brush`, or `brush_app` on `PATH`.
pub fn default_brush_executable() -> PathBuf {
    let exe = if cfg!(windows) {
        "brush_app.exe"
    } else {
        "brush_app"
    };
    let home = std::env::var_os("HOME").or_else(|| std::env::var_os("USERPROFILE"));
    match home {
        Some(home) => PathBuf::from(home)
            .join("projects")
            .join("brush")
            .join("target")
            .join("release")
            .join(exe),
        None => PathBuf::from(exe),
    }
}

/// Dataset the trainer should read from a processing root.
///
/// Prefers `brush_dataset/`, then an exported `transformed/` model, then the
/// raw `sparse/0` model.
pub fn resolve_training_source(root: impl AsRef<Path>) -> Option<PathBuf> {
    let root = root.as_ref();
    [
        root.join("brush_dataset"),
        root.join("transformed"),
        sparse_model_dir(root),
    ]
    .into_iter()
    .find(|p| p.exists())
}

/// Export directory next to the processing root.
///
/// A path component `<name>_colmap_output` maps to a sibling
/// `<name>_brush_output`; anything else gets `brush_output` two levels up.
pub fn default_export_path(source: impl AsRef<Path>) -> PathBuf {
    let source = source.as_ref();
    for ancestor in source.ancestors() {
        let name = ancestor.file_name().and_then(|n| n.to_str());
        if let Some(stem) = name.and_then(|n| n.strip_suffix(COLMAP_OUTPUT_SUFFIX)) {
            let parent = ancestor.parent().unwrap_or_else(|| Path::new(""));
            return parent.join(format!("{stem}_brush_output"));
        }
    }
    source
        .parent()
        .and_then(Path::parent)
        .unwrap_or_else(|| Path::new(""))
        .join("brush_output")
}
