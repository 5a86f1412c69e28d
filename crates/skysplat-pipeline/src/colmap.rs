use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use skysplat_colmap::{
    paths::{images_dir, images_dir_scaled, input_dir, sparse_model_dir},
    CameraModelId,
};

use crate::{run_command, CancelToken, ExternalCommand, PipelineError};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Stages of a COLMAP run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColmapStage {
    /// SIFT feature extraction into the database
    FeatureExtraction,
    /// Exhaustive pairwise matching
    Matching,
    /// Incremental mapping into `distorted/sparse`
    Mapping,
    /// Undistortion into the processing root
    Undistortion,
    /// Downscaled image copies
    MultiResolution,
}

impl ColmapStage {
    /// Stage name used in logs and errors.
    pub fn name(self) -> &'static str {
        match self {
            ColmapStage::FeatureExtraction => "feature_extractor",
            ColmapStage::Matching => "exhaustive_matcher",
            ColmapStage::Mapping => "mapper",
            ColmapStage::Undistortion => "image_undistorter",
            ColmapStage::MultiResolution => "multires",
        }
    }
}

impl fmt::Display for ColmapStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Settings of the COLMAP invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColmapConfig {
    /// COLMAP executable
    pub executable: PathBuf,
    /// Camera model name shared by all images, e.g. `OPENCV`
    pub camera_model: String,
    /// Use GPU SIFT extraction and matching
    pub use_gpu: bool,
}

impl Default for ColmapConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("colmap"),
            camera_model: CameraModelId::OpenCV.name().to_string(),
            use_gpu: true,
        }
    }
}

impl ColmapConfig {
    /// Set the COLMAP executable.
    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = executable.into();
        self
    }

    /// Set the camera model.
    pub fn with_camera_model(mut self, model: CameraModelId) -> Self {
        self.camera_model = model.name().to_string();
        self
    }

    /// Enable or disable the GPU.
    pub fn with_use_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }

    fn gpu_flag(&self) -> u8 {
        u8::from(self.use_gpu)
    }
}

/// Downscaled copies of the undistorted images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiResConfig {
    /// Create `images_N` directories after undistortion
    pub enabled: bool,
    /// ImageMagick executable
    pub magick_executable: PathBuf,
    /// Downscale factors; each produces `images_{factor}`
    pub factors: Vec<u32>,
}

impl Default for MultiResConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            magick_executable: PathBuf::from("magick"),
            factors: vec![2, 4, 8],
        }
    }
}

impl MultiResConfig {
    /// Enable or disable the stage.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the ImageMagick executable.
    pub fn with_magick_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.magick_executable = executable.into();
        self
    }

    /// In-place resize of one image copy to `1 / factor` of its size.
    pub fn resize_command(&self, image: impl AsRef<Path>, factor: u32) -> ExternalCommand {
        let percent = 100.0 / factor.max(1) as f64;
        ExternalCommand::new(&self.magick_executable)
            .arg("mogrify")
            .arg("-resize")
            .arg(format!("{percent}%"))
            .arg(image.as_ref().as_os_str())
    }
}

/// Copy the images of `source` into `root/input`.
///
/// Only `.jpg`, `.jpeg` and `.png` files (any case) are taken. Files already
/// present in the destination are left alone. Returns the number of images found.
pub fn stage_input_images(
    source: impl AsRef<Path>,
    root: impl AsRef<Path>,
) -> Result<usize, PipelineError> {
    let source = source.as_ref();
    if !source.is_dir() {
        return Err(PipelineError::MissingInput(source.to_path_buf()));
    }

    let images = list_images(source)?;
    if images.is_empty() {
        return Err(PipelineError::NoImages(source.to_path_buf()));
    }

    let input = input_dir(root);
    fs::create_dir_all(&input)?;
    let mut copied = 0;
    for src in &images {
        let Some(name) = src.file_name() else {
            continue;
        };
        let dst = input.join(name);
        if !dst.exists() {
            fs::copy(src, &dst)?;
            copied += 1;
        }
    }

    log::info!(
        "staged {} images into {} ({} new)",
        images.len(),
        input.display(),
        copied
    );
    Ok(images.len())
}

fn list_images(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut images = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if is_image && path.is_file() {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}

/// Runs COLMAP over a processing root.
///
/// The root holds the photos in `input/`. A successful run leaves the
/// undistorted images in `images/` and the sparse model in `sparse/0`.
#[derive(Debug, Clone, Default)]
pub struct ColmapPipeline {
    config: ColmapConfig,
    multires: MultiResConfig,
    cancel: CancelToken,
}

impl ColmapPipeline {
    /// Create a pipeline.
    pub fn new(config: ColmapConfig, multires: MultiResConfig) -> Self {
        Self {
            config,
            multires,
            cancel: CancelToken::new(),
        }
    }

    /// Share a cancel token with the caller.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// The cancel token checked between and during stages.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Commands of the four COLMAP stages for a root.
    pub fn commands(
        &self,
        root: impl AsRef<Path>,
    ) -> Result<Vec<(ColmapStage, ExternalCommand)>, PipelineError> {
        let root = root.as_ref();
        let model = CameraModelId::from_name(&self.config.camera_model)?;
        let database = root.join("distorted").join("database.db");
        let input = input_dir(root);
        let distorted_sparse = root.join("distorted").join("sparse");
        let colmap = || ExternalCommand::new(&self.config.executable);

        Ok(vec![
            (
                ColmapStage::FeatureExtraction,
                colmap()
                    .arg("feature_extractor")
                    .path_opt("--database_path", &database)
                    .path_opt("--image_path", &input)
                    .opt("--ImageReader.single_camera", 1)
                    .opt("--ImageReader.camera_model", model.name())
                    .opt("--SiftExtraction.use_gpu", self.config.gpu_flag()),
            ),
            (
                ColmapStage::Matching,
                colmap()
                    .arg("exhaustive_matcher")
                    .path_opt("--database_path", &database)
                    .opt("--SiftMatching.use_gpu", self.config.gpu_flag()),
            ),
            (
                ColmapStage::Mapping,
                colmap()
                    .arg("mapper")
                    .path_opt("--database_path", &database)
                    .path_opt("--image_path", &input)
                    .path_opt("--output_path", &distorted_sparse)
                    .arg("--Mapper.ba_global_function_tolerance=0.000001"),
            ),
            (
                ColmapStage::Undistortion,
                colmap()
                    .arg("image_undistorter")
                    .path_opt("--image_path", &input)
                    .path_opt("--input_path", distorted_sparse.join("0"))
                    .path_opt("--output_path", root)
                    .opt("--output_type", "COLMAP"),
            ),
        ])
    }

    /// Run every stage. Returns the sparse model directory.
    pub fn run(&self, root: impl AsRef<Path>) -> Result<PathBuf, PipelineError> {
        let root = root.as_ref();
        let input = input_dir(root);
        if !input.is_dir() {
            return Err(PipelineError::MissingInput(input));
        }

        fs::create_dir_all(root.join("distorted").join("sparse"))?;

        for (stage, cmd) in self.commands(root)? {
            log::info!("running COLMAP stage {stage}");
            run_command(&cmd, stage.name(), &self.cancel)?;
        }

        let model_dir = collect_sparse_model(root)?;

        if self.multires.enabled {
            self.create_multires_images(root)?;
        }

        log::info!("COLMAP finished, model in {}", model_dir.display());
        Ok(model_dir)
    }

    /// Copy `images/` into `images_N` and downscale each copy.
    pub fn create_multires_images(&self, root: impl AsRef<Path>) -> Result<(), PipelineError> {
        let root = root.as_ref();
        let stage = ColmapStage::MultiResolution;
        let images = images_dir(root);
        if !images.is_dir() {
            return Err(PipelineError::MissingInput(images));
        }

        log::info!("creating multi-resolution images");
        let mut files = Vec::new();
        for entry in fs::read_dir(&images)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        for &factor in &self.multires.factors {
            fs::create_dir_all(images_dir_scaled(root, factor))?;
        }

        for src in &files {
            let Some(name) = src.file_name() else {
                continue;
            };
            for &factor in &self.multires.factors {
                let dst = images_dir_scaled(root, factor).join(name);
                fs::copy(src, &dst)?;
                run_command(
                    &self.multires.resize_command(&dst, factor),
                    stage.name(),
                    &self.cancel,
                )?;
            }
        }
        Ok(())
    }
}

/// Move the undistorter's files from `root/sparse` into `root/sparse/0`.
///
/// The undistorter writes the model directly into `sparse/`; downstream tools
/// expect it under `sparse/0`. Entries already named `0` stay in place.
pub fn collect_sparse_model(root: impl AsRef<Path>) -> Result<PathBuf, PipelineError> {
    let sparse = root.as_ref().join("sparse");
    if !sparse.is_dir() {
        return Err(PipelineError::MissingInput(sparse));
    }
    let target = sparse_model_dir(root.as_ref());
    fs::create_dir_all(&target)?;

    for entry in fs::read_dir(&sparse)? {
        let entry = entry?;
        if entry.file_name() == "0" {
            continue;
        }
        let dst = target.join(entry.file_name());
        log::debug!("moving {} -> {}", entry.path().display(), dst.display());
        fs::rename(entry.path(), dst)?;
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_commands() -> Result<(), PipelineError> {
        let pipeline = ColmapPipeline::new(
            ColmapConfig::default()
                .with_camera_model(CameraModelId::Pinhole)
                .with_use_gpu(false),
            MultiResConfig::default(),
        );
        let root = Path::new("/work/flight");
        let commands = pipeline.commands(root)?;
        let stages: Vec<_> = commands.iter().map(|(s, _)| *s).collect();
        assert_eq!(
            stages,
            vec![
                ColmapStage::FeatureExtraction,
                ColmapStage::Matching,
                ColmapStage::Mapping,
                ColmapStage::Undistortion
            ]
        );

        let extract = commands[0].1.args_lossy();
        assert_eq!(
            extract,
            vec![
                "feature_extractor",
                "--database_path",
                "/work/flight/distorted/database.db",
                "--image_path",
                "/work/flight/input",
                "--ImageReader.single_camera",
                "1",
                "--ImageReader.camera_model",
                "PINHOLE",
                "--SiftExtraction.use_gpu",
                "0",
            ]
        );
        assert!(commands[2]
            .1
            .args_lossy()
            .contains(&"--Mapper.ba_global_function_tolerance=0.000001".to_string()));
        let undistort = commands[3].1.args_lossy();
        assert_eq!(undistort[6], "/work/flight");
        assert_eq!(undistort[8], "COLMAP");
        Ok(())
    }

    #[test]
    fn test_unknown_camera_model() {
        let config = ColmapConfig {
            camera_model: "EQUIRECTANGULAR".to_string(),
            ..Default::default()
        };
        let pipeline = ColmapPipeline::new(config, MultiResConfig::default());
        assert!(matches!(
            pipeline.commands("/tmp"),
            Err(PipelineError::Colmap(_))
        ));
    }

    #[test]
    fn test_resize_percentages() {
        let multires = MultiResConfig::default();
        let pct = |factor| multires.resize_command("a.jpg", factor).args_lossy()[2].clone();
        assert_eq!(pct(2), "50%");
        assert_eq!(pct(4), "25%");
        assert_eq!(pct(8), "12.5%");
    }
}
