use std::path::{Path, PathBuf};

use crate::{binary, text, ColmapError, Reconstruction};

/// On-disk encoding of a model directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelFormat {
    /// `cameras.txt`, `images.txt`, `points3D.txt`
    Text,
    /// `cameras.bin`, `images.bin`, `points3D.bin`
    #[default]
    Binary,
}

impl ModelFormat {
    /// File extension of the format.
    pub fn extension(self) -> &'static str {
        match self {
            ModelFormat::Text => "txt",
            ModelFormat::Binary => "bin",
        }
    }

    /// The three model file paths inside `dir`: cameras, images, points3D.
    pub fn files(self, dir: impl AsRef<Path>) -> [PathBuf; 3] {
        let dir = dir.as_ref();
        let ext = self.extension();
        [
            dir.join(format!("cameras.{ext}")),
            dir.join(format!("images.{ext}")),
            dir.join(format!("points3D.{ext}")),
        ]
    }

    fn is_complete(self, dir: &Path) -> bool {
        self.files(dir).iter().all(|p| p.is_file())
    }
}

/// Detect which encoding is present in `dir`.
///
/// A complete binary set wins over a complete text set. When neither set is complete
/// but some model file exists, the first missing file of the more complete set is
/// reported.
pub fn detect_format(dir: impl AsRef<Path>) -> Result<ModelFormat, ColmapError> {
    let dir = dir.as_ref();
    if ModelFormat::Binary.is_complete(dir) {
        return Ok(ModelFormat::Binary);
    }
    if ModelFormat::Text.is_complete(dir) {
        return Ok(ModelFormat::Text);
    }

    let present = |format: ModelFormat| format.files(dir).iter().filter(|p| p.is_file()).count();
    let partial = match (present(ModelFormat::Binary), present(ModelFormat::Text)) {
        (0, 0) => return Err(ColmapError::MissingModel(dir.to_path_buf())),
        (bin, txt) if bin >= txt => ModelFormat::Binary,
        _ => ModelFormat::Text,
    };
    let missing = partial
        .files(dir)
        .into_iter()
        .find(|p| !p.is_file())
        .unwrap_or_else(|| dir.to_path_buf());
    Err(ColmapError::MissingFile(missing))
}

/// Read a model directory, selecting the encoding with [`detect_format`].
///
/// The result is validated: every camera matches its model arity and every image
/// resolves its camera. Any failure aborts the whole read.
pub fn read_model(dir: impl AsRef<Path>) -> Result<Reconstruction, ColmapError> {
    let dir = dir.as_ref();
    let format = detect_format(dir)?;
    let [cameras_path, images_path, points_path] = format.files(dir);

    let (cameras, images, points3d) = match format {
        ModelFormat::Binary => (
            binary::read_cameras_bin(&cameras_path)?,
            binary::read_images_bin(&images_path)?,
            binary::read_points3d_bin(&points_path)?,
        ),
        ModelFormat::Text => (
            text::read_cameras_txt(&cameras_path)?,
            text::read_images_txt(&images_path)?,
            text::read_points3d_txt(&points_path)?,
        ),
    };

    let model = Reconstruction::from_parts(cameras, images, points3d)
        .map_err(|e| e.at(dir, "model"))?;
    model.validate().map_err(|e| e.at(dir, "model"))?;

    log::info!(
        "loaded {:?} model from {}: {} cameras, {} images, {} points",
        format,
        dir.display(),
        model.cameras.len(),
        model.images.len(),
        model.points3d.len()
    );
    Ok(model)
}

/// Write a model into `dir` in one encoding, creating the directory if needed.
pub fn write_model(
    model: &Reconstruction,
    dir: impl AsRef<Path>,
    format: ModelFormat,
) -> Result<(), ColmapError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    let [cameras_path, images_path, points_path] = format.files(dir);

    let cameras = model.cameras.values().collect::<Vec<_>>();
    let images = model.images.values().collect::<Vec<_>>();
    let points = model.points3d.values().collect::<Vec<_>>();

    match format {
        ModelFormat::Binary => {
            binary::write_cameras_bin(&cameras, &cameras_path)?;
            binary::write_images_bin(&images, &images_path)?;
            binary::write_points3d_bin(&points, &points_path)?;
        }
        ModelFormat::Text => {
            text::write_cameras_txt(&cameras, &cameras_path)?;
            text::write_images_txt(&images, model.mean_observations_per_image(), &images_path)?;
            text::write_points3d_txt(&points, model.mean_track_length(), &points_path)?;
        }
    }

    log::debug!("wrote {:?} model to {}", format, dir.display());
    Ok(())
}
