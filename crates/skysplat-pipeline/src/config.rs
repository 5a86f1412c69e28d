use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{BrushConfig, ColmapConfig, MultiResConfig, PipelineError};

/// Configuration of a full run: COLMAP, multi-resolution images and training.
///
/// Every section falls back to its defaults when missing from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// COLMAP settings
    pub colmap: ColmapConfig,
    /// Downscaled image copies
    pub multires: MultiResConfig,
    /// Trainer settings
    pub brush: BrushConfig,
}

impl PipelineConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(PipelineError::MissingInput(path.to_path_buf()));
        }
        let file = fs::File::open(path)?;
        let config = serde_json::from_reader(std::io::BufReader::new(file))?;
        log::debug!("loaded pipeline configuration from {}", path.display());
        Ok(config)
    }

    /// Save the configuration as pretty printed JSON.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(std::io::BufWriter::new(file), self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_file_round_trip() -> Result<(), PipelineError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("pipeline.json");

        let mut config = PipelineConfig::default();
        config.colmap.use_gpu = false;
        config.multires.factors = vec![2];
        config.brush = config.brush.with_total_steps(7000).with_export_path("/tmp/out");
        config.to_json_file(&path)?;

        assert_eq!(PipelineConfig::from_json_file(&path)?, config);
        Ok(())
    }

    #[test]
    fn test_partial_json_uses_defaults() -> Result<(), PipelineError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("partial.json");
        fs::write(
            &path,
            r#"{ "colmap": { "camera_model": "PINHOLE" }, "brush": { "total_steps": 100 } }"#,
        )?;

        let config = PipelineConfig::from_json_file(&path)?;
        assert_eq!(config.colmap.camera_model, "PINHOLE");
        assert!(config.colmap.use_gpu);
        assert_eq!(config.brush.total_steps, 100);
        assert_eq!(config.brush.seed, 42);
        assert_eq!(config.multires, MultiResConfig::default());
        Ok(())
    }

    #[test]
    fn test_malformed_json() -> Result<(), PipelineError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ \"colmap\": ")?;
        assert!(matches!(
            PipelineConfig::from_json_file(&path),
            Err(PipelineError::Config(_))
        ));
        Ok(())
    }
}
