use std::path::{Path, PathBuf};

/// Sparse model directory of a processing root: `root/sparse/0`.
pub fn sparse_model_dir(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref().join("sparse").join("0")
}

/// Undistorted images consumed by training: `root/images`.
pub fn images_dir(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref().join("images")
}

/// Source photos fed to feature extraction: `root/input`.
pub fn input_dir(root: impl AsRef<Path>) -> PathBuf {
    root.as_ref().join("input")
}

/// Downscaled image directory for a factor, e.g. `root/images_2`.
pub fn images_dir_scaled(root: impl AsRef<Path>, factor: u32) -> PathBuf {
    root.as_ref().join(format!("images_{factor}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let root = Path::new("/data/flight_colmap_output");
        assert_eq!(
            sparse_model_dir(root),
            PathBuf::from("/data/flight_colmap_output/sparse/0")
        );
        assert_eq!(images_dir(root), root.join("images"));
        assert_eq!(input_dir(root), root.join("input"));
        assert_eq!(images_dir_scaled(root, 4), root.join("images_4"));
    }
}
