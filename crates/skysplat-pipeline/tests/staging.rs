use std::fs;

use skysplat_colmap::paths::{input_dir, sparse_model_dir};
use skysplat_pipeline::{
    colmap::collect_sparse_model, stage_input_images, CancelToken, ColmapConfig, ColmapPipeline,
    MultiResConfig, PipelineError,
};

#[test]
fn stage_copies_only_images() -> Result<(), PipelineError> {
    let src = tempfile::tempdir()?;
    let root = tempfile::tempdir()?;
    for name in ["b.JPG", "a.png", "c.jpeg", "notes.txt", "clip.mp4"] {
        fs::write(src.path().join(name), name)?;
    }
    fs::create_dir(src.path().join("nested.png"))?;

    let count = stage_input_images(src.path(), root.path())?;
    assert_eq!(count, 3);

    let mut staged: Vec<_> = fs::read_dir(input_dir(root.path()))?
        .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
        .collect::<Result<_, _>>()?;
    staged.sort();
    assert_eq!(staged, vec!["a.png", "b.JPG", "c.jpeg"]);
    Ok(())
}

#[test]
fn stage_keeps_existing_files() -> Result<(), PipelineError> {
    let src = tempfile::tempdir()?;
    let root = tempfile::tempdir()?;
    fs::write(src.path().join("frame.jpg"), "new")?;
    fs::create_dir_all(input_dir(root.path()))?;
    fs::write(input_dir(root.path()).join("frame.jpg"), "old")?;

    stage_input_images(src.path(), root.path())?;
    assert_eq!(fs::read_to_string(input_dir(root.path()).join("frame.jpg"))?, "old");
    Ok(())
}

#[test]
fn stage_without_images_fails() -> Result<(), PipelineError> {
    let src = tempfile::tempdir()?;
    let root = tempfile::tempdir()?;
    fs::write(src.path().join("readme.md"), "none here")?;

    let err = stage_input_images(src.path(), root.path()).unwrap_err();
    assert!(matches!(err, PipelineError::NoImages(p) if p == src.path()));
    assert!(!input_dir(root.path()).exists());

    let missing = src.path().join("does_not_exist");
    assert!(matches!(
        stage_input_images(&missing, root.path()),
        Err(PipelineError::MissingInput(_))
    ));
    Ok(())
}

#[test]
fn sparse_files_move_into_model_dir() -> Result<(), PipelineError> {
    let root = tempfile::tempdir()?;
    let sparse = root.path().join("sparse");
    fs::create_dir_all(&sparse)?;
    for name in ["cameras.bin", "images.bin", "points3D.bin"] {
        fs::write(sparse.join(name), name)?;
    }

    let model = collect_sparse_model(root.path())?;
    assert_eq!(model, sparse_model_dir(root.path()));
    for name in ["cameras.bin", "images.bin", "points3D.bin"] {
        assert!(model.join(name).is_file());
        assert!(!sparse.join(name).exists());
    }
    // a second pass is a no-op
    collect_sparse_model(root.path())?;
    assert!(model.join("images.bin").is_file());
    Ok(())
}

#[test]
fn run_requires_input_dir() -> Result<(), PipelineError> {
    let root = tempfile::tempdir()?;
    let pipeline = ColmapPipeline::default();
    assert!(matches!(
        pipeline.run(root.path()),
        Err(PipelineError::MissingInput(p)) if p == input_dir(root.path())
    ));
    Ok(())
}

#[test]
fn run_stops_when_cancelled() -> Result<(), PipelineError> {
    let root = tempfile::tempdir()?;
    fs::create_dir_all(input_dir(root.path()))?;
    let cancel = CancelToken::new();
    cancel.cancel();

    let pipeline = ColmapPipeline::new(ColmapConfig::default(), MultiResConfig::default())
        .with_cancel_token(cancel);
    assert!(matches!(
        pipeline.run(root.path()),
        Err(PipelineError::Cancelled { stage }) if stage == "feature_extractor"
    ));
    Ok(())
}

#[cfg(unix)]
#[test]
fn failing_tool_reports_stage() -> Result<(), PipelineError> {
    let root = tempfile::tempdir()?;
    fs::create_dir_all(input_dir(root.path()))?;

    let pipeline = ColmapPipeline::new(
        ColmapConfig::default().with_executable("false"),
        MultiResConfig::default().with_enabled(false),
    );
    match pipeline.run(root.path()) {
        Err(PipelineError::ExternalTool { stage, code, .. }) => {
            assert_eq!(stage, "feature_extractor");
            assert_eq!(code, Some(1));
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert!(root.path().join("distorted").join("sparse").is_dir());
    Ok(())
}
