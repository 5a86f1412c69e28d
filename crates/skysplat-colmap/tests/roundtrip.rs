use std::path::Path;

use skysplat_colmap::{
    detect_format, read_model, write_model, CameraModelId, ColmapCamera, ColmapError,
    ColmapImage, ColmapPoint3d, ModelFormat, Point2d, Reconstruction, TrackElement,
};

fn sample_model() -> Reconstruction {
    let cameras = vec![
        ColmapCamera {
            camera_id: 1,
            model_id: CameraModelId::Pinhole,
            width: 1920,
            height: 1080,
            params: vec![1000.0, 1000.0, 960.0, 540.0],
        },
        ColmapCamera {
            camera_id: 4,
            model_id: CameraModelId::OpenCV,
            width: 4000,
            height: 3000,
            params: vec![2950.125, 2951.5, 2000.0, 1500.0, -0.01, 0.002, 1e-5, -3e-6],
        },
    ];
    let images = (1..=3)
        .map(|id| ColmapImage {
            name: format!("DJI_{id:04}.JPG"),
            image_id: id,
            camera_id: if id == 2 { 4 } else { 1 },
            rotation: [0.9238795325112867, 0.0, 0.3826834323650898, 0.0],
            translation: [0.1 * id as f64, -0.25, 3.0],
            points2d: vec![
                Point2d {
                    xy: [12.5, 99.0],
                    point3d_id: Some(10),
                },
                Point2d {
                    xy: [1.0 / 3.0, 2.0],
                    point3d_id: None,
                },
            ],
        })
        .collect();
    let points3d = vec![
        ColmapPoint3d {
            point3d_id: 10,
            xyz: [0.1, 0.2, 0.30000000000000004],
            rgb: [200, 10, 0],
            error: 0.4123,
            track: (1..=3)
                .map(|image_id| TrackElement {
                    image_id,
                    point2d_idx: 0,
                })
                .collect(),
        },
        ColmapPoint3d {
            point3d_id: 11,
            xyz: [-5.0, 1e-9, 123456.789],
            rgb: [0, 0, 255],
            error: 1.0,
            track: vec![],
        },
    ];
    Reconstruction::from_parts(cameras, images, points3d).expect("valid sample model")
}

fn file_bytes(dir: &Path, format: ModelFormat) -> Vec<Vec<u8>> {
    format
        .files(dir)
        .iter()
        .map(|p| std::fs::read(p).expect("model file readable"))
        .collect()
}

fn assert_roundtrip(format: ModelFormat) -> Result<(), Box<dyn std::error::Error>> {
    let model = sample_model();
    let first = tempfile::tempdir()?;
    let second = tempfile::tempdir()?;

    write_model(&model, first.path(), format)?;
    assert_eq!(detect_format(first.path())?, format);

    let loaded = read_model(first.path())?;
    assert_eq!(loaded, model);

    write_model(&loaded, second.path(), format)?;
    assert_eq!(
        file_bytes(first.path(), format),
        file_bytes(second.path(), format)
    );
    Ok(())
}

#[test]
fn binary_roundtrip_is_byte_identical() -> Result<(), Box<dyn std::error::Error>> {
    assert_roundtrip(ModelFormat::Binary)
}

#[test]
fn text_roundtrip_is_byte_identical() -> Result<(), Box<dyn std::error::Error>> {
    assert_roundtrip(ModelFormat::Text)
}

#[test]
fn text_and_binary_decode_to_same_model() -> Result<(), Box<dyn std::error::Error>> {
    let model = sample_model();
    let txt = tempfile::tempdir()?;
    let bin = tempfile::tempdir()?;
    write_model(&model, txt.path(), ModelFormat::Text)?;
    write_model(&model, bin.path(), ModelFormat::Binary)?;
    assert_eq!(read_model(txt.path())?, read_model(bin.path())?);
    Ok(())
}

#[test]
fn binary_preferred_when_both_present() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    write_model(&sample_model(), dir.path(), ModelFormat::Text)?;
    write_model(&sample_model(), dir.path(), ModelFormat::Binary)?;
    assert_eq!(detect_format(dir.path())?, ModelFormat::Binary);
    Ok(())
}

#[test]
fn missing_model_and_missing_file() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    assert!(matches!(
        read_model(dir.path()),
        Err(ColmapError::MissingModel(_))
    ));

    write_model(&sample_model(), dir.path(), ModelFormat::Text)?;
    std::fs::remove_file(dir.path().join("images.txt"))?;
    match read_model(dir.path()) {
        Err(ColmapError::MissingFile(path)) => {
            assert_eq!(path, dir.path().join("images.txt"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn dangling_camera_aborts_read() -> Result<(), Box<dyn std::error::Error>> {
    let mut model = sample_model();
    model.cameras.remove(&4);

    let dir = tempfile::tempdir()?;
    write_model(&model, dir.path(), ModelFormat::Binary)?;
    match read_model(dir.path()) {
        Err(ColmapError::Corrupt { source, .. }) => {
            assert!(matches!(
                *source,
                ColmapError::DanglingCamera {
                    image_id: 2,
                    camera_id: 4
                }
            ));
        }
        other => panic!("unexpected result: {other:?}"),
    }
    Ok(())
}

#[test]
fn padded_image_names_survive_both_layouts() -> Result<(), Box<dyn std::error::Error>> {
    let mut model = sample_model();
    let names = [" frame 01.jpg ", "  two  spaces.png", "tab\tname.jpg\t"];
    for (image, name) in model.images.values_mut().zip(names) {
        image.name = name.to_string();
    }

    for format in [ModelFormat::Text, ModelFormat::Binary] {
        let dir = tempfile::tempdir()?;
        write_model(&model, dir.path(), format)?;
        let back = read_model(dir.path())?;
        for (id, image) in &model.images {
            assert_eq!(back.images[id].name, image.name, "{format:?}");
        }
    }
    Ok(())
}
