use std::{
    fs::File,
    io::{BufReader, BufWriter, Read, Write},
    path::Path,
};

use crate::{
    CameraModelId, ColmapCamera, ColmapError, ColmapImage, ColmapPoint3d, Point2d,
    TrackElement,
};

// upper bound for pre-allocation driven by counts read from disk
const MAX_PREALLOC: usize = 1 << 16;

/// Little endian primitive reader over a buffered file.
struct LeReader<R: Read> {
    inner: R,
}

impl<R: Read> LeReader<R> {
    fn new(inner: R) -> Self {
        Self { inner }
    }

    fn bytes<const N: usize>(&mut self) -> Result<[u8; N], ColmapError> {
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8, ColmapError> {
        Ok(self.bytes::<1>()?[0])
    }

    fn u32(&mut self) -> Result<u32, ColmapError> {
        Ok(u32::from_le_bytes(self.bytes()?))
    }

    fn i32(&mut self) -> Result<i32, ColmapError> {
        Ok(i32::from_le_bytes(self.bytes()?))
    }

    fn u64(&mut self) -> Result<u64, ColmapError> {
        Ok(u64::from_le_bytes(self.bytes()?))
    }

    fn i64(&mut self) -> Result<i64, ColmapError> {
        Ok(i64::from_le_bytes(self.bytes()?))
    }

    fn f64(&mut self) -> Result<f64, ColmapError> {
        Ok(f64::from_le_bytes(self.bytes()?))
    }

    fn f64_array<const N: usize>(&mut self) -> Result<[f64; N], ColmapError> {
        let mut out = [0.0; N];
        for v in out.iter_mut() {
            *v = self.f64()?;
        }
        Ok(out)
    }

    fn count(&mut self) -> Result<usize, ColmapError> {
        let n = self.u64()?;
        usize::try_from(n).map_err(|_| ColmapError::Parse(format!("record count {n} overflows")))
    }

    /// Null terminated string.
    fn c_string(&mut self) -> Result<String, ColmapError> {
        let mut bytes = Vec::new();
        loop {
            match self.u8()? {
                0 => break,
                b => bytes.push(b),
            }
        }
        String::from_utf8(bytes).map_err(|e| {
            ColmapError::Parse(format!(
                "image name {:?} is not valid UTF-8 ({e})",
                String::from_utf8_lossy(e.as_bytes())
            ))
        })
    }

    /// Fail if anything follows the last record.
    fn expect_eof(&mut self) -> Result<(), ColmapError> {
        let mut probe = [0u8; 1];
        match self.inner.read(&mut probe)? {
            0 => Ok(()),
            _ => Err(ColmapError::Parse(
                "trailing bytes after the declared number of records".to_string(),
            )),
        }
    }
}

fn open(path: &Path) -> Result<LeReader<BufReader<File>>, ColmapError> {
    Ok(LeReader::new(BufReader::new(File::open(path)?)))
}

/// Read the cameras.bin file.
///
/// Layout: `u64 count`, then per camera `u32 id, i32 model, u64 width, u64 height, f64 params[arity]`.
pub fn read_cameras_bin(path: impl AsRef<Path>) -> Result<Vec<ColmapCamera>, ColmapError> {
    let path = path.as_ref();
    let mut reader = open(path)?;

    let num_cameras = reader.count().map_err(|e| e.at(path, "header"))?;
    let mut cameras = Vec::with_capacity(num_cameras.min(MAX_PREALLOC));
    for idx in 0..num_cameras {
        let camera = read_camera(&mut reader).map_err(|e| e.at(path, format!("camera record {idx}")))?;
        cameras.push(camera);
    }
    reader.expect_eof().map_err(|e| e.at(path, "end of file"))?;

    log::debug!("read {} cameras from {}", cameras.len(), path.display());
    Ok(cameras)
}

fn read_camera<R: Read>(reader: &mut LeReader<R>) -> Result<ColmapCamera, ColmapError> {
    let camera_id = reader.u32()?;
    let model_id = CameraModelId::from_id(reader.i32()?)?;
    let width = reader.u64()?;
    let height = reader.u64()?;
    let params = (0..model_id.num_params())
        .map(|_| reader.f64())
        .collect::<Result<Vec<_>, _>>()?;
    ColmapCamera::new(camera_id, model_id, width, height, params)
}

/// Read the images.bin file.
///
/// Layout: `u64 count`, then per image `u32 id, f64 q[4], f64 t[3], u32 camera_id,
/// name\0, u64 num_points2d, (f64 x, f64 y, i64 point3d_id)[num_points2d]`.
pub fn read_images_bin(path: impl AsRef<Path>) -> Result<Vec<ColmapImage>, ColmapError> {
    let path = path.as_ref();
    let mut reader = open(path)?;

    let num_images = reader.count().map_err(|e| e.at(path, "header"))?;
    let mut images = Vec::with_capacity(num_images.min(MAX_PREALLOC));
    for idx in 0..num_images {
        let image = read_image(&mut reader).map_err(|e| e.at(path, format!("image record {idx}")))?;
        images.push(image);
    }
    reader.expect_eof().map_err(|e| e.at(path, "end of file"))?;

    log::debug!("read {} images from {}", images.len(), path.display());
    Ok(images)
}

fn read_image<R: Read>(reader: &mut LeReader<R>) -> Result<ColmapImage, ColmapError> {
    let image_id = reader.u32()?;
    let rotation = reader.f64_array::<4>()?;
    let translation = reader.f64_array::<3>()?;
    let camera_id = reader.u32()?;
    let name = reader.c_string()?;

    let num_points2d = reader.count()?;
    let mut points2d = Vec::with_capacity(num_points2d.min(MAX_PREALLOC));
    for _ in 0..num_points2d {
        let xy = reader.f64_array::<2>()?;
        points2d.push(Point2d::from_raw(xy, reader.i64()?)?);
    }

    Ok(ColmapImage {
        name,
        image_id,
        camera_id,
        rotation,
        translation,
        points2d,
    })
}

/// Read the points3D.bin file.
///
/// Layout: `u64 count`, then per point `u64 id, f64 xyz[3], u8 rgb[3], f64 error,
/// u64 track_length, (u32 image_id, u32 point2d_idx)[track_length]`.
pub fn read_points3d_bin(path: impl AsRef<Path>) -> Result<Vec<ColmapPoint3d>, ColmapError> {
    let path = path.as_ref();
    let mut reader = open(path)?;

    let num_points = reader.count().map_err(|e| e.at(path, "header"))?;
    let mut points = Vec::with_capacity(num_points.min(MAX_PREALLOC));
    for idx in 0..num_points {
        let point = read_point3d(&mut reader).map_err(|e| e.at(path, format!("point3D record {idx}")))?;
        points.push(point);
    }
    reader.expect_eof().map_err(|e| e.at(path, "end of file"))?;

    log::debug!("read {} points from {}", points.len(), path.display());
    Ok(points)
}

fn read_point3d<R: Read>(reader: &mut LeReader<R>) -> Result<ColmapPoint3d, ColmapError> {
    let point3d_id = reader.u64()?;
    let xyz = reader.f64_array::<3>()?;
    let rgb = [reader.u8()?, reader.u8()?, reader.u8()?];
    let error = reader.f64()?;

    let track_length = reader.count()?;
    let mut track = Vec::with_capacity(track_length.min(MAX_PREALLOC));
    for _ in 0..track_length {
        track.push(TrackElement {
            image_id: reader.u32()?,
            point2d_idx: reader.u32()?,
        });
    }

    Ok(ColmapPoint3d {
        point3d_id,
        xyz,
        rgb,
        error,
        track,
    })
}

/// Write cameras in the binary layout.
pub fn write_cameras_bin(
    cameras: &[&ColmapCamera],
    path: impl AsRef<Path>,
) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writer.write_all(&(cameras.len() as u64).to_le_bytes())?;
    for camera in cameras {
        camera.check_params()?;
        writer.write_all(&camera.camera_id.to_le_bytes())?;
        writer.write_all(&camera.model_id.id().to_le_bytes())?;
        writer.write_all(&camera.width.to_le_bytes())?;
        writer.write_all(&camera.height.to_le_bytes())?;
        for param in &camera.params {
            writer.write_all(&param.to_le_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write images in the binary layout.
pub fn write_images_bin(
    images: &[&ColmapImage],
    path: impl AsRef<Path>,
) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writer.write_all(&(images.len() as u64).to_le_bytes())?;
    for image in images {
        if image.name.as_bytes().contains(&0) {
            return Err(ColmapError::Parse(format!(
                "image {} name contains a nul byte",
                image.image_id
            )));
        }
        writer.write_all(&image.image_id.to_le_bytes())?;
        for q in image.rotation {
            writer.write_all(&q.to_le_bytes())?;
        }
        for t in image.translation {
            writer.write_all(&t.to_le_bytes())?;
        }
        writer.write_all(&image.camera_id.to_le_bytes())?;
        writer.write_all(image.name.as_bytes())?;
        writer.write_all(&[0])?;
        writer.write_all(&(image.points2d.len() as u64).to_le_bytes())?;
        for point in &image.points2d {
            writer.write_all(&point.xy[0].to_le_bytes())?;
            writer.write_all(&point.xy[1].to_le_bytes())?;
            writer.write_all(&point.raw_point3d_id().to_le_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

/// Write 3D points in the binary layout.
pub fn write_points3d_bin(
    points: &[&ColmapPoint3d],
    path: impl AsRef<Path>,
) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writer.write_all(&(points.len() as u64).to_le_bytes())?;
    for point in points {
        writer.write_all(&point.point3d_id.to_le_bytes())?;
        for v in point.xyz {
            writer.write_all(&v.to_le_bytes())?;
        }
        writer.write_all(&point.rgb)?;
        writer.write_all(&point.error.to_le_bytes())?;
        writer.write_all(&(point.track.len() as u64).to_le_bytes())?;
        for element in &point.track {
            writer.write_all(&element.image_id.to_le_bytes())?;
            writer.write_all(&element.point2d_idx.to_le_bytes())?;
        }
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_cameras_bin_manual_layout() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        let mut data = Vec::new();
        data.extend_from_slice(&1u64.to_le_bytes());
        data.extend_from_slice(&5u32.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&640u64.to_le_bytes());
        data.extend_from_slice(&480u64.to_le_bytes());
        for p in [500.0f64, 320.0, 240.0] {
            data.extend_from_slice(&p.to_le_bytes());
        }
        file.write_all(&data)?;

        let cameras = read_cameras_bin(file.path())?;
        assert_eq!(cameras.len(), 1);
        assert_eq!(cameras[0].camera_id, 5);
        assert_eq!(cameras[0].model_id, CameraModelId::SimplePinhole);
        assert_eq!(cameras[0].params, vec![500.0, 320.0, 240.0]);
        Ok(())
    }

    #[test]
    fn test_read_cameras_bin_truncated() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        let mut data = Vec::new();
        data.extend_from_slice(&2u64.to_le_bytes());
        data.extend_from_slice(&5u32.to_le_bytes());
        data.extend_from_slice(&1i32.to_le_bytes());
        data.extend_from_slice(&640u64.to_le_bytes());
        file.write_all(&data)?;

        match read_cameras_bin(file.path()) {
            Err(ColmapError::Corrupt { location, .. }) => {
                assert_eq!(location, "camera record 0");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_read_cameras_bin_unknown_model() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        let mut data = Vec::new();
        data.extend_from_slice(&1u64.to_le_bytes());
        data.extend_from_slice(&5u32.to_le_bytes());
        data.extend_from_slice(&42i32.to_le_bytes());
        file.write_all(&data)?;

        match read_cameras_bin(file.path()) {
            Err(ColmapError::Corrupt { source, .. }) => {
                assert!(matches!(*source, ColmapError::UnknownCameraModel(_)));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_image_roundtrip_preserves_keypoints() -> Result<(), Box<dyn std::error::Error>> {
        let image = ColmapImage {
            name: "DJI_0001.JPG".to_string(),
            image_id: 9,
            camera_id: 2,
            rotation: [0.5, 0.5, -0.5, 0.5],
            translation: [1.0, -2.0, 3.5],
            points2d: vec![
                Point2d {
                    xy: [10.25, 4.0],
                    point3d_id: None,
                },
                Point2d {
                    xy: [3.0, 7.5],
                    point3d_id: Some(1234),
                },
            ],
        };
        let file = NamedTempFile::new()?;
        write_images_bin(&[&image], file.path())?;
        let images = read_images_bin(file.path())?;
        assert_eq!(images, vec![image]);
        Ok(())
    }

    #[test]
    fn test_non_utf8_image_name_reported() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        let mut data = Vec::new();
        data.extend_from_slice(&1u64.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        for v in [1.0f64, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&[b'i', b'm', 0xff, b'g', 0]);
        data.extend_from_slice(&0u64.to_le_bytes());
        file.write_all(&data)?;

        match read_images_bin(file.path()) {
            Err(ColmapError::Corrupt {
                location, source, ..
            }) => {
                assert_eq!(location, "image record 0");
                assert!(source.to_string().contains("not valid UTF-8"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn test_trailing_bytes_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let mut file = NamedTempFile::new()?;
        file.write_all(&0u64.to_le_bytes())?;
        file.write_all(&[7])?;
        assert!(matches!(
            read_points3d_bin(file.path()),
            Err(ColmapError::Corrupt { .. })
        ));
        Ok(())
    }
}
