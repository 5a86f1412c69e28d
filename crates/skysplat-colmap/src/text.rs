use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use crate::{
    CameraModelId, ColmapCamera, ColmapError, ColmapImage, ColmapPoint3d, Point2d,
    TrackElement,
};

/// Read the cameras.txt file and return a vector of ColmapCamera structs.
///
/// # Arguments
///
/// * `path` - The path to the cameras.txt file.
///
/// # Returns
///
/// A vector of ColmapCamera structs.
pub fn read_cameras_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapCamera>, ColmapError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut cameras = Vec::new();
    for (line_no, line) in data_lines(reader) {
        let camera = parse_camera_line(&line?).map_err(|e| e.at(path, line_label(line_no)))?;
        cameras.push(camera);
    }

    log::debug!("read {} cameras from {}", cameras.len(), path.display());
    Ok(cameras)
}

/// Read the points3D.txt file and return a vector of ColmapPoint3d structs.
///
/// # Arguments
///
/// * `path` - The path to the points3D.txt file.
///
/// # Returns
///
/// A vector of ColmapPoint3d structs.
pub fn read_points3d_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapPoint3d>, ColmapError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut points = Vec::new();
    for (line_no, line) in data_lines(reader) {
        let point = parse_point3d_line(&line?).map_err(|e| e.at(path, line_label(line_no)))?;
        points.push(point);
    }

    log::debug!("read {} points from {}", points.len(), path.display());
    Ok(points)
}

/// Read the images.txt file and return a vector of ColmapImage structs.
///
/// Each image spans two lines. The keypoint line may be empty, so only the
/// pose line is searched for past blank lines.
///
/// # Arguments
///
/// * `path` - The path to the images.txt file.
///
/// # Returns
///
/// A vector of ColmapImage structs.
pub fn read_images_txt(path: impl AsRef<Path>) -> Result<Vec<ColmapImage>, ColmapError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    let mut lines = reader
        .lines()
        .enumerate()
        .filter(|(_, line)| !matches!(line, Ok(l) if l.starts_with('#')));

    let mut images = Vec::new();
    while let Some((line_no, line1)) = lines.next() {
        let line1 = line1?;
        if line1.trim().is_empty() {
            continue;
        }
        let line2 = match lines.next() {
            Some((_, line2)) => line2?,
            None => {
                return Err(ColmapError::Parse(
                    "missing keypoint line after pose line".to_string(),
                )
                .at(path, line_label(line_no)))
            }
        };
        let image =
            parse_image_lines(&line1, &line2).map_err(|e| e.at(path, line_label(line_no)))?;
        images.push(image);
    }

    log::debug!("read {} images from {}", images.len(), path.display());
    Ok(images)
}

/// Write cameras in the text layout.
pub fn write_cameras_txt(
    cameras: &[&ColmapCamera],
    path: impl AsRef<Path>,
) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writeln!(writer, "# Camera list with one line of data per camera:")?;
    writeln!(writer, "#   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]")?;
    writeln!(writer, "# Number of cameras: {}", cameras.len())?;
    for camera in cameras {
        camera.check_params()?;
        write!(
            writer,
            "{} {} {} {}",
            camera.camera_id,
            camera.model_id.name(),
            camera.width,
            camera.height
        )?;
        for param in &camera.params {
            write!(writer, " {param}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Write images in the text layout.
///
/// `mean_observations` goes into the header only.
pub fn write_images_txt(
    images: &[&ColmapImage],
    mean_observations: f64,
    path: impl AsRef<Path>,
) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writeln!(writer, "# Image list with two lines of data per image:")?;
    writeln!(
        writer,
        "#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME"
    )?;
    writeln!(writer, "#   POINTS2D[] as (X, Y, POINT3D_ID)")?;
    writeln!(
        writer,
        "# Number of images: {}, mean observations per image: {}",
        images.len(),
        mean_observations
    )?;
    for image in images {
        let [qw, qx, qy, qz] = image.rotation;
        let [tx, ty, tz] = image.translation;
        writeln!(
            writer,
            "{} {qw} {qx} {qy} {qz} {tx} {ty} {tz} {} {}",
            image.image_id, image.camera_id, image.name
        )?;
        let keypoints = image
            .points2d
            .iter()
            .map(|p| format!("{} {} {}", p.xy[0], p.xy[1], p.raw_point3d_id()))
            .collect::<Vec<_>>();
        writeln!(writer, "{}", keypoints.join(" "))?;
    }
    writer.flush()?;
    Ok(())
}

/// Write 3D points in the text layout.
pub fn write_points3d_txt(
    points: &[&ColmapPoint3d],
    mean_track_length: f64,
    path: impl AsRef<Path>,
) -> Result<(), ColmapError> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    writeln!(writer, "# 3D point list with one line of data per point:")?;
    writeln!(
        writer,
        "#   POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[] as (IMAGE_ID, POINT2D_IDX)"
    )?;
    writeln!(
        writer,
        "# Number of points: {}, mean track length: {}",
        points.len(),
        mean_track_length
    )?;
    for point in points {
        let [x, y, z] = point.xyz;
        let [r, g, b] = point.rgb;
        write!(
            writer,
            "{} {x} {y} {z} {r} {g} {b} {}",
            point.point3d_id, point.error
        )?;
        for element in &point.track {
            write!(writer, " {} {}", element.image_id, element.point2d_idx)?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Non-comment, non-blank lines with their zero based line index.
fn data_lines<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = (usize, std::io::Result<String>)> {
    reader.lines().enumerate().filter(|(_, line)| match line {
        Ok(l) => {
            let trimmed = l.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        }
        Err(_) => true,
    })
}

fn line_label(line_idx: usize) -> String {
    format!("line {}", line_idx + 1)
}

/// Utility functions for parsing COLMAP text files
fn parse_part<T: std::str::FromStr>(s: &str) -> Result<T, ColmapError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| ColmapError::Parse(format!("{}: {}", s, e)))
}

fn parse_array<T: std::str::FromStr + Copy + Default, const N: usize>(
    parts: &[&str],
) -> Result<[T; N], ColmapError>
where
    T::Err: std::fmt::Display,
{
    let mut out = [T::default(); N];
    for (dst, s) in out.iter_mut().zip(parts) {
        *dst = parse_part(s)?;
    }
    Ok(out)
}

/// Parse a camera line and return a ColmapCamera struct.
/// NOTE: The number of parameters depends on the camera model.
///       CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[0], PARAMS[1], ...
fn parse_camera_line(line: &str) -> Result<ColmapCamera, ColmapError> {
    // split the line into parts by whitespace
    let parts = line.split_whitespace().collect::<Vec<_>>();

    if parts.len() < 4 {
        return Err(ColmapError::InvalidFieldCount {
            record: "camera line",
            expected: 4,
            actual: parts.len(),
        });
    }

    ColmapCamera::new(
        parse_part(parts[0])?,
        CameraModelId::from_name(parts[1])?,
        parse_part(parts[2])?,
        parse_part(parts[3])?,
        parts[4..]
            .iter()
            .map(|s| parse_part(s))
            .collect::<Result<Vec<_>, _>>()?,
    )
}

/// Parse a point3d line and return a ColmapPoint3d struct.
///       POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[0], TRACK[1], ...
fn parse_point3d_line(line: &str) -> Result<ColmapPoint3d, ColmapError> {
    // split the line into parts by whitespace
    let parts = line.split_whitespace().collect::<Vec<_>>();

    // check if the number of parts is correct
    if parts.len() < 8 {
        return Err(ColmapError::InvalidFieldCount {
            record: "point3D line",
            expected: 8,
            actual: parts.len(),
        });
    }

    let track_parts = &parts[8..];
    if track_parts.len() % 2 != 0 {
        return Err(ColmapError::InvalidFieldCount {
            record: "point3D track",
            expected: track_parts.len() + 1,
            actual: track_parts.len(),
        });
    }

    Ok(ColmapPoint3d {
        point3d_id: parse_part(parts[0])?,
        xyz: parse_array(&parts[1..4])?,
        rgb: parse_array(&parts[4..7])?,
        error: parse_part(parts[7])?,
        track: track_parts
            .chunks_exact(2)
            .map(|chunk| -> Result<TrackElement, ColmapError> {
                Ok(TrackElement {
                    image_id: parse_part(chunk[0])?,
                    point2d_idx: parse_part(chunk[1])?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
    })
}

/// Split off the first `n` whitespace separated tokens and return the rest
/// verbatim, minus the single separator in front of it.
fn split_leading_fields(line: &str, n: usize) -> Option<(Vec<&str>, &str)> {
    let mut rest = line.trim_start();
    let mut fields = Vec::with_capacity(n);
    for i in 0..n {
        let end = rest.find(char::is_whitespace)?;
        fields.push(&rest[..end]);
        rest = &rest[end..];
        if i + 1 < n {
            rest = rest.trim_start();
        }
    }
    let separator = rest.chars().next()?;
    Some((fields, &rest[separator.len_utf8()..]))
}

/// Parse an image line pair and return a ColmapImage struct.
/// #   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
/// #   POINTS2D[] as (X, Y, POINT3D_ID)
fn parse_image_lines(line1: &str, line2: &str) -> Result<ColmapImage, ColmapError> {
    // the name is the remainder of the line and may contain spaces
    let (parts1, name) = match split_leading_fields(line1, 9) {
        Some((parts, name)) if !name.is_empty() => {
            (parts, name.strip_suffix('\r').unwrap_or(name))
        }
        _ => {
            return Err(ColmapError::InvalidFieldCount {
                record: "image line",
                expected: 10,
                actual: line1.split_whitespace().count(),
            })
        }
    };

    let parts2 = line2.split_whitespace().collect::<Vec<_>>();
    if parts2.len() % 3 != 0 {
        return Err(ColmapError::InvalidFieldCount {
            record: "image keypoint line",
            expected: parts2.len() - parts2.len() % 3 + 3,
            actual: parts2.len(),
        });
    }

    Ok(ColmapImage {
        image_id: parse_part(parts1[0])?,
        rotation: parse_array(&parts1[1..5])?,
        translation: parse_array(&parts1[5..8])?,
        camera_id: parse_part(parts1[8])?,
        name: name.to_string(),
        points2d: parts2
            .chunks_exact(3)
            .map(|chunk| -> Result<Point2d, ColmapError> {
                Point2d::from_raw(
                    [parse_part(chunk[0])?, parse_part(chunk[1])?],
                    parse_part(chunk[2])?,
                )
            })
            .collect::<Result<Vec<_>, _>>()?,
    })
}
