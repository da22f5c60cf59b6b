//! NIfTI helpers used around the viewers.
//!
//! Orientation codes follow the SCT convention: each letter names the side a
//! voxel axis starts from, so an identity affine is `LPI`.

use std::path::Path;

use nalgebra::Matrix4;
use ndarray::{ArrayD, Axis, IxDyn};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, NiftiType, ReaderOptions};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Letter for a voxel axis running along +world (index = world axis).
const FROM_NEGATIVE: [char; 3] = ['L', 'P', 'I'];
/// Letter for a voxel axis running along -world.
const FROM_POSITIVE: [char; 3] = ['R', 'A', 'S'];

fn read_volume(path: &Path) -> Result<(NiftiHeader, ArrayD<f64>)> {
    let obj = ReaderOptions::new().read_file(path)?;
    let header = obj.header().clone();
    let data = obj.into_volume().into_ndarray::<f64>()?;
    Ok((header, data))
}

/// Writes `data` with the datatype of `header` where it is an integer label
/// type, float32 otherwise.
fn write_like(path: &Path, header: &NiftiHeader, data: &ArrayD<f64>) -> Result<()> {
    let writer = WriterOptions::new(path).reference_header(header);
    match header.data_type()? {
        NiftiType::Uint8 => writer.write_nifti(&data.mapv(|v| v as u8))?,
        NiftiType::Int16 => writer.write_nifti(&data.mapv(|v| v as i16))?,
        NiftiType::Int32 => writer.write_nifti(&data.mapv(|v| v as i32))?,
        _ => writer.write_nifti(&data.mapv(|v| v as f32))?,
    }
    Ok(())
}

/// Writes a zero-filled mask with the geometry of `image` to `label`.
pub fn create_empty_mask(image: &Path, label: &Path) -> Result<()> {
    let (mut header, data) = read_volume(image)?;
    let mask = ArrayD::<u8>::zeros(data.raw_dim());
    header.scl_slope = 1.0;
    header.scl_inter = 0.0;
    WriterOptions::new(label)
        .reference_header(&header)
        .write_nifti(&mask)?;
    info!("No label file found, creating an empty mask: {}", label.display());
    Ok(())
}

/// Minimum and maximum intensity of `image`.
pub fn image_intensities(image: &Path) -> Result<(f64, f64)> {
    let (_, data) = read_volume(image)?;
    if data.is_empty() {
        return Err(Error::InvalidInput(format!("{} holds no voxels", image.display())));
    }
    let min = data.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = data.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    Ok((min, max))
}

fn world_axis(letter: char) -> Option<usize> {
    match letter {
        'R' | 'L' => Some(0),
        'A' | 'P' => Some(1),
        'S' | 'I' => Some(2),
        _ => None,
    }
}

/// Orientation letters of the three voxel axes of `affine`.
pub fn axis_codes(affine: &Matrix4<f64>) -> Result<[char; 3]> {
    let mut codes = [' '; 3];
    let mut used = [false; 3];
    for (j, code) in codes.iter_mut().enumerate() {
        let (world, value) = (0..3)
            .map(|i| (i, affine[(i, j)]))
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .ok_or_else(|| Error::Orientation("empty affine".into()))?;
        if value == 0.0 || !value.is_finite() {
            return Err(Error::Orientation(format!("voxel axis {j} has no direction")));
        }
        if used[world] {
            return Err(Error::Orientation(format!(
                "two voxel axes point along world axis {world}"
            )));
        }
        used[world] = true;
        *code = if value > 0.0 {
            FROM_NEGATIVE[world]
        } else {
            FROM_POSITIVE[world]
        };
    }
    Ok(codes)
}

pub fn orientation_from_affine(affine: &Matrix4<f64>) -> Result<String> {
    Ok(axis_codes(affine)?.iter().collect())
}

/// Validates a code such as `RPI` or `ail`.
pub fn parse_orientation(code: &str) -> Result<[char; 3]> {
    let letters: Vec<char> = code.trim().to_uppercase().chars().collect();
    let invalid = || Error::InvalidInput(format!("'{code}' is not an orientation code"));
    if letters.len() != 3 {
        return Err(invalid());
    }
    let mut seen = [false; 3];
    for letter in &letters {
        let axis = world_axis(*letter).ok_or_else(invalid)?;
        if seen[axis] {
            return Err(invalid());
        }
        seen[axis] = true;
    }
    Ok([letters[0], letters[1], letters[2]])
}

pub fn get_orientation(path: &Path) -> Result<String> {
    let header = NiftiHeader::from_file(path)?;
    orientation_from_affine(&header.affine::<f64>())
}

/// Result of [`reorient`].
#[derive(Debug, Clone)]
pub struct Reoriented {
    pub data: ArrayD<f64>,
    pub affine: Matrix4<f64>,
    /// `perm[j]` is the source axis of output axis `j`
    pub perm: [usize; 3],
}

/// Permutes and flips the first three axes of `data` from `from` to `to`.
///
/// Trailing axes (time, channels) are kept in place. The affine follows the
/// data so that every voxel keeps its world position.
pub fn reorient(
    data: ArrayD<f64>,
    affine: &Matrix4<f64>,
    from: [char; 3],
    to: [char; 3],
) -> Result<Reoriented> {
    if data.ndim() < 3 {
        return Err(Error::InvalidInput(format!(
            "cannot reorient a {}D volume",
            data.ndim()
        )));
    }
    let shape = data.shape().to_vec();
    let mut perm = [0usize; 3];
    let mut flips = [false; 3];
    for j in 0..3 {
        let target = world_axis(to[j]);
        let source = (0..3)
            .find(|&i| world_axis(from[i]) == target)
            .ok_or_else(|| Error::Orientation(format!("no voxel axis maps to '{}'", to[j])))?;
        perm[j] = source;
        flips[j] = from[source] != to[j];
    }

    let mut axes: Vec<usize> = (0..data.ndim()).collect();
    axes[..3].copy_from_slice(&perm);
    let mut out = data.permuted_axes(IxDyn(&axes));
    let mut new_affine = *affine;
    for j in 0..3 {
        let i = perm[j];
        let sign = if flips[j] { -1.0 } else { 1.0 };
        for r in 0..3 {
            new_affine[(r, j)] = affine[(r, i)] * sign;
        }
        if flips[j] {
            out.invert_axis(Axis(j));
            // first voxel of the flipped axis is the old last one
            for r in 0..3 {
                new_affine[(r, 3)] += affine[(r, i)] * (shape[i] as f64 - 1.0);
            }
        }
    }

    Ok(Reoriented {
        data: out.as_standard_layout().into_owned(),
        affine: new_affine,
        perm,
    })
}

/// Reorients the file at `path` in place. Returns false if it already had
/// the requested orientation.
pub fn change_orientation(path: &Path, code: &str) -> Result<bool> {
    let to = parse_orientation(code)?;
    let (mut header, data) = read_volume(path)?;
    let affine = header.affine::<f64>();
    let from = axis_codes(&affine)?;
    if from == to {
        debug!("{} already in {code}", path.display());
        return Ok(false);
    }

    let reoriented = reorient(data, &affine, from, to)?;
    let old_pixdim = header.pixdim;
    for (j, &i) in reoriented.perm.iter().enumerate() {
        header.pixdim[j + 1] = old_pixdim[i + 1];
        header.dim[j + 1] = reoriented.data.shape()[j] as u16;
    }
    header.set_affine(&reoriented.affine);
    header.scl_slope = 1.0;
    header.scl_inter = 0.0;
    write_like(path, &header, &reoriented.data)?;
    info!(
        "Changed orientation of {} from {} to {}",
        path.display(),
        from.iter().collect::<String>(),
        to.iter().collect::<String>()
    );
    Ok(true)
}
