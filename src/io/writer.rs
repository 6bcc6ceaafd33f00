use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};
use ndarray::ArrayView3;
use tracing::debug;

use crate::{
    error::{ImageIoError, Result},
    tensor::{FrameBatch, Sample},
};

/// Write every frame of `batch` into `dir` as `<prefix>_00000.png`, ...
///
/// Returns the written paths in slot order.
pub fn save_batch<T: Sample, P: AsRef<Path>>(
    batch: &FrameBatch<T>,
    dir: P,
    prefix: &str,
) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(batch.len());
    for (slot, frame) in batch.frames().enumerate() {
        let path = dir.join(format!("{}_{:05}.png", prefix, slot));
        frame_to_image(&frame, &path)?
            .save(&path)
            .map_err(|e| ImageIoError::SaveFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        written.push(path);
    }

    debug!("Wrote {} frames to {:?}", written.len(), dir);
    Ok(written)
}

/// Quantize an (H, W, C) frame to 8 bits per channel
///
/// Values are clamped to [0, 1]. `path` only labels the error.
fn frame_to_image<T: Sample>(frame: &ArrayView3<'_, T>, path: &Path) -> Result<DynamicImage> {
    let (height, width, channels) = frame.dim();
    let raw: Vec<u8> = frame.iter().map(|v| to_u8(v.to_f64())).collect();
    let (width, height) = (width as u32, height as u32);

    let image = match channels {
        1 => GrayImage::from_raw(width, height, raw).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, raw).map(DynamicImage::ImageRgb8),
        4 => RgbaImage::from_raw(width, height, raw).map(DynamicImage::ImageRgba8),
        _ => None,
    };

    image.ok_or_else(|| {
        ImageIoError::SaveFailed {
            path: path.display().to_string(),
            reason: format!("cannot encode a {}-channel frame", channels),
        }
        .into()
    })
}

fn to_u8(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}
