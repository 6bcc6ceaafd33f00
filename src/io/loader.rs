use std::path::Path;

use image::{ColorType, DynamicImage};
use ndarray::Array3;
use tracing::{debug, warn};

use crate::{
    error::{BatcherError, ImageIoError, Result},
    tensor::ImageTensor,
};

/// Load one image file as a single-frame tensor with values in [0, 1]
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ImageTensor<f32>> {
    let frame = load_frame(path.as_ref())?;
    Ok(ImageTensor::from_frames(&[frame])?)
}

/// Load several image files as one batch, in the order given
///
/// Every image must share the first image's size and channel count.
pub fn load_batch<P: AsRef<Path>>(paths: &[P]) -> Result<ImageTensor<f32>> {
    if paths.is_empty() {
        return Err(ImageIoError::NoImages {
            context: "batch".to_string(),
        }
        .into());
    }

    let frames = paths
        .iter()
        .map(|p| load_frame(p.as_ref()))
        .collect::<Result<Vec<_>>>()?;

    let tensor = ImageTensor::from_frames(&frames)?;
    debug!(
        "Loaded batch of {} frames ({}x{}x{})",
        tensor.batch_size(),
        tensor.width(),
        tensor.height(),
        tensor.channels()
    );
    Ok(tensor)
}

fn load_frame(path: &Path) -> Result<Array3<f32>> {
    let img = image::open(path).map_err(|e| {
        warn!("Failed to decode {:?}: {}", path, e);
        ImageIoError::LoadFailed {
            path: path.display().to_string(),
        }
    })?;
    image_to_frame(&img)
}

/// Convert a decoded image into an (H, W, C) frame
///
/// Grayscale becomes one channel, anything with alpha four, everything
/// else three.
pub fn image_to_frame(img: &DynamicImage) -> Result<Array3<f32>> {
    let (width, height) = (img.width() as usize, img.height() as usize);

    let (channels, data): (usize, Vec<f32>) = match img.color() {
        ColorType::L8 => (1, scale(img.to_luma8().into_raw(), 255.0)),
        ColorType::L16 => (1, scale(img.to_luma16().into_raw(), 65535.0)),
        color if color.has_alpha() => (4, img.to_rgba32f().into_raw()),
        _ => (3, img.to_rgb32f().into_raw()),
    };

    Array3::from_shape_vec((height, width, channels), data).map_err(|e| {
        BatcherError::generic(format!("Decoded image buffer has unexpected size: {}", e))
    })
}

fn scale<V: Into<f32>>(raw: Vec<V>, max: f32) -> Vec<f32> {
    raw.into_iter().map(|v| v.into() / max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn test_gray_image_has_one_channel() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(3, 2, Luma([255])));
        let frame = image_to_frame(&img).unwrap();
        assert_eq!(frame.dim(), (2, 3, 1));
        assert!(frame.iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_rgba_image_has_four_channels() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])));
        let frame = image_to_frame(&img).unwrap();
        assert_eq!(frame.dim(), (2, 2, 4));
        assert_eq!(frame[[1, 1, 0]], 1.0);
        assert_eq!(frame[[1, 1, 1]], 0.0);
        assert_eq!(frame[[1, 1, 3]], 1.0);
    }

    #[test]
    fn test_load_batch_from_files() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        RgbImage::from_pixel(4, 2, Rgb([0, 0, 0])).save(&a).unwrap();
        RgbImage::from_pixel(4, 2, Rgb([255, 255, 255])).save(&b).unwrap();

        let batch = load_batch(&[&a, &b]).unwrap();
        assert_eq!(batch.batch_size(), 2);
        assert_eq!((batch.height(), batch.width(), batch.channels()), (2, 4, 3));
        assert!(batch.frame(1).unwrap().iter().all(|&v| v == 1.0));
    }

    #[test]
    fn test_load_batch_rejects_mixed_sizes() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.png");
        RgbImage::new(4, 2).save(&a).unwrap();
        RgbImage::new(2, 2).save(&b).unwrap();

        assert!(load_batch(&[&a, &b]).is_err());
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let err = load_image("definitely/not/here.png").unwrap_err();
        assert!(err.user_message().contains("definitely/not/here.png"));
    }
}
