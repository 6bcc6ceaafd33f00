use std::fmt;

use ndarray::{stack, Array3, Array4, ArrayView3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::TensorError;

/// Channel counts a frame may carry: grayscale, RGB, RGBA
pub const SUPPORTED_CHANNELS: [usize; 3] = [1, 3, 4];

/// Numeric element stored in a tensor
///
/// All arithmetic (interpolation, channel averaging) is carried out in `f64`
/// and converted back, so implementors only need lossless-enough conversions.
pub trait Sample: Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Runtime tag for this element type
    const ELEMENT_TYPE: ElementType;

    fn to_f64(self) -> f64;

    fn from_f64(value: f64) -> Self;
}

impl Sample for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::F32;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Sample for f64 {
    const ELEMENT_TYPE: ElementType = ElementType::F64;

    fn to_f64(self) -> f64 {
        self
    }

    fn from_f64(value: f64) -> Self {
        value
    }
}

/// Element type tag carried by a [`FrameSpec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    F32,
    F64,
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementType::F32 => write!(f, "f32"),
            ElementType::F64 => write!(f, "f64"),
        }
    }
}

/// Where a tensor's storage lives
///
/// Only host memory is implemented; the tag is carried so that allocations
/// made from a [`FrameSpec`] land next to the source that defined it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Device {
    #[default]
    Cpu,
}

/// Canonical frame geometry shared by every buffer of one composition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpec {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub element_type: ElementType,
    pub device: Device,
}

impl FrameSpec {
    /// Geometry of a single frame of `tensor`
    pub fn of<T: Sample>(tensor: &ImageTensor<T>) -> Self {
        Self {
            height: tensor.height(),
            width: tensor.width(),
            channels: tensor.channels(),
            element_type: T::ELEMENT_TYPE,
            device: tensor.device(),
        }
    }

    /// 1x1x3 geometry reported when no source defines one
    pub fn placeholder<T: Sample>() -> Self {
        Self {
            height: 1,
            width: 1,
            channels: 3,
            element_type: T::ELEMENT_TYPE,
            device: Device::Cpu,
        }
    }

    /// (height, width, channels)
    pub fn dims(&self) -> (usize, usize, usize) {
        (self.height, self.width, self.channels)
    }

    /// Number of elements in one frame
    pub fn frame_len(&self) -> usize {
        self.height * self.width * self.channels
    }
}

impl fmt::Display for FrameSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{} {} ({:?})",
            self.width, self.height, self.channels, self.element_type, self.device
        )
    }
}

/// A batch of images laid out as (batch, height, width, channels)
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor<T: Sample = f32> {
    data: Array4<T>,
    device: Device,
}

impl<T: Sample> ImageTensor<T> {
    /// Wrap an existing array, validating its geometry
    pub fn from_array(data: Array4<T>) -> Result<Self, TensorError> {
        let (batch, height, width, channels) = data.dim();
        validate_dims(batch, height, width, channels)?;
        Ok(Self {
            data,
            device: Device::Cpu,
        })
    }

    /// Build a tensor from row-major (batch, height, width, channels) data
    pub fn from_shape_vec(
        shape: (usize, usize, usize, usize),
        data: Vec<T>,
    ) -> Result<Self, TensorError> {
        let (batch, height, width, channels) = shape;
        validate_dims(batch, height, width, channels)?;

        // a standard-layout shape only fails on element count
        let actual = data.len();
        let data = Array4::from_shape_vec(shape, data).map_err(|_| TensorError::DataLength {
            shape: [batch, height, width, channels],
            expected: batch * height * width * channels,
            actual,
        })?;
        Self::from_array(data)
    }

    /// Stack equally-shaped frames into one batch
    pub fn from_frames(frames: &[Array3<T>]) -> Result<Self, TensorError> {
        let first = frames.first().ok_or(TensorError::EmptyDimension { axis: "batch" })?;
        let (height, width, channels) = first.dim();
        validate_dims(1, height, width, channels)?;

        for (index, frame) in frames.iter().enumerate().skip(1) {
            let (h, w, c) = frame.dim();
            if (h, w, c) != (height, width, channels) {
                return Err(TensorError::ShapeMismatch {
                    index,
                    expected: [height, width, channels],
                    actual: [h, w, c],
                });
            }
        }

        let views: Vec<ArrayView3<'_, T>> = frames.iter().map(|f| f.view()).collect();
        let data = stack(Axis(0), &views).map_err(|_| TensorError::ShapeMismatch {
            index: 0,
            expected: [height, width, channels],
            actual: [height, width, channels],
        })?;
        Self::from_array(data)
    }

    /// A tensor whose every element is `value`
    pub fn filled(shape: (usize, usize, usize, usize), value: T) -> Result<Self, TensorError> {
        let (batch, height, width, channels) = shape;
        validate_dims(batch, height, width, channels)?;
        Self::from_array(Array4::from_elem(shape, value))
    }

    pub fn batch_size(&self) -> usize {
        self.data.dim().0
    }

    pub fn height(&self) -> usize {
        self.data.dim().1
    }

    pub fn width(&self) -> usize {
        self.data.dim().2
    }

    pub fn channels(&self) -> usize {
        self.data.dim().3
    }

    pub fn device(&self) -> Device {
        self.device
    }

    pub fn element_type(&self) -> ElementType {
        T::ELEMENT_TYPE
    }

    /// View of frame `index`, or `None` past the end of the batch
    pub fn frame(&self, index: usize) -> Option<ArrayView3<'_, T>> {
        (index < self.batch_size()).then(|| self.data.index_axis(Axis(0), index))
    }

    pub fn as_array(&self) -> &Array4<T> {
        &self.data
    }

    pub fn into_array(self) -> Array4<T> {
        self.data
    }
}

fn validate_dims(
    batch: usize,
    height: usize,
    width: usize,
    channels: usize,
) -> Result<(), TensorError> {
    for (axis, size) in [("batch", batch), ("height", height), ("width", width)] {
        if size == 0 {
            return Err(TensorError::EmptyDimension { axis });
        }
    }
    if !SUPPORTED_CHANNELS.contains(&channels) {
        return Err(TensorError::UnsupportedChannels { channels });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_shape_vec_validates_length() {
        let err = ImageTensor::<f32>::from_shape_vec((1, 2, 2, 3), vec![0.0; 11]).unwrap_err();
        assert_eq!(
            err,
            TensorError::DataLength {
                shape: [1, 2, 2, 3],
                expected: 12,
                actual: 11
            }
        );

        let err = ImageTensor::<f32>::from_shape_vec((2, 1, 1, 1), vec![0.0; 3]).unwrap_err();
        assert_eq!(
            err,
            TensorError::DataLength {
                shape: [2, 1, 1, 1],
                expected: 2,
                actual: 3
            }
        );
    }

    #[test]
    fn test_rejects_unsupported_channels() {
        let err = ImageTensor::<f32>::filled((1, 2, 2, 2), 0.0).unwrap_err();
        assert_eq!(err, TensorError::UnsupportedChannels { channels: 2 });
    }

    #[test]
    fn test_rejects_empty_batch() {
        let err = ImageTensor::<f32>::filled((0, 2, 2, 3), 0.0).unwrap_err();
        assert_eq!(err, TensorError::EmptyDimension { axis: "batch" });
    }

    #[test]
    fn test_from_frames_detects_mismatch() {
        let frames = vec![
            Array3::<f32>::zeros((2, 2, 3)),
            Array3::<f32>::zeros((2, 3, 3)),
        ];
        let err = ImageTensor::from_frames(&frames).unwrap_err();
        assert!(matches!(err, TensorError::ShapeMismatch { index: 1, .. }));
    }

    #[test]
    fn test_frame_spec_of_tensor() {
        let tensor = ImageTensor::<f64>::filled((5, 4, 6, 4), 0.5).unwrap();
        let spec = FrameSpec::of(&tensor);
        assert_eq!(spec.dims(), (4, 6, 4));
        assert_eq!(spec.element_type, ElementType::F64);
        assert_eq!(spec.frame_len(), 96);
        assert!(tensor.frame(4).is_some());
        assert!(tensor.frame(5).is_none());
    }
}
