use ndarray::{Array1, Array4, ArrayView3, ArrayViewMut3, Axis};

use super::types::{FrameSpec, Sample};

/// Fixed-length sequence of frames sharing one [`FrameSpec`]
///
/// Frames are addressed by slot index and only ever written whole, which is
/// what the compositor relies on for its last-writer-wins ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBatch<T: Sample = f32> {
    spec: FrameSpec,
    data: Array4<T>,
}

impl<T: Sample> FrameBatch<T> {
    /// Allocate `len` frames, each filled with the per-channel `color`
    ///
    /// # Panics
    ///
    /// Panics if `color` does not hold exactly `spec.channels` values.
    pub fn filled(len: usize, spec: FrameSpec, color: &[T]) -> Self {
        check_color(&spec, color);
        let color = Array1::from(color.to_vec());
        let mut data = Array4::from_elem((len, spec.height, spec.width, spec.channels), color[0]);
        data.lanes_mut(Axis(3))
            .into_iter()
            .for_each(|mut pixel| pixel.assign(&color));
        Self { spec, data }
    }

    /// A batch with zero frames
    pub fn empty(spec: FrameSpec) -> Self {
        let data = Array4::from_shape_vec((0, spec.height, spec.width, spec.channels), Vec::new())
            .unwrap_or_else(|_| unreachable!("zero-length batch always matches its shape"));
        Self { spec, data }
    }

    pub fn spec(&self) -> &FrameSpec {
        &self.spec
    }

    pub fn len(&self) -> usize {
        self.data.dim().0
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (frames, height, width, channels)
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        self.data.dim()
    }

    pub fn frame(&self, slot: usize) -> Option<ArrayView3<'_, T>> {
        (slot < self.len()).then(|| self.data.index_axis(Axis(0), slot))
    }

    /// Iterate frames in slot order
    pub fn frames(&self) -> impl Iterator<Item = ArrayView3<'_, T>> + '_ {
        self.data.outer_iter()
    }

    /// Overwrite slot `slot` with `frame`
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range or `frame` does not match the batch geometry.
    pub fn write_frame(&mut self, slot: usize, frame: &ArrayView3<'_, T>) {
        self.slot_mut(slot).assign(frame);
    }

    /// Overwrite slot `slot` with a solid per-channel color
    ///
    /// # Panics
    ///
    /// Panics if `slot` is out of range or `color` is not one value per channel.
    pub fn fill_frame(&mut self, slot: usize, color: &[T]) {
        check_color(&self.spec, color);
        let color = Array1::from(color.to_vec());
        self.slot_mut(slot)
            .lanes_mut(Axis(2))
            .into_iter()
            .for_each(|mut pixel| pixel.assign(&color));
    }

    pub fn as_array(&self) -> &Array4<T> {
        &self.data
    }

    pub fn into_array(self) -> Array4<T> {
        self.data
    }

    fn slot_mut(&mut self, slot: usize) -> ArrayViewMut3<'_, T> {
        assert!(
            slot < self.len(),
            "slot {} out of range for batch of {}",
            slot,
            self.len()
        );
        self.data.index_axis_mut(Axis(0), slot)
    }
}

fn check_color<T>(spec: &FrameSpec, color: &[T]) {
    assert_eq!(
        color.len(),
        spec.channels,
        "fill color has {} values for {} channels",
        color.len(),
        spec.channels
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::{Device, ElementType};
    use ndarray::Array3;

    fn spec(channels: usize) -> FrameSpec {
        FrameSpec {
            height: 2,
            width: 3,
            channels,
            element_type: ElementType::F32,
            device: Device::Cpu,
        }
    }

    #[test]
    fn test_filled_sets_every_pixel() {
        let batch = FrameBatch::<f32>::filled(2, spec(4), &[0.1, 0.2, 0.3, 1.0]);
        assert_eq!(batch.shape(), (2, 2, 3, 4));
        for frame in batch.frames() {
            for pixel in frame.lanes(Axis(2)) {
                assert_eq!(pixel.to_vec(), vec![0.1, 0.2, 0.3, 1.0]);
            }
        }
    }

    #[test]
    fn test_write_and_fill_single_slot() {
        let mut batch = FrameBatch::<f32>::filled(3, spec(3), &[0.5, 0.5, 0.5]);
        let frame = Array3::from_elem((2, 3, 3), 0.25f32);
        batch.write_frame(1, &frame.view());
        batch.fill_frame(2, &[1.0, 0.0, 0.0]);

        assert!(batch.frame(0).unwrap().iter().all(|&v| v == 0.5));
        assert!(batch.frame(1).unwrap().iter().all(|&v| v == 0.25));
        let red = batch.frame(2).unwrap();
        assert_eq!(red[[1, 2, 0]], 1.0);
        assert_eq!(red[[1, 2, 1]], 0.0);
        assert!(batch.frame(3).is_none());
    }

    #[test]
    fn test_empty_batch() {
        let batch = FrameBatch::<f32>::empty(FrameSpec::placeholder::<f32>());
        assert!(batch.is_empty());
        assert_eq!(batch.shape(), (0, 1, 1, 3));
    }

    #[test]
    #[should_panic(expected = "fill color has 3 values for 4 channels")]
    fn test_filled_rejects_short_color() {
        FrameBatch::<f32>::filled(1, spec(4), &[0.5, 0.5, 0.5]);
    }

    #[test]
    #[should_panic(expected = "fill color has 4 values for 3 channels")]
    fn test_fill_frame_rejects_long_color() {
        let mut batch = FrameBatch::<f32>::filled(1, spec(3), &[0.5; 3]);
        batch.fill_frame(0, &[1.0, 1.0, 1.0, 1.0]);
    }
}
