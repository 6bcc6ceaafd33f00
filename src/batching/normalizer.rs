//! Brings one frame to the canonical geometry.
//!
//! Resizing is bilinear with half-pixel centers (corners not aligned), the
//! convention image tensors are usually interpolated with, so a frame resized
//! here lines up with one resized by the tools that produced it.

use ndarray::{s, Array3, ArrayView3, Axis, Zip};

use crate::tensor::{FrameSpec, Sample};

/// Produce an owned frame of exactly `spec`'s geometry from `frame`
///
/// Channel adaptation runs first and resizes as part of it; a plain spatial
/// resize only happens when the channel counts already agree. A frame that
/// already matches is copied unchanged.
pub fn normalize_frame<T: Sample>(frame: &ArrayView3<'_, T>, spec: &FrameSpec) -> Array3<T> {
    let (height, width, channels) = frame.dim();

    if channels != spec.channels {
        return adapt_channels(frame, spec);
    }

    if height != spec.height || width != spec.width {
        return resize_bilinear(frame, spec.height, spec.width);
    }

    frame.to_owned()
}

/// Resize to the target size, then map channels onto the target count
///
/// Shared channels are copied, missing ones stay zero. A 4-channel target
/// gets an opaque alpha when the source had none; a 1-channel target takes
/// the mean of the first three source channels.
fn adapt_channels<T: Sample>(frame: &ArrayView3<'_, T>, spec: &FrameSpec) -> Array3<T> {
    let source_channels = frame.dim().2;
    let resized = resize_bilinear(frame, spec.height, spec.width);

    let mut adapted = Array3::from_elem(spec.dims(), T::from_f64(0.0));
    let common = source_channels.min(spec.channels);
    adapted
        .slice_mut(s![.., .., ..common])
        .assign(&resized.slice(s![.., .., ..common]));

    if spec.channels == 4 && source_channels < 4 {
        adapted.slice_mut(s![.., .., 3]).fill(T::from_f64(1.0));
    } else if spec.channels == 1 && source_channels > 1 {
        let averaged = source_channels.min(3);
        Zip::from(adapted.lanes_mut(Axis(2)))
            .and(resized.lanes(Axis(2)))
            .for_each(|mut out, pixel| {
                let sum: f64 = pixel.iter().take(averaged).map(|v| v.to_f64()).sum();
                out[0] = T::from_f64(sum / averaged as f64);
            });
    }

    adapted
}

/// Per-output-coordinate interpolation weights along one axis
#[derive(Debug, Clone, Copy)]
struct AxisWeight {
    lo: usize,
    hi: usize,
    lo_weight: f64,
    hi_weight: f64,
}

fn axis_weights(input: usize, output: usize) -> Vec<AxisWeight> {
    let scale = input as f64 / output as f64;
    let last = input - 1;

    (0..output)
        .map(|dst| {
            let src = ((dst as f64 + 0.5) * scale - 0.5).max(0.0);
            let lo = (src.floor() as usize).min(last);
            let hi = if lo < last { lo + 1 } else { lo };
            let hi_weight = src - lo as f64;
            AxisWeight {
                lo,
                hi,
                lo_weight: 1.0 - hi_weight,
                hi_weight,
            }
        })
        .collect()
}

/// Bilinear resize of an (H, W, C) frame to (height, width, C)
pub fn resize_bilinear<T: Sample>(
    frame: &ArrayView3<'_, T>,
    height: usize,
    width: usize,
) -> Array3<T> {
    let (in_height, in_width, channels) = frame.dim();
    if (in_height, in_width) == (height, width) {
        return frame.to_owned();
    }

    let rows = axis_weights(in_height, height);
    let cols = axis_weights(in_width, width);

    Array3::from_shape_fn((height, width, channels), |(y, x, c)| {
        let r = rows[y];
        let k = cols[x];
        let sample = |yy: usize, xx: usize| frame[[yy, xx, c]].to_f64();

        let top = k.lo_weight * sample(r.lo, k.lo) + k.hi_weight * sample(r.lo, k.hi);
        let bottom = k.lo_weight * sample(r.hi, k.lo) + k.hi_weight * sample(r.hi, k.hi);
        T::from_f64(r.lo_weight * top + r.hi_weight * bottom)
    })
}
