//! # Tensor Module
//!
//! Image tensors in (batch, height, width, channels) layout, the frame
//! geometry derived from them, and the fixed-length frame batches the
//! compositor writes into.

pub mod batch;
pub mod types;

pub use batch::FrameBatch;
pub use types::{Device, ElementType, FrameSpec, ImageTensor, Sample, SUPPORTED_CHANNELS};
