//! # Frame-Batcher
//!
//! Compose up to six image sources into one fixed-length frame batch, with a
//! parallel mask batch marking which frames came from a source.
//!
//! Each source is a tensor of one or more frames placed at a 1-based start
//! frame. A single image is repeated `repeat_count` times; a batch contributes
//! its first `repeat_count` frames in order. Every frame is resized and
//! channel-adapted to the geometry of the first bound source. Frames nobody
//! wrote stay mid-gray with a white mask.
//!
//! ## Quick Start
//!
//! ```rust
//! use frame_batcher::{
//!     batching::{MaskBehavior, Source, SourceSet},
//!     tensor::ImageTensor,
//!     Compositor,
//! };
//!
//! # fn main() -> frame_batcher::Result<()> {
//! let title = ImageTensor::<f32>::filled((1, 64, 64, 3), 1.0)?;
//! let clip = ImageTensor::<f32>::filled((10, 32, 32, 4), 0.25)?;
//!
//! let mut sources = SourceSet::new();
//! sources.bind(1, Source::new(title).repeat(2))?;
//! sources.bind(2, Source::new(clip).at_frame(3).repeat(5).mask(MaskBehavior::AreaIsWhite))?;
//!
//! let composition = Compositor::sequential().compose(12, &sources);
//! assert_eq!(composition.output.shape(), (12, 64, 64, 3));
//! assert_eq!(composition.masks.shape(), (12, 64, 64, 3));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`tensor`] - Image tensors, frame geometry and frame batches
//! - [`batching`] - Geometry resolution, normalization, placement planning and compositing
//! - [`io`] - Image files to tensors and back
//! - [`config`] - TOML job configuration

pub mod batching;
pub mod config;
pub mod error;
pub mod io;
pub mod tensor;

// Re-export commonly used types for convenience
pub use crate::{
    batching::{compose, BatchOptions, Composition, Compositor, MaskBehavior, Source, SourceSet},
    config::JobConfig,
    error::{BatcherError, Result},
    tensor::{FrameBatch, FrameSpec, ImageTensor},
};
