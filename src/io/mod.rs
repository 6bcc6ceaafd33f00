//! # Image I/O Module
//!
//! Converts image files to tensors with values in [0, 1] and writes frame
//! batches back out as numbered PNG sequences.

mod loader;
mod writer;

pub use loader::{image_to_frame, load_batch, load_image};
pub use writer::save_batch;
