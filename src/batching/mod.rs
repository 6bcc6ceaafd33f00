//! # Batching Module
//!
//! The compositing engine: resolve the canonical frame geometry from the
//! first bound source, plan where each source's frames land, normalize them
//! to that geometry and write them, with their masks, into fixed-length
//! output batches.
//!
//! ## Usage
//!
//! ```rust
//! use frame_batcher::batching::{compose, MaskBehavior, Source, SourceSet};
//! use frame_batcher::tensor::ImageTensor;
//!
//! let image = ImageTensor::<f32>::filled((1, 4, 4, 3), 0.5).unwrap();
//! let mut sources = SourceSet::new();
//! sources
//!     .bind(1, Source::new(image).at_frame(2).repeat(3).mask(MaskBehavior::AreaIsWhite))
//!     .unwrap();
//!
//! let composition = compose(8, &sources);
//! assert_eq!(composition.output.shape(), (8, 4, 4, 3));
//! assert_eq!(composition.summaries[0].slots, vec![1, 2, 3]);
//! ```

pub mod compositor;
pub mod normalizer;
pub mod planner;
pub mod resolver;
pub mod source;

// Re-exports for convenience
pub use compositor::{compose, BatchOptions, Composition, Compositor, SourceSummary};
pub use normalizer::{normalize_frame, resize_bilinear};
pub use planner::{plan_placement, Placement, PlacementPlan, PlacementRegime};
pub use resolver::resolve_frame_spec;
pub use source::{MaskBehavior, Source, SourceSet, MAX_FRAMES, MAX_SOURCES};
