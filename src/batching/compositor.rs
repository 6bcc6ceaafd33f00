use ndarray::Array3;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    error::{BatcherError, Result},
    tensor::{FrameBatch, FrameSpec, Sample},
};

use super::{
    normalizer::normalize_frame,
    planner::{PlacementPlan, PlacementRegime},
    resolver::resolve_frame_spec,
    source::{MaskBehavior, Source, SourceSet},
};

/// Channel intensity of untouched output frames
pub const FILL_INTENSITY: f64 = 127.0 / 255.0;

/// Options for a [`Compositor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOptions {
    /// Normalize sources concurrently before writing
    pub parallel: bool,
    /// Worker threads for parallel normalization (`None` = rayon's global pool)
    pub threads: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            threads: None,
        }
    }
}

/// What one bound source contributed to a composition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    /// 1-based source slot
    pub source: usize,
    pub regime: PlacementRegime,
    pub mask_behavior: MaskBehavior,
    /// Output slots written, in order
    pub slots: Vec<usize>,
    /// Whether the plan stopped at an out-of-range slot
    pub truncated: bool,
}

/// Result of one composition call
#[derive(Debug, Clone)]
pub struct Composition<T: Sample = f32> {
    pub output: FrameBatch<T>,
    pub masks: FrameBatch<T>,
    /// Canonical geometry, `None` when no source was bound
    pub frame_spec: Option<FrameSpec>,
    /// One entry per bound source, in slot order
    pub summaries: Vec<SourceSummary>,
}

impl<T: Sample> Composition<T> {
    /// Split into the (output, masks) pair
    pub fn into_batches(self) -> (FrameBatch<T>, FrameBatch<T>) {
        (self.output, self.masks)
    }
}

/// A source's plan together with its normalized frames
///
/// `frames[p.source_frame]` is the frame to write for every placement `p`.
struct PreparedSource<T: Sample> {
    source: usize,
    plan: PlacementPlan,
    frames: Vec<Array3<T>>,
}

/// Composes up to six sources into one output batch and one mask batch
///
/// Normalization may run on a rayon pool, but every write into the output
/// batches happens afterwards on the calling thread, in source order and then
/// slot order, so a higher-numbered source always overwrites a lower one.
pub struct Compositor {
    options: BatchOptions,
    pool: Option<rayon::ThreadPool>,
}

impl Compositor {
    /// Create a compositor, building a dedicated thread pool if requested
    pub fn new(options: BatchOptions) -> Result<Self> {
        let pool = match (options.parallel, options.threads) {
            (true, Some(threads)) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("frame-batcher-{}", i))
                    .build()
                    .map_err(|e| {
                        BatcherError::generic(format!("Failed to build thread pool: {}", e))
                    })?,
            ),
            _ => None,
        };
        Ok(Self { options, pool })
    }

    /// Single-threaded compositor
    pub fn sequential() -> Self {
        Self {
            options: BatchOptions::default(),
            pool: None,
        }
    }

    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Compose `sources` into `max_frames` output and mask frames
    ///
    /// Never fails: out-of-range or degenerate placements just contribute
    /// fewer frames. With no bound source both batches are empty with 1x1x3
    /// geometry.
    pub fn compose<T: Sample>(&self, max_frames: usize, sources: &SourceSet<T>) -> Composition<T> {
        let Some(spec) = resolve_frame_spec(sources) else {
            debug!("No sources bound, returning empty batches");
            let placeholder = FrameSpec::placeholder::<T>();
            return Composition {
                output: FrameBatch::empty(placeholder),
                masks: FrameBatch::empty(placeholder),
                frame_spec: None,
                summaries: Vec::new(),
            };
        };

        info!(
            "Composing {} frames at {} from {} sources",
            max_frames,
            spec,
            sources.bound_count()
        );

        let prepared = self.prepare_all(sources, &spec, max_frames);

        let gray = fill_color::<T>(&spec, FILL_INTENSITY);
        let black = fill_color::<T>(&spec, MaskBehavior::AreaIsBlack.intensity());
        let white = fill_color::<T>(&spec, MaskBehavior::AreaIsWhite.intensity());
        let mut output = FrameBatch::filled(max_frames, spec, &gray);
        let mut masks = FrameBatch::filled(max_frames, spec, &white);

        let mut summaries = Vec::with_capacity(prepared.len());
        for item in prepared {
            let mask_color = match item.plan.mask_behavior {
                MaskBehavior::AreaIsBlack => &black,
                MaskBehavior::AreaIsWhite => &white,
            };

            for placement in &item.plan.placements {
                let frame = &item.frames[placement.source_frame];
                output.write_frame(placement.slot, &frame.view());
                masks.fill_frame(placement.slot, mask_color);
            }

            summaries.push(SourceSummary {
                source: item.source,
                regime: item.plan.regime,
                mask_behavior: item.plan.mask_behavior,
                slots: item.plan.slots().collect(),
                truncated: item.plan.truncated,
            });
        }

        Composition {
            output,
            masks,
            frame_spec: Some(spec),
            summaries,
        }
    }

    /// Plan and normalize every bound source, preserving slot order
    fn prepare_all<T: Sample>(
        &self,
        sources: &SourceSet<T>,
        spec: &FrameSpec,
        max_frames: usize,
    ) -> Vec<PreparedSource<T>> {
        let bound: Vec<(usize, &Source<T>)> = sources.iter_bound().collect();
        let prepare = |&(slot, source): &(usize, &Source<T>)| {
            prepare_source(slot, source, spec, max_frames)
        };

        if !self.options.parallel {
            return bound.iter().map(prepare).collect();
        }

        match &self.pool {
            Some(pool) => pool.install(|| bound.par_iter().map(prepare).collect()),
            None => bound.par_iter().map(prepare).collect(),
        }
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::sequential()
    }
}

/// Compose on the calling thread with default options
pub fn compose<T: Sample>(max_frames: usize, sources: &SourceSet<T>) -> Composition<T> {
    Compositor::sequential().compose(max_frames, sources)
}

fn prepare_source<T: Sample>(
    slot: usize,
    source: &Source<T>,
    spec: &FrameSpec,
    max_frames: usize,
) -> PreparedSource<T> {
    let plan = PlacementPlan::for_source(source, max_frames);
    debug!(
        "Source {}: {} starting at frame {}, {} slots planned",
        slot,
        plan.regime,
        source.start_frame(),
        plan.placements.len()
    );

    // A single image is normalized once and reused for every repeat
    let needed = match plan.regime {
        PlacementRegime::SingleImageRepeat { .. } => usize::from(!plan.is_empty()),
        PlacementRegime::BatchSequentialTake { .. } => plan.placements.len(),
    };

    let frames = (0..needed)
        .filter_map(|index| source.tensor.frame(index))
        .map(|frame| normalize_frame(&frame, spec))
        .collect();

    PreparedSource {
        source: slot,
        plan,
        frames,
    }
}

/// Solid color for `spec`: `intensity` in up to three color channels, opaque alpha
pub fn fill_color<T: Sample>(spec: &FrameSpec, intensity: f64) -> Vec<T> {
    let mut color = vec![T::from_f64(intensity); spec.channels.min(3)];
    if spec.channels > 3 {
        color.push(T::from_f64(1.0));
    }
    color
}
