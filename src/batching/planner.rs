use std::fmt;

use tracing::debug;

use crate::tensor::Sample;

use super::source::{MaskBehavior, Source};

/// How a source's frames map onto output slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementRegime {
    /// A one-frame source repeated `repeat_count` times
    SingleImageRepeat { repeat_count: u32 },
    /// The first `take` frames of a batch, one per slot
    BatchSequentialTake { take: usize },
}

impl PlacementRegime {
    /// Pick the regime for a source of `batch_size` frames
    pub fn for_batch(batch_size: usize, repeat_count: u32) -> Self {
        if batch_size > 1 {
            let requested = usize::try_from(repeat_count).unwrap_or(usize::MAX);
            Self::BatchSequentialTake {
                take: requested.min(batch_size),
            }
        } else {
            Self::SingleImageRepeat { repeat_count }
        }
    }

    /// Number of slots the regime asks for before range clipping
    pub fn requested_slots(&self) -> usize {
        match *self {
            Self::SingleImageRepeat { repeat_count } => {
                usize::try_from(repeat_count).unwrap_or(usize::MAX)
            }
            Self::BatchSequentialTake { take } => take,
        }
    }

    /// Source frame placed at step `step` of the plan
    fn source_frame(&self, step: usize) -> usize {
        match self {
            Self::SingleImageRepeat { .. } => 0,
            Self::BatchSequentialTake { .. } => step,
        }
    }
}

impl fmt::Display for PlacementRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SingleImageRepeat { repeat_count } => {
                write!(f, "single image x{}", repeat_count)
            }
            Self::BatchSequentialTake { take } => write!(f, "batch, first {} frames", take),
        }
    }
}

/// One write: source frame `source_frame` goes to output slot `slot`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub slot: usize,
    pub source_frame: usize,
}

/// Ordered slot assignments for one source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementPlan {
    pub regime: PlacementRegime,
    pub mask_behavior: MaskBehavior,
    /// Slot-ascending, every slot below the output length
    pub placements: Vec<Placement>,
    /// Whether planning stopped at an out-of-range slot
    pub truncated: bool,
}

impl PlacementPlan {
    /// Plan `source` into an output of `max_frames` slots
    pub fn for_source<T: Sample>(source: &Source<T>, max_frames: usize) -> Self {
        plan_placement(
            source.start_frame(),
            source.repeat_count,
            source.tensor.batch_size(),
            source.mask_behavior,
            max_frames,
        )
    }

    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.placements.iter().map(|p| p.slot)
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}

/// Build the slot assignments for one source
///
/// Slots start at `frame_index - 1` and ascend. Planning stops at the first
/// slot outside `[0, max_frames)`; later slots are dropped even if they would
/// have been in range.
pub fn plan_placement(
    frame_index: u32,
    repeat_count: u32,
    batch_size: usize,
    mask_behavior: MaskBehavior,
    max_frames: usize,
) -> PlacementPlan {
    let regime = PlacementRegime::for_batch(batch_size, repeat_count);
    let start = i64::from(frame_index) - 1;
    let limit = i64::try_from(max_frames).unwrap_or(i64::MAX);

    let mut placements = Vec::new();
    let mut truncated = false;

    for step in 0..regime.requested_slots() {
        let slot = start + step as i64;
        if slot < 0 || slot >= limit {
            truncated = true;
            break;
        }
        placements.push(Placement {
            slot: slot as usize,
            source_frame: regime.source_frame(step),
        });
    }

    if truncated {
        debug!(
            "Placement ({}) starting at frame {} truncated after {} slots of {}",
            regime,
            frame_index,
            placements.len(),
            max_frames
        );
    }

    PlacementPlan {
        regime,
        mask_behavior,
        placements,
        truncated,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slots(plan: &PlacementPlan) -> Vec<usize> {
        plan.slots().collect()
    }

    #[test]
    fn test_single_image_repeats_same_frame() {
        let plan = plan_placement(2, 3, 1, MaskBehavior::AreaIsBlack, 10);
        assert_eq!(plan.regime, PlacementRegime::SingleImageRepeat { repeat_count: 3 });
        assert_eq!(slots(&plan), vec![1, 2, 3]);
        assert!(plan.placements.iter().all(|p| p.source_frame == 0));
        assert!(!plan.truncated);
    }

    #[test]
    fn test_batch_takes_sequential_frames() {
        let plan = plan_placement(2, 2, 4, MaskBehavior::AreaIsWhite, 5);
        assert_eq!(plan.regime, PlacementRegime::BatchSequentialTake { take: 2 });
        assert_eq!(
            plan.placements,
            vec![
                Placement { slot: 1, source_frame: 0 },
                Placement { slot: 2, source_frame: 1 },
            ]
        );
    }

    #[test]
    fn test_batch_take_capped_by_batch_size() {
        let plan = plan_placement(1, 10, 3, MaskBehavior::AreaIsBlack, 20);
        assert_eq!(plan.regime, PlacementRegime::BatchSequentialTake { take: 3 });
        assert_eq!(slots(&plan), vec![0, 1, 2]);
        assert!(!plan.truncated);
    }

    #[test]
    fn test_truncates_at_end_of_output() {
        let plan = plan_placement(3, 5, 1, MaskBehavior::AreaIsBlack, 3);
        assert_eq!(slots(&plan), vec![2]);
        assert!(plan.truncated);
    }

    #[test]
    fn test_zero_frame_index_truncates_immediately() {
        // slot -1 is hit first, so slot 0 is never reached
        let plan = plan_placement(0, 4, 1, MaskBehavior::AreaIsBlack, 8);
        assert!(plan.is_empty());
        assert!(plan.truncated);
    }

    #[test]
    fn test_zero_repeat_count_places_nothing() {
        let plan = plan_placement(1, 0, 1, MaskBehavior::AreaIsBlack, 8);
        assert!(plan.is_empty());
        assert!(!plan.truncated);

        let plan = plan_placement(1, 0, 4, MaskBehavior::AreaIsBlack, 8);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_start_past_output_places_nothing() {
        let plan = plan_placement(9, 1, 1, MaskBehavior::AreaIsBlack, 8);
        assert!(plan.is_empty());
        assert!(plan.truncated);
    }
}
