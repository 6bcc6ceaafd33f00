use tracing::debug;

use crate::tensor::{FrameSpec, Sample};

use super::source::SourceSet;

/// Frame geometry of the first bound source, scanning slots 1 through 6
///
/// Returns `None` when no slot is bound.
pub fn resolve_frame_spec<T: Sample>(sources: &SourceSet<T>) -> Option<FrameSpec> {
    let (slot, source) = sources.iter_bound().next()?;
    let spec = FrameSpec::of(&source.tensor);
    debug!("Frame geometry {} taken from source {}", spec, slot);
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::ImageTensor;

    #[test]
    fn test_no_sources_resolves_nothing() {
        let sources = SourceSet::<f32>::new();
        assert!(resolve_frame_spec(&sources).is_none());
    }

    #[test]
    fn test_first_bound_slot_wins() {
        let mut sources = SourceSet::<f32>::new();
        sources
            .bind_tensor(4, ImageTensor::filled((1, 8, 8, 4), 0.0).unwrap())
            .unwrap();
        sources
            .bind_tensor(2, ImageTensor::filled((3, 5, 7, 1), 0.0).unwrap())
            .unwrap();

        let spec = resolve_frame_spec(&sources).unwrap();
        assert_eq!(spec.dims(), (5, 7, 1));
    }
}
