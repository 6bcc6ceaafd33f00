use serde::{Deserialize, Serialize};

use crate::{
    error::ConfigError,
    tensor::{ImageTensor, Sample},
};

/// Number of source slots a composition accepts
pub const MAX_SOURCES: usize = 6;

/// Upper bound for output length, start index and repeat count
pub const MAX_FRAMES: usize = 8192;

/// Mask color written at every slot a source occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskBehavior {
    /// Occupied slots are black in the mask batch
    #[default]
    #[serde(alias = "IMAGE_AREA_IS_BLACK")]
    AreaIsBlack,
    /// Occupied slots are white in the mask batch
    #[serde(alias = "IMAGE_AREA_IS_WHITE")]
    AreaIsWhite,
}

impl MaskBehavior {
    /// Intensity of the color channels (alpha is always opaque)
    pub fn intensity(self) -> f64 {
        match self {
            MaskBehavior::AreaIsBlack => 0.0,
            MaskBehavior::AreaIsWhite => 1.0,
        }
    }
}

/// One bound source: an image tensor plus its placement parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Source<T: Sample = f32> {
    pub tensor: ImageTensor<T>,
    /// 1-based output slot of the first placed frame; `None` until bound,
    /// when it defaults to the slot number
    pub frame_index: Option<u32>,
    /// Repetitions of a single image, or frames taken from a batch
    pub repeat_count: u32,
    pub mask_behavior: MaskBehavior,
}

impl<T: Sample> Source<T> {
    /// Place `tensor` once, starting at the frame matching its slot number
    pub fn new(tensor: ImageTensor<T>) -> Self {
        Self {
            tensor,
            frame_index: None,
            repeat_count: 1,
            mask_behavior: MaskBehavior::default(),
        }
    }

    pub fn at_frame(mut self, frame_index: u32) -> Self {
        self.frame_index = Some(frame_index);
        self
    }

    /// 1-based start frame; an unbound source without one starts at 1
    pub fn start_frame(&self) -> u32 {
        self.frame_index.unwrap_or(1)
    }

    pub fn repeat(mut self, repeat_count: u32) -> Self {
        self.repeat_count = repeat_count;
        self
    }

    pub fn mask(mut self, mask_behavior: MaskBehavior) -> Self {
        self.mask_behavior = mask_behavior;
        self
    }

    /// Whether this source is a single image rather than a batch
    pub fn is_single_image(&self) -> bool {
        self.tensor.batch_size() == 1
    }
}

/// The six source slots of one composition, numbered 1 through 6
#[derive(Debug, Clone)]
pub struct SourceSet<T: Sample = f32> {
    slots: [Option<Source<T>>; MAX_SOURCES],
}

impl<T: Sample> SourceSet<T> {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }

    /// Bind `source` to 1-based `slot`, replacing whatever was there
    ///
    /// A source without an explicit start frame starts at frame `slot`.
    pub fn bind(&mut self, slot: usize, mut source: Source<T>) -> Result<&mut Self, ConfigError> {
        let index = slot_index(slot)?;
        // slot_index guarantees 1..=MAX_SOURCES
        source.frame_index.get_or_insert(slot as u32);
        self.slots[index] = Some(source);
        Ok(self)
    }

    /// Bind `tensor` to `slot` with default placement parameters
    pub fn bind_tensor(
        &mut self,
        slot: usize,
        tensor: ImageTensor<T>,
    ) -> Result<&mut Self, ConfigError> {
        self.bind(slot, Source::new(tensor))
    }

    /// Remove the source at `slot`, returning it
    pub fn unbind(&mut self, slot: usize) -> Result<Option<Source<T>>, ConfigError> {
        let index = slot_index(slot)?;
        Ok(self.slots[index].take())
    }

    pub fn get(&self, slot: usize) -> Option<&Source<T>> {
        slot_index(slot)
            .ok()
            .and_then(|index| self.slots[index].as_ref())
    }

    /// Bound sources with their 1-based slot numbers, in slot order
    pub fn iter_bound(&self) -> impl Iterator<Item = (usize, &Source<T>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, source)| source.as_ref().map(|s| (index + 1, s)))
    }

    pub fn bound_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.bound_count() == 0
    }
}

impl<T: Sample> Default for SourceSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn slot_index(slot: usize) -> Result<usize, ConfigError> {
    if (1..=MAX_SOURCES).contains(&slot) {
        Ok(slot - 1)
    } else {
        Err(ConfigError::InvalidValue {
            key: "source.slot".to_string(),
            value: slot.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor() -> ImageTensor<f32> {
        ImageTensor::filled((1, 1, 1, 3), 0.0).unwrap()
    }

    #[test]
    fn test_bind_rejects_out_of_range_slots() {
        let mut sources = SourceSet::new();
        assert!(sources.bind(0, Source::new(tensor())).is_err());
        assert!(sources.bind(7, Source::new(tensor())).is_err());
        assert!(sources.bind(6, Source::new(tensor())).is_ok());
    }

    #[test]
    fn test_bind_defaults_start_frame_to_slot() {
        let mut sources = SourceSet::new();
        sources.bind(3, Source::new(tensor())).unwrap();
        sources.bind(4, Source::new(tensor()).at_frame(1)).unwrap();

        assert_eq!(sources.get(3).unwrap().frame_index, Some(3));
        assert_eq!(sources.get(4).unwrap().frame_index, Some(1));
        assert_eq!(Source::new(tensor()).start_frame(), 1);
    }

    #[test]
    fn test_iter_bound_is_slot_ordered() {
        let mut sources = SourceSet::new();
        sources.bind_tensor(5, tensor()).unwrap();
        sources.bind_tensor(2, tensor()).unwrap();

        let slots: Vec<usize> = sources.iter_bound().map(|(slot, _)| slot).collect();
        assert_eq!(slots, vec![2, 5]);
        assert_eq!(sources.get(5).unwrap().start_frame(), 5);

        sources.unbind(2).unwrap();
        assert_eq!(sources.bound_count(), 1);
    }

    #[test]
    fn test_mask_behavior_accepts_node_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            behavior: MaskBehavior,
        }
        let parsed: Wrapper = toml::from_str("behavior = \"IMAGE_AREA_IS_WHITE\"").unwrap();
        assert_eq!(parsed.behavior, MaskBehavior::AreaIsWhite);
        let parsed: Wrapper = toml::from_str("behavior = \"area_is_black\"").unwrap();
        assert_eq!(parsed.behavior, MaskBehavior::AreaIsBlack);
    }
}
