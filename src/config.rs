use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    batching::{BatchOptions, MaskBehavior, Source, SourceSet, MAX_FRAMES, MAX_SOURCES},
    error::{ConfigError, ImageIoError, Result},
    io::{load_batch, load_image},
};

/// A batching job: output length, sources and where results go
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Length of the output and mask batches
    pub max_frames: usize,

    /// Processing settings
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Bound sources; unlisted slots stay unbound
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            max_frames: 50,
            processing: ProcessingConfig::default(),
            output: OutputConfig::default(),
            sources: Vec::new(),
        }
    }
}

impl JobConfig {
    /// Load a job from a TOML file
    ///
    /// Relative image paths are resolved against the file's directory.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let mut config: JobConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Save the job to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "job".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the job against the parameter bounds
    pub fn validate(&self) -> Result<()> {
        check_range("max_frames", self.max_frames, 1, MAX_FRAMES)?;
        self.processing.validate()?;

        if self.sources.len() > MAX_SOURCES {
            return Err(ConfigError::InvalidValue {
                key: "sources".to_string(),
                value: format!("{} entries (at most {})", self.sources.len(), MAX_SOURCES),
            }
            .into());
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !seen.insert(source.slot) {
                return Err(ConfigError::InvalidValue {
                    key: "sources.slot".to_string(),
                    value: format!("{} (bound twice)", source.slot),
                }
                .into());
            }
        }

        Ok(())
    }

    /// Core options derived from the processing settings
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            parallel: self.processing.parallel,
            threads: Some(self.processing.threads),
        }
    }

    /// Load every configured source's images and bind them to their slots
    pub fn load_sources(&self) -> Result<SourceSet<f32>> {
        let mut sources = SourceSet::new();
        for config in &self.sources {
            let source = config.load()?;
            debug!(
                "Source {}: {} frame(s) of {}x{}x{}",
                config.slot,
                source.tensor.batch_size(),
                source.tensor.width(),
                source.tensor.height(),
                source.tensor.channels()
            );
            sources.bind(config.slot, source)?;
        }
        Ok(sources)
    }

    fn resolve_paths(&mut self, base: &Path) {
        for source in &mut self.sources {
            for image in &mut source.images {
                if image.is_relative() {
                    *image = base.join(&*image);
                }
            }
        }
    }
}

/// One source slot of a job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Source slot, 1 through 6; lower slots are overwritten by higher ones
    pub slot: usize,

    /// One path for a single image, several for a batch
    pub images: Vec<PathBuf>,

    /// 1-based start frame; defaults to the slot number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_index: Option<u32>,

    /// Repeats of a single image, or frames taken from a batch
    #[serde(default = "default_repeat_count")]
    pub repeat_count: u32,

    #[serde(default)]
    pub mask_behavior: MaskBehavior,
}

fn default_repeat_count() -> u32 {
    1
}

impl SourceConfig {
    pub fn new<P: Into<PathBuf>>(slot: usize, images: Vec<P>) -> Self {
        Self {
            slot,
            images: images.into_iter().map(Into::into).collect(),
            frame_index: None,
            repeat_count: default_repeat_count(),
            mask_behavior: MaskBehavior::default(),
        }
    }

    /// Start frame after applying the slot-number default
    pub fn effective_frame_index(&self) -> u32 {
        self.frame_index
            .unwrap_or_else(|| u32::try_from(self.slot).unwrap_or(1))
    }

    fn validate(&self) -> Result<()> {
        check_range("sources.slot", self.slot, 1, MAX_SOURCES)?;
        check_range(
            "sources.frame_index",
            self.effective_frame_index() as usize,
            1,
            MAX_FRAMES,
        )?;
        check_range("sources.repeat_count", self.repeat_count as usize, 1, MAX_FRAMES)?;

        if self.images.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: format!("sources[{}].images", self.slot),
                value: "[]".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn load(&self) -> Result<Source<f32>> {
        let tensor = match self.images.as_slice() {
            [] => {
                return Err(ImageIoError::NoImages {
                    context: format!("source {}", self.slot),
                }
                .into())
            }
            [single] => load_image(single)?,
            many => load_batch(many)?,
        };

        Ok(Source::new(tensor)
            .at_frame(self.effective_frame_index())
            .repeat(self.repeat_count)
            .mask(self.mask_behavior))
    }
}

/// How normalization work is scheduled
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Normalize sources concurrently
    pub parallel: bool,

    /// Number of worker threads
    pub threads: usize,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            threads: num_cpus::get(),
        }
    }
}

impl ProcessingConfig {
    fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "processing.threads".to_string(),
                value: self.threads.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Where the frame and mask sequences are written
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: PathBuf,
    pub frame_prefix: String,
    pub mask_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("batch_output"),
            frame_prefix: "frame".to_string(),
            mask_prefix: "mask".to_string(),
        }
    }
}

fn check_range(key: &str, value: usize, min: usize, max: usize) -> Result<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = JobConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("job.toml");

        let mut original = JobConfig::default();
        original.max_frames = 12;
        original.sources.push(SourceConfig::new(2, vec!["/tmp/a.png"]));

        original.save_to_file(&file_path).unwrap();
        let loaded = JobConfig::from_file(&file_path).unwrap();

        assert_eq!(loaded.max_frames, 12);
        assert_eq!(loaded.sources.len(), 1);
        assert_eq!(loaded.sources[0].effective_frame_index(), 2);
        assert_eq!(loaded.processing.threads, original.processing.threads);
    }

    #[test]
    fn test_parses_minimal_job() {
        let config: JobConfig = toml::from_str(
            r#"
            max_frames = 8

            [[sources]]
            slot = 1
            images = ["a.png"]
            repeat_count = 3
            mask_behavior = "IMAGE_AREA_IS_WHITE"
            "#,
        )
        .unwrap();

        let source = &config.sources[0];
        assert_eq!(source.effective_frame_index(), 1);
        assert_eq!(source.repeat_count, 3);
        assert_eq!(source.mask_behavior, MaskBehavior::AreaIsWhite);
        assert!(config.processing.parallel);
    }

    #[test]
    fn test_invalid_max_frames() {
        let mut config = JobConfig::default();
        config.max_frames = 0;
        assert!(config.validate().is_err());
        config.max_frames = MAX_FRAMES + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_slot_rejected() {
        let mut config = JobConfig::default();
        config.sources.push(SourceConfig::new(1, vec!["a.png"]));
        config.sources.push(SourceConfig::new(1, vec!["b.png"]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_repeat_rejected() {
        let mut config = JobConfig::default();
        let mut source = SourceConfig::new(3, vec!["a.png"]);
        source.repeat_count = 0;
        config.sources.push(source);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_sources_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]))
            .save(dir.path().join("red.png"))
            .unwrap();
        std::fs::write(
            dir.path().join("job.toml"),
            "max_frames = 4\n\n[[sources]]\nslot = 2\nimages = [\"red.png\", \"red.png\"]\n",
        )
        .unwrap();

        let config = JobConfig::from_file(dir.path().join("job.toml")).unwrap();
        config.validate().unwrap();
        let sources = config.load_sources().unwrap();

        let source = sources.get(2).unwrap();
        assert_eq!(source.tensor.batch_size(), 2);
        assert_eq!(source.start_frame(), 2);
        assert!(!source.is_single_image());
    }

    #[test]
    fn test_demo_job_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/job.toml");
        let config = JobConfig::from_file(&path).unwrap();
        config.validate().unwrap();

        assert_eq!(config.sources.len(), 3);
        let demos = path.parent().unwrap();
        assert_eq!(config.sources[0].images[0], demos.join("title.png"));
        // the demo ships without its images
        assert!(config.load_sources().is_err());
    }
}
