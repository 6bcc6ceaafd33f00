use thiserror::Error;

/// Main error type for the frame-batcher library
#[derive(Error, Debug)]
pub enum BatcherError {
    #[error("Tensor error: {0}")]
    Tensor(#[from] TensorError),

    #[error("Image I/O error: {0}")]
    ImageIo(#[from] ImageIoError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Malformed tensor geometry or data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TensorError {
    #[error("Tensor dimension '{axis}' must be at least 1")]
    EmptyDimension { axis: &'static str },

    #[error("Unsupported channel count: {channels} (expected 1, 3 or 4)")]
    UnsupportedChannels { channels: usize },

    #[error("Data length {actual} does not match shape {shape:?} (expected {expected})")]
    DataLength {
        shape: [usize; 4],
        expected: usize,
        actual: usize,
    },

    #[error("Frame {index} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        index: usize,
        expected: [usize; 3],
        actual: [usize; 3],
    },
}

/// Errors converting between image files and tensors
#[derive(Error, Debug)]
pub enum ImageIoError {
    #[error("Failed to load image file: {path}")]
    LoadFailed { path: String },

    #[error("Failed to save image file: {path} - {reason}")]
    SaveFailed { path: String, reason: String },

    #[error("No image paths given for {context}")]
    NoImages { context: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path} - {reason}")]
    ParseFailed { path: String, reason: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using BatcherError
pub type Result<T> = std::result::Result<T, BatcherError>;

impl BatcherError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::ImageIo(ImageIoError::LoadFailed { path }) => {
                format!("Could not load image '{}'. Please check the file exists and is a PNG or JPEG.", path)
            }
            Self::Tensor(TensorError::ShapeMismatch { index, expected, actual }) => {
                format!(
                    "Image #{} in a batch is {}x{} with {} channels, but the batch started with {}x{} with {} channels. All images in one source must share a size.",
                    index + 1, actual[1], actual[0], actual[2], expected[1], expected[0], expected[2]
                )
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Job file '{}' not found.", path)
            }
            Self::Generic(message) => message.clone(),
            _ => self.to_string(),
        }
    }
}
