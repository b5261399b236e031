//! Error types for the special image crate.
//!
//! Uses thiserror for structured errors with context. Construction and
//! extraction failures never yield a partially valid object: callers either
//! get the image/bitmap or one of these errors.

use crate::core::color::ColorType;
use crate::core::geometry::IRect;
use thiserror::Error;

/// Top-level error type.
///
/// This enum encompasses all error categories and enables automatic
/// conversion between specific error types.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Special image error: {0}")]
    SpecialImage(#[from] SpecialImageError),

    #[error("Pixel error: {0}")]
    Pixel(#[from] PixelError),

    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),

    #[error("Filter error: {0}")]
    Filter(#[from] FilterError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

/// Failures constructing, subsetting or reading back a special image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecialImageError {
    #[error("Source has no pixels")]
    NoPixels,

    #[error("Source dimensions are empty ({width}x{height})")]
    EmptyDimensions { width: i32, height: i32 },

    #[error("Subset {subset} is empty")]
    EmptySubset { subset: IRect },

    #[error("Subset {subset} is not contained in {bounds}")]
    SubsetOutOfBounds { subset: IRect, bounds: IRect },

    #[error("Unsupported color type {0:?}")]
    UnsupportedColorType(ColorType),

    #[error("Failed to allocate {bytes} bytes of pixel storage")]
    AllocationFailed { bytes: usize },

    #[error("Backing store is not readable: {reason}")]
    Unreadable { reason: String },
}

/// Errors describing malformed pixel buffers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PixelError {
    #[error("Row bytes {row_bytes} smaller than minimum {min}")]
    RowBytesTooSmall { row_bytes: usize, min: usize },

    #[error("Buffer of {len} bytes too small, need {required}")]
    BufferTooSmall { len: usize, required: usize },

    #[error("Pixel layout is unknown")]
    UnknownColorType,

    #[error("Dimensions are empty ({width}x{height})")]
    EmptyDimensions { width: i32, height: i32 },

    #[error("Failed to allocate {bytes} bytes")]
    AllocationFailed { bytes: usize },
}

impl From<PixelError> for SpecialImageError {
    fn from(err: PixelError) -> Self {
        match err {
            PixelError::EmptyDimensions { width, height } => {
                SpecialImageError::EmptyDimensions { width, height }
            }
            PixelError::UnknownColorType => {
                SpecialImageError::UnsupportedColorType(ColorType::Unknown)
            }
            PixelError::AllocationFailed { bytes } => SpecialImageError::AllocationFailed { bytes },
            other => SpecialImageError::Unreadable {
                reason: other.to_string(),
            },
        }
    }
}

/// GPU-related errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpuError {
    #[error("GPU not available")]
    NotAvailable,

    #[error("Texture allocation of {bytes} bytes exceeds device budget")]
    OutOfMemory { bytes: usize },

    #[error("Texture format {0} is not supported")]
    UnsupportedFormat(String),

    #[error("{0} texture was not created with COPY_SRC and cannot be read back")]
    ReadbackUnsupported(String),

    #[error("Region {region} outside texture bounds {bounds}")]
    InvalidRegion { region: IRect, bounds: IRect },
}

/// Errors raised while running filter stages.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: SpecialImageError,
    },

    #[error("Stage '{stage}' produced no output: {reason}")]
    NoOutput { stage: String, reason: String },

    #[error("Invalid parameter '{parameter}' for stage '{stage}': {reason}")]
    InvalidParameter {
        stage: String,
        parameter: String,
        reason: String,
    },
}

/// Errors loading configuration files.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported config extension '{0}'")]
    UnsupportedExtension(String),
}
