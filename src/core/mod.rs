//! Collaborator types the special images are built on.
//!
//! This module contains:
//! - Geometry (integer and float rectangles, affine matrices)
//! - Color and pixel layout descriptions
//! - Bitmaps, images, shaders and the raster canvas
//! - The GPU recording context and textures
//! - Error types and configuration

pub mod geometry;
pub mod color;
pub mod props;
pub mod error;
pub mod ids;
pub mod bitmap;
pub mod image;
pub mod shader;
pub mod canvas;
pub mod gpu;
pub mod config;

// Re-export commonly used types
pub use geometry::{IPoint, IRect, ISize, Matrix, Rect};
pub use color::{AlphaType, Color, ColorInfo, ColorSpace, ColorType, ImageInfo};
pub use props::{PixelGeometry, SurfaceProps};
pub use error::{ConfigError, Error, FilterError, GpuError, PixelError, SpecialImageError};
pub use ids::{next_unique_id, NEED_NEW_UNIQUE_ID};
pub use bitmap::Bitmap;
pub use image::{Image, ImageBacking};
pub use shader::{FilterMode, ImageShader, SamplingOptions, Shader, ShaderRef, TileMode};
pub use canvas::{BlendMode, Canvas, Paint, SrcRectConstraint};
pub use gpu::{ContextKind, GpuTexture, RecordingContext, TextureShader};
pub use config::{CacheConfig, Config};
