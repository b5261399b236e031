//! # special-image - Restricted images for filter pipelines
//!
//! Filter stages in a 2D rendering pipeline hand intermediate results to
//! each other as *special images*: a rectangular subset of a CPU pixel
//! buffer or GPU texture behind one polymorphic interface. A special image
//! can only be drawn, turned into a general-purpose [`Image`](core::Image)
//! or turned into a shader. Subsetting is zero-copy.
//!
//! ## Features
//!
//! - **Subset model**: subsets live in backing-store coordinates and
//!   `make_subset` composes without copying pixels
//! - **Strict and fast sampling**: strict shaders and draws never read
//!   pixels outside the subset, even with linear filtering
//! - **Raster and GPU variants**: the same contract over a shared CPU
//!   buffer or a `wgpu`-described texture
//! - **Filter stages**: crop, tile, offset and blur stages with a cached
//!   pipeline
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use special_image::prelude::*;
//!
//! let bitmap = Bitmap::try_alloc(ImageInfo::n32_premul(64, 64))?;
//! let image = make_from_raster(&IRect::from_wh(64, 64), &bitmap, &SurfaceProps::default())?;
//!
//! // Zero-copy crop, relative to the current subset.
//! let center = image.make_subset(&IRect::from_xywh(16, 16, 32, 32))?;
//!
//! // Strict shader: outside the subset resolves through the tile mode.
//! let shader = center.as_shader(TileMode::Mirror, SamplingOptions::LINEAR, &Matrix::IDENTITY);
//!
//! // Run a pipeline over it.
//! let pipeline = FilterPipeline::new()
//!     .stage(BlurStage::new(2.0))
//!     .stage(TileStage::new(TileMode::Repeat, ISize::new(128, 128)));
//! let result = pipeline.run(&FilterContext::default(), center)?;
//! ```
//!
//! ## Architecture
//!
//! - [`core`]: geometry, color, bitmaps, images, shaders, canvas, GPU
//!   textures, errors and configuration
//! - [`special`]: the special image trait, its raster and GPU variants,
//!   factories and surfaces
//! - [`filters`]: the filter stage trait and built-in stages
//! - [`execution`]: pipeline execution and result caching

#![warn(clippy::all)]

pub mod core;
pub mod execution;
pub mod filters;
pub mod special;

/// Prelude module for convenient imports.
///
/// Import everything commonly needed with:
/// ```rust,ignore
/// use special_image::prelude::*;
/// ```
pub mod prelude {
    // Geometry and color
    pub use crate::core::geometry::{IPoint, IRect, ISize, Matrix, Rect};
    pub use crate::core::color::{AlphaType, Color, ColorInfo, ColorSpace, ColorType, ImageInfo};
    pub use crate::core::props::{PixelGeometry, SurfaceProps};

    // Pixels, images and drawing
    pub use crate::core::bitmap::Bitmap;
    pub use crate::core::image::Image;
    pub use crate::core::shader::{
        FilterMode, ImageShader, SamplingOptions, Shader, ShaderRef, TileMode,
    };
    pub use crate::core::canvas::{BlendMode, Canvas, Paint, SrcRectConstraint};
    pub use crate::core::gpu::{ContextKind, GpuTexture, RecordingContext};

    // Errors and configuration
    pub use crate::core::error::{
        ConfigError, Error, FilterError, GpuError, PixelError, SpecialImageError,
    };
    pub use crate::core::config::{CacheConfig, Config};

    // Special images
    pub use crate::special::{
        as_bitmap, copy_from_raster, make_from_raster, make_from_raster_image, make_from_texture,
        BackingKind, SpecialImage, SpecialImageRef, SpecialSurface,
    };

    // Filters and execution
    pub use crate::filters::{
        BlurStage, CropStage, FilterContext, FilterStage, OffsetStage, TileStage,
    };
    pub use crate::execution::{FilterPipeline, SharedCache, SpecialImageCache};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
