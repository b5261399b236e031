//! Special images.
//!
//! A special image is the restricted image type passed between filter
//! stages. It exposes a rectangular *subset* of a possibly larger backing
//! store (CPU pixels or a GPU texture) and offers exactly three ways to
//! consume it: draw it, convert it to an [`Image`], or convert it to a
//! [`Shader`](crate::core::shader::Shader).
//!
//! Subsets are stored in absolute backing-store coordinates. Everything a
//! caller passes in (`make_subset` rectangles, shader coordinates, draw
//! offsets) is relative to the current subset's top-left corner.
//!
//! Backing pixels outside the subset are undefined. Strict operations never
//! read them; fast operations may, in exchange for skipping edge handling.

pub mod factory;
pub mod gpu;
pub mod raster;
pub mod surface;

pub use factory::{as_bitmap, copy_from_raster, make_from_raster, make_from_raster_image};
pub use gpu::{make_from_texture, GpuSpecialImage};
pub use raster::RasterSpecialImage;
pub use surface::SpecialSurface;

use crate::core::bitmap::Bitmap;
use crate::core::canvas::{Canvas, Paint, SrcRectConstraint};
use crate::core::color::{AlphaType, ColorInfo, ColorSpace, ColorType};
use crate::core::error::SpecialImageError;
use crate::core::geometry::{IRect, ISize, Matrix, Rect};
use crate::core::gpu::RecordingContext;
use crate::core::ids::resolve_unique_id;
use crate::core::image::Image;
use crate::core::props::SurfaceProps;
use crate::core::shader::{ImageShader, SamplingOptions, ShaderRef, TileMode};
use std::fmt;
use std::sync::Arc;

/// Shared handle to any special image.
pub type SpecialImageRef = Arc<dyn SpecialImage>;

/// Where a special image's pixels live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackingKind {
    /// CPU pixel buffer.
    Raster,
    /// Texture owned by an immediate device context.
    DeviceTexture,
    /// Texture owned by a deferred recorder.
    RecorderTexture,
}

/// State common to every special image. Immutable after construction.
#[derive(Debug, Clone)]
pub struct SpecialImageHeader {
    subset: IRect,
    unique_id: u32,
    color_info: ColorInfo,
    props: SurfaceProps,
}

impl SpecialImageHeader {
    /// Create a header. A `unique_id` of
    /// [`NEED_NEW_UNIQUE_ID`](crate::core::ids::NEED_NEW_UNIQUE_ID) mints a
    /// fresh id.
    pub fn new(subset: IRect, unique_id: u32, color_info: ColorInfo, props: SurfaceProps) -> Self {
        Self {
            subset,
            unique_id: resolve_unique_id(unique_id),
            color_info,
            props,
        }
    }

    pub fn subset(&self) -> &IRect {
        &self.subset
    }

    pub fn unique_id(&self) -> u32 {
        self.unique_id
    }

    pub fn color_info(&self) -> &ColorInfo {
        &self.color_info
    }

    pub fn props(&self) -> &SurfaceProps {
        &self.props
    }
}

/// The special image contract.
///
/// Variants implement [`header`](SpecialImage::header),
/// [`size`](SpecialImage::size), [`as_image`](SpecialImage::as_image) and
/// [`on_make_subset`](SpecialImage::on_make_subset); everything else has a
/// default built on those.
pub trait SpecialImage: Send + Sync + fmt::Debug {
    fn header(&self) -> &SpecialImageHeader;

    /// Approximate memory held by the backing store, in bytes.
    fn size(&self) -> usize;

    /// General-purpose image of the subset, sharing the backing memory.
    fn as_image(&self) -> Option<Arc<Image>>;

    /// Create a special image over `subset`, given in absolute backing-store
    /// coordinates and already validated.
    fn on_make_subset(&self, subset: &IRect) -> Result<SpecialImageRef, SpecialImageError>;

    /// Build a shader over the subset.
    ///
    /// The default samples [`as_image`](SpecialImage::as_image): strict
    /// shaders are restricted to the image bounds, non-strict ones may
    /// sample the surrounding storage.
    fn on_as_shader(
        &self,
        tile_mode: TileMode,
        sampling: SamplingOptions,
        local_matrix: &Matrix,
        strict: bool,
    ) -> Option<ShaderRef> {
        let image = self.as_image()?;
        if strict {
            let bounds = image.bounds();
            ImageShader::make_subset(image, bounds, tile_mode, tile_mode, sampling, local_matrix)
        } else {
            ImageShader::make(image, tile_mode, tile_mode, sampling, local_matrix)
        }
    }

    /// CPU pixels of the subset, if this variant can provide them.
    fn on_as_bitmap(&self) -> Result<Bitmap, SpecialImageError> {
        Err(SpecialImageError::Unreadable {
            reason: "backing store has no CPU view".to_string(),
        })
    }

    fn backing_kind(&self) -> BackingKind {
        BackingKind::Raster
    }

    /// GPU context owning the backing texture, `None` for CPU images.
    fn context(&self) -> Option<&Arc<RecordingContext>> {
        None
    }

    fn subset(&self) -> IRect {
        *self.header().subset()
    }

    fn dimensions(&self) -> ISize {
        self.header().subset().size()
    }

    fn width(&self) -> i32 {
        self.header().subset().width()
    }

    fn height(&self) -> i32 {
        self.header().subset().height()
    }

    fn unique_id(&self) -> u32 {
        self.header().unique_id()
    }

    fn color_info(&self) -> &ColorInfo {
        self.header().color_info()
    }

    fn color_type(&self) -> ColorType {
        self.color_info().color_type()
    }

    fn alpha_type(&self) -> AlphaType {
        self.color_info().alpha_type()
    }

    fn color_space(&self) -> Option<&ColorSpace> {
        self.color_info().color_space()
    }

    fn props(&self) -> &SurfaceProps {
        self.header().props()
    }

    fn is_device_gpu_backed(&self) -> bool {
        self.backing_kind() == BackingKind::DeviceTexture
    }

    fn is_recorder_gpu_backed(&self) -> bool {
        self.backing_kind() == BackingKind::RecorderTexture
    }

    /// Special image over `subset`, relative to this image's top-left.
    ///
    /// Shares the backing store. `subset` must be non-empty and inside
    /// `(0, 0, width, height)`; anything else is rejected, not clamped.
    fn make_subset(&self, subset: &IRect) -> Result<SpecialImageRef, SpecialImageError> {
        if subset.is_empty() {
            log::warn!("Rejecting empty subset {} of special image {}", subset, self.unique_id());
            return Err(SpecialImageError::EmptySubset { subset: *subset });
        }
        let bounds = IRect::from_size(self.dimensions());
        if !bounds.contains(subset) {
            log::warn!(
                "Rejecting subset {} outside special image {} bounds {}",
                subset,
                self.unique_id(),
                bounds
            );
            return Err(SpecialImageError::SubsetOutOfBounds {
                subset: *subset,
                bounds,
            });
        }
        let origin = self.header().subset().top_left();
        self.on_make_subset(&subset.make_offset_point(origin))
    }

    /// Strict shader: coordinates outside the subset resolve through
    /// `tile_mode` and never read neighboring backing pixels.
    fn as_shader(
        &self,
        tile_mode: TileMode,
        sampling: SamplingOptions,
        local_matrix: &Matrix,
    ) -> Option<ShaderRef> {
        self.on_as_shader(tile_mode, sampling, local_matrix, true)
    }

    /// Non-strict shader. The caller promises not to evaluate it outside
    /// the subset; if it does, results are undefined.
    fn as_shader_fast(
        &self,
        sampling: SamplingOptions,
        local_matrix: &Matrix,
    ) -> Option<ShaderRef> {
        self.on_as_shader(TileMode::Clamp, sampling, local_matrix, false)
    }

    /// Draw the subset with its top-left at (x, y).
    fn draw(
        &self,
        canvas: &mut Canvas,
        x: f32,
        y: f32,
        sampling: SamplingOptions,
        paint: Option<&Paint>,
        strict: bool,
    ) {
        let Some(image) = self.as_image() else {
            log::warn!("Special image {} has no image view, skipping draw", self.unique_id());
            return;
        };
        let dst = Rect::from_xywh(x, y, self.width() as f32, self.height() as f32);
        let constraint = if strict {
            SrcRectConstraint::Strict
        } else {
            SrcRectConstraint::Fast
        };
        canvas.draw_image_rect(&image, &image.bounds(), &dst, sampling, paint, constraint);
    }

    /// Strict draw with nearest sampling and no paint.
    fn draw_at(&self, canvas: &mut Canvas, x: f32, y: f32) {
        self.draw(canvas, x, y, SamplingOptions::NEAREST, None, true)
    }
}
