//! GPU-backed special images.
//!
//! The texture region is shared, never copied, by `make_subset` and
//! `as_image`. Shaders go through the native [`TextureShader`] path and
//! CPU access is a readback.

use super::{BackingKind, SpecialImage, SpecialImageHeader, SpecialImageRef};
use crate::core::bitmap::Bitmap;
use crate::core::color::{ColorInfo, ColorType};
use crate::core::error::SpecialImageError;
use crate::core::geometry::{IRect, Matrix};
use crate::core::gpu::{
    color_type_for_format, ContextKind, GpuTexture, RecordingContext, TextureShader,
};
use crate::core::ids::NEED_NEW_UNIQUE_ID;
use crate::core::image::Image;
use crate::core::props::SurfaceProps;
use crate::core::shader::{SamplingOptions, ShaderRef, TileMode};
use std::sync::Arc;

/// Special image over a region of a GPU texture.
#[derive(Debug)]
pub struct GpuSpecialImage {
    header: SpecialImageHeader,
    texture: Arc<GpuTexture>,
    context: Arc<RecordingContext>,
}

impl GpuSpecialImage {
    pub fn texture(&self) -> &Arc<GpuTexture> {
        &self.texture
    }
}

/// Wrap `subset` of `texture`, which must belong to `context`.
pub fn make_from_texture(
    context: &Arc<RecordingContext>,
    subset: &IRect,
    texture: Arc<GpuTexture>,
    color_info: ColorInfo,
    props: &SurfaceProps,
) -> Result<SpecialImageRef, SpecialImageError> {
    if subset.is_empty() {
        return Err(SpecialImageError::EmptySubset { subset: *subset });
    }
    if !texture.bounds().contains(subset) {
        return Err(SpecialImageError::SubsetOutOfBounds {
            subset: *subset,
            bounds: texture.bounds(),
        });
    }
    if !describes_texels(&color_info, &texture) {
        log::warn!(
            "Color type {:?} does not describe {:?} texture {}",
            color_info.color_type(),
            texture.format(),
            texture.id()
        );
        return Err(SpecialImageError::UnsupportedColorType(color_info.color_type()));
    }
    if !Arc::ptr_eq(texture.context(), context) {
        log::warn!(
            "Texture {} belongs to context {}, not {}",
            texture.id(),
            texture.context().id(),
            context.id()
        );
        return Err(SpecialImageError::Unreadable {
            reason: format!("texture {} is owned by another context", texture.id()),
        });
    }

    log::debug!("Wrapping texture {} subset {}", texture.id(), subset);
    Ok(Arc::new(GpuSpecialImage {
        header: SpecialImageHeader::new(*subset, NEED_NEW_UNIQUE_ID, color_info, *props),
        texture,
        context: Arc::clone(context),
    }))
}

/// True if `color_info` matches the layout of `texture`'s texels.
/// Single-channel textures can be read as gray or alpha.
fn describes_texels(color_info: &ColorInfo, texture: &GpuTexture) -> bool {
    match (color_type_for_format(texture.format()), color_info.color_type()) {
        (Some(ColorType::Gray8), ColorType::Alpha8) => true,
        (Some(texel_type), color_type) => texel_type == color_type,
        (None, _) => false,
    }
}

impl SpecialImage for GpuSpecialImage {
    fn header(&self) -> &SpecialImageHeader {
        &self.header
    }

    fn size(&self) -> usize {
        self.texture.byte_size()
    }

    fn as_image(&self) -> Option<Arc<Image>> {
        Some(Image::from_texture(
            Arc::clone(&self.texture),
            *self.header.subset(),
            self.header.color_info().clone(),
        ))
    }

    fn on_make_subset(&self, subset: &IRect) -> Result<SpecialImageRef, SpecialImageError> {
        Ok(Arc::new(GpuSpecialImage {
            header: SpecialImageHeader::new(
                *subset,
                NEED_NEW_UNIQUE_ID,
                self.header.color_info().clone(),
                *self.header.props(),
            ),
            texture: Arc::clone(&self.texture),
            context: Arc::clone(&self.context),
        }))
    }

    fn on_as_shader(
        &self,
        tile_mode: TileMode,
        sampling: SamplingOptions,
        local_matrix: &Matrix,
        strict: bool,
    ) -> Option<ShaderRef> {
        let image = self.as_image()?;
        let subset = strict.then(|| image.bounds());
        let shader: ShaderRef =
            TextureShader::make(image, subset, tile_mode, sampling, local_matrix)?;
        Some(shader)
    }

    fn on_as_bitmap(&self) -> Result<Bitmap, SpecialImageError> {
        self.texture.read_pixels(self.header.subset()).map_err(|err| {
            log::warn!(
                "Readback of special image {} failed: {}",
                self.header.unique_id(),
                err
            );
            SpecialImageError::Unreadable {
                reason: err.to_string(),
            }
        })
    }

    fn backing_kind(&self) -> BackingKind {
        match self.context.kind() {
            ContextKind::Immediate => BackingKind::DeviceTexture,
            ContextKind::Deferred => BackingKind::RecorderTexture,
        }
    }

    fn context(&self) -> Option<&Arc<RecordingContext>> {
        Some(&self.context)
    }
}
