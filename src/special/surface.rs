//! Offscreen raster surfaces that filter stages render into.

use super::factory::make_from_raster;
use super::SpecialImageRef;
use crate::core::bitmap::Bitmap;
use crate::core::canvas::Canvas;
use crate::core::color::{ColorType, ImageInfo};
use crate::core::error::SpecialImageError;
use crate::core::props::SurfaceProps;

/// A canvas whose contents can be snapshotted as a special image.
#[derive(Debug)]
pub struct SpecialSurface {
    canvas: Canvas,
    props: SurfaceProps,
}

impl SpecialSurface {
    /// Allocate a zeroed surface. Only N32 and BGRA layouts are drawable.
    pub fn make_raster(info: &ImageInfo, props: &SurfaceProps) -> Result<Self, SpecialImageError> {
        match info.color_type() {
            ColorType::Rgba8888 | ColorType::Bgra8888 => {}
            other => return Err(SpecialImageError::UnsupportedColorType(other)),
        }
        let bitmap = Bitmap::try_alloc(info.clone())?;
        let canvas = Canvas::new(bitmap, *props)?;
        log::debug!("Created {}x{} special surface", info.width(), info.height());
        Ok(Self {
            canvas,
            props: *props,
        })
    }

    pub fn canvas(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    pub fn props(&self) -> &SurfaceProps {
        &self.props
    }

    pub fn width(&self) -> i32 {
        self.canvas.width()
    }

    pub fn height(&self) -> i32 {
        self.canvas.height()
    }

    /// Special image of the current contents.
    ///
    /// Shares the surface pixels; drawing afterwards leaves the snapshot
    /// unchanged.
    pub fn make_image_snapshot(&self) -> Result<SpecialImageRef, SpecialImageError> {
        let bitmap = self.canvas.bitmap();
        make_from_raster(&bitmap.bounds(), bitmap, &self.props)
    }
}
