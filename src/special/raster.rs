//! CPU-backed special images.

use super::{SpecialImage, SpecialImageHeader, SpecialImageRef};
use crate::core::bitmap::Bitmap;
use crate::core::error::SpecialImageError;
use crate::core::geometry::IRect;
use crate::core::ids::NEED_NEW_UNIQUE_ID;
use crate::core::image::Image;
use crate::core::props::SurfaceProps;
use std::sync::Arc;

/// Special image over a shared CPU pixel buffer.
///
/// `bitmap` is the whole backing store; the header's subset is a rectangle
/// inside `bitmap.bounds()`.
#[derive(Debug)]
pub struct RasterSpecialImage {
    header: SpecialImageHeader,
    bitmap: Bitmap,
}

impl RasterSpecialImage {
    /// Wrap `bitmap` without copying. `subset` must already be validated
    /// against `bitmap.bounds()`.
    pub(crate) fn new(subset: IRect, bitmap: Bitmap, unique_id: u32, props: SurfaceProps) -> Self {
        let color_info = bitmap.info().color_info().clone();
        Self {
            header: SpecialImageHeader::new(subset, unique_id, color_info, props),
            bitmap,
        }
    }

    /// The full backing store.
    pub fn backing(&self) -> &Bitmap {
        &self.bitmap
    }
}

impl SpecialImage for RasterSpecialImage {
    fn header(&self) -> &SpecialImageHeader {
        &self.header
    }

    fn size(&self) -> usize {
        self.bitmap.storage_byte_size()
    }

    fn as_image(&self) -> Option<Arc<Image>> {
        Image::from_bitmap(self.bitmap.extract_subset(self.header.subset())?)
    }

    fn on_make_subset(&self, subset: &IRect) -> Result<SpecialImageRef, SpecialImageError> {
        log::debug!("Raster subset {} of special image {}", subset, self.header.unique_id());
        Ok(Arc::new(RasterSpecialImage::new(
            *subset,
            self.bitmap.clone(),
            NEED_NEW_UNIQUE_ID,
            *self.header.props(),
        )))
    }

    fn on_as_bitmap(&self) -> Result<Bitmap, SpecialImageError> {
        self.bitmap
            .extract_subset(self.header.subset())
            .ok_or(SpecialImageError::NoPixels)
    }
}
