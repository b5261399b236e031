//! Constructors for raster special images and CPU extraction.
//!
//! Raster special images always hold N32 pixels. Sources in another
//! supported layout are converted, which is a copy; N32 sources are shared.

use super::raster::RasterSpecialImage;
use super::{SpecialImage, SpecialImageRef};
use crate::core::bitmap::Bitmap;
use crate::core::color::ColorType;
use crate::core::error::SpecialImageError;
use crate::core::geometry::IRect;
use crate::core::ids::NEED_NEW_UNIQUE_ID;
use crate::core::image::Image;
use crate::core::props::SurfaceProps;
use std::sync::Arc;

fn check_source(bitmap: &Bitmap) -> Result<(), SpecialImageError> {
    if !bitmap.has_pixels() {
        return Err(SpecialImageError::NoPixels);
    }
    if bitmap.dimensions().is_empty() {
        return Err(SpecialImageError::EmptyDimensions {
            width: bitmap.width(),
            height: bitmap.height(),
        });
    }
    if bitmap.color_type() == ColorType::Unknown {
        return Err(SpecialImageError::UnsupportedColorType(ColorType::Unknown));
    }
    Ok(())
}

fn check_subset(subset: &IRect, bounds: IRect) -> Result<(), SpecialImageError> {
    if subset.is_empty() {
        return Err(SpecialImageError::EmptySubset { subset: *subset });
    }
    if !bounds.contains(subset) {
        return Err(SpecialImageError::SubsetOutOfBounds {
            subset: *subset,
            bounds,
        });
    }
    Ok(())
}

/// Share `bitmap` when it is N32, otherwise convert it.
///
/// The flag is true when the pixels were shared.
fn to_n32(bitmap: &Bitmap) -> Result<(Bitmap, bool), SpecialImageError> {
    if bitmap.color_type() == ColorType::N32 {
        return Ok((bitmap.clone(), true));
    }
    log::debug!("Converting {:?} source to N32", bitmap.color_type());
    Ok((bitmap.copy_to(ColorType::N32)?, false))
}

/// Wrap `subset` of a raster image without copying.
///
/// Fails if the image has no CPU pixels (texture-backed images included) or
/// `subset` is empty or outside the image. A full-bounds subset keeps the
/// image's unique id.
pub fn make_from_raster_image(
    subset: &IRect,
    image: &Arc<Image>,
    props: &SurfaceProps,
) -> Result<SpecialImageRef, SpecialImageError> {
    let bitmap = image.peek_pixels().ok_or(SpecialImageError::NoPixels)?;
    check_source(bitmap)?;
    check_subset(subset, image.bounds())?;

    let (pixels, shared) = to_n32(bitmap)?;
    let unique_id = if shared && *subset == image.bounds() {
        image.unique_id()
    } else {
        NEED_NEW_UNIQUE_ID
    };
    log::debug!("Special image from raster image {} subset {}", image.unique_id(), subset);
    Ok(Arc::new(RasterSpecialImage::new(*subset, pixels, unique_id, *props)))
}

/// Wrap `subset` of `bitmap` without copying.
///
/// The special image holds its own reference to the pixels; later writes
/// through `bitmap` detach the caller's copy and are never observed. When
/// `bitmap` spans its whole storage and `subset` is the full bounds, the
/// storage generation id becomes the unique id.
pub fn make_from_raster(
    subset: &IRect,
    bitmap: &Bitmap,
    props: &SurfaceProps,
) -> Result<SpecialImageRef, SpecialImageError> {
    check_source(bitmap)?;
    check_subset(subset, bitmap.bounds())?;

    let (pixels, shared) = to_n32(bitmap)?;
    let unique_id = if shared && *subset == bitmap.bounds() && bitmap.covers_storage() {
        bitmap.generation_id()
    } else {
        NEED_NEW_UNIQUE_ID
    };
    log::debug!("Special image from bitmap subset {}", subset);
    Ok(Arc::new(RasterSpecialImage::new(*subset, pixels, unique_id, *props)))
}

/// Copy `subset` of `bitmap` into new N32 storage.
///
/// The result's subset is `(0, 0, w, h)` and it shares nothing with
/// `bitmap`.
pub fn copy_from_raster(
    subset: &IRect,
    bitmap: &Bitmap,
    props: &SurfaceProps,
) -> Result<SpecialImageRef, SpecialImageError> {
    check_source(bitmap)?;
    check_subset(subset, bitmap.bounds())?;

    let view = bitmap.extract_subset(subset).ok_or(SpecialImageError::NoPixels)?;
    let copy = view.copy_to(ColorType::N32)?;
    log::debug!(
        "Copied {} of bitmap into {} new bytes",
        subset,
        copy.storage_byte_size()
    );
    Ok(Arc::new(RasterSpecialImage::new(
        IRect::from_size(subset.size()),
        copy,
        NEED_NEW_UNIQUE_ID,
        *props,
    )))
}

/// CPU pixels of `image`'s subset.
///
/// Raster images return a zero-copy view; GPU images are read back. On
/// failure no bitmap is produced.
pub fn as_bitmap(image: &dyn SpecialImage) -> Result<Bitmap, SpecialImageError> {
    image.on_as_bitmap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::color::{AlphaType, Color, ColorInfo, ImageInfo};
    use crate::core::geometry::ISize;
    use crate::core::gpu::{ContextKind, RecordingContext};

    fn numbered(width: i32, height: i32) -> Bitmap {
        let mut bm = Bitmap::try_alloc(ImageInfo::n32_premul(width, height)).unwrap();
        for y in 0..height {
            for x in 0..width {
                bm.set_color(x, y, Color::new(x as u8, y as u8, 1, 255));
            }
        }
        bm
    }

    #[test]
    fn test_make_from_raster_rejects_bad_sources() {
        let props = SurfaceProps::default();
        assert_eq!(
            make_from_raster(&IRect::from_wh(1, 1), &Bitmap::empty(), &props).unwrap_err(),
            SpecialImageError::NoPixels
        );

        let bm = numbered(4, 4);
        assert!(matches!(
            make_from_raster(&IRect::from_xywh(2, 2, 4, 4), &bm, &props),
            Err(SpecialImageError::SubsetOutOfBounds { .. })
        ));
        assert!(matches!(
            make_from_raster(&IRect::from_xywh(1, 1, 0, 2), &bm, &props),
            Err(SpecialImageError::EmptySubset { .. })
        ));
    }

    #[test]
    fn test_make_from_raster_identity() {
        let props = SurfaceProps::default();
        let bm = numbered(4, 4);
        let whole = make_from_raster(&bm.bounds(), &bm, &props).unwrap();
        let again = make_from_raster(&bm.bounds(), &bm, &props).unwrap();
        assert_eq!(whole.unique_id(), bm.generation_id());
        assert_eq!(whole.unique_id(), again.unique_id());

        let part = make_from_raster(&IRect::from_wh(2, 2), &bm, &props).unwrap();
        assert_ne!(part.unique_id(), bm.generation_id());

        let view = bm.extract_subset(&IRect::from_xywh(1, 1, 2, 2)).unwrap();
        let from_view = make_from_raster(&view.bounds(), &view, &props).unwrap();
        assert_ne!(from_view.unique_id(), bm.generation_id());
    }

    #[test]
    fn test_make_from_raster_ignores_later_writes() {
        let mut bm = numbered(4, 4);
        let image = make_from_raster(&bm.bounds(), &bm, &SurfaceProps::default()).unwrap();
        bm.erase(Color::WHITE);
        let pixels = as_bitmap(image.as_ref()).unwrap();
        assert_eq!(pixels.get_color(3, 2), Some(Color::new(3, 2, 1, 255)));
        assert_ne!(pixels.storage_id(), bm.storage_id());
    }

    #[test]
    fn test_make_from_raster_converts_gray() {
        let gray = ColorInfo::new(ColorType::Gray8, AlphaType::Opaque, None);
        let info = ImageInfo::new(ISize::new(2, 2), gray);
        let mut gray = Bitmap::try_alloc(info).unwrap();
        gray.set_color(1, 0, Color::new(80, 80, 80, 255));
        let image = make_from_raster(&gray.bounds(), &gray, &SurfaceProps::default()).unwrap();
        assert_eq!(image.color_type(), ColorType::N32);
        assert_eq!(image.alpha_type(), AlphaType::Opaque);
        assert_ne!(image.unique_id(), gray.generation_id());
        let pixels = as_bitmap(image.as_ref()).unwrap();
        assert_eq!(pixels.get_color(1, 0), Some(Color::new(80, 80, 80, 255)));
    }

    #[test]
    fn test_make_from_raster_image() {
        let props = SurfaceProps::default();
        let image = Image::from_bitmap(numbered(6, 6)).unwrap();
        let whole = make_from_raster_image(&image.bounds(), &image, &props).unwrap();
        assert_eq!(whole.unique_id(), image.unique_id());

        let part = make_from_raster_image(&IRect::from_xywh(1, 2, 3, 3), &image, &props).unwrap();
        assert_ne!(part.unique_id(), image.unique_id());
        let view = part.as_image().unwrap();
        let pixels = view.peek_pixels().unwrap();
        assert_eq!(pixels.storage_id(), image.peek_pixels().unwrap().storage_id());
        assert_eq!(pixels.get_color(0, 0), Some(Color::new(1, 2, 1, 255)));
    }

    #[test]
    fn test_make_from_raster_image_rejects_textures() {
        let ctx = RecordingContext::new(ContextKind::Immediate);
        let texture = ctx
            .create_texture(
                ISize::new(2, 2),
                wgpu::TextureFormat::Rgba8Unorm,
                wgpu::TextureUsages::TEXTURE_BINDING,
            )
            .unwrap();
        let image = Image::from_texture(texture, IRect::from_wh(2, 2), ColorInfo::n32_premul());
        let props = SurfaceProps::default();
        let result = make_from_raster_image(&IRect::from_wh(2, 2), &image, &props);
        assert_eq!(result.unwrap_err(), SpecialImageError::NoPixels);
    }

    #[test]
    fn test_copy_from_raster() {
        let bm = numbered(8, 8);
        let subset = IRect::from_xywh(2, 3, 4, 2);
        let copy = copy_from_raster(&subset, &bm, &SurfaceProps::default()).unwrap();
        assert_eq!(copy.subset(), IRect::from_wh(4, 2));
        assert_eq!(copy.size(), 4 * 2 * 4);

        let pixels = as_bitmap(copy.as_ref()).unwrap();
        assert_ne!(pixels.storage_id(), bm.storage_id());
        for y in 0..2 {
            assert_eq!(pixels.row(y), bm.extract_subset(&subset).unwrap().row(y));
        }
    }

    #[test]
    fn test_copy_from_raster_rejects_empty() {
        let bm = numbered(4, 4);
        let props = SurfaceProps::default();
        assert!(copy_from_raster(&IRect::from_xywh(0, 0, 0, 4), &bm, &props).is_err());
        assert!(copy_from_raster(&IRect::from_xywh(0, 0, 4, 0), &bm, &props).is_err());
    }
}
