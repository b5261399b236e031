//! General-purpose image handle.
//!
//! Special images convert into [`Image`] through `as_image()`. An image is
//! immutable and shared through `Arc`; cropping with [`Image::make_subset`]
//! never copies pixels.

use crate::core::bitmap::Bitmap;
use crate::core::color::{AlphaType, Color, ColorInfo, ImageInfo};
use crate::core::error::PixelError;
use crate::core::geometry::{IRect, ISize};
use crate::core::gpu::GpuTexture;
use crate::core::ids::next_unique_id;
use std::sync::Arc;

/// Where an image's pixels live.
#[derive(Debug, Clone)]
pub enum ImageBacking {
    /// CPU pixels.
    Raster(Bitmap),
    /// A region of a GPU texture.
    Texture {
        texture: Arc<GpuTexture>,
        subset: IRect,
    },
}

/// Immutable image backed by CPU pixels or a GPU texture region.
#[derive(Debug)]
pub struct Image {
    backing: ImageBacking,
    info: ImageInfo,
    unique_id: u32,
}

impl Image {
    /// Wrap a bitmap, sharing its pixels.
    ///
    /// Returns `None` if the bitmap has no pixels or no area.
    pub fn from_bitmap(bitmap: Bitmap) -> Option<Arc<Image>> {
        if bitmap.draws_nothing() {
            return None;
        }
        Some(Arc::new(Image {
            info: bitmap.info().clone(),
            backing: ImageBacking::Raster(bitmap),
            unique_id: next_unique_id(),
        }))
    }

    /// Copy a decoded `image` crate image into a new premultiplied RGBA image.
    pub fn from_dynamic(image: &image::DynamicImage) -> Result<Arc<Image>, PixelError> {
        let mut rgba = image.to_rgba8();
        let alpha_type = if image.color().has_alpha() {
            for px in rgba.pixels_mut() {
                px.0 = Color::from_array(px.0).premultiply().to_array();
            }
            AlphaType::Premul
        } else {
            AlphaType::Opaque
        };
        let bitmap = Bitmap::from_rgba8(rgba, alpha_type)?;
        Image::from_bitmap(bitmap).ok_or(PixelError::EmptyDimensions {
            width: image.width() as i32,
            height: image.height() as i32,
        })
    }

    /// Wrap a region of a texture.
    pub(crate) fn from_texture(
        texture: Arc<GpuTexture>,
        subset: IRect,
        color_info: ColorInfo,
    ) -> Arc<Image> {
        Arc::new(Image {
            info: ImageInfo::new(subset.size(), color_info),
            backing: ImageBacking::Texture { texture, subset },
            unique_id: next_unique_id(),
        })
    }

    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    pub fn color_info(&self) -> &ColorInfo {
        self.info.color_info()
    }

    pub fn width(&self) -> i32 {
        self.info.width()
    }

    pub fn height(&self) -> i32 {
        self.info.height()
    }

    pub fn dimensions(&self) -> ISize {
        self.info.dimensions()
    }

    /// Bounds at the origin.
    pub fn bounds(&self) -> IRect {
        IRect::from_size(self.dimensions())
    }

    pub fn unique_id(&self) -> u32 {
        self.unique_id
    }

    pub fn backing(&self) -> &ImageBacking {
        &self.backing
    }

    pub fn is_texture_backed(&self) -> bool {
        matches!(self.backing, ImageBacking::Texture { .. })
    }

    /// CPU pixels of a raster image, without copying.
    pub fn peek_pixels(&self) -> Option<&Bitmap> {
        match &self.backing {
            ImageBacking::Raster(bitmap) => Some(bitmap),
            ImageBacking::Texture { .. } => None,
        }
    }

    /// Texels addressable by samplers, in this image's coordinates.
    ///
    /// For textures this is the device-resident copy and does not count as
    /// a readback.
    pub(crate) fn texels(&self) -> Bitmap {
        match &self.backing {
            ImageBacking::Raster(bitmap) => bitmap.clone(),
            ImageBacking::Texture { texture, subset } => {
                texture.texels().extract_subset(subset).unwrap_or_default()
            }
        }
    }

    /// Zero-copy crop to `subset`, which must lie inside [`Image::bounds`].
    pub fn make_subset(self: &Arc<Self>, subset: &IRect) -> Option<Arc<Image>> {
        if !self.bounds().contains(subset) {
            return None;
        }
        if *subset == self.bounds() {
            return Some(Arc::clone(self));
        }
        let backing = match &self.backing {
            ImageBacking::Raster(bitmap) => ImageBacking::Raster(bitmap.extract_subset(subset)?),
            ImageBacking::Texture { texture, subset: base } => ImageBacking::Texture {
                texture: Arc::clone(texture),
                subset: subset.make_offset(base.left, base.top),
            },
        };
        Some(Arc::new(Image {
            info: self.info.make_dimensions(subset.size()),
            backing,
            unique_id: next_unique_id(),
        }))
    }

    /// Copy the pixels into an `image` crate buffer. Raster images only.
    pub fn to_rgba8(&self) -> Option<image::RgbaImage> {
        self.peek_pixels().map(Bitmap::to_rgba8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: i32, height: i32) -> Bitmap {
        let mut bm = Bitmap::try_alloc(ImageInfo::n32_premul(width, height)).unwrap();
        for y in 0..height {
            for x in 0..width {
                bm.set_color(x, y, Color::new(x as u8 * 10, y as u8 * 10, 0, 255));
            }
        }
        bm
    }

    #[test]
    fn test_from_bitmap_shares_pixels() {
        let bm = gradient(4, 4);
        let image = Image::from_bitmap(bm.clone()).unwrap();
        assert_eq!(image.peek_pixels().unwrap().storage_id(), bm.storage_id());
        assert!(!image.is_texture_backed());
    }

    #[test]
    fn test_from_bitmap_rejects_empty() {
        assert!(Image::from_bitmap(Bitmap::empty()).is_none());
    }

    #[test]
    fn test_make_subset() {
        let image = Image::from_bitmap(gradient(6, 6)).unwrap();
        let sub = image.make_subset(&IRect::from_xywh(2, 1, 3, 3)).unwrap();
        assert_eq!(sub.dimensions(), ISize::new(3, 3));
        assert_ne!(sub.unique_id(), image.unique_id());
        assert_eq!(sub.peek_pixels().unwrap().get_color(0, 0), Some(Color::new(20, 10, 0, 255)));

        let same = image.make_subset(&image.bounds()).unwrap();
        assert!(Arc::ptr_eq(&same, &image));

        assert!(image.make_subset(&IRect::from_xywh(4, 4, 3, 3)).is_none());
    }

    #[test]
    fn test_from_dynamic() {
        let rgb = image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]));
        let image = Image::from_dynamic(&image::DynamicImage::ImageRgb8(rgb)).unwrap();
        assert_eq!(image.color_info().alpha_type(), AlphaType::Opaque);
        assert_eq!(image.to_rgba8().unwrap().get_pixel(1, 1).0, [1, 2, 3, 255]);
    }

    #[test]
    fn test_from_dynamic_premultiplies_alpha() {
        let rgba = image::RgbaImage::from_pixel(2, 1, image::Rgba([255, 128, 0, 128]));
        let image = Image::from_dynamic(&image::DynamicImage::ImageRgba8(rgba)).unwrap();
        assert_eq!(image.color_info().alpha_type(), AlphaType::Premul);

        let pixels = image.peek_pixels().unwrap();
        let c = pixels.get_color(1, 0).unwrap();
        assert_eq!(c, Color::new(128, 64, 0, 128));
        assert!(c.r <= c.a && c.g <= c.a && c.b <= c.a);
        assert_eq!(pixels.to_unpremul_rgba8().get_pixel(1, 0).0, [255, 128, 0, 128]);
    }
}
