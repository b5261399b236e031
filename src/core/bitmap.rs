//! CPU pixel maps.
//!
//! A [`Bitmap`] is a view (dimensions, color info, origin) into a shared
//! [`PixelStorage`]. Views are cheap to clone and to crop: they share the
//! storage through an `Arc`. Writes go through copy-on-write, so a special
//! image wrapping a bitmap never observes later writes made by the caller.

use crate::core::color::{AlphaType, Color, ColorInfo, ColorType, ImageInfo};
use crate::core::error::PixelError;
use crate::core::geometry::{IPoint, IRect, ISize};
use crate::core::ids::next_unique_id;
use std::fmt;
use std::sync::Arc;

/// A block of pixel memory with its full dimensions and row stride.
pub struct PixelStorage {
    bytes: Vec<u8>,
    dimensions: ISize,
    row_bytes: usize,
    color_type: ColorType,
    generation_id: u32,
}

impl PixelStorage {
    /// Full dimensions of the allocation.
    pub fn dimensions(&self) -> ISize {
        self.dimensions
    }

    /// Row stride in bytes.
    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    /// Total allocation size in bytes.
    pub fn byte_size(&self) -> usize {
        self.bytes.len()
    }

    /// Id that changes whenever the pixel contents change.
    pub fn generation_id(&self) -> u32 {
        self.generation_id
    }

    fn offset_of(&self, x: i32, y: i32) -> usize {
        y as usize * self.row_bytes + x as usize * self.color_type.bytes_per_pixel()
    }
}

impl Clone for PixelStorage {
    fn clone(&self) -> Self {
        Self {
            bytes: self.bytes.clone(),
            dimensions: self.dimensions,
            row_bytes: self.row_bytes,
            color_type: self.color_type,
            generation_id: next_unique_id(),
        }
    }
}

impl fmt::Debug for PixelStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PixelStorage")
            .field("dimensions", &self.dimensions)
            .field("row_bytes", &self.row_bytes)
            .field("color_type", &self.color_type)
            .field("byte_size", &self.bytes.len())
            .field("generation_id", &self.generation_id)
            .finish()
    }
}

/// A view into shared pixel storage.
#[derive(Debug, Clone, Default)]
pub struct Bitmap {
    info: ImageInfo,
    origin: IPoint,
    storage: Option<Arc<PixelStorage>>,
}

impl Bitmap {
    /// A bitmap with no pixels.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Allocate zeroed, tightly packed pixels for `info`.
    pub fn try_alloc(info: ImageInfo) -> Result<Self, PixelError> {
        validate_info(&info)?;
        let row_bytes = info.min_row_bytes();
        let bytes = info.compute_byte_size(row_bytes);

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(bytes)
            .map_err(|_| PixelError::AllocationFailed { bytes })?;
        buffer.resize(bytes, 0);

        Self::from_pixels(info, row_bytes, buffer)
    }

    /// Take ownership of `bytes` laid out with `row_bytes` stride.
    pub fn from_pixels(
        info: ImageInfo,
        row_bytes: usize,
        bytes: Vec<u8>,
    ) -> Result<Self, PixelError> {
        validate_info(&info)?;
        let min = info.min_row_bytes();
        if row_bytes < min {
            return Err(PixelError::RowBytesTooSmall { row_bytes, min });
        }
        let required = info.compute_byte_size(row_bytes);
        if bytes.len() < required {
            return Err(PixelError::BufferTooSmall {
                len: bytes.len(),
                required,
            });
        }

        let storage = PixelStorage {
            bytes,
            dimensions: info.dimensions(),
            row_bytes,
            color_type: info.color_type(),
            generation_id: next_unique_id(),
        };
        Ok(Self {
            info,
            origin: IPoint::default(),
            storage: Some(Arc::new(storage)),
        })
    }

    /// Wrap an `image` crate RGBA buffer without copying its pixels.
    pub fn from_rgba8(image: image::RgbaImage, alpha_type: AlphaType) -> Result<Self, PixelError> {
        let (width, height) = image.dimensions();
        let info = ImageInfo::new(
            ISize::new(width as i32, height as i32),
            ColorInfo::new(ColorType::Rgba8888, alpha_type, None),
        );
        let row_bytes = info.min_row_bytes();
        Self::from_pixels(info, row_bytes, image.into_raw())
    }

    /// Copy the view into an `image` crate RGBA buffer.
    pub fn to_rgba8(&self) -> image::RgbaImage {
        let width = self.width().max(0) as u32;
        let height = self.height().max(0) as u32;
        image::RgbaImage::from_fn(width, height, |x, y| {
            let c = self.get_color(x as i32, y as i32).unwrap_or(Color::TRANSPARENT);
            image::Rgba(c.to_array())
        })
    }

    /// Copy the view into an unpremultiplied `image` crate RGBA buffer, the
    /// layout encoders expect.
    pub fn to_unpremul_rgba8(&self) -> image::RgbaImage {
        let mut rgba = self.to_rgba8();
        if self.info.alpha_type() == AlphaType::Premul {
            for px in rgba.pixels_mut() {
                px.0 = Color::from_array(px.0).unpremultiply().to_array();
            }
        }
        rgba
    }

    pub fn info(&self) -> &ImageInfo {
        &self.info
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

    /// The view's bounds in its own coordinates, always at the origin.
    pub fn bounds(&self) -> IRect {
        IRect::from_size(self.dimensions())
    }

    pub fn color_type(&self) -> ColorType {
        self.info.color_type()
    }

    /// Row stride of the underlying storage, zero without pixels.
    pub fn row_bytes(&self) -> usize {
        self.storage.as_ref().map_or(0, |s| s.row_bytes)
    }

    /// Top-left of this view inside the storage.
    pub fn pixel_origin(&self) -> IPoint {
        self.origin
    }

    /// Shared storage, if any.
    pub fn storage(&self) -> Option<&Arc<PixelStorage>> {
        self.storage.as_ref()
    }

    /// Address of the shared storage; equal for views sharing pixels.
    pub fn storage_id(&self) -> Option<usize> {
        self.storage.as_ref().map(|s| Arc::as_ptr(s) as usize)
    }

    /// Generation id of the storage, zero without pixels.
    pub fn generation_id(&self) -> u32 {
        self.storage.as_ref().map_or(0, |s| s.generation_id)
    }

    /// True if the bitmap has storage attached.
    pub fn has_pixels(&self) -> bool {
        self.storage.is_some()
    }

    /// True if drawing this bitmap would produce nothing.
    pub fn draws_nothing(&self) -> bool {
        !self.has_pixels() || self.info.is_empty()
    }

    /// True if this view spans the whole storage.
    pub fn covers_storage(&self) -> bool {
        self.storage.as_ref().is_some_and(|s| {
            self.origin == IPoint::default() && s.dimensions == self.dimensions()
        })
    }

    /// Byte size of the whole storage this view refers into.
    pub fn storage_byte_size(&self) -> usize {
        self.storage.as_ref().map_or(0, |s| s.byte_size())
    }

    /// Bytes spanned by this view's rows.
    pub fn compute_byte_size(&self) -> usize {
        self.info.compute_byte_size(self.row_bytes())
    }

    /// Storage bounds expressed in this view's coordinates.
    ///
    /// Pixels inside these bounds but outside [`Bitmap::bounds`] physically
    /// exist but are not part of the view.
    pub fn storage_bounds(&self) -> IRect {
        match &self.storage {
            Some(s) => IRect::from_size(s.dimensions).make_offset(-self.origin.x, -self.origin.y),
            None => IRect::default(),
        }
    }

    /// One row of the view, `width * bytes_per_pixel` bytes long.
    pub fn row(&self, y: i32) -> Option<&[u8]> {
        let storage = self.storage.as_ref()?;
        if y < 0 || y >= self.height() {
            return None;
        }
        let start = storage.offset_of(self.origin.x, self.origin.y + y);
        storage.bytes.get(start..start + self.info.min_row_bytes())
    }

    /// Color of the pixel at (x, y) in view coordinates.
    pub fn get_color(&self, x: i32, y: i32) -> Option<Color> {
        if !self.bounds().contains_point(x, y) {
            return None;
        }
        self.get_storage_color(x, y)
    }

    /// Color at (x, y) in view coordinates, checked only against the storage.
    ///
    /// This can read pixels outside the view. Only non-strict sampling uses it.
    pub(crate) fn get_storage_color(&self, x: i32, y: i32) -> Option<Color> {
        let storage = self.storage.as_ref()?;
        let sx = x + self.origin.x;
        let sy = y + self.origin.y;
        if !IRect::from_size(storage.dimensions).contains_point(sx, sy) {
            return None;
        }
        let bpp = storage.color_type.bytes_per_pixel();
        let offset = storage.offset_of(sx, sy);
        let px = storage.bytes.get(offset..offset + bpp)?;
        Some(Color::from_pixel(storage.color_type, px))
    }

    /// Zero-copy view of `subset`, clipped to this view's bounds.
    ///
    /// Returns `None` when the clipped region is empty or there are no pixels.
    pub fn extract_subset(&self, subset: &IRect) -> Option<Bitmap> {
        self.storage.as_ref()?;
        let clipped = self.bounds().intersect(subset)?;
        Some(Bitmap {
            info: self.info.make_dimensions(clipped.size()),
            origin: IPoint::new(self.origin.x + clipped.left, self.origin.y + clipped.top),
            storage: self.storage.clone(),
        })
    }

    /// Copy the view into new, tightly packed storage of `color_type`.
    pub fn copy_to(&self, color_type: ColorType) -> Result<Bitmap, PixelError> {
        if !self.has_pixels() {
            return Err(PixelError::BufferTooSmall { len: 0, required: self.compute_byte_size() });
        }
        let mut dst = Bitmap::try_alloc(self.info.make_color_type(color_type))?;
        let src_type = self.color_type();
        let dst_bpp = color_type.bytes_per_pixel();
        let src_bpp = src_type.bytes_per_pixel();
        let width = self.width() as usize;

        if let Some((bytes, row_bytes)) = dst.view_bytes_mut() {
            for y in 0..self.height() {
                let Some(src_row) = self.row(y) else { break };
                let dst_row = &mut bytes[y as usize * row_bytes..][..width * dst_bpp];
                if src_type == color_type {
                    dst_row.copy_from_slice(src_row);
                } else {
                    for (s, d) in src_row
                        .chunks_exact(src_bpp)
                        .zip(dst_row.chunks_exact_mut(dst_bpp))
                    {
                        Color::from_pixel(src_type, s).write_pixel(color_type, d);
                    }
                }
            }
        }
        Ok(dst)
    }

    /// Write one pixel. Detaches from shared storage first.
    pub fn set_color(&mut self, x: i32, y: i32, color: Color) -> bool {
        if !self.bounds().contains_point(x, y) {
            return false;
        }
        let color_type = self.color_type();
        let bpp = color_type.bytes_per_pixel();
        let Some((bytes, row_bytes)) = self.view_bytes_mut() else {
            return false;
        };
        let offset = y as usize * row_bytes + x as usize * bpp;
        color.write_pixel(color_type, &mut bytes[offset..offset + bpp]);
        true
    }

    /// Fill the whole view with `color`.
    pub fn erase(&mut self, color: Color) {
        let color_type = self.color_type();
        let bpp = color_type.bytes_per_pixel();
        let width = self.width().max(0) as usize;
        let height = self.height().max(0) as usize;
        if let Some((bytes, row_bytes)) = self.view_bytes_mut() {
            for y in 0..height {
                let row = &mut bytes[y * row_bytes..][..width * bpp];
                for px in row.chunks_exact_mut(bpp) {
                    color.write_pixel(color_type, px);
                }
            }
        }
    }

    /// Mutable bytes starting at the view's first pixel, plus the row stride.
    ///
    /// Clones the storage when it is shared and bumps its generation id.
    pub(crate) fn view_bytes_mut(&mut self) -> Option<(&mut [u8], usize)> {
        let storage = self.storage.as_mut()?;
        let storage = Arc::make_mut(storage);
        storage.generation_id = next_unique_id();
        let start = storage.offset_of(self.origin.x, self.origin.y);
        let row_bytes = storage.row_bytes;
        Some((&mut storage.bytes[start..], row_bytes))
    }
}

fn validate_info(info: &ImageInfo) -> Result<(), PixelError> {
    if info.color_type() == ColorType::Unknown {
        return Err(PixelError::UnknownColorType);
    }
    if info.dimensions().is_empty() {
        return Err(PixelError::EmptyDimensions {
            width: info.width(),
            height: info.height(),
        });
    }
    Ok(())
}
