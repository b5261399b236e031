//! Color descriptors attached to every special image.
//!
//! Color spaces are carried as tags only. Nothing in this crate converts
//! between them.

use crate::core::geometry::ISize;
use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Pixel memory layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ColorType {
    /// Unknown or unsupported layout.
    #[default]
    Unknown,
    /// Four bytes per pixel in R, G, B, A order. The pipeline's native type.
    Rgba8888,
    /// Four bytes per pixel in B, G, R, A order.
    Bgra8888,
    /// One byte of luminance per pixel, always opaque.
    Gray8,
    /// One byte of coverage per pixel, no color.
    Alpha8,
}

impl ColorType {
    /// The native 32-bit color type used by filter stages.
    pub const N32: ColorType = ColorType::Rgba8888;

    /// Bytes occupied by one pixel, zero for [`ColorType::Unknown`].
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ColorType::Unknown => 0,
            ColorType::Rgba8888 | ColorType::Bgra8888 => 4,
            ColorType::Gray8 | ColorType::Alpha8 => 1,
        }
    }

    /// True if pixels of this type never carry transparency.
    pub fn is_always_opaque(&self) -> bool {
        matches!(self, ColorType::Gray8)
    }
}

/// How the alpha channel relates to the color channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlphaType {
    #[default]
    Unknown,
    /// Every pixel is fully opaque.
    Opaque,
    /// Color channels are premultiplied by alpha.
    Premul,
    /// Color channels are independent of alpha.
    Unpremul,
}

/// Color space tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSpace {
    Srgb,
    SrgbLinear,
    DisplayP3,
}

impl ColorSpace {
    /// Shared handle to the sRGB color space.
    pub fn srgb() -> Arc<ColorSpace> {
        Arc::new(ColorSpace::Srgb)
    }
}

/// Color type, alpha type and optional color space of an image.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ColorInfo {
    color_type: ColorType,
    alpha_type: AlphaType,
    color_space: Option<Arc<ColorSpace>>,
}

impl ColorInfo {
    /// Create a new color descriptor.
    pub fn new(
        color_type: ColorType,
        alpha_type: AlphaType,
        color_space: Option<Arc<ColorSpace>>,
    ) -> Self {
        Self {
            color_type,
            alpha_type,
            color_space,
        }
    }

    /// Premultiplied N32 without a color space.
    pub fn n32_premul() -> Self {
        Self::new(ColorType::N32, AlphaType::Premul, None)
    }

    pub fn color_type(&self) -> ColorType {
        self.color_type
    }

    pub fn alpha_type(&self) -> AlphaType {
        self.alpha_type
    }

    /// Borrow the color space, if any.
    pub fn color_space(&self) -> Option<&ColorSpace> {
        self.color_space.as_deref()
    }

    /// Shared handle to the color space, if any.
    pub fn ref_color_space(&self) -> Option<Arc<ColorSpace>> {
        self.color_space.clone()
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.color_type.bytes_per_pixel()
    }

    /// Same descriptor with a different color type.
    ///
    /// Gray sources become opaque since they carry no alpha.
    pub fn make_color_type(&self, color_type: ColorType) -> Self {
        let alpha_type = if self.color_type.is_always_opaque() {
            AlphaType::Opaque
        } else {
            self.alpha_type
        };
        Self::new(color_type, alpha_type, self.color_space.clone())
    }
}

/// Dimensions plus color descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageInfo {
    dimensions: ISize,
    color_info: ColorInfo,
}

impl ImageInfo {
    /// Create a new image info.
    pub fn new(dimensions: ISize, color_info: ColorInfo) -> Self {
        Self {
            dimensions,
            color_info,
        }
    }

    /// Premultiplied N32 info of the given size.
    pub fn n32_premul(width: i32, height: i32) -> Self {
        Self::new(ISize::new(width, height), ColorInfo::n32_premul())
    }

    pub fn width(&self) -> i32 {
        self.dimensions.width
    }

    pub fn height(&self) -> i32 {
        self.dimensions.height
    }

    pub fn dimensions(&self) -> ISize {
        self.dimensions
    }

    pub fn color_info(&self) -> &ColorInfo {
        &self.color_info
    }

    pub fn color_type(&self) -> ColorType {
        self.color_info.color_type()
    }

    pub fn alpha_type(&self) -> AlphaType {
        self.color_info.alpha_type()
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.color_info.bytes_per_pixel()
    }

    /// True if there are no pixels or the layout is unknown.
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty() || self.color_type() == ColorType::Unknown
    }

    /// Tightly packed row stride in bytes.
    pub fn min_row_bytes(&self) -> usize {
        self.dimensions.width.max(0) as usize * self.bytes_per_pixel()
    }

    /// Bytes needed to hold all rows at `row_bytes`, the last row tightly packed.
    pub fn compute_byte_size(&self, row_bytes: usize) -> usize {
        if self.dimensions.is_empty() {
            return 0;
        }
        (self.dimensions.height as usize - 1) * row_bytes + self.min_row_bytes()
    }

    /// Same info with new dimensions.
    pub fn make_dimensions(&self, dimensions: ISize) -> Self {
        Self::new(dimensions, self.color_info.clone())
    }

    /// Same info with a different color type.
    pub fn make_color_type(&self, color_type: ColorType) -> Self {
        Self::new(self.dimensions, self.color_info.make_color_type(color_type))
    }
}

/// An 8-bit RGBA color.
///
/// Channels are stored as found in the pixels; no premultiplication or
/// color-space conversion is applied when reading.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Pod, Zeroable, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
    /// Opaque black.
    pub const BLACK: Color = Color::new(0, 0, 0, 255);
    /// Opaque white.
    pub const WHITE: Color = Color::new(255, 255, 255, 255);

    /// Create a new color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels in R, G, B, A order.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Build from channels in R, G, B, A order.
    pub fn from_array(c: [u8; 4]) -> Self {
        Self::new(c[0], c[1], c[2], c[3])
    }

    /// Scale every channel by `alpha` in [0, 255].
    pub fn scale_alpha(self, alpha: u8) -> Self {
        if alpha == 255 {
            return self;
        }
        let s = |c: u8| ((c as u32 * alpha as u32 + 127) / 255) as u8;
        Self::new(s(self.r), s(self.g), s(self.b), s(self.a))
    }

    /// Multiply the color channels by alpha.
    pub fn premultiply(self) -> Self {
        let a = self.a;
        Self::new(self.r, self.g, self.b, 255).scale_alpha(a).with_alpha(a)
    }

    /// Divide the color channels by alpha. Transparent colors become
    /// [`Color::TRANSPARENT`].
    pub fn unpremultiply(self) -> Self {
        match self.a {
            0 => Color::TRANSPARENT,
            255 => self,
            a => {
                let d = |c: u8| ((c as u32 * 255 + a as u32 / 2) / a as u32).min(255) as u8;
                Self::new(d(self.r), d(self.g), d(self.b), a)
            }
        }
    }

    fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Premultiplied source-over: `self` drawn on top of `dst`.
    pub fn src_over(self, dst: Color) -> Color {
        let inv = 255 - self.a as u32;
        let blend = |s: u8, d: u8| (s as u32 + (d as u32 * inv + 127) / 255).min(255) as u8;
        Color::new(
            blend(self.r, dst.r),
            blend(self.g, dst.g),
            blend(self.b, dst.b),
            blend(self.a, dst.a),
        )
    }

    /// Decode one pixel stored as `color_type`.
    pub fn from_pixel(color_type: ColorType, px: &[u8]) -> Color {
        match color_type {
            ColorType::Rgba8888 => bytemuck::pod_read_unaligned(&px[..4]),
            ColorType::Bgra8888 => Color::new(px[2], px[1], px[0], px[3]),
            ColorType::Gray8 => Color::new(px[0], px[0], px[0], 255),
            ColorType::Alpha8 => Color::new(0, 0, 0, px[0]),
            ColorType::Unknown => Color::TRANSPARENT,
        }
    }

    /// Encode into one pixel stored as `color_type`.
    pub fn write_pixel(self, color_type: ColorType, px: &mut [u8]) {
        match color_type {
            ColorType::Rgba8888 => px[..4].copy_from_slice(bytemuck::bytes_of(&self)),
            ColorType::Bgra8888 => px[..4].copy_from_slice(&[self.b, self.g, self.r, self.a]),
            ColorType::Gray8 => {
                let luma = (self.r as u32 * 54 + self.g as u32 * 183 + self.b as u32 * 19) >> 8;
                px[0] = luma as u8;
            }
            ColorType::Alpha8 => px[0] = self.a,
            ColorType::Unknown => {}
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_per_pixel() {
        assert_eq!(ColorType::Rgba8888.bytes_per_pixel(), 4);
        assert_eq!(ColorType::Alpha8.bytes_per_pixel(), 1);
        assert_eq!(ColorType::Unknown.bytes_per_pixel(), 0);
    }

    #[test]
    fn test_compute_byte_size() {
        let info = ImageInfo::n32_premul(10, 3);
        assert_eq!(info.min_row_bytes(), 40);
        assert_eq!(info.compute_byte_size(48), 48 * 2 + 40);
        assert_eq!(ImageInfo::n32_premul(0, 3).compute_byte_size(48), 0);
    }

    #[test]
    fn test_pixel_round_trip_bgra() {
        let c = Color::new(1, 2, 3, 4);
        let mut px = [0u8; 4];
        c.write_pixel(ColorType::Bgra8888, &mut px);
        assert_eq!(px, [3, 2, 1, 4]);
        assert_eq!(Color::from_pixel(ColorType::Bgra8888, &px), c);
    }

    #[test]
    fn test_src_over() {
        let opaque = Color::new(10, 20, 30, 255);
        assert_eq!(opaque.src_over(Color::WHITE), opaque);
        assert_eq!(Color::TRANSPARENT.src_over(opaque), opaque);
    }

    #[test]
    fn test_premultiply() {
        let c = Color::new(200, 100, 255, 128);
        let premul = c.premultiply();
        assert_eq!(premul, Color::new(100, 50, 128, 128));
        assert_eq!(premul.unpremultiply(), Color::new(199, 100, 255, 128));
        assert_eq!(Color::new(9, 9, 9, 0).premultiply(), Color::TRANSPARENT);
        assert_eq!(Color::new(9, 9, 9, 0).unpremultiply(), Color::TRANSPARENT);
        assert_eq!(Color::WHITE.premultiply(), Color::WHITE);
        assert_eq!(Color::new(255, 255, 255, 3).unpremultiply(), Color::new(255, 255, 255, 3));
    }

    #[test]
    fn test_gray_becomes_opaque_on_conversion() {
        let info = ColorInfo::new(ColorType::Gray8, AlphaType::Unknown, None);
        let converted = info.make_color_type(ColorType::N32);
        assert_eq!(converted.color_type(), ColorType::Rgba8888);
        assert_eq!(converted.alpha_type(), AlphaType::Opaque);
    }
}
