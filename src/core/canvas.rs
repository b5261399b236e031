//! Raster draw target.
//!
//! Only what special images need: shader-filled rectangles and image
//! rectangles with a strict or fast source constraint. Rows are shaded in
//! parallel with rayon.

use crate::core::bitmap::Bitmap;
use crate::core::color::{Color, ColorType};
use crate::core::error::PixelError;
use crate::core::geometry::{IRect, Matrix, Rect};
use crate::core::image::Image;
use crate::core::props::SurfaceProps;
use crate::core::shader::{ImageShader, SamplingOptions, Shader, ShaderRef, TileMode};
use rayon::prelude::*;
use std::sync::Arc;

/// How source and destination colors combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Replace the destination.
    Src,
    /// Premultiplied source-over.
    #[default]
    SrcOver,
}

/// Drawing parameters.
#[derive(Debug, Clone)]
pub struct Paint {
    /// Solid color used when there is no shader.
    pub color: Color,
    /// Extra opacity applied to the source.
    pub alpha: u8,
    pub blend_mode: BlendMode,
    /// Paint source; overrides `color`.
    pub shader: Option<ShaderRef>,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            alpha: 255,
            blend_mode: BlendMode::SrcOver,
            shader: None,
        }
    }
}

impl Paint {
    /// Paint filling with `shader`.
    pub fn with_shader(shader: ShaderRef) -> Self {
        Self {
            shader: Some(shader),
            ..Self::default()
        }
    }

    /// Builder-style blend mode setter.
    pub fn blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Builder-style opacity setter.
    pub fn alpha(mut self, alpha: u8) -> Self {
        self.alpha = alpha;
        self
    }
}

/// Whether image sampling may read outside the source rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SrcRectConstraint {
    /// Sampling is confined to the source rectangle.
    #[default]
    Strict,
    /// Sampling may read texels beyond the source rectangle.
    Fast,
}

/// A canvas drawing into an N32 or BGRA bitmap.
#[derive(Debug)]
pub struct Canvas {
    bitmap: Bitmap,
    matrix: Matrix,
    props: SurfaceProps,
}

impl Canvas {
    /// Create a canvas over `bitmap`.
    ///
    /// Writes never affect other holders of the same pixels.
    pub fn new(bitmap: Bitmap, props: SurfaceProps) -> Result<Self, PixelError> {
        match bitmap.color_type() {
            ColorType::Rgba8888 | ColorType::Bgra8888 => {}
            _ => return Err(PixelError::UnknownColorType),
        }
        if bitmap.draws_nothing() {
            return Err(PixelError::EmptyDimensions {
                width: bitmap.width(),
                height: bitmap.height(),
            });
        }
        Ok(Self {
            bitmap,
            matrix: Matrix::IDENTITY,
            props,
        })
    }

    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    pub fn into_bitmap(self) -> Bitmap {
        self.bitmap
    }

    pub fn props(&self) -> &SurfaceProps {
        &self.props
    }

    pub fn width(&self) -> i32 {
        self.bitmap.width()
    }

    pub fn height(&self) -> i32 {
        self.bitmap.height()
    }

    /// Current transform from local to device coordinates.
    pub fn total_matrix(&self) -> &Matrix {
        &self.matrix
    }

    /// Pre-translate the current transform.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.matrix = self.matrix.concat(&Matrix::translate(dx, dy));
    }

    /// Pre-scale the current transform.
    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.matrix = self.matrix.concat(&Matrix::scale(sx, sy));
    }

    /// Pre-concatenate `matrix` onto the current transform.
    pub fn concat(&mut self, matrix: &Matrix) {
        self.matrix = self.matrix.concat(matrix);
    }

    pub fn reset_matrix(&mut self) {
        self.matrix = Matrix::IDENTITY;
    }

    /// Color of a device pixel.
    pub fn read_pixel(&self, x: i32, y: i32) -> Option<Color> {
        self.bitmap.get_color(x, y)
    }

    /// Fill every pixel with `color`, ignoring the transform.
    pub fn clear(&mut self, color: Color) {
        self.bitmap.erase(color);
    }

    /// Fill `rect` (local coordinates) with the paint's shader or color.
    pub fn draw_rect(&mut self, rect: &Rect, paint: &Paint) {
        match paint.shader.clone() {
            Some(shader) => self.fill(rect, shader.as_ref(), paint),
            None => self.fill(rect, &SolidColor(paint.color), paint),
        }
    }

    /// Draw the whole image with its top-left at (x, y).
    pub fn draw_image(
        &mut self,
        image: &Arc<Image>,
        x: f32,
        y: f32,
        sampling: SamplingOptions,
        paint: Option<&Paint>,
    ) {
        let dst = Rect::from_xywh(x, y, image.width() as f32, image.height() as f32);
        let src = image.bounds();
        self.draw_image_rect(image, &src, &dst, sampling, paint, SrcRectConstraint::Fast);
    }

    /// Draw the `src` region of `image` scaled into `dst`.
    ///
    /// With [`SrcRectConstraint::Strict`] no texel outside `src` is read,
    /// regardless of filtering or scale. Out-of-range `src` rectangles are
    /// ignored.
    pub fn draw_image_rect(
        &mut self,
        image: &Arc<Image>,
        src: &IRect,
        dst: &Rect,
        sampling: SamplingOptions,
        paint: Option<&Paint>,
        constraint: SrcRectConstraint,
    ) {
        if !image.bounds().contains(src) {
            log::warn!("Ignoring draw of {} outside image bounds {}", src, image.bounds());
            return;
        }
        let Some(src_to_dst) = Matrix::rect_to_rect(&src.to_rect(), dst) else {
            return;
        };
        log::trace!(
            "draw_image_rect image={} src={} dst={:?} {:?}",
            image.unique_id(),
            src,
            dst,
            constraint
        );

        let device = self.matrix.concat(&src_to_dst);
        let shader = match constraint {
            SrcRectConstraint::Strict => ImageShader::make_subset(
                Arc::clone(image),
                *src,
                TileMode::Clamp,
                TileMode::Clamp,
                sampling,
                &device,
            ),
            SrcRectConstraint::Fast => ImageShader::make(
                Arc::clone(image),
                TileMode::Clamp,
                TileMode::Clamp,
                sampling,
                &device,
            ),
        };
        let Some(shader) = shader else { return };

        let default_paint = Paint::default();
        let paint = paint.unwrap_or(&default_paint);
        self.fill(dst, shader.as_ref(), paint)
    }

    fn fill(&mut self, rect: &Rect, shader: &dyn Shader, paint: &Paint) {
        let Some(inverse) = self.matrix.invert() else {
            return;
        };
        let Some(area) = self.matrix.map_rect(rect).round().intersect(&self.bitmap.bounds()) else {
            return;
        };

        let color_type = self.bitmap.color_type();
        let bpp = color_type.bytes_per_pixel();
        let blend_mode = paint.blend_mode;
        let alpha = paint.alpha;
        let Some((bytes, row_bytes)) = self.bitmap.view_bytes_mut() else {
            return;
        };

        bytes
            .par_chunks_mut(row_bytes)
            .enumerate()
            .skip(area.top as usize)
            .take(area.height() as usize)
            .for_each(|(y, row)| {
                let cy = y as f32 + 0.5;
                for x in area.left..area.right {
                    let cx = x as f32 + 0.5;
                    let (lx, ly) = inverse.map_point(cx, cy);
                    if lx < rect.left || lx >= rect.right || ly < rect.top || ly >= rect.bottom {
                        continue;
                    }
                    let px = &mut row[x as usize * bpp..(x as usize + 1) * bpp];
                    let src = shader.sample(cx, cy).scale_alpha(alpha);
                    let out = match blend_mode {
                        BlendMode::Src => src,
                        BlendMode::SrcOver => src.src_over(Color::from_pixel(color_type, px)),
                    };
                    out.write_pixel(color_type, px);
                }
            });
    }
}

/// Constant-color paint source.
#[derive(Debug)]
struct SolidColor(Color);

impl Shader for SolidColor {
    fn sample(&self, _x: f32, _y: f32) -> Color {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::color::ImageInfo;

    fn canvas(width: i32, height: i32) -> Canvas {
        let bitmap = Bitmap::try_alloc(ImageInfo::n32_premul(width, height)).unwrap();
        Canvas::new(bitmap, SurfaceProps::default()).unwrap()
    }

    fn quadrants() -> Arc<Image> {
        let mut bm = Bitmap::try_alloc(ImageInfo::n32_premul(4, 4)).unwrap();
        for y in 0..4 {
            for x in 0..4 {
                let c = match (x < 2, y < 2) {
                    (true, true) => Color::new(255, 0, 0, 255),
                    (false, true) => Color::new(0, 255, 0, 255),
                    (true, false) => Color::new(0, 0, 255, 255),
                    (false, false) => Color::WHITE,
                };
                bm.set_color(x, y, c);
            }
        }
        Image::from_bitmap(bm).unwrap()
    }

    #[test]
    fn test_canvas_rejects_gray() {
        use crate::core::color::{AlphaType, ColorInfo};
        use crate::core::geometry::ISize;
        let gray = ColorInfo::new(ColorType::Gray8, AlphaType::Opaque, None);
        let info = ImageInfo::new(ISize::new(2, 2), gray);
        let bitmap = Bitmap::try_alloc(info).unwrap();
        assert!(Canvas::new(bitmap, SurfaceProps::default()).is_err());
    }

    #[test]
    fn test_draw_rect_solid() {
        let mut c = canvas(4, 4);
        let paint = Paint {
            color: Color::new(1, 2, 3, 255),
            ..Paint::default()
        };
        c.draw_rect(&Rect::from_xywh(1.0, 1.0, 2.0, 2.0), &paint);
        assert_eq!(c.read_pixel(1, 1), Some(Color::new(1, 2, 3, 255)));
        assert_eq!(c.read_pixel(2, 2), Some(Color::new(1, 2, 3, 255)));
        assert_eq!(c.read_pixel(0, 0), Some(Color::TRANSPARENT));
        assert_eq!(c.read_pixel(3, 3), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_draw_image_at_offset() {
        let mut c = canvas(8, 8);
        c.draw_image(&quadrants(), 2.0, 3.0, SamplingOptions::NEAREST, None);
        assert_eq!(c.read_pixel(2, 3), Some(Color::new(255, 0, 0, 255)));
        assert_eq!(c.read_pixel(5, 6), Some(Color::WHITE));
        assert_eq!(c.read_pixel(1, 3), Some(Color::TRANSPARENT));
        assert_eq!(c.read_pixel(6, 3), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_draw_image_rect_scales() {
        let mut c = canvas(8, 8);
        let image = quadrants();
        c.draw_image_rect(
            &image,
            &IRect::from_xywh(2, 0, 2, 2),
            &Rect::from_xywh(0.0, 0.0, 8.0, 8.0),
            SamplingOptions::NEAREST,
            None,
            SrcRectConstraint::Strict,
        );
        for y in 0..8 {
            for x in 0..8 {
                assert_eq!(c.read_pixel(x, y), Some(Color::new(0, 255, 0, 255)));
            }
        }
    }

    #[test]
    fn test_canvas_matrix_applies() {
        let mut c = canvas(8, 8);
        c.translate(4.0, 4.0);
        c.draw_image(&quadrants(), 0.0, 0.0, SamplingOptions::NEAREST, None);
        assert_eq!(c.read_pixel(4, 4), Some(Color::new(255, 0, 0, 255)));
        assert_eq!(c.read_pixel(3, 3), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_paint_alpha_and_blend() {
        let mut c = canvas(1, 1);
        c.clear(Color::WHITE);
        let paint = Paint {
            color: Color::BLACK,
            ..Paint::default()
        }
        .alpha(0)
        .blend_mode(BlendMode::SrcOver);
        c.draw_rect(&Rect::from_xywh(0.0, 0.0, 1.0, 1.0), &paint);
        assert_eq!(c.read_pixel(0, 0), Some(Color::WHITE));

        let replace = Paint::default().alpha(0).blend_mode(BlendMode::Src);
        c.draw_rect(&Rect::from_xywh(0.0, 0.0, 1.0, 1.0), &replace);
        assert_eq!(c.read_pixel(0, 0), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_canvas_writes_do_not_leak_to_shared_bitmap() {
        let bitmap = Bitmap::try_alloc(ImageInfo::n32_premul(2, 2)).unwrap();
        let mut c = Canvas::new(bitmap.clone(), SurfaceProps::default()).unwrap();
        c.clear(Color::WHITE);
        assert_eq!(bitmap.get_color(0, 0), Some(Color::TRANSPARENT));
        assert_eq!(c.read_pixel(0, 0), Some(Color::WHITE));
    }
}
