//! Tile: fill a new surface by repeating the input through a strict shader.

use crate::core::canvas::{BlendMode, Paint};
use crate::core::error::FilterError;
use crate::core::geometry::{ISize, Matrix, Rect};
use crate::core::shader::TileMode;
use crate::filters::stage::{finish_hash, stage_error, FilterContext, FilterStage};
use crate::special::SpecialImageRef;

/// Renders the input into a `size` surface, resolving coordinates outside
/// the input with `mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileStage {
    pub mode: TileMode,
    pub size: ISize,
}

impl TileStage {
    pub fn new(mode: TileMode, size: ISize) -> Self {
        Self { mode, size }
    }
}

impl FilterStage for TileStage {
    fn name(&self) -> &str {
        "tile"
    }

    fn cache_key_hash(&self) -> u64 {
        finish_hash(self.name(), &(self.mode, self.size))
    }

    fn apply(
        &self,
        ctx: &FilterContext,
        input: &SpecialImageRef,
    ) -> Result<SpecialImageRef, FilterError> {
        if self.size.is_empty() {
            return Err(FilterError::InvalidParameter {
                stage: self.name().to_string(),
                parameter: "size".to_string(),
                reason: format!("{}x{} is empty", self.size.width, self.size.height),
            });
        }

        let shader = input
            .as_shader(self.mode, ctx.sampling, &Matrix::IDENTITY)
            .ok_or_else(|| FilterError::NoOutput {
                stage: self.name().to_string(),
                reason: "input has no shader".to_string(),
            })?;

        let mut surface = ctx
            .make_surface(input.as_ref(), self.size)
            .map_err(stage_error(self.name()))?;
        let paint = Paint::with_shader(shader).blend_mode(BlendMode::Src);
        let area = Rect::from_xywh(0.0, 0.0, self.size.width as f32, self.size.height as f32);
        surface.canvas().draw_rect(&area, &paint);

        log::debug!(
            "Tiled image {} into {}x{} ({:?})",
            input.unique_id(),
            self.size.width,
            self.size.height,
            self.mode
        );
        surface.make_image_snapshot().map_err(stage_error(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bitmap::Bitmap;
    use crate::core::color::{Color, ImageInfo};
    use crate::core::geometry::IRect;
    use crate::core::props::SurfaceProps;
    use crate::special::{as_bitmap, make_from_raster};

    /// 2x2 subset (red, green / blue, white) inside a black 6x6 store.
    fn input() -> SpecialImageRef {
        let mut bm = Bitmap::try_alloc(ImageInfo::n32_premul(6, 6)).unwrap();
        bm.erase(Color::BLACK);
        bm.set_color(2, 2, Color::new(255, 0, 0, 255));
        bm.set_color(3, 2, Color::new(0, 255, 0, 255));
        bm.set_color(2, 3, Color::new(0, 0, 255, 255));
        bm.set_color(3, 3, Color::WHITE);
        make_from_raster(&IRect::from_xywh(2, 2, 2, 2), &bm, &SurfaceProps::default()).unwrap()
    }

    #[test]
    fn test_repeat() {
        let out = TileStage::new(TileMode::Repeat, ISize::new(4, 4))
            .apply(&FilterContext::default(), &input())
            .unwrap();
        let pixels = as_bitmap(out.as_ref()).unwrap();
        assert_eq!(pixels.get_color(2, 0), Some(Color::new(255, 0, 0, 255)));
        assert_eq!(pixels.get_color(3, 3), Some(Color::WHITE));
    }

    #[test]
    fn test_clamp_never_reads_backing() {
        let out = TileStage::new(TileMode::Clamp, ISize::new(5, 5))
            .apply(&FilterContext::default(), &input())
            .unwrap();
        let pixels = as_bitmap(out.as_ref()).unwrap();
        for y in 0..5 {
            for x in 0..5 {
                assert_ne!(pixels.get_color(x, y), Some(Color::BLACK), "leak at ({x}, {y})");
            }
        }
        assert_eq!(pixels.get_color(4, 4), Some(Color::WHITE));
    }

    #[test]
    fn test_decal_is_transparent_outside() {
        let out = TileStage::new(TileMode::Decal, ISize::new(3, 3))
            .apply(&FilterContext::default(), &input())
            .unwrap();
        let pixels = as_bitmap(out.as_ref()).unwrap();
        assert_eq!(pixels.get_color(2, 2), Some(Color::TRANSPARENT));
        assert_eq!(pixels.get_color(1, 1), Some(Color::WHITE));
    }

    #[test]
    fn test_empty_size_is_rejected() {
        let stage = TileStage::new(TileMode::Repeat, ISize::new(0, 3));
        let result = stage.apply(&FilterContext::default(), &input());
        assert!(matches!(result, Err(FilterError::InvalidParameter { .. })));
    }
}
