//! Offset: translate the input's content within its own bounds.

use crate::core::error::FilterError;
use crate::filters::stage::{finish_hash, stage_error, FilterContext, FilterStage};
use crate::special::SpecialImageRef;

/// Draws the input shifted by (dx, dy) into a surface of the input's size.
/// Uncovered pixels are transparent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetStage {
    pub dx: f32,
    pub dy: f32,
}

impl OffsetStage {
    pub fn new(dx: f32, dy: f32) -> Self {
        Self { dx, dy }
    }
}

impl FilterStage for OffsetStage {
    fn name(&self) -> &str {
        "offset"
    }

    fn cache_key_hash(&self) -> u64 {
        finish_hash(self.name(), &(self.dx.to_bits(), self.dy.to_bits()))
    }

    fn apply(
        &self,
        ctx: &FilterContext,
        input: &SpecialImageRef,
    ) -> Result<SpecialImageRef, FilterError> {
        if !self.dx.is_finite() || !self.dy.is_finite() {
            return Err(FilterError::InvalidParameter {
                stage: self.name().to_string(),
                parameter: "offset".to_string(),
                reason: format!("({}, {}) is not finite", self.dx, self.dy),
            });
        }
        let mut surface = ctx
            .make_surface(input.as_ref(), input.dimensions())
            .map_err(stage_error(self.name()))?;
        input.draw(surface.canvas(), self.dx, self.dy, ctx.sampling, None, true);
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
    use crate::core::shader::SamplingOptions;
    use crate::special::{as_bitmap, make_from_raster};

    #[test]
    fn test_offset_moves_content() {
        let mut bm = Bitmap::try_alloc(ImageInfo::n32_premul(8, 8)).unwrap();
        bm.erase(Color::new(255, 0, 0, 255));
        bm.set_color(3, 3, Color::WHITE);
        let subset = IRect::from_xywh(2, 2, 4, 4);
        let input = make_from_raster(&subset, &bm, &SurfaceProps::default()).unwrap();

        let out = OffsetStage::new(1.0, 2.0).apply(&FilterContext::default(), &input).unwrap();
        assert_eq!(out.dimensions(), input.dimensions());
        let pixels = as_bitmap(out.as_ref()).unwrap();
        assert_eq!(pixels.get_color(2, 3), Some(Color::WHITE));
        assert_eq!(pixels.get_color(0, 0), Some(Color::TRANSPARENT));
        assert_eq!(pixels.get_color(3, 1), Some(Color::TRANSPARENT));
    }

    #[test]
    fn test_linear_offset_stays_inside_subset() {
        // Subset is green; everything around it is red.
        let mut bm = Bitmap::try_alloc(ImageInfo::n32_premul(8, 8)).unwrap();
        bm.erase(Color::new(255, 0, 0, 255));
        for y in 2..6 {
            for x in 2..6 {
                bm.set_color(x, y, Color::new(0, 255, 0, 255));
            }
        }
        let subset = IRect::from_xywh(2, 2, 4, 4);
        let input = make_from_raster(&subset, &bm, &SurfaceProps::default()).unwrap();
        let ctx = FilterContext::default().with_sampling(SamplingOptions::LINEAR);

        let out = OffsetStage::new(0.5, 0.5).apply(&ctx, &input).unwrap();
        let pixels = as_bitmap(out.as_ref()).unwrap();
        for y in 1..4 {
            for x in 1..4 {
                assert_eq!(pixels.get_color(x, y).map(|c| c.r), Some(0), "red at ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_non_finite_offset_is_rejected() {
        let bm = Bitmap::try_alloc(ImageInfo::n32_premul(2, 2)).unwrap();
        let input = make_from_raster(&bm.bounds(), &bm, &SurfaceProps::default()).unwrap();
        let result = OffsetStage::new(f32::NAN, 0.0).apply(&FilterContext::default(), &input);
        assert!(matches!(result, Err(FilterError::InvalidParameter { .. })));
    }
}
