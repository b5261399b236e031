//! Gaussian blur on the CPU view of the input.

use crate::core::bitmap::Bitmap;
use crate::core::error::{FilterError, SpecialImageError};
use crate::filters::stage::{finish_hash, stage_error, FilterContext, FilterStage};
use crate::special::{as_bitmap, make_from_raster, SpecialImageRef};

/// Applies a Gaussian blur with standard deviation `sigma`.
///
/// GPU inputs are read back first, so their textures need `COPY_SRC`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurStage {
    pub sigma: f32,
}

impl BlurStage {
    pub fn new(sigma: f32) -> Self {
        Self { sigma }
    }
}

impl FilterStage for BlurStage {
    fn name(&self) -> &str {
        "blur"
    }

    fn cache_key_hash(&self) -> u64 {
        finish_hash(self.name(), &self.sigma.to_bits())
    }

    fn apply(
        &self,
        ctx: &FilterContext,
        input: &SpecialImageRef,
    ) -> Result<SpecialImageRef, FilterError> {
        if !(self.sigma > 0.0 && self.sigma.is_finite()) {
            return Err(FilterError::InvalidParameter {
                stage: self.name().to_string(),
                parameter: "sigma".to_string(),
                reason: format!("{} must be positive", self.sigma),
            });
        }

        let pixels = as_bitmap(input.as_ref()).map_err(stage_error(self.name()))?;
        let alpha_type = pixels.info().alpha_type();
        let blurred = imageproc::filter::gaussian_blur_f32(&pixels.to_rgba8(), self.sigma);

        let output = Bitmap::from_rgba8(blurred, alpha_type)
            .map_err(SpecialImageError::from)
            .map_err(stage_error(self.name()))?;
        log::debug!("Blurred image {} with sigma {}", input.unique_id(), self.sigma);
        make_from_raster(&output.bounds(), &output, &ctx.props).map_err(stage_error(self.name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::color::{Color, ImageInfo};
    use crate::core::geometry::{IRect, ISize};
    use crate::core::gpu::{ContextKind, RecordingContext};
    use crate::core::props::SurfaceProps;
    use crate::special::make_from_texture;

    #[test]
    fn test_blur_spreads_a_point() {
        let mut bm = Bitmap::try_alloc(ImageInfo::n32_premul(9, 9)).unwrap();
        bm.erase(Color::BLACK);
        bm.set_color(4, 4, Color::WHITE);
        let input = make_from_raster(&bm.bounds(), &bm, &SurfaceProps::default()).unwrap();

        let out = BlurStage::new(1.5).apply(&FilterContext::default(), &input).unwrap();
        assert_eq!(out.dimensions(), ISize::new(9, 9));
        let pixels = as_bitmap(out.as_ref()).unwrap();
        let center = pixels.get_color(4, 4).unwrap();
        let neighbor = pixels.get_color(5, 4).unwrap();
        assert!(center.r < 255);
        assert!(neighbor.r > 0);
        assert!(center.r >= neighbor.r);
    }

    #[test]
    fn test_blur_only_sees_subset() {
        let mut bm = Bitmap::try_alloc(ImageInfo::n32_premul(8, 8)).unwrap();
        bm.erase(Color::WHITE);
        for y in 2..6 {
            for x in 2..6 {
                bm.set_color(x, y, Color::BLACK);
            }
        }
        let subset = IRect::from_xywh(2, 2, 4, 4);
        let input = make_from_raster(&subset, &bm, &SurfaceProps::default()).unwrap();

        let out = BlurStage::new(2.0).apply(&FilterContext::default(), &input).unwrap();
        assert_eq!(out.dimensions(), ISize::new(4, 4));
        let pixels = as_bitmap(out.as_ref()).unwrap();
        assert_eq!(pixels.get_color(0, 0).map(|c| c.r), Some(0));
    }

    #[test]
    fn test_blur_rejects_bad_sigma() {
        let bm = Bitmap::try_alloc(ImageInfo::n32_premul(2, 2)).unwrap();
        let input = make_from_raster(&bm.bounds(), &bm, &SurfaceProps::default()).unwrap();
        for sigma in [0.0, -1.0, f32::NAN] {
            assert!(matches!(
                BlurStage::new(sigma).apply(&FilterContext::default(), &input),
                Err(FilterError::InvalidParameter { .. })
            ));
        }
    }

    #[test]
    fn test_blur_of_unreadable_texture_fails() {
        let ctx = RecordingContext::new(ContextKind::Immediate);
        let texture = ctx
            .create_texture(
                ISize::new(4, 4),
                wgpu::TextureFormat::Rgba8Unorm,
                wgpu::TextureUsages::TEXTURE_BINDING,
            )
            .unwrap();
        let input = make_from_texture(
            &ctx,
            &IRect::from_wh(4, 4),
            texture,
            crate::core::color::ColorInfo::n32_premul(),
            &SurfaceProps::default(),
        )
        .unwrap();
        let result = BlurStage::new(1.0).apply(&FilterContext::default(), &input);
        assert!(matches!(
            result,
            Err(FilterError::Stage { source: SpecialImageError::Unreadable { .. }, .. })
        ));
    }
}
