//! Shaders: functions from device coordinates to colors.
//!
//! [`ImageShader`] samples an [`Image`]. Built with a strict subset it never
//! reads outside that subset, not even for bilinear taps. Built without one
//! it resolves coordinates against the physical storage behind the image,
//! which is faster but can pick up texels adjacent to the image's bounds.

use crate::core::bitmap::Bitmap;
use crate::core::color::Color;
use crate::core::geometry::{IRect, Matrix};
use crate::core::image::Image;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How coordinates outside the sampled domain are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TileMode {
    /// Repeat the edge pixel.
    #[default]
    Clamp,
    /// Wrap around.
    Repeat,
    /// Wrap around, flipping every other copy.
    Mirror,
    /// Transparent outside the domain.
    Decal,
}

impl TileMode {
    /// Map `coord` into `[start, start + len)`, or `None` for decal misses.
    ///
    /// Works in `i64` so that any coordinate a float can floor to is valid.
    pub fn apply(self, coord: i64, start: i32, len: i32) -> Option<i32> {
        if len <= 0 {
            return None;
        }
        let len = i64::from(len);
        let rel = coord.saturating_sub(i64::from(start));
        let tiled = match self {
            TileMode::Clamp => rel.clamp(0, len - 1),
            TileMode::Repeat => rel.rem_euclid(len),
            TileMode::Mirror => {
                let period = rel.rem_euclid(2 * len);
                if period < len {
                    period
                } else {
                    2 * len - 1 - period
                }
            }
            TileMode::Decal => {
                if !(0..len).contains(&rel) {
                    return None;
                }
                rel
            }
        };
        i32::try_from(i64::from(start) + tiled).ok()
    }
}

impl std::str::FromStr for TileMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clamp" => Ok(TileMode::Clamp),
            "repeat" => Ok(TileMode::Repeat),
            "mirror" => Ok(TileMode::Mirror),
            "decal" => Ok(TileMode::Decal),
            other => Err(format!("unknown tile mode '{}'", other)),
        }
    }
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

/// Sampling parameters. There is deliberately no mipmap option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingOptions {
    pub filter: FilterMode,
}

impl SamplingOptions {
    /// Nearest-neighbor sampling.
    pub const NEAREST: SamplingOptions = SamplingOptions {
        filter: FilterMode::Nearest,
    };
    /// Bilinear sampling.
    pub const LINEAR: SamplingOptions = SamplingOptions {
        filter: FilterMode::Linear,
    };

    pub fn new(filter: FilterMode) -> Self {
        Self { filter }
    }
}

/// A paint source evaluated per device pixel.
pub trait Shader: Send + Sync + fmt::Debug {
    /// Color at device-space point (x, y). Canvases pass pixel centers.
    fn sample(&self, x: f32, y: f32) -> Color;

    /// Domain the shader is restricted to, in image coordinates, if strict.
    fn strict_subset(&self) -> Option<IRect> {
        None
    }
}

/// Shared shader handle.
pub type ShaderRef = Arc<dyn Shader>;

/// Resolves image-space coordinates to colors over a fixed texel domain.
#[derive(Debug, Clone)]
pub(crate) struct TexelSampler {
    pub(crate) texels: Bitmap,
    pub(crate) domain: IRect,
    pub(crate) tile_x: TileMode,
    pub(crate) tile_y: TileMode,
    pub(crate) filter: FilterMode,
}

impl TexelSampler {
    fn fetch(&self, x: i64, y: i64) -> Color {
        let tx = self.tile_x.apply(x, self.domain.left, self.domain.width());
        let ty = self.tile_y.apply(y, self.domain.top, self.domain.height());
        match (tx, ty) {
            (Some(tx), Some(ty)) => self
                .texels
                .get_storage_color(tx, ty)
                .unwrap_or(Color::TRANSPARENT),
            _ => Color::TRANSPARENT,
        }
    }

    /// Sample at image-space point (u, v).
    pub(crate) fn sample(&self, u: f32, v: f32) -> Color {
        match self.filter {
            FilterMode::Nearest => self.fetch(u.floor() as i64, v.floor() as i64),
            FilterMode::Linear => {
                let fu = u - 0.5;
                let fv = v - 0.5;
                let x0 = fu.floor();
                let y0 = fv.floor();
                let ax = fu - x0;
                let ay = fv - y0;
                let (x0, y0) = (x0 as i64, y0 as i64);
                let (x1, y1) = (x0.saturating_add(1), y0.saturating_add(1));

                let c00 = self.fetch(x0, y0).to_array();
                let c10 = self.fetch(x1, y0).to_array();
                let c01 = self.fetch(x0, y1).to_array();
                let c11 = self.fetch(x1, y1).to_array();

                let mut out = [0u8; 4];
                for i in 0..4 {
                    let top = c00[i] as f32 * (1.0 - ax) + c10[i] as f32 * ax;
                    let bottom = c01[i] as f32 * (1.0 - ax) + c11[i] as f32 * ax;
                    out[i] = (top * (1.0 - ay) + bottom * ay + 0.5).clamp(0.0, 255.0) as u8;
                }
                Color::from_array(out)
            }
        }
    }
}

/// Shader sampling an image through a local matrix.
pub struct ImageShader {
    image: Arc<Image>,
    sampler: TexelSampler,
    local_matrix: Matrix,
    inverse: Matrix,
    strict: bool,
}

impl ImageShader {
    /// Non-strict shader over the whole image.
    ///
    /// Tiling is resolved against the storage the image refers into, so
    /// samples near the image's edges may read neighboring texels. Returns
    /// `None` if the local matrix is not invertible.
    pub fn make(
        image: Arc<Image>,
        tile_x: TileMode,
        tile_y: TileMode,
        sampling: SamplingOptions,
        local_matrix: &Matrix,
    ) -> Option<ShaderRef> {
        let texels = image.texels();
        let domain = texels.storage_bounds();
        Self::build(image, texels, domain, tile_x, tile_y, sampling, local_matrix, false)
    }

    /// Strict shader restricted to `subset` of the image.
    ///
    /// Every tap, including bilinear neighbors, is tiled into `subset`
    /// before reading. Returns `None` if `subset` is not inside the image or
    /// the local matrix is not invertible.
    pub fn make_subset(
        image: Arc<Image>,
        subset: IRect,
        tile_x: TileMode,
        tile_y: TileMode,
        sampling: SamplingOptions,
        local_matrix: &Matrix,
    ) -> Option<ShaderRef> {
        if !image.bounds().contains(&subset) {
            return None;
        }
        let texels = image.texels();
        Self::build(image, texels, subset, tile_x, tile_y, sampling, local_matrix, true)
    }

    #[allow(clippy::too_many_arguments)]
    fn build(
        image: Arc<Image>,
        texels: Bitmap,
        domain: IRect,
        tile_x: TileMode,
        tile_y: TileMode,
        sampling: SamplingOptions,
        local_matrix: &Matrix,
        strict: bool,
    ) -> Option<ShaderRef> {
        let inverse = local_matrix.invert()?;
        Some(Arc::new(ImageShader {
            image,
            sampler: TexelSampler {
                texels,
                domain,
                tile_x,
                tile_y,
                filter: sampling.filter,
            },
            local_matrix: *local_matrix,
            inverse,
            strict,
        }))
    }

    /// The sampled image.
    pub fn image(&self) -> &Arc<Image> {
        &self.image
    }

    pub fn local_matrix(&self) -> &Matrix {
        &self.local_matrix
    }
}

impl fmt::Debug for ImageShader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageShader")
            .field("image", &self.image.unique_id())
            .field("domain", &self.sampler.domain)
            .field("tile", &(self.sampler.tile_x, self.sampler.tile_y))
            .field("filter", &self.sampler.filter)
            .field("strict", &self.strict)
            .finish()
    }
}

impl Shader for ImageShader {
    fn sample(&self, x: f32, y: f32) -> Color {
        let (u, v) = self.inverse.map_point(x, y);
        self.sampler.sample(u, v)
    }

    fn strict_subset(&self) -> Option<IRect> {
        self.strict.then_some(self.sampler.domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::color::ImageInfo;

    /// 4x4 image inside a 6x6 storage whose border ring is red.
    fn bordered() -> Arc<Image> {
        let mut bm = Bitmap::try_alloc(ImageInfo::n32_premul(6, 6)).unwrap();
        bm.erase(Color::new(255, 0, 0, 255));
        for y in 1..5 {
            for x in 1..5 {
                bm.set_color(x, y, Color::new(0, (x * 40) as u8, (y * 40) as u8, 255));
            }
        }
        let view = bm.extract_subset(&IRect::from_xywh(1, 1, 4, 4)).unwrap();
        Image::from_bitmap(view).unwrap()
    }

    #[test]
    fn test_tile_modes() {
        assert_eq!(TileMode::Clamp.apply(-3, 0, 4), Some(0));
        assert_eq!(TileMode::Clamp.apply(9, 0, 4), Some(3));
        assert_eq!(TileMode::Repeat.apply(-1, 0, 4), Some(3));
        assert_eq!(TileMode::Repeat.apply(5, 2, 4), Some(5));
        assert_eq!(TileMode::Mirror.apply(4, 0, 4), Some(3));
        assert_eq!(TileMode::Mirror.apply(-1, 0, 4), Some(0));
        assert_eq!(TileMode::Decal.apply(4, 0, 4), None);
        assert_eq!(TileMode::Decal.apply(3, 0, 4), Some(3));
    }

    #[test]
    fn test_tile_modes_far_from_domain() {
        assert_eq!(TileMode::Clamp.apply(i64::MAX, -3, 4), Some(0));
        assert_eq!(TileMode::Clamp.apply(i64::MIN, -3, 4), Some(-3));
        assert_eq!(TileMode::Repeat.apply(10_000_000_001, 0, 4), Some(1));
        assert_eq!(TileMode::Mirror.apply(-10_000_000_001, 0, 4), Some(0));
        assert_eq!(TileMode::Decal.apply(i64::MAX, 0, 4), None);
    }

    #[test]
    fn test_far_samples_stay_total() {
        let image = bordered();
        let far = [1.0e10f32, -1.0e10, 3.0e9, f32::MAX, f32::INFINITY, f32::NAN];
        for tile in [TileMode::Clamp, TileMode::Repeat, TileMode::Mirror, TileMode::Decal] {
            for sampling in [SamplingOptions::NEAREST, SamplingOptions::LINEAR] {
                let strict = ImageShader::make_subset(
                    image.clone(),
                    image.bounds(),
                    tile,
                    tile,
                    sampling,
                    &Matrix::IDENTITY,
                )
                .unwrap();
                let fast =
                    ImageShader::make(image.clone(), tile, tile, sampling, &Matrix::IDENTITY)
                        .unwrap();
                for &x in &far {
                    let c = strict.sample(x, 0.5);
                    assert_ne!(c.r, 255, "border leaked for {:?} at {}", tile, x);
                    fast.sample(x, 0.5);
                    fast.sample(0.5, x);
                }
            }
        }
    }

    #[test]
    fn test_repeat_wraps_far_coordinates() {
        let image = bordered();
        let shader = ImageShader::make_subset(
            image.clone(),
            image.bounds(),
            TileMode::Repeat,
            TileMode::Repeat,
            SamplingOptions::LINEAR,
            &Matrix::IDENTITY,
        )
        .unwrap();
        // 1e10 is a multiple of 4, so it lands on column 0 like 0.5 does.
        assert_eq!(shader.sample(1.0e10 + 0.5, 0.5), shader.sample(0.5, 0.5));
        assert_eq!(shader.sample(-1.0e10, 1.5), shader.sample(0.5, 1.5));
    }

    #[test]
    fn test_tile_mode_from_str() {
        assert_eq!("Mirror".parse::<TileMode>(), Ok(TileMode::Mirror));
        assert!("wrap".parse::<TileMode>().is_err());
    }

    #[test]
    fn test_strict_clamp_never_reads_border() {
        let image = bordered();
        let shader = ImageShader::make_subset(
            image.clone(),
            image.bounds(),
            TileMode::Clamp,
            TileMode::Clamp,
            SamplingOptions::LINEAR,
            &Matrix::IDENTITY,
        )
        .unwrap();
        for y in -4..8 {
            for x in -4..8 {
                let c = shader.sample(x as f32 + 0.25, y as f32 + 0.75);
                assert_ne!(c.r, 255, "border leaked at ({}, {})", x, y);
            }
        }
        assert_eq!(shader.strict_subset(), Some(image.bounds()));
    }

    #[test]
    fn test_fast_reads_storage_outside_image() {
        let image = bordered();
        let shader = ImageShader::make(
            image,
            TileMode::Clamp,
            TileMode::Clamp,
            SamplingOptions::NEAREST,
            &Matrix::IDENTITY,
        )
        .unwrap();
        assert_eq!(shader.sample(-0.5, 0.5), Color::new(255, 0, 0, 255));
        assert_eq!(shader.strict_subset(), None);
    }

    #[test]
    fn test_decal_is_transparent_outside() {
        let image = bordered();
        let shader = ImageShader::make_subset(
            image.clone(),
            image.bounds(),
            TileMode::Decal,
            TileMode::Decal,
            SamplingOptions::NEAREST,
            &Matrix::IDENTITY,
        )
        .unwrap();
        assert_eq!(shader.sample(-0.5, 0.5), Color::TRANSPARENT);
        assert_eq!(shader.sample(0.5, 0.5), Color::new(0, 40, 40, 255));
    }

    #[test]
    fn test_local_matrix_translates() {
        let image = bordered();
        let shader = ImageShader::make_subset(
            image.clone(),
            image.bounds(),
            TileMode::Clamp,
            TileMode::Clamp,
            SamplingOptions::NEAREST,
            &Matrix::translate(10.0, 10.0),
        )
        .unwrap();
        assert_eq!(shader.sample(11.5, 10.5), Color::new(0, 80, 40, 255));
    }

    #[test]
    fn test_linear_at_pixel_center_is_exact() {
        let image = bordered();
        let shader = ImageShader::make_subset(
            image.clone(),
            image.bounds(),
            TileMode::Clamp,
            TileMode::Clamp,
            SamplingOptions::LINEAR,
            &Matrix::IDENTITY,
        )
        .unwrap();
        assert_eq!(shader.sample(2.5, 1.5), Color::new(0, 120, 80, 255));
    }

    #[test]
    fn test_singular_matrix_rejected() {
        let image = bordered();
        assert!(ImageShader::make(
            image,
            TileMode::Clamp,
            TileMode::Clamp,
            SamplingOptions::NEAREST,
            &Matrix::scale(0.0, 0.0),
        )
        .is_none());
    }
}
