//! Surface properties carried alongside every special image.

use serde::{Deserialize, Serialize};

/// Physical layout of subpixels on the output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelGeometry {
    #[default]
    Unknown,
    RgbHorizontal,
    BgrHorizontal,
    RgbVertical,
    BgrVertical,
}

impl PixelGeometry {
    /// True if the geometry allows subpixel (LCD) text rendering.
    pub fn is_subpixel(&self) -> bool {
        !matches!(self, PixelGeometry::Unknown)
    }
}

/// Rendering characteristics of the surface an image was produced for.
///
/// Filter stages copy these into every image they emit so that later
/// re-rendering (text in particular) stays consistent with the original
/// destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceProps {
    /// Subpixel layout.
    pub pixel_geometry: PixelGeometry,
    /// Use device-independent font metrics.
    pub use_device_independent_fonts: bool,
    /// Treat the surface as dynamic MSAA capable.
    pub dynamic_msaa: bool,
    /// Always dither gradients and images.
    pub always_dither: bool,
}

impl SurfaceProps {
    /// Properties with the given pixel geometry and no flags.
    pub fn new(pixel_geometry: PixelGeometry) -> Self {
        Self {
            pixel_geometry,
            ..Self::default()
        }
    }

    /// Builder-style flag setter.
    pub fn with_device_independent_fonts(mut self, enabled: bool) -> Self {
        self.use_device_independent_fonts = enabled;
        self
    }

    /// Builder-style flag setter.
    pub fn with_always_dither(mut self, enabled: bool) -> Self {
        self.always_dither = enabled;
        self
    }

    /// True if LCD text can be rendered with these properties.
    pub fn allows_lcd_text(&self) -> bool {
        self.pixel_geometry.is_subpixel() && !self.use_device_independent_fonts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_props() {
        let props = SurfaceProps::default();
        assert_eq!(props.pixel_geometry, PixelGeometry::Unknown);
        assert!(!props.allows_lcd_text());
    }

    #[test]
    fn test_lcd_text() {
        let props = SurfaceProps::new(PixelGeometry::RgbHorizontal);
        assert!(props.allows_lcd_text());
        assert!(!props.with_device_independent_fonts(true).allows_lcd_text());
    }

    #[test]
    fn test_props_deserialize_with_defaults() {
        let json = r#"{"pixel_geometry":"bgr_vertical"}"#;
        let props: SurfaceProps = serde_json::from_str(json).unwrap();
        assert_eq!(props.pixel_geometry, PixelGeometry::BgrVertical);
        assert!(!props.always_dither);
    }
}
