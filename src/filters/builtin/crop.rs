//! Crop: restrict the input to a rectangle without copying.

use crate::core::error::FilterError;
use crate::core::geometry::IRect;
use crate::filters::stage::{finish_hash, stage_error, FilterContext, FilterStage};
use crate::special::SpecialImageRef;

/// Crops to `rect`, given in the input's local frame.
///
/// The rectangle is clipped to the input first, so partially overlapping
/// crops succeed. A crop that misses the input entirely fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropStage {
    pub rect: IRect,
}

impl CropStage {
    pub fn new(rect: IRect) -> Self {
        Self { rect }
    }
}

impl FilterStage for CropStage {
    fn name(&self) -> &str {
        "crop"
    }

    fn cache_key_hash(&self) -> u64 {
        finish_hash(self.name(), &self.rect)
    }

    fn apply(
        &self,
        _ctx: &FilterContext,
        input: &SpecialImageRef,
    ) -> Result<SpecialImageRef, FilterError> {
        let bounds = IRect::from_size(input.dimensions());
        let clipped = bounds.intersect(&self.rect).ok_or_else(|| FilterError::NoOutput {
            stage: self.name().to_string(),
            reason: format!("{} does not overlap {}", self.rect, bounds),
        })?;
        input.make_subset(&clipped).map_err(stage_error(self.name()))
    }
}
