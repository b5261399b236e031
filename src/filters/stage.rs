//! The filter stage abstraction.
//!
//! A stage consumes one special image and produces another. Stages never
//! mutate their input; outputs are fresh special images, usually rendered
//! into a [`SpecialSurface`](crate::special::SpecialSurface).

use crate::core::color::{AlphaType, ColorInfo, ColorType, ImageInfo};
use crate::core::config::Config;
use crate::core::error::{FilterError, SpecialImageError};
use crate::core::geometry::ISize;
use crate::core::props::SurfaceProps;
use crate::core::shader::SamplingOptions;
use crate::special::{SpecialImage, SpecialImageRef, SpecialSurface};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Settings shared by every stage of a pipeline run.
///
/// Stage outputs depend on the context as well as the input, so cached
/// results are scoped by [`FilterContext::cache_key_hash`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FilterContext {
    /// Properties given to every image a stage creates.
    pub props: SurfaceProps,
    /// Sampling used when stages resample their input.
    pub sampling: SamplingOptions,
}

impl Default for FilterContext {
    fn default() -> Self {
        Self::new(SurfaceProps::default())
    }
}

impl FilterContext {
    pub fn new(props: SurfaceProps) -> Self {
        Self {
            props,
            sampling: SamplingOptions::NEAREST,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.surface)
    }

    pub fn with_sampling(mut self, sampling: SamplingOptions) -> Self {
        self.sampling = sampling;
        self
    }

    /// Hash of every setting that can change a stage's output.
    pub fn cache_key_hash(&self) -> u64 {
        finish_hash("context", self)
    }

    /// Allocate an N32 surface of `size` for output derived from `input`.
    ///
    /// The input's color space tag is carried over.
    pub fn make_surface(
        &self,
        input: &dyn SpecialImage,
        size: ISize,
    ) -> Result<SpecialSurface, SpecialImageError> {
        let color_info = ColorInfo::new(
            ColorType::N32,
            AlphaType::Premul,
            input.color_info().ref_color_space(),
        );
        SpecialSurface::make_raster(&ImageInfo::new(size, color_info), &self.props)
    }
}

/// One step of a filter pipeline.
pub trait FilterStage: Send + Sync + fmt::Debug {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Hash of the stage and all of its parameters.
    ///
    /// Two stages with equal hashes must produce identical output for the
    /// same input.
    fn cache_key_hash(&self) -> u64;

    /// Run the stage.
    fn apply(
        &self,
        ctx: &FilterContext,
        input: &SpecialImageRef,
    ) -> Result<SpecialImageRef, FilterError>;
}

/// Start a stage hash seeded with the stage name.
pub fn stage_hasher(name: &str) -> DefaultHasher {
    let mut hasher = DefaultHasher::new();
    name.hash(&mut hasher);
    hasher
}

/// Wrap a special image error with the failing stage's name.
pub fn stage_error(stage: &str) -> impl Fn(SpecialImageError) -> FilterError + '_ {
    move |source| FilterError::Stage {
        stage: stage.to_string(),
        source,
    }
}

/// Finish hashing `value` on top of [`stage_hasher`].
pub fn finish_hash<T: Hash>(name: &str, value: &T) -> u64 {
    let mut hasher = stage_hasher(name);
    value.hash(&mut hasher);
    hasher.finish()
}
