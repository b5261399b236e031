//! Pipeline execution module.
//!
//! This module runs filter stages over special images and caches their
//! results.

pub mod cache;
pub mod pipeline;

pub use cache::{CacheKey, CacheStats, SharedCache, SpecialImageCache};
pub use pipeline::{FilterPipeline, PipelineResult, PipelineStats};
