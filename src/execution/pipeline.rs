//! Filter pipeline execution.
//!
//! A pipeline runs stages in order, feeding each stage's output special
//! image into the next. Stage outputs can be cached by input identity.

use crate::core::error::FilterError;
use crate::execution::cache::{CacheKey, SharedCache};
use crate::filters::stage::{FilterContext, FilterStage};
use crate::special::SpecialImageRef;
use rayon::prelude::*;
use std::time::{Duration, Instant};

/// Result of running a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineResult {
    /// Output of the last stage, or the input if there are no stages.
    pub output: SpecialImageRef,
    pub stats: PipelineStats,
}

/// Pipeline statistics.
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Total execution time.
    pub total_duration: Duration,
    /// Number of stages actually executed.
    pub stages_executed: usize,
    /// Number of stages served from the cache.
    pub cache_hits: usize,
    /// Time per executed stage, by name.
    pub stage_durations: Vec<(String, Duration)>,
}

/// An ordered list of filter stages.
#[derive(Debug, Default)]
pub struct FilterPipeline {
    stages: Vec<Box<dyn FilterStage>>,
    cache: Option<SharedCache>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache stage outputs in `cache`.
    pub fn with_cache(mut self, cache: SharedCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Append a stage.
    pub fn stage(mut self, stage: impl FilterStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn FilterStage>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage over `input`, stopping at the first failure.
    pub fn run(
        &self,
        ctx: &FilterContext,
        input: SpecialImageRef,
    ) -> Result<PipelineResult, FilterError> {
        let start_time = Instant::now();
        let mut stats = PipelineStats::default();
        let mut current = input;

        for stage in &self.stages {
            let key = CacheKey::new(current.as_ref(), stage.cache_key_hash())
                .with_context(ctx.cache_key_hash());
            if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
                log::debug!("Stage '{}' served from cache", stage.name());
                stats.cache_hits += 1;
                current = cached;
                continue;
            }

            let stage_start = Instant::now();
            let output = stage.apply(ctx, &current).map_err(|err| {
                log::warn!("Stage '{}' failed: {}", stage.name(), err);
                err
            })?;
            let duration = stage_start.elapsed();

            log::debug!(
                "Stage '{}' produced {}x{} image {} in {:?}",
                stage.name(),
                output.width(),
                output.height(),
                output.unique_id(),
                duration
            );
            if let Some(cache) = &self.cache {
                cache.put(key, output.clone(), duration);
            }
            stats.stages_executed += 1;
            stats.stage_durations.push((stage.name().to_string(), duration));
            current = output;
        }

        stats.total_duration = start_time.elapsed();
        Ok(PipelineResult {
            output: current,
            stats,
        })
    }

    /// Run the pipeline over several inputs in parallel.
    pub fn run_batch(
        &self,
        ctx: &FilterContext,
        inputs: &[SpecialImageRef],
    ) -> Vec<Result<PipelineResult, FilterError>> {
        inputs
            .par_iter()
            .map(|input| self.run(ctx, input.clone()))
            .collect()
    }
}
