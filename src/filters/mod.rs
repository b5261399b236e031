//! Filter module.
//!
//! Contains the filter stage trait and the built-in stages.

pub mod stage;
pub mod builtin;

pub use stage::{FilterContext, FilterStage};
pub use builtin::{BlurStage, CropStage, OffsetStage, TileStage};
