//! Built-in filter stages.

mod blur;
mod crop;
mod offset;
mod tile;

pub use blur::BlurStage;
pub use crop::CropStage;
pub use offset::OffsetStage;
pub use tile::TileStage;
