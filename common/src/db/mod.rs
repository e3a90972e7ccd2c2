pub mod design;
pub mod error;
pub mod indices;

pub use design::{Design, LayerDirection, MetalLayer, Net, Obstacle, Pin};
pub use error::DesignError;
