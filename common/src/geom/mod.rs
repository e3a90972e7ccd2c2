pub mod coord;
pub mod interval;
pub mod point;
pub mod rect;
pub mod rtree;

pub use coord::GrPoint;
pub use interval::Interval;
pub use point::Point;
pub use rect::Rect;
