pub mod graph;
pub mod view;

pub use graph::{AccessPoint, GraphEdge, GridGraph};
pub use view::GridGraphView;
