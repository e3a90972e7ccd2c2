pub mod maze_route;
pub mod pattern_route;
pub mod steiner;

pub use maze_route::{MazeRoute, SparseGraph, SparseGrid};
pub use pattern_route::PatternRoute;
pub use steiner::SteinerTree;
