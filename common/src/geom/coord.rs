use super::point::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A gcell on a given metal layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrPoint {
    pub layer: usize,
    pub x: i32,
    pub y: i32,
}

impl GrPoint {
    pub fn new(layer: usize, x: i32, y: i32) -> Self {
        Self { layer, x, y }
    }

    pub fn xy(&self) -> Point<i32> {
        Point::new(self.x, self.y)
    }

    #[inline(always)]
    pub fn get(&self, dim: usize) -> i32 {
        if dim == 0 { self.x } else { self.y }
    }
}

impl fmt::Display for GrPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.layer, self.x, self.y)
    }
}
