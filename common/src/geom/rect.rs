use super::interval::Interval;
use super::point::Point;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub min: Point<i32>,
    pub max: Point<i32>,
}

impl Rect {
    pub fn new(min: Point<i32>, max: Point<i32>) -> Self {
        Self { min, max }
    }

    pub fn from_coords(lx: i32, ly: i32, hx: i32, hy: i32) -> Self {
        Self::new(Point::new(lx, ly), Point::new(hx, hy))
    }

    pub fn width(&self) -> i32 {
        self.max.x - self.min.x
    }
    pub fn height(&self) -> i32 {
        self.max.y - self.min.y
    }

    /// Extent along `dim` (0 = x, 1 = y).
    pub fn span(&self, dim: usize) -> Interval {
        Interval::new(self.min.get(dim), self.max.get(dim))
    }

    /// Grows the box by `amount` on both sides of `dim`.
    pub fn expanded(&self, dim: usize, amount: i32) -> Rect {
        let mut r = *self;
        *r.min.get_mut(dim) -= amount;
        *r.max.get_mut(dim) += amount;
        r
    }
}
