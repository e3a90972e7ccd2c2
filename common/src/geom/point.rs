use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point<T> {
    pub x: T,
    pub y: T,
}

impl<T> Point<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl<T: Add<Output = T>> Add for Point<T> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl<T: Sub<Output = T>> Sub for Point<T> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Point<i32> {
    /// Coordinate along `dim` (0 = x, 1 = y).
    #[inline(always)]
    pub fn get(&self, dim: usize) -> i32 {
        if dim == 0 { self.x } else { self.y }
    }

    #[inline(always)]
    pub fn get_mut(&mut self, dim: usize) -> &mut i32 {
        if dim == 0 { &mut self.x } else { &mut self.y }
    }

    /// Returns a copy moved by `amount` along `dim`.
    pub fn shifted(self, dim: usize, amount: i32) -> Self {
        let mut p = self;
        *p.get_mut(dim) += amount;
        p
    }

    pub fn manhattan(&self, other: &Self) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

impl<T: fmt::Display> fmt::Display for Point<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}
