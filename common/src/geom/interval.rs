use serde::{Deserialize, Serialize};

/// Closed integer interval. The default value is empty (`low > high`) and
/// grows through [`Interval::update`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub low: i32,
    pub high: i32,
}

impl Default for Interval {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Interval {
    pub const EMPTY: Interval = Interval {
        low: i32::MAX,
        high: i32::MIN,
    };

    pub fn new(low: i32, high: i32) -> Self {
        Self { low, high }
    }

    pub fn point(v: i32) -> Self {
        Self { low: v, high: v }
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.low <= self.high
    }

    /// `high - low`; zero for a single point.
    #[inline]
    pub fn range(&self) -> i32 {
        self.high - self.low
    }

    pub fn update(&mut self, v: i32) {
        self.low = self.low.min(v);
        self.high = self.high.max(v);
    }

    pub fn intersect(&self, other: &Interval) -> Interval {
        Interval::new(self.low.max(other.low), self.high.min(other.high))
    }

    pub fn contains(&self, v: i32) -> bool {
        self.low <= v && v <= self.high
    }

    pub fn center(&self) -> i32 {
        (self.low + self.high) / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty_until_updated() {
        let mut iv = Interval::default();
        assert!(!iv.is_valid());
        iv.update(4);
        iv.update(1);
        assert_eq!(iv, Interval::new(1, 4));
        assert_eq!(iv.range(), 3);
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        assert!(Interval::new(2, 6).intersect(&Interval::new(5, 9)).contains(5));
        assert!(!Interval::new(0, 1).intersect(&Interval::new(3, 4)).is_valid());
    }
}
