use groute_common::geom::Point;

/// Per-direction 2-D snapshot of the grid, indexed `[direction][x][y]`.
#[derive(Clone, Debug)]
pub struct GridGraphView<T> {
    x_size: usize,
    y_size: usize,
    data: Vec<T>,
}

impl<T: Clone> GridGraphView<T> {
    pub fn new(x_size: usize, y_size: usize, fill: T) -> Self {
        Self {
            x_size,
            y_size,
            data: vec![fill; 2 * x_size * y_size],
        }
    }
}

impl<T> GridGraphView<T> {
    #[inline(always)]
    fn index(&self, direction: usize, x: usize, y: usize) -> usize {
        debug_assert!(direction < 2 && x < self.x_size && y < self.y_size);
        direction * self.x_size * self.y_size + x * self.y_size + y
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }

    pub fn y_size(&self) -> usize {
        self.y_size
    }

    #[inline(always)]
    pub fn get(&self, direction: usize, x: usize, y: usize) -> &T {
        &self.data[self.index(direction, x, y)]
    }

    #[inline(always)]
    pub fn set(&mut self, direction: usize, x: usize, y: usize, value: T) {
        let idx = self.index(direction, x, y);
        self.data[idx] = value;
    }

    /// Columns of `y_size` entries, one per (direction, x), in storage order.
    pub(crate) fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Visits every edge cell covered by the axis-aligned wire `u`-`v`.
    fn for_each_cell(u: Point<i32>, v: Point<i32>, mut f: impl FnMut(usize, usize, usize)) {
        debug_assert!(u.x == v.x || u.y == v.y, "non-orthogonal wire {u} -> {v}");
        if u.y == v.y {
            let (l, h) = (u.x.min(v.x), u.x.max(v.x));
            for x in l..h {
                f(0, x as usize, u.y as usize);
            }
        } else {
            let (l, h) = (u.y.min(v.y), u.y.max(v.y));
            for y in l..h {
                f(1, u.x as usize, y as usize);
            }
        }
    }
}

impl GridGraphView<bool> {
    /// True when any edge along the wire is flagged.
    pub fn check(&self, u: Point<i32>, v: Point<i32>) -> bool {
        let mut hit = false;
        Self::for_each_cell(u, v, |d, x, y| hit |= *self.get(d, x, y));
        hit
    }

    /// Number of cells set in either direction.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&set| set).count()
    }
}

impl GridGraphView<f64> {
    /// Sum of the per-edge values along the wire.
    pub fn sum(&self, u: Point<i32>, v: Point<i32>) -> f64 {
        let mut total = 0.0;
        Self::for_each_cell(u, v, |d, x, y| total += *self.get(d, x, y));
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_only_looks_at_wire_direction() {
        let mut view = GridGraphView::new(6, 6, false);
        view.set(1, 2, 3, true);
        assert!(!view.check(Point::new(0, 3), Point::new(5, 3)));
        assert!(view.check(Point::new(2, 0), Point::new(2, 5)));
        assert!(!view.check(Point::new(2, 0), Point::new(2, 3)));
        assert_eq!(view.count(), 1);
    }

    #[test]
    fn sum_spans_half_open_edge_range() {
        let mut view = GridGraphView::new(4, 2, 1.0);
        view.set(0, 3, 0, 100.0);
        assert_eq!(view.sum(Point::new(3, 0), Point::new(0, 0)), 3.0);
    }
}
