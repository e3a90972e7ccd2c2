use groute_common::geom::{Point, Rect};

/// Maps gcell indices back to design units through the gridlines.
pub struct GridConverter<'a> {
    gridlines: &'a [Vec<i32>; 2],
}

impl<'a> GridConverter<'a> {
    pub fn new(gridlines: &'a [Vec<i32>; 2]) -> Self {
        Self { gridlines }
    }

    /// Design-unit box covering gcells `lo..=hi`.
    pub fn cell_box(&self, lo: Point<i32>, hi: Point<i32>) -> Rect {
        let [xs, ys] = self.gridlines;
        Rect::from_coords(
            xs[lo.x as usize],
            ys[lo.y as usize],
            xs[hi.x as usize + 1],
            ys[hi.y as usize + 1],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxes_follow_uneven_gridlines() {
        let lines = [vec![0, 10, 25, 40], vec![0, 8, 16]];
        let conv = GridConverter::new(&lines);
        assert_eq!(
            conv.cell_box(Point::new(1, 0), Point::new(2, 1)),
            Rect::from_coords(10, 0, 40, 16)
        );
        assert_eq!(
            conv.cell_box(Point::new(0, 1), Point::new(0, 1)),
            Rect::from_coords(0, 8, 10, 16)
        );
    }
}
