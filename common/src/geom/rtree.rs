use super::rect::Rect;
use rstar::{AABB, RTree};

/// Static R-tree over boxes tagged with the caller's ids, used to find the
/// obstacles near a grid edge.
pub struct SpatialIndex {
    tree: RTree<TaggedBox>,
}

struct TaggedBox {
    rect: Rect,
    id: usize,
}

fn envelope(rect: &Rect) -> AABB<[i32; 2]> {
    AABB::from_corners([rect.min.x, rect.min.y], [rect.max.x, rect.max.y])
}

impl rstar::RTreeObject for TaggedBox {
    type Envelope = AABB<[i32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        envelope(&self.rect)
    }
}

impl SpatialIndex {
    pub fn bulk_load(rects: impl IntoIterator<Item = (Rect, usize)>) -> Self {
        let items = rects
            .into_iter()
            .map(|(rect, id)| TaggedBox { rect, id })
            .collect();
        Self {
            tree: RTree::bulk_load(items),
        }
    }

    /// Ids of every box touching `rect` (closed intersection).
    pub fn query(&self, rect: Rect) -> Vec<usize> {
        self.tree
            .locate_in_envelope_intersecting(&envelope(&rect))
            .map(|item| item.id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_returns_touching_boxes() {
        let index = SpatialIndex::bulk_load(vec![
            (Rect::from_coords(0, 0, 10, 10), 0),
            (Rect::from_coords(20, 20, 30, 30), 1),
        ]);
        let mut hits = index.query(Rect::from_coords(5, 5, 20, 20));
        hits.sort();
        assert_eq!(hits, vec![0, 1]);
        assert!(index.query(Rect::from_coords(11, 11, 19, 19)).is_empty());
    }
}
