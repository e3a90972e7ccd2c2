use crate::tree::GrTree;
use groute_common::db::Net;
use groute_common::db::indices::NetId;
use groute_common::geom::{GrPoint, Interval, Point, Rect};

/// Router-side view of a design net.
#[derive(Clone, Debug)]
pub struct GrNet {
    pub id: NetId,
    pub name: String,
    /// Candidate access cells, one list per pin.
    pub pin_access_points: Vec<Vec<GrPoint>>,
    /// Bounding box of every candidate access cell, in grid coordinates.
    pub bbox: Rect,
    pub layer_range: Option<Interval>,
    pub routing_tree: Option<GrTree>,
}

impl GrNet {
    pub fn from_design(id: NetId, net: &Net) -> Self {
        let mut xs = Interval::EMPTY;
        let mut ys = Interval::EMPTY;
        for ap in net.pins.iter().flat_map(|p| p.access_points.iter()) {
            xs.update(ap.x);
            ys.update(ap.y);
        }
        let bbox = if xs.is_valid() {
            Rect::new(Point::new(xs.low, ys.low), Point::new(xs.high, ys.high))
        } else {
            Rect::default()
        };
        Self {
            id,
            name: net.name.clone(),
            pin_access_points: net.pins.iter().map(|p| p.access_points.clone()).collect(),
            bbox,
            layer_range: net.layer_range,
            routing_tree: None,
        }
    }

    pub fn num_pins(&self) -> usize {
        self.pin_access_points.len()
    }

    pub fn half_perimeter(&self) -> i32 {
        self.bbox.width() + self.bbox.height()
    }

    pub fn is_inside_layer_range(&self, layer: usize) -> bool {
        self.layer_range
            .is_none_or(|range| range.contains(layer as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groute_common::db::Pin;

    #[test]
    fn bbox_spans_all_candidates() {
        let net = Net {
            name: "n".into(),
            pins: vec![
                Pin {
                    name: "a".into(),
                    access_points: vec![GrPoint::new(0, 1, 7), GrPoint::new(0, 2, 7)],
                },
                Pin {
                    name: "b".into(),
                    access_points: vec![GrPoint::new(0, 6, 3)],
                },
            ],
            layer_range: Some(Interval::new(1, 2)),
        };
        let gr = GrNet::from_design(NetId::new(0), &net);
        assert_eq!(gr.bbox, Rect::from_coords(1, 3, 6, 7));
        assert_eq!(gr.half_perimeter(), 9);
        assert!(!gr.is_inside_layer_range(3));
        assert!(gr.is_inside_layer_range(2));
    }
}
