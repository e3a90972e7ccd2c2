use super::conversion::GridConverter;
use crate::error::RouteError;
use crate::grid::GridGraph;
use crate::net::GrNet;
use crate::tree::GrTree;
use groute_common::geom::{Point, Rect};
use std::collections::HashSet;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Guide boxes of one tree in gcell coordinates, as `(layer, box)`.
///
/// Every wire contributes the box it spans, every via a single cell on each
/// layer it crosses and every node its own cell. Duplicates are dropped and
/// first-seen order is kept.
pub fn net_guides(tree: &GrTree) -> Vec<(usize, Rect)> {
    let mut seen = HashSet::new();
    let mut guides = Vec::new();
    let mut push = |layer: usize, rect: Rect| {
        if seen.insert((layer, rect)) {
            guides.push((layer, rect));
        }
    };

    for node in tree.preorder() {
        let p = tree.point(node);
        push(p.layer, Rect::new(p.xy(), p.xy()));
        for &child in tree.children(node) {
            let c = tree.point(child);
            if p.layer == c.layer {
                let lo = Point::new(p.x.min(c.x), p.y.min(c.y));
                let hi = Point::new(p.x.max(c.x), p.y.max(c.y));
                push(p.layer, Rect::new(lo, hi));
            } else {
                for layer in p.layer.min(c.layer)..=p.layer.max(c.layer) {
                    push(layer, Rect::new(p.xy(), p.xy()));
                }
            }
        }
    }
    guides
}

/// Writes one guide block per routed net:
/// `name`, `(`, one `xlo ylo xhi yhi layer` line per box, `)`.
pub fn write_guides(path: impl AsRef<Path>, nets: &[GrNet], graph: &GridGraph) -> Result<(), RouteError> {
    let path = path.as_ref();
    log::info!("Writing guides to {}", path.display());
    let file = std::fs::File::create(path).map_err(|e| RouteError::io(path, e))?;
    let mut out = BufWriter::new(file);
    let converter = GridConverter::new(graph.gridlines());

    let mut write = || -> std::io::Result<()> {
        for net in nets {
            let Some(tree) = &net.routing_tree else {
                log::warn!("net {} has no routing tree, no guide written", net.name);
                continue;
            };
            writeln!(out, "{}", net.name)?;
            writeln!(out, "(")?;
            for (layer, rect) in net_guides(tree) {
                let b = converter.cell_box(rect.min, rect.max);
                writeln!(
                    out,
                    "{} {} {} {} {}",
                    b.min.x,
                    b.min.y,
                    b.max.x,
                    b.max.y,
                    graph.layer_name(layer)
                )?;
            }
            writeln!(out, ")")?;
        }
        out.flush()
    };
    write().map_err(|e| RouteError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use groute_common::geom::GrPoint;

    #[test]
    fn wire_and_via_boxes_are_deduplicated() {
        let mut tree = GrTree::new(GrPoint::new(0, 1, 1));
        let up = tree.add_child(GrTree::ROOT, GrPoint::new(2, 1, 1));
        tree.add_child(up, GrPoint::new(2, 4, 1));
        let guides = net_guides(&tree);
        assert_eq!(
            guides,
            vec![
                (0, Rect::from_coords(1, 1, 1, 1)),
                (1, Rect::from_coords(1, 1, 1, 1)),
                (2, Rect::from_coords(1, 1, 1, 1)),
                (2, Rect::from_coords(1, 1, 4, 1)),
                (2, Rect::from_coords(4, 1, 4, 1)),
            ]
        );
    }
}
