use crate::grid::AccessPoint;
use groute_common::geom::{Interval, Point};
use std::collections::HashMap;

#[derive(Clone, Debug)]
pub struct SteinerNode {
    pub point: Point<i32>,
    /// Layers a pin at this point must reach; empty for pure Steiner points.
    pub fixed_layers: Interval,
    pub children: Vec<usize>,
}

/// Rooted rectilinear topology over a net's pseudo-pins. Node 0 is the root.
#[derive(Clone, Debug)]
pub struct SteinerTree {
    pub nodes: Vec<SteinerNode>,
}

impl SteinerTree {
    pub const ROOT: usize = 0;

    pub fn single(ap: &AccessPoint) -> Self {
        Self {
            nodes: vec![SteinerNode {
                point: ap.point,
                fixed_layers: ap.layers,
                children: Vec::new(),
            }],
        }
    }

    pub fn add_node(&mut self, point: Point<i32>, fixed_layers: Interval) -> usize {
        self.nodes.push(SteinerNode {
            point,
            fixed_layers,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn preorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![Self::ROOT];
        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.nodes[node].children.iter().rev().copied());
        }
        order
    }

    pub fn wire_length(&self) -> i32 {
        self.nodes
            .iter()
            .flat_map(|n| n.children.iter().map(move |&c| (n.point, c)))
            .map(|(p, c)| p.manhattan(&self.nodes[c].point))
            .sum()
    }

    /// Builds the topology for the given pseudo-pins. Nodes sharing a
    /// position with their parent are folded into it.
    pub fn construct(access_points: &[AccessPoint]) -> Self {
        debug_assert!(!access_points.is_empty());
        if access_points.len() == 1 {
            return Self::single(&access_points[0]);
        }
        let fixed: HashMap<Point<i32>, Interval> =
            access_points.iter().map(|ap| (ap.point, ap.layers)).collect();
        let pins: Vec<Point<i32>> = access_points.iter().map(|ap| ap.point).collect();
        let (points, adjacency) = rectilinear_steiner(&pins);

        // Root at a leaf so the pattern DAG has a single entry wire.
        let root = (0..points.len())
            .find(|&i| adjacency[i].len() == 1)
            .unwrap_or(0);

        let mut tree = SteinerTree { nodes: Vec::new() };
        tree.add_node(
            points[root],
            fixed.get(&points[root]).copied().unwrap_or(Interval::EMPTY),
        );
        // (graph vertex, graph predecessor, tree parent)
        let mut stack: Vec<(usize, usize, usize)> = adjacency[root]
            .iter()
            .rev()
            .map(|&next| (next, root, Self::ROOT))
            .collect();
        while let Some((current, prev, parent)) = stack.pop() {
            let point = points[current];
            let node = if tree.nodes[parent].point == point {
                parent
            } else {
                let layers = fixed.get(&point).copied().unwrap_or(Interval::EMPTY);
                let node = tree.add_node(point, layers);
                tree.nodes[parent].children.push(node);
                node
            };
            for &next in adjacency[current].iter().rev() {
                if next != prev {
                    stack.push((next, current, node));
                }
            }
        }
        tree
    }
}

/// Rectilinear minimum spanning tree over `pins` refined by greedy
/// median-point insertion. Returns every point (pins first) and the
/// undirected adjacency lists.
pub fn rectilinear_steiner(pins: &[Point<i32>]) -> (Vec<Point<i32>>, Vec<Vec<usize>>) {
    let n = pins.len();
    let mut points = pins.to_vec();
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    if n < 2 {
        return (points, adjacency);
    }

    // Prim over the complete Manhattan graph.
    let mut in_tree = vec![false; n];
    let mut dist = vec![i32::MAX; n];
    let mut link = vec![0usize; n];
    dist[0] = 0;
    for _ in 0..n {
        let Some(u) = (0..n)
            .filter(|&i| !in_tree[i])
            .min_by_key(|&i| dist[i])
        else {
            break;
        };
        in_tree[u] = true;
        if u != 0 {
            adjacency[u].push(link[u]);
            adjacency[link[u]].push(u);
        }
        for v in 0..n {
            let d = points[u].manhattan(&points[v]);
            if !in_tree[v] && d < dist[v] {
                dist[v] = d;
                link[v] = u;
            }
        }
    }

    let max_rounds = 4 * n;
    for _ in 0..max_rounds {
        let Some((_, v, a, b, m)) = best_median_move(&points, &adjacency) else {
            break;
        };
        remove_edge(&mut adjacency, v, a);
        remove_edge(&mut adjacency, v, b);
        let mid = [v, a, b]
            .into_iter()
            .find(|&i| points[i] == m)
            .unwrap_or_else(|| {
                points.push(m);
                adjacency.push(Vec::new());
                points.len() - 1
            });
        for end in [v, a, b] {
            if end != mid {
                adjacency[mid].push(end);
                adjacency[end].push(mid);
            }
        }
    }
    (points, adjacency)
}

fn median3(a: i32, b: i32, c: i32) -> i32 {
    a.max(b).min(a.min(b).max(c))
}

/// Best (gain, v, a, b, median) over all pairs of neighbours of a vertex.
fn best_median_move(
    points: &[Point<i32>],
    adjacency: &[Vec<usize>],
) -> Option<(i32, usize, usize, usize, Point<i32>)> {
    let mut best: Option<(i32, usize, usize, usize, Point<i32>)> = None;
    for (v, adj) in adjacency.iter().enumerate() {
        for i in 0..adj.len() {
            for j in i + 1..adj.len() {
                let (a, b) = (adj[i], adj[j]);
                let (pv, pa, pb) = (points[v], points[a], points[b]);
                let m = Point::new(median3(pv.x, pa.x, pb.x), median3(pv.y, pa.y, pb.y));
                let before = pv.manhattan(&pa) + pv.manhattan(&pb);
                let after = pv.manhattan(&m) + m.manhattan(&pa) + m.manhattan(&pb);
                let gain = before - after;
                if gain > 0 && best.is_none_or(|(g, ..)| gain > g) {
                    best = Some((gain, v, a, b, m));
                }
            }
        }
    }
    best
}

fn remove_edge(adjacency: &mut [Vec<usize>], u: usize, v: usize) {
    adjacency[u].retain(|&x| x != v);
    adjacency[v].retain(|&x| x != u);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ap(x: i32, y: i32) -> AccessPoint {
        AccessPoint {
            point: Point::new(x, y),
            layers: Interval::new(0, 2),
        }
    }

    #[test]
    fn median_point_shortens_three_pin_tree() {
        let tree = SteinerTree::construct(&[ap(0, 0), ap(4, 0), ap(2, 3)]);
        assert_eq!(tree.wire_length(), 7);
        let steiner: Vec<_> = tree
            .nodes
            .iter()
            .filter(|n| !n.fixed_layers.is_valid())
            .map(|n| n.point)
            .collect();
        assert_eq!(steiner, vec![Point::new(2, 0)]);
    }

    #[test]
    fn root_is_a_leaf_pin() {
        let tree = SteinerTree::construct(&[ap(0, 0), ap(5, 0), ap(10, 0)]);
        let root = &tree.nodes[SteinerTree::ROOT];
        assert_eq!(root.children.len(), 1);
        assert!(root.fixed_layers.is_valid());
        assert_eq!(tree.nodes.len(), 3);
        assert_eq!(tree.wire_length(), 10);
        assert_eq!(tree.preorder().len(), 3);
    }

    #[test]
    fn steiner_point_on_pin_is_reused() {
        // The median of the three is the pin at (2, 0) itself.
        let tree = SteinerTree::construct(&[ap(0, 0), ap(2, 0), ap(2, 5), ap(4, 0)]);
        assert_eq!(tree.nodes.len(), 4);
        assert_eq!(tree.wire_length(), 9);
    }
}
