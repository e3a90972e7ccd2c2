use super::steiner::SteinerTree;
use crate::grid::{AccessPoint, GridGraph, GridGraphView};
use crate::net::GrNet;
use groute_common::geom::{Interval, Point};
use priority_queue::PriorityQueue;
use std::cmp::{Ordering, Reverse};
use std::collections::{HashMap, HashSet};

/// Stride of the coarse gridlines kept by the sparsified graph. The offset
/// moves after every net so consecutive nets are not sparsified alike.
#[derive(Clone, Copy, Debug)]
pub struct SparseGrid {
    pub interval: usize,
    pub offset: usize,
}

impl SparseGrid {
    pub fn new(interval: usize, offset: usize) -> Self {
        let interval = interval.max(1);
        Self {
            interval,
            offset: offset % interval,
        }
    }

    pub fn step(&mut self) {
        self.offset = (self.offset + 1) % self.interval;
    }

    fn lines(&self, size: usize, pins: impl Iterator<Item = i32>) -> Vec<i32> {
        let mut lines: Vec<i32> = (self.offset..size)
            .step_by(self.interval)
            .map(|c| c as i32)
            .chain(pins)
            .collect();
        lines.sort_unstable();
        lines.dedup();
        lines
    }
}

const BACKWARD: usize = 0;
const FORWARD: usize = 1;
const VIA: usize = 2;

/// Per-net search graph: two copies (horizontal, vertical) of every
/// intersection of the sparse gridlines.
pub struct SparseGraph {
    xs: Vec<i32>,
    ys: Vec<i32>,
    pseudo_pins: Vec<AccessPoint>,
    /// Vertex -> pseudo-pin index.
    vertex_pins: HashMap<usize, usize>,
    neighbors: Vec<[Option<usize>; 3]>,
    costs: Vec<[f64; 3]>,
}

impl SparseGraph {
    pub fn new(net: &GrNet, graph: &GridGraph, view: &GridGraphView<f64>, grid: &SparseGrid) -> Self {
        let pseudo_pins = graph.select_access_points(net);
        let xs = grid.lines(graph.x_size(), pseudo_pins.iter().map(|ap| ap.point.x));
        let ys = grid.lines(graph.y_size(), pseudo_pins.iter().map(|ap| ap.point.y));
        let (nx, ny) = (xs.len(), ys.len());
        let num_vertices = 2 * nx * ny;

        let mut sparse = Self {
            xs,
            ys,
            pseudo_pins,
            vertex_pins: HashMap::new(),
            neighbors: vec![[None; 3]; num_vertices],
            costs: vec![[f64::INFINITY; 3]; num_vertices],
        };

        for (pin, ap) in sparse.pseudo_pins.iter().enumerate() {
            let (Ok(xi), Ok(yi)) = (
                sparse.xs.binary_search(&ap.point.x),
                sparse.ys.binary_search(&ap.point.y),
            ) else {
                continue;
            };
            for dir in 0..2 {
                let v = sparse.vertex(dir, xi, yi);
                sparse.vertex_pins.insert(v, pin);
            }
        }

        let via_cost = graph.unit_via_cost();
        for dir in 0..2 {
            for yi in 0..ny {
                for xi in 0..nx {
                    let v = sparse.vertex(dir, xi, yi);
                    let u = sparse.vertex(1 - dir, xi, yi);
                    sparse.neighbors[v][VIA] = Some(u);
                    sparse.costs[v][VIA] = if sparse.vertex_pins.contains_key(&v) { 0.0 } else { via_cost };

                    let (i, n) = if dir == 0 { (xi, nx) } else { (yi, ny) };
                    if i + 1 < n {
                        let (nxi, nyi) = if dir == 0 { (xi + 1, yi) } else { (xi, yi + 1) };
                        let w = sparse.vertex(dir, nxi, nyi);
                        let cost = view.sum(sparse.point(v), sparse.point(w));
                        sparse.neighbors[v][FORWARD] = Some(w);
                        sparse.costs[v][FORWARD] = cost;
                        sparse.neighbors[w][BACKWARD] = Some(v);
                        sparse.costs[w][BACKWARD] = cost;
                    }
                }
            }
        }
        sparse
    }

    #[inline]
    fn vertex(&self, dir: usize, xi: usize, yi: usize) -> usize {
        dir * self.xs.len() * self.ys.len() + yi * self.xs.len() + xi
    }

    pub fn num_vertices(&self) -> usize {
        self.neighbors.len()
    }

    pub fn point(&self, vertex: usize) -> Point<i32> {
        let plane = self.xs.len() * self.ys.len();
        let rest = vertex % plane;
        Point::new(self.xs[rest % self.xs.len()], self.ys[rest / self.xs.len()])
    }

    pub fn pin_of(&self, vertex: usize) -> Option<usize> {
        self.vertex_pins.get(&vertex).copied()
    }

    /// Both copies of the pin's vertex.
    fn pin_vertices(&self, pin: usize) -> Vec<usize> {
        let mut vertices: Vec<usize> = self
            .vertex_pins
            .iter()
            .filter(|&(_, &p)| p == pin)
            .map(|(&v, _)| v)
            .collect();
        vertices.sort_unstable();
        vertices
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Cost(f64);

impl Eq for Cost {}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Grows a tree over the sparse graph: Dijkstra from the first pin that
/// restarts at zero cost along every newly connected path.
pub struct MazeRoute<'a> {
    net: &'a GrNet,
    graph: SparseGraph,
    /// Vertex paths from a newly reached pin back to the tree.
    found: Vec<Vec<usize>>,
}

impl<'a> MazeRoute<'a> {
    pub fn new(net: &'a GrNet, graph: SparseGraph) -> Self {
        Self {
            net,
            graph,
            found: Vec::new(),
        }
    }

    pub fn found_paths(&self) -> &[Vec<usize>] {
        &self.found
    }

    /// Connects every pseudo-pin. Returns false when the search runs out of
    /// vertices first.
    pub fn run(&mut self) -> bool {
        self.found.clear();
        let num_pins = self.graph.pseudo_pins.len();
        if num_pins == 0 {
            log::error!("net {} has no pseudo-pins", self.net.name);
            return false;
        }
        let n = self.graph.num_vertices();
        let mut dist = vec![f64::INFINITY; n];
        let mut prev: Vec<Option<usize>> = vec![None; n];
        let mut in_tree = vec![false; n];
        let mut reached = vec![false; num_pins];
        let mut queue: PriorityQueue<usize, Reverse<Cost>> = PriorityQueue::new();

        for v in self.graph.pin_vertices(0) {
            dist[v] = 0.0;
            in_tree[v] = true;
            queue.push(v, Reverse(Cost(0.0)));
        }
        reached[0] = true;
        let mut remaining = num_pins - 1;

        while remaining > 0 {
            let Some((u, Reverse(Cost(d)))) = queue.pop() else {
                log::error!(
                    "net {}: maze search exhausted with {} pins unconnected",
                    self.net.name,
                    remaining
                );
                return false;
            };

            if let Some(pin) = self.graph.pin_of(u).filter(|&p| !reached[p]) {
                reached[pin] = true;
                remaining -= 1;
                let mut path = vec![u];
                let mut v = u;
                while !in_tree[v] {
                    let Some(p) = prev[v] else {
                        break;
                    };
                    path.push(p);
                    v = p;
                }
                for &v in &path {
                    dist[v] = 0.0;
                    in_tree[v] = true;
                    queue.push_increase(v, Reverse(Cost(0.0)));
                }
                self.found.push(path);
                continue;
            }

            for k in 0..3 {
                let Some(w) = self.graph.neighbors[u][k] else {
                    continue;
                };
                let nd = d + self.graph.costs[u][k];
                if nd < dist[w] {
                    dist[w] = nd;
                    prev[w] = Some(u);
                    queue.push_increase(w, Reverse(Cost(nd)));
                }
            }
        }
        true
    }

    /// Topology of the connected paths. Straight runs through bare
    /// intermediate points are folded into single edges.
    pub fn steiner_tree(&self) -> SteinerTree {
        let pins = &self.graph.pseudo_pins;
        let fixed: HashMap<Point<i32>, Interval> = pins.iter().map(|ap| (ap.point, ap.layers)).collect();
        let layers_at = |p: Point<i32>| fixed.get(&p).copied().unwrap_or(Interval::EMPTY);

        let root_point = pins[0].point;
        let mut raw = SteinerTree::single(&pins[0]);
        let mut known: HashMap<Point<i32>, usize> = HashMap::from([(root_point, SteinerTree::ROOT)]);

        for path in &self.found {
            let mut points: Vec<Point<i32>> = path.iter().map(|&v| self.graph.point(v)).collect();
            points.dedup();
            let Some(attach) = points.iter().position(|p| known.contains_key(p)) else {
                log::error!("net {}: maze path does not reach the tree", self.net.name);
                continue;
            };
            let mut parent = known[&points[attach]];
            for &p in points[..attach].iter().rev() {
                if let Some(&existing) = known.get(&p) {
                    parent = existing;
                    continue;
                }
                let node = raw.add_node(p, layers_at(p));
                raw.nodes[parent].children.push(node);
                known.insert(p, node);
                parent = node;
            }
        }

        // Drop bare collinear pass-through points.
        let mut tree = SteinerTree::single(&pins[0]);
        let mut stack: Vec<(usize, usize)> = raw.nodes[SteinerTree::ROOT]
            .children
            .iter()
            .rev()
            .map(|&c| (c, SteinerTree::ROOT))
            .collect();
        while let Some((mut old, parent)) = stack.pop() {
            let anchor = tree.nodes[parent].point;
            loop {
                let node = &raw.nodes[old];
                if node.fixed_layers.is_valid() || node.children.len() != 1 {
                    break;
                }
                let next = raw.nodes[node.children[0]].point;
                let p = node.point;
                let collinear = (anchor.x == p.x && p.x == next.x) || (anchor.y == p.y && p.y == next.y);
                if !collinear {
                    break;
                }
                old = node.children[0];
            }
            let new = tree.add_node(raw.nodes[old].point, raw.nodes[old].fixed_layers);
            tree.nodes[parent].children.push(new);
            for &c in raw.nodes[old].children.iter().rev() {
                stack.push((c, new));
            }
        }

        let mut seen = HashSet::new();
        if !tree.nodes.iter().all(|n| seen.insert(n.point)) {
            log::error!("net {}: duplicate points in maze topology", self.net.name);
            debug_assert!(false, "duplicate points in maze topology");
        }
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groute_common::db::indices::NetId;
    use groute_common::db::{Design, Net, Pin};
    use groute_common::geom::GrPoint;
    use groute_common::util::config::GlobalRoutingConfig;

    fn setup(pins: &[(i32, i32)]) -> (GridGraph, GrNet) {
        let design = Design::uniform("t", 16, 16, 10, 3);
        let graph = GridGraph::new(&design, &GlobalRoutingConfig::default());
        let net = Net {
            name: "m".into(),
            pins: pins
                .iter()
                .enumerate()
                .map(|(i, &(x, y))| Pin {
                    name: format!("p{i}"),
                    access_points: vec![GrPoint::new(0, x, y)],
                })
                .collect(),
            layer_range: None,
        };
        (graph, GrNet::from_design(NetId::new(0), &net))
    }

    #[test]
    fn sparse_grid_wraps_offset() {
        let mut grid = SparseGrid::new(3, 1);
        grid.step();
        assert_eq!(grid.offset, 2);
        grid.step();
        assert_eq!(grid.offset, 0);
        assert_eq!(grid.lines(8, [4, 4].into_iter()), vec![0, 3, 4, 6]);
    }

    #[test]
    fn sparse_graph_keeps_pin_lines() {
        let (graph, net) = setup(&[(1, 2), (9, 13)]);
        let view = graph.extract_wire_cost_view();
        let sparse = SparseGraph::new(&net, &graph, &view, &SparseGrid::new(5, 0));
        assert_eq!(sparse.xs, vec![0, 1, 5, 9, 10, 15]);
        assert_eq!(sparse.ys, vec![0, 2, 5, 10, 13, 15]);
        let v = sparse.vertex(1, 1, 1);
        assert_eq!(sparse.point(v), Point::new(1, 2));
        assert_eq!(sparse.pin_of(v), Some(0));
        assert_eq!(sparse.costs[v][VIA], 0.0);
        assert_eq!(sparse.costs[sparse.vertex(0, 2, 2)][VIA], graph.unit_via_cost());
    }

    #[test]
    fn maze_connects_every_pin() {
        let pins = [(1, 1), (12, 3), (4, 14), (14, 14)];
        let (graph, net) = setup(&pins);
        let view = graph.extract_wire_cost_view();
        let sparse = SparseGraph::new(&net, &graph, &view, &SparseGrid::new(4, 2));
        let mut maze = MazeRoute::new(&net, sparse);
        assert!(maze.run());
        assert_eq!(maze.found_paths().len(), pins.len() - 1);

        let tree = maze.steiner_tree();
        for &(x, y) in &pins {
            let node = tree.nodes.iter().find(|n| n.point == Point::new(x, y));
            assert!(node.is_some_and(|n| n.fixed_layers.is_valid()), "pin ({x}, {y})");
        }
        for node in &tree.nodes {
            for &c in &node.children {
                let (a, b) = (node.point, tree.nodes[c].point);
                assert!(a.x == b.x || a.y == b.y);
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn collinear_pass_through_points_are_folded() {
        let (graph, net) = setup(&[(0, 6), (15, 6)]);
        let view = graph.extract_wire_cost_view();
        let sparse = SparseGraph::new(&net, &graph, &view, &SparseGrid::new(3, 0));
        let mut maze = MazeRoute::new(&net, sparse);
        assert!(maze.run());
        let tree = maze.steiner_tree();
        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.wire_length(), 15);
    }
}
