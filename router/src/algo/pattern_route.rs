use super::steiner::SteinerTree;
use crate::grid::{GridGraph, GridGraphView};
use crate::net::GrNet;
use crate::tree::GrTree;
use groute_common::geom::{GrPoint, Interval, Point};

/// Node of the routing DAG. `children` are the topology children (one path
/// group each); `paths` holds, per group, the alternative next nodes.
#[derive(Clone, Debug)]
struct DagNode {
    point: Point<i32>,
    fixed_layers: Interval,
    optional: bool,
    children: Vec<usize>,
    paths: Vec<Vec<usize>>,
    /// Minimum subtree cost when the node is entered on each layer.
    costs: Vec<f64>,
    /// Per layer, per path group: (path index, layer of the child wire).
    best_paths: Vec<Vec<Option<(usize, usize)>>>,
}

impl DagNode {
    fn new(point: Point<i32>, fixed_layers: Interval, optional: bool) -> Self {
        Self {
            point,
            fixed_layers,
            optional,
            children: Vec::new(),
            paths: Vec::new(),
            costs: Vec::new(),
            best_paths: Vec::new(),
        }
    }
}

#[derive(Debug)]
struct Scaffold {
    node: Option<usize>,
    children: Vec<usize>,
}

/// Pattern routing of one net: topology, L-shaped alternatives, optional
/// detours and a per-layer dynamic program for layer assignment.
pub struct PatternRoute<'a> {
    net: &'a GrNet,
    graph: &'a GridGraph,
    steiner: Option<SteinerTree>,
    dag: Vec<DagNode>,
}

impl<'a> PatternRoute<'a> {
    pub fn new(net: &'a GrNet, graph: &'a GridGraph) -> Self {
        Self {
            net,
            graph,
            steiner: None,
            dag: Vec::new(),
        }
    }

    pub fn construct_steiner_tree(&mut self) {
        let access_points = self.graph.select_access_points(self.net);
        if access_points.is_empty() {
            log::error!("net {} has no accessible pin", self.net.name);
            return;
        }
        self.steiner = Some(SteinerTree::construct(&access_points));
    }

    pub fn set_steiner_tree(&mut self, tree: SteinerTree) {
        self.steiner = Some(tree);
    }

    pub fn steiner_tree(&self) -> Option<&SteinerTree> {
        self.steiner.as_ref()
    }

    fn add_node(&mut self, point: Point<i32>, fixed_layers: Interval, optional: bool) -> usize {
        self.dag.push(DagNode::new(point, fixed_layers, optional));
        self.dag.len() - 1
    }

    /// Lowers the topology into the routing DAG rooted at node 0.
    pub fn construct_routing_dag(&mut self) {
        self.dag.clear();
        let Some(steiner) = self.steiner.take() else {
            return;
        };
        let order = steiner.preorder();
        let mut dag_of = vec![0usize; steiner.nodes.len()];
        for &s in &order {
            let node = &steiner.nodes[s];
            dag_of[s] = self.add_node(node.point, node.fixed_layers, false);
        }
        for &s in &order {
            let start = dag_of[s];
            for &child in &steiner.nodes[s].children {
                let end = dag_of[child];
                self.dag[start].children.push(end);
                self.construct_paths(start, end, None);
            }
        }
        self.steiner = Some(steiner);
    }

    /// Adds the ways of reaching `end` from `start` to path group
    /// `group` (a new group when `None`): the straight wire when aligned,
    /// otherwise both L shapes through an optional bend node.
    fn construct_paths(&mut self, start: usize, end: usize, group: Option<usize>) {
        let group = group.unwrap_or_else(|| {
            self.dag[start].paths.push(Vec::new());
            self.dag[start].paths.len() - 1
        });
        let (s, e) = (self.dag[start].point, self.dag[end].point);
        if s.x == e.x || s.y == e.y {
            self.dag[start].paths[group].push(end);
            return;
        }
        for bend in [Point::new(e.x, s.y), Point::new(s.x, e.y)] {
            let mid = self.add_node(bend, Interval::EMPTY, true);
            self.dag[mid].paths = vec![vec![end]];
            self.dag[start].paths[group].push(mid);
        }
    }

    /// Post-order over the DAG from the root; shared nodes appear once.
    fn dag_postorder(&self) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.dag.len());
        if self.dag.is_empty() {
            return order;
        }
        let mut visited = vec![false; self.dag.len()];
        let mut stack = vec![(0usize, false)];
        while let Some((node, expanded)) = stack.pop() {
            if expanded {
                order.push(node);
                continue;
            }
            if visited[node] {
                continue;
            }
            visited[node] = true;
            stack.push((node, true));
            for group in self.dag[node].paths.iter().rev() {
                for &next in group.iter().rev() {
                    stack.push((next, false));
                }
            }
        }
        order
    }

    #[inline]
    fn wire_direction(u: Point<i32>, v: Point<i32>) -> usize {
        if u.y == v.y { 0 } else { 1 }
    }

    /// Adds shifted alternatives for runs of congested wires so the cost
    /// DP can route around them.
    pub fn construct_detours(&mut self, congestion_view: &GridGraphView<bool>) {
        if self.dag.is_empty() {
            return;
        }
        let num_nodes = self.dag.len();
        let mut arena: Vec<Scaffold> = Vec::new();
        let mut roots: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
        let mut open: [Vec<Option<usize>>; 2] = [vec![None; num_nodes], vec![None; num_nodes]];

        for node in self.dag_postorder() {
            let point = self.dag[node].point;
            if self.dag[node].optional {
                debug_assert!(self.dag[node].paths.len() == 1 && self.dag[node].paths[0].len() == 1);
                let path = self.dag[node].paths[0][0];
                let dir = Self::wire_direction(point, self.dag[path].point);
                if open[dir][path].is_none() && congestion_view.check(point, self.dag[path].point) {
                    open[dir][path] = Some(new_scaffold(&mut arena, Some(path), Vec::new()));
                }
                continue;
            }
            for group in 0..self.dag[node].paths.len() {
                for i in 0..self.dag[node].paths[group].len() {
                    let path = self.dag[node].paths[group][i];
                    let path_point = self.dag[path].point;
                    let dir = Self::wire_direction(point, path_point);
                    if !congestion_view.check(point, path_point) {
                        continue;
                    }
                    if self.dag[path].optional {
                        if open[dir][node].is_none() {
                            open[dir][node] = Some(new_scaffold(&mut arena, Some(node), Vec::new()));
                        }
                        continue;
                    }
                    let own = match open[dir][node] {
                        Some(s) => s,
                        None => {
                            let s = new_scaffold(&mut arena, Some(node), Vec::new());
                            open[dir][node] = Some(s);
                            s
                        }
                    };
                    let child = match open[dir][path].take() {
                        Some(s) => s,
                        None => new_scaffold(&mut arena, Some(path), Vec::new()),
                    };
                    arena[own].children.push(child);
                }
            }
            for i in 0..self.dag[node].children.len() {
                let child = self.dag[node].children[i];
                for (dir, dir_roots) in roots.iter_mut().enumerate() {
                    if let Some(s) = open[dir][child].take() {
                        dir_roots.push(new_scaffold(&mut arena, Some(node), vec![s]));
                    }
                }
            }
        }
        for (dir, dir_roots) in roots.iter_mut().enumerate() {
            if let Some(s) = open[dir][0].take() {
                dir_roots.push(new_scaffold(&mut arena, None, vec![s]));
            }
        }

        let graph = self.graph;
        let span = [graph.size(0) as i32, graph.size(1) as i32];
        let (ratio, target) = (
            graph.config().max_detour_ratio,
            graph.config().target_detour_count as i32,
        );
        for (dir, dir_roots) in roots.iter().enumerate() {
            let across = 1 - dir;
            for &scaffold in dir_roots {
                debug_assert_eq!(arena[scaffold].children.len(), 1);
                let (trunk, stems) = self.trunk_and_stems(&arena, scaffold, dir);
                let Some(first) = arena[scaffold].children.first().and_then(|&c| arena[c].node) else {
                    continue;
                };
                let trunk_pos = self.dag[first].point.get(across);
                let original = total_stem_length(&stems, trunk_pos);
                let max_increase = (trunk.range() as f64 * ratio) as i32;

                let mut shift = Interval::point(trunk_pos);
                while shift.low > 0 && total_stem_length(&stems, shift.low - 1) - original <= max_increase {
                    shift.low -= 1;
                }
                while shift.high + 1 < span[across]
                    && total_stem_length(&stems, shift.high + 1) - original <= max_increase
                {
                    shift.high += 1;
                }
                let step = detour_step(trunk_pos - shift.low, shift.high - trunk_pos, target);
                let low = trunk_pos - (trunk_pos - shift.low) / step * step;
                let high = trunk_pos + (shift.high - trunk_pos) / step * step;

                let mut pos = low;
                while pos <= high {
                    let amount = pos - trunk_pos;
                    pos += step;
                    if amount == 0 {
                        continue;
                    }
                    self.add_detour(&arena, scaffold, dir, amount, span[across]);
                }
            }
        }
    }

    fn add_detour(&mut self, arena: &[Scaffold], scaffold: usize, dir: usize, amount: i32, limit: i32) {
        let across = 1 - dir;
        let child_scaffold = arena[scaffold].children[0];
        let Some(tree_node) = arena[child_scaffold].node else {
            return;
        };
        let shifted_pos = self.dag[tree_node].point.get(across) + amount;
        if shifted_pos < 0 || shifted_pos >= limit {
            return;
        }
        match arena[scaffold].node {
            Some(parent) => {
                for group in 0..self.dag[parent].children.len() {
                    if self.dag[parent].children[group] == tree_node {
                        let shifted = self.build_detour(arena, child_scaffold, dir, amount);
                        self.construct_paths(parent, shifted, Some(group));
                    }
                }
            }
            None => {
                if self.dag[tree_node].children.len() != 1 {
                    log::warn!("net {}: detour root does not have exactly one child", self.net.name);
                    return;
                }
                let point = self.dag[tree_node].point.shifted(across, amount);
                let shifted = self.add_node(point, Interval::EMPTY, false);
                self.construct_paths(tree_node, shifted, Some(0));
                self.connect_shifted_children(arena, child_scaffold, shifted, dir, amount);
            }
        }
    }

    /// Shifted copy of the scaffolded run below `scaffold`.
    fn build_detour(&mut self, arena: &[Scaffold], scaffold: usize, dir: usize, amount: i32) -> usize {
        let across = 1 - dir;
        let Some(tree_node) = arena[scaffold].node else {
            return 0;
        };
        let (point, fixed) = (self.dag[tree_node].point, self.dag[tree_node].fixed_layers);
        let shifted = self.add_node(point.shifted(across, amount), Interval::EMPTY, false);
        if fixed.is_valid() {
            // The pin itself stays put and is reached through a stub.
            let pin = self.add_node(point, fixed, false);
            self.construct_paths(shifted, pin, None);
        }
        self.connect_shifted_children(arena, scaffold, shifted, dir, amount);
        shifted
    }

    fn connect_shifted_children(
        &mut self,
        arena: &[Scaffold],
        scaffold: usize,
        shifted: usize,
        dir: usize,
        amount: i32,
    ) {
        let Some(tree_node) = arena[scaffold].node else {
            return;
        };
        for i in 0..self.dag[tree_node].children.len() {
            let child = self.dag[tree_node].children[i];
            let scaffolded = arena[scaffold]
                .children
                .iter()
                .copied()
                .find(|&c| arena[c].node == Some(child));
            let target = match scaffolded {
                Some(c) => self.build_detour(arena, c, dir, amount),
                None => child,
            };
            self.construct_paths(shifted, target, None);
        }
    }

    /// Extent of the run along `dir` and the across-coordinates of every
    /// branch hanging off it.
    fn trunk_and_stems(&self, arena: &[Scaffold], scaffold: usize, dir: usize) -> (Interval, Vec<i32>) {
        let across = 1 - dir;
        let mut trunk = Interval::EMPTY;
        let mut stems = Vec::new();
        if let Some(node) = arena[scaffold].node {
            let p = self.dag[node].point;
            stems.push(p.get(across));
            trunk.update(p.get(dir));
        }
        let mut stack = arena[scaffold].children.clone();
        while let Some(s) = stack.pop() {
            let Some(node) = arena[s].node else {
                continue;
            };
            let p = self.dag[node].point;
            trunk.update(p.get(dir));
            if self.dag[node].fixed_layers.is_valid() {
                stems.push(p.get(across));
            }
            for &child in &self.dag[node].children {
                match arena[s].children.iter().find(|&&c| arena[c].node == Some(child)) {
                    Some(&c) => stack.push(c),
                    None => {
                        let cp = self.dag[child].point;
                        stems.push(cp.get(across));
                        trunk.update(cp.get(dir));
                    }
                }
            }
        }
        stems.sort_unstable();
        (trunk, stems)
    }

    /// Runs the layer-assignment DP and returns the routing tree, or `None`
    /// when no feasible assignment exists.
    pub fn run(&mut self) -> Option<GrTree> {
        if self.dag.is_empty() {
            return None;
        }
        self.calculate_routing_costs();
        self.routing_tree()
    }

    fn calculate_routing_costs(&mut self) {
        let graph = self.graph;
        let num_layers = graph.num_layers();
        let min_layer = graph.min_routing_layer();

        for node in self.dag_postorder() {
            let point = self.dag[node].point;
            let groups = self.dag[node].paths.len();

            // group -> layer -> (cost, path index)
            let mut child_costs = vec![vec![(f64::INFINITY, None::<usize>); num_layers]; groups];
            for (group, costs) in child_costs.iter_mut().enumerate() {
                for (path_idx, &path) in self.dag[node].paths[group].iter().enumerate() {
                    let path_point = self.dag[path].point;
                    let dir = if point.x == path_point.x { 1 } else { 0 };
                    debug_assert_eq!(point.get(1 - dir), path_point.get(1 - dir));
                    for layer in min_layer..num_layers {
                        if graph.layer_direction(layer) != dir || !self.net.is_inside_layer_range(layer) {
                            continue;
                        }
                        let cost = self.dag[path].costs[layer] + graph.wire_cost(layer, point, path_point);
                        if cost < costs[layer].0 {
                            costs[layer] = (cost, Some(path_idx));
                        }
                    }
                }
            }

            let mut via_costs = vec![0.0; num_layers];
            for layer in 1..num_layers {
                via_costs[layer] = via_costs[layer - 1] + graph.via_cost(layer - 1, point);
            }
            let fixed = self.dag[node].fixed_layers;
            let fixed_low = (fixed.low.min(num_layers as i32 - 1)).max(0) as usize;
            let fixed_high = (fixed.high.max(min_layer as i32)) as usize;

            let mut costs = vec![f64::INFINITY; num_layers];
            let mut best_paths = vec![vec![None; groups]; num_layers];
            for low in 0..=fixed_low {
                let mut min_child = vec![f64::INFINITY; groups];
                let mut best = vec![None; groups];
                for layer in low..num_layers {
                    for group in 0..groups {
                        let (cost, path_idx) = child_costs[group][layer];
                        if cost < min_child[group] {
                            min_child[group] = cost;
                            best[group] = path_idx.map(|p| (p, layer));
                        }
                    }
                    if layer >= fixed_high {
                        let cost = via_costs[layer] - via_costs[low] + min_child.iter().sum::<f64>();
                        if cost < costs[layer] {
                            costs[layer] = cost;
                            best_paths[layer] = best.clone();
                        }
                    }
                }
                for layer in (low..num_layers - 1).rev() {
                    if costs[layer + 1] < costs[layer] {
                        costs[layer] = costs[layer + 1];
                        best_paths[layer] = best_paths[layer + 1].clone();
                    }
                }
            }
            self.dag[node].costs = costs;
            self.dag[node].best_paths = best_paths;
        }
    }

    fn routing_tree(&self) -> Option<GrTree> {
        let root = &self.dag[0];
        let num_layers = self.graph.num_layers();
        if root.paths.is_empty() {
            let layer = if root.fixed_layers.is_valid() {
                root.fixed_layers.low as usize
            } else {
                self.graph.min_routing_layer()
            };
            return Some(GrTree::new(GrPoint::new(layer, root.point.x, root.point.y)));
        }

        let mut root_layer = None;
        let mut min_cost = f64::INFINITY;
        for (layer, &cost) in root.costs.iter().enumerate() {
            if cost < min_cost {
                min_cost = cost;
                root_layer = Some(layer);
            }
        }
        let Some(root_layer) = root_layer else {
            log::error!("net {}: no feasible layer assignment", self.net.name);
            return None;
        };

        let mut tree = GrTree::new(GrPoint::new(root_layer, root.point.x, root.point.y));
        // (dag node, layer it is entered on, tree parent)
        let mut stack: Vec<(usize, usize, Option<usize>)> = vec![(0, root_layer, None)];
        while let Some((node, layer, parent)) = stack.pop() {
            let dag_node = &self.dag[node];
            let at = |l: usize| GrPoint::new(l, dag_node.point.x, dag_node.point.y);
            let here = match parent {
                None => GrTree::ROOT,
                Some(p) => tree.add_child(p, at(layer)),
            };
            let (mut lowest, mut highest) = (here, here);

            if !dag_node.paths.is_empty() {
                let mut on_layer: Vec<Vec<usize>> = vec![Vec::new(); num_layers];
                for (group, paths) in dag_node.paths.iter().enumerate() {
                    let Some((path_idx, child_layer)) = dag_node.best_paths[layer][group] else {
                        log::error!("net {}: unresolved path at {}", self.net.name, dag_node.point);
                        return None;
                    };
                    on_layer[child_layer].push(paths[path_idx]);
                }
                for &path in &on_layer[layer] {
                    stack.push((path, layer, Some(here)));
                }
                for l in (0..layer).rev() {
                    if !on_layer[l].is_empty() {
                        lowest = tree.add_child(lowest, at(l));
                        for &path in &on_layer[l] {
                            stack.push((path, l, Some(lowest)));
                        }
                    }
                }
                for l in layer + 1..num_layers {
                    if !on_layer[l].is_empty() {
                        highest = tree.add_child(highest, at(l));
                        for &path in &on_layer[l] {
                            stack.push((path, l, Some(highest)));
                        }
                    }
                }
            }

            let fixed = dag_node.fixed_layers;
            if fixed.is_valid() {
                if (tree.point(lowest).layer as i32) > fixed.low {
                    tree.add_child(lowest, at(fixed.low as usize));
                }
                if (tree.point(highest).layer as i32) < fixed.high {
                    tree.add_child(highest, at(fixed.high as usize));
                }
            }
        }
        Some(tree)
    }
}

fn new_scaffold(arena: &mut Vec<Scaffold>, node: Option<usize>, children: Vec<usize>) -> usize {
    arena.push(Scaffold { node, children });
    arena.len() - 1
}

fn total_stem_length(stems: &[i32], pos: i32) -> i32 {
    stems.iter().map(|s| (s - pos).abs()).sum()
}

/// Smallest step that leaves at most `target` shifted positions on the
/// two sides of the trunk together.
fn detour_step(below: i32, above: i32, target: i32) -> i32 {
    let mut step = 1;
    while below / step + above / step > target {
        step += 1;
    }
    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use groute_common::db::indices::NetId;
    use groute_common::db::{Design, Net, Pin};
    use groute_common::util::config::GlobalRoutingConfig;

    fn net_of(pins: &[(usize, i32, i32)]) -> GrNet {
        let net = Net {
            name: "n".into(),
            pins: pins
                .iter()
                .enumerate()
                .map(|(i, &(l, x, y))| Pin {
                    name: format!("p{i}"),
                    access_points: vec![GrPoint::new(l, x, y)],
                })
                .collect(),
            layer_range: None,
        };
        GrNet::from_design(NetId::new(0), &net)
    }

    fn graph(x: usize, y: usize, layers: usize) -> GridGraph {
        GridGraph::new(&Design::uniform("t", x, y, 10, layers), &GlobalRoutingConfig::default())
    }

    fn connected_pins(tree: &GrTree, pins: &[(i32, i32)]) -> bool {
        pins.iter()
            .all(|&(x, y)| tree.preorder().iter().any(|&n| tree.point(n).xy() == Point::new(x, y)))
    }

    #[test]
    fn detour_step_is_smallest_fitting() {
        assert_eq!(detour_step(3, 4, 20), 1);
        assert_eq!(detour_step(30, 10, 20), 2);
        assert_eq!(detour_step(0, 0, 0), 1);
        assert_eq!(detour_step(5, 5, 0), 6);
    }

    #[test]
    fn single_pin_net_gives_one_node() {
        let graph = graph(6, 6, 3);
        let net = net_of(&[(0, 2, 2), (0, 2, 2)]);
        let mut pr = PatternRoute::new(&net, &graph);
        pr.construct_steiner_tree();
        pr.construct_routing_dag();
        let tree = pr.run().unwrap();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root(), GrPoint::new(0, 2, 2));
        assert!(tree.children(GrTree::ROOT).is_empty());
    }

    #[test]
    fn straight_net_has_no_bends() {
        let graph = graph(10, 10, 3);
        let net = net_of(&[(0, 1, 4), (0, 7, 4)]);
        let mut pr = PatternRoute::new(&net, &graph);
        pr.construct_steiner_tree();
        pr.construct_routing_dag();
        assert_eq!(pr.dag.len(), 2);
        assert!(pr.dag.iter().all(|n| !n.optional));
        let tree = pr.run().unwrap();
        assert!(connected_pins(&tree, &[(1, 4), (7, 4)]));
        // Wire on the only horizontal routing layer plus via stacks down to
        // the pins and up to the slack layer.
        let wires: Vec<_> = tree.edges().filter(|(u, v)| u.layer == v.layer).collect();
        assert_eq!(wires.len(), 1);
        assert_eq!(wires[0].0.layer, 2);
        assert!(tree.edges().all(|(u, v)| u.y == 4 && v.y == 4));

        // Best root cost: the direct wire on layer 2 plus a full via stack
        // from layer 0 to layer 2 at each pin.
        let stack = |x: i32| graph.via_cost(0, Point::new(x, 4)) + graph.via_cost(1, Point::new(x, 4));
        let expected = stack(1) + stack(7) + graph.wire_cost(2, Point::new(1, 4), Point::new(7, 4));
        let best = pr.dag[0].costs.iter().copied().fold(f64::INFINITY, f64::min);
        assert!((best - expected).abs() < 1e-9, "{best} vs {expected}");
    }

    #[test]
    fn diagonal_pins_get_two_l_shapes() {
        let graph = graph(10, 10, 3);
        let net = net_of(&[(0, 1, 1), (0, 6, 5)]);
        let mut pr = PatternRoute::new(&net, &graph);
        pr.construct_steiner_tree();
        pr.construct_routing_dag();
        assert_eq!(pr.dag.iter().filter(|n| n.optional).count(), 2);
        let tree = pr.run().unwrap();
        assert!(connected_pins(&tree, &[(1, 1), (6, 5)]));
        let length: i32 = tree
            .edges()
            .filter(|(u, v)| u.layer == v.layer)
            .map(|(u, v)| u.xy().manhattan(&v.xy()))
            .sum();
        assert_eq!(length, 9);
    }

    #[test]
    fn congestion_view_triggers_detour() {
        let graph = graph(20, 10, 3);
        let net = net_of(&[(0, 2, 5), (0, 12, 5)]);
        let mut view = GridGraphView::new(20, 10, false);
        for x in 2..12 {
            view.set(0, x, 5, true);
        }
        let mut pr = PatternRoute::new(&net, &graph);
        pr.construct_steiner_tree();
        pr.construct_routing_dag();
        let before = pr.dag.len();
        pr.construct_detours(&view);
        assert!(pr.dag.len() > before);
        let root_paths = &pr.dag[0].paths[0];
        assert!(root_paths.len() > 1);
        assert!(root_paths.iter().any(|&p| pr.dag[p].point.y != 5));
        let tree = pr.run().unwrap();
        assert!(connected_pins(&tree, &[(2, 5), (12, 5)]));
    }

    #[test]
    fn layer_range_outside_grid_is_infeasible() {
        let graph = graph(8, 8, 3);
        let mut net = net_of(&[(0, 1, 1), (0, 5, 1)]);
        net.layer_range = Some(Interval::new(7, 8));
        let mut pr = PatternRoute::new(&net, &graph);
        pr.construct_steiner_tree();
        pr.construct_routing_dag();
        assert!(pr.run().is_none());
    }
}
