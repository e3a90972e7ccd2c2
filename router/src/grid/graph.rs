use super::view::GridGraphView;
use crate::net::GrNet;
use crate::tree::GrTree;
use groute_common::db::Design;
use groute_common::geom::rtree::SpatialIndex;
use groute_common::geom::{GrPoint, Interval, Point, Rect};
use groute_common::util::config::GlobalRoutingConfig;
use rayon::prelude::*;
use std::collections::HashMap;
use std::io::{BufWriter, Write};
use std::path::Path;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GraphEdge {
    pub capacity: f64,
    pub demand: f64,
}

impl GraphEdge {
    #[inline(always)]
    pub fn resource(&self) -> f64 {
        self.capacity - self.demand
    }
}

/// A pseudo-pin: one selected access cell and the layers it must reach.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessPoint {
    pub point: Point<i32>,
    pub layers: Interval,
}

#[inline(always)]
fn logistic(input: f64, slope: f64) -> f64 {
    1.0 / (1.0 + (input * slope).exp())
}

/// Box covering `along` in dimension `dim` and `across` in the other one.
fn rect_from_spans(dim: usize, along: Interval, across: Interval) -> Rect {
    let mut r = Rect::default();
    *r.min.get_mut(dim) = along.low;
    *r.max.get_mut(dim) = along.high;
    *r.min.get_mut(1 - dim) = across.low;
    *r.max.get_mut(1 - dim) = across.high;
    r
}

/// Capacitated 3-D routing grid shared by every net of one routing run.
///
/// Edge `(layer, x, y)` is the wire segment leaving gcell `(x, y)` towards
/// its successor along the layer direction, so the last column (horizontal
/// layers) or row (vertical layers) never carries capacity.
pub struct GridGraph {
    gridlines: [Vec<i32>; 2],
    centers: [Vec<i32>; 2],
    layer_names: Vec<String>,
    layer_directions: Vec<usize>,
    layer_min_lengths: Vec<i32>,
    m2_pitch: i32,
    x_size: usize,
    y_size: usize,
    num_layers: usize,

    unit_length_wire_cost: f64,
    unit_via_cost: f64,
    unit_length_short_costs: Vec<f64>,
    /// Routing layers (>= min routing layer) grouped by direction.
    same_direction_layers: [Vec<usize>; 2],
    min_short_costs: [f64; 2],

    edges: Vec<GraphEdge>,
    config: GlobalRoutingConfig,

    total_length: i64,
    total_num_vias: i64,
}

impl GridGraph {
    pub fn new(design: &Design, config: &GlobalRoutingConfig) -> Self {
        let x_size = design.x_size();
        let y_size = design.y_size();
        let num_layers = design.num_layers();
        let centers = [0, 1].map(|dim| {
            design.gridlines[dim]
                .windows(2)
                .map(|w| (w[0] + w[1]) / 2)
                .collect::<Vec<_>>()
        });

        let m2_pitch = design.m2_pitch();
        let pitch = m2_pitch as f64;
        let unit_length_short_costs: Vec<f64> = design
            .layers
            .iter()
            .map(|l| config.weight_short_area * l.width as f64 / (pitch * pitch))
            .collect();

        let mut same_direction_layers: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
        let mut min_short_costs = [f64::INFINITY; 2];
        for (idx, layer) in design
            .layers
            .iter()
            .enumerate()
            .skip(config.min_routing_layer)
        {
            let dir = layer.direction.index();
            same_direction_layers[dir].push(idx);
            min_short_costs[dir] = min_short_costs[dir].min(unit_length_short_costs[idx]);
        }

        let mut graph = Self {
            gridlines: design.gridlines.clone(),
            centers,
            layer_names: design.layers.iter().map(|l| l.name.clone()).collect(),
            layer_directions: design.layers.iter().map(|l| l.direction.index()).collect(),
            layer_min_lengths: design.layers.iter().map(|l| l.min_length).collect(),
            m2_pitch,
            x_size,
            y_size,
            num_layers,
            unit_length_wire_cost: config.weight_wire_length / pitch,
            unit_via_cost: config.weight_via_number,
            unit_length_short_costs,
            same_direction_layers,
            min_short_costs,
            edges: vec![GraphEdge::default(); num_layers * x_size * y_size],
            config: config.clone(),
            total_length: 0,
            total_num_vias: 0,
        };
        graph.init_capacity(design);

        log::info!(
            "GridGraph: {}x{} gcells, {} layers, total capacity {:.0}",
            x_size,
            y_size,
            num_layers,
            graph.edges.iter().map(|e| e.capacity).sum::<f64>()
        );
        graph
    }

    fn init_capacity(&mut self, design: &Design) {
        for (layer_idx, layer) in design.layers.iter().enumerate() {
            let dir = layer.direction.index();
            let perp = 1 - dir;
            let n_rows = self.size(perp);
            let n_edges = self.size(dir).saturating_sub(1);

            // Track indices owned by each row; the track on the higher
            // gridline belongs to the next row except for the last one.
            let row_tracks: Vec<Interval> = (0..n_rows)
                .map(|row| {
                    let loc = Interval::new(self.gridlines[perp][row], self.gridlines[perp][row + 1]);
                    let mut tracks = layer.track_range(loc);
                    if tracks.is_valid()
                        && row + 1 != n_rows
                        && layer.track_location(tracks.high) == loc.high
                    {
                        tracks.high -= 1;
                    }
                    tracks
                })
                .collect();

            for (row, tracks) in row_tracks.iter().enumerate() {
                let n_tracks = if tracks.is_valid() { (tracks.range() + 1) as f64 } else { 0.0 };
                for e in 0..n_edges {
                    let (x, y) = if dir == 0 { (e, row) } else { (row, e) };
                    self.edge_mut(layer_idx, x, y).capacity = n_tracks;
                }
            }

            // Metal 1 obstacles are left to pin access.
            if layer_idx == 0 {
                continue;
            }
            let spacing = layer.parallel_spacing + layer.width / 2 - 1;
            let blocked: Vec<(Rect, Interval)> = design
                .obstacles
                .iter()
                .filter(|o| o.layer == layer_idx)
                .map(|o| {
                    let enlarged = o.rect.expanded(perp, spacing.max(0));
                    (enlarged, layer.track_range(enlarged.span(perp)))
                })
                .collect();
            if blocked.is_empty() {
                continue;
            }
            let index = SpatialIndex::bulk_load(blocked.iter().enumerate().map(|(i, (r, _))| (*r, i)));

            for (row, tracks) in row_tracks.iter().enumerate() {
                if !tracks.is_valid() {
                    continue;
                }
                let row_span = Interval::new(self.gridlines[perp][row], self.gridlines[perp][row + 1]);
                for e in 0..n_edges {
                    let edge_span = Interval::new(self.centers[dir][e], self.centers[dir][e + 1]);
                    if edge_span.range() <= 0 {
                        continue;
                    }
                    let hits = index.query(rect_from_spans(dir, edge_span, row_span));
                    if hits.is_empty() {
                        continue;
                    }
                    let gridline = self.gridlines[dir][e + 1];
                    let mut usable = vec![edge_span; (tracks.range() + 1) as usize];
                    for hit in hits {
                        let (rect, obs_tracks) = &blocked[hit];
                        let affected = tracks.intersect(obs_tracks);
                        if !affected.is_valid() {
                            continue;
                        }
                        let obs_span = rect.span(dir);
                        for t in affected.low..=affected.high {
                            let iv = &mut usable[(t - tracks.low) as usize];
                            if obs_span.contains(gridline) {
                                *iv = Interval::point(gridline);
                            } else if obs_span.high < gridline {
                                iv.low = iv.low.max(obs_span.high);
                            } else {
                                iv.high = iv.high.min(obs_span.low);
                            }
                        }
                    }
                    let capacity: f64 = usable
                        .iter()
                        .map(|iv| iv.range().max(0) as f64 / edge_span.range() as f64)
                        .sum();
                    let (x, y) = if dir == 0 { (e, row) } else { (row, e) };
                    self.edge_mut(layer_idx, x, y).capacity = capacity;
                }
            }
        }

        for (layer_idx, layer) in design.layers.iter().enumerate() {
            if layer.adjustment != 0.0 {
                let plane = self.x_size * self.y_size;
                for edge in &mut self.edges[layer_idx * plane..(layer_idx + 1) * plane] {
                    edge.capacity *= 1.0 - layer.adjustment;
                }
            }
        }
    }

    #[inline(always)]
    fn index(&self, layer: usize, x: usize, y: usize) -> usize {
        debug_assert!(
            layer < self.num_layers && x < self.x_size && y < self.y_size,
            "edge ({layer}, {x}, {y}) outside the grid"
        );
        layer * self.x_size * self.y_size + x * self.y_size + y
    }

    #[inline(always)]
    pub fn edge(&self, layer: usize, x: usize, y: usize) -> &GraphEdge {
        let idx = self.index(layer, x, y);
        unsafe { self.edges.get_unchecked(idx) }
    }

    #[inline(always)]
    fn edge_mut(&mut self, layer: usize, x: usize, y: usize) -> &mut GraphEdge {
        let idx = self.index(layer, x, y);
        unsafe { self.edges.get_unchecked_mut(idx) }
    }

    #[inline(always)]
    fn edge_at(&self, layer: usize, p: Point<i32>) -> &GraphEdge {
        self.edge(layer, p.x as usize, p.y as usize)
    }

    pub fn x_size(&self) -> usize {
        self.x_size
    }

    pub fn y_size(&self) -> usize {
        self.y_size
    }

    /// Number of gcells along `dim`.
    pub fn size(&self, dim: usize) -> usize {
        if dim == 0 { self.x_size } else { self.y_size }
    }

    pub fn num_layers(&self) -> usize {
        self.num_layers
    }

    pub fn layer_direction(&self, layer: usize) -> usize {
        self.layer_directions[layer]
    }

    pub fn layer_name(&self, layer: usize) -> &str {
        &self.layer_names[layer]
    }

    pub fn gridline(&self, dim: usize, index: usize) -> i32 {
        self.gridlines[dim][index]
    }

    pub fn gridlines(&self) -> &[Vec<i32>; 2] {
        &self.gridlines
    }

    pub fn m2_pitch(&self) -> i32 {
        self.m2_pitch
    }

    pub fn config(&self) -> &GlobalRoutingConfig {
        &self.config
    }

    pub fn min_routing_layer(&self) -> usize {
        self.config.min_routing_layer
    }

    pub fn unit_via_cost(&self) -> f64 {
        self.unit_via_cost
    }

    pub fn total_length(&self) -> i64 {
        self.total_length
    }

    pub fn total_num_vias(&self) -> i64 {
        self.total_num_vias
    }

    /// Distance between the centres of gcell `index` and `index + 1`.
    #[inline]
    pub fn edge_length(&self, dim: usize, index: usize) -> i32 {
        self.centers[dim][index + 1] - self.centers[dim][index]
    }

    #[inline]
    pub fn resource(&self, layer: usize, x: usize, y: usize) -> f64 {
        self.edge(layer, x, y).resource()
    }

    #[inline]
    pub fn check_overflow(&self, layer: usize, x: usize, y: usize) -> bool {
        self.resource(layer, x, y) < 0.0
    }

    /// Cost of putting `demand` units on the edge leaving `lower`.
    pub fn wire_cost_at(&self, layer: usize, lower: Point<i32>, demand: f64) -> f64 {
        let dir = self.layer_directions[layer];
        let demand_length = demand * self.edge_length(dir, lower.get(dir) as usize) as f64;
        let edge = self.edge_at(layer, lower);
        let congestion = if edge.capacity < 1.0 {
            1.0
        } else {
            logistic(edge.resource(), self.config.cost_logistic_slope)
        };
        demand_length * self.unit_length_wire_cost
            + demand_length * self.unit_length_short_costs[layer] * congestion
    }

    /// Cost of a unit-demand wire from `u` to `v` on `layer`.
    pub fn wire_cost(&self, layer: usize, u: Point<i32>, v: Point<i32>) -> f64 {
        let dir = self.layer_directions[layer];
        debug_assert_eq!(u.get(1 - dir), v.get(1 - dir), "wire {u} -> {v} against layer direction");
        let (l, h) = (u.get(dir).min(v.get(dir)), u.get(dir).max(v.get(dir)));
        (l..h)
            .map(|c| {
                let mut p = u;
                *p.get_mut(dir) = c;
                self.wire_cost_at(layer, p, 1.0)
            })
            .sum()
    }

    /// Edges around `loc` on `layer` and the min-area demand a via there
    /// puts on each of them.
    fn via_footprint(&self, layer: usize, loc: Point<i32>) -> ([Option<Point<i32>>; 2], f64) {
        let dir = self.layer_directions[layer];
        let pos = loc.get(dir);
        let lower = (pos > 0).then(|| loc.shifted(dir, -1));
        let higher = ((pos as usize) + 1 < self.size(dir)).then_some(loc);
        let lower_len = lower.map_or(0, |p| self.edge_length(dir, p.get(dir) as usize));
        let higher_len = higher.map_or(0, |p| self.edge_length(dir, p.get(dir) as usize));
        let total = lower_len + higher_len;
        let demand = if total > 0 {
            self.layer_min_lengths[layer] as f64 / total as f64 * self.config.via_multiplier
        } else {
            0.0
        };
        ([lower, higher], demand)
    }

    /// Cost of a via between `layer` and `layer + 1` at `loc`.
    pub fn via_cost(&self, layer: usize, loc: Point<i32>) -> f64 {
        debug_assert!(layer + 1 < self.num_layers, "via above the top layer");
        let mut cost = self.unit_via_cost;
        for l in layer..=layer + 1 {
            let (sides, demand) = self.via_footprint(l, loc);
            for side in sides.into_iter().flatten() {
                cost += self.wire_cost_at(l, side, demand);
            }
        }
        cost
    }

    pub fn commit(&mut self, layer: usize, lower: Point<i32>, demand: f64) {
        self.edge_mut(layer, lower.x as usize, lower.y as usize).demand += demand;
    }

    pub fn commit_wire(&mut self, layer: usize, lower: Point<i32>, rip_up: bool) {
        let dir = self.layer_directions[layer];
        let length = self.edge_length(dir, lower.get(dir) as usize) as i64;
        if rip_up {
            self.commit(layer, lower, -1.0);
            self.total_length -= length;
        } else {
            self.commit(layer, lower, 1.0);
            self.total_length += length;
        }
    }

    pub fn commit_via(&mut self, layer: usize, loc: Point<i32>, rip_up: bool) {
        debug_assert!(layer + 1 < self.num_layers, "via above the top layer");
        for l in layer..=layer + 1 {
            let (sides, demand) = self.via_footprint(l, loc);
            let delta = if rip_up { -demand } else { demand };
            for side in sides.into_iter().flatten() {
                self.commit(l, side, delta);
            }
        }
        self.total_num_vias += if rip_up { -1 } else { 1 };
    }

    /// Adds (or with `rip_up` removes) the demand of every wire and via of
    /// `tree`.
    pub fn commit_tree(&mut self, tree: &GrTree, rip_up: bool) {
        for (u, v) in tree.edges() {
            if u.layer == v.layer {
                let dir = self.layer_directions[u.layer];
                debug_assert_eq!(u.get(1 - dir), v.get(1 - dir), "non-orthogonal wire {u} -> {v}");
                let (l, h) = (u.get(dir).min(v.get(dir)), u.get(dir).max(v.get(dir)));
                for c in l..h {
                    let mut p = u.xy();
                    *p.get_mut(dir) = c;
                    self.commit_wire(u.layer, p, rip_up);
                }
            } else {
                debug_assert_eq!(u.xy(), v.xy(), "via between different cells {u} -> {v}");
                for l in u.layer.min(v.layer)..u.layer.max(v.layer) {
                    self.commit_via(l, u.xy(), rip_up);
                }
            }
        }
    }

    /// Overflowed edges along the wire `u`-`v` on `layer`.
    pub fn check_overflow_wire(&self, layer: usize, u: Point<i32>, v: Point<i32>) -> usize {
        let dir = self.layer_directions[layer];
        debug_assert_eq!(u.get(1 - dir), v.get(1 - dir));
        let (l, h) = (u.get(dir).min(v.get(dir)), u.get(dir).max(v.get(dir)));
        (l..h)
            .filter(|&c| {
                let mut p = u;
                *p.get_mut(dir) = c;
                self.edge_at(layer, p).resource() < 0.0
            })
            .count()
    }

    /// Overflowed wire edges over the whole tree; vias are not counted.
    pub fn check_overflow_tree(&self, tree: &GrTree) -> usize {
        tree.edges()
            .filter(|(u, v)| u.layer == v.layer)
            .map(|(u, v)| self.check_overflow_wire(u.layer, u.xy(), v.xy()))
            .sum()
    }

    fn accessibility(&self, ap: &GrPoint) -> i32 {
        let layer = ap.layer.max(self.config.min_routing_layer);
        if layer >= self.num_layers {
            return 1;
        }
        let dir = self.layer_directions[layer];
        let mut score = (self.edge_at(layer, ap.xy()).resource() >= 1.0) as i32;
        if ap.get(dir) > 0 {
            score += (self.edge_at(layer, ap.xy().shifted(dir, -1)).resource() >= 1.0) as i32;
        }
        score
    }

    /// Picks one access cell per pin and merges pins that land on the same
    /// cell. Order follows the first pin mapped to each cell.
    pub fn select_access_points(&self, net: &GrNet) -> Vec<AccessPoint> {
        let center = Point::new(net.bbox.span(0).center(), net.bbox.span(1).center());
        let mut selected: Vec<AccessPoint> = Vec::with_capacity(net.num_pins());
        let mut by_cell: HashMap<Point<i32>, usize> = HashMap::new();

        for (pin_idx, candidates) in net.pin_access_points.iter().enumerate() {
            let mut best: Option<(usize, i32, i32)> = None;
            for (idx, ap) in candidates.iter().enumerate() {
                let accessibility = self.accessibility(ap);
                let distance = ap.xy().manhattan(&center);
                let better = match best {
                    None => true,
                    Some((_, a, d)) => accessibility > a || (accessibility == a && distance < d),
                };
                if better {
                    best = Some((idx, accessibility, distance));
                }
            }
            let Some((idx, accessibility, _)) = best else {
                log::error!("pin {} of net {} has no access point", pin_idx, net.name);
                continue;
            };
            if accessibility == 0 {
                log::warn!("pin {} of net {} is hard to access", pin_idx, net.name);
            }

            let point = candidates[idx].xy();
            let slot = *by_cell.entry(point).or_insert_with(|| {
                selected.push(AccessPoint {
                    point,
                    layers: Interval::EMPTY,
                });
                selected.len() - 1
            });
            for ap in candidates.iter().filter(|ap| ap.xy() == point) {
                selected[slot].layers.update(ap.layer as i32);
            }
        }

        let top = self.num_layers as i32 - 1;
        let slack = self.config.pin_layer_slack as i32;
        for ap in &mut selected {
            ap.layers.high = (ap.layers.high + slack).min(top);
        }
        selected
    }

    /// Per direction, true where some routing layer of that direction has
    /// overflowed.
    pub fn extract_congestion_view(&self) -> GridGraphView<bool> {
        let mut view = GridGraphView::new(self.x_size, self.y_size, false);
        let x_size = self.x_size;
        view.data_mut()
            .par_chunks_mut(self.y_size.max(1))
            .enumerate()
            .for_each(|(column, cells)| {
                let (dir, x) = (column / x_size, column % x_size);
                for &layer in &self.same_direction_layers[dir] {
                    for (y, cell) in cells.iter_mut().enumerate() {
                        if self.check_overflow(layer, x, y) {
                            *cell = true;
                        }
                    }
                }
            });
        view
    }

    /// Per direction, true where no routing layer of that direction offers
    /// a full track.
    pub fn extract_blockage_view(&self) -> GridGraphView<bool> {
        let mut view = GridGraphView::new(self.x_size, self.y_size, true);
        let x_size = self.x_size;
        view.data_mut()
            .par_chunks_mut(self.y_size.max(1))
            .enumerate()
            .for_each(|(column, cells)| {
                let (dir, x) = (column / x_size, column % x_size);
                for &layer in &self.same_direction_layers[dir] {
                    for (y, cell) in cells.iter_mut().enumerate() {
                        if self.edge(layer, x, y).capacity >= 1.0 {
                            *cell = false;
                        }
                    }
                }
            });
        view
    }

    fn wire_cost_view_value(&self, dir: usize, x: usize, y: usize) -> f64 {
        let edge_index = if dir == 0 { x } else { y };
        if edge_index + 1 >= self.size(dir) {
            return f64::INFINITY;
        }
        let (mut capacity, mut demand) = (0.0, 0.0);
        for &layer in &self.same_direction_layers[dir] {
            let edge = self.edge(layer, x, y);
            capacity += edge.capacity;
            demand += edge.demand;
        }
        let congestion = if capacity < 1.0 {
            1.0
        } else {
            logistic(capacity - demand, self.config.maze_logistic_slope)
        };
        self.edge_length(dir, edge_index) as f64
            * (self.unit_length_wire_cost + self.min_short_costs[dir] * congestion)
    }

    /// Continuous wire cost per direction with the capacity and demand of
    /// all same-direction routing layers pooled together.
    pub fn extract_wire_cost_view(&self) -> GridGraphView<f64> {
        let mut view = GridGraphView::new(self.x_size, self.y_size, f64::INFINITY);
        let x_size = self.x_size;
        view.data_mut()
            .par_chunks_mut(self.y_size.max(1))
            .enumerate()
            .for_each(|(column, cells)| {
                let (dir, x) = (column / x_size, column % x_size);
                for (y, cell) in cells.iter_mut().enumerate() {
                    *cell = self.wire_cost_view_value(dir, x, y);
                }
            });
        view
    }

    /// Refreshes the cells of `view` touched by `tree` after it was
    /// committed or ripped up.
    pub fn update_wire_cost_view(&self, view: &mut GridGraphView<f64>, tree: &GrTree) {
        let mut update = |dir: usize, p: Point<i32>| {
            let (x, y) = (p.x as usize, p.y as usize);
            view.set(dir, x, y, self.wire_cost_view_value(dir, x, y));
        };
        for (u, v) in tree.edges() {
            if u.layer == v.layer {
                let dir = self.layer_directions[u.layer];
                let (l, h) = (u.get(dir).min(v.get(dir)), u.get(dir).max(v.get(dir)));
                for c in l..h {
                    let mut p = u.xy();
                    *p.get_mut(dir) = c;
                    update(dir, p);
                }
            } else {
                // A via also loads the layer above it.
                for layer in u.layer.min(v.layer)..=u.layer.max(v.layer) {
                    let dir = self.layer_directions[layer];
                    update(dir, u.xy());
                    if u.get(dir) > 0 {
                        update(dir, u.xy().shifted(dir, -1));
                    }
                }
            }
        }
    }

    /// Worst demand/capacity ratio over the routing layers of each gcell,
    /// row-major (`y * x_size + x`).
    pub fn utilization_map(&self) -> Vec<f64> {
        let mut map = vec![0.0f64; self.x_size * self.y_size];
        let min_layer = self.config.min_routing_layer;
        for layer in min_layer..self.num_layers {
            for x in 0..self.x_size {
                for y in 0..self.y_size {
                    let edge = self.edge(layer, x, y);
                    let ratio = if edge.capacity > 0.0 {
                        edge.demand / edge.capacity
                    } else if edge.demand > 0.0 {
                        2.0
                    } else {
                        0.0
                    };
                    let cell = &mut map[y * self.x_size + x];
                    *cell = cell.max(ratio);
                }
            }
        }
        map
    }

    /// Sum of overflow and the edge with the least resource, both over the
    /// routing layers and over edges that have a successor gcell.
    pub fn overflow_summary(&self) -> (f64, f64, Option<GrPoint>) {
        let mut total = 0.0;
        let mut min_resource = f64::INFINITY;
        let mut bottleneck = None;
        for layer in self.config.min_routing_layer..self.num_layers {
            let dir = self.layer_directions[layer];
            for x in 0..self.x_size {
                for y in 0..self.y_size {
                    let edge_index = if dir == 0 { x } else { y };
                    if edge_index + 1 >= self.size(dir) {
                        continue;
                    }
                    let resource = self.resource(layer, x, y);
                    if resource < 0.0 {
                        total -= resource;
                    }
                    if resource < min_resource {
                        min_resource = resource;
                        bottleneck = Some(GrPoint::new(layer, x as i32, y as i32));
                    }
                }
            }
        }
        (total, min_resource, bottleneck)
    }

    pub fn write_heatmap(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        log::info!("Writing heatmap to {}", path.as_ref().display());
        let mut out = BufWriter::new(std::fs::File::create(path)?);
        writeln!(out, "{} {} {}", self.num_layers, self.x_size, self.y_size)?;
        for layer in 0..self.num_layers {
            writeln!(out, "{}", self.layer_names[layer])?;
            for y in 0..self.y_size {
                for x in 0..self.x_size {
                    let sep = if x + 1 == self.x_size { "" } else { " " };
                    write!(out, "{}{}", self.resource(layer, x, y), sep)?;
                }
                writeln!(out)?;
            }
        }
        out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groute_common::db::indices::NetId;
    use groute_common::db::{Net, Obstacle, Pin};

    fn grid(x: usize, y: usize, layers: usize) -> (Design, GridGraph) {
        let design = Design::uniform("t", x, y, 10, layers);
        let graph = GridGraph::new(&design, &GlobalRoutingConfig::default());
        (design, graph)
    }

    fn net(pins: Vec<Vec<GrPoint>>) -> GrNet {
        let net = Net {
            name: "n".into(),
            pins: pins
                .into_iter()
                .enumerate()
                .map(|(i, access_points)| Pin {
                    name: format!("p{i}"),
                    access_points,
                })
                .collect(),
            layer_range: None,
        };
        GrNet::from_design(NetId::new(0), &net)
    }

    #[test]
    fn one_track_per_gcell_except_last_column() {
        let (_, graph) = grid(5, 4, 3);
        assert_eq!(graph.edge(0, 0, 0).capacity, 1.0);
        assert_eq!(graph.edge(0, 4, 0).capacity, 0.0);
        assert_eq!(graph.edge(1, 2, 2).capacity, 1.0);
        assert_eq!(graph.edge(1, 2, 3).capacity, 0.0);
    }

    #[test]
    fn obstacle_blocks_covered_edges() {
        let mut design = Design::uniform("t", 5, 5, 10, 3);
        // Covers the gridline x = 20 on the row y in [10, 20].
        design.obstacles.push(Obstacle {
            layer: 2,
            rect: Rect::from_coords(18, 12, 22, 18),
        });
        let graph = GridGraph::new(&design, &GlobalRoutingConfig::default());
        assert_eq!(graph.edge(2, 1, 1).capacity, 0.0);
        assert_eq!(graph.edge(2, 1, 2).capacity, 1.0);
        assert_eq!(graph.edge(2, 0, 1).capacity, 1.0);
    }

    #[test]
    fn adjustment_scales_capacity() {
        let mut design = Design::uniform("t", 4, 4, 10, 2);
        design.layers[1].adjustment = 0.5;
        let graph = GridGraph::new(&design, &GlobalRoutingConfig::default());
        assert_eq!(graph.edge(1, 0, 0).capacity, 0.5);
    }

    #[test]
    fn wire_cost_rises_with_demand() {
        let (_, mut graph) = grid(6, 6, 3);
        let a = Point::new(0, 2);
        let b = Point::new(4, 2);
        let before = graph.wire_cost(2, a, b);
        assert!(before > 0.0);
        graph.commit(2, Point::new(1, 2), 1.0);
        assert!(graph.wire_cost(2, a, b) > before);
        assert_eq!(graph.wire_cost(2, a, a), 0.0);
    }

    #[test]
    fn commit_then_rip_up_restores_demand() {
        let mut design = Design::uniform("t", 8, 8, 10, 4);
        for layer in &mut design.layers {
            layer.min_length = 7;
        }
        let mut graph = GridGraph::new(&design, &GlobalRoutingConfig::default());
        let mut tree = GrTree::new(GrPoint::new(0, 1, 1));
        let up = tree.add_child(GrTree::ROOT, GrPoint::new(2, 1, 1));
        let east = tree.add_child(up, GrPoint::new(2, 6, 1));
        let mid = tree.add_child(east, GrPoint::new(3, 6, 1));
        tree.add_child(mid, GrPoint::new(3, 6, 5));

        let before: Vec<f64> = graph.edges.iter().map(|e| e.demand).collect();
        graph.commit_tree(&tree, false);
        assert_eq!(graph.total_length(), 90);
        assert_eq!(graph.total_num_vias(), 3);
        assert!(graph.edges.iter().any(|e| e.demand > 0.0));
        graph.commit_tree(&tree, true);
        for (e, b) in graph.edges.iter().zip(before) {
            assert!((e.demand - b).abs() < 1e-9);
        }
        assert_eq!(graph.total_length(), 0);
        assert_eq!(graph.total_num_vias(), 0);
    }

    #[test]
    fn overflow_is_reported_per_wire_and_view() {
        let (_, mut graph) = grid(6, 6, 3);
        let mut tree = GrTree::new(GrPoint::new(2, 0, 3));
        tree.add_child(GrTree::ROOT, GrPoint::new(2, 3, 3));
        graph.commit_tree(&tree, false);
        graph.commit_tree(&tree, false);
        assert_eq!(graph.check_overflow_tree(&tree), 3);
        let view = graph.extract_congestion_view();
        assert!(*view.get(0, 1, 3));
        assert!(!*view.get(1, 1, 3));
        assert!(!*view.get(0, 4, 3));
        let (overflow, min_resource, bottleneck) = graph.overflow_summary();
        assert_eq!(overflow, 3.0);
        assert_eq!(min_resource, -1.0);
        assert_eq!(bottleneck, Some(GrPoint::new(2, 0, 3)));
    }

    #[test]
    fn wire_cost_view_tracks_commits_incrementally() {
        let mut design = Design::uniform("t", 8, 8, 10, 4);
        for layer in &mut design.layers {
            layer.min_length = 7;
        }
        let mut graph = GridGraph::new(&design, &GlobalRoutingConfig::default());
        let mut view = graph.extract_wire_cost_view();
        assert!(view.get(0, 7, 0).is_infinite());

        let mut tree = GrTree::new(GrPoint::new(1, 2, 0));
        let top = tree.add_child(GrTree::ROOT, GrPoint::new(1, 2, 4));
        tree.add_child(top, GrPoint::new(2, 2, 4));
        let mut stub = GrTree::new(GrPoint::new(0, 3, 3));
        let up = stub.add_child(GrTree::ROOT, GrPoint::new(1, 3, 3));
        stub.add_child(up, GrPoint::new(1, 3, 6));

        let assert_fresh = |graph: &GridGraph, view: &GridGraphView<f64>| {
            let fresh = graph.extract_wire_cost_view();
            for dir in 0..2 {
                for x in 0..8 {
                    for y in 0..8 {
                        let (a, b) = (*view.get(dir, x, y), *fresh.get(dir, x, y));
                        assert!(a == b || (a - b).abs() < 1e-9, "({dir}, {x}, {y}): {a} vs {b}");
                    }
                }
            }
        };
        for t in [&tree, &stub] {
            graph.commit_tree(t, false);
            graph.update_wire_cost_view(&mut view, t);
            assert_fresh(&graph, &view);
        }
        graph.commit_tree(&stub, true);
        graph.update_wire_cost_view(&mut view, &stub);
        assert_fresh(&graph, &view);
    }

    #[test]
    fn blockage_view_marks_edges_without_tracks() {
        let (_, graph) = grid(4, 4, 3);
        let view = graph.extract_blockage_view();
        assert!(!*view.get(0, 0, 0));
        assert!(*view.get(0, 3, 0));
        assert!(*view.get(1, 0, 3));
    }

    #[test]
    fn utilization_map_keeps_worst_layer_per_cell() {
        let (_, mut graph) = grid(4, 4, 3);
        graph.commit(1, Point::new(2, 2), 1.0);
        graph.commit(2, Point::new(2, 2), 0.5);
        let map = graph.utilization_map();
        assert_eq!(map.len(), 16);
        assert_eq!(map[2 * 4 + 2], 1.0);
        assert_eq!(map[0], 0.0);
    }

    #[test]
    fn access_points_merge_pins_on_one_cell() {
        let (_, graph) = grid(8, 8, 4);
        let net = net(vec![
            vec![GrPoint::new(0, 2, 2)],
            vec![GrPoint::new(1, 2, 2)],
            vec![GrPoint::new(0, 6, 5), GrPoint::new(0, 7, 7)],
        ]);
        let aps = graph.select_access_points(&net);
        assert_eq!(aps.len(), 2);
        assert_eq!(aps[0].point, Point::new(2, 2));
        assert_eq!(aps[0].layers, Interval::new(0, 3));
        // (7, 7) has no edge towards a successor on layer 1.
        assert_eq!(aps[1].point, Point::new(6, 5));
        assert_eq!(aps[1].layers, Interval::new(0, 2));
    }

    #[test]
    fn heatmap_has_header_and_rows() {
        let (_, graph) = grid(3, 2, 2);
        let dir = std::env::temp_dir().join(format!("groute-heatmap-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("heat.txt");
        graph.write_heatmap(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2 3 2");
        assert_eq!(lines[1], "M1");
        assert_eq!(lines[2], "1 1 0");
        assert_eq!(lines.len(), 1 + 2 * 3);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
