use crate::algo::{MazeRoute, PatternRoute, SparseGraph, SparseGrid};
use crate::error::RouteError;
use crate::grid::{GridGraph, GridGraphView};
use crate::metrics::{LogSink, MetricsSink, Stage};
use crate::net::GrNet;
use crate::stats::RouteStatistics;
use crate::tree::GrTree;
use crate::utils::guide;
use groute_common::db::Design;
use groute_common::db::indices::NetId;
use groute_common::util::config::GlobalRoutingConfig;
use groute_common::util::profiler::ScopedTimer;
use std::path::Path;

/// Three-stage global router: pattern routing, pattern routing with detours
/// for the nets left overflowed, then maze routing for the rest.
///
/// Nets are routed one at a time in ascending half-perimeter order; every
/// commit changes the costs seen by the next net.
pub struct GlobalRouter {
    graph: GridGraph,
    nets: Vec<GrNet>,
    sink: Box<dyn MetricsSink>,
    stage_overflows: Vec<(Stage, usize)>,
}

impl GlobalRouter {
    pub fn new(design: &Design, config: &GlobalRoutingConfig) -> Result<Self, RouteError> {
        design.validate()?;
        if config.min_routing_layer >= design.num_layers() {
            return Err(RouteError::InvalidMinLayer {
                min: config.min_routing_layer,
                layers: design.num_layers(),
            });
        }

        let graph = {
            let _timer = ScopedTimer::new("building grid graph");
            GridGraph::new(design, config)
        };
        let blocked = graph.extract_blockage_view().count();
        log::info!(
            "Grid graph: {} x {} gcells, {} layers, {} of {} edge cells fully blocked",
            graph.x_size(),
            graph.y_size(),
            graph.num_layers(),
            blocked,
            2 * graph.x_size() * graph.y_size()
        );

        let nets = design
            .nets
            .iter()
            .enumerate()
            .map(|(i, net)| GrNet::from_design(NetId::new(i), net))
            .collect::<Vec<_>>();
        log::info!("Loaded {} nets", nets.len());

        Ok(Self {
            graph,
            nets,
            sink: Box::new(LogSink),
            stage_overflows: Vec::new(),
        })
    }

    pub fn with_sink(mut self, sink: impl MetricsSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn graph(&self) -> &GridGraph {
        &self.graph
    }

    pub fn nets(&self) -> &[GrNet] {
        &self.nets
    }

    pub fn route(&mut self) -> RouteStatistics {
        let _timer = ScopedTimer::new("global routing");
        self.stage_overflows.clear();

        let mut net_indices: Vec<usize> = (0..self.nets.len())
            .filter(|&i| {
                let empty = self.nets[i].num_pins() == 0;
                if empty {
                    log::warn!("net {} has no pins, skipped", self.nets[i].name);
                }
                !empty
            })
            .collect();

        for stage in [Stage::Pattern, Stage::PatternDetour, Stage::Maze] {
            if net_indices.is_empty() {
                break;
            }
            net_indices = self.run_stage(stage, net_indices);
        }
        if !net_indices.is_empty() {
            log::warn!("{} nets remain overflowed", net_indices.len());
        }

        let stats = self.statistics();
        self.sink.statistics(&stats);
        stats
    }

    pub fn statistics(&self) -> RouteStatistics {
        RouteStatistics::collect(&self.graph, &self.nets, &self.stage_overflows)
    }

    pub fn write_guides(&self, path: impl AsRef<Path>) -> Result<(), RouteError> {
        guide::write_guides(path, &self.nets, &self.graph)
    }

    pub fn write_heatmap(&self, path: impl AsRef<Path>) -> Result<(), RouteError> {
        let path = path.as_ref();
        self.graph
            .write_heatmap(path)
            .map_err(|e| RouteError::io(path, e))
    }

    /// Routes `net_indices` in one stage and returns the nets overflowed
    /// afterwards. A later stage whose result overflows more nets than it
    /// was given is rolled back.
    fn run_stage(&mut self, stage: Stage, mut net_indices: Vec<usize>) -> Vec<usize> {
        let timer = ScopedTimer::new(stage.to_string());
        self.sink.stage_started(stage, net_indices.len());
        self.sort_net_indices(&mut net_indices);

        let snapshot: Vec<(usize, Option<GrTree>)> = if stage == Stage::Pattern {
            Vec::new()
        } else {
            net_indices
                .iter()
                .map(|&i| (i, self.nets[i].routing_tree.clone()))
                .collect()
        };

        match stage {
            Stage::Pattern => self.route_pattern(stage, &net_indices, None),
            Stage::PatternDetour => {
                let congestion_view = self.graph.extract_congestion_view();
                self.route_pattern(stage, &net_indices, Some(&congestion_view));
            }
            Stage::Maze => self.route_maze(&net_indices),
        }

        let mut overflowed = self.overflowed_nets();
        if stage != Stage::Pattern && overflowed.len() > net_indices.len() {
            log::warn!(
                "{} raised overflowed nets from {} to {}, restoring previous trees",
                stage,
                net_indices.len(),
                overflowed.len()
            );
            self.restore(snapshot);
            overflowed = self.overflowed_nets();
        }

        self.stage_overflows.push((stage, overflowed.len()));
        self.sink.stage_finished(stage, overflowed.len(), timer.elapsed());
        overflowed
    }

    /// Small nets first; ties keep their original order.
    fn sort_net_indices(&self, net_indices: &mut [usize]) {
        net_indices.sort_by_key(|&i| self.nets[i].half_perimeter());
    }

    fn overflowed_nets(&self) -> Vec<usize> {
        self.nets
            .iter()
            .enumerate()
            .filter(|(_, net)| {
                net.routing_tree
                    .as_ref()
                    .is_some_and(|tree| self.graph.check_overflow_tree(tree) > 0)
            })
            .map(|(i, _)| i)
            .collect()
    }

    fn rip_up(&mut self, net_index: usize) -> Option<GrTree> {
        let tree = self.nets[net_index].routing_tree.take()?;
        self.graph.commit_tree(&tree, true);
        Some(tree)
    }

    fn commit(&mut self, stage: Stage, net_index: usize, tree: Option<GrTree>) {
        match tree {
            Some(tree) => {
                self.graph.commit_tree(&tree, false);
                self.nets[net_index].routing_tree = Some(tree);
            }
            None => {
                self.sink.net_failed(
                    stage,
                    &self.nets[net_index].name,
                    "has no feasible layer assignment",
                );
            }
        }
    }

    fn restore(&mut self, snapshot: Vec<(usize, Option<GrTree>)>) {
        for (net_index, tree) in snapshot {
            self.rip_up(net_index);
            if let Some(tree) = tree {
                self.graph.commit_tree(&tree, false);
                self.nets[net_index].routing_tree = Some(tree);
            }
        }
    }

    fn route_pattern(
        &mut self,
        stage: Stage,
        net_indices: &[usize],
        congestion_view: Option<&GridGraphView<bool>>,
    ) {
        for &net_index in net_indices {
            self.rip_up(net_index);
            let tree = {
                let mut pattern_route = PatternRoute::new(&self.nets[net_index], &self.graph);
                pattern_route.construct_steiner_tree();
                pattern_route.construct_routing_dag();
                if let Some(view) = congestion_view {
                    pattern_route.construct_detours(view);
                }
                pattern_route.run()
            };
            self.commit(stage, net_index, tree);
        }
    }

    fn route_maze(&mut self, net_indices: &[usize]) {
        let mut wire_cost_view = self.graph.extract_wire_cost_view();
        let mut grid = SparseGrid::new(self.graph.config().sparse_interval, 0);

        for &net_index in net_indices {
            if let Some(old) = self.rip_up(net_index) {
                self.graph.update_wire_cost_view(&mut wire_cost_view, &old);
            }

            let net = &self.nets[net_index];
            let sparse = SparseGraph::new(net, &self.graph, &wire_cost_view, &grid);
            let mut maze_route = MazeRoute::new(net, sparse);
            let mut pattern_route = PatternRoute::new(net, &self.graph);
            if maze_route.run() {
                pattern_route.set_steiner_tree(maze_route.steiner_tree());
            } else {
                self.sink.net_failed(
                    Stage::Maze,
                    &net.name,
                    "left pins unconnected in maze search, falling back to pattern routing",
                );
                pattern_route.construct_steiner_tree();
            }
            pattern_route.construct_routing_dag();
            let tree = pattern_route.run();

            if let Some(tree) = &tree {
                self.graph.commit_tree(tree, false);
                self.graph.update_wire_cost_view(&mut wire_cost_view, tree);
            }
            match tree {
                Some(tree) => self.nets[net_index].routing_tree = Some(tree),
                None => self.sink.net_failed(
                    Stage::Maze,
                    &self.nets[net_index].name,
                    "has no feasible layer assignment",
                ),
            }
            grid.step();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use groute_common::geom::GrPoint;

    fn two_pin_design() -> Design {
        let mut design = Design::uniform("t", 12, 12, 10, 4);
        design.add_net("a", vec![vec![GrPoint::new(0, 1, 1)], vec![GrPoint::new(0, 9, 6)]]);
        design.add_net("b", vec![vec![GrPoint::new(0, 3, 3)], vec![GrPoint::new(0, 4, 3)]]);
        design
    }

    #[test]
    fn min_routing_layer_must_exist() {
        let design = Design::uniform("t", 4, 4, 10, 2);
        let config = GlobalRoutingConfig {
            min_routing_layer: 2,
            ..Default::default()
        };
        assert!(matches!(
            GlobalRouter::new(&design, &config),
            Err(RouteError::InvalidMinLayer { min: 2, layers: 2 })
        ));
    }

    #[test]
    fn nets_are_sorted_by_half_perimeter() {
        let router = GlobalRouter::new(&two_pin_design(), &GlobalRoutingConfig::default()).unwrap();
        let mut order = vec![0, 1];
        router.sort_net_indices(&mut order);
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn uncongested_design_finishes_after_first_stage() {
        let mut router = GlobalRouter::new(&two_pin_design(), &GlobalRoutingConfig::default()).unwrap();
        let stats = router.route();
        assert_eq!(stats.stage_overflows, vec![(Stage::Pattern, 0)]);
        assert_eq!(stats.unrouted_nets, 0);
        assert!(router.nets().iter().all(|n| n.routing_tree.is_some()));
        // 8 + 5 gcells for net a, 1 for net b, 10 units each.
        assert_eq!(stats.wire_length, 140);
        assert_eq!(stats.wire_length, router.graph().total_length());
    }
}
