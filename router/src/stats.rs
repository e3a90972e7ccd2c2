use crate::grid::GridGraph;
use crate::metrics::Stage;
use crate::net::GrNet;
use groute_common::geom::GrPoint;

/// Summary of one routing run, recomputed from the final trees.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteStatistics {
    /// Wire length in design units.
    pub wire_length: i64,
    /// Wire length in units of the M2 pitch.
    pub wire_length_metric: f64,
    pub num_vias: usize,
    pub total_overflow: f64,
    pub min_resource: f64,
    pub bottleneck: Option<GrPoint>,
    /// Overflowed nets after each stage that ran.
    pub stage_overflows: Vec<(Stage, usize)>,
    pub unrouted_nets: usize,
}

impl RouteStatistics {
    pub fn collect(graph: &GridGraph, nets: &[GrNet], stage_overflows: &[(Stage, usize)]) -> Self {
        let mut wire_length = 0i64;
        let mut num_vias = 0usize;
        let mut unrouted_nets = 0;
        for net in nets {
            let Some(tree) = &net.routing_tree else {
                unrouted_nets += 1;
                continue;
            };
            for (u, v) in tree.edges() {
                if u.layer == v.layer {
                    let dir = graph.layer_direction(u.layer);
                    let (l, h) = (u.get(dir).min(v.get(dir)), u.get(dir).max(v.get(dir)));
                    wire_length += (l..h)
                        .map(|c| graph.edge_length(dir, c as usize) as i64)
                        .sum::<i64>();
                } else {
                    num_vias += u.layer.abs_diff(v.layer);
                }
            }
        }
        let (total_overflow, min_resource, bottleneck) = graph.overflow_summary();
        Self {
            wire_length,
            wire_length_metric: wire_length as f64 / graph.m2_pitch() as f64,
            num_vias,
            total_overflow,
            min_resource,
            bottleneck,
            stage_overflows: stage_overflows.to_vec(),
            unrouted_nets,
        }
    }

    pub fn overflowed_nets(&self) -> usize {
        self.stage_overflows.last().map_or(0, |&(_, n)| n)
    }

    pub fn log(&self) {
        log::info!("Routing statistics:");
        log::info!(
            "  wire length:     {} ({:.1} pitches)",
            self.wire_length,
            self.wire_length_metric
        );
        log::info!("  vias:            {}", self.num_vias);
        log::info!("  total overflow:  {:.2}", self.total_overflow);
        match self.bottleneck {
            Some(edge) => log::info!("  min resource:    {:.2} at {}", self.min_resource, edge),
            None => log::info!("  min resource:    n/a"),
        }
        for (stage, overflowed) in &self.stage_overflows {
            log::info!("  after {}: {} overflowed nets", stage, overflowed);
        }
        if self.unrouted_nets > 0 {
            log::warn!("  {} nets left unrouted", self.unrouted_nets);
        }
    }
}
