pub mod algo;
pub mod error;
pub mod global_router;
pub mod grid;
pub mod metrics;
pub mod net;
pub mod stats;
pub mod tree;
pub mod utils;

pub use error::RouteError;
pub use global_router::GlobalRouter;
pub use metrics::{LogSink, MetricEvent, MetricsSink, RecordingSink, Stage};
pub use stats::RouteStatistics;

use groute_common::db::Design;
use groute_common::util::config::GlobalRoutingConfig;

/// Routes every net of `design` and returns the router holding the final
/// trees and grid usage.
pub fn route(design: &Design, config: &GlobalRoutingConfig) -> Result<GlobalRouter, RouteError> {
    let mut router = GlobalRouter::new(design, config)?;
    router.route();
    Ok(router)
}
