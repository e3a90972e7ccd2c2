use crate::stats::RouteStatistics;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    Pattern,
    PatternDetour,
    Maze,
}

impl Stage {
    pub fn number(self) -> usize {
        match self {
            Stage::Pattern => 1,
            Stage::PatternDetour => 2,
            Stage::Maze => 3,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Pattern => "pattern routing",
            Stage::PatternDetour => "pattern routing with detours",
            Stage::Maze => "maze routing",
        };
        write!(f, "stage {} ({})", self.number(), name)
    }
}

/// Receives the progress of one routing run.
pub trait MetricsSink: Send {
    fn stage_started(&mut self, stage: Stage, nets: usize);
    fn stage_finished(&mut self, stage: Stage, overflowed: usize, elapsed: Duration);
    fn net_failed(&mut self, stage: Stage, net: &str, reason: &str);
    fn statistics(&mut self, stats: &RouteStatistics);
}

/// Forwards every event to the `log` facade.
#[derive(Default)]
pub struct LogSink;

impl MetricsSink for LogSink {
    fn stage_started(&mut self, stage: Stage, nets: usize) {
        log::info!("{}: routing {} nets", stage, nets);
    }

    fn stage_finished(&mut self, stage: Stage, overflowed: usize, elapsed: Duration) {
        log::info!(
            "{} done in {:.2}s, {} overflowed nets",
            stage,
            elapsed.as_secs_f64(),
            overflowed
        );
    }

    fn net_failed(&mut self, stage: Stage, net: &str, reason: &str) {
        log::warn!("{}: net {} {}", stage, net, reason);
    }

    fn statistics(&mut self, stats: &RouteStatistics) {
        stats.log();
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MetricEvent {
    StageStarted { stage: Stage, nets: usize },
    StageFinished { stage: Stage, overflowed: usize },
    NetFailed { stage: Stage, net: String, reason: String },
    Statistics(RouteStatistics),
}

/// Keeps every event in memory; clones share the same buffer.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<MetricEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MetricEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn push(&self, event: MetricEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl MetricsSink for RecordingSink {
    fn stage_started(&mut self, stage: Stage, nets: usize) {
        self.push(MetricEvent::StageStarted { stage, nets });
    }

    fn stage_finished(&mut self, stage: Stage, overflowed: usize, _elapsed: Duration) {
        self.push(MetricEvent::StageFinished { stage, overflowed });
    }

    fn net_failed(&mut self, stage: Stage, net: &str, reason: &str) {
        self.push(MetricEvent::NetFailed {
            stage,
            net: net.to_string(),
            reason: reason.to_string(),
        });
    }

    fn statistics(&mut self, stats: &RouteStatistics) {
        self.push(MetricEvent::Statistics(stats.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_clones_share_events() {
        let sink = RecordingSink::new();
        let mut writer = sink.clone();
        writer.stage_started(Stage::Pattern, 4);
        writer.net_failed(Stage::Maze, "n1", "left unconnected");
        writer.stage_finished(Stage::Pattern, 0, Duration::from_millis(3));
        assert_eq!(
            sink.events(),
            vec![
                MetricEvent::StageStarted {
                    stage: Stage::Pattern,
                    nets: 4
                },
                MetricEvent::NetFailed {
                    stage: Stage::Maze,
                    net: "n1".into(),
                    reason: "left unconnected".into()
                },
                MetricEvent::StageFinished {
                    stage: Stage::Pattern,
                    overflowed: 0
                },
            ]
        );
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::PatternDetour.to_string(), "stage 2 (pattern routing with detours)");
        assert_eq!(Stage::Maze.number(), 3);
    }
}
