//! Fixed-interval driver for the decision pipeline. One cycle at a time,
//! each bounded by a timeout; every failure is transient and the loop
//! keeps going.

use std::time::Duration;

use sprout_core::{CycleReport, Pipeline};

pub struct CycleLoop {
    pipeline: Pipeline,
    interval: Duration,
    cycle_timeout: Duration,
}

/// What one tick of the loop produced. `Skipped` carries the error kind
/// label used in the tracing events.
#[derive(Debug)]
pub enum CycleOutcome {
    Completed(CycleReport),
    Skipped(&'static str),
}

impl CycleLoop {
    pub fn new(pipeline: Pipeline, interval: Duration, cycle_timeout: Duration) -> Self {
        Self {
            pipeline,
            interval,
            cycle_timeout,
        }
    }

    /// Run forever. `interval` ticks are not allowed to overlap: a cycle
    /// that runs long simply delays the next tick.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            timeout_secs = self.cycle_timeout.as_secs(),
            "cycle loop started"
        );
        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// One bounded cycle. Never returns an error: anything that goes wrong
    /// means "no decision this cycle" and is logged.
    pub async fn run_once(&self) -> CycleOutcome {
        match tokio::time::timeout(self.cycle_timeout, self.pipeline.run_cycle()).await {
            Ok(Ok(report)) => {
                tracing::info!(
                    trace_id = %report.trace_id,
                    plant_name = %report.plant_name,
                    should_water = report.result.irrigation.should_water,
                    water_ml = report.result.irrigation.water_ml,
                    "cycle completed"
                );
                CycleOutcome::Completed(report)
            }
            Ok(Err(err)) => {
                let kind = err.kind();
                tracing::warn!(error = %err, kind, "cycle skipped");
                CycleOutcome::Skipped(kind)
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.cycle_timeout.as_secs(),
                    "cycle timed out"
                );
                CycleOutcome::Skipped("timeout")
            }
        }
    }
}
