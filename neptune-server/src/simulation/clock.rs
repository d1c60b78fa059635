use std::future::Future;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_graceful_shutdown::SubsystemHandle;

use super::Engine;

/// Fires one engine tick per period
///
/// A tick runs to completion on the clock's own task before the next firing
/// is looked at, so ticks never overlap. Firings missed while a tick was
/// running are skipped rather than queued.
pub struct SimulationClock {
    engine: Engine,
    period: Duration,
}

impl SimulationClock {
    pub fn new(engine: Engine, period: Duration) -> Self {
        SimulationClock { engine, period }
    }

    pub async fn run(self, subsys: SubsystemHandle) -> anyhow::Result<()> {
        self.run_until(subsys.on_shutdown_requested()).await;
        Ok(())
    }

    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        log::info!("simulation: running, one tick every {:?}", self.period);

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    log::debug!("simulation: shutdown");
                    break;
                },

                _ = ticker.tick() => {
                    let started = Instant::now();
                    match self.engine.tick().await {
                        Ok(report) => log::debug!(
                            "simulation: tick over {} vessels in {:?}, {} skipped, {} alerts",
                            report.vessels,
                            started.elapsed(),
                            report.failed,
                            report.alerts.len()
                        ),
                        Err(e) => log::error!("simulation: cannot load fleet snapshot: {}", e),
                    }
                },
            }
        }
    }
}
