use std::time::Duration;

use neptune_core::LifecycleParams;

use crate::Cli;

/// Simulation clock and lifecycle settings
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationConfig {
    pub tick_interval: Duration,
    pub lifecycle: LifecycleParams,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            tick_interval: Duration::from_secs(5),
            lifecycle: LifecycleParams::default(),
        }
    }
}

impl From<&Cli> for SimulationConfig {
    fn from(args: &Cli) -> Self {
        let tick_interval = Duration::from_secs(args.tick_interval.max(1));
        SimulationConfig {
            tick_interval,
            lifecycle: LifecycleParams {
                tick_secs: tick_interval.as_secs_f64(),
                route_increment: args.route_increment.clamp(0.0, 1.0),
                docking_radius_km: args.docking_radius_km.max(0.0),
                ..LifecycleParams::default()
            },
        }
    }
}

/// Broadcast hub and observer connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct HubConfig {
    /// Outbound messages buffered per observer before it is dropped
    pub client_queue: usize,
    /// Messages buffered between publishers and the hub loop
    pub broadcast_queue: usize,
    pub write_wait: Duration,
    /// Silence after which an observer counts as dead
    pub pong_wait: Duration,
    /// Must be shorter than `pong_wait`
    pub ping_period: Duration,
    pub initial_send_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        let pong_wait = Duration::from_secs(60);
        HubConfig {
            client_queue: 256,
            broadcast_queue: 256,
            write_wait: Duration::from_secs(10),
            pong_wait,
            ping_period: pong_wait * 9 / 10,
            initial_send_timeout: Duration::from_secs(2),
        }
    }
}

impl From<&Cli> for HubConfig {
    fn from(args: &Cli) -> Self {
        HubConfig {
            client_queue: args.client_queue.max(1),
            ..HubConfig::default()
        }
    }
}
