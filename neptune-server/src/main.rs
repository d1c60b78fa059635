use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_graceful_shutdown::{SubsystemBuilder, SubsystemHandle, Toplevel};

use neptune_server::config::{HubConfig, SimulationConfig};
use neptune_server::hub::Hub;
use neptune_server::scheduler::BerthScheduler;
use neptune_server::seed::FleetSeed;
use neptune_server::simulation::{Engine, SimulationClock};
use neptune_server::store::{FleetStore, MemoryStore};
use neptune_server::web::{AppState, Web};
use neptune_server::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::new()
        .filter_level(args.verbose.log_level_filter())
        .parse_default_env()
        .init();

    let store: Arc<dyn FleetStore> = match &args.fleet {
        Some(path) => {
            let seed = FleetSeed::load(path).into_diagnostic()?;
            Arc::new(MemoryStore::from_seed(seed).into_diagnostic()?)
        }
        None => {
            log::warn!("No --fleet given, starting with an empty fleet");
            Arc::new(MemoryStore::new())
        }
    };

    Toplevel::new(|s| async move { start(s, args, store) })
        .catch_signals()
        .handle_shutdown_requests(Duration::from_millis(3000))
        .await
        .map_err(Into::into)
}

fn start(subsys: SubsystemHandle, args: Cli, store: Arc<dyn FleetStore>) {
    let simulation = SimulationConfig::from(&args);
    let hub_config = HubConfig::from(&args);

    let (hub, hub_handle) = Hub::new(&hub_config);
    subsys.start(SubsystemBuilder::new("hub", |s| hub.run(s)));

    let engine = Engine::new(store.clone(), simulation.lifecycle.clone()).with_hub(hub_handle.clone());
    let clock = SimulationClock::new(engine, simulation.tick_interval);
    subsys.start(SubsystemBuilder::new("simulation", |s| clock.run(s)));

    let state = AppState {
        scheduler: Arc::new(BerthScheduler::new(store.clone())),
        store,
        hub: hub_handle,
        hub_config,
        assigned_route_speed_kn: simulation.lifecycle.assigned_route_speed_kn,
    };
    let web = Web::new(args.bind_addr(), state);
    subsys.start(SubsystemBuilder::new("web", |s| web.run(s)));
}
