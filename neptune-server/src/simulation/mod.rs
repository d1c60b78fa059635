//! Fleet Simulation
//!
//! The [`SimulationClock`] subsystem fires the [`Engine`] on a fixed period.
//! Each tick reads a fresh fleet snapshot from the store and, per vessel:
//!
//! 1. recovers vessels in distress that have fuel and no critical component
//! 2. moves vessels under way, along their route or by free roam, burning
//!    fuel and wearing components
//! 3. docks vessels at sea that are near the port of their scheduled berth
//!
//! Alerts raised on the way are deduplicated and handed to the broadcast hub
//! without waiting.
//!
//! # Example
//!
//! ```rust,ignore
//! let engine = Engine::new(store, config.lifecycle).with_hub(hub_handle);
//! let clock = SimulationClock::new(engine, config.tick_interval);
//! subsys.start(SubsystemBuilder::new("simulation", |s| clock.run(s)));
//! ```

mod clock;
mod engine;

pub use clock::SimulationClock;
pub use engine::{Engine, TickReport};
