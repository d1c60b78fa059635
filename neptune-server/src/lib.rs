//! Neptune Server - fleet simulation service
//!
//! Runs the periodic fleet simulation against a data store and streams fleet
//! state and alerts to any number of WebSocket observers.
//!
//! # Subsystems
//!
//! - `hub`: the broadcast hub loop, sole owner of the observer set
//! - `simulation`: the simulation clock driving one engine tick per period
//! - `web`: the axum HTTP server with the `/ws` observer stream

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub mod config;
pub mod hub;
pub mod scheduler;
pub mod seed;
pub mod simulation;
pub mod store;
pub mod web;

#[cfg(test)]
mod testing;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,

    /// Port for the HTTP and WebSocket server
    #[arg(short, long, default_value_t = 8080)]
    pub port: u16,

    /// Address to bind to
    #[arg(short, long, default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub bind: IpAddr,

    /// JSON fleet seed to load at startup
    #[arg(short, long)]
    pub fleet: Option<PathBuf>,

    /// Seconds between simulation ticks
    #[arg(long, default_value_t = 5)]
    pub tick_interval: u64,

    /// Route progress added per tick
    #[arg(long, default_value_t = 0.002, value_parser = parse_fraction)]
    pub route_increment: f64,

    /// Distance from a reserved port at which a vessel docks
    #[arg(long, default_value_t = 10.0, value_parser = parse_distance)]
    pub docking_radius_km: f64,

    /// Outbound queue capacity per observer
    #[arg(long, default_value_t = 256)]
    pub client_queue: usize,
}

impl Cli {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

impl Default for Cli {
    fn default() -> Self {
        Cli::parse_from(["neptune-server"])
    }
}

fn parse_finite(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    if !value.is_finite() {
        return Err(format!("{} is not a finite number", s));
    }
    Ok(value)
}

/// A finite number within `[0, 1]`
fn parse_fraction(s: &str) -> Result<f64, String> {
    let value = parse_finite(s)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(format!("{} is outside 0..=1", value));
    }
    Ok(value)
}

/// A finite, non-negative number
fn parse_distance(s: &str) -> Result<f64, String> {
    let value = parse_finite(s)?;
    if value < 0.0 {
        return Err(format!("{} is negative", value));
    }
    Ok(value)
}
