//! Server configuration: every knob is a CLI flag with an environment
//! variable fallback.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

/// Courier task service.
#[derive(Debug, Parser)]
#[command(name = "courier-server", version, about)]
pub struct Config {
    /// Address the HTTP surface listens on.
    #[arg(long, env = "COURIER_LISTEN_ADDR", default_value = "0.0.0.0:3000")]
    pub listen_addr: SocketAddr,

    /// Base URL of the downstream host; `api.php` is resolved against it.
    #[arg(long, env = "COURIER_DOWNSTREAM_URL")]
    pub downstream_url: String,

    /// Seconds between worker ticks.
    #[arg(long, env = "COURIER_TICK_INTERVAL_SECS", default_value_t = 3)]
    pub tick_interval_secs: u64,

    /// Deadline for one downstream call, in seconds.
    #[arg(long, env = "COURIER_DOWNSTREAM_DEADLINE_SECS", default_value_t = 120)]
    pub downstream_deadline_secs: u64,

    /// Remove the downstream deadline entirely: calls may block
    /// indefinitely, and a hung call stalls every queued task behind it.
    /// For downstreams that are slow by nature.
    #[arg(long, env = "COURIER_NO_DOWNSTREAM_DEADLINE")]
    pub no_downstream_deadline: bool,

    /// Task record directory. When set, tasks persist across restarts in
    /// one JSON file per task; when absent, records live in memory.
    #[arg(long, env = "COURIER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn downstream_deadline(&self) -> Option<Duration> {
        if self.no_downstream_deadline {
            None
        } else {
            Some(Duration::from_secs(self.downstream_deadline_secs))
        }
    }
}
