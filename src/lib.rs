// Power Monitor - sampling, history and chart data behind the dashboard

pub mod config;
pub mod data;
pub mod format;
pub mod history;
pub mod monitor;
pub mod poller;
pub mod powermetrics;
pub mod readout;
pub mod series;
pub mod state;

pub use config::{ConfigError, DashboardConfig};
pub use data::{CpuCore, Gpu, Snapshot};
pub use history::{HISTORY_CAPACITY, HistoryStore};
pub use monitor::{MetricsProvider, MonitorError, ProviderKind, create_provider};
pub use poller::Poller;
pub use readout::Readouts;
pub use series::{CoreSeries, PowerSeries, core_usage_series};
pub use state::{DashboardState, ErrorState, SampleOutcome, SharedState};

// Initialize logging, `info` unless RUST_LOG says otherwise
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
