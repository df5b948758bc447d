mod app;

use app::PowerMonitorApp;
use eframe::egui::ViewportBuilder;
use power_monitor::{DashboardConfig, Poller, SharedState, create_provider};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    power_monitor::init_logging();
    log::info!("Starting Power Monitor");

    let config = DashboardConfig::load().inspect_err(|e| log::error!("{e}"))?;
    let provider = create_provider(config.provider, config.carbon_intensity)
        .inspect_err(|e| log::error!("No usable metrics provider: {e}"))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .thread_name("metrics-worker")
        .build()?;

    let state = SharedState::with_capacity(config.history_capacity);
    let mut poller = Poller::new(
        Arc::from(provider),
        state.clone(),
        config.poll_interval(),
        runtime.handle().clone(),
    );
    poller.start();

    let native_options = eframe::NativeOptions {
        viewport: ViewportBuilder::default().with_inner_size([1000.0, 800.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Power Monitor",
        native_options,
        Box::new(move |cc| Ok(Box::new(PowerMonitorApp::new(cc, state, poller)))),
    )?;
    Ok(())
}
