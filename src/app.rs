use eframe::egui::{self, Color32, RichText};
use egui_plot::{Legend, Line, Plot, PlotPoints};
use power_monitor::format::{format_frequency, format_percent, format_power};
use power_monitor::series::{CORE_LIGHTNESS, CORE_SATURATION, core_rgb, gpu_rgb, hsl_to_rgb};
use power_monitor::{
    CoreSeries, Poller, PowerSeries, Readouts, SharedState, Snapshot, core_usage_series,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const VIEW_KEY: &str = "view_settings";
const REPAINT_EVERY: Duration = Duration::from_millis(250);

const CPU_POWER_COLOR: Color32 = Color32::from_rgb(255, 99, 132);
const GPU_POWER_COLOR: Color32 = Color32::from_rgb(75, 192, 192);
const MEMORY_COLOR: Color32 = Color32::from_rgb(0, 128, 255);

// Display toggles, persisted between runs. History is not.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct ViewSettings {
    show_core_chart: bool,
    show_gpu_details: bool,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            show_core_chart: true,
            show_gpu_details: true,
        }
    }
}

// Everything one frame needs, copied out under a single lock.
struct Readings {
    readouts: Readouts,
    current: Option<Snapshot>,
    power: PowerSeries,
    cores: Vec<CoreSeries>,
    error: Option<String>,
}

pub struct PowerMonitorApp {
    state: SharedState,
    // Dropping the app stops polling.
    _poller: Poller,
    view: ViewSettings,
}

impl PowerMonitorApp {
    pub fn new(cc: &eframe::CreationContext<'_>, state: SharedState, poller: Poller) -> Self {
        let mut style = (*cc.egui_ctx.style()).clone();
        style.visuals.dark_mode = true;
        cc.egui_ctx.set_style(style);

        let view = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, VIEW_KEY))
            .unwrap_or_default();

        Self {
            state,
            _poller: poller,
            view,
        }
    }

    fn readings(&self) -> Readings {
        self.state.read(|state| Readings {
            readouts: Readouts::from_current(state.current()),
            current: state.current().cloned(),
            power: PowerSeries::build(state.history()),
            cores: core_usage_series(state.history()),
            error: state.error().get().map(str::to_owned),
        })
    }
}

fn rgb([r, g, b]: [u8; 3]) -> Color32 {
    Color32::from_rgb(r, g, b)
}

// Maps integer x positions back to the window's time labels.
fn time_axis(
    labels: Vec<String>,
) -> impl Fn(egui_plot::GridMark, &std::ops::RangeInclusive<f64>) -> String {
    move |mark, _range| {
        if mark.value.fract() != 0.0 || mark.value < 0.0 {
            return String::new();
        }
        labels.get(mark.value as usize).cloned().unwrap_or_default()
    }
}

fn stat_row(ui: &mut egui::Ui, name: &str, value: &str) {
    ui.horizontal(|ui| {
        ui.label(name);
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.label(RichText::new(value).strong());
        });
    });
}

fn power_card(ui: &mut egui::Ui, readings: &Readings) {
    ui.heading("⚡ Power Consumption");
    stat_row(ui, "CPU Power:", &readings.readouts.cpu_power);
    stat_row(ui, "GPU Power:", &readings.readouts.gpu_power);
    stat_row(ui, "Total Power:", &readings.readouts.total_power);

    let cpu_points: PlotPoints = readings
        .power
        .cpu
        .iter()
        .enumerate()
        .map(|(i, &watts)| [i as f64, watts])
        .collect();
    let gpu_points: PlotPoints = readings
        .power
        .gpu
        .iter()
        .enumerate()
        .map(|(i, &watts)| [i as f64, watts])
        .collect();

    Plot::new("power_plot")
        .view_aspect(2.5)
        .legend(Legend::default())
        .include_y(0.0)
        .y_axis_label("W")
        .x_axis_formatter(time_axis(readings.power.labels.clone()))
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new("CPU Power", cpu_points).color(CPU_POWER_COLOR));
            plot_ui.line(Line::new("GPU Power", gpu_points).color(GPU_POWER_COLOR));
        });

    ui.label(format!("Carbon Intensity: {}", readings.readouts.carbon_intensity));
}

fn cpu_card(ui: &mut egui::Ui, readings: &Readings, view: &mut ViewSettings) {
    ui.heading("🧮 CPU Metrics");
    if let Some(current) = &readings.current {
        let count = current.cpu_cores.len();
        egui::Grid::new("cpu_grid")
            .striped(true)
            .spacing([12.0, 6.0])
            .show(ui, |ui| {
                for core in &current.cpu_cores {
                    ui.label(format!("Core {}", core.id));
                    ui.label(format_percent(core.usage));
                    ui.label(format_frequency(core.frequency));
                    ui.add(
                        egui::ProgressBar::new((core.usage / 100.0).clamp(0.0, 1.0) as f32)
                            .fill(rgb(core_rgb(core.id, count)))
                            .desired_width(160.0),
                    );
                    ui.end_row();
                }
            });
    }

    ui.checkbox(&mut view.show_core_chart, "Per-core usage chart");
    if !view.show_core_chart {
        return;
    }
    Plot::new("core_plot")
        .view_aspect(2.5)
        .legend(Legend::default())
        .include_y(0.0)
        .include_y(100.0)
        .y_axis_label("%")
        .x_axis_formatter(time_axis(readings.power.labels.clone()))
        .show(ui, |plot_ui| {
            for series in &readings.cores {
                let points: PlotPoints = series
                    .values
                    .iter()
                    .enumerate()
                    .filter_map(|(i, value)| value.map(|usage| [i as f64, usage]))
                    .collect();
                let color = rgb(hsl_to_rgb(series.hue, CORE_SATURATION, CORE_LIGHTNESS));
                plot_ui.line(Line::new(series.label.as_str(), points).color(color));
            }
        });
}

fn memory_card(ui: &mut egui::Ui, readings: &Readings) {
    ui.heading("💾 Memory Usage");
    ui.add(
        egui::ProgressBar::new(readings.readouts.memory_fraction as f32)
            .fill(MEMORY_COLOR)
            .show_percentage(),
    );
    ui.horizontal(|ui| {
        ui.label(format!("Used: {}", readings.readouts.memory_used));
        ui.separator();
        ui.label(format!("Total: {}", readings.readouts.memory_total));
    });
}

fn gpu_card(ui: &mut egui::Ui, readings: &Readings, view: &mut ViewSettings) {
    ui.heading("🎮 GPU Metrics");
    stat_row(ui, "Total Power:", &readings.readouts.gpu_power);
    stat_row(ui, "Average Usage:", &readings.readouts.gpu_usage);
    ui.add(egui::ProgressBar::new(readings.readouts.gpu_usage_fraction as f32).fill(GPU_POWER_COLOR));

    ui.checkbox(&mut view.show_gpu_details, "Per-GPU details");
    let Some(current) = readings.current.as_ref().filter(|_| view.show_gpu_details) else {
        return;
    };
    for gpu in &current.gpus {
        egui::Frame::group(ui.style()).show(ui, |ui| {
            ui.label(RichText::new(format!("GPU {}", gpu.id)).strong());
            stat_row(ui, "Usage:", &format_percent(gpu.usage));
            stat_row(ui, "Frequency:", &format_frequency(gpu.frequency));
            stat_row(ui, "Power:", &format_power(gpu.power));
            ui.add(
                egui::ProgressBar::new((gpu.usage / 100.0).clamp(0.0, 1.0) as f32)
                    .fill(rgb(gpu_rgb(gpu.id))),
            );
        });
    }
}

impl eframe::App for PowerMonitorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let readings = self.readings();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("🚀 System Monitor");
            if let Some(error) = &readings.error {
                ui.label(RichText::new(error).color(Color32::LIGHT_RED).strong());
            }
            ui.add_space(8.0);

            egui::ScrollArea::vertical().show(ui, |ui| {
                egui::Frame::group(ui.style()).show(ui, |ui| power_card(ui, &readings));
                ui.add_space(12.0);
                egui::Frame::group(ui.style()).show(ui, |ui| cpu_card(ui, &readings, &mut self.view));
                ui.add_space(12.0);
                egui::Frame::group(ui.style()).show(ui, |ui| memory_card(ui, &readings));
                ui.add_space(12.0);
                egui::Frame::group(ui.style()).show(ui, |ui| gpu_card(ui, &readings, &mut self.view));
            });
        });

        ctx.request_repaint_after(REPAINT_EVERY);
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, VIEW_KEY, &self.view);
    }
}
