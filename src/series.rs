//! Chart-ready series derived from the rolling window.
//!
//! Every series is aligned by position with the window: entry `i` of a series
//! belongs to `history.window()[i]` and to `labels[i]`.

use crate::format::format_time_label;
use crate::history::HistoryStore;

pub const CORE_SATURATION: f64 = 0.70;
pub const CORE_LIGHTNESS: f64 = 0.50;

/// Total CPU and GPU power over the window.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PowerSeries {
    pub labels: Vec<String>,
    pub cpu: Vec<f64>,
    pub gpu: Vec<f64>,
}

impl PowerSeries {
    pub fn build(history: &HistoryStore) -> Self {
        let window = history.window();
        let mut series = Self {
            labels: Vec::with_capacity(window.len()),
            cpu: Vec::with_capacity(window.len()),
            gpu: Vec::with_capacity(window.len()),
        };
        for snapshot in window {
            series.labels.push(format_time_label(snapshot.timestamp));
            series.cpu.push(snapshot.total_cpu_power);
            series.gpu.push(snapshot.total_gpu_power);
        }
        series
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Usage history of a single core. `None` marks a window entry that did not
/// report this core id.
#[derive(Debug, Clone, PartialEq)]
pub struct CoreSeries {
    pub core_id: u32,
    pub label: String,
    pub hue: f64,
    pub values: Vec<Option<f64>>,
}

/// One series per core of the current snapshot. Empty when there is no
/// current snapshot.
pub fn core_usage_series(history: &HistoryStore) -> Vec<CoreSeries> {
    let Some(current) = history.current() else {
        return Vec::new();
    };
    let core_count = current.cpu_cores.len();

    current
        .cpu_cores
        .iter()
        .map(|core| CoreSeries {
            core_id: core.id,
            label: format!("Core {}", core.id),
            hue: core_hue(core.id, core_count),
            values: history
                .window()
                .iter()
                .map(|snapshot| snapshot.core(core.id).map(|c| c.usage))
                .collect(),
        })
        .collect()
}

pub fn core_hue(core_id: u32, core_count: usize) -> f64 {
    if core_count == 0 {
        return 0.0;
    }
    f64::from(core_id) * 360.0 / core_count as f64
}

pub fn gpu_hue(gpu_id: u32) -> f64 {
    f64::from((gpu_id.wrapping_mul(40).wrapping_add(200)) % 360)
}

/// HSL (hue in degrees, saturation and lightness in 0..=1) to 8-bit RGB.
pub fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> [u8; 3] {
    let h = hue.rem_euclid(360.0) / 60.0;
    let s = saturation.clamp(0.0, 1.0);
    let l = lightness.clamp(0.0, 1.0);

    let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = l - chroma / 2.0;
    let to_byte = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    [to_byte(r), to_byte(g), to_byte(b)]
}

pub fn core_rgb(core_id: u32, core_count: usize) -> [u8; 3] {
    hsl_to_rgb(core_hue(core_id, core_count), CORE_SATURATION, CORE_LIGHTNESS)
}

pub fn gpu_rgb(gpu_id: u32) -> [u8; 3] {
    hsl_to_rgb(gpu_hue(gpu_id), CORE_SATURATION, CORE_LIGHTNESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::snapshot;

    #[test]
    fn power_series_is_aligned_with_window() {
        let mut history = HistoryStore::new();
        for ts in 0..5 {
            let mut snap = snapshot(1_700_000_000 + ts, &[1.0]);
            snap.total_cpu_power = ts as f64;
            snap.total_gpu_power = ts as f64 / 10.0;
            history.append(snap);
        }

        let series = PowerSeries::build(&history);
        assert_eq!(series.len(), 5);
        assert_eq!(series.cpu, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(series.gpu[4], 0.4);
        assert_eq!(series.labels[0], format_time_label(1_700_000_000));
        assert_eq!(series.labels[4], format_time_label(1_700_000_004));
    }

    #[test]
    fn power_series_survives_failed_tick() {
        let mut history = HistoryStore::new();
        history.append(snapshot(1, &[]));
        history.append(snapshot(2, &[]));
        history.clear_current();

        assert_eq!(PowerSeries::build(&history).len(), 2);
        assert!(core_usage_series(&history).is_empty());
    }

    #[test]
    fn core_series_follow_current_cores() {
        let mut history = HistoryStore::new();
        history.append(snapshot(1, &[10.0, 20.0]));
        history.append(snapshot(2, &[11.0, 21.0]));

        let series = core_usage_series(&history);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].label, "Core 0");
        assert_eq!(series[0].values, vec![Some(10.0), Some(11.0)]);
        assert_eq!(series[1].values, vec![Some(20.0), Some(21.0)]);
    }

    #[test]
    fn missing_cores_become_gaps() {
        let mut history = HistoryStore::new();
        history.append(snapshot(1, &[10.0]));
        let mut reordered = snapshot(2, &[30.0, 40.0, 50.0]);
        reordered.cpu_cores.reverse();
        history.append(snapshot(3, &[12.0, 22.0, 32.0]));
        history.append(reordered);

        let series = core_usage_series(&history);
        assert_eq!(series.len(), 3);
        // Series follow the current snapshot's core order.
        assert_eq!(series[0].core_id, 2);
        assert_eq!(series[0].values, vec![None, Some(32.0), Some(50.0)]);
        assert_eq!(series[2].core_id, 0);
        assert_eq!(series[2].values, vec![Some(10.0), Some(12.0), Some(30.0)]);
        assert_eq!(series[1].hue, 120.0);
    }

    #[test]
    fn core_hue_is_evenly_spread_and_stable() {
        assert_eq!(core_hue(0, 8), 0.0);
        assert_eq!(core_hue(2, 8), 90.0);
        assert_eq!(core_hue(5, 12), 150.0);
        assert_eq!(core_hue(3, 0), 0.0);

        let mut history = HistoryStore::new();
        let mut hues = Vec::new();
        for ts in 0..3 {
            history.append(snapshot(ts, &[1.0, 2.0, 3.0, 4.0]));
            hues.push(core_usage_series(&history)[3].hue);
        }
        assert!(hues.iter().all(|&h| h == 270.0));
    }

    #[test]
    fn gpu_hue_offsets_from_blue() {
        assert_eq!(gpu_hue(0), 200.0);
        assert_eq!(gpu_hue(1), 240.0);
        assert_eq!(gpu_hue(5), 40.0);
    }

    #[test]
    fn hsl_conversion() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), [255, 0, 0]);
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), [0, 255, 0]);
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), [0, 0, 255]);
        assert_eq!(hsl_to_rgb(0.0, 0.0, 1.0), [255, 255, 255]);
        assert_eq!(core_rgb(0, 4), [217, 38, 38]);
    }
}
