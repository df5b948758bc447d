//! Parsers for the text printed by macOS `powermetrics` and `vm_stat`.
//!
//! Missing or malformed fields read as zero; a partial report still yields a
//! snapshot.

use crate::data::{CpuCore, Gpu};
use std::collections::BTreeMap;

/// Page size of Apple Silicon machines.
pub const VM_PAGE_SIZE: u64 = 16384;

fn value_after<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.trim_start().strip_prefix(prefix).map(str::trim)
}

fn leading_number(text: &str) -> Option<f64> {
    text.split_whitespace()
        .next()
        .map(|token| token.trim_end_matches('%'))
        .and_then(|token| token.parse::<f64>().ok())
}

/// Per-core frequency and active residency, ordered by core id.
pub fn parse_cpu_cores(text: &str) -> Vec<CpuCore> {
    let mut cores: BTreeMap<u32, (f64, f64)> = BTreeMap::new();

    for line in text.lines() {
        let Some(rest) = line.trim_start().strip_prefix("CPU ") else {
            continue;
        };
        let Some((id, field)) = rest.split_once(' ') else {
            continue;
        };
        let Ok(id) = id.parse::<u32>() else {
            continue;
        };

        if let Some(value) = value_after(field, "frequency:") {
            cores.entry(id).or_default().0 = leading_number(value).unwrap_or(0.0);
        } else if let Some(value) = value_after(field, "active residency:") {
            cores.entry(id).or_default().1 = leading_number(value).unwrap_or(0.0);
        }
    }

    cores
        .into_iter()
        .map(|(id, (frequency, usage))| CpuCore {
            id,
            frequency,
            usage,
            temperature: 0.0,
        })
        .collect()
}

/// Package CPU power in watts.
pub fn parse_cpu_power(text: &str) -> f64 {
    text.lines()
        .filter_map(|line| value_after(line, "CPU Power:"))
        .filter_map(leading_number)
        .last()
        .map(|milliwatts| milliwatts / 1000.0)
        .unwrap_or(0.0)
}

/// Reading of the single integrated GPU.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuReport {
    pub power: f64,
    pub frequency: f64,
    pub max_frequency: f64,
    pub active_residency: f64,
}

impl GpuReport {
    /// Frequency utilisation weighted by active residency, capped at 100.
    pub fn usage(&self) -> f64 {
        if self.max_frequency <= 0.0 {
            return 0.0;
        }
        let frequency_utilization = self.frequency / self.max_frequency * 100.0;
        (frequency_utilization * self.active_residency / 100.0).min(100.0)
    }

    pub fn into_gpus(self) -> Vec<Gpu> {
        vec![Gpu {
            id: 0,
            power: self.power,
            frequency: self.frequency,
            usage: self.usage(),
        }]
    }
}

pub fn parse_gpu(text: &str) -> GpuReport {
    let mut report = GpuReport {
        power: 0.0,
        frequency: 0.0,
        max_frequency: 0.0,
        active_residency: 0.0,
    };
    let mut idle_residency = None;

    for line in text.lines() {
        if let Some(value) = value_after(line, "GPU Power:") {
            report.power = leading_number(value).map(|mw| mw / 1000.0).unwrap_or(0.0);
        } else if let Some(value) = value_after(line, "GPU HW active frequency:") {
            report.frequency = leading_number(value).unwrap_or(0.0);
        } else if let Some(value) = value_after(line, "GPU HW active residency:") {
            report.active_residency = leading_number(value).unwrap_or(0.0);
            // Histogram: "12.34% (389 MHz: 5.1% 486 MHz: 0% ...)"
            let tokens: Vec<&str> = value.split_whitespace().collect();
            for pair in tokens.windows(2) {
                if pair[1] == "MHz:" {
                    if let Ok(mhz) = pair[0].trim_start_matches('(').parse::<f64>() {
                        report.max_frequency = report.max_frequency.max(mhz);
                    }
                }
            }
        } else if let Some(value) = value_after(line, "GPU idle residency:") {
            idle_residency = leading_number(value);
        }
    }

    if let Some(idle) = idle_residency {
        report.active_residency = (100.0 - idle).max(0.0);
    }
    report
}

/// Bytes in use: app memory (active, anonymous, compressed) plus wired.
pub fn parse_vm_stat(text: &str) -> u64 {
    const USED_PAGES: [&str; 4] = [
        "Pages active:",
        "Pages anonymous:",
        "Pages occupied by compressor:",
        "Pages wired down:",
    ];

    text.lines()
        .filter_map(|line| {
            USED_PAGES
                .iter()
                .find_map(|prefix| value_after(line, prefix))
                .and_then(|value| value.trim_end_matches('.').parse::<u64>().ok())
        })
        .map(|pages| pages * VM_PAGE_SIZE)
        .sum()
}
