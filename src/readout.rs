use crate::data::Snapshot;
use crate::format::{format_bytes, format_carbon, format_percent, format_power};

/// Point readouts for the current snapshot, or the neutral display when
/// there is none.
#[derive(Debug, Clone, PartialEq)]
pub struct Readouts {
    pub cpu_power: String,
    pub gpu_power: String,
    pub total_power: String,
    pub memory_used: String,
    pub memory_total: String,
    pub memory_fraction: f64,
    pub gpu_usage: String,
    pub gpu_usage_fraction: f64,
    pub carbon_intensity: String,
}

impl Readouts {
    pub fn from_current(current: Option<&Snapshot>) -> Self {
        let Some(snapshot) = current else {
            return Self::neutral();
        };
        Self {
            cpu_power: format_power(snapshot.total_cpu_power),
            gpu_power: format_power(snapshot.total_gpu_power),
            total_power: format_power(snapshot.total_power()),
            memory_used: format_bytes(snapshot.memory_used),
            memory_total: format_bytes(snapshot.memory_total),
            memory_fraction: snapshot.memory_fraction(),
            gpu_usage: format_percent(snapshot.total_gpu_usage),
            gpu_usage_fraction: (snapshot.total_gpu_usage / 100.0).clamp(0.0, 1.0),
            carbon_intensity: format_carbon(snapshot.carbon_intensity),
        }
    }

    fn neutral() -> Self {
        Self {
            cpu_power: "0 W".to_string(),
            gpu_power: "0 W".to_string(),
            total_power: "0 W".to_string(),
            memory_used: "0 B".to_string(),
            memory_total: "0 B".to_string(),
            memory_fraction: 0.0,
            gpu_usage: format_percent(0.0),
            gpu_usage_fraction: 0.0,
            carbon_intensity: "-".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::snapshot;

    #[test]
    fn formats_current_snapshot() {
        let mut snap = snapshot(1, &[1.0]);
        snap.total_cpu_power = 45.3;
        snap.total_gpu_power = 0.002;

        let readouts = Readouts::from_current(Some(&snap));
        assert_eq!(readouts.cpu_power, "45.30 W");
        assert_eq!(readouts.gpu_power, "2 mW");
        assert_eq!(readouts.total_power, "45.30 W");
        assert_eq!(readouts.memory_used, "8.00 GB");
        assert_eq!(readouts.memory_total, "16.00 GB");
        assert_eq!(readouts.gpu_usage, "15.0%");
        assert!((readouts.gpu_usage_fraction - 0.15).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_neutral_display() {
        let readouts = Readouts::from_current(None);
        assert_eq!(readouts.cpu_power, "0 W");
        assert_eq!(readouts.memory_used, "0 B");
        assert_eq!(readouts.memory_fraction, 0.0);
    }
}
