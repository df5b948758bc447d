use serde::{Deserialize, Serialize};

// Per-core CPU reading
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CpuCore {
    pub id: u32,
    pub frequency: f64,   // MHz
    pub usage: f64,       // percent, 0-100
    pub temperature: f64, // °C, 0 when the source does not report it
}

// Per-device GPU reading
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gpu {
    pub id: u32,
    pub power: f64,     // W
    pub frequency: f64, // MHz
    pub usage: f64,     // percent
}

/// One immutable sample of every measured metric at a point in time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: u64, // seconds since the Unix epoch
    pub cpu_cores: Vec<CpuCore>,
    pub total_cpu_power: f64,
    pub total_gpu_power: f64,
    pub total_gpu_usage: f64,
    pub gpus: Vec<Gpu>,
    pub memory_total: u64,
    pub memory_used: u64,
    pub carbon_intensity: f64, // gCO2/kWh
}

impl Snapshot {
    /// Looks a core up by its stable id rather than by its position.
    pub fn core(&self, id: u32) -> Option<&CpuCore> {
        // Fast path: providers normally report cores with id == position.
        match self.cpu_cores.get(id as usize) {
            Some(core) if core.id == id => Some(core),
            _ => self.cpu_cores.iter().find(|core| core.id == id),
        }
    }

    pub fn total_power(&self) -> f64 {
        self.total_cpu_power + self.total_gpu_power
    }

    /// Used memory as a fraction of total, 0 when the total is unknown.
    pub fn memory_fraction(&self) -> f64 {
        if self.memory_total == 0 {
            return 0.0;
        }
        (self.memory_used as f64 / self.memory_total as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn snapshot(timestamp: u64, usages: &[f64]) -> Snapshot {
        Snapshot {
            timestamp,
            cpu_cores: usages
                .iter()
                .enumerate()
                .map(|(id, &usage)| CpuCore {
                    id: id as u32,
                    frequency: 2400.0,
                    usage,
                    temperature: 0.0,
                })
                .collect(),
            total_cpu_power: 10.0,
            total_gpu_power: 2.0,
            total_gpu_usage: 15.0,
            gpus: vec![Gpu {
                id: 0,
                power: 2.0,
                frequency: 1296.0,
                usage: 15.0,
            }],
            memory_total: 16 * 1024 * 1024 * 1024,
            memory_used: 8 * 1024 * 1024 * 1024,
            carbon_intensity: 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::snapshot;
    use super::*;

    #[test]
    fn core_lookup_uses_id_not_position() {
        let mut snap = snapshot(1, &[10.0, 20.0, 30.0]);
        snap.cpu_cores.swap(0, 2);

        assert_eq!(snap.core(0).map(|c| c.usage), Some(10.0));
        assert_eq!(snap.core(2).map(|c| c.usage), Some(30.0));
        assert!(snap.core(7).is_none());
    }

    #[test]
    fn memory_fraction_guards_zero_total() {
        let mut snap = snapshot(1, &[]);
        assert!((snap.memory_fraction() - 0.5).abs() < f64::EPSILON);

        snap.memory_total = 0;
        assert_eq!(snap.memory_fraction(), 0.0);
    }

    #[test]
    fn deserializes_snake_case_payload() {
        let json = r#"{
            "timestamp": 1700000000,
            "cpu_cores": [{"id": 0, "frequency": 3204.0, "usage": 12.5, "temperature": 0.0}],
            "total_cpu_power": 45.3,
            "total_gpu_power": 0.002,
            "total_gpu_usage": 3.1,
            "gpus": [{"id": 0, "power": 0.002, "frequency": 389.0, "usage": 3.1}],
            "memory_total": 38654705664,
            "memory_used": 20401094656,
            "carbon_intensity": 100.0
        }"#;

        let snap: Snapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.cpu_cores.len(), 1);
        assert_eq!(snap.gpus[0].frequency, 389.0);
        assert!((snap.total_power() - 45.302).abs() < 1e-9);
    }
}
