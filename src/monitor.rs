use crate::data::{Gpu, Snapshot};
use crate::powermetrics;
use nvml_wrapper::Nvml;
use nvml_wrapper::enum_wrappers::device::Clock;
use nvml_wrapper::error::NvmlError;
use serde::{Deserialize, Serialize};
use std::process::Command;
use std::time::{SystemTime, SystemTimeError, UNIX_EPOCH};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("NVML initialization failed: {0}")]
    NvmlInit(NvmlError),
    #[error("NVML query failed: {0}")]
    Nvml(#[from] NvmlError),
    #[error("Device not found at index {0}")]
    DeviceNotFound(u32),
    #[error("Failed to execute {command}: {source}")]
    Spawn {
        command: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Please run 'sudo powermetrics' in terminal first to grant permissions")]
    PermissionRequired,
    #[error("powermetrics failed: {0}")]
    CommandFailed(String),
    #[error("powermetrics produced no output")]
    EmptyOutput,
    #[error("Failed to get data: {0}")]
    SamplingFailed(String),
    #[error("Failed to get timestamp: {0}")]
    Clock(#[from] SystemTimeError),
}

/// Source of metric snapshots. `Ok(None)` means the call succeeded but had
/// nothing to report.
pub trait MetricsProvider: Send + Sync {
    fn name(&self) -> &str;
    fn sample(&self) -> Result<Option<Snapshot>, MonitorError>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Auto,
    Powermetrics,
    Nvml,
}

fn now_secs() -> Result<u64, MonitorError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// macOS provider backed by `powermetrics`, `sysctl` and `vm_stat`.
pub struct PowermetricsProvider {
    carbon_intensity: f64,
}

impl PowermetricsProvider {
    pub fn new(carbon_intensity: f64) -> Self {
        Self { carbon_intensity }
    }

    fn run_powermetrics(&self) -> Result<String, MonitorError> {
        // -n: never block on a password prompt from a background thread.
        let output = Command::new("sudo")
            .args([
                "-n",
                "powermetrics",
                "--samplers",
                "cpu_power,gpu_power",
                "-i",
                "1000",
                "-n",
                "1",
            ])
            .output()
            .map_err(|source| MonitorError::Spawn {
                command: "powermetrics",
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(
                if stderr.contains("superuser") || stderr.contains("password is required") {
                    MonitorError::PermissionRequired
                } else if !stderr.trim().is_empty() {
                    MonitorError::CommandFailed(stderr.trim().to_string())
                } else if !stdout.trim().is_empty() {
                    MonitorError::CommandFailed(stdout.trim().to_string())
                } else {
                    MonitorError::CommandFailed("no output".to_string())
                },
            );
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        if text.trim().is_empty() {
            return Err(MonitorError::EmptyOutput);
        }
        Ok(text)
    }

    // Memory readings are best effort; a failure reads as zero.
    fn memory_info(&self) -> (u64, u64) {
        let total = Command::new("sysctl")
            .args(["-n", "hw.memsize"])
            .output()
            .ok()
            .and_then(|out| String::from_utf8_lossy(&out.stdout).trim().parse::<u64>().ok())
            .unwrap_or(0);

        let used = Command::new("vm_stat")
            .output()
            .map(|out| powermetrics::parse_vm_stat(&String::from_utf8_lossy(&out.stdout)))
            .unwrap_or(0);

        (total, used)
    }
}

impl MetricsProvider for PowermetricsProvider {
    fn name(&self) -> &str {
        "powermetrics"
    }

    fn sample(&self) -> Result<Option<Snapshot>, MonitorError> {
        let text = self.run_powermetrics()?;
        let (memory_total, memory_used) = self.memory_info();

        let cpu_cores = powermetrics::parse_cpu_cores(&text);
        let total_cpu_power = powermetrics::parse_cpu_power(&text);
        let gpu = powermetrics::parse_gpu(&text);
        let total_gpu_power = gpu.power;
        let total_gpu_usage = gpu.usage();

        Ok(Some(Snapshot {
            timestamp: now_secs()?,
            cpu_cores,
            total_cpu_power,
            total_gpu_power,
            total_gpu_usage,
            gpus: gpu.into_gpus(),
            memory_total,
            memory_used,
            carbon_intensity: self.carbon_intensity,
        }))
    }
}

/// NVIDIA provider. NVML only sees the GPUs, so CPU and host memory fields
/// stay empty.
pub struct NvmlProvider {
    nvml: Nvml,
    carbon_intensity: f64,
}

impl NvmlProvider {
    pub fn new(carbon_intensity: f64) -> Result<Self, MonitorError> {
        let nvml = Nvml::init().map_err(MonitorError::NvmlInit)?;
        // Fail at creation time when there is nothing to watch.
        nvml.device_by_index(0)
            .map_err(|_| MonitorError::DeviceNotFound(0))?;
        Ok(Self {
            nvml,
            carbon_intensity,
        })
    }
}

impl MetricsProvider for NvmlProvider {
    fn name(&self) -> &str {
        "nvml"
    }

    fn sample(&self) -> Result<Option<Snapshot>, MonitorError> {
        let count = self.nvml.device_count()?;
        let mut gpus = Vec::with_capacity(count as usize);

        for index in 0..count {
            let device = self.nvml.device_by_index(index)?;
            let usage = device.utilization_rates()?.gpu as f64;
            let power = device
                .power_usage()
                .map(|mw| mw as f64 / 1000.0)
                .unwrap_or(0.0);
            let frequency = device.clock_info(Clock::Graphics).unwrap_or(0) as f64;
            gpus.push(Gpu {
                id: index,
                power,
                frequency,
                usage,
            });
        }

        if gpus.is_empty() {
            return Ok(None);
        }

        let total_gpu_power = gpus.iter().map(|g| g.power).sum();
        let total_gpu_usage = gpus.iter().map(|g| g.usage).sum::<f64>() / gpus.len() as f64;

        Ok(Some(Snapshot {
            timestamp: now_secs()?,
            cpu_cores: Vec::new(),
            total_cpu_power: 0.0,
            total_gpu_power,
            total_gpu_usage,
            gpus,
            memory_total: 0,
            memory_used: 0,
            carbon_intensity: self.carbon_intensity,
        }))
    }
}

pub fn create_provider(
    kind: ProviderKind,
    carbon_intensity: f64,
) -> Result<Box<dyn MetricsProvider>, MonitorError> {
    let kind = match kind {
        ProviderKind::Auto if cfg!(target_os = "macos") => ProviderKind::Powermetrics,
        ProviderKind::Auto => ProviderKind::Nvml,
        other => other,
    };

    let provider: Box<dyn MetricsProvider> = match kind {
        ProviderKind::Nvml => Box::new(NvmlProvider::new(carbon_intensity)?),
        _ => Box::new(PowermetricsProvider::new(carbon_intensity)),
    };
    log::info!("Using {} metrics provider", provider.name());
    Ok(provider)
}
