use chrono::{DateTime, Local};

const BYTE_UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

/// Format a byte count with binary scaling, stopping at GB.
pub fn format_bytes(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, BYTE_UNITS[unit])
}

/// Format a power reading, switching to milliwatts below one watt.
///
/// Negative and NaN readings are clamped to zero.
pub fn format_power(watts: f64) -> String {
    let watts = if watts.is_nan() { 0.0 } else { watts.max(0.0) };
    if watts < 1.0 {
        format!("{} mW", (watts * 1000.0).round() as i64)
    } else {
        format!("{:.2} W", watts)
    }
}

pub fn format_percent(percent: f64) -> String {
    format!("{:.1}%", percent)
}

pub fn format_frequency(mhz: f64) -> String {
    format!("{:.0} MHz", mhz)
}

pub fn format_carbon(grams_per_kwh: f64) -> String {
    format!("{:.2} gCO2/kWh", grams_per_kwh)
}

/// Local time-of-day label for a timestamp in seconds since the epoch.
pub fn format_time_label(timestamp: u64) -> String {
    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|utc| utc.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_pick_largest_unit_below_1024() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(1023), "1023.00 B");
        assert_eq!(format_bytes(1024), "1.00 KB");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
        assert_eq!(format_bytes(1_073_741_824), "1.00 GB");
    }

    #[test]
    fn bytes_never_go_past_gb() {
        assert_eq!(format_bytes(2048 * 1_073_741_824), "2048.00 GB");
    }

    #[test]
    fn power_switches_to_milliwatts_below_one_watt() {
        assert_eq!(format_power(0.5), "500 mW");
        assert_eq!(format_power(0.0), "0 mW");
        assert_eq!(format_power(0.002), "2 mW");
        assert_eq!(format_power(0.9996), "1000 mW");
        assert_eq!(format_power(1.0), "1.00 W");
        assert_eq!(format_power(45.3), "45.30 W");
    }

    #[test]
    fn power_clamps_negative_and_nan() {
        assert_eq!(format_power(-3.2), "0 mW");
        assert_eq!(format_power(f64::NAN), "0 mW");
    }

    #[test]
    fn small_formatters() {
        assert_eq!(format_percent(12.34), "12.3%");
        assert_eq!(format_frequency(3204.4), "3204 MHz");
        assert_eq!(format_carbon(100.0), "100.00 gCO2/kWh");
    }

    #[test]
    fn time_label_is_a_clock_reading() {
        let label = format_time_label(1_700_000_000);
        let parts: Vec<&str> = label.split(':').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_digit())));
    }
}
