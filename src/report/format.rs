//! Human-scaled byte counts and rates.
//!
//! Units step by 1024 and are always printed with two decimals, e.g.
//! `1.50 KB` or `12.34 MB/s`. TB is the largest unit.

use serde::Serialize;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const STEP: f64 = 1024.0;
const BYTES_PER_MB: f64 = STEP * STEP;

/// Format a byte count, e.g. `format_bytes(1536.0) == "1.50 KB"`.
pub fn format_bytes(bytes: f64) -> String {
    let (value, unit) = scale(bytes);
    format!("{:.2} {}", value, unit)
}

/// Format a byte rate, e.g. `format_speed(2_097_152.0) == "2.00 MB/s"`.
pub fn format_speed(bytes_per_second: f64) -> String {
    let (value, unit) = scale(bytes_per_second);
    format!("{:.2} {}/s", value, unit)
}

fn scale(mut value: f64) -> (f64, &'static str) {
    let last = UNITS.len() - 1;
    for unit in &UNITS[..last] {
        if value < STEP {
            return (value, unit);
        }
        value /= STEP;
    }
    (value, UNITS[last])
}

/// Parse output of [`format_bytes`] or [`format_speed`] back into bytes.
///
/// Returns `None` for unknown units or malformed numbers.
#[cfg(test)]
pub fn parse_size(text: &str) -> Option<f64> {
    let text = text.trim();
    let text = text.strip_suffix("/s").unwrap_or(text);
    let (number, unit) = text.split_once(' ')?;
    let value: f64 = number.trim().parse().ok()?;
    let exponent = UNITS
        .iter()
        .position(|u| u.eq_ignore_ascii_case(unit.trim()))?;
    Some(value * STEP.powi(exponent as i32))
}

/// Qualitative throughput band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedBand {
    /// Above 10 MB/s
    Excellent,
    /// Above 5 MB/s
    Good,
    /// Above 1 MB/s
    Moderate,
    Slow,
}

impl SpeedBand {
    /// Classify a throughput in bytes per second. Thresholds are exclusive.
    pub fn classify(bytes_per_second: f64) -> Self {
        let mb_per_second = bytes_per_second / BYTES_PER_MB;
        if mb_per_second > 10.0 {
            SpeedBand::Excellent
        } else if mb_per_second > 5.0 {
            SpeedBand::Good
        } else if mb_per_second > 1.0 {
            SpeedBand::Moderate
        } else {
            SpeedBand::Slow
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SpeedBand::Excellent => "Excellent speed! (>10 MB/s)",
            SpeedBand::Good => "Good speed (5-10 MB/s)",
            SpeedBand::Moderate => "Moderate speed (1-5 MB/s)",
            SpeedBand::Slow => "Slow speed (<1 MB/s)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bytes_pick_the_right_unit() {
        assert_eq!(format_bytes(0.0), "0.00 B");
        assert_eq!(format_bytes(1023.0), "1023.00 B");
        assert_eq!(format_bytes(1024.0), "1.00 KB");
        assert_eq!(format_bytes(1536.0), "1.50 KB");
        assert_eq!(format_bytes(5.0 * BYTES_PER_MB), "5.00 MB");
        assert_eq!(format_bytes(3.0 * STEP.powi(3)), "3.00 GB");
    }

    #[test]
    fn terabytes_is_the_ceiling() {
        assert_eq!(format_bytes(2048.0 * STEP.powi(4)), "2048.00 TB");
    }

    #[test]
    fn speed_has_per_second_suffix() {
        assert_eq!(format_speed(512.0), "512.00 B/s");
        assert_eq!(format_speed(2.0 * BYTES_PER_MB), "2.00 MB/s");
        assert_eq!(format_speed(4.0 * STEP.powi(4)), "4.00 TB/s");
    }

    #[test]
    fn formatted_bytes_parse_back_within_rounding() {
        let samples = [
            0.0,
            1.0,
            999.0,
            1_500.0,
            123_456.0,
            7_654_321.0,
            9_876_543_210.0,
            3.3 * STEP.powi(4),
        ];
        for &x in &samples {
            let text = format_bytes(x);
            let parsed = parse_size(&text).unwrap();
            let unit = STEP.powi(scale_exponent(x));
            assert!(
                (parsed - x).abs() <= 0.005 * unit + f64::EPSILON,
                "{} -> {} -> {}",
                x,
                text,
                parsed
            );
        }
    }

    fn scale_exponent(mut x: f64) -> i32 {
        let mut exp = 0;
        while x >= STEP && exp < 4 {
            x /= STEP;
            exp += 1;
        }
        exp
    }

    #[test]
    fn parse_accepts_rates_and_rejects_garbage() {
        assert_eq!(parse_size("2.00 MB/s"), Some(2.0 * BYTES_PER_MB));
        assert_eq!(parse_size("1.00 kb"), Some(1024.0));
        assert_eq!(parse_size("12 parsecs"), None);
        assert_eq!(parse_size("lots KB"), None);
        assert_eq!(parse_size("42"), None);
    }

    #[test]
    fn bands_use_exclusive_thresholds() {
        assert_eq!(SpeedBand::classify(11.0 * BYTES_PER_MB), SpeedBand::Excellent);
        assert_eq!(SpeedBand::classify(10.0 * BYTES_PER_MB), SpeedBand::Good);
        assert_eq!(SpeedBand::classify(5.0 * BYTES_PER_MB), SpeedBand::Moderate);
        assert_eq!(SpeedBand::classify(1.0 * BYTES_PER_MB), SpeedBand::Slow);
        assert_eq!(SpeedBand::classify(0.0), SpeedBand::Slow);
    }

    #[test]
    fn band_descriptions() {
        assert!(SpeedBand::Good.description().contains("5-10 MB/s"));
        assert!(SpeedBand::Slow.description().starts_with("Slow"));
    }
}
