//! Tick formatting for reports
//!
//! The display unit is derived from the timer's own resolution: the
//! coarsest of s/ms/µs/ns in which one tick is still >= 1.

/// Guards `log10` against a zero unit
const UNIT_EPSILON: f64 = 1e-12;

/// Largest supported base exponent (nanoseconds)
const MAX_EXPONENT: i32 = 9;

/// Unit label for a power-of-1000 exponent
fn unit_label(exponent: i32) -> &'static str {
    match exponent {
        0 => "s ",
        3 => "ms",
        6 => "µs",
        _ => "ns",
    }
}

/// Base display exponent (0, 3, 6 or 9) for a timer unit in seconds
pub fn base_exponent(unit: f64) -> i32 {
    let raw = (-(unit + UNIT_EPSILON).log10() / 3.0 + 1.0).trunc() * 3.0;
    if raw.is_nan() {
        return 0;
    }
    raw.clamp(0.0, MAX_EXPONENT as f64) as i32
}

/// Formats tick counts for one timer unit
#[derive(Debug, Clone, Copy)]
pub struct TimeFormatter {
    exponent: i32,
    ratio: f64,
    human_readable: bool,
}

impl TimeFormatter {
    pub fn new(unit: f64, human_readable: bool) -> Self {
        let exponent = base_exponent(unit);
        let ratio = unit * 10f64.powi(exponent);
        // 1e-6 * 1e6 may land one ulp off 1.0
        let ratio = if (ratio - ratio.round()).abs() < 1e-9 * ratio.abs().max(1.0) {
            ratio.round()
        } else {
            ratio
        };
        Self {
            exponent,
            ratio,
            human_readable,
        }
    }

    /// Ticks-to-display-unit multiplier
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Label of the base display unit, without padding
    pub fn base_label(&self) -> &'static str {
        unit_label(self.exponent).trim_end()
    }

    /// True when fixed-width fields show the raw tick count
    pub fn shows_raw_ticks(&self) -> bool {
        self.ratio == 1.0
    }

    pub fn format(&self, ticks: f64) -> String {
        let mut value = ticks * self.ratio;
        if !self.human_readable {
            return format!("{:5.1}", value);
        }

        let mut exponent = self.exponent;
        while value >= 1000.0 && exponent > 0 {
            exponent -= 3;
            value /= 1000.0;
        }
        format!("{:.2} {}", value, unit_label(exponent))
    }
}

/// Format `ticks` of `unit` seconds each for display
pub fn format_time(ticks: f64, unit: f64, human_readable: bool) -> String {
    TimeFormatter::new(unit, human_readable).format(ticks)
}

/// Format a float like C's `%g`: six significant digits, trailing zeros
/// removed, exponent notation outside [1e-4, 1e6).
pub fn format_g(value: f64) -> String {
    const PRECISION: i32 = 6;

    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }

    // Rounding to the target precision first decides the exponent (999999.7 -> 1e+06).
    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if exponent < -4 || exponent >= PRECISION {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!(
            "{}e{}{:02}",
            strip_trailing_zeros(mantissa),
            sign,
            exponent.abs()
        )
    } else {
        let decimals = (PRECISION - 1 - exponent).max(0) as usize;
        strip_trailing_zeros(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn strip_trailing_zeros(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}
