//! Heat buckets for HTML reports
//!
//! Maps a line's share of its function's time onto eleven CSS classes
//! (`p0`..`p10`). The curve `10·p·(3 − p)` saturates early, so mid-range
//! lines already render hot.

/// Background colors for `p0`..`p10`
pub const PALETTE: [&str; 11] = [
    "#FFFFFF", "#ffffa0", "#fff800", "#ffde00", "#ffbd00", "#ff9a00", "#ff7800", "#ff5700",
    "#ff3700", "#ff1d00", "#ff0000",
];

/// Class for lines without recorded time
pub const BLANK_CLASS: &str = "blank";

const CURVE_K: f64 = 3.0;
const MAX_BUCKET: i64 = 10;

/// Bucket index for a percentage in [0, 100]
pub fn bucket(percent: f64) -> u8 {
    let p = percent / 100.0;
    let raw = (20.0 * p * (p - CURVE_K) / (1.0 - CURVE_K)).ceil();
    if raw.is_nan() {
        return 0;
    }
    (raw as i64).clamp(0, MAX_BUCKET) as u8
}

/// CSS class for a rendered percentage cell
///
/// Blank cells (no recorded time) map to `"blank"`.
pub fn percentage_to_class(percentage: &str) -> String {
    let trimmed = percentage.trim_matches(|c| c == ' ' || c == '\t');
    if trimmed.is_empty() {
        return BLANK_CLASS.to_string();
    }
    match trimmed.parse::<f64>() {
        Ok(percent) => format!("p{}", bucket(percent)),
        Err(_) => {
            tracing::debug!(percentage, "unparseable percentage, using blank class");
            BLANK_CLASS.to_string()
        }
    }
}

/// CSS rules for every bucket, one per line
pub fn palette_css() -> String {
    PALETTE
        .iter()
        .enumerate()
        .map(|(i, color)| format!("span.{:<4}{{background-color: {}}}\n", format!("p{}", i), color))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_input() {
        assert_eq!(percentage_to_class(""), "blank");
        assert_eq!(percentage_to_class("     "), "blank");
        assert_eq!(percentage_to_class("\t"), "blank");
    }

    #[test]
    fn test_bounds() {
        assert_eq!(percentage_to_class("0.0"), "p0");
        assert_eq!(percentage_to_class("  0.0"), "p0");
        assert_eq!(percentage_to_class("100.0"), "p10");
    }

    #[test]
    fn test_curve_is_front_loaded() {
        assert_eq!(percentage_to_class("  5.0"), "p2");
        assert_eq!(percentage_to_class(" 10.0"), "p3");
        // linear scale would give p5
        assert_eq!(percentage_to_class(" 50.0"), "p10");
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(bucket(-5.0), 0);
        assert_eq!(bucket(250.0), 10);
        assert_eq!(bucket(f64::NAN), 0);
    }

    #[test]
    fn test_garbage_is_blank() {
        assert_eq!(percentage_to_class("abc"), "blank");
    }

    #[test]
    fn test_palette_css_has_every_class() {
        let css = palette_css();
        assert_eq!(css.lines().count(), 11);
        assert!(css.contains("span.p0  {background-color: #FFFFFF}"));
        assert!(css.contains("span.p10 {background-color: #ff0000}"));
    }
}
