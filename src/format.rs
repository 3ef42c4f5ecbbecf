const KIB: usize = 1024;
const MIB: usize = 1024 * 1024;

/// Scaled values closer than this to an integer are rendered without decimals.
const INTEGRAL_EPSILON: f64 = 0.000_001;

/// Short human readable label for a size in bytes.
///
/// Sizes of at least one MiB are rendered in `MB`, sizes of at least one KiB
/// in `KB` and everything else in plain bytes. Integral values are printed
/// without a fractional part, all others with two decimals.
///
/// ```
/// assert_eq!(membench::format::size_label(1024 * 1024), "1MB");
/// assert_eq!(membench::format::size_label(1_572_864), "1.50MB");
/// assert_eq!(membench::format::size_label(512), "512B");
/// ```
#[must_use]
pub fn size_label(bytes: usize) -> String {
    if bytes >= MIB {
        scaled(bytes as f64 / MIB as f64, "MB")
    } else if bytes >= KIB {
        scaled(bytes as f64 / KIB as f64, "KB")
    } else {
        format!("{bytes}B")
    }
}

fn scaled(value: f64, unit: &str) -> String {
    if (value - value.trunc()).abs() > INTEGRAL_EPSILON {
        format!("{value:.2}{unit}")
    } else {
        format!("{value:.0}{unit}")
    }
}
