//! Number formatting shared by the calculator and unit converter.

/// Format a number for display: integers without a fraction, very large or
/// very small magnitudes in scientific notation, otherwise up to six
/// decimals with trailing zeros trimmed.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.fract() == 0.0 && n.abs() < 1e15 {
        return format!("{}", n as i64);
    }
    if n.abs() < 1e-4 || n.abs() >= 1e15 {
        return format!("{n:.4e}");
    }

    let formatted = format!("{n:.6}");
    formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}
