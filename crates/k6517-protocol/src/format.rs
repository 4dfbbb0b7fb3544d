//! Reply value formatting

/// Format a range or reading for the wire
///
/// Integral values keep one fractional digit (`10.0`, `0.0`). Very small and
/// very large magnitudes switch to exponent notation (`1e-7`, `1e16`), which
/// is what `f64`'s `Debug` output already does.
pub fn format_value(value: f64) -> String {
    format!("{:?}", value)
}

/// Format an error code for the wire
pub fn format_code(code: i32) -> String {
    code.to_string()
}
