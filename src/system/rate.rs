//! Cumulative counter to bytes/second conversion.

/// Rate between two cumulative readings taken `elapsed_secs` apart.
///
/// Returns 0 when the clock did not advance or when the counter went
/// backwards (wrap or OS reset); never negative.
pub fn rate(previous: u64, current: u64, elapsed_secs: f64) -> f64 {
    if !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
        return 0.0;
    }
    if current < previous {
        return 0.0;
    }
    (current - previous) as f64 / elapsed_secs
}

/// [`rate`] over readings that may be missing (first cycle, failed read).
pub fn rate_between(previous: Option<u64>, current: Option<u64>, elapsed_secs: f64) -> f64 {
    match (previous, current) {
        (Some(prev), Some(curr)) => rate(prev, curr, elapsed_secs),
        _ => 0.0,
    }
}
