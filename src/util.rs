pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Render a millisecond count as whole seconds with one decimal, "5.3s"
pub fn fmt_ms(ms: u64) -> String {
    format!("{:.1}s", ms as f64 / 1000.0)
}
