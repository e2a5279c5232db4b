use crate::kpi::MetricValue;

/// Render a metric with a fixed number of decimals, or the literal word
/// `undefined`. Statement templates use this so every number in a report is
/// a substitution of a computed value.
pub fn fmt_metric(value: MetricValue, decimals: usize) -> String {
    match value {
        MetricValue::Defined(v) => format!("{v:.decimals$}"),
        MetricValue::Undefined => "undefined".to_string(),
    }
}

/// Render a raw total as a whole number (clicks, impressions, conversions).
pub fn fmt_count(value: f64) -> String {
    format!("{value:.0}")
}

/// Relative equality with a floor of 1.0 on the reference magnitude, so the
/// tolerance stays meaningful for values rendered with few decimals near
/// zero.
pub fn approx_rel_eq(value: f64, reference: f64, tolerance: f64) -> bool {
    (value - reference).abs() <= tolerance * reference.abs().max(1.0)
}
