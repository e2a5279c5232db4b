use crate::error::{InsightError, Result};
use crate::kpi::MetricValue;
use crate::report::{InsightCandidate, InsightContext, InsightReport, ReportSource};
use crate::trend::{latest_trend, TrendDirection, TrendMetric};
use crate::utils::approx_rel_eq;
use regex::Regex;
use std::sync::LazyLock;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)?").expect("number regex"));

// Date-shaped tokens are not numeric claims; they are removed before
// extraction so "2024-01-05" does not demand grounding for 2024, 1 and 5.
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}-\d{2}-\d{2}\b|\b\d{1,2}/\d{1,2}/\d{2,4}\b").expect("date regex")
});

static UP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(increas\w*|grew|grow\w*|growth|rose|rising|climb\w*|improv\w*|up)\b")
        .expect("up regex")
});

static DOWN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(decreas\w*|declin\w*|drop\w*|fell|fall\w*|down|shrank|worsen\w*)\b")
        .expect("down regex")
});

/// Substrings that attribute a directional claim to a tracked metric.
const METRIC_KEYWORDS: &[(TrendMetric, &[&str])] = &[
    (TrendMetric::Ctr, &["click-through", "click through", "ctr"]),
    (TrendMetric::Spend, &["spend"]),
    (TrendMetric::Conversions, &["conversions"]),
    (TrendMetric::Revenue, &["revenue"]),
];

/// Checks an externally produced insight payload against the numbers it was
/// supposedly derived from. Never repairs: any failure is returned with all
/// collected reasons and the caller falls back to the rule-based generator.
pub struct InsightValidator {
    tolerance: f64,
    max_findings: usize,
    max_recommendations: usize,
}

impl InsightValidator {
    pub fn new(tolerance: f64, max_findings: usize, max_recommendations: usize) -> Self {
        Self {
            tolerance,
            max_findings,
            max_recommendations,
        }
    }

    pub fn validate(
        &self,
        candidate: InsightCandidate,
        context: &InsightContext,
    ) -> Result<InsightReport> {
        let mut reasons = Vec::new();

        self.check_structure(&candidate, &mut reasons);

        let references = reference_values(context);
        for (section, statements) in [
            ("finding", &candidate.findings),
            ("issue", &candidate.issues),
            ("recommendation", &candidate.recommendations),
        ] {
            for statement in statements {
                self.check_numbers(section, statement, &references, &mut reasons);
                check_direction(section, statement, context, &mut reasons);
            }
        }

        for (name, value) in &candidate.summary {
            if let MetricValue::Defined(v) = value {
                if !references.iter().any(|r| approx_rel_eq(*v, *r, self.tolerance)) {
                    reasons.push(format!("summary metric '{name}' value {v} is not a computed value"));
                }
            }
        }

        if reasons.is_empty() {
            Ok(InsightReport::from_candidate(candidate, ReportSource::Ai))
        } else {
            Err(InsightError::ValidationRejected { reasons })
        }
    }

    fn check_structure(&self, candidate: &InsightCandidate, reasons: &mut Vec<String>) {
        if candidate.findings.len() > self.max_findings {
            reasons.push(format!(
                "{} findings exceed the cap of {}",
                candidate.findings.len(),
                self.max_findings
            ));
        }
        if candidate.recommendations.len() > self.max_recommendations {
            reasons.push(format!(
                "{} recommendations exceed the cap of {}",
                candidate.recommendations.len(),
                self.max_recommendations
            ));
        }
        let all = candidate
            .findings
            .iter()
            .chain(&candidate.issues)
            .chain(&candidate.recommendations);
        for statement in all {
            if statement.trim().is_empty() {
                reasons.push("empty statement".to_string());
                break;
            }
        }
    }

    fn check_numbers(
        &self,
        section: &str,
        statement: &str,
        references: &[f64],
        reasons: &mut Vec<String>,
    ) {
        let stripped = DATE_RE.replace_all(statement, " ");
        for capture in NUMBER_RE.find_iter(&stripped) {
            let text = capture.as_str().replace(',', "");
            let Ok(value) = text.parse::<f64>() else {
                continue;
            };
            let grounded = references
                .iter()
                .any(|r| approx_rel_eq(value, *r, self.tolerance) || approx_rel_eq(value.abs(), *r, self.tolerance));
            if !grounded {
                reasons.push(format!(
                    "{section} cites {value} which matches no computed value"
                ));
            }
        }
    }
}

/// Every value a statement may legitimately cite: totals, aggregate metrics,
/// per-trend values and deltas, and the data-quality counts.
fn reference_values(context: &InsightContext) -> Vec<f64> {
    let aggregate = &context.aggregate;
    let mut values = vec![
        aggregate.total_impressions,
        aggregate.total_clicks,
        aggregate.total_spend,
        aggregate.total_conversions,
        aggregate.total_revenue,
    ];
    for metric in [
        aggregate.ctr,
        aggregate.cpc,
        aggregate.cpm,
        aggregate.conversion_rate,
        aggregate.roas,
    ] {
        if let Some(v) = metric.defined() {
            values.push(v);
        }
    }
    for point in &context.trends {
        values.push(point.previous);
        values.push(point.current);
        if let Some(delta) = point.pct_delta.defined() {
            values.push(delta);
            values.push(delta.abs());
        }
    }
    let cleaning = &context.cleaning;
    values.extend(
        [
            cleaning.rows_in,
            cleaning.rows_kept,
            cleaning.rows_dropped,
            cleaning.flagged_rows,
            cleaning.unparsable_cells,
            cleaning.invalid_dates,
        ]
        .map(|c| c as f64),
    );
    values
}

fn check_direction(
    section: &str,
    statement: &str,
    context: &InsightContext,
    reasons: &mut Vec<String>,
) {
    let lowered = statement.to_lowercase();
    let claims_up = UP_RE.is_match(&lowered);
    let claims_down = DOWN_RE.is_match(&lowered);

    // No directional wording, or wording for both directions (a contrast
    // statement we cannot attribute): nothing to check.
    let claimed = match (claims_up, claims_down) {
        (true, false) => TrendDirection::Up,
        (false, true) => TrendDirection::Down,
        _ => return,
    };

    for (metric, keywords) in METRIC_KEYWORDS {
        if !keywords.iter().any(|k| lowered.contains(k)) {
            continue;
        }
        match latest_trend(&context.trends, *metric) {
            Some(point) if point.direction == claimed => {}
            Some(point) => reasons.push(format!(
                "{section} claims {} moved {:?} but the data shows {:?}",
                metric.label(),
                claimed,
                point.direction
            )),
            None => reasons.push(format!(
                "{section} claims a {} trend but no trend data exists for it",
                metric.label()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::CleaningSummary;
    use crate::kpi::AggregateKpi;
    use crate::trend::TrendPoint;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn context_with_trend(direction: TrendDirection, delta: f64) -> InsightContext {
        let aggregate = AggregateKpi {
            total_impressions: 125_000.0,
            total_clicks: 1250.0,
            total_spend: 450.0,
            total_conversions: 45.0,
            total_revenue: 2250.0,
            ctr: MetricValue::Defined(1.0),
            cpc: MetricValue::Defined(0.36),
            cpm: MetricValue::Defined(3.6),
            conversion_rate: MetricValue::Defined(3.6),
            roas: MetricValue::Defined(5.0),
        };
        let trends = vec![TrendPoint {
            metric: TrendMetric::Conversions,
            period: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            previous: 30.0,
            current: 15.0,
            pct_delta: MetricValue::Defined(delta),
            direction,
            significant: true,
        }];
        InsightContext {
            aggregate,
            trends,
            has_conversions: true,
            has_revenue: true,
            cleaning: CleaningSummary::default(),
        }
    }

    fn candidate(findings: Vec<&str>) -> InsightCandidate {
        InsightCandidate {
            summary: BTreeMap::new(),
            findings: findings.into_iter().map(str::to_string).collect(),
            issues: vec![],
            recommendations: vec![],
        }
    }

    #[test]
    fn test_accepts_grounded_statement() {
        let validator = InsightValidator::new(0.01, 5, 5);
        let ctx = context_with_trend(TrendDirection::Down, -50.0);
        let result = validator.validate(
            candidate(vec!["ROAS of 5.00 with total revenue of 2250 is strong"]),
            &ctx,
        );
        assert!(result.is_ok());
        assert_eq!(result.unwrap().source, ReportSource::Ai);
    }

    #[test]
    fn test_rejects_fabricated_number() {
        let validator = InsightValidator::new(0.01, 5, 5);
        let ctx = context_with_trend(TrendDirection::Down, -50.0);
        let err = validator
            .validate(candidate(vec!["CTR reached an excellent 7.50%"]), &ctx)
            .unwrap_err();
        match err {
            InsightError::ValidationRejected { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("7.5")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_wrong_direction_claim() {
        let validator = InsightValidator::new(0.01, 5, 5);
        // Trend data says conversions fell 50%.
        let ctx = context_with_trend(TrendDirection::Down, -50.0);
        let err = validator
            .validate(candidate(vec!["Conversions increased 50% period over period"]), &ctx)
            .unwrap_err();
        match err {
            InsightError::ValidationRejected { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("conversions")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_accepts_matching_direction_claim() {
        let validator = InsightValidator::new(0.01, 5, 5);
        let ctx = context_with_trend(TrendDirection::Down, -50.0);
        let result = validator.validate(
            candidate(vec!["Conversions declined 50% period over period"]),
            &ctx,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_rejects_trend_claim_without_trend_data() {
        let validator = InsightValidator::new(0.01, 5, 5);
        let ctx = context_with_trend(TrendDirection::Down, -50.0);
        let err = validator
            .validate(candidate(vec!["Revenue grew strongly this month"]), &ctx)
            .unwrap_err();
        match err {
            InsightError::ValidationRejected { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("revenue")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_over_cap_and_empty_statements() {
        let validator = InsightValidator::new(0.01, 2, 5);
        let ctx = context_with_trend(TrendDirection::Down, -50.0);
        let mut c = candidate(vec!["a statement", "another", "a third"]);
        c.issues.push("   ".to_string());
        let err = validator.validate(c, &ctx).unwrap_err();
        match err {
            InsightError::ValidationRejected { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("exceed the cap")));
                assert!(reasons.iter().any(|r| r.contains("empty statement")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_statements_without_numbers_pass() {
        let validator = InsightValidator::new(0.01, 5, 5);
        let ctx = context_with_trend(TrendDirection::Down, -50.0);
        let result = validator.validate(
            candidate(vec!["Creative fatigue is the most likely driver of weak engagement"]),
            &ctx,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_tolerance_allows_rounded_numbers() {
        let validator = InsightValidator::new(0.01, 5, 5);
        let ctx = context_with_trend(TrendDirection::Down, -50.0);
        // 2250 cited as "2,250" and roas 5.0 cited as 5
        let result = validator.validate(
            candidate(vec!["Total revenue of $2,250 at a ROAS of 5 leads the account"]),
            &ctx,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_summary_values_must_be_computed() {
        let validator = InsightValidator::new(0.01, 5, 5);
        let ctx = context_with_trend(TrendDirection::Down, -50.0);
        let mut c = candidate(vec![]);
        c.summary
            .insert("roas".to_string(), MetricValue::Defined(9.99));
        let err = validator.validate(c, &ctx).unwrap_err();
        match err {
            InsightError::ValidationRejected { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("roas")));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
