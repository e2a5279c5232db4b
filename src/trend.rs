use crate::cleaner::CampaignRecord;
use crate::kpi::MetricValue;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metrics tracked period over period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendMetric {
    Ctr,
    Spend,
    Conversions,
    Revenue,
}

impl TrendMetric {
    pub const TRACKED: [TrendMetric; 4] = [
        TrendMetric::Ctr,
        TrendMetric::Spend,
        TrendMetric::Conversions,
        TrendMetric::Revenue,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrendMetric::Ctr => "ctr",
            TrendMetric::Spend => "spend",
            TrendMetric::Conversions => "conversions",
            TrendMetric::Revenue => "revenue",
        }
    }

    /// Human wording used in generated statements.
    pub fn label(&self) -> &'static str {
        match self {
            TrendMetric::Ctr => "click-through rate",
            TrendMetric::Spend => "spend",
            TrendMetric::Conversions => "conversions",
            TrendMetric::Revenue => "revenue",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

/// Comparison of one metric across two consecutive periods present in the
/// data. `pct_delta` is undefined when the previous period's value was zero;
/// such points are never flagged significant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub metric: TrendMetric,
    pub period: NaiveDate,
    pub previous: f64,
    pub current: f64,
    pub pct_delta: MetricValue,
    pub direction: TrendDirection,
    pub significant: bool,
}

#[derive(Debug, Clone, Copy, Default)]
struct PeriodTotals {
    impressions: f64,
    clicks: f64,
    spend: f64,
    conversions: f64,
    revenue: f64,
}

impl PeriodTotals {
    fn metric(&self, metric: TrendMetric) -> MetricValue {
        match metric {
            TrendMetric::Ctr => MetricValue::scaled_ratio(self.clicks, self.impressions, 100.0),
            TrendMetric::Spend => MetricValue::Defined(self.spend),
            TrendMetric::Conversions => MetricValue::Defined(self.conversions),
            TrendMetric::Revenue => MetricValue::Defined(self.revenue),
        }
    }
}

/// Derive period-over-period trend points from cleaned records.
///
/// Records without a valid date are ignored. Records sharing a date are
/// summed into one period (a date with several campaigns is one period).
/// Consecutive periods are whatever dates are present — no resampling, no
/// invented periods. Fewer than two valid-date periods yields an empty
/// sequence, not an error.
pub fn analyze_trends(records: &[CampaignRecord], significance_threshold: f64) -> Vec<TrendPoint> {
    let mut by_date: BTreeMap<NaiveDate, PeriodTotals> = BTreeMap::new();
    for record in records {
        let Some(date) = record.date else { continue };
        let totals = by_date.entry(date).or_default();
        totals.impressions += record.impressions;
        totals.clicks += record.clicks;
        totals.spend += record.spend;
        totals.conversions += record.conversions;
        totals.revenue += record.revenue;
    }

    if by_date.len() < 2 {
        return Vec::new();
    }

    let periods: Vec<(NaiveDate, PeriodTotals)> = by_date.into_iter().collect();
    let mut points = Vec::new();

    for window in periods.windows(2) {
        let (_, previous) = window[0];
        let (date, current) = window[1];
        for metric in TrendMetric::TRACKED {
            // A period with an undefined value (CTR with zero impressions)
            // has nothing to compare against; skip the pair.
            let (Some(prev), Some(curr)) =
                (previous.metric(metric).defined(), current.metric(metric).defined())
            else {
                continue;
            };

            let pct_delta = MetricValue::scaled_ratio(curr - prev, prev, 100.0);
            let direction = if curr > prev {
                TrendDirection::Up
            } else if curr < prev {
                TrendDirection::Down
            } else {
                TrendDirection::Flat
            };
            let significant = pct_delta
                .defined()
                .is_some_and(|p| p.abs() >= significance_threshold);

            points.push(TrendPoint {
                metric,
                period: date,
                previous: prev,
                current: curr,
                pct_delta,
                direction,
                significant,
            });
        }
    }

    points
}

/// The most recent trend point for a metric, if any.
pub fn latest_trend(points: &[TrendPoint], metric: TrendMetric) -> Option<&TrendPoint> {
    points.iter().rev().find(|p| p.metric == metric)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, impressions: f64, clicks: f64, spend: f64, revenue: f64) -> CampaignRecord {
        CampaignRecord {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").ok(),
            campaign: None,
            impressions,
            clicks,
            spend,
            conversions: 0.0,
            revenue,
        }
    }

    #[test]
    fn test_fewer_than_two_periods_is_empty() {
        assert!(analyze_trends(&[], 10.0).is_empty());
        assert!(analyze_trends(&[record("2024-01-01", 100.0, 1.0, 1.0, 1.0)], 10.0).is_empty());
        // Two records, one valid date: still a single period.
        let records = vec![
            record("2024-01-01", 100.0, 1.0, 1.0, 1.0),
            CampaignRecord {
                date: None,
                campaign: None,
                impressions: 100.0,
                clicks: 1.0,
                spend: 1.0,
                conversions: 0.0,
                revenue: 1.0,
            },
        ];
        assert!(analyze_trends(&records, 10.0).is_empty());
    }

    #[test]
    fn test_percent_delta_and_direction() {
        let records = vec![
            record("2024-01-01", 1000.0, 10.0, 100.0, 200.0),
            record("2024-01-02", 1000.0, 10.0, 120.0, 150.0),
        ];
        let points = analyze_trends(&records, 10.0);

        let spend = latest_trend(&points, TrendMetric::Spend).unwrap();
        assert_eq!(spend.pct_delta, MetricValue::Defined(20.0));
        assert_eq!(spend.direction, TrendDirection::Up);
        assert!(spend.significant);

        let revenue = latest_trend(&points, TrendMetric::Revenue).unwrap();
        assert_eq!(revenue.pct_delta, MetricValue::Defined(-25.0));
        assert_eq!(revenue.direction, TrendDirection::Down);
        assert!(revenue.significant);

        let ctr = latest_trend(&points, TrendMetric::Ctr).unwrap();
        assert_eq!(ctr.direction, TrendDirection::Flat);
        assert!(!ctr.significant);
    }

    #[test]
    fn test_zero_previous_period_is_undefined_not_infinite() {
        let records = vec![
            record("2024-01-01", 1000.0, 10.0, 0.0, 0.0),
            record("2024-01-02", 1000.0, 10.0, 50.0, 75.0),
        ];
        let points = analyze_trends(&records, 10.0);
        let spend = latest_trend(&points, TrendMetric::Spend).unwrap();
        assert_eq!(spend.pct_delta, MetricValue::Undefined);
        assert_eq!(spend.direction, TrendDirection::Up);
        assert!(!spend.significant);
    }

    #[test]
    fn test_same_date_rows_form_one_period() {
        let records = vec![
            record("2024-01-01", 1000.0, 10.0, 50.0, 100.0),
            record("2024-01-01", 1000.0, 30.0, 50.0, 100.0),
            record("2024-01-02", 2000.0, 20.0, 100.0, 300.0),
        ];
        let points = analyze_trends(&records, 10.0);
        // Jan 1 aggregates to CTR 2.0 (40 clicks / 2000 impressions); Jan 2 is 1.0.
        let ctr = latest_trend(&points, TrendMetric::Ctr).unwrap();
        assert_eq!(ctr.previous, 2.0);
        assert_eq!(ctr.current, 1.0);
        assert_eq!(ctr.direction, TrendDirection::Down);
        assert_eq!(ctr.pct_delta, MetricValue::Defined(-50.0));
    }

    #[test]
    fn test_significance_threshold_is_configurable() {
        let records = vec![
            record("2024-01-01", 1000.0, 10.0, 100.0, 100.0),
            record("2024-01-02", 1000.0, 10.0, 105.0, 100.0),
        ];
        let loose = analyze_trends(&records, 10.0);
        assert!(!latest_trend(&loose, TrendMetric::Spend).unwrap().significant);

        let strict = analyze_trends(&records, 5.0);
        assert!(latest_trend(&strict, TrendMetric::Spend).unwrap().significant);
    }
}
