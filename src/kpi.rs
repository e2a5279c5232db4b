use crate::cleaner::CampaignRecord;
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A performance metric that is either a finite value or explicitly
/// undefined (zero denominator). Serializes as a JSON number or the string
/// `"undefined"` — never NaN or Infinity — so downstream consumers cannot
/// mistake "no data" for "zero performance".
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Defined(f64),
    Undefined,
}

impl MetricValue {
    /// Safe division: `Undefined` whenever the denominator is zero or the
    /// quotient is not finite.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            return MetricValue::Undefined;
        }
        let value = numerator / denominator;
        if value.is_finite() {
            MetricValue::Defined(value)
        } else {
            MetricValue::Undefined
        }
    }

    /// Safe division with a scale factor, for percentage and per-mille
    /// rates. Scales the numerator before dividing so a single correctly
    /// rounded division produces the result.
    pub fn scaled_ratio(numerator: f64, denominator: f64, scale: f64) -> Self {
        Self::ratio(numerator * scale, denominator)
    }

    pub fn defined(&self) -> Option<f64> {
        match self {
            MetricValue::Defined(v) => Some(*v),
            MetricValue::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, MetricValue::Defined(_))
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            MetricValue::Defined(v) => serializer.serialize_f64(*v),
            MetricValue::Undefined => serializer.serialize_str("undefined"),
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(v) if v.is_finite() => Ok(MetricValue::Defined(v)),
            Raw::Number(v) => Err(D::Error::custom(format!("metric value {v} is not finite"))),
            Raw::Text(s) if s == "undefined" => Ok(MetricValue::Undefined),
            Raw::Text(s) => Err(D::Error::custom(format!("unexpected metric value '{s}'"))),
        }
    }
}

impl JsonSchema for MetricValue {
    fn schema_name() -> String {
        "MetricValue".to_string()
    }

    fn json_schema(gen: &mut schemars::gen::SchemaGenerator) -> schemars::schema::Schema {
        let mut object = schemars::schema::SchemaObject::default();
        object.subschemas().any_of = Some(vec![
            gen.subschema_for::<f64>(),
            gen.subschema_for::<String>(),
        ]);
        object.metadata().description = Some(
            "A finite number, or the string \"undefined\" when the metric's denominator is zero"
                .to_string(),
        );
        schemars::schema::Schema::Object(object)
    }
}

/// Per-record derived metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiRow {
    pub ctr: MetricValue,
    pub cpc: MetricValue,
    pub cpm: MetricValue,
    pub conversion_rate: MetricValue,
    pub roas: MetricValue,
}

/// Totals across all records plus metrics computed from those totals.
/// Metrics are never averages of per-row ratios: averaging rates across
/// unequal volumes distorts the aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateKpi {
    pub total_impressions: f64,
    pub total_clicks: f64,
    pub total_spend: f64,
    pub total_conversions: f64,
    pub total_revenue: f64,
    pub ctr: MetricValue,
    pub cpc: MetricValue,
    pub cpm: MetricValue,
    pub conversion_rate: MetricValue,
    pub roas: MetricValue,
}

fn kpi_from_parts(
    impressions: f64,
    clicks: f64,
    spend: f64,
    conversions: f64,
    revenue: f64,
) -> KpiRow {
    KpiRow {
        ctr: MetricValue::scaled_ratio(clicks, impressions, 100.0),
        cpc: MetricValue::ratio(spend, clicks),
        cpm: MetricValue::scaled_ratio(spend, impressions, 1000.0),
        conversion_rate: MetricValue::scaled_ratio(conversions, clicks, 100.0),
        roas: MetricValue::ratio(revenue, spend),
    }
}

/// Compute per-record KPI rows and the aggregate, in one pass.
pub fn compute_kpis(records: &[CampaignRecord]) -> (Vec<KpiRow>, AggregateKpi) {
    let mut rows = Vec::with_capacity(records.len());
    let (mut impressions, mut clicks, mut spend, mut conversions, mut revenue) =
        (0.0, 0.0, 0.0, 0.0, 0.0);
    for r in records {
        impressions += r.impressions;
        clicks += r.clicks;
        spend += r.spend;
        conversions += r.conversions;
        revenue += r.revenue;
        rows.push(kpi_from_parts(
            r.impressions,
            r.clicks,
            r.spend,
            r.conversions,
            r.revenue,
        ));
    }
    let overall = kpi_from_parts(impressions, clicks, spend, conversions, revenue);
    let aggregate = AggregateKpi {
        total_impressions: impressions,
        total_clicks: clicks,
        total_spend: spend,
        total_conversions: conversions,
        total_revenue: revenue,
        ctr: overall.ctr,
        cpc: overall.cpc,
        cpm: overall.cpm,
        conversion_rate: overall.conversion_rate,
        roas: overall.roas,
    };

    (rows, aggregate)
}

/// One row of the KPI table handed to chart and report collaborators:
/// canonical raw fields plus the five derived metrics. The final row of the
/// table is the aggregate, labeled in the `campaign` column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiTableRow {
    pub date: Option<NaiveDate>,
    pub campaign: Option<String>,
    pub impressions: f64,
    pub clicks: f64,
    pub spend: f64,
    pub conversions: f64,
    pub revenue: f64,
    pub ctr: MetricValue,
    pub cpc: MetricValue,
    pub cpm: MetricValue,
    pub conversion_rate: MetricValue,
    pub roas: MetricValue,
}

pub const AGGREGATE_ROW_LABEL: &str = "All campaigns";

pub fn build_kpi_table(
    records: &[CampaignRecord],
    rows: &[KpiRow],
    aggregate: &AggregateKpi,
) -> Vec<KpiTableRow> {
    let mut table: Vec<KpiTableRow> = records
        .iter()
        .zip(rows)
        .map(|(record, kpi)| KpiTableRow {
            date: record.date,
            campaign: record.campaign.clone(),
            impressions: record.impressions,
            clicks: record.clicks,
            spend: record.spend,
            conversions: record.conversions,
            revenue: record.revenue,
            ctr: kpi.ctr,
            cpc: kpi.cpc,
            cpm: kpi.cpm,
            conversion_rate: kpi.conversion_rate,
            roas: kpi.roas,
        })
        .collect();

    table.push(KpiTableRow {
        date: None,
        campaign: Some(AGGREGATE_ROW_LABEL.to_string()),
        impressions: aggregate.total_impressions,
        clicks: aggregate.total_clicks,
        spend: aggregate.total_spend,
        conversions: aggregate.total_conversions,
        revenue: aggregate.total_revenue,
        ctr: aggregate.ctr,
        cpc: aggregate.cpc,
        cpm: aggregate.cpm,
        conversion_rate: aggregate.conversion_rate,
        roas: aggregate.roas,
    });

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(impressions: f64, clicks: f64, spend: f64, conversions: f64, revenue: f64) -> CampaignRecord {
        CampaignRecord {
            date: None,
            campaign: None,
            impressions,
            clicks,
            spend,
            conversions,
            revenue,
        }
    }

    #[test]
    fn test_worked_example() {
        let (rows, _) = compute_kpis(&[record(125_000.0, 1250.0, 450.0, 45.0, 2250.0)]);
        let row = &rows[0];
        assert_eq!(row.ctr, MetricValue::Defined(1.0));
        assert_eq!(row.cpc, MetricValue::Defined(0.36));
        assert_eq!(row.cpm, MetricValue::Defined(3.6));
        assert_eq!(row.conversion_rate, MetricValue::Defined(3.6));
        assert_eq!(row.roas, MetricValue::Defined(5.0));
    }

    #[test]
    fn test_zero_clicks_distinguishes_undefined_from_zero() {
        let (rows, _) = compute_kpis(&[record(1000.0, 0.0, 10.0, 0.0, 0.0)]);
        let row = &rows[0];
        assert_eq!(row.cpc, MetricValue::Undefined);
        assert_eq!(row.conversion_rate, MetricValue::Undefined);
        // impressions > 0, so CTR is a true zero, not undefined
        assert_eq!(row.ctr, MetricValue::Defined(0.0));
        // spend > 0 with zero revenue: ROAS is a true zero
        assert_eq!(row.roas, MetricValue::Defined(0.0));
    }

    #[test]
    fn test_aggregate_computed_from_totals_not_row_means() {
        // Two rows with very different volumes: the mean of per-row ROAS
        // would be 5.5, the volume-weighted truth is 400/130.
        let records = vec![
            record(1000.0, 10.0, 100.0, 1.0, 100.0),
            record(100.0, 1.0, 30.0, 1.0, 300.0),
        ];
        let (_, aggregate) = compute_kpis(&records);
        let expected = 400.0 / 130.0;
        let roas = aggregate.roas.defined().unwrap();
        assert!((roas - expected).abs() < 1e-12);
        assert!((roas - 5.5).abs() > 0.1);
    }

    #[test]
    fn test_empty_input_yields_undefined_aggregate() {
        let (rows, aggregate) = compute_kpis(&[]);
        assert!(rows.is_empty());
        assert_eq!(aggregate.total_spend, 0.0);
        assert_eq!(aggregate.ctr, MetricValue::Undefined);
        assert_eq!(aggregate.roas, MetricValue::Undefined);
    }

    #[test]
    fn test_metrics_never_nan_or_infinite() {
        let records = vec![
            record(0.0, 0.0, 0.0, 0.0, 0.0),
            record(1.0, 1.0, 1.0, 1.0, 1.0),
            record(0.0, 5.0, 0.0, 2.0, 10.0),
        ];
        let (rows, aggregate) = compute_kpis(&records);
        let all_metrics = rows
            .iter()
            .flat_map(|r| [r.ctr, r.cpc, r.cpm, r.conversion_rate, r.roas])
            .chain([
                aggregate.ctr,
                aggregate.cpc,
                aggregate.cpm,
                aggregate.conversion_rate,
                aggregate.roas,
            ]);
        for metric in all_metrics {
            if let MetricValue::Defined(v) = metric {
                assert!(v.is_finite());
                assert!(v >= 0.0);
            }
        }
    }

    #[test]
    fn test_metric_value_serialization() {
        assert_eq!(
            serde_json::to_string(&MetricValue::Defined(2.5)).unwrap(),
            "2.5"
        );
        assert_eq!(
            serde_json::to_string(&MetricValue::Undefined).unwrap(),
            "\"undefined\""
        );
        let round: MetricValue = serde_json::from_str("\"undefined\"").unwrap();
        assert_eq!(round, MetricValue::Undefined);
        let round: MetricValue = serde_json::from_str("3.25").unwrap();
        assert_eq!(round, MetricValue::Defined(3.25));
        assert!(serde_json::from_str::<MetricValue>("\"missing\"").is_err());
    }

    #[test]
    fn test_kpi_table_ends_with_aggregate_row() {
        let records = vec![record(1000.0, 10.0, 5.0, 1.0, 20.0)];
        let (rows, aggregate) = compute_kpis(&records);
        let table = build_kpi_table(&records, &rows, &aggregate);
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.last().unwrap().campaign.as_deref(),
            Some(AGGREGATE_ROW_LABEL)
        );
        assert_eq!(table.last().unwrap().impressions, 1000.0);
    }
}
