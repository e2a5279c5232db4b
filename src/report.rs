use crate::cleaner::CleaningSummary;
use crate::error::Result;
use crate::kpi::{AggregateKpi, MetricValue};
use crate::trend::TrendPoint;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which engine produced a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    RuleBased,
    Ai,
}

/// The frozen numeric context a report is generated from and validated
/// against: aggregate KPIs, trend points, which optional metric families the
/// input actually carried, and the data-quality counts. Serialized verbatim
/// for external providers so every number they may cite is in front of them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsightContext {
    pub aggregate: AggregateKpi,
    pub trends: Vec<TrendPoint>,
    pub has_conversions: bool,
    pub has_revenue: bool,
    pub cleaning: CleaningSummary,
}

impl InsightContext {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// An insight payload before a source has been assigned: what external
/// providers return and what the validator checks. The generated JSON schema
/// is embedded in provider prompts so the expected shape is explicit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InsightCandidate {
    #[schemars(description = "Headline metrics, copied from the supplied context")]
    pub summary: BTreeMap<String, MetricValue>,

    #[schemars(description = "Up to five key findings, most important first")]
    pub findings: Vec<String>,

    #[schemars(description = "All detected risk signals, in priority order")]
    pub issues: Vec<String>,

    #[schemars(description = "Up to five actionable recommendations")]
    pub recommendations: Vec<String>,
}

impl InsightCandidate {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(InsightCandidate)
    }

    pub fn schema_as_json() -> Result<String> {
        let schema = Self::generate_json_schema();
        Ok(serde_json::to_string_pretty(&schema)?)
    }
}

/// The complete narrative output of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub summary: BTreeMap<String, MetricValue>,
    pub findings: Vec<String>,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    pub source: ReportSource,
}

impl InsightReport {
    pub fn from_candidate(candidate: InsightCandidate, source: ReportSource) -> Self {
        Self {
            summary: candidate.summary,
            findings: candidate.findings,
            issues: candidate.issues,
            recommendations: candidate.recommendations,
            source,
        }
    }

    pub fn into_candidate(self) -> InsightCandidate {
        InsightCandidate {
            summary: self.summary,
            findings: self.findings,
            issues: self.issues,
            recommendations: self.recommendations,
        }
    }
}

/// Capability interface for anything that can turn a numeric context into an
/// insight payload. External providers implement this; the rule-based
/// generator is the one fallback implementation that cannot fail.
pub trait InsightProvider {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    fn produce_insights(&self, context: &InsightContext) -> Result<InsightCandidate>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_to_contract_shape() {
        let mut summary = BTreeMap::new();
        summary.insert("roas".to_string(), MetricValue::Defined(5.0));
        summary.insert("cpc".to_string(), MetricValue::Undefined);
        let report = InsightReport {
            summary,
            findings: vec!["ROAS of 5.00 indicates profitable delivery".to_string()],
            issues: vec![],
            recommendations: vec!["A/B test creatives and messaging before scaling spend".to_string()],
            source: ReportSource::RuleBased,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["source"], "rule_based");
        assert_eq!(json["summary"]["roas"], 5.0);
        assert_eq!(json["summary"]["cpc"], "undefined");
        assert!(json["findings"].is_array());
    }

    #[test]
    fn test_candidate_schema_mentions_all_sections() {
        let schema = InsightCandidate::schema_as_json().unwrap();
        for key in ["summary", "findings", "issues", "recommendations"] {
            assert!(schema.contains(key), "schema missing {key}");
        }
    }

    #[test]
    fn test_candidate_parses_provider_json() {
        let payload = r#"{
            "summary": {"ctr": 1.0, "cpc": "undefined"},
            "findings": ["CTR of 1.00% shows healthy engagement"],
            "issues": [],
            "recommendations": ["Monitor performance daily"]
        }"#;
        let candidate: InsightCandidate = serde_json::from_str(payload).unwrap();
        assert_eq!(candidate.summary["ctr"], MetricValue::Defined(1.0));
        assert_eq!(candidate.summary["cpc"], MetricValue::Undefined);
    }
}
