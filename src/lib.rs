//! # Campaign Insight Engine
//!
//! A library for turning tabular advertising-campaign exports of unknown
//! column naming into normalized KPIs and a grounded, deterministic
//! narrative report (findings, issues, recommendations).
//!
//! ## Core Concepts
//!
//! - **Schema mapping**: arbitrary column headers are resolved onto a fixed
//!   canonical field set via an ordered alias table
//! - **Cleaning**: currency symbols, separators and mixed date formats are
//!   normalized; bad cells default to zero and are counted, not dropped
//! - **Safe arithmetic**: every ratio metric is `Defined(value)` or
//!   `Undefined` — never NaN, never Infinity, never a zero that lies
//! - **Grounded insights**: the rule-based generator only substitutes
//!   computed values into statements; external provider output is validated
//!   against the same numbers and replaced by the rule-based report on any
//!   mismatch
//!
//! ## Example
//!
//! ```rust,ignore
//! use campaign_insight_engine::*;
//!
//! let table = RawTable::from_str_rows(
//!     &["Date", "Campaign", "Impressions", "Click_Count", "Total Spend ($)", "Revenue"],
//!     &[
//!         &["2024-01-01", "Brand", "125000", "1250", "$450.00", "2,250.00"],
//!         &["2024-01-02", "Brand", "118000", "1100", "$430.00", "1,980.00"],
//!     ],
//! );
//!
//! let outcome = analyze_campaign_table(&table, &AnalysisConfig::default())?;
//! println!("{}", serde_json::to_string_pretty(&outcome.report)?);
//! ```

pub mod cleaner;
pub mod error;
pub mod ingestion;
pub mod kpi;
pub mod report;
pub mod rules;
pub mod schema;
pub mod trend;
pub mod utils;
pub mod validator;

#[cfg(feature = "gemini")]
pub mod llm;

pub use cleaner::{clean_rows, parse_date, parse_numeric, CampaignRecord, CleaningSummary};
pub use error::{InsightError, Result};
pub use ingestion::RawTable;
pub use kpi::{
    build_kpi_table, compute_kpis, AggregateKpi, KpiRow, KpiTableRow, MetricValue,
    AGGREGATE_ROW_LABEL,
};
pub use report::{
    InsightCandidate, InsightContext, InsightProvider, InsightReport, ReportSource,
};
pub use rules::RuleBasedInsightGenerator;
pub use schema::{AliasTable, CanonicalField, ColumnMap};
pub use trend::{analyze_trends, latest_trend, TrendDirection, TrendMetric, TrendPoint};
pub use validator::InsightValidator;

use log::{debug, info};
use std::time::Duration;

/// Explicit configuration surface of the pipeline. Everything that was a
/// judgment call in the decision rules is a parameter here, not a hidden
/// constant.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// A trend is significant when |percent delta| meets this threshold.
    pub significance_threshold: f64,
    /// Relative tolerance when matching numbers cited by external payloads
    /// against computed values.
    pub validation_tolerance: f64,
    /// Upper bound on one external provider call.
    pub provider_timeout: Duration,
    pub max_findings: usize,
    pub max_recommendations: usize,
    /// Alias table used to resolve input headers; extend it for
    /// site-specific exports before analyzing.
    pub aliases: AliasTable,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            significance_threshold: 10.0,
            validation_tolerance: 0.01,
            provider_timeout: Duration::from_secs(30),
            max_findings: 5,
            max_recommendations: 5,
            aliases: AliasTable::default(),
        }
    }
}

/// Everything one pipeline run produces. The caller owns it; nothing is
/// cached across runs.
#[derive(Debug, Clone)]
pub struct AnalysisOutcome {
    pub column_map: ColumnMap,
    pub records: Vec<CampaignRecord>,
    pub cleaning: CleaningSummary,
    pub kpi_rows: Vec<KpiRow>,
    pub aggregate: AggregateKpi,
    pub kpi_table: Vec<KpiTableRow>,
    pub trends: Vec<TrendPoint>,
    pub context: InsightContext,
    pub report: InsightReport,
}

pub struct CampaignAnalyzer;

impl CampaignAnalyzer {
    /// Run the full pipeline with the rule-based insight generator.
    pub fn analyze(table: &RawTable, config: &AnalysisConfig) -> Result<AnalysisOutcome> {
        Self::run(table, config, None)
    }

    /// Run the full pipeline, asking an external provider for insights.
    /// Provider failure, timeout or validation rejection falls back to the
    /// rule-based generator; the pipeline always returns a complete report.
    pub fn analyze_with_provider(
        table: &RawTable,
        config: &AnalysisConfig,
        provider: &dyn InsightProvider,
    ) -> Result<AnalysisOutcome> {
        Self::run(table, config, Some(provider))
    }

    fn run(
        table: &RawTable,
        config: &AnalysisConfig,
        provider: Option<&dyn InsightProvider>,
    ) -> Result<AnalysisOutcome> {
        validate_config(config)?;

        let column_map = config.aliases.resolve(table.columns())?;
        info!(
            "Resolved {} of {} input columns across {} rows",
            column_map.len(),
            table.columns().len(),
            table.row_count()
        );

        let (records, cleaning) = clean_rows(table, &column_map);
        if records.is_empty() {
            return Err(InsightError::EmptyTable);
        }
        debug!(
            "Cleaning kept {} rows, dropped {}, flagged {} ({} bad cells, {} invalid dates)",
            cleaning.rows_kept,
            cleaning.rows_dropped,
            cleaning.flagged_rows,
            cleaning.unparsable_cells,
            cleaning.invalid_dates
        );

        let (kpi_rows, aggregate) = compute_kpis(&records);
        let trends = analyze_trends(&records, config.significance_threshold);
        let context = InsightContext {
            aggregate: aggregate.clone(),
            trends: trends.clone(),
            has_conversions: column_map.contains(CanonicalField::Conversions),
            has_revenue: column_map.contains(CanonicalField::Revenue),
            cleaning: cleaning.clone(),
        };

        let fallback =
            RuleBasedInsightGenerator::new(config.max_findings, config.max_recommendations);
        let report = match provider {
            None => fallback.generate(&context),
            Some(provider) => match provider.produce_insights(&context) {
                Ok(candidate) => {
                    let validator = InsightValidator::new(
                        config.validation_tolerance,
                        config.max_findings,
                        config.max_recommendations,
                    );
                    match validator.validate(candidate, &context) {
                        Ok(report) => report,
                        Err(err) => {
                            info!(
                                "Payload from provider '{}' rejected, using rule-based report: {err}",
                                provider.name()
                            );
                            fallback.generate(&context)
                        }
                    }
                }
                Err(err) => {
                    info!(
                        "Provider '{}' failed, using rule-based report: {err}",
                        provider.name()
                    );
                    fallback.generate(&context)
                }
            },
        };

        let kpi_table = build_kpi_table(&records, &kpi_rows, &aggregate);

        Ok(AnalysisOutcome {
            column_map,
            records,
            cleaning,
            kpi_rows,
            aggregate,
            kpi_table,
            trends,
            context,
            report,
        })
    }
}

/// Run the full pipeline with default rule-based insights.
pub fn analyze_campaign_table(
    table: &RawTable,
    config: &AnalysisConfig,
) -> Result<AnalysisOutcome> {
    CampaignAnalyzer::analyze(table, config)
}

fn validate_config(config: &AnalysisConfig) -> Result<()> {
    if !config.significance_threshold.is_finite() || config.significance_threshold < 0.0 {
        return Err(InsightError::InvalidConfig {
            details: format!(
                "significance threshold {} must be a non-negative finite percentage",
                config.significance_threshold
            ),
        });
    }
    if !config.validation_tolerance.is_finite()
        || config.validation_tolerance < 0.0
        || config.validation_tolerance >= 1.0
    {
        return Err(InsightError::InvalidConfig {
            details: format!(
                "validation tolerance {} must be in [0, 1)",
                config.validation_tolerance
            ),
        });
    }
    if config.max_findings == 0 || config.max_recommendations == 0 {
        return Err(InsightError::InvalidConfig {
            details: "finding and recommendation caps must be at least 1".to_string(),
        });
    }
    Ok(())
}
