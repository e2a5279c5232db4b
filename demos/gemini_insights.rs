//! Analyze a built-in sample table with Gemini-backed insights, falling back
//! to the rule-based generator on any provider or validation failure.
//!
//! Usage: GEMINI_API_KEY=... cargo run --example gemini_insights --features gemini

use anyhow::{Context, Result};
use campaign_insight_engine::llm::{BlockingGeminiProvider, GeminiInsightClient};
use campaign_insight_engine::{AnalysisConfig, CampaignAnalyzer, RawTable};
use std::env;

fn main() -> Result<()> {
    let api_key = env::var("GEMINI_API_KEY").context("GEMINI_API_KEY is not set")?;

    let table = RawTable::from_str_rows(
        &["Date", "Campaign", "Impressions", "Clicks", "Spend", "Conversions", "Revenue"],
        &[
            &["2024-01-01", "Brand", "125000", "1250", "$450.00", "45", "2,250.00"],
            &["2024-01-02", "Brand", "118000", "1100", "$430.00", "38", "1,980.00"],
            &["2024-01-03", "Brand", "130000", "1400", "$465.00", "52", "2,510.00"],
            &["2024-01-04", "Brand", "64000", "980", "$310.00", "61", "3,020.00"],
        ],
    );

    let config = AnalysisConfig::default();
    let client = GeminiInsightClient::new(api_key).with_timeout(config.provider_timeout);
    let provider = BlockingGeminiProvider::new(client)?;

    let outcome = CampaignAnalyzer::analyze_with_provider(&table, &config, &provider)?;

    println!("report source: {:?}", outcome.report.source);
    println!("{}", serde_json::to_string_pretty(&outcome.report)?);
    Ok(())
}
