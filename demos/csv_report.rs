//! Analyze a campaign CSV export and print the KPI table and insight report.
//!
//! Usage: cargo run --example csv_report -- path/to/export.csv

use anyhow::{Context, Result};
use campaign_insight_engine::utils::fmt_metric;
use campaign_insight_engine::{analyze_campaign_table, AnalysisConfig, RawTable};
use std::env;
use std::fs::File;

fn main() -> Result<()> {
    let path = env::args()
        .nth(1)
        .context("usage: csv_report <path/to/export.csv>")?;

    let file = File::open(&path).with_context(|| format!("opening {path}"))?;
    let mut reader = csv::Reader::from_reader(file);

    let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        rows.push(record?.iter().map(str::to_string).collect());
    }
    let table = RawTable::new(columns, rows);

    let outcome = analyze_campaign_table(&table, &AnalysisConfig::default())?;

    println!(
        "Cleaned {} rows ({} dropped, {} flagged)\n",
        outcome.cleaning.rows_kept, outcome.cleaning.rows_dropped, outcome.cleaning.flagged_rows
    );

    println!("{:<12} {:>12} {:>8} {:>10} {:>8} {:>8}", "date", "impressions", "ctr", "cpc", "cvr", "roas");
    for row in &outcome.kpi_table {
        let date = row
            .date
            .map(|d| d.to_string())
            .unwrap_or_else(|| row.campaign.clone().unwrap_or_default());
        println!(
            "{:<12} {:>12} {:>8} {:>10} {:>8} {:>8}",
            date,
            row.impressions,
            fmt_metric(row.ctr, 2),
            fmt_metric(row.cpc, 2),
            fmt_metric(row.conversion_rate, 2),
            fmt_metric(row.roas, 2),
        );
    }

    println!("\n{}", serde_json::to_string_pretty(&outcome.report)?);
    Ok(())
}
