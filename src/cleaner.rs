use crate::ingestion::RawTable;
use crate::schema::{CanonicalField, ColumnMap};
use chrono::NaiveDate;
use serde::Serialize;

/// Accepted date formats, tried in order; the first successful parse wins.
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d", "%d %b %Y"];

/// One normalized input row. Numeric fields are finite and non-negative;
/// a `None` date means the row is excluded from time-series analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CampaignRecord {
    pub date: Option<NaiveDate>,
    pub campaign: Option<String>,
    pub impressions: f64,
    pub clicks: f64,
    pub spend: f64,
    pub conversions: f64,
    pub revenue: f64,
}

/// Data-quality counts collected while cleaning. These are warnings, not
/// errors: cleaning always proceeds with defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningSummary {
    pub rows_in: usize,
    pub rows_kept: usize,
    pub rows_dropped: usize,
    pub flagged_rows: usize,
    pub unparsable_cells: usize,
    pub invalid_dates: usize,
}

/// Parse a numeric cell after stripping currency symbols, thousands
/// separators, percent signs and whitespace. Returns `None` for empty or
/// unparsable input and for non-finite results.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | '%') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parse a date cell against the accepted format list.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

enum CellState {
    Ok,
    Bad,
    Absent,
}

fn numeric_cell(raw: Option<&str>) -> (f64, CellState) {
    match raw {
        None => (0.0, CellState::Absent),
        Some(text) => match parse_numeric(text) {
            Some(value) if value >= 0.0 => (value, CellState::Ok),
            // Negative ad metrics are data errors; clamp and flag.
            Some(_) => (0.0, CellState::Bad),
            None => (0.0, CellState::Bad),
        },
    }
}

struct ColumnIndices {
    date: Option<usize>,
    campaign: Option<usize>,
    impressions: Option<usize>,
    clicks: Option<usize>,
    spend: Option<usize>,
    conversions: Option<usize>,
    revenue: Option<usize>,
}

impl ColumnIndices {
    fn resolve(table: &RawTable, columns: &ColumnMap) -> Self {
        let index = |field: CanonicalField| {
            columns
                .source(field)
                .and_then(|name| table.column_index(name))
        };
        Self {
            date: index(CanonicalField::Date),
            campaign: index(CanonicalField::Campaign),
            impressions: index(CanonicalField::Impressions),
            clicks: index(CanonicalField::Clicks),
            spend: index(CanonicalField::Spend),
            conversions: index(CanonicalField::Conversions),
            revenue: index(CanonicalField::Revenue),
        }
    }
}

/// Normalize raw rows into `CampaignRecord`s.
///
/// Unparsable or missing numeric cells default to 0 and flag the row. Rows
/// where none of the required numeric cells (impressions, clicks, spend)
/// parse are dropped entirely. Unparsable dates keep the row but leave
/// `date = None`.
pub fn clean_rows(table: &RawTable, columns: &ColumnMap) -> (Vec<CampaignRecord>, CleaningSummary) {
    let idx = ColumnIndices::resolve(table, columns);
    let mut records = Vec::with_capacity(table.row_count());
    let mut summary = CleaningSummary::default();

    for row in table.rows() {
        summary.rows_in += 1;

        let cell = |i: Option<usize>| i.and_then(|i| row.get(i)).map(String::as_str);

        let mut bad_cells = 0usize;
        let mut required_parsed = 0usize;
        let mut numeric = |i: Option<usize>, required: bool| -> f64 {
            let (value, state) = numeric_cell(cell(i));
            match state {
                CellState::Ok => {
                    if required {
                        required_parsed += 1;
                    }
                }
                CellState::Bad => bad_cells += 1,
                CellState::Absent => {}
            }
            value
        };

        let impressions = numeric(idx.impressions, true);
        let clicks = numeric(idx.clicks, true);
        let spend = numeric(idx.spend, true);
        let conversions = numeric(idx.conversions, false);
        let revenue = numeric(idx.revenue, false);

        summary.unparsable_cells += bad_cells;

        if required_parsed == 0 {
            summary.rows_dropped += 1;
            continue;
        }
        if bad_cells > 0 {
            summary.flagged_rows += 1;
        }

        let date = match cell(idx.date) {
            Some(raw) => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    summary.invalid_dates += 1;
                }
                parsed
            }
            None => None,
        };

        let campaign = cell(idx.campaign)
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        summary.rows_kept += 1;
        records.push(CampaignRecord {
            date,
            campaign,
            impressions,
            clicks,
            spend,
            conversions,
            revenue,
        });
    }

    (records, summary)
}
