use crate::error::Result;
use crate::report::{InsightCandidate, InsightContext};

pub const SYSTEM_PROMPT_INSIGHTS: &str = r#"
You are an AdTech performance analyst writing a narrative summary of one
campaign data set.

## YOUR MISSION
From the supplied numeric context, produce:
1. Up to 5 key findings, most important first
2. Performance issues (red flags), in priority order
3. Up to 5 specific, actionable recommendations
4. A summary block echoing the headline metrics

## CRITICAL RULES - READ CAREFULLY

### Grounding Rules
✅ DO:
- Cite ONLY numbers that appear verbatim in the supplied context
  (totals, aggregate metrics, trend values, percent deltas)
- Describe a metric as increasing or decreasing ONLY when the matching
  trend entry has that direction
- Copy summary metric values exactly; use the string "undefined" where the
  context says "undefined"

❌ DO NOT:
- Invent, extrapolate or round beyond two decimal places
- Compare against industry benchmarks not present in the context
- Mention dates, campaigns or metrics absent from the context
- Treat an "undefined" metric as zero

Your output is machine-validated against the same numbers; any statement
whose figures or directions do not match is discarded wholesale.

## OUTPUT FORMAT
Return ONLY a valid JSON object matching the response schema. No markdown,
no commentary.
"#;

/// Assemble the full prompt: instructions, the frozen numeric context, and
/// the generated JSON schema of the expected response.
pub fn build_insight_prompt(context: &InsightContext) -> Result<String> {
    let context_json = context.to_json()?;
    let schema_json = InsightCandidate::schema_as_json()?;

    Ok(format!(
        "{SYSTEM_PROMPT_INSIGHTS}\n\
        ### CAMPAIGN CONTEXT\n\
        ```json\n{context_json}\n```\n\n\
        ### RESPONSE SCHEMA\n\
        ```json\n{schema_json}\n```"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::CleaningSummary;
    use crate::kpi::{AggregateKpi, MetricValue};

    #[test]
    fn test_prompt_embeds_context_and_schema() {
        let context = InsightContext {
            aggregate: AggregateKpi {
                total_impressions: 1000.0,
                total_clicks: 10.0,
                total_spend: 5.0,
                total_conversions: 1.0,
                total_revenue: 20.0,
                ctr: MetricValue::Defined(1.0),
                cpc: MetricValue::Defined(0.5),
                cpm: MetricValue::Defined(5.0),
                conversion_rate: MetricValue::Defined(10.0),
                roas: MetricValue::Defined(4.0),
            },
            trends: Vec::new(),
            has_conversions: true,
            has_revenue: true,
            cleaning: CleaningSummary::default(),
        };
        let prompt = build_insight_prompt(&context).unwrap();
        assert!(prompt.contains("total_impressions"));
        assert!(prompt.contains("RESPONSE SCHEMA"));
        assert!(prompt.contains("recommendations"));
    }
}
