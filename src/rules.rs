use crate::error::Result;
use crate::kpi::MetricValue;
use crate::report::{InsightCandidate, InsightContext, InsightProvider, InsightReport, ReportSource};
use crate::trend::{latest_trend, TrendDirection, TrendMetric};
use crate::utils::fmt_count;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleCategory {
    Finding,
    Issue,
    Recommendation,
}

/// One entry of the rule table: fires zero or one statement against a
/// context. Every number a statement renders is a substitution of a value
/// already present in the context.
struct InsightRule {
    category: RuleCategory,
    apply: fn(&InsightContext) -> Option<String>,
}

fn significant_move(
    context: &InsightContext,
    metric: TrendMetric,
    direction: TrendDirection,
) -> Option<f64> {
    let point = latest_trend(&context.trends, metric)?;
    if point.significant && point.direction == direction {
        point.pct_delta.defined().map(f64::abs)
    } else {
        None
    }
}

/// The fixed rule table, evaluated top to bottom. Order is priority order:
/// findings and recommendations are capped, so earlier entries win slots.
static RULES: &[InsightRule] = &[
    // -- findings --
    InsightRule {
        category: RuleCategory::Finding,
        apply: |ctx| {
            let ctr = ctx.aggregate.ctr.defined()?;
            (ctr >= 1.0).then(|| format!("Click-through rate of {ctr:.2}% shows healthy engagement"))
        },
    },
    InsightRule {
        category: RuleCategory::Finding,
        apply: |ctx| {
            if !ctx.has_revenue {
                return None;
            }
            let roas = ctx.aggregate.roas.defined()?;
            (roas >= 2.0).then(|| format!("Return on ad spend of {roas:.2} indicates profitable delivery"))
        },
    },
    InsightRule {
        category: RuleCategory::Finding,
        apply: |ctx| {
            if !ctx.has_conversions {
                return None;
            }
            let rate = ctx.aggregate.conversion_rate.defined()?;
            (rate >= 2.0).then(|| format!("Conversion rate of {rate:.2}% is performing well"))
        },
    },
    InsightRule {
        category: RuleCategory::Finding,
        apply: |ctx| {
            significant_move(ctx, TrendMetric::Revenue, TrendDirection::Up)
                .map(|delta| format!("Revenue grew {delta:.1}% over the most recent period"))
        },
    },
    InsightRule {
        category: RuleCategory::Finding,
        apply: |ctx| {
            significant_move(ctx, TrendMetric::Conversions, TrendDirection::Up)
                .map(|delta| format!("Conversions grew {delta:.1}% over the most recent period"))
        },
    },
    InsightRule {
        category: RuleCategory::Finding,
        apply: |ctx| {
            significant_move(ctx, TrendMetric::Ctr, TrendDirection::Down)
                .map(|delta| format!("Click-through rate declined {delta:.1}% over the most recent period"))
        },
    },
    InsightRule {
        category: RuleCategory::Finding,
        apply: |ctx| {
            let cpc = ctx.aggregate.cpc.defined()?;
            Some(format!("Average cost per click is ${cpc:.2}"))
        },
    },
    InsightRule {
        category: RuleCategory::Finding,
        apply: |ctx| {
            Some(format!(
                "Analyzed {} rows of campaign data",
                fmt_count(ctx.cleaning.rows_kept as f64)
            ))
        },
    },
    // -- issues --
    InsightRule {
        category: RuleCategory::Issue,
        apply: |ctx| {
            (ctx.aggregate.total_spend == 0.0)
                .then(|| "No spend recorded; cost metrics are undefined".to_string())
        },
    },
    InsightRule {
        category: RuleCategory::Issue,
        apply: |ctx| {
            if !ctx.has_revenue {
                return None;
            }
            let roas = ctx.aggregate.roas.defined()?;
            (roas < 1.0).then(|| format!("Campaign is losing money: ROAS of {roas:.2} is below break-even"))
        },
    },
    InsightRule {
        category: RuleCategory::Issue,
        apply: |ctx| {
            let ctr = ctx.aggregate.ctr.defined()?;
            (ctr < 1.0).then(|| format!("Low click-through rate of {ctr:.2}% indicates weak ad relevance or targeting"))
        },
    },
    InsightRule {
        category: RuleCategory::Issue,
        apply: |ctx| {
            let cpc = ctx.aggregate.cpc.defined()?;
            (cpc > 2.0).then(|| format!("High cost per click of ${cpc:.2} may erode profitability"))
        },
    },
    InsightRule {
        category: RuleCategory::Issue,
        apply: |ctx| {
            (!ctx.aggregate.conversion_rate.is_defined())
                .then(|| "No conversions recorded: the campaign received no clicks".to_string())
        },
    },
    InsightRule {
        category: RuleCategory::Issue,
        apply: |ctx| {
            if !ctx.has_conversions {
                return None;
            }
            let rate = ctx.aggregate.conversion_rate.defined()?;
            (rate < 2.0).then(|| format!("Conversion rate of {rate:.2}% needs improvement"))
        },
    },
    InsightRule {
        category: RuleCategory::Issue,
        apply: |ctx| {
            if !ctx.has_revenue {
                return None;
            }
            let spend_up = significant_move(ctx, TrendMetric::Spend, TrendDirection::Up)?;
            if significant_move(ctx, TrendMetric::Revenue, TrendDirection::Up).is_some() {
                return None;
            }
            Some(format!("Spend grew {spend_up:.1}% without matching revenue growth"))
        },
    },
    // -- recommendations --
    InsightRule {
        category: RuleCategory::Recommendation,
        apply: |ctx| {
            let ctr = ctx.aggregate.ctr.defined()?;
            (ctr < 1.0).then(|| "Improve ad copy and creative to lift engagement".to_string())
        },
    },
    InsightRule {
        category: RuleCategory::Recommendation,
        apply: |ctx| {
            let cpc = ctx.aggregate.cpc.defined()?;
            (cpc > 2.0).then(|| "Tighten the bidding strategy to reduce cost per click".to_string())
        },
    },
    InsightRule {
        category: RuleCategory::Recommendation,
        apply: |ctx| {
            if !ctx.has_revenue {
                return None;
            }
            let roas = ctx.aggregate.roas.defined()?;
            (roas < 2.0).then(|| "Shift budget toward audiences and placements with higher return".to_string())
        },
    },
    InsightRule {
        category: RuleCategory::Recommendation,
        apply: |ctx| {
            if !ctx.has_conversions {
                return None;
            }
            let rate = ctx.aggregate.conversion_rate.defined()?;
            (rate < 2.0).then(|| "Optimize landing pages and the checkout flow".to_string())
        },
    },
    InsightRule {
        category: RuleCategory::Recommendation,
        apply: |_| Some("Monitor performance daily and rebalance bids toward the strongest campaigns".to_string()),
    },
    InsightRule {
        category: RuleCategory::Recommendation,
        apply: |_| Some("A/B test creatives and messaging before scaling spend".to_string()),
    },
    InsightRule {
        category: RuleCategory::Recommendation,
        apply: |_| Some("Pause underperforming placements and reallocate their budget".to_string()),
    },
];

/// Deterministic insight generation from the fixed rule table. Identical
/// context in, byte-identical report out.
pub struct RuleBasedInsightGenerator {
    max_findings: usize,
    max_recommendations: usize,
}

impl RuleBasedInsightGenerator {
    pub fn new(max_findings: usize, max_recommendations: usize) -> Self {
        Self {
            max_findings,
            max_recommendations,
        }
    }

    pub fn generate(&self, context: &InsightContext) -> InsightReport {
        let mut findings = Vec::new();
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();

        for rule in RULES {
            let Some(statement) = (rule.apply)(context) else {
                continue;
            };
            match rule.category {
                RuleCategory::Finding if findings.len() < self.max_findings => {
                    findings.push(statement);
                }
                RuleCategory::Recommendation
                    if recommendations.len() < self.max_recommendations =>
                {
                    recommendations.push(statement);
                }
                RuleCategory::Issue => issues.push(statement),
                _ => {}
            }
        }

        InsightReport {
            summary: build_summary(context),
            findings,
            issues,
            recommendations,
            source: ReportSource::RuleBased,
        }
    }
}

impl InsightProvider for RuleBasedInsightGenerator {
    fn name(&self) -> &str {
        "rule_based"
    }

    fn produce_insights(&self, context: &InsightContext) -> Result<InsightCandidate> {
        Ok(self.generate(context).into_candidate())
    }
}

fn build_summary(context: &InsightContext) -> BTreeMap<String, MetricValue> {
    let aggregate = &context.aggregate;
    let mut summary = BTreeMap::new();
    summary.insert(
        "total_impressions".to_string(),
        MetricValue::Defined(aggregate.total_impressions),
    );
    summary.insert(
        "total_clicks".to_string(),
        MetricValue::Defined(aggregate.total_clicks),
    );
    summary.insert(
        "total_spend".to_string(),
        MetricValue::Defined(aggregate.total_spend),
    );
    summary.insert(
        "total_conversions".to_string(),
        MetricValue::Defined(aggregate.total_conversions),
    );
    summary.insert(
        "total_revenue".to_string(),
        MetricValue::Defined(aggregate.total_revenue),
    );
    summary.insert("ctr".to_string(), aggregate.ctr);
    summary.insert("cpc".to_string(), aggregate.cpc);
    summary.insert("cpm".to_string(), aggregate.cpm);
    summary.insert("conversion_rate".to_string(), aggregate.conversion_rate);
    summary.insert("roas".to_string(), aggregate.roas);
    summary
}
