use serde::Serialize;
use std::collections::BTreeMap;

use super::metrics::{calculate_metrics, mean, Metrics};
use crate::models::Trade;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyMetrics {
    /// `YYYY-MM` of the exit date
    pub month: String,
    #[serde(flatten)]
    pub metrics: Metrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagStats {
    pub tag: String,
    pub trades: usize,
    pub win_rate: f64,
    pub avg_pnl: f64,
    pub total_pnl: f64,
    pub expectancy: f64,
}

/// Group trades by exit month and recompute the full metric set per month,
/// oldest month first.
pub fn monthly_metrics(trades: &[Trade]) -> Vec<MonthlyMetrics> {
    let mut months: BTreeMap<String, Vec<Trade>> = BTreeMap::new();
    for trade in trades {
        months
            .entry(trade.exit_date.format("%Y-%m").to_string())
            .or_default()
            .push(trade.clone());
    }

    months
        .into_iter()
        .map(|(month, group)| MonthlyMetrics {
            month,
            metrics: calculate_metrics(&group),
        })
        .collect()
}

/// One row per (trade, tag): a trade carrying three tags counts once under each.
/// Untagged trades do not appear. Ordered by tag name.
pub fn tag_stats(trades: &[Trade]) -> Vec<TagStats> {
    let mut by_tag: BTreeMap<&str, Vec<&Trade>> = BTreeMap::new();
    for trade in trades {
        for tag in &trade.tags {
            by_tag.entry(tag.as_str()).or_default().push(trade);
        }
    }

    by_tag
        .into_iter()
        .map(|(tag, group)| {
            let pnls: Vec<f64> = group.iter().map(|t| t.pnl()).collect();
            let wins = pnls.iter().filter(|p| **p > 0.0).count();
            let owned: Vec<Trade> = group.into_iter().cloned().collect();

            TagStats {
                tag: tag.to_string(),
                trades: pnls.len(),
                win_rate: wins as f64 / pnls.len() as f64 * 100.0,
                avg_pnl: mean(&pnls),
                total_pnl: pnls.iter().sum(),
                expectancy: calculate_metrics(&owned).expectancy,
            }
        })
        .collect()
}
