use serde::Serialize;

use super::breakdowns::{hour_stats, strategy_stats, weekday_stats};
use super::buckets::tag_stats;
use super::metrics::calculate_metrics;
use crate::models::Trade;

const STRATEGY_WIN_RATE_FLOOR: f64 = 50.0;
const WEEKDAY_WIN_RATE_FLOOR: f64 = 40.0;
const TARGET_RR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightLevel {
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insight {
    pub level: InsightLevel,
    pub message: String,
}

impl Insight {
    fn info(message: String) -> Self {
        Self {
            level: InsightLevel::Info,
            message,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            level: InsightLevel::Warning,
            message,
        }
    }
}

/// Rule-based coaching notes derived from the trade ledger.
///
/// Rules run in a fixed order: weak strategies, reward-to-risk, weak weekdays,
/// best tag by expectancy, then best and worst exit hour.
pub fn generate_insights(trades: &[Trade]) -> Vec<Insight> {
    if trades.is_empty() {
        return Vec::new();
    }

    let mut insights = Vec::new();

    for stats in strategy_stats(trades) {
        if stats.win_rate < STRATEGY_WIN_RATE_FLOOR {
            insights.push(Insight::warning(format!(
                "Your trades using {} have a {:.1}% win rate. Consider refining this setup.",
                stats.strategy, stats.win_rate
            )));
        }
    }

    let metrics = calculate_metrics(trades);
    if metrics.avg_rr < TARGET_RR {
        insights.push(Insight::warning(format!(
            "Improve reward-to-risk. Average R:R is {:.2}, aim for trades above {:.1}.",
            metrics.avg_rr, TARGET_RR
        )));
    }

    for day in weekday_stats(trades) {
        if day.win_rate < WEEKDAY_WIN_RATE_FLOOR {
            insights.push(Insight::warning(format!(
                "Avoid trading on {}s, your win rate is {:.1}%.",
                day.weekday, day.win_rate
            )));
        }
    }

    // First tag wins ties (tags are name-ordered)
    let best_tag = tag_stats(trades)
        .into_iter()
        .reduce(|best, t| if t.expectancy > best.expectancy { t } else { best });
    if let Some(tag) = best_tag {
        insights.push(Insight::info(format!(
            "Your highest expectancy ({:.2}) comes from trades tagged as '{}'",
            tag.expectancy, tag.tag
        )));
    }

    let hours = hour_stats(trades);
    let best_hour = hours
        .iter()
        .reduce(|best, h| if h.win_rate > best.win_rate { h } else { best });
    let worst_hour = hours
        .iter()
        .reduce(|worst, h| if h.win_rate < worst.win_rate { h } else { worst });

    if let (Some(best), Some(worst)) = (best_hour, worst_hour) {
        insights.push(Insight::info(format!(
            "Your most consistent performance occurs during {}:00 hours (win rate: {:.1}%)",
            best.hour, best.win_rate
        )));
        if worst.hour != best.hour {
            insights.push(Insight::warning(format!(
                "Consider avoiding trades during {}:00 hours (win rate: {:.1}%)",
                worst.hour, worst.win_rate
            )));
        }
    }

    insights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::{tagged, trade_at};

    fn messages(insights: &[Insight], level: InsightLevel) -> Vec<&str> {
        insights
            .iter()
            .filter(|i| i.level == level)
            .map(|i| i.message.as_str())
            .collect()
    }

    #[test]
    fn test_no_trades_no_insights() {
        assert!(generate_insights(&[]).is_empty());
    }

    #[test]
    fn test_weak_strategy_and_low_rr_warnings() {
        let mut loser = trade_at(100.0, 90.0, 1.0, "2024-01-01T10:00:00");
        loser.strategy = Some("Gap Fade".to_string());
        let mut winner = trade_at(100.0, 300.0, 1.0, "2024-01-01T11:00:00");
        winner.strategy = Some("Trend".to_string());

        let insights = generate_insights(&[loser, winner]);
        let warnings = messages(&insights, InsightLevel::Warning);

        assert!(warnings.contains(
            &"Your trades using Gap Fade have a 0.0% win rate. Consider refining this setup."
        ));
        assert!(!warnings.iter().any(|m| m.contains("Trend")));
        // mean(|0.1|, |2.0|) = 1.05
        assert!(warnings.iter().any(|m| m.contains("Average R:R is 1.05")));
    }

    #[test]
    fn test_weekday_warning_below_forty_percent() {
        // 2024-01-01 Monday: 1 win out of 3; 2024-01-02 Tuesday: 1 of 1
        let trades = vec![
            trade_at(100.0, 110.0, 1.0, "2024-01-01T10:00:00"),
            trade_at(100.0, 90.0, 1.0, "2024-01-01T10:00:00"),
            trade_at(100.0, 90.0, 1.0, "2024-01-01T10:00:00"),
            trade_at(100.0, 110.0, 1.0, "2024-01-02T10:00:00"),
        ];
        let insights = generate_insights(&trades);
        let warnings = messages(&insights, InsightLevel::Warning);

        assert!(warnings.contains(&"Avoid trading on Mondays, your win rate is 33.3%."));
        assert!(!warnings.iter().any(|m| m.contains("Tuesdays")));
    }

    #[test]
    fn test_best_tag_and_hours() {
        let trades = vec![
            tagged(trade_at(100.0, 150.0, 1.0, "2024-01-01T10:00:00"), 1, &["breakout"]),
            tagged(trade_at(100.0, 90.0, 1.0, "2024-01-01T15:00:00"), 2, &["reversal"]),
        ];
        let insights = generate_insights(&trades);
        let info = messages(&insights, InsightLevel::Info);
        let warnings = messages(&insights, InsightLevel::Warning);

        assert!(info.contains(&"Your highest expectancy (50.00) comes from trades tagged as 'breakout'"));
        assert!(info.contains(&"Your most consistent performance occurs during 10:00 hours (win rate: 100.0%)"));
        assert!(warnings.contains(&"Consider avoiding trades during 15:00 hours (win rate: 0.0%)"));
    }

    #[test]
    fn test_single_hour_has_no_worst_hour_warning() {
        let insights = generate_insights(&[trade_at(100.0, 300.0, 1.0, "2024-01-01T10:00:00")]);
        assert!(!insights.iter().any(|i| i.message.starts_with("Consider avoiding")));
        assert!(insights.iter().any(|i| i.message.contains("10:00 hours")));
    }
}
