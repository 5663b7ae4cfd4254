use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::Trade;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityCurvePoint {
    pub trade_id: i64,
    pub exit_date: NaiveDateTime,
    pub pnl: f64,
    pub cumulative_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyStats {
    pub strategy: String,
    pub trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayStats {
    pub weekday: String,
    pub trades: usize,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourStats {
    pub hour: u32,
    pub trades: usize,
    pub win_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RrPoint {
    pub trade_id: i64,
    pub rr: f64,
    pub pnl: f64,
    pub win: bool,
}

/// Running total of pnl, one point per trade in exit order
pub fn equity_curve(trades: &[Trade]) -> Vec<EquityCurvePoint> {
    let mut ordered: Vec<&Trade> = trades.iter().collect();
    ordered.sort_by_key(|t| t.exit_date);

    let mut cumulative_pnl = 0.0;
    ordered
        .into_iter()
        .map(|t| {
            let pnl = t.pnl();
            cumulative_pnl += pnl;
            EquityCurvePoint {
                trade_id: t.id,
                exit_date: t.exit_date,
                pnl,
                cumulative_pnl,
            }
        })
        .collect()
}

/// Trades without a strategy (or a blank one) are left out
pub fn strategy_stats(trades: &[Trade]) -> Vec<StrategyStats> {
    let mut groups: BTreeMap<&str, (usize, usize, f64)> = BTreeMap::new();
    for trade in trades {
        let Some(strategy) = trade.strategy.as_deref().map(str::trim).filter(|s| !s.is_empty())
        else {
            continue;
        };
        let entry = groups.entry(strategy).or_insert((0, 0, 0.0));
        entry.0 += 1;
        if trade.is_win() {
            entry.1 += 1;
        }
        entry.2 += trade.pnl();
    }

    groups
        .into_iter()
        .map(|(strategy, (count, wins, total_pnl))| StrategyStats {
            strategy: strategy.to_string(),
            trades: count,
            win_rate: percent(wins, count),
            total_pnl,
        })
        .collect()
}

/// Win rate per exit weekday, Monday first; days without trades are omitted
pub fn weekday_stats(trades: &[Trade]) -> Vec<WeekdayStats> {
    let mut groups: BTreeMap<u32, (Weekday, usize, usize)> = BTreeMap::new();
    for trade in trades {
        let day = trade.exit_date.weekday();
        let entry = groups
            .entry(day.num_days_from_monday())
            .or_insert((day, 0, 0));
        entry.1 += 1;
        if trade.is_win() {
            entry.2 += 1;
        }
    }

    groups
        .into_values()
        .map(|(day, count, wins)| WeekdayStats {
            weekday: weekday_name(day).to_string(),
            trades: count,
            win_rate: percent(wins, count),
        })
        .collect()
}

/// Win rate per exit hour (0-23), ascending
pub fn hour_stats(trades: &[Trade]) -> Vec<HourStats> {
    let mut groups: BTreeMap<u32, (usize, usize)> = BTreeMap::new();
    for trade in trades {
        let entry = groups.entry(trade.exit_date.hour()).or_insert((0, 0));
        entry.0 += 1;
        if trade.is_win() {
            entry.1 += 1;
        }
    }

    groups
        .into_iter()
        .map(|(hour, (count, wins))| HourStats {
            hour,
            trades: count,
            win_rate: percent(wins, count),
        })
        .collect()
}

pub fn rr_scatter(trades: &[Trade]) -> Vec<RrPoint> {
    trades
        .iter()
        .map(|t| RrPoint {
            trade_id: t.id,
            rr: t.return_ratio().abs(),
            pnl: t.pnl(),
            win: t.is_win(),
        })
        .collect()
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::test_support::trade_at;

    fn with_strategy(mut t: Trade, id: i64, strategy: Option<&str>) -> Trade {
        t.id = id;
        t.strategy = strategy.map(str::to_string);
        t
    }

    #[test]
    fn test_equity_curve_accumulates_in_exit_order() {
        let trades = vec![
            with_strategy(trade_at(100.0, 90.0, 1.0, "2024-01-03T10:00:00"), 1, None),
            with_strategy(trade_at(100.0, 130.0, 1.0, "2024-01-01T10:00:00"), 2, None),
            with_strategy(trade_at(100.0, 95.0, 2.0, "2024-01-02T10:00:00"), 3, None),
        ];
        let curve = equity_curve(&trades);

        let ids: Vec<i64> = curve.iter().map(|p| p.trade_id).collect();
        let cumulative: Vec<f64> = curve.iter().map(|p| p.cumulative_pnl).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert_eq!(cumulative, vec![30.0, 20.0, 10.0]);
    }

    #[test]
    fn test_strategy_stats_skip_missing_strategy() {
        let trades = vec![
            with_strategy(trade_at(100.0, 110.0, 1.0, "2024-01-01T10:00:00"), 1, Some("ORB")),
            with_strategy(trade_at(100.0, 90.0, 1.0, "2024-01-02T10:00:00"), 2, Some("ORB")),
            with_strategy(trade_at(100.0, 90.0, 1.0, "2024-01-02T10:00:00"), 3, Some("  ")),
            with_strategy(trade_at(100.0, 120.0, 1.0, "2024-01-02T10:00:00"), 4, None),
        ];
        let stats = strategy_stats(&trades);

        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].strategy, "ORB");
        assert_eq!(stats[0].trades, 2);
        assert_eq!(stats[0].win_rate, 50.0);
        assert_eq!(stats[0].total_pnl, 0.0);
    }

    #[test]
    fn test_weekday_and_hour_grouping() {
        // 2024-01-01 is a Monday, 2024-01-03 a Wednesday
        let trades = vec![
            trade_at(100.0, 110.0, 1.0, "2024-01-03T14:00:00"),
            trade_at(100.0, 90.0, 1.0, "2024-01-01T09:30:00"),
            trade_at(100.0, 105.0, 1.0, "2024-01-01T14:45:00"),
        ];

        let days = weekday_stats(&trades);
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].weekday, "Monday");
        assert_eq!(days[0].trades, 2);
        assert_eq!(days[0].win_rate, 50.0);
        assert_eq!(days[1].weekday, "Wednesday");
        assert_eq!(days[1].win_rate, 100.0);

        let hours = hour_stats(&trades);
        assert_eq!(hours.len(), 2);
        assert_eq!(hours[0].hour, 9);
        assert_eq!(hours[0].win_rate, 0.0);
        assert_eq!(hours[1].hour, 14);
        assert_eq!(hours[1].trades, 2);
    }

    #[test]
    fn test_rr_scatter_is_absolute() {
        let points = rr_scatter(&[trade_at(100.0, 90.0, 1.0, "2024-01-01T10:00:00")]);
        assert_eq!(points.len(), 1);
        assert!((points[0].rr - 0.1).abs() < 1e-12);
        assert_eq!(points[0].pnl, -10.0);
        assert!(!points[0].win);
    }
}
