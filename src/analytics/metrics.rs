use serde::Serialize;

use super::serialize_ratio;
use crate::models::Trade;

/// Scalar performance statistics over a set of closed trades.
///
/// Every field is 0 for an empty trade set. `profit_factor` is the only field
/// that may be infinite (no losing trades but some profit).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub total_trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percentage of trades with positive pnl (0-100)
    pub win_rate: f64,
    /// Mean of |pnl| / (size * entry)
    pub avg_rr: f64,
    pub net_pnl: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    #[serde(serialize_with = "serialize_ratio")]
    pub profit_factor: f64,
    /// Deepest fall of cumulative pnl below its running peak (<= 0)
    pub max_drawdown: f64,
    pub expectancy: f64,
    pub sharpe_ratio: f64,
    pub std_dev_returns: f64,
    /// Mean time between entry and exit, in hours
    pub avg_holding_time: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

pub fn calculate_metrics(trades: &[Trade]) -> Metrics {
    if trades.is_empty() {
        return Metrics::default();
    }

    let total = trades.len();
    let n = total as f64;
    let pnls: Vec<f64> = trades.iter().map(Trade::pnl).collect();
    let returns: Vec<f64> = trades.iter().map(Trade::return_ratio).collect();

    let winning: Vec<f64> = pnls.iter().copied().filter(|p| *p > 0.0).collect();
    let losing: Vec<f64> = pnls.iter().copied().filter(|p| *p < 0.0).collect();

    let win_fraction = winning.len() as f64 / n;

    let gross_profit: f64 = winning.iter().sum();
    let gross_loss: f64 = losing.iter().sum::<f64>().abs();

    let avg_win = mean(&winning);
    let avg_loss = mean(&losing).abs();
    let expectancy = win_fraction * avg_win - (1.0 - win_fraction) * avg_loss;

    let std_dev_returns = sample_std_dev(&returns);
    let sharpe_ratio = if std_dev_returns > 0.0 {
        mean(&returns) / std_dev_returns
    } else {
        0.0
    };

    let avg_rr = returns.iter().map(|r| r.abs()).sum::<f64>() / n;
    let avg_holding_time = trades.iter().map(Trade::holding_hours).sum::<f64>() / n;

    Metrics {
        total_trades: total,
        wins: winning.len(),
        losses: losing.len(),
        win_rate: win_fraction * 100.0,
        avg_rr,
        net_pnl: pnls.iter().sum(),
        gross_profit,
        gross_loss,
        profit_factor: profit_factor(gross_profit, gross_loss),
        max_drawdown: max_drawdown(trades),
        expectancy,
        sharpe_ratio,
        std_dev_returns,
        avg_holding_time,
        best_trade: pnls.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        worst_trade: pnls.iter().copied().fold(f64::INFINITY, f64::min),
    }
}

pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_loss > 0.0 {
        gross_profit / gross_loss
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Trough of (cumulative pnl - running peak), walking trades by exit date.
/// The running peak starts at the first cumulative value, so the result is never positive.
pub fn max_drawdown(trades: &[Trade]) -> f64 {
    let mut ordered: Vec<&Trade> = trades.iter().collect();
    ordered.sort_by_key(|t| t.exit_date);

    let mut cumulative = 0.0;
    let mut peak = f64::NEG_INFINITY;
    let mut worst = 0.0_f64;

    for trade in ordered {
        cumulative += trade.pnl();
        peak = peak.max(cumulative);
        worst = worst.min(cumulative - peak);
    }

    worst
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample (n - 1) standard deviation; 0 below two observations
pub(crate) fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() as f64 - 1.0);
    variance.sqrt()
}
