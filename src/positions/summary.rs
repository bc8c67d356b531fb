//! Portfolio summary produced once per cycle for logging and notification.

use serde::Serialize;

use crate::types::{Market, Position, PositionType, TradeResult};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    pub total_positions: usize,
    pub winning_positions: usize,
    pub losing_positions: usize,
    pub pending_positions: usize,
    pub total_pnl: f64,
    pub total_pnl_percent: f64,
    pub long_positions: usize,
    pub short_positions: usize,
    /// PnL locked in by resolved markets.
    pub resolved_pnl: f64,
    /// Mark-to-market PnL of still-open markets.
    pub unrealized_pnl: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSummary {
    pub positions: Vec<Position>,
    pub markets: Vec<Market>,
    pub summary: SummaryStats,
}

/// Build the cycle summary over all known positions.
pub fn summarize(positions: Vec<Position>, markets: Vec<Market>) -> PositionSummary {
    let mut stats = SummaryStats {
        total_positions: positions.len(),
        ..SummaryStats::default()
    };

    let mut total_cost = 0.0;
    for pos in &positions {
        match pos.result {
            TradeResult::Win => stats.winning_positions += 1,
            TradeResult::Loss => stats.losing_positions += 1,
            TradeResult::Pending | TradeResult::Unknown => {
                stats.pending_positions += 1
            }
        }
        match pos.position_type {
            PositionType::Long => stats.long_positions += 1,
            PositionType::Short => stats.short_positions += 1,
        }
        if let Some(pnl) = pos.pnl {
            stats.total_pnl += pnl;
            if pos.is_resolved {
                stats.resolved_pnl += pnl;
            } else {
                stats.unrealized_pnl += pnl;
            }
        }
        total_cost += pos.avg_price * pos.size;
    }
    stats.total_pnl_percent = if total_cost.abs() > f64::EPSILON {
        stats.total_pnl / total_cost * 100.0
    } else {
        0.0
    };

    PositionSummary {
        positions,
        markets,
        summary: stats,
    }
}
