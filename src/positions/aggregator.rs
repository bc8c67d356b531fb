//! Trade ledger aggregation: trade history in, per-token positions out.
//!
//! The internal state is a *signed* running size per token (BUY adds, SELL
//! subtracts). A SELL that crosses zero flips the effective side of the
//! position. Only at the read boundary is the state projected to the public
//! shape of {LONG/SHORT, absolute size}; the side comes from the net sign of
//! the running quantity, not from the side of the last fill.

use std::collections::HashMap;

use crate::types::{Position, PositionType, Side, Trade, TradeResult};

/// Positions below this absolute size are considered flat.
const SIZE_EPSILON: f64 = 1e-9;

/// Internal per-token accumulator.
#[derive(Debug, Clone)]
struct RunningPosition {
    /// Net size: positive = long, negative = short.
    signed_size: f64,
    avg_price: f64,
    last_side: Side,
}

impl RunningPosition {
    fn new() -> Self {
        RunningPosition {
            signed_size: 0.0,
            avg_price: 0.0,
            last_side: Side::Buy,
        }
    }

    /// Apply one fill, blending the average price against the signed size.
    ///
    /// BUY:  avg' = (s·avg + q·p) / (s + q),  s' = s + q
    /// SELL: the same formula with q negated, so reducing a long leaves the
    /// average untouched in the common case and a zero-crossing fill
    /// re-bases it on the far side.
    fn apply(&mut self, trade: &Trade) {
        let signed_qty = match trade.side {
            Side::Buy => trade.size,
            Side::Sell => -trade.size,
        };
        let new_size = self.signed_size + signed_qty;

        if new_size.abs() < SIZE_EPSILON {
            // Fully closed: cost basis resets.
            self.signed_size = 0.0;
            self.avg_price = 0.0;
        } else {
            self.avg_price = (self.signed_size * self.avg_price
                + signed_qty * trade.price)
                / new_size;
            self.signed_size = new_size;
        }
        self.last_side = trade.side;
    }

    /// Project to the public position shape.
    fn into_position(self, token_id: String) -> Position {
        let position_type = if self.signed_size > SIZE_EPSILON {
            PositionType::Long
        } else if self.signed_size < -SIZE_EPSILON {
            PositionType::Short
        } else {
            // Flat positions keep the side of the closing fill; they are
            // excluded from active views anyway.
            match self.last_side {
                Side::Buy => PositionType::Long,
                Side::Sell => PositionType::Short,
            }
        };
        Position {
            token_id,
            position_type,
            size: self.signed_size.abs(),
            avg_price: self.avg_price,
            current_price: None,
            is_resolved: false,
            winner: None,
            result: TradeResult::Pending,
            pnl: None,
            pnl_percent: None,
        }
    }
}

/// Fold a trade history into per-token positions.
///
/// Pure function: no side effects, empty input yields an empty map. Trades
/// are applied in chronological order regardless of input order.
pub fn aggregate_positions(trades: &[Trade]) -> HashMap<String, Position> {
    let mut ordered: Vec<&Trade> = trades.iter().collect();
    ordered.sort_by_key(|t| t.timestamp);

    let mut running: HashMap<String, RunningPosition> = HashMap::new();
    for trade in ordered {
        running
            .entry(trade.token_id.clone())
            .or_insert_with(RunningPosition::new)
            .apply(trade);
    }

    running
        .into_iter()
        .map(|(token_id, state)| {
            let pos = state.into_position(token_id.clone());
            (token_id, pos)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Duration, Utc};

    fn trade(token: &str, side: Side, size: f64, price: f64, seq: i64) -> Trade {
        Trade {
            token_id: token.into(),
            side,
            size,
            price,
            timestamp: Utc::now() + Duration::seconds(seq),
        }
    }

    #[test]
    fn test_empty_ledger_yields_empty_map() {
        assert!(aggregate_positions(&[]).is_empty());
    }

    #[test]
    fn test_two_buys_blend_average() {
        // BUY 10@0.50 + BUY 10@0.70 → avg 0.60, size 20, LONG
        let trades = vec![
            trade("tok", Side::Buy, 10.0, 0.50, 0),
            trade("tok", Side::Buy, 10.0, 0.70, 1),
        ];
        let positions = aggregate_positions(&trades);
        let pos = &positions["tok"];
        assert_relative_eq!(pos.avg_price, 0.60, epsilon = 1e-9);
        assert_relative_eq!(pos.size, 20.0, epsilon = 1e-9);
        assert_eq!(pos.position_type, PositionType::Long);
    }

    #[test]
    fn test_average_is_size_weighted() {
        let trades = vec![
            trade("tok", Side::Buy, 30.0, 0.40, 0),
            trade("tok", Side::Buy, 10.0, 0.80, 1),
        ];
        let pos = &aggregate_positions(&trades)["tok"];
        // (30*0.4 + 10*0.8) / 40 = 0.5
        assert_relative_eq!(pos.avg_price, 0.50, epsilon = 1e-9);
    }

    #[test]
    fn test_same_direction_average_stays_within_price_range() {
        let prices = [0.35, 0.62, 0.41, 0.58, 0.49];
        let trades: Vec<Trade> = prices
            .iter()
            .enumerate()
            .map(|(i, p)| trade("tok", Side::Buy, 5.0 + i as f64, *p, i as i64))
            .collect();
        let pos = &aggregate_positions(&trades)["tok"];
        assert!(pos.avg_price >= 0.35 && pos.avg_price <= 0.62);
    }

    #[test]
    fn test_partial_sell_reduces_size_keeps_average() {
        let trades = vec![
            trade("tok", Side::Buy, 20.0, 0.50, 0),
            trade("tok", Side::Sell, 5.0, 0.80, 1),
        ];
        let pos = &aggregate_positions(&trades)["tok"];
        assert_relative_eq!(pos.size, 15.0, epsilon = 1e-9);
        // (20*0.5 - 5*0.8) / 15 = 0.4
        assert_relative_eq!(pos.avg_price, 0.40, epsilon = 1e-9);
        assert_eq!(pos.position_type, PositionType::Long);
    }

    #[test]
    fn test_full_close_resets_cost_basis() {
        let trades = vec![
            trade("tok", Side::Buy, 10.0, 0.50, 0),
            trade("tok", Side::Sell, 10.0, 0.70, 1),
        ];
        let pos = &aggregate_positions(&trades)["tok"];
        assert_relative_eq!(pos.size, 0.0, epsilon = 1e-9);
        assert_relative_eq!(pos.avg_price, 0.0, epsilon = 1e-9);
        assert!(!pos.is_active());
    }

    #[test]
    fn test_sell_crossing_zero_flips_to_short() {
        let trades = vec![
            trade("tok", Side::Buy, 5.0, 0.50, 0),
            trade("tok", Side::Sell, 15.0, 0.60, 1),
        ];
        let pos = &aggregate_positions(&trades)["tok"];
        assert_eq!(pos.position_type, PositionType::Short);
        assert_relative_eq!(pos.size, 10.0, epsilon = 1e-9);
        // (5*0.5 - 15*0.6) / (5 - 15) = 0.65
        assert_relative_eq!(pos.avg_price, 0.65, epsilon = 1e-9);
    }

    #[test]
    fn test_side_comes_from_net_sign_not_last_trade() {
        // Last fill is a BUY but the net size stays short.
        let trades = vec![
            trade("tok", Side::Sell, 20.0, 0.50, 0),
            trade("tok", Side::Buy, 5.0, 0.40, 1),
        ];
        let pos = &aggregate_positions(&trades)["tok"];
        assert_eq!(pos.position_type, PositionType::Short);
        assert_relative_eq!(pos.size, 15.0, epsilon = 1e-9);
    }

    #[test]
    fn test_out_of_order_input_is_applied_chronologically() {
        let trades = vec![
            trade("tok", Side::Sell, 10.0, 0.70, 5),
            trade("tok", Side::Buy, 10.0, 0.50, 0),
        ];
        // Chronologically: buy then flat sell → closed position.
        let pos = &aggregate_positions(&trades)["tok"];
        assert!(!pos.is_active());
    }

    #[test]
    fn test_multiple_tokens_tracked_independently() {
        let trades = vec![
            trade("a", Side::Buy, 10.0, 0.30, 0),
            trade("b", Side::Buy, 4.0, 0.90, 1),
            trade("a", Side::Buy, 10.0, 0.50, 2),
        ];
        let positions = aggregate_positions(&trades);
        assert_eq!(positions.len(), 2);
        assert_relative_eq!(positions["a"].size, 20.0, epsilon = 1e-9);
        assert_relative_eq!(positions["b"].avg_price, 0.90, epsilon = 1e-9);
    }
}
