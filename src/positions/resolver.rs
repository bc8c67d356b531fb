//! Joins a position with market resolution data to classify win/loss/pending
//! and attach realized or unrealized PnL.
//!
//! A SHORT position is a bet *against* the token's assigned outcome, so it
//! wins exactly when the resolved winner differs from that outcome.

use crate::types::{MarketResolution, Position, PositionType, TradeResult};

/// Classify a position against resolution data and fill in PnL.
///
/// * `resolution` — winner/resolved pair for the market, if the lookup
///   succeeded. `None` (lookup degraded to no-data) leaves the position
///   pending.
/// * `outcome` — the outcome string assigned to the position's token
///   ("Yes" / "No").
///
/// PnL rules:
/// - resolved: final price is 1.0 on a win, 0.0 on a loss;
/// - unresolved but a current price is known: the same formulas with the
///   current price substituted (unrealized PnL);
/// - neither: no PnL, result stays pending.
pub fn resolve_outcome(
    position: &mut Position,
    resolution: Option<&MarketResolution>,
    outcome: &str,
) {
    let winner = match resolution {
        Some(r) if r.resolved => r.winner.as_deref(),
        _ => None,
    };

    match winner {
        Some(winner) => {
            position.is_resolved = true;
            position.winner = Some(winner.to_string());
            let outcome_won = winner.eq_ignore_ascii_case(outcome);
            let won = match position.position_type {
                PositionType::Long => outcome_won,
                PositionType::Short => !outcome_won,
            };
            position.result = if won { TradeResult::Win } else { TradeResult::Loss };
            let final_price = if outcome_won { 1.0 } else { 0.0 };
            apply_pnl(position, final_price);
        }
        None => {
            position.is_resolved = false;
            position.result = TradeResult::Pending;
            if let Some(current) = position.current_price {
                apply_pnl(position, current);
            } else {
                position.pnl = None;
                position.pnl_percent = None;
            }
        }
    }
}

fn apply_pnl(position: &mut Position, mark_price: f64) {
    let pnl = match position.position_type {
        PositionType::Long => (mark_price - position.avg_price) * position.size,
        PositionType::Short => (position.avg_price - mark_price) * position.size,
    };
    position.pnl = Some(pnl);
    let cost = position.avg_price * position.size;
    position.pnl_percent = if cost.abs() > f64::EPSILON {
        Some(pnl / cost * 100.0)
    } else {
        None
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn long_position(size: f64, avg: f64) -> Position {
        Position {
            token_id: "tok".into(),
            position_type: PositionType::Long,
            size,
            avg_price: avg,
            current_price: None,
            is_resolved: false,
            winner: None,
            result: TradeResult::Pending,
            pnl: None,
            pnl_percent: None,
        }
    }

    fn resolved(winner: &str) -> MarketResolution {
        MarketResolution {
            winner: Some(winner.into()),
            resolved: true,
        }
    }

    #[test]
    fn test_long_wins_when_winner_matches_outcome() {
        let mut pos = long_position(10.0, 0.60);
        resolve_outcome(&mut pos, Some(&resolved("Yes")), "Yes");
        assert_eq!(pos.result, TradeResult::Win);
        // (1.0 - 0.6) * 10
        assert_relative_eq!(pos.pnl.unwrap(), 4.0, epsilon = 1e-9);
        assert_relative_eq!(pos.pnl_percent.unwrap(), 400.0 / 6.0, epsilon = 1e-6);
    }

    #[test]
    fn test_long_loses_when_winner_differs() {
        // LONG on 'Yes', winner 'No' → loss, pnl = (0 − avg)·size
        let mut pos = long_position(10.0, 0.60);
        resolve_outcome(&mut pos, Some(&resolved("No")), "Yes");
        assert_eq!(pos.result, TradeResult::Loss);
        assert_relative_eq!(pos.pnl.unwrap(), -6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_short_wins_against_outcome() {
        let mut pos = long_position(10.0, 0.30);
        pos.position_type = PositionType::Short;
        resolve_outcome(&mut pos, Some(&resolved("No")), "Yes");
        assert_eq!(pos.result, TradeResult::Win);
        // short pnl = (avg − final)·size = (0.3 − 0.0)·10
        assert_relative_eq!(pos.pnl.unwrap(), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_short_loses_when_outcome_wins() {
        let mut pos = long_position(10.0, 0.30);
        pos.position_type = PositionType::Short;
        resolve_outcome(&mut pos, Some(&resolved("Yes")), "Yes");
        assert_eq!(pos.result, TradeResult::Loss);
        assert_relative_eq!(pos.pnl.unwrap(), -7.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unresolved_with_current_price_marks_unrealized() {
        let mut pos = long_position(10.0, 0.50);
        pos.current_price = Some(0.70);
        resolve_outcome(&mut pos, None, "Yes");
        assert_eq!(pos.result, TradeResult::Pending);
        assert!(!pos.is_resolved);
        assert_relative_eq!(pos.pnl.unwrap(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_no_resolution_no_price_stays_pending_without_pnl() {
        let mut pos = long_position(10.0, 0.50);
        resolve_outcome(&mut pos, None, "Yes");
        assert_eq!(pos.result, TradeResult::Pending);
        assert!(pos.pnl.is_none());
        assert!(pos.pnl_percent.is_none());
    }

    #[test]
    fn test_resolution_without_winner_stays_pending() {
        let mut pos = long_position(10.0, 0.50);
        let res = MarketResolution {
            winner: None,
            resolved: true,
        };
        resolve_outcome(&mut pos, Some(&res), "Yes");
        assert_eq!(pos.result, TradeResult::Pending);
        assert!(pos.pnl.is_none());
    }

    #[test]
    fn test_zero_avg_price_guards_pnl_percent() {
        let mut pos = long_position(10.0, 0.0);
        resolve_outcome(&mut pos, Some(&resolved("Yes")), "Yes");
        assert!(pos.pnl.is_some());
        assert!(pos.pnl_percent.is_none());
    }
}
