//! High-confidence variant: buy strong favorites (YES ≥ 0.80) with a small
//! NO-side hedge attached, and exit on profit, weakness, stop loss or the
//! approach of resolution.

use chrono::{DateTime, Utc};

use super::{base_market_filter, has_open_exposure, Strategy};
use crate::config::Config;
use crate::types::{Market, Position, Side, TradeSignal};

/// Entry requires the YES price at or above this level.
const ENTRY_THRESHOLD: f64 = 0.80;
/// A favorite slipping below this level has lost its thesis.
const EXIT_PRICE_FLOOR: f64 = 0.75;
/// Stop trading a market this close to resolution.
const MIN_HOURS_TO_RESOLUTION: f64 = 12.0;
/// Share of the order that goes into the YES leg; the rest hedges NO.
const YES_FRACTION: f64 = 0.90;

pub struct HighConfidenceStrategy {
    config: Config,
}

impl HighConfidenceStrategy {
    pub fn new(config: Config) -> Self {
        HighConfidenceStrategy { config }
    }
}

#[async_trait::async_trait]
impl Strategy for HighConfidenceStrategy {
    fn name(&self) -> &'static str {
        "high-confidence"
    }

    fn buy_only(&self) -> bool {
        true
    }

    fn filter_markets<'a>(&self, markets: &'a [Market], now: DateTime<Utc>) -> Vec<&'a Market> {
        base_market_filter(markets, &self.config)
            .into_iter()
            .filter(|m| m.yes_token().is_some_and(|t| t.price >= ENTRY_THRESHOLD))
            .filter(|m| {
                m.hours_to_resolution(now)
                    .is_none_or(|h| h >= MIN_HOURS_TO_RESOLUTION)
            })
            .collect()
    }

    fn generate_signals(
        &mut self,
        market: &Market,
        current_price: f64,
        position: Option<&Position>,
        _now: DateTime<Utc>,
    ) -> Vec<TradeSignal> {
        if has_open_exposure(position) {
            return vec![];
        }
        if current_price < ENTRY_THRESHOLD {
            return vec![];
        }
        let (Some(yes), Some(no)) = (market.yes_token(), market.no_token()) else {
            return vec![];
        };

        let yes_size = (self.config.order_size * YES_FRACTION).floor();
        let no_size = (self.config.order_size * (1.0 - YES_FRACTION)).floor();
        let mut signals = vec![TradeSignal {
            condition_id: market.condition_id.clone(),
            question: market.question.clone(),
            token_id: yes.token_id.clone(),
            side: Side::Buy,
            price: current_price,
            size: yes_size,
            reason: format!("high-confidence entry at {:.3}", current_price),
        }];
        if no_size >= market.min_order_size {
            signals.push(TradeSignal {
                condition_id: market.condition_id.clone(),
                question: market.question.clone(),
                token_id: no.token_id.clone(),
                side: Side::Buy,
                price: no.price,
                size: no_size,
                reason: format!("hedge leg for high-confidence entry at {:.3}", current_price),
            });
        }
        signals
    }

    fn should_close_position(
        &self,
        market: &Market,
        position: &Position,
        current_price: f64,
        now: DateTime<Utc>,
    ) -> Option<String> {
        if position.avg_price > 0.0 {
            let gain = (current_price - position.avg_price) / position.avg_price;
            if gain >= self.config.profit_threshold {
                return Some(format!(
                    "profit target: up {:.1}% from entry {:.3}",
                    gain * 100.0,
                    position.avg_price
                ));
            }
            let loss = -gain;
            if loss >= self.config.stop_loss {
                return Some(format!(
                    "stop loss: down {:.1}% from entry {:.3}",
                    loss * 100.0,
                    position.avg_price
                ));
            }
        }
        if current_price < EXIT_PRICE_FLOOR {
            return Some(format!(
                "price {:.3} below confidence floor {:.2}",
                current_price, EXIT_PRICE_FLOOR
            ));
        }
        if let Some(hours) = market.hours_to_resolution(now) {
            if hours < MIN_HOURS_TO_RESOLUTION {
                return Some(format!("{:.1}h to resolution", hours));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::super::testutil::{long_position, market};
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;
    use clap::Parser;

    fn strategy() -> HighConfidenceStrategy {
        let mut cfg = Config::parse_from(["polyhedge-bot"]);
        cfg.order_size = 100.0;
        cfg.profit_threshold = 0.10;
        cfg.stop_loss = 0.15;
        HighConfidenceStrategy::new(cfg)
    }

    #[test]
    fn test_entry_emits_paired_yes_no_signals() {
        let mut strat = strategy();
        let m = market("m", 0.85, 5);
        let signals = strat.generate_signals(&m, 0.85, None, Utc::now());
        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].token_id, "m-yes");
        assert_relative_eq!(signals[0].size, 90.0, epsilon = 1e-9);
        assert_eq!(signals[1].token_id, "m-no");
        assert_relative_eq!(signals[1].size, 10.0, epsilon = 1e-9);
        assert!(signals.iter().all(|s| s.side == Side::Buy));
    }

    #[test]
    fn test_no_entry_below_threshold() {
        let mut strat = strategy();
        let m = market("m", 0.79, 5);
        assert!(strat.generate_signals(&m, 0.79, None, Utc::now()).is_empty());
    }

    #[test]
    fn test_existing_position_suppresses_entry() {
        let mut strat = strategy();
        let m = market("m", 0.85, 5);
        let pos = long_position("m-yes", 90.0, 0.82);
        assert!(strat
            .generate_signals(&m, 0.85, Some(&pos), Utc::now())
            .is_empty());
    }

    #[test]
    fn test_close_on_profit_threshold() {
        let strat = strategy();
        let m = market("m", 0.93, 5);
        let pos = long_position("m-yes", 90.0, 0.82);
        // 0.93 / 0.82 − 1 ≈ 13.4% > 10%
        let reason = strat.should_close_position(&m, &pos, 0.93, Utc::now());
        assert!(reason.unwrap().contains("profit"));
    }

    #[test]
    fn test_close_when_price_drops_below_floor() {
        let strat = strategy();
        let m = market("m", 0.74, 5);
        let pos = long_position("m-yes", 90.0, 0.80);
        let reason = strat.should_close_position(&m, &pos, 0.74, Utc::now());
        assert!(reason.unwrap().contains("confidence floor"));
    }

    #[test]
    fn test_close_near_resolution() {
        let strat = strategy();
        let mut m = market("m", 0.85, 0);
        m.end_date = Some(Utc::now() + Duration::hours(6));
        let pos = long_position("m-yes", 90.0, 0.84);
        let reason = strat.should_close_position(&m, &pos, 0.85, Utc::now());
        assert!(reason.unwrap().contains("resolution"));
    }

    #[test]
    fn test_hold_inside_bands() {
        let strat = strategy();
        let m = market("m", 0.84, 5);
        let pos = long_position("m-yes", 90.0, 0.82);
        assert!(strat
            .should_close_position(&m, &pos, 0.84, Utc::now())
            .is_none());
    }
}
