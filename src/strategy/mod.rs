//! Strategy signal generators.
//!
//! All variants share one contract: filter the market universe, turn
//! (market, price, position) into entry signals, decide when an open
//! position should be closed, and validate signals before submission.
//!
//! An existing position with positive size suppresses new entries unless a
//! variant explicitly re-enters (market making does; the hedge-style
//! variants do not).

pub mod ai_driven;
pub mod endgame;
pub mod high_confidence;
pub mod market_making;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::types::{Market, Position, Side, TradeSignal, MAX_PRICE, MIN_PRICE};

pub use ai_driven::AiDrivenStrategy;
pub use endgame::EndgameStrategy;
pub use high_confidence::HighConfidenceStrategy;
pub use market_making::MarketMakingStrategy;

#[async_trait]
pub trait Strategy: Send {
    fn name(&self) -> &'static str;

    /// Narrow the market universe to this strategy's candidates.
    fn filter_markets<'a>(&self, markets: &'a [Market], now: DateTime<Utc>) -> Vec<&'a Market>;

    /// Per-cycle hook that runs before signal generation, e.g. to batch AI
    /// analysis for the filtered markets. Default: nothing to do.
    async fn prepare(&mut self, _markets: &[&Market], _now: DateTime<Utc>) -> Result<()> {
        Ok(())
    }

    /// Produce entry signals for one market at the current YES price.
    fn generate_signals(
        &mut self,
        market: &Market,
        current_price: f64,
        position: Option<&Position>,
        now: DateTime<Utc>,
    ) -> Vec<TradeSignal>;

    /// Whether an open position should be closed; returns the close reason.
    fn should_close_position(
        &self,
        market: &Market,
        position: &Position,
        current_price: f64,
        now: DateTime<Utc>,
    ) -> Option<String>;

    /// Hedge-style strategies never open positions by selling.
    fn buy_only(&self) -> bool {
        false
    }

    /// Drop invalid signals before submission.
    fn validate_signal(&self, signal: &TradeSignal, market: &Market) -> Result<()> {
        validate_price_and_size(signal, market)?;
        if self.buy_only() && signal.side == Side::Sell {
            anyhow::bail!(
                "strategy {} only opens positions with BUY, got SELL for {}",
                self.name(),
                signal.token_id
            );
        }
        Ok(())
    }
}

/// Price and size bounds shared by every variant.
pub fn validate_price_and_size(signal: &TradeSignal, market: &Market) -> Result<()> {
    if !(MIN_PRICE..=MAX_PRICE).contains(&signal.price) {
        anyhow::bail!(
            "signal price {:.4} outside [{:.2}, {:.2}]",
            signal.price,
            MIN_PRICE,
            MAX_PRICE
        );
    }
    if signal.size < market.min_order_size {
        anyhow::bail!(
            "signal size {:.2} below market minimum {:.2}",
            signal.size,
            market.min_order_size
        );
    }
    Ok(())
}

/// Universe filter shared by all variants: tradeable, liquid enough, not
/// negative-risk (when excluded), capped at `max_markets`.
pub fn base_market_filter<'a>(markets: &'a [Market], config: &Config) -> Vec<&'a Market> {
    markets
        .iter()
        .filter(|m| m.active && !m.closed && m.accepting_orders)
        .filter(|m| !(config.exclude_neg_risk && m.neg_risk))
        .filter(|m| m.liquidity.unwrap_or(0.0) >= config.min_liquidity)
        .filter(|m| m.yes_token().is_some())
        .take(config.max_markets)
        .collect()
}

/// Helper shared by the hedge-style variants: entries are suppressed while
/// any exposure remains.
pub fn has_open_exposure(position: Option<&Position>) -> bool {
    position.is_some_and(|p| p.is_active())
}


#[cfg(test)]
mod tests {
    use super::testutil::market;
    use super::*;
    use clap::Parser;

    fn config() -> Config {
        Config::parse_from(["polyhedge-bot"])
    }

    #[test]
    fn test_base_filter_drops_untradeable_markets() {
        let cfg = config();
        let mut closed = market("closed", 0.5, 5);
        closed.closed = true;
        let mut inactive = market("inactive", 0.5, 5);
        inactive.active = false;
        let mut illiquid = market("illiquid", 0.5, 5);
        illiquid.liquidity = Some(10.0);
        let mut neg_risk = market("negrisk", 0.5, 5);
        neg_risk.neg_risk = true;
        let good = market("good", 0.5, 5);

        let markets = vec![closed, inactive, illiquid, neg_risk, good];
        let filtered = base_market_filter(&markets, &cfg);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].condition_id, "good");
    }

    #[test]
    fn test_base_filter_respects_max_markets() {
        let mut cfg = config();
        cfg.max_markets = 3;
        let markets: Vec<Market> = (0..10).map(|i| market(&format!("m{}", i), 0.5, 5)).collect();
        assert_eq!(base_market_filter(&markets, &cfg).len(), 3);
    }

    #[test]
    fn test_validate_price_and_size_bounds() {
        let m = market("m", 0.5, 5);
        let mut signal = TradeSignal {
            condition_id: "m".into(),
            question: m.question.clone(),
            token_id: "m-yes".into(),
            side: Side::Buy,
            price: 0.5,
            size: 10.0,
            reason: "test".into(),
        };
        assert!(validate_price_and_size(&signal, &m).is_ok());

        signal.price = 0.005;
        assert!(validate_price_and_size(&signal, &m).is_err());
        signal.price = 0.995;
        assert!(validate_price_and_size(&signal, &m).is_err());

        signal.price = 0.5;
        signal.size = 1.0; // below market minimum of 5
        assert!(validate_price_and_size(&signal, &m).is_err());
    }
}
