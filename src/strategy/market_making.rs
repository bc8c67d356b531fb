//! Base market-making variant: quote symmetrically around the mid price,
//! buying up to the position cap and selling inventory back down to zero.

use chrono::{DateTime, Utc};

use super::{base_market_filter, Strategy};
use crate::config::Config;
use crate::types::{Market, Position, Side, TradeSignal, MAX_PRICE, MIN_PRICE};

pub struct MarketMakingStrategy {
    config: Config,
}

impl MarketMakingStrategy {
    pub fn new(config: Config) -> Self {
        MarketMakingStrategy { config }
    }
}

#[async_trait::async_trait]
impl Strategy for MarketMakingStrategy {
    fn name(&self) -> &'static str {
        "market-making"
    }

    fn filter_markets<'a>(&self, markets: &'a [Market], _now: DateTime<Utc>) -> Vec<&'a Market> {
        base_market_filter(markets, &self.config)
            .into_iter()
            .filter(|m| {
                m.yes_token().is_some_and(|t| {
                    t.price >= self.config.min_price && t.price <= self.config.max_price
                })
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
        let Some(yes) = market.yes_token() else {
            return vec![];
        };

        let bid = (current_price - self.config.spread / 2.0).clamp(MIN_PRICE, MAX_PRICE);
        let ask = (current_price + self.config.spread / 2.0).clamp(MIN_PRICE, MAX_PRICE);
        let held = position.map(|p| p.size).unwrap_or(0.0);

        let mut signals = Vec::new();

        // Bid: accumulate inventory up to the position cap.
        let buy_capacity = (self.config.max_position - held).max(0.0);
        let buy_size = self.config.order_size.min(buy_capacity);
        if buy_size >= market.min_order_size {
            signals.push(TradeSignal {
                condition_id: market.condition_id.clone(),
                question: market.question.clone(),
                token_id: yes.token_id.clone(),
                side: Side::Buy,
                price: bid,
                size: buy_size,
                reason: format!("MM bid {:.3} (mid {:.3})", bid, current_price),
            });
        }

        // Ask: work inventory back down to zero, never short.
        let sell_size = self.config.order_size.min(held);
        if sell_size >= market.min_order_size {
            signals.push(TradeSignal {
                condition_id: market.condition_id.clone(),
                question: market.question.clone(),
                token_id: yes.token_id.clone(),
                side: Side::Sell,
                price: ask,
                size: sell_size,
                reason: format!("MM ask {:.3} (mid {:.3})", ask, current_price),
            });
        }

        signals
    }

    fn should_close_position(
        &self,
        _market: &Market,
        position: &Position,
        current_price: f64,
        _now: DateTime<Utc>,
    ) -> Option<String> {
        // Inventory is normally worked off through asks; the stop loss is
        // the only forced exit.
        if position.avg_price > 0.0 {
            let loss = (position.avg_price - current_price) / position.avg_price;
            if loss >= self.config.stop_loss {
                return Some(format!(
                    "stop loss: price {:.3} down {:.1}% from entry {:.3}",
                    current_price,
                    loss * 100.0,
                    position.avg_price
                ));
            }
        }
        None
    }
}
