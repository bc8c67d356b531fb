//! Endgame sweep variant: buy near-certain markets inside a probability
//! window, with both legs sized by the tail-risk hedge engine so the
//! downside stays capped if the favorite fails.

use chrono::{DateTime, Utc};
use tracing::warn;

use super::{base_market_filter, has_open_exposure, Strategy};
use crate::config::Config;
use crate::hedge::compute_hedge;
use crate::types::{Market, Position, Side, TradeSignal};

/// Stop trading a market this close to resolution.
const MIN_HOURS_TO_RESOLUTION: f64 = 24.0;

pub struct EndgameStrategy {
    config: Config,
}

impl EndgameStrategy {
    pub fn new(config: Config) -> Self {
        EndgameStrategy { config }
    }
}

#[async_trait::async_trait]
impl Strategy for EndgameStrategy {
    fn name(&self) -> &'static str {
        "endgame"
    }

    fn buy_only(&self) -> bool {
        true
    }

    fn filter_markets<'a>(&self, markets: &'a [Market], now: DateTime<Utc>) -> Vec<&'a Market> {
        base_market_filter(markets, &self.config)
            .into_iter()
            .filter(|m| {
                m.yes_token().is_some_and(|t| {
                    t.price >= self.config.min_probability && t.price <= self.config.max_probability
                })
            })
            .filter(|m| {
                m.days_to_resolution(now)
                    .is_some_and(|d| d <= self.config.max_days_to_resolution)
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
        if current_price < self.config.min_probability
            || current_price > self.config.max_probability
        {
            return vec![];
        }
        let (Some(yes), Some(no)) = (market.yes_token(), market.no_token()) else {
            return vec![];
        };

        // order_size doubles as the USD budget for the primary leg here.
        let hedge = match compute_hedge(
            self.config.order_size,
            current_price,
            self.config.max_acceptable_loss,
        ) {
            Ok(h) => h,
            Err(e) => {
                warn!("Hedge sizing failed for {}: {}", market.condition_id, e);
                return vec![];
            }
        };

        vec![
            TradeSignal {
                condition_id: market.condition_id.clone(),
                question: market.question.clone(),
                token_id: yes.token_id.clone(),
                side: Side::Buy,
                price: current_price,
                size: hedge.main_position_size,
                reason: format!(
                    "endgame entry at {:.3} (max loss ${:.2})",
                    current_price, hedge.max_loss
                ),
            },
            TradeSignal {
                condition_id: market.condition_id.clone(),
                question: market.question.clone(),
                token_id: no.token_id.clone(),
                side: Side::Buy,
                price: 1.0 - current_price,
                size: hedge.hedge_position_size,
                reason: format!(
                    "tail hedge: {} NO shares cap loss near ${:.2}",
                    hedge.hedge_position_size, hedge.max_loss
                ),
            },
        ]
    }

    fn should_close_position(
        &self,
        market: &Market,
        _position: &Position,
        current_price: f64,
        now: DateTime<Utc>,
    ) -> Option<String> {
        if current_price >= self.config.early_exit_threshold {
            return Some(format!(
                "early exit: price {:.3} at threshold {:.3}",
                current_price, self.config.early_exit_threshold
            ));
        }
        if current_price < self.config.min_probability {
            return Some(format!(
                "price {:.3} fell out of the certainty window (min {:.2})",
                current_price, self.config.min_probability
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
