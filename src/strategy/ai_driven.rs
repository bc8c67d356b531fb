//! AI-driven variant: entries are delegated to the AI budget controller.
//!
//! `prepare` runs once per cycle: it ranks the filtered markets, sends the
//! affordable top slice through the bounded request queue, caches the
//! parsed analyses and charges the batch cost. Signal generation is then a
//! pure read of the cache plus the edge gate, so re-running it against an
//! unexpired cached analysis yields the identical signal.

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{info, warn};

use super::{base_market_filter, has_open_exposure, Strategy};
use crate::ai::{AiController, AiProvider, BudgetState, RequestQueue};
use crate::config::Config;
use crate::types::{Market, Position, RecommendedAction, RiskLevel, Side, TradeSignal};

pub struct AiDrivenStrategy {
    config: Config,
    controller: AiController,
    provider: Arc<dyn AiProvider>,
    queue: RequestQueue,
}

impl AiDrivenStrategy {
    pub fn new(config: Config, provider: Arc<dyn AiProvider>, now: DateTime<Utc>) -> Self {
        let controller = AiController::new(&config, now);
        let queue = RequestQueue::new(
            config.ai_max_concurrency,
            config.ai_request_delay_ms,
            config.ai_max_retries,
        );
        AiDrivenStrategy {
            config,
            controller,
            provider,
            queue,
        }
    }

    /// Multiplicative sizing factors, each clamped to its documented band.
    fn size_for(&self, analysis_attractiveness: f64, confidence: f64, edge: f64, risk: RiskLevel) -> f64 {
        let attractiveness_mult = 1.0 + analysis_attractiveness.clamp(0.0, 1.0); // 1.0–2.0
        let confidence_mult = 0.5 + confidence.clamp(0.0, 1.0); // 0.5–1.5
        let edge_mult = (1.0 + edge * 5.0).clamp(1.0, 2.0); // 1.0–2.0
        let risk_mult = match risk {
            RiskLevel::Low => 1.5,
            RiskLevel::Medium => 1.0,
            RiskLevel::High => 0.5,
        };
        let multiplier =
            (attractiveness_mult * confidence_mult * edge_mult * risk_mult).clamp(0.5, 6.0);
        (self.config.order_size * multiplier)
            .min(self.config.max_position)
            .floor()
    }
}

#[async_trait::async_trait]
impl Strategy for AiDrivenStrategy {
    fn name(&self) -> &'static str {
        "ai-driven"
    }

    fn buy_only(&self) -> bool {
        true
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

    /// Run the per-cycle AI batch for markets lacking a fresh analysis.
    async fn prepare(&mut self, markets: &[&Market], now: DateTime<Utc>) -> Result<()> {
        self.controller.sweep_cache(now);

        if self.controller.budget_state(now) == BudgetState::Exhausted {
            info!("AI budget exhausted; falling back to rule-based filtering");
            return Ok(());
        }

        let uncached: Vec<&Market> = markets
            .iter()
            .copied()
            .filter(|m| self.controller.cached(&m.condition_id, now).is_none())
            .collect();
        let selected = self.controller.select_markets_for_analysis(&uncached, now);
        if selected.is_empty() {
            return Ok(());
        }
        info!("Analyzing {} market(s) with AI", selected.len());

        let provider = Arc::clone(&self.provider);
        let queue = &self.queue;
        let tasks = selected.iter().map(|market| {
            let provider = Arc::clone(&provider);
            async move {
                let result = queue
                    .run(|| {
                        let provider = Arc::clone(&provider);
                        async move { provider.analyze_market(market, None).await }
                    })
                    .await;
                (market.condition_id.clone(), result)
            }
        });

        let results = join_all(tasks).await;
        // Optimistic accounting: the whole batch is charged regardless of
        // per-item failures.
        self.controller.record_batch_cost(selected.len());

        for (condition_id, result) in results {
            match result {
                Ok(analysis) => self.controller.store(condition_id, analysis, now),
                Err(e) => warn!("AI analysis failed for {}: {}", condition_id, e),
            }
        }
        Ok(())
    }

    fn generate_signals(
        &mut self,
        market: &Market,
        current_price: f64,
        position: Option<&Position>,
        now: DateTime<Utc>,
    ) -> Vec<TradeSignal> {
        if has_open_exposure(position) {
            return vec![];
        }
        let Some(analysis) = self.controller.cached(&market.condition_id, now) else {
            return vec![];
        };
        if analysis.attractiveness < self.config.min_ai_attractiveness {
            return vec![];
        }
        let Some(decision) = self.controller.evaluate_edge(analysis, current_price) else {
            return vec![];
        };

        let (token, price) = match decision.action {
            RecommendedAction::BuyYes => (market.yes_token(), current_price),
            RecommendedAction::BuyNo => (market.no_token(), 1.0 - current_price),
            RecommendedAction::Avoid => return vec![],
        };
        let Some(token) = token else {
            return vec![];
        };

        let size = self.size_for(
            analysis.attractiveness,
            analysis.confidence,
            decision.edge,
            analysis.risk_level,
        );
        if size < market.min_order_size {
            return vec![];
        }

        vec![TradeSignal {
            condition_id: market.condition_id.clone(),
            question: market.question.clone(),
            token_id: token.token_id.clone(),
            side: Side::Buy,
            price,
            size,
            reason: format!(
                "AI {:?} edge {:.3} conf {:.2}: {}",
                decision.action, decision.edge, analysis.confidence, analysis.reasoning
            ),
        }]
    }

    fn should_close_position(
        &self,
        _market: &Market,
        position: &Position,
        current_price: f64,
        _now: DateTime<Utc>,
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
            if -gain >= self.config.stop_loss {
                return Some(format!(
                    "stop loss: down {:.1}% from entry {:.3}",
                    -gain * 100.0,
                    position.avg_price
                ));
            }
        }
        None
    }
}
