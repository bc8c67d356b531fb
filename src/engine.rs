//! Trading engine: one sequential pipeline per cycle.
//!
//! Each cycle rebuilds positions from the venue's trade history, refreshes
//! prices and resolutions in bounded concurrent batches, classifies position
//! outcomes, then lets the strategy propose entries and closes. A failure in
//! any one lookup degrades that item to no-data; a failure of the whole
//! cycle is logged and the loop continues at the next poll.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::exchange::Exchange;
use crate::positions::{aggregate_positions, resolve_outcome, summarize, SummaryStats};
use crate::strategy::{validate_price_and_size, Strategy};
use crate::types::{Market, MarketResolution, Position, Side, TradeSignal, MAX_PRICE, MIN_PRICE};

/// What one cycle did, for logging and tests.
#[derive(Debug, Default, Clone)]
pub struct CycleReport {
    pub markets_considered: usize,
    pub entry_signals: usize,
    pub close_signals: usize,
    pub orders_submitted: usize,
    pub orders_rejected: usize,
    pub summary: SummaryStats,
}

pub struct Engine {
    config: Config,
    exchange: Arc<dyn Exchange>,
    strategy: Box<dyn Strategy>,
}

impl Engine {
    pub fn new(config: Config, exchange: Arc<dyn Exchange>, strategy: Box<dyn Strategy>) -> Self {
        Engine {
            config,
            exchange,
            strategy,
        }
    }

    /// Poll loop. Cycle errors are logged, never fatal.
    pub async fn run(&mut self) -> Result<()> {
        let poll_interval = Duration::from_secs(self.config.poll_interval_secs);
        info!(
            "Engine started: strategy={}, poll interval {}s",
            self.strategy.name(),
            self.config.poll_interval_secs
        );
        loop {
            match self.run_cycle(Utc::now()).await {
                Ok(report) => info!(
                    "Cycle done: {} markets, {} entries, {} closes, {} submitted, {} rejected, pnl ${:.2}",
                    report.markets_considered,
                    report.entry_signals,
                    report.close_signals,
                    report.orders_submitted,
                    report.orders_rejected,
                    report.summary.total_pnl
                ),
                Err(e) => error!("Cycle failed: {:#}", e),
            }
            tokio::time::sleep(poll_interval).await;
        }
    }

    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        let trades = self
            .exchange
            .fetch_trades()
            .await
            .context("Failed to fetch trade history")?;
        let mut positions = aggregate_positions(&trades);

        let markets = self
            .exchange
            .fetch_markets(self.config.max_markets)
            .await
            .context("Failed to fetch markets")?;
        let token_markets: HashMap<&str, &Market> = markets
            .iter()
            .flat_map(|m| m.tokens.iter().map(move |t| (t.token_id.as_str(), m)))
            .collect();

        let candidates = self.strategy.filter_markets(&markets, now);
        report.markets_considered = candidates.len();

        // Price refresh: candidate YES tokens plus every token we hold.
        let mut price_tokens: Vec<String> = candidates
            .iter()
            .filter_map(|m| m.yes_token())
            .map(|t| t.token_id.clone())
            .collect();
        for token_id in positions.keys() {
            if !price_tokens.contains(token_id) {
                price_tokens.push(token_id.clone());
            }
        }
        let midpoints = self.fetch_midpoints(&price_tokens).await;

        // Resolution lookups for closed markets we hold positions in.
        let resolution_ids: Vec<String> = positions
            .keys()
            .filter_map(|token_id| token_markets.get(token_id.as_str()))
            .filter(|m| m.closed)
            .map(|m| m.condition_id.clone())
            .collect();
        let resolutions = self.fetch_resolutions(&resolution_ids).await;

        for (token_id, position) in positions.iter_mut() {
            let Some(market) = token_markets.get(token_id.as_str()) else {
                continue;
            };
            let Some(outcome) = market.outcome_for_token(token_id) else {
                continue;
            };
            position.current_price = midpoints.get(token_id).copied().or_else(|| {
                market
                    .tokens
                    .iter()
                    .find(|t| &t.token_id == token_id)
                    .map(|t| t.price)
            });
            resolve_outcome(position, resolutions.get(&market.condition_id), outcome);
        }

        let summary = summarize(positions.values().cloned().collect(), markets.clone());
        info!(
            "Portfolio: {} positions ({} win / {} loss / {} pending), pnl ${:.2} ({:+.1}%)",
            summary.summary.total_positions,
            summary.summary.winning_positions,
            summary.summary.losing_positions,
            summary.summary.pending_positions,
            summary.summary.total_pnl,
            summary.summary.total_pnl_percent
        );
        report.summary = summary.summary;

        // A failed prepare (e.g. the AI batch) degrades to rule-only signals.
        if let Err(e) = self.strategy.prepare(&candidates, now).await {
            warn!("Strategy prepare failed, continuing without it: {:#}", e);
        }

        let mut orders: Vec<TradeSignal> = Vec::new();

        for market in &candidates {
            let Some(yes) = market.yes_token() else {
                continue;
            };
            let current_price = midpoints
                .get(&yes.token_id)
                .copied()
                .unwrap_or(yes.price);
            let position = market
                .tokens
                .iter()
                .filter_map(|t| positions.get(&t.token_id))
                .find(|p| p.is_active());
            let signals = self
                .strategy
                .generate_signals(market, current_price, position, now);
            for signal in signals {
                match self.strategy.validate_signal(&signal, market) {
                    Ok(()) => {
                        report.entry_signals += 1;
                        orders.push(signal);
                    }
                    Err(e) => {
                        report.orders_rejected += 1;
                        warn!("Dropping invalid signal for {}: {:#}", signal.token_id, e);
                    }
                }
            }
        }

        for (token_id, position) in &positions {
            if !position.is_active() || position.is_resolved {
                continue;
            }
            let Some(market) = token_markets.get(token_id.as_str()) else {
                continue;
            };
            let Some(current_price) = position.current_price else {
                continue;
            };
            if let Some(reason) =
                self.strategy
                    .should_close_position(market, position, current_price, now)
            {
                let close = close_signal(market, position, current_price, reason);
                match validate_price_and_size(&close, market) {
                    Ok(()) => {
                        report.close_signals += 1;
                        orders.push(close);
                    }
                    Err(e) => {
                        report.orders_rejected += 1;
                        warn!("Dropping invalid close for {}: {:#}", token_id, e);
                    }
                }
            }
        }

        for order in &orders {
            if self.config.dry_run {
                info!(
                    "[DRY RUN] {:?} {} x {:.0} @ {:.3} ({}): {}",
                    order.side, order.token_id, order.size, order.price, order.question, order.reason
                );
                report.orders_submitted += 1;
                continue;
            }
            // Failed submissions are logged and dropped; the next cycle
            // re-derives state from trade history and tries again.
            match self.exchange.submit_order(order).await {
                Ok(order_id) => {
                    report.orders_submitted += 1;
                    info!("Submitted order {} for {}", order_id, order.token_id);
                }
                Err(e) => {
                    report.orders_rejected += 1;
                    error!("Order submission failed for {}: {:#}", order.token_id, e);
                }
            }
        }

        Ok(report)
    }

    /// Midpoint lookups in batches of `batch_size` with a pause between
    /// batches. A failed lookup is dropped; callers fall back to the
    /// snapshot price.
    async fn fetch_midpoints(&self, token_ids: &[String]) -> HashMap<String, f64> {
        let mut prices = HashMap::new();
        for chunk in token_ids.chunks(self.config.batch_size) {
            let lookups = chunk.iter().map(|token_id| async move {
                (token_id.clone(), self.exchange.midpoint_price(token_id).await)
            });
            for (token_id, result) in join_all(lookups).await {
                match result {
                    Ok(price) => {
                        prices.insert(token_id, price);
                    }
                    Err(e) => warn!("Midpoint lookup failed for {}: {:#}", token_id, e),
                }
            }
            if chunk.len() == self.config.batch_size {
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
        }
        prices
    }

    async fn fetch_resolutions(
        &self,
        condition_ids: &[String],
    ) -> HashMap<String, MarketResolution> {
        let mut resolutions = HashMap::new();
        for chunk in condition_ids.chunks(self.config.batch_size) {
            let lookups = chunk.iter().map(|condition_id| async move {
                (
                    condition_id.clone(),
                    self.exchange.fetch_resolution(condition_id).await,
                )
            });
            for (condition_id, result) in join_all(lookups).await {
                match result {
                    Ok(resolution) => {
                        resolutions.insert(condition_id, resolution);
                    }
                    Err(e) => warn!("Resolution lookup failed for {}: {:#}", condition_id, e),
                }
            }
            if chunk.len() == self.config.batch_size {
                tokio::time::sleep(Duration::from_millis(self.config.batch_delay_ms)).await;
            }
        }
        resolutions
    }
}

fn close_signal(
    market: &Market,
    position: &Position,
    current_price: f64,
    reason: String,
) -> TradeSignal {
    TradeSignal {
        condition_id: market.condition_id.clone(),
        question: market.question.clone(),
        token_id: position.token_id.clone(),
        side: Side::Sell,
        price: current_price.clamp(MIN_PRICE, MAX_PRICE),
        size: position.size,
        reason,
    }
}
