//! Exchange seam: everything the engine needs from the venue, behind one
//! trait so the cycle logic can be tested against a mock.

pub mod polymarket;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{Market, MarketResolution, Trade, TradeSignal};

pub use polymarket::PolymarketClient;

#[async_trait]
pub trait Exchange: Send + Sync {
    /// Snapshot of currently listed binary markets.
    async fn fetch_markets(&self, limit: usize) -> Result<Vec<Market>>;

    /// Full trade history for the account, oldest first not guaranteed.
    async fn fetch_trades(&self) -> Result<Vec<Trade>>;

    /// Current midpoint price for one outcome token.
    async fn midpoint_price(&self, token_id: &str) -> Result<f64>;

    /// Resolution state of a market, if the venue has one.
    async fn fetch_resolution(&self, condition_id: &str) -> Result<MarketResolution>;

    /// Submit an order; returns the venue's order id.
    async fn submit_order(&self, signal: &TradeSignal) -> Result<String>;
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// In-memory venue for engine tests. Markets, trades, prices and
    /// resolutions are preset; submitted orders are recorded.
    pub struct MockExchange {
        pub markets: Vec<Market>,
        pub trades: Vec<Trade>,
        pub midpoints: HashMap<String, f64>,
        pub resolutions: HashMap<String, MarketResolution>,
        pub submitted: Mutex<Vec<TradeSignal>>,
        pub fail_submissions: bool,
    }

    impl MockExchange {
        pub fn new(markets: Vec<Market>, trades: Vec<Trade>) -> Self {
            MockExchange {
                markets,
                trades,
                midpoints: HashMap::new(),
                resolutions: HashMap::new(),
                submitted: Mutex::new(Vec::new()),
                fail_submissions: false,
            }
        }
    }

    #[async_trait]
    impl Exchange for MockExchange {
        async fn fetch_markets(&self, limit: usize) -> Result<Vec<Market>> {
            Ok(self.markets.iter().take(limit).cloned().collect())
        }

        async fn fetch_trades(&self) -> Result<Vec<Trade>> {
            Ok(self.trades.clone())
        }

        async fn midpoint_price(&self, token_id: &str) -> Result<f64> {
            self.midpoints
                .get(token_id)
                .copied()
                .ok_or_else(|| anyhow::anyhow!("no midpoint for {}", token_id))
        }

        async fn fetch_resolution(&self, condition_id: &str) -> Result<MarketResolution> {
            Ok(self
                .resolutions
                .get(condition_id)
                .cloned()
                .unwrap_or(MarketResolution {
                    winner: None,
                    resolved: false,
                }))
        }

        async fn submit_order(&self, signal: &TradeSignal) -> Result<String> {
            if self.fail_submissions {
                anyhow::bail!("submission rejected");
            }
            let mut submitted = self.submitted.lock().unwrap();
            submitted.push(signal.clone());
            Ok(format!("order-{}", submitted.len()))
        }
    }
}
