use clap::{Parser, ValueEnum};

use crate::types::RiskLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyKind {
    /// Symmetric market making around the mid price
    MarketMaking,
    /// High-confidence favorite buying with a small NO hedge
    HighConfidence,
    /// Near-certain endgame sweep with engine-sized hedge legs
    Endgame,
    /// AI-gated entries under a spend budget
    Ai,
}

/// Polymarket hedged-position trading bot
#[derive(Parser, Debug, Clone)]
#[command(name = "polyhedge-bot", version, about)]
pub struct Config {
    /// Run in dry-run mode (no real orders submitted)
    #[arg(long, env = "DRY_RUN", default_value = "true")]
    pub dry_run: bool,

    /// Which signal generator to run
    #[arg(long, env = "STRATEGY", value_enum, default_value = "market-making")]
    pub strategy: StrategyKind,

    /// Polling interval between cycles, in seconds
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value = "60")]
    pub poll_interval_secs: u64,

    /// Number of per-market lookups issued concurrently per batch
    #[arg(long, env = "BATCH_SIZE", default_value = "5")]
    pub batch_size: usize,

    /// Delay between lookup batches, in milliseconds
    #[arg(long, env = "BATCH_DELAY_MS", default_value = "500")]
    pub batch_delay_ms: u64,

    /// Polymarket Gamma (markets) API base URL
    #[arg(
        long,
        env = "POLYMARKET_API_URL",
        default_value = "https://gamma-api.polymarket.com"
    )]
    pub polymarket_api_url: String,

    /// Polymarket CLOB (Central Limit Order Book) URL
    #[arg(
        long,
        env = "POLYMARKET_CLOB_URL",
        default_value = "https://clob.polymarket.com"
    )]
    pub polymarket_clob_url: String,

    /// Polymarket API key (required for live trading)
    #[arg(long, env = "POLYMARKET_API_KEY")]
    pub polymarket_api_key: Option<String>,

    // ------------------------------------------------------------------
    // Common strategy surface
    // ------------------------------------------------------------------
    /// Base order size in shares
    #[arg(long, env = "ORDER_SIZE", default_value = "100.0")]
    pub order_size: f64,

    /// Maximum position size per token, in shares
    #[arg(long, env = "MAX_POSITION", default_value = "500.0")]
    pub max_position: f64,

    /// Full quoting spread for market making (bid = mid − spread/2)
    #[arg(long, env = "SPREAD", default_value = "0.02")]
    pub spread: f64,

    /// Close a position once unrealized gain reaches this fraction
    #[arg(long, env = "PROFIT_THRESHOLD", default_value = "0.10")]
    pub profit_threshold: f64,

    /// Close a position once unrealized loss reaches this fraction
    #[arg(long, env = "STOP_LOSS", default_value = "0.15")]
    pub stop_loss: f64,

    /// Lowest YES price considered for entries
    #[arg(long, env = "MIN_PRICE", default_value = "0.05")]
    pub min_price: f64,

    /// Highest YES price considered for entries
    #[arg(long, env = "MAX_PRICE", default_value = "0.95")]
    pub max_price: f64,

    /// Skip negative-risk (multi-outcome) markets
    #[arg(long, env = "EXCLUDE_NEG_RISK", default_value = "true")]
    pub exclude_neg_risk: bool,

    /// Maximum number of markets considered per cycle
    #[arg(long, env = "MAX_MARKETS", default_value = "50")]
    pub max_markets: usize,

    /// Minimum market liquidity (USD) for entries
    #[arg(long, env = "MIN_LIQUIDITY", default_value = "1000.0")]
    pub min_liquidity: f64,

    // ------------------------------------------------------------------
    // Endgame strategy
    // ------------------------------------------------------------------
    /// Maximum acceptable loss fraction for the hedge engine
    #[arg(long, env = "MAX_ACCEPTABLE_LOSS", default_value = "0.03")]
    pub max_acceptable_loss: f64,

    /// Lower bound of the near-certain probability window
    #[arg(long, env = "MIN_PROBABILITY", default_value = "0.90")]
    pub min_probability: f64,

    /// Upper bound of the near-certain probability window
    #[arg(long, env = "MAX_PROBABILITY", default_value = "0.99")]
    pub max_probability: f64,

    /// Skip markets resolving further out than this many days
    #[arg(long, env = "MAX_DAYS_TO_RESOLUTION", default_value = "30")]
    pub max_days_to_resolution: f64,

    /// Exit an endgame position early once price reaches this level
    #[arg(long, env = "EARLY_EXIT_THRESHOLD", default_value = "0.995")]
    pub early_exit_threshold: f64,

    // ------------------------------------------------------------------
    // AI strategy / budget controller
    // ------------------------------------------------------------------
    /// Consult the AI controller when filtering markets
    #[arg(long, env = "USE_AI", default_value = "false")]
    pub use_ai: bool,

    /// Minimum attractiveness score for AI entries (0.0–1.0)
    #[arg(long, env = "MIN_AI_ATTRACTIVENESS", default_value = "0.6")]
    pub min_ai_attractiveness: f64,

    /// Highest acceptable AI risk level (low, medium, high)
    #[arg(long, env = "MAX_AI_RISK", value_parser = parse_risk_level, default_value = "medium")]
    pub max_ai_risk: RiskLevel,

    /// Maximum markets sent for AI analysis per cycle
    #[arg(long, env = "MAX_MARKETS_FOR_AI", default_value = "5")]
    pub max_markets_for_ai: usize,

    /// AI spend cap per cycle (USD)
    #[arg(long, env = "MAX_AI_BUDGET_PER_CYCLE", default_value = "0.50")]
    pub max_ai_budget_per_cycle: f64,

    /// AI spend cap per calendar day (USD)
    #[arg(long, env = "MAX_AI_BUDGET_PER_DAY", default_value = "5.0")]
    pub max_ai_budget_per_day: f64,

    /// Analysis cache TTL in seconds
    #[arg(long, env = "AI_CACHE_TTL_SECS", default_value = "1800")]
    pub ai_cache_ttl_secs: u64,

    /// Maximum cached analyses before the oldest entry is evicted
    #[arg(long, env = "AI_CACHE_CAPACITY", default_value = "200")]
    pub ai_cache_capacity: usize,

    /// Minimum |estimated − market| probability edge for AI entries
    #[arg(long, env = "MIN_EDGE", default_value = "0.10")]
    pub min_edge: f64,

    /// Estimated AI cost per market analysis (USD)
    #[arg(long, env = "AI_COST_PER_MARKET", default_value = "0.02")]
    pub ai_cost_per_market: f64,

    /// Estimated AI cost per market when news augmentation is enabled (USD)
    #[arg(long, env = "AI_COST_PER_MARKET_WITH_NEWS", default_value = "0.05")]
    pub ai_cost_per_market_with_news: f64,

    /// Augment AI prompts with news-search context
    #[arg(long, env = "USE_NEWS", default_value = "false")]
    pub use_news: bool,

    /// OpenAI-compatible chat completions endpoint
    #[arg(
        long,
        env = "AI_API_URL",
        default_value = "https://api.openai.com/v1/chat/completions"
    )]
    pub ai_api_url: String,

    /// AI provider API key
    #[arg(long, env = "AI_API_KEY")]
    pub ai_api_key: Option<String>,

    /// AI model name
    #[arg(long, env = "AI_MODEL", default_value = "gpt-4o-mini")]
    pub ai_model: String,

    /// Maximum concurrent AI requests
    #[arg(long, env = "AI_MAX_CONCURRENCY", default_value = "2")]
    pub ai_max_concurrency: usize,

    /// Fixed delay between AI requests, in milliseconds
    #[arg(long, env = "AI_REQUEST_DELAY_MS", default_value = "1000")]
    pub ai_request_delay_ms: u64,

    /// Retry cap for rate-limited AI requests
    #[arg(long, env = "AI_MAX_RETRIES", default_value = "4")]
    pub ai_max_retries: u32,
}

fn parse_risk_level(s: &str) -> Result<RiskLevel, String> {
    match s.to_ascii_lowercase().as_str() {
        "low" => Ok(RiskLevel::Low),
        "medium" => Ok(RiskLevel::Medium),
        "high" => Ok(RiskLevel::High),
        other => Err(format!("unknown risk level '{}'", other)),
    }
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.dry_run && self.polymarket_api_key.is_none() {
            anyhow::bail!(
                "POLYMARKET_API_KEY is required in live trading mode. Use --dry-run for simulation."
            );
        }
        if self.order_size <= 0.0 || self.max_position <= 0.0 {
            anyhow::bail!("order_size and max_position must be positive");
        }
        if !(0.0..1.0).contains(&self.spread) {
            anyhow::bail!("spread must be in [0.0, 1.0)");
        }
        if !(0.0..=1.0).contains(&self.min_price)
            || !(0.0..=1.0).contains(&self.max_price)
            || self.min_price >= self.max_price
        {
            anyhow::bail!("min_price/max_price must satisfy 0.0 <= min < max <= 1.0");
        }
        if !(self.max_acceptable_loss > 0.0 && self.max_acceptable_loss < 1.0) {
            anyhow::bail!("max_acceptable_loss must lie strictly inside (0.0, 1.0)");
        }
        if !(0.0..=1.0).contains(&self.min_probability)
            || !(0.0..=1.0).contains(&self.max_probability)
            || self.min_probability >= self.max_probability
        {
            anyhow::bail!("min_probability/max_probability must satisfy 0.0 <= min < max <= 1.0");
        }
        if (self.strategy == StrategyKind::Ai || self.use_ai) && self.ai_api_key.is_none() {
            anyhow::bail!("AI_API_KEY is required when the AI strategy is enabled");
        }
        if self.batch_size == 0 {
            anyhow::bail!("batch_size must be at least 1");
        }
        if self.ai_max_concurrency == 0 {
            anyhow::bail!("ai_max_concurrency must be at least 1");
        }
        if self.max_ai_budget_per_cycle < 0.0 || self.max_ai_budget_per_day < 0.0 {
            anyhow::bail!("AI budgets must be non-negative");
        }
        if !(0.0..=1.0).contains(&self.min_edge) {
            anyhow::bail!("min_edge must be between 0.0 and 1.0");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config::parse_from(["polyhedge-bot"])
    }

    #[test]
    fn test_defaults_validate() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_live_mode_requires_api_key() {
        let mut cfg = base_config();
        cfg.dry_run = false;
        assert!(cfg.validate().is_err());
        cfg.polymarket_api_key = Some("key".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_ai_strategy_requires_ai_key() {
        let mut cfg = base_config();
        cfg.strategy = StrategyKind::Ai;
        assert!(cfg.validate().is_err());
        cfg.ai_api_key = Some("key".into());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_inverted_probability_window_rejected() {
        let mut cfg = base_config();
        cfg.min_probability = 0.99;
        cfg.max_probability = 0.90;
        assert!(cfg.validate().is_err());
    }
}
