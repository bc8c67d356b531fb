use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest tradeable price on the CLOB.
pub const MIN_PRICE: f64 = 0.01;
/// Highest tradeable price on the CLOB.
pub const MAX_PRICE: f64 = 0.99;

/// Order side. Polymarket outcome tokens are bought and sold; there is no
/// native short-sell, so hedge-style strategies only ever emit BUY.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

/// A single fill from the account's trade history. Immutable, externally
/// sourced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub token_id: String,
    pub side: Side,
    pub size: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionType {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeResult {
    Win,
    Loss,
    Pending,
    Unknown,
}

/// Per-token position state derived from the trade ledger.
///
/// Created on the first trade for a token, mutated by every subsequent
/// trade, finalized (result / pnl) once resolution data is available.
/// Positions are never deleted, only excluded from "active" views once
/// size falls to ~0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub token_id: String,
    pub position_type: PositionType,
    /// Absolute size in shares, always >= 0.
    pub size: f64,
    /// Size-weighted average entry price.
    pub avg_price: f64,
    pub current_price: Option<f64>,
    pub is_resolved: bool,
    pub winner: Option<String>,
    pub result: TradeResult,
    pub pnl: Option<f64>,
    pub pnl_percent: Option<f64>,
}

impl Position {
    /// Whether the position still carries exposure.
    pub fn is_active(&self) -> bool {
        self.size > 1e-9
    }
}

/// One outcome token of a binary market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketToken {
    pub token_id: String,
    pub outcome: String,
    pub price: f64,
}

/// Read-only snapshot of a binary-outcome market, as fetched from the
/// exchange. Never mutated locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub condition_id: String,
    pub question: String,
    pub tokens: Vec<MarketToken>,
    pub end_date: Option<DateTime<Utc>>,
    pub neg_risk: bool,
    pub min_order_size: f64,
    pub min_tick_size: f64,
    pub active: bool,
    pub closed: bool,
    pub accepting_orders: bool,
    pub liquidity: Option<f64>,
    pub category: Option<String>,
}

impl Market {
    pub fn yes_token(&self) -> Option<&MarketToken> {
        self.tokens
            .iter()
            .find(|t| t.outcome.eq_ignore_ascii_case("yes"))
    }

    pub fn no_token(&self) -> Option<&MarketToken> {
        self.tokens
            .iter()
            .find(|t| t.outcome.eq_ignore_ascii_case("no"))
    }

    /// Outcome string assigned to a token id, if the token belongs to this
    /// market.
    pub fn outcome_for_token(&self, token_id: &str) -> Option<&str> {
        self.tokens
            .iter()
            .find(|t| t.token_id == token_id)
            .map(|t| t.outcome.as_str())
    }

    pub fn days_to_resolution(&self, now: DateTime<Utc>) -> Option<f64> {
        self.end_date
            .map(|end| (end - now).num_seconds().max(0) as f64 / 86_400.0)
    }

    pub fn hours_to_resolution(&self, now: DateTime<Utc>) -> Option<f64> {
        self.end_date
            .map(|end| (end - now).num_seconds().max(0) as f64 / 3_600.0)
    }
}

/// Resolution data for a market: the winning outcome, once known.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketResolution {
    pub winner: Option<String>,
    pub resolved: bool,
}

/// A proposed order, produced and consumed within one cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    pub condition_id: String,
    pub question: String,
    pub token_id: String,
    pub side: Side,
    pub price: f64,
    pub size: f64,
    pub reason: String,
}

/// Risk bucket reported by the AI analysis. Ordering matters: `High` is
/// above the configured ceiling check in the AI strategy.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendedAction {
    #[serde(rename = "BUY_YES")]
    BuyYes,
    #[serde(rename = "BUY_NO")]
    BuyNo,
    #[serde(rename = "AVOID")]
    Avoid,
}

/// Parsed output of one AI market analysis.
///
/// `estimated_probability` is optional on purpose: a missing or malformed
/// value from the provider means "no edge available", never zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub should_trade: bool,
    /// 0.0 to 1.0.
    pub confidence: f64,
    /// Normalized entry-favorability score, 0.0 to 1.0.
    pub attractiveness: f64,
    pub estimated_probability: Option<f64>,
    pub risk_level: RiskLevel,
    pub recommended_action: Option<RecommendedAction>,
    pub reasoning: String,
    pub sources: Vec<String>,
}

/// Output of the tail-risk hedge sizing engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HedgeResult {
    pub main_position_size: f64,
    pub hedge_position_size: f64,
    pub yes_cost: f64,
    pub no_cost: f64,
    pub max_loss: f64,
    pub net_profit_if_win: f64,
    pub net_loss_if_lose: f64,
}
