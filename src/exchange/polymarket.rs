//! Client for the Polymarket Gamma (markets) API and CLOB (order book) API.
//!
//! Gamma serves market metadata, the CLOB serves prices, trade history and
//! order placement. Both return loosely-typed JSON where numeric fields may
//! arrive as strings, so parsing is lenient about types but strict about the
//! fields a market must have to be tradeable.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::Exchange;
use crate::types::{Market, MarketResolution, MarketToken, Side, Trade, TradeSignal};

#[derive(Clone)]
pub struct PolymarketClient {
    http: Client,
    api_url: String,
    clob_url: String,
    api_key: Option<String>,
}

impl PolymarketClient {
    pub fn new(api_url: &str, clob_url: &str, api_key: Option<String>) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(PolymarketClient {
            http,
            api_url: api_url.to_string(),
            clob_url: clob_url.to_string(),
            api_key,
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value> {
        debug!("GET {}", url);
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request failed: {}", url))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Polymarket API error {}: {}", status, body);
        }
        resp.json().await.context("Failed to parse Polymarket response")
    }
}

#[async_trait]
impl Exchange for PolymarketClient {
    async fn fetch_markets(&self, limit: usize) -> Result<Vec<Market>> {
        let url = format!(
            "{}/markets?active=true&closed=false&limit={}",
            self.api_url, limit
        );
        let raw = self.get_json(&url).await?;
        let markets = parse_markets(&raw);
        info!("Fetched {} markets from Polymarket", markets.len());
        Ok(markets)
    }

    async fn fetch_trades(&self) -> Result<Vec<Trade>> {
        let url = format!("{}/data/trades", self.clob_url);
        let mut req = self.http.get(&url);
        if let Some(key) = &self.api_key {
            req = req.header("Authorization", format!("Bearer {}", key));
        }
        let resp = req.send().await.context("Trade history request failed")?;
        if !resp.status().is_success() {
            anyhow::bail!("Trade history fetch error: {}", resp.status());
        }
        let raw: Value = resp
            .json()
            .await
            .context("Failed to parse trade history")?;
        Ok(parse_trades(&raw))
    }

    async fn midpoint_price(&self, token_id: &str) -> Result<f64> {
        let url = format!("{}/midpoint?token_id={}", self.clob_url, token_id);
        let raw = self.get_json(&url).await?;
        as_f64(&raw["mid"])
            .with_context(|| format!("No midpoint in response for token {}", token_id))
    }

    async fn fetch_resolution(&self, condition_id: &str) -> Result<MarketResolution> {
        let url = format!("{}/markets/{}", self.api_url, condition_id);
        let raw = self.get_json(&url).await?;
        Ok(parse_resolution(&raw))
    }

    async fn submit_order(&self, signal: &TradeSignal) -> Result<String> {
        let api_key = self.api_key.as_deref().unwrap_or_default();
        let order = serde_json::json!({
            "tokenID": signal.token_id,
            "price": signal.price,
            "size": signal.size,
            "side": match signal.side {
                Side::Buy => "BUY",
                Side::Sell => "SELL",
            },
            "orderType": "limit",
        });

        let url = format!("{}/order", self.clob_url);
        let resp = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&order)
            .send()
            .await
            .context("Failed to place Polymarket order")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Order placement failed {}: {}", status, body);
        }

        let result: Value = resp.json().await?;
        let order_id = result["orderId"].as_str().unwrap_or("unknown").to_string();
        info!(
            "Order placed: id={} {:?} {} x {:.0} @ {:.3}",
            order_id, signal.side, signal.token_id, signal.size, signal.price
        );
        Ok(order_id)
    }
}

// ── Parsing helpers ────────────────────────────────────────────────────────

fn parse_markets(raw: &Value) -> Vec<Market> {
    let items = match raw.as_array() {
        Some(a) => a,
        // Some endpoints return { "markets": [...] }
        None => match raw.get("markets").and_then(|v| v.as_array()) {
            Some(a) => a,
            None => return vec![],
        },
    };
    items.iter().filter_map(parse_market).collect()
}

fn parse_market(item: &Value) -> Option<Market> {
    let condition_id = item["conditionId"]
        .as_str()
        .or_else(|| item["condition_id"].as_str())
        .or_else(|| item["id"].as_str())?;
    let tokens = parse_tokens(item);
    if tokens.is_empty() {
        warn!("Skipping market {} with no outcome tokens", condition_id);
        return None;
    }

    let end_date = item["endDateIso"]
        .as_str()
        .or_else(|| item["end_date_iso"].as_str())
        .or_else(|| item["endDate"].as_str())
        .and_then(parse_date);

    Some(Market {
        condition_id: condition_id.to_string(),
        question: item["question"].as_str().unwrap_or("").to_string(),
        tokens,
        end_date,
        neg_risk: item["negRisk"]
            .as_bool()
            .or_else(|| item["neg_risk"].as_bool())
            .unwrap_or(false),
        min_order_size: as_f64(&item["orderMinSize"])
            .or_else(|| as_f64(&item["minimum_order_size"]))
            .unwrap_or(5.0),
        min_tick_size: as_f64(&item["orderPriceMinTickSize"])
            .or_else(|| as_f64(&item["minimum_tick_size"]))
            .unwrap_or(0.01),
        active: item["active"].as_bool().unwrap_or(false),
        closed: item["closed"].as_bool().unwrap_or(false),
        accepting_orders: item["acceptingOrders"]
            .as_bool()
            .or_else(|| item["accepting_orders"].as_bool())
            .unwrap_or(true),
        liquidity: as_f64(&item["liquidity"]).or_else(|| as_f64(&item["liquidityNum"])),
        category: item["category"].as_str().map(str::to_string),
    })
}

fn parse_tokens(item: &Value) -> Vec<MarketToken> {
    // CLOB shape: tokens: [{ "token_id": ..., "outcome": "Yes", "price": "0.65" }]
    if let Some(tokens) = item["tokens"].as_array() {
        return tokens
            .iter()
            .filter_map(|t| {
                Some(MarketToken {
                    token_id: t["token_id"].as_str().or_else(|| t["tokenId"].as_str())?.to_string(),
                    outcome: t["outcome"].as_str()?.to_string(),
                    price: as_f64(&t["price"])?,
                })
            })
            .collect();
    }

    // Gamma shape: parallel clobTokenIds / outcomes / outcomePrices arrays,
    // each sometimes JSON-encoded as a string.
    let ids = string_array(&item["clobTokenIds"]);
    let outcomes = string_array(&item["outcomes"]);
    let prices: Vec<f64> = match &item["outcomePrices"] {
        Value::String(s) => serde_json::from_str::<Vec<Value>>(s)
            .map(|arr| arr.iter().filter_map(as_f64).collect())
            .unwrap_or_default(),
        Value::Array(arr) => arr.iter().filter_map(as_f64).collect(),
        _ => vec![],
    };
    if ids.len() == outcomes.len() && ids.len() == prices.len() {
        ids.into_iter()
            .zip(outcomes)
            .zip(prices)
            .map(|((token_id, outcome), price)| MarketToken {
                token_id,
                outcome,
                price,
            })
            .collect()
    } else {
        vec![]
    }
}

fn parse_trades(raw: &Value) -> Vec<Trade> {
    let items = match raw.as_array() {
        Some(a) => a,
        None => match raw.get("data").and_then(|v| v.as_array()) {
            Some(a) => a,
            None => return vec![],
        },
    };
    items
        .iter()
        .filter_map(|item| {
            let token_id = item["asset_id"]
                .as_str()
                .or_else(|| item["tokenId"].as_str())?;
            let side = match item["side"].as_str()? {
                "BUY" | "buy" => Side::Buy,
                "SELL" | "sell" => Side::Sell,
                _ => return None,
            };
            Some(Trade {
                token_id: token_id.to_string(),
                side,
                size: as_f64(&item["size"])?,
                price: as_f64(&item["price"])?,
                timestamp: parse_timestamp(&item["match_time"])?,
            })
        })
        .collect()
}

fn parse_resolution(raw: &Value) -> MarketResolution {
    let closed = raw["closed"].as_bool().unwrap_or(false);
    let winner = raw["tokens"].as_array().and_then(|tokens| {
        tokens
            .iter()
            .find(|t| t["winner"].as_bool().unwrap_or(false))
            .and_then(|t| t["outcome"].as_str())
            .map(str::to_string)
    });
    MarketResolution {
        resolved: closed && winner.is_some(),
        winner,
    }
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .ok()
}

/// An array of strings, possibly JSON-encoded inside a single string.
fn string_array(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => serde_json::from_str::<Vec<String>>(s).unwrap_or_default(),
        Value::Array(arr) => arr
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => vec![],
    }
}

/// Unix seconds, as a number or a numeric string.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    DateTime::from_timestamp(secs, 0)
}

/// Accept a JSON number or a numeric string; anything else is `None`.
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_parse_clob_shaped_market() {
        let raw = serde_json::json!({
            "condition_id": "0xabc",
            "question": "Will it rain tomorrow?",
            "tokens": [
                {"token_id": "111", "outcome": "Yes", "price": "0.65"},
                {"token_id": "222", "outcome": "No", "price": 0.35},
            ],
            "end_date_iso": "2026-09-01T12:00:00Z",
            "neg_risk": false,
            "minimum_order_size": "5",
            "minimum_tick_size": "0.01",
            "active": true,
            "closed": false,
            "accepting_orders": true,
        });
        let market = parse_market(&raw).unwrap();
        assert_eq!(market.condition_id, "0xabc");
        assert_eq!(market.tokens.len(), 2);
        assert_relative_eq!(market.yes_token().unwrap().price, 0.65, epsilon = 1e-9);
        assert!(market.end_date.is_some());
        assert!(market.active);
    }

    #[test]
    fn test_parse_gamma_shaped_market() {
        // Gamma encodes the parallel arrays as JSON strings.
        let raw = serde_json::json!({
            "conditionId": "0xdef",
            "question": "Will X win?",
            "clobTokenIds": "[\"111\", \"222\"]",
            "outcomes": "[\"Yes\", \"No\"]",
            "outcomePrices": "[\"0.8\", \"0.2\"]",
            "active": true,
            "liquidity": "12000.5",
        });
        let market = parse_market(&raw).unwrap();
        assert_eq!(market.tokens.len(), 2);
        assert_eq!(market.tokens[0].token_id, "111");
        assert_relative_eq!(market.tokens[1].price, 0.2, epsilon = 1e-9);
        assert_relative_eq!(market.liquidity.unwrap(), 12000.5, epsilon = 1e-9);
    }

    #[test]
    fn test_market_without_tokens_is_skipped() {
        let raw = serde_json::json!({"conditionId": "0x1", "question": "?"});
        assert!(parse_market(&raw).is_none());
    }

    #[test]
    fn test_parse_trades_tolerates_string_numbers() {
        let raw = serde_json::json!([
            {"asset_id": "111", "side": "BUY", "size": "10", "price": "0.5",
             "match_time": "1700000000"},
            {"asset_id": "111", "side": "SELL", "size": 5.0, "price": 0.6,
             "match_time": 1700000100},
            {"asset_id": "111", "side": "???", "size": 1, "price": 0.5,
             "match_time": 1700000200},
        ]);
        let trades = parse_trades(&raw);
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].side, Side::Buy);
        assert_relative_eq!(trades[0].size, 10.0, epsilon = 1e-9);
        assert!(trades[1].timestamp > trades[0].timestamp);
    }

    #[test]
    fn test_parse_resolution_reads_winner_flag() {
        let raw = serde_json::json!({
            "closed": true,
            "tokens": [
                {"outcome": "Yes", "winner": false},
                {"outcome": "No", "winner": true},
            ],
        });
        let resolution = parse_resolution(&raw);
        assert!(resolution.resolved);
        assert_eq!(resolution.winner.as_deref(), Some("No"));
    }

    #[test]
    fn test_open_market_has_no_resolution() {
        let raw = serde_json::json!({
            "closed": false,
            "tokens": [
                {"outcome": "Yes", "winner": false},
                {"outcome": "No", "winner": false},
            ],
        });
        let resolution = parse_resolution(&raw);
        assert!(!resolution.resolved);
        assert!(resolution.winner.is_none());
    }
}
