//! AI provider seam and the OpenAI-compatible chat client behind it.
//!
//! The provider returns loosely-typed JSON (numeric fields sometimes arrive
//! as strings), so parsing is an explicit validate step that fails closed: a
//! missing or malformed `estimatedProbability` becomes `None` ("no edge
//! available"), never 0.0, and an unrecognized action or risk level drops to
//! the non-tradeable default.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::types::{AiAnalysis, Market, RecommendedAction, RiskLevel};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP 429 from the provider; the request queue retries these.
    #[error("AI provider rate limited")]
    RateLimited,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Analyze one market, optionally with news context, returning a parsed
    /// probability estimate and trade recommendation.
    async fn analyze_market(
        &self,
        market: &Market,
        context: Option<&str>,
    ) -> Result<AiAnalysis, ProviderError>;
}

/// Client for any OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenAiProvider {
    http: Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(api_url: &str, api_key: &str, model: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(OpenAiProvider {
            http,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    fn build_prompt(market: &Market, context: Option<&str>) -> String {
        let yes_price = market.yes_token().map(|t| t.price).unwrap_or(0.5);
        let mut prompt = format!(
            "You are a prediction-market analyst. Estimate the probability that \
             the following binary market resolves YES.\n\n\
             Question: \"{}\"\n\
             Current YES price: {:.2}\n",
            market.question, yes_price
        );
        if let Some(end) = market.end_date {
            prompt.push_str(&format!("Resolution date: {}\n", end.to_rfc3339()));
        }
        if let Some(ctx) = context {
            prompt.push_str(&format!("\nRecent news context:\n{}\n", ctx));
        }
        prompt.push_str(
            "\nOutput strictly valid JSON with fields:\n\
             - 'shouldTrade' (boolean)\n\
             - 'confidence' (0.0 to 1.0)\n\
             - 'attractiveness' (0.0 to 1.0, how favorable an entry is)\n\
             - 'estimatedProbability' (0.0 to 1.0, or null if unsure)\n\
             - 'riskLevel' ('low', 'medium' or 'high')\n\
             - 'recommendedAction' ('BUY_YES', 'BUY_NO' or 'AVOID')\n\
             - 'reasoning' (concise summary)\n\
             - 'sources' (array of strings, may be empty)",
        );
        prompt
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn analyze_market(
        &self,
        market: &Market,
        context: Option<&str>,
    ) -> Result<AiAnalysis, ProviderError> {
        let prompt = Self::build_prompt(market, context);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": "You are a helpful assistant that outputs JSON."},
                {"role": "user", "content": prompt},
            ],
            "temperature": 0.0,
        });

        let resp = self
            .http
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .context("AI provider request failed")?;

        if resp.status().as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("AI provider error {}: {}", status, text).into());
        }

        let raw: Value = resp
            .json()
            .await
            .context("Failed to parse AI provider response")?;
        let content = raw["choices"][0]["message"]["content"]
            .as_str()
            .context("No content in AI provider response")?;

        debug!("AI raw content for {}: {}", market.condition_id, content);
        parse_analysis(content).map_err(ProviderError::Other)
    }
}

/// Parse the model's JSON reply into an [`AiAnalysis`], tolerating markdown
/// code fences and string-typed numbers.
pub fn parse_analysis(content: &str) -> Result<AiAnalysis> {
    let clean = content
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();
    let value: Value =
        serde_json::from_str(clean).with_context(|| format!("Malformed AI JSON: {}", clean))?;

    let estimated_probability =
        as_f64(&value["estimatedProbability"]).filter(|p| (0.0..=1.0).contains(p));

    let risk_level = match value["riskLevel"].as_str().map(str::to_ascii_lowercase) {
        Some(ref s) if s == "low" => RiskLevel::Low,
        Some(ref s) if s == "medium" => RiskLevel::Medium,
        // Unknown risk fails closed to the most restrictive bucket.
        _ => RiskLevel::High,
    };

    let recommended_action = match value["recommendedAction"].as_str() {
        Some("BUY_YES") => Some(RecommendedAction::BuyYes),
        Some("BUY_NO") => Some(RecommendedAction::BuyNo),
        Some("AVOID") => Some(RecommendedAction::Avoid),
        _ => None,
    };

    let sources = value["sources"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();

    Ok(AiAnalysis {
        should_trade: value["shouldTrade"].as_bool().unwrap_or(false),
        confidence: as_f64(&value["confidence"]).unwrap_or(0.0).clamp(0.0, 1.0),
        attractiveness: as_f64(&value["attractiveness"])
            .unwrap_or(0.0)
            .clamp(0.0, 1.0),
        estimated_probability,
        risk_level,
        recommended_action,
        reasoning: value["reasoning"].as_str().unwrap_or_default().to_string(),
        sources,
    })
}

/// Accept a JSON number or a numeric string; anything else is `None`.
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}
