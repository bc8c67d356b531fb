use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing::info;

mod ai;
mod config;
mod engine;
mod exchange;
mod hedge;
mod positions;
mod strategy;
mod types;

use ai::OpenAiProvider;
use config::{Config, StrategyKind};
use engine::Engine;
use exchange::{Exchange, PolymarketClient};
use strategy::{
    AiDrivenStrategy, EndgameStrategy, HighConfidenceStrategy, MarketMakingStrategy, Strategy,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    if config.dry_run {
        info!("🟡 DRY RUN mode – orders are logged, never sent");
    } else {
        info!("🔴 LIVE mode – real orders WILL be placed on Polymarket");
    }

    let client = PolymarketClient::new(
        &config.polymarket_api_url,
        &config.polymarket_clob_url,
        config.polymarket_api_key.clone(),
    )?;
    let exchange: Arc<dyn Exchange> = Arc::new(client);

    let strategy: Box<dyn Strategy> = match config.strategy {
        StrategyKind::MarketMaking => Box::new(MarketMakingStrategy::new(config.clone())),
        StrategyKind::HighConfidence => Box::new(HighConfidenceStrategy::new(config.clone())),
        StrategyKind::Endgame => Box::new(EndgameStrategy::new(config.clone())),
        StrategyKind::Ai => {
            let api_key = config
                .ai_api_key
                .clone()
                .context("AI_API_KEY is required for the AI strategy")?;
            let provider = Arc::new(OpenAiProvider::new(
                &config.ai_api_url,
                &api_key,
                &config.ai_model,
            )?);
            Box::new(AiDrivenStrategy::new(config.clone(), provider, Utc::now()))
        }
    };
    info!("Strategy: {}", strategy.name());

    let mut engine = Engine::new(config, exchange, strategy);
    engine.run().await
}
