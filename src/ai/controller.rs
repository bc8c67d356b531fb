//! AI budget and cache controller.
//!
//! Gates expensive AI analysis under a daily spend limit and a per-cycle
//! cap, ranks candidate markets for the limited analysis slots, accounts
//! batch costs optimistically, and applies the edge gate that turns an
//! analysis into an actionable direction.
//!
//! The controller is an explicit object owned by the engine; it holds no
//! globals and takes `now` on every call, so cycles (which run strictly
//! sequentially) are its only mutator.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};

use super::cache::AnalysisCache;
use crate::config::Config;
use crate::types::{AiAnalysis, Market, RecommendedAction, RiskLevel};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetState {
    Ok,
    Exhausted,
}

/// Accepted direction out of the edge gate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateDecision {
    pub action: RecommendedAction,
    /// |estimated probability − market YES price|.
    pub edge: f64,
}

pub struct AiController {
    day: NaiveDate,
    total_spent_today: f64,
    daily_limit: f64,
    cycle_limit: f64,
    cost_per_market: f64,
    max_markets_for_ai: usize,
    min_edge: f64,
    max_risk: RiskLevel,
    cache: AnalysisCache,
}

impl AiController {
    pub fn new(config: &Config, now: DateTime<Utc>) -> Self {
        let cost_per_market = if config.use_news {
            config.ai_cost_per_market_with_news
        } else {
            config.ai_cost_per_market
        };
        AiController {
            day: now.date_naive(),
            total_spent_today: 0.0,
            daily_limit: config.max_ai_budget_per_day,
            cycle_limit: config.max_ai_budget_per_cycle,
            cost_per_market,
            max_markets_for_ai: config.max_markets_for_ai,
            min_edge: config.min_edge,
            max_risk: config.max_ai_risk,
            cache: AnalysisCache::new(config.ai_cache_ttl_secs, config.ai_cache_capacity),
        }
    }

    /// Budget left for this cycle, after a calendar-day rollover check.
    pub fn remaining_budget(&mut self, now: DateTime<Utc>) -> f64 {
        let today = now.date_naive();
        if today != self.day {
            info!(
                "AI budget day rollover {} -> {}: spent ${:.2} yesterday",
                self.day, today, self.total_spent_today
            );
            self.day = today;
            self.total_spent_today = 0.0;
        }
        (self.daily_limit - self.total_spent_today).min(self.cycle_limit)
    }

    pub fn budget_state(&mut self, now: DateTime<Utc>) -> BudgetState {
        if self.remaining_budget(now) > 0.0 {
            BudgetState::Ok
        } else {
            BudgetState::Exhausted
        }
    }

    /// Rank candidate markets and return the slice worth analyzing this
    /// cycle: top N by score, N = min(configured max, affordable count,
    /// candidate count).
    ///
    /// score = yes_price × category_bonus / (days_to_resolution + 1)
    pub fn select_markets_for_analysis<'a>(
        &mut self,
        candidates: &[&'a Market],
        now: DateTime<Utc>,
    ) -> Vec<&'a Market> {
        let remaining = self.remaining_budget(now);
        if remaining <= 0.0 {
            debug!("AI budget exhausted, skipping analysis selection");
            return vec![];
        }
        let affordable = if self.cost_per_market > 0.0 {
            (remaining / self.cost_per_market).floor() as usize
        } else {
            candidates.len()
        };
        let take = self
            .max_markets_for_ai
            .min(affordable)
            .min(candidates.len());
        if take == 0 {
            return vec![];
        }

        let mut scored: Vec<(f64, &Market)> = candidates
            .iter()
            .map(|m| (Self::analysis_score(m, now), *m))
            .collect();
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.into_iter().take(take).map(|(_, m)| m).collect()
    }

    fn analysis_score(market: &Market, now: DateTime<Utc>) -> f64 {
        let yes_price = market.yes_token().map(|t| t.price).unwrap_or(0.0);
        let days = market.days_to_resolution(now).unwrap_or(365.0);
        yes_price * Self::category_bonus(market.category.as_deref()) / (days + 1.0)
    }

    /// Mild preference for categories where short-horizon news moves prices.
    fn category_bonus(category: Option<&str>) -> f64 {
        match category.map(|c| c.to_ascii_lowercase()) {
            Some(c) if c.contains("crypto") => 1.2,
            Some(c) if c.contains("politic") => 1.15,
            Some(c) if c.contains("sport") => 1.1,
            _ => 1.0,
        }
    }

    /// Charge the estimated cost of one analysis batch, immediately after
    /// the batch completes. Optimistic accounting: per batch, not per call.
    pub fn record_batch_cost(&mut self, markets_analyzed: usize) {
        let cost = markets_analyzed as f64 * self.cost_per_market;
        self.total_spent_today += cost;
        info!(
            "AI batch of {} analyses charged ${:.3} (spent today ${:.2} / ${:.2})",
            markets_analyzed, cost, self.total_spent_today, self.daily_limit
        );
    }

    pub fn cached(&self, condition_id: &str, now: DateTime<Utc>) -> Option<&AiAnalysis> {
        self.cache.get(condition_id, now)
    }

    pub fn store(&mut self, condition_id: String, analysis: AiAnalysis, now: DateTime<Utc>) {
        self.cache.insert(condition_id, analysis, now);
    }

    pub fn sweep_cache(&mut self, now: DateTime<Utc>) {
        self.cache.sweep_expired(now);
    }

    /// Edge gate: accept an analysis only when its probability estimate
    /// disagrees with the market by at least the edge threshold, in the
    /// direction of the recommended action.
    ///
    /// Fails closed: a missing probability estimate, a missing or AVOID
    /// recommendation, `should_trade = false`, or a risk level above the
    /// configured ceiling all yield no decision.
    pub fn evaluate_edge(&self, analysis: &AiAnalysis, yes_price: f64) -> Option<GateDecision> {
        if !analysis.should_trade {
            return None;
        }
        if analysis.risk_level > self.max_risk {
            return None;
        }
        let action = match analysis.recommended_action {
            Some(RecommendedAction::BuyYes) => RecommendedAction::BuyYes,
            Some(RecommendedAction::BuyNo) => RecommendedAction::BuyNo,
            Some(RecommendedAction::Avoid) | None => return None,
        };
        let estimated = analysis.estimated_probability?;
        if !(0.0..=1.0).contains(&estimated) {
            return None;
        }

        let edge = (estimated - yes_price).abs();
        if edge < self.min_edge {
            return None;
        }
        let direction_agrees = match action {
            // BUY_YES: the model thinks YES is underpriced.
            RecommendedAction::BuyYes => estimated > yes_price,
            // BUY_NO: the NO-side estimate exceeds the NO-side price.
            RecommendedAction::BuyNo => (1.0 - estimated) > (1.0 - yes_price),
            RecommendedAction::Avoid => false,
        };
        if !direction_agrees {
            return None;
        }
        Some(GateDecision { action, edge })
    }
}
