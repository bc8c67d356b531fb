//! Tail-risk hedge sizing for near-certain markets.
//!
//! Given capital C, a near-certain YES price p and a maximum acceptable loss
//! fraction L, size a NO-side hedge that caps the downside to roughly
//! L · (cost of the YES leg):
//!
//!   yes_size = floor(C / p)            — never overspend the primary leg
//!   max_loss = yes_cost · L
//!   payout_needed = yes_cost − max_loss
//!   no_size = ceil(payout_needed / p)  — never under-insure
//!
//! The rounding is deliberately asymmetric: the YES size floors and the NO
//! size ceils. The realized loss can therefore differ from the nominal cap
//! by up to the cost of one NO share. That slack is documented behavior of
//! the sizing model, not an error to round away.
//!
//! Callers must pre-filter by a probability window (e.g. 0.90–0.99) before
//! invoking this engine; `yes_price` must lie strictly inside (0, 1).

use anyhow::Result;

use crate::types::HedgeResult;

/// Compute a hedged YES/NO allocation for `capital` at the given YES price.
///
/// # Arguments
/// * `capital`           – Budget for the YES leg (USD).
/// * `yes_price`         – YES token price, strictly inside (0, 1).
/// * `max_loss_fraction` – Acceptable loss as a fraction of the YES cost,
///                         strictly inside (0, 1).
pub fn compute_hedge(
    capital: f64,
    yes_price: f64,
    max_loss_fraction: f64,
) -> Result<HedgeResult> {
    if !(yes_price > 0.0 && yes_price < 1.0) {
        anyhow::bail!("yes_price {} must lie strictly inside (0, 1)", yes_price);
    }
    if !(max_loss_fraction > 0.0 && max_loss_fraction < 1.0) {
        anyhow::bail!(
            "max_loss_fraction {} must lie strictly inside (0, 1)",
            max_loss_fraction
        );
    }
    if capital <= 0.0 {
        anyhow::bail!("capital {} must be positive", capital);
    }

    let yes_size = (capital / yes_price).floor();
    let yes_cost = yes_size * yes_price;

    let max_loss = yes_cost * max_loss_fraction;
    let hedge_payout_needed = yes_cost - max_loss;

    let no_price = 1.0 - yes_price;
    // A NO share bought at (1 − p) pays out 1.0, so its profit per share
    // equals p.
    let no_profit_per_share = 1.0 - no_price;
    let no_size = (hedge_payout_needed / no_profit_per_share).ceil();
    let no_cost = no_size * no_price;

    let net_profit_if_win = yes_size * (1.0 - yes_price) - no_cost;
    let net_loss_if_lose = -yes_cost + no_size * (1.0 - no_price);

    Ok(HedgeResult {
        main_position_size: yes_size,
        hedge_position_size: no_size,
        yes_cost,
        no_cost,
        max_loss,
        net_profit_if_win,
        net_loss_if_lose,
    })
}
