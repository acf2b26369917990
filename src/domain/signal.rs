use serde::Serialize;

/// Discrete trade signal derived from the predicted next-day move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

/// An action plus an integer confidence percentage in `[50, 95]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradeDecision {
    pub action: TradeAction,
    pub confidence: u8,
}

/// Threshold on the predicted percentage move, in percent. Comparisons are
/// strict: a move of exactly +/-1.5% stays HOLD.
const ACTION_THRESHOLD_PCT: f64 = 1.5;

/// Maps the predicted percentage move onto a trade decision.
///
/// The thresholds and confidence formulas are fixed heuristics, not learned;
/// they are part of the observable contract and must not be tuned.
pub fn decide(price_change_pct: f64) -> TradeDecision {
    let magnitude = price_change_pct.abs();

    if price_change_pct > ACTION_THRESHOLD_PCT {
        TradeDecision {
            action: TradeAction::Buy,
            confidence: directional_confidence(magnitude),
        }
    } else if price_change_pct < -ACTION_THRESHOLD_PCT {
        TradeDecision {
            action: TradeAction::Sell,
            confidence: directional_confidence(magnitude),
        }
    } else {
        TradeDecision {
            action: TradeAction::Hold,
            confidence: (70.0 - magnitude * 3.0).max(50.0) as u8,
        }
    }
}

/// Larger predicted moves give more confident BUY/SELL calls, capped at 95.
fn directional_confidence(magnitude: f64) -> u8 {
    (75.0 + magnitude * 2.0).min(95.0) as u8
}
