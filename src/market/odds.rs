use serde::Deserialize;

/// How prices in a snapshot are quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddsFormat {
    /// Payout per unit staked, stake included (2.10 = +110).
    #[default]
    Decimal,
    /// Moneyline (+150, -150).
    American,
}

impl OddsFormat {
    /// Normalize a quoted price to decimal odds. Unusable quotes map to 0.0
    /// so the detector's positive-price filter drops them.
    pub fn to_decimal(self, price: f64) -> f64 {
        match self {
            OddsFormat::Decimal => price,
            OddsFormat::American => american_to_decimal(price),
        }
    }
}

/// American -> decimal. Values strictly between -100 and +100 are not valid
/// moneylines and return 0.0.
pub fn american_to_decimal(odds: f64) -> f64 {
    if odds >= 100.0 {
        1.0 + odds / 100.0
    } else if odds <= -100.0 {
        1.0 + 100.0 / odds.abs()
    } else {
        0.0
    }
}

/// Implied probability of decimal odds; 0.0 for non-positive prices.
pub fn decimal_to_probability(price: f64) -> f64 {
    if price > 0.0 {
        1.0 / price
    } else {
        0.0
    }
}

/// Remove the overround from a set of implied probabilities so they sum to 1.
/// An all-zero book yields a uniform split.
pub fn devig(implied: &[f64]) -> Vec<f64> {
    let total: f64 = implied.iter().sum();
    if total <= 0.0 {
        let n = implied.len().max(1) as f64;
        return vec![1.0 / n; implied.len()];
    }
    implied.iter().map(|p| p / total).collect()
}
