use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::picker;

/// Allowed drift between the configured weights and 1.0.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrizeKind {
    Win,
    Retry,
    Lose,
}

impl PrizeKind {
    /// Unknown kinds behave as a loss.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "win" => Self::Win,
            "retry" => Self::Retry,
            _ => Self::Lose,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Retry => "retry",
            Self::Lose => "lose",
        }
    }
}

impl<'de> Deserialize<'de> for PrizeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_name(&name))
    }
}

impl fmt::Display for PrizeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the weighted outcome table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PrizeConfigItem {
    #[serde(rename = "type")]
    pub kind: PrizeKind,
    pub name: String,
    pub probability: f64,
}

impl PrizeConfigItem {
    pub fn new(kind: PrizeKind, name: impl Into<String>, probability: f64) -> Self {
        Self {
            kind,
            name: name.into(),
            probability,
        }
    }
}

pub fn default_prize_table() -> Vec<PrizeConfigItem> {
    let win = 0.075;
    let retry = 1.0 / 6.0;
    vec![
        PrizeConfigItem::new(PrizeKind::Win, "Team seat", win),
        PrizeConfigItem::new(PrizeKind::Retry, "Spin again", retry),
        PrizeConfigItem::new(PrizeKind::Lose, "Better luck next time", 1.0 - win - retry),
    ]
}

/// Check a table before it is persisted.
pub fn validate_prize_table(items: &[PrizeConfigItem]) -> Result<(), String> {
    if items.is_empty() {
        return Err("prize table must not be empty".to_string());
    }

    let mut sum = 0.0;
    for item in items {
        if item.name.trim().is_empty() {
            return Err("prize name must not be empty".to_string());
        }
        if !item.probability.is_finite() || item.probability <= 0.0 {
            return Err(format!("probability of {:?} must be positive", item.name));
        }
        sum += item.probability;
    }

    if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
        return Err(format!("probabilities must sum to 1, got {sum}"));
    }

    Ok(())
}

/// Pick an outcome for `sample` in `[0, 1)`.
pub fn pick_prize(items: &[PrizeConfigItem], sample: f64) -> Option<&PrizeConfigItem> {
    picker::pick(items.iter().map(|item| (item.probability, item)), sample)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Vec<PrizeConfigItem> {
        vec![
            PrizeConfigItem::new(PrizeKind::Win, "seat", 0.1),
            PrizeConfigItem::new(PrizeKind::Retry, "again", 0.2),
            PrizeConfigItem::new(PrizeKind::Lose, "none", 0.7),
        ]
    }

    #[test]
    fn picks_by_cumulative_weight() {
        let items = table();
        assert_eq!(pick_prize(&items, 0.05).unwrap().kind, PrizeKind::Win);
        assert_eq!(pick_prize(&items, 0.15).unwrap().kind, PrizeKind::Retry);
        assert_eq!(pick_prize(&items, 0.95).unwrap().kind, PrizeKind::Lose);
    }

    #[test]
    fn default_table_is_valid() {
        validate_prize_table(&default_prize_table()).unwrap();
    }

    #[test]
    fn rejects_bad_tables() {
        assert!(validate_prize_table(&[]).is_err());

        let mut zero = table();
        zero[0].probability = 0.0;
        zero[2].probability = 0.8;
        assert!(validate_prize_table(&zero).is_err());

        let mut short = table();
        short[2].probability = 0.6;
        assert!(validate_prize_table(&short).is_err());

        let mut unnamed = table();
        unnamed[1].name = "  ".to_string();
        assert!(validate_prize_table(&unnamed).is_err());

        assert!(validate_prize_table(&table()).is_ok());
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_value(&table()[0]).unwrap();
        assert_eq!(json["type"], "win");
        assert_eq!(json["name"], "seat");

        let unknown: PrizeConfigItem =
            serde_json::from_str(r#"{"type":"jackpot","name":"x","probability":1.0}"#).unwrap();
        assert_eq!(unknown.kind, PrizeKind::Lose);
    }
}
