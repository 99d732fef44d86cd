use crate::market::OddsSnapshot;
use crate::ratings::GameResult;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// One line on a single book.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LineRecord {
    pub sport: String,
    pub event: String,
    pub market: String,
    pub line: f64,
    pub timestamp: DateTime<Utc>,
    pub book: String,
}

/// Public and sharp money percentages alongside the line they were taken at.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SplitRecord {
    pub sport: String,
    pub event: String,
    pub market: String,
    pub public_pct: f64,
    pub sharp_pct: f64,
    pub line: f64,
}

/// Everything a collector can hand the pipeline, tagged by `"type"` on the wire:
///
/// ```json
/// {"type":"game","team_a":"BOS","team_b":"NYK","score_a":110,"score_b":102,"date":"2024-01-05T00:00:00Z","is_home_a":true}
/// {"type":"line","sport":"nba","event":"NYK@BOS","market":"spread","line":-4.5,"timestamp":"2024-01-06T18:00:00Z","book":"pinnacle"}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FeedRecord {
    Game(GameResult),
    Odds(OddsSnapshot),
    Line(LineRecord),
    Split(SplitRecord),
}

impl FeedRecord {
    pub fn kind(&self) -> &'static str {
        match self {
            FeedRecord::Game(_) => "game",
            FeedRecord::Odds(_) => "odds",
            FeedRecord::Line(_) => "line",
            FeedRecord::Split(_) => "split",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_record_defaults() {
        let json = r#"{"type":"game","team_a":"BOS","team_b":"NYK","score_a":110,"score_b":102,"date":"2024-01-05T00:00:00Z"}"#;
        let record: FeedRecord = serde_json::from_str(json).unwrap();
        match record {
            FeedRecord::Game(g) => {
                assert_eq!(g.margin(), 8.0);
                assert!(!g.is_home_a);
                assert_eq!(g.weight, 1.0);
            }
            other => panic!("expected game, got {}", other.kind()),
        }
    }

    #[test]
    fn test_odds_record() {
        let json = r#"{"type":"odds","sport":"nba","event":"e","market":"h2h","books":{"a":{"odds":{"X":2.1,"Y":1.8}}}}"#;
        let record: FeedRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.kind(), "odds");
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"type":"injury","team":"BOS"}"#;
        assert!(serde_json::from_str::<FeedRecord>(json).is_err());
    }
}
