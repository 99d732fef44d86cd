use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

const ENV_FILE: &str = ".env";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub ratings: RatingsConfig,
    #[serde(default)]
    pub elo: EloConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub arbitrage: ArbitrageConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How a game's margin enters the Massey system.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreTransform {
    /// Raw point differential.
    #[default]
    Raw,
    /// Signed square root: diminishing returns on blowouts.
    SignedSqrt,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RatingsConfig {
    /// Points credited to the home side before the margin enters the system.
    pub home_advantage: f64,
    /// Rating difference -> predicted margin.
    pub margin_factor: f64,
    /// Time-decay half-life in days, measured back from the latest game.
    /// `None` disables decay.
    pub half_life_days: Option<f64>,
    /// Fewer games than this yields no ratings at all.
    pub min_games: usize,
    pub sigma: f64,
    pub prior_scale: f64,
    pub score_transform: ScoreTransform,
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            home_advantage: 0.0,
            margin_factor: 1.0,
            half_life_days: None,
            min_games: 1,
            sigma: 100.0,
            prior_scale: 100.0,
            score_transform: ScoreTransform::Raw,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EloConfig {
    pub k: f64,
    pub initial_rating: f64,
    pub pd_factor: f64,
    pub home_advantage: f64,
    /// Smallest rating change credited to a winner.
    pub min_win_gain: f64,
}

impl Default for EloConfig {
    fn default() -> Self {
        Self {
            k: 300.0,
            initial_rating: 1000.0,
            pd_factor: 11.0,
            home_advantage: 100.0,
            min_win_gain: 1.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rating difference -> expected margin in matchup analysis.
    pub margin_scale: f64,
    /// Upset rate assumed before any head-to-head history.
    pub upset_prior: f64,
    /// Added to an opponent's power rating for each home game.
    pub home_schedule_bump: f64,
    pub sigma: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            margin_scale: 3.5,
            upset_prior: 0.3,
            home_schedule_bump: 50.0,
            sigma: 100.0,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ArbitrageConfig {
    pub min_profit_margin: f64,
    pub max_stake: f64,
    pub min_book_rating: f64,
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        Self {
            min_profit_margin: 0.01,
            max_stake: 1000.0,
            min_book_rating: 0.7,
        }
    }
}

/// Which direction of line movement counts as "against the public".
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LineConvention {
    /// Line is the public side's spread: moving toward the public side
    /// (e.g. -3.0 -> -2.0 with 80% public) is reverse movement.
    #[default]
    Spread,
    /// Line is a raw number where a drop means the public side got dearer:
    /// public > 70 with a falling line, or public < 30 with a rising one.
    Raw,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AlertConfig {
    pub min_steam_threshold: f64,
    pub min_rlm_threshold: f64,
    pub monitoring_window_secs: u64,
    pub monitor_interval_ms: u64,
    pub stop_timeout_ms: u64,
    pub line_convention: LineConvention,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            min_steam_threshold: 0.02,
            min_rlm_threshold: 0.15,
            monitoring_window_secs: 300,
            monitor_interval_ms: 1000,
            stop_timeout_ms: 1000,
            line_convention: LineConvention::Spread,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: String,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: "sports-edge.log".to_string(),
            filter: "sports_edge=info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).with_context(|| "Failed to parse config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise fall back to built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ratings.sigma <= 0.0 || self.analysis.sigma <= 0.0 {
            anyhow::bail!("sigma must be positive");
        }
        if self.elo.k <= 0.0 || self.elo.pd_factor <= 0.0 {
            anyhow::bail!("elo.k and elo.pd_factor must be positive");
        }
        if self.elo.min_win_gain <= 0.0 {
            anyhow::bail!("elo.min_win_gain must be positive");
        }
        if self.arbitrage.max_stake < 0.0 {
            anyhow::bail!("arbitrage.max_stake cannot be negative");
        }
        if self.alerts.min_steam_threshold <= 0.0 {
            anyhow::bail!("alerts.min_steam_threshold must be positive");
        }
        if self.alerts.monitoring_window_secs == 0 {
            anyhow::bail!("alerts.monitoring_window_secs must be at least 1");
        }
        Ok(())
    }

    /// Load a dotenv file into the process environment. Variables already
    /// set in the environment keep their values.
    pub fn load_env_from(path: &Path) -> Result<()> {
        dotenvy::from_path(path).with_context(|| format!("failed to load {}", path.display()))
    }

    /// `.env` in the working directory, when there is one.
    pub fn load_env_file() -> Result<()> {
        let path = Path::new(ENV_FILE);
        if !path.exists() {
            return Ok(());
        }
        Self::load_env_from(path)
    }
}
