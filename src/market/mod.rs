pub mod alerts;
pub mod arbitrage;
pub mod clock;
pub mod line_history;
pub mod odds;
pub mod types;

pub use alerts::{Alert, AlertKind, AlertSystem, MarketKey, MonitoringStats};
pub use arbitrage::ArbitrageDetector;
pub use clock::{Clock, ManualClock, WallClock};
pub use line_history::{LineHistory, LineObservation};
pub use odds::OddsFormat;
pub use types::{ArbitrageBet, ArbitrageOpportunity, BookQuotes, OddsSnapshot};
