pub mod replay;
pub mod simulated;
pub mod types;

use anyhow::Result;
use async_trait::async_trait;
use types::FeedRecord;

pub use replay::ReplayFeed;
pub use simulated::SimulatedSeason;

/// A source of game results and market observations.
#[async_trait]
pub trait MarketFeed: Send {
    /// Next batch of records, or `None` once the source is exhausted.
    async fn next_batch(&mut self) -> Result<Option<Vec<FeedRecord>>>;

    fn name(&self) -> &str;
}
