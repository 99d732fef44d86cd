pub mod config;
pub mod error;
pub mod feed;
pub mod market;
pub mod pipeline;
pub mod ratings;
pub mod report;

pub use config::Config;
pub use error::EngineError;
pub use pipeline::SignalPipeline;
