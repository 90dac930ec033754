pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;
pub mod pipeline;

pub use config::AppConfig;
pub use error::Error;
pub use pipeline::{RunSummary, Runner};
