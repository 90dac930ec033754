use clap::{Parser, Subcommand};

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "cart-crunch")]
#[command(about = "Data-quality checks and aggregates over grocery order data", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load, clean and aggregate the full dataset
    #[command()]
    Run,
    /// Load and clean only, printing the data-quality report
    Check,
    /// Print configuration values
    PrintConfig,
}
