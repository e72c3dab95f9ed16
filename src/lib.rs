pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod github;
pub mod images;
pub mod markdown;
pub mod pdf;
pub mod progress;

mod test_utils;

pub use config::Config;
pub use export::{ExportSummary, Exporter};
