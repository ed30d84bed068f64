pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_support;

pub use adapters::airtable::AirtableClient;
pub use adapters::pdf::PdfRenderer;
pub use config::{cli::LocalStorage, CliArgs, TranscriptConfig};
pub use crate::core::{etl::TranscriptEngine, pipeline::TranscriptPipeline};
pub use utils::error::{Result, TranscriptError};
