//! ISIS export library
//!
//! Reads CDS/ISIS master files and exports their records to CSV files or
//! MongoDB collections. The `isis2csv` and `isis2mongo` binaries are thin
//! wrappers over this library.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing and the process boundary
//! - `config`: Configuration management
//! - `conversion`: Tag to field name conversion tables
//! - `document`: Intermediate document shared by sources and sinks
//! - `error`: Error types and handling
//! - `export`: Sources, sinks and the export driver
//! - `isis`: Master file reader
//!
//! # Example
//!
//! ```no_run
//! use isis_export::export::{
//!     ExportDriver, IsisSource, IsisSourceOptions, MongoSink, MongoSinkOptions, ProgressTracker,
//! };
//! use isis_export::config::Config;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::default();
//!     let source = IsisSource::open(IsisSourceOptions::new("data/lilacs"))?;
//!     let sink = MongoSink::connect(
//!         MongoSinkOptions::new("localhost", "bireme", "lilacs"),
//!         &config.mongo,
//!     )
//!     .await?;
//!
//!     let mut driver = ExportDriver::new(Box::new(source), Box::new(sink), ProgressTracker::silent());
//!     let result = driver.export().await?;
//!     println!("Exported {} documents", result.documents_exported);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod conversion;
pub mod document;
pub mod error;
pub mod export;
pub mod isis;

// Re-export commonly used types
pub use config::Config;
pub use conversion::ConversionTable;
pub use document::{FieldValue, IntermediateDocument};
pub use error::{InteropError, Result};
pub use export::{ExportDriver, ExportResult, RecordSink, RecordSource};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string
///
/// # Returns
/// * `&str` - Version string
pub fn version() -> &'static str {
    VERSION
}
