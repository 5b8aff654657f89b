//! Export pipeline
//!
//! The export system is built on three components:
//!
//! 1. **RecordSource**: yields intermediate documents from a store
//! 2. **RecordSink**: persists documents to a destination
//! 3. **ProgressTracker**: reports checkpoints and the final count
//!
//! These are orchestrated by the **ExportDriver**.
//!
//! # Example
//!
//! ```no_run
//! use isis_export::export::{
//!     CsvSink, CsvSinkOptions, ExportDriver, IsisSource, IsisSourceOptions, ProgressTracker,
//! };
//!
//! # async fn run() -> isis_export::error::Result<()> {
//! let source = IsisSource::open(IsisSourceOptions::new("data/lilacs"))?;
//! let sink = CsvSink::create(CsvSinkOptions::new("lilacs.csv")).await?;
//!
//! let mut driver = ExportDriver::new(
//!     Box::new(source),
//!     Box::new(sink),
//!     ProgressTracker::silent(),
//! );
//! let result = driver.export().await?;
//! println!("{} documents", result.documents_exported);
//! # Ok(())
//! # }
//! ```

pub mod driver;
pub mod progress;
pub mod sinks;
pub mod sources;

pub use driver::{ExportDriver, ExportResult};
pub use progress::{ProgressEvent, ProgressListener, ProgressTracker};
pub use sinks::{CsvSink, CsvSinkOptions, MongoSink, MongoSinkOptions, RecordSink};
pub use sources::{IsisSource, IsisSourceOptions, MfnRange, RecordSource};
