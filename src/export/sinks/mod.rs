//! Record sinks for export operations
//!
//! This module provides a unified interface for persisting intermediate
//! documents to different destinations (CSV files, MongoDB collections).

use std::path::Path;

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::BufWriter;

use crate::document::IntermediateDocument;
use crate::error::{Result, SinkError};

pub mod csv;
pub mod mongo;

pub use csv::{CsvSink, CsvSinkOptions};
pub use mongo::{MongoSink, MongoSinkOptions};

/// Trait for persisting documents to a destination
#[async_trait]
pub trait RecordSink: Send {
    /// Persist one document
    ///
    /// # Arguments
    /// * `doc` - Document to write
    async fn write(&mut self, doc: &IntermediateDocument) -> Result<()>;

    /// Flush pending output and release the destination
    ///
    /// Safe to call more than once; later calls do nothing.
    async fn close(&mut self) -> Result<()>;

    /// Release the destination after a failed run
    ///
    /// Sinks that finish their output on close (a trailing header) leave it
    /// out here. Defaults to [`RecordSink::close`].
    async fn abort(&mut self) -> Result<()> {
        self.close().await
    }

    /// Number of documents written so far
    fn written(&self) -> u64;
}

/// Open a buffered file writer, truncating or appending
///
/// # Arguments
/// * `path` - File path to open
/// * `append` - Keep existing content and write after it
pub(crate) async fn open_writer(path: &Path, append: bool) -> Result<BufWriter<File>> {
    let file = if append {
        OpenOptions::new().create(true).append(true).open(path).await
    } else {
        File::create(path).await
    }
    .map_err(|e| SinkError::Open(format!("{}: {}", path.display(), e)))?;

    Ok(BufWriter::with_capacity(1024 * 1024, file))
}

/// Check that the parent directory of `path` exists
pub(crate) fn validate_path(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(SinkError::Open(format!(
                "Directory does not exist: {}",
                parent.display()
            ))
            .into());
        }
    }

    Ok(())
}
