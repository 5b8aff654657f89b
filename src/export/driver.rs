//! Export driver
//!
//! Pulls documents from a [`RecordSource`] and pushes them into a
//! [`RecordSink`] one at a time, counting what was written.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::Result;

use super::progress::ProgressTracker;
use super::sinks::RecordSink;
use super::sources::RecordSource;

/// Result of an export operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportResult {
    /// Number of documents written to the sink
    pub documents_exported: u64,
    /// Time taken for export
    pub elapsed_ms: u64,
    /// Whether the export was cancelled
    pub cancelled: bool,
}

/// Driver for export operations
pub struct ExportDriver {
    source: Box<dyn RecordSource>,
    sink: Box<dyn RecordSink>,
    tracker: ProgressTracker,
    cancel_token: Option<CancellationToken>,
}

impl ExportDriver {
    /// Create a new export driver
    pub fn new(
        source: Box<dyn RecordSource>,
        sink: Box<dyn RecordSink>,
        tracker: ProgressTracker,
    ) -> Self {
        Self {
            source,
            sink,
            tracker,
            cancel_token: None,
        }
    }

    /// Set cancellation token for this export operation
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Copy every document of the source into the sink
    ///
    /// The sink is closed whatever happens, through `abort` when the run
    /// failed. In that case a failure to close is logged and the run's error is
    /// returned.
    ///
    /// # Returns
    /// * `Result<ExportResult>` - Export statistics or the first error
    pub async fn export(&mut self) -> Result<ExportResult> {
        let start_time = Instant::now();
        info!("Starting export operation");

        let outcome = self.pump().await;
        let sink_closed = if outcome.is_ok() {
            self.sink.close().await
        } else {
            self.sink.abort().await
        };
        let source_closed = self.source.close().await;

        let (exported, cancelled) = match outcome {
            Ok(counts) => counts,
            Err(e) => {
                if let Err(close_err) = sink_closed {
                    warn!("Failed to close sink after error: {}", close_err);
                }
                if let Err(close_err) = source_closed {
                    warn!("Failed to close source after error: {}", close_err);
                }
                return Err(e);
            }
        };
        sink_closed?;
        source_closed?;

        self.tracker.finish(exported, cancelled);

        Ok(ExportResult {
            documents_exported: exported,
            elapsed_ms: start_time.elapsed().as_millis() as u64,
            cancelled,
        })
    }

    /// Run the copy loop; returns the count and whether it was cancelled
    async fn pump(&mut self) -> Result<(u64, bool)> {
        let mut exported = 0u64;

        loop {
            if let Some(ref token) = self.cancel_token {
                // the signal listener only runs when this task yields
                tokio::task::yield_now().await;
                if token.is_cancelled() {
                    info!("Export operation cancelled by user");
                    return Ok((exported, true));
                }
            }

            let Some(doc) = self.source.next_document().await? else {
                debug!("No more documents available");
                return Ok((exported, false));
            };

            trace!(
                document = %doc.to_json().unwrap_or_else(|e| e.to_string()),
                "Exporting document {}",
                exported + 1
            );
            self.sink.write(&doc).await?;
            exported += 1;
            self.tracker.update(exported);
        }
    }
}
