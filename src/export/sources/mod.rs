//! Record sources for export operations
//!
//! A source yields intermediate documents one at a time, forward only, until it
//! is exhausted. Constructing a new source restarts the sequence.

use async_trait::async_trait;

use crate::document::IntermediateDocument;
use crate::error::{ArgumentError, Result};

pub mod isis;

pub use isis::{IsisSource, IsisSourceOptions};

/// Trait for producing intermediate documents from an underlying store
#[async_trait]
pub trait RecordSource: Send {
    /// Fetch the next document
    ///
    /// # Returns
    /// * `Result<Option<IntermediateDocument>>` - Next document, or None if exhausted
    async fn next_document(&mut self) -> Result<Option<IntermediateDocument>>;

    /// Release the underlying store
    async fn close(&mut self) -> Result<()>;
}

/// Inclusive range of MFNs to export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MfnRange {
    from: u32,
    to: Option<u32>,
}

impl Default for MfnRange {
    fn default() -> Self {
        Self { from: 1, to: None }
    }
}

impl MfnRange {
    /// Create a range; `to = None` runs to the last record of the store
    ///
    /// # Returns
    /// * `Result<Self>` - Range, or an argument error when `from < 1` or `to < from`
    pub fn new(from: u32, to: Option<u32>) -> Result<Self> {
        if from < 1 {
            return Err(ArgumentError::Inconsistent(format!(
                "initial mfn must be at least 1, got {from}"
            ))
            .into());
        }
        if let Some(to) = to {
            if to < from {
                return Err(ArgumentError::Inconsistent(format!(
                    "last mfn {to} is lower than initial mfn {from}"
                ))
                .into());
            }
        }
        Ok(Self { from, to })
    }

    pub fn from(&self) -> u32 {
        self.from
    }

    pub fn to(&self) -> Option<u32> {
        self.to
    }

    /// Last MFN to visit given the highest MFN of the store
    pub fn last_within(&self, last_mfn: u32) -> u32 {
        self.to.map_or(last_mfn, |to| to.min(last_mfn))
    }
}
