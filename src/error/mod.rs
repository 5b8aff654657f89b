//! Error handling for export runs.
//!
//! This module provides:
//! - One crate-wide error type, [`InteropError`], with a kind per concern
//!   (arguments, source, conversion table, sink, configuration)
//! - One-line rendering of MongoDB driver errors
//!
//! # Example
//!
//! ```rust,no_run
//! use isis_export::error::{Result, SinkError};
//!
//! fn persist() -> Result<()> {
//!     Err(SinkError::Write("destination unreachable".to_string()).into())
//! }
//! ```

pub mod kinds;
pub mod mongo;

// Re-export commonly used types
pub use kinds::{
    ArgumentError, ConfigError, ConversionTableError, InteropError, Result, SinkError, SourceError,
};
pub use mongo::MongoFailure;
