//! CDS/ISIS master file reader
//!
//! This module reads the two files that make up an ISIS master file:
//! - `.mst`: control record followed by variable-length records in 512-byte blocks
//! - `.xrf`: cross-reference table giving the position of every MFN in the `.mst`
//!
//! Only the standard little-endian layout with 18-byte leaders is supported.
//!
//! # Example
//!
//! ```no_run
//! use isis_export::isis::{MasterFile, RecordLookup};
//!
//! let mut master = MasterFile::open("data/lilacs")?;
//! for mfn in 1..=master.last_mfn() {
//!     if let RecordLookup::Active(record) = master.read_record(mfn)? {
//!         println!("{} has {} fields", record.mfn, record.fields.len());
//!     }
//! }
//! # Ok::<(), isis_export::error::InteropError>(())
//! ```

pub mod encoding;
pub mod master;
pub mod record;
pub mod xrf;

#[cfg(test)]
pub(crate) mod fixtures;

pub use encoding::IsisEncoding;
pub use master::{ControlRecord, MasterFile, RecordLookup};
pub use record::{IsisField, IsisRecord, RecordStatus};
pub use xrf::XrfPointer;
