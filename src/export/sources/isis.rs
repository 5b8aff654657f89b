//! ISIS master file source
//!
//! Walks a master file in ascending MFN order, skipping deleted and absent
//! records, and turns each record into an [`IntermediateDocument`]: fields
//! restricted to the selected tags, renamed through the conversion table,
//! repeated tags collapsed into one multi-valued field.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::PathBuf;

use async_trait::async_trait;
use indexmap::IndexSet;
use tracing::{debug, info};

use crate::conversion::ConversionTable;
use crate::document::IntermediateDocument;
use crate::error::{Result, SourceError};
use crate::isis::{IsisEncoding, IsisField, IsisRecord, MasterFile, RecordLookup};

use super::{MfnRange, RecordSource};

/// Construction parameters of an [`IsisSource`]
#[derive(Debug, Clone)]
pub struct IsisSourceOptions {
    /// Master file, with or without the `.mst` extension
    pub master: PathBuf,
    pub encoding: IsisEncoding,
    /// Tags to export in this order; `None` exports every field
    pub tags: Option<Vec<u32>>,
    pub range: MfnRange,
    pub conversion_table: Option<PathBuf>,
}

impl IsisSourceOptions {
    pub fn new(master: impl Into<PathBuf>) -> Self {
        Self {
            master: master.into(),
            encoding: IsisEncoding::default(),
            tags: None,
            range: MfnRange::default(),
            conversion_table: None,
        }
    }
}

/// Forward-only cursor over a master file
pub struct IsisSource<R> {
    master: Option<MasterFile<R>>,
    table: ConversionTable,
    encoding: IsisEncoding,
    tags: Option<Vec<u32>>,
    next_mfn: u32,
    last_mfn: u32,
    produced: u64,
    skipped: u64,
}

impl IsisSource<BufReader<File>> {
    /// Open the master file described by `options`
    ///
    /// The conversion table is loaded first, so a malformed table is reported
    /// before the master file is touched.
    pub fn open(options: IsisSourceOptions) -> Result<Self> {
        let table = match &options.conversion_table {
            Some(path) => ConversionTable::load(path)?,
            None => ConversionTable::identity(),
        };
        let master = MasterFile::open(&options.master)?;

        Ok(Self::new(
            master,
            table,
            options.encoding,
            options.tags,
            options.range,
        ))
    }
}

impl<R: Read + Seek> IsisSource<R> {
    pub fn new(
        master: MasterFile<R>,
        table: ConversionTable,
        encoding: IsisEncoding,
        tags: Option<Vec<u32>>,
        range: MfnRange,
    ) -> Self {
        let last_mfn = range.last_within(master.last_mfn());
        info!(
            "Reading {} from mfn {} to {} (encoding {})",
            master.path().display(),
            range.from(),
            last_mfn,
            encoding
        );

        Self {
            master: Some(master),
            table,
            encoding,
            tags: tags.map(dedup_tags),
            next_mfn: range.from(),
            last_mfn,
            produced: 0,
            skipped: 0,
        }
    }

    /// Field names of the tag selection after renaming, in selection order
    ///
    /// `None` when every tag is exported. Tags renamed to the same field give
    /// one name.
    pub fn selected_names(&self) -> Option<Vec<String>> {
        let tags = self.tags.as_ref()?;
        let names: IndexSet<String> = tags.iter().map(|&tag| self.table.lookup(tag)).collect();
        Some(names.into_iter().collect())
    }

    /// Build the document for one active record
    fn to_document(&self, record: &IsisRecord) -> Result<IntermediateDocument> {
        let mut doc = IntermediateDocument::new();

        match &self.tags {
            None => {
                for field in &record.fields {
                    doc.push(self.table.lookup(field.tag), self.decode(record.mfn, field)?);
                }
            }
            Some(tags) => {
                for &tag in tags {
                    for field in record.fields.iter().filter(|f| f.tag == tag) {
                        doc.push(self.table.lookup(tag), self.decode(record.mfn, field)?);
                    }
                }
            }
        }

        Ok(doc)
    }

    fn decode(&self, mfn: u32, field: &IsisField) -> Result<String> {
        self.encoding
            .decode(&field.data)
            .map(|text| text.into_owned())
            .ok_or_else(|| {
                SourceError::Decode {
                    mfn,
                    tag: field.tag,
                    encoding: self.encoding.name().to_string(),
                }
                .into()
            })
    }
}

/// Keep the first occurrence of each tag, preserving order
fn dedup_tags(tags: Vec<u32>) -> Vec<u32> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter().filter(|tag| seen.insert(*tag)).collect()
}

#[async_trait]
impl<R: Read + Seek + Send> RecordSource for IsisSource<R> {
    async fn next_document(&mut self) -> Result<Option<IntermediateDocument>> {
        while self.next_mfn <= self.last_mfn {
            let mfn = self.next_mfn;
            self.next_mfn += 1;

            let Some(master) = self.master.as_mut() else {
                return Ok(None);
            };

            match master.read_record(mfn)? {
                RecordLookup::Active(record) => {
                    let doc = self.to_document(&record)?;
                    self.produced += 1;
                    return Ok(Some(doc));
                }
                RecordLookup::LogicallyDeleted => {
                    debug!("Skipping deleted record {}", mfn);
                    self.skipped += 1;
                }
                RecordLookup::Absent => {
                    debug!("Skipping absent record {}", mfn);
                    self.skipped += 1;
                }
            }
        }

        Ok(None)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(master) = self.master.take() {
            info!(
                "Closed {} after reading {} records ({} skipped)",
                master.path().display(),
                self.produced,
                self.skipped
            );
        }
        Ok(())
    }
}
