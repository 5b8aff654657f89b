//! CSV sink for export operations
//!
//! Documents become rows. The column set starts from the preset columns, if
//! any, and the first document. Once a leading header is written it is fixed,
//! and fields outside it are dropped with a warning. Otherwise the set grows
//! when later documents carry new field names. Repeated values share one cell,
//! joined with a sub-delimiter.

use std::path::PathBuf;

use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use indexmap::IndexSet;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use crate::document::IntermediateDocument;
use crate::error::{Result, SinkError};

use super::{RecordSink, open_writer, validate_path};

/// Construction parameters of a [`CsvSink`]
#[derive(Debug, Clone)]
pub struct CsvSinkOptions {
    pub path: PathBuf,
    pub encoding: &'static Encoding,
    pub delimiter: char,
    /// Write the header as the last line instead of the first
    pub has_footer: bool,
    /// Append to an existing file; no header or footer is written
    pub append: bool,
    /// Columns known before the first document, in output order
    pub columns: Vec<String>,
}

impl CsvSinkOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            encoding: UTF_8,
            delimiter: ',',
            has_footer: false,
            append: false,
            columns: Vec::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        if matches!(self.delimiter, '"' | '\n' | '\r') {
            return Err(SinkError::InvalidOptions(format!(
                "{:?} cannot be used as a column delimiter",
                self.delimiter
            ))
            .into());
        }
        Ok(())
    }
}

/// Writer for CSV files
pub struct CsvSink {
    /// Buffered file writer, `None` once closed
    writer: Option<BufWriter<File>>,
    path: PathBuf,
    encoding: &'static Encoding,
    delimiter: char,
    /// Joins the values of a repeated field inside one cell
    sub_delimiter: &'static str,
    has_footer: bool,
    append: bool,
    /// Column names in output order
    headers: IndexSet<String>,
    headers_written: bool,
    /// Set by `abort`; the footer of a failed run is not written
    aborted: bool,
    written: u64,
}

impl CsvSink {
    /// Create the output file and prepare the sink
    ///
    /// # Returns
    /// * `Result<Self>` - New sink, or an error if the options are unusable or
    ///   the file cannot be opened
    pub async fn create(options: CsvSinkOptions) -> Result<Self> {
        options.validate()?;
        validate_path(&options.path)?;
        let writer = open_writer(&options.path, options.append).await?;

        debug!(
            "Created CSV sink for {} (encoding {}, delimiter {:?})",
            options.path.display(),
            options.encoding.name(),
            options.delimiter
        );

        Ok(Self {
            writer: Some(writer),
            path: options.path,
            encoding: options.encoding,
            delimiter: options.delimiter,
            sub_delimiter: Self::sub_delimiter_for(options.delimiter),
            has_footer: options.has_footer,
            append: options.append,
            headers: options.columns.into_iter().collect(),
            headers_written: false,
            aborted: false,
            written: 0,
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Current column set
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.headers.iter().map(String::as_str)
    }

    fn sub_delimiter_for(delimiter: char) -> &'static str {
        if delimiter == '|' { ";" } else { "|" }
    }

    /// Add the field names of `doc` not yet in the column set
    fn collect_headers(&mut self, doc: &IntermediateDocument) {
        if self.headers_written {
            let dropped: Vec<&str> = doc
                .names()
                .filter(|name| !self.headers.contains(*name))
                .collect();
            if !dropped.is_empty() {
                warn!(
                    "Record {} has fields not in the CSV header, dropped: {}",
                    self.written + 1,
                    dropped.join(", ")
                );
            }
            return;
        }

        let before = self.headers.len();
        self.headers.extend(doc.names().map(str::to_string));

        if self.written > 0 && self.headers.len() > before {
            debug!(
                "Discovered {} new fields in record {}, earlier rows have no value for them",
                self.headers.len() - before,
                self.written + 1
            );
        }
    }

    fn header_line(&self) -> String {
        let cells: Vec<String> = self
            .headers
            .iter()
            .map(|name| self.escape_csv_value(name))
            .collect();
        cells.join(&self.delimiter.to_string())
    }

    fn row_line(&self, doc: &IntermediateDocument) -> String {
        let cells: Vec<String> = self
            .headers
            .iter()
            .map(|name| {
                doc.get(name)
                    .map(|value| self.escape_csv_value(&value.join(self.sub_delimiter)))
                    .unwrap_or_default()
            })
            .collect();
        cells.join(&self.delimiter.to_string())
    }

    /// Quote a value containing the delimiter, a quote or a line break
    fn escape_csv_value(&self, value: &str) -> String {
        if value.contains(self.delimiter)
            || value.contains('"')
            || value.contains('\n')
            || value.contains('\r')
        {
            format!("\"{}\"", value.replace('"', "\"\""))
        } else {
            value.to_string()
        }
    }

    /// Encode and write one line followed by a newline
    async fn write_line(&mut self, line: &str) -> Result<()> {
        let (bytes, _, unmappable) = self.encoding.encode(line);
        if unmappable {
            return Err(SinkError::Encode {
                encoding: self.encoding.name().to_string(),
                value: line.to_string(),
            }
            .into());
        }

        let Some(writer) = self.writer.as_mut() else {
            return Err(SinkError::Write(format!("{} is closed", self.path.display())).into());
        };
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| SinkError::Write(format!("{}: {}", self.path.display(), e)))?;
        writer
            .write_all(b"\n")
            .await
            .map_err(|e| SinkError::Write(format!("{}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

#[async_trait]
impl RecordSink for CsvSink {
    async fn write(&mut self, doc: &IntermediateDocument) -> Result<()> {
        self.collect_headers(doc);

        if !self.headers_written && !self.append && !self.has_footer {
            let header = self.header_line();
            self.write_line(&header).await?;
            self.headers_written = true;
            debug!("Wrote CSV header: {} fields", self.headers.len());
        }

        let row = self.row_line(doc);
        self.write_line(&row).await?;
        self.written += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if self.writer.is_none() {
            return Ok(());
        }

        if self.has_footer && !self.append && !self.aborted && !self.headers.is_empty() {
            let footer = self.header_line();
            self.write_line(&footer).await?;
            debug!("Wrote CSV footer: {} fields", self.headers.len());
        }

        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .await
                .map_err(|e| SinkError::Write(format!("{}: {}", self.path.display(), e)))?;
        }

        debug!(
            "Closed CSV file: {} ({} documents)",
            self.path.display(),
            self.written
        );
        Ok(())
    }

    async fn abort(&mut self) -> Result<()> {
        self.aborted = true;
        self.close().await
    }

    fn written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InteropError;

    fn doc(fields: &[(&str, &str)]) -> IntermediateDocument {
        let mut doc = IntermediateDocument::new();
        for (name, value) in fields {
            doc.push(*name, *value);
        }
        doc
    }

    async fn export(options: CsvSinkOptions, docs: &[IntermediateDocument]) -> CsvSink {
        let mut sink = CsvSink::create(options).await.unwrap();
        for d in docs {
            sink.write(d).await.unwrap();
        }
        sink.close().await.unwrap();
        sink
    }

    #[tokio::test]
    async fn test_header_then_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let sink = export(
            CsvSinkOptions::new(&path),
            &[
                doc(&[("title", "Dom Casmurro"), ("author", "Machado")]),
                doc(&[("title", "Iracema"), ("author", "Alencar")]),
            ],
        )
        .await;

        assert_eq!(sink.written(), 2);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "title,author\nDom Casmurro,Machado\nIracema,Alencar\n"
        );
    }

    #[tokio::test]
    async fn test_footer_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut options = CsvSinkOptions::new(&path);
        options.has_footer = true;

        export(options, &[doc(&[("a", "1"), ("b", "2")])]).await;
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1,2\na,b\n");
    }

    #[tokio::test]
    async fn test_new_columns_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut options = CsvSinkOptions::new(&path);
        options.has_footer = true;

        let sink = export(
            options,
            &[doc(&[("a", "1")]), doc(&[("b", "2"), ("a", "3")])],
        )
        .await;

        assert_eq!(sink.headers().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1\n3,2\na,b\n");
    }

    #[tokio::test]
    async fn test_leading_header_drops_late_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let sink = export(
            CsvSinkOptions::new(&path),
            &[doc(&[("a", "1")]), doc(&[("b", "2"), ("a", "3")])],
        )
        .await;

        assert_eq!(sink.written(), 2);
        assert_eq!(sink.headers().collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n1\n3\n");
    }

    #[tokio::test]
    async fn test_preset_columns_lead_the_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut options = CsvSinkOptions::new(&path);
        options.columns = vec!["a".to_string(), "b".to_string()];

        export(options, &[doc(&[("a", "1")]), doc(&[("b", "2"), ("a", "3")])]).await;
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n1,\n3,2\n");
    }

    #[tokio::test]
    async fn test_abort_skips_footer() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut options = CsvSinkOptions::new(&path);
        options.has_footer = true;

        let mut sink = CsvSink::create(options).await.unwrap();
        sink.write(&doc(&[("a", "1")])).await.unwrap();
        sink.abort().await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1\n");
    }

    #[tokio::test]
    async fn test_append_mode_writes_no_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        export(CsvSinkOptions::new(&path), &[doc(&[("a", "1")])]).await;

        let mut options = CsvSinkOptions::new(&path);
        options.append = true;
        options.has_footer = true;
        let sink = export(options, &[doc(&[("a", "2")]), doc(&[("a", "3")])]).await;

        assert_eq!(sink.written(), 2);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n1\n2\n3\n");
    }

    #[tokio::test]
    async fn test_repeated_values_and_escaping() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let mut d = IntermediateDocument::new();
        d.push("author", "Silva");
        d.push("author", "Souza");
        d.push("note", "say \"hi\", then\nleave");

        export(CsvSinkOptions::new(&path), &[d]).await;
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "author,note\nSilva|Souza,\"say \"\"hi\"\", then\nleave\"\n"
        );
    }

    #[tokio::test]
    async fn test_pipe_delimiter_switches_sub_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut options = CsvSinkOptions::new(&path);
        options.delimiter = '|';

        let mut d = IntermediateDocument::new();
        d.push("k", "x");
        d.push("k", "y");
        d.push("v", "a|b");

        export(options, &[d]).await;
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "k|v\nx;y|\"a|b\"\n"
        );
    }

    #[tokio::test]
    async fn test_latin1_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut options = CsvSinkOptions::new(&path);
        options.encoding = encoding_rs::WINDOWS_1252;

        export(options, &[doc(&[("city", "São Paulo")])]).await;
        assert_eq!(std::fs::read(&path).unwrap(), b"city\nS\xe3o Paulo\n".to_vec());
    }

    #[tokio::test]
    async fn test_unmappable_character_is_an_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = CsvSinkOptions::new(dir.path().join("out.csv"));
        options.encoding = encoding_rs::WINDOWS_1252;

        let mut sink = CsvSink::create(options).await.unwrap();
        let err = sink.write(&doc(&[("t", "日本")])).await.unwrap_err();
        assert!(matches!(err, InteropError::Sink(SinkError::Encode { .. })));
        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_quote_delimiter() {
        let dir = tempfile::tempdir().unwrap();
        let mut options = CsvSinkOptions::new(dir.path().join("out.csv"));
        options.delimiter = '"';

        let err = CsvSink::create(options).await.err().unwrap();
        assert!(matches!(err, InteropError::Sink(SinkError::InvalidOptions(_))));
    }

    #[tokio::test]
    async fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let options = CsvSinkOptions::new(dir.path().join("nope/out.csv"));
        let err = CsvSink::create(options).await.err().unwrap();
        assert!(matches!(err, InteropError::Sink(SinkError::Open(_))));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut options = CsvSinkOptions::new(&path);
        options.has_footer = true;

        let mut sink = CsvSink::create(options).await.unwrap();
        sink.write(&doc(&[("a", "1")])).await.unwrap();
        sink.close().await.unwrap();
        sink.close().await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "1\na\n");
    }

    #[test]
    fn test_sub_delimiter_choice() {
        assert_eq!(CsvSink::sub_delimiter_for(','), "|");
        assert_eq!(CsvSink::sub_delimiter_for(';'), "|");
        assert_eq!(CsvSink::sub_delimiter_for('|'), ";");
    }
}
