//! Tag to field-name conversion table
//!
//! The table file holds one mapping per line:
//!
//! ```text
//! # ISIS tag = destination field
//! 10=title
//! 20=author
//! ```
//!
//! Tags without an entry keep their decimal string as field name.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ConversionTableError, Result};

/// Read-only mapping from ISIS tag to destination field name
#[derive(Debug, Clone, Default)]
pub struct ConversionTable {
    names: HashMap<u32, String>,
}

impl ConversionTable {
    /// Table that maps every tag to its own decimal string
    pub fn identity() -> Self {
        Self::default()
    }

    /// Load a table from a file
    ///
    /// # Arguments
    /// * `path` - Table file, one `<tag>=<name>` per line
    ///
    /// # Returns
    /// * `Result<Self>` - Loaded table, or the first malformed line
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConversionTableError::Unreadable {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;

        let table = Self::parse(&content)?;
        debug!(
            "Loaded conversion table {} ({} entries)",
            path.display(),
            table.len()
        );
        Ok(table)
    }

    /// Parse table text
    ///
    /// Blank lines and `#` comments are skipped. The name is everything after
    /// the first `=`, so it may contain `=` itself.
    pub fn parse(content: &str) -> Result<Self> {
        let mut names = HashMap::new();

        for (idx, raw) in content.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let malformed = || ConversionTableError::Malformed {
                line: idx + 1,
                content: raw.to_string(),
            };

            let (tag, name) = line.split_once('=').ok_or_else(malformed)?;
            let tag: u32 = tag.trim().parse().map_err(|_| malformed())?;
            let name = name.trim();
            if tag == 0 || name.is_empty() {
                return Err(malformed().into());
            }

            if let Some(previous) = names.insert(tag, name.to_string()) {
                warn!(
                    "Conversion table line {}: tag {} remapped from '{}' to '{}'",
                    idx + 1,
                    tag,
                    previous,
                    name
                );
            }
        }

        Ok(Self { names })
    }

    /// Destination name for `tag`, or its decimal string when unmapped
    pub fn lookup(&self, tag: u32) -> String {
        match self.names.get(&tag) {
            Some(name) => name.clone(),
            None => tag.to_string(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InteropError;
    use std::io::Write;

    #[test]
    fn test_parse_and_lookup() {
        let table = ConversionTable::parse("10=title\n20 = author\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(10), "title");
        assert_eq!(table.lookup(20), "author");
    }

    #[test]
    fn test_unmapped_tag_falls_back_to_number() {
        let table = ConversionTable::parse("10=title").unwrap();
        assert_eq!(table.lookup(30), "30");
        assert_eq!(ConversionTable::identity().lookup(245), "245");
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let table = ConversionTable::parse("# header\n\n  \n10=title\n").unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_name_may_contain_equals() {
        let table = ConversionTable::parse("10=a=b").unwrap();
        assert_eq!(table.lookup(10), "a=b");
    }

    #[test]
    fn test_non_integer_tag_is_malformed() {
        let err = ConversionTable::parse("10=title\nabc=title\n").unwrap_err();
        match err {
            InteropError::ConversionTable(ConversionTableError::Malformed { line, content }) => {
                assert_eq!(line, 2);
                assert_eq!(content, "abc=title");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_other_malformed_lines() {
        for bad in ["10", "10=", "0=zero", "-5=neg", "=title"] {
            assert!(ConversionTable::parse(bad).is_err(), "accepted '{bad}'");
        }
    }

    #[test]
    fn test_duplicate_tag_last_wins() {
        let table = ConversionTable::parse("10=title\n10=titulo\n").unwrap();
        assert_eq!(table.lookup(10), "titulo");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "10=title").unwrap();
        writeln!(file, "70=author").unwrap();

        let table = ConversionTable::load(file.path()).unwrap();
        assert_eq!(table.lookup(70), "author");
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConversionTable::load("/nonexistent/table.txt").unwrap_err();
        assert!(matches!(
            err,
            InteropError::ConversionTable(ConversionTableError::Unreadable { .. })
        ));
    }
}
