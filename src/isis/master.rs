//! Master file (`.mst` + `.xrf`) access by MFN

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{InteropError, Result, SourceError};

use super::record::{IsisRecord, LEADER_SIZE, RecordStatus};
use super::xrf::{XrfPointer, XrfReader};

/// Bytes reserved for the control record at the start of the `.mst`
pub const CONTROL_RECORD_SIZE: usize = 64;

/// Control record (MFN 0) of a master file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRecord {
    /// Next MFN to be assigned
    pub next_mfn: u32,
    /// Block where the next record will be written
    pub next_block: i32,
    /// Offset where the next record will be written
    pub next_offset: u16,
    /// Master file type (0 for user databases)
    pub mftype: i16,
}

impl ControlRecord {
    pub fn parse(bytes: &[u8]) -> std::result::Result<Self, String> {
        if bytes.len() < 16 {
            return Err(format!("control record truncated to {} bytes", bytes.len()));
        }

        let ctlmfn = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let nxtmfn = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let nxtmfb = i32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        let nxtmfp = i16::from_le_bytes([bytes[12], bytes[13]]);
        let mftype = i16::from_le_bytes([bytes[14], bytes[15]]);

        if ctlmfn != 0 {
            return Err(format!("control record MFN is {ctlmfn}, expected 0"));
        }
        if nxtmfn < 1 || nxtmfp < 0 {
            return Err(format!("invalid next MFN {nxtmfn} / offset {nxtmfp}"));
        }

        Ok(Self {
            next_mfn: nxtmfn as u32,
            next_block: nxtmfb,
            next_offset: nxtmfp as u16,
            mftype,
        })
    }

    pub fn to_bytes(&self) -> [u8; CONTROL_RECORD_SIZE] {
        let mut out = [0u8; CONTROL_RECORD_SIZE];
        out[4..8].copy_from_slice(&(self.next_mfn as i32).to_le_bytes());
        out[8..12].copy_from_slice(&self.next_block.to_le_bytes());
        out[12..14].copy_from_slice(&(self.next_offset as i16).to_le_bytes());
        out[14..16].copy_from_slice(&self.mftype.to_le_bytes());
        out
    }

    /// Highest MFN ever assigned
    pub fn last_mfn(&self) -> u32 {
        self.next_mfn - 1
    }
}

/// What the master file holds for one MFN
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordLookup {
    Active(IsisRecord),
    LogicallyDeleted,
    Absent,
}

/// Random-access reader over a master file
#[derive(Debug)]
pub struct MasterFile<R> {
    path: PathBuf,
    mst: R,
    xrf: XrfReader<R>,
    control: ControlRecord,
}

impl MasterFile<BufReader<File>> {
    /// Open `db`, `db.mst` or `db.MST` together with its `.xrf`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (mst_path, xrf_path) = Self::file_names(path.as_ref());
        let open = |p: &Path| {
            File::open(p).map(BufReader::new).map_err(|e| SourceError::Open {
                path: p.to_path_buf(),
                reason: e.to_string(),
            })
        };

        let mst = open(&mst_path)?;
        let xrf = open(&xrf_path)?;
        debug!(
            "Opened master file {} (xrf {})",
            mst_path.display(),
            xrf_path.display()
        );
        Self::from_readers(mst_path, mst, xrf)
    }

    /// Resolve the `.mst`/`.xrf` pair, keeping the caller's extension case
    fn file_names(path: &Path) -> (PathBuf, PathBuf) {
        match path.extension().and_then(|e| e.to_str()) {
            Some("MST") => (path.to_path_buf(), path.with_extension("XRF")),
            Some(ext) if ext.eq_ignore_ascii_case("mst") => {
                (path.to_path_buf(), path.with_extension("xrf"))
            }
            _ => {
                let mut mst = path.as_os_str().to_owned();
                mst.push(".mst");
                let mut xrf = path.as_os_str().to_owned();
                xrf.push(".xrf");
                (PathBuf::from(mst), PathBuf::from(xrf))
            }
        }
    }
}

impl<R: Read + Seek> MasterFile<R> {
    /// Build from already opened streams; `path` is only used in messages
    pub fn from_readers(path: PathBuf, mut mst: R, xrf: R) -> Result<Self> {
        let open_error = |reason: String| SourceError::Open {
            path: path.clone(),
            reason,
        };

        let mut header = [0u8; CONTROL_RECORD_SIZE];
        mst.seek(SeekFrom::Start(0))
            .and_then(|_| mst.read_exact(&mut header))
            .map_err(|e| open_error(format!("cannot read control record: {e}")))?;
        let control = ControlRecord::parse(&header).map_err(open_error)?;
        let xrf = XrfReader::new(xrf).map_err(|e| open_error(e.to_string()))?;

        Ok(Self {
            path,
            mst,
            xrf,
            control,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn control(&self) -> &ControlRecord {
        &self.control
    }

    /// Highest MFN ever assigned
    pub fn last_mfn(&self) -> u32 {
        self.control.last_mfn()
    }

    /// Read the current version of record `mfn`
    pub fn read_record(&mut self, mfn: u32) -> Result<RecordLookup> {
        if mfn == 0 || mfn > self.last_mfn() {
            return Ok(RecordLookup::Absent);
        }

        let pointer = self.xrf.pointer(mfn)?;
        let position = match (pointer, pointer.mst_position()) {
            (XrfPointer::Active { .. }, Some(position)) => position,
            (XrfPointer::LogicallyDeleted { .. }, _) => return Ok(RecordLookup::LogicallyDeleted),
            _ => return Ok(RecordLookup::Absent),
        };

        let record = self.read_at(mfn, position)?;
        if record.mfn != mfn {
            return Err(SourceError::CorruptRecord {
                mfn,
                reason: format!("cross-reference points to record {}", record.mfn),
            }
            .into());
        }

        Ok(match record.status {
            RecordStatus::Active => RecordLookup::Active(record),
            RecordStatus::LogicallyDeleted => RecordLookup::LogicallyDeleted,
        })
    }

    fn read_at(&mut self, mfn: u32, position: u64) -> Result<IsisRecord> {
        let truncated = |e: std::io::Error| -> InteropError {
            SourceError::CorruptRecord {
                mfn,
                reason: format!("cannot read record at byte {position}: {e}"),
            }
            .into()
        };

        let mut leader = [0u8; LEADER_SIZE];
        self.mst.seek(SeekFrom::Start(position))?;
        self.mst.read_exact(&mut leader).map_err(truncated)?;

        let length = i16::from_le_bytes([leader[4], leader[5]]).unsigned_abs() as usize;
        if length < LEADER_SIZE {
            return Err(SourceError::CorruptRecord {
                mfn,
                reason: format!("record length {length} shorter than its leader"),
            }
            .into());
        }

        let mut bytes = vec![0u8; length];
        bytes[..LEADER_SIZE].copy_from_slice(&leader);
        self.mst
            .read_exact(&mut bytes[LEADER_SIZE..])
            .map_err(truncated)?;

        IsisRecord::parse(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isis::fixtures::MasterFileBuilder;
    use crate::isis::record::IsisField;

    #[test]
    fn test_control_record() {
        let control = ControlRecord {
            next_mfn: 4,
            next_block: 1,
            next_offset: 64,
            mftype: 0,
        };
        let parsed = ControlRecord::parse(&control.to_bytes()).unwrap();
        assert_eq!(parsed, control);
        assert_eq!(parsed.last_mfn(), 3);
    }

    #[test]
    fn test_control_record_rejects_garbage() {
        let mut bytes = [0u8; CONTROL_RECORD_SIZE];
        bytes[0] = 7;
        assert!(ControlRecord::parse(&bytes).is_err());
    }

    #[test]
    fn test_read_records_by_mfn() {
        let mut master = MasterFileBuilder::new()
            .record(&[(10, "first")])
            .deleted(&[(10, "gone")])
            .record(&[(10, "third"), (20, "x")])
            .into_master();

        assert_eq!(master.last_mfn(), 3);
        match master.read_record(1).unwrap() {
            RecordLookup::Active(record) => {
                assert_eq!(record.mfn, 1);
                assert_eq!(
                    record.fields,
                    vec![IsisField { tag: 10, data: b"first".to_vec() }]
                );
            }
            other => panic!("unexpected lookup {other:?}"),
        }
        assert_eq!(master.read_record(2).unwrap(), RecordLookup::LogicallyDeleted);
        assert!(matches!(master.read_record(3).unwrap(), RecordLookup::Active(_)));
        assert_eq!(master.read_record(4).unwrap(), RecordLookup::Absent);
        assert_eq!(master.read_record(0).unwrap(), RecordLookup::Absent);
    }

    #[test]
    fn test_records_spanning_blocks() {
        let long = "x".repeat(700);
        let mut builder = MasterFileBuilder::new();
        for _ in 0..5 {
            builder = builder.record(&[(1, long.as_str()), (2, "tail")]);
        }
        let mut master = builder.into_master();

        for mfn in 1..=5 {
            match master.read_record(mfn).unwrap() {
                RecordLookup::Active(record) => {
                    assert_eq!(record.mfn, mfn);
                    assert_eq!(record.fields[1].data, b"tail".to_vec());
                }
                other => panic!("unexpected lookup {other:?}"),
            }
        }
    }

    #[test]
    fn test_open_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let base = MasterFileBuilder::new()
            .record(&[(10, "on disk")])
            .write_to(dir.path(), "lilacs");

        let mut by_base = MasterFile::open(&base).unwrap();
        assert_eq!(by_base.last_mfn(), 1);
        assert!(matches!(by_base.read_record(1).unwrap(), RecordLookup::Active(_)));

        let with_ext = base.with_extension("mst");
        assert!(MasterFile::open(with_ext).is_ok());
    }

    #[test]
    fn test_open_missing_file() {
        let err = MasterFile::open("/nonexistent/db").unwrap_err();
        assert!(matches!(err, InteropError::Source(SourceError::Open { .. })));
    }

    #[test]
    fn test_open_corrupt_control_record() {
        let dir = tempfile::tempdir().unwrap();
        let mst = dir.path().join("bad.mst");
        std::fs::write(&mst, b"not an isis file").unwrap();
        std::fs::write(dir.path().join("bad.xrf"), [0u8; 512]).unwrap();

        let err = MasterFile::open(&mst).unwrap_err();
        assert!(matches!(err, InteropError::Source(SourceError::Open { .. })));
    }
}
