//! In-memory master file builder for tests

use std::io::Cursor;
use std::path::{Path, PathBuf};

use super::master::{CONTROL_RECORD_SIZE, ControlRecord, MasterFile};
use super::record::{IsisField, IsisRecord, LEADER_SIZE, RecordStatus};
use super::xrf::{BLOCK_SIZE, POINTERS_PER_BLOCK, XrfPointer};

enum Slot {
    Stored(RecordStatus, Vec<IsisField>),
    Absent,
}

/// Builds `.mst`/`.xrf` pairs; MFNs are assigned in call order starting at 1
pub(crate) struct MasterFileBuilder {
    slots: Vec<Slot>,
}

impl MasterFileBuilder {
    pub(crate) fn new() -> Self {
        Self { slots: Vec::new() }
    }

    pub(crate) fn record(self, fields: &[(u32, &str)]) -> Self {
        self.stored(RecordStatus::Active, fields)
    }

    pub(crate) fn deleted(self, fields: &[(u32, &str)]) -> Self {
        self.stored(RecordStatus::LogicallyDeleted, fields)
    }

    /// Record whose field bytes are written untouched
    pub(crate) fn raw_record(mut self, fields: &[(u32, &[u8])]) -> Self {
        let fields = fields
            .iter()
            .map(|(tag, data)| IsisField {
                tag: *tag,
                data: data.to_vec(),
            })
            .collect();
        self.slots.push(Slot::Stored(RecordStatus::Active, fields));
        self
    }

    /// MFN assigned but never stored
    pub(crate) fn absent(mut self) -> Self {
        self.slots.push(Slot::Absent);
        self
    }

    fn stored(mut self, status: RecordStatus, fields: &[(u32, &str)]) -> Self {
        let fields = fields
            .iter()
            .map(|(tag, text)| IsisField {
                tag: *tag,
                data: text.as_bytes().to_vec(),
            })
            .collect();
        self.slots.push(Slot::Stored(status, fields));
        self
    }

    /// Serialize to `(mst, xrf)` bytes
    pub(crate) fn build(&self) -> (Vec<u8>, Vec<u8>) {
        let block = BLOCK_SIZE as usize;
        let mut mst = vec![0u8; CONTROL_RECORD_SIZE];
        let mut pointers = Vec::with_capacity(self.slots.len());

        for (idx, slot) in self.slots.iter().enumerate() {
            let (status, fields) = match slot {
                Slot::Stored(status, fields) => (*status, fields),
                Slot::Absent => {
                    pointers.push(XrfPointer::Absent);
                    continue;
                }
            };

            // a leader never straddles two blocks
            if block - mst.len() % block < LEADER_SIZE {
                let padded = mst.len().div_ceil(block) * block;
                mst.resize(padded, 0);
            }

            let position = mst.len();
            let record = IsisRecord {
                mfn: idx as u32 + 1,
                status,
                fields: fields.clone(),
            };
            mst.extend_from_slice(&record.to_bytes());

            let block_no = (position / block) as u32 + 1;
            let offset = (position % block) as u16;
            pointers.push(match status {
                RecordStatus::Active => XrfPointer::Active {
                    block: block_no,
                    offset,
                },
                RecordStatus::LogicallyDeleted => XrfPointer::LogicallyDeleted {
                    block: block_no,
                    offset,
                },
            });
        }

        let control = ControlRecord {
            next_mfn: self.slots.len() as u32 + 1,
            next_block: (mst.len() / block) as i32 + 1,
            next_offset: (mst.len() % block) as u16,
            mftype: 0,
        };
        mst[..CONTROL_RECORD_SIZE].copy_from_slice(&control.to_bytes());

        let per_block = POINTERS_PER_BLOCK as usize;
        let blocks = pointers.len().div_ceil(per_block).max(1);
        let mut xrf = Vec::with_capacity(blocks * block);
        for b in 0..blocks {
            let xrfpos = if b + 1 == blocks {
                -(b as i32 + 1)
            } else {
                b as i32 + 1
            };
            xrf.extend_from_slice(&xrfpos.to_le_bytes());
            for slot in 0..per_block {
                let raw = pointers
                    .get(b * per_block + slot)
                    .map(XrfPointer::encode)
                    .unwrap_or(0);
                xrf.extend_from_slice(&raw.to_le_bytes());
            }
        }

        (mst, xrf)
    }

    pub(crate) fn into_master(self) -> MasterFile<Cursor<Vec<u8>>> {
        let (mst, xrf) = self.build();
        MasterFile::from_readers(PathBuf::from("memory.mst"), Cursor::new(mst), Cursor::new(xrf))
            .expect("fixture master file")
    }

    /// Write `<dir>/<name>.mst` and `.xrf`; returns the path without extension
    pub(crate) fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let (mst, xrf) = self.build();
        let base = dir.join(name);
        std::fs::write(base.with_extension("mst"), mst).expect("write mst");
        std::fs::write(base.with_extension("xrf"), xrf).expect("write xrf");
        base
    }
}
