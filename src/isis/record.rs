//! Master file record layout
//!
//! A record is an 18-byte leader, `nvf` directory entries of 6 bytes each,
//! then the variable field area starting at `base`. All integers are
//! little-endian.

use crate::error::{Result, SourceError};

/// Leader size in bytes
pub const LEADER_SIZE: usize = 18;

/// Directory entry size in bytes
pub const DIRECTORY_ENTRY_SIZE: usize = 6;

/// Record status stored in the leader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    Active,
    LogicallyDeleted,
}

/// Record leader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leader {
    pub mfn: u32,
    /// Record length; the on-disk value is negative while the record is locked
    pub mfrl: u16,
    /// Block of the previous version of the record
    pub mfbwb: i32,
    /// Offset of the previous version of the record
    pub mfbwp: u16,
    /// Offset of the field area from the start of the record
    pub base: u16,
    /// Number of directory entries
    pub nvf: u16,
    pub status: RecordStatus,
}

impl Leader {
    /// Parse the first [`LEADER_SIZE`] bytes of a record
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < LEADER_SIZE {
            return Err(SourceError::CorruptRecord {
                mfn: 0,
                reason: format!("leader truncated to {} bytes", bytes.len()),
            }
            .into());
        }

        let mfn = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let mfrl = i16::from_le_bytes([bytes[4], bytes[5]]);
        let mfbwb = i32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
        let mfbwp = i16::from_le_bytes([bytes[10], bytes[11]]);
        let base = i16::from_le_bytes([bytes[12], bytes[13]]);
        let nvf = i16::from_le_bytes([bytes[14], bytes[15]]);
        let status = i16::from_le_bytes([bytes[16], bytes[17]]);

        let corrupt = |reason: String| SourceError::CorruptRecord {
            mfn: mfn.max(0) as u32,
            reason,
        };

        if mfn <= 0 {
            return Err(corrupt(format!("invalid MFN {mfn} in leader")).into());
        }
        if nvf < 0 || base < 0 || mfbwp < 0 {
            return Err(corrupt(format!("negative leader field (base {base}, nvf {nvf})")).into());
        }
        let status = match status {
            0 => RecordStatus::Active,
            1 => RecordStatus::LogicallyDeleted,
            other => return Err(corrupt(format!("unknown status {other}")).into()),
        };

        Ok(Self {
            mfn: mfn as u32,
            mfrl: mfrl.unsigned_abs(),
            mfbwb,
            mfbwp: mfbwp as u16,
            base: base as u16,
            nvf: nvf as u16,
            status,
        })
    }

    /// Serialize back to the on-disk layout
    pub fn to_bytes(&self) -> [u8; LEADER_SIZE] {
        let mut out = [0u8; LEADER_SIZE];
        out[0..4].copy_from_slice(&(self.mfn as i32).to_le_bytes());
        out[4..6].copy_from_slice(&(self.mfrl as i16).to_le_bytes());
        out[6..10].copy_from_slice(&self.mfbwb.to_le_bytes());
        out[10..12].copy_from_slice(&(self.mfbwp as i16).to_le_bytes());
        out[12..14].copy_from_slice(&(self.base as i16).to_le_bytes());
        out[14..16].copy_from_slice(&(self.nvf as i16).to_le_bytes());
        let status: i16 = match self.status {
            RecordStatus::Active => 0,
            RecordStatus::LogicallyDeleted => 1,
        };
        out[16..18].copy_from_slice(&status.to_le_bytes());
        out
    }
}

/// One occurrence of a field, bytes still in the master file's encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsisField {
    pub tag: u32,
    pub data: Vec<u8>,
}

/// Decoded record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IsisRecord {
    pub mfn: u32,
    pub status: RecordStatus,
    /// Field occurrences in directory order
    pub fields: Vec<IsisField>,
}

impl IsisRecord {
    /// Parse a complete record (`mfrl` bytes starting at the leader)
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let leader = Leader::parse(bytes)?;
        let corrupt = |reason: String| SourceError::CorruptRecord {
            mfn: leader.mfn,
            reason,
        };

        let length = usize::from(leader.mfrl);
        let base = usize::from(leader.base);
        let nvf = usize::from(leader.nvf);

        if length > bytes.len() {
            return Err(corrupt(format!(
                "record length {length} exceeds the {} bytes available",
                bytes.len()
            ))
            .into());
        }
        if base != LEADER_SIZE + nvf * DIRECTORY_ENTRY_SIZE || base > length {
            return Err(corrupt(format!("base {base} does not match {nvf} directory entries")).into());
        }

        let area = &bytes[base..length];
        let mut fields = Vec::with_capacity(nvf);
        for entry in bytes[LEADER_SIZE..base].chunks_exact(DIRECTORY_ENTRY_SIZE) {
            let tag = u16::from_le_bytes([entry[0], entry[1]]);
            let pos = usize::from(u16::from_le_bytes([entry[2], entry[3]]));
            let len = usize::from(u16::from_le_bytes([entry[4], entry[5]]));

            let data = area.get(pos..pos + len).ok_or_else(|| {
                corrupt(format!(
                    "field {tag} at {pos}+{len} lies outside the {} byte field area",
                    area.len()
                ))
            })?;

            fields.push(IsisField {
                tag: u32::from(tag),
                data: data.to_vec(),
            });
        }

        Ok(Self {
            mfn: leader.mfn,
            status: leader.status,
            fields,
        })
    }

    /// Serialize to the on-disk layout, padded to an even length
    pub fn to_bytes(&self) -> Vec<u8> {
        let nvf = self.fields.len();
        let base = LEADER_SIZE + nvf * DIRECTORY_ENTRY_SIZE;

        let mut directory = Vec::with_capacity(nvf * DIRECTORY_ENTRY_SIZE);
        let mut area = Vec::new();
        for field in &self.fields {
            directory.extend_from_slice(&(field.tag as u16).to_le_bytes());
            directory.extend_from_slice(&(area.len() as u16).to_le_bytes());
            directory.extend_from_slice(&(field.data.len() as u16).to_le_bytes());
            area.extend_from_slice(&field.data);
        }

        let mut length = base + area.len();
        if length % 2 == 1 {
            area.push(b' ');
            length += 1;
        }

        let leader = Leader {
            mfn: self.mfn,
            mfrl: length as u16,
            mfbwb: 0,
            mfbwp: 0,
            base: base as u16,
            nvf: nvf as u16,
            status: self.status,
        };

        let mut out = Vec::with_capacity(length);
        out.extend_from_slice(&leader.to_bytes());
        out.extend_from_slice(&directory);
        out.extend_from_slice(&area);
        out
    }
}
