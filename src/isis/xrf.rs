//! Cross-reference (`.xrf`) file decoding
//!
//! The `.xrf` file maps every MFN to the position of the current version of
//! its record in the `.mst` file. It is a sequence of 512-byte blocks, each
//! holding a 4-byte block position followed by 127 4-byte pointers.

use std::io::{Read, Seek, SeekFrom};

use crate::error::Result;

/// Size of every `.xrf` and `.mst` block
pub const BLOCK_SIZE: u64 = 512;

/// Pointers per `.xrf` block
pub const POINTERS_PER_BLOCK: u32 = 127;

const BLOCK_FACTOR: i32 = 2048;
const OFFSET_MASK: i32 = 0x1FF;

/// Decoded cross-reference entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrfPointer {
    /// Record is live at this `.mst` block (1-based) and offset
    Active { block: u32, offset: u16 },
    /// Record is flagged deleted; its last version is still at this position
    LogicallyDeleted { block: u32, offset: u16 },
    /// MFN was never assigned or its record was purged
    Absent,
}

impl XrfPointer {
    /// Decode a raw pointer, `block * 2048 + offset`, where the low 9 bits of
    /// the remainder are the offset and bits 9-10 carry update flags.
    pub fn decode(raw: i32) -> Self {
        let block = raw >> 11;
        let offset = ((raw & (BLOCK_FACTOR - 1)) & OFFSET_MASK) as u16;

        match block {
            0 => XrfPointer::Absent,
            -1 if offset == 0 => XrfPointer::Absent,
            b if b < 0 => XrfPointer::LogicallyDeleted {
                block: b.unsigned_abs(),
                offset,
            },
            b => XrfPointer::Active {
                block: b as u32,
                offset,
            },
        }
    }

    /// Encode an active or deleted position, the inverse of [`XrfPointer::decode`]
    pub fn encode(&self) -> i32 {
        match *self {
            XrfPointer::Active { block, offset } => block as i32 * BLOCK_FACTOR + offset as i32,
            XrfPointer::LogicallyDeleted { block, offset } => {
                -(block as i32) * BLOCK_FACTOR + offset as i32
            }
            XrfPointer::Absent => 0,
        }
    }

    /// Byte position of the record in the `.mst` file
    pub fn mst_position(&self) -> Option<u64> {
        match *self {
            XrfPointer::Active { block, offset } | XrfPointer::LogicallyDeleted { block, offset } => {
                Some((u64::from(block) - 1) * BLOCK_SIZE + u64::from(offset))
            }
            XrfPointer::Absent => None,
        }
    }
}

/// Random-access reader over an `.xrf` stream
#[derive(Debug)]
pub struct XrfReader<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> XrfReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self { inner, len })
    }

    /// Look up `mfn`; MFNs past the end of the file are absent
    pub fn pointer(&mut self, mfn: u32) -> Result<XrfPointer> {
        if mfn == 0 {
            return Ok(XrfPointer::Absent);
        }

        let index = mfn - 1;
        let block = u64::from(index / POINTERS_PER_BLOCK);
        let slot = u64::from(index % POINTERS_PER_BLOCK);
        let position = block * BLOCK_SIZE + 4 + slot * 4;
        if position + 4 > self.len {
            return Ok(XrfPointer::Absent);
        }

        let mut raw = [0u8; 4];
        self.inner.seek(SeekFrom::Start(position))?;
        self.inner.read_exact(&mut raw)?;
        Ok(XrfPointer::decode(i32::from_le_bytes(raw)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_decode_active() {
        assert_eq!(
            XrfPointer::decode(2 * 2048 + 64),
            XrfPointer::Active { block: 2, offset: 64 }
        );
    }

    #[test]
    fn test_decode_ignores_update_flags() {
        // bit 10 marks a new record, bit 9 a modified one
        assert_eq!(
            XrfPointer::decode(2048 + 1024 + 64),
            XrfPointer::Active { block: 1, offset: 64 }
        );
        assert_eq!(
            XrfPointer::decode(3 * 2048 + 512 + 100),
            XrfPointer::Active { block: 3, offset: 100 }
        );
    }

    #[test]
    fn test_decode_logically_deleted() {
        assert_eq!(
            XrfPointer::decode(-3 * 2048 + 64),
            XrfPointer::LogicallyDeleted { block: 3, offset: 64 }
        );
    }

    #[test]
    fn test_decode_absent() {
        assert_eq!(XrfPointer::decode(0), XrfPointer::Absent);
        assert_eq!(XrfPointer::decode(-2048), XrfPointer::Absent);
    }

    #[test]
    fn test_encode_inverts_decode() {
        let deleted = XrfPointer::LogicallyDeleted { block: 7, offset: 300 };
        assert_eq!(XrfPointer::decode(deleted.encode()), deleted);
    }

    #[test]
    fn test_mst_position() {
        let ptr = XrfPointer::Active { block: 2, offset: 10 };
        assert_eq!(ptr.mst_position(), Some(522));
        assert_eq!(XrfPointer::Absent.mst_position(), None);
    }

    #[test]
    fn test_reader_crosses_blocks() {
        let mut bytes = vec![0u8; 2 * BLOCK_SIZE as usize];
        bytes[0..4].copy_from_slice(&1i32.to_le_bytes());
        bytes[512..516].copy_from_slice(&(-2i32).to_le_bytes());
        // MFN 128 is the first slot of the second block
        let raw = XrfPointer::Active { block: 5, offset: 8 }.encode();
        bytes[516..520].copy_from_slice(&raw.to_le_bytes());

        let mut reader = XrfReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(
            reader.pointer(128).unwrap(),
            XrfPointer::Active { block: 5, offset: 8 }
        );
        assert_eq!(reader.pointer(1).unwrap(), XrfPointer::Absent);
        assert_eq!(reader.pointer(10_000).unwrap(), XrfPointer::Absent);
    }
}
