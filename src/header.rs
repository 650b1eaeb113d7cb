//! Fixed framing primitives at the front of every archive.
//!
//! ```text
//! ┌──────────────┬────────────────┬────────────────────────┬────────────┐
//! │ magic (4 LE) │ Header (BSON)  │ CollectionMetadata × N │ terminator │
//! └──────────────┴────────────────┴────────────────────────┴────────────┘
//! ```
//!
//! Everything after the terminator belongs to the interleaved data-block
//! phase and is not interpreted here.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::error::{ArchiveError, Result};

/// Identifies a stream as a dump archive. Stored little-endian.
pub const MAGIC_NUMBER: u32 = 0x8199_e26d;

/// Format version written into every new [`Header`].
pub const ARCHIVE_FORMAT_VERSION: &str = "0.1";

/// End-of-section marker: an int32 `-1` where a BSON length would be.
pub const TERMINATOR: i32 = -1;
pub const TERMINATOR_BYTES: [u8; 4] = [0xFF; 4];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    #[serde(rename = "version")]
    pub format_version: String,
    /// Advisory only: how many collections the writer streams in parallel.
    #[serde(rename = "concurrent_collections")]
    pub concurrent_collections: i32,
}

impl Header {
    pub fn new(concurrent_collections: i32) -> Self {
        Self {
            format_version: ARCHIVE_FORMAT_VERSION.to_owned(),
            concurrent_collections,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bson::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bson::from_slice(bytes)?)
    }
}

impl Default for Header {
    fn default() -> Self {
        Self::new(1)
    }
}

pub fn write_magic<W: Write>(mut writer: W) -> Result<()> {
    writer.write_u32::<LittleEndian>(MAGIC_NUMBER)?;
    Ok(())
}

/// Consumes exactly four bytes. Nothing further is read on a mismatch.
pub fn read_magic<R: Read>(mut reader: R) -> Result<()> {
    let found = reader.read_u32::<LittleEndian>()?;
    if found != MAGIC_NUMBER {
        return Err(ArchiveError::FormatMismatch { found });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn magic_is_little_endian() {
        let mut buf = Vec::new();
        write_magic(&mut buf).unwrap();
        assert_eq!(buf, [0x6d, 0xe2, 0x99, 0x81]);
    }

    #[test]
    fn wrong_magic_reads_only_four_bytes() {
        let mut cur = Cursor::new(b"PK\x03\x04rest".to_vec());
        let err = read_magic(&mut cur).unwrap_err();
        assert!(matches!(err, ArchiveError::FormatMismatch { found: 0x0403_4b50 }));
        assert_eq!(cur.position(), 4);
    }

    #[test]
    fn short_stream_is_io_error() {
        let err = read_magic(Cursor::new(vec![0x6d, 0xe2])).unwrap_err();
        assert!(matches!(err, ArchiveError::Io(_)));
    }

    #[test]
    fn header_uses_wire_field_names() {
        let doc = bson::to_document(&Header::new(4)).unwrap();
        assert_eq!(doc.get_str("version").unwrap(), ARCHIVE_FORMAT_VERSION);
        assert_eq!(doc.get_i32("concurrent_collections").unwrap(), 4);
    }

    #[test]
    fn terminator_bytes_match_int32() {
        assert_eq!(TERMINATOR.to_le_bytes(), TERMINATOR_BYTES);
    }
}
