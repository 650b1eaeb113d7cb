use byteorder::{ByteOrder, LittleEndian};
use std::io::{self, Read, Write};
use tracing::debug;

use crate::error::{ArchiveError, Result};
use crate::header::{TERMINATOR, TERMINATOR_BYTES};

/// Smallest legal BSON document: length slot plus trailing NUL.
pub const MIN_BSON_SIZE: i32 = 5;
/// Server document limit plus headroom for the command envelope.
pub const MAX_BSON_SIZE: i32 = 16 * 1024 * 1024 + 16 * 1024;

/// One framed unit of a block sequence. Payloads are complete BSON documents,
/// length slot included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Header(Vec<u8>),
    Body(Vec<u8>),
    End,
}

/// Splits a byte stream into a header block, body blocks and the terminator.
///
/// The parser never reads past the terminator, so the wrapped reader is left
/// positioned at the first byte of whatever follows the sequence.
pub struct BlockParser<R: Read> {
    reader: R,
    seen_header: bool,
    ended: bool,
}

impl<R: Read> BlockParser<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, seen_header: false, ended: false }
    }

    pub fn next_block(&mut self) -> Result<Block> {
        if self.ended {
            return Ok(Block::End);
        }

        let mut slot = [0u8; 4];
        match read_slot(&mut self.reader, &mut slot)? {
            0 => return Err(ArchiveError::TruncatedPrelude),
            4 => {}
            _ => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
        }

        let size = LittleEndian::read_i32(&slot);
        if size == TERMINATOR {
            if !self.seen_header {
                return Err(ArchiveError::MissingHeader);
            }
            debug!("block sequence terminator");
            self.ended = true;
            return Ok(Block::End);
        }
        if !(MIN_BSON_SIZE..=MAX_BSON_SIZE).contains(&size) {
            return Err(ArchiveError::InvalidBlockSize(size));
        }

        let mut doc = vec![0u8; size as usize];
        doc[..4].copy_from_slice(&slot);
        self.reader.read_exact(&mut doc[4..])?;

        if self.seen_header {
            debug!(size, "body block");
            Ok(Block::Body(doc))
        } else {
            debug!(size, "header block");
            self.seen_header = true;
            Ok(Block::Header(doc))
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

pub fn write_terminator<W: Write>(mut writer: W) -> Result<()> {
    writer.write_all(&TERMINATOR_BYTES)?;
    Ok(())
}

/// Like `read_exact`, but reports how many bytes arrived before EOF so a clean
/// end of stream can be told apart from a torn length slot.
fn read_slot<R: Read>(reader: &mut R, buf: &mut [u8; 4]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use std::io::Cursor;

    fn stream(docs: &[bson::Document], trailer: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        for d in docs {
            out.extend(bson::to_vec(d).unwrap());
        }
        write_terminator(&mut out).unwrap();
        out.extend_from_slice(trailer);
        out
    }

    #[test]
    fn header_then_bodies_then_end() {
        let bytes = stream(&[doc! {"h": 1}, doc! {"b": 1}, doc! {"b": 2}], b"");
        let mut p = BlockParser::new(Cursor::new(bytes));
        assert!(matches!(p.next_block().unwrap(), Block::Header(_)));
        assert!(matches!(p.next_block().unwrap(), Block::Body(_)));
        match p.next_block().unwrap() {
            Block::Body(b) => {
                let d: bson::Document = bson::from_slice(&b).unwrap();
                assert_eq!(d.get_i32("b").unwrap(), 2);
            }
            other => panic!("expected body, got {other:?}"),
        }
        assert_eq!(p.next_block().unwrap(), Block::End);
    }

    #[test]
    fn end_is_sticky_and_stops_at_terminator() {
        let bytes = stream(&[doc! {"h": 1}], b"DATA");
        let mut p = BlockParser::new(Cursor::new(bytes));
        p.next_block().unwrap();
        assert_eq!(p.next_block().unwrap(), Block::End);
        assert_eq!(p.next_block().unwrap(), Block::End);

        let mut rest = Vec::new();
        p.into_inner().read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"DATA");
    }

    #[test]
    fn terminator_before_header_is_rejected() {
        let mut bytes = Vec::new();
        write_terminator(&mut bytes).unwrap();
        let mut p = BlockParser::new(Cursor::new(bytes));
        assert!(matches!(p.next_block(), Err(ArchiveError::MissingHeader)));
    }

    #[test]
    fn clean_eof_without_terminator() {
        let bytes = bson::to_vec(&doc! {"h": 1}).unwrap();
        let mut p = BlockParser::new(Cursor::new(bytes));
        p.next_block().unwrap();
        assert!(matches!(p.next_block(), Err(ArchiveError::TruncatedPrelude)));
    }

    #[test]
    fn torn_document_is_io_error() {
        let mut bytes = bson::to_vec(&doc! {"h": "header"}).unwrap();
        bytes.truncate(bytes.len() - 3);
        let mut p = BlockParser::new(Cursor::new(bytes));
        assert!(matches!(p.next_block(), Err(ArchiveError::Io(_))));
    }

    #[test]
    fn rejects_implausible_sizes() {
        for size in [0i32, 4, MAX_BSON_SIZE + 1, -2] {
            let mut p = BlockParser::new(Cursor::new(size.to_le_bytes().to_vec()));
            assert!(matches!(p.next_block(), Err(ArchiveError::InvalidBlockSize(s)) if s == size));
        }
    }
}
