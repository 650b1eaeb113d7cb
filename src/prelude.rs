//! The prelude: header plus per-namespace metadata at the front of an archive.
//!
//! Records live in one insertion-ordered vector. The per-database view is a
//! map of indices into that vector, so both views always describe the same
//! records; [`Prelude::add_metadata`] is the only way to extend them.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::sync::Arc;
use tracing::{debug, info};

use crate::block::{write_terminator, Block, BlockParser};
use crate::error::{ArchiveError, Result};
use crate::explorer::PreludeExplorer;
use crate::files::MetadataPreludeFile;
use crate::header::{read_magic, write_magic, Header};
use crate::intents::IntentManager;
use crate::metadata::CollectionMetadata;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Prelude {
    header: Header,
    databases: Vec<String>,
    namespaces: Vec<CollectionMetadata>,
    by_database: HashMap<String, Vec<usize>>,
}

impl Prelude {
    pub fn new(header: Header) -> Self {
        Self { header, ..Default::default() }
    }

    /// Builds the prelude for a dump from its intents, in intent order.
    pub fn from_intents(manager: &IntentManager, concurrent_collections: i32) -> Result<Self> {
        let mut prelude = Self::new(Header::new(concurrent_collections));
        for intent in manager.intents() {
            let metadata = match &intent.metadata_file {
                None => String::new(),
                Some(file) => file
                    .as_metadata_buffer()
                    .ok_or_else(|| ArchiveError::UnexpectedMetadataFile {
                        namespace: intent.namespace(),
                    })?
                    .contents()
                    .to_owned(),
            };
            prelude.add_metadata(
                CollectionMetadata::new(&intent.db, &intent.collection)
                    .with_metadata(metadata)
                    .with_size(intent.size),
            );
        }
        Ok(prelude)
    }

    /// Checks the magic number, then consumes blocks up to and including the
    /// terminator. The reader is left at the start of the data-block phase.
    pub fn read<R: Read>(mut reader: R) -> Result<Self> {
        read_magic(&mut reader)?;

        let mut prelude = Self::default();
        let mut parser = BlockParser::new(&mut reader);
        loop {
            match parser.next_block()? {
                Block::Header(bytes) => prelude.header = Header::from_bytes(&bytes)?,
                Block::Body(bytes) => prelude.add_metadata(CollectionMetadata::from_bytes(&bytes)?),
                Block::End => break,
            }
        }

        debug!(
            version = %prelude.header.format_version,
            namespaces = prelude.namespaces.len(),
            "read archive prelude"
        );
        Ok(prelude)
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<()> {
        write_magic(&mut writer)?;
        writer.write_all(&self.header.to_bytes()?)?;
        for cm in &self.namespaces {
            writer.write_all(&cm.to_bytes()?)?;
        }
        write_terminator(&mut writer)?;

        debug!(namespaces = self.namespaces.len(), "wrote archive prelude");
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }

    pub fn add_metadata(&mut self, cm: CollectionMetadata) {
        info!(db = %cm.database, collection = %cm.collection, "archive prelude");

        let index = self.namespaces.len();
        match self.by_database.get_mut(&cm.database) {
            Some(group) => group.push(index),
            None => {
                self.databases.push(cm.database.clone());
                self.by_database.insert(cm.database.clone(), vec![index]);
            }
        }
        self.namespaces.push(cm);
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Distinct database names in first-seen order. Includes `""` when
    /// top-level namespaces are present.
    pub fn databases(&self) -> &[String] {
        &self.databases
    }

    pub fn namespaces(&self) -> &[CollectionMetadata] {
        &self.namespaces
    }

    /// Records of one database in stored order, or `None` for an unknown name.
    pub fn namespaces_in<'a>(
        &'a self,
        database: &str,
    ) -> Option<impl Iterator<Item = &'a CollectionMetadata> + 'a> {
        self.by_database
            .get(database)
            .map(move |group| group.iter().map(move |&i| &self.namespaces[i]))
    }

    pub fn find(&self, database: &str, collection: &str) -> Option<&CollectionMetadata> {
        self.namespaces
            .iter()
            .find(|cm| cm.database == database && cm.collection == collection)
    }

    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Root of the virtual dump tree.
    pub fn explorer(self: &Arc<Self>) -> PreludeExplorer {
        PreludeExplorer::root(Arc::clone(self))
    }

    pub fn metadata_file(self: &Arc<Self>, database: &str, collection: &str) -> MetadataPreludeFile {
        MetadataPreludeFile::new(Arc::clone(self), database, collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::{FsFile, MetadataBuffer};
    use crate::intents::Intent;
    use std::io::Cursor;

    fn sample() -> Prelude {
        let mut p = Prelude::new(Header::new(4));
        p.add_metadata(CollectionMetadata::new("db1", "c1").with_metadata("{\"indexes\":[]}").with_size(10));
        p.add_metadata(CollectionMetadata::new("db2", "x"));
        p.add_metadata(CollectionMetadata::new("db1", "c2").with_size(3));
        p.add_metadata(CollectionMetadata::new("", "oplog"));
        p
    }

    #[test]
    fn by_database_view_tracks_flat_order() {
        let p = sample();
        assert_eq!(p.databases(), ["db1", "db2", ""]);
        let db1: Vec<_> = p.namespaces_in("db1").unwrap().map(|cm| cm.collection.as_str()).collect();
        assert_eq!(db1, ["c1", "c2"]);
        assert!(p.namespaces_in("nope").is_none());
        assert_eq!(p.len(), 4);
    }

    #[test]
    fn write_then_read_round_trips() {
        let p = sample();
        let bytes = p.to_bytes().unwrap();
        let back = Prelude::read(Cursor::new(bytes)).unwrap();
        assert_eq!(back, p);
        assert_eq!(back.header().concurrent_collections, 4);
    }

    #[test]
    fn read_leaves_reader_after_terminator() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes.extend_from_slice(b"payload");
        let mut cur = Cursor::new(bytes);
        Prelude::read(&mut cur).unwrap();
        let mut rest = Vec::new();
        cur.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"payload");
    }

    #[test]
    fn empty_prelude_round_trips() {
        let p = Prelude::new(Header::new(2));
        let back = Prelude::read(Cursor::new(p.to_bytes().unwrap())).unwrap();
        assert!(back.is_empty());
        assert_eq!(back.header(), p.header());
    }

    #[test]
    fn bad_magic_is_format_mismatch() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[0] ^= 0xFF;
        let mut cur = Cursor::new(bytes);
        assert!(matches!(Prelude::read(&mut cur), Err(ArchiveError::FormatMismatch { .. })));
        assert_eq!(cur.position(), 4);
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let mut bytes = Vec::new();
        write_magic(&mut bytes).unwrap();
        bytes.extend(Header::default().to_bytes().unwrap());
        bytes.extend(bson::to_vec(&bson::doc! {"db": 7}).unwrap());
        write_terminator(&mut bytes).unwrap();
        assert!(matches!(Prelude::read(Cursor::new(bytes)), Err(ArchiveError::Decode(_))));
    }

    #[test]
    fn headerless_stream_is_rejected() {
        let mut bytes = Vec::new();
        write_magic(&mut bytes).unwrap();
        write_terminator(&mut bytes).unwrap();
        assert!(matches!(Prelude::read(Cursor::new(bytes)), Err(ArchiveError::MissingHeader)));
    }

    #[test]
    fn malformed_header_is_decode_error() {
        let headers = [
            bson::doc! {"version": 7, "concurrent_collections": 1},
            bson::doc! {"version": "0.1"},
        ];
        for header in headers {
            let mut bytes = Vec::new();
            write_magic(&mut bytes).unwrap();
            bytes.extend(bson::to_vec(&header).unwrap());
            write_terminator(&mut bytes).unwrap();
            assert!(matches!(Prelude::read(Cursor::new(bytes)), Err(ArchiveError::Decode(_))));
        }
    }

    #[test]
    fn missing_terminator_is_truncated() {
        let p = sample();
        let mut bytes = p.to_bytes().unwrap();
        bytes.truncate(bytes.len() - 4);
        assert!(matches!(Prelude::read(Cursor::new(bytes)), Err(ArchiveError::TruncatedPrelude)));
    }

    #[test]
    fn from_intents_copies_buffers_and_sizes() {
        let mut mgr = IntentManager::new();
        let mut with_meta = Intent::new("db1", "c1");
        with_meta.size = 42;
        with_meta.metadata_file = Some(Box::new(MetadataBuffer::new("{\"options\":{}}")));
        mgr.put(with_meta);
        mgr.put(Intent::new("db1", "c2"));

        let p = Prelude::from_intents(&mgr, 3).unwrap();
        assert_eq!(p.header(), &Header::new(3));
        assert_eq!(
            p.namespaces(),
            [
                CollectionMetadata::new("db1", "c1").with_metadata("{\"options\":{}}").with_size(42),
                CollectionMetadata::new("db1", "c2"),
            ]
        );
    }

    #[test]
    fn from_intents_rejects_foreign_metadata_files() {
        let mut mgr = IntentManager::new();
        let mut intent = Intent::new("db1", "c1");
        intent.metadata_file = Some(Box::new(FsFile::new("/nonexistent/c1.metadata.json")));
        mgr.put(intent);

        match Prelude::from_intents(&mgr, 1) {
            Err(ArchiveError::UnexpectedMetadataFile { namespace }) => assert_eq!(namespace, "db1.c1"),
            other => panic!("expected UnexpectedMetadataFile, got {other:?}"),
        }
    }
}
