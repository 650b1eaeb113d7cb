//! [`IntentFile`] implementations for metadata.

use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{ArchiveError, Result};
use crate::intents::IntentFile;
use crate::metadata::namespace;
use crate::prelude::Prelude;

fn not_open() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "metadata file is not open")
}

/// Metadata text already held in memory, as produced on the dump side.
#[derive(Debug, Clone)]
pub struct MetadataBuffer {
    content: Cursor<String>,
}

impl MetadataBuffer {
    pub fn new(content: impl Into<String>) -> Self {
        Self { content: Cursor::new(content.into()) }
    }

    pub fn contents(&self) -> &str {
        self.content.get_ref()
    }
}

impl Read for MetadataBuffer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.content.read(buf)
    }
}

impl IntentFile for MetadataBuffer {
    fn open(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }

    fn as_metadata_buffer(&self) -> Option<&MetadataBuffer> {
        Some(self)
    }
}

/// Metadata text of one namespace, looked up in a prelude when opened.
#[derive(Debug)]
pub struct MetadataPreludeFile {
    prelude: Arc<Prelude>,
    database: String,
    collection: String,
    buffer: Option<Cursor<String>>,
}

impl MetadataPreludeFile {
    pub fn new(prelude: Arc<Prelude>, database: &str, collection: &str) -> Self {
        Self {
            prelude,
            database: database.to_owned(),
            collection: collection.to_owned(),
            buffer: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.buffer.is_some()
    }

    fn no_such_file(&self) -> ArchiveError {
        ArchiveError::NoSuchFile { namespace: namespace(&self.database, &self.collection) }
    }
}

impl Read for MetadataPreludeFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.buffer.as_mut().ok_or_else(not_open)?.read(buf)
    }
}

impl IntentFile for MetadataPreludeFile {
    fn open(&mut self) -> Result<()> {
        if self.collection.is_empty() {
            return Err(self.no_such_file());
        }
        let text = self
            .prelude
            .namespaces_in(&self.database)
            .ok_or_else(|| self.no_such_file())?
            .find(|cm| cm.collection == self.collection)
            .map(|cm| cm.metadata.clone())
            .ok_or_else(|| self.no_such_file())?;
        self.buffer = Some(Cursor::new(text));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.buffer = None;
        Ok(())
    }
}

/// A metadata or data file inside a dump directory on disk.
#[derive(Debug)]
pub struct FsFile {
    path: PathBuf,
    file: Option<File>,
}

impl FsFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_owned(), file: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Read for FsFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.as_mut().ok_or_else(not_open)?.read(buf)
    }
}

impl IntentFile for FsFile {
    fn open(&mut self) -> Result<()> {
        self.file = Some(File::open(&self.path)?);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.file = None;
        Ok(())
    }
}
