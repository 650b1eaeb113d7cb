//! High-level [`Archive`] API — the primary embedding surface.
//!
//! ```no_run
//! use dumparchive::archive::{pack_dump_dir, Archive, PackOptions};
//! use std::fs::File;
//!
//! // Write the prelude for a dump directory
//! pack_dump_dir("dump", File::create("dump.archive")?, &PackOptions::default())?;
//!
//! // Read it back and browse it like the directory it came from
//! let ar = Archive::open("dump.archive")?;
//! for entry in ar.list()? {
//!     println!("{} {}", entry.path.display(), entry.size);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::dirlike::{DirLike, FsDir};
use crate::error::Result;
use crate::explorer::PreludeExplorer;
use crate::files::{FsFile, MetadataBuffer};
use crate::header::Header;
use crate::intents::{create_intents, IntentFile, IntentManager};
use crate::prelude::Prelude;

// ── PackOptions ───────────────────────────────────────────────────────────────

/// Configuration for [`pack_dump_dir`].
#[derive(Debug, Clone)]
pub struct PackOptions {
    /// Recorded in the header for the data phase; not enforced here.
    pub concurrent_collections: i32,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self { concurrent_collections: 1 }
    }
}

// ── EntryInfo ─────────────────────────────────────────────────────────────────

/// Lightweight descriptor returned by [`Archive::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub path:   PathBuf,
    pub size:   i64,
    pub is_dir: bool,
}

impl EntryInfo {
    pub fn of<D: DirLike>(d: &D) -> Self {
        EntryInfo { path: d.path(), size: d.size(), is_dir: d.is_dir() }
    }
}

/// Depth-first listing in `read_dir` order, excluding the root.
pub fn walk<D: DirLike>(root: &D) -> Result<Vec<EntryInfo>> {
    let mut out = Vec::new();
    for child in root.read_dir()? {
        out.push(EntryInfo::of(&child));
        if child.is_dir() {
            out.extend(walk(&child)?);
        }
    }
    Ok(out)
}

// ── Pack ──────────────────────────────────────────────────────────────────────

/// Builds the prelude for a dump directory and writes it to `writer`.
///
/// Metadata files are read into memory up front; data files are only sized.
pub fn pack_dump_dir<P: AsRef<Path>, W: Write>(
    dir:    P,
    writer: W,
    opts:   &PackOptions,
) -> Result<Prelude> {
    let root = FsDir::new(dir.as_ref());
    let mut manager = create_intents(&root)?;

    for intent in manager.intents_mut() {
        if let Some(rel) = &intent.metadata_path {
            let mut file = FsFile::new(root.full_path().join(rel));
            file.open()?;
            let mut text = String::new();
            file.read_to_string(&mut text)?;
            file.close()?;
            intent.metadata_file = Some(Box::new(MetadataBuffer::new(text)));
        }
    }

    let prelude = Prelude::from_intents(&manager, opts.concurrent_collections)?;
    prelude.write(writer)?;
    info!(dir = %dir.as_ref().display(), namespaces = prelude.len(), "packed dump directory");
    Ok(prelude)
}

// ── Archive ───────────────────────────────────────────────────────────────────

pub struct Archive {
    prelude: Arc<Prelude>,
}

impl Archive {
    pub fn read<R: Read>(reader: R) -> Result<Self> {
        Ok(Self { prelude: Arc::new(Prelude::read(reader)?) })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::read(BufReader::new(File::open(path)?))
    }

    pub fn prelude(&self) -> &Arc<Prelude> {
        &self.prelude
    }

    pub fn header(&self) -> &Header {
        self.prelude.header()
    }

    pub fn explorer(&self) -> PreludeExplorer {
        self.prelude.explorer()
    }

    pub fn list(&self) -> Result<Vec<EntryInfo>> {
        walk(&self.explorer())
    }

    /// The metadata text of one namespace.
    pub fn metadata(&self, database: &str, collection: &str) -> Result<String> {
        let mut file = self.prelude.metadata_file(database, collection);
        file.open()?;
        let mut text = String::new();
        file.read_to_string(&mut text)?;
        file.close()?;
        Ok(text)
    }

    /// Restore intents discovered from the virtual tree, with metadata files
    /// served from the prelude.
    pub fn intents(&self) -> Result<IntentManager> {
        let mut manager = create_intents(&self.explorer())?;
        for intent in manager.intents_mut() {
            if intent.metadata_path.is_some() {
                intent.metadata_file =
                    Some(Box::new(self.prelude.metadata_file(&intent.db, &intent.collection)));
            }
        }
        Ok(manager)
    }
}
