//! Namespace intents and the tree walk that discovers them.

use std::collections::HashMap;
use std::fmt;
use std::io::Read;
use std::path::PathBuf;
use tracing::{debug, warn};

use crate::dirlike::DirLike;
use crate::error::Result;
use crate::explorer::{BSON_SUFFIX, METADATA_SUFFIX};
use crate::files::MetadataBuffer;
use crate::metadata::namespace;

pub const OPLOG_COLLECTION: &str = "oplog";

/// A readable file attached to an intent that is only held open while in use.
pub trait IntentFile: Read + Send {
    fn open(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;

    /// Set for buffers whose content is already resident in memory. The
    /// prelude can only be built from these.
    fn as_metadata_buffer(&self) -> Option<&MetadataBuffer> {
        None
    }
}

/// One namespace to dump or restore.
pub struct Intent {
    pub db: String,
    pub collection: String,
    pub bson_path: Option<PathBuf>,
    pub metadata_path: Option<PathBuf>,
    pub size: i64,
    pub metadata_file: Option<Box<dyn IntentFile>>,
}

impl Intent {
    pub fn new(db: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            db: db.into(),
            collection: collection.into(),
            bson_path: None,
            metadata_path: None,
            size: 0,
            metadata_file: None,
        }
    }

    pub fn namespace(&self) -> String {
        namespace(&self.db, &self.collection)
    }

    pub fn is_oplog(&self) -> bool {
        self.db.is_empty() && self.collection == OPLOG_COLLECTION
    }

    fn merge(&mut self, other: Intent) {
        if other.bson_path.is_some() {
            self.bson_path = other.bson_path;
            self.size = other.size;
        }
        if other.metadata_path.is_some() {
            self.metadata_path = other.metadata_path;
        }
        if other.metadata_file.is_some() {
            self.metadata_file = other.metadata_file;
        }
    }
}

impl fmt::Debug for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Intent")
            .field("db", &self.db)
            .field("collection", &self.collection)
            .field("bson_path", &self.bson_path)
            .field("metadata_path", &self.metadata_path)
            .field("size", &self.size)
            .field("metadata_file", &self.metadata_file.is_some())
            .finish()
    }
}

/// Intents in discovery order, one per namespace.
#[derive(Debug, Default)]
pub struct IntentManager {
    intents: Vec<Intent>,
    by_namespace: HashMap<String, usize>,
}

impl IntentManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an intent, merging it into an existing one for the same namespace.
    pub fn put(&mut self, intent: Intent) {
        let ns = intent.namespace();
        match self.by_namespace.get(&ns) {
            Some(&i) => self.intents[i].merge(intent),
            None => {
                self.by_namespace.insert(ns, self.intents.len());
                self.intents.push(intent);
            }
        }
    }

    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn intents_mut(&mut self) -> &mut [Intent] {
        &mut self.intents
    }

    pub fn get(&self, namespace: &str) -> Option<&Intent> {
        self.by_namespace.get(namespace).map(|&i| &self.intents[i])
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }
}

enum DumpFile {
    Data(String),
    Metadata(String),
}

fn classify(name: &str) -> Option<DumpFile> {
    if let Some(c) = name.strip_suffix(METADATA_SUFFIX) {
        Some(DumpFile::Metadata(c.to_owned()))
    } else {
        name.strip_suffix(BSON_SUFFIX).map(|c| DumpFile::Data(c.to_owned()))
    }
}

fn intent_for<D: DirLike>(db: &str, entry: &D) -> Option<Intent> {
    let (collection, is_metadata) = match classify(&entry.name())? {
        DumpFile::Data(c) => (c, false),
        DumpFile::Metadata(c) => (c, true),
    };
    if collection.is_empty() {
        return None;
    }

    let mut intent = Intent::new(db, collection);
    if is_metadata {
        intent.metadata_path = Some(entry.path());
    } else {
        intent.bson_path = Some(entry.path());
        intent.size = entry.size();
    }
    Some(intent)
}

/// Builds intents from a dump tree, which may be a real directory or an
/// archive's virtual one. Only `oplog` is accepted at the top level.
pub fn create_intents<D: DirLike>(root: &D) -> Result<IntentManager> {
    let mut manager = IntentManager::new();
    for entry in root.read_dir()? {
        if entry.is_dir() {
            create_intents_for_db(&mut manager, &entry)?;
            continue;
        }
        match intent_for("", &entry) {
            Some(intent) if intent.is_oplog() => manager.put(intent),
            _ => warn!(path = %entry.path().display(), "skipping unexpected top-level file"),
        }
    }
    debug!(intents = manager.len(), "created intents from dump tree");
    Ok(manager)
}

fn create_intents_for_db<D: DirLike>(manager: &mut IntentManager, dir: &D) -> Result<()> {
    let db = dir.name();
    for entry in dir.read_dir()? {
        if entry.is_dir() {
            warn!(path = %entry.path().display(), "skipping nested directory");
            continue;
        }
        match intent_for(&db, &entry) {
            Some(intent) => manager.put(intent),
            None => warn!(path = %entry.path().display(), "skipping file without a dump extension"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_merges_by_namespace() {
        let mut mgr = IntentManager::new();
        let mut data = Intent::new("db1", "c1");
        data.bson_path = Some(PathBuf::from("db1/c1.bson"));
        data.size = 9;
        let mut meta = Intent::new("db1", "c1");
        meta.metadata_path = Some(PathBuf::from("db1/c1.metadata.json"));

        mgr.put(meta);
        mgr.put(data);
        mgr.put(Intent::new("db1", "c2"));

        assert_eq!(mgr.len(), 2);
        let c1 = mgr.get("db1.c1").unwrap();
        assert_eq!(c1.bson_path.as_deref(), Some(std::path::Path::new("db1/c1.bson")));
        assert_eq!(c1.metadata_path.as_deref(), Some(std::path::Path::new("db1/c1.metadata.json")));
        assert_eq!(c1.size, 9);
    }

    #[test]
    fn classify_prefers_metadata_suffix() {
        assert!(matches!(classify("c.metadata.json"), Some(DumpFile::Metadata(c)) if c == "c"));
        assert!(matches!(classify("a.b.bson"), Some(DumpFile::Data(c)) if c == "a.b"));
        assert!(classify("notes.txt").is_none());
    }

    #[test]
    fn oplog_intent() {
        assert!(Intent::new("", "oplog").is_oplog());
        assert!(!Intent::new("local", "oplog").is_oplog());
        assert_eq!(Intent::new("", "oplog").namespace(), "oplog");
    }
}
