use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::dirlike::DirLike;
use crate::error::{ArchiveError, Result};
use crate::metadata::CollectionMetadata;
use crate::prelude::Prelude;

pub const BSON_SUFFIX: &str = ".bson";
pub const METADATA_SUFFIX: &str = ".metadata.json";

/// A location in the virtual dump tree of an archive.
///
/// The tree has the same shape as a dump directory: one directory per
/// database holding `<coll>.bson` and `<coll>.metadata.json` entries, with
/// top-level namespaces (the oplog) directly under the root. Explorers are
/// keys into the shared [`Prelude`] and are re-resolved on every call.
#[derive(Debug, Clone)]
pub struct PreludeExplorer {
    prelude: Arc<Prelude>,
    database: String,
    collection: String,
    is_metadata: bool,
}

impl PreludeExplorer {
    pub fn root(prelude: Arc<Prelude>) -> Self {
        Self { prelude, database: String::new(), collection: String::new(), is_metadata: false }
    }

    fn at(&self, database: &str, collection: &str, is_metadata: bool) -> Self {
        Self {
            prelude: Arc::clone(&self.prelude),
            database: database.to_owned(),
            collection: collection.to_owned(),
            is_metadata,
        }
    }

    pub fn is_root(&self) -> bool {
        self.database.is_empty() && self.collection.is_empty()
    }

    /// Placeholder records without a collection would alias their own
    /// directory, so they produce no entries.
    fn push_namespace(&self, out: &mut Vec<Self>, cm: &CollectionMetadata) {
        if cm.collection.is_empty() {
            return;
        }
        out.push(self.at(&cm.database, &cm.collection, false));
        if !cm.metadata.is_empty() {
            out.push(self.at(&cm.database, &cm.collection, true));
        }
    }
}

impl PartialEq for PreludeExplorer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.prelude, &other.prelude)
            && self.database == other.database
            && self.collection == other.collection
            && self.is_metadata == other.is_metadata
    }
}

impl Eq for PreludeExplorer {}

impl DirLike for PreludeExplorer {
    fn name(&self) -> String {
        if self.collection.is_empty() {
            self.database.clone()
        } else if self.is_metadata {
            format!("{}{METADATA_SUFFIX}", self.collection)
        } else {
            format!("{}{BSON_SUFFIX}", self.collection)
        }
    }

    fn path(&self) -> PathBuf {
        if self.collection.is_empty() || self.database.is_empty() {
            PathBuf::from(self.name())
        } else {
            Path::new(&self.database).join(self.name())
        }
    }

    fn size(&self) -> i64 {
        if self.is_dir() || self.is_metadata {
            return 0;
        }
        self.prelude
            .find(&self.database, &self.collection)
            .map_or(0, |cm| cm.size)
    }

    fn is_dir(&self) -> bool {
        self.collection.is_empty()
    }

    fn stat(&self) -> Result<Self> {
        Ok(self.clone())
    }

    fn read_dir(&self) -> Result<Vec<Self>> {
        if !self.is_dir() {
            return Err(ArchiveError::NotADirectory { path: self.path() });
        }

        let mut children = Vec::new();
        if self.database.is_empty() {
            if let Some(top_level) = self.prelude.namespaces_in("") {
                for cm in top_level {
                    self.push_namespace(&mut children, cm);
                }
            }
            for db in self.prelude.databases().iter().filter(|db| !db.is_empty()) {
                children.push(self.at(db, "", false));
            }
        } else {
            let group = self
                .prelude
                .namespaces_in(&self.database)
                .ok_or_else(|| ArchiveError::NoSuchEntry { database: self.database.clone() })?;
            for cm in group {
                self.push_namespace(&mut children, cm);
            }
        }
        Ok(children)
    }

    fn parent(&self) -> Self {
        if self.collection.is_empty() {
            self.at("", "", false)
        } else {
            self.at(&self.database, "", false)
        }
    }
}
