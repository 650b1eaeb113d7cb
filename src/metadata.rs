use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Descriptive record for one namespace.
///
/// An empty `collection` marks a database-level placeholder; when `database`
/// is empty too the record names a top-level namespace such as the oplog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    #[serde(rename = "db")]
    pub database: String,
    pub collection: String,
    /// Raw `.metadata.json` text (options and indexes); may be empty.
    #[serde(default)]
    pub metadata: String,
    /// Data size in bytes, 0 when unknown.
    #[serde(default)]
    pub size: i64,
}

impl CollectionMetadata {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
            ..Default::default()
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    pub fn with_size(mut self, size: i64) -> Self {
        self.size = size;
        self
    }

    pub fn namespace(&self) -> String {
        namespace(&self.database, &self.collection)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bson::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bson::from_slice(bytes)?)
    }
}

/// `db.coll`, or the bare name of a top-level namespace.
pub fn namespace(database: &str, collection: &str) -> String {
    match (database.is_empty(), collection.is_empty()) {
        (true, _) => collection.to_owned(),
        (false, true) => database.to_owned(),
        (false, false) => format!("{database}.{collection}"),
    }
}
