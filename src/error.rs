use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("stream does not appear to be a dump archive (magic number {found:#010x})")]
    FormatMismatch { found: u32 },

    #[error("malformed prelude document: {0}")]
    Decode(#[from] bson::de::Error),

    #[error("cannot encode prelude document: {0}")]
    Encode(#[from] bson::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid block size: {0}")]
    InvalidBlockSize(i32),

    #[error("block sequence has no header document")]
    MissingHeader,

    #[error("prelude ended before its terminator")]
    TruncatedPrelude,

    #[error("not a directory: {}", path.display())]
    NotADirectory { path: PathBuf },

    #[error("no such directory in archive: {database:?}")]
    NoSuchEntry { database: String },

    #[error("no such file in archive: {namespace:?}")]
    NoSuchFile { namespace: String },

    #[error("metadata file for {namespace:?} is not an in-memory archive buffer")]
    UnexpectedMetadataFile { namespace: String },
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
