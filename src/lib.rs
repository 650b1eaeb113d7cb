pub mod error;
pub mod header;
pub mod block;
pub mod metadata;
pub mod prelude;
pub mod dirlike;
pub mod explorer;
pub mod intents;
pub mod files;
pub mod archive;

pub use error::{ArchiveError, Result};
pub use header::{Header, MAGIC_NUMBER, ARCHIVE_FORMAT_VERSION};
pub use block::{Block, BlockParser};
pub use metadata::CollectionMetadata;
pub use prelude::Prelude;
pub use dirlike::{DirLike, FsDir};
pub use explorer::PreludeExplorer;
pub use intents::{Intent, IntentFile, IntentManager, create_intents};
pub use files::{FsFile, MetadataBuffer, MetadataPreludeFile};
