//! Directory-like navigation shared by real dump directories and archives.
//!
//! Intent building is written once against [`DirLike`]; [`FsDir`] walks a
//! dump directory on disk and [`crate::explorer::PreludeExplorer`] walks the
//! virtual tree synthesized from an archive prelude.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ArchiveError, Result};

pub trait DirLike: Sized + Clone {
    /// Leaf display name.
    fn name(&self) -> String;
    /// Path from the root of the walk.
    fn path(&self) -> PathBuf;
    /// Size in bytes; 0 for directories.
    fn size(&self) -> i64;
    fn is_dir(&self) -> bool;
    fn stat(&self) -> Result<Self>;
    /// Immediate children. Fails with [`ArchiveError::NotADirectory`] on a leaf.
    fn read_dir(&self) -> Result<Vec<Self>>;
    /// Enclosing directory; the root is its own parent.
    fn parent(&self) -> Self;
}

/// A file or directory inside a dump directory on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsDir {
    root: PathBuf,
    relative: PathBuf,
}

impl FsDir {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_owned(), relative: PathBuf::new() }
    }

    /// Absolute location on disk.
    pub fn full_path(&self) -> PathBuf {
        self.root.join(&self.relative)
    }

    fn child(&self, name: &std::ffi::OsStr) -> Self {
        Self { root: self.root.clone(), relative: self.relative.join(name) }
    }
}

impl DirLike for FsDir {
    fn name(&self) -> String {
        self.relative
            .file_name()
            .or_else(|| self.root.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn path(&self) -> PathBuf {
        self.relative.clone()
    }

    fn size(&self) -> i64 {
        match fs::metadata(self.full_path()) {
            Ok(md) if md.is_file() => i64::try_from(md.len()).unwrap_or(i64::MAX),
            _ => 0,
        }
    }

    fn is_dir(&self) -> bool {
        self.full_path().is_dir()
    }

    fn stat(&self) -> Result<Self> {
        fs::metadata(self.full_path())?;
        Ok(self.clone())
    }

    fn read_dir(&self) -> Result<Vec<Self>> {
        let full = self.full_path();
        if !full.is_dir() {
            return Err(ArchiveError::NotADirectory { path: self.path() });
        }
        let mut names = fs::read_dir(&full)?
            .map(|entry| entry.map(|e| e.file_name()))
            .collect::<std::io::Result<Vec<_>>>()?;
        names.sort();
        Ok(names.iter().map(|n| self.child(n)).collect())
    }

    fn parent(&self) -> Self {
        let relative = self.relative.parent().map(Path::to_path_buf).unwrap_or_default();
        Self { root: self.root.clone(), relative }
    }
}
