use std::fmt;

use crate::adapter::require_image_info;
use crate::entry::{EntryKind, Metadata, Visibility};
use crate::error::{Result, VfindError};
use crate::filesystem::Filesystem;
use crate::path;

/// A single file or directory, bound to the filesystem it lives on.
///
/// Metadata is cached per instance. Every accessor takes a `use_cache`
/// flag: `true` returns the cached value when there is one, `false`
/// always asks the adapter and refreshes the cache. Two handlers for the
/// same path never share a cache.
#[derive(Clone)]
pub struct Handler {
    fs: Filesystem,
    path: String,
    kind: EntryKind,
    size: Option<u64>,
    mimetype: Option<String>,
    visibility: Option<Visibility>,
    timestamp: Option<i64>,
}

impl Handler {
    pub(crate) fn from_metadata(fs: Filesystem, meta: Metadata) -> Self {
        Self {
            fs,
            path: meta.path,
            kind: meta.kind,
            size: meta.size,
            mimetype: meta.mimetype,
            visibility: meta.visibility,
            timestamp: meta.timestamp,
        }
    }

    pub fn filesystem(&self) -> &Filesystem {
        &self.fs
    }

    /// Full normalised path, including any mount prefix.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn basename(&self) -> &str {
        path::basename(&self.path)
    }

    pub fn dirname(&self) -> &str {
        path::dirname(&self.path)
    }

    pub fn extension(&self) -> Option<&str> {
        path::extension(&self.path)
    }

    /// The mount this entry belongs to when the filesystem is a
    /// [`MountManager`](crate::MountManager).
    pub fn mount_point(&self) -> Option<&str> {
        path::split_mount(&self.path).0
    }

    pub fn kind(&self) -> EntryKind {
        self.kind
    }

    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }

    pub fn exists(&self) -> Result<bool> {
        self.fs.has(&self.path)
    }

    /// Re-fetch every metadata field in one adapter call.
    pub fn refresh(&mut self) -> Result<()> {
        let meta = self.fs.get_metadata(&self.path)?;
        self.kind = meta.kind;
        self.size = meta.size;
        self.mimetype = meta.mimetype;
        self.visibility = meta.visibility;
        self.timestamp = meta.timestamp;
        Ok(())
    }

    /// Drop all cached metadata; the next accessor call fetches it.
    pub fn invalidate(&mut self) {
        self.size = None;
        self.mimetype = None;
        self.visibility = None;
        self.timestamp = None;
    }

    pub fn size(&mut self, use_cache: bool) -> Result<u64> {
        if !use_cache || self.size.is_none() {
            self.size = Some(self.fs.get_size(&self.path)?);
        }
        Ok(self.size.unwrap_or_default())
    }

    pub fn mimetype(&mut self, use_cache: bool) -> Result<String> {
        match &self.mimetype {
            Some(m) if use_cache => Ok(m.clone()),
            _ => {
                let mimetype = self.fs.get_mimetype(&self.path)?;
                self.mimetype = Some(mimetype.clone());
                Ok(mimetype)
            }
        }
    }

    pub fn visibility(&mut self, use_cache: bool) -> Result<Visibility> {
        match self.visibility {
            Some(v) if use_cache => Ok(v),
            _ => {
                let visibility = self.fs.get_visibility(&self.path)?;
                self.visibility = Some(visibility);
                Ok(visibility)
            }
        }
    }

    /// Modification time in seconds since the Unix epoch.
    pub fn timestamp(&mut self, use_cache: bool) -> Result<i64> {
        match self.timestamp {
            Some(t) if use_cache => Ok(t),
            _ => {
                let timestamp = self.fs.get_timestamp(&self.path)?;
                self.timestamp = Some(timestamp);
                Ok(timestamp)
            }
        }
    }

    pub fn read(&self) -> Result<Vec<u8>> {
        if self.is_dir() {
            return Err(VfindError::IsADirectory(self.path.clone()));
        }
        self.fs.read(&self.path)
    }

    pub fn read_to_string(&self) -> Result<String> {
        if self.is_dir() {
            return Err(VfindError::IsADirectory(self.path.clone()));
        }
        self.fs.read_to_string(&self.path)
    }

    /// Replace the file contents. Cached metadata is dropped.
    pub fn write(&mut self, contents: impl AsRef<[u8]>) -> Result<()> {
        if self.is_dir() {
            return Err(VfindError::IsADirectory(self.path.clone()));
        }
        self.fs.write(&self.path, contents)?;
        self.invalidate();
        Ok(())
    }

    /// Direct children of this directory.
    pub fn list(&self) -> Result<Vec<Handler>> {
        if !self.is_dir() {
            return Err(VfindError::NotADirectory(self.path.clone()));
        }
        self.fs.list_contents(&self.path)
    }

    /// The directory containing this entry.
    pub fn parent(&self) -> Result<Handler> {
        self.fs.get(self.dirname())
    }

    /// Delete this entry; directories are removed with their contents.
    pub fn delete(self) -> Result<()> {
        match self.kind {
            EntryKind::Dir => self.fs.delete_dir(&self.path),
            EntryKind::File => self.fs.delete(&self.path),
        }
    }

    /// Move this entry. The handler keeps its cache and follows the move.
    pub fn rename(&mut self, to: &str) -> Result<()> {
        let to = path::normalize(to);
        self.fs.rename(&self.path, &to)?;
        self.path = to;
        Ok(())
    }

    /// Copy this file and return a handler for the copy.
    pub fn copy(&self, to: &str) -> Result<Handler> {
        if self.is_dir() {
            return Err(VfindError::IsADirectory(self.path.clone()));
        }
        self.fs.copy(&self.path, to)?;
        self.fs.get(to)
    }

    pub fn set_visibility(&mut self, visibility: Visibility) -> Result<()> {
        self.fs.set_visibility(&self.path, visibility)?;
        self.visibility = Some(visibility);
        Ok(())
    }

    /// Pixel dimensions, for adapters with the image capability.
    ///
    /// # Errors
    ///
    /// [`VfindError::NotSupported`] when the adapter cannot extract image
    /// information.
    pub fn image_size(&self) -> Result<(u32, u32)> {
        require_image_info(self.fs.adapter())?.image_size(&self.path)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAdapter;

    fn fs() -> Filesystem {
        let mem = MemoryAdapter::new();
        mem.write_str("dir/a.css", "body {}").unwrap();
        Filesystem::new(mem)
    }

    #[test]
    fn cache_is_per_instance() {
        let fs = fs();
        let mut first = fs.get("dir/a.css").unwrap();
        let mut second = fs.get("dir/a.css").unwrap();
        assert_eq!(first.size(true).unwrap(), 7);

        second.write("longer contents").unwrap();

        assert_eq!(first.size(true).unwrap(), 7, "cached value survives");
        assert_eq!(first.size(false).unwrap(), 15, "forced refetch sees the write");
        assert_eq!(second.size(true).unwrap(), 15);
    }

    #[test]
    fn rename_updates_path_in_place() {
        let fs = fs();
        let mut h = fs.get("dir/a.css").unwrap();
        h.rename("/other/b.css").unwrap();
        assert_eq!(h.path(), "other/b.css");
        assert!(!fs.has("dir/a.css").unwrap());
        assert_eq!(h.read_to_string().unwrap(), "body {}");
    }

    #[test]
    fn image_size_needs_capability() {
        let fs = fs();
        let h = fs.get("dir/a.css").unwrap();
        assert!(matches!(
            h.image_size(),
            Err(VfindError::NotSupported { capability: "image info" })
        ));
    }

    #[test]
    fn directories_cannot_be_read() {
        let fs = fs();
        let dir = fs.get("dir").unwrap();
        assert!(dir.is_dir());
        assert!(matches!(dir.read(), Err(VfindError::IsADirectory(_))));
        assert_eq!(dir.list().unwrap().len(), 1);
    }
}
