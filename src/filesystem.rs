use std::fmt;
use std::sync::Arc;

use crate::adapter::Adapter;
use crate::entry::{Metadata, Visibility};
use crate::error::{Result, VfindError};
use crate::finder::Finder;
use crate::handler::Handler;
use crate::path;

/// The facade every query and handler goes through.
///
/// Cheap to clone: clones share the same adapter. All path arguments are
/// normalised before they reach the adapter, so `"/dir/"`, `"dir"` and
/// `"./dir"` name the same directory.
#[derive(Clone)]
pub struct Filesystem {
    adapter: Arc<dyn Adapter>,
}

impl Filesystem {
    pub fn new(adapter: impl Adapter + 'static) -> Self {
        Self { adapter: Arc::new(adapter) }
    }

    /// Share an adapter that is already reference counted.
    pub fn from_arc(adapter: Arc<dyn Adapter>) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }

    /// Start a query over this filesystem.
    pub fn finder(&self) -> Finder {
        Finder::new(self.clone())
    }

    pub fn has(&self, path: &str) -> Result<bool> {
        self.adapter.has(&path::normalize(path))
    }

    /// A handler for whatever lives at `path`.
    ///
    /// # Errors
    ///
    /// [`VfindError::NotFound`] when nothing exists there.
    pub fn get(&self, path: &str) -> Result<Handler> {
        let meta = self.adapter.metadata(&path::normalize(path))?;
        Ok(Handler::from_metadata(self.clone(), meta))
    }

    /// Handlers for the direct children of `dir`, in backend order.
    ///
    /// The handlers come pre-seeded with whatever metadata the listing
    /// carried.
    pub fn list_contents(&self, dir: &str) -> Result<Vec<Handler>> {
        let listing = self.adapter.list_contents(&path::normalize(dir))?;
        log::debug!("listed {:?}: {} entries", dir, listing.len());
        Ok(listing
            .into_iter()
            .map(|meta| Handler::from_metadata(self.clone(), meta))
            .collect())
    }

    pub fn get_metadata(&self, path: &str) -> Result<Metadata> {
        self.adapter.metadata(&path::normalize(path))
    }

    pub fn get_size(&self, path: &str) -> Result<u64> {
        let meta = self.get_metadata(path)?;
        meta.size.ok_or_else(|| missing("size", path))
    }

    pub fn get_mimetype(&self, path: &str) -> Result<String> {
        let meta = self.get_metadata(path)?;
        meta.mimetype.ok_or_else(|| missing("mimetype", path))
    }

    pub fn get_visibility(&self, path: &str) -> Result<Visibility> {
        let meta = self.get_metadata(path)?;
        meta.visibility.ok_or_else(|| missing("visibility", path))
    }

    pub fn get_timestamp(&self, path: &str) -> Result<i64> {
        let meta = self.get_metadata(path)?;
        meta.timestamp.ok_or_else(|| missing("timestamp", path))
    }

    pub fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.adapter.read(&path::normalize(path))
    }

    /// Read a file as UTF-8, replacing invalid sequences.
    pub fn read_to_string(&self, path: &str) -> Result<String> {
        let bytes = self.read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn write(&self, path: &str, contents: impl AsRef<[u8]>) -> Result<()> {
        self.adapter.write(&path::normalize(path), contents.as_ref())
    }

    pub fn create_dir(&self, path: &str) -> Result<()> {
        self.adapter.create_dir(&path::normalize(path))
    }

    pub fn delete(&self, path: &str) -> Result<()> {
        self.adapter.delete(&path::normalize(path))
    }

    pub fn delete_dir(&self, path: &str) -> Result<()> {
        self.adapter.delete_dir(&path::normalize(path))
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<()> {
        self.adapter.rename(&path::normalize(from), &path::normalize(to))
    }

    pub fn copy(&self, from: &str, to: &str) -> Result<()> {
        self.adapter.copy(&path::normalize(from), &path::normalize(to))
    }

    pub fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        self.adapter.set_visibility(&path::normalize(path), visibility)
    }
}

fn missing(field: &str, path: &str) -> VfindError {
    VfindError::Backend(format!("adapter reported no {field} for {path:?}"))
}

impl fmt::Debug for Filesystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filesystem").finish_non_exhaustive()
    }
}
