use crate::entry::{Metadata, Visibility};
use crate::error::{Result, VfindError};

/// A storage backend the [`Filesystem`](crate::Filesystem) facade talks to.
///
/// Implement this to query anything that looks like a tree: local disk,
/// a remote server, an archive, an in-memory fixture.
///
/// # Paths
///
/// Every path argument is already normalised: relative to the adapter
/// root, `/`-separated, no leading or trailing slash. `""` is the root.
///
/// # Listing
///
/// [`list_contents`](Adapter::list_contents) returns one directory level
/// in the backend's own order. Include size, mimetype, visibility and
/// timestamp whenever they come for free with the listing; the query
/// engine will otherwise fetch them one path at a time.
///
/// # Thread Safety
///
/// `Send + Sync` are required so one adapter can back several
/// filesystems. The query engine itself never calls an adapter from more
/// than one thread.
pub trait Adapter: Send + Sync {
    /// Whether anything exists at `path`.
    fn has(&self, path: &str) -> Result<bool>;

    /// Metadata for a single path.
    fn metadata(&self, path: &str) -> Result<Metadata>;

    /// Direct children of the directory at `dir`.
    fn list_contents(&self, dir: &str) -> Result<Vec<Metadata>>;

    /// Full contents of the file at `path`.
    fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Create or overwrite a file. Missing parent directories are created.
    fn write(&self, path: &str, contents: &[u8]) -> Result<()>;

    fn create_dir(&self, path: &str) -> Result<()>;

    fn delete(&self, path: &str) -> Result<()>;

    /// Remove a directory and everything below it.
    fn delete_dir(&self, path: &str) -> Result<()>;

    fn rename(&self, from: &str, to: &str) -> Result<()>;

    fn copy(&self, from: &str, to: &str) -> Result<()> {
        let contents = self.read(from)?;
        self.write(to, &contents)
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()>;

    /// Image metadata extraction, for backends that can do it.
    fn image_info(&self) -> Option<&dyn ImageInfo> {
        None
    }
}

/// Optional capability: report pixel dimensions of image files.
pub trait ImageInfo {
    /// `(width, height)` of the image at `path`.
    fn image_size(&self, path: &str) -> Result<(u32, u32)>;
}

/// Look up the image capability or fail naming it.
pub(crate) fn require_image_info(adapter: &dyn Adapter) -> Result<&dyn ImageInfo> {
    adapter
        .image_info()
        .ok_or(VfindError::NotSupported { capability: "image info" })
}
