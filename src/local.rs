use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use ignore::WalkBuilder;

use crate::adapter::Adapter;
use crate::entry::{EntryKind, Metadata, Visibility};
use crate::error::{Result, VfindError};
use crate::path;

/// An adapter over a directory on the local disk.
///
/// All paths are resolved below `root`; the virtual namespace has no way
/// to name anything outside it because `..` never climbs above the root
/// after normalisation.
pub struct LocalAdapter {
    root: PathBuf,
}

impl LocalAdapter {
    /// Serve the tree under `root`, which must be an existing directory.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(VfindError::NotADirectory(root.to_string_lossy().into_owned()));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn full_path(&self, path: &str) -> PathBuf {
        if path.is_empty() {
            self.root.clone()
        } else {
            self.root.join(path)
        }
    }
}

fn stat(path: &str, full: &Path) -> Result<Metadata> {
    let meta = fs::metadata(full).map_err(|e| VfindError::io(path, e))?;
    Ok(convert(path, &meta))
}

fn convert(path: &str, meta: &fs::Metadata) -> Metadata {
    let kind = if meta.is_dir() { EntryKind::Dir } else { EntryKind::File };
    let timestamp = meta
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64);

    Metadata {
        path: path.to_string(),
        kind,
        size: Some(if kind == EntryKind::Dir { 0 } else { meta.len() }),
        mimetype: Some(match kind {
            EntryKind::Dir => "directory".to_string(),
            EntryKind::File => path::guess_mimetype(path).to_string(),
        }),
        visibility: Some(visibility_of(meta)),
        timestamp,
    }
}

#[cfg(unix)]
fn visibility_of(meta: &fs::Metadata) -> Visibility {
    use std::os::unix::fs::PermissionsExt;
    if meta.permissions().mode() & 0o004 != 0 {
        Visibility::Public
    } else {
        Visibility::Private
    }
}

#[cfg(not(unix))]
fn visibility_of(_meta: &fs::Metadata) -> Visibility {
    Visibility::Public
}

fn map_ignore_error(dir: &str, e: ignore::Error) -> VfindError {
    match e {
        ignore::Error::WithPath { err, .. } => map_ignore_error(dir, *err),
        ignore::Error::WithDepth { err, .. } => map_ignore_error(dir, *err),
        ignore::Error::Io(io_err) => VfindError::io(dir, io_err),
        other => VfindError::Backend(other.to_string()),
    }
}

impl Adapter for LocalAdapter {
    fn has(&self, path: &str) -> Result<bool> {
        Ok(self.full_path(path).exists())
    }

    fn metadata(&self, path: &str) -> Result<Metadata> {
        stat(path, &self.full_path(path))
    }

    fn list_contents(&self, dir: &str) -> Result<Vec<Metadata>> {
        let full = self.full_path(dir);
        if !full.is_dir() {
            if full.exists() {
                return Err(VfindError::NotADirectory(dir.to_string()));
            }
            return Err(VfindError::NotFound(dir.to_string()));
        }

        let walker = WalkBuilder::new(&full)
            .standard_filters(false)
            .follow_links(false)
            .max_depth(Some(1))
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        let mut listing = Vec::new();
        for res in walker {
            let entry = res.map_err(|e| map_ignore_error(dir, e))?;
            if entry.depth() == 0 {
                continue;
            }
            let name = entry.file_name().to_string_lossy();
            let child = path::join(dir, &name);
            let meta = entry.metadata().map_err(|e| map_ignore_error(&child, e))?;
            listing.push(convert(&child, &meta));
        }
        Ok(listing)
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.full_path(path);
        if full.is_dir() {
            return Err(VfindError::IsADirectory(path.to_string()));
        }
        fs::read(full).map_err(|e| VfindError::io(path, e))
    }

    fn write(&self, path: &str, contents: &[u8]) -> Result<()> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(|e| VfindError::io(path::dirname(path), e))?;
        }
        fs::write(full, contents).map_err(|e| VfindError::io(path, e))
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        fs::create_dir_all(self.full_path(path)).map_err(|e| VfindError::io(path, e))
    }

    fn delete(&self, path: &str) -> Result<()> {
        let full = self.full_path(path);
        if full.is_dir() {
            return Err(VfindError::IsADirectory(path.to_string()));
        }
        fs::remove_file(full).map_err(|e| VfindError::io(path, e))
    }

    fn delete_dir(&self, path: &str) -> Result<()> {
        fs::remove_dir_all(self.full_path(path)).map_err(|e| VfindError::io(path, e))
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let target = self.full_path(to);
        if target.exists() {
            return Err(VfindError::AlreadyExists(to.to_string()));
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| VfindError::io(path::dirname(to), e))?;
        }
        fs::rename(self.full_path(from), target).map_err(|e| VfindError::io(from, e))
    }

    #[cfg(unix)]
    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let full = self.full_path(path);
        let is_dir = full.is_dir();
        let mode = match (visibility, is_dir) {
            (Visibility::Public, true) => 0o755,
            (Visibility::Public, false) => 0o644,
            (Visibility::Private, true) => 0o700,
            (Visibility::Private, false) => 0o600,
        };
        fs::set_permissions(full, fs::Permissions::from_mode(mode)).map_err(|e| VfindError::io(path, e))
    }

    #[cfg(not(unix))]
    fn set_visibility(&self, path: &str, _visibility: Visibility) -> Result<()> {
        if !self.full_path(path).exists() {
            return Err(VfindError::NotFound(path.to_string()));
        }
        Ok(())
    }
}
