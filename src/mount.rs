use indexmap::IndexMap;

use crate::adapter::{Adapter, ImageInfo};
use crate::entry::{EntryKind, Metadata, Visibility};
use crate::error::{Result, VfindError};
use crate::path;

/// Routes `name://path` to the adapter mounted under `name`.
///
/// A manager has no root of its own: asking it about `""` (or any path
/// without a mount prefix) is a logic error, because there is no single
/// tree to answer from. Queries over a manager therefore need explicit
/// starting directories.
///
/// ```rust
/// use vfind::{Filesystem, MemoryAdapter, MountManager};
///
/// let docs = MemoryAdapter::new();
/// docs.write_str("guide.md", "# hi").unwrap();
///
/// let mut manager = MountManager::new();
/// manager.mount("docs", docs).unwrap();
///
/// let fs = Filesystem::new(manager);
/// assert!(fs.has("docs://guide.md").unwrap());
/// ```
#[derive(Default)]
pub struct MountManager {
    mounts: IndexMap<String, Box<dyn Adapter>>,
}

impl MountManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount `adapter` under `name`. Names must be unique and must not
    /// contain `/` or `:`.
    pub fn mount(&mut self, name: impl Into<String>, adapter: impl Adapter + 'static) -> Result<()> {
        let name = name.into();
        if name.is_empty() || name.contains(['/', ':']) {
            return Err(VfindError::InvalidArgument(format!("invalid mount name {name:?}")));
        }
        if self.mounts.contains_key(&name) {
            return Err(VfindError::AlreadyExists(format!("{name}://")));
        }
        self.mounts.insert(name, Box::new(adapter));
        Ok(())
    }

    /// Names of all mounts, in mount order.
    pub fn mounts(&self) -> impl Iterator<Item = &str> {
        self.mounts.keys().map(String::as_str)
    }

    fn route<'p>(&self, path: &'p str) -> Result<(&str, &dyn Adapter, &'p str)> {
        match path::split_mount(path) {
            (Some(name), rest) => self
                .mounts
                .get_key_value(name)
                .map(|(k, adapter)| (k.as_str(), adapter.as_ref(), rest))
                .ok_or_else(|| VfindError::NotFound(format!("{name}://"))),
            (None, _) => Err(VfindError::Logic(format!(
                "path {path:?} has no mount prefix; the mount manager has {} roots, use name://path",
                self.mounts.len()
            ))),
        }
    }
}

fn prefixed(mount: &str, mut meta: Metadata) -> Metadata {
    meta.path = format!("{mount}://{}", meta.path);
    meta
}

impl Adapter for MountManager {
    fn has(&self, path: &str) -> Result<bool> {
        let (_, adapter, rest) = self.route(path)?;
        adapter.has(rest)
    }

    fn metadata(&self, path: &str) -> Result<Metadata> {
        let (mount, adapter, rest) = self.route(path)?;
        adapter.metadata(rest).map(|m| prefixed(mount, m))
    }

    fn list_contents(&self, dir: &str) -> Result<Vec<Metadata>> {
        let (mount, adapter, rest) = self.route(dir)?;
        Ok(adapter
            .list_contents(rest)?
            .into_iter()
            .map(|m| prefixed(mount, m))
            .collect())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let (_, adapter, rest) = self.route(path)?;
        adapter.read(rest)
    }

    fn write(&self, path: &str, contents: &[u8]) -> Result<()> {
        let (_, adapter, rest) = self.route(path)?;
        adapter.write(rest, contents)
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        let (_, adapter, rest) = self.route(path)?;
        adapter.create_dir(rest)
    }

    fn delete(&self, path: &str) -> Result<()> {
        let (_, adapter, rest) = self.route(path)?;
        adapter.delete(rest)
    }

    fn delete_dir(&self, path: &str) -> Result<()> {
        let (_, adapter, rest) = self.route(path)?;
        adapter.delete_dir(rest)
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let (from_mount, from_adapter, from_rest) = self.route(from)?;
        let (to_mount, to_adapter, to_rest) = self.route(to)?;
        if from_mount == to_mount {
            return from_adapter.rename(from_rest, to_rest);
        }

        // Across mounts only files can move.
        if from_adapter.metadata(from_rest)?.kind == EntryKind::Dir {
            return Err(VfindError::IsADirectory(from.to_string()));
        }
        to_adapter.write(to_rest, &from_adapter.read(from_rest)?)?;
        from_adapter.delete(from_rest)
    }

    fn copy(&self, from: &str, to: &str) -> Result<()> {
        let (from_mount, from_adapter, from_rest) = self.route(from)?;
        let (to_mount, to_adapter, to_rest) = self.route(to)?;
        if from_mount == to_mount {
            return from_adapter.copy(from_rest, to_rest);
        }
        to_adapter.write(to_rest, &from_adapter.read(from_rest)?)
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        let (_, adapter, rest) = self.route(path)?;
        adapter.set_visibility(rest, visibility)
    }

    fn image_info(&self) -> Option<&dyn ImageInfo> {
        Some(self)
    }
}

impl ImageInfo for MountManager {
    fn image_size(&self, path: &str) -> Result<(u32, u32)> {
        let (_, adapter, rest) = self.route(path)?;
        crate::adapter::require_image_info(adapter)?.image_size(rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAdapter;

    fn manager() -> MountManager {
        let a = MemoryAdapter::new();
        a.write_str("x/one.txt", "1").unwrap();
        let b = MemoryAdapter::new();
        b.write_str("two.txt", "2").unwrap();

        let mut m = MountManager::new();
        m.mount("a", a).unwrap();
        m.mount("b", b).unwrap();
        m
    }

    #[test]
    fn listing_is_prefixed_with_mount() {
        let m = manager();
        let paths: Vec<String> = m.list_contents("a://x").unwrap().into_iter().map(|m| m.path).collect();
        assert_eq!(paths, vec!["a://x/one.txt"]);
    }

    #[test]
    fn bare_root_is_a_logic_error() {
        let m = manager();
        assert!(matches!(m.has(""), Err(VfindError::Logic(_))));
    }

    #[test]
    fn rename_across_mounts_moves_file() {
        let m = manager();
        m.rename("a://x/one.txt", "b://one.txt").unwrap();
        assert!(!m.has("a://x/one.txt").unwrap());
        assert_eq!(m.read("b://one.txt").unwrap(), b"1");
    }

    #[test]
    fn duplicate_mounts_are_rejected() {
        let mut m = manager();
        assert!(m.mount("a", MemoryAdapter::new()).is_err());
    }
}
