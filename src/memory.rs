use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::adapter::Adapter;
use crate::entry::{EntryKind, Metadata, Visibility};
use crate::error::{Result, VfindError};
use crate::path;

/// An adapter that keeps the whole tree in memory.
///
/// Children are listed in insertion order, which makes traversal order
/// fully deterministic. Handy for tests and for staging data before it is
/// copied to a real backend.
///
/// # Example
///
/// ```rust
/// use vfind::{Filesystem, MemoryAdapter};
///
/// let mem = MemoryAdapter::new();
/// mem.write_str("dir/a.css", "body {}").unwrap();
///
/// let fs = Filesystem::new(mem);
/// assert!(fs.has("dir").unwrap());
/// ```
#[derive(Default)]
pub struct MemoryAdapter {
    nodes: RwLock<Nodes>,
}

#[derive(Default)]
struct Nodes {
    /// Keyed by normalised path; the root is implicit.
    entries: BTreeMap<String, Node>,
    /// Insertion sequence, used to list children in creation order.
    next_seq: u64,
}

struct Node {
    seq: u64,
    contents: Option<Vec<u8>>,
    visibility: Visibility,
    timestamp: i64,
}

impl Node {
    fn kind(&self) -> EntryKind {
        match self.contents {
            Some(_) => EntryKind::File,
            None => EntryKind::Dir,
        }
    }
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a UTF-8 file, creating parents.
    pub fn write_str(&self, path: &str, contents: &str) -> Result<()> {
        self.write(&path::normalize(path), contents.as_bytes())
    }

    /// Write a file and pin its modification time.
    pub fn write_with_timestamp(&self, path: &str, contents: &[u8], timestamp: i64) -> Result<()> {
        let path = path::normalize(path);
        self.write(&path, contents)?;
        self.touch(&path, timestamp)
    }

    /// Set the modification time of an existing entry.
    pub fn touch(&self, path: &str, timestamp: i64) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        let node = nodes
            .entries
            .get_mut(path)
            .ok_or_else(|| VfindError::NotFound(path.to_string()))?;
        node.timestamp = timestamp;
        Ok(())
    }
}

impl Nodes {
    fn insert(&mut self, path: &str, contents: Option<Vec<u8>>) {
        let timestamp = now();
        match self.entries.get_mut(path) {
            Some(node) => {
                node.contents = contents;
                node.timestamp = timestamp;
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.entries.insert(
                    path.to_string(),
                    Node { seq, contents, visibility: Visibility::Public, timestamp },
                );
            }
        }
    }

    fn ensure_parents(&mut self, path: &str) -> Result<()> {
        let parent = path::dirname(path);
        if parent.is_empty() {
            return Ok(());
        }
        match self.entries.get(parent).map(Node::kind) {
            Some(EntryKind::Dir) => Ok(()),
            Some(EntryKind::File) => Err(VfindError::NotADirectory(parent.to_string())),
            None => {
                self.ensure_parents(parent)?;
                self.insert(parent, None);
                Ok(())
            }
        }
    }

    fn is_dir(&self, path: &str) -> bool {
        path.is_empty() || matches!(self.entries.get(path).map(Node::kind), Some(EntryKind::Dir))
    }

    /// Every key at or below `path`.
    fn subtree(&self, path: &str) -> Vec<String> {
        let prefix = format!("{path}/");
        self.entries
            .keys()
            .filter(|k| k.as_str() == path || k.starts_with(&prefix))
            .cloned()
            .collect()
    }
}

fn metadata_for(path: &str, node: &Node) -> Metadata {
    let kind = node.kind();
    Metadata {
        path: path.to_string(),
        kind,
        size: Some(node.contents.as_ref().map_or(0, |c| c.len() as u64)),
        mimetype: Some(match kind {
            EntryKind::Dir => "directory".to_string(),
            EntryKind::File => path::guess_mimetype(path).to_string(),
        }),
        visibility: Some(node.visibility),
        timestamp: Some(node.timestamp),
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> VfindError {
    VfindError::Backend("memory adapter lock poisoned".into())
}

impl Adapter for MemoryAdapter {
    fn has(&self, path: &str) -> Result<bool> {
        let nodes = self.nodes.read().map_err(poisoned)?;
        Ok(path.is_empty() || nodes.entries.contains_key(path))
    }

    fn metadata(&self, path: &str) -> Result<Metadata> {
        if path.is_empty() {
            return Ok(Metadata {
                mimetype: Some("directory".into()),
                size: Some(0),
                ..Metadata::dir("")
            });
        }
        let nodes = self.nodes.read().map_err(poisoned)?;
        nodes
            .entries
            .get(path)
            .map(|node| metadata_for(path, node))
            .ok_or_else(|| VfindError::NotFound(path.to_string()))
    }

    fn list_contents(&self, dir: &str) -> Result<Vec<Metadata>> {
        let nodes = self.nodes.read().map_err(poisoned)?;
        if !nodes.is_dir(dir) {
            if nodes.entries.contains_key(dir) {
                return Err(VfindError::NotADirectory(dir.to_string()));
            }
            return Err(VfindError::NotFound(dir.to_string()));
        }

        let mut children: Vec<(&String, &Node)> = nodes
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != dir && path::dirname(k) == dir)
            .collect();
        children.sort_by_key(|(_, node)| node.seq);

        Ok(children.into_iter().map(|(k, node)| metadata_for(k, node)).collect())
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let nodes = self.nodes.read().map_err(poisoned)?;
        match nodes.entries.get(path) {
            Some(Node { contents: Some(c), .. }) => Ok(c.clone()),
            Some(_) => Err(VfindError::IsADirectory(path.to_string())),
            None if path.is_empty() => Err(VfindError::IsADirectory(path.to_string())),
            None => Err(VfindError::NotFound(path.to_string())),
        }
    }

    fn write(&self, path: &str, contents: &[u8]) -> Result<()> {
        if path.is_empty() {
            return Err(VfindError::IsADirectory(path.to_string()));
        }
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        if nodes.is_dir(path) {
            return Err(VfindError::IsADirectory(path.to_string()));
        }
        nodes.ensure_parents(path)?;
        nodes.insert(path, Some(contents.to_vec()));
        Ok(())
    }

    fn create_dir(&self, path: &str) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        if nodes.is_dir(path) {
            return Ok(());
        }
        if nodes.entries.contains_key(path) {
            return Err(VfindError::AlreadyExists(path.to_string()));
        }
        nodes.ensure_parents(path)?;
        nodes.insert(path, None);
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        match nodes.entries.get(path).map(Node::kind) {
            Some(EntryKind::File) => {
                nodes.entries.remove(path);
                Ok(())
            }
            Some(EntryKind::Dir) => Err(VfindError::IsADirectory(path.to_string())),
            None => Err(VfindError::NotFound(path.to_string())),
        }
    }

    fn delete_dir(&self, path: &str) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        if path.is_empty() {
            nodes.entries.clear();
            return Ok(());
        }
        match nodes.entries.get(path).map(Node::kind) {
            Some(EntryKind::Dir) => {
                for key in nodes.subtree(path) {
                    nodes.entries.remove(&key);
                }
                Ok(())
            }
            Some(EntryKind::File) => Err(VfindError::NotADirectory(path.to_string())),
            None => Err(VfindError::NotFound(path.to_string())),
        }
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        if !nodes.entries.contains_key(from) {
            return Err(VfindError::NotFound(from.to_string()));
        }
        if nodes.entries.contains_key(to) {
            return Err(VfindError::AlreadyExists(to.to_string()));
        }
        nodes.ensure_parents(to)?;
        for key in nodes.subtree(from) {
            if let Some(node) = nodes.entries.remove(&key) {
                let moved = format!("{to}{}", &key[from.len()..]);
                nodes.entries.insert(moved, node);
            }
        }
        Ok(())
    }

    fn set_visibility(&self, path: &str, visibility: Visibility) -> Result<()> {
        let mut nodes = self.nodes.write().map_err(poisoned)?;
        let node = nodes
            .entries
            .get_mut(path)
            .ok_or_else(|| VfindError::NotFound(path.to_string()))?;
        node.visibility = visibility;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_children_in_insertion_order() {
        let mem = MemoryAdapter::new();
        mem.write_str("b.txt", "b").unwrap();
        mem.write_str("a.txt", "a").unwrap();
        mem.write_str("dir/c.txt", "c").unwrap();

        let names: Vec<String> = mem.list_contents("").unwrap().into_iter().map(|m| m.path).collect();
        assert_eq!(names, vec!["b.txt", "a.txt", "dir"]);

        let nested: Vec<String> = mem.list_contents("dir").unwrap().into_iter().map(|m| m.path).collect();
        assert_eq!(nested, vec!["dir/c.txt"]);
    }

    #[test]
    fn rename_moves_subtree() {
        let mem = MemoryAdapter::new();
        mem.write_str("dir/sub/c.txt", "c").unwrap();
        mem.rename("dir", "moved").unwrap();

        assert!(!mem.has("dir/sub/c.txt").unwrap());
        assert_eq!(mem.read("moved/sub/c.txt").unwrap(), b"c");
    }

    #[test]
    fn write_under_file_fails() {
        let mem = MemoryAdapter::new();
        mem.write_str("a", "x").unwrap();
        assert!(matches!(mem.write_str("a/b", "y"), Err(VfindError::NotADirectory(_))));
    }

    #[test]
    fn listing_a_missing_directory_is_not_found() {
        let mem = MemoryAdapter::new();
        assert!(matches!(mem.list_contents("nope"), Err(VfindError::NotFound(_))));
    }
}
