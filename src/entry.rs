use serde::{Deserialize, Serialize};

/// Everything an adapter knows about a single path.
///
/// Adapters fill in as much as they can cheaply learn while listing a
/// directory. Fields left as `None` are fetched on demand by
/// [`Handler`](crate::Handler) accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metadata {
    /// Normalised path relative to the adapter root (`""` is the root).
    pub path: String,

    /// What kind of entry this is.
    pub kind: EntryKind,

    /// Size in bytes. Always `Some(0)` for directories when known.
    pub size: Option<u64>,

    /// Mime type, e.g. `text/css`. Directories report `directory`.
    pub mimetype: Option<String>,

    pub visibility: Option<Visibility>,

    /// Modification time in seconds since the Unix epoch.
    pub timestamp: Option<i64>,
}

impl Metadata {
    /// Metadata for a directory with nothing but its path known.
    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::Dir,
            size: None,
            mimetype: None,
            visibility: None,
            timestamp: None,
        }
    }

    /// Metadata for a file with nothing but its path known.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind: EntryKind::File,
            size: None,
            mimetype: None,
            visibility: None,
            timestamp: None,
        }
    }
}

/// The kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// A regular file.
    File,

    /// A directory.
    Dir,
}

/// Access level an adapter reports for a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// A candidate travelling through a query pipeline.
///
/// Produced by the directory walker and consumed by the filter stages.
/// `relative` and `depth` are relative to the directory the walk started
/// from.
#[derive(Debug, Clone)]
pub struct Entry {
    pub handler: crate::Handler,

    /// Iteration key; its shape depends on the walker's
    /// [`KeyStyle`](crate::walker::KeyStyle).
    pub key: String,

    /// Path below the walk root, `/`-separated.
    pub relative: String,

    /// How deep below the walk root this entry was found. Direct children
    /// of the root are at depth 0.
    pub depth: usize,
}
