//! # vfind
//!
//! Fluent file and directory queries over pluggable storage backends.
//!
//! vfind owns the query pipeline: lazy recursive traversal, the filter
//! stages (type, depth, name, path, content, size, date, exclusions,
//! custom predicates), optional sorting, and the composition of several
//! roots into one result stream. Storage is reached through the
//! [`Adapter`] trait, so the same query runs against the local disk
//! ([`LocalAdapter`]), memory ([`MemoryAdapter`]) or several named
//! backends at once ([`MountManager`]).
//!
//! # Quick Start
//!
//! ```rust
//! use vfind::{Filesystem, MemoryAdapter};
//!
//! let mem = MemoryAdapter::new();
//! mem.write_str("a.css", "body { color: red }").unwrap();
//! mem.write_str("dir/b.css", "p {}").unwrap();
//! mem.write_str("dir/notes.txt", "color").unwrap();
//! mem.write_str(".cache/c.css", "").unwrap();
//! let fs = Filesystem::new(mem);
//!
//! let found: Vec<String> = vfind::find(&fs)
//!     .files()
//!     .name("*.css")
//!     .contains("color")
//!     .iter()
//!     .unwrap()
//!     .map(|h| h.unwrap().path().to_string())
//!     .collect();
//!
//! // dot directories are skipped by default
//! assert_eq!(found, vec!["a.css"]);
//! ```
//!
//! # Patterns
//!
//! `name`, `path` and `contains` accept three forms:
//!
//! - a delimited regex such as `/^foo\d+/i` or `{\.rs$}`
//! - a glob such as `*.{css,scss}` (see [`glob`])
//! - anything else is literal: exact for names, substring for paths and
//!   contents
//!
//! # Custom Backends
//!
//! Implement [`Adapter`] to search anything with directories:
//!
//! ```rust
//! use vfind::{Adapter, Metadata, Result, VfindError, Visibility};
//!
//! /// A read-only backend with one empty directory.
//! struct Empty;
//!
//! impl Adapter for Empty {
//!     fn has(&self, path: &str) -> Result<bool> { Ok(path.is_empty()) }
//!     fn metadata(&self, path: &str) -> Result<Metadata> {
//!         if path.is_empty() { Ok(Metadata::dir("")) } else { Err(VfindError::NotFound(path.into())) }
//!     }
//!     fn list_contents(&self, _dir: &str) -> Result<Vec<Metadata>> { Ok(Vec::new()) }
//!     fn read(&self, path: &str) -> Result<Vec<u8>> { Err(VfindError::NotFound(path.into())) }
//!     fn write(&self, _: &str, _: &[u8]) -> Result<()> { Err(VfindError::NotSupported { capability: "write" }) }
//!     fn create_dir(&self, _: &str) -> Result<()> { Err(VfindError::NotSupported { capability: "write" }) }
//!     fn delete(&self, _: &str) -> Result<()> { Err(VfindError::NotSupported { capability: "write" }) }
//!     fn delete_dir(&self, _: &str) -> Result<()> { Err(VfindError::NotSupported { capability: "write" }) }
//!     fn rename(&self, _: &str, _: &str) -> Result<()> { Err(VfindError::NotSupported { capability: "write" }) }
//!     fn set_visibility(&self, _: &str, _: Visibility) -> Result<()> {
//!         Err(VfindError::NotSupported { capability: "write" })
//!     }
//! }
//!
//! let fs = vfind::Filesystem::new(Empty);
//! assert_eq!(vfind::find(&fs).count().unwrap(), 0);
//! ```

#![forbid(unsafe_code)]

pub mod comparator;
pub mod filters;
pub mod glob;
pub mod path;
pub mod pattern;
pub mod walker;

mod adapter;
mod append;
mod entry;
mod error;
mod filesystem;
mod finder;
mod handler;
mod local;
mod memory;
mod mount;
mod query;
mod sort;

// ── Public re-exports ─────────────────────────────────────────────────────────

pub use adapter::{Adapter, ImageInfo};
pub use append::AppendIterator;
pub use entry::{Entry, EntryKind, Metadata, Visibility};
pub use error::{Result, VfindError};
pub use filesystem::Filesystem;
pub use filters::Mode;
pub use finder::{Finder, FinderIter, VCS_DIRECTORIES};
pub use handler::Handler;
pub use local::LocalAdapter;
pub use memory::MemoryAdapter;
pub use mount::MountManager;
pub use query::Query;
pub use sort::SortBy;

// ── Entry point ───────────────────────────────────────────────────────────────

/// Start a [`Finder`] over `fs`.
///
/// # Example
///
/// ```rust
/// use vfind::{Filesystem, MemoryAdapter};
///
/// let mem = MemoryAdapter::new();
/// mem.write_str("invoice_jan.txt", "").unwrap();
/// mem.write_str("report.txt", "").unwrap();
/// let fs = Filesystem::new(mem);
///
/// assert_eq!(vfind::find(&fs).name("invoice*").count().unwrap(), 1);
/// ```
pub fn find(fs: &Filesystem) -> Finder {
    Finder::new(fs.clone())
}
