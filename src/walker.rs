//! Lazy recursive traversal over a [`Filesystem`].
//!
//! [`DirectoryIterator`] is a cursor over one directory listing. Listings
//! are memoised by path in a cache shared by the iterator and every child
//! iterator it hands out, so each directory is listed at most once per
//! walk no matter how often [`has_children`](DirectoryIterator::has_children)
//! and [`get_children`](DirectoryIterator::get_children) are called.
//!
//! [`RecursiveWalk`] drives a stack of those cursors in self-first
//! pre-order: a directory is yielded before its contents.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::entry::Entry;
use crate::error::{Result, VfindError};
use crate::filesystem::Filesystem;
use crate::filters::Filter;
use crate::handler::Handler;
use crate::path;

type Listing = Rc<[Handler]>;
type ListingCache = Rc<RefCell<HashMap<String, Listing>>>;

/// Shape of the keys a walker produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyStyle {
    /// Path relative to the walk root: `dir/b.css`.
    #[default]
    Relative,
    /// Absolute-looking path within the mount, directories with a
    /// trailing slash: `/dir/`, `/dir/b.css`. Used to match globs.
    Glob,
}

// ---------------------------------------------------------------------------
// DirectoryIterator
// ---------------------------------------------------------------------------

/// A cursor over the children of one directory.
///
/// Starts unfetched; the first call that needs the listing
/// ([`rewind`](Self::rewind), [`valid`](Self::valid), [`seek`](Self::seek))
/// fetches it.
pub struct DirectoryIterator {
    fs: Filesystem,
    /// Directory the walk started from; keys are relative to it.
    root: String,
    dir: String,
    style: KeyStyle,
    listing: Option<Listing>,
    position: usize,
    cache: ListingCache,
}

impl DirectoryIterator {
    pub fn new(fs: Filesystem, dir: &str, style: KeyStyle) -> Self {
        let dir = path::normalize(dir);
        Self {
            fs,
            root: dir.clone(),
            dir,
            style,
            listing: None,
            position: 0,
            cache: ListingCache::default(),
        }
    }

    pub fn dir(&self) -> &str {
        &self.dir
    }

    pub fn is_fetched(&self) -> bool {
        self.listing.is_some()
    }

    fn children_of(&self, dir: &str) -> Result<Listing> {
        if let Some(listing) = self.cache.borrow().get(dir) {
            return Ok(Rc::clone(listing));
        }
        let listing: Listing = self.fs.list_contents(dir)?.into();
        self.cache.borrow_mut().insert(dir.to_string(), Rc::clone(&listing));
        Ok(listing)
    }

    fn fetch(&mut self) -> Result<()> {
        if self.listing.is_none() {
            let listing = self.children_of(&self.dir)?;
            self.listing = Some(listing);
        }
        Ok(())
    }

    fn len(&self) -> usize {
        self.listing.as_ref().map_or(0, |l| l.len())
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.fetch()?;
        self.position = 0;
        Ok(())
    }

    /// Whether the cursor points at an entry.
    pub fn valid(&mut self) -> Result<bool> {
        self.fetch()?;
        Ok(self.position < self.len())
    }

    pub fn current(&self) -> Option<&Handler> {
        self.listing.as_ref()?.get(self.position)
    }

    pub fn advance(&mut self) {
        self.position += 1;
    }

    pub fn seek(&mut self, position: usize) -> Result<()> {
        self.fetch()?;
        if position >= self.len() {
            return Err(VfindError::InvalidArgument(format!(
                "seek position {position} is out of range for {:?}",
                self.dir
            )));
        }
        self.position = position;
        Ok(())
    }

    /// The current entry's key in this iterator's [`KeyStyle`].
    pub fn key(&self) -> Option<String> {
        let handler = self.current()?;
        Some(match self.style {
            KeyStyle::Relative => path::relative_to(handler.path(), &self.root).to_string(),
            KeyStyle::Glob => glob_key(handler),
        })
    }

    /// The current entry's path relative to the walk root.
    pub fn relative_path(&self) -> Option<&str> {
        let handler = self.current()?;
        Some(path::relative_to(handler.path(), &self.root))
    }

    /// Whether the current entry is a directory with at least one child.
    ///
    /// A directory that vanished since it was listed counts as having no
    /// children. Listing failures still propagate.
    pub fn has_children(&mut self) -> Result<bool> {
        let Some(current) = self.current() else {
            return Ok(false);
        };
        if !current.is_dir() {
            return Ok(false);
        }
        let dir = current.path().to_string();
        match self.fs.has(&dir) {
            Ok(true) => {}
            Ok(false) | Err(_) => return Ok(false),
        }
        Ok(!self.children_of(&dir)?.is_empty())
    }

    /// A cursor over the current directory's children, seeded from the
    /// shared cache.
    pub fn get_children(&mut self) -> Result<DirectoryIterator> {
        let current = self
            .current()
            .ok_or_else(|| VfindError::Logic(format!("no current entry in {:?}", self.dir)))?;
        if !current.is_dir() {
            return Err(VfindError::NotADirectory(current.path().to_string()));
        }
        let dir = current.path().to_string();
        let listing = self.children_of(&dir)?;

        Ok(Self {
            fs: self.fs.clone(),
            root: self.root.clone(),
            dir,
            style: self.style,
            listing: Some(listing),
            position: 0,
            cache: Rc::clone(&self.cache),
        })
    }
}

fn glob_key(handler: &Handler) -> String {
    let (_, rest) = path::split_mount(handler.path());
    if handler.is_dir() {
        format!("/{rest}/")
    } else {
        format!("/{rest}")
    }
}

// ---------------------------------------------------------------------------
// RecursiveWalk
// ---------------------------------------------------------------------------

/// Self-first pre-order traversal below a [`DirectoryIterator`].
///
/// An optional prune filter rejects entries before they are yielded; a
/// rejected directory is not descended into. `max_depth` stops descent
/// below the given depth (children of the root are depth 0).
///
/// Listing failures end the walk: the error is yielded once and the walk
/// is exhausted afterwards.
pub struct RecursiveWalk {
    stack: Vec<DirectoryIterator>,
    max_depth: Option<usize>,
    prune: Option<Box<dyn Filter>>,
}

impl RecursiveWalk {
    pub fn new(root: DirectoryIterator) -> Self {
        Self { stack: vec![root], max_depth: None, prune: None }
    }

    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Skip entries (and whole subtrees) the filter rejects.
    pub fn prune_with(mut self, filter: impl Filter + 'static) -> Self {
        self.prune = Some(Box::new(filter));
        self
    }

    fn step(&mut self) -> Result<Option<Entry>> {
        loop {
            let depth = match self.stack.len() {
                0 => return Ok(None),
                n => n - 1,
            };
            let Some(top) = self.stack.last_mut() else {
                return Ok(None);
            };

            if !top.valid()? {
                self.stack.pop();
                if let Some(parent) = self.stack.last_mut() {
                    parent.advance();
                }
                continue;
            }

            let Some(handler) = top.current().cloned() else {
                continue;
            };
            let mut entry = Entry {
                key: top.key().unwrap_or_default(),
                relative: top.relative_path().unwrap_or_default().to_string(),
                handler,
                depth,
            };

            if let Some(prune) = &self.prune {
                if !prune.accept(&mut entry) {
                    top.advance();
                    continue;
                }
            }

            let may_descend = self.max_depth.map_or(true, |max| depth < max);
            if may_descend && top.has_children()? {
                let children = top.get_children()?;
                self.stack.push(children);
            } else {
                top.advance();
            }
            return Ok(Some(entry));
        }
    }
}

impl Iterator for RecursiveWalk {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(entry) => entry.map(Ok),
            Err(e) => {
                self.stack.clear();
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::Adapter;
    use crate::memory::MemoryAdapter;

    fn fs() -> Filesystem {
        let mem = MemoryAdapter::new();
        mem.write_str("a.css", "a").unwrap();
        mem.write_str("dir/b.css", "b").unwrap();
        mem.write_str("dir/sub/c.css", "c").unwrap();
        mem.create_dir("empty").unwrap();
        Filesystem::new(mem)
    }

    fn keys(walk: RecursiveWalk) -> Vec<(String, usize)> {
        walk.map(|e| e.map(|e| (e.key, e.depth)).unwrap()).collect()
    }

    #[test]
    fn walks_self_first() {
        let walk = RecursiveWalk::new(DirectoryIterator::new(fs(), "", KeyStyle::Relative));
        assert_eq!(
            keys(walk),
            vec![
                ("a.css".to_string(), 0),
                ("dir".to_string(), 0),
                ("dir/b.css".to_string(), 1),
                ("dir/sub".to_string(), 1),
                ("dir/sub/c.css".to_string(), 2),
                ("empty".to_string(), 0),
            ]
        );
    }

    #[test]
    fn keys_are_relative_to_the_walk_root() {
        let walk = RecursiveWalk::new(DirectoryIterator::new(fs(), "dir", KeyStyle::Relative));
        let got: Vec<String> = keys(walk).into_iter().map(|(k, _)| k).collect();
        assert_eq!(got, vec!["b.css", "sub", "sub/c.css"]);
    }

    #[test]
    fn glob_keys_mark_directories() {
        let walk = RecursiveWalk::new(DirectoryIterator::new(fs(), "dir", KeyStyle::Glob));
        let got: Vec<String> = keys(walk).into_iter().map(|(k, _)| k).collect();
        assert_eq!(got, vec!["/dir/b.css", "/dir/sub/", "/dir/sub/c.css"]);
    }

    #[test]
    fn max_depth_stops_descent() {
        let walk = RecursiveWalk::new(DirectoryIterator::new(fs(), "", KeyStyle::Relative)).max_depth(Some(0));
        let got: Vec<String> = keys(walk).into_iter().map(|(k, _)| k).collect();
        assert_eq!(got, vec!["a.css", "dir", "empty"]);
    }

    #[test]
    fn children_come_from_the_cache() {
        let mut it = DirectoryIterator::new(fs(), "", KeyStyle::Relative);
        assert!(!it.is_fetched());
        it.seek(1).unwrap();
        assert!(it.is_fetched());
        assert!(it.has_children().unwrap());

        let children = it.get_children().unwrap();
        assert!(children.is_fetched(), "child cursor is pre-seeded");
        assert_eq!(children.current().unwrap().path(), "dir/b.css");
        assert_eq!(it.cache.borrow().len(), 2);

        it.rewind().unwrap();
        assert_eq!(it.current().unwrap().path(), "a.css");
        assert_eq!(it.cache.borrow().len(), 2, "rewinding does not list again");
    }

    #[test]
    fn empty_directories_have_no_children() {
        let mut it = DirectoryIterator::new(fs(), "", KeyStyle::Relative);
        it.seek(2).unwrap();
        assert_eq!(it.current().unwrap().path(), "empty");
        assert!(!it.has_children().unwrap());
    }

    #[test]
    fn seeking_past_the_end_fails() {
        let mut it = DirectoryIterator::new(fs(), "", KeyStyle::Relative);
        assert!(matches!(it.seek(10), Err(VfindError::InvalidArgument(_))));
    }

    #[test]
    fn missing_root_yields_one_error() {
        let mut walk = RecursiveWalk::new(DirectoryIterator::new(fs(), "nope", KeyStyle::Relative));
        assert!(matches!(walk.next(), Some(Err(VfindError::NotFound(_)))));
        assert!(walk.next().is_none());
    }
}
