//! Single-purpose pipeline stages.
//!
//! Each stage implements [`Filter`] and is wrapped around the previous
//! stage with [`FilterIter`]. Errors coming up from the walk pass through
//! every stage untouched; only `Ok` entries are tested.

use std::collections::HashSet;
use std::rc::Rc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::comparator::{DateComparator, NumberComparator, Operator};
use crate::entry::Entry;
use crate::error::{Result, VfindError};
use crate::handler::Handler;
use crate::path;
use crate::pattern::{accepts, Pattern};

/// A lazily evaluated sequence of candidates.
pub type Pipeline = Box<dyn Iterator<Item = Result<Entry>>>;

/// A user supplied predicate over handlers.
pub type Predicate = Rc<dyn Fn(&mut Handler) -> bool>;

/// Decides whether an entry stays in the pipeline.
///
/// Takes the entry mutably so stages can fill the handler's metadata
/// cache as they go; later stages and the caller reuse what was fetched.
pub trait Filter {
    fn accept(&self, entry: &mut Entry) -> bool;
}

impl<F: Filter + ?Sized> Filter for Rc<F> {
    fn accept(&self, entry: &mut Entry) -> bool {
        (**self).accept(entry)
    }
}

/// Wraps a pipeline with one more filter stage.
pub struct FilterIter {
    inner: Pipeline,
    filter: Box<dyn Filter>,
}

impl FilterIter {
    pub fn new(inner: Pipeline, filter: impl Filter + 'static) -> Self {
        Self { inner, filter: Box::new(filter) }
    }

    /// Shorthand returning the boxed pipeline.
    pub fn wrap(inner: Pipeline, filter: impl Filter + 'static) -> Pipeline {
        Box::new(Self::new(inner, filter))
    }
}

impl Iterator for FilterIter {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(mut entry) => {
                    if self.filter.accept(&mut entry) {
                        return Some(Ok(entry));
                    }
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Structural stages
// ---------------------------------------------------------------------------

/// Which kinds of entries a query yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    All,
    Files,
    Directories,
}

pub struct FileTypeFilter(pub Mode);

impl Filter for FileTypeFilter {
    fn accept(&self, entry: &mut Entry) -> bool {
        match self.0 {
            Mode::All => true,
            Mode::Files => entry.handler.is_file(),
            Mode::Directories => entry.handler.is_dir(),
        }
    }
}

/// Rejects excluded directories and everything below them.
///
/// Plain names (`"vendor"`) match a directory's own name exactly; used as
/// the walk's prune filter, a rejected directory is never entered, so its
/// whole subtree disappears. Names containing `/` (`"dir/sub"`) are
/// matched as whole path segments against the directory's relative path,
/// or a file's relative dirname.
pub struct ExcludeDirectoryFilter {
    names: HashSet<String>,
    pattern: Option<Regex>,
}

impl ExcludeDirectoryFilter {
    pub fn new<S: AsRef<str>>(dirs: &[S]) -> Result<Self> {
        let mut names = HashSet::new();
        let mut patterns = Vec::new();
        for dir in dirs {
            let dir = dir.as_ref().trim_end_matches('/');
            if dir.contains('/') {
                patterns.push(regex::escape(dir));
            } else {
                names.insert(dir.to_string());
            }
        }

        let pattern = if patterns.is_empty() {
            None
        } else {
            let source = format!("(?:^|/)(?:{})(?:/|$)", patterns.join("|"));
            Some(Regex::new(&source).map_err(|e| VfindError::InvalidPattern(e.to_string()))?)
        };
        Ok(Self { names, pattern })
    }
}

impl Filter for ExcludeDirectoryFilter {
    fn accept(&self, entry: &mut Entry) -> bool {
        let is_dir = entry.handler.is_dir();
        if is_dir && self.names.contains(entry.handler.basename()) {
            return false;
        }
        match &self.pattern {
            Some(re) => {
                let subject = if is_dir { entry.relative.as_str() } else { path::dirname(&entry.relative) };
                !re.is_match(subject)
            }
            None => true,
        }
    }
}

/// Inclusive depth bounds built from comparator expressions.
///
/// Each comparator overwrites the bound it talks about: `< 3` sets the
/// maximum, `> 0` sets the minimum, `== 2` sets both. A later comparator
/// for the same bound replaces an earlier one instead of narrowing it, so
/// `< 1` followed by `>= 1` leaves the empty range `[1, 0]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthRange {
    pub min: i64,
    pub max: i64,
}

impl Default for DepthRange {
    fn default() -> Self {
        Self { min: 0, max: i64::MAX }
    }
}

impl DepthRange {
    pub fn from_comparators(comparators: &[NumberComparator]) -> Self {
        let mut range = Self::default();
        for c in comparators {
            let target = i64::try_from(c.target).unwrap_or(i64::MAX);
            match c.operator {
                Operator::Gt => range.min = target.saturating_add(1),
                Operator::Ge => range.min = target,
                Operator::Lt => range.max = target - 1,
                Operator::Le => range.max = target,
                Operator::Eq | Operator::Ne => {
                    range.min = target;
                    range.max = target;
                }
            }
        }
        range
    }

    pub fn contains(&self, depth: usize) -> bool {
        let depth = i64::try_from(depth).unwrap_or(i64::MAX);
        self.min <= depth && depth <= self.max
    }

    /// The deepest level worth descending to, if bounded.
    pub fn walk_limit(&self) -> Option<usize> {
        match self.max {
            i64::MAX => None,
            max => Some(usize::try_from(max.max(0)).unwrap_or(usize::MAX)),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        *self == Self::default()
    }
}

pub struct DepthRangeFilter(pub DepthRange);

impl Filter for DepthRangeFilter {
    fn accept(&self, entry: &mut Entry) -> bool {
        self.0.contains(entry.depth)
    }
}

// ---------------------------------------------------------------------------
// Pattern stages
// ---------------------------------------------------------------------------

/// Tests the basename.
pub struct NameFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl NameFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: compile(include, Pattern::for_name)?,
            exclude: compile(exclude, Pattern::for_name)?,
        })
    }
}

impl Filter for NameFilter {
    fn accept(&self, entry: &mut Entry) -> bool {
        accepts(entry.handler.basename(), &self.include, &self.exclude)
    }
}

/// Tests the path relative to the walk root.
pub struct PathFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl PathFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: compile(include, Pattern::for_path)?,
            exclude: compile(exclude, Pattern::for_path)?,
        })
    }

    /// Hides every path with a segment starting with a dot.
    pub(crate) fn dot_files_pattern() -> &'static str {
        r"#(^|/)\..+(/|$)#"
    }
}

impl Filter for PathFilter {
    fn accept(&self, entry: &mut Entry) -> bool {
        let relative = entry.relative.replace('\\', "/");
        accepts(&relative, &self.include, &self.exclude)
    }
}

/// Tests file contents. Directories never pass; unreadable files are
/// dropped.
pub struct ContentFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl ContentFilter {
    pub fn new<S: AsRef<str>>(include: &[S], exclude: &[S]) -> Result<Self> {
        Ok(Self {
            include: compile(include, Pattern::for_content)?,
            exclude: compile(exclude, Pattern::for_content)?,
        })
    }
}

impl Filter for ContentFilter {
    fn accept(&self, entry: &mut Entry) -> bool {
        if self.include.is_empty() && self.exclude.is_empty() {
            return true;
        }
        if entry.handler.is_dir() {
            return false;
        }
        match entry.handler.read_to_string() {
            Ok(content) => accepts(&content, &self.include, &self.exclude),
            Err(e) => {
                log::trace!("dropping {:?}: {}", entry.handler.path(), e);
                false
            }
        }
    }
}

fn compile<S: AsRef<str>>(patterns: &[S], parse: fn(&str) -> Result<Pattern>) -> Result<Vec<Pattern>> {
    patterns.iter().map(|p| parse(p.as_ref())).collect()
}

// ---------------------------------------------------------------------------
// Metadata stages
// ---------------------------------------------------------------------------

/// File size must satisfy every comparator. Directories pass.
pub struct SizeRangeFilter(pub Vec<NumberComparator>);

impl Filter for SizeRangeFilter {
    fn accept(&self, entry: &mut Entry) -> bool {
        if !entry.handler.is_file() {
            return true;
        }
        match entry.handler.size(true) {
            Ok(size) => self.0.iter().all(|c| c.test(size)),
            Err(e) => {
                log::trace!("dropping {:?}: {}", entry.handler.path(), e);
                false
            }
        }
    }
}

/// Modification time must satisfy every comparator. An entry that no
/// longer exists is rejected even when its listed timestamp would pass.
pub struct DateRangeFilter(pub Vec<DateComparator>);

impl Filter for DateRangeFilter {
    fn accept(&self, entry: &mut Entry) -> bool {
        match entry.handler.exists() {
            Ok(true) => {}
            Ok(false) => {
                log::trace!("dropping {:?}: vanished", entry.handler.path());
                return false;
            }
            Err(e) => {
                log::trace!("dropping {:?}: {}", entry.handler.path(), e);
                return false;
            }
        }
        match entry.handler.timestamp(true) {
            Ok(ts) => self.0.iter().all(|c| c.test(ts)),
            Err(e) => {
                log::trace!("dropping {:?}: {}", entry.handler.path(), e);
                false
            }
        }
    }
}

/// User predicates, applied in registration order; all must pass.
pub struct CustomFilter(pub Vec<Predicate>);

impl Filter for CustomFilter {
    fn accept(&self, entry: &mut Entry) -> bool {
        self.0.iter().all(|predicate| predicate(&mut entry.handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::Filesystem;
    use crate::memory::MemoryAdapter;

    fn entry(fs: &Filesystem, path: &str, depth: usize) -> Entry {
        let handler = fs.get(path).unwrap();
        Entry { key: path.to_string(), relative: path.to_string(), handler, depth }
    }

    fn fs() -> Filesystem {
        let mem = MemoryAdapter::new();
        mem.write_str("js/app.js", "let color = 1;").unwrap();
        mem.write_str("j/x.js", "").unwrap();
        mem.write_str("dir/sub/deep.txt", "drop bear").unwrap();
        Filesystem::new(mem)
    }

    #[test]
    fn exclude_names_match_whole_directory_names() {
        let fs = fs();
        let filter = ExcludeDirectoryFilter::new(&["j"]).unwrap();
        assert!(filter.accept(&mut entry(&fs, "js", 0)));
        assert!(!filter.accept(&mut entry(&fs, "j", 0)));
    }

    #[test]
    fn exclude_paths_match_segments() {
        let fs = fs();
        let filter = ExcludeDirectoryFilter::new(&["dir/sub"]).unwrap();
        assert!(!filter.accept(&mut entry(&fs, "dir/sub", 1)));
        assert!(!filter.accept(&mut entry(&fs, "dir/sub/deep.txt", 2)));
        assert!(filter.accept(&mut entry(&fs, "dir", 0)));
    }

    #[test]
    fn depth_bounds_are_last_wins() {
        let lt1: NumberComparator = "< 1".parse().unwrap();
        let ge1: NumberComparator = ">= 1".parse().unwrap();
        let range = DepthRange::from_comparators(&[lt1, ge1]);
        assert_eq!(range, DepthRange { min: 1, max: 0 });
        assert!(!range.contains(0));
        assert!(!range.contains(1));

        let lt3: NumberComparator = "< 3".parse().unwrap();
        let lt1_again = DepthRange::from_comparators(&[lt3, lt1]);
        assert_eq!(lt1_again.max, 0, "later maximum replaces the earlier one");
    }

    #[test]
    fn depth_walk_limit() {
        assert_eq!(DepthRange::default().walk_limit(), None);
        let lt0: NumberComparator = "< 0".parse().unwrap();
        assert_eq!(DepthRange::from_comparators(&[lt0]).walk_limit(), Some(0));
    }

    #[test]
    fn content_filter_rejects_directories_and_reads_files() {
        let fs = fs();
        let filter = ContentFilter::new(&["color"], &["drop bear"]).unwrap();
        assert!(filter.accept(&mut entry(&fs, "js/app.js", 1)));
        assert!(!filter.accept(&mut entry(&fs, "dir/sub/deep.txt", 2)));
        assert!(!filter.accept(&mut entry(&fs, "js", 0)));
    }

    #[test]
    fn vanished_files_fail_content_filter() {
        let fs = fs();
        let mut e = entry(&fs, "js/app.js", 1);
        fs.delete("js/app.js").unwrap();
        let filter = ContentFilter::new(&["color"], &[]).unwrap();
        assert!(!filter.accept(&mut e));
    }

    #[test]
    fn vanished_entries_fail_date_filter() {
        let fs = fs();
        let filter = DateRangeFilter(vec!["since 1970-01-02".parse().unwrap()]);
        let mut kept = entry(&fs, "j/x.js", 1);
        let mut gone = entry(&fs, "js/app.js", 1);
        fs.delete("js/app.js").unwrap();
        assert!(filter.accept(&mut kept));
        assert!(!filter.accept(&mut gone));
    }

    #[test]
    fn size_filter_lets_directories_through() {
        let fs = fs();
        let filter = SizeRangeFilter(vec!["> 100".parse().unwrap()]);
        assert!(filter.accept(&mut entry(&fs, "dir", 0)));
        assert!(!filter.accept(&mut entry(&fs, "js/app.js", 1)));
    }
}
