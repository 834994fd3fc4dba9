use std::cmp::Ordering;
use std::collections::HashSet;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::append::AppendIterator;
use crate::comparator::{DateComparator, NumberComparator};
use crate::error::{Result, VfindError};
use crate::filesystem::Filesystem;
use crate::filters::{
    ContentFilter, CustomFilter, DateRangeFilter, DepthRange, DepthRangeFilter, ExcludeDirectoryFilter,
    FileTypeFilter, FilterIter, Mode, NameFilter, PathFilter, Pipeline, Predicate, SizeRangeFilter,
};
use crate::glob;
use crate::handler::Handler;
use crate::path;
use crate::sort::{SortBy, SortableIterator};
use crate::walker::{DirectoryIterator, KeyStyle, RecursiveWalk};

/// Directory names hidden by [`Finder::ignore_vcs`].
pub const VCS_DIRECTORIES: &[&str] =
    &[".svn", "_svn", "CVS", "_darcs", ".arch-params", ".monotone", ".bzr", ".git", ".hg"];

// ---------------------------------------------------------------------------
// Finder
// ---------------------------------------------------------------------------

/// Builds and runs a directory query.
///
/// Created via [`vfind::find()`](crate::find) or
/// [`Filesystem::finder`]. Configure with chained builder methods, choose
/// where to look with [`in_dirs`](Finder::in_dirs) and/or
/// [`append`](Finder::append), then iterate.
///
/// Repeated calls accumulate: two `name` patterns are alternatives, two
/// `in_dirs` calls search both sets of directories. Mode setters
/// (`files`, `directories`) override each other.
///
/// Nothing touches the filesystem until iteration starts, except root
/// resolution in `in_dirs`/`append_paths`. Results stream one at a time
/// unless a sort is configured, which reads the whole tree first.
///
/// # Example
///
/// ```rust
/// use vfind::{Filesystem, MemoryAdapter};
///
/// let mem = MemoryAdapter::new();
/// mem.write_str("a.css", "").unwrap();
/// mem.write_str("dir/b.css", "").unwrap();
/// mem.write_str("dir/sub/c.css", "").unwrap();
/// let fs = Filesystem::new(mem);
///
/// let found: Vec<String> = vfind::find(&fs)
///     .files()
///     .name("*.css")
///     .depth("< 1")
///     .in_dirs([""])
///     .unwrap()
///     .iter()
///     .unwrap()
///     .map(|h| h.unwrap().path().to_string())
///     .collect();
///
/// assert_eq!(found, vec!["a.css"]);
/// ```
#[derive(Clone)]
pub struct Finder {
    fs:               Filesystem,
    mode:             Mode,
    names:            Vec<String>,
    not_names:        Vec<String>,
    paths:            Vec<String>,
    not_paths:        Vec<String>,
    contains:         Vec<String>,
    not_contains:     Vec<String>,
    sizes:            Vec<String>,
    dates:            Vec<String>,
    depths:           Vec<String>,
    exclude:          Vec<String>,
    ignore_dot_files: bool,
    ignore_vcs:       bool,
    sort:             Option<SortBy>,
    filters:          Vec<Predicate>,
    dirs:             Vec<String>,
    appended:         Vec<Appended>,
}

#[derive(Clone)]
enum Appended {
    Handlers(Vec<Handler>),
    Finder(Box<Finder>),
}

impl Finder {
    /// Create a finder over `fs` with the defaults: files and directories,
    /// dot files and VCS directories hidden, no sort, no roots yet.
    pub fn new(fs: Filesystem) -> Self {
        Self {
            fs,
            mode:             Mode::All,
            names:            Vec::new(),
            not_names:        Vec::new(),
            paths:            Vec::new(),
            not_paths:        Vec::new(),
            contains:         Vec::new(),
            not_contains:     Vec::new(),
            sizes:            Vec::new(),
            dates:            Vec::new(),
            depths:           Vec::new(),
            exclude:          Vec::new(),
            ignore_dot_files: true,
            ignore_vcs:       true,
            sort:             None,
            filters:          Vec::new(),
            dirs:             Vec::new(),
            appended:         Vec::new(),
        }
    }

    /// The filesystem this finder searches.
    pub fn filesystem(&self) -> &Filesystem {
        &self.fs
    }

    // ── Mode ──────────────────────────────────────────────────────────────

    /// Only yield directories.
    pub fn directories(mut self) -> Self {
        self.mode = Mode::Directories;
        self
    }

    /// Only yield files.
    pub fn files(mut self) -> Self {
        self.mode = Mode::Files;
        self
    }

    /// Set the entry type to yield directly. The last mode set wins.
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    // ── Patterns ──────────────────────────────────────────────────────────

    /// Keep entries whose basename matches `pattern` (glob, `/regex/` or
    /// literal). Several `name` patterns are alternatives.
    pub fn name(mut self, pattern: impl Into<String>) -> Self {
        self.names.push(pattern.into());
        self
    }

    /// Drop entries whose basename matches `pattern`.
    pub fn not_name(mut self, pattern: impl Into<String>) -> Self {
        self.not_names.push(pattern.into());
        self
    }

    /// Keep entries whose path below the search root matches `pattern`.
    /// Literals match as substrings.
    pub fn path(mut self, pattern: impl Into<String>) -> Self {
        self.paths.push(pattern.into());
        self
    }

    /// Drop entries whose path below the search root matches `pattern`.
    pub fn not_path(mut self, pattern: impl Into<String>) -> Self {
        self.not_paths.push(pattern.into());
        self
    }

    /// Keep files whose contents match `pattern` (substring or `/regex/`).
    /// Directories never match a content pattern.
    pub fn contains(mut self, pattern: impl Into<String>) -> Self {
        self.contains.push(pattern.into());
        self
    }

    /// Drop files whose contents match `pattern`. Unreadable files are
    /// dropped too.
    pub fn not_contains(mut self, pattern: impl Into<String>) -> Self {
        self.not_contains.push(pattern.into());
        self
    }

    // ── Comparators ───────────────────────────────────────────────────────

    /// Constrain file size, e.g. `"> 10k"`. All size tests must pass.
    pub fn size(mut self, expr: impl Into<String>) -> Self {
        self.sizes.push(expr.into());
        self
    }

    /// Constrain modification time, e.g. `"since yesterday"`. All date
    /// tests must pass.
    pub fn date(mut self, expr: impl Into<String>) -> Self {
        self.dates.push(expr.into());
        self
    }

    /// Constrain depth below the search root, e.g. `"< 2"`. Entries
    /// directly in the root are at depth 0.
    ///
    /// A later expression replaces an earlier one for the same bound
    /// rather than narrowing it; see [`DepthRange`].
    pub fn depth(mut self, expr: impl Into<String>) -> Self {
        self.depths.push(expr.into());
        self
    }

    // ── Exclusions ────────────────────────────────────────────────────────

    /// Skip directories (and everything below them). Plain names match a
    /// directory name exactly; names containing `/` match relative paths.
    pub fn exclude<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Hide entries with any path segment starting with a dot. On by
    /// default.
    pub fn ignore_dot_files(mut self, yes: bool) -> Self {
        self.ignore_dot_files = yes;
        self
    }

    /// Hide version control directories ([`VCS_DIRECTORIES`]). On by
    /// default.
    pub fn ignore_vcs(mut self, yes: bool) -> Self {
        self.ignore_vcs = yes;
        self
    }

    /// Add a predicate; entries for which it returns `false` are dropped.
    /// Predicates run in the order they were added.
    pub fn filter(mut self, predicate: impl Fn(&mut Handler) -> bool + 'static) -> Self {
        self.filters.push(Rc::new(predicate));
        self
    }

    // ── Sorting ───────────────────────────────────────────────────────────

    /// Sort with a custom comparator.
    pub fn sort(self, cmp: impl Fn(&Handler, &Handler) -> Ordering + 'static) -> Self {
        self.sort_by(SortBy::custom(cmp))
    }

    /// Sort each root's results. Replaces any earlier sort.
    pub fn sort_by(mut self, sort: SortBy) -> Self {
        self.sort = Some(sort);
        self
    }

    /// By path, byte-wise.
    pub fn sort_by_name(self) -> Self {
        self.sort_by(SortBy::Name)
    }

    /// Directories first, then files, each group by name.
    pub fn sort_by_type(self) -> Self {
        self.sort_by(SortBy::Type)
    }

    /// Oldest modification time first.
    pub fn sort_by_time(self) -> Self {
        self.sort_by(SortBy::Time)
    }

    // ── Sources ───────────────────────────────────────────────────────────

    /// Search these directories. Each entry is either an existing
    /// directory or a glob (`"src/*"`, `"**/tests"`) matching at least one
    /// directory. Resolved directories add to those of earlier calls.
    ///
    /// # Errors
    ///
    /// [`VfindError::NotFound`] when an entry names nothing and matches
    /// nothing; [`VfindError::NotADirectory`] for an existing file.
    pub fn in_dirs<I, S>(mut self, dirs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for dir in dirs {
            let resolved = self.resolve_dirs(dir.as_ref())?;
            self.dirs.extend(resolved);
        }
        Ok(self)
    }

    /// Yield these handlers after the searched directories. Appended
    /// handlers are not filtered.
    pub fn append<I>(mut self, handlers: I) -> Self
    where
        I: IntoIterator<Item = Handler>,
    {
        self.appended.push(Appended::Handlers(handlers.into_iter().collect()));
        self
    }

    /// Yield another query's results after this one's. The other query
    /// runs lazily, when iteration reaches it.
    pub fn append_finder(mut self, other: Finder) -> Self {
        self.appended.push(Appended::Finder(Box::new(other)));
        self
    }

    /// Resolve paths to handlers through this finder's filesystem and
    /// append them.
    pub fn append_paths<I, S>(self, paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let handlers = paths
            .into_iter()
            .map(|p| self.fs.get(p.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.append(handlers))
    }

    fn resolve_dirs(&self, dir: &str) -> Result<Vec<String>> {
        let normalized = path::normalize(dir);

        if self.fs.has(&normalized)? {
            if self.fs.get(&normalized)?.is_dir() {
                return Ok(vec![normalized]);
            }
            return Err(VfindError::NotADirectory(normalized));
        }

        if !glob::is_glob(&normalized) {
            return Err(VfindError::NotFound(dir.to_string()));
        }

        let (mount, rest) = path::split_mount(&normalized);
        let base_rest = glob::static_prefix(rest);
        let base = match mount {
            Some(m) => format!("{m}://{base_rest}"),
            None => base_rest.to_string(),
        };
        if !self.fs.has(&base)? || !self.fs.get(&base)?.is_dir() {
            return Err(VfindError::NotFound(dir.to_string()));
        }

        let matcher = glob::glob_to_regex(&format!("/{rest}"))?;
        let limit = (!rest.contains("**") && !rest.contains('{'))
            .then(|| segments(rest).saturating_sub(segments(base_rest) + 1));

        let walk = RecursiveWalk::new(DirectoryIterator::new(self.fs.clone(), &base, KeyStyle::Glob)).max_depth(limit);
        let mut found = Vec::new();
        for entry in walk {
            let entry = entry?;
            if !entry.handler.is_dir() {
                continue;
            }
            if matcher.is_match(&entry.key) || matcher.is_match(entry.key.trim_end_matches('/')) {
                found.push(entry.handler.path().to_string());
            }
        }

        if found.is_empty() {
            return Err(VfindError::NotFound(dir.to_string()));
        }
        log::debug!("glob {:?} resolved to {} directories", dir, found.len());
        Ok(found)
    }

    // ── Execute ───────────────────────────────────────────────────────────

    /// Build the pipeline and start iterating.
    ///
    /// Each root is walked independently, so overlapping roots (`"dir"`
    /// and `"dir/sub"`) yield a path once per root that reaches it.
    /// [`count`](Finder::count) and [`to_map`](Finder::to_map) collapse
    /// those duplicates.
    ///
    /// # Errors
    ///
    /// Invalid patterns or comparator expressions fail here. Without any
    /// `in_dirs`/`append` call the filesystem root is searched; if the
    /// root cannot be searched (a [`MountManager`](crate::MountManager)
    /// has none) this is a [`VfindError::Logic`] error.
    pub fn iter(&self) -> Result<FinderIter> {
        let mut dirs = self.dirs.clone();
        if dirs.is_empty() && self.appended.is_empty() {
            dirs = self.resolve_dirs("").map_err(|e| {
                VfindError::Logic(format!(
                    "cannot search the filesystem root ({e}); call in_dirs() or append() before iterating"
                ))
            })?;
        }

        let stages = self.compile()?;
        log::debug!(
            "finder: {} root(s), {} appended source(s), sort: {:?}",
            dirs.len(),
            self.appended.len(),
            self.sort
        );

        if dirs.len() == 1 && self.appended.is_empty() {
            return Ok(FinderIter::single(self.search_in_directory(&dirs[0], &stages)));
        }

        let mut composite = AppendIterator::new();
        for dir in &dirs {
            composite.append(self.search_in_directory(dir, &stages).map(|r| r.map(|e| e.handler)));
        }
        for appended in &self.appended {
            match appended {
                Appended::Handlers(handlers) => composite.append(handlers.clone().into_iter().map(Ok)),
                Appended::Finder(finder) => {
                    let finder = Finder::clone(finder);
                    composite.append(std::iter::once(finder).flat_map(|f| -> Box<dyn Iterator<Item = Result<Handler>>> {
                        match f.iter() {
                            Ok(it) => Box::new(it),
                            Err(e) => Box::new(std::iter::once(Err(e))),
                        }
                    }));
                }
            }
        }
        Ok(FinderIter { inner: Inner::Many(composite) })
    }

    /// Number of distinct results. Runs the whole query.
    ///
    /// Equal to `to_map()?.len()`: a path reached from two overlapping
    /// roots counts once.
    pub fn count(&self) -> Result<usize> {
        let mut seen = HashSet::new();
        for handler in self.iter()? {
            seen.insert(handler?.path().to_string());
        }
        Ok(seen.len())
    }

    /// Whether the query yields anything. Stops at the first result.
    pub fn has_results(&self) -> Result<bool> {
        Ok(self.iter()?.next().transpose()?.is_some())
    }

    /// All results keyed by path, in iteration order.
    pub fn to_map(&self) -> Result<IndexMap<String, Handler>> {
        let mut map = IndexMap::new();
        for handler in self.iter()? {
            let handler = handler?;
            map.insert(handler.path().to_string(), handler);
        }
        Ok(map)
    }

    /// Compile every configured pattern and comparator once.
    fn compile(&self) -> Result<Stages> {
        let mut exclude = self.exclude.clone();
        if self.ignore_vcs {
            exclude.extend(VCS_DIRECTORIES.iter().map(|d| d.to_string()));
        }
        let mut not_paths = self.not_paths.clone();
        if self.ignore_dot_files {
            not_paths.push(PathFilter::dot_files_pattern().to_string());
        }

        let depths = self
            .depths
            .iter()
            .map(|d| d.parse::<NumberComparator>())
            .collect::<Result<Vec<_>>>()?;
        let sizes = self
            .sizes
            .iter()
            .map(|s| s.parse::<NumberComparator>())
            .collect::<Result<Vec<_>>>()?;
        let dates = self
            .dates
            .iter()
            .map(|d| d.parse::<DateComparator>())
            .collect::<Result<Vec<_>>>()?;

        let has_names = !self.names.is_empty() || !self.not_names.is_empty();
        let has_paths = !self.paths.is_empty() || !not_paths.is_empty();
        let has_contents = !self.contains.is_empty() || !self.not_contains.is_empty();

        Ok(Stages {
            exclude: (!exclude.is_empty())
                .then(|| ExcludeDirectoryFilter::new(&exclude).map(Rc::new))
                .transpose()?,
            depth: DepthRange::from_comparators(&depths),
            mode: self.mode,
            names: has_names
                .then(|| NameFilter::new(&self.names, &self.not_names).map(Rc::new))
                .transpose()?,
            paths: has_paths
                .then(|| PathFilter::new(&self.paths, &not_paths).map(Rc::new))
                .transpose()?,
            contents: has_contents
                .then(|| ContentFilter::new(&self.contains, &self.not_contains).map(Rc::new))
                .transpose()?,
            sizes: (!sizes.is_empty()).then(|| Rc::new(SizeRangeFilter(sizes))),
            dates: (!dates.is_empty()).then(|| Rc::new(DateRangeFilter(dates))),
            custom: (!self.filters.is_empty()).then(|| Rc::new(CustomFilter(self.filters.clone()))),
        })
    }

    /// The pipeline for one root, cheapest stages first.
    fn search_in_directory(&self, dir: &str, stages: &Stages) -> Pipeline {
        let mut walk = RecursiveWalk::new(DirectoryIterator::new(self.fs.clone(), dir, KeyStyle::Relative))
            .max_depth(stages.depth.walk_limit());
        if let Some(exclude) = &stages.exclude {
            walk = walk.prune_with(Rc::clone(exclude));
        }

        let mut pipeline: Pipeline = Box::new(walk);
        if !stages.depth.is_unbounded() {
            pipeline = FilterIter::wrap(pipeline, DepthRangeFilter(stages.depth));
        }
        if stages.mode != Mode::All {
            pipeline = FilterIter::wrap(pipeline, FileTypeFilter(stages.mode));
        }
        if let Some(f) = &stages.names {
            pipeline = FilterIter::wrap(pipeline, Rc::clone(f));
        }
        if let Some(f) = &stages.paths {
            pipeline = FilterIter::wrap(pipeline, Rc::clone(f));
        }
        if let Some(f) = &stages.contents {
            pipeline = FilterIter::wrap(pipeline, Rc::clone(f));
        }
        if let Some(f) = &stages.sizes {
            pipeline = FilterIter::wrap(pipeline, Rc::clone(f));
        }
        if let Some(f) = &stages.dates {
            pipeline = FilterIter::wrap(pipeline, Rc::clone(f));
        }
        if let Some(f) = &stages.custom {
            pipeline = FilterIter::wrap(pipeline, Rc::clone(f));
        }
        if let Some(sort) = &self.sort {
            pipeline = Box::new(SortableIterator::new(pipeline, sort.clone()));
        }
        pipeline
    }
}

fn segments(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.split('/').count()
    }
}

/// Compiled filter stages, shared by the pipelines of every root.
struct Stages {
    exclude: Option<Rc<ExcludeDirectoryFilter>>,
    depth: DepthRange,
    mode: Mode,
    names: Option<Rc<NameFilter>>,
    paths: Option<Rc<PathFilter>>,
    contents: Option<Rc<ContentFilter>>,
    sizes: Option<Rc<SizeRangeFilter>>,
    dates: Option<Rc<DateRangeFilter>>,
    custom: Option<Rc<CustomFilter>>,
}

// ---------------------------------------------------------------------------
// FinderIter
// ---------------------------------------------------------------------------

/// Streaming results of a [`Finder`].
///
/// Traversal errors (a directory that cannot be listed) are yielded once
/// and end the iteration of that root.
pub struct FinderIter {
    inner: Inner,
}

enum Inner {
    Single(Pipeline),
    Many(AppendIterator<Result<Handler>>),
    Failed(Option<VfindError>),
}

impl FinderIter {
    fn single(pipeline: Pipeline) -> Self {
        Self { inner: Inner::Single(pipeline) }
    }
}

impl Iterator for FinderIter {
    type Item = Result<Handler>;

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            Inner::Single(pipeline) => pipeline.next().map(|r| r.map(|e| e.handler)),
            Inner::Many(composite) => composite.next(),
            Inner::Failed(err) => err.take().map(Err),
        }
    }
}

impl IntoIterator for &Finder {
    type Item = Result<Handler>;
    type IntoIter = FinderIter;

    /// Like [`Finder::iter`], but a failure to build the pipeline becomes
    /// the first (and only) item.
    fn into_iter(self) -> FinderIter {
        self.iter().unwrap_or_else(|e| FinderIter { inner: Inner::Failed(Some(e)) })
    }
}

impl IntoIterator for Finder {
    type Item = Result<Handler>;
    type IntoIter = FinderIter;

    fn into_iter(self) -> FinderIter {
        (&self).into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAdapter;

    fn fs() -> Filesystem {
        let mem = MemoryAdapter::new();
        mem.write_str("a/sub/x.txt", "").unwrap();
        mem.write_str("b/sub/y.txt", "").unwrap();
        mem.write_str("a/deep/sub/z.txt", "").unwrap();
        Filesystem::new(mem)
    }

    #[test]
    fn single_star_stays_at_its_depth() {
        let finder = Finder::new(fs());
        assert_eq!(finder.resolve_dirs("*/sub").unwrap(), vec!["a/sub", "b/sub"]);
    }

    #[test]
    fn double_star_crosses_directories() {
        let finder = Finder::new(fs());
        assert_eq!(
            finder.resolve_dirs("**/sub").unwrap(),
            vec!["a/sub", "a/deep/sub", "b/sub"]
        );
    }

    #[test]
    fn literal_directories_skip_glob_matching() {
        let finder = Finder::new(fs());
        assert_eq!(finder.resolve_dirs("/a/deep/").unwrap(), vec!["a/deep"]);
        assert!(matches!(finder.resolve_dirs("a/sub/x.txt"), Err(VfindError::NotADirectory(_))));
    }

    #[test]
    fn segments_of_the_root() {
        assert_eq!(segments(""), 0);
        assert_eq!(segments("a/b"), 2);
    }
}
