use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::filters::Mode;
use crate::finder::Finder;
use crate::sort::SortBy;

/// A query described as data, for loading from JSON, TOML or similar.
///
/// Every field is optional and maps onto the [`Finder`] method of the same
/// name; list fields call the method once per element. Apply it with
/// [`Finder::apply`].
///
/// ```rust
/// use vfind::{Filesystem, MemoryAdapter, Query};
///
/// let mem = MemoryAdapter::new();
/// mem.write_str("src/lib.rs", "").unwrap();
/// mem.write_str("src/notes.md", "").unwrap();
/// let fs = Filesystem::new(mem);
///
/// let query = Query { name: vec!["*.rs".into()], r#in: vec!["src".into()], ..Query::default() };
/// let finder = vfind::find(&fs).apply(&query).unwrap();
/// assert_eq!(finder.count().unwrap(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Query {
    pub mode: Option<Mode>,
    pub name: Vec<String>,
    pub not_name: Vec<String>,
    pub path: Vec<String>,
    pub not_path: Vec<String>,
    pub contains: Vec<String>,
    pub not_contains: Vec<String>,
    pub size: Vec<String>,
    pub date: Vec<String>,
    pub depth: Vec<String>,
    pub exclude: Vec<String>,
    pub ignore_dot_files: Option<bool>,
    pub ignore_vcs: Option<bool>,
    /// `"name"`, `"type"` or `"time"`.
    pub sort: Option<String>,
    /// Directories or globs to search.
    #[serde(rename = "in")]
    pub r#in: Vec<String>,
}

impl Finder {
    /// Apply every setting in `query` on top of this finder's own.
    ///
    /// # Errors
    ///
    /// Fails on an unknown sort name or when a directory in `in` cannot be
    /// resolved, as [`Finder::in_dirs`] would.
    pub fn apply(mut self, query: &Query) -> Result<Self> {
        if let Some(mode) = query.mode {
            self = self.mode(mode);
        }
        for p in &query.name {
            self = self.name(p.as_str());
        }
        for p in &query.not_name {
            self = self.not_name(p.as_str());
        }
        for p in &query.path {
            self = self.path(p.as_str());
        }
        for p in &query.not_path {
            self = self.not_path(p.as_str());
        }
        for p in &query.contains {
            self = self.contains(p.as_str());
        }
        for p in &query.not_contains {
            self = self.not_contains(p.as_str());
        }
        for expr in &query.size {
            self = self.size(expr.as_str());
        }
        for expr in &query.date {
            self = self.date(expr.as_str());
        }
        for expr in &query.depth {
            self = self.depth(expr.as_str());
        }
        self = self.exclude(query.exclude.iter().cloned());
        if let Some(yes) = query.ignore_dot_files {
            self = self.ignore_dot_files(yes);
        }
        if let Some(yes) = query.ignore_vcs {
            self = self.ignore_vcs(yes);
        }
        if let Some(sort) = &query.sort {
            self = self.sort_by(sort.parse::<SortBy>()?);
        }
        if !query.r#in.is_empty() {
            self = self.in_dirs(&query.r#in)?;
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VfindError;
    use crate::filesystem::Filesystem;
    use crate::memory::MemoryAdapter;

    fn fs() -> Filesystem {
        let mem = MemoryAdapter::new();
        mem.write_str("a.txt", "").unwrap();
        mem.write_str("dir/b.txt", "").unwrap();
        Filesystem::new(mem)
    }

    #[test]
    fn empty_query_changes_nothing() {
        let fs = fs();
        let applied = fs.finder().apply(&Query::default()).unwrap();
        assert_eq!(applied.count().unwrap(), fs.finder().count().unwrap());
    }

    #[test]
    fn unknown_sort_is_rejected() {
        let query = Query { sort: Some("size".into()), ..Query::default() };
        assert!(matches!(fs().finder().apply(&query), Err(VfindError::InvalidArgument(_))));
    }

    #[test]
    fn missing_directory_is_rejected() {
        let query = Query { r#in: vec!["nope".into()], ..Query::default() };
        assert!(matches!(fs().finder().apply(&query), Err(VfindError::NotFound(_))));
    }

    #[test]
    fn mode_and_depth_apply() {
        let query = Query { mode: Some(Mode::Files), depth: vec!["> 0".into()], ..Query::default() };
        let found: Vec<String> = fs()
            .finder()
            .apply(&query)
            .unwrap()
            .iter()
            .unwrap()
            .map(|h| h.unwrap().path().to_string())
            .collect();
        assert_eq!(found, vec!["dir/b.txt"]);
    }
}
