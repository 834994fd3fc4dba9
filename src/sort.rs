use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crate::entry::Entry;
use crate::error::{Result, VfindError};
use crate::filters::Pipeline;
use crate::handler::Handler;

/// A caller supplied ordering over handlers.
pub type Comparator = Rc<dyn Fn(&Handler, &Handler) -> Ordering>;

/// How a query orders its results.
#[derive(Clone)]
pub enum SortBy {
    /// Lexical order of the full path.
    Name,
    /// Directories first, then lexical within each group.
    Type,
    /// Modification time, oldest first. Entries whose timestamp cannot be
    /// fetched sort as if modified at the epoch.
    Time,
    Custom(Comparator),
}

impl SortBy {
    pub fn custom(cmp: impl Fn(&Handler, &Handler) -> Ordering + 'static) -> Self {
        Self::Custom(Rc::new(cmp))
    }
}

impl FromStr for SortBy {
    type Err = VfindError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "type" => Ok(Self::Type),
            "time" => Ok(Self::Time),
            other => Err(VfindError::InvalidArgument(format!(
                "unknown sort {other:?}; expected name, type, time or a comparator"
            ))),
        }
    }
}

impl fmt::Debug for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => f.write_str("Name"),
            Self::Type => f.write_str("Type"),
            Self::Time => f.write_str("Time"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Materialises a pipeline and replays it in sorted order.
///
/// Nothing is pulled from the inner pipeline until the first call to
/// `next`, which then drains it completely: every directory below the
/// root is listed before the first result comes back. The sort is stable.
/// A traversal error is yielded in place of the results.
pub struct SortableIterator {
    inner: Option<Pipeline>,
    sort: SortBy,
    sorted: std::vec::IntoIter<Entry>,
}

impl SortableIterator {
    pub fn new(inner: Pipeline, sort: SortBy) -> Self {
        Self { inner: Some(inner), sort, sorted: Vec::new().into_iter() }
    }

    fn materialise(&mut self, inner: Pipeline) -> Result<()> {
        let mut entries = inner.collect::<Result<Vec<Entry>>>()?;
        match &self.sort {
            SortBy::Name => entries.sort_by(|a, b| a.handler.path().cmp(b.handler.path())),
            SortBy::Type => entries.sort_by(|a, b| {
                b.handler
                    .is_dir()
                    .cmp(&a.handler.is_dir())
                    .then_with(|| a.handler.path().cmp(b.handler.path()))
            }),
            SortBy::Time => {
                let mut keyed: Vec<(i64, Entry)> = entries
                    .into_iter()
                    .map(|mut e| (e.handler.timestamp(true).unwrap_or(0), e))
                    .collect();
                keyed.sort_by_key(|(ts, _)| *ts);
                entries = keyed.into_iter().map(|(_, e)| e).collect();
            }
            SortBy::Custom(cmp) => entries.sort_by(|a, b| cmp(&a.handler, &b.handler)),
        }
        self.sorted = entries.into_iter();
        Ok(())
    }
}

impl Iterator for SortableIterator {
    type Item = Result<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(inner) = self.inner.take() {
            if let Err(e) = self.materialise(inner) {
                return Some(Err(e));
            }
        }
        self.sorted.next().map(Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::Filesystem;
    use crate::memory::MemoryAdapter;
    use crate::walker::{DirectoryIterator, KeyStyle, RecursiveWalk};

    fn fs() -> Filesystem {
        let mem = MemoryAdapter::new();
        mem.write_with_timestamp("zeta.txt", b"z", 300).unwrap();
        mem.write_with_timestamp("b/inner.txt", b"i", 100).unwrap();
        mem.write_with_timestamp("alpha.txt", b"a", 200).unwrap();
        mem.touch("b", 400).unwrap();
        Filesystem::new(mem)
    }

    fn sorted(sort: SortBy) -> Vec<String> {
        let walk = RecursiveWalk::new(DirectoryIterator::new(fs(), "", KeyStyle::Relative));
        SortableIterator::new(Box::new(walk), sort)
            .map(|e| e.unwrap().handler.path().to_string())
            .collect()
    }

    #[test]
    fn sorts_by_name() {
        assert_eq!(sorted(SortBy::Name), vec!["alpha.txt", "b", "b/inner.txt", "zeta.txt"]);
    }

    #[test]
    fn sorts_directories_first() {
        assert_eq!(sorted(SortBy::Type), vec!["b", "alpha.txt", "b/inner.txt", "zeta.txt"]);
    }

    #[test]
    fn sorts_by_time() {
        assert_eq!(sorted(SortBy::Time), vec!["b/inner.txt", "alpha.txt", "zeta.txt", "b"]);
    }

    #[test]
    fn custom_comparator() {
        let by_len_desc = SortBy::custom(|a, b| b.path().len().cmp(&a.path().len()));
        assert_eq!(sorted(by_len_desc)[0], "b/inner.txt");
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        assert!(matches!("size".parse::<SortBy>(), Err(VfindError::InvalidArgument(_))));
        assert!(matches!("TYPE".parse::<SortBy>(), Ok(SortBy::Type)));
    }
}
