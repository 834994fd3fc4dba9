//! The pattern mini-language shared by the name, path and content filters.
//!
//! A pattern is one of:
//! - a **regex**, when wrapped in a delimiter pair such as `/.../` or
//!   `~...~`, optionally followed by flags (`/\.css$/i`)
//! - a **glob**, when it contains `*`, `?`, `[` or `{`
//! - a **literal** otherwise
//!
//! Literals mean exact equality for names and substring search for paths
//! and file contents. Content patterns are never globs.

use regex::{Regex, RegexBuilder};

use crate::error::{Result, VfindError};
use crate::glob;

/// Trailing flag characters accepted after a closing delimiter.
const REGEX_FLAGS: &str = "imsxuADUn";

/// Asymmetric delimiter pairs.
const BRACKET_DELIMITERS: [(char, char); 4] = [('{', '}'), ('(', ')'), ('[', ']'), ('<', '>')];

/// A compiled pattern, built once and reused for every candidate.
#[derive(Debug, Clone)]
pub enum Pattern {
    Regex(Regex),
    Glob(Regex),
    /// Matches when the text is exactly this string.
    Exact(String),
    /// Matches when the text contains this string.
    Substring(String),
}

impl Pattern {
    /// Compile a pattern tested against a basename.
    pub fn for_name(s: &str) -> Result<Self> {
        if let Some(re) = parse_delimited(s)? {
            Ok(Self::Regex(re))
        } else if glob::is_glob(s) {
            Ok(Self::Glob(glob::glob_to_regex(s)?))
        } else {
            Ok(Self::Exact(s.to_string()))
        }
    }

    /// Compile a pattern tested against a relative path.
    pub fn for_path(s: &str) -> Result<Self> {
        if let Some(re) = parse_delimited(s)? {
            Ok(Self::Regex(re))
        } else if glob::is_glob(s) {
            Ok(Self::Glob(glob::glob_to_regex(&s.replace('\\', "/"))?))
        } else {
            Ok(Self::Substring(s.replace('\\', "/")))
        }
    }

    /// Compile a pattern tested against file contents.
    pub fn for_content(s: &str) -> Result<Self> {
        match parse_delimited(s)? {
            Some(re) => Ok(Self::Regex(re)),
            None => Ok(Self::Substring(s.to_string())),
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Regex(re) | Self::Glob(re) => re.is_match(text),
            Self::Exact(s) => text == s,
            Self::Substring(s) => text.contains(s.as_str()),
        }
    }
}

/// Whether `s` is written as a delimited regular expression.
pub fn is_regex(s: &str) -> bool {
    split_delimited(s).is_some()
}

/// Split `/body/flags` into `(body, flags)`.
///
/// The shortest candidate of at least three characters whose remainder is
/// made only of flag letters wins, so `/usr/bin` is not mistaken for a
/// regex with an `n` flag.
fn split_delimited(s: &str) -> Option<(&str, &str)> {
    if s.chars().count() < 3 {
        return None;
    }
    let boundaries = s.char_indices().map(|(i, _)| i).skip(3).chain(std::iter::once(s.len()));
    for end in boundaries {
        let (candidate, flags) = s.split_at(end);
        if !flags.chars().all(|c| REGEX_FLAGS.contains(c)) {
            continue;
        }

        let start = candidate.chars().next()?;
        let stop = candidate.chars().next_back()?;
        let delimited = if start == stop {
            !(start.is_alphanumeric() || matches!(start, '*' | '?' | ' ' | '\\'))
        } else {
            BRACKET_DELIMITERS.contains(&(start, stop))
        };

        return delimited.then(|| {
            let body = &candidate[start.len_utf8()..candidate.len() - stop.len_utf8()];
            (body, flags)
        });
    }
    None
}

fn parse_delimited(s: &str) -> Result<Option<Regex>> {
    let Some((body, flags)) = split_delimited(s) else {
        return Ok(None);
    };

    let source = if flags.contains('A') {
        format!("^(?:{body})")
    } else {
        body.to_string()
    };

    RegexBuilder::new(&source)
        .case_insensitive(flags.contains('i'))
        .multi_line(flags.contains('m'))
        .dot_matches_new_line(flags.contains('s'))
        .ignore_whitespace(flags.contains('x'))
        .swap_greed(flags.contains('U'))
        .build()
        .map(Some)
        .map_err(|e| VfindError::InvalidPattern(format!("{s}: {e}")))
}

/// OR of positive patterns, AND NOT of negative ones.
///
/// With no positive patterns everything passes the first half.
pub(crate) fn accepts(text: &str, include: &[Pattern], exclude: &[Pattern]) -> bool {
    if exclude.iter().any(|p| p.is_match(text)) {
        return false;
    }
    include.is_empty() || include.iter().any(|p| p.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_delimited_regexes() {
        assert!(is_regex("/foo/"));
        assert!(is_regex("/foo/i"));
        assert!(is_regex("~^a.*b$~"));
        assert!(is_regex("{foo}"));
        assert!(!is_regex("foo"));
        assert!(!is_regex("*.css*"));
        assert!(!is_regex("/usr/bin"));
        assert!(!is_regex("abca"));
        assert!(!is_regex("//"));
    }

    #[test]
    fn regex_flags_apply() {
        let p = Pattern::for_name("/STYLE/i").unwrap();
        assert!(p.is_match("style.css"));

        let anchored = Pattern::for_name("/css/A").unwrap();
        assert!(!anchored.is_match("a.css"));
        assert!(anchored.is_match("css.a"));
    }

    #[test]
    fn name_literals_are_exact() {
        let p = Pattern::for_name("script.js").unwrap();
        assert!(p.is_match("script.js"));
        assert!(!p.is_match("myscript.js"));
    }

    #[test]
    fn path_literals_are_substrings() {
        let p = Pattern::for_path("sub").unwrap();
        assert!(p.is_match("dir/sub/c.css"));
        assert!(!p.is_match("dir/c.css"));
    }

    #[test]
    fn content_patterns_are_never_globs() {
        let p = Pattern::for_content("a*b").unwrap();
        assert!(p.is_match("xa*by"));
        assert!(!p.is_match("aXXb"));
    }

    #[test]
    fn invalid_regex_is_reported() {
        assert!(matches!(Pattern::for_name("/(unclosed/"), Err(VfindError::InvalidPattern(_))));
    }

    #[test]
    fn include_or_exclude_and_not() {
        let include = [Pattern::for_name("*.css").unwrap(), Pattern::for_name("script.js").unwrap()];
        let exclude = [Pattern::for_name("*style.*").unwrap()];
        assert!(accepts("a.css", &include, &exclude));
        assert!(accepts("script.js", &include, &exclude));
        assert!(!accepts("style.css", &include, &exclude));
        assert!(!accepts("other.js", &include, &exclude));
        assert!(accepts("anything", &[], &[]));
    }
}
