//! Glob to regular expression compiler.
//!
//! Supported syntax:
//! - `*` matches any run of characters except `/`
//! - `**` matches across directory boundaries; `**/` also matches nothing,
//!   so `a/**/b` matches `a/b` as well as `a/x/y/b`
//! - `?` matches a single character except `/`
//! - `[...]` character classes, negated with a leading `!` or `^`; a `]`
//!   directly after the opening bracket (or negation) is literal
//! - `{a,b,c}` alternation, nestable
//! - `\x` matches `x` literally
//!
//! Everything else matches itself. The resulting regex is anchored at both
//! ends. Compile once per pattern and reuse it for every candidate.
//!
//! ```rust
//! let re = vfind::glob::glob_to_regex("*.{css,js}").unwrap();
//! assert!(re.is_match("style.css"));
//! assert!(re.is_match("script.js"));
//! assert!(!re.is_match("dir/style.css"));
//! ```

use regex::Regex;

use crate::error::{Result, VfindError};

/// Characters that make a string a glob rather than a literal.
const WILDCARDS: &[char] = &['*', '?', '[', '{'];

/// Whether `s` contains any glob metacharacter.
pub fn is_glob(s: &str) -> bool {
    s.contains(WILDCARDS)
}

/// Compile a glob into an anchored [`Regex`].
pub fn glob_to_regex(glob: &str) -> Result<Regex> {
    let pattern = glob_to_pattern(glob)?;
    Regex::new(&pattern).map_err(|e| VfindError::InvalidPattern(format!("{glob}: {e}")))
}

/// Translate a glob into anchored regex source text.
pub fn glob_to_pattern(glob: &str) -> Result<String> {
    let chars: Vec<char> = glob.chars().collect();
    let mut out = String::with_capacity(glob.len() * 2 + 2);
    out.push('^');

    let mut braces = 0usize;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '*' if chars.get(i + 1) == Some(&'*') => {
                i += 1;
                if chars.get(i + 1) == Some(&'/') {
                    i += 1;
                    out.push_str("(?:.*/)?");
                } else {
                    out.push_str(".*");
                }
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            '[' => match class_end(&chars, i) {
                Some(end) => {
                    out.push_str(&translate_class(&chars[i + 1..end]));
                    i = end;
                }
                None => out.push_str(r"\["),
            },
            '{' => {
                braces += 1;
                out.push_str("(?:");
            }
            '}' if braces > 0 => {
                braces -= 1;
                out.push(')');
            }
            ',' if braces > 0 => out.push('|'),
            '\\' => match chars.get(i + 1) {
                Some(&next) => {
                    push_literal(&mut out, next);
                    i += 1;
                }
                None => push_literal(&mut out, '\\'),
            },
            other => push_literal(&mut out, other),
        }
        i += 1;
    }

    if braces > 0 {
        return Err(VfindError::InvalidPattern(format!("unclosed brace in glob {glob:?}")));
    }

    out.push('$');
    Ok(out)
}

/// The static directory prefix of a glob: every leading segment that
/// contains no wildcard.
///
/// ```rust
/// assert_eq!(vfind::glob::static_prefix("dir/sub/*.css"), "dir/sub");
/// assert_eq!(vfind::glob::static_prefix("*/x"), "");
/// ```
pub fn static_prefix(glob: &str) -> &str {
    let mut end = 0;
    for (idx, segment) in segment_bounds(glob) {
        if is_glob(segment) || segment.contains('\\') {
            break;
        }
        end = idx + segment.len();
    }
    &glob[..end]
}

fn segment_bounds(s: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    s.split('/').map(move |seg| {
        let start = offset;
        offset += seg.len() + 1;
        (start, seg)
    })
}

fn push_literal(out: &mut String, c: char) {
    let mut buf = [0u8; 4];
    out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
}

/// Index of the `]` closing the class opened at `start`.
fn class_end(chars: &[char], start: usize) -> Option<usize> {
    let mut i = start + 1;
    if matches!(chars.get(i), Some('!' | '^')) {
        i += 1;
    }
    if chars.get(i) == Some(&']') {
        i += 1;
    }
    while i < chars.len() {
        match chars[i] {
            ']' => return Some(i),
            '\\' => i += 2,
            _ => i += 1,
        }
    }
    None
}

fn translate_class(body: &[char]) -> String {
    let (negated, body) = match body.first() {
        Some('!' | '^') => (true, &body[1..]),
        _ => (false, body),
    };

    let mut out = String::from("[");
    if negated {
        out.push('^');
    }

    let mut i = 0;
    while i < body.len() {
        let c = body[i];
        match c {
            '-' if i > 0 && i + 1 < body.len() => out.push('-'),
            '\\' if i + 1 < body.len() => {
                i += 1;
                push_class_char(&mut out, body[i]);
            }
            other => push_class_char(&mut out, other),
        }
        i += 1;
    }

    // Classes never match a separator.
    if negated {
        out.push('/');
    }
    out.push(']');
    out
}

fn push_class_char(out: &mut String, c: char) {
    if matches!(c, '\\' | '[' | ']' | '^' | '-' | '&' | '~') {
        out.push('\\');
    }
    out.push(c);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(glob: &str, text: &str) -> bool {
        glob_to_regex(glob).unwrap().is_match(text)
    }

    #[test]
    fn star_stays_within_a_segment() {
        assert!(matches("*.css", "a.css"));
        assert!(!matches("*.css", "dir/a.css"));
        assert!(matches("dir/*.css", "dir/a.css"));
    }

    #[test]
    fn double_star_crosses_segments() {
        assert!(matches("**/*.css", "a.css"));
        assert!(matches("**/*.css", "dir/sub/a.css"));
        assert!(matches("dir/**/c.css", "dir/c.css"));
        assert!(matches("dir/**", "dir/sub/c.css"));
    }

    #[test]
    fn question_mark_and_classes() {
        assert!(matches("a?.txt", "ab.txt"));
        assert!(!matches("a?.txt", "a/.txt"));
        assert!(matches("file[0-9].txt", "file7.txt"));
        assert!(!matches("file[!0-9].txt", "file7.txt"));
        assert!(matches("file[!0-9].txt", "filex.txt"));
        assert!(matches("[]]", "]"));
    }

    #[test]
    fn braces_expand_and_nest() {
        assert!(matches("*.{css,js}", "a.js"));
        assert!(matches("{a,b{c,d}}.txt", "bd.txt"));
        assert!(!matches("{a,b{c,d}}.txt", "b.txt"));
        assert!(glob_to_regex("{a,b").is_err());
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        assert!(matches("a+b(1).txt", "a+b(1).txt"));
        assert!(!matches("a.b", "axb"));
        assert!(matches(r"\*.txt", "*.txt"));
    }

    #[test]
    fn static_prefix_stops_at_first_wildcard() {
        assert_eq!(static_prefix("dir/sub/*.css"), "dir/sub");
        assert_eq!(static_prefix("dir/s*b/c"), "dir");
        assert_eq!(static_prefix("dir/{a,b}"), "dir");
        assert_eq!(static_prefix("**"), "");
    }
}
