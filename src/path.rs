//! Path helpers for the virtual `/`-separated namespace.
//!
//! Paths are plain strings relative to the filesystem root: `""` is the
//! root, segments are joined with `/`, and there is never a leading or
//! trailing slash. A mount manager prefix (`name://`) is kept intact in
//! front of the relative part.

const MOUNT_SEPARATOR: &str = "://";

/// Split `name://rest` into `(Some("name"), "rest")`.
pub fn split_mount(path: &str) -> (Option<&str>, &str) {
    match path.find(MOUNT_SEPARATOR) {
        Some(idx) => (Some(&path[..idx]), &path[idx + MOUNT_SEPARATOR.len()..]),
        None => (None, path),
    }
}

/// Normalise separators, drop `.` segments, resolve `..` and strip
/// leading/trailing slashes.
///
/// `..` never climbs above the root.
pub fn normalize(path: &str) -> String {
    let (mount, rest) = split_mount(path);
    let rest = rest.replace('\\', "/");

    let mut segments: Vec<&str> = Vec::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let joined = segments.join("/");
    match mount {
        Some(m) => format!("{m}{MOUNT_SEPARATOR}{joined}"),
        None => joined,
    }
}

/// Join a directory path and a child name.
pub fn join(dir: &str, name: &str) -> String {
    if dir.is_empty() || dir.ends_with(MOUNT_SEPARATOR) {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Everything before the last segment. The root and top-level entries
/// have an empty dirname (or just the mount prefix).
pub fn dirname(path: &str) -> &str {
    let (mount, rest) = split_mount(path);
    match rest.rfind('/') {
        Some(idx) => &path[..path.len() - rest.len() + idx],
        None => match mount {
            Some(m) => &path[..m.len() + MOUNT_SEPARATOR.len()],
            None => "",
        },
    }
}

/// The last segment of a path.
pub fn basename(path: &str) -> &str {
    let (_, rest) = split_mount(path);
    match rest.rfind('/') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    }
}

/// Extension of the last segment, without the dot.
pub fn extension(path: &str) -> Option<&str> {
    let name = basename(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

/// Strip `base` (a directory) from the front of `path`.
///
/// Returns `path` unchanged when it does not live under `base`.
pub fn relative_to<'a>(path: &'a str, base: &str) -> &'a str {
    if base.is_empty() {
        return path;
    }
    if base.ends_with(MOUNT_SEPARATOR) {
        return path.strip_prefix(base).unwrap_or(path);
    }
    match path.strip_prefix(base) {
        Some(rest) if rest.is_empty() => "",
        Some(rest) => rest.strip_prefix('/').unwrap_or(path),
        None => path,
    }
}

/// Guess a mime type from the file extension.
pub fn guess_mimetype(path: &str) -> &'static str {
    let ext = extension(path).map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("yml" | "yaml") => "application/x-yaml",
        Some("html" | "htm") => "text/html",
        Some("txt" | "md" | "rs" | "toml") => "text/plain",
        Some("xml") => "application/xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("pdf") => "application/pdf",
        Some("zip") => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_trims() {
        assert_eq!(normalize("/a//b/./c/"), "a/b/c");
        assert_eq!(normalize("a\\b"), "a/b");
        assert_eq!(normalize("a/../../b"), "b");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("/"), "");
    }

    #[test]
    fn normalize_keeps_mount_prefix() {
        assert_eq!(normalize("docs:///a/b/"), "docs://a/b");
        assert_eq!(normalize("docs://"), "docs://");
    }

    #[test]
    fn dirname_and_basename() {
        assert_eq!(dirname("a/b/c.css"), "a/b");
        assert_eq!(dirname("c.css"), "");
        assert_eq!(dirname("docs://c.css"), "docs://");
        assert_eq!(dirname("docs://a/c.css"), "docs://a");
        assert_eq!(basename("a/b/c.css"), "c.css");
        assert_eq!(basename("docs://c.css"), "c.css");
    }

    #[test]
    fn join_handles_root_and_mounts() {
        assert_eq!(join("", "a"), "a");
        assert_eq!(join("a", "b"), "a/b");
        assert_eq!(join("docs://", "b"), "docs://b");
    }

    #[test]
    fn relative_to_strips_base() {
        assert_eq!(relative_to("dir/sub/c.css", "dir"), "sub/c.css");
        assert_eq!(relative_to("dir", "dir"), "");
        assert_eq!(relative_to("dirty/x", "dir"), "dirty/x");
        assert_eq!(relative_to("a.css", ""), "a.css");
    }

    #[test]
    fn extension_ignores_dotfiles() {
        assert_eq!(extension("a/b.tar.gz"), Some("gz"));
        assert_eq!(extension(".gitignore"), None);
        assert_eq!(extension("Makefile"), None);
    }
}
