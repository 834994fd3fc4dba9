use thiserror::Error;

/// Convenience alias used by every fallible operation in the crate.
pub type Result<T, E = VfindError> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum VfindError {
    // Lookup
    #[error("path not found: {0}")]
    NotFound(String),

    #[error("path already exists: {0}")]
    AlreadyExists(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    // Config
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("invalid comparator: {0}")]
    InvalidComparator(String),

    #[error("{0}")]
    Logic(String),

    // Capabilities
    #[error("adapter does not support {capability}")]
    NotSupported { capability: &'static str },

    // Runtime
    #[error("IO error at {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    // Third-party adapters
    #[error("backend error: {0}")]
    Backend(String),
}

impl VfindError {
    /// The path this error occurred at, if applicable.
    pub fn path(&self) -> Option<&str> {
        match self {
            Self::NotFound(p)
            | Self::AlreadyExists(p)
            | Self::NotADirectory(p)
            | Self::IsADirectory(p)
            | Self::Io { path: p, .. } => Some(p),
            _ => None,
        }
    }

    /// Whether this error concerns a single entry rather than the query.
    ///
    /// Per-entry errors (vanished or unreadable files) are swallowed by the
    /// content and date filters, which drop the entry and keep walking.
    /// Everything else aborts the iteration.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::IsADirectory(_) | Self::NotADirectory(_) | Self::Io { .. }
        )
    }

    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(path),
            _ => Self::Io { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_not_found_maps_to_not_found() {
        let err = VfindError::io("a/b", std::io::Error::from(std::io::ErrorKind::NotFound));
        assert!(matches!(err, VfindError::NotFound(ref p) if p == "a/b"));
        assert!(err.is_recoverable());
    }

    #[test]
    fn logic_errors_are_fatal() {
        let err = VfindError::Logic("call in_dirs()".into());
        assert!(!err.is_recoverable());
        assert_eq!(err.path(), None);
    }
}
