use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtonError {
    #[error("Install root not found: {path}")]
    NotFound { path: String },

    #[error("Install root unreadable ({kind}): {path}: {message}")]
    Unreadable {
        path: String,
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("Network error during {operation}: {details}")]
    Network {
        operation: &'static str,
        details: String,
    },

    #[error("{operation} failed with HTTP {status} for {url}")]
    HttpStatus {
        operation: &'static str,
        status: u16,
        url: String,
    },

    #[error("IO error while trying to {context} ({kind}): {message}")]
    Io {
        context: &'static str,
        kind: std::io::ErrorKind,
        message: String,
    },

    #[error("Corrupt archive: {details}")]
    CorruptArchive { details: String },

    #[error("Refusing to write outside the install root: {entry}")]
    PathTraversal { entry: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("Could not resolve the latest release: {details}")]
    Resolution { details: String },
}

impl ProtonError {
    /// Classify a failure to open the install root for listing.
    pub fn listing(path: &std::path::Path, error: &std::io::Error) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound {
                path: path.display().to_string(),
            }
        } else {
            Self::Unreadable {
                path: path.display().to_string(),
                kind: error.kind(),
                message: error.to_string(),
            }
        }
    }

    pub fn io(context: &'static str, error: &std::io::Error) -> Self {
        Self::Io {
            context,
            kind: error.kind(),
            message: error.to_string(),
        }
    }

    pub fn io_with_path(
        context: &'static str,
        path: &std::path::Path,
        error: &std::io::Error,
    ) -> Self {
        Self::Io {
            context,
            kind: error.kind(),
            message: format!("{}: {error}", path.display()),
        }
    }

    pub fn network<E>(operation: &'static str, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::Network {
            operation,
            details: error.to_string(),
        }
    }

    /// Map a `reqwest` failure, keeping client-side timeouts distinct from
    /// other transport errors.
    pub fn from_request(operation: &'static str, error: &reqwest::Error, seconds: u64) -> Self {
        if error.is_timeout() {
            Self::Timeout { operation, seconds }
        } else {
            Self::network(operation, error)
        }
    }

    pub fn corrupt<E>(error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::CorruptArchive {
            details: error.to_string(),
        }
    }

    pub fn path_traversal(entry: impl Into<String>) -> Self {
        Self::PathTraversal {
            entry: entry.into(),
        }
    }

    pub fn resolution(details: impl Into<String>) -> Self {
        Self::Resolution {
            details: details.into(),
        }
    }

    /// Short stable identifier for the error kind, suitable for API payloads.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Unreadable { .. } => "unreadable",
            Self::Network { .. } => "network",
            Self::HttpStatus { .. } => "http_status",
            Self::Io { .. } => "io",
            Self::CorruptArchive { .. } => "corrupt_archive",
            Self::PathTraversal { .. } => "path_traversal",
            Self::Timeout { .. } => "timeout",
            Self::Resolution { .. } => "resolution",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::ProtonError;

    #[test]
    fn listing_maps_missing_root_to_not_found() {
        let error = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let mapped = ProtonError::listing(Path::new("/missing/root"), &error);

        assert_eq!(
            mapped,
            ProtonError::NotFound {
                path: "/missing/root".to_string()
            }
        );
    }

    #[test]
    fn listing_maps_other_failures_to_unreadable() {
        let error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let mapped = ProtonError::listing(Path::new("/locked"), &error);

        assert!(matches!(
            mapped,
            ProtonError::Unreadable {
                kind: std::io::ErrorKind::PermissionDenied,
                ref path,
                ..
            } if path == "/locked"
        ));
    }

    #[test]
    fn io_with_path_includes_path_in_message() {
        let error = std::io::Error::other("disk full");
        let mapped = ProtonError::io_with_path("write archive", Path::new("/tmp/a.tar.gz"), &error);

        assert!(
            matches!(mapped, ProtonError::Io { context: "write archive", ref message, .. } if message.contains("/tmp/a.tar.gz") && message.contains("disk full"))
        );
    }

    #[test]
    fn display_messages_are_human_readable() {
        let status = ProtonError::HttpStatus {
            operation: "archive download",
            status: 404,
            url: "https://example.invalid/x.tar.gz".to_string(),
        };
        let timeout = ProtonError::Timeout {
            operation: "archive download",
            seconds: 30,
        };

        assert_eq!(
            status.to_string(),
            "archive download failed with HTTP 404 for https://example.invalid/x.tar.gz"
        );
        assert_eq!(timeout.to_string(), "archive download timed out after 30s");
        assert_eq!(
            ProtonError::path_traversal("../../etc/passwd").to_string(),
            "Refusing to write outside the install root: ../../etc/passwd"
        );
    }

    #[test]
    fn kind_names_are_stable() {
        assert_eq!(ProtonError::corrupt("bad gzip").kind_name(), "corrupt_archive");
        assert_eq!(ProtonError::resolution("empty").kind_name(), "resolution");
        assert_eq!(
            ProtonError::network("release index", "refused").kind_name(),
            "network"
        );
    }
}
