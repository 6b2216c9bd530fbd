//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur during cache operations.
///
/// Reads are fail-safe: these errors become cache misses. Write errors are
/// reported to the logger while the freshly compiled CSS is still returned.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while reading or writing cache files.
    #[error("cache I/O error at {}: {source}", .path.display())]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// An artifact's metadata file has an invalid or missing header.
    #[error("invalid artifact header in {}: {reason}", .path.display())]
    InvalidHeader {
        /// The metadata file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The stored CSS does not match the checksum recorded in its metadata.
    #[error("checksum mismatch in {}: expected {expected}, got {actual}", .path.display())]
    ChecksumMismatch {
        /// The CSS file path.
        path: PathBuf,
        /// The checksum recorded in the metadata.
        expected: String,
        /// The checksum of the CSS on disk.
        actual: String,
    },

    /// The metadata format version does not match the current version.
    #[error("version mismatch in {}: expected {expected}, got {actual}", .path.display())]
    VersionMismatch {
        /// The metadata file path.
        path: PathBuf,
        /// The expected format version.
        expected: u32,
        /// The format version found in the file.
        actual: u32,
    },

    /// A file the artifact was compiled from changed or disappeared.
    #[error("dependency {} changed since the artifact was written", .path.display())]
    StaleDependency {
        /// The dependency path.
        path: PathBuf,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },
}

impl CacheError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
