//! Error types for graph artifact I/O.

use std::path::PathBuf;

/// Errors raised while writing or reading a graph artifact.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading or writing the artifact file failed.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The artifact file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The file is truncated or does not start with a graph artifact header.
    #[error("invalid artifact header in {path}: {reason}")]
    InvalidHeader {
        /// The artifact file path.
        path: PathBuf,
        /// Description of the header problem.
        reason: String,
    },

    /// The payload does not hash to the checksum stored in the header.
    #[error("checksum mismatch in {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// The artifact file path.
        path: PathBuf,
        /// Checksum recorded in the header.
        expected: String,
        /// Checksum of the payload as read.
        actual: String,
    },

    /// The artifact was written by an incompatible format version.
    #[error("version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        /// The artifact file path.
        path: PathBuf,
        /// Format version this build reads.
        expected: u32,
        /// Format version found in the file.
        actual: u32,
    },

    /// Encoding or decoding the header or payload failed.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the failure.
        reason: String,
    },

    /// The payload decoded but does not describe a valid finished graph.
    #[error("invalid graph in {path}: {source}")]
    InvalidGraph {
        /// The artifact file path.
        path: PathBuf,
        /// Why the decoded graph was rejected.
        source: rrg_graph::RrGraphError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_display() {
        let err = CacheError::Io {
            path: PathBuf::from("/tmp/cache/k4_n4.rrg"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cache I/O error"));
        assert!(msg.contains("k4_n4.rrg"));
    }

    #[test]
    fn checksum_mismatch_display() {
        let err = CacheError::ChecksumMismatch {
            path: PathBuf::from("graph.rrg"),
            expected: "aabb".to_string(),
            actual: "ccdd".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("checksum mismatch"));
        assert!(msg.contains("aabb"));
        assert!(msg.contains("ccdd"));
    }

    #[test]
    fn version_mismatch_display() {
        let err = CacheError::VersionMismatch {
            path: PathBuf::from("old.rrg"),
            expected: 2,
            actual: 1,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 2"));
        assert!(msg.contains("got 1"));
    }

    #[test]
    fn invalid_graph_display() {
        let err = CacheError::InvalidGraph {
            path: PathBuf::from("graph.rrg"),
            source: rrg_graph::RrGraphError::NotFinalized { operation: "view" },
        };
        assert!(err.to_string().starts_with("invalid graph in graph.rrg"));
    }
}
