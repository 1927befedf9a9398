//! Binary graph artifacts.
//!
//! Layout: a 4-byte little-endian header length, the bincode-encoded
//! [`GraphArtifactHeader`], then the bincode-encoded graph. The header
//! checksum covers the payload bytes only.

use std::path::Path;

use rrg_common::ContentHash;
use rrg_graph::{RrGraph, RrGraphBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CacheError;

/// Magic bytes identifying a routing-resource graph artifact.
const ARTIFACT_MAGIC: [u8; 4] = *b"RRGR";

/// Current artifact format version. Increment on breaking changes to the
/// header or to any serialized graph structure.
const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Header prepended to every graph artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphArtifactHeader {
    /// Magic bytes: must be `b"RRGR"`.
    pub magic: [u8; 4],

    /// Artifact format version.
    pub format_version: u32,

    /// Version of the crate that wrote the artifact.
    pub producer_version: String,

    /// Content hash of the payload.
    pub checksum: ContentHash,
}

fn serialization_error(e: impl std::fmt::Display) -> CacheError {
    CacheError::Serialization {
        reason: e.to_string(),
    }
}

/// Writes a finished graph to `path`, replacing any existing file.
///
/// Returns the payload checksum.
pub fn write_graph(path: &Path, graph: &RrGraph) -> Result<ContentHash, CacheError> {
    let payload = bincode::serde::encode_to_vec(graph, bincode::config::standard())
        .map_err(serialization_error)?;
    let checksum = write_payload(path, &payload)?;
    debug!(
        path = %path.display(),
        nodes = graph.node_count(),
        checksum = %checksum,
        "wrote graph artifact"
    );
    Ok(checksum)
}

/// Frames an encoded graph with a fresh header and writes it to `path`.
fn write_payload(path: &Path, payload: &[u8]) -> Result<ContentHash, CacheError> {
    let config = bincode::config::standard();
    let header = GraphArtifactHeader {
        magic: ARTIFACT_MAGIC,
        format_version: ARTIFACT_FORMAT_VERSION,
        producer_version: env!("CARGO_PKG_VERSION").to_string(),
        checksum: ContentHash::from_bytes(payload),
    };
    let header_bytes = bincode::serde::encode_to_vec(&header, config).map_err(serialization_error)?;

    let header_len = header_bytes.len() as u32;
    let mut output = Vec::with_capacity(4 + header_bytes.len() + payload.len());
    output.extend_from_slice(&header_len.to_le_bytes());
    output.extend_from_slice(&header_bytes);
    output.extend_from_slice(payload);

    std::fs::write(path, &output).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    debug!(bytes = output.len(), "framed artifact payload");
    Ok(header.checksum)
}

/// Reads and validates a graph artifact.
///
/// The magic bytes, format version and checksum are checked before the
/// payload is decoded, and the decoded graph is validated like any freshly
/// built one.
pub fn read_graph(path: &Path) -> Result<RrGraph, CacheError> {
    let raw = std::fs::read(path).map_err(|e| CacheError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let invalid = |reason: String| CacheError::InvalidHeader {
        path: path.to_path_buf(),
        reason,
    };

    let len_bytes: [u8; 4] = raw
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .ok_or_else(|| invalid(format!("file is only {} bytes long", raw.len())))?;
    let header_len = u32::from_le_bytes(len_bytes) as usize;
    let header_bytes = raw
        .get(4..4 + header_len)
        .ok_or_else(|| invalid(format!("header length {header_len} exceeds the file")))?;

    let config = bincode::config::standard();
    let (header, _): (GraphArtifactHeader, usize) =
        bincode::serde::decode_from_slice(header_bytes, config)
            .map_err(|e| invalid(format!("undecodable header: {e}")))?;

    if header.magic != ARTIFACT_MAGIC {
        return Err(invalid(format!("bad magic bytes {:?}", header.magic)));
    }
    if header.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(CacheError::VersionMismatch {
            path: path.to_path_buf(),
            expected: ARTIFACT_FORMAT_VERSION,
            actual: header.format_version,
        });
    }

    let payload = &raw[4 + header_len..];
    let actual = ContentHash::from_bytes(payload);
    if actual != header.checksum {
        return Err(CacheError::ChecksumMismatch {
            path: path.to_path_buf(),
            expected: header.checksum.to_string(),
            actual: actual.to_string(),
        });
    }

    let (builder, _): (RrGraphBuilder, usize) =
        bincode::serde::decode_from_slice(payload, config).map_err(serialization_error)?;
    let graph = RrGraph::from_builder(builder).map_err(|source| CacheError::InvalidGraph {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(
        path = %path.display(),
        producer = %header.producer_version,
        nodes = graph.node_count(),
        "read graph artifact"
    );
    Ok(graph)
}

/// Fail-safe variant of [`read_graph`]: a missing or unusable artifact is a
/// cache miss.
pub fn load_cached(path: &Path) -> Option<RrGraph> {
    if !path.exists() {
        return None;
    }
    match read_graph(path) {
        Ok(graph) => Some(graph),
        Err(err) => {
            warn!(error = %err, "ignoring unusable graph artifact");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrg_arch::{ArchDescription, ArchSwitch, DeviceGrid, SwitchKind, TileType};
    use rrg_graph::{Direction, GraphOptions, NodeSpec, RrType, Side, SwitchId};

    fn sample_arch() -> ArchDescription {
        ArchDescription {
            name: "cache_test".into(),
            grid: DeviceGrid::new(6, 6, 1).unwrap(),
            chan_width: 2,
            switches: vec![ArchSwitch {
                name: "mux".into(),
                kind: SwitchKind::Mux,
                r: 10.0,
                cin: 0.0,
                cout: 0.0,
                cinternal: 0.0,
                tdel: 1e-11,
                mux_trans_size: 1.0,
                buf_size: 0.0,
            }],
            tile_types: vec![TileType {
                name: "clb".into(),
                width: 1,
                height: 1,
            }],
        }
    }

    fn sample_graph() -> RrGraph {
        let mut b = RrGraphBuilder::new(&sample_arch()).unwrap();
        let wire = b
            .create_node(&NodeSpec::chanx(1, 0, 4, 1, Direction::Inc))
            .unwrap();
        let pin = b
            .create_node(&NodeSpec::pin(
                RrType::Ipin,
                3,
                2,
                0,
                [Side::Bottom].into_iter().collect(),
            ))
            .unwrap();
        let sw = SwitchId::from_raw(0);
        b.emplace_edge(wire, pin, sw, true).unwrap();
        b.add_node_metadata(pin, "fasm", "CLB.I0").unwrap();
        b.add_edge_metadata(wire, pin, sw, "fasm", "PIP.X1").unwrap();
        b.finish(&GraphOptions::default()).unwrap()
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.rrg");
        let graph = sample_graph();
        let checksum = write_graph(&path, &graph).unwrap();
        let back = read_graph(&path).unwrap();
        assert_eq!(back, graph);
        assert_eq!(back.fingerprint().unwrap(), graph.fingerprint().unwrap());
        assert_ne!(checksum.to_string(), "");
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_graph(&dir.path().join("absent.rrg")).unwrap_err();
        assert!(matches!(err, CacheError::Io { .. }));
        assert!(load_cached(&dir.path().join("absent.rrg")).is_none());
    }

    #[test]
    fn corrupted_payload_detected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.rrg");
        write_graph(&path, &sample_graph()).unwrap();
        let mut raw = std::fs::read(&path).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xff;
        std::fs::write(&path, &raw).unwrap();
        assert!(matches!(
            read_graph(&path),
            Err(CacheError::ChecksumMismatch { .. })
        ));
        assert!(load_cached(&path).is_none());
    }

    #[test]
    fn truncated_file_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.rrg");
        std::fs::write(&path, [1u8, 0]).unwrap();
        assert!(matches!(
            read_graph(&path),
            Err(CacheError::InvalidHeader { .. })
        ));
        std::fs::write(&path, [200u8, 0, 0, 0, 1, 2]).unwrap();
        assert!(matches!(
            read_graph(&path),
            Err(CacheError::InvalidHeader { .. })
        ));
    }

    fn rewrite_header(path: &Path, edit: impl FnOnce(&mut GraphArtifactHeader)) {
        let raw = std::fs::read(path).unwrap();
        let header_len = u32::from_le_bytes(raw[..4].try_into().unwrap()) as usize;
        let config = bincode::config::standard();
        let (mut header, _): (GraphArtifactHeader, usize) =
            bincode::serde::decode_from_slice(&raw[4..4 + header_len], config).unwrap();
        edit(&mut header);
        let header_bytes = bincode::serde::encode_to_vec(&header, config).unwrap();
        let mut out = (header_bytes.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(&header_bytes);
        out.extend_from_slice(&raw[4 + header_len..]);
        std::fs::write(path, out).unwrap();
    }

    #[test]
    fn bad_magic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.rrg");
        write_graph(&path, &sample_graph()).unwrap();
        rewrite_header(&path, |h| h.magic = *b"AION");
        let err = read_graph(&path).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn newer_format_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.rrg");
        write_graph(&path, &sample_graph()).unwrap();
        rewrite_header(&path, |h| h.format_version = ARTIFACT_FORMAT_VERSION + 1);
        assert!(matches!(
            read_graph(&path),
            Err(CacheError::VersionMismatch { expected: 1, actual: 2, .. })
        ));
    }

    /// Re-encodes the graph after editing its serialized form, under a
    /// header whose checksum matches the edited payload.
    fn write_edited(path: &Path, graph: &RrGraph, edit: impl FnOnce(&mut serde_json::Value)) {
        let mut value = serde_json::to_value(graph).unwrap();
        edit(&mut value);
        let builder: RrGraphBuilder = serde_json::from_value(value).unwrap();
        let payload =
            bincode::serde::encode_to_vec(&builder, bincode::config::standard()).unwrap();
        write_payload(path, &payload).unwrap();
    }

    fn graph_without_metadata() -> RrGraph {
        let mut b = RrGraphBuilder::new(&sample_arch()).unwrap();
        let wire = b
            .create_node(&NodeSpec::chanx(1, 0, 4, 1, Direction::Inc))
            .unwrap();
        let sink = b.create_node(&NodeSpec::sink(3, 3, 0)).unwrap();
        b.emplace_edge(wire, sink, SwitchId::from_raw(0), true)
            .unwrap();
        b.finish(&GraphOptions::default()).unwrap()
    }

    #[test]
    fn mis_sized_lookup_is_invalid_graph() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.rrg");
        let graph = graph_without_metadata();

        write_edited(&path, &graph, |_| {});
        assert_eq!(read_graph(&path).unwrap().node_count(), 2);

        write_edited(&path, &graph, |v| {
            v["lookup"]["tables"].as_array_mut().unwrap().pop();
        });
        assert!(matches!(
            read_graph(&path),
            Err(CacheError::InvalidGraph { .. })
        ));

        write_edited(&path, &graph, |v| {
            v["lookup"]["tables"][0].as_array_mut().unwrap().truncate(3);
        });
        assert!(matches!(
            read_graph(&path),
            Err(CacheError::InvalidGraph { .. })
        ));
        assert!(load_cached(&path).is_none());
    }

    #[test]
    fn loaded_graph_reopens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.rrg");
        write_graph(&path, &sample_graph()).unwrap();
        let graph = load_cached(&path).unwrap();
        let view = graph.view();
        let pin = rrg_graph::RrNodeId::from_raw(1);
        assert_eq!(view.node_metadata(pin)[0].value, "CLB.I0");

        let mut b = graph.into_builder();
        b.reopen();
        b.create_node(&NodeSpec::source(5, 5, 0)).unwrap();
        assert_eq!(b.finish(&GraphOptions::default()).unwrap().node_count(), 3);
    }
}
