//! Export document format and import validation.
//!
//! A diagram is exported as a single JSON object:
//!
//! ```json
//! { "version": 1, "nodes": [...], "edges": [...], "timestamp": "2026-01-01T00:00:00Z" }
//! ```
//!
//! `version` is optional on import (older exports lack it). Import is the
//! boundary where untrusted documents enter the editor, so it rejects
//! duplicate ids and edges pointing at nodes that do not exist.

#[cfg(test)]
#[path = "export_test.rs"]
mod export_test;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::consts::EXPORT_VERSION;
use crate::doc::{Edge, EdgeId, GraphDoc, Node, NodeId};

/// Output formats offered by the export menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Png,
    Ors,
}

impl ExportFormat {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "json" => Some(Self::Json),
            "png" => Some(Self::Png),
            "ors" => Some(Self::Ors),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Png => "png",
            Self::Ors => "ors",
        }
    }

    #[must_use]
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Json => "application/json",
            Self::Png => "image/png",
            Self::Ors => "application/octet-stream",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export format not supported: {}", .0.as_str())]
    Unsupported(ExportFormat),
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported document version {found} (newest known is {EXPORT_VERSION})")]
    UnsupportedVersion { found: u32 },
    #[error("duplicate id in document: {0}")]
    DuplicateId(Uuid),
    #[error("edge {edge} references missing node {node}")]
    DanglingEdge { edge: EdgeId, node: NodeId },
}

fn default_version() -> u32 {
    EXPORT_VERSION
}

/// The exported diagram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    #[serde(default = "default_version")]
    pub version: u32,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl GraphExport {
    /// Capture the current document contents.
    #[must_use]
    pub fn snapshot(doc: &GraphDoc, timestamp: OffsetDateTime) -> Self {
        Self { version: EXPORT_VERSION, nodes: doc.nodes().to_vec(), edges: doc.edges().to_vec(), timestamp }
    }

    /// Check the structural rules every imported document must satisfy.
    ///
    /// # Errors
    ///
    /// Returns the first violation found: a newer version, a duplicate node or
    /// edge id, or an edge whose endpoint is not a node in the document.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.version > EXPORT_VERSION {
            return Err(ExportError::UnsupportedVersion { found: self.version });
        }

        let mut seen: HashSet<Uuid> = HashSet::with_capacity(self.nodes.len() + self.edges.len());
        for node in &self.nodes {
            if !seen.insert(node.id) {
                return Err(ExportError::DuplicateId(node.id));
            }
        }
        let node_ids: HashSet<NodeId> = self.nodes.iter().map(|n| n.id).collect();
        for edge in &self.edges {
            if !seen.insert(edge.id) {
                return Err(ExportError::DuplicateId(edge.id));
            }
            for endpoint in [edge.source, edge.target] {
                if !node_ids.contains(&endpoint) {
                    return Err(ExportError::DanglingEdge { edge: edge.id, node: endpoint });
                }
            }
        }
        Ok(())
    }

    /// Build a document from this export.
    #[must_use]
    pub fn into_doc(self) -> GraphDoc {
        let mut doc = GraphDoc::new();
        doc.load(self.nodes, self.edges);
        doc
    }
}

/// Serialize the document as pretty-printed JSON.
///
/// # Errors
///
/// Returns `Malformed` if serialization fails (non-string map keys never occur
/// here, so in practice this does not fail).
pub fn export_json(doc: &GraphDoc, timestamp: OffsetDateTime) -> Result<String, ExportError> {
    let export = GraphExport::snapshot(doc, timestamp);
    Ok(serde_json::to_string_pretty(&export)?)
}

/// Export in `format`. Only JSON is produced by this crate; raster and ORS
/// output belong to the host.
///
/// # Errors
///
/// Returns `Unsupported` for PNG and ORS.
pub fn export(doc: &GraphDoc, format: ExportFormat, timestamp: OffsetDateTime) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Json => export_json(doc, timestamp).map(String::into_bytes),
        ExportFormat::Png | ExportFormat::Ors => Err(ExportError::Unsupported(format)),
    }
}

/// Parse and validate an exported document.
///
/// # Errors
///
/// Returns `Malformed` for invalid JSON or shape, and any `validate` error.
pub fn import_json(raw: &str) -> Result<GraphExport, ExportError> {
    let export: GraphExport = serde_json::from_str(raw)?;
    export.validate()?;
    Ok(export)
}
