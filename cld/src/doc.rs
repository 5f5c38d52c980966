//! Document model: CLD nodes and edges, sparse patches, and the in-memory store.
//!
//! This module defines what a causal loop diagram is made of: variables
//! (`Node`, tagged by `NodeKind`) and signed causal links (`Edge`, tagged by
//! `Polarity`). `NodePatch` and `EdgePatch` describe incremental property
//! edits coming from a property panel or the network. `GraphDoc` owns the live
//! nodes and edges in insertion order so exports are deterministic.
//!
//! The store itself enforces nothing about graph shape: self-loops, parallel
//! edges and cycles are all legal. Referential checks live in the editor core
//! and the import path.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::consts::{
    CONNECTOR_SIZE, DEFAULT_DELAY, DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, DEFAULT_STRENGTH, DEFAULT_STROKE_WIDTH,
    FLOW_SIZE, STOCK_SIZE,
};

/// Unique identifier for a node.
pub type NodeId = Uuid;

/// Unique identifier for an edge.
pub type EdgeId = Uuid;

/// The variant of a CLD node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// An accumulation (level) variable.
    Stock,
    /// A rate that fills or drains a stock.
    Flow,
    /// An auxiliary variable linking other variables.
    Connector,
}

impl NodeKind {
    /// All variants in toolbar order.
    pub const ALL: [NodeKind; 3] = [Self::Stock, Self::Flow, Self::Connector];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stock => "stock",
            Self::Flow => "flow",
            Self::Connector => "connector",
        }
    }

    /// Parse the lowercase wire name.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "stock" => Some(Self::Stock),
            "flow" => Some(Self::Flow),
            "connector" => Some(Self::Connector),
            _ => None,
        }
    }

    /// Drawn width and height in world units.
    #[must_use]
    pub fn size(self) -> (f64, f64) {
        match self {
            Self::Stock => STOCK_SIZE,
            Self::Flow => FLOW_SIZE,
            Self::Connector => CONNECTOR_SIZE,
        }
    }

    /// Label given to a freshly added node of this kind.
    #[must_use]
    pub fn default_label(self) -> &'static str {
        match self {
            Self::Stock => "New Stock",
            Self::Flow => "New Flow",
            Self::Connector => "New Variable",
        }
    }
}

/// Sign of a causal link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Source and target move in the same direction.
    #[default]
    Positive,
    /// Source and target move in opposite directions.
    Negative,
}

impl Polarity {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "positive" | "+" => Some(Self::Positive),
            "negative" | "-" => Some(Self::Negative),
            _ => None,
        }
    }

    /// The opposite sign.
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Positive => Self::Negative,
            Self::Negative => Self::Positive,
        }
    }

    /// Glyph drawn at the arrowhead.
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Self::Positive => '+',
            Self::Negative => '-',
        }
    }
}

/// Equilibrium band: the acceptable range for a node's value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether the bounds are finite and ordered.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Whether `value` lies within the band, inclusive.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Visual styling for a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStyle {
    pub fill: String,
    pub stroke: String,
    pub text_color: String,
    pub font_family: String,
    pub font_size: f64,
}

impl NodeStyle {
    /// Default palette for a node kind.
    #[must_use]
    pub fn for_kind(kind: NodeKind) -> Self {
        let (fill, stroke) = match kind {
            NodeKind::Stock => ("#1E3A5F", "#4A90D9"),
            NodeKind::Flow => ("#2D4A3E", "#4CAF7A"),
            NodeKind::Connector => ("#4A3B5C", "#9B7ED9"),
        };
        Self {
            fill: fill.to_owned(),
            stroke: stroke.to_owned(),
            text_color: "#FFFFFF".to_owned(),
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
            font_size: DEFAULT_FONT_SIZE,
        }
    }
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self::for_kind(NodeKind::Stock)
    }
}

/// Visual styling for an edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeStyle {
    pub color: String,
    pub stroke_width: f64,
}

impl EdgeStyle {
    /// Default stroke color for a polarity.
    #[must_use]
    pub fn for_polarity(polarity: Polarity) -> Self {
        let color = match polarity {
            Polarity::Positive => "#4CAF7A",
            Polarity::Negative => "#D94B4B",
        };
        Self { color: color.to_owned(), stroke_width: DEFAULT_STROKE_WIDTH }
    }
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self::for_polarity(Polarity::Positive)
    }
}

fn default_enabled() -> bool {
    true
}

fn default_delay() -> String {
    DEFAULT_DELAY.to_owned()
}

fn default_strength() -> f64 {
    DEFAULT_STRENGTH
}

/// A CLD variable as stored in the document and in exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// Center x in world coordinates.
    pub x: f64,
    /// Center y in world coordinates.
    pub y: f64,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub node_type: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub band: Option<Band>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub style: NodeStyle,
}

impl Node {
    /// A node of `kind` at `(x, y)` with default label and styling.
    #[must_use]
    pub fn new(kind: NodeKind, x: f64, y: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            label: kind.default_label().to_owned(),
            value: None,
            unit: None,
            node_type: kind,
            band: None,
            enabled: true,
            style: NodeStyle::for_kind(kind),
        }
    }

    /// Axis-aligned bounds as `(left, top, right, bottom)`.
    #[must_use]
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let (w, h) = self.node_type.size();
        (self.x - w / 2.0, self.y - h / 2.0, self.x + w / 2.0, self.y + h / 2.0)
    }

    /// `Some(true)` when the value sits inside the band, `None` when either is unset.
    #[must_use]
    pub fn within_band(&self) -> Option<bool> {
        match (self.value, self.band) {
            (Some(v), Some(band)) => Some(band.contains(v)),
            _ => None,
        }
    }
}

/// A signed causal link between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub polarity: Polarity,
    /// Free-text delay annotation ("none", "2 quarters", ...).
    #[serde(default = "default_delay")]
    pub delay: String,
    #[serde(default = "default_strength")]
    pub strength: f64,
    #[serde(default)]
    pub style: EdgeStyle,
}

impl Edge {
    /// A positive link with default delay text and unit strength.
    #[must_use]
    pub fn new(source: NodeId, target: NodeId) -> Self {
        Self {
            id: Uuid::new_v4(),
            source,
            target,
            polarity: Polarity::Positive,
            delay: default_delay(),
            strength: DEFAULT_STRENGTH,
            style: EdgeStyle::for_polarity(Polarity::Positive),
        }
    }

    /// Whether the link carries a real delay annotation.
    #[must_use]
    pub fn has_delay(&self) -> bool {
        let delay = self.delay.trim();
        !delay.is_empty() && !delay.eq_ignore_ascii_case(DEFAULT_DELAY)
    }

    #[must_use]
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }

    #[must_use]
    pub fn touches(&self, node_id: &NodeId) -> bool {
        self.source == *node_id || self.target == *node_id
    }
}

/// Deserialize a present field (including `null`) as `Some`, so that a
/// missing key and an explicit `null` stay distinguishable.
fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Sparse update for a node. Absent fields are left untouched; for the
/// nullable fields an explicit `null` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub value: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub unit: Option<Option<String>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub band: Option<Option<Band>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
}

impl NodePatch {
    /// Write every present field into `node`.
    pub fn apply_to(&self, node: &mut Node) {
        if let Some(label) = &self.label {
            node.label.clone_from(label);
        }
        if let Some(x) = self.x {
            node.x = x;
        }
        if let Some(y) = self.y {
            node.y = y;
        }
        if let Some(value) = self.value {
            node.value = value;
        }
        if let Some(unit) = &self.unit {
            node.unit.clone_from(unit);
        }
        if let Some(band) = self.band {
            node.band = band;
        }
        if let Some(enabled) = self.enabled {
            node.enabled = enabled;
        }
        if let Some(fill) = &self.fill {
            node.style.fill.clone_from(fill);
        }
        if let Some(stroke) = &self.stroke {
            node.style.stroke.clone_from(stroke);
        }
        if let Some(color) = &self.text_color {
            node.style.text_color.clone_from(color);
        }
        if let Some(family) = &self.font_family {
            node.style.font_family.clone_from(family);
        }
        if let Some(size) = self.font_size {
            node.style.font_size = size;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Sparse update for an edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polarity: Option<Polarity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

impl EdgePatch {
    pub fn apply_to(&self, edge: &mut Edge) {
        if let Some(polarity) = self.polarity {
            edge.polarity = polarity;
        }
        if let Some(delay) = &self.delay {
            edge.delay.clone_from(delay);
        }
        if let Some(strength) = self.strength {
            edge.strength = strength;
        }
        if let Some(color) = &self.color {
            edge.style.color.clone_from(color);
        }
        if let Some(width) = self.stroke_width {
            edge.style.stroke_width = width;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// In-memory store of nodes and edges, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphDoc {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphDoc {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Nodes ---

    /// Append a node, or replace the node with the same id in place.
    pub fn insert_node(&mut self, node: Node) {
        match self.node_index(&node.id) {
            Some(i) => self.nodes[i] = node,
            None => self.nodes.push(node),
        }
    }

    /// Insert a node at `index`, clamped to the current length.
    pub fn insert_node_at(&mut self, index: usize, node: Node) {
        let index = index.min(self.nodes.len());
        self.nodes.insert(index, node);
    }

    /// Remove a node, returning its former position and value.
    /// Edges touching the node are not removed.
    pub fn remove_node(&mut self, id: &NodeId) -> Option<(usize, Node)> {
        let index = self.node_index(id)?;
        Some((index, self.nodes.remove(index)))
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == *id)
    }

    pub fn node_mut(&mut self, id: &NodeId) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == *id)
    }

    #[must_use]
    pub fn node_index(&self, id: &NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == *id)
    }

    #[must_use]
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node_index(id).is_some()
    }

    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    // --- Edges ---

    /// Append an edge, or replace the edge with the same id in place.
    pub fn insert_edge(&mut self, edge: Edge) {
        match self.edge_index(&edge.id) {
            Some(i) => self.edges[i] = edge,
            None => self.edges.push(edge),
        }
    }

    pub fn insert_edge_at(&mut self, index: usize, edge: Edge) {
        let index = index.min(self.edges.len());
        self.edges.insert(index, edge);
    }

    pub fn remove_edge(&mut self, id: &EdgeId) -> Option<(usize, Edge)> {
        let index = self.edge_index(id)?;
        Some((index, self.edges.remove(index)))
    }

    #[must_use]
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == *id)
    }

    pub fn edge_mut(&mut self, id: &EdgeId) -> Option<&mut Edge> {
        self.edges.iter_mut().find(|e| e.id == *id)
    }

    #[must_use]
    pub fn edge_index(&self, id: &EdgeId) -> Option<usize> {
        self.edges.iter().position(|e| e.id == *id)
    }

    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Edges with `node_id` as source or target, paired with their positions.
    #[must_use]
    pub fn edges_touching(&self, node_id: &NodeId) -> Vec<(usize, Edge)> {
        self.edges
            .iter()
            .enumerate()
            .filter(|(_, e)| e.touches(node_id))
            .map(|(i, e)| (i, e.clone()))
            .collect()
    }

    /// Edges whose source or target is not in the document.
    #[must_use]
    pub fn dangling_edges(&self) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| !self.contains_node(&e.source) || !self.contains_node(&e.target))
            .collect()
    }

    // --- Whole document ---

    /// Replace all contents.
    pub fn load(&mut self, nodes: Vec<Node>, edges: Vec<Edge>) {
        self.nodes = nodes;
        self.edges = edges;
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}
