//! Predefined node templates offered in the editor palette.

#[cfg(test)]
#[path = "template_test.rs"]
mod template_test;

use crate::doc::{Band, Node, NodeKind};

/// A palette entry that pre-fills a node's metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTemplate {
    /// Stable lookup key (kebab-case).
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub kind: NodeKind,
    pub value: Option<f64>,
    pub unit: Option<&'static str>,
    pub band: Option<(f64, f64)>,
}

impl NodeTemplate {
    /// Build a node from this template at `(x, y)`.
    #[must_use]
    pub fn instantiate(&self, x: f64, y: f64) -> Node {
        let mut node = Node::new(self.kind, x, y);
        self.label.clone_into(&mut node.label);
        node.value = self.value;
        node.unit = self.unit.map(str::to_owned);
        node.band = self.band.map(|(min, max)| Band::new(min, max));
        node
    }
}

pub const TEMPLATES: &[NodeTemplate] = &[
    NodeTemplate {
        key: "dei-index",
        label: "DEI Index",
        description: "Equilibrium indicator tracked against its target band",
        kind: NodeKind::Stock,
        value: Some(0.72),
        unit: Some("index"),
        band: Some((0.6, 0.85)),
    },
    NodeTemplate {
        key: "public-trust",
        label: "Public Trust",
        description: "Accumulated confidence in institutions",
        kind: NodeKind::Stock,
        value: Some(55.0),
        unit: Some("%"),
        band: Some((40.0, 80.0)),
    },
    NodeTemplate {
        key: "budget",
        label: "Budget Reserve",
        description: "Funds available for programs",
        kind: NodeKind::Stock,
        value: None,
        unit: Some("USD"),
        band: None,
    },
    NodeTemplate {
        key: "policy-rate",
        label: "Policy Adoption Rate",
        description: "Rate at which new policies take effect",
        kind: NodeKind::Flow,
        value: None,
        unit: Some("policies/quarter"),
        band: None,
    },
    NodeTemplate {
        key: "spending",
        label: "Program Spending",
        description: "Outflow drawing down the budget",
        kind: NodeKind::Flow,
        value: None,
        unit: Some("USD/quarter"),
        band: None,
    },
    NodeTemplate {
        key: "stakeholder-pressure",
        label: "Stakeholder Pressure",
        description: "Auxiliary driver from external stakeholders",
        kind: NodeKind::Connector,
        value: None,
        unit: None,
        band: None,
    },
    NodeTemplate {
        key: "compliance-gap",
        label: "Compliance Gap",
        description: "Difference between target and observed compliance",
        kind: NodeKind::Connector,
        value: None,
        unit: Some("%"),
        band: Some((0.0, 10.0)),
    },
];

/// Look up a template by key.
#[must_use]
pub fn find(key: &str) -> Option<&'static NodeTemplate> {
    TEMPLATES.iter().find(|t| t.key == key)
}

/// Templates producing nodes of `kind`.
pub fn by_kind(kind: NodeKind) -> impl Iterator<Item = &'static NodeTemplate> {
    TEMPLATES.iter().filter(move |t| t.kind == kind)
}
