//! Feedback-loop detection.
//!
//! Enumerates the elementary circuits of the diagram and classifies each one
//! as reinforcing or balancing from the parity of its negative links. Search
//! starts from every enabled node in document order and only extends into
//! nodes ordered after the start, so each circuit is reported once, rooted at
//! its earliest node. Parallel edges yield distinct loops.
//!
//! The search is Johnson's algorithm: a node that led to no circuit stays
//! blocked until one of its successors closes a circuit, so work is linear
//! in the graph size per circuit found. With the circuit cap this bounds
//! the whole search, even on dense acyclic diagrams.

#[cfg(test)]
#[path = "loops_test.rs"]
mod loops_test;

use std::collections::HashMap;

use serde::Serialize;

use crate::consts::MAX_LOOPS;
use crate::doc::{EdgeId, GraphDoc, NodeId, Polarity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopPolarity {
    Reinforcing,
    Balancing,
}

impl LoopPolarity {
    /// Even number of negative links reinforces, odd balances.
    #[must_use]
    pub fn from_negative_count(count: usize) -> Self {
        if count.is_multiple_of(2) { Self::Reinforcing } else { Self::Balancing }
    }

    #[must_use]
    pub fn prefix(self) -> char {
        match self {
            Self::Reinforcing => 'R',
            Self::Balancing => 'B',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackLoop {
    /// `R1`, `R2`, `B1`, ... numbered per polarity in discovery order.
    pub id: String,
    pub nodes: Vec<NodeId>,
    pub edges: Vec<EdgeId>,
    pub polarity: LoopPolarity,
    pub has_delay: bool,
    /// Product of edge strengths around the loop.
    pub strength: f64,
}

impl FeedbackLoop {
    #[must_use]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Node labels joined with arrows, closing back on the first node.
    #[must_use]
    pub fn format_path(&self, doc: &GraphDoc) -> String {
        let mut labels: Vec<&str> = self
            .nodes
            .iter()
            .map(|id| doc.node(id).map_or("?", |n| n.label.as_str()))
            .collect();
        if let Some(first) = labels.first().copied() {
            labels.push(first);
        }
        labels.join(" → ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopReport {
    pub loops: Vec<FeedbackLoop>,
    /// Set when enumeration stopped at the cap.
    pub truncated: bool,
}

impl LoopReport {
    #[must_use]
    pub fn reinforcing(&self) -> usize {
        self.loops.iter().filter(|l| l.polarity == LoopPolarity::Reinforcing).count()
    }

    #[must_use]
    pub fn balancing(&self) -> usize {
        self.loops.iter().filter(|l| l.polarity == LoopPolarity::Balancing).count()
    }
}

/// Find feedback loops, stopping after `MAX_LOOPS`.
#[must_use]
pub fn find_loops(doc: &GraphDoc) -> LoopReport {
    find_loops_capped(doc, MAX_LOOPS)
}

/// Find feedback loops, stopping after `cap` circuits.
#[must_use]
pub fn find_loops_capped(doc: &GraphDoc, cap: usize) -> LoopReport {
    let order: Vec<NodeId> = doc.nodes().iter().filter(|n| n.enabled).map(|n| n.id).collect();
    let rank: HashMap<NodeId, usize> = order.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    // (target rank, edge index) per source rank, in document edge order.
    let mut adjacency: Vec<Vec<(usize, usize)>> = vec![Vec::new(); order.len()];
    for (edge_idx, edge) in doc.edges().iter().enumerate() {
        if let (Some(&from), Some(&to)) = (rank.get(&edge.source), rank.get(&edge.target)) {
            adjacency[from].push((to, edge_idx));
        }
    }

    let n = order.len();
    let mut search = CircuitSearch {
        adjacency: &adjacency,
        cap,
        blocked: vec![false; n],
        blocked_by: vec![Vec::new(); n],
        node_path: Vec::new(),
        edge_path: Vec::new(),
        circuits: Vec::new(),
        truncated: false,
    };
    for start in 0..n {
        if search.truncated {
            break;
        }
        search.blocked[start..].fill(false);
        search.blocked_by[start..].iter_mut().for_each(Vec::clear);
        search.node_path.push(start);
        search.circuit(start, start);
        search.node_path.pop();
    }

    let mut reinforcing = 0;
    let mut balancing = 0;
    let loops = search
        .circuits
        .iter()
        .map(|(node_ranks, edge_idxs)| {
            let edges: Vec<_> = edge_idxs.iter().map(|&i| &doc.edges()[i]).collect();
            let negatives = edges.iter().filter(|e| e.polarity == Polarity::Negative).count();
            let polarity = LoopPolarity::from_negative_count(negatives);
            let counter = match polarity {
                LoopPolarity::Reinforcing => &mut reinforcing,
                LoopPolarity::Balancing => &mut balancing,
            };
            *counter += 1;
            FeedbackLoop {
                id: format!("{}{}", polarity.prefix(), counter),
                nodes: node_ranks.iter().map(|&r| order[r]).collect(),
                edges: edges.iter().map(|e| e.id).collect(),
                polarity,
                has_delay: edges.iter().any(|e| e.has_delay()),
                strength: edges.iter().map(|e| e.strength).product(),
            }
        })
        .collect();

    LoopReport { loops, truncated: search.truncated }
}

struct CircuitSearch<'a> {
    adjacency: &'a [Vec<(usize, usize)>],
    cap: usize,
    blocked: Vec<bool>,
    /// `blocked_by[w]` holds nodes to unblock once `w` is unblocked.
    blocked_by: Vec<Vec<usize>>,
    node_path: Vec<usize>,
    edge_path: Vec<usize>,
    circuits: Vec<(Vec<usize>, Vec<usize>)>,
    truncated: bool,
}

impl CircuitSearch<'_> {
    /// Returns whether any circuit through `current` back to `start` was found.
    fn circuit(&mut self, start: usize, current: usize) -> bool {
        let adjacency = self.adjacency;
        let mut found = false;
        self.blocked[current] = true;

        for &(next, edge_idx) in &adjacency[current] {
            if self.truncated {
                return found;
            }
            if next == start {
                if self.circuits.len() >= self.cap {
                    self.truncated = true;
                    return found;
                }
                let mut edges = self.edge_path.clone();
                edges.push(edge_idx);
                self.circuits.push((self.node_path.clone(), edges));
                found = true;
            } else if next > start && !self.blocked[next] {
                self.node_path.push(next);
                self.edge_path.push(edge_idx);
                found |= self.circuit(start, next);
                self.edge_path.pop();
                self.node_path.pop();
            }
        }

        if found {
            self.unblock(current);
        } else {
            for &(next, _) in &adjacency[current] {
                if next > start && !self.blocked_by[next].contains(&current) {
                    self.blocked_by[next].push(current);
                }
            }
        }
        found
    }

    fn unblock(&mut self, node: usize) {
        self.blocked[node] = false;
        for waiting in std::mem::take(&mut self.blocked_by[node]) {
            if self.blocked[waiting] {
                self.unblock(waiting);
            }
        }
    }
}
