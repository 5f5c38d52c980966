//! Undo/redo history built from invertible edits.
//!
//! Every document mutation made through the editor is expressed as an `Edit`
//! that carries enough state to be reversed: removals remember the index they
//! came from and the edges they took with them, updates carry both the before
//! and after values. Undo applies `edit.inverse()`, redo re-applies the edit.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use crate::doc::{Edge, GraphDoc, Node};

/// A reversible document mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    /// Insert `node` at `index`, then each edge at its recorded index (ascending).
    AddNode { index: usize, node: Node, edges: Vec<(usize, Edge)> },
    /// Remove the recorded edges, then the node. Mirror of `AddNode`.
    RemoveNode { index: usize, node: Node, edges: Vec<(usize, Edge)> },
    AddEdge { index: usize, edge: Edge },
    RemoveEdge { index: usize, edge: Edge },
    UpdateNode { before: Node, after: Node },
    UpdateEdge { before: Edge, after: Edge },
    /// Whole-document swap, used by import and version restore.
    ReplaceDoc { before: GraphDoc, after: GraphDoc },
}

impl Edit {
    /// Apply this edit to `doc`.
    pub fn apply(&self, doc: &mut GraphDoc) {
        match self {
            Self::AddNode { index, node, edges } => {
                doc.insert_node_at(*index, node.clone());
                for (i, edge) in edges {
                    doc.insert_edge_at(*i, edge.clone());
                }
            }
            Self::RemoveNode { node, edges, .. } => {
                for (_, edge) in edges.iter().rev() {
                    doc.remove_edge(&edge.id);
                }
                doc.remove_node(&node.id);
            }
            Self::AddEdge { index, edge } => doc.insert_edge_at(*index, edge.clone()),
            Self::RemoveEdge { edge, .. } => {
                doc.remove_edge(&edge.id);
            }
            Self::UpdateNode { after, .. } => doc.insert_node(after.clone()),
            Self::UpdateEdge { after, .. } => doc.insert_edge(after.clone()),
            Self::ReplaceDoc { after, .. } => *doc = after.clone(),
        }
    }

    /// The edit that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Edit {
        match self.clone() {
            Self::AddNode { index, node, edges } => Self::RemoveNode { index, node, edges },
            Self::RemoveNode { index, node, edges } => Self::AddNode { index, node, edges },
            Self::AddEdge { index, edge } => Self::RemoveEdge { index, edge },
            Self::RemoveEdge { index, edge } => Self::AddEdge { index, edge },
            Self::UpdateNode { before, after } => Self::UpdateNode { before: after, after: before },
            Self::UpdateEdge { before, after } => Self::UpdateEdge { before: after, after: before },
            Self::ReplaceDoc { before, after } => Self::ReplaceDoc { before: after, after: before },
        }
    }

    /// Short human label ("Add node", "Edit edge", ...) for menus and logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddNode { .. } => "Add node",
            Self::RemoveNode { .. } => "Delete node",
            Self::AddEdge { .. } => "Add link",
            Self::RemoveEdge { .. } => "Delete link",
            Self::UpdateNode { .. } => "Edit node",
            Self::UpdateEdge { .. } => "Edit link",
            Self::ReplaceDoc { .. } => "Replace diagram",
        }
    }
}

/// Bounded undo stack plus redo stack.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Edit>,
    redo: Vec<Edit>,
    limit: usize,
}

impl History {
    /// A history keeping at most `limit` undo steps. A limit of zero disables recording.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { undo: VecDeque::new(), redo: Vec::new(), limit }
    }

    /// Record an edit that has already been applied. Clears the redo stack.
    pub fn record(&mut self, edit: Edit) {
        self.redo.clear();
        if self.limit == 0 {
            return;
        }
        self.undo.push_back(edit);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    /// Revert the most recent edit. Returns the edit that was undone.
    pub fn undo(&mut self, doc: &mut GraphDoc) -> Option<Edit> {
        let edit = self.undo.pop_back()?;
        edit.inverse().apply(doc);
        self.redo.push(edit.clone());
        Some(edit)
    }

    /// Re-apply the most recently undone edit.
    pub fn redo(&mut self, doc: &mut GraphDoc) -> Option<Edit> {
        let edit = self.redo.pop()?;
        edit.apply(doc);
        self.undo.push_back(edit.clone());
        Some(edit)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    /// Label of the edit the next undo would revert.
    #[must_use]
    pub fn undo_label(&self) -> Option<&'static str> {
        self.undo.back().map(Edit::label)
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}
