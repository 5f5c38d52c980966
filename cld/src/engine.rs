use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use time::OffsetDateTime;

use crate::camera::{Camera, Point};
use crate::consts::{CANVAS_EXTENT_X, CANVAS_EXTENT_Y, CLICK_SLOP_PX, DEFAULT_HISTORY_LIMIT, PLACEMENT_MARGIN};
use crate::doc::{Edge, EdgeId, EdgePatch, EdgeStyle, GraphDoc, Node, NodeId, NodeKind, NodePatch};
use crate::export::{self, ExportError, ExportFormat};
use crate::history::{Edit, History};
use crate::hit::{self, Hit, NodePart};
use crate::input::{Button, InputState, Key, Mode, Modifiers, Selection, UiState, WheelDelta};
use crate::loops::{self, LoopReport};
use crate::template;

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("edge not found: {0}")]
    EdgeNotFound(EdgeId),
    #[error("unknown template: {0}")]
    UnknownTemplate(String),
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Construction-time settings for an editor instance.
#[derive(Debug, Clone, Copy)]
pub struct EditorConfig {
    /// Undo depth. Zero disables history.
    pub history_limit: usize,
    /// Seed for node placement. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// World-space area new nodes are scattered over.
    pub extent_x: f64,
    pub extent_y: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self { history_limit: DEFAULT_HISTORY_LIMIT, seed: None, extent_x: CANVAS_EXTENT_X, extent_y: CANVAS_EXTENT_Y }
    }
}

/// Effects returned from editor operations for the host to process.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    NodeCreated { node: Node },
    NodeUpdated { node: Node },
    NodeDeleted { id: NodeId },
    EdgeCreated { edge: Edge },
    EdgeUpdated { edge: Edge },
    EdgeDeleted { id: EdgeId },
    /// The whole document changed (import, restore, or undoing either).
    DocumentReplaced,
    SelectionChanged { selection: Selection },
    ModeChanged { mode: Mode },
    /// A click in comment mode; the host decides what to pin there.
    CommentRequested { world: Point },
    SetCursor { cursor: String },
    RenderNeeded,
}

fn cursor(name: &str) -> Action {
    Action::SetCursor { cursor: name.to_owned() }
}

/// Actions describing the effect of an edit that has just been applied.
fn edit_actions(edit: &Edit) -> Vec<Action> {
    match edit {
        Edit::AddNode { node, edges, .. } => {
            let mut out = vec![Action::NodeCreated { node: node.clone() }];
            out.extend(edges.iter().map(|(_, e)| Action::EdgeCreated { edge: e.clone() }));
            out
        }
        Edit::RemoveNode { node, edges, .. } => {
            let mut out: Vec<Action> = edges.iter().map(|(_, e)| Action::EdgeDeleted { id: e.id }).collect();
            out.push(Action::NodeDeleted { id: node.id });
            out
        }
        Edit::AddEdge { edge, .. } => vec![Action::EdgeCreated { edge: edge.clone() }],
        Edit::RemoveEdge { edge, .. } => vec![Action::EdgeDeleted { id: edge.id }],
        Edit::UpdateNode { after, .. } => vec![Action::NodeUpdated { node: after.clone() }],
        Edit::UpdateEdge { after, .. } => vec![Action::EdgeUpdated { edge: after.clone() }],
        Edit::ReplaceDoc { .. } => vec![Action::DocumentReplaced],
    }
}

fn require_finite(field: &'static str, value: f64) -> Result<(), EditorError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EditorError::InvalidValue { field, reason: format!("{value} is not a finite number") })
    }
}

fn validate_node_patch(patch: &NodePatch) -> Result<(), EditorError> {
    if let Some(x) = patch.x {
        require_finite("x", x)?;
    }
    if let Some(y) = patch.y {
        require_finite("y", y)?;
    }
    if let Some(Some(value)) = patch.value {
        require_finite("value", value)?;
    }
    if let Some(Some(band)) = patch.band {
        require_finite("band.min", band.min)?;
        require_finite("band.max", band.max)?;
        if !band.is_well_formed() {
            return Err(EditorError::InvalidValue {
                field: "band",
                reason: format!("min {} is greater than max {}", band.min, band.max),
            });
        }
    }
    if let Some(size) = patch.font_size {
        require_finite("fontSize", size)?;
        if size <= 0.0 {
            return Err(EditorError::InvalidValue { field: "fontSize", reason: "must be positive".into() });
        }
    }
    Ok(())
}

fn validate_edge_patch(patch: &EdgePatch) -> Result<(), EditorError> {
    if let Some(strength) = patch.strength {
        require_finite("strength", strength)?;
    }
    if let Some(width) = patch.stroke_width {
        require_finite("strokeWidth", width)?;
        if width < 0.0 {
            return Err(EditorError::InvalidValue { field: "strokeWidth", reason: "must not be negative".into() });
        }
    }
    Ok(())
}

/// Editor state and every operation on it. Host-agnostic: the browser shell,
/// the HTTP service and the CLI all drive the same core.
pub struct EditorCore {
    pub doc: GraphDoc,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    history: History,
    rng: StdRng,
    config: EditorConfig,
}

impl Default for EditorCore {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl EditorCore {
    #[must_use]
    pub fn new(config: EditorConfig) -> Self {
        let rng = config.seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            doc: GraphDoc::new(),
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            history: History::new(config.history_limit),
            rng,
            config,
        }
    }

    /// Editor over an existing document, with empty history.
    #[must_use]
    pub fn with_doc(config: EditorConfig, doc: GraphDoc) -> Self {
        let mut core = Self::new(config);
        core.doc = doc;
        core
    }

    #[must_use]
    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    // --- Document edits ---

    fn commit(&mut self, edit: Edit) -> Vec<Action> {
        edit.apply(&mut self.doc);
        let actions = edit_actions(&edit);
        self.history.record(edit);
        actions
    }

    fn random_position(&mut self) -> (f64, f64) {
        let span_x = (self.config.extent_x - 2.0 * PLACEMENT_MARGIN).max(0.0);
        let span_y = (self.config.extent_y - 2.0 * PLACEMENT_MARGIN).max(0.0);
        let x = PLACEMENT_MARGIN + self.rng.random::<f64>() * span_x;
        let y = PLACEMENT_MARGIN + self.rng.random::<f64>() * span_y;
        (x, y)
    }

    /// Append `node` as a new undoable step.
    pub fn insert_node(&mut self, node: Node) -> Vec<Action> {
        let index = self.doc.node_count();
        self.commit(Edit::AddNode { index, node, edges: Vec::new() })
    }

    /// Add a node of `kind` at a pseudo-random canvas position.
    pub fn add_node(&mut self, kind: NodeKind) -> Vec<Action> {
        let (x, y) = self.random_position();
        self.insert_node(Node::new(kind, x, y))
    }

    /// Add a node of `kind` centered at `(x, y)`.
    ///
    /// # Errors
    ///
    /// `InvalidValue` when a coordinate is not finite.
    pub fn add_node_at(&mut self, kind: NodeKind, x: f64, y: f64) -> Result<Vec<Action>, EditorError> {
        require_finite("x", x)?;
        require_finite("y", y)?;
        Ok(self.insert_node(Node::new(kind, x, y)))
    }

    /// Add a node pre-filled from the template named `key`.
    ///
    /// # Errors
    ///
    /// `UnknownTemplate` when no template has that key.
    pub fn add_from_template(&mut self, key: &str) -> Result<Vec<Action>, EditorError> {
        let template = template::find(key).ok_or_else(|| EditorError::UnknownTemplate(key.to_owned()))?;
        let (x, y) = self.random_position();
        Ok(self.insert_node(template.instantiate(x, y)))
    }

    /// Link `source` to `target` with a positive, undelayed, unit-strength edge.
    /// Self-loops and parallel edges are allowed.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` when either endpoint is missing.
    pub fn connect(&mut self, source: NodeId, target: NodeId) -> Result<Vec<Action>, EditorError> {
        for id in [source, target] {
            if !self.doc.contains_node(&id) {
                return Err(EditorError::NodeNotFound(id));
            }
        }
        let index = self.doc.edge_count();
        Ok(self.commit(Edit::AddEdge { index, edge: Edge::new(source, target) }))
    }

    /// Delete a node together with every edge touching it, as one undo step.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` when the node is missing.
    pub fn delete_node(&mut self, id: &NodeId) -> Result<Vec<Action>, EditorError> {
        let index = self.doc.node_index(id).ok_or(EditorError::NodeNotFound(*id))?;
        let node = self.doc.nodes()[index].clone();
        let edges = self.doc.edges_touching(id);
        let mut actions = self.commit(Edit::RemoveNode { index, node, edges });
        self.prune_selection(&mut actions);
        Ok(actions)
    }

    /// # Errors
    ///
    /// `EdgeNotFound` when the edge is missing.
    pub fn delete_edge(&mut self, id: &EdgeId) -> Result<Vec<Action>, EditorError> {
        let index = self.doc.edge_index(id).ok_or(EditorError::EdgeNotFound(*id))?;
        let edge = self.doc.edges()[index].clone();
        let mut actions = self.commit(Edit::RemoveEdge { index, edge });
        self.prune_selection(&mut actions);
        Ok(actions)
    }

    /// Delete whatever is selected. No-op with nothing selected.
    pub fn delete_selected(&mut self) -> Vec<Action> {
        let result = match self.ui.selection {
            Selection::Node(id) => self.delete_node(&id),
            Selection::Edge(id) => self.delete_edge(&id),
            Selection::None => return Vec::new(),
        };
        result.unwrap_or_else(|_| {
            let mut actions = Vec::new();
            self.prune_selection(&mut actions);
            actions
        })
    }

    /// Apply a sparse update to a node. Empty or no-change patches record nothing.
    ///
    /// # Errors
    ///
    /// `NodeNotFound`, or `InvalidValue` for non-finite numbers, an inverted
    /// band, or a non-positive font size.
    pub fn update_node(&mut self, id: &NodeId, patch: &NodePatch) -> Result<Vec<Action>, EditorError> {
        let before = self.doc.node(id).cloned().ok_or(EditorError::NodeNotFound(*id))?;
        validate_node_patch(patch)?;
        let mut after = before.clone();
        patch.apply_to(&mut after);
        if after == before {
            return Ok(Vec::new());
        }
        Ok(self.commit(Edit::UpdateNode { before, after }))
    }

    /// Apply a sparse update to an edge. A polarity change recolors an edge
    /// still wearing the default color for its old polarity.
    ///
    /// # Errors
    ///
    /// `EdgeNotFound`, or `InvalidValue` for a non-finite strength or a
    /// negative stroke width.
    pub fn update_edge(&mut self, id: &EdgeId, patch: &EdgePatch) -> Result<Vec<Action>, EditorError> {
        let before = self.doc.edge(id).cloned().ok_or(EditorError::EdgeNotFound(*id))?;
        validate_edge_patch(patch)?;
        let mut after = before.clone();
        patch.apply_to(&mut after);
        if patch.color.is_none() && after.polarity != before.polarity {
            if before.style.color == EdgeStyle::for_polarity(before.polarity).color {
                after.style.color = EdgeStyle::for_polarity(after.polarity).color;
            }
        }
        if after == before {
            return Ok(Vec::new());
        }
        Ok(self.commit(Edit::UpdateEdge { before, after }))
    }

    /// Hydrate from storage. Clears history, selection and any gesture.
    pub fn load(&mut self, doc: GraphDoc) {
        self.doc = doc;
        self.history.clear();
        self.ui.selection = Selection::None;
        self.input = InputState::Idle;
    }

    /// Swap in a whole document as one undoable step.
    pub fn replace_doc(&mut self, doc: GraphDoc) -> Vec<Action> {
        let before = self.doc.clone();
        self.input = InputState::Idle;
        let mut actions = self.commit(Edit::ReplaceDoc { before, after: doc });
        self.prune_selection(&mut actions);
        actions
    }

    // --- History ---

    pub fn undo(&mut self) -> Vec<Action> {
        self.input = InputState::Idle;
        let Some(edit) = self.history.undo(&mut self.doc) else {
            return Vec::new();
        };
        let mut actions = edit_actions(&edit.inverse());
        self.prune_selection(&mut actions);
        actions
    }

    pub fn redo(&mut self) -> Vec<Action> {
        self.input = InputState::Idle;
        let Some(edit) = self.history.redo(&mut self.doc) else {
            return Vec::new();
        };
        let mut actions = edit_actions(&edit);
        self.prune_selection(&mut actions);
        actions
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    // --- Selection / mode ---

    fn set_selection(&mut self, selection: Selection) -> Vec<Action> {
        if self.ui.selection == selection {
            return Vec::new();
        }
        self.ui.selection = selection;
        vec![Action::SelectionChanged { selection }, Action::RenderNeeded]
    }

    /// Drop a selection whose target no longer exists.
    fn prune_selection(&mut self, actions: &mut Vec<Action>) {
        let stale = match self.ui.selection {
            Selection::Node(id) => !self.doc.contains_node(&id),
            Selection::Edge(id) => self.doc.edge(&id).is_none(),
            Selection::None => false,
        };
        if stale {
            self.ui.selection = Selection::None;
            actions.push(Action::SelectionChanged { selection: Selection::None });
        }
    }

    /// Select a node, replacing any node or edge selection.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` when the node is missing.
    pub fn select_node(&mut self, id: &NodeId) -> Result<Vec<Action>, EditorError> {
        if !self.doc.contains_node(id) {
            return Err(EditorError::NodeNotFound(*id));
        }
        Ok(self.set_selection(Selection::Node(*id)))
    }

    /// Select an edge, replacing any node or edge selection.
    ///
    /// # Errors
    ///
    /// `EdgeNotFound` when the edge is missing.
    pub fn select_edge(&mut self, id: &EdgeId) -> Result<Vec<Action>, EditorError> {
        if self.doc.edge(id).is_none() {
            return Err(EditorError::EdgeNotFound(*id));
        }
        Ok(self.set_selection(Selection::Edge(*id)))
    }

    pub fn clear_selection(&mut self) -> Vec<Action> {
        self.set_selection(Selection::None)
    }

    /// Switch interaction mode, abandoning any gesture in progress.
    pub fn set_mode(&mut self, mode: Mode) -> Vec<Action> {
        self.input = InputState::Idle;
        if self.ui.mode == mode {
            return Vec::new();
        }
        self.ui.mode = mode;
        vec![Action::ModeChanged { mode }, cursor(if mode == Mode::Select { "default" } else { "crosshair" })]
    }

    fn toggle_mode(&mut self, mode: Mode) -> Vec<Action> {
        let next = if self.ui.mode == mode { Mode::Select } else { mode };
        self.set_mode(next)
    }

    // --- Input events ---

    pub fn on_key_down(&mut self, key: Key, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.command() {
            if key.is("z") {
                return if modifiers.shift { self.redo() } else { self.undo() };
            }
            if key.is("y") {
                return self.redo();
            }
            return Vec::new();
        }

        if key.is("n") {
            self.add_node(NodeKind::Stock)
        } else if key.is("c") {
            self.toggle_mode(Mode::Comment)
        } else if key.is("l") {
            self.toggle_mode(Mode::Link)
        } else if key.is("Delete") || key.is("Backspace") {
            self.delete_selected()
        } else if key.is("Escape") {
            if matches!(self.input, InputState::Idle) {
                self.clear_selection()
            } else {
                self.cancel_gesture()
            }
        } else {
            Vec::new()
        }
    }

    fn cancel_gesture(&mut self) -> Vec<Action> {
        if let InputState::DraggingNode { id, orig_x, orig_y, .. } = self.input {
            if let Some(node) = self.doc.node_mut(&id) {
                node.x = orig_x;
                node.y = orig_y;
            }
        }
        self.input = InputState::Idle;
        vec![Action::RenderNeeded]
    }

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        match button {
            Button::Middle => {
                self.input = InputState::Panning { last_screen: screen_pt };
                return vec![cursor("grabbing")];
            }
            Button::Secondary => return Vec::new(),
            Button::Primary => {}
        }

        if self.ui.mode == Mode::Comment {
            return vec![Action::CommentRequested { world }];
        }

        match hit::hit_test(world, &self.doc, &self.camera) {
            Some(Hit::Node { id, part: NodePart::Anchor(_) }) => self.begin_connect(id, world),
            Some(Hit::Node { id, part: NodePart::Body }) if self.ui.mode == Mode::Link => self.begin_connect(id, world),
            Some(Hit::Node { id, part: NodePart::Body }) => {
                let Some(node) = self.doc.node(&id) else {
                    return Vec::new();
                };
                self.input =
                    InputState::DraggingNode { id, last_world: world, orig_x: node.x, orig_y: node.y, moved: false };
                let mut actions = self.set_selection(Selection::Node(id));
                actions.push(cursor("move"));
                actions
            }
            Some(Hit::Edge { id }) => self.set_selection(Selection::Edge(id)),
            None => {
                self.input = InputState::Panning { last_screen: screen_pt };
                let mut actions = self.clear_selection();
                actions.push(cursor("grabbing"));
                actions
            }
        }
    }

    fn begin_connect(&mut self, source: NodeId, world: Point) -> Vec<Action> {
        self.input = InputState::Connecting { source, cursor_world: world, left_source: false };
        vec![cursor("crosshair"), Action::RenderNeeded]
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        let slop = self.camera.screen_dist_to_world(CLICK_SLOP_PX);
        match &mut self.input {
            InputState::Idle => {
                let name = match hit::hit_test(world, &self.doc, &self.camera) {
                    Some(Hit::Node { part: NodePart::Anchor(_), .. }) => "crosshair",
                    Some(Hit::Node { .. }) => "move",
                    Some(Hit::Edge { .. }) => "pointer",
                    None => "default",
                };
                vec![cursor(name)]
            }
            InputState::Panning { last_screen } => {
                let (dx, dy) = (screen_pt.x - last_screen.x, screen_pt.y - last_screen.y);
                *last_screen = screen_pt;
                self.camera.pan_by(dx, dy);
                vec![Action::RenderNeeded]
            }
            InputState::DraggingNode { id, last_world, orig_x, orig_y, moved } => {
                let (dx, dy) = (world.x - last_world.x, world.y - last_world.y);
                *last_world = world;
                let Some(node) = self.doc.node_mut(id) else {
                    return Vec::new();
                };
                node.x += dx;
                node.y += dy;
                if Point::new(node.x, node.y).distance(Point::new(*orig_x, *orig_y)) > slop {
                    *moved = true;
                }
                vec![Action::RenderNeeded]
            }
            InputState::Connecting { source, cursor_world, left_source } => {
                *cursor_world = world;
                if hit::node_at(world, &self.doc) != Some(*source) {
                    *left_source = true;
                }
                vec![Action::RenderNeeded]
            }
        }
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        match std::mem::take(&mut self.input) {
            InputState::Idle => Vec::new(),
            InputState::Panning { .. } => vec![cursor("default")],
            InputState::DraggingNode { id, orig_x, orig_y, moved, .. } => {
                let Some(node) = self.doc.node_mut(&id) else {
                    return Vec::new();
                };
                if !moved {
                    node.x = orig_x;
                    node.y = orig_y;
                    return vec![cursor("default")];
                }
                let after = node.clone();
                let mut before = after.clone();
                before.x = orig_x;
                before.y = orig_y;
                let mut actions = self.commit(Edit::UpdateNode { before, after });
                actions.push(cursor("default"));
                actions
            }
            InputState::Connecting { source, left_source, .. } => {
                let mut actions = vec![cursor("default"), Action::RenderNeeded];
                if let Some(target) = hit::node_at(world, &self.doc) {
                    if target != source || left_source {
                        if let Ok(created) = self.connect(source, target) {
                            actions.extend(created);
                        }
                    }
                }
                actions
            }
        }
    }

    /// Ctrl/Cmd + wheel zooms around the cursor; plain wheel pans.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.command() {
            self.camera.zoom_at(screen_pt, delta.dy);
        } else {
            self.camera.pan_by(-delta.dx, -delta.dy);
        }
        vec![Action::RenderNeeded]
    }

    // --- Export / import ---

    /// # Errors
    ///
    /// See [`export::export_json`].
    pub fn export_json(&self) -> Result<String, EditorError> {
        Ok(export::export_json(&self.doc, OffsetDateTime::now_utc())?)
    }

    /// # Errors
    ///
    /// `Export(Unsupported)` for formats this crate cannot produce.
    pub fn export(&self, format: ExportFormat) -> Result<Vec<u8>, EditorError> {
        Ok(export::export(&self.doc, format, OffsetDateTime::now_utc())?)
    }

    /// Replace the document with a validated import, as one undoable step.
    ///
    /// # Errors
    ///
    /// Any [`ExportError`] from parsing or validation; the document is untouched.
    pub fn import_json(&mut self, raw: &str) -> Result<Vec<Action>, EditorError> {
        let imported = export::import_json(raw)?;
        Ok(self.replace_doc(imported.into_doc()))
    }

    // --- Queries ---

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.doc.node(id)
    }

    #[must_use]
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.doc.edge(id)
    }

    #[must_use]
    pub fn selection(&self) -> Selection {
        self.ui.selection
    }

    #[must_use]
    pub fn mode(&self) -> Mode {
        self.ui.mode
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn loops(&self) -> LoopReport {
        loops::find_loops(&self.doc)
    }
}
