#![allow(clippy::float_cmp)]

use std::collections::HashSet;

use super::*;
use crate::doc::{Band, Polarity};
use crate::loops::LoopPolarity;

// =============================================================
// Helpers
// =============================================================

fn core() -> EditorCore {
    EditorCore::new(EditorConfig { seed: Some(7), ..EditorConfig::default() })
}

fn no_modifiers() -> Modifiers {
    Modifiers::default()
}

fn ctrl_modifier() -> Modifiers {
    Modifiers { ctrl: true, ..Default::default() }
}

fn ctrl_shift_modifier() -> Modifiers {
    Modifiers { ctrl: true, shift: true, ..Default::default() }
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn key(name: &str) -> Key {
    Key::new(name)
}

fn created_node(actions: &[Action]) -> NodeId {
    actions
        .iter()
        .find_map(|a| match a {
            Action::NodeCreated { node } => Some(node.id),
            _ => None,
        })
        .expect("no NodeCreated action")
}

fn created_edge(actions: &[Action]) -> EdgeId {
    actions
        .iter()
        .find_map(|a| match a {
            Action::EdgeCreated { edge } => Some(edge.id),
            _ => None,
        })
        .expect("no EdgeCreated action")
}

fn has_action<F>(actions: &[Action], pred: F) -> bool
where
    F: Fn(&Action) -> bool,
{
    actions.iter().any(pred)
}

fn has_render_needed(actions: &[Action]) -> bool {
    has_action(actions, |a| matches!(a, Action::RenderNeeded))
}

/// Stock at (100,100) and stock at (400,100), no edges.
fn two_stocks(core: &mut EditorCore) -> (NodeId, NodeId) {
    let a = created_node(&core.add_node_at(NodeKind::Stock, 100.0, 100.0).unwrap());
    let b = created_node(&core.add_node_at(NodeKind::Stock, 400.0, 100.0).unwrap());
    (a, b)
}

// =============================================================
// EditorCore: construction and defaults
// =============================================================

#[test]
fn core_new_is_empty() {
    let core = core();
    assert!(core.doc.is_empty());
    assert_eq!(core.selection(), Selection::None);
    assert_eq!(core.mode(), Mode::Select);
    assert!(matches!(core.input, InputState::Idle));
    assert!(!core.can_undo());
    assert!(!core.can_redo());
}

#[test]
fn core_default_camera_is_identity() {
    let core = EditorCore::default();
    assert_eq!(core.camera().zoom, 1.0);
    assert_eq!(core.camera().pan_x, 0.0);
    assert_eq!(core.camera().pan_y, 0.0);
}

#[test]
fn core_with_doc_starts_without_history() {
    let mut doc = GraphDoc::new();
    doc.insert_node(Node::new(NodeKind::Flow, 0.0, 0.0));
    let core = EditorCore::with_doc(EditorConfig::default(), doc);
    assert_eq!(core.doc.node_count(), 1);
    assert!(!core.can_undo());
}

// =============================================================
// Add node
// =============================================================

#[test]
fn add_node_has_requested_kind_and_unique_id() {
    let mut core = core();
    let mut ids = HashSet::new();
    for kind in [NodeKind::Stock, NodeKind::Flow, NodeKind::Connector, NodeKind::Stock] {
        let id = created_node(&core.add_node(kind));
        assert_eq!(core.node(&id).unwrap().node_type, kind);
        assert!(ids.insert(id));
    }
    assert_eq!(core.doc.node_count(), 4);
}

#[test]
fn add_node_uses_default_metadata() {
    let mut core = core();
    let id = created_node(&core.add_node(NodeKind::Flow));
    let node = core.node(&id).unwrap();
    assert_eq!(node.label, "New Flow");
    assert!(node.enabled);
    assert_eq!(node.value, None);
}

#[test]
fn add_node_placement_is_within_extent() {
    let mut core = core();
    for _ in 0..50 {
        let id = created_node(&core.add_node(NodeKind::Connector));
        let node = core.node(&id).unwrap();
        assert!((PLACEMENT_MARGIN..=CANVAS_EXTENT_X - PLACEMENT_MARGIN).contains(&node.x));
        assert!((PLACEMENT_MARGIN..=CANVAS_EXTENT_Y - PLACEMENT_MARGIN).contains(&node.y));
    }
}

#[test]
fn add_node_placement_is_reproducible_with_seed() {
    let mut first = core();
    let mut second = core();
    let a = created_node(&first.add_node(NodeKind::Stock));
    let b = created_node(&second.add_node(NodeKind::Stock));
    let (na, nb) = (first.node(&a).unwrap(), second.node(&b).unwrap());
    assert_eq!((na.x, na.y), (nb.x, nb.y));
}

#[test]
fn add_node_at_rejects_non_finite() {
    let mut core = core();
    assert!(matches!(
        core.add_node_at(NodeKind::Stock, f64::NAN, 0.0),
        Err(EditorError::InvalidValue { field: "x", .. })
    ));
    assert!(core.doc.is_empty());
}

#[test]
fn add_from_template_copies_metadata() {
    let mut core = core();
    let id = created_node(&core.add_from_template("dei-index").unwrap());
    let node = core.node(&id).unwrap();
    assert_eq!(node.label, "DEI Index");
    assert_eq!(node.band, Some(Band::new(0.6, 0.85)));
}

#[test]
fn add_from_unknown_template_fails() {
    let mut core = core();
    assert!(matches!(core.add_from_template("nope"), Err(EditorError::UnknownTemplate(k)) if k == "nope"));
}

// =============================================================
// Connect
// =============================================================

#[test]
fn connect_creates_exactly_one_default_edge() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let before = core.doc.edge_count();
    let id = created_edge(&core.connect(a, b).unwrap());
    assert_eq!(core.doc.edge_count(), before + 1);
    let edge = core.edge(&id).unwrap();
    assert_eq!(edge.source, a);
    assert_eq!(edge.target, b);
    assert_eq!(edge.polarity, Polarity::Positive);
    assert_eq!(edge.delay, "none");
    assert_eq!(edge.strength, 1.0);
}

#[test]
fn connect_allows_self_loops_and_duplicates() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    core.connect(a, a).unwrap();
    core.connect(a, b).unwrap();
    core.connect(a, b).unwrap();
    core.connect(b, a).unwrap();
    assert_eq!(core.doc.edge_count(), 4);
}

#[test]
fn connect_missing_node_fails() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    let ghost = uuid::Uuid::new_v4();
    assert!(matches!(core.connect(a, ghost), Err(EditorError::NodeNotFound(id)) if id == ghost));
    assert_eq!(core.doc.edge_count(), 0);
}

// =============================================================
// Selection
// =============================================================

#[test]
fn selecting_node_clears_edge_and_vice_versa() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let e = created_edge(&core.connect(a, b).unwrap());

    core.select_edge(&e).unwrap();
    assert_eq!(core.selection(), Selection::Edge(e));

    core.select_node(&a).unwrap();
    assert_eq!(core.selection(), Selection::Node(a));
    assert_eq!(core.selection().edge(), None);

    core.select_edge(&e).unwrap();
    assert_eq!(core.selection().node(), None);
}

#[test]
fn select_missing_fails_and_keeps_selection() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    core.select_node(&a).unwrap();
    assert!(core.select_edge(&uuid::Uuid::new_v4()).is_err());
    assert_eq!(core.selection(), Selection::Node(a));
}

#[test]
fn reselecting_same_item_emits_nothing() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    assert!(!core.select_node(&a).unwrap().is_empty());
    assert!(core.select_node(&a).unwrap().is_empty());
}

#[test]
fn clear_selection_emits_change() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    core.select_node(&a).unwrap();
    let actions = core.clear_selection();
    assert!(actions.contains(&Action::SelectionChanged { selection: Selection::None }));
    assert!(core.selection().is_none());
}

// =============================================================
// Property edits
// =============================================================

#[test]
fn update_node_touches_only_target() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let b_before = core.node(&b).unwrap().clone();

    let patch = NodePatch { label: Some("Trust".into()), value: Some(Some(0.4)), ..Default::default() };
    let actions = core.update_node(&a, &patch).unwrap();

    assert!(has_action(&actions, |x| matches!(x, Action::NodeUpdated { node } if node.label == "Trust")));
    assert_eq!(core.node(&a).unwrap().value, Some(0.4));
    assert_eq!(core.node(&b).unwrap(), &b_before);
}

#[test]
fn update_edge_touches_only_target() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let e1 = created_edge(&core.connect(a, b).unwrap());
    let e2 = created_edge(&core.connect(b, a).unwrap());
    let e2_before = core.edge(&e2).unwrap().clone();

    let patch = EdgePatch { delay: Some("2 quarters".into()), strength: Some(0.5), ..Default::default() };
    core.update_edge(&e1, &patch).unwrap();

    let edge = core.edge(&e1).unwrap();
    assert_eq!(edge.delay, "2 quarters");
    assert_eq!(edge.strength, 0.5);
    assert_eq!(core.edge(&e2).unwrap(), &e2_before);
}

#[test]
fn polarity_flip_recolors_default_styled_edge() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let e = created_edge(&core.connect(a, b).unwrap());
    core.update_edge(&e, &EdgePatch { polarity: Some(Polarity::Negative), ..Default::default() }).unwrap();
    assert_eq!(core.edge(&e).unwrap().style.color, EdgeStyle::for_polarity(Polarity::Negative).color);
}

#[test]
fn polarity_flip_keeps_custom_color() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let e = created_edge(&core.connect(a, b).unwrap());
    core.update_edge(&e, &EdgePatch { color: Some("#123456".into()), ..Default::default() }).unwrap();
    core.update_edge(&e, &EdgePatch { polarity: Some(Polarity::Negative), ..Default::default() }).unwrap();
    assert_eq!(core.edge(&e).unwrap().style.color, "#123456");
}

#[test]
fn inverted_band_is_rejected() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    let patch = NodePatch { band: Some(Some(Band::new(5.0, 1.0))), ..Default::default() };
    assert!(matches!(core.update_node(&a, &patch), Err(EditorError::InvalidValue { field: "band", .. })));
    assert_eq!(core.node(&a).unwrap().band, None);
}

#[test]
fn non_finite_numbers_are_rejected() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let e = created_edge(&core.connect(a, b).unwrap());
    let node_patch = NodePatch { value: Some(Some(f64::INFINITY)), ..Default::default() };
    assert!(core.update_node(&a, &node_patch).is_err());
    let edge_patch = EdgePatch { strength: Some(f64::NAN), ..Default::default() };
    assert!(core.update_edge(&e, &edge_patch).is_err());
    let width_patch = EdgePatch { stroke_width: Some(-1.0), ..Default::default() };
    assert!(core.update_edge(&e, &width_patch).is_err());
}

#[test]
fn noop_patch_records_nothing() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    let undo_depth = core.history().undo_len();
    assert!(core.update_node(&a, &NodePatch::default()).unwrap().is_empty());
    let same = NodePatch { x: Some(100.0), ..Default::default() };
    assert!(core.update_node(&a, &same).unwrap().is_empty());
    assert_eq!(core.history().undo_len(), undo_depth);
}

#[test]
fn update_missing_node_fails() {
    let mut core = core();
    let ghost = uuid::Uuid::new_v4();
    assert!(matches!(core.update_node(&ghost, &NodePatch::default()), Err(EditorError::NodeNotFound(_))));
    assert!(matches!(core.update_edge(&ghost, &EdgePatch::default()), Err(EditorError::EdgeNotFound(_))));
}

// =============================================================
// Delete
// =============================================================

#[test]
fn delete_node_removes_incident_edges() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let c = created_node(&core.add_node(NodeKind::Flow));
    core.connect(a, b).unwrap();
    core.connect(b, c).unwrap();
    let kept = created_edge(&core.connect(c, a).unwrap());

    let actions = core.delete_node(&b).unwrap();
    assert!(actions.contains(&Action::NodeDeleted { id: b }));
    assert_eq!(actions.iter().filter(|x| matches!(x, Action::EdgeDeleted { .. })).count(), 2);
    assert_eq!(core.doc.node_count(), 2);
    assert_eq!(core.doc.edge_count(), 1);
    assert!(core.edge(&kept).is_some());
    assert!(core.doc.dangling_edges().is_empty());
}

#[test]
fn delete_selected_node_clears_selection() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    core.select_node(&a).unwrap();
    let actions = core.delete_selected();
    assert!(actions.contains(&Action::SelectionChanged { selection: Selection::None }));
    assert!(core.node(&a).is_none());
}

#[test]
fn deleting_node_clears_selection_of_its_edge() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let e = created_edge(&core.connect(a, b).unwrap());
    core.select_edge(&e).unwrap();
    core.delete_node(&a).unwrap();
    assert!(core.selection().is_none());
}

#[test]
fn deleting_other_item_preserves_selection() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    core.select_node(&a).unwrap();
    core.delete_node(&b).unwrap();
    assert_eq!(core.selection(), Selection::Node(a));
}

#[test]
fn delete_selected_with_nothing_selected_is_noop() {
    let mut core = core();
    two_stocks(&mut core);
    assert!(core.delete_selected().is_empty());
    assert_eq!(core.doc.node_count(), 2);
}

// =============================================================
// Undo / redo
// =============================================================

#[test]
fn undo_redo_round_trip_through_mixed_edits() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let e = created_edge(&core.connect(a, b).unwrap());
    core.update_node(&a, &NodePatch { label: Some("A".into()), ..Default::default() }).unwrap();
    core.update_edge(&e, &EdgePatch { polarity: Some(Polarity::Negative), ..Default::default() }).unwrap();
    let final_doc = core.doc.clone();

    let steps = core.history().undo_len();
    for _ in 0..steps {
        assert!(!core.undo().is_empty());
    }
    assert!(core.doc.is_empty());
    assert!(core.undo().is_empty());

    for _ in 0..steps {
        core.redo();
    }
    assert_eq!(core.doc, final_doc);
}

#[test]
fn undo_delete_node_restores_edges_in_place() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    core.connect(a, b).unwrap();
    core.connect(b, b).unwrap();
    let before = core.doc.clone();
    core.delete_node(&b).unwrap();
    let actions = core.undo();
    assert_eq!(core.doc, before);
    assert!(actions.contains(&Action::NodeCreated { node: before.node(&b).unwrap().clone() }));
}

#[test]
fn undo_add_clears_selection_of_removed_node() {
    let mut core = core();
    let id = created_node(&core.add_node(NodeKind::Stock));
    core.select_node(&id).unwrap();
    let actions = core.undo();
    assert!(actions.contains(&Action::NodeDeleted { id }));
    assert!(core.selection().is_none());
}

#[test]
fn new_edit_clears_redo() {
    let mut core = core();
    core.add_node(NodeKind::Stock);
    core.undo();
    assert!(core.can_redo());
    core.add_node(NodeKind::Flow);
    assert!(!core.can_redo());
}

#[test]
fn history_limit_from_config() {
    let mut core = EditorCore::new(EditorConfig { history_limit: 2, seed: Some(1), ..EditorConfig::default() });
    for _ in 0..5 {
        core.add_node(NodeKind::Stock);
    }
    assert_eq!(core.history().undo_len(), 2);
}

// =============================================================
// Mode
// =============================================================

#[test]
fn set_mode_emits_change_once() {
    let mut core = core();
    let actions = core.set_mode(Mode::Link);
    assert!(actions.contains(&Action::ModeChanged { mode: Mode::Link }));
    assert!(core.set_mode(Mode::Link).is_empty());
}

#[test]
fn set_mode_abandons_gesture() {
    let mut core = core();
    core.input = InputState::Panning { last_screen: pt(0.0, 0.0) };
    core.set_mode(Mode::Comment);
    assert!(matches!(core.input, InputState::Idle));
}

// =============================================================
// Key down: accelerators
// =============================================================

#[test]
fn key_n_adds_stock() {
    let mut core = core();
    let actions = core.on_key_down(key("n"), no_modifiers());
    let id = created_node(&actions);
    assert_eq!(core.node(&id).unwrap().node_type, NodeKind::Stock);
}

#[test]
fn key_n_uppercase_also_adds() {
    let mut core = core();
    core.on_key_down(key("N"), no_modifiers());
    assert_eq!(core.doc.node_count(), 1);
}

#[test]
fn key_c_toggles_comment_mode() {
    let mut core = core();
    core.on_key_down(key("c"), no_modifiers());
    assert_eq!(core.mode(), Mode::Comment);
    core.on_key_down(key("c"), no_modifiers());
    assert_eq!(core.mode(), Mode::Select);
}

#[test]
fn key_l_toggles_link_mode() {
    let mut core = core();
    core.on_key_down(key("l"), no_modifiers());
    assert_eq!(core.mode(), Mode::Link);
    core.on_key_down(key("c"), no_modifiers());
    assert_eq!(core.mode(), Mode::Comment);
    core.on_key_down(key("l"), no_modifiers());
    assert_eq!(core.mode(), Mode::Link);
}

#[test]
fn ctrl_z_undoes_and_ctrl_shift_z_redoes() {
    let mut core = core();
    core.add_node(NodeKind::Stock);
    core.on_key_down(key("z"), ctrl_modifier());
    assert!(core.doc.is_empty());
    core.on_key_down(key("Z"), ctrl_shift_modifier());
    assert_eq!(core.doc.node_count(), 1);
}

#[test]
fn ctrl_y_redoes() {
    let mut core = core();
    core.add_node(NodeKind::Stock);
    core.undo();
    core.on_key_down(key("y"), ctrl_modifier());
    assert_eq!(core.doc.node_count(), 1);
}

#[test]
fn meta_z_undoes() {
    let mut core = core();
    core.add_node(NodeKind::Stock);
    core.on_key_down(key("z"), Modifiers { meta: true, ..Default::default() });
    assert!(core.doc.is_empty());
}

#[test]
fn ctrl_n_does_not_add_node() {
    let mut core = core();
    assert!(core.on_key_down(key("n"), ctrl_modifier()).is_empty());
    assert!(core.doc.is_empty());
}

// =============================================================
// Key down: Delete / Escape
// =============================================================

#[test]
fn delete_and_backspace_remove_selection() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let e = created_edge(&core.connect(a, b).unwrap());
    core.select_edge(&e).unwrap();
    core.on_key_down(key("Delete"), no_modifiers());
    assert_eq!(core.doc.edge_count(), 0);

    core.select_node(&a).unwrap();
    core.on_key_down(key("Backspace"), no_modifiers());
    assert!(core.node(&a).is_none());
}

#[test]
fn escape_clears_selection_when_idle() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    core.select_node(&a).unwrap();
    core.on_key_down(key("Escape"), no_modifiers());
    assert!(core.selection().is_none());
}

#[test]
fn escape_cancels_drag_and_restores_position() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary, no_modifiers());
    core.on_pointer_move(pt(180.0, 160.0), no_modifiers());
    let actions = core.on_key_down(key("Escape"), no_modifiers());
    assert!(has_render_needed(&actions));
    assert!(matches!(core.input, InputState::Idle));
    let node = core.node(&a).unwrap();
    assert_eq!((node.x, node.y), (100.0, 100.0));
    assert_eq!(core.selection(), Selection::Node(a));
}

#[test]
fn unknown_key_is_noop() {
    let mut core = core();
    assert!(core.on_key_down(key("q"), no_modifiers()).is_empty());
}

// =============================================================
// Pointer down
// =============================================================

#[test]
fn click_body_selects_and_starts_drag() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    let actions = core.on_pointer_down(pt(100.0, 100.0), Button::Primary, no_modifiers());
    assert!(actions.contains(&Action::SelectionChanged { selection: Selection::Node(a) }));
    match core.input {
        InputState::DraggingNode { id, orig_x, orig_y, moved, .. } => {
            assert_eq!(id, a);
            assert_eq!((orig_x, orig_y), (100.0, 100.0));
            assert!(!moved);
        }
        ref other => panic!("expected DraggingNode, got {other:?}"),
    }
}

#[test]
fn click_edge_selects_it() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let e = created_edge(&core.connect(a, b).unwrap());
    core.on_pointer_down(pt(250.0, 100.0), Button::Primary, no_modifiers());
    assert_eq!(core.selection(), Selection::Edge(e));
}

#[test]
fn click_empty_deselects_and_pans() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    core.select_node(&a).unwrap();
    core.on_pointer_down(pt(600.0, 400.0), Button::Primary, no_modifiers());
    assert!(core.selection().is_none());
    assert!(matches!(core.input, InputState::Panning { .. }));
}

#[test]
fn click_anchor_starts_connecting() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    core.on_pointer_down(pt(170.0, 100.0), Button::Primary, no_modifiers());
    assert!(matches!(core.input, InputState::Connecting { source, left_source: false, .. } if source == a));
}

#[test]
fn link_mode_body_drag_starts_connecting() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    core.set_mode(Mode::Link);
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary, no_modifiers());
    assert!(matches!(core.input, InputState::Connecting { source, .. } if source == a));
}

#[test]
fn comment_mode_click_requests_comment() {
    let mut core = core();
    two_stocks(&mut core);
    core.set_mode(Mode::Comment);
    let actions = core.on_pointer_down(pt(100.0, 100.0), Button::Primary, no_modifiers());
    assert_eq!(actions, vec![Action::CommentRequested { world: pt(100.0, 100.0) }]);
    assert!(core.selection().is_none());
}

#[test]
fn middle_button_pans_in_any_mode() {
    let mut core = core();
    core.set_mode(Mode::Link);
    core.on_pointer_down(pt(10.0, 10.0), Button::Middle, no_modifiers());
    assert!(matches!(core.input, InputState::Panning { .. }));
}

#[test]
fn secondary_button_is_noop() {
    let mut core = core();
    two_stocks(&mut core);
    assert!(core.on_pointer_down(pt(100.0, 100.0), Button::Secondary, no_modifiers()).is_empty());
    assert!(matches!(core.input, InputState::Idle));
}

// =============================================================
// Pointer move / up: dragging
// =============================================================

#[test]
fn drag_moves_node_and_commits_one_edit() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    let depth = core.history().undo_len();

    core.on_pointer_down(pt(100.0, 100.0), Button::Primary, no_modifiers());
    core.on_pointer_move(pt(120.0, 110.0), no_modifiers());
    core.on_pointer_move(pt(150.0, 130.0), no_modifiers());
    let actions = core.on_pointer_up(pt(150.0, 130.0), Button::Primary, no_modifiers());

    let node = core.node(&a).unwrap();
    assert_eq!((node.x, node.y), (150.0, 130.0));
    assert!(has_action(&actions, |x| matches!(x, Action::NodeUpdated { .. })));
    assert_eq!(core.history().undo_len(), depth + 1);

    core.undo();
    let node = core.node(&a).unwrap();
    assert_eq!((node.x, node.y), (100.0, 100.0));
}

#[test]
fn jitter_within_slop_is_a_click() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    let depth = core.history().undo_len();

    core.on_pointer_down(pt(100.0, 100.0), Button::Primary, no_modifiers());
    core.on_pointer_move(pt(101.0, 101.0), no_modifiers());
    let actions = core.on_pointer_up(pt(101.0, 101.0), Button::Primary, no_modifiers());

    assert!(!has_action(&actions, |x| matches!(x, Action::NodeUpdated { .. })));
    let node = core.node(&a).unwrap();
    assert_eq!((node.x, node.y), (100.0, 100.0));
    assert_eq!(core.history().undo_len(), depth);
}

#[test]
fn panning_updates_camera() {
    let mut core = core();
    core.on_pointer_down(pt(10.0, 10.0), Button::Primary, no_modifiers());
    core.on_pointer_move(pt(30.0, 25.0), no_modifiers());
    core.on_pointer_move(pt(40.0, 35.0), no_modifiers());
    core.on_pointer_up(pt(40.0, 35.0), Button::Primary, no_modifiers());
    assert_eq!(core.camera().pan_x, 30.0);
    assert_eq!(core.camera().pan_y, 25.0);
    assert!(matches!(core.input, InputState::Idle));
}

#[test]
fn idle_move_sets_hover_cursor() {
    let mut core = core();
    two_stocks(&mut core);
    let actions = core.on_pointer_move(pt(100.0, 100.0), no_modifiers());
    assert_eq!(actions, vec![Action::SetCursor { cursor: "move".into() }]);
    let actions = core.on_pointer_move(pt(170.0, 100.0), no_modifiers());
    assert_eq!(actions, vec![Action::SetCursor { cursor: "crosshair".into() }]);
}

#[test]
fn pointer_up_idle_is_noop() {
    let mut core = core();
    assert!(core.on_pointer_up(pt(0.0, 0.0), Button::Primary, no_modifiers()).is_empty());
}

// =============================================================
// Pointer move / up: connecting
// =============================================================

#[test]
fn anchor_drag_to_other_node_connects() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    core.on_pointer_down(pt(170.0, 100.0), Button::Primary, no_modifiers());
    core.on_pointer_move(pt(400.0, 100.0), no_modifiers());
    let actions = core.on_pointer_up(pt(400.0, 100.0), Button::Primary, no_modifiers());

    let edge = core.edge(&created_edge(&actions)).unwrap();
    assert_eq!((edge.source, edge.target), (a, b));
    assert_eq!(edge.polarity, Polarity::Positive);
}

#[test]
fn release_on_empty_space_creates_nothing() {
    let mut core = core();
    two_stocks(&mut core);
    core.on_pointer_down(pt(170.0, 100.0), Button::Primary, no_modifiers());
    core.on_pointer_move(pt(250.0, 300.0), no_modifiers());
    let actions = core.on_pointer_up(pt(250.0, 300.0), Button::Primary, no_modifiers());
    assert!(has_render_needed(&actions));
    assert_eq!(core.doc.edge_count(), 0);
}

#[test]
fn click_in_link_mode_does_not_self_loop() {
    let mut core = core();
    two_stocks(&mut core);
    core.set_mode(Mode::Link);
    core.on_pointer_down(pt(100.0, 100.0), Button::Primary, no_modifiers());
    core.on_pointer_up(pt(100.0, 100.0), Button::Primary, no_modifiers());
    assert_eq!(core.doc.edge_count(), 0);
}

#[test]
fn leaving_and_returning_makes_self_loop() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    core.on_pointer_down(pt(170.0, 100.0), Button::Primary, no_modifiers());
    core.on_pointer_move(pt(250.0, 250.0), no_modifiers());
    core.on_pointer_move(pt(100.0, 100.0), no_modifiers());
    core.on_pointer_up(pt(100.0, 100.0), Button::Primary, no_modifiers());
    assert_eq!(core.doc.edge_count(), 1);
    assert!(core.doc.edges()[0].is_self_loop());
    assert_eq!(core.doc.edges()[0].source, a);
}

// =============================================================
// Wheel
// =============================================================

#[test]
fn wheel_without_modifier_pans() {
    let mut core = core();
    let actions = core.on_wheel(pt(400.0, 300.0), WheelDelta { dx: 10.0, dy: 20.0 }, no_modifiers());
    assert_eq!(core.camera().pan_x, -10.0);
    assert_eq!(core.camera().pan_y, -20.0);
    assert!(has_render_needed(&actions));
}

#[test]
fn wheel_ctrl_zooms_around_cursor() {
    let mut core = core();
    let anchor = pt(400.0, 300.0);
    let world_before = core.camera().screen_to_world(anchor);
    core.on_wheel(anchor, WheelDelta { dx: 0.0, dy: -100.0 }, ctrl_modifier());
    assert!(core.camera().zoom > 1.0);
    let world_after = core.camera().screen_to_world(anchor);
    assert!(world_before.distance(world_after) < 1e-9);
}

#[test]
fn hit_testing_respects_camera() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    core.camera.pan_x = 50.0;
    core.on_pointer_down(pt(150.0, 100.0), Button::Primary, no_modifiers());
    assert_eq!(core.selection(), Selection::Node(a));
}

// =============================================================
// Export / import
// =============================================================

#[test]
fn export_then_import_round_trips() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    let e = created_edge(&core.connect(a, b).unwrap());
    core.update_node(&a, &NodePatch { unit: Some(Some("%".into())), value: Some(Some(3.5)), ..Default::default() })
        .unwrap();
    let edge_patch = EdgePatch { polarity: Some(Polarity::Negative), delay: Some("1y".into()), ..Default::default() };
    core.update_edge(&e, &edge_patch).unwrap();
    let raw = core.export_json().unwrap();

    let mut other = EditorCore::default();
    let actions = other.import_json(&raw).unwrap();
    assert_eq!(actions, vec![Action::DocumentReplaced]);
    assert_eq!(other.doc.node_count(), 2);
    assert_eq!(other.doc.edge_count(), 1);
    assert_eq!(other.doc, core.doc);
}

#[test]
fn import_is_undoable() {
    let mut core = core();
    two_stocks(&mut core);
    let original = core.doc.clone();
    let empty = EditorCore::default().export_json().unwrap();
    core.import_json(&empty).unwrap();
    assert!(core.doc.is_empty());
    core.undo();
    assert_eq!(core.doc, original);
}

#[test]
fn invalid_import_leaves_doc_untouched() {
    let mut core = core();
    two_stocks(&mut core);
    let before = core.doc.clone();
    let bad = format!(
        r#"{{"nodes":[],"edges":[{{"id":"{}","source":"{}","target":"{}"}}],"timestamp":"2026-01-01T00:00:00Z"}}"#,
        uuid::Uuid::new_v4(),
        uuid::Uuid::new_v4(),
        uuid::Uuid::new_v4()
    );
    assert!(matches!(core.import_json(&bad), Err(EditorError::Export(ExportError::DanglingEdge { .. }))));
    assert_eq!(core.doc, before);
}

#[test]
fn export_png_is_unsupported() {
    let core = core();
    assert!(matches!(
        core.export(ExportFormat::Png),
        Err(EditorError::Export(ExportError::Unsupported(ExportFormat::Png)))
    ));
    assert!(core.export(ExportFormat::Json).is_ok());
}

#[test]
fn load_resets_history_and_selection() {
    let mut core = core();
    let (a, _) = two_stocks(&mut core);
    core.select_node(&a).unwrap();
    core.load(GraphDoc::new());
    assert!(!core.can_undo());
    assert!(core.selection().is_none());
}

// =============================================================
// Scenario
// =============================================================

#[test]
fn two_nodes_add_flow_then_connect() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    core.connect(a, b).unwrap();

    let c = created_node(&core.add_node(NodeKind::Flow));
    assert_eq!(core.doc.node_count(), 3);
    assert_eq!(core.doc.edge_count(), 1);
    assert_eq!(core.node(&c).unwrap().node_type, NodeKind::Flow);

    let bc = created_edge(&core.connect(b, c).unwrap());
    assert_eq!(core.doc.edge_count(), 2);
    let edge = core.edge(&bc).unwrap();
    assert_eq!(edge.polarity, Polarity::Positive);
    assert_eq!(edge.strength, 1.0);
}

#[test]
fn loops_reflect_current_document() {
    let mut core = core();
    let (a, b) = two_stocks(&mut core);
    core.connect(a, b).unwrap();
    assert!(core.loops().loops.is_empty());
    let back = created_edge(&core.connect(b, a).unwrap());
    core.update_edge(&back, &EdgePatch { polarity: Some(Polarity::Negative), ..Default::default() }).unwrap();
    let report = core.loops();
    assert_eq!(report.loops.len(), 1);
    assert_eq!(report.loops[0].polarity, LoopPolarity::Balancing);
}
