//! Causal loop diagram editor core.
//!
//! This crate owns the editable model behind CLD Studio: nodes (stocks, flows,
//! connectors), signed causal edges, the single-item selection model, the
//! pointer/keyboard gesture state machine, an undo/redo history of invertible
//! edits, and the JSON document format used for export and import. It does no
//! I/O and no rendering; hosts (the HTTP service, the CLI, a browser shell)
//! drive [`engine::EditorCore`] and act on the [`engine::Action`]s it returns.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Top-level [`engine::EditorCore`] and its [`engine::Action`] outputs |
//! | [`doc`] | Node/edge types, sparse patches, and the in-memory [`doc::GraphDoc`] |
//! | [`history`] | Invertible [`history::Edit`]s and the bounded undo/redo stacks |
//! | [`template`] | Predefined node templates |
//! | [`export`] | Export document, formats, and import validation |
//! | [`loops`] | Feedback-loop enumeration and polarity classification |
//! | [`camera`] | Pan/zoom camera and coordinate conversions |
//! | [`input`] | Modes, keys, selection, and the gesture state machine |
//! | [`hit`] | Hit-testing against nodes, anchors, and edges |
//! | [`consts`] | Shared geometry, defaults, and limits |

pub mod camera;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod export;
pub mod history;
pub mod hit;
pub mod input;
pub mod loops;
pub mod template;
