//! Shared numeric constants and defaults for the editor crate.

// ── Node geometry ───────────────────────────────────────────────

/// Stock nodes are drawn as rectangles of this size (world units).
pub const STOCK_SIZE: (f64, f64) = (140.0, 70.0);

/// Flow nodes are drawn as rounded pills of this size.
pub const FLOW_SIZE: (f64, f64) = (120.0, 48.0);

/// Connector nodes are small circles; width and height are the diameter.
pub const CONNECTOR_SIZE: (f64, f64) = (28.0, 28.0);

// ── Placement ───────────────────────────────────────────────────

/// Width of the region new nodes are scattered across.
pub const CANVAS_EXTENT_X: f64 = 800.0;

/// Height of the region new nodes are scattered across.
pub const CANVAS_EXTENT_Y: f64 = 500.0;

/// Margin kept between scattered nodes and the region edge.
pub const PLACEMENT_MARGIN: f64 = 50.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space slop in pixels for anchors and thin edges.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Radius of the arc drawn for a self-loop edge above its node.
pub const SELF_LOOP_RADIUS: f64 = 18.0;

/// Pointer travel (screen px) below which a press-release counts as a click.
pub const CLICK_SLOP_PX: f64 = 3.0;

// ── Camera ──────────────────────────────────────────────────────

pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 8.0;

/// Zoom multiplier applied per 100 px of wheel travel.
pub const ZOOM_STEP: f64 = 1.1;

// ── Defaults ────────────────────────────────────────────────────

pub const DEFAULT_STRENGTH: f64 = 1.0;
pub const DEFAULT_DELAY: &str = "none";
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;
pub const DEFAULT_FONT_FAMILY: &str = "Inter";
pub const DEFAULT_FONT_SIZE: f64 = 14.0;

/// Undo depth when the host does not configure one.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Upper bound on enumerated feedback loops; dense graphs explode combinatorially.
pub const MAX_LOOPS: usize = 500;

/// Current export document version.
pub const EXPORT_VERSION: u32 = 1;
