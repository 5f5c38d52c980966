//! Hit-testing: which node, anchor, or edge lies under a world-space point.
//!
//! Anchors win over bodies so a drag can start a connection from the edge of
//! a node, and nodes win over edges. Among overlapping nodes the last one in
//! document order (drawn on top) is hit first.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point};
use crate::consts::{HANDLE_RADIUS_PX, SELF_LOOP_RADIUS};
use crate::doc::{Edge, EdgeId, GraphDoc, Node, NodeId, NodeKind};

/// Side of a node carrying a connection anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    N,
    E,
    S,
    W,
}

impl Side {
    pub const ALL: [Side; 4] = [Self::N, Self::E, Self::S, Self::W];
}

/// Which part of a node was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePart {
    Body,
    Anchor(Side),
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Node { id: NodeId, part: NodePart },
    Edge { id: EdgeId },
}

impl Hit {
    #[must_use]
    pub fn node_id(&self) -> Option<NodeId> {
        match self {
            Self::Node { id, .. } => Some(*id),
            Self::Edge { .. } => None,
        }
    }
}

/// World position of a node's anchor on `side`.
#[must_use]
pub fn anchor_point(node: &Node, side: Side) -> Point {
    let (left, top, right, bottom) = node.bounds();
    match side {
        Side::N => Point::new(node.x, top),
        Side::E => Point::new(right, node.y),
        Side::S => Point::new(node.x, bottom),
        Side::W => Point::new(left, node.y),
    }
}

/// Whether `pt` is inside the node's drawn shape.
#[must_use]
pub fn point_in_node(pt: Point, node: &Node) -> bool {
    match node.node_type {
        NodeKind::Connector => {
            let (w, _) = node.node_type.size();
            pt.distance(Point::new(node.x, node.y)) <= w / 2.0
        }
        NodeKind::Stock | NodeKind::Flow => {
            let (left, top, right, bottom) = node.bounds();
            pt.x >= left && pt.x <= right && pt.y >= top && pt.y <= bottom
        }
    }
}

/// Shortest distance from `pt` to the segment `a`–`b`.
#[must_use]
pub fn distance_to_segment(pt: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq <= f64::EPSILON {
        return pt.distance(a);
    }
    let t = (((pt.x - a.x) * dx + (pt.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    pt.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

fn edge_distance(pt: Point, edge: &Edge, doc: &GraphDoc) -> Option<f64> {
    let source = doc.node(&edge.source)?;
    let target = doc.node(&edge.target)?;
    if edge.is_self_loop() {
        let (_, top, _, _) = source.bounds();
        let center = Point::new(source.x, top - SELF_LOOP_RADIUS);
        return Some((pt.distance(center) - SELF_LOOP_RADIUS).abs());
    }
    Some(distance_to_segment(pt, Point::new(source.x, source.y), Point::new(target.x, target.y)))
}

/// Test which node part or edge (if any) is under `world_pt`.
#[must_use]
pub fn hit_test(world_pt: Point, doc: &GraphDoc, camera: &Camera) -> Option<Hit> {
    let slop = camera.screen_dist_to_world(HANDLE_RADIUS_PX);

    for node in doc.nodes().iter().rev() {
        for side in Side::ALL {
            if world_pt.distance(anchor_point(node, side)) <= slop {
                return Some(Hit::Node { id: node.id, part: NodePart::Anchor(side) });
            }
        }
    }

    for node in doc.nodes().iter().rev() {
        if point_in_node(world_pt, node) {
            return Some(Hit::Node { id: node.id, part: NodePart::Body });
        }
    }

    doc.edges()
        .iter()
        .rev()
        .filter_map(|edge| {
            let d = edge_distance(world_pt, edge, doc)?;
            (d <= slop + edge.style.stroke_width / 2.0).then_some((edge.id, d))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| Hit::Edge { id })
}

/// The topmost node whose body contains `world_pt`, ignoring anchors and edges.
#[must_use]
pub fn node_at(world_pt: Point, doc: &GraphDoc) -> Option<NodeId> {
    doc.nodes()
        .iter()
        .rev()
        .find(|node| point_in_node(world_pt, node))
        .map(|node| node.id)
}
