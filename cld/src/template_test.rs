#![allow(clippy::float_cmp)]

use std::collections::HashSet;

use super::*;

#[test]
fn template_keys_are_unique() {
    let keys: HashSet<&str> = TEMPLATES.iter().map(|t| t.key).collect();
    assert_eq!(keys.len(), TEMPLATES.len());
}

#[test]
fn template_bands_are_well_formed() {
    for t in TEMPLATES {
        if let Some((min, max)) = t.band {
            assert!(Band::new(min, max).is_well_formed(), "{} has inverted band", t.key);
        }
    }
}

#[test]
fn every_kind_has_a_template() {
    for kind in NodeKind::ALL {
        assert!(by_kind(kind).next().is_some(), "no template for {kind:?}");
    }
}

#[test]
fn find_known_and_unknown() {
    assert_eq!(find("dei-index").map(|t| t.kind), Some(NodeKind::Stock));
    assert!(find("does-not-exist").is_none());
}

#[test]
fn instantiate_copies_metadata() {
    let t = find("dei-index").unwrap();
    let node = t.instantiate(10.0, 20.0);
    assert_eq!(node.label, "DEI Index");
    assert_eq!(node.node_type, NodeKind::Stock);
    assert_eq!(node.value, Some(0.72));
    assert_eq!(node.unit.as_deref(), Some("index"));
    assert_eq!(node.band, Some(Band::new(0.6, 0.85)));
    assert_eq!(node.x, 10.0);
    assert_eq!(node.y, 20.0);
    assert_eq!(node.within_band(), Some(true));
}

#[test]
fn instantiate_yields_fresh_ids() {
    let t = find("spending").unwrap();
    assert_ne!(t.instantiate(0.0, 0.0).id, t.instantiate(0.0, 0.0).id);
}
