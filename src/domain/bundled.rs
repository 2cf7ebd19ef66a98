//! Bundled MODFLOW 6 navigation snapshot.
//!
//! Parsed at most once per process and shared read-only afterwards.

use once_cell::sync::OnceCell;

use crate::domain::entities::{NavData, ScriptNames};
use crate::domain::error::DomainResult;
use crate::domain::shard::KeyOrder;

const NAVTREE_DATA: &str = include_str!("../../data/navtreedata.js");

static NAV_DATA: OnceCell<NavData> = OnceCell::new();

/// Raw script text of the snapshot.
pub fn source() -> &'static str {
    NAVTREE_DATA
}

/// Shared, lazily parsed snapshot.
pub fn nav_data() -> DomainResult<&'static NavData> {
    NAV_DATA.get_or_try_init(load)
}

/// Parse a fresh, independently owned copy of the snapshot.
pub fn load() -> DomainResult<NavData> {
    load_ordered(KeyOrder::Bytewise)
}

/// Fresh copy whose index compares keys with `order`.
pub fn load_ordered(order: KeyOrder) -> DomainResult<NavData> {
    NavData::parse(NAVTREE_DATA, &ScriptNames::default(), order)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_bundled_snapshot_when_loading_then_has_single_modflow_root() {
        let data = nav_data().unwrap();
        assert_eq!(data.tree.len(), 1);
        assert_eq!(data.tree[0].label, "MODFLOW 6");
        assert_eq!(data.tree[0].href.as_str(), "index.html");
        assert_eq!(data.node_count(), 22);
        assert_eq!(crate::domain::NavArena::from_nodes(&data.tree).depth(), 4);
        assert_eq!(data.deferred_count(), 10);
        assert_eq!(data.index.len(), 29);
        assert_eq!(
            data.sync_off_message.as_deref(),
            Some("click to enable panel synchronisation")
        );
    }

    #[test]
    fn given_case_insensitive_order_when_loading_then_lookup_folds_case() {
        let data = load_ordered(KeyOrder::CaseInsensitive).unwrap();

        assert_eq!(data.index.order(), KeyOrder::CaseInsensitive);
        assert_eq!(data.index.lookup("INDEX.html").unwrap().shard, 11);
    }

    #[test]
    fn given_shared_snapshot_when_requested_twice_then_same_instance() {
        let a = nav_data().unwrap();
        let b = nav_data().unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn given_two_fresh_loads_when_comparing_then_equal_but_independent() {
        let a = load().unwrap();
        let mut b = load().unwrap();
        assert_eq!(a, b);

        b.tree[0].label.push_str(" (edited)");
        assert_ne!(a, b);
        assert_eq!(a.tree[0].label, "MODFLOW 6");
    }
}
