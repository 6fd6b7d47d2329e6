//! Behaviour that depends on cargo features.

use heapview::{bridge::HostBridge, runtime, Inspector, InspectorConfig};
use std::sync::Arc;

fn loose_inspector() -> Inspector {
    let config = InspectorConfig {
        hold_references: false,
        ..InspectorConfig::default()
    };
    Inspector::new(Arc::new(HostBridge), config).unwrap()
}

#[test]
#[cfg(feature = "memory-validation")]
#[should_panic(expected = "outlived its object")]
fn test_stale_view_panics_with_memory_validation() {
    let n = runtime::int(1).unwrap();
    let view = loose_inspector().view(&n).unwrap();
    drop(n);
    let _ = view.get("ob_ival");
}

#[test]
#[cfg(not(feature = "memory-validation"))]
fn test_views_without_references_read_live_objects() {
    let n = runtime::int(1).unwrap();
    let view = loose_inspector().view(&n).unwrap();
    assert!(view.base().is_none());
    assert_eq!(view.int().unwrap().value().unwrap(), 1);
}

#[test]
fn test_env_config_defaults() {
    let config = InspectorConfig::from_env();
    if std::env::var_os("HEAPVIEW_RUNTIME_BUILD").is_none() {
        assert_eq!(config.build, None);
    }
    if std::env::var_os("HEAPVIEW_HOLD_REFS").is_none() {
        assert!(config.hold_references);
    }
}
