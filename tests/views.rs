use heapview::{
    bridge::{CountingBridge, HostBridge},
    layout::{FieldKind, LayoutKind},
    overlay::Value,
    runtime::{self, builtin_type, int, int_value, BuiltinType, ObjRef},
    InspectError, InspectView, Inspector, InspectorConfig, UnsafeOperationError,
};
use std::sync::Arc;

fn inspector() -> Inspector {
    Inspector::new(Arc::new(HostBridge), InspectorConfig::default()).unwrap()
}

fn kind_matches(kind: FieldKind, value: &Value) -> bool {
    match (kind, value) {
        (FieldKind::Scalar(s), Value::Float(_)) => s.type_tag() == "f64",
        (FieldKind::Scalar(s), Value::Int(_)) => s.is_signed(),
        (FieldKind::Scalar(s), Value::UInt(_)) => !s.is_signed() && s.type_tag() != "f64",
        (FieldKind::ObjectRef | FieldKind::TypeRef, Value::Object(_)) => true,
        (
            FieldKind::CStr
            | FieldKind::FnPtr
            | FieldKind::RawPtr
            | FieldKind::Table(_)
            | FieldKind::ItemBuffer,
            Value::Ptr(_),
        ) => true,
        (FieldKind::ItemArray, Value::Items(_)) => true,
        (FieldKind::ByteBuffer, Value::Bytes(_)) => true,
        _ => false,
    }
}

#[test]
fn every_field_reads_as_its_declared_kind() {
    let i = inspector();
    let objects: Vec<ObjRef> = vec![
        int(3).unwrap(),
        runtime::float(1.25).unwrap(),
        runtime::bytes(b"abc").unwrap(),
        runtime::tuple(&[int(1).unwrap()]).unwrap(),
        runtime::list(&[int(1).unwrap(), int(2).unwrap()]).unwrap(),
        runtime::dict(&[(int(1).unwrap(), runtime::bytes(b"one").unwrap())]).unwrap(),
        builtin_type(BuiltinType::Tuple),
        runtime::function("f", |_| Ok(runtime::none())).unwrap(),
        runtime::none(),
    ];
    for obj in &objects {
        let view = i.view(obj).unwrap();
        for field in &view.layout().fields {
            let value = view.get(field.name).unwrap();
            assert!(
                kind_matches(field.kind, &value),
                "{}.{} read as {:?}",
                view.layout().name(),
                field.name,
                value
            );
        }
    }
}

#[test]
fn resize_round_trip_restores_length() {
    let t = runtime::tuple(&[int(1).unwrap(), int(2).unwrap()]).unwrap();
    let view = inspector().view(&t).unwrap();
    let original = view.get("ob_size").unwrap();

    view.resize(1).unwrap();
    view.resize(0).unwrap();
    view.resize(2).unwrap();
    assert_eq!(view.get("ob_size").unwrap(), original);
    // growth zero-fills, shrinking does not release
    assert!(view.item(0).unwrap().is_none());
    assert!(view.item(1).unwrap().is_none());
}

#[test]
fn two_element_tuple_grows_to_three_but_not_a_hundred() {
    let a = int(1).unwrap();
    let b = int(2).unwrap();
    let t = runtime::tuple(&[a.clone(), b.clone()]).unwrap();
    let view = inspector().view(&t).unwrap();

    view.resize(3).unwrap();
    assert_eq!(view.len(), Some(3));
    assert!(view.item(2).unwrap().is_none());
    assert!(view.item(0).unwrap().unwrap().is(&a));
    assert!(view.item(1).unwrap().unwrap().is(&b));

    let before = view.get("ob_size").unwrap();
    let err = view.resize(100).unwrap_err();
    assert!(matches!(
        err,
        InspectError::Unsafe(UnsafeOperationError::Resize { requested: 100, .. })
    ));
    assert!(err.to_string().contains("unsafe scope"));
    assert_eq!(view.get("ob_size").unwrap(), before);
    assert_eq!(view.len(), Some(3));
}

#[test]
fn index_assignment_counts_exactly_once() {
    let bridge = CountingBridge::new(HostBridge);
    let i = Inspector::new(bridge.clone(), InspectorConfig::default()).unwrap();
    let a = int(10).unwrap();
    let b = int(20).unwrap();
    let x = int(30).unwrap();
    let l = runtime::list(&[a.clone(), b.clone()]).unwrap();
    let view = i.view(&l).unwrap();

    view.set_item(1, &x).unwrap();
    assert_eq!(bridge.calls(x.address()).increments, 1);
    assert_eq!(bridge.calls(x.address()).decrements, 0);
    assert_eq!(bridge.calls(b.address()).decrements, 1);
    assert_eq!(bridge.calls(b.address()).increments, 0);
    assert_eq!(bridge.calls(a.address()), Default::default());

    let items = runtime::sequence_items(&l).unwrap();
    assert_eq!(
        items.iter().map(|o| int_value(o).unwrap()).collect::<Vec<_>>(),
        vec![10, 30]
    );
}

#[test]
fn older_build_views_types_without_version_tag() {
    let config = InspectorConfig {
        build: Some("1.0".parse().unwrap()),
        validate_layouts: false,
        hold_references: true,
    };
    let i = Inspector::new(Arc::new(HostBridge), config).unwrap();
    assert!(!i.layout(LayoutKind::Type).unwrap().has_field("tp_version_tag"));

    let view = i.view(&builtin_type(BuiltinType::Int)).unwrap();
    assert_eq!(view.type_view().unwrap().name().unwrap(), "int");
}

#[test]
fn mismatched_layouts_fail_validation() {
    let config = InspectorConfig {
        build: Some("1.0".parse().unwrap()),
        ..InspectorConfig::default()
    };
    assert!(Inspector::new(Arc::new(HostBridge), config).is_err());
}

#[test]
fn view_as_overrides_category() {
    let i = inspector();
    let n = int(5).unwrap();
    let view = i.view_as(&n, LayoutKind::Object).unwrap();
    assert_eq!(view.kind(), LayoutKind::Object);
    assert!(view.int().is_none());
    assert!(view.get("ob_ival").is_err());
    assert!(view.info().unwrap().starts_with("Object(at "));
}
