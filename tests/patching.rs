use heapview::{
    bridge::HostBridge,
    runtime::{
        self, binary_op, builtin_type, flags, int, int_value, new_int_of_type, new_type, BinaryOp,
        BuiltinType, ObjRef,
    },
    Inspector, InspectorConfig, PatchError, PatchKind,
};
use std::sync::Arc;

fn inspector() -> Inspector {
    Inspector::new(Arc::new(HostBridge), InspectorConfig::default()).unwrap()
}

fn sealed_int(name: &str) -> ObjRef {
    new_type(name, &builtin_type(BuiltinType::Int), flags::IMMUTABLETYPE).unwrap()
}

#[test]
fn operator_slot_patch_dispatches_and_original_reproduces() {
    let i = inspector();
    let ty = sealed_int("patched_sub");
    let f = runtime::function("sub_backwards", |args| {
        int(int_value(&args[1])? - int_value(&args[0])?)
    })
    .unwrap();

    let x = new_int_of_type(&ty, 10).unwrap();
    let y = int(3).unwrap();
    let before = int_value(&binary_op(BinaryOp::Subtract, &x, &y).unwrap()).unwrap();
    assert_eq!(before, 7);

    i.patcher()
        .patch(&ty, "__sub__", &f, PatchKind::OperatorSlot)
        .unwrap();
    assert_eq!(int_value(&binary_op(BinaryOp::Subtract, &x, &y).unwrap()).unwrap(), -7);

    let original = i.patcher().original(&ty).unwrap();
    let out = original.call("__sub__", &x, &[y.clone()]).unwrap();
    assert_eq!(int_value(&out).unwrap(), before);
    // still patched
    assert_eq!(int_value(&binary_op(BinaryOp::Subtract, &x, &y).unwrap()).unwrap(), -7);
}

#[test]
fn patches_are_shared_between_inspector_clones() {
    let i = inspector();
    let other = i.clone();
    let ty = sealed_int("shared_table");
    let view = i.view(&ty).unwrap();
    view.type_view()
        .unwrap()
        .implement("__mul__", |_| int(0))
        .unwrap();

    assert_eq!(other.originals().names(&ty), vec!["__mul__".to_string()]);
    let x = new_int_of_type(&ty, 6).unwrap();
    let y = int(7).unwrap();
    assert_eq!(int_value(&binary_op(BinaryOp::Multiply, &x, &y).unwrap()).unwrap(), 0);
    let out = other.patcher().original(&ty).unwrap().call("__mul__", &x, &[y]).unwrap();
    assert_eq!(int_value(&out).unwrap(), 42);
}

#[test]
fn restore_through_type_view() {
    let i = inspector();
    let ty = sealed_int("restorable");
    let view = i.view(&ty).unwrap();
    let tv = view.type_view().unwrap();
    tv.implement("__add__", |_| int(-1)).unwrap();

    let x = new_int_of_type(&ty, 2).unwrap();
    let y = int(2).unwrap();
    assert_eq!(int_value(&binary_op(BinaryOp::Add, &x, &y).unwrap()).unwrap(), -1);
    tv.restore("__add__").unwrap();
    assert_eq!(int_value(&binary_op(BinaryOp::Add, &x, &y).unwrap()).unwrap(), 4);
    assert!(tv.is_immutable().unwrap());
}

#[test]
fn descriptor_patches_through_type_view() {
    let i = inspector();
    let ty = sealed_int("descriptors");
    let view = i.view(&ty).unwrap();
    let tv = view.type_view().unwrap();

    let getter = runtime::function("half", |args| int(int_value(&args[0])? / 2)).unwrap();
    tv.patch("half", &getter, PatchKind::Property).unwrap();
    let answer = runtime::function("answer", |_| int(42)).unwrap();
    tv.patch(["answer", "also_answer"], &answer, PatchKind::Static).unwrap();

    let x = new_int_of_type(&ty, 18).unwrap();
    assert_eq!(int_value(&runtime::getattr(&x, "half").unwrap()).unwrap(), 9);
    let from_type = runtime::call(&tv.attr("also_answer").unwrap(), &[]).unwrap();
    assert_eq!(int_value(&from_type).unwrap(), 42);
}

#[test]
fn patching_a_non_type_fails() {
    let i = inspector();
    let n = int(1).unwrap();
    let f = runtime::function("f", |_| int(0)).unwrap();
    assert_eq!(
        i.patcher().patch(&n, "__add__", &f, PatchKind::Method).unwrap_err(),
        PatchError::NotAType("int".into())
    );
}
