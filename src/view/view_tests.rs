#[cfg(test)]
mod tests {
    use crate::view::{unsafe_all, InspectView, SequenceView, View};
    use crate::{
        bridge::{CountingBridge, HostBridge, RuntimeBridge},
        error::{BridgeError, InspectError, UnsafeOperationError},
        inspector::{Inspector, InspectorConfig},
        layout::{LayoutKind, RuntimeBuild},
        overlay::Value,
        runtime::{self, builtin_type, flags, int, int_value, new_type, BuiltinType, ObjRef, RuntimeError},
    };
    use std::sync::Arc;

    fn inspector() -> Inspector {
        Inspector::new(Arc::new(HostBridge), InspectorConfig::default()).unwrap()
    }

    fn counting() -> (Arc<CountingBridge>, Inspector) {
        let bridge = CountingBridge::new(HostBridge);
        let inspector = Inspector::new(bridge.clone(), InspectorConfig::default()).unwrap();
        (bridge, inspector)
    }

    /// Reports allocations as `slack` bytes smaller than they are, so checked
    /// operations are rejected while unchecked ones stay inside real memory.
    struct TightBridge {
        slack: usize,
    }

    impl RuntimeBridge for TightBridge {
        fn build(&self) -> RuntimeBuild {
            HostBridge.build()
        }

        unsafe fn increment_refcount(&self, addr: usize) {
            unsafe { HostBridge.increment_refcount(addr) }
        }

        unsafe fn decrement_refcount(&self, addr: usize) {
            unsafe { HostBridge.decrement_refcount(addr) }
        }

        fn allocation_size(&self, addr: usize) -> usize {
            HostBridge.allocation_size(addr).saturating_sub(self.slack)
        }

        fn is_gc_tracked(&self, addr: usize) -> bool {
            HostBridge.is_gc_tracked(addr)
        }

        unsafe fn relax_immutability(&self, ty: usize) -> Result<bool, BridgeError> {
            unsafe { HostBridge.relax_immutability(ty) }
        }

        unsafe fn restore_immutability(&self, ty: usize) -> Result<(), BridgeError> {
            unsafe { HostBridge.restore_immutability(ty) }
        }

        fn is_live(&self, addr: usize) -> bool {
            HostBridge.is_live(addr)
        }
    }

    fn tight(slack: usize) -> Inspector {
        Inspector::new(Arc::new(TightBridge { slack }), InspectorConfig::default()).unwrap()
    }

    fn ints(values: &[i64]) -> Vec<ObjRef> {
        values.iter().map(|v| int(*v).unwrap()).collect()
    }

    fn values(items: &[ObjRef]) -> Vec<i64> {
        items.iter().map(|o| int_value(o).unwrap()).collect()
    }

    #[test]
    fn test_factory_picks_category() {
        let i = inspector();
        let cases: Vec<(ObjRef, LayoutKind)> = vec![
            (int(1).unwrap(), LayoutKind::Int),
            (runtime::float(1.5).unwrap(), LayoutKind::Float),
            (runtime::bytes(b"x").unwrap(), LayoutKind::Bytes),
            (runtime::tuple(&[]).unwrap(), LayoutKind::Tuple),
            (runtime::list(&[]).unwrap(), LayoutKind::List),
            (runtime::dict(&[]).unwrap(), LayoutKind::Dict),
            (builtin_type(BuiltinType::Int), LayoutKind::Type),
            (
                runtime::function("f", |_| Ok(runtime::none())).unwrap(),
                LayoutKind::Function,
            ),
            (runtime::none(), LayoutKind::Object),
        ];
        for (obj, kind) in cases {
            let view = i.view(&obj).unwrap();
            assert_eq!(view.kind(), kind, "{}", obj.type_name());
            assert_eq!(view.address(), obj.address());
        }
    }

    #[test]
    fn test_factory_follows_subclass_flags() {
        let sub = new_type("myint", &builtin_type(BuiltinType::Int), 0).unwrap();
        let obj = runtime::new_int_of_type(&sub, 3).unwrap();
        let view = inspector().view(&obj).unwrap();
        assert_eq!(view.int().unwrap().value().unwrap(), 3);

        let plain = new_type("plain", &builtin_type(BuiltinType::Object), 0).unwrap();
        let obj = runtime::instance(&plain).unwrap();
        let view = inspector().view(&obj).unwrap();
        assert!(matches!(view, View::ObjectView(_)));
        assert_eq!(view.len(), None);
    }

    #[test]
    fn test_tuple_resize_within_allocation() {
        let items = ints(&[10, 20]);
        let t = runtime::tuple(&items).unwrap();
        let view = inspector().view(&t).unwrap();
        assert_eq!(view.mem_allocated(), 48);

        view.resize(3).unwrap();
        assert_eq!(view.len(), Some(3));
        assert_eq!(runtime::length(&t).unwrap(), 3);
        assert!(view.item(2).unwrap().is_none());
        assert_eq!(int_value(&view.item(1).unwrap().unwrap()).unwrap(), 20);

        let err = view.resize(100).unwrap_err();
        assert_eq!(
            err,
            InspectError::Unsafe(UnsafeOperationError::Resize {
                requested: 100,
                required: 24 + 100 * 8,
                allocated: 48,
            })
        );
        assert_eq!(view.len(), Some(3));

        view.resize(2).unwrap();
        assert_eq!(values(&view.tuple().unwrap().items().unwrap()), vec![10, 20]);
    }

    #[test]
    fn test_unsafe_scope_bypasses_resize_check() {
        let t = runtime::tuple(&ints(&[1, 2])).unwrap();
        let i = tight(16);
        let view = i.view(&t).unwrap();
        assert!(view.resize(3).is_err());
        assert_eq!(view.len(), Some(2));
        {
            let _scope = view.unsafe_scope();
            assert!(view.is_unsafe());
            view.resize(3).unwrap();
        }
        assert!(!view.is_unsafe());
        assert_eq!(view.len(), Some(3));
        assert!(view.item(2).unwrap().is_none());
    }

    #[test]
    fn test_set_item_moves_ownership() {
        let (bridge, i) = counting();
        let old = int(1).unwrap();
        let new = int(2).unwrap();
        let t = runtime::tuple(&[old.clone()]).unwrap();
        let view = i.view(&t).unwrap();

        let (old_rc, new_rc) = (old.ref_count(), new.ref_count());
        view.set_item(0, &new).unwrap();
        assert_eq!(bridge.calls(new.address()).increments, 1);
        assert_eq!(bridge.calls(old.address()).decrements, 1);
        assert_eq!(new.ref_count(), new_rc + 1);
        assert_eq!(old.ref_count(), old_rc - 1);
        assert!(view.item(0).unwrap().unwrap().is(&new));
    }

    #[test]
    fn test_raw_element_write_does_not_count() {
        let (bridge, i) = counting();
        let a = int(1).unwrap();
        let b = int(2).unwrap();
        let t = runtime::tuple(&[a.clone()]).unwrap();
        let view = i.view(&t).unwrap();
        view.set("ob_item", Value::Items(vec![b.as_ptr()])).unwrap();
        assert_eq!(bridge.calls(b.address()).increments, 0);
        assert_eq!(bridge.calls(a.address()).decrements, 0);
        // hand the tuple's reference back to the element it really holds
        view.set("ob_item", Value::Items(vec![a.as_ptr()])).unwrap();
    }

    #[test]
    fn test_set_item_out_of_range() {
        let x = int(9).unwrap();
        let t = runtime::tuple(&ints(&[1, 2])).unwrap();
        let view = inspector().view(&t).unwrap();
        assert_eq!(
            view.set_item(2, &x).unwrap_err(),
            InspectError::Index { index: 2, len: 2 }
        );

        let rc = x.ref_count();
        {
            let _scope = view.unsafe_scope();
            // slot 2 is still inside the 48 byte allocation
            view.set_item(2, &x).unwrap();
        }
        assert_eq!(x.ref_count(), rc + 1);
        assert_eq!(view.len(), Some(2));
        unsafe { runtime::decref(x.as_ptr()) };
    }

    #[test]
    fn test_set_item_stays_inside_tuple_allocation() {
        let x = int(9).unwrap();
        let t = runtime::tuple(&ints(&[1, 2])).unwrap();
        let i = tight(8);
        let view = i.view(&t).unwrap();
        {
            let _scope = view.unsafe_scope();
            view.resize(3).unwrap();
        }
        assert_eq!(view.mem_allocated(), 40);

        let rc = x.ref_count();
        assert_eq!(
            view.set_item(2, &x).unwrap_err(),
            InspectError::Unsafe(UnsafeOperationError::OutOfBounds {
                offset: 40,
                size: 8,
                allocated: 40,
            })
        );
        assert_eq!(x.ref_count(), rc);
        assert!(view.item(2).unwrap().is_none());

        {
            let _scope = view.unsafe_scope();
            view.set_item(2, &x).unwrap();
        }
        assert_eq!(x.ref_count(), rc + 1);
        assert!(view.item(2).unwrap().unwrap().is(&x));
    }

    #[test]
    fn test_set_item_stays_inside_list_buffer() {
        let x = int(9).unwrap();
        let l = runtime::list(&ints(&[1])).unwrap();
        let i = tight(8);
        let view = i.view(&l).unwrap();
        {
            let _scope = view.unsafe_scope();
            view.resize(2).unwrap();
        }
        assert_eq!(
            view.set_item(1, &x).unwrap_err(),
            InspectError::Unsafe(UnsafeOperationError::OutOfBounds {
                offset: 8,
                size: 8,
                allocated: 8,
            })
        );
        assert!(view.item(1).unwrap().is_none());
        view.set_item(0, &x).unwrap();
        assert!(view.item(0).unwrap().unwrap().is(&x));
    }

    #[test]
    fn test_views_debug_print_layout_and_address() {
        let n = int(3).unwrap();
        let view = inspector().view(&n).unwrap();
        let printed = format!("{:?}", view);
        assert!(printed.contains(view.layout().name()), "{}", printed);
        assert!(printed.contains(&format!("{:#x}", n.address())), "{}", printed);
        assert!(format!("{:?}", view.int().unwrap()).starts_with("IntView(BaseView"));
    }

    #[test]
    fn test_tuple_slice_assignment_moves_ownership() {
        let (bridge, i) = counting();
        let items = ints(&[1, 2, 3, 4]);
        let x = int(9).unwrap();
        let t = runtime::tuple(&items).unwrap();
        let view = i.view(&t).unwrap();
        let tv = view.tuple().unwrap();

        tv.set_slice(1..3, &[x.clone()]).unwrap();
        assert_eq!(values(&tv.items().unwrap()), vec![1, 9, 4]);
        assert_eq!(view.len(), Some(3));
        assert_eq!(bridge.calls(x.address()).increments, 1);
        for removed in &items[1..3] {
            assert_eq!(bridge.calls(removed.address()).decrements, 1);
        }
        for kept in [&items[0], &items[3]] {
            assert_eq!(bridge.calls(kept.address()), Default::default());
        }

        // bounds past the end clamp
        tv.set_slice(3..10, &ints(&[5])).unwrap();
        assert_eq!(values(&tv.items().unwrap()), vec![1, 9, 4, 5]);
    }

    #[test]
    fn test_tuple_slice_growth_is_admitted_like_resize() {
        let t = runtime::tuple(&ints(&[1, 2])).unwrap();
        let view = inspector().view(&t).unwrap();
        let tv = view.tuple().unwrap();

        tv.set_slice(1..1, &ints(&[5])).unwrap();
        assert_eq!(values(&tv.items().unwrap()), vec![1, 5, 2]);

        let err = tv.set_slice(0..0, &ints(&[6, 7])).unwrap_err();
        assert_eq!(
            err,
            InspectError::Unsafe(UnsafeOperationError::Resize {
                requested: 5,
                required: 24 + 5 * 8,
                allocated: 48,
            })
        );
        assert_eq!(values(&tv.items().unwrap()), vec![1, 5, 2]);

        tv.delete_slice(0..2).unwrap();
        assert_eq!(values(&tv.items().unwrap()), vec![2]);
        assert!(runtime::sequence_items(&t).unwrap()[0].is(&tv.item(0).unwrap().unwrap()));
    }

    #[test]
    fn test_tuple_sort_keeps_references() {
        let items = ints(&[3, 1, 2]);
        let t = runtime::tuple(&items).unwrap();
        let view = inspector().view(&t).unwrap();
        let tv = view.tuple().unwrap();
        let counts: Vec<isize> = items.iter().map(|o| o.ref_count()).collect();

        tv.sort_by(|a, b| int_value(a).unwrap().cmp(&int_value(b).unwrap()))
            .unwrap();
        assert_eq!(values(&tv.items().unwrap()), vec![1, 2, 3]);
        assert!(tv.item(0).unwrap().unwrap().is(&items[1]));
        let after: Vec<isize> = items.iter().map(|o| o.ref_count()).collect();
        assert_eq!(after, counts);
    }

    #[test]
    fn test_dict_view_entries_and_header() {
        let d = runtime::dict(&[(int(1).unwrap(), int(10).unwrap())]).unwrap();
        let view = inspector().view(&d).unwrap();
        let dv = view.dict().unwrap();
        assert_eq!(dv.used().unwrap(), 1);
        assert_ne!(dv.keys_table().unwrap(), 0);
        let tag = dv.version_tag().unwrap();

        dv.set_item(&int(2).unwrap(), &int(20).unwrap()).unwrap();
        assert_eq!(dv.used().unwrap(), 2);
        assert!(dv.version_tag().unwrap() > tag);
        assert_eq!(int_value(&dv.get_item(&int(2).unwrap()).unwrap().unwrap()).unwrap(), 20);
        assert_eq!(values(&dv.keys().unwrap()), vec![1, 2]);
        assert_eq!(values(&dv.values().unwrap()), vec![10, 20]);

        dv.del_item(&int(1).unwrap()).unwrap();
        assert!(dv.get_item(&int(1).unwrap()).unwrap().is_none());
        assert!(matches!(
            dv.del_item(&int(1).unwrap()),
            Err(InspectError::Runtime(RuntimeError::Key(_)))
        ));

        assert_eq!(
            dv.set_used(5).unwrap_err(),
            InspectError::Unsafe(UnsafeOperationError::GuardedField("ma_used".into()))
        );
        {
            let _scope = view.unsafe_scope();
            dv.set_version_tag(0).unwrap();
        }
        assert_eq!(dv.version_tag().unwrap(), 0);
        assert!(view.item(0).is_err());
        assert!(view.info().unwrap().starts_with("Dict(at "));
    }

    #[test]
    fn test_negative_indexes() {
        let t = runtime::list(&ints(&[1, 2, 3])).unwrap();
        let view = inspector().view(&t).unwrap();
        assert_eq!(int_value(&view.item(-1).unwrap().unwrap()).unwrap(), 3);
        assert_eq!(int_value(&view.item(-3).unwrap().unwrap()).unwrap(), 1);
        assert!(view.item(-4).is_err());
        assert!(view.item(3).is_err());
    }

    #[test]
    fn test_indexing_unsupported_for_scalars() {
        let view = inspector().view(&int(1).unwrap()).unwrap();
        assert!(matches!(
            view.item(0),
            Err(InspectError::Unsupported { kind: LayoutKind::Int, .. })
        ));
        assert!(matches!(view.resize(1), Err(InspectError::Unsupported { .. })));
    }

    #[test]
    fn test_guarded_fields_need_unsafe_scope() {
        let n = int(5).unwrap();
        let view = inspector().view(&n).unwrap();
        let rc = view.ref_count().unwrap();
        assert_eq!(
            view.set_ref_count(rc).unwrap_err(),
            InspectError::Unsafe(UnsafeOperationError::GuardedField("ob_refcnt".into()))
        );
        let _scope = view.unsafe_scope();
        view.set_ref_count(rc).unwrap();
        assert_eq!(view.ref_count().unwrap(), rc);
    }

    #[test]
    fn test_write_past_allocation_rejected() {
        let b = runtime::bytes(b"abc").unwrap();
        let view = inspector().view(&b).unwrap();
        let big = vec![b'x'; 64];
        assert!(matches!(
            view.set("ob_sval", &big[..]),
            Err(InspectError::Unsafe(UnsafeOperationError::OutOfBounds { offset: 32, size: 64, .. }))
        ));
        assert_eq!(runtime::bytes_value(&b).unwrap(), b"abc");
    }

    #[test]
    fn test_scalar_values() {
        let i = inspector();
        let n = int(5).unwrap();
        let view = i.view(&n).unwrap();
        view.int().unwrap().set_value(-12).unwrap();
        assert_eq!(int_value(&n).unwrap(), -12);

        let f = runtime::float(0.5).unwrap();
        let view = i.view(&f).unwrap();
        let fv = view.float().unwrap();
        assert_eq!(fv.value().unwrap(), 0.5);
        fv.set_value(2.25).unwrap();
        assert_eq!(runtime::float_value(&f).unwrap(), 2.25);
    }

    #[test]
    fn test_bytes_contents_and_hash() {
        let b = runtime::bytes(b"abc").unwrap();
        runtime::hash(&b).unwrap();
        let view = inspector().view(&b).unwrap();
        let bv = view.bytes().unwrap();
        assert_ne!(view.get("ob_shash").unwrap(), Value::Int(-1));

        bv.set_bytes(b"hello!").unwrap();
        assert_eq!(bv.as_bytes().unwrap(), b"hello!");
        assert_eq!(view.get("ob_shash").unwrap(), Value::Int(-1));
        assert_eq!(
            runtime::hash(&b).unwrap(),
            runtime::hash(&runtime::bytes(b"hello!").unwrap()).unwrap()
        );
        assert!(bv.set_bytes(&[b'z'; 40]).is_err());
        assert_eq!(bv.as_bytes().unwrap(), b"hello!");
    }

    #[test]
    fn test_list_resize_follows_buffer() {
        let l = runtime::list(&ints(&[1])).unwrap();
        let view = inspector().view(&l).unwrap();
        let list = view.list().unwrap();
        assert_eq!(list.allocated().unwrap(), 1);
        // the one-slot buffer rounds up to 16 bytes
        view.resize(2).unwrap();
        assert_eq!(runtime::length(&l).unwrap(), 2);
        assert!(view.item(1).unwrap().is_none());
        assert!(matches!(
            view.resize(3),
            Err(InspectError::Unsafe(UnsafeOperationError::Resize { required: 24, allocated: 16, .. }))
        ));
        view.resize(1).unwrap();
        assert_eq!(values(&list.items().unwrap()), vec![1]);
    }

    #[test]
    fn test_tuple_insert_pop_delete() {
        let items = ints(&[1, 2]);
        let t = runtime::tuple(&items).unwrap();
        let view = inspector().view(&t).unwrap();
        let tv = view.tuple().unwrap();

        let zero = int(0).unwrap();
        let rc = zero.ref_count();
        tv.insert(0, &zero).unwrap();
        assert_eq!(zero.ref_count(), rc + 1);
        assert_eq!(values(&tv.items().unwrap()), vec![0, 1, 2]);

        // 24 + 4 * 8 > 48
        assert!(tv.append(&zero).is_err());
        assert_eq!(tv.length(), 3);

        let last = tv.pop(None).unwrap().unwrap();
        assert!(last.is(&items[1]));
        assert_eq!(values(&tv.items().unwrap()), vec![0, 1]);

        let rc = zero.ref_count();
        tv.delete(0).unwrap();
        assert_eq!(zero.ref_count(), rc - 1);
        assert_eq!(values(&tv.items().unwrap()), vec![1]);
        assert!(tv.delete(5).is_err());
    }

    #[test]
    fn test_slice() {
        let t = runtime::tuple(&ints(&[1, 2, 3, 4])).unwrap();
        let view = inspector().view(&t).unwrap();
        let seq = view.as_sequence().unwrap();
        assert_eq!(values(&seq.slice(1..3).unwrap()), vec![2, 3]);
        assert!(seq.slice(3..5).is_err());
    }

    #[test]
    fn test_unsafe_all() {
        let i = inspector();
        let a = i.view(&int(1).unwrap()).unwrap();
        let b = i.view(&int(2).unwrap()).unwrap();
        {
            let _scope = unsafe_all(&[&a, &b]);
            assert!(a.is_unsafe() && b.is_unsafe());
            let _inner = a.unsafe_scope();
            assert_eq!(a.gate().depth(), 2);
        }
        assert!(!a.is_unsafe());
        assert!(!b.is_unsafe());
    }

    #[test]
    fn test_views_keep_objects_alive() {
        let n = int(77).unwrap();
        let rc = n.ref_count();
        let view = inspector().view(&n).unwrap();
        assert_eq!(n.ref_count(), rc + 1);
        assert!(view.base().unwrap().is(&n));
        drop(view);
        assert_eq!(n.ref_count(), rc);

        let config = InspectorConfig {
            hold_references: false,
            ..InspectorConfig::default()
        };
        let loose = Inspector::new(Arc::new(HostBridge), config).unwrap();
        let view = loose.view(&n).unwrap();
        assert!(view.base().is_none());
        assert_eq!(n.ref_count(), rc);

        let view = unsafe { inspector().view_addr(n.address()) }.unwrap();
        assert!(view.base().is_none());
        assert_eq!(view.int().unwrap().value().unwrap(), 77);
    }

    #[test]
    fn test_memory_queries() {
        let i = inspector();
        let t = runtime::tuple(&ints(&[1, 2])).unwrap();
        let view = i.view(&t).unwrap();
        assert_eq!(view.mem_size().unwrap(), 40);
        assert!(view.is_gc());
        let head = view.gc_head().unwrap().unwrap();
        assert_eq!(head.address(), t.address() - 16);
        assert_ne!(head.read("gc_next").unwrap().as_usize(), Some(0));

        let n = i.view(&int(1).unwrap()).unwrap();
        assert_eq!(n.mem_size().unwrap(), 24);
        assert_eq!(n.mem_allocated(), 32);
        assert!(!n.is_gc());
        assert!(n.gc_head().unwrap().is_none());
    }

    #[test]
    fn test_reinterpret() {
        let n = int(1).unwrap();
        let view = inspector().view(&n).unwrap();
        let as_float = view.reinterpret(LayoutKind::Float).unwrap();
        assert_eq!(as_float.address(), n.address());
        assert!(matches!(
            view.reinterpret(LayoutKind::Type),
            Err(InspectError::Unsafe(UnsafeOperationError::Reinterpret { .. }))
        ));
        let _scope = view.unsafe_scope();
        assert!(view.reinterpret(LayoutKind::Type).is_ok());
    }

    #[test]
    fn test_set_type_moves_type_reference() {
        let (bridge, i) = counting();
        let sub = new_type("subint", &builtin_type(BuiltinType::Int), 0).unwrap();
        let other = new_type("otherint", &builtin_type(BuiltinType::Int), 0).unwrap();
        let obj = runtime::new_int_of_type(&sub, 4).unwrap();
        let view = i.view(&obj).unwrap();

        assert!(view.set_type(&other).is_err());
        let _scope = view.unsafe_scope();
        assert!(view.set_type(&int(1).unwrap()).is_err());
        view.set_type(&other).unwrap();
        assert!(obj.type_object().is(&other));
        assert_eq!(bridge.calls(other.address()).increments, 1);
        assert_eq!(bridge.calls(sub.address()).decrements, 1);
    }

    #[test]
    fn test_type_view() {
        let i = inspector();
        let view = i.view(&builtin_type(BuiltinType::Int)).unwrap();
        let tv = view.type_view().unwrap();
        assert_eq!(tv.name().unwrap(), "int");
        assert!(tv.is_immutable().unwrap());
        assert_eq!(tv.basic_size().unwrap(), 24);
        assert!(tv.base_type().unwrap().unwrap().is(&builtin_type(BuiltinType::Object)));

        let sealed = new_type("sealed", &builtin_type(BuiltinType::Int), flags::IMMUTABLETYPE).unwrap();
        let view = i.view(&sealed).unwrap();
        let tv = view.type_view().unwrap();
        {
            let _mutable = tv.as_mutable().unwrap();
            assert!(!tv.is_immutable().unwrap());
        }
        assert!(tv.is_immutable().unwrap());

        tv.set_attr("answer", &int(42).unwrap()).unwrap();
        assert_eq!(int_value(&tv.attr("answer").unwrap()).unwrap(), 42);
        assert_eq!(tv.patched().unwrap(), vec!["answer".to_string()]);
        tv.restore("answer").unwrap();
        assert!(tv.attr("answer").is_err());
    }

    #[test]
    fn test_type_view_implement() {
        let i = inspector();
        let sealed = new_type("doubler", &builtin_type(BuiltinType::Int), flags::IMMUTABLETYPE).unwrap();
        let view = i.view(&sealed).unwrap();
        let tv = view.type_view().unwrap();
        tv.implement("__neg__", |args| int(int_value(&args[0])? * 2)).unwrap();

        let x = runtime::new_int_of_type(&sealed, 21).unwrap();
        assert_eq!(int_value(&runtime::negate(&x).unwrap()).unwrap(), 42);
        let orig = tv.original().unwrap();
        assert_eq!(int_value(&orig.call("__neg__", &x, &[]).unwrap()).unwrap(), -21);
    }

    #[test]
    fn test_function_view() {
        let f = runtime::function("adder", |args| {
            int(int_value(&args[0])? + int_value(&args[1])?)
        })
        .unwrap();
        let view = inspector().view(&f).unwrap();
        let fv = view.function().unwrap();
        assert_eq!(fv.name().unwrap().as_deref(), Some("adder"));
        let out = fv.call(&ints(&[2, 3])).unwrap();
        assert_eq!(int_value(&out).unwrap(), 5);
    }

    #[test]
    fn test_info_lists_fields_in_order() {
        let n = int(5).unwrap();
        let view = inspector().view(&n).unwrap();
        let info = view.info().unwrap();
        let lines: Vec<_> = info.lines().collect();
        assert_eq!(lines[0], format!("Int(at {:#x}):", n.address()));
        assert_eq!(lines[1], format!("   ob_refcnt: isize = {}", n.ref_count()));
        assert_eq!(lines[2], "   ob_type: &type = &[int]");
        assert_eq!(lines[3], "   ob_ival: i64 = 5");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_info_renders_elements_and_strings() {
        let i = inspector();
        let t = runtime::tuple(&[int(1).unwrap(), runtime::float(2.0).unwrap()]).unwrap();
        let view = i.view(&t).unwrap();
        view.resize(3).unwrap();
        let info = view.info().unwrap();
        assert!(info.contains("   ob_size: isize = 3"), "{}", info);
        assert!(info.contains("   ob_item: [&object] = [&[int], &[float], NULL]"), "{}", info);

        let view = i.view(&builtin_type(BuiltinType::Int)).unwrap();
        let info = view.info().unwrap();
        assert!(info.starts_with("Type(at "));
        assert!(info.contains("   tp_name: *const c_char = \"int\""), "{}", info);
        assert!(info.contains("   tp_as_number: &NumberMethods = &[NumberMethods]"), "{}", info);
    }
}
