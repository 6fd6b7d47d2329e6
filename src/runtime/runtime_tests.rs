#[cfg(test)]
mod tests {
    use crate::runtime::{
        alloc, binary_op, builtin_type, bytes, call, call_method, dict, dict_del, dict_get,
        dict_items, dict_set, flags, float, function, getattr,
        hash, int, int_value, item, length, list, negate, new_type, property, repr, slots, staticmethod,
        text, truthy, tuple, type_del_attr, type_lookup, type_set_attr, BinaryOp, BuiltinType,
        RawType, RuntimeError,
    };

    #[test]
    fn test_int_arithmetic_through_slots() {
        let a = int(40).unwrap();
        let b = int(2).unwrap();
        let sum = binary_op(BinaryOp::Add, &a, &b).unwrap();
        assert_eq!(int_value(&sum).unwrap(), 42);
        let neg = negate(&sum).unwrap();
        assert_eq!(int_value(&neg).unwrap(), -42);
        assert!(truthy(&a).unwrap());
        assert!(!truthy(&int(0).unwrap()).unwrap());
    }

    #[test]
    fn test_int_overflow_is_reported() {
        let a = int(i64::MAX).unwrap();
        let b = int(1).unwrap();
        let err = binary_op(BinaryOp::Add, &a, &b).unwrap_err();
        assert!(matches!(err, RuntimeError::Overflow(_)));
    }

    #[test]
    fn test_float_mixes_with_int() {
        let a = float(1.5).unwrap();
        let b = int(2).unwrap();
        let product = binary_op(BinaryOp::Multiply, &a, &b).unwrap();
        assert_eq!(repr(&product).unwrap(), "3.0");
    }

    #[test]
    fn test_builtin_attributes_wrap_slots() {
        let a = int(5).unwrap();
        let result = call_method(&a, "__add__", &[int(3).unwrap()]).unwrap();
        assert_eq!(int_value(&result).unwrap(), 8);
        let int_type = builtin_type(BuiltinType::Int);
        let bool_type = builtin_type(BuiltinType::Bool);
        // bool only defines __repr__ itself; __add__ comes from int
        assert!(type_lookup(&bool_type, "__add__").unwrap().is(&type_lookup(&int_type, "__add__").unwrap()));
    }

    #[test]
    fn test_sequences() {
        let items = [int(1).unwrap(), int(2).unwrap(), int(3).unwrap()];
        let t = tuple(&items).unwrap();
        let l = list(&items).unwrap();
        assert_eq!(length(&t).unwrap(), 3);
        assert_eq!(int_value(&item(&t, -1).unwrap()).unwrap(), 3);
        assert_eq!(repr(&t).unwrap(), "(1, 2, 3)");
        assert_eq!(repr(&l).unwrap(), "[1, 2, 3]");
        assert!(matches!(item(&l, 3), Err(RuntimeError::Index(_))));
        assert_eq!(repr(&tuple(&items[..1]).unwrap()).unwrap(), "(1,)");
    }

    #[test]
    fn test_bytes_repr_and_hash_cache() {
        let b = bytes(b"hi\n").unwrap();
        assert_eq!(repr(&b).unwrap(), "b'hi\\n'");
        let h = hash(&b).unwrap();
        assert_eq!(hash(&b).unwrap(), h);
        assert_eq!(text(&b).unwrap(), "hi\n");
    }

    #[test]
    fn test_refcounts_follow_containers() {
        let a = int(1000).unwrap();
        assert_eq!(a.ref_count(), 1);
        let t = tuple(&[a.clone()]).unwrap();
        assert_eq!(a.ref_count(), 2);
        let l = list(&[a.clone(), a.clone()]).unwrap();
        assert_eq!(a.ref_count(), 4);
        drop(t);
        drop(l);
        assert_eq!(a.ref_count(), 1);
    }

    #[test]
    fn test_gc_tracking_follows_type_flag() {
        let t = tuple(&[]).unwrap();
        let i = int(7).unwrap();
        assert!(alloc::is_gc_tracked(t.address()));
        assert!(!alloc::is_gc_tracked(i.address()));
        assert_eq!(alloc::allocation_size(i.address()), 32);
    }

    #[test]
    fn test_heap_type_attributes_and_descriptors() {
        let object = builtin_type(BuiltinType::Object);
        let ty = new_type("Point", &object, 0).unwrap();
        let instance = crate::runtime::instance(&ty).unwrap();

        let method = function("describe", |args| {
            assert_eq!(args.len(), 1);
            int(1)
        })
        .unwrap();
        type_set_attr(&ty, "describe", &method).unwrap();
        let bound = getattr(&instance, "describe").unwrap();
        assert_eq!(int_value(&call(&bound, &[]).unwrap()).unwrap(), 1);

        let helper = function("helper", |args| int(args.len() as i64)).unwrap();
        type_set_attr(&ty, "helper", &staticmethod(&helper).unwrap()).unwrap();
        let unbound = getattr(&instance, "helper").unwrap();
        assert_eq!(int_value(&call(&unbound, &[]).unwrap()).unwrap(), 0);

        let getter = function("value", |_| int(9)).unwrap();
        type_set_attr(&ty, "value", &property(&getter).unwrap()).unwrap();
        assert_eq!(int_value(&getattr(&instance, "value").unwrap()).unwrap(), 9);

        type_del_attr(&ty, "value").unwrap();
        assert!(matches!(
            getattr(&instance, "value"),
            Err(RuntimeError::Attribute { .. })
        ));
    }

    #[test]
    fn test_builtin_types_refuse_attribute_writes() {
        let int_type = builtin_type(BuiltinType::Int);
        let value = int(1).unwrap();
        let err = type_set_attr(&int_type, "x", &value).unwrap_err();
        assert!(matches!(err, RuntimeError::ImmutableType { .. }));
    }

    #[test]
    fn test_version_tag_bumps_on_write() {
        let object = builtin_type(BuiltinType::Object);
        let ty = new_type("Tagged", &object, 0).unwrap();
        let raw = ty.as_ptr().cast::<RawType>();
        let before = unsafe { (*raw).tp_version_tag };
        type_set_attr(&ty, "a", &int(1).unwrap()).unwrap();
        assert_eq!(unsafe { (*raw).tp_version_tag }, before + 1);
    }

    #[test]
    fn test_heap_type_inherits_flags_and_slots() {
        let int_type = builtin_type(BuiltinType::Int);
        let sub = new_type("MyInt", &int_type, 0).unwrap();
        let raw = unsafe { &*sub.as_ptr().cast::<RawType>() };
        assert_ne!(raw.tp_flags & flags::INT_SUBCLASS, 0);
        assert_ne!(raw.tp_flags & flags::HEAPTYPE, 0);
        let v = crate::runtime::new_int_of_type(&sub, 4).unwrap();
        let doubled = binary_op(BinaryOp::Add, &v, &v).unwrap();
        assert_eq!(int_value(&doubled).unwrap(), 8);
    }

    #[test]
    fn test_trampoline_follows_attribute_table() {
        let int_type = builtin_type(BuiltinType::Int);
        let sub = new_type("Weird", &int_type, 0).unwrap();
        let add = function("__add__", |_| int(-1)).unwrap();
        type_set_attr(&sub, "__add__", &add).unwrap();
        unsafe {
            let raw = sub.as_ptr().cast::<RawType>();
            (*(*raw).tp_as_number).nb_add = Some(slots::slot_nb_add);
        }
        let v = crate::runtime::new_int_of_type(&sub, 4).unwrap();
        let result = binary_op(BinaryOp::Add, &v, &v).unwrap();
        assert_eq!(int_value(&result).unwrap(), -1);
    }

    #[test]
    fn test_dict_insert_lookup_and_replace() {
        let key = int(1).unwrap();
        let value = bytes(b"a").unwrap();
        let d = dict(&[(key.clone(), value.clone())]).unwrap();
        assert_eq!(length(&d).unwrap(), 1);
        assert_eq!(repr(&d).unwrap(), "{1: b'a'}");

        // 1.0 hashes and compares equal to 1
        let found = dict_get(&d, &float(1.0).unwrap()).unwrap().unwrap();
        assert!(found.is(&value));
        assert!(dict_get(&d, &int(2).unwrap()).unwrap().is_none());

        let rc = value.ref_count();
        dict_set(&d, &int(1).unwrap(), &int(7).unwrap()).unwrap();
        assert_eq!(value.ref_count(), rc - 1);
        assert_eq!(length(&d).unwrap(), 1);
        assert_eq!(int_value(&dict_get(&d, &key).unwrap().unwrap()).unwrap(), 7);
    }

    #[test]
    fn test_dict_delete_and_growth_keep_order() {
        let d = dict(&[]).unwrap();
        for i in 0..20 {
            dict_set(&d, &int(i).unwrap(), &int(i * 10).unwrap()).unwrap();
        }
        for i in (0..20).step_by(2) {
            dict_del(&d, &int(i).unwrap()).unwrap();
        }
        for i in 20..30 {
            dict_set(&d, &int(i).unwrap(), &int(i * 10).unwrap()).unwrap();
        }
        let keys: Vec<i64> = dict_items(&d)
            .unwrap()
            .iter()
            .map(|(k, _)| int_value(k).unwrap())
            .collect();
        let expected: Vec<i64> = (1..20).step_by(2).chain(20..30).collect();
        assert_eq!(keys, expected);
        assert_eq!(length(&d).unwrap(), 20);

        let err = dict_del(&d, &int(0).unwrap()).unwrap_err();
        assert_eq!(err, RuntimeError::Key("0".into()));
    }

    #[test]
    fn test_dict_releases_entries() {
        let key = bytes(b"k").unwrap();
        let value = int(5).unwrap();
        let d = dict(&[(key.clone(), value.clone())]).unwrap();
        let (key_rc, value_rc) = (key.ref_count(), value.ref_count());
        drop(d);
        assert_eq!(key.ref_count(), key_rc - 1);
        assert_eq!(value.ref_count(), value_rc - 1);
        assert!(dict_set(&tuple(&[]).unwrap(), &key, &value).is_err());
    }
}
