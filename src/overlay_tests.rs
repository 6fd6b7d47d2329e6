#[cfg(test)]
mod tests {
    use crate::{
        error::{InspectError, LayoutError},
        layout::{LayoutKind, LayoutRegistry, RuntimeBuild},
        overlay::{Overlay, Value},
        runtime::{self, int, int_value, ObjRef},
    };

    fn registry() -> LayoutRegistry {
        LayoutRegistry::for_build(RuntimeBuild { major: 1, minor: 1 }).unwrap()
    }

    fn overlay(obj: &ObjRef, kind: LayoutKind) -> Overlay {
        unsafe { Overlay::new(obj.address(), registry().get(kind).unwrap()) }
    }

    #[test]
    fn test_scalar_write_is_visible_through_object() {
        let n = int(41).unwrap();
        let o = overlay(&n, LayoutKind::Int);
        assert_eq!(o.read("ob_ival").unwrap(), Value::Int(41));
        o.write("ob_ival", &Value::Int(42)).unwrap();
        assert_eq!(int_value(&n).unwrap(), 42);
    }

    #[test]
    fn test_header_fields() {
        let n = int(7).unwrap();
        let o = overlay(&n, LayoutKind::Object);
        assert_eq!(o.read("ob_refcnt").unwrap().as_int(), Some(n.ref_count() as i64));
        assert_eq!(
            o.read("ob_type").unwrap().as_usize(),
            Some(n.type_object().address())
        );
    }

    #[test]
    fn test_unknown_field() {
        let n = int(1).unwrap();
        let err = overlay(&n, LayoutKind::Int).read("ob_sval").unwrap_err();
        assert!(matches!(err, LayoutError::UnknownField { .. }));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let n = int(1).unwrap();
        let o = overlay(&n, LayoutKind::Int);
        let err = o.write("ob_ival", &Value::Float(1.5)).unwrap_err();
        assert!(matches!(err, LayoutError::KindMismatch { .. }));
        assert_eq!(int_value(&n).unwrap(), 1);
    }

    #[test]
    fn test_items_follow_live_length() {
        let a = int(1).unwrap();
        let b = int(2).unwrap();
        let t = runtime::tuple(&[a.clone(), b.clone()]).unwrap();
        let o = overlay(&t, LayoutKind::Tuple);
        assert_eq!(o.len(), Some(2));
        assert_eq!(o.read("ob_item").unwrap(), Value::Items(vec![a.as_ptr(), b.as_ptr()]));

        o.write("ob_size", &Value::Int(1)).unwrap();
        assert_eq!(o.read("ob_item").unwrap(), Value::Items(vec![a.as_ptr()]));
        o.write("ob_size", &Value::Int(2)).unwrap();
    }

    #[test]
    fn test_element_bounds() {
        let t = runtime::tuple(&[int(5).unwrap()]).unwrap();
        let o = overlay(&t, LayoutKind::Tuple);
        assert!(o.element(0).is_ok());
        assert_eq!(o.element(1).unwrap_err(), InspectError::Index { index: 1, len: 1 });
        assert_eq!(o.element(-1).unwrap_err(), InspectError::Index { index: -1, len: 1 });
        assert_eq!(
            o.element_addr_unchecked(1).unwrap(),
            o.element_addr(0).unwrap() + 8
        );
    }

    #[test]
    fn test_list_elements_go_through_buffer() {
        let x = int(3).unwrap();
        let l = runtime::list(&[x.clone()]).unwrap();
        let o = overlay(&l, LayoutKind::List);
        let buffer = o.read("ob_item").unwrap().as_usize().unwrap();
        assert_eq!(o.element_addr(0).unwrap(), buffer);
        assert_eq!(o.element(0).unwrap(), x.as_ptr());
    }

    #[test]
    fn test_bytes_buffer() {
        let b = runtime::bytes(b"abc").unwrap();
        let o = overlay(&b, LayoutKind::Bytes);
        assert_eq!(o.read("ob_sval").unwrap(), Value::Bytes(b"abc".to_vec()));
        o.write("ob_sval", &Value::from(&b"xyz"[..])).unwrap();
        assert_eq!(runtime::bytes_value(&b).unwrap(), b"xyz");
        assert!(o.element(0).is_err());
    }

    #[test]
    fn test_reinterpret_keeps_address() {
        let n = int(9).unwrap();
        let o = overlay(&n, LayoutKind::Int);
        let header = o.reinterpret(registry().get(LayoutKind::Object).unwrap());
        assert_eq!(header.address(), o.address());
        assert!(header.read("ob_ival").is_err());
        assert_eq!(header.basic_size(), 16);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Ptr(0).to_string(), "NULL");
        assert_eq!(Value::Ptr(0x10).to_string(), "0x10");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Bytes(b"a\n".to_vec()).to_string(), "b'a\\n'");
    }
}
