//! The `info()` dump: a header line, then one `name: type = value` line per
//! field in layout order.

use super::BaseView;
use crate::{
    error::Result,
    layout::FieldKind,
    overlay::Value,
    runtime::{self, ObjRef, RawObject},
};
use std::ffi::{c_char, CStr};

const INDENT: &str = "   ";

/// Short form of the object at `ptr`: its type's name, or the name of the
/// type itself when `as_type` is set.
fn object_ref(base: &BaseView, ptr: *mut RawObject, as_type: bool) -> String {
    if ptr.is_null() {
        return "NULL".to_string();
    }
    if !base.inspector().bridge().is_live(ptr as usize) {
        return format!("{:#x}", ptr as usize);
    }
    match unsafe { ObjRef::from_borrowed(ptr) } {
        Some(obj) if as_type => format!("&[{}]", runtime::type_name(&obj)),
        Some(obj) => format!("&[{}]", obj.type_name()),
        None => "NULL".to_string(),
    }
}

fn format_value(base: &BaseView, kind: FieldKind, value: &Value) -> String {
    match (kind, value) {
        (FieldKind::ObjectRef, Value::Object(p)) => object_ref(base, *p, false),
        (FieldKind::TypeRef, Value::Object(p)) => object_ref(base, *p, true),
        (FieldKind::CStr, Value::Ptr(0)) => "NULL".to_string(),
        (FieldKind::CStr, Value::Ptr(p)) => {
            let s = unsafe { CStr::from_ptr(*p as *const c_char) };
            format!("{:?}", s.to_string_lossy())
        }
        (FieldKind::Table(table), Value::Ptr(p)) if *p != 0 => format!("&[{}]", table),
        (FieldKind::ItemArray, Value::Items(items)) => {
            let parts: Vec<_> = items.iter().map(|p| object_ref(base, *p, false)).collect();
            format!("[{}]", parts.join(", "))
        }
        _ => value.to_string(),
    }
}

pub(crate) fn info(base: &BaseView) -> Result<String> {
    base.check_live();
    let overlay = base.overlay();
    let mut lines = vec![format!("{}(at {:#x}):", base.layout().name(), base.address())];
    for field in &base.layout().fields {
        let value = unsafe { overlay.read_field(field) };
        lines.push(format!(
            "{}{}: {} = {}",
            INDENT,
            field.name,
            field.kind.type_tag(),
            format_value(base, field.kind, &value)
        ));
    }
    Ok(lines.join("\n"))
}
