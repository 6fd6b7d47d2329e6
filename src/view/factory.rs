//! Picks the most specific view for an object from its type's flags.

use super::{
    BaseView, BytesView, DictView, FloatView, FunctionView, IntView, ListView, ObjectView, TupleView,
    TypeView, View,
};
use crate::{
    error::Result,
    inspector::Inspector,
    layout::LayoutKind,
    overlay::Overlay,
    runtime::{flags, ObjRef, RuntimeError},
};

type Constructor = fn(BaseView) -> View;

struct Entry {
    flag: u64,
    kind: LayoutKind,
    make: Constructor,
}

fn make_object(base: BaseView) -> View {
    ObjectView::new(base).into()
}

fn make_int(base: BaseView) -> View {
    IntView::new(base).into()
}

fn make_float(base: BaseView) -> View {
    FloatView::new(base).into()
}

fn make_bytes(base: BaseView) -> View {
    BytesView::new(base).into()
}

fn make_tuple(base: BaseView) -> View {
    TupleView::new(base).into()
}

fn make_list(base: BaseView) -> View {
    ListView::new(base).into()
}

fn make_dict(base: BaseView) -> View {
    DictView::new(base).into()
}

fn make_type(base: BaseView) -> View {
    TypeView::new(base).into()
}

fn make_function(base: BaseView) -> View {
    FunctionView::new(base).into()
}

/// Checked in order; the first flag the type carries wins. `type` comes
/// first since metatypes may carry other subclass bits.
const DISPATCH: &[Entry] = &[
    Entry {
        flag: flags::TYPE_SUBCLASS,
        kind: LayoutKind::Type,
        make: make_type,
    },
    Entry {
        flag: flags::INT_SUBCLASS,
        kind: LayoutKind::Int,
        make: make_int,
    },
    Entry {
        flag: flags::FLOAT_SUBCLASS,
        kind: LayoutKind::Float,
        make: make_float,
    },
    Entry {
        flag: flags::BYTES_SUBCLASS,
        kind: LayoutKind::Bytes,
        make: make_bytes,
    },
    Entry {
        flag: flags::TUPLE_SUBCLASS,
        kind: LayoutKind::Tuple,
        make: make_tuple,
    },
    Entry {
        flag: flags::LIST_SUBCLASS,
        kind: LayoutKind::List,
        make: make_list,
    },
    Entry {
        flag: flags::DICT_SUBCLASS,
        kind: LayoutKind::Dict,
        make: make_dict,
    },
    Entry {
        flag: flags::FUNCTION_SUBCLASS,
        kind: LayoutKind::Function,
        make: make_function,
    },
];

fn constructor_for(kind: LayoutKind) -> Constructor {
    DISPATCH
        .iter()
        .find(|e| e.kind == kind)
        .map_or(make_object as Constructor, |e| e.make)
}

/// Layout kind and constructor for whatever object lives at `addr`.
fn classify(inspector: &Inspector, addr: usize) -> Result<(LayoutKind, Constructor)> {
    let header = unsafe { Overlay::new(addr, inspector.layout(LayoutKind::Object)?) };
    let ty = header.read("ob_type")?.as_usize().unwrap_or(0);
    if ty == 0 {
        return Err(RuntimeError::System(format!("object at {:#x} has a NULL type", addr)).into());
    }
    let ty = unsafe { Overlay::new(ty, inspector.layout(LayoutKind::Type)?) };
    let type_flags = ty.read("tp_flags")?.as_usize().unwrap_or(0) as u64;
    if let Some(entry) = DISPATCH.iter().find(|e| type_flags & e.flag != 0) {
        return Ok((entry.kind, entry.make));
    }
    let var_sized = ty.read("tp_itemsize")?.as_int().unwrap_or(0) != 0;
    let kind = if var_sized {
        LayoutKind::VarObject
    } else {
        LayoutKind::Object
    };
    Ok((kind, make_object))
}

pub(crate) fn view_of(inspector: &Inspector, obj: &ObjRef) -> Result<View> {
    let (kind, make) = classify(inspector, obj.address())?;
    let overlay = unsafe { Overlay::new(obj.address(), inspector.layout(kind)?) };
    Ok(make(BaseView::new(inspector.clone(), overlay, Some(obj.clone()))))
}

/// # Safety
/// `addr` must be a live object.
pub(crate) unsafe fn view_of_addr(inspector: &Inspector, addr: usize) -> Result<View> {
    let (kind, make) = classify(inspector, addr)?;
    let overlay = unsafe { Overlay::new(addr, inspector.layout(kind)?) };
    Ok(make(BaseView::new(inspector.clone(), overlay, None)))
}

/// View `addr` through the layout of `kind`, regardless of its type.
pub(crate) fn view_with(inspector: &Inspector, addr: usize, kind: LayoutKind, base: Option<ObjRef>) -> Result<View> {
    let overlay = unsafe { Overlay::new(addr, inspector.layout(kind)?) };
    Ok(constructor_for(kind)(BaseView::new(inspector.clone(), overlay, base)))
}
