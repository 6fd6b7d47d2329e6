//! Type descriptors, builtin types and attribute tables.

use super::{
    abstract_ops::{call_binary, call_hash, call_inquiry, call_len, call_size_arg, call_unary, expect_args},
    alloc,
    object::{free_object, make_immortal, ObjRef, RawObject, RawVarObject},
    dict::{self, RawDict},
    objects::{self, RawBytes, RawFloat, RawFunction, RawInt, RawList, RawTuple, RawWrapper},
    RuntimeError,
};
use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    ffi::{c_char, c_int, CStr, CString},
    mem::{offset_of, size_of},
    ptr::{self, NonNull},
    sync::OnceLock,
};

pub type Destructor = unsafe extern "C" fn(*mut RawObject);
pub type UnaryFunc = unsafe extern "C" fn(*mut RawObject) -> *mut RawObject;
pub type BinaryFunc = unsafe extern "C" fn(*mut RawObject, *mut RawObject) -> *mut RawObject;
pub type HashFunc = unsafe extern "C" fn(*mut RawObject) -> isize;
pub type InquiryFunc = unsafe extern "C" fn(*mut RawObject) -> c_int;
pub type LenFunc = unsafe extern "C" fn(*mut RawObject) -> isize;
pub type SizeArgFunc = unsafe extern "C" fn(*mut RawObject, isize) -> *mut RawObject;

/// Attribute table of a type; the target of `tp_dict`.
pub type AttrTable = Mutex<BTreeMap<String, ObjRef>>;

pub mod flags {
    pub const IMMUTABLETYPE: u64 = 1 << 8;
    pub const HEAPTYPE: u64 = 1 << 9;
    pub const BASETYPE: u64 = 1 << 10;
    pub const READY: u64 = 1 << 12;
    pub const HAVE_GC: u64 = 1 << 14;
    pub const FLOAT_SUBCLASS: u64 = 1 << 20;
    pub const FUNCTION_SUBCLASS: u64 = 1 << 21;
    pub const INT_SUBCLASS: u64 = 1 << 24;
    pub const LIST_SUBCLASS: u64 = 1 << 25;
    pub const TUPLE_SUBCLASS: u64 = 1 << 26;
    pub const BYTES_SUBCLASS: u64 = 1 << 27;
    pub const DICT_SUBCLASS: u64 = 1 << 29;
    pub const TYPE_SUBCLASS: u64 = 1 << 31;

    /// Bits inherited by every subclass.
    pub const INHERITED: u64 = HAVE_GC
        | FLOAT_SUBCLASS
        | FUNCTION_SUBCLASS
        | INT_SUBCLASS
        | LIST_SUBCLASS
        | TUPLE_SUBCLASS
        | BYTES_SUBCLASS
        | DICT_SUBCLASS
        | TYPE_SUBCLASS;
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct NumberMethods {
    pub nb_add: Option<BinaryFunc>,
    pub nb_subtract: Option<BinaryFunc>,
    pub nb_multiply: Option<BinaryFunc>,
    pub nb_matrix_multiply: Option<BinaryFunc>,
    pub nb_negative: Option<UnaryFunc>,
    pub nb_bool: Option<InquiryFunc>,
}

impl NumberMethods {
    fn inherit(&mut self, base: &NumberMethods) {
        self.nb_add = self.nb_add.or(base.nb_add);
        self.nb_subtract = self.nb_subtract.or(base.nb_subtract);
        self.nb_multiply = self.nb_multiply.or(base.nb_multiply);
        self.nb_matrix_multiply = self.nb_matrix_multiply.or(base.nb_matrix_multiply);
        self.nb_negative = self.nb_negative.or(base.nb_negative);
        self.nb_bool = self.nb_bool.or(base.nb_bool);
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
pub struct SequenceMethods {
    pub sq_length: Option<LenFunc>,
    pub sq_item: Option<SizeArgFunc>,
}

impl SequenceMethods {
    fn inherit(&mut self, base: &SequenceMethods) {
        self.sq_length = self.sq_length.or(base.sq_length);
        self.sq_item = self.sq_item.or(base.sq_item);
    }
}

#[repr(C)]
pub struct RawType {
    pub ob_base: RawVarObject,
    pub tp_name: *const c_char,
    pub tp_basicsize: isize,
    pub tp_itemsize: isize,
    pub tp_dealloc: Option<Destructor>,
    pub tp_repr: Option<UnaryFunc>,
    pub tp_hash: Option<HashFunc>,
    pub tp_as_number: *mut NumberMethods,
    pub tp_as_sequence: *mut SequenceMethods,
    pub tp_flags: u64,
    pub tp_base: *mut RawType,
    pub tp_dict: *mut AttrTable,
    /// Bumped on every attribute table change.
    pub tp_version_tag: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinType {
    Object,
    Type,
    Int,
    Bool,
    Float,
    Bytes,
    Tuple,
    List,
    Dict,
    Function,
    StaticMethod,
    ClassMethod,
    Property,
    NoneType,
}

impl BuiltinType {
    const COUNT: usize = 14;
}

#[derive(Clone, Copy)]
struct StaticPtr(NonNull<RawObject>);

// SAFETY: builtin objects are immortal and are never written after bootstrap,
// except for attribute tables, which are behind their own lock.
unsafe impl Send for StaticPtr {}
unsafe impl Sync for StaticPtr {}

struct Builtins {
    types: [StaticPtr; BuiltinType::COUNT],
    none: StaticPtr,
    true_: StaticPtr,
    false_: StaticPtr,
}

static BUILTINS: OnceLock<Builtins> = OnceLock::new();

fn builtins() -> &'static Builtins {
    BUILTINS.get_or_init(|| {
        unsafe { bootstrap() }
            .unwrap_or_else(|e| panic!("runtime bootstrap failed: {}", e))
    })
}

pub(crate) fn builtin_type_ptr(which: BuiltinType) -> *mut RawType {
    builtins().types[which as usize].0.as_ptr().cast()
}

/// Strong reference to a builtin type.
pub fn builtin_type(which: BuiltinType) -> ObjRef {
    unsafe { ObjRef::from_borrowed(builtin_type_ptr(which).cast()) }
        .unwrap_or_else(|| unreachable!("builtin types are never NULL"))
}

pub(crate) fn none_ptr() -> *mut RawObject {
    builtins().none.0.as_ptr()
}

pub(crate) fn bool_ptr(value: bool) -> *mut RawObject {
    let b = builtins();
    if value {
        b.true_.0.as_ptr()
    } else {
        b.false_.0.as_ptr()
    }
}

struct TypeSpec<'a> {
    name: &'a str,
    basicsize: usize,
    itemsize: usize,
    flags: u64,
    dealloc: Option<Destructor>,
    repr: Option<UnaryFunc>,
    hash: Option<HashFunc>,
    number: NumberMethods,
    sequence: SequenceMethods,
}

impl<'a> TypeSpec<'a> {
    const fn new(name: &'a str, basicsize: usize, flags: u64) -> Self {
        Self {
            name,
            basicsize,
            itemsize: 0,
            flags,
            dealloc: None,
            repr: None,
            hash: None,
            number: NumberMethods {
                nb_add: None,
                nb_subtract: None,
                nb_multiply: None,
                nb_matrix_multiply: None,
                nb_negative: None,
                nb_bool: None,
            },
            sequence: SequenceMethods {
                sq_length: None,
                sq_item: None,
            },
        }
    }
}

const STATIC_FLAGS: u64 = flags::IMMUTABLETYPE | flags::READY;

unsafe fn bootstrap() -> Result<Builtins, RuntimeError> {
    use flags::*;

    let object_size = size_of::<RawObject>();

    let mut type_spec = TypeSpec::new(
        "type",
        size_of::<RawType>(),
        STATIC_FLAGS | BASETYPE | HAVE_GC | TYPE_SUBCLASS,
    );
    type_spec.dealloc = Some(type_dealloc);
    type_spec.repr = Some(type_repr);
    let meta = unsafe { alloc_type(ptr::null_mut(), &type_spec, ptr::null_mut())? };
    unsafe { (*meta).ob_base.ob_base.ob_type = meta };

    let mut object_spec = TypeSpec::new("object", object_size, STATIC_FLAGS | BASETYPE);
    object_spec.repr = Some(objects::object_repr);
    object_spec.hash = Some(objects::object_hash);
    let object = unsafe { alloc_type(meta, &object_spec, ptr::null_mut())? };
    unsafe {
        (*meta).tp_base = object;
        // `type` was created before `object`, inherit its hash now
        (*meta).tp_hash = Some(objects::object_hash);
    }

    let mut int_spec = TypeSpec::new("int", size_of::<RawInt>(), STATIC_FLAGS | BASETYPE | INT_SUBCLASS);
    int_spec.repr = Some(objects::int_repr);
    int_spec.hash = Some(objects::int_hash);
    int_spec.number = NumberMethods {
        nb_add: Some(objects::int_add),
        nb_subtract: Some(objects::int_subtract),
        nb_multiply: Some(objects::int_multiply),
        nb_matrix_multiply: None,
        nb_negative: Some(objects::int_negative),
        nb_bool: Some(objects::int_bool),
    };

    let mut bool_spec = TypeSpec::new("bool", size_of::<RawInt>(), STATIC_FLAGS | INT_SUBCLASS);
    bool_spec.repr = Some(objects::bool_repr);

    let mut float_spec = TypeSpec::new("float", size_of::<RawFloat>(), STATIC_FLAGS | BASETYPE | FLOAT_SUBCLASS);
    float_spec.repr = Some(objects::float_repr);
    float_spec.hash = Some(objects::float_hash);
    float_spec.number = NumberMethods {
        nb_add: Some(objects::float_add),
        nb_subtract: Some(objects::float_subtract),
        nb_multiply: Some(objects::float_multiply),
        nb_matrix_multiply: None,
        nb_negative: Some(objects::float_negative),
        nb_bool: Some(objects::float_bool),
    };

    let mut bytes_spec = TypeSpec::new(
        "bytes",
        offset_of!(RawBytes, ob_sval) + 1,
        STATIC_FLAGS | BASETYPE | BYTES_SUBCLASS,
    );
    bytes_spec.itemsize = 1;
    bytes_spec.repr = Some(objects::bytes_repr);
    bytes_spec.hash = Some(objects::bytes_hash);
    bytes_spec.sequence = SequenceMethods {
        sq_length: Some(objects::var_length),
        sq_item: Some(objects::bytes_item),
    };

    let mut tuple_spec = TypeSpec::new(
        "tuple",
        offset_of!(RawTuple, ob_item),
        STATIC_FLAGS | BASETYPE | HAVE_GC | TUPLE_SUBCLASS,
    );
    tuple_spec.itemsize = size_of::<*mut RawObject>();
    tuple_spec.dealloc = Some(objects::tuple_dealloc);
    tuple_spec.repr = Some(objects::tuple_repr);
    tuple_spec.sequence = SequenceMethods {
        sq_length: Some(objects::var_length),
        sq_item: Some(objects::tuple_item),
    };

    let mut list_spec = TypeSpec::new(
        "list",
        size_of::<RawList>(),
        STATIC_FLAGS | BASETYPE | HAVE_GC | LIST_SUBCLASS,
    );
    list_spec.dealloc = Some(objects::list_dealloc);
    list_spec.repr = Some(objects::list_repr);
    list_spec.sequence = SequenceMethods {
        sq_length: Some(objects::var_length),
        sq_item: Some(objects::list_item),
    };

    let mut dict_spec = TypeSpec::new(
        "dict",
        size_of::<RawDict>(),
        STATIC_FLAGS | BASETYPE | HAVE_GC | DICT_SUBCLASS,
    );
    dict_spec.dealloc = Some(dict::dict_dealloc);
    dict_spec.repr = Some(dict::dict_repr);
    dict_spec.sequence = SequenceMethods {
        sq_length: Some(dict::dict_length),
        sq_item: None,
    };

    let mut function_spec = TypeSpec::new(
        "function",
        size_of::<RawFunction>(),
        STATIC_FLAGS | HAVE_GC | FUNCTION_SUBCLASS,
    );
    function_spec.dealloc = Some(objects::function_dealloc);
    function_spec.repr = Some(objects::function_repr);

    let mut wrapper_specs = [
        TypeSpec::new("staticmethod", size_of::<RawWrapper>(), STATIC_FLAGS | BASETYPE | HAVE_GC),
        TypeSpec::new("classmethod", size_of::<RawWrapper>(), STATIC_FLAGS | BASETYPE | HAVE_GC),
        TypeSpec::new("property", size_of::<RawWrapper>(), STATIC_FLAGS | BASETYPE | HAVE_GC),
    ];
    for spec in &mut wrapper_specs {
        spec.dealloc = Some(objects::wrapper_dealloc);
    }

    let mut none_spec = TypeSpec::new("NoneType", object_size, STATIC_FLAGS);
    none_spec.repr = Some(objects::none_repr);

    let int = unsafe { alloc_type(meta, &int_spec, object)? };
    let bool_ = unsafe { alloc_type(meta, &bool_spec, int)? };
    let float = unsafe { alloc_type(meta, &float_spec, object)? };
    let bytes = unsafe { alloc_type(meta, &bytes_spec, object)? };
    let tuple = unsafe { alloc_type(meta, &tuple_spec, object)? };
    let list = unsafe { alloc_type(meta, &list_spec, object)? };
    let dict = unsafe { alloc_type(meta, &dict_spec, object)? };
    let function = unsafe { alloc_type(meta, &function_spec, object)? };
    let [static_spec, class_spec, property_spec] = &wrapper_specs;
    let staticmethod = unsafe { alloc_type(meta, static_spec, object)? };
    let classmethod = unsafe { alloc_type(meta, class_spec, object)? };
    let property = unsafe { alloc_type(meta, property_spec, object)? };
    let none_type = unsafe { alloc_type(meta, &none_spec, object)? };

    let table: [(*mut RawType, &TypeSpec); BuiltinType::COUNT] = [
        (object, &object_spec),
        (meta, &type_spec),
        (int, &int_spec),
        (bool_, &bool_spec),
        (float, &float_spec),
        (bytes, &bytes_spec),
        (tuple, &tuple_spec),
        (list, &list_spec),
        (dict, &dict_spec),
        (function, &function_spec),
        (staticmethod, static_spec),
        (classmethod, class_spec),
        (property, property_spec),
        (none_type, &none_spec),
    ];
    for (ty, spec) in &table {
        unsafe {
            make_immortal(ty.cast());
            add_slot_wrappers(*ty, spec, function)?;
        }
    }

    let singleton = |ty: *mut RawType, value: Option<i64>| -> Result<StaticPtr, RuntimeError> {
        let op = match value {
            Some(v) => unsafe { objects::alloc_int(ty, v)? },
            None => unsafe { objects::alloc_fixed(ty)? },
        };
        unsafe { make_immortal(op) };
        Ok(StaticPtr(unsafe { NonNull::new_unchecked(op) }))
    };

    let types = table.map(|(ty, _)| StaticPtr(unsafe { NonNull::new_unchecked(ty.cast()) }));
    Ok(Builtins {
        types,
        none: singleton(none_type, None)?,
        true_: singleton(bool_, Some(1))?,
        false_: singleton(bool_, Some(0))?,
    })
}

/// Allocate and initialise a type descriptor. Slots not set in `spec` are
/// inherited from `base`.
unsafe fn alloc_type(
    meta: *mut RawType,
    spec: &TypeSpec,
    base: *mut RawType,
) -> Result<*mut RawType, RuntimeError> {
    let name = CString::new(spec.name)
        .map_err(|_| RuntimeError::Type(format!("type name {:?} contains NUL", spec.name)))?;
    let mem = alloc::allocate(size_of::<RawType>(), true)?;
    let ty = mem.as_ptr().cast::<RawType>();

    let mut number = spec.number;
    let mut sequence = spec.sequence;
    let mut dealloc = spec.dealloc;
    let mut repr = spec.repr;
    let mut hash = spec.hash;
    if let Some(b) = unsafe { base.as_ref() } {
        if let Some(nb) = unsafe { b.tp_as_number.as_ref() } {
            number.inherit(nb);
        }
        if let Some(sq) = unsafe { b.tp_as_sequence.as_ref() } {
            sequence.inherit(sq);
        }
        dealloc = dealloc.or(b.tp_dealloc);
        repr = repr.or(b.tp_repr);
        hash = hash.or(b.tp_hash);
    }

    unsafe {
        ptr::write(
            ty,
            RawType {
                ob_base: RawVarObject {
                    ob_base: RawObject {
                        ob_refcnt: 1,
                        ob_type: meta,
                    },
                    ob_size: 0,
                },
                tp_name: name.into_raw(),
                tp_basicsize: spec.basicsize as isize,
                tp_itemsize: spec.itemsize as isize,
                tp_dealloc: dealloc,
                tp_repr: repr,
                tp_hash: hash,
                tp_as_number: Box::into_raw(Box::new(number)),
                tp_as_sequence: Box::into_raw(Box::new(sequence)),
                tp_flags: spec.flags,
                tp_base: base,
                tp_dict: Box::into_raw(Box::new(AttrTable::default())),
                tp_version_tag: 0,
            },
        )
    };
    Ok(ty)
}

fn native<F>(name: &'static str, f: F) -> (&'static str, objects::NativeFn)
where
    F: Fn(&[ObjRef]) -> Result<ObjRef, RuntimeError> + 'static,
{
    (name, Box::new(f))
}

/// Expose the slots a builtin defines itself as callable attributes, so that
/// attribute lookup sees the native behaviour.
unsafe fn add_slot_wrappers(
    ty: *mut RawType,
    spec: &TypeSpec,
    function_type: *mut RawType,
) -> Result<(), RuntimeError> {
    let mut entries: Vec<(&'static str, objects::NativeFn)> = Vec::new();

    if let Some(f) = spec.repr {
        entries.push(native("__repr__", move |args| {
            expect_args("__repr__", args, 1)?;
            call_unary(f, &args[0])
        }));
    }
    if let Some(f) = spec.hash {
        entries.push(native("__hash__", move |args| {
            expect_args("__hash__", args, 1)?;
            objects::int(call_hash(f, &args[0])? as i64)
        }));
    }
    let nb = &spec.number;
    for (name, slot) in [
        ("__add__", nb.nb_add),
        ("__sub__", nb.nb_subtract),
        ("__mul__", nb.nb_multiply),
        ("__matmul__", nb.nb_matrix_multiply),
    ] {
        if let Some(f) = slot {
            entries.push(native(name, move |args| {
                expect_args(name, args, 2)?;
                call_binary(f, &args[0], &args[1])
            }));
        }
    }
    if let Some(f) = nb.nb_negative {
        entries.push(native("__neg__", move |args| {
            expect_args("__neg__", args, 1)?;
            call_unary(f, &args[0])
        }));
    }
    if let Some(f) = nb.nb_bool {
        entries.push(native("__bool__", move |args| {
            expect_args("__bool__", args, 1)?;
            Ok(objects::boolean(call_inquiry(f, &args[0])?))
        }));
    }
    if let Some(f) = spec.sequence.sq_length {
        entries.push(native("__len__", move |args| {
            expect_args("__len__", args, 1)?;
            objects::int(call_len(f, &args[0])? as i64)
        }));
    }
    if let Some(f) = spec.sequence.sq_item {
        entries.push(native("__getitem__", move |args| {
            expect_args("__getitem__", args, 2)?;
            let index = objects::int_value(&args[1])?;
            call_size_arg(f, &args[0], index as isize)
        }));
    }

    let table = unsafe { &*(*ty).tp_dict };
    for (name, f) in entries {
        let func = unsafe { objects::alloc_function(function_type, name, f)? };
        unsafe { make_immortal(func) };
        // SAFETY: freshly allocated, reference transferred to the table
        if let Some(func) = unsafe { ObjRef::from_owned(func) } {
            table.lock().insert(name.to_string(), func);
        }
    }
    Ok(())
}

unsafe extern "C" fn type_dealloc(op: *mut RawObject) {
    let ty = op.cast::<RawType>();
    unsafe {
        let t = &mut *ty;
        let base = t.tp_base;
        let dict = std::mem::replace(&mut t.tp_dict, ptr::null_mut());
        if !dict.is_null() {
            drop(Box::from_raw(dict));
        }
        if !t.tp_name.is_null() {
            drop(CString::from_raw(t.tp_name as *mut c_char));
        }
        if !t.tp_as_number.is_null() {
            drop(Box::from_raw(t.tp_as_number));
        }
        if !t.tp_as_sequence.is_null() {
            drop(Box::from_raw(t.tp_as_sequence));
        }
        free_object(op);
        super::decref(base.cast());
    }
}

unsafe extern "C" fn type_repr(op: *mut RawObject) -> *mut RawObject {
    let name = unsafe { raw_type_name(op.cast()) };
    match objects::bytes(format!("<class '{}'>", name).as_bytes()) {
        Ok(r) => r.into_raw(),
        Err(e) => super::raise(e),
    }
}

/// # Safety
/// `ty` must be NULL or a live type descriptor.
pub(crate) unsafe fn raw_type_name(ty: *const RawType) -> String {
    match unsafe { ty.as_ref() } {
        Some(t) if !t.tp_name.is_null() => unsafe { CStr::from_ptr(t.tp_name) }
            .to_string_lossy()
            .into_owned(),
        _ => "<NULL>".to_string(),
    }
}

pub fn is_type(obj: &ObjRef) -> bool {
    unsafe { (*obj.type_ptr()).tp_flags & flags::TYPE_SUBCLASS != 0 }
}

fn as_raw_type(ty: &ObjRef) -> Result<*mut RawType, RuntimeError> {
    if is_type(ty) {
        Ok(ty.as_ptr().cast())
    } else {
        Err(RuntimeError::Type(format!(
            "expected a type, got '{}' object",
            ty.type_name()
        )))
    }
}

pub fn type_name(ty: &ObjRef) -> String {
    if is_type(ty) {
        unsafe { raw_type_name(ty.as_ptr().cast()) }
    } else {
        ty.type_name()
    }
}

/// Create a heap type deriving from `base`. `extra_flags` may include
/// [`flags::IMMUTABLETYPE`] to get a type that behaves like a builtin.
pub fn new_type(name: &str, base: &ObjRef, extra_flags: u64) -> Result<ObjRef, RuntimeError> {
    let base_raw = as_raw_type(base)?;
    let b = unsafe { &*base_raw };
    if b.tp_flags & flags::BASETYPE == 0 {
        return Err(RuntimeError::Type(format!(
            "type '{}' is not an acceptable base type",
            type_name(base)
        )));
    }

    let mut spec = TypeSpec::new(
        name,
        b.tp_basicsize as usize,
        (b.tp_flags & flags::INHERITED) | flags::HEAPTYPE | flags::BASETYPE | flags::READY | extra_flags,
    );
    spec.itemsize = b.tp_itemsize as usize;

    let meta = builtin_type_ptr(BuiltinType::Type);
    let ty = unsafe { alloc_type(meta, &spec, base_raw)? };
    // the heap type owns a reference to its base
    std::mem::forget(base.clone());
    unsafe { ObjRef::from_owned(ty.cast()) }
        .ok_or_else(|| RuntimeError::System("type allocation returned NULL".into()))
}

/// Attribute defined directly on `ty`, ignoring its bases.
pub fn type_own_attr(ty: &ObjRef, name: &str) -> Option<ObjRef> {
    let raw = as_raw_type(ty).ok()?;
    let table = unsafe { (*raw).tp_dict.as_ref() }?;
    let found = table.lock().get(name).cloned();
    found
}

/// Resolve `name` along the base chain of `ty`.
pub fn type_lookup(ty: &ObjRef, name: &str) -> Option<ObjRef> {
    let mut current = as_raw_type(ty).ok()?;
    while let Some(t) = unsafe { current.as_ref() } {
        if let Some(table) = unsafe { t.tp_dict.as_ref() } {
            if let Some(found) = table.lock().get(name).cloned() {
                return Some(found);
            }
        }
        current = t.tp_base;
    }
    None
}

pub fn type_set_attr(ty: &ObjRef, name: &str, value: &ObjRef) -> Result<(), RuntimeError> {
    let raw = as_raw_type(ty)?;
    let t = unsafe { &mut *raw };
    if t.tp_flags & flags::IMMUTABLETYPE != 0 {
        return Err(RuntimeError::ImmutableType {
            owner: type_name(ty),
            name: name.to_string(),
        });
    }
    let table = unsafe { t.tp_dict.as_ref() }
        .ok_or_else(|| RuntimeError::System(format!("type '{}' has no attribute table", type_name(ty))))?;
    let previous = table.lock().insert(name.to_string(), value.clone());
    t.tp_version_tag = t.tp_version_tag.wrapping_add(1);
    drop(previous);
    Ok(())
}

pub fn type_del_attr(ty: &ObjRef, name: &str) -> Result<(), RuntimeError> {
    let raw = as_raw_type(ty)?;
    let t = unsafe { &mut *raw };
    if t.tp_flags & flags::IMMUTABLETYPE != 0 {
        return Err(RuntimeError::ImmutableType {
            owner: type_name(ty),
            name: name.to_string(),
        });
    }
    let removed = unsafe { t.tp_dict.as_ref() }.and_then(|table| table.lock().remove(name));
    match removed {
        Some(old) => {
            t.tp_version_tag = t.tp_version_tag.wrapping_add(1);
            drop(old);
            Ok(())
        }
        None => Err(RuntimeError::Attribute {
            owner: type_name(ty),
            name: name.to_string(),
        }),
    }
}
