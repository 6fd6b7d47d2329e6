//! Binary layouts of the runtime's object categories.
//!
//! A [`Layout`] is plain data: an ordered list of named fields with byte
//! offsets and kinds. Layouts are built by extending a parent layout, so the
//! header fields of every category sit at the same offsets. Which tables are
//! used is decided at runtime by [`LayoutRegistry::for_build`].

mod registry;

pub use registry::{LayoutRegistry, RuntimeBuild};

use crate::error::LayoutError;
use std::{fmt, str::FromStr};

/// Pointer width the tables are written for.
pub const PTR_SIZE: usize = 8;

pub trait HasLayout {
    fn size(&self) -> usize;

    fn alignment(&self) -> usize {
        self.size().clamp(1, PTR_SIZE)
    }
}

pub const fn align_up(value: usize, align: usize) -> usize {
    let misalignment = value % align;
    if misalignment == 0 {
        value
    } else {
        value + align - misalignment
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scalar {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    NativeInt,
    NativeUInt,
    Float64,
}

impl HasLayout for Scalar {
    fn size(&self) -> usize {
        match self {
            Scalar::Int8 | Scalar::UInt8 => 1,
            Scalar::Int16 | Scalar::UInt16 => 2,
            Scalar::Int32 | Scalar::UInt32 => 4,
            Scalar::Int64 | Scalar::UInt64 | Scalar::Float64 => 8,
            Scalar::NativeInt | Scalar::NativeUInt => PTR_SIZE,
        }
    }
}

impl Scalar {
    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            Scalar::Int8 | Scalar::Int16 | Scalar::Int32 | Scalar::Int64 | Scalar::NativeInt
        )
    }

    pub fn type_tag(&self) -> &'static str {
        match self {
            Scalar::Int8 => "i8",
            Scalar::UInt8 => "u8",
            Scalar::Int16 => "i16",
            Scalar::UInt16 => "u16",
            Scalar::Int32 => "i32",
            Scalar::UInt32 => "u32",
            Scalar::Int64 => "i64",
            Scalar::UInt64 => "u64",
            Scalar::NativeInt => "isize",
            Scalar::NativeUInt => "usize",
            Scalar::Float64 => "f64",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Scalar(Scalar),
    /// Owned reference to an object.
    ObjectRef,
    /// Reference to a type descriptor.
    TypeRef,
    /// Pointer to a NUL-terminated string.
    CStr,
    /// Nullable function pointer.
    FnPtr,
    /// Opaque pointer.
    RawPtr,
    /// Pointer to a slot sub-table with the given layout.
    Table(LayoutKind),
    /// Inline object pointers, `ob_size` of them.
    ItemArray,
    /// Pointer to a separately allocated array of `ob_size` object pointers.
    ItemBuffer,
    /// Inline bytes, `ob_size` of them.
    ByteBuffer,
}

impl HasLayout for FieldKind {
    fn size(&self) -> usize {
        match self {
            FieldKind::Scalar(s) => s.size(),
            FieldKind::ItemArray | FieldKind::ByteBuffer => 0,
            _ => PTR_SIZE,
        }
    }

    fn alignment(&self) -> usize {
        match self {
            FieldKind::Scalar(s) => s.alignment(),
            FieldKind::ByteBuffer => 1,
            _ => PTR_SIZE,
        }
    }
}

impl FieldKind {
    /// Element width of variable-length fields.
    pub fn element_size(&self) -> Option<usize> {
        match self {
            FieldKind::ItemArray | FieldKind::ItemBuffer => Some(PTR_SIZE),
            FieldKind::ByteBuffer => Some(1),
            _ => None,
        }
    }

    pub fn is_pointer(&self) -> bool {
        !matches!(
            self,
            FieldKind::Scalar(_) | FieldKind::ItemArray | FieldKind::ByteBuffer
        )
    }

    pub fn type_tag(&self) -> String {
        match self {
            FieldKind::Scalar(s) => s.type_tag().to_string(),
            FieldKind::ObjectRef => "&object".to_string(),
            FieldKind::TypeRef => "&type".to_string(),
            FieldKind::CStr => "*const c_char".to_string(),
            FieldKind::FnPtr => "fn".to_string(),
            FieldKind::RawPtr => "*mut ()".to_string(),
            FieldKind::Table(kind) => format!("&{}", kind.type_name()),
            FieldKind::ItemArray => "[&object]".to_string(),
            FieldKind::ItemBuffer => "*mut [&object]".to_string(),
            FieldKind::ByteBuffer => "[u8]".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldLayout {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
    /// Writable only inside an unsafe scope.
    pub guarded: bool,
}

impl FieldLayout {
    pub fn end(&self) -> usize {
        self.offset + self.kind.size()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayoutKind {
    Object,
    VarObject,
    Int,
    Float,
    Bytes,
    Tuple,
    List,
    Dict,
    Type,
    Function,
    Wrapper,
    GcHead,
    NumberMethods,
    SequenceMethods,
}

impl LayoutKind {
    pub const ALL: [LayoutKind; 14] = [
        LayoutKind::Object,
        LayoutKind::VarObject,
        LayoutKind::Int,
        LayoutKind::Float,
        LayoutKind::Bytes,
        LayoutKind::Tuple,
        LayoutKind::List,
        LayoutKind::Dict,
        LayoutKind::Type,
        LayoutKind::Function,
        LayoutKind::Wrapper,
        LayoutKind::GcHead,
        LayoutKind::NumberMethods,
        LayoutKind::SequenceMethods,
    ];

    /// Name of the runtime struct the layout mirrors.
    pub fn type_name(&self) -> &'static str {
        match self {
            LayoutKind::Object => "Object",
            LayoutKind::VarObject => "VarObject",
            LayoutKind::Int => "Int",
            LayoutKind::Float => "Float",
            LayoutKind::Bytes => "Bytes",
            LayoutKind::Tuple => "Tuple",
            LayoutKind::List => "List",
            LayoutKind::Dict => "Dict",
            LayoutKind::Type => "Type",
            LayoutKind::Function => "Function",
            LayoutKind::Wrapper => "Wrapper",
            LayoutKind::GcHead => "GcHead",
            LayoutKind::NumberMethods => "NumberMethods",
            LayoutKind::SequenceMethods => "SequenceMethods",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

impl FromStr for LayoutKind {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LayoutKind::ALL
            .into_iter()
            .find(|k| k.type_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| LayoutError::UnknownKind(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub kind: LayoutKind,
    pub parent: Option<LayoutKind>,
    pub fields: Vec<FieldLayout>,
    /// Bytes of an instance with zero items.
    pub basic_size: usize,
    /// Bytes per item; 0 for fixed-size categories.
    pub item_size: usize,
    /// Field holding the item count.
    pub length_field: Option<&'static str>,
}

impl HasLayout for Layout {
    fn size(&self) -> usize {
        self.basic_size
    }
}

impl Layout {
    pub fn name(&self) -> &'static str {
        self.kind.type_name()
    }

    pub fn field(&self, name: &str) -> Result<&FieldLayout, LayoutError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| LayoutError::UnknownField {
                layout: self.name().to_string(),
                field: name.to_string(),
            })
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    pub fn is_var_sized(&self) -> bool {
        self.length_field.is_some()
    }

    /// Bytes needed for an instance holding `len` items.
    pub fn size_for(&self, len: usize) -> usize {
        self.basic_size + len * self.item_size
    }

    /// The variable-length field, if any.
    pub fn items_field(&self) -> Option<&FieldLayout> {
        self.fields.iter().find(|f| f.kind.element_size().is_some())
    }
}

/// Appends fields at naturally aligned offsets.
pub struct LayoutBuilder {
    layout: Layout,
    cursor: usize,
    alignment: usize,
    fixed_size: Option<usize>,
}

impl LayoutBuilder {
    pub fn new(kind: LayoutKind) -> Self {
        Self {
            layout: Layout {
                kind,
                parent: None,
                fields: Vec::new(),
                basic_size: 0,
                item_size: 0,
                length_field: None,
            },
            cursor: 0,
            alignment: 1,
            fixed_size: None,
        }
    }

    /// Start from all fields of `parent`.
    pub fn extend(parent: &Layout, kind: LayoutKind) -> Self {
        let mut builder = Self::new(kind);
        builder.layout.parent = Some(parent.kind);
        builder.layout.fields = parent.fields.clone();
        builder.layout.item_size = parent.item_size;
        builder.layout.length_field = parent.length_field;
        builder.cursor = parent.fields.iter().map(FieldLayout::end).max().unwrap_or(0);
        builder.alignment = parent
            .fields
            .iter()
            .map(|f| f.kind.alignment())
            .max()
            .unwrap_or(1);
        builder
    }

    fn push(mut self, name: &'static str, kind: FieldKind, guarded: bool) -> Self {
        let offset = align_up(self.cursor, kind.alignment());
        self.layout.fields.push(FieldLayout {
            name,
            offset,
            kind,
            guarded,
        });
        self.cursor = offset + kind.size();
        self.alignment = self.alignment.max(kind.alignment());
        if let Some(item) = kind.element_size() {
            if kind != FieldKind::ItemBuffer {
                self.layout.item_size = item;
            }
        }
        self
    }

    pub fn field(self, name: &'static str, kind: FieldKind) -> Self {
        self.push(name, kind, false)
    }

    pub fn guarded(self, name: &'static str, kind: FieldKind) -> Self {
        self.push(name, kind, true)
    }

    /// Guarded item-count field.
    pub fn length(mut self, name: &'static str) -> Self {
        self.layout.length_field = Some(name);
        self.push(name, FieldKind::Scalar(Scalar::NativeInt), true)
    }

    /// Offset just past the last field added so far.
    pub fn end(&self) -> usize {
        self.cursor
    }

    /// Override the computed basic size.
    pub fn basic_size(mut self, size: usize) -> Self {
        self.fixed_size = Some(size);
        self
    }

    pub fn build(mut self) -> Layout {
        self.layout.basic_size = self
            .fixed_size
            .unwrap_or_else(|| align_up(self.cursor, self.alignment));
        self.layout
    }
}
