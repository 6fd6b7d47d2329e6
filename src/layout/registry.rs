use super::{FieldKind, Layout, LayoutBuilder, LayoutKind, Scalar, PTR_SIZE};
use crate::{bridge::RuntimeBridge, error::LayoutError};
use std::{collections::BTreeMap, fmt, mem::size_of, str::FromStr, sync::Arc};
use tracing::debug;

/// Identifies which binary layout a runtime uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuntimeBuild {
    pub major: u16,
    pub minor: u16,
}

impl fmt::Display for RuntimeBuild {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for RuntimeBuild {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || LayoutError::InvalidBuild(s.to_string());
        let (major, minor) = s.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }
}

/// The layout tables for one runtime build.
#[derive(Clone, Debug)]
pub struct LayoutRegistry {
    build: RuntimeBuild,
    layouts: BTreeMap<LayoutKind, Arc<Layout>>,
}

use FieldKind::*;

const ISIZE: FieldKind = FieldKind::Scalar(Scalar::NativeInt);
const USIZE: FieldKind = FieldKind::Scalar(Scalar::NativeUInt);

impl LayoutRegistry {
    pub fn for_build(build: RuntimeBuild) -> Result<Self, LayoutError> {
        if size_of::<usize>() != PTR_SIZE {
            return Err(LayoutError::PointerWidth {
                expected: PTR_SIZE,
                actual: size_of::<usize>(),
            });
        }
        if build.major != 1 {
            return Err(LayoutError::UnsupportedBuild {
                major: build.major,
                minor: build.minor,
            });
        }

        let object = LayoutBuilder::new(LayoutKind::Object)
            .guarded("ob_refcnt", ISIZE)
            .guarded("ob_type", TypeRef)
            .build();
        let var = LayoutBuilder::extend(&object, LayoutKind::VarObject)
            .length("ob_size")
            .build();

        let int = LayoutBuilder::extend(&object, LayoutKind::Int)
            .field("ob_ival", FieldKind::Scalar(Scalar::Int64))
            .build();
        let float = LayoutBuilder::extend(&object, LayoutKind::Float)
            .field("ob_fval", FieldKind::Scalar(Scalar::Float64))
            .build();
        let bytes = LayoutBuilder::extend(&var, LayoutKind::Bytes)
            .field("ob_shash", ISIZE)
            .field("ob_sval", ByteBuffer);
        // one extra byte for the terminating NUL
        let bytes_basic = bytes.end() + 1;
        let bytes = bytes.basic_size(bytes_basic).build();
        let tuple = LayoutBuilder::extend(&var, LayoutKind::Tuple)
            .field("ob_item", ItemArray)
            .build();
        let list = LayoutBuilder::extend(&var, LayoutKind::List)
            .guarded("ob_item", ItemBuffer)
            .guarded("allocated", ISIZE)
            .build();
        let dict = LayoutBuilder::extend(&object, LayoutKind::Dict)
            .guarded("ma_used", ISIZE)
            .guarded("ma_version_tag", FieldKind::Scalar(Scalar::UInt64))
            .guarded("ma_keys", RawPtr)
            .build();
        let function = LayoutBuilder::extend(&object, LayoutKind::Function)
            .field("fn_name", CStr)
            .guarded("fn_impl", RawPtr)
            .build();
        let wrapper = LayoutBuilder::extend(&object, LayoutKind::Wrapper)
            .field("wrapped", ObjectRef)
            .build();

        let mut ty = LayoutBuilder::extend(&var, LayoutKind::Type)
            .field("tp_name", CStr)
            .field("tp_basicsize", ISIZE)
            .field("tp_itemsize", ISIZE)
            .field("tp_dealloc", FnPtr)
            .field("tp_repr", FnPtr)
            .field("tp_hash", FnPtr)
            .guarded("tp_as_number", Table(LayoutKind::NumberMethods))
            .guarded("tp_as_sequence", Table(LayoutKind::SequenceMethods))
            .field("tp_flags", FieldKind::Scalar(Scalar::UInt64))
            .guarded("tp_base", TypeRef)
            .guarded("tp_dict", RawPtr);
        if build.minor >= 1 {
            ty = ty.field("tp_version_tag", FieldKind::Scalar(Scalar::UInt32));
        }
        let ty = ty.build();

        let gc_head = LayoutBuilder::new(LayoutKind::GcHead)
            .guarded("gc_next", USIZE)
            .guarded("gc_prev", USIZE)
            .build();
        let number = LayoutBuilder::new(LayoutKind::NumberMethods)
            .field("nb_add", FnPtr)
            .field("nb_subtract", FnPtr)
            .field("nb_multiply", FnPtr)
            .field("nb_matrix_multiply", FnPtr)
            .field("nb_negative", FnPtr)
            .field("nb_bool", FnPtr)
            .build();
        let sequence = LayoutBuilder::new(LayoutKind::SequenceMethods)
            .field("sq_length", FnPtr)
            .field("sq_item", FnPtr)
            .build();

        let layouts = [
            object, var, int, float, bytes, tuple, list, dict, ty, function, wrapper, gc_head,
            number, sequence,
        ]
        .into_iter()
        .map(|l| (l.kind, Arc::new(l)))
        .collect();

        debug!("selected layout tables for runtime build {}", build);
        Ok(Self { build, layouts })
    }

    pub fn build(&self) -> RuntimeBuild {
        self.build
    }

    pub fn get(&self, kind: LayoutKind) -> Result<Arc<Layout>, LayoutError> {
        self.layouts
            .get(&kind)
            .cloned()
            .ok_or(LayoutError::Missing(kind))
    }

    pub fn layouts(&self) -> impl Iterator<Item = &Arc<Layout>> {
        self.layouts.values()
    }

    /// Compare every category's declared sizes with what the runtime reports.
    pub fn validate(&self, bridge: &dyn RuntimeBridge) -> Result<(), LayoutError> {
        for layout in self.layouts.values() {
            let Some((basic, item)) = bridge.reported_sizes(layout.kind) else {
                continue;
            };
            if basic != layout.basic_size {
                return Err(LayoutError::AbiMismatch {
                    layout: layout.name().to_string(),
                    what: "basic size",
                    declared: layout.basic_size,
                    actual: basic,
                });
            }
            if item != layout.item_size {
                return Err(LayoutError::AbiMismatch {
                    layout: layout.name().to_string(),
                    what: "item size",
                    declared: layout.item_size,
                    actual: item,
                });
            }
        }
        debug!("layout tables match runtime build {}", self.build);
        Ok(())
    }
}
