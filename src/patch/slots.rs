//! Special attribute names the runtime dispatches through function-pointer
//! slots rather than attribute lookup.

use crate::{
    layout::LayoutKind,
    runtime::{
        slots::*,
        types::{BinaryFunc, HashFunc, InquiryFunc, LenFunc, SizeArgFunc, UnaryFunc},
    },
};

/// A forwarding stub with the signature of the slot it is installed into.
#[derive(Clone, Copy, Debug)]
pub enum Trampoline {
    Unary(UnaryFunc),
    Binary(BinaryFunc),
    Inquiry(InquiryFunc),
    Len(LenFunc),
    SizeArg(SizeArgFunc),
    Hash(HashFunc),
}

impl Trampoline {
    pub fn address(&self) -> usize {
        match *self {
            Trampoline::Unary(f) => f as usize,
            Trampoline::Binary(f) => f as usize,
            Trampoline::Inquiry(f) => f as usize,
            Trampoline::Len(f) => f as usize,
            Trampoline::SizeArg(f) => f as usize,
            Trampoline::Hash(f) => f as usize,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct OperatorSlot {
    pub name: &'static str,
    /// Type field pointing at the sub-table holding the slot, if any.
    pub table: Option<(&'static str, LayoutKind)>,
    /// Slot field, in the sub-table or in the type itself.
    pub field: &'static str,
    pub trampoline: Trampoline,
}

const NUMBER: Option<(&str, LayoutKind)> = Some(("tp_as_number", LayoutKind::NumberMethods));
const SEQUENCE: Option<(&str, LayoutKind)> = Some(("tp_as_sequence", LayoutKind::SequenceMethods));

pub const OPERATOR_SLOTS: &[OperatorSlot] = &[
    OperatorSlot {
        name: "__add__",
        table: NUMBER,
        field: "nb_add",
        trampoline: Trampoline::Binary(slot_nb_add),
    },
    OperatorSlot {
        name: "__sub__",
        table: NUMBER,
        field: "nb_subtract",
        trampoline: Trampoline::Binary(slot_nb_subtract),
    },
    OperatorSlot {
        name: "__mul__",
        table: NUMBER,
        field: "nb_multiply",
        trampoline: Trampoline::Binary(slot_nb_multiply),
    },
    OperatorSlot {
        name: "__matmul__",
        table: NUMBER,
        field: "nb_matrix_multiply",
        trampoline: Trampoline::Binary(slot_nb_matrix_multiply),
    },
    OperatorSlot {
        name: "__neg__",
        table: NUMBER,
        field: "nb_negative",
        trampoline: Trampoline::Unary(slot_nb_negative),
    },
    OperatorSlot {
        name: "__bool__",
        table: NUMBER,
        field: "nb_bool",
        trampoline: Trampoline::Inquiry(slot_nb_bool),
    },
    OperatorSlot {
        name: "__len__",
        table: SEQUENCE,
        field: "sq_length",
        trampoline: Trampoline::Len(slot_sq_length),
    },
    OperatorSlot {
        name: "__getitem__",
        table: SEQUENCE,
        field: "sq_item",
        trampoline: Trampoline::SizeArg(slot_sq_item),
    },
    OperatorSlot {
        name: "__repr__",
        table: None,
        field: "tp_repr",
        trampoline: Trampoline::Unary(slot_tp_repr),
    },
    OperatorSlot {
        name: "__hash__",
        table: None,
        field: "tp_hash",
        trampoline: Trampoline::Hash(slot_tp_hash),
    },
];

pub fn operator_slot(name: &str) -> Option<&'static OperatorSlot> {
    OPERATOR_SLOTS.iter().find(|s| s.name == name)
}
