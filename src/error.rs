use crate::{layout::LayoutKind, runtime::RuntimeError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("layout '{layout}' has no field '{field}'")]
    UnknownField { layout: String, field: String },
    #[error("field '{field}' of '{layout}' holds {expected}, cannot store {got}")]
    KindMismatch {
        layout: String,
        field: String,
        expected: String,
        got: String,
    },
    #[error("field '{field}' of '{layout}' is not an element array")]
    NotIndexable { layout: String, field: String },
    #[error("no layout table for runtime build {major}.{minor}")]
    UnsupportedBuild { major: u16, minor: u16 },
    #[error("invalid runtime build identifier '{0}'")]
    InvalidBuild(String),
    #[error("layout tables assume {expected}-byte pointers, this target has {actual}")]
    PointerWidth { expected: usize, actual: usize },
    #[error("unknown object category '{0}'")]
    UnknownKind(String),
    #[error("no layout registered for {0}")]
    Missing(LayoutKind),
    #[error("layout '{layout}' declares {what} = {declared}, runtime reports {actual}")]
    AbiMismatch {
        layout: String,
        what: &'static str,
        declared: usize,
        actual: usize,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnsafeOperationError {
    #[error(
        "resize to {requested} requires {required} bytes but only {allocated} are allocated \
         (use an unsafe scope to override)"
    )]
    Resize {
        requested: usize,
        required: usize,
        allocated: usize,
    },
    #[error(
        "write of {size} bytes at offset {offset} exceeds the {allocated} byte allocation \
         (use an unsafe scope to override)"
    )]
    OutOfBounds {
        offset: usize,
        size: usize,
        allocated: usize,
    },
    #[error("field '{0}' can only be written inside an unsafe scope")]
    GuardedField(String),
    #[error(
        "move of {copy_length} bytes at offset {offset} requires {required} bytes but destination \
         has {allocated} (use an unsafe scope to override)"
    )]
    Move {
        offset: usize,
        copy_length: usize,
        required: usize,
        allocated: usize,
    },
    #[error(
        "move between GC-tracked and untracked memory (source tracked: {source_tracked}, \
         destination tracked: {dest_tracked})"
    )]
    GcMismatch {
        source_tracked: bool,
        dest_tracked: bool,
    },
    #[error(
        "reinterpreting as '{layout}' requires {required} bytes but only {allocated} are allocated"
    )]
    Reinterpret {
        layout: String,
        required: usize,
        allocated: usize,
    },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BridgeError {
    #[error("failed to load runtime library: {0}")]
    Library(String),
    #[error("runtime library does not export '{0}'")]
    MissingSymbol(String),
    #[error("object at {0:#x} is not a type descriptor")]
    NotAType(usize),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PatchError {
    #[error("'{0}' is not a type")]
    NotAType(String),
    #[error("'{0}' is not an operator slot")]
    UnknownSlot(String),
    #[error("'{slot}' has no slot table on type '{owner}'")]
    MissingSlotTable { owner: String, slot: String },
    #[error("type '{owner}' has no recorded original for '{name}'")]
    NoOriginal { owner: String, name: String },
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Every failure an inspection operation can report.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InspectError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error("index {index} out of range for length {len}")]
    Index { index: isize, len: usize },
    #[error(transparent)]
    Unsafe(#[from] UnsafeOperationError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Patch(#[from] PatchError),
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error("{operation} is not supported for {kind} views")]
    Unsupported { operation: &'static str, kind: LayoutKind },
}

pub type Result<T, E = InspectError> = std::result::Result<T, E>;
