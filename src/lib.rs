//! Typed, mutable views over the memory of live objects in a refcounted
//! runtime.
//!
//! An [`Inspector`] pairs a [`RuntimeBridge`](bridge::RuntimeBridge) with the
//! layout tables for the runtime's build. From it:
//!
//! - [`Inspector::view`] returns the most specific [`View`] for an object,
//!   giving field reads and writes, resizes and element access checked
//!   against the object's allocation
//! - [`moves::move_view`] copies one object's memory over another's
//! - [`Inspector::patcher`] installs new attributes and operator slots on
//!   existing types while keeping the originals reachable
//!
//! Checks can be bypassed per view with [`BaseView::unsafe_scope`] or for
//! several views at once with [`unsafe_all`].
//!
//! ```ignore
//! let inspector = Inspector::host()?;
//! let t = runtime::tuple(&[runtime::int(1)?, runtime::int(2)?])?;
//! let view = inspector.view(&t)?;
//! view.resize(3)?;
//! println!("{}", view.info()?);
//! ```

pub mod bridge;
pub mod error;
pub mod inspector;
pub mod layout;
pub mod moves;
pub mod overlay;
pub mod patch;
pub mod runtime;
pub mod view;

#[cfg(test)]
mod bridge_tests;
#[cfg(test)]
mod overlay_tests;

pub use error::{InspectError, PatchError, Result, UnsafeOperationError};
pub use inspector::{Inspector, InspectorConfig};
pub use patch::{OriginalProxy, PatchKind};
pub use view::{
    unsafe_all, BaseView, BytesView, DictView, FloatView, FunctionView, InspectView, IntView,
    ListView, ObjectView, SequenceView, TupleView, TypeView, View,
};
