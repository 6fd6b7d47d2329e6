//! Installing new behaviour on existing type descriptors.
//!
//! A patch writes into the type's own attribute table. Names the runtime
//! dispatches through slot function pointers additionally get the slot
//! rewritten to a trampoline, otherwise operators would keep calling the old
//! native function. The first patch of every (type, name) pair snapshots what
//! was there before into an [`OriginalTable`].

mod originals;
mod slots;

pub use originals::{Original, OriginalProxy, OriginalTable};
pub use slots::{operator_slot, OperatorSlot, Trampoline, OPERATOR_SLOTS};

use crate::{
    bridge::RuntimeBridge,
    error::PatchError,
    layout::{LayoutKind, LayoutRegistry},
    overlay::{Overlay, Value},
    runtime::{self, is_type, type_del_attr, type_lookup, type_own_attr, type_set_attr, ObjRef, RuntimeError},
};
use std::{collections::HashSet, fmt};
use tracing::debug;

/// How a patched value is exposed on the type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PatchKind {
    /// Plain function, bound to the instance on access.
    Method,
    Static,
    Class,
    /// Read-only property; the value is the getter.
    Property,
    /// Stored as-is.
    Attribute,
    /// Like [`PatchKind::Method`], but every name must be an operator slot.
    OperatorSlot,
}

impl fmt::Display for PatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PatchKind::Method => "method",
            PatchKind::Static => "staticmethod",
            PatchKind::Class => "classmethod",
            PatchKind::Property => "property",
            PatchKind::Attribute => "attribute",
            PatchKind::OperatorSlot => "operator slot",
        })
    }
}

/// One or more attribute names receiving the same value. Duplicates are
/// dropped, first occurrence wins.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlotNames(Vec<String>);

impl SlotNames {
    fn collect<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !out.contains(&name) {
                out.push(name);
            }
        }
        Self(out)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SlotNames {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for SlotNames {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<&[&str]> for SlotNames {
    fn from(names: &[&str]) -> Self {
        Self::collect(names.iter().copied())
    }
}

impl<const N: usize> From<[&str; N]> for SlotNames {
    fn from(names: [&str; N]) -> Self {
        Self::collect(names)
    }
}

impl From<Vec<&str>> for SlotNames {
    fn from(names: Vec<&str>) -> Self {
        Self::collect(names)
    }
}

impl From<Vec<String>> for SlotNames {
    fn from(names: Vec<String>) -> Self {
        Self::collect(names)
    }
}

impl From<HashSet<&str>> for SlotNames {
    fn from(names: HashSet<&str>) -> Self {
        let mut names: Vec<_> = names.into_iter().collect();
        names.sort_unstable();
        Self::collect(names)
    }
}

impl From<HashSet<String>> for SlotNames {
    fn from(names: HashSet<String>) -> Self {
        let mut names: Vec<_> = names.into_iter().collect();
        names.sort_unstable();
        Self(names)
    }
}

/// Clears a type's immutability flag for as long as it is alive.
///
/// Dropping the scope sets the flag again if it was set on entry. A failure
/// to do so leaves a builtin type writable from ordinary code and panics.
#[must_use = "the type becomes immutable again as soon as the scope is dropped"]
pub struct MutableScope<'a> {
    bridge: &'a dyn RuntimeBridge,
    ty: ObjRef,
    was_immutable: bool,
}

impl<'a> MutableScope<'a> {
    pub fn enter(bridge: &'a dyn RuntimeBridge, ty: &ObjRef) -> Result<Self, PatchError> {
        let was_immutable = unsafe { bridge.relax_immutability(ty.address())? };
        if was_immutable {
            debug!("relaxed immutability of {}", runtime::type_name(ty));
        }
        Ok(Self {
            bridge,
            ty: ty.clone(),
            was_immutable,
        })
    }

    pub fn was_immutable(&self) -> bool {
        self.was_immutable
    }
}

impl Drop for MutableScope<'_> {
    fn drop(&mut self) {
        if !self.was_immutable {
            return;
        }
        if let Err(e) = unsafe { self.bridge.restore_immutability(self.ty.address()) } {
            panic!(
                "failed to restore immutability of type '{}': {}",
                runtime::type_name(&self.ty),
                e
            );
        }
    }
}

/// Applies and undoes patches. Obtained from
/// [`Inspector::patcher`](crate::Inspector::patcher).
pub struct PatchEngine<'a> {
    bridge: &'a dyn RuntimeBridge,
    layouts: &'a LayoutRegistry,
    originals: &'a OriginalTable,
}

impl<'a> PatchEngine<'a> {
    pub fn new(
        bridge: &'a dyn RuntimeBridge,
        layouts: &'a LayoutRegistry,
        originals: &'a OriginalTable,
    ) -> Self {
        Self {
            bridge,
            layouts,
            originals,
        }
    }

    fn check_type(ty: &ObjRef) -> Result<(), PatchError> {
        if is_type(ty) {
            Ok(())
        } else {
            Err(PatchError::NotAType(ty.type_name()))
        }
    }

    /// Overlay over whichever struct holds the function pointer of `slot`:
    /// the type itself or one of its sub-tables.
    fn slot_overlay(&self, ty: &ObjRef, slot: &OperatorSlot) -> Result<(Overlay, &'static str), PatchError> {
        let type_view = unsafe { Overlay::new(ty.address(), self.layouts.get(LayoutKind::Type)?) };
        let Some((table_field, table_kind)) = slot.table else {
            type_view.field(slot.field)?;
            return Ok((type_view, slot.field));
        };
        let table = type_view.read(table_field)?.as_usize().unwrap_or(0);
        if table == 0 {
            return Err(PatchError::MissingSlotTable {
                owner: runtime::type_name(ty),
                slot: slot.name.to_string(),
            });
        }
        let table_view = unsafe { Overlay::new(table, self.layouts.get(table_kind)?) };
        table_view.field(slot.field)?;
        Ok((table_view, slot.field))
    }

    fn wrap(value: &ObjRef, kind: PatchKind) -> Result<ObjRef, RuntimeError> {
        match kind {
            PatchKind::Method | PatchKind::Attribute | PatchKind::OperatorSlot => Ok(value.clone()),
            PatchKind::Static => runtime::staticmethod(value),
            PatchKind::Class => runtime::classmethod(value),
            PatchKind::Property => runtime::property(value),
        }
    }

    /// Install `value` under every name in `names`.
    ///
    /// Names and slot tables are resolved before anything is written, so a
    /// rejected patch leaves the type untouched.
    pub fn patch(
        &self,
        ty: &ObjRef,
        names: impl Into<SlotNames>,
        value: &ObjRef,
        kind: PatchKind,
    ) -> Result<(), PatchError> {
        Self::check_type(ty)?;
        let names = names.into();

        let mut targets = Vec::with_capacity(names.len());
        for name in names.iter() {
            let slot = operator_slot(name);
            if kind == PatchKind::OperatorSlot && slot.is_none() {
                return Err(PatchError::UnknownSlot(name.to_string()));
            }
            let overlay = slot.map(|s| self.slot_overlay(ty, s)).transpose()?;
            targets.push((name, slot, overlay));
        }

        let wrapped = Self::wrap(value, kind)?;
        let _scope = MutableScope::enter(self.bridge, ty)?;
        for (name, slot, overlay) in targets {
            if !self.originals.contains(ty, name) {
                let previous = match &overlay {
                    Some((overlay, field)) => Some(overlay.read(field)?.as_usize().unwrap_or(0)),
                    None => None,
                };
                self.originals.record(
                    ty,
                    name,
                    Original {
                        value: type_lookup(ty, name),
                        own: type_own_attr(ty, name).is_some(),
                        slot: previous,
                    },
                );
            }

            type_set_attr(ty, name, &wrapped)?;
            if let (Some(slot), Some((overlay, field))) = (slot, &overlay) {
                overlay.write(field, &Value::Ptr(slot.trampoline.address()))?;
            }
            debug!("patched {}.{} as {}", runtime::type_name(ty), name, kind);
        }
        Ok(())
    }

    /// Undo every patch of `name` on `ty`: reinstall the recorded value, or
    /// delete the override when the type had no value of its own, and put
    /// the recorded slot function back.
    pub fn restore(&self, ty: &ObjRef, name: &str) -> Result<(), PatchError> {
        Self::check_type(ty)?;
        let original = self.originals.get(ty, name).ok_or_else(|| PatchError::NoOriginal {
            owner: runtime::type_name(ty),
            name: name.to_string(),
        })?;
        let overlay = operator_slot(name)
            .filter(|_| original.slot.is_some())
            .map(|s| self.slot_overlay(ty, s))
            .transpose()?;

        let _scope = MutableScope::enter(self.bridge, ty)?;
        match (&original.value, original.own) {
            (Some(value), true) => type_set_attr(ty, name, value)?,
            _ => match type_del_attr(ty, name) {
                Ok(()) | Err(RuntimeError::Attribute { .. }) => {}
                Err(e) => return Err(e.into()),
            },
        }
        if let (Some((overlay, field)), Some(ptr)) = (overlay, original.slot) {
            overlay.write(field, &Value::Ptr(ptr))?;
        }
        debug!("restored {}.{}", runtime::type_name(ty), name);
        Ok(())
    }

    /// Attribute access on `ty` as it was before it was patched.
    pub fn original(&self, ty: &ObjRef) -> Result<OriginalProxy<'a>, PatchError> {
        Self::check_type(ty)?;
        Ok(OriginalProxy::new(ty.clone(), self.originals))
    }
}
