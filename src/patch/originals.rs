use crate::{
    error::{PatchError, Result},
    runtime::{self, type_lookup, type_name, ObjRef, RuntimeError},
};
use parking_lot::Mutex;
use std::collections::HashMap;

/// What a type held under one name before it was first patched.
#[derive(Clone, Debug)]
pub struct Original {
    /// Resolved value, `None` when the name did not resolve at all.
    pub value: Option<ObjRef>,
    /// Whether the value was defined on the type itself rather than a base.
    pub own: bool,
    /// Slot function pointer at the time, for operator slots.
    pub slot: Option<usize>,
}

struct Entry {
    // pins the type so its address cannot be reused
    _owner: ObjRef,
    original: Original,
}

/// Pre-patch values keyed by (type, name). Entries are added once and never
/// removed.
#[derive(Default)]
pub struct OriginalTable {
    entries: Mutex<HashMap<(usize, String), Entry>>,
}

impl OriginalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `original` unless an entry already exists. Returns whether it
    /// was stored.
    pub fn record(&self, ty: &ObjRef, name: &str, original: Original) -> bool {
        let mut entries = self.entries.lock();
        let key = (ty.address(), name.to_string());
        if entries.contains_key(&key) {
            return false;
        }
        entries.insert(
            key,
            Entry {
                _owner: ty.clone(),
                original,
            },
        );
        true
    }

    pub fn contains(&self, ty: &ObjRef, name: &str) -> bool {
        self.entries
            .lock()
            .contains_key(&(ty.address(), name.to_string()))
    }

    pub fn get(&self, ty: &ObjRef, name: &str) -> Option<Original> {
        self.entries
            .lock()
            .get(&(ty.address(), name.to_string()))
            .map(|e| e.original.clone())
    }

    /// Names recorded for `ty`, sorted.
    pub fn names(&self, ty: &ObjRef) -> Vec<String> {
        let mut names: Vec<_> = self
            .entries
            .lock()
            .keys()
            .filter(|(addr, _)| *addr == ty.address())
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Attribute access on a type as it was before any patch.
pub struct OriginalProxy<'a> {
    ty: ObjRef,
    table: &'a OriginalTable,
}

impl<'a> OriginalProxy<'a> {
    pub fn new(ty: ObjRef, table: &'a OriginalTable) -> Self {
        Self { ty, table }
    }

    pub fn owner(&self) -> &ObjRef {
        &self.ty
    }

    fn raw(&self, name: &str) -> Result<ObjRef> {
        let found = match self.table.get(&self.ty, name) {
            Some(original) => original.value,
            None => type_lookup(&self.ty, name),
        };
        found.ok_or_else(|| {
            RuntimeError::Attribute {
                owner: type_name(&self.ty),
                name: name.to_string(),
            }
            .into()
        })
    }

    /// The original attribute as seen through the type.
    pub fn attr(&self, name: &str) -> Result<ObjRef> {
        let raw = self.raw(name)?;
        Ok(runtime::descr_get(&raw, None, &self.ty)?)
    }

    /// The original attribute as seen through `instance`.
    pub fn bind(&self, name: &str, instance: &ObjRef) -> Result<ObjRef> {
        let raw = self.raw(name)?;
        Ok(runtime::descr_get(&raw, Some(instance), &self.ty)?)
    }

    pub fn call(&self, name: &str, instance: &ObjRef, args: &[ObjRef]) -> Result<ObjRef> {
        let bound = self.bind(name, instance)?;
        Ok(runtime::call(&bound, args)?)
    }

    /// The recorded entry, failing when `name` was never patched.
    pub fn recorded(&self, name: &str) -> Result<Original> {
        self.table.get(&self.ty, name).ok_or_else(|| {
            PatchError::NoOriginal {
                owner: type_name(&self.ty),
                name: name.to_string(),
            }
            .into()
        })
    }
}
