//! Insertion-ordered hash table objects.
//!
//! A dict header points at a separately allocated keys block holding the
//! entries in insertion order. Deleting an entry clears its key and value in
//! place; the block is compacted when it is replaced by a larger one.

use super::{
    abstract_ops, alloc,
    object::{decref, free_object, ObjRef, RawObject},
    objects::{self, alloc_fixed, has_flag},
    raise,
    types::{builtin_type_ptr, flags, BuiltinType},
    RuntimeError,
};
use std::{
    mem::{offset_of, size_of},
    ptr,
};

/// Entry capacity of the first keys block.
const MIN_ENTRIES: usize = 8;

#[repr(C)]
pub struct RawDict {
    pub ob_base: RawObject,
    /// Live entries.
    pub ma_used: isize,
    /// Bumped on every mutation.
    pub ma_version_tag: u64,
    /// NULL until the first insertion.
    pub ma_keys: *mut RawDictKeys,
}

#[repr(C)]
pub struct RawDictKeys {
    /// Entry capacity.
    pub dk_size: isize,
    /// Entries in use, deleted ones included.
    pub dk_nentries: isize,
    pub dk_entries: [DictEntry; 0],
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct DictEntry {
    pub me_hash: isize,
    /// NULL for a deleted entry.
    pub me_key: *mut RawObject,
    pub me_value: *mut RawObject,
}

fn expect_dict(obj: &ObjRef) -> Result<*mut RawDict, RuntimeError> {
    if has_flag(obj, flags::DICT_SUBCLASS) {
        Ok(obj.as_ptr().cast())
    } else {
        Err(RuntimeError::Type(format!("expected dict, got '{}'", obj.type_name())))
    }
}

unsafe fn entries(keys: *mut RawDictKeys) -> *mut DictEntry {
    unsafe { ptr::addr_of_mut!((*keys).dk_entries).cast() }
}

unsafe fn used_entries<'a>(keys: *mut RawDictKeys) -> &'a mut [DictEntry] {
    match unsafe { keys.as_ref() } {
        Some(k) => unsafe { std::slice::from_raw_parts_mut(entries(keys), k.dk_nentries.max(0) as usize) },
        None => &mut [],
    }
}

fn alloc_keys(capacity: usize) -> Result<*mut RawDictKeys, RuntimeError> {
    let size = offset_of!(RawDictKeys, dk_entries) + capacity * size_of::<DictEntry>();
    let keys = alloc::allocate(size, false)?.as_ptr().cast::<RawDictKeys>();
    unsafe { (*keys).dk_size = capacity as isize };
    Ok(keys)
}

/// Equality used for key lookup: identity, then numeric and byte-string
/// value comparison.
pub fn keys_equal(a: &ObjRef, b: &ObjRef) -> bool {
    if a.is(b) {
        return true;
    }
    let numeric = |o: &ObjRef| has_flag(o, flags::INT_SUBCLASS) || has_flag(o, flags::FLOAT_SUBCLASS);
    if has_flag(a, flags::INT_SUBCLASS) && has_flag(b, flags::INT_SUBCLASS) {
        return objects::int_value(a).ok() == objects::int_value(b).ok();
    }
    if numeric(a) && numeric(b) {
        return objects::float_value(a).ok() == objects::float_value(b).ok();
    }
    if has_flag(a, flags::BYTES_SUBCLASS) && has_flag(b, flags::BYTES_SUBCLASS) {
        return objects::bytes_value(a).ok() == objects::bytes_value(b).ok();
    }
    false
}

/// Index of the entry holding `key`.
unsafe fn find(raw: *mut RawDict, key: &ObjRef, hash: isize) -> Option<usize> {
    let slots = unsafe { used_entries((*raw).ma_keys) };
    slots.iter().position(|e| {
        e.me_hash == hash
            && unsafe { ObjRef::from_borrowed(e.me_key) }.is_some_and(|k| keys_equal(&k, key))
    })
}

/// Make room for one more entry, compacting into a new block when full.
unsafe fn reserve(raw: *mut RawDict) -> Result<(), RuntimeError> {
    let old = unsafe { (*raw).ma_keys };
    if let Some(k) = unsafe { old.as_ref() } {
        if k.dk_nentries < k.dk_size {
            return Ok(());
        }
    }
    let used = unsafe { (*raw).ma_used }.max(0) as usize;
    let keys = alloc_keys((used * 2).max(MIN_ENTRIES))?;
    let mut n = 0;
    for entry in unsafe { used_entries(old) }.iter().filter(|e| !e.me_key.is_null()) {
        unsafe { *entries(keys).add(n) = *entry };
        n += 1;
    }
    unsafe {
        (*keys).dk_nentries = n as isize;
        (*raw).ma_keys = keys;
        if !old.is_null() {
            alloc::release(old.cast());
        }
    }
    Ok(())
}

pub fn dict(pairs: &[(ObjRef, ObjRef)]) -> Result<ObjRef, RuntimeError> {
    let op = unsafe { alloc_fixed(builtin_type_ptr(BuiltinType::Dict))? };
    let d = unsafe { ObjRef::from_owned(op) }
        .ok_or_else(|| RuntimeError::System("allocation returned NULL".into()))?;
    for (key, value) in pairs {
        dict_set(&d, key, value)?;
    }
    Ok(d)
}

pub fn dict_get(d: &ObjRef, key: &ObjRef) -> Result<Option<ObjRef>, RuntimeError> {
    let raw = expect_dict(d)?;
    let hash = abstract_ops::hash(key)?;
    Ok(unsafe { find(raw, key, hash) }.and_then(|i| {
        let entry = unsafe { used_entries((*raw).ma_keys)[i] };
        unsafe { ObjRef::from_borrowed(entry.me_value) }
    }))
}

/// Insert or replace. The dict takes its own references to both objects.
pub fn dict_set(d: &ObjRef, key: &ObjRef, value: &ObjRef) -> Result<(), RuntimeError> {
    let raw = expect_dict(d)?;
    let hash = abstract_ops::hash(key)?;
    unsafe {
        if let Some(i) = find(raw, key, hash) {
            let entry = &mut used_entries((*raw).ma_keys)[i];
            let old = std::mem::replace(&mut entry.me_value, value.clone().into_raw());
            decref(old);
        } else {
            reserve(raw)?;
            let keys = (*raw).ma_keys;
            let at = (*keys).dk_nentries as usize;
            *entries(keys).add(at) = DictEntry {
                me_hash: hash,
                me_key: key.clone().into_raw(),
                me_value: value.clone().into_raw(),
            };
            (*keys).dk_nentries += 1;
            (*raw).ma_used += 1;
        }
        (*raw).ma_version_tag += 1;
    }
    Ok(())
}

pub fn dict_del(d: &ObjRef, key: &ObjRef) -> Result<(), RuntimeError> {
    let raw = expect_dict(d)?;
    let hash = abstract_ops::hash(key)?;
    let Some(i) = (unsafe { find(raw, key, hash) }) else {
        return Err(RuntimeError::Key(abstract_ops::repr(key)?));
    };
    unsafe {
        let entry = &mut used_entries((*raw).ma_keys)[i];
        let old_key = std::mem::replace(&mut entry.me_key, ptr::null_mut());
        let old_value = std::mem::replace(&mut entry.me_value, ptr::null_mut());
        (*raw).ma_used -= 1;
        (*raw).ma_version_tag += 1;
        decref(old_key);
        decref(old_value);
    }
    Ok(())
}

/// Live `(key, value)` pairs in insertion order.
pub fn dict_items(d: &ObjRef) -> Result<Vec<(ObjRef, ObjRef)>, RuntimeError> {
    let raw = expect_dict(d)?;
    let slots = unsafe { used_entries((*raw).ma_keys) };
    Ok(slots
        .iter()
        .filter_map(|e| unsafe { Some((ObjRef::from_borrowed(e.me_key)?, ObjRef::from_borrowed(e.me_value)?)) })
        .collect())
}

pub(crate) unsafe extern "C" fn dict_length(op: *mut RawObject) -> isize {
    unsafe { (*op.cast::<RawDict>()).ma_used }
}

pub(crate) unsafe extern "C" fn dict_repr(op: *mut RawObject) -> *mut RawObject {
    let Some(obj) = (unsafe { ObjRef::from_borrowed(op) }) else {
        return raise(RuntimeError::System("slot called with NULL object".into()));
    };
    let result = dict_items(&obj).and_then(|items| {
        let parts = items
            .iter()
            .map(|(k, v)| Ok(format!("{}: {}", abstract_ops::repr(k)?, abstract_ops::repr(v)?)))
            .collect::<Result<Vec<_>, RuntimeError>>()?;
        objects::bytes(format!("{{{}}}", parts.join(", ")).as_bytes())
    });
    match result {
        Ok(text) => text.into_raw(),
        Err(e) => raise(e),
    }
}

pub(crate) unsafe extern "C" fn dict_dealloc(op: *mut RawObject) {
    let raw = op.cast::<RawDict>();
    unsafe {
        let keys = std::mem::replace(&mut (*raw).ma_keys, ptr::null_mut());
        for entry in used_entries(keys).iter() {
            decref(entry.me_key);
            decref(entry.me_value);
        }
        if !keys.is_null() {
            alloc::release(keys.cast());
        }
        free_object(op);
    }
}
