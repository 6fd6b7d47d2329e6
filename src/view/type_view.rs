use super::{BaseView, InspectView};
use crate::{
    error::Result,
    patch::{MutableScope, OriginalProxy, PatchKind, SlotNames},
    runtime::{self, flags, ObjRef, RuntimeError},
};

/// View of a type object, with attribute patching on top of the raw fields.
#[derive(Debug)]
pub struct TypeView(BaseView);

impl TypeView {
    pub(crate) fn new(base: BaseView) -> Self {
        Self(base)
    }

    pub fn name(&self) -> Result<String> {
        Ok(self.0.get_str("tp_name")?.unwrap_or_default())
    }

    pub fn flags(&self) -> Result<u64> {
        Ok(self.0.get("tp_flags")?.as_usize().unwrap_or(0) as u64)
    }

    pub fn is_immutable(&self) -> Result<bool> {
        Ok(self.flags()? & flags::IMMUTABLETYPE != 0)
    }

    pub fn basic_size(&self) -> Result<usize> {
        Ok(self.0.get("tp_basicsize")?.as_usize().unwrap_or(0))
    }

    pub fn item_size(&self) -> Result<usize> {
        Ok(self.0.get("tp_itemsize")?.as_usize().unwrap_or(0))
    }

    /// The type this one derives from, `None` at the root.
    pub fn base_type(&self) -> Result<Option<ObjRef>> {
        let ptr = self.0.get("tp_base")?.as_object().unwrap_or(std::ptr::null_mut());
        Ok(unsafe { ObjRef::from_borrowed(ptr) })
    }

    /// Writable for as long as the returned scope lives, even if the type is
    /// flagged immutable.
    pub fn as_mutable(&self) -> Result<MutableScope<'_>> {
        let ty = self.0.object()?;
        Ok(MutableScope::enter(self.0.inspector().bridge(), &ty)?)
    }

    /// Attribute lookup through the type's bases, with descriptors bound to
    /// the type.
    pub fn attr(&self, name: &str) -> Result<ObjRef> {
        Ok(runtime::getattr(&self.0.object()?, name)?)
    }

    /// Set a plain attribute, recording the previous value so it can be
    /// restored.
    pub fn set_attr(&self, name: &str, value: &ObjRef) -> Result<()> {
        self.patch(name, value, PatchKind::Attribute)
    }

    pub fn patch(&self, names: impl Into<SlotNames>, value: &ObjRef, kind: PatchKind) -> Result<()> {
        let ty = self.0.object()?;
        Ok(self.0.inspector().patcher().patch(&ty, names, value, kind)?)
    }

    /// Install `body` as a native method called `name`. Operator names also
    /// redirect the matching slot.
    pub fn implement<F>(&self, name: &str, body: F) -> Result<ObjRef>
    where
        F: Fn(&[ObjRef]) -> Result<ObjRef, RuntimeError> + 'static,
    {
        let func = runtime::function(name, body)?;
        self.patch(name, &func, PatchKind::Method)?;
        Ok(func)
    }

    pub fn restore(&self, name: &str) -> Result<()> {
        let ty = self.0.object()?;
        Ok(self.0.inspector().patcher().restore(&ty, name)?)
    }

    /// Attribute access on this type as it was before any patch.
    pub fn original(&self) -> Result<OriginalProxy<'_>> {
        let ty = self.0.object()?;
        let originals = self.0.inspector().originals();
        Ok(OriginalProxy::new(ty, originals))
    }

    /// Names patched on this type so far, sorted.
    pub fn patched(&self) -> Result<Vec<String>> {
        Ok(self.0.inspector().originals().names(&self.0.object()?))
    }
}

impl InspectView for TypeView {
    fn as_base(&self) -> &BaseView {
        &self.0
    }
}
