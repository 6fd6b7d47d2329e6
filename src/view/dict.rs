use super::{BaseView, InspectView};
use crate::{
    error::Result,
    runtime::{self, ObjRef},
};

/// Dicts keep their entries in a separate keys block. Entry access goes
/// through the runtime's own lookup; the header fields are guarded.
#[derive(Debug)]
pub struct DictView(BaseView);

impl DictView {
    pub(crate) fn new(base: BaseView) -> Self {
        Self(base)
    }

    /// Live entry count.
    pub fn used(&self) -> Result<isize> {
        Ok(self.0.get("ma_used")?.as_int().unwrap_or(0) as isize)
    }

    pub fn set_used(&self, used: isize) -> Result<()> {
        self.0.set("ma_used", used as i64)
    }

    pub fn version_tag(&self) -> Result<u64> {
        Ok(self.0.get("ma_version_tag")?.as_usize().unwrap_or(0) as u64)
    }

    pub fn set_version_tag(&self, tag: u64) -> Result<()> {
        self.0.set("ma_version_tag", tag)
    }

    /// Address of the keys block, 0 before the first insertion.
    pub fn keys_table(&self) -> Result<usize> {
        Ok(self.0.get("ma_keys")?.as_usize().unwrap_or(0))
    }

    pub fn get_item(&self, key: &ObjRef) -> Result<Option<ObjRef>> {
        Ok(runtime::dict_get(&self.0.object()?, key)?)
    }

    pub fn set_item(&self, key: &ObjRef, value: &ObjRef) -> Result<()> {
        Ok(runtime::dict_set(&self.0.object()?, key, value)?)
    }

    pub fn del_item(&self, key: &ObjRef) -> Result<()> {
        Ok(runtime::dict_del(&self.0.object()?, key)?)
    }

    pub fn keys(&self) -> Result<Vec<ObjRef>> {
        Ok(self.items()?.into_iter().map(|(k, _)| k).collect())
    }

    pub fn values(&self) -> Result<Vec<ObjRef>> {
        Ok(self.items()?.into_iter().map(|(_, v)| v).collect())
    }

    /// `(key, value)` pairs in insertion order.
    pub fn items(&self) -> Result<Vec<(ObjRef, ObjRef)>> {
        Ok(runtime::dict_items(&self.0.object()?)?)
    }
}

impl InspectView for DictView {
    fn as_base(&self) -> &BaseView {
        &self.0
    }
}
