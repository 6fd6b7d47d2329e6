use super::{BaseView, InspectView};
use crate::{error::Result, overlay::Value};
use std::ptr;

#[derive(Debug)]
pub struct BytesView(BaseView);

impl BytesView {
    pub(crate) fn new(base: BaseView) -> Self {
        Self(base)
    }

    pub fn as_bytes(&self) -> Result<Vec<u8>> {
        match self.0.get("ob_sval")? {
            Value::Bytes(b) => Ok(b),
            _ => Ok(Vec::new()),
        }
    }

    /// Replace the contents, resizing the object to `data.len()`.
    pub fn set_bytes(&self, data: &[u8]) -> Result<()> {
        self.resize(data.len())?;
        self.0.set("ob_sval", data)?;
        self.invalidate_hash()
    }

    /// Forget the cached hash so it is recomputed from the new contents.
    pub(crate) fn invalidate_hash(&self) -> Result<()> {
        Ok(self.0.overlay().write("ob_shash", &Value::Int(-1))?)
    }
}

impl InspectView for BytesView {
    fn as_base(&self) -> &BaseView {
        &self.0
    }

    /// Also keeps the contents NUL-terminated.
    fn resize(&self, new_len: usize) -> Result<()> {
        self.0.admit_resize(new_len)?;
        self.0.apply_resize(new_len)?;
        let end = self.0.overlay().element_addr_unchecked(new_len as isize)?;
        unsafe { ptr::write(end as *mut u8, 0) };
        self.invalidate_hash()
    }
}
