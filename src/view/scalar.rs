use super::{BaseView, InspectView};
use crate::error::Result;

#[derive(Debug)]
pub struct IntView(BaseView);

impl IntView {
    pub(crate) fn new(base: BaseView) -> Self {
        Self(base)
    }

    pub fn value(&self) -> Result<i64> {
        Ok(self.0.get("ob_ival")?.as_int().unwrap_or(0))
    }

    /// Overwrite the stored value in place. Every reference to this object
    /// sees the change.
    pub fn set_value(&self, value: i64) -> Result<()> {
        self.0.set("ob_ival", value)
    }
}

impl InspectView for IntView {
    fn as_base(&self) -> &BaseView {
        &self.0
    }
}

#[derive(Debug)]
pub struct FloatView(BaseView);

impl FloatView {
    pub(crate) fn new(base: BaseView) -> Self {
        Self(base)
    }

    pub fn value(&self) -> Result<f64> {
        match self.0.get("ob_fval")? {
            crate::overlay::Value::Float(v) => Ok(v),
            _ => Ok(0.0),
        }
    }

    pub fn set_value(&self, value: f64) -> Result<()> {
        self.0.set("ob_fval", value)
    }
}

impl InspectView for FloatView {
    fn as_base(&self) -> &BaseView {
        &self.0
    }
}
