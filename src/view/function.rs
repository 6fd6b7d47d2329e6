use super::{BaseView, InspectView};
use crate::{
    error::Result,
    runtime::{self, ObjRef},
};

#[derive(Debug)]
pub struct FunctionView(BaseView);

impl FunctionView {
    pub(crate) fn new(base: BaseView) -> Self {
        Self(base)
    }

    pub fn name(&self) -> Result<Option<String>> {
        self.0.get_str("fn_name")
    }

    pub fn call(&self, args: &[ObjRef]) -> Result<ObjRef> {
        Ok(runtime::call(&self.0.object()?, args)?)
    }
}

impl InspectView for FunctionView {
    fn as_base(&self) -> &BaseView {
        &self.0
    }
}
