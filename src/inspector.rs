//! The owning context every view and patch goes through.
//!
//! ## Environment Variables
//!
//! [`InspectorConfig::from_env`] reads:
//!
//! - `HEAPVIEW_RUNTIME_BUILD`: build identifier used to pick the layout
//!   tables instead of asking the runtime (`"1.0"`, `"1.1"`)
//! - `HEAPVIEW_VALIDATE_LAYOUTS`: `"0"` or `"false"` skips the start-up
//!   comparison of layout tables with the runtime's type descriptors
//! - `HEAPVIEW_HOLD_REFS`: `"0"` or `"false"` makes views built from an
//!   object not keep that object alive
//!
//! ```bash
//! HEAPVIEW_RUNTIME_BUILD=1.0 HEAPVIEW_VALIDATE_LAYOUTS=0 cargo test
//! ```

use crate::{
    bridge::{HostBridge, RuntimeBridge},
    error::{LayoutError, Result},
    layout::{Layout, LayoutKind, LayoutRegistry, RuntimeBuild},
    patch::{OriginalTable, PatchEngine},
    runtime::ObjRef,
    view::{factory, View},
};
use std::{env, fmt, sync::Arc};
use tracing::{debug, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InspectorConfig {
    /// Layout tables to use; `None` asks the bridge.
    pub build: Option<RuntimeBuild>,
    pub validate_layouts: bool,
    /// Views built from an object hold a strong reference to it.
    pub hold_references: bool,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            build: None,
            validate_layouts: true,
            hold_references: true,
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| !(v == "0" || v.eq_ignore_ascii_case("false")))
        .unwrap_or(default)
}

impl InspectorConfig {
    pub fn from_env() -> Self {
        let build = env::var("HEAPVIEW_RUNTIME_BUILD")
            .ok()
            .filter(|v| !v.is_empty())
            .and_then(|v| match v.parse() {
                Ok(build) => Some(build),
                Err(e) => {
                    warn!("ignoring HEAPVIEW_RUNTIME_BUILD: {}", e);
                    None
                }
            });
        Self {
            build,
            validate_layouts: env_flag("HEAPVIEW_VALIDATE_LAYOUTS", true),
            hold_references: env_flag("HEAPVIEW_HOLD_REFS", true),
        }
    }
}

struct Shared {
    bridge: Arc<dyn RuntimeBridge>,
    layouts: LayoutRegistry,
    originals: OriginalTable,
    config: InspectorConfig,
}

/// Cheap to clone; every clone shares the same layout tables and original
/// attribute table.
#[derive(Clone)]
pub struct Inspector {
    shared: Arc<Shared>,
}

impl fmt::Debug for Inspector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Inspector")
            .field("build", &self.shared.layouts.build())
            .field("config", &self.shared.config)
            .finish()
    }
}

impl Inspector {
    pub fn new(bridge: Arc<dyn RuntimeBridge>, config: InspectorConfig) -> Result<Self, LayoutError> {
        let build = config.build.unwrap_or_else(|| bridge.build());
        let layouts = LayoutRegistry::for_build(build)?;
        if config.validate_layouts {
            layouts.validate(bridge.as_ref())?;
        }
        debug!("inspector ready for runtime build {}", build);
        Ok(Self {
            shared: Arc::new(Shared {
                bridge,
                layouts,
                originals: OriginalTable::new(),
                config,
            }),
        })
    }

    /// Inspector over the in-process runtime, configured from the
    /// environment.
    pub fn host() -> Result<Self, LayoutError> {
        Self::new(Arc::new(HostBridge), InspectorConfig::from_env())
    }

    pub fn bridge(&self) -> &dyn RuntimeBridge {
        self.shared.bridge.as_ref()
    }

    pub fn layouts(&self) -> &LayoutRegistry {
        &self.shared.layouts
    }

    pub fn layout(&self, kind: LayoutKind) -> Result<Arc<Layout>, LayoutError> {
        self.shared.layouts.get(kind)
    }

    pub fn originals(&self) -> &OriginalTable {
        &self.shared.originals
    }

    pub fn config(&self) -> &InspectorConfig {
        &self.shared.config
    }

    /// The most specific view for `obj`.
    pub fn view(&self, obj: &ObjRef) -> Result<View> {
        factory::view_of(self, obj)
    }

    /// View `obj` through the layout of `kind`, whatever its actual type.
    pub fn view_as(&self, obj: &ObjRef, kind: LayoutKind) -> Result<View> {
        factory::view_with(self, obj.address(), kind, Some(obj.clone()))
    }

    /// View whatever object lives at `addr`. The view holds no reference.
    ///
    /// # Safety
    /// `addr` must be a live object for as long as the view is used.
    pub unsafe fn view_addr(&self, addr: usize) -> Result<View> {
        unsafe { factory::view_of_addr(self, addr) }
    }

    pub fn patcher(&self) -> PatchEngine<'_> {
        PatchEngine::new(
            self.shared.bridge.as_ref(),
            &self.shared.layouts,
            &self.shared.originals,
        )
    }
}
