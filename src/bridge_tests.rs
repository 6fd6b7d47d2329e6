#[cfg(test)]
mod tests {
    use crate::{
        bridge::{CountingBridge, HostBridge, NativeBridge, RefCalls, RuntimeBridge},
        error::BridgeError,
        layout::LayoutKind,
        runtime::{self, int},
    };

    #[test]
    fn test_native_bridge_reports_missing_library() {
        let result = NativeBridge::open("libheapview-runtime-missing.so");
        assert!(matches!(result, Err(BridgeError::Library(_))));
    }

    #[test]
    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    fn test_native_bridge_requires_runtime_exports() {
        let result = NativeBridge::open("libc.so.6");
        assert!(matches!(
            result,
            Err(BridgeError::MissingSymbol(name)) if name == "heapview_build_version"
        ));
    }

    #[test]
    fn test_host_bridge_flags_only_types() {
        let n = int(1).unwrap();
        let err = unsafe { HostBridge.relax_immutability(n.address()) }.unwrap_err();
        assert_eq!(err, BridgeError::NotAType(n.address()));
    }

    #[test]
    fn test_host_bridge_reports_sizes() {
        assert_eq!(HostBridge.reported_sizes(LayoutKind::Int), Some((24, 0)));
        assert_eq!(HostBridge.reported_sizes(LayoutKind::Tuple), Some((24, 8)));
        assert_eq!(HostBridge.reported_sizes(LayoutKind::GcHead), None);
        let n = int(1).unwrap();
        assert_eq!(HostBridge.allocation_size(n.address()), 32);
        assert!(HostBridge.is_live(n.address()));
        assert!(!HostBridge.is_gc_tracked(n.address()));
        assert!(HostBridge.is_gc_tracked(runtime::tuple(&[]).unwrap().address()));
    }

    #[test]
    fn test_counting_bridge_records_per_address() {
        let bridge = CountingBridge::new(HostBridge);
        let n = int(1).unwrap();
        let rc = n.ref_count();
        unsafe {
            bridge.increment_refcount(n.address());
            bridge.increment_refcount(n.address());
            bridge.decrement_refcount(n.address());
        }
        assert_eq!(
            bridge.calls(n.address()),
            RefCalls {
                increments: 2,
                decrements: 1,
            }
        );
        assert_eq!(n.ref_count(), rc + 1);
        unsafe { bridge.decrement_refcount(n.address()) };

        bridge.reset();
        assert_eq!(bridge.calls(n.address()), RefCalls::default());
    }
}
