use std::cell::Cell;
use tracing::debug;

/// Checked/unsafe mode of one view.
///
/// The gate is checked while its depth is zero. [`SafetyGate::enter`] returns
/// a guard; dropping the guard leaves the scope, so the previous mode comes
/// back on every exit path. Scopes nest.
#[derive(Debug, Default)]
pub struct SafetyGate {
    depth: Cell<usize>,
}

impl SafetyGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_unsafe(&self) -> bool {
        self.depth.get() > 0
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    pub fn enter(&self) -> UnsafeScope<'_> {
        let depth = self.depth.get() + 1;
        self.depth.set(depth);
        debug!("entered unsafe scope (depth {})", depth);
        UnsafeScope { gate: self }
    }
}

/// Keeps a [`SafetyGate`] in unsafe mode while alive.
#[must_use = "the gate returns to checked mode as soon as the scope is dropped"]
pub struct UnsafeScope<'a> {
    gate: &'a SafetyGate,
}

impl Drop for UnsafeScope<'_> {
    fn drop(&mut self) {
        let depth = self.gate.depth.get().saturating_sub(1);
        self.gate.depth.set(depth);
        debug!("left unsafe scope (depth {})", depth);
    }
}

/// Unsafe scopes on several gates at once, released together.
#[must_use = "the gates return to checked mode as soon as the scope is dropped"]
pub struct UnsafeScopes<'a> {
    _scopes: Vec<UnsafeScope<'a>>,
}

impl<'a> UnsafeScopes<'a> {
    pub fn enter<I>(gates: I) -> Self
    where
        I: IntoIterator<Item = &'a SafetyGate>,
    {
        Self {
            _scopes: gates.into_iter().map(SafetyGate::enter).collect(),
        }
    }
}
