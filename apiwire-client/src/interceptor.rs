//! Ordered, ejectable interceptor registries.
//!
//! Each request flows through three hook chains: request hooks run before
//! the transport, response hooks run after it, and error hooks run on the
//! decoded error payload of a failed exchange. Hooks are stored in
//! registration order; ejecting one leaves a permanent empty slot so that
//! the identifiers of later hooks stay valid.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use serde_json::Value;

use crate::error::ClientError;
use crate::options::ResolvedOptions;
use crate::request::WireRequest;
use crate::response::{RawResponse, ResponseParts};

/// Boxed future used by hook and transport signatures.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Handle to a registered hook. Stable for the lifetime of the registry,
/// even across ejections of other hooks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InterceptorId(usize);

/// An ordered collection of hooks with stable identifiers.
///
/// Slots are never compacted: `eject` replaces the hook with an empty slot
/// and iteration skips it. A hook ejected while a request is in flight is
/// skipped by that request too if its turn has not come yet.
pub struct Registry<T> {
    slots: RwLock<Vec<Option<T>>>,
}

impl<T> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let slots = self.slots.read().expect("interceptor registry poisoned");
        let live = slots.iter().filter(|s| s.is_some()).count();
        f.debug_struct("Registry")
            .field("slots", &slots.len())
            .field("live", &live)
            .finish()
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Clone> Registry<T> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook at the end of the chain and return its handle.
    pub fn register(&self, hook: T) -> InterceptorId {
        let mut slots = self.slots.write().expect("interceptor registry poisoned");
        slots.push(Some(hook));
        InterceptorId(slots.len() - 1)
    }

    /// Remove the hook, leaving an empty slot that preserves the indices
    /// of all other hooks. Ejecting an unknown or already-ejected handle
    /// is a no-op.
    pub fn eject(&self, id: InterceptorId) {
        let mut slots = self.slots.write().expect("interceptor registry poisoned");
        if let Some(slot) = slots.get_mut(id.0) {
            *slot = None;
        }
    }

    /// Whether the handle refers to a currently-registered hook.
    pub fn exists(&self, id: InterceptorId) -> bool {
        let slots = self.slots.read().expect("interceptor registry poisoned");
        slots.get(id.0).map(|s| s.is_some()).unwrap_or(false)
    }

    /// Replace the hook behind an existing handle. Returns false when the
    /// handle is unknown or ejected.
    pub fn update(&self, id: InterceptorId, hook: T) -> bool {
        let mut slots = self.slots.write().expect("interceptor registry poisoned");
        match slots.get_mut(id.0) {
            Some(slot @ Some(_)) => {
                *slot = Some(hook);
                true
            }
            _ => false,
        }
    }

    /// Eject every hook. Slot count is preserved so outstanding handles
    /// simply report as ejected.
    pub fn clear(&self) {
        let mut slots = self.slots.write().expect("interceptor registry poisoned");
        for slot in slots.iter_mut() {
            *slot = None;
        }
    }

    /// Number of slots, including empty ones.
    pub(crate) fn len(&self) -> usize {
        self.slots.read().expect("interceptor registry poisoned").len()
    }

    /// Snapshot the hook at `index`, if the slot is occupied. Reading one
    /// slot at a time means an in-flight request observes ejections that
    /// happen between its hook invocations.
    pub(crate) fn get(&self, index: usize) -> Option<T> {
        let slots = self.slots.read().expect("interceptor registry poisoned");
        slots.get(index).and_then(|s| s.clone())
    }
}

/// Hook invoked with the fully-built request before the transport runs.
/// May rewrite the request or fail the call.
pub type RequestHook = Arc<
    dyn Fn(WireRequest, Arc<ResolvedOptions>) -> BoxFuture<'static, Result<WireRequest, ClientError>>
        + Send
        + Sync,
>;

/// Hook invoked with the raw response before any decoding. May replace the
/// response or fail the call.
pub type ResponseHook = Arc<
    dyn Fn(
            RawResponse,
            Arc<WireRequest>,
            Arc<ResolvedOptions>,
        ) -> BoxFuture<'static, Result<RawResponse, ClientError>>
        + Send
        + Sync,
>;

/// Hook invoked with the decoded error payload of a failed exchange. Each
/// hook receives the previous hook's output and returns the (possibly
/// rewritten) payload.
pub type ErrorHook = Arc<
    dyn Fn(
            Value,
            Arc<ResponseParts>,
            Arc<WireRequest>,
            Arc<ResolvedOptions>,
        ) -> BoxFuture<'static, Value>
        + Send
        + Sync,
>;

/// The three hook chains of a client.
#[derive(Debug, Default)]
pub struct Interceptors {
    pub request: Registry<RequestHook>,
    pub response: Registry<ResponseHook>,
    pub error: Registry<ErrorHook>,
}

impl Interceptors {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_returns_sequential_ids() {
        let registry: Registry<u32> = Registry::new();
        let a = registry.register(1);
        let b = registry.register(2);
        assert_ne!(a, b);
        assert!(registry.exists(a));
        assert!(registry.exists(b));
    }

    #[test]
    fn test_eject_preserves_other_ids() {
        let registry: Registry<u32> = Registry::new();
        let a = registry.register(1);
        let b = registry.register(2);
        registry.eject(a);
        assert!(!registry.exists(a));
        assert!(registry.exists(b));
        assert_eq!(registry.get(1), Some(2));

        // New registrations never reuse the empty slot.
        let c = registry.register(3);
        assert_ne!(c, a);
        assert_eq!(registry.get(2), Some(3));
    }

    #[test]
    fn test_eject_unknown_id_is_noop() {
        let registry: Registry<u32> = Registry::new();
        registry.eject(InterceptorId(7));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_update_only_live_slots() {
        let registry: Registry<u32> = Registry::new();
        let a = registry.register(1);
        assert!(registry.update(a, 10));
        assert_eq!(registry.get(0), Some(10));

        registry.eject(a);
        assert!(!registry.update(a, 20));
        assert_eq!(registry.get(0), None);
    }

    #[test]
    fn test_clear_keeps_slot_count() {
        let registry: Registry<u32> = Registry::new();
        let a = registry.register(1);
        registry.register(2);
        registry.clear();
        assert_eq!(registry.len(), 2);
        assert!(!registry.exists(a));
        let c = registry.register(3);
        assert_eq!(c, InterceptorId(2));
    }
}
