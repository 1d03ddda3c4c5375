//! Handle allocation for host objects.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use scriptlink_core::{Handle, HandlePolicy, NativeRef, VmTypeId};

#[derive(Debug, Clone)]
struct NativeEntry {
    type_id: VmTypeId,
    object: NativeRef,
    loaded: bool,
}

#[derive(Debug, Default)]
struct Natives {
    by_handle: FxHashMap<Handle, NativeEntry>,
    by_address: FxHashMap<usize, Handle>,
}

/// Handle policy over an explicit table of registered host objects.
///
/// The host registers each native object it wants the VM to see; unknown
/// objects have no handle. Inventory-item handles are always considered
/// loaded and of the reference type.
#[derive(Debug)]
pub struct MemoryHandlePolicy {
    reference_type: VmTypeId,
    active_effect_type: VmTypeId,
    natives: RwLock<Natives>,
    next: AtomicU64,
}

fn address(object: &NativeRef) -> usize {
    Arc::as_ptr(object).cast::<()>() as usize
}

impl MemoryHandlePolicy {
    pub fn new(reference_type: VmTypeId, active_effect_type: VmTypeId) -> Self {
        Self {
            reference_type,
            active_effect_type,
            natives: RwLock::new(Natives::default()),
            next: AtomicU64::new(1),
        }
    }

    /// Make `object` addressable as a loaded native of `type_id`.
    ///
    /// Registering the same allocation twice returns its existing handle.
    pub fn register(&self, type_id: VmTypeId, object: NativeRef) -> Handle {
        let mut natives = self.natives.write();
        if let Some(&handle) = natives.by_address.get(&address(&object)) {
            return handle;
        }
        let handle = Handle::from_raw(self.next.fetch_add(1, Ordering::Relaxed));
        natives.by_address.insert(address(&object), handle);
        natives.by_handle.insert(
            handle,
            NativeEntry {
                type_id,
                object,
                loaded: true,
            },
        );
        tracing::trace!(target: "scriptlink_registry", %handle, %type_id, "registered native object");
        handle
    }

    /// Mark a registered object loaded or unloaded. Returns `false` for
    /// unknown handles.
    pub fn set_loaded(&self, handle: Handle, loaded: bool) -> bool {
        match self.natives.write().by_handle.get_mut(&handle) {
            Some(entry) => {
                entry.loaded = loaded;
                true
            }
            None => false,
        }
    }

    /// Forget a registered object entirely.
    pub fn unregister(&self, handle: Handle) -> Option<NativeRef> {
        let mut natives = self.natives.write();
        let entry = natives.by_handle.remove(&handle)?;
        natives.by_address.remove(&address(&entry.object));
        Some(entry.object)
    }

    pub fn len(&self) -> usize {
        self.natives.read().by_handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HandlePolicy for MemoryHandlePolicy {
    fn reference_type(&self) -> VmTypeId {
        self.reference_type
    }

    fn active_effect_type(&self) -> VmTypeId {
        self.active_effect_type
    }

    fn handle_for_object(&self, type_id: VmTypeId, object: &NativeRef) -> Handle {
        let natives = self.natives.read();
        natives
            .by_address
            .get(&address(object))
            .filter(|handle| {
                natives
                    .by_handle
                    .get(*handle)
                    .is_some_and(|entry| entry.type_id == type_id)
            })
            .copied()
            .unwrap_or(Handle::EMPTY)
    }

    fn is_handle_loaded(&self, handle: Handle) -> bool {
        if handle.inventory_item().is_some() {
            return true;
        }
        self.natives
            .read()
            .by_handle
            .get(&handle)
            .is_some_and(|entry| entry.loaded)
    }

    fn handle_is_type(&self, type_id: VmTypeId, handle: Handle) -> bool {
        if handle.inventory_item().is_some() {
            return type_id == self.reference_type;
        }
        self.natives
            .read()
            .by_handle
            .get(&handle)
            .is_some_and(|entry| entry.type_id == type_id)
    }

    fn object_for_handle(&self, type_id: VmTypeId, handle: Handle) -> Option<NativeRef> {
        self.natives
            .read()
            .by_handle
            .get(&handle)
            .filter(|entry| entry.loaded && entry.type_id == type_id)
            .map(|entry| Arc::clone(&entry.object))
    }
}
