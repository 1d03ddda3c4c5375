//! Native object identity inside the VM.
//!
//! The VM never stores native addresses. Instead every native object it can
//! see is reached through a [`Handle`], and a [`HandlePolicy`] owned by the VM
//! translates between handles and the live native objects they refer to.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Shared reference to a native (host) object.
///
/// Native objects are owned by the host; the handle policy hands out clones of
/// the host's `Arc` and the marshalling layer downcasts them to concrete types.
pub type NativeRef = Arc<dyn Any + Send + Sync>;

/// Numeric type id of a native object class, as known to the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VmTypeId(u32);

impl VmTypeId {
    /// Create a type id from its raw value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for VmTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type#{:#04x}", self.0)
    }
}

impl From<u32> for VmTypeId {
    fn from(id: u32) -> Self {
        Self::new(id)
    }
}

/// Identity of a persistent host object (for example an inventory container).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct FormId(u32);

impl FormId {
    /// Create a form id from its raw value.
    #[inline]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw value.
    #[inline]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for FormId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

/// VM-side identity of a native object.
///
/// Bit 63 marks inventory-item handles; for those, bits 32..48 carry the
/// per-item unique id and the low 32 bits the container's form id.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u64);

impl Handle {
    /// The handle that refers to nothing.
    pub const EMPTY: Handle = Handle(0x0000_FFFF_0000_0000);

    const INVENTORY_BIT: u64 = 1 << 63;

    /// Create a handle from its raw value.
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw value.
    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Whether this is [`Handle::EMPTY`].
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == Self::EMPTY.0
    }

    /// Derive the handle of an item stored inside a container.
    pub const fn for_inventory_item(unique_id: u16, container: FormId) -> Self {
        Self(Self::INVENTORY_BIT | ((unique_id as u64) << 32) | container.get() as u64)
    }

    /// Decode an inventory-item handle into `(container, unique_id)`.
    pub const fn inventory_item(self) -> Option<(FormId, u16)> {
        if self.0 & Self::INVENTORY_BIT == 0 {
            return None;
        }
        let unique_id = ((self.0 >> 32) & 0xFFFF) as u16;
        let container = FormId::new(self.0 as u32);
        Some((container, unique_id))
    }
}

impl Default for Handle {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            f.write_str("Handle(EMPTY)")
        } else {
            write!(f, "Handle({:#018x})", self.0)
        }
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Translation between native objects and VM handles.
///
/// Implemented by the VM. All queries are side-effect free except
/// [`HandlePolicy::handle_for_object`], which may allocate a handle the first
/// time an object is seen.
pub trait HandlePolicy: Send + Sync {
    /// Type id used for object references (and for inventory items, which are
    /// references that have not been placed in the world).
    fn reference_type(&self) -> VmTypeId;

    /// Type id every active-effect handle carries.
    fn active_effect_type(&self) -> VmTypeId;

    /// Handle for a live native object of the given type, or
    /// [`Handle::EMPTY`] if the object cannot be addressed.
    fn handle_for_object(&self, type_id: VmTypeId, object: &NativeRef) -> Handle;

    /// Handle for an item stored inside a container.
    fn handle_for_inventory_item(&self, unique_id: u16, container: FormId) -> Handle {
        Handle::for_inventory_item(unique_id, container)
    }

    /// Inverse of [`HandlePolicy::handle_for_inventory_item`].
    fn inventory_item_for_handle(&self, handle: Handle) -> Option<(FormId, u16)> {
        handle.inventory_item()
    }

    /// Whether the object behind `handle` is currently loaded.
    fn is_handle_loaded(&self, handle: Handle) -> bool;

    /// Whether `handle` refers to an object of `type_id`.
    fn handle_is_type(&self, type_id: VmTypeId, handle: Handle) -> bool;

    /// The live native object for `handle`, if it is loaded and of `type_id`.
    fn object_for_handle(&self, type_id: VmTypeId, handle: Handle) -> Option<NativeRef>;
}
