//! Native objects, VM objects, object references and variable slots.

use std::any::Any;
use std::sync::Arc;

use crate::diagnostics::report_at;
use crate::error::MarshalError;
use crate::resolver;
use crate::vm_ref::VmRef;
use crate::{
    FormId, Handle, NativeRef, ObjectRef, ObjectType, SCRIPT_OBJECT_TYPE, TypeDescriptor, VarRef,
    Variable, VirtualMachine, VmTypeId,
};

use super::{Nullable, ScriptType};

/// Which handle family a native class belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NativeKind {
    /// Persistent game objects; handles must be loaded to resolve.
    #[default]
    Form,
    /// Active effects; handles must carry the VM's active-effect type.
    Effect,
}

/// A host class the VM knows by type id.
///
/// Usually derived:
///
/// ```
/// use scriptlink::{NativeKind, NativeObject, VmTypeId};
///
/// #[derive(NativeObject)]
/// #[script(type_id = 0x2B)]
/// struct Actor;
///
/// #[derive(NativeObject)]
/// #[script(type_id = 0x22, effect)]
/// struct ActiveEffect;
///
/// assert_eq!(Actor::TYPE_ID, VmTypeId::new(0x2B));
/// assert_eq!(ActiveEffect::KIND, NativeKind::Effect);
/// ```
///
/// Native objects cross the boundary as `Arc<T>` (or `Option<Arc<T>>` where
/// they may be missing) and never by value:
///
/// ```compile_fail,E0277
/// use scriptlink::{NativeFunctionBinding, NativeObject};
///
/// #[derive(NativeObject, Default)]
/// #[script(type_id = 0x2B)]
/// struct Actor;
///
/// let _ = NativeFunctionBinding::new("Actor", "Copy", |_: std::sync::Arc<Actor>, a: Actor| 0, false);
/// ```
pub trait NativeObject: Any + Send + Sync {
    const TYPE_ID: VmTypeId;
    const KIND: NativeKind = NativeKind::Form;
}

/// The VM object bound to `handle`, creating and binding one if none exists.
///
/// The lookup and the bind are separate VM calls; two threads packing the same
/// native object concurrently may each create an object.
fn bound_object(
    machine: &dyn VirtualMachine,
    class: &Arc<ObjectType>,
    handle: Handle,
    bind: impl FnOnce(&ObjectRef) -> bool,
) -> Result<ObjectRef, MarshalError> {
    if let Some(object) = machine.find_bound_object(handle, class) {
        return Ok(object);
    }
    let object = machine
        .create_object(class)
        .ok_or_else(|| MarshalError::AllocationFailed {
            what: format!("object of class {}", class.name()),
        })?;
    if !bind(&object) {
        return Err(MarshalError::InvalidHandle {
            handle,
            reason: "the VM refused to bind an object to it",
        });
    }
    Ok(object)
}

fn object_variable(object: ObjectRef, class: Arc<ObjectType>) -> Variable {
    let mut var = Variable::object(object);
    var.set_complex_type(class);
    var
}

/// Live object behind an object variable, or `Ok(None)` for a typed none.
fn held_object(src: &Variable) -> Result<Option<&ObjectRef>, MarshalError> {
    match src {
        Variable::Object { object, .. } => Ok(object.as_ref()),
        other => Err(MarshalError::tag_mismatch("object", other)),
    }
}

// ============================================================================
// Native objects
// ============================================================================

impl<T: NativeObject> Nullable for Arc<T> {
    fn descriptor(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
        resolver::object_type_by_id(vm, T::TYPE_ID).map(TypeDescriptor::object)
    }

    fn try_pack_present(self, vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
        let class = resolver::object_type_by_id(vm, T::TYPE_ID)?;
        let machine = vm.get()?;
        let native: NativeRef = self;
        let handle = machine.handle_policy().handle_for_object(T::TYPE_ID, &native);
        if handle.is_empty() {
            return Err(MarshalError::InvalidHandle {
                handle,
                reason: "native object has no handle",
            });
        }
        let object = bound_object(machine, &class, handle, |object| {
            machine.bind_object(object, handle)
        })?;
        *dst = object_variable(object, class);
        Ok(())
    }

    fn try_unpack_present(vm: VmRef<'_>, src: &Variable) -> Result<Option<Self>, MarshalError> {
        let Some(object) = held_object(src)? else {
            return Ok(None);
        };
        let machine = vm.get()?;
        let policy = machine.handle_policy();
        let handle = object.handle();

        match T::KIND {
            NativeKind::Form if !policy.is_handle_loaded(handle) => {
                return Err(MarshalError::InvalidHandle {
                    handle,
                    reason: "handle is not loaded",
                });
            }
            NativeKind::Effect if !policy.handle_is_type(policy.active_effect_type(), handle) => {
                return Err(MarshalError::InvalidHandle {
                    handle,
                    reason: "handle is not an active effect",
                });
            }
            _ => {}
        }

        let native = policy
            .object_for_handle(T::TYPE_ID, handle)
            .ok_or(MarshalError::InvalidHandle {
                handle,
                reason: "no native object of the requested type",
            })?;
        native
            .downcast::<T>()
            .map(Some)
            .map_err(|_| MarshalError::InvalidHandle {
                handle,
                reason: "native object has a different host type",
            })
    }
}

// ============================================================================
// Object references
// ============================================================================

/// A world object reference, or an item still held in a container's
/// inventory.
///
/// Inventory items have no reference of their own; the VM addresses them by
/// the container's form id plus a per-item unique id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RefOrInventory {
    #[default]
    Empty,
    Reference(Handle),
    Inventory { container: FormId, unique_id: u16 },
}

impl RefOrInventory {
    pub fn is_empty(&self) -> bool {
        matches!(self, RefOrInventory::Empty)
    }

    pub fn reference(&self) -> Option<Handle> {
        match self {
            RefOrInventory::Reference(handle) => Some(*handle),
            _ => None,
        }
    }

    pub fn container(&self) -> Option<FormId> {
        match self {
            RefOrInventory::Inventory { container, .. } => Some(*container),
            _ => None,
        }
    }

    pub fn unique_id(&self) -> Option<u16> {
        match self {
            RefOrInventory::Inventory { unique_id, .. } => Some(*unique_id),
            _ => None,
        }
    }

    fn reference_class(vm: VmRef<'_>) -> Result<Arc<ObjectType>, MarshalError> {
        let machine = vm.get()?;
        resolver::object_type_by_id(vm, machine.handle_policy().reference_type())
    }
}

impl ScriptType for RefOrInventory {
    fn descriptor(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
        Self::reference_class(vm).map(TypeDescriptor::object)
    }

    fn try_pack(self, vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
        let machine = vm.get()?;
        match self {
            RefOrInventory::Empty => Err(MarshalError::InvalidHandle {
                handle: Handle::EMPTY,
                reason: "empty object reference",
            }),
            RefOrInventory::Reference(handle) => {
                if handle.is_empty() {
                    return Err(MarshalError::InvalidHandle {
                        handle,
                        reason: "empty object reference",
                    });
                }
                let class = Self::reference_class(vm)?;
                let object = bound_object(machine, &class, handle, |object| {
                    machine.bind_object(object, handle)
                })?;
                *dst = object_variable(object, class);
                Ok(())
            }
            RefOrInventory::Inventory {
                container,
                unique_id,
            } => {
                if container.get() == 0 || unique_id == 0 {
                    return Err(MarshalError::InvalidHandle {
                        handle: Handle::for_inventory_item(unique_id, container),
                        reason: "inventory item needs a container and a unique id",
                    });
                }
                let class = Self::reference_class(vm)?;
                let handle = machine
                    .handle_policy()
                    .handle_for_inventory_item(unique_id, container);
                let object = bound_object(machine, &class, handle, |object| {
                    machine.bind_inventory_object(object, container, unique_id, handle)
                })?;
                *dst = object_variable(object, class);
                Ok(())
            }
        }
    }

    fn try_unpack(vm: VmRef<'_>, src: &Variable) -> Result<Self, MarshalError> {
        let Some(object) = held_object(src)? else {
            return Ok(RefOrInventory::Empty);
        };
        let machine = vm.get()?;
        let policy = machine.handle_policy();
        let handle = object.handle();
        if !policy.handle_is_type(policy.reference_type(), handle) {
            return Err(MarshalError::InvalidHandle {
                handle,
                reason: "handle is not an object reference",
            });
        }
        Ok(match policy.inventory_item_for_handle(handle) {
            Some((container, unique_id)) => RefOrInventory::Inventory {
                container,
                unique_id,
            },
            None => RefOrInventory::Reference(handle),
        })
    }
}

// ============================================================================
// VM objects
// ============================================================================

impl Nullable for ObjectRef {
    fn descriptor(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
        resolver::object_type_by_name(vm, SCRIPT_OBJECT_TYPE).map(TypeDescriptor::object)
    }

    fn try_pack_present(self, vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
        *dst = Variable::object(self);
        attach_script_object_type(vm, dst);
        Ok(())
    }

    fn try_pack_absent(vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
        *dst = Variable::null_object(None);
        attach_script_object_type(vm, dst);
        Ok(())
    }

    fn try_unpack_present(_vm: VmRef<'_>, src: &Variable) -> Result<Option<Self>, MarshalError> {
        held_object(src).map(Option::<&ObjectRef>::cloned)
    }
}

/// VM object variables carry the `ScriptObject` class. The value itself is
/// still stored when the class cannot be resolved.
fn attach_script_object_type(vm: VmRef<'_>, dst: &mut Variable) {
    match resolver::object_type_by_name(vm, SCRIPT_OBJECT_TYPE) {
        Ok(class) => dst.set_complex_type(class),
        Err(err) => report_at!("scriptlink::resolve", err),
    }
}

// ============================================================================
// Variable slots
// ============================================================================

impl Nullable for VarRef {
    fn descriptor(_vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
        Ok(TypeDescriptor::var())
    }

    fn try_pack_present(self, _vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
        *dst = Variable::Var(Some(self));
        Ok(())
    }

    fn try_unpack_present(_vm: VmRef<'_>, src: &Variable) -> Result<Option<Self>, MarshalError> {
        match src {
            Variable::Var(slot) => Ok(slot.clone()),
            other => Err(MarshalError::tag_mismatch("var", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{pack, unpack};
    use crate::diagnostics;

    #[derive(Debug)]
    struct Workbench;

    impl NativeObject for Workbench {
        const TYPE_ID: VmTypeId = VmTypeId::new(0x28);
    }

    #[test]
    fn native_objects_need_a_vm() {
        diagnostics::take_failures();
        assert!(pack(VmRef::none(), Some(Arc::new(Workbench))).is_none());
        assert_eq!(diagnostics::take_failures(), 1);
    }

    #[test]
    fn typed_none_unpacks_absent_without_diagnostic() {
        diagnostics::take_failures();
        let bench: Option<Arc<Workbench>> = unpack(VmRef::none(), &Variable::null_object(None));
        assert!(bench.is_none());
        assert_eq!(diagnostics::take_failures(), 0);
    }

    #[test]
    fn wrong_tag_for_object_is_reported() {
        diagnostics::take_failures();
        let bench: Option<Arc<Workbench>> = unpack(VmRef::none(), &Variable::Int(4));
        assert!(bench.is_none());
        assert_eq!(diagnostics::take_failures(), 1);
    }

    #[test]
    fn empty_reference_packs_none() {
        diagnostics::take_failures();
        assert!(pack(VmRef::none(), RefOrInventory::Empty).is_none());
        assert_eq!(diagnostics::take_failures(), 1);
    }

    #[test]
    fn ref_or_inventory_accessors() {
        let item = RefOrInventory::Inventory {
            container: FormId::new(0x14),
            unique_id: 3,
        };
        assert_eq!(item.container(), Some(FormId::new(0x14)));
        assert_eq!(item.unique_id(), Some(3));
        assert_eq!(item.reference(), None);
        assert!(RefOrInventory::default().is_empty());
    }

    #[test]
    fn var_slots_pass_through() {
        let slot = Variable::new_var(Variable::Float(2.0));
        let packed = pack(VmRef::none(), Some(Arc::clone(&slot)));
        let back: Option<VarRef> = unpack(VmRef::none(), &packed);
        assert!(Arc::ptr_eq(&back.unwrap(), &slot));
        assert!(pack::<Option<VarRef>>(VmRef::none(), None).is_none());
    }
}
