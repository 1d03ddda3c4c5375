//! VM-owned payloads referenced from [`Variable`].
//!
//! Script objects, arrays and structure instances are shared between the VM and
//! the host through `Arc`. Their interior state sits behind `parking_lot` locks;
//! no lock is ever held across a call back into the VM.
//!
//! [`Variable`]: crate::Variable

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::handle::Handle;
use crate::type_info::{ObjectType, StructType, TypeDescriptor};
use crate::variable::Variable;

pub type ObjectRef = Arc<ScriptObject>;
pub type ArrayRef = Arc<ScriptArray>;
pub type StructRef = Arc<ScriptStruct>;

/// A VM object instance, optionally bound to a native object through a handle.
pub struct ScriptObject {
    class: Arc<ObjectType>,
    handle: AtomicU64,
}

impl ScriptObject {
    /// Create an unbound instance of `class`.
    pub fn new(class: Arc<ObjectType>) -> Self {
        Self {
            class,
            handle: AtomicU64::new(Handle::EMPTY.raw()),
        }
    }

    pub fn class(&self) -> &Arc<ObjectType> {
        &self.class
    }

    /// Handle of the bound native object, [`Handle::EMPTY`] if unbound.
    pub fn handle(&self) -> Handle {
        Handle::from_raw(self.handle.load(Ordering::Acquire))
    }

    pub fn is_bound(&self) -> bool {
        !self.handle().is_empty()
    }

    /// Attach this instance to `handle`. Binding is the VM's job; hosts go
    /// through [`VirtualMachine::bind_object`](crate::VirtualMachine::bind_object).
    pub fn set_handle(&self, handle: Handle) {
        self.handle.store(handle.raw(), Ordering::Release);
    }
}

impl fmt::Debug for ScriptObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptObject")
            .field("class", self.class.name())
            .field("handle", &self.handle())
            .finish()
    }
}

/// A homogeneous VM array.
pub struct ScriptArray {
    element: TypeDescriptor,
    elements: RwLock<Vec<Variable>>,
}

impl ScriptArray {
    /// Create an array of `size` default values of `element`.
    pub fn new(element: TypeDescriptor, size: usize) -> Self {
        let elements = (0..size).map(|_| Variable::default_for(&element)).collect();
        Self {
            element,
            elements: RwLock::new(elements),
        }
    }

    pub fn element_type(&self) -> &TypeDescriptor {
        &self.element
    }

    pub fn len(&self) -> usize {
        self.elements.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.read().is_empty()
    }

    /// Copy of the element at `index`.
    pub fn get(&self, index: usize) -> Option<Variable> {
        self.elements.read().get(index).cloned()
    }

    /// Overwrite the element at `index`. Returns `false` if out of bounds.
    pub fn set(&self, index: usize, value: Variable) -> bool {
        match self.elements.write().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Copy of every element, in order.
    pub fn to_vec(&self) -> Vec<Variable> {
        self.elements.read().clone()
    }
}

impl fmt::Debug for ScriptArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptArray")
            .field("element", &self.element.to_string())
            .field("elements", &*self.elements.read())
            .finish()
    }
}

/// An instance of a registered structure type.
pub struct ScriptStruct {
    ty: Arc<StructType>,
    values: RwLock<Vec<Variable>>,
}

impl ScriptStruct {
    /// Create an instance with every field at its type's default.
    pub fn new(ty: Arc<StructType>) -> Self {
        let values = ty
            .fields()
            .iter()
            .map(|field| Variable::default_for(&field.ty))
            .collect();
        Self {
            ty,
            values: RwLock::new(values),
        }
    }

    pub fn struct_type(&self) -> &Arc<StructType> {
        &self.ty
    }

    /// Copy of the value in `slot`.
    pub fn get(&self, slot: usize) -> Option<Variable> {
        self.values.read().get(slot).cloned()
    }

    /// Overwrite the value in `slot`. Returns `false` if out of bounds.
    pub fn set(&self, slot: usize, value: Variable) -> bool {
        match self.values.write().get_mut(slot) {
            Some(current) => {
                *current = value;
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for ScriptStruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values = self.values.read();
        let mut map = f.debug_map();
        for (field, value) in self.ty.fields().iter().zip(values.iter()) {
            map.entry(&field.name, value);
        }
        map.finish()
    }
}
