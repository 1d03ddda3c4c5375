//! The VM boundary.

use std::sync::Arc;

use crate::function::{ArgumentFunctor, CallbackRef, NativeFunction};
use crate::handle::{FormId, Handle, HandlePolicy, VmTypeId};
use crate::object::{ArrayRef, ObjectRef, StructRef};
use crate::type_info::{ObjectType, StructType, TypeDescriptor};

/// Generation of the VM's call-issuance protocol.
///
/// The two editions differ in when outbound arguments are packed: `NextGen`
/// VMs call the argument functor while consuming the call, `Legacy` VMs need
/// the arguments packed before the call is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Edition {
    Legacy,
    #[default]
    NextGen,
}

/// Operations the marshalling layer needs from a running VM.
///
/// Every query may fail; none of the results are cached by callers, since
/// types and bindings can change while the VM runs.
pub trait VirtualMachine: Send + Sync {
    fn edition(&self) -> Edition;

    // ---- type registry ----

    fn object_type_by_id(&self, type_id: VmTypeId) -> Option<Arc<ObjectType>>;

    fn object_type_by_name(&self, name: &str) -> Option<Arc<ObjectType>>;

    fn struct_type_by_name(&self, name: &str) -> Option<Arc<StructType>>;

    // ---- allocation ----

    /// New instance of the structure type registered as `name`.
    fn create_struct(&self, name: &str) -> Option<StructRef>;

    /// New array of `size` default elements.
    fn create_array(&self, element: &TypeDescriptor, size: u32) -> Option<ArrayRef>;

    /// New, unbound instance of `class`.
    fn create_object(&self, class: &Arc<ObjectType>) -> Option<ObjectRef>;

    // ---- object binding ----

    /// The VM object already bound to `handle` as an instance of `class`.
    fn find_bound_object(&self, handle: Handle, class: &ObjectType) -> Option<ObjectRef>;

    /// Bind `object` to the native object behind `handle`.
    fn bind_object(&self, object: &ObjectRef, handle: Handle) -> bool;

    /// Bind `object` to an item stored in `container`.
    fn bind_inventory_object(
        &self,
        object: &ObjectRef,
        container: FormId,
        unique_id: u16,
        handle: Handle,
    ) -> bool;

    fn handle_policy(&self) -> &dyn HandlePolicy;

    // ---- functions ----

    /// Register `function` under its object and function name.
    fn bind_native_method(&self, function: Box<dyn NativeFunction>) -> bool;

    fn set_callable_from_tasklets(&self, object: &str, function: &str, callable: bool);

    /// Queue a call to the static function `object.function`.
    fn issue_static_call(
        &self,
        object: &str,
        function: &str,
        args: ArgumentFunctor,
        callback: Option<CallbackRef>,
    ) -> bool;

    /// Queue a call to `function` on `object`.
    fn issue_method_call(
        &self,
        object: &ObjectRef,
        function: &str,
        args: ArgumentFunctor,
        callback: Option<CallbackRef>,
    ) -> bool;
}
