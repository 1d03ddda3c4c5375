//! Type descriptor resolution.
//!
//! Maps host types to the VM's [`TypeDescriptor`]s by querying the live type
//! registry. Nothing is cached: the VM may not exist yet when a binding is
//! built, and registrations can change while it runs.
//!
//! Primitive kinds (`int`, `float`, `bool`, `string`, `var`) resolve without a
//! VM; object and structure kinds need one.

use std::sync::Arc;

use crate::codec::ScriptType;
use crate::diagnostics::report_at;
use crate::error::MarshalError;
use crate::native_fn::ScriptReturn;
use crate::vm_ref::VmRef;
use crate::{ObjectType, StructType, TypeDescriptor, VmTypeId};

/// Object class registered under `type_id`.
pub fn object_type_by_id(vm: VmRef<'_>, type_id: VmTypeId) -> Result<Arc<ObjectType>, MarshalError> {
    vm.get()?
        .object_type_by_id(type_id)
        .ok_or_else(|| MarshalError::unregistered("object", type_id.to_string()))
}

/// Object class registered as `name`.
pub fn object_type_by_name(vm: VmRef<'_>, name: &str) -> Result<Arc<ObjectType>, MarshalError> {
    vm.get()?
        .object_type_by_name(name)
        .ok_or_else(|| MarshalError::unregistered("object", name))
}

/// Structure type registered as `name` (`Owner#Struct`).
pub fn struct_type_by_name(vm: VmRef<'_>, name: &str) -> Result<Arc<StructType>, MarshalError> {
    vm.get()?
        .struct_type_by_name(name)
        .ok_or_else(|| MarshalError::unregistered("structure", name))
}

/// Descriptor of `T`, or `None` (reported) if the VM cannot represent it.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn type_descriptor<T: ScriptType>(vm: VmRef<'_>) -> Option<TypeDescriptor> {
    match T::descriptor(vm) {
        Ok(descriptor) => Some(descriptor),
        Err(err) => {
            report_at!("scriptlink::resolve", err);
            None
        }
    }
}

/// Descriptor of a function result; `()` is `none`.
pub fn return_descriptor<R: ScriptReturn>(vm: VmRef<'_>) -> Option<TypeDescriptor> {
    match R::descriptor(vm) {
        Ok(descriptor) => Some(descriptor),
        Err(err) => {
            report_at!("scriptlink::resolve", err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics;
    use crate::{FixedString, StructureProxy, VarRef};

    #[derive(crate::ScriptStruct)]
    #[script(object = "Actor", structure = "Stats")]
    struct Stats;

    #[test]
    fn primitives_need_no_vm() {
        diagnostics::take_failures();
        assert_eq!(type_descriptor::<i16>(VmRef::none()), Some(TypeDescriptor::int()));
        assert_eq!(type_descriptor::<u64>(VmRef::none()), Some(TypeDescriptor::int()));
        assert_eq!(type_descriptor::<f64>(VmRef::none()), Some(TypeDescriptor::float()));
        assert_eq!(type_descriptor::<bool>(VmRef::none()), Some(TypeDescriptor::bool()));
        assert_eq!(type_descriptor::<FixedString>(VmRef::none()), Some(TypeDescriptor::string()));
        assert_eq!(type_descriptor::<Option<VarRef>>(VmRef::none()), Some(TypeDescriptor::var()));
        assert_eq!(return_descriptor::<()>(VmRef::none()), Some(TypeDescriptor::none()));
        assert_eq!(diagnostics::take_failures(), 0);
    }

    #[test]
    fn complex_kinds_without_vm_are_reported() {
        diagnostics::take_failures();
        assert_eq!(type_descriptor::<StructureProxy<Stats>>(VmRef::none()), None);
        assert_eq!(type_descriptor::<Option<crate::ObjectRef>>(VmRef::none()), None);
        assert_eq!(diagnostics::take_failures(), 2);
    }

    #[test]
    fn arrays_wrap_their_element() {
        let desc = type_descriptor::<Vec<bool>>(VmRef::none()).unwrap();
        assert_eq!(desc, TypeDescriptor::bool().array_of().unwrap());
    }
}
