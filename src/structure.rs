//! Named-field views over VM structure instances.
//!
//! A script structure type is registered under `Owner#Struct`. Host code names
//! it with a marker type implementing [`StructTag`] (usually derived) and
//! reaches the instance's fields through a [`StructureProxy`]:
//!
//! ```
//! use scriptlink::{ScriptStruct, StructureProxy, VmRef};
//! use scriptlink_registry::MemoryVm;
//!
//! #[derive(ScriptStruct)]
//! #[script(object = "Actor", structure = "Stats")]
//! pub struct Stats;
//!
//! let machine = MemoryVm::builder()
//!     .structure("Actor", "Stats", [("Health", "Int")])
//!     .build()
//!     .unwrap();
//! let vm = VmRef::new(&machine);
//!
//! let stats = StructureProxy::<Stats>::new(vm);
//! stats.insert(vm, "Health", 50);
//! assert_eq!(stats.find::<i32>(vm, "Health"), Some(50));
//! ```
//!
//! The proxy does not copy the instance; every field access reads or writes
//! the VM-owned slots. Callers that share a proxy across threads synchronize
//! externally.

use std::fmt;
use std::marker::PhantomData;

use crate::codec::{Nullable, ScriptType, pack, unpack};
use crate::diagnostics::{report_at, warn_at};
use crate::error::MarshalError;
use crate::resolver;
use crate::vm_ref::VmRef;
use crate::{StructRef, TypeDescriptor, Variable};

/// Compile-time name of a script structure type.
pub trait StructTag {
    /// Owning script object.
    const OBJECT: &'static str;
    /// Structure name within the owner.
    const STRUCTURE: &'static str;
    /// Registered name, `OBJECT#STRUCTURE`.
    const TAG: &'static str;
}

/// A shared reference to a VM structure instance of type `T::TAG`.
///
/// Invariant: the held instance, if any, is of type `T::TAG`.
pub struct StructureProxy<T: StructTag> {
    instance: Option<StructRef>,
    _tag: PhantomData<fn() -> T>,
}

impl<T: StructTag> StructureProxy<T> {
    /// A proxy holding no instance.
    pub const fn null() -> Self {
        Self {
            instance: None,
            _tag: PhantomData,
        }
    }

    /// Ask the VM for a fresh instance. A VM that cannot create one leaves the
    /// proxy null.
    pub fn new(vm: VmRef<'_>) -> Self {
        match Self::create(vm).and_then(Self::try_from_instance) {
            Ok(proxy) => proxy,
            Err(err) => {
                report_at!("scriptlink::structure", err);
                Self::null()
            }
        }
    }

    /// A fresh instance with the given fields set. Unknown fields are skipped
    /// with a warning.
    pub fn with_fields<I, K>(vm: VmRef<'_>, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Variable)>,
        K: AsRef<str>,
    {
        let proxy = Self::new(vm);
        for (name, value) in fields {
            proxy.set_variable(name.as_ref(), value);
        }
        proxy
    }

    /// Wrap an existing instance. An instance of another structure type is
    /// reported and the proxy left null. Type names compare ignoring ASCII
    /// case, as the VM registers them.
    pub fn from_instance(instance: StructRef) -> Self {
        match Self::try_from_instance(instance) {
            Ok(proxy) => proxy,
            Err(err) => {
                report_at!("scriptlink::structure", err);
                Self::null()
            }
        }
    }

    fn try_from_instance(instance: StructRef) -> Result<Self, MarshalError> {
        let actual = instance.struct_type().name();
        if !actual.eq_ignore_ascii_case(T::TAG) {
            return Err(MarshalError::StructureMismatch {
                expected: T::TAG.to_owned(),
                actual: actual.to_string(),
            });
        }
        Ok(Self::wrap(instance))
    }

    fn create(vm: VmRef<'_>) -> Result<StructRef, MarshalError> {
        vm.get()?
            .create_struct(T::TAG)
            .ok_or_else(|| MarshalError::AllocationFailed {
                what: format!("structure of type {}", T::TAG),
            })
    }

    fn wrap(instance: StructRef) -> Self {
        Self {
            instance: Some(instance),
            _tag: PhantomData,
        }
    }

    pub fn is_null(&self) -> bool {
        self.instance.is_none()
    }

    /// The VM-owned instance.
    pub fn instance(&self) -> Option<&StructRef> {
        self.instance.as_ref()
    }

    pub fn into_instance(self) -> Option<StructRef> {
        self.instance
    }

    /// Read field `name`. `None` if the proxy is null, the field does not
    /// exist, or the field holds `None`.
    pub fn find<U: ScriptType>(&self, vm: VmRef<'_>, name: &str) -> Option<U> {
        let (instance, slot) = self.slot(name)?;
        let value = instance.get(slot)?;
        if value.is_none() {
            return None;
        }
        Some(unpack(vm, &value))
    }

    /// Write field `name`. Returns `false` if the proxy is null or the field
    /// does not exist.
    pub fn insert<U: ScriptType>(&self, vm: VmRef<'_>, name: &str, value: U) -> bool {
        match self.slot(name) {
            Some((instance, slot)) => instance.set(slot, pack(vm, value)),
            None => false,
        }
    }

    /// Write an already packed value into field `name`.
    pub fn set_variable(&self, name: &str, value: Variable) -> bool {
        match self.slot(name) {
            Some((instance, slot)) => instance.set(slot, value),
            None => false,
        }
    }

    fn slot(&self, name: &str) -> Option<(&StructRef, usize)> {
        let instance = self.instance.as_ref()?;
        match instance.struct_type().field_index(name) {
            Some(slot) => Some((instance, slot)),
            None => {
                warn_at!(
                    "scriptlink::structure",
                    MarshalError::FieldNotFound {
                        field: name.to_owned(),
                        structure: T::TAG.to_owned(),
                    }
                );
                None
            }
        }
    }
}

impl<T: StructTag> Default for StructureProxy<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T: StructTag> Clone for StructureProxy<T> {
    fn clone(&self) -> Self {
        Self {
            instance: self.instance.clone(),
            _tag: PhantomData,
        }
    }
}

impl<T: StructTag> fmt::Debug for StructureProxy<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructureProxy")
            .field("tag", &T::TAG)
            .field("instance", &self.instance)
            .finish()
    }
}

fn structure_descriptor<T: StructTag>(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
    resolver::struct_type_by_name(vm, T::TAG).map(TypeDescriptor::structure)
}

fn unpack_structure<T: StructTag>(src: &Variable) -> Result<Option<StructureProxy<T>>, MarshalError> {
    match src {
        Variable::Struct(Some(instance)) => {
            StructureProxy::try_from_instance(instance.clone()).map(Some)
        }
        Variable::Struct(None) => Ok(None),
        other => Err(MarshalError::tag_mismatch("struct", other)),
    }
}

impl<T: StructTag> ScriptType for StructureProxy<T> {
    fn descriptor(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
        structure_descriptor::<T>(vm)
    }

    fn try_pack(self, _vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
        *dst = Variable::Struct(self.instance);
        Ok(())
    }

    fn try_unpack(_vm: VmRef<'_>, src: &Variable) -> Result<Self, MarshalError> {
        unpack_structure(src).map(Option::unwrap_or_default)
    }
}

impl<T: StructTag> Nullable for StructureProxy<T> {
    fn descriptor(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
        structure_descriptor::<T>(vm)
    }

    fn try_pack_present(self, _vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
        *dst = Variable::Struct(self.instance);
        Ok(())
    }

    fn try_unpack_present(_vm: VmRef<'_>, src: &Variable) -> Result<Option<Self>, MarshalError> {
        unpack_structure(src)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::diagnostics;
    use crate::{ScriptStruct, StructField, StructType};

    #[derive(crate::ScriptStruct)]
    #[script(object = "Actor", structure = "Stats")]
    struct Stats;

    #[derive(crate::ScriptStruct)]
    #[script(object = "Utility", structure = "Point")]
    struct Point;

    fn stats_instance() -> StructRef {
        let ty = Arc::new(StructType::new(
            Stats::TAG,
            vec![
                StructField::new("Health", TypeDescriptor::int()),
                StructField::new("Name", TypeDescriptor::string()),
                StructField::new("Target", TypeDescriptor::var()),
            ],
        ));
        Arc::new(ScriptStruct::new(ty))
    }

    #[test]
    fn tag_is_owner_hash_structure() {
        assert_eq!(Stats::OBJECT, "Actor");
        assert_eq!(Stats::STRUCTURE, "Stats");
        assert_eq!(Stats::TAG, "Actor#Stats");
    }

    #[test]
    fn insert_then_find() {
        let proxy = StructureProxy::<Stats>::from_instance(stats_instance());
        assert!(proxy.insert(VmRef::none(), "Health", 50));
        assert_eq!(proxy.find::<i32>(VmRef::none(), "Health"), Some(50));
        assert_eq!(proxy.find::<i32>(VmRef::none(), "health"), Some(50));
    }

    #[test]
    fn unknown_field_leaves_others_untouched() {
        diagnostics::take_failures();
        let proxy = StructureProxy::<Stats>::from_instance(stats_instance());
        proxy.insert(VmRef::none(), "Name", String::from("Nick"));
        assert_eq!(proxy.find::<i32>(VmRef::none(), "Nonexistent"), None);
        assert!(!proxy.insert(VmRef::none(), "Nonexistent", 3));
        assert_eq!(proxy.find::<String>(VmRef::none(), "Name").as_deref(), Some("Nick"));
        assert_eq!(proxy.find::<i32>(VmRef::none(), "Health"), Some(0));
        assert_eq!(diagnostics::take_failures(), 2);
    }

    #[test]
    fn none_field_is_absent() {
        let proxy = StructureProxy::<Stats>::from_instance(stats_instance());
        assert!(proxy.find::<Option<crate::VarRef>>(VmRef::none(), "Target").is_none());
    }

    #[test]
    fn mismatched_instance_leaves_proxy_null() {
        diagnostics::take_failures();
        let proxy = StructureProxy::<Point>::from_instance(stats_instance());
        assert!(proxy.is_null());
        assert_eq!(diagnostics::take_failures(), 1);
        assert_eq!(proxy.find::<i32>(VmRef::none(), "Health"), None);
        assert!(!proxy.insert(VmRef::none(), "Health", 1));
    }

    #[test]
    fn null_proxy() {
        diagnostics::take_failures();
        let proxy = StructureProxy::<Stats>::null();
        assert!(proxy.is_null());
        assert!(proxy.instance().is_none());
        assert!(!proxy.set_variable("Health", Variable::Int(1)));
        assert_eq!(diagnostics::take_failures(), 0);
    }

    #[test]
    fn creation_without_vm_is_reported() {
        diagnostics::take_failures();
        assert!(StructureProxy::<Stats>::new(VmRef::none()).is_null());
        assert_eq!(diagnostics::take_failures(), 1);
    }

    #[test]
    fn pack_shares_the_instance() {
        let instance = stats_instance();
        let proxy = StructureProxy::<Stats>::from_instance(Arc::clone(&instance));
        let packed = crate::pack(VmRef::none(), proxy);
        assert_eq!(packed, Variable::Struct(Some(Arc::clone(&instance))));

        let back: StructureProxy<Stats> = crate::unpack(VmRef::none(), &packed);
        assert!(Arc::ptr_eq(back.instance().unwrap(), &instance));
    }

    #[test]
    fn unpack_checks_structure_type() {
        diagnostics::take_failures();
        let packed = Variable::Struct(Some(stats_instance()));
        let point: StructureProxy<Point> = crate::unpack(VmRef::none(), &packed);
        assert!(point.is_null());
        assert_eq!(diagnostics::take_failures(), 1);
    }
}
