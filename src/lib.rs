//! Marshalling between host Rust values and a script VM's dynamic values.
//!
//! - [`codec`]: [`ScriptType`] conversions to and from [`Variable`]
//! - [`StructureProxy`]: named-field access to VM structures
//! - [`NativeFunctionBinding`]: host callables exposed to the VM
//! - [`dispatch`]: host-initiated calls into the VM
//! - [`diagnostics`]: reporting of failures the total operations swallow
//!
//! The data model ([`Variable`], [`TypeDescriptor`], [`VirtualMachine`] and
//! friends) lives in `scriptlink-core` and is re-exported here.

extern crate self as scriptlink;

pub mod codec;
pub mod diagnostics;
pub mod dispatch;
mod error;
mod ext;
mod native_fn;
pub mod resolver;
mod structure;
mod vm_ref;

pub use scriptlink_core::*;
pub use scriptlink_macros::{NativeObject, ScriptStruct};

pub use codec::{
    NativeKind, NativeObject, Nullable, RefOrInventory, ScriptSequence, ScriptString, ScriptType,
    pack, pack_into, unpack,
};
pub use dispatch::{
    IntoArguments, dispatch_applied_method_call, dispatch_applied_static_call,
    dispatch_method_call, dispatch_static_call,
};
pub use error::MarshalError;
pub use ext::VirtualMachineExt;
pub use native_fn::{
    IntoNativeFn, IntoVmNativeFn, NativeFunctionBinding, NativeStub, ScriptReturn, ScriptSelf,
    Static,
};
pub use resolver::type_descriptor;
pub use structure::{StructTag, StructureProxy};
pub use vm_ref::VmRef;

pub mod prelude {
    pub use crate::{
        CallbackRef, Edition, FixedString, Handle, NativeFunctionBinding, NativeObject, Nullable,
        ObjectRef, RefOrInventory, ScriptStruct, ScriptType, Static, StructTag, StructureProxy,
        VarRef, Variable, VirtualMachine, VirtualMachineExt, VmRef, pack, unpack,
    };
}
