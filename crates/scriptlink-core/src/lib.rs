//! Core data model shared by the scriptlink marshalling layer and the VMs it
//! talks to.
//!
//! This crate owns everything that crosses the native/script boundary:
//!
//! - [`Variable`]: the VM's tagged dynamic value
//! - [`TypeDescriptor`]: VM-side description of a representable type
//! - [`ScriptObject`], [`ScriptArray`], [`ScriptStruct`]: shared VM payloads
//! - [`Handle`] and [`HandlePolicy`]: identity of native objects inside the VM
//! - [`StackFrame`] and [`Stack`]: argument access for native calls
//! - [`NativeFunction`] and [`VirtualMachine`]: the boundary traits
//!
//! The marshalling logic itself lives in the `scriptlink` crate; this crate
//! contains no conversion policy.

mod fixed_string;
mod function;
mod handle;
mod object;
mod stack;
mod type_info;
mod variable;
mod vm;

pub use fixed_string::FixedString;
pub use function::{
    ArgumentFunctor, CallbackRef, FunctionFlags, NativeFunction, ScratchArray, StackCallback,
};
pub use handle::{FormId, Handle, HandlePolicy, NativeRef, VmTypeId};
pub use object::{ArrayRef, ObjectRef, ScriptArray, ScriptObject, ScriptStruct, StructRef};
pub use stack::{SliceStack, Stack, StackFrame, StackId};
pub use type_info::{
    ObjectType, RawType, SCRIPT_OBJECT_TYPE, STRUCTURE_TAG_SEPARATOR, StructField, StructType,
    TypeDescriptor, TypeKind,
};
pub use variable::{VarRef, Variable};
pub use vm::{Edition, VirtualMachine};
