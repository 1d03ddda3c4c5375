//! Native function and call-issuance boundary types.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::fixed_string::FixedString;
use crate::stack::{StackFrame, StackId};
use crate::type_info::TypeDescriptor;
use crate::variable::Variable;
use crate::vm::VirtualMachine;

bitflags! {
    /// Registration flags of a native function.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u32 {
        /// The function has no receiver.
        const STATIC = 1 << 0;
        /// The function completes asynchronously.
        const LATENT = 1 << 1;
        /// The function may run on a tasklet (a script thread that is not the
        /// main one).
        const CALLABLE_FROM_TASKLETS = 1 << 2;
    }
}

/// A host function the VM can call.
///
/// The VM owns registered functions and calls
/// [`NativeFunction::marshall_and_dispatch`] with the receiver, the stack frame
/// holding the arguments, and an output slot for the result.
pub trait NativeFunction: Send + Sync {
    /// Name of the script object (class) the function is registered on.
    fn object_name(&self) -> &FixedString;

    /// Name of the function.
    fn name(&self) -> &FixedString;

    /// Descriptor of every parameter, in order.
    fn param_types(&self) -> &[TypeDescriptor];

    /// Descriptor of the result.
    fn return_type(&self) -> &TypeDescriptor;

    fn is_static(&self) -> bool;

    fn is_latent(&self) -> bool;

    /// Whether a callable is attached.
    fn has_stub(&self) -> bool;

    fn param_count(&self) -> u32 {
        u32::try_from(self.param_types().len()).unwrap_or(u32::MAX)
    }

    fn flags(&self) -> FunctionFlags {
        let mut flags = FunctionFlags::empty();
        flags.set(FunctionFlags::STATIC, self.is_static());
        flags.set(FunctionFlags::LATENT, self.is_latent());
        flags
    }

    /// Unpack the receiver and arguments, run the callable, and pack its
    /// result into `result`.
    ///
    /// Returns `false` if the call could not be marshalled.
    fn marshall_and_dispatch(
        &self,
        this: &Variable,
        vm: &dyn VirtualMachine,
        stack_id: StackId,
        result: &mut Variable,
        frame: &StackFrame<'_>,
    ) -> bool;
}

impl fmt::Debug for dyn NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("object", self.object_name())
            .field("name", self.name())
            .field("flags", &self.flags())
            .finish_non_exhaustive()
    }
}

/// Argument list a VM call is issued with.
pub type ScratchArray = Vec<Variable>;

/// Completion callback of an issued call; receives the call's result.
pub trait StackCallback: Send + Sync {
    fn call(&self, result: &Variable);
}

impl<F> StackCallback for F
where
    F: Fn(&Variable) + Send + Sync,
{
    fn call(&self, result: &Variable) {
        (self)(result)
    }
}

pub type CallbackRef = Arc<dyn StackCallback>;

/// Fills the scratch argument list when the VM consumes an issued call.
///
/// The VM invokes the functor exactly once, possibly after the issuing call
/// has returned. Returning `false` aborts the call.
pub struct ArgumentFunctor {
    inner: Box<dyn FnOnce(&dyn VirtualMachine, &mut ScratchArray) -> bool + Send>,
}

impl ArgumentFunctor {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(&dyn VirtualMachine, &mut ScratchArray) -> bool + Send + 'static,
    {
        Self { inner: Box::new(f) }
    }

    /// Fill `scratch` for a call running on `vm`.
    pub fn invoke(self, vm: &dyn VirtualMachine, scratch: &mut ScratchArray) -> bool {
        (self.inner)(vm, scratch)
    }
}

impl fmt::Debug for ArgumentFunctor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArgumentFunctor").finish_non_exhaustive()
    }
}
