//! Outbound calls from the host into the VM.
//!
//! A call is *issued*: the VM queues it and fills the argument list when it
//! gets to it, possibly after the issuing function has returned. Completion is
//! reported through the optional callback. The `bool` returned by every
//! dispatcher says whether the VM accepted the call, not whether it ran.
//!
//! How arguments reach the VM depends on the [`Edition`]:
//!
//! - `NextGen`: the host tuple moves into the argument functor and is packed
//!   when the VM consumes it.
//! - `Legacy`: the tuple is packed before issuing, into a VM-owned `var` array
//!   that moves into the functor and outlives the issuing call.

use crate::codec::{ScriptType, pack_into};
use crate::diagnostics::report_at;
use crate::error::MarshalError;
use crate::vm_ref::VmRef;
use crate::{
    ArgumentFunctor, ArrayRef, CallbackRef, Edition, ObjectRef, ScratchArray, TypeDescriptor,
    Variable, VirtualMachine,
};

/// A host argument list: a tuple of up to ten [`ScriptType`] values.
pub trait IntoArguments: Send + 'static {
    /// Number of arguments.
    const COUNT: usize;

    /// Pack every argument into `scratch`, replacing its contents.
    fn pack_arguments(self, vm: VmRef<'_>, scratch: &mut ScratchArray);
}

macro_rules! impl_into_arguments {
    ($count:expr; $($T:ident $idx:tt),*) => {
        impl<$($T,)*> IntoArguments for ($($T,)*)
        where
            $($T: ScriptType + Send + 'static,)*
        {
            const COUNT: usize = $count;

            #[allow(unused_variables)]
            fn pack_arguments(self, vm: VmRef<'_>, scratch: &mut ScratchArray) {
                scratch.clear();
                scratch.resize(Self::COUNT, Variable::None);
                $(pack_into(vm, self.$idx, &mut scratch[$idx]);)*
            }
        }
    };
}

impl_into_arguments!(0;);
impl_into_arguments!(1; A0 0);
impl_into_arguments!(2; A0 0, A1 1);
impl_into_arguments!(3; A0 0, A1 1, A2 2);
impl_into_arguments!(4; A0 0, A1 1, A2 2, A3 3);
impl_into_arguments!(5; A0 0, A1 1, A2 2, A3 3, A4 4);
impl_into_arguments!(6; A0 0, A1 1, A2 2, A3 3, A4 4, A5 5);
impl_into_arguments!(7; A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6);
impl_into_arguments!(8; A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6, A7 7);
impl_into_arguments!(9; A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6, A7 7, A8 8);
impl_into_arguments!(10; A0 0, A1 1, A2 2, A3 3, A4 4, A5 5, A6 6, A7 7, A8 8, A9 9);

/// Pack `args` into a `var` array owned by the VM.
fn pack_eagerly<A: IntoArguments>(vm: &dyn VirtualMachine, args: A) -> Result<ArrayRef, MarshalError> {
    let size = u32::try_from(A::COUNT).map_err(|_| MarshalError::ValueOutOfRange {
        value: A::COUNT.to_string(),
        target: "argument count",
    })?;
    let holder = vm
        .create_array(&TypeDescriptor::var(), size)
        .ok_or_else(|| MarshalError::AllocationFailed {
            what: format!("argument array of {size}"),
        })?;
    let mut scratch = ScratchArray::with_capacity(A::COUNT);
    args.pack_arguments(VmRef::new(vm), &mut scratch);
    for (index, value) in scratch.into_iter().enumerate() {
        holder.set(index, value);
    }
    Ok(holder)
}

fn variadic_functor<A: IntoArguments>(vm: &dyn VirtualMachine, args: A) -> Result<ArgumentFunctor, MarshalError> {
    match vm.edition() {
        Edition::NextGen => Ok(ArgumentFunctor::new(move |vm, scratch| {
            args.pack_arguments(VmRef::new(vm), scratch);
            true
        })),
        Edition::Legacy => {
            let holder = pack_eagerly(vm, args)?;
            Ok(ArgumentFunctor::new(move |_vm, scratch| {
                *scratch = holder.to_vec();
                true
            }))
        }
    }
}

fn applied_functor(args: &[Variable]) -> ArgumentFunctor {
    let args = args.to_vec();
    ArgumentFunctor::new(move |_vm, scratch| {
        *scratch = args;
        true
    })
}

fn issue_static(
    vm: &dyn VirtualMachine,
    object: &str,
    function: &str,
    functor: ArgumentFunctor,
    callback: Option<CallbackRef>,
) -> bool {
    let issued = vm.issue_static_call(object, function, functor, callback);
    tracing::debug!(target: "scriptlink::dispatch", object, function, issued, "static call");
    issued
}

fn issue_method(
    vm: &dyn VirtualMachine,
    object: &ObjectRef,
    function: &str,
    functor: ArgumentFunctor,
    callback: Option<CallbackRef>,
) -> bool {
    let issued = vm.issue_method_call(object, function, functor, callback);
    tracing::debug!(
        target: "scriptlink::dispatch",
        class = %object.class().name(),
        handle = %object.handle(),
        function,
        issued,
        "method call"
    );
    issued
}

/// Call the static function `object.function` with host arguments.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn dispatch_static_call<A: IntoArguments>(
    vm: &dyn VirtualMachine,
    object: &str,
    function: &str,
    callback: Option<CallbackRef>,
    args: A,
) -> bool {
    match variadic_functor(vm, args) {
        Ok(functor) => issue_static(vm, object, function, functor, callback),
        Err(err) => {
            report_at!("scriptlink::dispatch", err);
            false
        }
    }
}

/// Call `function` on the VM object `object` with host arguments.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn dispatch_method_call<A: IntoArguments>(
    vm: &dyn VirtualMachine,
    object: &ObjectRef,
    function: &str,
    callback: Option<CallbackRef>,
    args: A,
) -> bool {
    match variadic_functor(vm, args) {
        Ok(functor) => issue_method(vm, object, function, functor, callback),
        Err(err) => {
            report_at!("scriptlink::dispatch", err);
            false
        }
    }
}

/// Call the static function `object.function` with already packed arguments.
pub fn dispatch_applied_static_call(
    vm: &dyn VirtualMachine,
    object: &str,
    function: &str,
    callback: Option<CallbackRef>,
    args: &[Variable],
) -> bool {
    issue_static(vm, object, function, applied_functor(args), callback)
}

/// Call `function` on `object` with already packed arguments.
pub fn dispatch_applied_method_call(
    vm: &dyn VirtualMachine,
    object: &ObjectRef,
    function: &str,
    callback: Option<CallbackRef>,
    args: &[Variable],
) -> bool {
    issue_method(vm, object, function, applied_functor(args), callback)
}
