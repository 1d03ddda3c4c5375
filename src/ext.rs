//! Convenience methods on any [`VirtualMachine`].

use crate::dispatch::{self, IntoArguments};
use crate::native_fn::{IntoNativeFn, IntoVmNativeFn, NativeFunctionBinding};
use crate::vm_ref::VmRef;
use crate::{CallbackRef, NativeFunction, ObjectRef, Variable, VirtualMachine};

/// Registration and call helpers layered over [`VirtualMachine`].
///
/// ```
/// use scriptlink::prelude::*;
/// use scriptlink_registry::MemoryVm;
///
/// let vm = MemoryVm::builder().build().unwrap();
/// assert!(vm.register_function("Utility", "Double", |_: Static, n: i32| n * 2, Some(true), false));
/// assert!(vm.dispatch_static_call("Utility", "Double", None, (21,)));
/// assert_eq!(vm.run_pending(), 1);
/// ```
pub trait VirtualMachineExt {
    fn as_dyn_vm(&self) -> &dyn VirtualMachine;

    /// Bind `callable` as `object.function`.
    ///
    /// Parameter and return types are resolved against this VM first. When
    /// `tasklet_callable` is set and the VM accepted the binding, the
    /// function's tasklet flag is updated. Returns whether the VM accepted it.
    fn register_function<F, M>(
        &self,
        object: &str,
        function: &str,
        callable: F,
        tasklet_callable: Option<bool>,
        latent: bool,
    ) -> bool
    where
        F: IntoNativeFn<M>,
    {
        let binding = NativeFunctionBinding::new(object, function, callable, latent);
        register_binding(self.as_dyn_vm(), binding, tasklet_callable)
    }

    /// [`register_function`](Self::register_function) for callables that take
    /// the VM and stack id ahead of the receiver.
    fn register_function_with_vm<F, M>(
        &self,
        object: &str,
        function: &str,
        callable: F,
        tasklet_callable: Option<bool>,
        latent: bool,
    ) -> bool
    where
        F: IntoVmNativeFn<M>,
    {
        let binding = NativeFunctionBinding::new_with_vm(object, function, callable, latent);
        register_binding(self.as_dyn_vm(), binding, tasklet_callable)
    }

    fn dispatch_static_call<A: IntoArguments>(
        &self,
        object: &str,
        function: &str,
        callback: Option<CallbackRef>,
        args: A,
    ) -> bool {
        dispatch::dispatch_static_call(self.as_dyn_vm(), object, function, callback, args)
    }

    fn dispatch_method_call<A: IntoArguments>(
        &self,
        object: &ObjectRef,
        function: &str,
        callback: Option<CallbackRef>,
        args: A,
    ) -> bool {
        dispatch::dispatch_method_call(self.as_dyn_vm(), object, function, callback, args)
    }

    fn dispatch_applied_static_call(
        &self,
        object: &str,
        function: &str,
        callback: Option<CallbackRef>,
        args: &[Variable],
    ) -> bool {
        dispatch::dispatch_applied_static_call(self.as_dyn_vm(), object, function, callback, args)
    }

    fn dispatch_applied_method_call(
        &self,
        object: &ObjectRef,
        function: &str,
        callback: Option<CallbackRef>,
        args: &[Variable],
    ) -> bool {
        dispatch::dispatch_applied_method_call(self.as_dyn_vm(), object, function, callback, args)
    }
}

impl<V: VirtualMachine> VirtualMachineExt for V {
    fn as_dyn_vm(&self) -> &dyn VirtualMachine {
        self
    }
}

impl VirtualMachineExt for dyn VirtualMachine + '_ {
    fn as_dyn_vm(&self) -> &dyn VirtualMachine {
        self
    }
}

fn register_binding(
    vm: &dyn VirtualMachine,
    mut binding: NativeFunctionBinding,
    tasklet_callable: Option<bool>,
) -> bool {
    binding.resolve_types(VmRef::new(vm));
    let object = binding.object_name().clone();
    let function = binding.name().clone();

    if !vm.bind_native_method(Box::new(binding)) {
        tracing::warn!(
            target: "scriptlink::native",
            "failed to register method \"{function}\" on object \"{object}\""
        );
        return false;
    }

    if let Some(callable) = tasklet_callable {
        vm.set_callable_from_tasklets(&object, &function, callable);
    }
    tracing::debug!(target: "scriptlink::native", %object, %function, "registered native function");
    true
}
