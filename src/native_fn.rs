//! Host callables exposed to the VM.
//!
//! A [`NativeFunctionBinding`] wraps a Rust closure or function as a VM
//! [`NativeFunction`]. The callable's shape is checked by trait bounds when the
//! binding is built:
//!
//! - the first parameter is the receiver and implements [`ScriptSelf`]
//!   ([`Static`] for functions without one);
//! - every other parameter implements [`ScriptType`];
//! - the result implements [`ScriptReturn`] (any `ScriptType`, or `()`).
//!
//! The long form additionally receives the calling VM and stack id first:
//!
//! ```
//! use scriptlink::{NativeFunction, NativeFunctionBinding, StackId, Static, VirtualMachine};
//!
//! let add = NativeFunctionBinding::new("Math", "Add", |_: Static, a: i32, b: i32| a + b, false);
//! assert_eq!(add.param_count(), 2);
//! assert!(add.is_static());
//!
//! let wait = NativeFunctionBinding::new_with_vm(
//!     "Utility",
//!     "Wait",
//!     |_vm: &dyn VirtualMachine, _stack: StackId, _: Static, _seconds: f32| {},
//!     true,
//! );
//! assert!(wait.is_latent());
//! ```
//!
//! Receivers must be one of the supported self forms:
//!
//! ```compile_fail,E0277
//! use scriptlink::NativeFunctionBinding;
//!
//! let _ = NativeFunctionBinding::new("Math", "Abs", |this: i32| this.abs(), false);
//! ```
//!
//! and results must have a VM representation:
//!
//! ```compile_fail,E0277
//! use scriptlink::{NativeFunctionBinding, Static};
//!
//! let _ = NativeFunctionBinding::new("Math", "Pair", |_: Static| (1, 2), false);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::codec::{NativeObject, RefOrInventory, ScriptType, pack_into, unpack};
use crate::diagnostics::report_at;
use crate::error::MarshalError;
use crate::resolver;
use crate::vm_ref::VmRef;
use crate::{
    FixedString, NativeFunction, ObjectRef, StackFrame, StackId, TypeDescriptor, Variable,
    VirtualMachine,
};

/// Receiver of a function that has none.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Static;

/// A receiver form.
pub trait ScriptSelf: Sized {
    /// Whether functions with this receiver are static.
    const STATIC: bool = false;

    /// Resolve the receiver out of `this`. `None` means the receiver is null
    /// and the callable must not run.
    fn resolve(vm: VmRef<'_>, this: &Variable) -> Option<Self>;
}

impl ScriptSelf for Static {
    const STATIC: bool = true;

    fn resolve(_vm: VmRef<'_>, _this: &Variable) -> Option<Self> {
        Some(Static)
    }
}

impl<T: NativeObject> ScriptSelf for Arc<T> {
    fn resolve(vm: VmRef<'_>, this: &Variable) -> Option<Self> {
        unpack::<Option<Arc<T>>>(vm, this)
    }
}

impl ScriptSelf for ObjectRef {
    fn resolve(_vm: VmRef<'_>, this: &Variable) -> Option<Self> {
        this.as_object().cloned()
    }
}

impl ScriptSelf for RefOrInventory {
    fn resolve(vm: VmRef<'_>, this: &Variable) -> Option<Self> {
        Some(unpack(vm, this))
    }
}

/// A function result.
pub trait ScriptReturn {
    fn descriptor(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError>;

    fn pack_result(self, vm: VmRef<'_>, dst: &mut Variable);
}

impl<T: ScriptType> ScriptReturn for T {
    fn descriptor(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
        T::descriptor(vm)
    }

    fn pack_result(self, vm: VmRef<'_>, dst: &mut Variable) {
        pack_into(vm, self, dst);
    }
}

impl ScriptReturn for () {
    fn descriptor(_vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
        Ok(TypeDescriptor::none())
    }

    fn pack_result(self, _vm: VmRef<'_>, _dst: &mut Variable) {}
}

/// Everything a stub needs for one call.
struct Invocation<'a, 'f> {
    vm: &'a dyn VirtualMachine,
    stack_id: StackId,
    this: &'a Variable,
    frame: &'a StackFrame<'f>,
    result: &'a mut Variable,
    object: &'a FixedString,
    function: &'a FixedString,
}

impl Invocation<'_, '_> {
    fn qualified_name(&self) -> String {
        format!("{}.{}", self.object, self.function)
    }

    fn receiver<S: ScriptSelf>(&self) -> Option<S> {
        let this = S::resolve(VmRef::new(self.vm), self.this);
        if this.is_none() {
            report_at!(
                "scriptlink::native",
                MarshalError::NullSelf {
                    function: self.qualified_name(),
                }
            );
        }
        this
    }

    /// Unpack the next argument, substituting the default past the end of the
    /// frame.
    fn argument<A: ScriptType>(&self, index: &mut u32) -> A {
        let position = *index;
        *index += 1;
        match self.frame.argument(position) {
            Some(value) => unpack(VmRef::new(self.vm), &value),
            None => {
                report_at!(
                    "scriptlink::native",
                    MarshalError::MissingArgument {
                        index: position,
                        count: self.frame.size,
                    }
                );
                A::default()
            }
        }
    }

    fn finish<R: ScriptReturn>(self, value: R) {
        value.pack_result(VmRef::new(self.vm), self.result);
    }
}

type Resolver = fn(VmRef<'_>) -> Option<TypeDescriptor>;
type Call = Box<dyn Fn(Invocation<'_, '_>) -> bool + Send + Sync>;

fn param_resolver<A: ScriptType>(vm: VmRef<'_>) -> Option<TypeDescriptor> {
    resolver::type_descriptor::<A>(vm)
}

fn return_resolver<R: ScriptReturn>(vm: VmRef<'_>) -> Option<TypeDescriptor> {
    resolver::return_descriptor::<R>(vm)
}

/// A type-erased callable plus the shape it was built from.
pub struct NativeStub {
    is_static: bool,
    params: Vec<Resolver>,
    ret: Resolver,
    call: Call,
}

/// Callables of the short form `Fn(Self, A0, .., An) -> R`.
pub trait IntoNativeFn<Marker>: Send + Sync + 'static {
    fn into_stub(self) -> NativeStub;
}

/// Callables of the long form
/// `Fn(&dyn VirtualMachine, StackId, Self, A0, .., An) -> R`.
pub trait IntoVmNativeFn<Marker>: Send + Sync + 'static {
    fn into_stub(self) -> NativeStub;
}

macro_rules! impl_native_fn {
    ($($arg:ident),*) => {
        impl<Func, S, R, $($arg,)*> IntoNativeFn<(S, R, $($arg,)*)> for Func
        where
            Func: Fn(S, $($arg),*) -> R + Send + Sync + 'static,
            S: ScriptSelf + 'static,
            R: ScriptReturn + 'static,
            $($arg: ScriptType + 'static,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_stub(self) -> NativeStub {
                NativeStub {
                    is_static: S::STATIC,
                    params: vec![$(param_resolver::<$arg> as Resolver),*],
                    ret: return_resolver::<R>,
                    call: Box::new(move |invocation: Invocation<'_, '_>| {
                        let Some(this) = invocation.receiver::<S>() else {
                            return false;
                        };
                        let mut index = 0u32;
                        $(let $arg = invocation.argument::<$arg>(&mut index);)*
                        let value = (self)(this, $($arg),*);
                        invocation.finish(value);
                        true
                    }),
                }
            }
        }

        impl<Func, S, R, $($arg,)*> IntoVmNativeFn<(S, R, $($arg,)*)> for Func
        where
            Func: Fn(&dyn VirtualMachine, StackId, S, $($arg),*) -> R + Send + Sync + 'static,
            S: ScriptSelf + 'static,
            R: ScriptReturn + 'static,
            $($arg: ScriptType + 'static,)*
        {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            fn into_stub(self) -> NativeStub {
                NativeStub {
                    is_static: S::STATIC,
                    params: vec![$(param_resolver::<$arg> as Resolver),*],
                    ret: return_resolver::<R>,
                    call: Box::new(move |invocation: Invocation<'_, '_>| {
                        let Some(this) = invocation.receiver::<S>() else {
                            return false;
                        };
                        let mut index = 0u32;
                        $(let $arg = invocation.argument::<$arg>(&mut index);)*
                        let value = (self)(invocation.vm, invocation.stack_id, this, $($arg),*);
                        invocation.finish(value);
                        true
                    }),
                }
            }
        }
    };
}

impl_native_fn!();
impl_native_fn!(A0);
impl_native_fn!(A0, A1);
impl_native_fn!(A0, A1, A2);
impl_native_fn!(A0, A1, A2, A3);
impl_native_fn!(A0, A1, A2, A3, A4);
impl_native_fn!(A0, A1, A2, A3, A4, A5);
impl_native_fn!(A0, A1, A2, A3, A4, A5, A6);
impl_native_fn!(A0, A1, A2, A3, A4, A5, A6, A7);

/// A host callable registered as a VM function.
///
/// Parameter and return descriptors start as `none` and are filled in by
/// [`NativeFunctionBinding::resolve_types`], normally at registration (see
/// [`VirtualMachineExt::register_function`](crate::VirtualMachineExt::register_function)).
pub struct NativeFunctionBinding {
    object: FixedString,
    name: FixedString,
    latent: bool,
    params: Vec<TypeDescriptor>,
    ret: TypeDescriptor,
    stub: NativeStub,
}

impl NativeFunctionBinding {
    /// Bind a short-form callable.
    pub fn new<F, M>(
        object: impl Into<FixedString>,
        function: impl Into<FixedString>,
        callable: F,
        latent: bool,
    ) -> Self
    where
        F: IntoNativeFn<M>,
    {
        Self::from_stub(object.into(), function.into(), IntoNativeFn::into_stub(callable), latent)
    }

    /// Bind a long-form callable, which also receives the VM and stack id.
    pub fn new_with_vm<F, M>(
        object: impl Into<FixedString>,
        function: impl Into<FixedString>,
        callable: F,
        latent: bool,
    ) -> Self
    where
        F: IntoVmNativeFn<M>,
    {
        Self::from_stub(object.into(), function.into(), IntoVmNativeFn::into_stub(callable), latent)
    }

    fn from_stub(object: FixedString, name: FixedString, stub: NativeStub, latent: bool) -> Self {
        Self {
            object,
            name,
            latent,
            params: vec![TypeDescriptor::none(); stub.params.len()],
            ret: TypeDescriptor::none(),
            stub,
        }
    }

    /// Resolve parameter and return descriptors against `vm`. Types the VM
    /// cannot resolve stay `none` (and are reported).
    pub fn resolve_types(&mut self, vm: VmRef<'_>) {
        self.params = self
            .stub
            .params
            .iter()
            .map(|resolve| resolve(vm).unwrap_or_default())
            .collect();
        self.ret = (self.stub.ret)(vm).unwrap_or_default();
    }

    /// `Object.Function`.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.object, self.name)
    }
}

impl NativeFunction for NativeFunctionBinding {
    fn object_name(&self) -> &FixedString {
        &self.object
    }

    fn name(&self) -> &FixedString {
        &self.name
    }

    fn param_types(&self) -> &[TypeDescriptor] {
        &self.params
    }

    fn return_type(&self) -> &TypeDescriptor {
        &self.ret
    }

    fn is_static(&self) -> bool {
        self.stub.is_static
    }

    fn is_latent(&self) -> bool {
        self.latent
    }

    fn has_stub(&self) -> bool {
        true
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    fn marshall_and_dispatch(
        &self,
        this: &Variable,
        vm: &dyn VirtualMachine,
        stack_id: StackId,
        result: &mut Variable,
        frame: &StackFrame<'_>,
    ) -> bool {
        *result = Variable::None;

        if frame.parent.is_none() {
            report_at!(
                "scriptlink::native",
                MarshalError::MissingStack {
                    function: self.qualified_name(),
                }
            );
            return false;
        }

        tracing::trace!(
            target: "scriptlink::native",
            object = %self.object,
            function = %self.name,
            stack_id,
            args = frame.size,
            "native call"
        );

        (self.stub.call)(Invocation {
            vm,
            stack_id,
            this,
            frame,
            result,
            object: &self.object,
            function: &self.name,
        })
    }
}

impl fmt::Debug for NativeFunctionBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunctionBinding")
            .field("object", &self.object)
            .field("name", &self.name)
            .field("static", &self.stub.is_static)
            .field("latent", &self.latent)
            .field("params", &self.params.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics;
    use crate::{SliceStack, StackFrame};

    #[test]
    fn shape_is_captured() {
        let binding = NativeFunctionBinding::new(
            "Debug",
            "Trace",
            |_: Static, _message: String, _severity: i32| {},
            false,
        );
        assert_eq!(binding.object_name(), "Debug");
        assert_eq!(binding.name(), "Trace");
        assert_eq!(binding.param_count(), 2);
        assert!(binding.is_static());
        assert!(!binding.is_latent());
        assert!(binding.has_stub());
        assert_eq!(binding.qualified_name(), "Debug.Trace");
    }

    #[test]
    fn descriptors_resolve_at_registration() {
        let mut binding =
            NativeFunctionBinding::new("Math", "Sum", |_: Static, values: Vec<i32>| values.iter().sum::<i32>(), false);
        assert_eq!(binding.param_types(), &[TypeDescriptor::none()]);
        binding.resolve_types(VmRef::none());
        assert_eq!(binding.param_types(), &[TypeDescriptor::int().array_of().unwrap()]);
        assert_eq!(binding.return_type(), &TypeDescriptor::int());
    }

    #[test]
    fn method_receivers_are_not_static() {
        let binding = NativeFunctionBinding::new("Quest", "Start", |_: ObjectRef| true, false);
        assert!(!binding.is_static());
        let binding = NativeFunctionBinding::new("ObjectReference", "Enable", |_: RefOrInventory| {}, true);
        assert!(!binding.is_static());
        assert!(binding.is_latent());
    }

    #[test]
    fn missing_stack_fails_without_running() {
        diagnostics::take_failures();
        let binding = NativeFunctionBinding::new("Math", "Five", |_: Static| 5, false);
        let mut result = Variable::Int(1);
        let frame = StackFrame::detached(0);
        let vm = NoVm;
        assert!(!binding.marshall_and_dispatch(&Variable::None, &vm, 0, &mut result, &frame));
        assert!(result.is_none());
        assert_eq!(diagnostics::take_failures(), 1);
    }

    #[test]
    fn arguments_are_unpacked_in_order() {
        let binding =
            NativeFunctionBinding::new("Math", "Sub", |_: Static, a: i32, b: i32| a - b, false);
        let stack = SliceStack::new(vec![Variable::Int(10), Variable::Int(3)]);
        let mut result = Variable::None;
        assert!(binding.marshall_and_dispatch(&Variable::None, &NoVm, 0, &mut result, &stack.frame()));
        assert_eq!(result, Variable::Int(7));
    }

    #[test]
    fn short_frames_default_the_rest() {
        diagnostics::take_failures();
        let binding =
            NativeFunctionBinding::new("Math", "Sub", |_: Static, a: i32, b: i32| a - b, false);
        let stack = SliceStack::new(vec![Variable::Int(10)]);
        let mut result = Variable::None;
        assert!(binding.marshall_and_dispatch(&Variable::None, &NoVm, 0, &mut result, &stack.frame()));
        assert_eq!(result, Variable::Int(10));
        assert_eq!(diagnostics::take_failures(), 1);
    }

    #[test]
    fn null_vm_object_self_does_not_run() {
        diagnostics::take_failures();
        let ran = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let binding = NativeFunctionBinding::new(
            "Quest",
            "Stop",
            move |_: ObjectRef| flag.store(true, std::sync::atomic::Ordering::SeqCst),
            false,
        );
        let stack = SliceStack::default();
        let mut result = Variable::None;
        assert!(!binding.marshall_and_dispatch(
            &Variable::null_object(None),
            &NoVm,
            0,
            &mut result,
            &stack.frame()
        ));
        assert!(!ran.load(std::sync::atomic::Ordering::SeqCst));
        assert_eq!(diagnostics::take_failures(), 1);
    }

    /// A VM with nothing registered; enough for scalar-only calls.
    struct NoVm;

    impl VirtualMachine for NoVm {
        fn edition(&self) -> crate::Edition {
            crate::Edition::NextGen
        }
        fn object_type_by_id(&self, _: crate::VmTypeId) -> Option<Arc<crate::ObjectType>> {
            None
        }
        fn object_type_by_name(&self, _: &str) -> Option<Arc<crate::ObjectType>> {
            None
        }
        fn struct_type_by_name(&self, _: &str) -> Option<Arc<crate::StructType>> {
            None
        }
        fn create_struct(&self, _: &str) -> Option<crate::StructRef> {
            None
        }
        fn create_array(&self, _: &TypeDescriptor, _: u32) -> Option<crate::ArrayRef> {
            None
        }
        fn create_object(&self, _: &Arc<crate::ObjectType>) -> Option<ObjectRef> {
            None
        }
        fn find_bound_object(&self, _: crate::Handle, _: &crate::ObjectType) -> Option<ObjectRef> {
            None
        }
        fn bind_object(&self, _: &ObjectRef, _: crate::Handle) -> bool {
            false
        }
        fn bind_inventory_object(&self, _: &ObjectRef, _: crate::FormId, _: u16, _: crate::Handle) -> bool {
            false
        }
        fn handle_policy(&self) -> &dyn crate::HandlePolicy {
            self
        }
        fn bind_native_method(&self, _: Box<dyn NativeFunction>) -> bool {
            false
        }
        fn set_callable_from_tasklets(&self, _: &str, _: &str, _: bool) {}
        fn issue_static_call(
            &self,
            _: &str,
            _: &str,
            _: crate::ArgumentFunctor,
            _: Option<crate::CallbackRef>,
        ) -> bool {
            false
        }
        fn issue_method_call(
            &self,
            _: &ObjectRef,
            _: &str,
            _: crate::ArgumentFunctor,
            _: Option<crate::CallbackRef>,
        ) -> bool {
            false
        }
    }

    impl crate::HandlePolicy for NoVm {
        fn reference_type(&self) -> crate::VmTypeId {
            crate::VmTypeId::new(0x40)
        }
        fn active_effect_type(&self) -> crate::VmTypeId {
            crate::VmTypeId::new(0x22)
        }
        fn handle_for_object(&self, _: crate::VmTypeId, _: &crate::NativeRef) -> crate::Handle {
            crate::Handle::EMPTY
        }
        fn is_handle_loaded(&self, _: crate::Handle) -> bool {
            false
        }
        fn handle_is_type(&self, _: crate::VmTypeId, _: crate::Handle) -> bool {
            false
        }
        fn object_for_handle(&self, _: crate::VmTypeId, _: crate::Handle) -> Option<crate::NativeRef> {
            None
        }
    }
}
