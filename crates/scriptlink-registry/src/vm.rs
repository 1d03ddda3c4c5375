//! The in-memory virtual machine.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use xxhash_rust::xxh64::xxh64;

use scriptlink_core::{
    ArgumentFunctor, ArrayRef, CallbackRef, Edition, FormId, FunctionFlags, Handle,
    HandlePolicy, NativeFunction, ObjectRef, ObjectType, SCRIPT_OBJECT_TYPE, ScriptArray,
    ScriptObject, ScriptStruct, SliceStack, StackId, StructRef, StructType, TypeDescriptor,
    Variable, VirtualMachine, VmTypeId,
};

use crate::error::RegistryError;
use crate::policy::MemoryHandlePolicy;
use crate::types::TypeTable;

/// Default type id of world object references.
pub const DEFAULT_REFERENCE_TYPE: VmTypeId = VmTypeId::new(0x40);
/// Default type id of active effects.
pub const DEFAULT_ACTIVE_EFFECT_TYPE: VmTypeId = VmTypeId::new(0x8D);

/// Hash key of `object.function`, ignoring ASCII case.
pub fn function_key(object: &str, function: &str) -> u64 {
    let qualified = format!("{object}.{function}").to_ascii_lowercase();
    xxh64(qualified.as_bytes(), 0)
}

struct FunctionEntry {
    function: Arc<dyn NativeFunction>,
    flags: FunctionFlags,
}

enum Receiver {
    Static,
    Method(ObjectRef),
}

struct PendingCall {
    receiver: Receiver,
    function: Arc<dyn NativeFunction>,
    args: ArgumentFunctor,
    callback: Option<CallbackRef>,
}

#[derive(Default)]
struct BoundObjects {
    by_handle: FxHashMap<Handle, Vec<ObjectRef>>,
    inventory: FxHashMap<Handle, (FormId, u16)>,
}

/// Configuration of a [`MemoryVm`].
///
/// ```
/// use scriptlink_core::Edition;
/// use scriptlink_registry::MemoryVm;
///
/// let vm = MemoryVm::builder()
///     .edition(Edition::Legacy)
///     .object("Form", Some(0x04), None)
///     .object("ObjectReference", Some(0x40), Some("Form"))
///     .object("ActiveMagicEffect", Some(0x8D), Some("Form"))
///     .structure("Actor", "Stats", [("Health", "Int"), ("Tags", "String[]")])
///     .build()
///     .unwrap();
///
/// assert_eq!(vm.types().structure_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryVmBuilder {
    edition: Edition,
    objects: Vec<(String, Option<u32>, Option<String>)>,
    structures: Vec<(String, String, Vec<(String, String)>)>,
    reference_type: Option<u32>,
    active_effect_type: Option<u32>,
}

impl MemoryVmBuilder {
    pub fn edition(mut self, edition: Edition) -> Self {
        self.edition = edition;
        self
    }

    /// Declare an object type. Parents must be declared first.
    pub fn object(mut self, name: &str, type_id: Option<u32>, parent: Option<&str>) -> Self {
        self.objects
            .push((name.to_owned(), type_id, parent.map(str::to_owned)));
        self
    }

    /// Declare the structure `owner#name` with `(field, type)` pairs.
    pub fn structure<I, F, T>(mut self, owner: &str, name: &str, fields: I) -> Self
    where
        I: IntoIterator<Item = (F, T)>,
        F: Into<String>,
        T: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(field, ty)| (field.into(), ty.into()))
            .collect();
        self.structures
            .push((owner.to_owned(), name.to_owned(), fields));
        self
    }

    /// Type id of object references. Defaults to [`DEFAULT_REFERENCE_TYPE`].
    pub fn reference_type(mut self, type_id: u32) -> Self {
        self.reference_type = Some(type_id);
        self
    }

    /// Type id of active effects. Defaults to
    /// [`DEFAULT_ACTIVE_EFFECT_TYPE`].
    pub fn active_effect_type(mut self, type_id: u32) -> Self {
        self.active_effect_type = Some(type_id);
        self
    }

    /// Register every declaration. `ScriptObject` is always present.
    ///
    /// Explicitly configured reference and active-effect type ids must name
    /// declared object types.
    pub fn build(self) -> Result<MemoryVm, RegistryError> {
        let mut types = TypeTable::new();
        types.register_object(SCRIPT_OBJECT_TYPE, None, None)?;
        for (name, type_id, parent) in &self.objects {
            types.register_object(name, type_id.map(VmTypeId::new), parent.as_deref())?;
        }
        for (owner, name, fields) in &self.structures {
            types.register_structure(owner, name, fields)?;
        }

        let role = |role: &'static str, configured: Option<u32>, default: VmTypeId| match configured {
            Some(id) if types.object_by_id(VmTypeId::new(id)).is_none() => {
                Err(RegistryError::UndeclaredRoleType { role, id })
            }
            Some(id) => Ok(VmTypeId::new(id)),
            None => Ok(default),
        };
        let reference = role("reference", self.reference_type, DEFAULT_REFERENCE_TYPE)?;
        let effect = role(
            "active effect",
            self.active_effect_type,
            DEFAULT_ACTIVE_EFFECT_TYPE,
        )?;

        tracing::debug!(
            target: "scriptlink_registry",
            edition = ?self.edition,
            objects = types.object_count(),
            structures = types.structure_count(),
            "built in-memory VM"
        );

        Ok(MemoryVm {
            edition: self.edition,
            types,
            policy: MemoryHandlePolicy::new(reference, effect),
            bound: RwLock::new(BoundObjects::default()),
            functions: RwLock::new(FxHashMap::default()),
            pending: Mutex::new(VecDeque::new()),
            next_stack: AtomicU32::new(1),
        })
    }
}

/// A self-contained [`VirtualMachine`] holding its types, bound objects and
/// native functions in memory.
///
/// Issued calls are queued and run by [`MemoryVm::run_pending`] on the
/// caller's thread, which stands in for the VM's own scheduler.
pub struct MemoryVm {
    edition: Edition,
    types: TypeTable,
    policy: MemoryHandlePolicy,
    bound: RwLock<BoundObjects>,
    functions: RwLock<FxHashMap<u64, FunctionEntry>>,
    pending: Mutex<VecDeque<PendingCall>>,
    next_stack: AtomicU32,
}

impl MemoryVm {
    pub fn builder() -> MemoryVmBuilder {
        MemoryVmBuilder::default()
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// The concrete handle policy, for registering host objects.
    pub fn natives(&self) -> &MemoryHandlePolicy {
        &self.policy
    }

    /// Bind a native function, failing on duplicates.
    pub fn try_bind_native_method(
        &self,
        function: Box<dyn NativeFunction>,
    ) -> Result<(), RegistryError> {
        let key = function_key(function.object_name(), function.name());
        let mut functions = self.functions.write();
        if functions.contains_key(&key) {
            return Err(RegistryError::DuplicateFunction(format!(
                "{}.{}",
                function.object_name(),
                function.name()
            )));
        }
        let flags = function.flags();
        functions.insert(
            key,
            FunctionEntry {
                function: Arc::from(function),
                flags,
            },
        );
        Ok(())
    }

    /// The bound native function `object.function`.
    pub fn function(&self, object: &str, function: &str) -> Option<Arc<dyn NativeFunction>> {
        self.functions
            .read()
            .get(&function_key(object, function))
            .map(|entry| Arc::clone(&entry.function))
    }

    pub fn function_flags(&self, object: &str, function: &str) -> Option<FunctionFlags> {
        self.functions
            .read()
            .get(&function_key(object, function))
            .map(|entry| entry.flags)
    }

    pub fn function_count(&self) -> usize {
        self.functions.read().len()
    }

    /// Resolve a method on `class`, walking up its parents.
    fn method(&self, class: &ObjectType, function: &str) -> Option<Arc<dyn NativeFunction>> {
        let mut current = Some(class);
        while let Some(class) = current {
            if let Some(found) = self.function(class.name(), function) {
                return Some(found);
            }
            current = class.parent().map(Arc::as_ref);
        }
        None
    }

    /// Container and unique id an object was bound with as an inventory item.
    pub fn inventory_binding(&self, handle: Handle) -> Option<(FormId, u16)> {
        self.bound.read().inventory.get(&handle).copied()
    }

    /// Detach every VM object bound to `handle`, returning how many were
    /// bound. The objects are left unbound and may be bound again.
    pub fn unbind_object(&self, handle: Handle) -> usize {
        let mut bound = self.bound.write();
        bound.inventory.remove(&handle);
        let objects = bound.by_handle.remove(&handle).unwrap_or_default();
        for object in &objects {
            object.set_handle(Handle::EMPTY);
        }
        tracing::trace!(target: "scriptlink_registry", ?handle, count = objects.len(), "unbound objects");
        objects.len()
    }

    pub fn pending_calls(&self) -> usize {
        self.pending.lock().len()
    }

    /// Call a bound native function directly, bypassing the queue.
    pub fn call_native(
        &self,
        object: &str,
        function: &str,
        this: &Variable,
        args: Vec<Variable>,
    ) -> Option<Variable> {
        let native = self.function(object, function)?;
        let stack = SliceStack::new(args);
        let mut result = Variable::None;
        native
            .marshall_and_dispatch(this, self, self.new_stack_id(), &mut result, &stack.frame())
            .then_some(result)
    }

    /// Run every queued call in issue order, including calls issued while
    /// running. Returns how many calls ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Released before running so callables may issue further calls.
            let Some(call) = self.pending.lock().pop_front() else {
                break;
            };
            self.run(call);
            ran += 1;
        }
        ran
    }

    fn run(&self, call: PendingCall) {
        let mut scratch = Vec::new();
        if !call.args.invoke(self, &mut scratch) {
            tracing::warn!(
                target: "scriptlink_registry",
                function = %call.function.name(),
                "argument functor aborted the call"
            );
            return;
        }

        let this = match &call.receiver {
            Receiver::Static => Variable::None,
            Receiver::Method(object) => {
                let mut this = Variable::object(Arc::clone(object));
                this.set_complex_type(Arc::clone(object.class()));
                this
            }
        };
        let stack = SliceStack::new(scratch);
        let mut result = Variable::None;
        let stack_id = self.new_stack_id();
        let ok = call
            .function
            .marshall_and_dispatch(&this, self, stack_id, &mut result, &stack.frame());
        tracing::trace!(
            target: "scriptlink_registry",
            object = %call.function.object_name(),
            function = %call.function.name(),
            stack_id,
            ok,
            "ran queued call"
        );

        if let Some(callback) = call.callback {
            callback.call(&result);
        }
    }

    fn new_stack_id(&self) -> StackId {
        self.next_stack.fetch_add(1, Ordering::Relaxed)
    }

    fn enqueue(&self, call: PendingCall) {
        self.pending.lock().push_back(call);
    }
}

impl fmt::Debug for MemoryVm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryVm")
            .field("edition", &self.edition)
            .field("objects", &self.types.object_count())
            .field("structures", &self.types.structure_count())
            .field("functions", &self.function_count())
            .field("pending", &self.pending_calls())
            .finish_non_exhaustive()
    }
}

impl VirtualMachine for MemoryVm {
    fn edition(&self) -> Edition {
        self.edition
    }

    fn object_type_by_id(&self, type_id: VmTypeId) -> Option<Arc<ObjectType>> {
        self.types.object_by_id(type_id).cloned()
    }

    fn object_type_by_name(&self, name: &str) -> Option<Arc<ObjectType>> {
        self.types.object_by_name(name).cloned()
    }

    fn struct_type_by_name(&self, name: &str) -> Option<Arc<StructType>> {
        self.types.structure(name).cloned()
    }

    fn create_struct(&self, name: &str) -> Option<StructRef> {
        let ty = self.types.structure(name)?;
        Some(Arc::new(ScriptStruct::new(Arc::clone(ty))))
    }

    fn create_array(&self, element: &TypeDescriptor, size: u32) -> Option<ArrayRef> {
        if element.is_array() || element.is_none() {
            return None;
        }
        let size = usize::try_from(size).ok()?;
        Some(Arc::new(ScriptArray::new(element.clone(), size)))
    }

    fn create_object(&self, class: &Arc<ObjectType>) -> Option<ObjectRef> {
        self.types.object_by_name(class.name())?;
        Some(Arc::new(ScriptObject::new(Arc::clone(class))))
    }

    fn find_bound_object(&self, handle: Handle, class: &ObjectType) -> Option<ObjectRef> {
        self.bound
            .read()
            .by_handle
            .get(&handle)?
            .iter()
            .find(|object| object.class().is_a(class))
            .cloned()
    }

    fn bind_object(&self, object: &ObjectRef, handle: Handle) -> bool {
        if handle.is_empty() || object.is_bound() {
            return false;
        }
        object.set_handle(handle);
        self.bound
            .write()
            .by_handle
            .entry(handle)
            .or_default()
            .push(Arc::clone(object));
        true
    }

    fn bind_inventory_object(
        &self,
        object: &ObjectRef,
        container: FormId,
        unique_id: u16,
        handle: Handle,
    ) -> bool {
        if !self.bind_object(object, handle) {
            return false;
        }
        self.bound
            .write()
            .inventory
            .insert(handle, (container, unique_id));
        true
    }

    fn handle_policy(&self) -> &dyn HandlePolicy {
        &self.policy
    }

    fn bind_native_method(&self, function: Box<dyn NativeFunction>) -> bool {
        match self.try_bind_native_method(function) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(target: "scriptlink_registry", "{err}");
                false
            }
        }
    }

    fn set_callable_from_tasklets(&self, object: &str, function: &str, callable: bool) {
        if let Some(entry) = self
            .functions
            .write()
            .get_mut(&function_key(object, function))
        {
            entry
                .flags
                .set(FunctionFlags::CALLABLE_FROM_TASKLETS, callable);
        }
    }

    fn issue_static_call(
        &self,
        object: &str,
        function: &str,
        args: ArgumentFunctor,
        callback: Option<CallbackRef>,
    ) -> bool {
        let Some(native) = self.function(object, function) else {
            return false;
        };
        if !native.is_static() {
            return false;
        }
        self.enqueue(PendingCall {
            receiver: Receiver::Static,
            function: native,
            args,
            callback,
        });
        true
    }

    fn issue_method_call(
        &self,
        object: &ObjectRef,
        function: &str,
        args: ArgumentFunctor,
        callback: Option<CallbackRef>,
    ) -> bool {
        let Some(native) = self.method(object.class(), function) else {
            return false;
        };
        if native.is_static() {
            return false;
        }
        self.enqueue(PendingCall {
            receiver: Receiver::Method(Arc::clone(object)),
            function: native,
            args,
            callback,
        });
        true
    }
}
