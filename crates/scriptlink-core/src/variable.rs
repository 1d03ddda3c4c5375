//! The VM's tagged dynamic value.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::fixed_string::FixedString;
use crate::object::{ArrayRef, ObjectRef, StructRef};
use crate::type_info::{ObjectType, RawType, TypeDescriptor, TypeKind};

/// Shared slot holding another [`Variable`]; the by-reference parameter form.
pub type VarRef = Arc<RwLock<Variable>>;

/// A value the VM can store in a stack slot, array element or structure field.
///
/// Shared payloads (objects, arrays, structures, variable slots) are reference
/// counted. Each of them may be absent, which is the VM's typed `None`; an
/// object additionally remembers its class even when the payload is absent.
#[derive(Clone, Default)]
pub enum Variable {
    #[default]
    None,
    Bool(bool),
    Int(i32),
    UInt(u32),
    Float(f32),
    String(FixedString),
    Object {
        object: Option<ObjectRef>,
        class: Option<Arc<ObjectType>>,
    },
    Array(Option<ArrayRef>),
    Struct(Option<StructRef>),
    Var(Option<VarRef>),
}

impl Variable {
    /// An object variable carrying `object` and its class.
    pub fn object(object: ObjectRef) -> Self {
        let class = Some(Arc::clone(object.class()));
        Variable::Object {
            object: Some(object),
            class,
        }
    }

    /// A typed `None` of `class`.
    pub fn null_object(class: Option<Arc<ObjectType>>) -> Self {
        Variable::Object {
            object: None,
            class,
        }
    }

    /// A fresh variable slot holding `value`.
    pub fn new_var(value: Variable) -> VarRef {
        Arc::new(RwLock::new(value))
    }

    /// The default value a slot of type `ty` starts with.
    pub fn default_for(ty: &TypeDescriptor) -> Self {
        if ty.is_array() {
            return Variable::Array(None);
        }
        match ty.kind() {
            TypeKind::None | TypeKind::Var => Variable::None,
            TypeKind::Object(class) => Variable::null_object(Some(Arc::clone(class))),
            TypeKind::String => Variable::String(FixedString::empty()),
            TypeKind::Int => Variable::Int(0),
            TypeKind::Float => Variable::Float(0.0),
            TypeKind::Bool => Variable::Bool(false),
            TypeKind::Struct(_) => Variable::Struct(None),
        }
    }

    /// Get a human-readable name for this variable's tag.
    pub fn type_name(&self) -> &'static str {
        match self {
            Variable::None => "none",
            Variable::Bool(_) => "bool",
            Variable::Int(_) => "int",
            Variable::UInt(_) => "uint",
            Variable::Float(_) => "float",
            Variable::String(_) => "string",
            Variable::Object { .. } => "object",
            Variable::Array(_) => "array",
            Variable::Struct(_) => "struct",
            Variable::Var(_) => "var",
        }
    }

    /// Wire-level tag. Unsigned integers share the `Int` tag.
    pub fn raw_type(&self) -> RawType {
        match self {
            Variable::None => RawType::None,
            Variable::Bool(_) => RawType::Bool,
            Variable::Int(_) | Variable::UInt(_) => RawType::Int,
            Variable::Float(_) => RawType::Float,
            Variable::String(_) => RawType::String,
            Variable::Object { .. } => RawType::Object,
            Variable::Array(Some(array)) => array.element_type().raw_type().array_of().unwrap_or(RawType::None),
            Variable::Array(None) => RawType::None,
            Variable::Struct(_) => RawType::Struct,
            Variable::Var(_) => RawType::Var,
        }
    }

    /// Check if this variable is the untyped `None`.
    pub fn is_none(&self) -> bool {
        matches!(self, Variable::None)
    }

    /// Check if this variable holds no value: `None`, or a shared payload
    /// that is absent.
    pub fn is_null(&self) -> bool {
        match self {
            Variable::None => true,
            Variable::Object { object, .. } => object.is_none(),
            Variable::Array(array) => array.is_none(),
            Variable::Struct(instance) => instance.is_none(),
            Variable::Var(slot) => slot.is_none(),
            _ => false,
        }
    }

    /// Attach an object class. No effect on non-object variables.
    pub fn set_complex_type(&mut self, ty: Arc<ObjectType>) {
        if let Variable::Object { class, .. } = self {
            *class = Some(ty);
        }
    }

    /// Object class of an object variable, if known.
    pub fn complex_type(&self) -> Option<&Arc<ObjectType>> {
        match self {
            Variable::Object { class, .. } => class.as_ref(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variable::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Variable::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_uint(&self) -> Option<u32> {
        match self {
            Variable::UInt(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Variable::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&FixedString> {
        match self {
            Variable::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Variable::Object { object, .. } => object.as_ref(),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayRef> {
        match self {
            Variable::Array(array) => array.as_ref(),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructRef> {
        match self {
            Variable::Struct(instance) => instance.as_ref(),
            _ => None,
        }
    }

    pub fn as_var(&self) -> Option<&VarRef> {
        match self {
            Variable::Var(slot) => slot.as_ref(),
            _ => None,
        }
    }
}

impl fmt::Debug for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variable::None => write!(f, "None"),
            Variable::Bool(v) => write!(f, "Bool({})", v),
            Variable::Int(v) => write!(f, "Int({})", v),
            Variable::UInt(v) => write!(f, "UInt({})", v),
            Variable::Float(v) => write!(f, "Float({})", v),
            Variable::String(s) => write!(f, "String({:?})", s),
            Variable::Object { object, class } => {
                let class = class.as_ref().map(|c| c.name().as_str()).unwrap_or("?");
                match object {
                    Some(object) => write!(f, "Object({}, {:?})", class, object.handle()),
                    None => write!(f, "Object({}, none)", class),
                }
            }
            Variable::Array(Some(array)) => write!(f, "Array({:?})", array.to_vec()),
            Variable::Array(None) => write!(f, "Array(none)"),
            Variable::Struct(Some(instance)) => write!(f, "Struct({:?})", instance),
            Variable::Struct(None) => write!(f, "Struct(none)"),
            Variable::Var(Some(slot)) => write!(f, "Var({:?})", &*slot.read()),
            Variable::Var(None) => write!(f, "Var(none)"),
        }
    }
}

fn same_payload<T>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl PartialEq for Variable {
    /// Scalars compare by value; shared payloads compare by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Variable::None, Variable::None) => true,
            (Variable::Bool(a), Variable::Bool(b)) => a == b,
            (Variable::Int(a), Variable::Int(b)) => a == b,
            (Variable::UInt(a), Variable::UInt(b)) => a == b,
            (Variable::Float(a), Variable::Float(b)) => a == b,
            (Variable::String(a), Variable::String(b)) => a == b,
            (Variable::Object { object: a, .. }, Variable::Object { object: b, .. }) => {
                same_payload(a, b)
            }
            (Variable::Array(a), Variable::Array(b)) => same_payload(a, b),
            (Variable::Struct(a), Variable::Struct(b)) => same_payload(a, b),
            (Variable::Var(a), Variable::Var(b)) => same_payload(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Variable {
    fn from(value: bool) -> Self {
        Variable::Bool(value)
    }
}

impl From<i32> for Variable {
    fn from(value: i32) -> Self {
        Variable::Int(value)
    }
}

impl From<u32> for Variable {
    fn from(value: u32) -> Self {
        Variable::UInt(value)
    }
}

impl From<f32> for Variable {
    fn from(value: f32) -> Self {
        Variable::Float(value)
    }
}

impl From<FixedString> for Variable {
    fn from(value: FixedString) -> Self {
        Variable::String(value)
    }
}

impl From<&str> for Variable {
    fn from(value: &str) -> Self {
        Variable::String(FixedString::new(value))
    }
}
