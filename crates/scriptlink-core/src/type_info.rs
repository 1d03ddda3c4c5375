//! VM-side type descriptions.
//!
//! A [`TypeDescriptor`] names one type the VM can hold in a [`Variable`]: a
//! primitive kind or a complex kind (object class / structure type), optionally
//! as an array of that kind. Complex kinds carry the shared class record the VM
//! registry handed out, so descriptors stay valid after the lookup.
//!
//! [`Variable`]: crate::Variable

use std::fmt;
use std::sync::Arc;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use rustc_hash::FxHashMap;

use crate::fixed_string::FixedString;
use crate::handle::VmTypeId;

/// Name of the VM's base class for script-defined objects.
pub const SCRIPT_OBJECT_TYPE: &str = "ScriptObject";

/// Separates the owning object name from the structure name in a structure
/// type's registered name (`Owner#Struct`).
pub const STRUCTURE_TAG_SEPARATOR: char = '#';

/// Wire-level type tag, as stored by the VM.
///
/// Array tags are the element tag plus [`RawType::ARRAY_OFFSET`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum RawType {
    None = 0,
    Object = 1,
    String = 2,
    Int = 3,
    Float = 4,
    Bool = 5,
    Var = 6,
    Struct = 7,
    ArrayObject = 11,
    ArrayString = 12,
    ArrayInt = 13,
    ArrayFloat = 14,
    ArrayBool = 15,
    ArrayVar = 16,
    ArrayStruct = 17,
}

impl RawType {
    /// Distance between an element tag and its array tag.
    pub const ARRAY_OFFSET: u8 = 10;

    /// Whether this tag denotes an array.
    pub fn is_array(self) -> bool {
        u8::from(self) > Self::ARRAY_OFFSET
    }

    /// The array tag for this element tag. `None` for arrays and for `None`.
    pub fn array_of(self) -> Option<RawType> {
        if self == RawType::None || self.is_array() {
            return None;
        }
        RawType::try_from(u8::from(self) + Self::ARRAY_OFFSET).ok()
    }

    /// The element tag of an array tag; non-array tags are returned as-is.
    pub fn element(self) -> RawType {
        if self.is_array() {
            RawType::try_from(u8::from(self) - Self::ARRAY_OFFSET).unwrap_or(RawType::None)
        } else {
            self
        }
    }
}

/// A registered object class.
#[derive(Debug)]
pub struct ObjectType {
    name: FixedString,
    type_id: Option<VmTypeId>,
    parent: Option<Arc<ObjectType>>,
}

impl ObjectType {
    /// Create a class record. `type_id` is present for classes backed by a
    /// native type.
    pub fn new(
        name: impl Into<FixedString>,
        type_id: Option<VmTypeId>,
        parent: Option<Arc<ObjectType>>,
    ) -> Self {
        Self {
            name: name.into(),
            type_id,
            parent,
        }
    }

    pub fn name(&self) -> &FixedString {
        &self.name
    }

    pub fn type_id(&self) -> Option<VmTypeId> {
        self.type_id
    }

    pub fn parent(&self) -> Option<&Arc<ObjectType>> {
        self.parent.as_ref()
    }

    /// Whether this class is `other` or derives from it.
    pub fn is_a(&self, other: &ObjectType) -> bool {
        let mut current = Some(self);
        while let Some(class) = current {
            if class.name == other.name {
                return true;
            }
            current = class.parent.as_deref();
        }
        false
    }
}

/// One named, typed slot of a structure type.
#[derive(Debug, Clone)]
pub struct StructField {
    pub name: FixedString,
    pub ty: TypeDescriptor,
}

impl StructField {
    pub fn new(name: impl Into<FixedString>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A registered structure type: ordered fields plus a name → slot index.
///
/// Field lookup ignores ASCII case, as script identifiers do.
#[derive(Debug)]
pub struct StructType {
    name: FixedString,
    fields: Vec<StructField>,
    index: FxHashMap<String, usize>,
}

impl StructType {
    /// Create a structure type. Later fields shadow earlier ones that differ
    /// only by case.
    pub fn new(name: impl Into<FixedString>, fields: Vec<StructField>) -> Self {
        let index = fields
            .iter()
            .enumerate()
            .map(|(slot, field)| (field.name.to_ascii_lowercase(), slot))
            .collect();
        Self {
            name: name.into(),
            fields,
            index,
        }
    }

    /// Full registered name (`Owner#Struct`).
    pub fn name(&self) -> &FixedString {
        &self.name
    }

    pub fn fields(&self) -> &[StructField] {
        &self.fields
    }

    /// Slot index of `field`.
    pub fn field_index(&self, field: &str) -> Option<usize> {
        self.index.get(&field.to_ascii_lowercase()).copied()
    }

    pub fn field(&self, field: &str) -> Option<&StructField> {
        self.field_index(field).map(|slot| &self.fields[slot])
    }
}

/// Kind half of a [`TypeDescriptor`].
#[derive(Debug, Clone, Default)]
pub enum TypeKind {
    #[default]
    None,
    Object(Arc<ObjectType>),
    String,
    Int,
    Float,
    Bool,
    Var,
    Struct(Arc<StructType>),
}

impl PartialEq for TypeKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeKind::None, TypeKind::None)
            | (TypeKind::String, TypeKind::String)
            | (TypeKind::Int, TypeKind::Int)
            | (TypeKind::Float, TypeKind::Float)
            | (TypeKind::Bool, TypeKind::Bool)
            | (TypeKind::Var, TypeKind::Var) => true,
            (TypeKind::Object(a), TypeKind::Object(b)) => a.name() == b.name(),
            (TypeKind::Struct(a), TypeKind::Struct(b)) => a.name() == b.name(),
            _ => false,
        }
    }
}

/// A VM-representable type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeDescriptor {
    kind: TypeKind,
    array: bool,
}

impl TypeDescriptor {
    pub const fn new(kind: TypeKind) -> Self {
        Self { kind, array: false }
    }

    pub const fn none() -> Self {
        Self::new(TypeKind::None)
    }

    pub const fn int() -> Self {
        Self::new(TypeKind::Int)
    }

    pub const fn float() -> Self {
        Self::new(TypeKind::Float)
    }

    pub const fn bool() -> Self {
        Self::new(TypeKind::Bool)
    }

    pub const fn string() -> Self {
        Self::new(TypeKind::String)
    }

    pub const fn var() -> Self {
        Self::new(TypeKind::Var)
    }

    pub fn object(class: Arc<ObjectType>) -> Self {
        Self::new(TypeKind::Object(class))
    }

    pub fn structure(ty: Arc<StructType>) -> Self {
        Self::new(TypeKind::Struct(ty))
    }

    /// The array-of-`self` descriptor.
    ///
    /// Returns `None` when `self` is already an array or is `none`: the VM has
    /// no representation for nested arrays or arrays of nothing.
    pub fn array_of(self) -> Option<Self> {
        if self.array || matches!(self.kind, TypeKind::None) {
            return None;
        }
        Some(Self {
            kind: self.kind,
            array: true,
        })
    }

    /// Element descriptor of an array; non-arrays are returned unchanged.
    pub fn element(&self) -> Self {
        Self::new(self.kind.clone())
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn is_array(&self) -> bool {
        self.array
    }

    pub fn is_none(&self) -> bool {
        !self.array && matches!(self.kind, TypeKind::None)
    }

    /// Object class of a (non-array) object descriptor.
    pub fn object_type(&self) -> Option<&Arc<ObjectType>> {
        match &self.kind {
            TypeKind::Object(class) if !self.array => Some(class),
            _ => None,
        }
    }

    /// Structure type of a (non-array) structure descriptor.
    pub fn struct_type(&self) -> Option<&Arc<StructType>> {
        match &self.kind {
            TypeKind::Struct(ty) if !self.array => Some(ty),
            _ => None,
        }
    }

    /// Wire-level tag.
    pub fn raw_type(&self) -> RawType {
        let element = match self.kind {
            TypeKind::None => RawType::None,
            TypeKind::Object(_) => RawType::Object,
            TypeKind::String => RawType::String,
            TypeKind::Int => RawType::Int,
            TypeKind::Float => RawType::Float,
            TypeKind::Bool => RawType::Bool,
            TypeKind::Var => RawType::Var,
            TypeKind::Struct(_) => RawType::Struct,
        };
        if self.array {
            element.array_of().unwrap_or(RawType::None)
        } else {
            element
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeKind::None => f.write_str("None")?,
            TypeKind::Object(class) => f.write_str(class.name())?,
            TypeKind::String => f.write_str("String")?,
            TypeKind::Int => f.write_str("Int")?,
            TypeKind::Float => f.write_str("Float")?,
            TypeKind::Bool => f.write_str("Bool")?,
            TypeKind::Var => f.write_str("Var")?,
            TypeKind::Struct(ty) => f.write_str(ty.name())?,
        }
        if self.array {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Arc<StructType> {
        Arc::new(StructType::new(
            "Utility#Point",
            vec![
                StructField::new("X", TypeDescriptor::float()),
                StructField::new("Y", TypeDescriptor::float()),
            ],
        ))
    }

    // ========================================================================
    // RawType
    // ========================================================================

    #[test]
    fn raw_type_array_offsets() {
        assert_eq!(RawType::Int.array_of(), Some(RawType::ArrayInt));
        assert_eq!(RawType::ArrayStruct.element(), RawType::Struct);
        assert_eq!(RawType::ArrayInt.array_of(), None);
        assert_eq!(RawType::None.array_of(), None);
        assert!(RawType::ArrayObject.is_array());
        assert!(!RawType::Var.is_array());
        assert_eq!(RawType::try_from(13u8), Ok(RawType::ArrayInt));
        assert!(RawType::try_from(9u8).is_err());
    }

    // ========================================================================
    // TypeDescriptor
    // ========================================================================

    #[test]
    fn array_descriptor() {
        let ints = TypeDescriptor::int().array_of().unwrap();
        assert!(ints.is_array());
        assert_eq!(ints.raw_type(), RawType::ArrayInt);
        assert_eq!(ints.element(), TypeDescriptor::int());
        assert_eq!(ints.to_string(), "Int[]");
    }

    #[test]
    fn nested_and_none_arrays_are_unrepresentable() {
        let ints = TypeDescriptor::int().array_of().unwrap();
        assert_eq!(ints.array_of(), None);
        assert_eq!(TypeDescriptor::none().array_of(), None);
    }

    #[test]
    fn complex_descriptors() {
        let class = Arc::new(ObjectType::new("Actor", Some(VmTypeId::new(0x2B)), None));
        let desc = TypeDescriptor::object(Arc::clone(&class));
        assert_eq!(desc.raw_type(), RawType::Object);
        assert!(desc.object_type().is_some());
        assert!(desc.struct_type().is_none());

        let desc = TypeDescriptor::structure(point());
        assert_eq!(desc.raw_type(), RawType::Struct);
        assert_eq!(desc.to_string(), "Utility#Point");
    }

    // ========================================================================
    // ObjectType / StructType
    // ========================================================================

    #[test]
    fn class_hierarchy() {
        let form = Arc::new(ObjectType::new("Form", Some(VmTypeId::new(1)), None));
        let reference = Arc::new(ObjectType::new(
            "ObjectReference",
            Some(VmTypeId::new(0x40)),
            Some(Arc::clone(&form)),
        ));
        let actor = ObjectType::new("Actor", Some(VmTypeId::new(0x2B)), Some(Arc::clone(&reference)));
        assert!(actor.is_a(&form));
        assert!(actor.is_a(&reference));
        assert!(!form.is_a(&reference));
    }

    #[test]
    fn field_lookup_ignores_case() {
        let ty = point();
        assert_eq!(ty.field_index("X"), Some(0));
        assert_eq!(ty.field_index("y"), Some(1));
        assert_eq!(ty.field_index("Z"), None);
        assert_eq!(ty.field("x").map(|f| f.name.as_str()), Some("X"));
    }
}
