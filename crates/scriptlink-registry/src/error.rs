//! Registration errors of the in-memory VM.

use thiserror::Error;

/// Errors raised while declaring types or binding functions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An object type with this name already exists.
    #[error("duplicate object type: {0}")]
    DuplicateTypeName(String),

    /// Another object type already carries this type id.
    #[error("duplicate type id {id:#04x}: already registered as {existing}")]
    DuplicateTypeId { id: u32, existing: String },

    /// A parent was named before being declared.
    #[error("object type {name} extends unknown type {parent}")]
    UnknownParent { name: String, parent: String },

    /// A structure with this tag already exists.
    #[error("duplicate structure: {0}")]
    DuplicateStructure(String),

    /// A structure owner or name is empty or contains the tag separator.
    #[error("invalid structure name: {0}")]
    InvalidStructureName(String),

    /// A structure field names a type the VM does not know.
    #[error("field {field} of {structure} has unknown type {ty}")]
    UnknownFieldType {
        structure: String,
        field: String,
        ty: String,
    },

    /// The configured reference or active-effect type id is not declared.
    #[error("{role} type id {id:#04x} is not a declared object type")]
    UndeclaredRoleType { role: &'static str, id: u32 },

    /// A native function is already bound under this name.
    #[error("duplicate function: {0}")]
    DuplicateFunction(String),
}
