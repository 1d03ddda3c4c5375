//! Marshalling failures.
//!
//! None of these reach the caller of a public marshalling operation. They are
//! produced by internal helpers, funnelled through [`crate::diagnostics`], and
//! replaced by a safe default value at the boundary.

use thiserror::Error;

use crate::Handle;

/// A recoverable failure while converting or dispatching.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarshalError {
    /// No VM to talk to.
    #[error("virtual machine is not available")]
    VmUnavailable,

    /// A type lookup against the VM registry failed.
    #[error("{kind} type '{name}' is not registered with the virtual machine")]
    TypeUnregistered { kind: &'static str, name: String },

    /// A handle could not be produced or does not resolve.
    #[error("invalid handle {handle}: {reason}")]
    InvalidHandle { handle: Handle, reason: &'static str },

    /// A variable held a different tag than the requested type needs.
    #[error("expected a {expected} variable, found {actual}")]
    TagMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// The VM refused to create an object, array or structure.
    #[error("failed to allocate {what}")]
    AllocationFailed { what: String },

    #[error("field '{field}' not found in structure '{structure}'")]
    FieldNotFound { field: String, structure: String },

    /// A structure instance of the wrong type was handed to a proxy.
    #[error("structure type mismatch: expected '{expected}', found '{actual}'")]
    StructureMismatch { expected: String, actual: String },

    /// The stack frame holds fewer arguments than the function declares.
    #[error("argument {index} missing from a frame of {count}")]
    MissingArgument { index: u32, count: u32 },

    /// The receiver of a method resolved to no native object.
    #[error("{function} called with a none self")]
    NullSelf { function: String },

    #[error("native function {function} called without relevant stack")]
    MissingStack { function: String },

    /// A size or enum discriminant with no representation on the other side.
    #[error("value {value} is out of range for {target}")]
    ValueOutOfRange { value: String, target: &'static str },
}

impl MarshalError {
    pub(crate) fn tag_mismatch(expected: &'static str, actual: &crate::Variable) -> Self {
        MarshalError::TagMismatch {
            expected,
            actual: actual.type_name(),
        }
    }

    pub(crate) fn unregistered(kind: &'static str, name: impl Into<String>) -> Self {
        MarshalError::TypeUnregistered {
            kind,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Variable;

    #[test]
    fn messages() {
        assert_eq!(
            MarshalError::tag_mismatch("int", &Variable::from("x")).to_string(),
            "expected a int variable, found string"
        );
        assert_eq!(
            MarshalError::MissingStack {
                function: "Debug.Trace".into()
            }
            .to_string(),
            "native function Debug.Trace called without relevant stack"
        );
        assert_eq!(
            MarshalError::unregistered("object", "Actor").to_string(),
            "object type 'Actor' is not registered with the virtual machine"
        );
    }
}
