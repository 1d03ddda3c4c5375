use std::collections::VecDeque;

use crate::error::MarshalError;
use crate::vm_ref::VmRef;
use crate::{TypeDescriptor, Variable};

use super::{Nullable, ScriptType, unpack};

/// A host sequence. Travels as a VM array of its element type.
pub trait ScriptSequence: Sized + Default {
    type Element: ScriptType;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_elements(self) -> impl Iterator<Item = Self::Element>;

    fn from_elements(elements: impl Iterator<Item = Self::Element>) -> Self;
}

impl<T: ScriptType> ScriptSequence for Vec<T> {
    type Element = T;

    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn into_elements(self) -> impl Iterator<Item = T> {
        self.into_iter()
    }

    fn from_elements(elements: impl Iterator<Item = T>) -> Self {
        elements.collect()
    }
}

impl<T: ScriptType> ScriptSequence for VecDeque<T> {
    type Element = T;

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn into_elements(self) -> impl Iterator<Item = T> {
        self.into_iter()
    }

    fn from_elements(elements: impl Iterator<Item = T>) -> Self {
        elements.collect()
    }
}

fn sequence_descriptor<S: ScriptSequence>(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
    let element = S::Element::descriptor(vm)?;
    let name = format!("{element}[]");
    element
        .array_of()
        .ok_or_else(|| MarshalError::unregistered("array", name))
}

/// Allocate the VM array first, then fill it positionally. Any element failure
/// abandons the array, so a partially packed array is never observable.
fn pack_sequence<S: ScriptSequence>(
    sequence: S,
    vm: VmRef<'_>,
    dst: &mut Variable,
) -> Result<(), MarshalError> {
    let descriptor = sequence_descriptor::<S>(vm)?;
    let machine = vm.get()?;
    let len = sequence.len();
    let size = u32::try_from(len).map_err(|_| MarshalError::ValueOutOfRange {
        value: len.to_string(),
        target: "array size",
    })?;
    let array = machine
        .create_array(&descriptor.element(), size)
        .ok_or_else(|| MarshalError::AllocationFailed {
            what: format!("array of {size} {}", descriptor.element()),
        })?;

    for (index, element) in sequence.into_elements().enumerate() {
        let mut slot = Variable::None;
        element.try_pack(vm, &mut slot)?;
        array.set(index, slot);
    }

    *dst = Variable::Array(Some(array));
    Ok(())
}

/// Elements that fail to unpack are reported individually and replaced by the
/// element default.
fn unpack_sequence<S: ScriptSequence>(vm: VmRef<'_>, src: &Variable) -> Result<Option<S>, MarshalError> {
    match src {
        Variable::Array(Some(array)) => {
            let elements = array.to_vec();
            Ok(Some(S::from_elements(
                elements.iter().map(|element| unpack::<S::Element>(vm, element)),
            )))
        }
        Variable::Array(None) => Ok(None),
        other => Err(MarshalError::tag_mismatch("array", other)),
    }
}

macro_rules! impl_sequence {
    ($($seq:ident),* $(,)?) => {
        $(
            impl<T: ScriptType> ScriptType for $seq<T> {
                fn descriptor(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
                    sequence_descriptor::<Self>(vm)
                }

                fn try_pack(self, vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
                    pack_sequence(self, vm, dst)
                }

                fn try_unpack(vm: VmRef<'_>, src: &Variable) -> Result<Self, MarshalError> {
                    unpack_sequence(vm, src).map(Option::unwrap_or_default)
                }
            }

            impl<T: ScriptType> Nullable for $seq<T> {
                fn descriptor(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
                    sequence_descriptor::<Self>(vm)
                }

                fn try_pack_present(self, vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
                    pack_sequence(self, vm, dst)
                }

                fn try_unpack_present(vm: VmRef<'_>, src: &Variable) -> Result<Option<Self>, MarshalError> {
                    unpack_sequence(vm, src)
                }
            }
        )*
    };
}

impl_sequence!(Vec, VecDeque);
