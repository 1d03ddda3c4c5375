//! Conversion between host values and [`Variable`].
//!
//! Every host type that may cross the script boundary implements
//! [`ScriptType`]. The trait's methods are fallible; the free functions
//! [`pack`], [`pack_into`] and [`unpack`] are total and resolve failures by
//! reporting them and falling back to `None` (packing) or the type's default
//! (unpacking).
//!
//! | Host type | Variable |
//! |-----------|----------|
//! | `i8`..`i64`, `isize`, `script_enum!` (`i32` repr) | `Int` |
//! | `u8`..`u64`, `usize`, `script_enum!` (`u32` repr) | `UInt` |
//! | `f32`, `f64` | `Float` |
//! | `bool` | `Bool` |
//! | [`ScriptString`] types | `String` |
//! | [`ScriptSequence`] types | `Array` |
//! | [`StructureProxy`] | `Struct` |
//! | [`RefOrInventory`] | `Object` |
//! | `Option<T>` for [`Nullable`] `T` | `None` or `T`'s form |
//!
//! [`StructureProxy`]: crate::StructureProxy

mod container;
mod object;
mod scalar;
mod string;

pub use container::ScriptSequence;
pub use object::{NativeKind, NativeObject, RefOrInventory};
pub use string::ScriptString;

use crate::diagnostics::report_at;
use crate::error::MarshalError;
use crate::vm_ref::VmRef;
use crate::{TypeDescriptor, Variable};

/// A host type with a VM representation.
///
/// This is the contract every native function parameter satisfies. Types that
/// do not implement it cannot appear in a bound signature:
///
/// ```compile_fail,E0277
/// use scriptlink::{NativeFunctionBinding, Static};
///
/// // `char` has no VM representation.
/// let _ = NativeFunctionBinding::new("Utility", "Initial", |_: Static, c: char| c as i32, false);
/// ```
pub trait ScriptType: Sized + Default {
    /// The VM type this host type maps to.
    fn descriptor(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError>;

    /// Write `self` into `dst`. `dst` is left untouched on failure.
    fn try_pack(self, vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError>;

    /// Read a value out of `src`, verifying its tag first.
    fn try_unpack(vm: VmRef<'_>, src: &Variable) -> Result<Self, MarshalError>;
}

/// A host type whose absence is spelled `Option<Self>`.
///
/// Pointer-like host values (native objects, VM objects, variable slots) and
/// the aggregate forms (sequences, structures) may be missing; their `Option`
/// packs `None` as the VM's none value.
pub trait Nullable: Sized {
    fn descriptor(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError>;

    fn try_pack_present(self, vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError>;

    /// Write the absent value. Plain `None` unless the type keeps a class.
    fn try_pack_absent(vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
        let _ = vm;
        *dst = Variable::None;
        Ok(())
    }

    /// Read a value out of a variable that is not `None`. `Ok(None)` when the
    /// variable has the right tag but an absent payload.
    fn try_unpack_present(vm: VmRef<'_>, src: &Variable) -> Result<Option<Self>, MarshalError>;
}

impl<T: Nullable> ScriptType for Option<T> {
    fn descriptor(vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
        T::descriptor(vm)
    }

    fn try_pack(self, vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
        match self {
            Some(value) => value.try_pack_present(vm, dst),
            None => T::try_pack_absent(vm, dst),
        }
    }

    fn try_unpack(vm: VmRef<'_>, src: &Variable) -> Result<Self, MarshalError> {
        if src.is_none() {
            return Ok(None);
        }
        T::try_unpack_present(vm, src)
    }
}

/// Pack `value` into `dst`. On failure `dst` becomes `None`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn pack_into<T: ScriptType>(vm: VmRef<'_>, value: T, dst: &mut Variable) {
    if let Err(err) = value.try_pack(vm, dst) {
        report_at!("scriptlink::codec", err);
        *dst = Variable::None;
    }
}

/// Pack `value` into a fresh variable.
pub fn pack<T: ScriptType>(vm: VmRef<'_>, value: T) -> Variable {
    let mut dst = Variable::None;
    pack_into(vm, value, &mut dst);
    dst
}

/// Unpack a `T` from `src`, or `T::default()` if `src` does not hold one.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn unpack<T: ScriptType>(vm: VmRef<'_>, src: &Variable) -> T {
    match T::try_unpack(vm, src) {
        Ok(value) => value,
        Err(err) => {
            report_at!("scriptlink::codec", err);
            T::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics;

    #[test]
    fn option_absent_packs_none() {
        diagnostics::take_failures();
        let v = pack::<Option<Vec<i32>>>(VmRef::none(), None);
        assert!(v.is_none());
        assert_eq!(diagnostics::take_failures(), 0);
    }

    #[test]
    fn option_none_unpacks_absent() {
        diagnostics::take_failures();
        let v: Option<Vec<i32>> = unpack(VmRef::none(), &Variable::None);
        assert_eq!(v, None);
        assert_eq!(diagnostics::take_failures(), 0);
    }

    #[test]
    fn failed_pack_clears_destination() {
        diagnostics::take_failures();
        let mut dst = Variable::Int(7);
        // Arrays need a VM to allocate from.
        pack_into(VmRef::none(), vec![1, 2, 3], &mut dst);
        assert!(dst.is_none());
        assert_eq!(diagnostics::take_failures(), 1);
    }
}
