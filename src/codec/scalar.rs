//! Integers, floats and booleans.
//!
//! The VM holds 32-bit integers. Wider host integers are truncated on pack and
//! VM values are truncated or extended to the host width on unpack, the way an
//! `as` cast does.

use crate::error::MarshalError;
use crate::vm_ref::VmRef;
use crate::{TypeDescriptor, Variable};

use super::ScriptType;

macro_rules! impl_signed {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ScriptType for $ty {
                fn descriptor(_vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
                    Ok(TypeDescriptor::int())
                }

                fn try_pack(self, _vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
                    *dst = Variable::Int(self as i32);
                    Ok(())
                }

                fn try_unpack(_vm: VmRef<'_>, src: &Variable) -> Result<Self, MarshalError> {
                    let value = src.as_int().ok_or_else(|| MarshalError::tag_mismatch("int", src))?;
                    Ok(value as $ty)
                }
            }
        )*
    };
}

macro_rules! impl_unsigned {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ScriptType for $ty {
                fn descriptor(_vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
                    Ok(TypeDescriptor::int())
                }

                fn try_pack(self, _vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
                    *dst = Variable::UInt(self as u32);
                    Ok(())
                }

                fn try_unpack(_vm: VmRef<'_>, src: &Variable) -> Result<Self, MarshalError> {
                    let value = src.as_uint().ok_or_else(|| MarshalError::tag_mismatch("uint", src))?;
                    Ok(value as $ty)
                }
            }
        )*
    };
}

impl_signed!(i8, i16, i32, i64, isize);
impl_unsigned!(u8, u16, u32, u64, usize);

impl ScriptType for f32 {
    fn descriptor(_vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
        Ok(TypeDescriptor::float())
    }

    fn try_pack(self, _vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
        *dst = Variable::Float(self);
        Ok(())
    }

    fn try_unpack(_vm: VmRef<'_>, src: &Variable) -> Result<Self, MarshalError> {
        src.as_float().ok_or_else(|| MarshalError::tag_mismatch("float", src))
    }
}

impl ScriptType for f64 {
    fn descriptor(_vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
        Ok(TypeDescriptor::float())
    }

    fn try_pack(self, _vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
        *dst = Variable::Float(self as f32);
        Ok(())
    }

    fn try_unpack(_vm: VmRef<'_>, src: &Variable) -> Result<Self, MarshalError> {
        src.as_float()
            .map(f64::from)
            .ok_or_else(|| MarshalError::tag_mismatch("float", src))
    }
}

impl ScriptType for bool {
    fn descriptor(_vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
        Ok(TypeDescriptor::bool())
    }

    fn try_pack(self, _vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
        *dst = Variable::Bool(self);
        Ok(())
    }

    fn try_unpack(_vm: VmRef<'_>, src: &Variable) -> Result<Self, MarshalError> {
        src.as_bool().ok_or_else(|| MarshalError::tag_mismatch("bool", src))
    }
}

/// Implement [`ScriptType`] for a fieldless enum through its primitive
/// representation.
///
/// The enum must derive `Default` and `num_enum`'s `IntoPrimitive` and
/// `TryFromPrimitive`. Signed representations travel as `int`, unsigned ones
/// as `uint`. Discriminants with no matching variant unpack to the default.
///
/// ```
/// use num_enum::{IntoPrimitive, TryFromPrimitive};
/// use scriptlink::{Variable, VmRef, script_enum};
///
/// #[derive(Debug, Default, Clone, Copy, PartialEq, IntoPrimitive, TryFromPrimitive)]
/// #[repr(i32)]
/// enum Stance {
///     #[default]
///     Standing = 0,
///     Crouching = 1,
/// }
///
/// script_enum!(Stance => i32);
///
/// let v = scriptlink::pack(VmRef::none(), Stance::Crouching);
/// assert_eq!(v, Variable::Int(1));
/// assert_eq!(scriptlink::unpack::<Stance>(VmRef::none(), &v), Stance::Crouching);
/// ```
#[macro_export]
macro_rules! script_enum {
    ($($ty:ty => $repr:ty),* $(,)?) => {
        $(
            impl $crate::ScriptType for $ty {
                fn descriptor(
                    vm: $crate::VmRef<'_>,
                ) -> ::core::result::Result<$crate::TypeDescriptor, $crate::MarshalError> {
                    <$repr as $crate::ScriptType>::descriptor(vm)
                }

                fn try_pack(
                    self,
                    vm: $crate::VmRef<'_>,
                    dst: &mut $crate::Variable,
                ) -> ::core::result::Result<(), $crate::MarshalError> {
                    <$repr as $crate::ScriptType>::try_pack(<$repr>::from(self), vm, dst)
                }

                fn try_unpack(
                    vm: $crate::VmRef<'_>,
                    src: &$crate::Variable,
                ) -> ::core::result::Result<Self, $crate::MarshalError> {
                    let raw = <$repr as $crate::ScriptType>::try_unpack(vm, src)?;
                    <$ty as ::core::convert::TryFrom<$repr>>::try_from(raw).map_err(|_| {
                        $crate::MarshalError::ValueOutOfRange {
                            value: ::std::string::ToString::to_string(&raw),
                            target: ::core::stringify!($ty),
                        }
                    })
                }
            }
        )*
    };
}
