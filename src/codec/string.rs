use std::sync::Arc;

use crate::error::MarshalError;
use crate::vm_ref::VmRef;
use crate::{FixedString, TypeDescriptor, Variable};

use super::ScriptType;

/// A host string type. Travels as an interned string.
pub trait ScriptString: Sized + Default {
    fn into_fixed(self) -> FixedString;

    fn from_fixed(value: &FixedString) -> Self;
}

impl ScriptString for String {
    fn into_fixed(self) -> FixedString {
        FixedString::from(self)
    }

    fn from_fixed(value: &FixedString) -> Self {
        value.as_str().to_owned()
    }
}

impl ScriptString for FixedString {
    fn into_fixed(self) -> FixedString {
        self
    }

    fn from_fixed(value: &FixedString) -> Self {
        value.clone()
    }
}

impl ScriptString for Box<str> {
    fn into_fixed(self) -> FixedString {
        FixedString::new(&self)
    }

    fn from_fixed(value: &FixedString) -> Self {
        Box::from(value.as_str())
    }
}

impl ScriptString for Arc<str> {
    fn into_fixed(self) -> FixedString {
        FixedString::new(&self)
    }

    fn from_fixed(value: &FixedString) -> Self {
        Arc::from(value.as_str())
    }
}

macro_rules! impl_string {
    ($($ty:ty),* $(,)?) => {
        $(
            impl ScriptType for $ty {
                fn descriptor(_vm: VmRef<'_>) -> Result<TypeDescriptor, MarshalError> {
                    Ok(TypeDescriptor::string())
                }

                fn try_pack(self, _vm: VmRef<'_>, dst: &mut Variable) -> Result<(), MarshalError> {
                    *dst = Variable::String(self.into_fixed());
                    Ok(())
                }

                fn try_unpack(_vm: VmRef<'_>, src: &Variable) -> Result<Self, MarshalError> {
                    src.as_string()
                        .map(<$ty as ScriptString>::from_fixed)
                        .ok_or_else(|| MarshalError::tag_mismatch("string", src))
                }
            }
        )*
    };
}

impl_string!(String, FixedString, Box<str>, Arc<str>);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{pack, unpack};
    use crate::diagnostics;

    #[test]
    fn strings_are_interned() {
        let a = pack(VmRef::none(), String::from("Vault 111"));
        let b = pack(VmRef::none(), FixedString::new("Vault 111"));
        assert_eq!(a, b);
        assert_eq!(unpack::<Box<str>>(VmRef::none(), &a).as_ref(), "Vault 111");
        assert_eq!(unpack::<Arc<str>>(VmRef::none(), &b).as_ref(), "Vault 111");
    }

    #[test]
    fn non_string_degrades_to_empty() {
        diagnostics::take_failures();
        assert_eq!(unpack::<String>(VmRef::none(), &Variable::Int(1)), "");
        assert_eq!(diagnostics::take_failures(), 1);
    }
}
