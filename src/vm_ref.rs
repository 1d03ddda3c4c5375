use std::fmt;

use crate::VirtualMachine;
use crate::error::MarshalError;

/// A VM that may not exist yet.
///
/// Marshalling can be requested before the VM has started (or after it shut
/// down); every lookup goes through [`VmRef::get`] so that case degrades like
/// any other lookup failure.
#[derive(Clone, Copy, Default)]
pub struct VmRef<'vm>(Option<&'vm dyn VirtualMachine>);

impl<'vm> VmRef<'vm> {
    pub fn new(vm: &'vm dyn VirtualMachine) -> Self {
        Self(Some(vm))
    }

    /// No VM.
    pub const fn none() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Result<&'vm dyn VirtualMachine, MarshalError> {
        self.0.ok_or(MarshalError::VmUnavailable)
    }

    pub fn is_available(&self) -> bool {
        self.0.is_some()
    }
}

impl<'vm> From<&'vm dyn VirtualMachine> for VmRef<'vm> {
    fn from(vm: &'vm dyn VirtualMachine) -> Self {
        Self::new(vm)
    }
}

impl<'vm> From<Option<&'vm dyn VirtualMachine>> for VmRef<'vm> {
    fn from(vm: Option<&'vm dyn VirtualMachine>) -> Self {
        Self(vm)
    }
}

impl fmt::Debug for VmRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("VmRef").field(&self.is_available()).finish()
    }
}
