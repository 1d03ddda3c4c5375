//! In-memory reference VM for scriptlink.
//!
//! [`MemoryVm`] implements [`scriptlink_core::VirtualMachine`] without a real
//! script runtime: types are declared up front through [`MemoryVmBuilder`],
//! host objects are made addressable through [`MemoryHandlePolicy`], and
//! issued calls run when the embedder pumps [`MemoryVm::run_pending`].
//!
//! It backs the marshalling layer's integration tests and is usable by
//! embedders that want to exercise native bindings without a game process.

mod error;
mod policy;
mod types;
mod vm;

pub use error::RegistryError;
pub use policy::MemoryHandlePolicy;
pub use types::TypeTable;
pub use vm::{
    DEFAULT_ACTIVE_EFFECT_TYPE, DEFAULT_REFERENCE_TYPE, MemoryVm, MemoryVmBuilder, function_key,
};
