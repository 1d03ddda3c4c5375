//! scriptlink proc macros
//!
//! Compile-time tags for host types that cross the script boundary.
//!
//! - `#[derive(NativeObject)]` - give a native class its VM type id
//! - `#[derive(ScriptStruct)]` - name the script structure a
//!   `StructureProxy` wraps
//!
//! Both derives expand to paths under `::scriptlink` and are meant to be used
//! through that crate's re-exports.

use proc_macro::TokenStream;

mod attrs;
mod derive_native;
mod derive_struct;

/// Derive `NativeObject` for a host type.
///
/// # Attributes
///
/// - `#[script(type_id = N)]` - VM type id of the class (required)
/// - `#[script(effect)]` - the type belongs to the active-effect hierarchy,
///   whose handles are checked against the VM's active-effect type
///
/// # Example
///
/// ```ignore
/// #[derive(NativeObject)]
/// #[script(type_id = 0x2B)]
/// pub struct Actor {
///     pub name: String,
/// }
/// ```
#[proc_macro_derive(NativeObject, attributes(script))]
pub fn derive_native_object(input: TokenStream) -> TokenStream {
    derive_native::derive_native_object_impl(input)
}

/// Derive `StructTag` for a structure marker type.
///
/// The tag (`Object#Structure`) is assembled at compile time.
///
/// # Attributes
///
/// - `#[script(object = "...")]` - owning script object (required)
/// - `#[script(structure = "...")]` - structure name (required)
///
/// # Example
///
/// ```ignore
/// #[derive(ScriptStruct)]
/// #[script(object = "Actor", structure = "Stats")]
/// pub struct Stats;
///
/// assert_eq!(Stats::TAG, "Actor#Stats");
/// ```
#[proc_macro_derive(ScriptStruct, attributes(script))]
pub fn derive_script_struct(input: TokenStream) -> TokenStream {
    derive_struct::derive_script_struct_impl(input)
}
