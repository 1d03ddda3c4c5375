//! Implementation of the `#[derive(ScriptStruct)]` macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

use crate::attrs::StructAttrs;

pub fn derive_script_struct_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_script_struct_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_script_struct_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let attrs = StructAttrs::from_attrs(&input.attrs, input.ident.span())?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let object = attrs.object.map(|lit| lit.value()).unwrap_or_default();
    let structure = attrs.structure.map(|lit| lit.value()).unwrap_or_default();
    // Must match STRUCTURE_TAG_SEPARATOR in scriptlink-core.
    let tag = format!("{object}#{structure}");

    Ok(quote! {
        impl #impl_generics ::scriptlink::StructTag for #name #ty_generics #where_clause {
            const OBJECT: &'static str = #object;
            const STRUCTURE: &'static str = #structure;
            const TAG: &'static str = #tag;
        }
    })
}
