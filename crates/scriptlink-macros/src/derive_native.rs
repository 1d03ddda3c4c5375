//! Implementation of the `#[derive(NativeObject)]` macro.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, parse_macro_input};

use crate::attrs::NativeObjectAttrs;

pub fn derive_native_object_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_native_object_inner(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_native_object_inner(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let attrs = NativeObjectAttrs::from_attrs(&input.attrs, input.ident.span())?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let type_id = attrs.type_id.unwrap_or_default();
    let kind = if attrs.effect {
        quote! { ::scriptlink::NativeKind::Effect }
    } else {
        quote! { ::scriptlink::NativeKind::Form }
    };

    Ok(quote! {
        impl #impl_generics ::scriptlink::NativeObject for #name #ty_generics #where_clause {
            const TYPE_ID: ::scriptlink::VmTypeId = ::scriptlink::VmTypeId::new(#type_id);
            const KIND: ::scriptlink::NativeKind = #kind;
        }
    })
}
