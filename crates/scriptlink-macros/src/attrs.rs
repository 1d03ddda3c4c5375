//! Attribute parsing for the scriptlink derives.

use proc_macro2::Span;
use syn::{Attribute, LitInt, LitStr};

/// Parsed `#[script(...)]` attributes of a `NativeObject` type.
#[derive(Debug, Default)]
pub struct NativeObjectAttrs {
    /// VM type id of the native class.
    pub type_id: Option<u32>,
    /// Belongs to the active-effect hierarchy.
    pub effect: bool,
}

/// Parsed `#[script(...)]` attributes of a `ScriptStruct` type.
#[derive(Debug, Default)]
pub struct StructAttrs {
    pub object: Option<LitStr>,
    pub structure: Option<LitStr>,
}

fn attr_name(path: &syn::Path) -> String {
    path.get_ident().map(|i| i.to_string()).unwrap_or_default()
}

impl NativeObjectAttrs {
    pub fn from_attrs(attrs: &[Attribute], span: Span) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("script") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("type_id") {
                    let value: LitInt = meta.value()?.parse()?;
                    result.type_id = Some(value.base10_parse::<u32>()?);
                } else if meta.path.is_ident("effect") {
                    result.effect = true;
                } else {
                    return Err(meta.error(format!(
                        "unknown script attribute: {}",
                        attr_name(&meta.path)
                    )));
                }
                Ok(())
            })?;
        }

        if result.type_id.is_none() {
            return Err(syn::Error::new(
                span,
                "NativeObject requires #[script(type_id = ...)]",
            ));
        }

        Ok(result)
    }
}

impl StructAttrs {
    pub fn from_attrs(attrs: &[Attribute], span: Span) -> syn::Result<Self> {
        let mut result = Self::default();

        for attr in attrs {
            if !attr.path().is_ident("script") {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("object") {
                    result.object = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("structure") {
                    result.structure = Some(meta.value()?.parse()?);
                } else {
                    return Err(meta.error(format!(
                        "unknown script attribute: {}",
                        attr_name(&meta.path)
                    )));
                }
                Ok(())
            })?;
        }

        for (lit, key) in [(&result.object, "object"), (&result.structure, "structure")] {
            match lit {
                None => {
                    return Err(syn::Error::new(
                        span,
                        format!("ScriptStruct requires #[script({key} = \"...\")]"),
                    ));
                }
                Some(lit) => {
                    let value = lit.value();
                    if value.is_empty() || value.contains('#') {
                        return Err(syn::Error::new(
                            lit.span(),
                            format!("{key} name must be non-empty and must not contain '#'"),
                        ));
                    }
                }
            }
        }

        Ok(result)
    }
}
