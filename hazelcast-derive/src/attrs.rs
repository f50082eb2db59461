//! `#[hazelcast(...)]` attribute parsing shared by the derives.

use syn::{Attribute, Lit};

pub fn int_attr(attrs: &[Attribute], key: &str) -> syn::Result<Option<i32>> {
    let mut result = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("hazelcast")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) {
                let lit: Lit = meta.value()?.parse()?;
                match lit {
                    Lit::Int(int_lit) => result = Some(int_lit.base10_parse::<i32>()?),
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            format!("`{}` expects an integer literal", key),
                        ))
                    }
                }
            } else if meta.input.peek(syn::Token![=]) {
                let _: Lit = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }
    Ok(result)
}

pub fn str_attr(attrs: &[Attribute], key: &str) -> syn::Result<Option<String>> {
    let mut result = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("hazelcast")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) {
                let lit: Lit = meta.value()?.parse()?;
                match lit {
                    Lit::Str(s) => result = Some(s.value()),
                    other => {
                        return Err(syn::Error::new_spanned(
                            other,
                            format!("`{}` expects a string literal", key),
                        ))
                    }
                }
            } else if meta.input.peek(syn::Token![=]) {
                let _: Lit = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }
    Ok(result)
}

pub fn has_skip(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut found = false;
    for attr in attrs.iter().filter(|a| a.path().is_ident("hazelcast")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                found = true;
            } else if meta.input.peek(syn::Token![=]) {
                let _: Lit = meta.value()?.parse()?;
            }
            Ok(())
        })?;
    }
    Ok(found)
}

/// Renders a type without whitespace, e.g. `Option<String>`.
pub fn type_name(ty: &syn::Type) -> String {
    quote::quote!(#ty).to_string().replace(' ', "")
}

pub fn named_fields<'a>(
    input: &'a syn::DeriveInput,
    derive: &str,
) -> syn::Result<&'a syn::punctuated::Punctuated<syn::Field, syn::Token![,]>> {
    match &input.data {
        syn::Data::Struct(data) => match &data.fields {
            syn::Fields::Named(fields) => Ok(&fields.named),
            _ => Err(syn::Error::new_spanned(
                &input.ident,
                format!("{} only supports structs with named fields", derive),
            )),
        },
        _ => Err(syn::Error::new_spanned(
            &input.ident,
            format!("{} can only be derived for structs", derive),
        )),
    }
}
