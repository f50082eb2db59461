//! Derive macro implementation for `HazelcastPortable`.

use crate::attrs;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{DeriveInput, Ident};

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let class_id = attrs::int_attr(&input.attrs, "class_id")?.ok_or_else(|| {
        syn::Error::new_spanned(name, "HazelcastPortable requires #[hazelcast(class_id = N)]")
    })?;
    let version = attrs::int_attr(&input.attrs, "version")?.map(|v| {
        quote! {
            fn version(&self) -> ::core::option::Option<i32> {
                ::core::option::Option::Some(#v)
            }
        }
    });

    let mut write_stmts = Vec::new();
    let mut read_stmts = Vec::new();

    for field in attrs::named_fields(input, "HazelcastPortable")? {
        if attrs::has_skip(&field.attrs)? {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let wire = attrs::str_attr(&field.attrs, "field_name")?
            .unwrap_or_else(|| ident.to_string());

        let (write, read) = match attrs::type_name(&field.ty).as_str() {
            "bool" => scalar(ident, &wire, "bool"),
            "i8" => scalar(ident, &wire, "byte"),
            "char" => scalar(ident, &wire, "char"),
            "i16" => scalar(ident, &wire, "short"),
            "i32" => scalar(ident, &wire, "int"),
            "i64" => scalar(ident, &wire, "long"),
            "f32" => scalar(ident, &wire, "float"),
            "f64" => scalar(ident, &wire, "double"),
            "String" => (
                quote! {
                    writer.write_string(#wire, ::core::option::Option::Some(self.#ident.as_str()))?;
                },
                quote! { self.#ident = reader.read_string(#wire)?.unwrap_or_default(); },
            ),
            "Option<String>" => (
                quote! { writer.write_string(#wire, self.#ident.as_deref())?; },
                quote! { self.#ident = reader.read_string(#wire)?; },
            ),
            "Vec<i8>" => array(ident, &wire, "byte"),
            "Vec<bool>" => array(ident, &wire, "bool"),
            "Vec<char>" => array(ident, &wire, "char"),
            "Vec<i16>" => array(ident, &wire, "short"),
            "Vec<i32>" => array(ident, &wire, "int"),
            "Vec<i64>" => array(ident, &wire, "long"),
            "Vec<f32>" => array(ident, &wire, "float"),
            "Vec<f64>" => array(ident, &wire, "double"),
            "Vec<String>" => array(ident, &wire, "string"),
            other => {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    format!(
                        "HazelcastPortable cannot encode `{}`; implement Portable by hand or mark the field #[hazelcast(skip)]",
                        other
                    ),
                ))
            }
        };
        write_stmts.push(write);
        read_stmts.push(read);
    }

    Ok(quote! {
        impl #impl_generics ::hazelcast_serialization::serialization::Portable
            for #name #ty_generics #where_clause
        {
            fn class_id(&self) -> i32 {
                #class_id
            }

            #version

            fn write_portable(
                &self,
                writer: &mut dyn ::hazelcast_serialization::serialization::PortableWriter,
            ) -> ::hazelcast_serialization::Result<()> {
                #(#write_stmts)*
                ::core::result::Result::Ok(())
            }

            fn read_portable(
                &mut self,
                reader: &mut dyn ::hazelcast_serialization::serialization::PortableReader,
            ) -> ::hazelcast_serialization::Result<()> {
                #(#read_stmts)*
                ::core::result::Result::Ok(())
            }
        }
    })
}

fn scalar(ident: &Ident, wire: &str, kind: &str) -> (TokenStream, TokenStream) {
    let write = format_ident!("write_{}", kind);
    let read = format_ident!("read_{}", kind);
    (
        quote! { writer.#write(#wire, self.#ident)?; },
        quote! { self.#ident = reader.#read(#wire)?; },
    )
}

// Absent arrays decode as empty.
fn array(ident: &Ident, wire: &str, kind: &str) -> (TokenStream, TokenStream) {
    let write = format_ident!("write_{}_array", kind);
    let read = format_ident!("read_{}_array", kind);
    (
        quote! { writer.#write(#wire, ::core::option::Option::Some(self.#ident.as_slice()))?; },
        quote! { self.#ident = reader.#read(#wire)?.unwrap_or_default(); },
    )
}
