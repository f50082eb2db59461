//! Derive macro implementation for `IdentifiedDataSerializable`.

use crate::attrs;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::DeriveInput;

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let factory_id = attrs::int_attr(&input.attrs, "factory_id")?.ok_or_else(|| {
        syn::Error::new_spanned(
            name,
            "IdentifiedDataSerializable requires #[hazelcast(factory_id = N)]",
        )
    })?;
    let class_id = attrs::int_attr(&input.attrs, "class_id")?.ok_or_else(|| {
        syn::Error::new_spanned(
            name,
            "IdentifiedDataSerializable requires #[hazelcast(class_id = N)]",
        )
    })?;

    let mut write_stmts = Vec::new();
    let mut read_stmts = Vec::new();

    for field in attrs::named_fields(input, "IdentifiedDataSerializable")? {
        if attrs::has_skip(&field.attrs)? {
            continue;
        }
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };

        let kind = match attrs::type_name(&field.ty).as_str() {
            "bool" => "bool",
            "i8" => "byte",
            "i16" => "short",
            "i32" => "int",
            "i64" => "long",
            "f32" => "float",
            "f64" => "double",
            "String" => {
                write_stmts.push(quote! { output.write_string(&self.#ident)?; });
                read_stmts.push(quote! { self.#ident = input.read_string()?; });
                continue;
            }
            "Vec<u8>" => {
                write_stmts.push(quote! { output.write_byte_array(&self.#ident)?; });
                read_stmts.push(quote! { self.#ident = input.read_byte_array()?; });
                continue;
            }
            other => {
                return Err(syn::Error::new_spanned(
                    &field.ty,
                    format!(
                        "IdentifiedDataSerializable cannot encode `{}`; implement it by hand or mark the field #[hazelcast(skip)]",
                        other
                    ),
                ))
            }
        };
        let write = format_ident!("write_{}", kind);
        let read = format_ident!("read_{}", kind);
        write_stmts.push(quote! { output.#write(self.#ident)?; });
        read_stmts.push(quote! { self.#ident = input.#read()?; });
    }

    Ok(quote! {
        impl #impl_generics ::hazelcast_serialization::serialization::IdentifiedDataSerializable
            for #name #ty_generics #where_clause
        {
            fn factory_id(&self) -> i32 {
                #factory_id
            }

            fn class_id(&self) -> i32 {
                #class_id
            }

            fn write_data(
                &self,
                output: &mut ::hazelcast_serialization::serialization::ObjectDataOutput<'_>,
            ) -> ::hazelcast_serialization::Result<()> {
                use ::hazelcast_serialization::serialization::DataOutput as _;
                #(#write_stmts)*
                ::core::result::Result::Ok(())
            }

            fn read_data(
                &mut self,
                input: &mut ::hazelcast_serialization::serialization::ObjectDataInput<'_>,
            ) -> ::hazelcast_serialization::Result<()> {
                use ::hazelcast_serialization::serialization::DataInput as _;
                #(#read_stmts)*
                ::core::result::Result::Ok(())
            }
        }
    })
}
