//! Derive macros for Hazelcast serialization formats.
//!
//! - [`HazelcastPortable`] generates a `Portable` implementation for the
//!   schema-based, versioned format.
//! - [`IdentifiedDataSerializable`] generates an `IdentifiedDataSerializable`
//!   implementation for the factory-based format.
//!
//! # Example
//!
//! ```ignore
//! use hazelcast_derive::HazelcastPortable;
//!
//! #[derive(Debug, Default, HazelcastPortable)]
//! #[hazelcast(class_id = 1, version = 2)]
//! struct Person {
//!     name: String,
//!     age: i32,
//!     #[hazelcast(field_name = "emailAddress")]
//!     email: Option<String>,
//! }
//! ```
//!
//! Decoding goes through a factory that hands out default instances, so the
//! derived types are expected to implement `Default` and `Debug`.

extern crate proc_macro;

mod attrs;
mod identified;
mod portable;

use proc_macro::TokenStream;
use syn::parse_macro_input;

/// Derives the `Portable` trait for a struct.
///
/// # Attributes
///
/// ## Struct-level
/// - `#[hazelcast(class_id = N)]` is **required**.
/// - `#[hazelcast(version = N)]` pins the class version; without it the
///   service's configured version applies.
///
/// ## Field-level
/// - `#[hazelcast(field_name = "...")]` overrides the wire field name.
/// - `#[hazelcast(skip)]` skips this field during serialization.
///
/// # Supported Field Types
///
/// `bool`, `i8`, `char`, `i16`, `i32`, `i64`, `f32`, `f64`, `String`,
/// `Option<String>` and `Vec<T>` of those scalars or of `String`.
#[proc_macro_derive(HazelcastPortable, attributes(hazelcast))]
pub fn derive_portable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as syn::DeriveInput);
    portable::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Derives the `IdentifiedDataSerializable` trait for a struct.
///
/// # Attributes
///
/// ## Struct-level
/// - `#[hazelcast(factory_id = N)]` is **required**.
/// - `#[hazelcast(class_id = N)]` is **required**.
///
/// ## Field-level
/// - `#[hazelcast(skip)]` skips this field during serialization.
///
/// Fields are written in declaration order. Supported types are `bool`,
/// `i8`, `i16`, `i32`, `i64`, `f32`, `f64`, `String` and `Vec<u8>`.
#[proc_macro_derive(IdentifiedDataSerializable, attributes(hazelcast))]
pub fn derive_identified(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as syn::DeriveInput);
    identified::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
