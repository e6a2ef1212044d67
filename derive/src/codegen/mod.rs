//! Turns a [`Resolution`] into Rust items.
//!
//! The output is emitted at the macro call site as:
//!
//! - `pub mod types`, one struct per constructor
//! - `pub mod functions`, one struct per method
//! - `pub enum Object` with its dispatch table, and `name_for_id`

mod decode;
mod encode;

use crate::error::SchemaError;
use crate::resolve::{Element, FieldKind, Resolution, ResolvedConstructor, ResolvedParam, Scalar};
use crate::schema::Category;
use itertools::Itertools;
use proc_macro2::{Span, TokenStream};
use quote::{format_ident, quote};
use syn::{Ident, LitInt};

/// Options taken from the macro invocation.
#[derive(Debug, Clone)]
pub struct Options {
    /// Emit structs and `Object` variants for the `methods` group.
    pub functions: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options { functions: true }
    }
}

/// `auth_sentCode` -> `AuthSentCode`.
pub fn struct_name(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

pub(crate) fn struct_ident(name: &str) -> Ident {
    format_ident!("{}", struct_name(name))
}

pub(crate) fn field_ident(name: &str) -> Ident {
    format_ident!("{}", name)
}

pub(crate) fn tag_literal(tag: u32) -> LitInt {
    LitInt::new(&format!("0x{:08x}_u32", tag), Span::call_site())
}

fn scalar_type(scalar: Scalar) -> TokenStream {
    match scalar {
        Scalar::Int => quote! { i32 },
        Scalar::Long => quote! { i64 },
        Scalar::Double => quote! { f64 },
        Scalar::String => quote! { ::std::string::String },
        Scalar::Bytes => quote! { ::tl_wire::bytes::Bytes },
        Scalar::Bool => quote! { bool },
    }
}

fn record_path(name: &str) -> TokenStream {
    let ident = struct_ident(name);
    quote! { super::types::#ident }
}

/// The Rust type of a field, before any `Option` wrapping for its flag.
pub(crate) fn value_type(kind: &FieldKind) -> TokenStream {
    match kind {
        FieldKind::Flags => quote! { u32 },
        FieldKind::Scalar(scalar) => scalar_type(*scalar),
        FieldKind::Presence => quote! { bool },
        FieldKind::Record(name) => {
            let path = record_path(name);
            quote! { ::std::boxed::Box<#path> }
        }
        FieldKind::Generic => quote! { ::std::boxed::Box<super::Object> },
        FieldKind::Vector(element) => {
            let element = match element {
                Element::Scalar(scalar) => scalar_type(*scalar),
                Element::Record(name) => record_path(name),
                Element::Generic => quote! { super::Object },
            };
            quote! { ::std::vec::Vec<#element> }
        }
    }
}

/// `Option<T>` for flagged data fields, `T` otherwise.
pub(crate) fn field_type(param: &ResolvedParam<'_>) -> TokenStream {
    let ty = value_type(&param.kind);
    if param.param.flag.is_some() && param.kind != FieldKind::Presence {
        quote! { ::std::option::Option<#ty> }
    } else {
        ty
    }
}

/// `<word> & (1 << bit) != 0`, with `word` naming a local or `self` field.
pub(crate) fn flag_test(word: TokenStream, bit: u32) -> TokenStream {
    quote! { #word & (1u32 << #bit) != 0 }
}

fn struct_item(resolved: &ResolvedConstructor<'_>) -> TokenStream {
    let constructor = resolved.constructor;
    let ident = struct_ident(&constructor.name);
    let name = &constructor.name;
    let tag = tag_literal(constructor.tag);
    let doc = format!(
        " `{}#{:08x}` = `{}`",
        constructor.name, constructor.tag, constructor.result_type
    );

    let fields = resolved.params.iter().map(|param| {
        let field = field_ident(&param.param.name);
        let ty = field_type(param);
        quote! { pub #field: #ty }
    });

    let encode_impl = encode::encoder_impl(resolved);
    let bare_impl = decode::bare_impl(resolved);

    quote! {
        #[doc = #doc]
        #[derive(Clone, Debug, PartialEq)]
        pub struct #ident {
            #(#fields,)*
        }

        impl ::tl_wire::Identifiable for #ident {
            const CONSTRUCTOR_ID: u32 = #tag;
            const NAME: &'static str = #name;
        }

        #encode_impl
        #bare_impl

        impl ::tl_wire::Decoder for #ident {
            fn decode(reader: &mut ::tl_wire::bytes::Bytes) -> ::tl_wire::Result<Self> {
                let object = <super::Object as ::tl_wire::Decoder>::decode(reader)?;
                <Self as ::std::convert::TryFrom<super::Object>>::try_from(object)
            }
        }

        impl ::std::convert::From<#ident> for super::Object {
            fn from(value: #ident) -> Self {
                super::Object::#ident(value)
            }
        }

        impl ::std::convert::TryFrom<super::Object> for #ident {
            type Error = ::tl_wire::EncoderError;

            #[allow(unreachable_patterns)]
            fn try_from(object: super::Object) -> ::std::result::Result<Self, Self::Error> {
                match object {
                    super::Object::#ident(value) => Ok(value),
                    other => Err(::tl_wire::DecodeError::UnexpectedConstructor {
                        expected: #name,
                        found: other.name(),
                    }
                    .into()),
                }
            }
        }
    }
}

/// One doc line per field bound by encounter order rather than by name.
fn divergence_docs(resolution: &Resolution<'_>) -> Vec<String> {
    resolution
        .divergences
        .iter()
        .map(|d| {
            format!(
                " - `{}.{}: {}` resolves to {} (by name: {})",
                d.constructor,
                d.field,
                d.declared,
                d.registry.as_deref().unwrap_or("`Object`"),
                d.by_name.as_deref().unwrap_or("none"),
            )
        })
        .collect()
}

/// Generates the complete codec for a resolved schema.
pub fn generate(resolution: &Resolution<'_>, options: &Options) -> Result<TokenStream, SchemaError> {
    let emitted: Vec<&ResolvedConstructor<'_>> = resolution
        .constructors
        .iter()
        .filter(|c| options.functions || c.constructor.category == Category::Type)
        .collect();
    if emitted.is_empty() {
        return Err(SchemaError::Empty);
    }

    if let Some(duplicate) = emitted
        .iter()
        .map(|c| struct_name(&c.constructor.name))
        .duplicates()
        .next()
    {
        return Err(SchemaError::DuplicateName(duplicate));
    }

    let (types, functions): (Vec<_>, Vec<_>) = emitted
        .iter()
        .copied()
        .partition(|c| c.constructor.category == Category::Type);
    let type_items = types.iter().map(|c| struct_item(c));
    let function_items = functions.iter().map(|c| struct_item(c));
    let object = decode::object_items(&emitted, &divergence_docs(resolution));

    tracing::debug!(
        types = types.len(),
        functions = functions.len(),
        divergences = resolution.divergences.len(),
        "generated codec"
    );

    Ok(quote! {
        #[allow(non_snake_case, clippy::all)]
        pub mod types {
            #(#type_items)*
        }

        #[allow(non_snake_case, clippy::all)]
        pub mod functions {
            #(#function_items)*
        }

        #object
    })
}
