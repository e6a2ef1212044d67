use super::{field_ident, flag_test, struct_ident, tag_literal, value_type};
use crate::resolve::{FieldKind, ResolvedConstructor, ResolvedParam};
use crate::schema::Category;
use proc_macro2::TokenStream;
use quote::{format_ident, quote, ToTokens};
use syn::Ident;

fn local_ident(name: &str) -> Ident {
    format_ident!("f_{}", name)
}

/// One field's read, bound to a local so that later fields can test bits of
/// an already-read flags word.
fn read_field(param: &ResolvedParam<'_>) -> TokenStream {
    let local = local_ident(&param.param.name);
    let ty = value_type(&param.kind);

    match (&param.param.flag, &param.kind) {
        (Some(flag), FieldKind::Presence) => {
            let test = flag_test(local_ident(&flag.word).into_token_stream(), flag.bit);
            quote! { let #local = #test; }
        }
        (Some(flag), _) => {
            let test = flag_test(local_ident(&flag.word).into_token_stream(), flag.bit);
            quote! {
                let #local = if #test {
                    Some(<#ty as ::tl_wire::Decoder>::decode(reader)?)
                } else {
                    None
                };
            }
        }
        (None, _) => quote! {
            let #local = <#ty as ::tl_wire::Decoder>::decode(reader)?;
        },
    }
}

/// `impl Bare`: reads the body of a record whose tag was already consumed.
pub(super) fn bare_impl(resolved: &ResolvedConstructor<'_>) -> TokenStream {
    let ident = struct_ident(&resolved.constructor.name);
    let reads = resolved.params.iter().map(read_field);
    let assignments = resolved.params.iter().map(|param| {
        let field = field_ident(&param.param.name);
        let local = local_ident(&param.param.name);
        quote! { #field: #local }
    });
    let reader = if resolved.params.is_empty() {
        quote! { _reader }
    } else {
        quote! { reader }
    };

    quote! {
        impl ::tl_wire::Bare for #ident {
            fn decode_bare(#reader: &mut ::tl_wire::bytes::Bytes) -> ::tl_wire::Result<Self> {
                #(#reads)*
                Ok(Self {
                    #(#assignments,)*
                })
            }
        }
    }
}

fn variant_path(resolved: &ResolvedConstructor<'_>) -> TokenStream {
    let ident = struct_ident(&resolved.constructor.name);
    match resolved.constructor.category {
        Category::Type => quote! { types::#ident },
        Category::Function => quote! { functions::#ident },
    }
}

/// The `Object` enum, its total dispatch table and the tag-to-name lookup.
pub(super) fn object_items(
    constructors: &[&ResolvedConstructor<'_>],
    divergences: &[String],
) -> TokenStream {
    let variants: Vec<Ident> = constructors
        .iter()
        .map(|c| struct_ident(&c.constructor.name))
        .collect();
    let paths: Vec<TokenStream> = constructors.iter().map(|c| variant_path(c)).collect();
    let tags: Vec<_> = constructors
        .iter()
        .map(|c| tag_literal(c.constructor.tag))
        .collect();
    let names: Vec<&str> = constructors
        .iter()
        .map(|c| c.constructor.name.as_str())
        .collect();
    let count = constructors.len();
    let divergence_header = if divergences.is_empty() {
        TokenStream::new()
    } else {
        quote! {
            ///
            /// Fields whose static type was chosen by the first constructor seen
            /// for the result type, not by name equality:
            ///
        }
    };

    quote! {
        /// Any value of the schema, resolved from its tag at decode time.
        #divergence_header
        #(#[doc = #divergences])*
        #[derive(Clone, Debug, PartialEq)]
        pub enum Object {
            #(#variants(#paths),)*
        }

        impl Object {
            /// Decodes the body of the constructor identified by `tag`.
            ///
            /// `tag` has already been read from `reader`.
            pub fn dispatch(
                tag: u32,
                reader: &mut ::tl_wire::bytes::Bytes,
            ) -> ::tl_wire::Result<Self> {
                match tag {
                    #(#tags => <#paths as ::tl_wire::Bare>::decode_bare(reader).map(Object::#variants),)*
                    _ => Err(::tl_wire::unknown_constructor(tag)),
                }
            }

            pub fn constructor_id(&self) -> u32 {
                match self {
                    #(Object::#variants(_) => <#paths as ::tl_wire::Identifiable>::CONSTRUCTOR_ID,)*
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    #(Object::#variants(_) => <#paths as ::tl_wire::Identifiable>::NAME,)*
                }
            }
        }

        impl ::tl_wire::Encoder for Object {
            fn encode(&self, writer: &mut ::tl_wire::bytes::BytesMut) -> ::tl_wire::Result<()> {
                match self {
                    #(Object::#variants(value) => ::tl_wire::Encoder::encode(value, writer),)*
                }
            }
        }

        impl ::tl_wire::Decoder for Object {
            fn decode(reader: &mut ::tl_wire::bytes::Bytes) -> ::tl_wire::Result<Self> {
                let tag = <u32 as ::tl_wire::Decoder>::decode(reader)?;
                Object::dispatch(tag, reader)
            }
        }

        /// Number of constructors and methods in the dispatch table.
        pub const CONSTRUCTOR_COUNT: usize = #count;

        /// The schema name for a tag, if the tag is known.
        pub fn name_for_id(id: u32) -> ::std::option::Option<&'static str> {
            match id {
                #(#tags => Some(#names),)*
                _ => None,
            }
        }
    }
}
