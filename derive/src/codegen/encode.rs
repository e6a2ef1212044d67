use super::{field_ident, flag_test, struct_ident};
use crate::resolve::{FieldKind, ResolvedConstructor, ResolvedParam};
use proc_macro2::TokenStream;
use quote::quote;

/// One field's write, in declaration order.
///
/// Every field type implements `Encoder`: primitives write raw bytes, records
/// and `Object` write their own tag first, and `Vec<T>` writes the vector
/// framing followed by whatever `T` writes. The resolved kind therefore only
/// decides the field's type, never the shape of the call.
///
/// A flagged field must agree with its bit: a value with the bit clear, or no
/// value with the bit set, is an encode error.
fn write_field(constructor: &str, param: &ResolvedParam<'_>) -> TokenStream {
    let field = field_ident(&param.param.name);
    let name = &param.param.name;

    match (&param.param.flag, &param.kind) {
        (Some(flag), FieldKind::Presence) => {
            let word = field_ident(&flag.word);
            let bit = flag.bit;
            let test = flag_test(quote! { self.#word }, bit);
            let missing = flag_error(quote! { MissingFlaggedField }, constructor, name, bit);
            let unexpected = flag_error(quote! { UnexpectedFlaggedField }, constructor, name, bit);
            quote! {
                match (#test, self.#field) {
                    (true, false) => return #missing,
                    (false, true) => return #unexpected,
                    _ => {}
                }
            }
        }
        (Some(flag), _) => {
            let word = field_ident(&flag.word);
            let bit = flag.bit;
            let test = flag_test(quote! { self.#word }, bit);
            let missing = flag_error(quote! { MissingFlaggedField }, constructor, name, bit);
            let unexpected = flag_error(quote! { UnexpectedFlaggedField }, constructor, name, bit);
            quote! {
                match (#test, &self.#field) {
                    (true, Some(value)) => ::tl_wire::Encoder::encode(value, writer)?,
                    (true, None) => return #missing,
                    (false, Some(_)) => return #unexpected,
                    (false, None) => {}
                }
            }
        }
        (None, _) => quote! {
            ::tl_wire::Encoder::encode(&self.#field, writer)?;
        },
    }
}

fn flag_error(variant: TokenStream, constructor: &str, field: &str, bit: u32) -> TokenStream {
    quote! {
        Err(::tl_wire::EncodeError::#variant {
            constructor: #constructor,
            field: #field,
            bit: #bit,
        }
        .into())
    }
}

/// `impl Encoder`: the tag, then each parameter in declaration order.
pub(super) fn encoder_impl(resolved: &ResolvedConstructor<'_>) -> TokenStream {
    let ident = struct_ident(&resolved.constructor.name);
    let constructor = resolved.constructor.name.as_str();
    let writes = resolved.params.iter().map(|p| write_field(constructor, p));

    quote! {
        impl ::tl_wire::Encoder for #ident {
            fn encode(&self, writer: &mut ::tl_wire::bytes::BytesMut) -> ::tl_wire::Result<()> {
                ::tl_wire::Encoder::encode(&<Self as ::tl_wire::Identifiable>::CONSTRUCTOR_ID, writer)?;
                #(#writes)*
                Ok(())
            }
        }
    }
}
