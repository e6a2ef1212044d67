extern crate proc_macro;

mod codegen;
mod error;
mod resolve;
mod schema;

use codegen::Options;
use error::SchemaError;
use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use std::path::PathBuf;
use syn::parse::{Parse, ParseStream};
use syn::{parse_macro_input, LitBool, LitStr, Token};

/// Arguments of `include_schema!`.
///
/// * `"path/to/schema.json"` - Required, relative to `CARGO_MANIFEST_DIR`
/// * `functions = false` - Skip code generation for the `methods` group
struct SchemaArgs {
    path: LitStr,
    options: Options,
}

impl Parse for SchemaArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let path = input.parse::<LitStr>()?;
        let mut options = Options::default();

        while !input.is_empty() {
            input.parse::<Token![,]>()?;
            if input.is_empty() {
                break;
            }
            let ident = input.parse::<syn::Ident>()?;
            if ident == "functions" {
                input.parse::<Token![=]>()?;
                options.functions = input.parse::<LitBool>()?.value;
            } else {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("Unknown argument: {}", ident),
                ));
            }
        }

        Ok(SchemaArgs { path, options })
    }
}

/// Compiles a schema document into Rust source.
///
/// Parsing, type resolution and generation run in that order; the first
/// failure aborts with no partial output.
fn compile(json: &str, options: &Options) -> Result<proc_macro2::TokenStream, SchemaError> {
    let schema = schema::parse_schema(json)?;
    let resolution = resolve::resolve(&schema)?;
    codegen::generate(&resolution, options)
}

fn read_schema(path: &LitStr) -> Result<(PathBuf, String), SchemaError> {
    let root = std::env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".to_string());
    let full = PathBuf::from(root).join(path.value());
    let json = std::fs::read_to_string(&full).map_err(|source| SchemaError::Io {
        path: full.display().to_string(),
        source,
    })?;
    Ok((full, json))
}

/// Generates the codec for a TL schema document.
///
/// Expands to `pub mod types`, `pub mod functions`, `pub enum Object`,
/// `pub fn name_for_id` and `pub const CONSTRUCTOR_COUNT` at the call site.
///
/// # Examples
///
/// ```rust,ignore
/// tl_wire::include_schema!("schema/mtproto.json");
/// tl_wire::include_schema!("schema/api.json", functions = false);
/// ```
#[proc_macro]
pub fn include_schema(input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(input as SchemaArgs);

    let expanded = read_schema(&args.path).and_then(|(full, json)| {
        let codec = compile(&json, &args.options)?;
        let full = full.display().to_string();
        Ok(quote! {
            const _: &[u8] = include_bytes!(#full);
            #codec
        })
    });

    match expanded {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => {
            let span = match err {
                SchemaError::Io { .. } => args.path.span(),
                _ => Span::call_site(),
            };
            syn::Error::new(span, err.to_string())
                .to_compile_error()
                .into()
        }
    }
}
