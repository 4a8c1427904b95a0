//! Procedural macros for docmapper.
//!
//! `#[derive(Mapped)]` builds a `Mapper<Self>` from the named fields of a struct. Each
//! field is registered as a direct member under its own name, in declaration order.
//! Field attributes adjust a registration:
//!
//! - `#[mapped(rename = "_id")]` - use another document field name
//! - `#[mapped(nested)]` - the field type is itself `Mapped`
//! - `#[mapped(sequence)]` - the field is a `Vec` of a `Mapped` type
//! - `#[mapped(serde)]` - encode through bson's serde bridge
//! - `#[mapped(skip)]` - leave the field out of the document
//!
//! ```ignore
//! #[derive(Debug, Default, Clone, Mapped)]
//! pub struct Family {
//!     #[mapped(rename = "_id")]
//!     pub id: i32,
//!     pub surname: String,
//!     #[mapped(sequence)]
//!     pub children: Vec<Child>,
//!     #[mapped(skip)]
//!     pub cached_size: usize,
//! }
//! ```

#![warn(missing_docs)]

#[allow(unused_extern_crates)]
extern crate self as docmapper_macros;

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, LitStr, parse_macro_input, spanned::Spanned};

/// Derives `Mapped` for a struct with named fields.
///
/// See the crate documentation for the accepted `#[mapped(...)]` attributes.
#[proc_macro_derive(Mapped, attributes(mapped))]
pub fn derive_mapped(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

#[derive(Default, PartialEq)]
enum Strategy {
    #[default]
    Value,
    Nested,
    Sequence,
    Serde,
}

#[derive(Default)]
struct FieldOptions {
    rename: Option<String>,
    strategy: Strategy,
    skip: bool,
}

impl FieldOptions {
    fn parse(field: &Field) -> syn::Result<Self> {
        let mut options = FieldOptions::default();

        for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("mapped")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let name: LitStr = meta.value()?.parse()?;
                    options.rename = Some(name.value());
                    return Ok(());
                }

                if meta.path.is_ident("skip") {
                    options.skip = true;
                    return Ok(());
                }

                let strategy = if meta.path.is_ident("nested") {
                    Strategy::Nested
                } else if meta.path.is_ident("sequence") {
                    Strategy::Sequence
                } else if meta.path.is_ident("serde") {
                    Strategy::Serde
                } else {
                    return Err(meta.error("expected one of `rename`, `nested`, `sequence`, `serde`, `skip`"));
                };

                if options.strategy != Strategy::Value {
                    return Err(meta.error("only one of `nested`, `sequence` and `serde` may be given"));
                }

                options.strategy = strategy;
                Ok(())
            })?;
        }

        Ok(options)
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => return Err(syn::Error::new(input.span(), "Mapped can only be derived for structs with named fields")),
        },
        _ => return Err(syn::Error::new(input.span(), "Mapped can only be derived for structs")),
    };

    let mut registrations = Vec::with_capacity(fields.len());

    for field in fields {
        let options = FieldOptions::parse(field)?;

        if options.skip {
            continue;
        }

        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
        let name = options
            .rename
            .unwrap_or_else(|| ident.to_string());

        let accessor = quote! {
            ::docmapper::accessor::Member::<Self, _>::new(
                stringify!(#ident),
                |target: &Self| &target.#ident,
                |target: &mut Self| &mut target.#ident,
            )
        };

        registrations.push(match options.strategy {
            Strategy::Value => quote! {
                mapper.add_field(#name, #accessor);
            },
            Strategy::Nested => quote! {
                mapper.add_nested(#name, #accessor, ::docmapper::document::Mapped::mapper());
            },
            Strategy::Sequence => quote! {
                mapper.add_sequence(#name, #accessor, ::docmapper::document::Mapped::mapper());
            },
            Strategy::Serde => quote! {
                mapper.add_serde_field(#name, #accessor);
            },
        });
    }

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::docmapper::document::Mapped for #ident #ty_generics #where_clause {
            fn mapper() -> ::docmapper::mapper::Mapper<Self> {
                #[allow(unused_mut)]
                let mut mapper = ::docmapper::mapper::Mapper::new();
                #(#registrations)*
                mapper
            }
        }
    })
}
