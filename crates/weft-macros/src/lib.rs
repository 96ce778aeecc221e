//! Derive macros for `weft-core`.

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::ext::IdentExt;
use syn::spanned::Spanned;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

/// Derives `weft_core::Shape` for a struct with named fields.
///
/// Alongside the impl this generates, with the struct's visibility:
///
/// - `<Name>Fields`: one `State` per field, same field names.
/// - `<Name>Patch`: every field wrapped in `Option`, `Default` is all `None`.
/// - `impl Merge<<Name>Patch> for <Name>`: a shallow merge.
///
/// Every field type must be `Clone + PartialEq + 'static`.
#[proc_macro_derive(Shape)]
pub fn derive_shape(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "`Shape` cannot be derived for generic structs",
        ));
    }
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(syn::Error::new(
                    data.fields.span(),
                    "`Shape` needs a struct with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                input.ident.span(),
                "`Shape` can only be derived for structs",
            ));
        }
    };

    let name = &input.ident;
    let vis = &input.vis;
    let fields_ident = format_ident!("{}Fields", name);
    let patch_ident = format_ident!("{}Patch", name);

    let idents: Vec<_> = named.iter().filter_map(|f| f.ident.as_ref()).collect();
    let types: Vec<_> = named.iter().map(|f| &f.ty).collect();
    let keys: Vec<String> = idents.iter().map(|i| i.unraw().to_string()).collect();
    let vises = std::iter::repeat_n(vis, idents.len()).collect::<Vec<_>>();

    let fields_doc = format!("Per-field states of [`{name}`].");
    let patch_doc = format!("A partial [`{name}`]; `None` leaves a field unchanged.");

    Ok(quote! {
        #[doc = #fields_doc]
        #[derive(Clone)]
        #vis struct #fields_ident {
            #( #vises #idents: ::weft_core::State<#types>, )*
        }

        #[doc = #patch_doc]
        #[derive(Default)]
        #vis struct #patch_ident {
            #( #vises #idents: ::core::option::Option<#types>, )*
        }

        #[automatically_derived]
        impl ::weft_core::Shape for #name {
            type Fields = #fields_ident;
            type Patch = #patch_ident;

            const KEYS: &'static [&'static str] = &[ #( #keys ),* ];

            fn split(&self) -> #fields_ident {
                #fields_ident {
                    #( #idents: ::weft_core::State::new(::core::clone::Clone::clone(&self.#idents)), )*
                }
            }

            fn join(fields: &#fields_ident) -> Self {
                Self {
                    #( #idents: fields.#idents.get(), )*
                }
            }

            fn watch(
                fields: &#fields_ident,
                notify: ::std::rc::Rc<dyn Fn()>,
            ) -> ::std::vec::Vec<::weft_core::Unsubscribe> {
                ::std::vec![
                    #( ::weft_core::Subscribable::subscribe_change(&fields.#idents, notify.clone()), )*
                ]
            }

            fn dispose(fields: &#fields_ident) {
                #( fields.#idents.dispose(); )*
            }

            fn apply(fields: &#fields_ident, patch: #patch_ident, force: bool) {
                #(
                    if let ::core::option::Option::Some(value) = patch.#idents {
                        fields.#idents.write(value, force);
                    }
                )*
            }

            fn into_patch(self) -> #patch_ident {
                #patch_ident {
                    #( #idents: ::core::option::Option::Some(self.#idents), )*
                }
            }
        }

        #[automatically_derived]
        impl ::weft_core::Merge<#patch_ident> for #name {
            fn merge(&self, partial: #patch_ident) -> Self {
                Self {
                    #(
                        #idents: match partial.#idents {
                            ::core::option::Option::Some(value) => value,
                            ::core::option::Option::None => ::core::clone::Clone::clone(&self.#idents),
                        },
                    )*
                }
            }
        }
    })
}
