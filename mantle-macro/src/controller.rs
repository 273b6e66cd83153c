use crate::injectable::{generate_injectable_impl, is_inject_attr};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, ItemStruct};

pub fn controller_attribute(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::TokenStream::from(attr).into_iter().next().map_or_else(
                proc_macro2::Span::call_site,
                |token| token.span(),
            ),
            "#[controller] takes no arguments; routes are declared on methods",
        )
        .to_compile_error()
        .into();
    }

    let mut input = parse_macro_input!(item as ItemStruct);
    let injectable = match generate_injectable_impl(&input.ident, &input.generics, &input.fields) {
        Ok(tokens) => tokens,
        Err(err) => return err.to_compile_error().into(),
    };

    // `inject` is only registered as a helper of the derive; strip it here.
    for field in input.fields.iter_mut() {
        field.attrs.retain(|attr| !is_inject_attr(attr));
    }

    TokenStream::from(quote! {
        #input
        #injectable
    })
}
