use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, spanned::Spanned, Attribute, Data, DeriveInput, Field, Fields, Generics,
    Ident, Type,
};

pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        _ => {
            return syn::Error::new(input.span(), "#[derive(Injectable)] can only be applied to structs")
                .to_compile_error()
                .into();
        }
    };

    generate_injectable_impl(&input.ident, &input.generics, fields)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

enum Strategy {
    /// `Arc<T>` resolved from the container.
    Make(Type),
    /// `Arc<T>` constructed through `Injectable` when unregistered.
    Autowire(Type),
    /// `Default::default()`.
    Default,
}

pub fn generate_injectable_impl(
    ident: &Ident,
    generics: &Generics,
    fields: &Fields,
) -> syn::Result<TokenStream2> {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let values = fields
        .iter()
        .map(|field| {
            let value = match field_strategy(field)? {
                Strategy::Make(ty) => quote! { container.make::<#ty>()? },
                Strategy::Autowire(ty) => quote! { container.autowire::<#ty>()? },
                Strategy::Default => quote! { ::std::default::Default::default() },
            };
            Ok(match &field.ident {
                Some(name) => quote! { #name: #value },
                None => value,
            })
        })
        .collect::<syn::Result<Vec<_>>>()?;

    let construct = match fields {
        Fields::Named(_) => quote! { Self { #(#values),* } },
        Fields::Unnamed(_) => quote! { Self ( #(#values),* ) },
        Fields::Unit => quote! { Self },
    };

    Ok(quote! {
        impl #impl_generics ::mantle::di::Injectable for #ident #ty_generics #where_clause {
            fn inject(
                container: &::mantle::di::Container
            ) -> ::mantle::Result<Self> {
                let _ = container;
                Ok(#construct)
            }
        }
    })
}

fn field_strategy(field: &Field) -> syn::Result<Strategy> {
    match inject_option(&field.attrs)? {
        Some(option) if option == "default" => return Ok(Strategy::Default),
        Some(option) if option == "auto" => {
            return arc_inner(&field.ty).map(Strategy::Autowire).ok_or_else(|| {
                syn::Error::new(field.ty.span(), "#[inject(auto)] requires an Arc<T> field")
            });
        }
        Some(option) => {
            return Err(syn::Error::new(
                option.span(),
                "expected #[inject(auto)] or #[inject(default)]",
            ));
        }
        None => {}
    }

    arc_inner(&field.ty).map(Strategy::Make).ok_or_else(|| {
        syn::Error::new(
            field.ty.span(),
            "injected fields must be Arc<T>; mark other fields #[inject(default)]",
        )
    })
}

fn inject_option(attrs: &[Attribute]) -> syn::Result<Option<Ident>> {
    attrs
        .iter()
        .find(|attr| attr.path().is_ident("inject"))
        .map(|attr| attr.parse_args::<Ident>())
        .transpose()
}

/// Extract the inner type from Arc<T> or Arc<dyn Trait>
fn arc_inner(ty: &Type) -> Option<Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first()? {
            syn::GenericArgument::Type(inner) => Some(inner.clone()),
            _ => None,
        },
        _ => None,
    }
}

pub fn is_inject_attr(attr: &Attribute) -> bool {
    attr.path().is_ident("inject")
}
