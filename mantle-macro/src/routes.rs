use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    bracketed,
    ext::IdentExt,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
    spanned::Spanned,
    Attribute, Expr, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, Pat, Token, Type,
    Visibility,
};

/// Attribute name, `HttpMethod` variant, unmasked.
const VERBS: &[(&str, &str, bool)] = &[
    ("get", "Get", false),
    ("post", "Post", false),
    ("put", "Put", false),
    ("patch", "Patch", false),
    ("delete", "Delete", false),
    ("options", "Options", false),
    ("head", "Head", false),
    ("uget", "Get", true),
    ("upost", "Post", true),
    ("uput", "Put", true),
    ("upatch", "Patch", true),
    ("udelete", "Delete", true),
    ("uoptions", "Options", true),
    ("uhead", "Head", true),
];

struct RouteArgs {
    path: LitStr,
    middleware: Vec<Type>,
}

impl Parse for RouteArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let path: LitStr = input.parse()?;
        let mut middleware = Vec::new();
        while !input.is_empty() {
            input.parse::<Token![,]>()?;
            if input.is_empty() {
                break;
            }
            let name: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            if name != "middleware" {
                return Err(syn::Error::new(name.span(), "unknown route option, expected `middleware`"));
            }
            let content;
            bracketed!(content in input);
            middleware.extend(Punctuated::<Type, Token![,]>::parse_terminated(&content)?);
        }
        Ok(RouteArgs { path, middleware })
    }
}

struct RouteInfo {
    variant: Ident,
    unmasked: bool,
    args: RouteArgs,
}

struct ParamInfo {
    pat: Pat,
    ident: Ident,
    ty: Type,
    default: Option<Expr>,
}

struct MethodInfo {
    name: Ident,
    routes: Vec<RouteInfo>,
    params: Vec<ParamInfo>,
    has_receiver: bool,
    is_async: bool,
}

pub fn routes_attribute(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemImpl);
    generate_routes_impl(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn generate_routes_impl(mut input: ItemImpl) -> syn::Result<TokenStream2> {
    let mut methods = Vec::new();

    for item in input.items.iter_mut() {
        if let ImplItem::Fn(method) = item {
            let routes = extract_routes(&method.attrs)?;
            let is_public = matches!(method.vis, Visibility::Public(_));
            if !routes.is_empty() || is_public {
                methods.push(extract_method_info(method, routes)?);
            }
            clean_method(method);
        }
    }

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();
    let type_path = type_path(self_ty);
    let descriptors = methods.iter().map(method_descriptor);

    Ok(quote! {
        #input

        impl #impl_generics ::mantle::routing::Controller for #self_ty #where_clause {
            fn type_path() -> &'static str {
                #type_path
            }

            fn methods() -> ::std::vec::Vec<::mantle::routing::MethodDescriptor> {
                ::std::vec![#(#descriptors),*]
            }
        }
    })
}

fn type_path(self_ty: &Type) -> TokenStream2 {
    match self_ty {
        Type::Path(path) => match path.path.segments.last() {
            Some(segment) => {
                let ident = &segment.ident;
                quote! { ::std::concat!(::std::module_path!(), "::", ::std::stringify!(#ident)) }
            }
            None => quote! { ::std::any::type_name::<Self>() },
        },
        _ => quote! { ::std::any::type_name::<Self>() },
    }
}

fn verb(attr: &Attribute) -> Option<(&'static str, bool)> {
    let ident = attr.path().get_ident()?;
    VERBS
        .iter()
        .find(|(name, _, _)| ident == name)
        .map(|(_, variant, unmasked)| (*variant, *unmasked))
}

fn extract_routes(attrs: &[Attribute]) -> syn::Result<Vec<RouteInfo>> {
    let mut routes = Vec::new();
    for attr in attrs {
        if let Some((variant, unmasked)) = verb(attr) {
            let args = attr.parse_args::<RouteArgs>()?;
            if !args.path.value().starts_with('/') {
                return Err(syn::Error::new(args.path.span(), "route paths must start with '/'"));
            }
            routes.push(RouteInfo {
                variant: format_ident!("{}", variant),
                unmasked,
                args,
            });
        }
    }
    Ok(routes)
}

fn extract_method_info(method: &ImplItemFn, routes: Vec<RouteInfo>) -> syn::Result<MethodInfo> {
    let mut has_receiver = false;
    let mut params = Vec::new();

    for input in &method.sig.inputs {
        match input {
            FnArg::Receiver(receiver) => {
                if receiver.reference.is_none() || receiver.mutability.is_some() {
                    return Err(syn::Error::new(receiver.span(), "routed methods take `&self`"));
                }
                has_receiver = true;
            }
            FnArg::Typed(pat_type) => {
                let Pat::Ident(pat_ident) = &*pat_type.pat else {
                    return Err(syn::Error::new(
                        pat_type.pat.span(),
                        "route parameters must be plain identifiers",
                    ));
                };
                let default = pat_type
                    .attrs
                    .iter()
                    .find(|attr| attr.path().is_ident("default"))
                    .map(|attr| attr.parse_args::<Expr>())
                    .transpose()?;
                params.push(ParamInfo {
                    pat: (*pat_type.pat).clone(),
                    ident: pat_ident.ident.clone(),
                    ty: (*pat_type.ty).clone(),
                    default,
                });
            }
        }
    }

    Ok(MethodInfo {
        name: method.sig.ident.clone(),
        routes,
        params,
        has_receiver,
        is_async: method.sig.asyncness.is_some(),
    })
}

fn clean_method(method: &mut ImplItemFn) {
    method.attrs.retain(|attr| verb(attr).is_none());
    for input in method.sig.inputs.iter_mut() {
        if let FnArg::Typed(pat_type) = input {
            pat_type.attrs.retain(|attr| !attr.path().is_ident("default"));
        }
    }
}

fn method_descriptor(method: &MethodInfo) -> TokenStream2 {
    let name = &method.name;
    let name_str = name.unraw().to_string();

    let routes = method.routes.iter().map(|route| {
        let variant = &route.variant;
        let path = &route.args.path;
        let unmasked = route.unmasked;
        let middleware = &route.args.middleware;
        quote! {
            ::mantle::routing::RouteAttribute::new(::mantle::http::HttpMethod::#variant, #path, #unmasked)
                .with_middleware(::std::vec![#(::mantle::middleware::MiddlewareRef::of::<#middleware>()),*])
        }
    });

    let pats = method.params.iter().map(|param| &param.pat);
    let idents: Vec<_> = method.params.iter().map(|param| &param.ident).collect();
    let resolutions = method.params.iter().map(|param| {
        let ty = &param.ty;
        let key = param.ident.unraw().to_string();
        match &param.default {
            Some(default) => quote! { __args.get_or::<#ty>(#key, #default)? },
            None => quote! { __args.get::<#ty>(#key)? },
        }
    });

    let controller = if method.has_receiver {
        quote! { let __controller = __container.autowire::<Self>()?; }
    } else {
        quote! {}
    };
    let call = if method.has_receiver {
        quote! { __controller.#name(#(#idents),*) }
    } else {
        quote! { Self::#name(#(#idents),*) }
    };
    let call = if method.is_async {
        quote! { #call.await }
    } else {
        call
    };

    quote! {
        ::mantle::routing::MethodDescriptor::new(
            #name_str,
            ::std::vec![#(#routes),*],
            |__container: ::std::sync::Arc<::mantle::di::Container>,
             __invocation: ::mantle::routing::Invocation|
             -> ::mantle::BoxFuture<'static, ::mantle::Result<::mantle::routing::Reply>> {
                ::std::boxed::Box::pin(async move {
                    #controller
                    let __parameters = __invocation.parameters();
                    let (#(#pats,)*) = __container.call_with_request(
                        &__parameters,
                        &__invocation.request,
                        |__args| ::std::result::Result::Ok((#(#resolutions,)*)),
                    )?;
                    ::mantle::routing::IntoReply::into_reply(#call)
                })
            },
        )
    }
}
