// SPDX-FileCopyrightText: 2025 2025 Contributors to the Shared Object Loader project.
// SPDX-License-Identifier: Apache-2.0

use proc_macro2::{Ident, TokenStream};
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::{
    Expr, ExprLit, FnArg, ForeignItem, ForeignItemFn, ItemForeignMod, ItemStruct, Lit, LitStr,
    Type,
};

/// Input of `symbol_table!`: a unit struct followed by an extern block.
pub struct SymbolTable {
    pub declaration: ItemStruct,
    pub block: ItemForeignMod,
}

impl Parse for SymbolTable {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let declaration = input.parse()?;
        let block = input.parse()?;
        Ok(Self { declaration, block })
    }
}

/// Generate the table struct and its loader.
/// It will have the form of
///
/// pub struct LibM {
///     pub cos: unsafe extern "C" fn(f64) -> f64,
/// }
///
/// impl LibM {
///     pub unsafe fn load(library: &::sol::Library) -> ::sol::Result<Self> { .. }
/// }
pub fn generate_table(table: SymbolTable) -> syn::Result<TokenStream> {
    let SymbolTable { declaration, block } = table;

    if !matches!(declaration.fields, syn::Fields::Unit) {
        return Err(syn::Error::new_spanned(
            &declaration.fields,
            "a symbol table is declared as a unit struct; its fields come from the extern block",
        ));
    }
    if !declaration.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &declaration.generics,
            "a symbol table cannot be generic",
        ));
    }

    let abi = &block.abi;
    let mut fields = vec![];
    let mut loads = vec![];

    for func in foreign_functions(&block)? {
        let vis = &func.vis;
        let field = field_ident(&func.sig.ident);
        let symbol = symbol_name(func)?;
        let params = parameter_types(func)?;
        let output = &func.sig.output;
        let docs = func.attrs.iter().filter(|attr| attr.path().is_ident("doc"));

        let variadic = match &func.sig.variadic {
            None => quote::quote! {},
            Some(variadic) if params.is_empty() => {
                return Err(syn::Error::new_spanned(
                    variadic,
                    "a variadic function needs at least one named parameter",
                ));
            }
            Some(_) => quote::quote! { , ... },
        };

        fields.push(quote::quote! {
            #(#docs)*
            #vis #field: unsafe #abi fn(#(#params),* #variadic) #output,
        });
        loads.push(quote::quote! {
            #field: unsafe { ::sol::resolve_typed(library, #symbol)? },
        });
    }

    let attrs = &declaration.attrs;
    let vis = &declaration.vis;
    let name = &declaration.ident;

    Ok(quote::quote! {
        #(#attrs)*
        #vis struct #name {
            #(#fields)*
        }

        impl #name {
            /// Resolves every entry of the table from `library`.
            ///
            /// # Safety
            ///
            /// The declared signatures must match the exported symbols, and the
            /// table must not be used after `library` is unloaded.
            #vis unsafe fn load(library: &::sol::Library) -> ::sol::Result<Self> {
                ::core::result::Result::Ok(Self {
                    #(#loads)*
                })
            }
        }
    })
}

/// Extract the functions of the extern block; anything else is rejected.
pub fn foreign_functions(block: &ItemForeignMod) -> syn::Result<Vec<&ForeignItemFn>> {
    block
        .items
        .iter()
        .map(|item| match item {
            ForeignItem::Fn(func) => Ok(func),
            other => Err(syn::Error::new_spanned(
                other,
                "only functions can be declared in a symbol table",
            )),
        })
        .collect()
}

/// The exported name: `#[link_name = ".."]` if present, else the identifier.
fn symbol_name(func: &ForeignItemFn) -> syn::Result<LitStr> {
    let Some(attr) = func.attrs.iter().find(|attr| attr.path().is_ident("link_name")) else {
        let ident = &func.sig.ident;
        return Ok(LitStr::new(&ident.unraw().to_string(), ident.span()));
    };

    match &attr.meta.require_name_value()?.value {
        Expr::Lit(ExprLit {
            lit: Lit::Str(name),
            ..
        }) => Ok(name.clone()),
        other => Err(syn::Error::new_spanned(other, "expected a string literal")),
    }
}

/// Parameter types only; patterns are not allowed in fn pointer types.
fn parameter_types(func: &ForeignItemFn) -> syn::Result<Vec<&Type>> {
    func.sig
        .inputs
        .iter()
        .map(|arg| match arg {
            FnArg::Typed(typed) => Ok(&*typed.ty),
            FnArg::Receiver(receiver) => Err(syn::Error::new_spanned(
                receiver,
                "foreign functions cannot take self",
            )),
        })
        .collect()
}

fn field_ident(ident: &Ident) -> Ident {
    let name = field_name(&ident.unraw().to_string());
    // Keywords such as `type` need the raw form to be usable as a field.
    if syn::parse_str::<Ident>(&name).is_ok() {
        Ident::new(&name, ident.span())
    } else {
        Ident::new_raw(&name, ident.span())
    }
}

/// Convert a CamelCase or camelCase function name to snake_case
fn field_name(s: &str) -> String {
    let mut out = String::new();

    for c in s.chars() {
        if c.is_uppercase() {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }

    out
}
