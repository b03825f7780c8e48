// SPDX-FileCopyrightText: 2025 2025 Contributors to the Shared Object Loader project.
// SPDX-License-Identifier: Apache-2.0

use proc_macro::TokenStream;
use syn::parse_macro_input;

mod symbol_table;

#[proc_macro]
pub fn symbol_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as symbol_table::SymbolTable);
    symbol_table::generate_table(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
