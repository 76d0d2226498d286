use quote::quote;
use syn::parse::ParseStream;

use crate::field;

pub struct ImplTable {
    pub path: syn::Path,
    pub field_results: Vec<syn::Result<field::Field>>,
}

impl syn::parse::Parse for ImplTable {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let _: syn::token::Impl = input.parse()?;
        let path: syn::Path = input.parse()?;

        let content;
        let _brace_token = syn::braced!(content in input);

        let mut field_results = Vec::new();
        while !content.is_empty() {
            field_results.push(
                content
                    .parse::<syn::TraitItemMethod>()
                    .and_then(field::Field::try_from),
            );
        }

        Ok(ImplTable {
            path,
            field_results,
        })
    }
}

/// `"schema.name"` or `"name"`.
fn split_table_name(table_name: &syn::LitStr) -> (Option<String>, String) {
    let value = table_name.value();
    match value.rsplit_once('.') {
        Some((schema, name)) => (Some(schema.to_string()), name.to_string()),
        None => (None, value),
    }
}

pub fn gen_table(table_name: syn::LitStr, impl_table: ImplTable) -> proc_macro2::TokenStream {
    let path = &impl_table.path;

    let (schema, name) = split_table_name(&table_name);
    if name.is_empty() {
        return syn::Error::new(table_name.span(), "Expected a table name").to_compile_error();
    }
    let schema = match schema {
        Some(schema) => quote! { ::std::option::Option::Some(#schema) },
        None => quote! { ::std::option::Option::None },
    };

    let column_names = impl_table
        .field_results
        .iter()
        .filter_map(|result| result.as_ref().ok())
        .filter_map(field::Field::column_name);

    let field_methods = impl_table.field_results.iter().map(|result| {
        result
            .as_ref()
            .map(|field| field::gen_method(field, &impl_table))
            .unwrap_or_else(|err| err.to_compile_error())
    });

    quote! {
        impl ::tsql_query::table::TableDef for #path {
            fn table_schema() -> ::std::option::Option<&'static str> {
                #schema
            }

            fn table_name() -> &'static str {
                #name
            }

            fn column_names() -> &'static [&'static str] {
                &[#(#column_names),*]
            }
        }

        impl #path {
            #(#field_methods)*
        }
    }
}
