use proc_macro2::Span;
use syn::parse::{Parse, ParseStream};

/// `#[foreign(Self(a, b) => Other(c, d))]`, in either order.
pub struct Foreign {
    pub span: Span,
    pub foreign_table_path: syn::Path,
    pub pairs: Vec<ColumnPair>,
}

pub struct ColumnPair {
    pub local_ident: syn::Ident,
    pub foreign_ident: syn::Ident,
}

struct ColumnTuple {
    table: Table,
    columns: Vec<syn::Ident>,
}

enum Table {
    Zelf,
    Foreign(syn::Path),
}

impl Parse for Foreign {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let content;
        let _paren_token = syn::parenthesized!(content in input);
        let content_span = content.span();

        let first: ColumnTuple = content.parse()?;
        let _arrow: syn::token::FatArrow = content.parse()?;
        let second: ColumnTuple = content.parse()?;

        let (local, foreign_table_path, foreign) = match (first.table, second.table) {
            (Table::Zelf, Table::Foreign(path)) => (first.columns, path, second.columns),
            (Table::Foreign(path), Table::Zelf) => (second.columns, path, first.columns),
            (Table::Zelf, Table::Zelf) => {
                return Err(syn::Error::new(
                    content_span,
                    "A table cannot be its own foreign table",
                ))
            }
            (Table::Foreign(_), Table::Foreign(_)) => {
                return Err(syn::Error::new(content_span, "No Self(..) found"))
            }
        };

        Ok(Self {
            span: content_span,
            foreign_table_path,
            pairs: create_column_pairs(local, foreign, content_span)?,
        })
    }
}

impl Parse for ColumnTuple {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let table = if input.peek(syn::token::SelfType) {
            let _: syn::token::SelfType = input.parse()?;
            Table::Zelf
        } else {
            Table::Foreign(input.parse()?)
        };

        let content;
        let _paren_token = syn::parenthesized!(content in input);
        let columns = content
            .parse_terminated::<syn::Ident, syn::token::Comma>(syn::Ident::parse)?
            .into_iter()
            .collect();

        Ok(Self { table, columns })
    }
}

fn create_column_pairs(
    local: Vec<syn::Ident>,
    foreign: Vec<syn::Ident>,
    content_span: Span,
) -> syn::Result<Vec<ColumnPair>> {
    if local.len() != foreign.len() {
        return Err(syn::Error::new(
            content_span,
            "Must have the same number of columns in self and foreign",
        ));
    }

    if local.is_empty() {
        return Err(syn::Error::new(
            content_span,
            "Must specify at least one column",
        ));
    }

    Ok(local
        .into_iter()
        .zip(foreign.into_iter())
        .map(|(local_ident, foreign_ident)| ColumnPair {
            local_ident,
            foreign_ident,
        })
        .collect())
}
