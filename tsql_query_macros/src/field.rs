use quote::quote;
use syn::spanned::Spanned;

use crate::attr::attr_util;
use crate::attr::column::ColumnName;
use crate::attr::foreign::Foreign;
use crate::table::ImplTable;

/// One bodiless function of a `#[table]` impl block.
pub struct Field {
    ident: syn::Ident,
    attrs: Vec<syn::Attribute>,
    kind: Kind,
}

enum Kind {
    Column(syn::LitStr),
    Foreign(Foreign),
}

struct Meta {
    attrs: Vec<syn::Attribute>,
    column: Option<ColumnName>,
    foreign: Option<Foreign>,
}

impl Field {
    pub fn try_from(method: syn::TraitItemMethod) -> syn::Result<Self> {
        let span = method.span();
        let meta = meta_from_attrs(method.attrs)?;

        if let Some(syn::FnArg::Receiver(receiver)) = method.sig.inputs.first() {
            return Err(syn::Error::new(receiver.span(), "Expected no `self`"));
        }
        if !method.sig.inputs.is_empty() {
            return Err(syn::Error::new(method.sig.inputs.span(), "Expected no arguments"));
        }
        if let syn::ReturnType::Type(_, ty) = &method.sig.output {
            return Err(syn::Error::new(ty.span(), "Expected no return type"));
        }
        if method.default.is_some() {
            return Err(syn::Error::new(span, "Expected no body"));
        }

        let kind = match (meta.column, meta.foreign) {
            (Some(_), Some(foreign)) => {
                return Err(syn::Error::new(
                    foreign.span,
                    "A foreign key cannot also be a column",
                ))
            }
            (None, Some(foreign)) => Kind::Foreign(foreign),
            (Some(column), None) => Kind::Column(column.name),
            (None, None) => Kind::Column(syn::LitStr::new(
                &method.sig.ident.to_string(),
                method.sig.ident.span(),
            )),
        };

        Ok(Field {
            ident: method.sig.ident,
            attrs: meta.attrs,
            kind,
        })
    }

    pub fn column_name(&self) -> Option<&syn::LitStr> {
        match &self.kind {
            Kind::Column(name) => Some(name),
            Kind::Foreign(_) => None,
        }
    }
}

fn meta_from_attrs(attrs: Vec<syn::Attribute>) -> syn::Result<Meta> {
    let mut meta = Meta {
        attrs: vec![],
        column: None,
        foreign: None,
    };

    for attr in attrs {
        if attr_util::attr_has_simple_ident(&attr, "foreign") {
            meta.foreign = Some(syn::parse2(attr.tokens)?);
        } else if attr_util::attr_has_simple_ident(&attr, "column") {
            meta.column = Some(syn::parse2(attr.tokens)?);
        } else if attr_util::attr_has_simple_ident(&attr, "doc") {
            meta.attrs.push(attr);
        } else {
            return Err(syn::Error::new(attr.path.span(), "Unrecognized attribute"));
        }
    }

    Ok(meta)
}

pub fn gen_method(field: &Field, impl_table: &ImplTable) -> proc_macro2::TokenStream {
    let ident = &field.ident;
    let attrs = &field.attrs;
    let local_table_path = &impl_table.path;

    match &field.kind {
        Kind::Column(name) => quote! {
            #(#attrs)*
            pub fn #ident() -> ::tsql_query::column::Column {
                ::tsql_query::column::Column::new(#name)
            }
        },
        Kind::Foreign(foreign) => {
            let foreign_table_path = &foreign.foreign_table_path;
            let local = foreign.pairs.iter().map(|pair| &pair.local_ident);
            let remote = foreign.pairs.iter().map(|pair| &pair.foreign_ident);

            quote! {
                #(#attrs)*
                pub fn #ident() -> ::tsql_query::table::ForeignKey {
                    ::tsql_query::table::ForeignKey::new(
                        <#foreign_table_path as ::tsql_query::table::TableDef>::table(),
                        ::std::vec![#(<#local_table_path>::#local()),*],
                        ::std::vec![#(<#foreign_table_path>::#remote()),*],
                    )
                }
            }
        }
    }
}
