use syn::parse::ParseStream;

/// `#[column("Name")]`: the SQL name of a column when it differs from
/// the function name.
pub struct ColumnName {
    pub name: syn::LitStr,
}

impl syn::parse::Parse for ColumnName {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let content;
        let _paren_token = syn::parenthesized!(content in input);
        let name: syn::LitStr = content.parse()?;

        if name.value().is_empty() {
            return Err(syn::Error::new(name.span(), "Expected a column name"));
        }
        if !content.is_empty() {
            return Err(content.error("Expected a single string literal"));
        }

        Ok(Self { name })
    }
}
