#![forbid(unsafe_code)]

extern crate proc_macro;

mod field;
mod table;

mod attr {
    pub mod attr_util;
    pub mod column;
    pub mod foreign;
}

use proc_macro::TokenStream;

///
/// Turn an `impl` block of bodiless functions into a table definition.
///
/// ```ignore
/// pub struct Person;
/// pub struct Pet;
///
/// #[tsql_query::table("dbo.Person")]
/// impl Person {
///     #[column("Id")]
///     fn id();
///     fn name();
///
///     #[foreign(Self(id) => Pet(owner_id))]
///     fn pets();
/// }
/// ```
///
/// Every plain function becomes a `Column` accessor, every `#[foreign]`
/// function a `ForeignKey` accessor, and the type implements `TableDef`.
///
#[proc_macro_attribute]
pub fn table(args: TokenStream, input: TokenStream) -> TokenStream {
    let name: syn::LitStr = syn::parse_macro_input!(args as syn::LitStr);
    let impl_table = syn::parse_macro_input!(input as table::ImplTable);

    let tokens = table::gen_table(name, impl_table);

    TokenStream::from(tokens)
}
