use proc_macro::TokenStream;

mod record;

/// Derives `rust_records::Record` from `#[record(...)]` and `#[column(...)]`
/// annotations.
///
/// ```ignore
/// #[derive(Default, Record)]
/// #[record(table = "users")]
/// struct User {
///     #[column("id")]
///     id: i64,
///     #[column("name")]
///     name: String,
///     // not mapped
///     session: Option<String>,
/// }
/// ```
#[proc_macro_derive(Record, attributes(record, column))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input.into()).into()
}
