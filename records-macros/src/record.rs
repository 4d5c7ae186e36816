use std::collections::HashSet;

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Ident, LitStr, Type};

const DEFAULT_ID_COLUMN: &str = "id";

// derive_record
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input: DeriveInput = match syn::parse2(input) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    match expand(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error(),
    }
}

///
/// RecordAttrs
///

struct RecordAttrs {
    table: String,
    id_column: String,
}

fn record_attrs(input: &DeriveInput) -> syn::Result<RecordAttrs> {
    let mut attrs = RecordAttrs {
        table: String::new(),
        id_column: DEFAULT_ID_COLUMN.to_string(),
    };

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("record")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let lit: LitStr = meta.value()?.parse()?;
                attrs.table = lit.value();
                Ok(())
            } else if meta.path.is_ident("id") {
                let lit: LitStr = meta.value()?.parse()?;
                attrs.id_column = lit.value();
                Ok(())
            } else {
                Err(meta.error("expected `table = \"...\"` or `id = \"...\"`"))
            }
        })?;
    }

    Ok(attrs)
}

///
/// BoundField
///

struct BoundField<'a> {
    column: LitStr,
    ident: &'a Ident,
    ty: &'a Type,
}

fn bound_fields(input: &DeriveInput) -> syn::Result<Vec<BoundField<'_>>> {
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(
            &input.ident,
            "Record can only be derived for structs with named fields",
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(Error::new_spanned(
            &data.fields,
            "Record can only be derived for structs with named fields",
        ));
    };

    let mut seen = HashSet::new();
    let mut bound = Vec::new();

    for field in &named.named {
        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("column")) else {
            continue;
        };
        let column: LitStr = attr.parse_args()?;

        if !seen.insert(column.value()) {
            return Err(Error::new_spanned(
                &column,
                format!("column `{}` is bound more than once", column.value()),
            ));
        }

        bound.push(BoundField {
            column,
            ident: field.ident.as_ref().expect("named field"),
            ty: &field.ty,
        });
    }

    Ok(bound)
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let attrs = record_attrs(input)?;
    let fields = bound_fields(input)?;

    let id_field = fields
        .iter()
        .find(|f| f.column.value() == attrs.id_column)
        .ok_or_else(|| {
            Error::new_spanned(
                &input.ident,
                format!(
                    "no field is bound to the identity column `{}`",
                    attrs.id_column
                ),
            )
        })?
        .ident;

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let table = &attrs.table;
    let id_column = &attrs.id_column;

    let bindings = fields.iter().map(|field| {
        let BoundField { column, ident, ty } = field;

        quote! {
            ::rust_records::FieldBinding::new(
                #column,
                <#ty as ::rust_records::FieldValue>::TYPE_NAME,
                |record: &Self| ::rust_records::FieldValue::to_value(&record.#ident),
                |record: &mut Self, value: ::rust_records::Value| {
                    record.#ident = <#ty as ::rust_records::FieldValue>::from_value(value)?;
                    ::core::result::Result::Ok(())
                },
            ),
        }
    });

    Ok(quote! {
        impl #impl_generics ::rust_records::Record for #ident #ty_generics #where_clause {
            const TABLE_NAME: &'static str = #table;
            const ID_COLUMN: &'static str = #id_column;

            fn id(&self) -> i64 {
                <i64 as ::core::convert::From<_>>::from(self.#id_field)
            }

            fn bindings() -> ::std::vec::Vec<::rust_records::FieldBinding<Self>> {
                ::std::vec![#(#bindings)*]
            }
        }
    })
}
