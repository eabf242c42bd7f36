use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

// Derive macro for flight-log record types.
//
// Generates an inherent `CSV_HEADER` constant listing the struct's field
// names in declaration order, comma separated. The flight-log schema
// writer emits this header once per log file so the CSV rows stay
// self-describing without repeating field names on every line.
//
// Usage: #[derive(TelemetryPayload)] on a struct with named fields.

#[proc_macro_derive(TelemetryPayload)]
pub fn telemetry_payload(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return syn::Error::new_spanned(
                    name,
                    "TelemetryPayload requires named struct fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(name, "TelemetryPayload can only derive on structs")
                .to_compile_error()
                .into();
        }
    };

    let header = fields
        .iter()
        .filter_map(|f| f.ident.as_ref())
        .map(|ident| ident.to_string())
        .collect::<Vec<_>>()
        .join(",");

    let output = quote! {
        impl #name {
            /// Column names for this record's CSV payload, in field order.
            pub const CSV_HEADER: &'static str = #header;
        }
    };

    output.into()
}
