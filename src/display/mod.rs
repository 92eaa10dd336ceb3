//! Terminal text views
//!
//! Plain column-aligned tables built from the report types. Every function
//! takes the currency symbol from settings.

pub mod debt;
pub mod sheet;

pub use debt::{format_debt_details, format_debt_list};
pub use sheet::{format_sheet_details, format_sheet_list};

use crate::models::Money;

pub(crate) fn amount(value: Money, symbol: &str) -> String {
    value.format_with_symbol(symbol)
}

pub(crate) fn column_width<'a>(values: impl Iterator<Item = &'a str>, header: &str) -> usize {
    values
        .map(|v| v.chars().count())
        .max()
        .unwrap_or(0)
        .max(header.len())
}
