//! Exact unit conversion between domain decimals and storage integers
//!
//! Money is persisted in integer cents and stock quantities in integer
//! milli-units (thousandths of the ingredient's unit). All arithmetic the
//! storage layer performs (the atomic stock decrement in particular) is
//! therefore integer math, and repeated runs can never accumulate
//! floating-point drift. `rust_decimal::Decimal` is the domain-facing type
//! at both edges of the conversion.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use thiserror::Error;

/// Money carries at most 2 decimal places
pub const MONEY_SCALE: u32 = 2;
/// Stock quantities carry at most 3 decimal places
pub const QTY_SCALE: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnitError {
    #[error("{field} has more than {max_scale} decimal places: {value}")]
    TooPrecise {
        field: &'static str,
        max_scale: u32,
        value: Decimal,
    },

    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: Decimal },
}

/// Convert a monetary amount to integer cents, rejecting sub-cent input
pub fn money_to_cents(value: Decimal, field: &'static str) -> Result<i64, UnitError> {
    to_scaled(value, MONEY_SCALE, field)
}

/// Convert integer cents back to a 2-decimal amount
pub fn cents_to_money(cents: i64) -> Decimal {
    Decimal::new(cents, MONEY_SCALE)
}

/// Convert a stock quantity to integer milli-units, rejecting input finer
/// than the stored precision
pub fn qty_to_milli(value: Decimal, field: &'static str) -> Result<i64, UnitError> {
    to_scaled(value, QTY_SCALE, field)
}

/// Convert integer milli-units back to a 3-decimal quantity
pub fn milli_to_qty(milli: i64) -> Decimal {
    Decimal::new(milli, QTY_SCALE)
}

fn to_scaled(value: Decimal, scale: u32, field: &'static str) -> Result<i64, UnitError> {
    if value.normalize().scale() > scale {
        return Err(UnitError::TooPrecise {
            field,
            max_scale: scale,
            value,
        });
    }
    let factor = Decimal::from(10i64.pow(scale));
    value
        .checked_mul(factor)
        .and_then(|scaled| scaled.to_i64())
        .ok_or(UnitError::OutOfRange { field, value })
}
