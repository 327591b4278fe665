//! Smallest-unit and display-amount conversion.
//!
//! Token amounts travel on the wire as integer strings in the asset's
//! smallest unit (e.g., `"10000"` micro-USDC). Policy checks and
//! human-facing output use [`Decimal`] display amounts scaled by the asset's
//! decimal count. Floating point is never used for money.

use rust_decimal::Decimal;

/// Default decimal count for USDC-style assets.
pub const DEFAULT_DECIMALS: u8 = 6;

/// Errors from amount parsing and scaling.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AmountError {
    /// The amount string is not a non-negative integer.
    #[error("cannot parse amount '{0}' as an integer of smallest units")]
    Unparsable(String),
    /// The amount does not fit a decimal display value.
    #[error("amount {0} is out of range for {1} decimals")]
    OutOfRange(u128, u8),
}

/// Parses a smallest-unit amount string (e.g., `"10000"`).
///
/// # Errors
///
/// Returns [`AmountError::Unparsable`] if the string is not a non-negative
/// integer.
pub fn parse_base_units(raw: &str) -> Result<u128, AmountError> {
    raw.parse::<u128>()
        .map_err(|_| AmountError::Unparsable(raw.to_string()))
}

/// Converts a smallest-unit amount to its display value.
///
/// `10000` with 6 decimals becomes `0.01`.
///
/// # Errors
///
/// Returns [`AmountError::OutOfRange`] if the value exceeds what a
/// [`Decimal`] can represent at the given scale.
pub fn display_amount(base_units: u128, decimals: u8) -> Result<Decimal, AmountError> {
    let mantissa =
        i128::try_from(base_units).map_err(|_| AmountError::OutOfRange(base_units, decimals))?;
    Decimal::try_from_i128_with_scale(mantissa, u32::from(decimals))
        .map_err(|_| AmountError::OutOfRange(base_units, decimals))
}
