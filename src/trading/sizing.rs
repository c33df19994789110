//! Trade sizing from wallet balance, leverage, and the live price.

use rust_decimal::Decimal;

use crate::error::SizingError;

/// Number of decimal places the exchange accepts for order quantity.
pub const QUANTITY_SCALE: u32 = 3;

/// Maximum order quantity for the given balance, leverage, and price, after
/// the safety discount.
///
/// The raw quantity `balance * leverage / price` is truncated (never rounded
/// up) to [`QUANTITY_SCALE`] places, discounted by `safety_factor` to leave
/// headroom for fees and price movement, and truncated again so the result is
/// a valid order quantity.
pub fn max_trade_quantity(
    balance: Decimal,
    leverage: u32,
    price: Decimal,
    safety_factor: Decimal,
) -> Result<Decimal, SizingError> {
    if price <= Decimal::ZERO {
        return Err(SizingError::NonPositivePrice(price));
    }

    let raw = balance * Decimal::from(leverage) / price;
    let capped = raw.trunc_with_scale(QUANTITY_SCALE);
    let discounted = capped * (Decimal::ONE - safety_factor);

    Ok(discounted.trunc_with_scale(QUANTITY_SCALE))
}

/// [`max_trade_quantity`] against the price feed's latest value.
///
/// A feed that has not delivered a tick yet is a precondition failure, not
/// something to retry: the caller gets [`SizingError::PriceUnavailable`] and
/// decides whether to skip or wait.
pub fn max_trade_quantity_from_feed(
    balance: Decimal,
    leverage: u32,
    price: Option<Decimal>,
    safety_factor: Decimal,
) -> Result<Decimal, SizingError> {
    let price = price.ok_or(SizingError::PriceUnavailable)?;
    max_trade_quantity(balance, leverage, price, safety_factor)
}
