use rust_decimal::Decimal;

use crate::error::EngineError;
use crate::types::Trade;

/// Net profit/loss of a single trade.
///
/// A trade without an entry price or share count contributes nothing. An
/// open position (no exit price) is valued at cost, so only its fees count
/// against it. Fees are subtracted regardless of direction.
pub fn trade_pnl(trade: &Trade) -> Decimal {
    let entry = match trade.entry_price {
        Some(p) if !p.is_zero() => p,
        _ => return Decimal::ZERO,
    };
    let shares = match trade.shares {
        Some(s) if !s.is_zero() => s,
        _ => return Decimal::ZERO,
    };
    let exit = trade.exit_price.unwrap_or(entry);

    let direction = if trade.position_type.is_short() {
        Decimal::NEGATIVE_ONE
    } else {
        Decimal::ONE
    };

    let fees = trade
        .entry_fees
        .unwrap_or_default()
        .checked_add(trade.exit_fees.unwrap_or_default());

    // Out-of-range values are treated like any other malformed input.
    exit.checked_sub(entry)
        .and_then(|delta| delta.checked_mul(shares))
        .and_then(|gross| gross.checked_mul(direction))
        .zip(fees)
        .and_then(|(gross, fees)| gross.checked_sub(fees))
        .unwrap_or(Decimal::ZERO)
}

/// Sum of `trade_pnl` over a collection.
pub fn total_pnl<'a, I>(trades: I) -> Result<Decimal, EngineError>
where
    I: IntoIterator<Item = &'a Trade>,
{
    trades
        .into_iter()
        .try_fold(Decimal::ZERO, |sum, trade| checked_sum(sum, trade_pnl(trade)))
}

pub(crate) fn checked_sum(a: Decimal, b: Decimal) -> Result<Decimal, EngineError> {
    a.checked_add(b).ok_or(EngineError::Overflow)
}
