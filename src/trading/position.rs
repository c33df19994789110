//! Position state and protective exit levels.

use rust_decimal::Decimal;
use serde::Serialize;
use strum::Display;

use crate::gateway::Side;

/// Number of decimal places the exchange accepts for limit prices.
pub const PRICE_SCALE: u32 = 2;

/// Which direction the bot currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    /// No position.
    Flat,
    /// Profits when price rises.
    Long,
    /// Profits when price falls.
    Short,
}

impl PositionSide {
    /// Order side that opens this position, if any.
    pub fn entry_order_side(self) -> Option<Side> {
        match self {
            PositionSide::Flat => None,
            PositionSide::Long => Some(Side::Buy),
            PositionSide::Short => Some(Side::Sell),
        }
    }

    /// Order side that closes this position, if any.
    pub fn exit_order_side(self) -> Option<Side> {
        self.entry_order_side().map(Side::opposite)
    }
}

/// Stop-loss and optional take-profit prices derived from the entry fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectiveLevels {
    /// Price at which the position is force-closed at market.
    pub stop_loss: Decimal,
    /// Resting limit exit price, if take-profit is configured for this side.
    pub take_profit: Option<Decimal>,
}

/// Compute protective levels as percentage offsets from the entry price.
///
/// Long positions stop below entry and take profit above; short positions
/// invert both. The take-profit price is rounded to the exchange's price
/// scale because it is sent on a limit order; the stop-loss is only watched
/// locally and keeps full precision.
pub fn protective_levels(
    side: PositionSide,
    entry_price: Decimal,
    stop_loss_pct: Decimal,
    take_profit_pct: Option<Decimal>,
) -> ProtectiveLevels {
    let hundred = Decimal::ONE_HUNDRED;
    let (stop_loss, take_profit) = match side {
        PositionSide::Long => (
            entry_price * (Decimal::ONE - stop_loss_pct / hundred),
            take_profit_pct.map(|pct| entry_price * (Decimal::ONE + pct / hundred)),
        ),
        PositionSide::Short => (
            entry_price * (Decimal::ONE + stop_loss_pct / hundred),
            take_profit_pct.map(|pct| entry_price * (Decimal::ONE - pct / hundred)),
        ),
        PositionSide::Flat => (entry_price, None),
    };

    ProtectiveLevels {
        stop_loss,
        take_profit: take_profit.map(|p| p.round_dp(PRICE_SCALE)),
    }
}

/// The bot's current position, as recorded at entry fill time.
///
/// `quantity` is the executed quantity from the entry fill and is the exact
/// quantity used for every exit order; it is never re-queried from the
/// exchange.
#[derive(Debug, Clone, Serialize)]
pub struct Position {
    /// Direction held.
    pub side: PositionSide,
    /// Average entry fill price.
    pub entry_price: Decimal,
    /// Executed entry quantity.
    pub quantity: Decimal,
    /// Local stop-loss watch level.
    pub stop_loss: Decimal,
    /// Take-profit limit price, if configured.
    pub take_profit: Option<Decimal>,
    /// Resting take-profit order, if one was placed.
    pub take_profit_order_id: Option<u64>,
}

impl Position {
    /// The flat (no position) state.
    pub fn flat() -> Self {
        Self {
            side: PositionSide::Flat,
            entry_price: Decimal::ZERO,
            quantity: Decimal::ZERO,
            stop_loss: Decimal::ZERO,
            take_profit: None,
            take_profit_order_id: None,
        }
    }

    /// Whether no position is held.
    pub fn is_flat(&self) -> bool {
        self.side == PositionSide::Flat
    }

    /// Whether the given price crosses the stop-loss level.
    pub fn stop_hit(&self, price: Decimal) -> bool {
        match self.side {
            PositionSide::Long => price <= self.stop_loss,
            PositionSide::Short => price >= self.stop_loss,
            PositionSide::Flat => false,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::flat()
    }
}
