use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The reducer was handed a window with no trades. Callers skip such
    /// (user, period) pairs before aggregating.
    #[error("Empty window: at least one trade is required to build period statistics")]
    EmptyWindow,

    /// A running total left the representable `Decimal` range.
    #[error("Overflow while summing trade P&L")]
    Overflow,
}
