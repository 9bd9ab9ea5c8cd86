use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Trade {0} has already been settled and cannot transition again")]
    TradeAlreadySettled(u64),

    #[error("A trade cannot be settled into the '{0}' status")]
    InvalidExitStatus(String),

    #[error("Calculation error: {0}")]
    Calculation(String),
}
