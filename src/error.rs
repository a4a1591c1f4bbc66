use rust_decimal::Decimal;
use thiserror::Error;

/// Main error type for the auction engine
#[derive(Error, Debug)]
pub enum GavelError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Item lookup errors
    #[error("Auction item not found: {0}")]
    ItemNotFound(uuid::Uuid),

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Unexpected state: {0}")]
    UnexpectedState(String),

    // Queue errors
    #[error("Queue error: {0}")]
    Queue(String),

    // External collaborator errors
    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Roster service unavailable: {0}")]
    RosterUnavailable(String),

    #[error("Audit log error: {0}")]
    AuditLog(String),

    // Validation errors
    #[error("Validation failed: {0}")]
    Validation(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for GavelError
pub type Result<T> = std::result::Result<T, GavelError>;

/// Specific error types for bid acceptance
///
/// Every rejected bid carries enough context for an immediate client
/// retry: `Outbid` and `BidTooLow` report the authoritative price the
/// next proposal has to clear.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BidError {
    #[error("Malformed bid: {0}")]
    Validation(String),

    #[error("Auction is closed for bidding")]
    AuctionClosed,

    #[error("Bid too low: minimum acceptable is {minimum}")]
    BidTooLow { minimum: Decimal },

    #[error("Bidder already leads this auction")]
    AlreadyLeader,

    #[error("Outbid: current price is {current_price}")]
    Outbid { current_price: Decimal },

    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Rate limited: retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    #[error("Auction item not found")]
    ItemNotFound,

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),
}

impl BidError {
    /// Whether the caller may usefully retry with updated context
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BidError::Outbid { .. } | BidError::RateLimited { .. } | BidError::BidTooLow { .. }
        )
    }
}

/// Specific error types for settlement
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SettlementError {
    #[error("Settlement conflict: item is in state {state}")]
    Conflict { state: String },

    #[error("Item not found")]
    ItemNotFound,

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Roster service unavailable: {0}")]
    RosterUnavailable(String),
}

impl From<BidError> for GavelError {
    fn from(err: BidError) -> Self {
        match err {
            BidError::ItemNotFound => GavelError::Internal("bid on unknown item".to_string()),
            BidError::LedgerUnavailable(reason) => GavelError::LedgerUnavailable(reason),
            other => GavelError::Validation(other.to_string()),
        }
    }
}

impl From<SettlementError> for GavelError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::LedgerUnavailable(reason) => GavelError::LedgerUnavailable(reason),
            SettlementError::RosterUnavailable(reason) => GavelError::RosterUnavailable(reason),
            other => GavelError::Internal(other.to_string()),
        }
    }
}
