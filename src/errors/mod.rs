//! Structured error types for the risk engine
//!
//! Every fallible operation returns one of the focused enums below; callers
//! that juggle several of them use the umbrella `EngineError`.

use crate::positions::PositionId;
use thiserror::Error;

// =============================================================================
// CONFIGURATION ERRORS (fatal at startup)
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("Malformed ladder item '{item}': {reason}")]
    MalformedLadder { item: String, reason: String },

    #[error("Invalid ladder: {0}")]
    InvalidLadder(String),

    #[error("Invalid setting {field}: {reason}")]
    InvalidSetting { field: &'static str, reason: String },

    #[error("Config already initialized")]
    AlreadyInitialized,

    #[error("Config not initialized. Call load_config() first.")]
    NotInitialized,
}

// =============================================================================
// TICK ERRORS (tick discarded, position untouched)
// =============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TickError {
    #[error("Invalid price {price} for {mint}")]
    InvalidPrice { mint: String, price: f64 },

    #[error("Stale price for {mint}: quote is {age_ms}ms old")]
    StalePrice { mint: String, age_ms: i64 },

    #[error("Position {position_id} has a decision awaiting fill")]
    DecisionPending { position_id: PositionId },

    #[error("Position {position_id} is closed")]
    PositionClosed { position_id: PositionId },

    #[error("No open position or re-entry watch for {mint}")]
    UnknownToken { mint: String },
}

impl TickError {
    /// Data-quality problems with the quote itself, as opposed to engine state
    pub fn is_data_quality(&self) -> bool {
        matches!(self, TickError::InvalidPrice { .. } | TickError::StalePrice { .. })
    }
}

// =============================================================================
// POSITION ERRORS
// =============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PositionError {
    #[error("Position {0} not found")]
    NotFound(PositionId),

    #[error("Already in a position on {mint} (id {position_id})")]
    AlreadyOpen { mint: String, position_id: PositionId },

    #[error("Invalid entry for {mint}: size={size}, entry_price={entry_price}")]
    InvalidEntry {
        mint: String,
        size: f64,
        entry_price: f64,
    },

    #[error("Position {0} has no decision awaiting fill")]
    NoPendingDecision(PositionId),

    #[error("Position {0} already has a sell awaiting fill")]
    DecisionPending(PositionId),

    #[error("Position {0} is closed")]
    Closed(PositionId),

    #[error("No re-entry awaiting fill for {0}")]
    NoReentryPending(String),
}

// =============================================================================
// EXECUTION ERRORS (reported by executors)
// =============================================================================

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Insufficient liquidity for {mint}")]
    InsufficientLiquidity { mint: String },

    #[error("Executor unavailable: {0}")]
    Unavailable(String),
}

// =============================================================================
// PRICING ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum PricingError {
    #[error("Failed to read price tape '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid price tape line {line}: {message}")]
    InvalidRecord { line: u64, message: String },
}

// =============================================================================
// UMBRELLA ERROR
// =============================================================================

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tick error: {0}")]
    Tick(#[from] TickError),

    #[error("Position error: {0}")]
    Position(#[from] PositionError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),
}

impl EngineError {
    /// Errors that must stop the process rather than be logged and skipped
    pub fn is_critical(&self) -> bool {
        matches!(self, EngineError::Config(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
