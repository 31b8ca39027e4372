//! Protocol constants.

use std::time::Duration;

// =============================================================================
// Confirmation Handshake
// =============================================================================

/// How long a payment confirmation may stay pending before it resolves as
/// rejected.
pub const CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Length of a generated confirmation id (alphanumeric characters).
pub const CONFIRMATION_ID_LEN: usize = 12;

// =============================================================================
// Pricing
// =============================================================================

/// Number of decimal places in the settlement currency (USDC).
pub const PRICE_DECIMALS: u32 = 6;

/// Atomic units per whole currency unit (10^6 for USDC).
pub const ATOMIC_UNITS_PER_DOLLAR: u64 = 1_000_000;

/// Label used in tool listings for tools without a price.
pub const FREE_LABEL: &str = "free";

// =============================================================================
// Tool Arguments
// =============================================================================

/// Default number of records returned by history queries.
pub const DEFAULT_HISTORY_LIMIT: u64 = 10;

/// Upper bound for history queries.
pub const MAX_HISTORY_LIMIT: u64 = 100;
