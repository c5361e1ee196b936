//! Ecosystem Constants for long-term order pools
//!
//! Pallet identifiers and the numeric parameters shared between the
//! virtual-orders pallet and the runtime that configures it.

/// Balance type alias for consistency across the workspace
pub type Balance = u128;

/// Pallet identifiers for deriving pallet-owned accounts.
///
/// Used with `PalletId::into_account_truncating()` to obtain the custody
/// account that holds pool reserves, order deposits and undistributed proceeds.
pub mod pallet_ids {
  /// Virtual orders pallet ID (long-term order custody)
  pub const VIRTUAL_ORDERS_PALLET_ID: &[u8; 8] = b"py/vords";
}

/// Parameters governing order scheduling and virtual execution.
pub mod params {
  use super::Balance;
  use sp_arithmetic::Permill;

  /// Fixed-point scale of the reward-per-unit-rate accumulator (10^18).
  ///
  /// Proceeds for an order are `accumulator_delta * sales_rate / PROCEEDS_SCALE`.
  pub const PROCEEDS_SCALE: Balance = 1_000_000_000_000_000_000;

  /// Order block interval for stable pools (~7.5 minutes at 6s/block).
  pub const STABLE_ORDER_INTERVAL: u32 = 75;

  /// Order block interval for liquid pools (~30 minutes at 6s/block).
  pub const LIQUID_ORDER_INTERVAL: u32 = 300;

  /// Order block interval for volatile pools (~2 hours at 6s/block).
  pub const VOLATILE_ORDER_INTERVAL: u32 = 1_200;

  /// Upper bound on the number of intervals a single order may span.
  pub const MAX_ORDER_INTERVALS: u32 = 1_000;

  /// Upper bound on distinct pending expiry blocks tracked per pool.
  ///
  /// Expiries are interval-aligned, so `MAX_ORDER_INTERVALS + 2` covers
  /// every boundary an order created now could land on.
  pub const MAX_PENDING_EXPIRIES: u32 = MAX_ORDER_INTERVALS + 2;

  /// Long-term swap fee applied to virtual trades (0.3%).
  pub const DEFAULT_LONG_TERM_FEE: Permill = Permill::from_parts(3_000);

  /// Governance ceiling for the long-term swap fee (5%).
  pub const MAX_LONG_TERM_FEE: Permill = Permill::from_percent(5);

  /// Largest StableSwap amplification coefficient a pool may be created with.
  pub const MAX_AMPLIFICATION: u32 = 10_000;
}
