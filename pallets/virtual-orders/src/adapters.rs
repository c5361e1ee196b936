//! Adapter traits for the virtual orders pallet
//!
//! Token custody and curve pricing are consumed through traits so the pallet
//! stays generic over the runtime's asset stack and AMM math. Reserve
//! mutations by the liquidity provider side are exposed back through
//! [`ReserveLedger`].

use crate::types::{CurveKind, SwapOutcome};
use frame::prelude::*;

/// Token custody between order owners and the pallet account.
pub trait OrderVault<AccountId, AssetId, Balance> {
  fn transfer(
    from: &AccountId,
    to: &AccountId,
    asset: AssetId,
    amount: Balance,
  ) -> Result<(), DispatchError>;

  fn balance(who: &AccountId, asset: AssetId) -> Balance;
}

/// Curve primitive: given reserves and an input amount, returns the output
/// and the post-trade reserves. Must be deterministic.
pub trait PricingPrimitive<Balance> {
  fn swap(
    curve: CurveKind,
    reserve_in: Balance,
    reserve_out: Balance,
    amount_in: Balance,
  ) -> Result<SwapOutcome, DispatchError>;
}

/// Reserve hooks for the liquidity collaborator.
///
/// Both mutating hooks bring virtual execution up to the current block
/// before touching reserves, so pending orders trade against the reserves
/// they were placed against.
pub trait ReserveLedger<PoolId, Balance> {
  fn deposit_reserves(pool_id: PoolId, amount0: Balance, amount1: Balance) -> DispatchResult;

  fn withdraw_reserves(pool_id: PoolId, amount0: Balance, amount1: Balance) -> DispatchResult;

  fn reserves(pool_id: PoolId) -> Option<(Balance, Balance)>;
}

/// No-op `OrderVault` for configurations that track custody elsewhere.
impl<AccountId, AssetId, Balance: Default> OrderVault<AccountId, AssetId, Balance> for () {
  fn transfer(_: &AccountId, _: &AccountId, _: AssetId, _: Balance) -> Result<(), DispatchError> {
    Ok(())
  }

  fn balance(_: &AccountId, _: AssetId) -> Balance {
    Balance::default()
  }
}
