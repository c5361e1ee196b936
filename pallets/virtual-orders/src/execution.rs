//! Chunk math for virtual order execution
//!
//! A chunk is a block range with constant sales rates. Both directions sell
//! `sales_rate * blocks` of input; the opposing flows are matched against
//! each other at the spot price and only the excess is priced by the curve.
//! Proceeds are folded into the reward-per-unit-rate accumulators.

use crate::{
  adapters::PricingPrimitive,
  curves::to_balance,
  types::{Balance, CurveKind, DirectionalPair, OrderPool},
};
use alloc::vec::Vec;
use frame::deps::sp_core::U256;
use polkadot_sdk::sp_runtime::{ArithmeticError, DispatchError, Permill};
use primitives::ecosystem::params::PROCEEDS_SCALE;

/// Whether an execution pass persists its effects
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecutionMode {
  Commit,
  Simulate,
}

/// Summary of one catch-up pass over a pool
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VirtualExecution<BlockNumber> {
  pub chunks: u32,
  /// Expiry boundaries crossed, with the accumulators at each
  pub crossed: Vec<(BlockNumber, DirectionalPair<U256>)>,
}

impl<BlockNumber: PartialEq + Copy> VirtualExecution<BlockNumber> {
  pub fn snapshot_at(&self, block: BlockNumber) -> Option<DirectionalPair<U256>> {
    self
      .crossed
      .iter()
      .find(|(expiry, _)| *expiry == block)
      .map(|(_, snapshot)| *snapshot)
  }
}

/// Reserves after a chunk and the output owed to each direction's sellers
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ChunkTrade {
  pub reserves: (Balance, Balance),
  pub proceeds: DirectionalPair<Balance>,
}

/// Trades one chunk's inputs against the pool.
///
/// `sold` is the gross input per direction; `fee` is skimmed from each side
/// into that side's reserve before matching.
pub fn trade_chunk<P: PricingPrimitive<Balance>>(
  curve: CurveKind,
  fee: Permill,
  reserves: (Balance, Balance),
  sold: DirectionalPair<Balance>,
) -> Result<ChunkTrade, DispatchError> {
  let fee0 = fee.mul_floor(sold.token0_to_1);
  let fee1 = fee.mul_floor(sold.token1_to_0);
  let in0 = sold.token0_to_1.saturating_sub(fee0);
  let in1 = sold.token1_to_0.saturating_sub(fee1);
  let r0 = reserves.0.checked_add(fee0).ok_or(ArithmeticError::Overflow)?;
  let r1 = reserves.1.checked_add(fee1).ok_or(ArithmeticError::Overflow)?;

  if r0 == 0 || r1 == 0 {
    // No spot price to match at; each side goes straight to the curve.
    let leg0 = P::swap(curve, r0, r1, in0)?;
    let leg1 = P::swap(curve, leg0.reserve_out, leg0.reserve_in, in1)?;
    return Ok(ChunkTrade {
      reserves: (leg1.reserve_out, leg1.reserve_in),
      proceeds: DirectionalPair::new(leg0.amount_out, leg1.amount_out),
    });
  }

  let value0 = U256::from(in0).saturating_mul(U256::from(r1));
  let value1 = U256::from(in1).saturating_mul(U256::from(r0));

  if value0 >= value1 {
    // token0 sellers carry the excess; all of in1 is matched.
    let matched0 = to_balance(value1 / U256::from(r1))?.min(in0);
    let excess0 = in0 - matched0;
    let leg = P::swap(curve, r0, r1, excess0)?;
    Ok(ChunkTrade {
      reserves: (leg.reserve_in, leg.reserve_out),
      proceeds: DirectionalPair::new(
        in1
          .checked_add(leg.amount_out)
          .ok_or(ArithmeticError::Overflow)?,
        matched0,
      ),
    })
  } else {
    let matched1 = to_balance(value0 / U256::from(r0))?.min(in1);
    let excess1 = in1 - matched1;
    let leg = P::swap(curve, r1, r0, excess1)?;
    Ok(ChunkTrade {
      reserves: (leg.reserve_out, leg.reserve_in),
      proceeds: DirectionalPair::new(
        matched1,
        in0
          .checked_add(leg.amount_out)
          .ok_or(ArithmeticError::Overflow)?,
      ),
    })
  }
}

/// Folds `proceeds` into the order pool's accumulator.
pub fn accrue(order_pool: &mut OrderPool, proceeds: Balance) -> Result<(), DispatchError> {
  if order_pool.sales_rate == 0 || proceeds == 0 {
    return Ok(());
  }
  let delta = U256::from(proceeds)
    .checked_mul(U256::from(PROCEEDS_SCALE))
    .ok_or(ArithmeticError::Overflow)?
    / U256::from(order_pool.sales_rate);
  order_pool.scaled_proceeds = order_pool
    .scaled_proceeds
    .checked_add(delta)
    .ok_or(ArithmeticError::Overflow)?;
  Ok(())
}

/// Output earned by `sales_rate` between two accumulator readings.
pub fn proceeds_between(
  from: U256,
  to: U256,
  sales_rate: Balance,
) -> Result<Balance, DispatchError> {
  let earned = to
    .saturating_sub(from)
    .checked_mul(U256::from(sales_rate))
    .ok_or(ArithmeticError::Overflow)?
    / U256::from(PROCEEDS_SCALE);
  to_balance(earned)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::curves::StandardCurves;

  fn trade(
    reserves: (Balance, Balance),
    sold0: Balance,
    sold1: Balance,
    fee: Permill,
  ) -> ChunkTrade {
    trade_chunk::<StandardCurves>(
      CurveKind::ConstantProduct,
      fee,
      reserves,
      DirectionalPair::new(sold0, sold1),
    )
    .unwrap()
  }

  #[test]
  fn one_sided_flow_hits_the_curve() {
    let result = trade((1_000, 1_000), 1_000, 0, Permill::zero());
    assert_eq!(result.proceeds, DirectionalPair::new(500, 0));
    assert_eq!(result.reserves, (2_000, 500));
  }

  #[test]
  fn equal_opposing_flows_net_without_moving_reserves() {
    let result = trade((1_000_000, 2_000_000), 100, 200, Permill::zero());
    assert_eq!(result.proceeds, DirectionalPair::new(200, 100));
    assert_eq!(result.reserves, (1_000_000, 2_000_000));
  }

  #[test]
  fn only_excess_reaches_the_curve() {
    // 300 token0 against 100 token1 at 1:1: 100 matched, 200 swapped.
    let result = trade((10_000, 10_000), 300, 100, Permill::zero());
    let swapped = 10_000 * 200 / (10_000 + 200);
    assert_eq!(result.proceeds.token1_to_0, 100);
    assert_eq!(result.proceeds.token0_to_1, 100 + swapped);
    assert_eq!(result.reserves, (10_200, 10_000 - swapped));
  }

  #[test]
  fn fee_is_skimmed_into_reserves() {
    let result = trade((1_000_000, 1_000_000), 1_000, 0, Permill::from_percent(1));
    // 10 skimmed, 990 swapped against (1_000_010, 1_000_000)
    let swapped = 1_000_000u128 * 990 / (1_000_010 + 990);
    assert_eq!(result.proceeds.token0_to_1, swapped);
    assert_eq!(result.reserves, (1_001_000, 1_000_000 - swapped));
  }

  #[test]
  fn accumulator_ignores_idle_pool() {
    let mut order_pool = OrderPool::default();
    accrue(&mut order_pool, 1_000).unwrap();
    assert!(order_pool.scaled_proceeds.is_zero());

    order_pool.sales_rate = 4;
    accrue(&mut order_pool, 10).unwrap();
    assert_eq!(
      proceeds_between(U256::zero(), order_pool.scaled_proceeds, 4).unwrap(),
      10
    );
    assert_eq!(
      proceeds_between(U256::zero(), order_pool.scaled_proceeds, 1).unwrap(),
      2
    );
  }
}
