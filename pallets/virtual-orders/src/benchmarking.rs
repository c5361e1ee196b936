#![cfg(feature = "runtime-benchmarks")]

use crate::*;
use frame::prelude::*;
use polkadot_sdk::frame_benchmarking::{account, v2::*};
use polkadot_sdk::frame_support::traits::EnsureOrigin;
use polkadot_sdk::frame_system::RawOrigin;

const RESERVE: Balance = 1_000_000_000_000;
const ORDER_AMOUNT: Balance = 1_000_000_000;

#[benchmarks]
mod benches {
  use super::*;

  fn admin_origin<T: Config>() -> Result<T::RuntimeOrigin, BenchmarkError> {
    T::AdminOrigin::try_successful_origin().map_err(|_| BenchmarkError::Weightless)
  }

  /// Stable constant-product pool over the helper's asset pair, with reserves.
  fn setup_pool<T: Config>() -> Result<PoolId, BenchmarkError> {
    let (token_a, token_b) = T::BenchmarkHelper::asset_pair();
    let pool_id = NextPoolId::<T>::get();
    Pallet::<T>::create_pool(
      admin_origin::<T>()?,
      token_a,
      token_b,
      PoolKind::Stable,
      CurveKind::ConstantProduct,
    )?;
    let custody = Pallet::<T>::account_id();
    T::BenchmarkHelper::fund(&custody, token_a, RESERVE)?;
    T::BenchmarkHelper::fund(&custody, token_b, RESERVE)?;
    <Pallet<T> as ReserveLedger<PoolId, Balance>>::deposit_reserves(pool_id, RESERVE, RESERVE)?;
    Ok(pool_id)
  }

  fn place_order<T: Config>(
    who: &T::AccountId,
    pool_id: PoolId,
    direction: OrderDirection,
    intervals: u32,
    delegate: Option<T::AccountId>,
  ) -> Result<OrderId, BenchmarkError> {
    let pool = Pools::<T>::get(pool_id).ok_or(BenchmarkError::Stop("pool missing"))?;
    T::BenchmarkHelper::fund(who, pool.sell_asset(direction), ORDER_AMOUNT)?;
    let order_id = Pallet::<T>::do_create_long_term_order(
      who,
      pool_id,
      direction,
      ORDER_AMOUNT,
      intervals,
      who.clone(),
      delegate,
    )?;
    Ok(order_id)
  }

  /// Queues `expiries` distinct expiry blocks on the pool, one filler order
  /// each. At most `MaxOrderIntervals` are reachable from a single block.
  fn fill_expiries<T: Config>(pool_id: PoolId, expiries: u32) -> Result<(), BenchmarkError> {
    for i in 0..expiries.min(T::MaxOrderIntervals::get()) {
      let filler: T::AccountId = account("filler", i, 0);
      let direction = if i % 2 == 0 {
        OrderDirection::Token0To1
      } else {
        OrderDirection::Token1To0
      };
      place_order::<T>(&filler, pool_id, direction, i.saturating_add(1), None)?;
    }
    Ok(())
  }

  fn advance_blocks<T: Config>(blocks: u32) {
    let now = frame_system::Pallet::<T>::block_number();
    frame_system::Pallet::<T>::set_block_number(now.saturating_add(blocks.into()));
  }

  #[benchmark]
  fn create_pool() -> Result<(), BenchmarkError> {
    let origin = admin_origin::<T>()?;
    let (token_a, token_b) = T::BenchmarkHelper::asset_pair();
    #[extrinsic_call]
    _(
      origin as T::RuntimeOrigin,
      token_a,
      token_b,
      PoolKind::Volatile,
      CurveKind::Stable { amplification: 100 },
    );
    assert_eq!(NextPoolId::<T>::get(), 1);
    Ok(())
  }

  #[benchmark]
  fn create_long_term_order() -> Result<(), BenchmarkError> {
    let pool_id = setup_pool::<T>()?;
    fill_expiries::<T>(pool_id, T::MaxOrderIntervals::get().saturating_sub(1))?;
    let caller: T::AccountId = whitelisted_caller();
    let delegate: T::AccountId = account("delegate", 0, 0);
    let pool = Pools::<T>::get(pool_id).ok_or(BenchmarkError::Stop("pool missing"))?;
    T::BenchmarkHelper::fund(&caller, pool.token0, ORDER_AMOUNT)?;
    let intervals = T::MaxOrderIntervals::get();
    #[extrinsic_call]
    _(
      RawOrigin::Signed(caller.clone()),
      pool_id,
      OrderDirection::Token0To1,
      ORDER_AMOUNT,
      intervals,
      caller.clone(),
      Some(delegate),
    );
    assert_eq!(Pallet::<T>::get_order_ids(&caller, 0, 1).total_results, 1);
    Ok(())
  }

  #[benchmark]
  fn pause_order() -> Result<(), BenchmarkError> {
    let pool_id = setup_pool::<T>()?;
    let caller: T::AccountId = whitelisted_caller();
    let order_id = place_order::<T>(&caller, pool_id, OrderDirection::Token0To1, 2, None)?;
    advance_blocks::<T>(3);
    #[extrinsic_call]
    _(RawOrigin::Signed(caller), order_id);
    assert!(Orders::<T>::get(order_id).is_some_and(|order| order.paused));
    Ok(())
  }

  #[benchmark]
  fn resume_order() -> Result<(), BenchmarkError> {
    let pool_id = setup_pool::<T>()?;
    let caller: T::AccountId = whitelisted_caller();
    let order_id = place_order::<T>(&caller, pool_id, OrderDirection::Token0To1, 2, None)?;
    Pallet::<T>::pause_order(RawOrigin::Signed(caller.clone()).into(), order_id)?;
    advance_blocks::<T>(3);
    #[extrinsic_call]
    _(RawOrigin::Signed(caller), order_id);
    assert!(Orders::<T>::get(order_id).is_some_and(|order| !order.paused));
    Ok(())
  }

  #[benchmark]
  fn cancel_order() -> Result<(), BenchmarkError> {
    let pool_id = setup_pool::<T>()?;
    let owner: T::AccountId = account("owner", 0, 0);
    let caller: T::AccountId = whitelisted_caller();
    let order_id =
      place_order::<T>(&owner, pool_id, OrderDirection::Token1To0, 2, Some(caller.clone()))?;
    advance_blocks::<T>(3);
    #[extrinsic_call]
    _(RawOrigin::Signed(caller), order_id, Some(owner));
    assert!(Orders::<T>::get(order_id).is_some_and(|order| order.is_cleared()));
    Ok(())
  }

  #[benchmark]
  fn withdraw_order() -> Result<(), BenchmarkError> {
    let pool_id = setup_pool::<T>()?;
    let caller: T::AccountId = whitelisted_caller();
    let order_id = place_order::<T>(&caller, pool_id, OrderDirection::Token0To1, 1, None)?;
    let interval = Pallet::<T>::order_interval(PoolKind::Stable);
    advance_blocks::<T>(interval.saturating_mul(3));
    #[extrinsic_call]
    _(RawOrigin::Signed(caller), order_id, None);
    assert!(Orders::<T>::get(order_id).is_some_and(|order| order.is_cleared()));
    Ok(())
  }

  #[benchmark]
  fn advance_virtual_orders(e: Linear<1, 5>) -> Result<(), BenchmarkError> {
    let pool_id = setup_pool::<T>()?;
    fill_expiries::<T>(pool_id, e)?;
    let interval = Pallet::<T>::order_interval(PoolKind::Stable);
    advance_blocks::<T>(interval.saturating_mul(e.saturating_add(2)));
    let caller: T::AccountId = whitelisted_caller();
    let now = frame_system::Pallet::<T>::block_number();
    #[extrinsic_call]
    _(RawOrigin::Signed(caller), pool_id, now);
    assert!(Pallet::<T>::pending_expiries(pool_id).is_empty());
    Ok(())
  }

  #[benchmark]
  fn set_pool_paused() -> Result<(), BenchmarkError> {
    let pool_id = setup_pool::<T>()?;
    let origin = admin_origin::<T>()?;
    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, pool_id, true);
    assert!(Pools::<T>::get(pool_id).is_some_and(|pool| pool.paused));
    Ok(())
  }

  #[benchmark]
  fn set_long_term_fee() -> Result<(), BenchmarkError> {
    let pool_id = setup_pool::<T>()?;
    fill_expiries::<T>(pool_id, T::MaxOrderIntervals::get())?;
    advance_blocks::<T>(Pallet::<T>::order_interval(PoolKind::Stable));
    let origin = admin_origin::<T>()?;
    let fee = T::MaxLongTermFee::get();
    #[extrinsic_call]
    _(origin as T::RuntimeOrigin, pool_id, fee);
    assert!(Pools::<T>::get(pool_id).is_some_and(|pool| pool.long_term_fee == fee));
    Ok(())
  }

  #[cfg(test)]
  use crate::mock::{Test, new_test_ext};
  #[cfg(test)]
  impl_benchmark_test_suite!(Pallet, new_test_ext(), Test);
}
