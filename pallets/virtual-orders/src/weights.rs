#![cfg_attr(rustfmt, rustfmt_skip)]
#![allow(unused_parens)]
#![allow(unused_imports)]
#![allow(missing_docs)]

use core::marker::PhantomData;
use polkadot_sdk::frame_support::{
  traits::Get,
  weights::{constants::RocksDbWeight, Weight},
};

pub trait WeightInfo {
  fn create_pool() -> Weight;
  fn create_long_term_order() -> Weight;
  fn pause_order() -> Weight;
  fn resume_order() -> Weight;
  fn cancel_order() -> Weight;
  fn withdraw_order() -> Weight;
  fn advance_virtual_orders(expiries: u32) -> Weight;
  fn set_pool_paused() -> Weight;
  fn set_long_term_fee() -> Weight;
}

/// Worst-case catch-up cost folded into every call that touches a pool
fn catch_up<T: crate::Config>() -> Weight {
  let expiries = u64::from(T::MaxPendingExpiries::get());
  Weight::from_parts(6_000_000, 300)
    .saturating_mul(expiries.saturating_add(1))
    .saturating_add(T::DbWeight::get().reads(expiries.saturating_add(2)))
    .saturating_add(T::DbWeight::get().writes(expiries.saturating_add(2)))
}

pub struct SubstrateWeight<T>(PhantomData<T>);
impl<T: polkadot_sdk::frame_system::Config + crate::Config> WeightInfo for SubstrateWeight<T> {
  fn create_pool() -> Weight {
    Weight::from_parts(18_000_000, 1500)
      .saturating_add(T::DbWeight::get().reads(2))
      .saturating_add(T::DbWeight::get().writes(3))
  }

  fn create_long_term_order() -> Weight {
    Weight::from_parts(45_000_000, 3500)
      .saturating_add(catch_up::<T>())
      .saturating_add(T::DbWeight::get().reads(5))
      .saturating_add(T::DbWeight::get().writes(8))
  }

  fn pause_order() -> Weight {
    Weight::from_parts(25_000_000, 2000)
      .saturating_add(catch_up::<T>())
      .saturating_add(T::DbWeight::get().reads(3))
      .saturating_add(T::DbWeight::get().writes(3))
  }

  fn resume_order() -> Weight {
    Weight::from_parts(25_000_000, 2000)
      .saturating_add(catch_up::<T>())
      .saturating_add(T::DbWeight::get().reads(3))
      .saturating_add(T::DbWeight::get().writes(3))
  }

  fn cancel_order() -> Weight {
    Weight::from_parts(50_000_000, 3500)
      .saturating_add(catch_up::<T>())
      .saturating_add(T::DbWeight::get().reads(6))
      .saturating_add(T::DbWeight::get().writes(9))
  }

  fn withdraw_order() -> Weight {
    Weight::from_parts(45_000_000, 3500)
      .saturating_add(catch_up::<T>())
      .saturating_add(T::DbWeight::get().reads(6))
      .saturating_add(T::DbWeight::get().writes(9))
  }

  fn advance_virtual_orders(expiries: u32) -> Weight {
    Weight::from_parts(10_000_000, 1000)
      .saturating_add(Weight::from_parts(6_000_000, 300).saturating_mul(u64::from(expiries)))
      .saturating_add(T::DbWeight::get().reads(u64::from(expiries).saturating_add(2)))
      .saturating_add(T::DbWeight::get().writes(u64::from(expiries).saturating_add(2)))
  }

  fn set_pool_paused() -> Weight {
    Weight::from_parts(12_000_000, 1200)
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(1))
  }

  fn set_long_term_fee() -> Weight {
    Weight::from_parts(15_000_000, 1200)
      .saturating_add(catch_up::<T>())
      .saturating_add(T::DbWeight::get().reads(1))
      .saturating_add(T::DbWeight::get().writes(1))
  }
}

impl WeightInfo for () {
  fn create_pool() -> Weight {
    Weight::from_parts(18_000_000, 1500)
      .saturating_add(RocksDbWeight::get().reads(2))
      .saturating_add(RocksDbWeight::get().writes(3))
  }

  fn create_long_term_order() -> Weight {
    Weight::from_parts(45_000_000, 3500)
      .saturating_add(RocksDbWeight::get().reads(6))
      .saturating_add(RocksDbWeight::get().writes(8))
  }

  fn pause_order() -> Weight {
    Weight::from_parts(25_000_000, 2000)
      .saturating_add(RocksDbWeight::get().reads(3))
      .saturating_add(RocksDbWeight::get().writes(3))
  }

  fn resume_order() -> Weight {
    Weight::from_parts(25_000_000, 2000)
      .saturating_add(RocksDbWeight::get().reads(3))
      .saturating_add(RocksDbWeight::get().writes(3))
  }

  fn cancel_order() -> Weight {
    Weight::from_parts(50_000_000, 3500)
      .saturating_add(RocksDbWeight::get().reads(6))
      .saturating_add(RocksDbWeight::get().writes(9))
  }

  fn withdraw_order() -> Weight {
    Weight::from_parts(45_000_000, 3500)
      .saturating_add(RocksDbWeight::get().reads(6))
      .saturating_add(RocksDbWeight::get().writes(9))
  }

  fn advance_virtual_orders(expiries: u32) -> Weight {
    Weight::from_parts(10_000_000, 1000)
      .saturating_add(Weight::from_parts(6_000_000, 300).saturating_mul(u64::from(expiries)))
      .saturating_add(RocksDbWeight::get().reads(u64::from(expiries).saturating_add(2)))
      .saturating_add(RocksDbWeight::get().writes(u64::from(expiries).saturating_add(2)))
  }

  fn set_pool_paused() -> Weight {
    Weight::from_parts(12_000_000, 1200)
      .saturating_add(RocksDbWeight::get().reads(1))
      .saturating_add(RocksDbWeight::get().writes(1))
  }

  fn set_long_term_fee() -> Weight {
    Weight::from_parts(15_000_000, 1200)
      .saturating_add(RocksDbWeight::get().reads(1))
      .saturating_add(RocksDbWeight::get().writes(1))
  }
}
