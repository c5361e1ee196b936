//! Virtual Orders Pallet
//!
//! Long-term ("drip") orders for constant-function AMM pools. An order sells
//! its input evenly over a whole number of order intervals; the pallet
//! executes all orders of a pool lazily, in closed form, whenever the pool is
//! touched. Opposing flows are matched against each other at the spot price
//! and only the excess trades against the curve.
//!
//! Per pool and direction an order pool tracks the running sales rate and a
//! reward-per-unit-rate accumulator. Each order keeps a checkpoint of that
//! accumulator, so settling an order is a single multiplication no matter how
//! many blocks have passed.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use pallet::*;

pub mod adapters;
pub use adapters::{OrderVault, PricingPrimitive, ReserveLedger};

pub mod curves;
pub use curves::StandardCurves;

pub mod execution;

pub mod types;
pub use types::*;

pub mod weights;
pub use weights::WeightInfo;

#[cfg(test)]
mod mock;

#[cfg(feature = "runtime-benchmarks")]
mod benchmarking;

#[cfg(feature = "runtime-benchmarks")]
pub trait BenchmarkHelper<AccountId, AssetId> {
  /// Two distinct assets a benchmark pool can be created for
  fn asset_pair() -> (AssetId, AssetId);

  fn fund(
    who: &AccountId,
    asset: AssetId,
    amount: Balance,
  ) -> Result<(), polkadot_sdk::sp_runtime::DispatchError>;
}

use frame::prelude::{DispatchResult, ensure};
use polkadot_sdk::frame_support::storage::with_storage_layer;

pub(crate) const LOG_TARGET: &str = "runtime::virtual-orders";

#[frame::pallet]
pub mod pallet {
  use crate::{
    adapters::{OrderVault, PricingPrimitive},
    execution::{self, ExecutionMode, VirtualExecution},
    types::*,
    weights::WeightInfo,
    LOG_TARGET,
  };
  use alloc::vec::Vec;
  use frame::prelude::*;
  use polkadot_sdk::{
    frame_support::{PalletId, traits::EnsureOrigin},
    sp_runtime::traits::{AccountIdConversion, CheckedAdd, SaturatedConversion, Zero},
  };
  use primitives::ecosystem::params::{MAX_AMPLIFICATION, MAX_LONG_TERM_FEE};

  #[pallet::config]
  pub trait Config: frame_system::Config {
    /// Identifier of the two tokens a pool trades
    type AssetId: Parameter + Member + Copy + Ord + MaxEncodedLen;

    /// Custody of order deposits and payouts
    type Vault: OrderVault<Self::AccountId, Self::AssetId, Balance>;

    /// Curve math used for the unmatched part of each chunk
    type Pricing: PricingPrimitive<Balance>;

    /// Origin allowed to create and administer pools
    type AdminOrigin: EnsureOrigin<Self::RuntimeOrigin>;

    #[pallet::constant]
    type PalletId: Get<PalletId>;

    #[pallet::constant]
    type StableOrderInterval: Get<u32>;
    #[pallet::constant]
    type LiquidOrderInterval: Get<u32>;
    #[pallet::constant]
    type VolatileOrderInterval: Get<u32>;

    /// Longest order, in intervals
    #[pallet::constant]
    type MaxOrderIntervals: Get<u32>;
    /// Distinct expiry blocks queued per pool; must exceed
    /// `MaxOrderIntervals` so every reachable boundary fits
    #[pallet::constant]
    type MaxPendingExpiries: Get<u32>;

    #[pallet::constant]
    type DefaultLongTermFee: Get<Permill>;
    #[pallet::constant]
    type MaxLongTermFee: Get<Permill>;

    type WeightInfo: WeightInfo;

    #[cfg(feature = "runtime-benchmarks")]
    type BenchmarkHelper: crate::BenchmarkHelper<Self::AccountId, Self::AssetId>;
  }

  pub type PoolInfoOf<T> = PoolInfo<<T as Config>::AssetId, BlockNumberFor<T>>;
  pub type OrderOf<T> = LongTermOrder<<T as frame_system::Config>::AccountId, BlockNumberFor<T>>;
  pub type OrderViewOf<T> = OrderView<<T as frame_system::Config>::AccountId, BlockNumberFor<T>>;
  pub type ExecutionOf<T> = VirtualExecution<BlockNumberFor<T>>;

  #[pallet::pallet]
  pub struct Pallet<T>(_);

  #[pallet::storage]
  #[pallet::getter(fn next_pool_id)]
  pub type NextPoolId<T> = StorageValue<_, PoolId, ValueQuery>;

  #[pallet::storage]
  #[pallet::getter(fn pools)]
  pub type Pools<T: Config> = StorageMap<_, Blake2_128Concat, PoolId, PoolInfoOf<T>, OptionQuery>;

  #[pallet::storage]
  pub type PoolLookup<T: Config> =
    StorageMap<_, Blake2_128Concat, (T::AssetId, T::AssetId, PoolKind), PoolId, OptionQuery>;

  /// Sorted, deduplicated expiry blocks not yet crossed by execution
  #[pallet::storage]
  #[pallet::getter(fn pending_expiries)]
  pub type PendingExpiries<T: Config> = StorageMap<
    _,
    Blake2_128Concat,
    PoolId,
    BoundedVec<BlockNumberFor<T>, T::MaxPendingExpiries>,
    ValueQuery,
  >;

  #[pallet::storage]
  #[pallet::getter(fn expiry_buckets)]
  pub type ExpiryBuckets<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    PoolId,
    Blake2_128Concat,
    BlockNumberFor<T>,
    ExpiryBucket,
    OptionQuery,
  >;

  #[pallet::storage]
  #[pallet::getter(fn next_order_id)]
  pub type NextOrderId<T> = StorageValue<_, OrderId, ValueQuery>;

  #[pallet::storage]
  #[pallet::getter(fn orders)]
  pub type Orders<T: Config> = StorageMap<_, Blake2_128Concat, OrderId, OrderOf<T>, OptionQuery>;

  /// Ids of live orders an account owns or delegates
  #[pallet::storage]
  pub type AccountOrders<T: Config> = StorageDoubleMap<
    _,
    Blake2_128Concat,
    T::AccountId,
    Twox64Concat,
    OrderId,
    (),
    OptionQuery,
  >;

  #[pallet::hooks]
  impl<T: Config> Hooks<BlockNumberFor<T>> for Pallet<T> {
    fn integrity_test() {
      assert!(
        T::StableOrderInterval::get() > 0
          && T::LiquidOrderInterval::get() > 0
          && T::VolatileOrderInterval::get() > 0,
        "order intervals must be non-zero"
      );
      assert!(
        T::MaxOrderIntervals::get() > 0,
        "MaxOrderIntervals must be non-zero"
      );
      assert!(
        T::MaxPendingExpiries::get() > T::MaxOrderIntervals::get(),
        "MaxPendingExpiries must exceed MaxOrderIntervals"
      );
      assert!(
        T::DefaultLongTermFee::get() <= T::MaxLongTermFee::get(),
        "DefaultLongTermFee exceeds MaxLongTermFee"
      );
      assert!(
        T::MaxLongTermFee::get() <= MAX_LONG_TERM_FEE,
        "MaxLongTermFee exceeds the ecosystem ceiling"
      );
    }

    #[cfg(feature = "try-runtime")]
    fn try_state(_n: BlockNumberFor<T>) -> Result<(), polkadot_sdk::sp_runtime::TryRuntimeError> {
      Self::do_try_state()
    }
  }

  #[pallet::event]
  #[pallet::generate_deposit(pub(super) fn deposit_event)]
  pub enum Event<T: Config> {
    PoolCreated {
      pool_id: PoolId,
      token0: T::AssetId,
      token1: T::AssetId,
      kind: PoolKind,
      curve: CurveKind,
      order_interval: u32,
    },
    LongTermOrderCreated {
      order_id: OrderId,
      pool_id: PoolId,
      owner: T::AccountId,
      delegate: Option<T::AccountId>,
      direction: OrderDirection,
      amount_in: Balance,
      sales_rate: Balance,
      expiry_block: BlockNumberFor<T>,
    },
    OrderPaused {
      order_id: OrderId,
    },
    OrderResumed {
      order_id: OrderId,
    },
    OrderCancelled {
      order_id: OrderId,
      recipient: T::AccountId,
      refunded: Balance,
      proceeds: Balance,
    },
    OrderWithdrawn {
      order_id: OrderId,
      recipient: T::AccountId,
      proceeds: Balance,
      refunded: Balance,
    },
    OrderCleared {
      order_id: OrderId,
    },
    VirtualOrdersExecuted {
      pool_id: PoolId,
      from_block: BlockNumberFor<T>,
      to_block: BlockNumberFor<T>,
      chunks: u32,
      reserves: (Balance, Balance),
    },
    PoolPauseSet {
      pool_id: PoolId,
      paused: bool,
    },
    LongTermFeeUpdated {
      pool_id: PoolId,
      old_fee: Permill,
      new_fee: Permill,
    },
    ReservesDeposited {
      pool_id: PoolId,
      amount0: Balance,
      amount1: Balance,
    },
    ReservesWithdrawn {
      pool_id: PoolId,
      amount0: Balance,
      amount1: Balance,
    },
  }

  #[pallet::error]
  pub enum Error<T> {
    /// Caller is neither owner nor delegate, or the order does not exist
    Unauthorized,
    AlreadyPaused,
    AlreadyActive,
    OrderExpired,
    CannotCancelExpired,
    /// A delegate tried to send funds somewhere other than the owner
    RecipientNotOwner,
    OrderNotFound,
    PoolNotFound,
    PoolAlreadyExists,
    PoolPaused,
    IdenticalAssets,
    InvalidCurve,
    ZeroAmount,
    ZeroIntervals,
    TooManyIntervals,
    /// Deposit too small to sell at least one unit per block
    SalesRateTooLow,
    InsufficientLiquidity,
    ExpiryQueueFull,
    OrderIdOverflow,
    PoolIdOverflow,
    ArithmeticOverflow,
    InvalidTargetBlock,
    FeeTooHigh,
    /// Order expired but execution has not crossed its expiry yet.
    /// Defensive: every caller of settlement catches the pool up first.
    ExpiryNotProcessed,
  }

  #[pallet::call]
  impl<T: Config> Pallet<T> {
    #[pallet::call_index(0)]
    #[pallet::weight(T::WeightInfo::create_pool())]
    pub fn create_pool(
      origin: OriginFor<T>,
      token_a: T::AssetId,
      token_b: T::AssetId,
      kind: PoolKind,
      curve: CurveKind,
    ) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(token_a != token_b, Error::<T>::IdenticalAssets);
      if let CurveKind::Stable { amplification } = curve {
        ensure!(
          amplification > 0 && amplification <= MAX_AMPLIFICATION,
          Error::<T>::InvalidCurve
        );
      }
      let (token0, token1) = if token_a < token_b {
        (token_a, token_b)
      } else {
        (token_b, token_a)
      };
      ensure!(
        !PoolLookup::<T>::contains_key((token0, token1, kind)),
        Error::<T>::PoolAlreadyExists
      );

      let pool_id = NextPoolId::<T>::get();
      let next_id = pool_id.checked_add(1).ok_or(Error::<T>::PoolIdOverflow)?;
      let order_interval = Self::order_interval(kind);
      let pool = PoolInfo {
        token0,
        token1,
        kind,
        curve,
        order_interval,
        reserves: (0, 0),
        last_executed_block: frame_system::Pallet::<T>::block_number(),
        order_pools: DirectionalPair::default(),
        long_term_fee: T::DefaultLongTermFee::get(),
        paused: false,
      };
      Pools::<T>::insert(pool_id, pool);
      PoolLookup::<T>::insert((token0, token1, kind), pool_id);
      NextPoolId::<T>::put(next_id);

      Self::deposit_event(Event::PoolCreated {
        pool_id,
        token0,
        token1,
        kind,
        curve,
        order_interval,
      });
      Ok(())
    }

    #[pallet::call_index(1)]
    #[pallet::weight(T::WeightInfo::create_long_term_order())]
    pub fn create_long_term_order(
      origin: OriginFor<T>,
      pool_id: PoolId,
      direction: OrderDirection,
      amount_in: Balance,
      intervals: u32,
      owner: T::AccountId,
      delegate: Option<T::AccountId>,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      Self::do_create_long_term_order(
        &who, pool_id, direction, amount_in, intervals, owner, delegate,
      )?;
      Ok(())
    }

    #[pallet::call_index(2)]
    #[pallet::weight(T::WeightInfo::pause_order())]
    pub fn pause_order(origin: OriginFor<T>, order_id: OrderId) -> DispatchResult {
      let who = ensure_signed(origin)?;
      let (mut order, mut pool, _) = Self::order_preamble(&who, order_id)?;
      let now = frame_system::Pallet::<T>::block_number();
      ensure!(!order.paused, Error::<T>::AlreadyPaused);
      ensure!(!order.is_expired(now), Error::<T>::OrderExpired);

      Self::settle(&mut order, &pool, now, None)?;
      Self::withdraw_rate(&mut pool, &order)?;
      order.paused = true;

      Pools::<T>::insert(order.pool_id, pool);
      Orders::<T>::insert(order_id, order);
      Self::deposit_event(Event::OrderPaused { order_id });
      Ok(())
    }

    #[pallet::call_index(3)]
    #[pallet::weight(T::WeightInfo::resume_order())]
    pub fn resume_order(origin: OriginFor<T>, order_id: OrderId) -> DispatchResult {
      let who = ensure_signed(origin)?;
      let (mut order, mut pool, _) = Self::order_preamble(&who, order_id)?;
      let now = frame_system::Pallet::<T>::block_number();
      ensure!(!order.is_expired(now), Error::<T>::OrderExpired);
      ensure!(order.paused, Error::<T>::AlreadyActive);

      order.paused = false;
      order.scaled_proceeds_checkpoint = pool.order_pools.get(order.direction).scaled_proceeds;
      order.checkpoint_block = now;
      Self::restore_rate(&mut pool, &order)?;

      Pools::<T>::insert(order.pool_id, pool);
      Orders::<T>::insert(order_id, order);
      Self::deposit_event(Event::OrderResumed { order_id });
      Ok(())
    }

    #[pallet::call_index(4)]
    #[pallet::weight(T::WeightInfo::cancel_order())]
    pub fn cancel_order(
      origin: OriginFor<T>,
      order_id: OrderId,
      recipient: Option<T::AccountId>,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      let (mut order, mut pool, authority) = Self::order_preamble(&who, order_id)?;
      let now = frame_system::Pallet::<T>::block_number();
      ensure!(!order.is_expired(now), Error::<T>::CannotCancelExpired);
      let recipient = Self::resolve_recipient(authority, &order, recipient)?;

      Self::settle(&mut order, &pool, now, None)?;
      if !order.paused {
        Self::withdraw_rate(&mut pool, &order)?;
      }
      let refunded = order.unsold;
      let proceeds = order.proceeds;
      Self::pay_out(&pool, order.direction, &recipient, refunded, proceeds)?;
      Self::clear_order(order_id, &mut order);

      Pools::<T>::insert(order.pool_id, pool);
      Orders::<T>::insert(order_id, order);
      Self::deposit_event(Event::OrderCancelled {
        order_id,
        recipient,
        refunded,
        proceeds,
      });
      Self::deposit_event(Event::OrderCleared { order_id });
      Ok(())
    }

    #[pallet::call_index(5)]
    #[pallet::weight(T::WeightInfo::withdraw_order())]
    pub fn withdraw_order(
      origin: OriginFor<T>,
      order_id: OrderId,
      recipient: Option<T::AccountId>,
    ) -> DispatchResult {
      let who = ensure_signed(origin)?;
      let (mut order, pool, authority) = Self::order_preamble(&who, order_id)?;
      let now = frame_system::Pallet::<T>::block_number();
      let recipient = Self::resolve_recipient(authority, &order, recipient)?;

      Self::settle(&mut order, &pool, now, None)?;
      let proceeds = core::mem::take(&mut order.proceeds);
      let expired = order.is_expired(now);
      // Paused time leaves input unsold; it is returned once the order ends.
      let refunded = if expired { order.unsold } else { 0 };
      Self::pay_out(&pool, order.direction, &recipient, refunded, proceeds)?;
      if expired {
        Self::clear_order(order_id, &mut order);
      }

      Orders::<T>::insert(order_id, order);
      Self::deposit_event(Event::OrderWithdrawn {
        order_id,
        recipient,
        proceeds,
        refunded,
      });
      if expired {
        Self::deposit_event(Event::OrderCleared { order_id });
      }
      Ok(())
    }

    #[pallet::call_index(6)]
    #[pallet::weight(T::WeightInfo::advance_virtual_orders(T::MaxPendingExpiries::get()))]
    pub fn advance_virtual_orders(
      origin: OriginFor<T>,
      pool_id: PoolId,
      to_block: BlockNumberFor<T>,
    ) -> DispatchResult {
      ensure_signed(origin)?;
      ensure!(
        to_block <= frame_system::Pallet::<T>::block_number(),
        Error::<T>::InvalidTargetBlock
      );
      let mut pool = Pools::<T>::get(pool_id).ok_or(Error::<T>::PoolNotFound)?;
      let execution =
        Self::execute_virtual_orders(pool_id, &mut pool, to_block, ExecutionMode::Commit)?;
      if execution.chunks > 0 {
        Pools::<T>::insert(pool_id, pool);
      }
      Ok(())
    }

    #[pallet::call_index(7)]
    #[pallet::weight(T::WeightInfo::set_pool_paused())]
    pub fn set_pool_paused(origin: OriginFor<T>, pool_id: PoolId, paused: bool) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      Pools::<T>::try_mutate(pool_id, |maybe| -> DispatchResult {
        let pool = maybe.as_mut().ok_or(Error::<T>::PoolNotFound)?;
        pool.paused = paused;
        Ok(())
      })?;
      Self::deposit_event(Event::PoolPauseSet { pool_id, paused });
      Ok(())
    }

    #[pallet::call_index(8)]
    #[pallet::weight(T::WeightInfo::set_long_term_fee())]
    pub fn set_long_term_fee(origin: OriginFor<T>, pool_id: PoolId, fee: Permill) -> DispatchResult {
      T::AdminOrigin::ensure_origin(origin)?;
      ensure!(fee <= T::MaxLongTermFee::get(), Error::<T>::FeeTooHigh);
      // Elapsed blocks are executed under the old fee.
      let mut pool = Self::catch_up(pool_id)?;
      let old_fee = pool.long_term_fee;
      pool.long_term_fee = fee;
      Pools::<T>::insert(pool_id, pool);
      Self::deposit_event(Event::LongTermFeeUpdated {
        pool_id,
        old_fee,
        new_fee: fee,
      });
      Ok(())
    }
  }

  impl<T: Config> Pallet<T> {
    /// Custody account for order deposits, proceeds and pool reserves
    pub fn account_id() -> T::AccountId {
      T::PalletId::get().into_account_truncating()
    }

    pub fn order_interval(kind: PoolKind) -> u32 {
      match kind {
        PoolKind::Stable => T::StableOrderInterval::get(),
        PoolKind::Liquid => T::LiquidOrderInterval::get(),
        PoolKind::Volatile => T::VolatileOrderInterval::get(),
      }
    }

    /// First interval boundary at least `intervals` full intervals after `now`.
    pub fn expiry_block(
      now: BlockNumberFor<T>,
      order_interval: u32,
      intervals: u32,
    ) -> Result<BlockNumberFor<T>, DispatchError> {
      ensure!(order_interval > 0, Error::<T>::ArithmeticOverflow);
      let interval: BlockNumberFor<T> = order_interval.into();
      let last_boundary = now - now % interval;
      let span = intervals
        .checked_add(1)
        .and_then(|n| n.checked_mul(order_interval))
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      last_boundary
        .checked_add(&span.into())
        .ok_or_else(|| Error::<T>::ArithmeticOverflow.into())
    }

    pub fn do_create_long_term_order(
      who: &T::AccountId,
      pool_id: PoolId,
      direction: OrderDirection,
      amount_in: Balance,
      intervals: u32,
      owner: T::AccountId,
      delegate: Option<T::AccountId>,
    ) -> Result<OrderId, DispatchError> {
      ensure!(!amount_in.is_zero(), Error::<T>::ZeroAmount);
      ensure!(intervals > 0, Error::<T>::ZeroIntervals);
      ensure!(
        intervals <= T::MaxOrderIntervals::get(),
        Error::<T>::TooManyIntervals
      );

      let mut pool = Self::catch_up(pool_id)?;
      ensure!(!pool.paused, Error::<T>::PoolPaused);
      ensure!(pool.has_liquidity(), Error::<T>::InsufficientLiquidity);

      let now = frame_system::Pallet::<T>::block_number();
      let expiry_block = Self::expiry_block(now, pool.order_interval, intervals)?;
      let duration: Balance = (expiry_block - now).saturated_into();
      let sales_rate = amount_in / duration;
      ensure!(!sales_rate.is_zero(), Error::<T>::SalesRateTooLow);

      let order_id = NextOrderId::<T>::get();
      let next_id = order_id
        .checked_add(1)
        .ok_or(Error::<T>::OrderIdOverflow)?;

      T::Vault::transfer(
        who,
        &Self::account_id(),
        pool.sell_asset(direction),
        amount_in,
      )?;

      let order_pool = pool.order_pools.get_mut(direction);
      order_pool.sales_rate = order_pool
        .sales_rate
        .checked_add(sales_rate)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      let scaled_proceeds_checkpoint = order_pool.scaled_proceeds;
      Self::register_expiry(pool_id, expiry_block, direction, sales_rate)?;

      AccountOrders::<T>::insert(&owner, order_id, ());
      if let Some(delegate) = delegate.as_ref().filter(|d| **d != owner) {
        AccountOrders::<T>::insert(delegate, order_id, ());
      }

      // The remainder of `amount_in / duration` stays in custody undistributed.
      let unsold = sales_rate.saturating_mul(duration);
      Orders::<T>::insert(
        order_id,
        LongTermOrder {
          pool_id,
          owner: Some(owner.clone()),
          delegate: delegate.clone(),
          direction,
          sales_rate,
          created_at: now,
          expiry_block,
          paused: false,
          proceeds: 0,
          unsold,
          checkpoint_block: now,
          scaled_proceeds_checkpoint,
        },
      );
      NextOrderId::<T>::put(next_id);
      Pools::<T>::insert(pool_id, pool);

      Self::deposit_event(Event::LongTermOrderCreated {
        order_id,
        pool_id,
        owner,
        delegate,
        direction,
        amount_in,
        sales_rate,
        expiry_block,
      });
      Ok(order_id)
    }

    /// Projects an order to the current block without writing state.
    pub fn get_order(order_id: OrderId) -> Result<OrderViewOf<T>, DispatchError> {
      let mut order = Orders::<T>::get(order_id).ok_or(Error::<T>::OrderNotFound)?;
      let now = frame_system::Pallet::<T>::block_number();
      if !order.is_cleared() {
        let mut pool = Pools::<T>::get(order.pool_id).ok_or(Error::<T>::PoolNotFound)?;
        let execution =
          Self::execute_virtual_orders(order.pool_id, &mut pool, now, ExecutionMode::Simulate)?;
        Self::settle(&mut order, &pool, now, Some(&execution))?;
      }
      Ok(OrderView {
        order_id,
        pool_id: order.pool_id,
        effective_sales_rate: order.effective_sales_rate(),
        expired: order.is_expired(now),
        owner: order.owner,
        delegate: order.delegate,
        direction: order.direction,
        paused: order.paused,
        sales_rate: order.sales_rate,
        created_at: order.created_at,
        expiry_block: order.expiry_block,
        proceeds: order.proceeds,
        unsold: order.unsold,
      })
    }

    /// Paginated ids of live orders where `account` is owner or delegate,
    /// oldest first.
    pub fn get_order_ids(account: &T::AccountId, offset: u32, count: u32) -> OrderIdsPage {
      let mut indexed: Vec<OrderId> = AccountOrders::<T>::iter_key_prefix(account).collect();
      indexed.sort_unstable();
      let ids: Vec<OrderId> = indexed
        .iter()
        .skip(offset as usize)
        .take(count as usize)
        .copied()
        .collect();
      OrderIdsPage {
        num_results: ids.len() as u32,
        total_results: indexed.len() as u32,
        ids,
      }
    }

    /// Reserves the pool would hold once executed up to `at_block`.
    pub fn get_virtual_reserves(
      pool_id: PoolId,
      at_block: BlockNumberFor<T>,
    ) -> Result<(Balance, Balance), DispatchError> {
      let mut pool = Pools::<T>::get(pool_id).ok_or(Error::<T>::PoolNotFound)?;
      ensure!(
        at_block <= frame_system::Pallet::<T>::block_number(),
        Error::<T>::InvalidTargetBlock
      );
      Self::execute_virtual_orders(pool_id, &mut pool, at_block, ExecutionMode::Simulate)?;
      Ok(pool.reserves)
    }

    /// Loads a pool and executes its virtual orders up to the current block.
    pub(crate) fn catch_up(pool_id: PoolId) -> Result<PoolInfoOf<T>, DispatchError> {
      let mut pool = Pools::<T>::get(pool_id).ok_or(Error::<T>::PoolNotFound)?;
      let now = frame_system::Pallet::<T>::block_number();
      let execution = Self::execute_virtual_orders(pool_id, &mut pool, now, ExecutionMode::Commit)?;
      if execution.chunks > 0 {
        Pools::<T>::insert(pool_id, &pool);
      }
      Ok(pool)
    }

    /// Executes a pool from `last_executed_block` to `target`, one chunk per
    /// crossed expiry. In `Simulate` mode nothing is written.
    pub(crate) fn execute_virtual_orders(
      pool_id: PoolId,
      pool: &mut PoolInfoOf<T>,
      target: BlockNumberFor<T>,
      mode: ExecutionMode,
    ) -> Result<ExecutionOf<T>, DispatchError> {
      let mut execution = ExecutionOf::<T>::default();
      let from_block = pool.last_executed_block;
      if target <= from_block {
        return Ok(execution);
      }

      let queue = PendingExpiries::<T>::get(pool_id);
      let mut crossed = 0usize;
      while pool.last_executed_block < target {
        let boundary = queue.get(crossed).copied().filter(|expiry| *expiry <= target);
        Self::execute_chunk(pool, boundary.unwrap_or(target))?;
        execution.chunks = execution.chunks.saturating_add(1);
        if let Some(expiry) = boundary {
          Self::cross_expiry(pool_id, pool, expiry, mode, &mut execution);
          crossed = crossed.saturating_add(1);
        }
      }

      if mode == ExecutionMode::Commit {
        if crossed > 0 {
          let remaining = queue.into_inner().split_off(crossed);
          if remaining.is_empty() {
            PendingExpiries::<T>::remove(pool_id);
          } else {
            PendingExpiries::<T>::insert(
              pool_id,
              BoundedVec::<_, T::MaxPendingExpiries>::truncate_from(remaining),
            );
          }
        }
        log::debug!(
          target: LOG_TARGET,
          "pool {pool_id}: executed {} chunk(s) {:?}..{:?}, {} expiry(ies), reserves {:?}",
          execution.chunks,
          from_block,
          target,
          crossed,
          pool.reserves,
        );
        Self::deposit_event(Event::VirtualOrdersExecuted {
          pool_id,
          from_block,
          to_block: target,
          chunks: execution.chunks,
          reserves: pool.reserves,
        });
      }
      Ok(execution)
    }

    fn execute_chunk(pool: &mut PoolInfoOf<T>, chunk_end: BlockNumberFor<T>) -> DispatchResult {
      if chunk_end <= pool.last_executed_block {
        return Ok(());
      }
      let blocks: Balance = (chunk_end - pool.last_executed_block).saturated_into();
      let sold = DirectionalPair::new(
        pool
          .order_pools
          .token0_to_1
          .sales_rate
          .checked_mul(blocks)
          .ok_or(Error::<T>::ArithmeticOverflow)?,
        pool
          .order_pools
          .token1_to_0
          .sales_rate
          .checked_mul(blocks)
          .ok_or(Error::<T>::ArithmeticOverflow)?,
      );

      if sold.token0_to_1 > 0 || sold.token1_to_0 > 0 {
        let trade = execution::trade_chunk::<T::Pricing>(
          pool.curve,
          pool.long_term_fee,
          pool.reserves,
          sold,
        )?;
        log::trace!(
          target: LOG_TARGET,
          "chunk to {:?}: sold {:?}, proceeds {:?}, reserves {:?}",
          chunk_end,
          sold,
          trade.proceeds,
          trade.reserves,
        );
        pool.reserves = trade.reserves;
        for direction in OrderDirection::BOTH {
          execution::accrue(
            pool.order_pools.get_mut(direction),
            *trade.proceeds.get(direction),
          )?;
        }
      }
      pool.last_executed_block = chunk_end;
      Ok(())
    }

    fn cross_expiry(
      pool_id: PoolId,
      pool: &mut PoolInfoOf<T>,
      expiry: BlockNumberFor<T>,
      mode: ExecutionMode,
      execution: &mut ExecutionOf<T>,
    ) {
      let snapshot = pool.scaled_proceeds();
      if let Some(mut bucket) = ExpiryBuckets::<T>::get(pool_id, expiry) {
        for direction in OrderDirection::BOTH {
          let order_pool = pool.order_pools.get_mut(direction);
          order_pool.sales_rate = order_pool
            .sales_rate
            .saturating_sub(*bucket.ending_sales_rate.get(direction));
        }
        if mode == ExecutionMode::Commit {
          if bucket.open_orders == 0 {
            ExpiryBuckets::<T>::remove(pool_id, expiry);
          } else {
            bucket.scaled_proceeds_at_expiry = Some(snapshot);
            ExpiryBuckets::<T>::insert(pool_id, expiry, bucket);
          }
        }
      }
      execution.crossed.push((expiry, snapshot));
    }

    /// Resolves the order, catches its pool up and checks the caller.
    fn order_preamble(
      who: &T::AccountId,
      order_id: OrderId,
    ) -> Result<(OrderOf<T>, PoolInfoOf<T>, Authority), DispatchError> {
      let order = Orders::<T>::get(order_id)
        .filter(|order| !order.is_cleared())
        .ok_or(Error::<T>::Unauthorized)?;
      let pool = Self::catch_up(order.pool_id)?;
      let authority = order.authority_of(who).ok_or(Error::<T>::Unauthorized)?;
      Ok((order, pool, authority))
    }

    fn resolve_recipient(
      authority: Authority,
      order: &OrderOf<T>,
      recipient: Option<T::AccountId>,
    ) -> Result<T::AccountId, DispatchError> {
      let owner = order.owner.clone().ok_or(Error::<T>::Unauthorized)?;
      match recipient {
        None => Ok(owner),
        Some(to) => {
          ensure!(
            authority == Authority::Owner || to == owner,
            Error::<T>::RecipientNotOwner
          );
          Ok(to)
        }
      }
    }

    /// Credits an active order with proceeds up to `now`, or up to its expiry
    /// if that has passed.
    pub(crate) fn settle(
      order: &mut OrderOf<T>,
      pool: &PoolInfoOf<T>,
      now: BlockNumberFor<T>,
      simulated: Option<&ExecutionOf<T>>,
    ) -> DispatchResult {
      if order.paused || order.is_cleared() {
        return Ok(());
      }
      let (accumulator, until) = if order.is_expired(now) {
        let snapshot = ExpiryBuckets::<T>::get(order.pool_id, order.expiry_block)
          .and_then(|bucket| bucket.scaled_proceeds_at_expiry)
          .or_else(|| simulated.and_then(|e| e.snapshot_at(order.expiry_block)))
          .ok_or(Error::<T>::ExpiryNotProcessed)?;
        (*snapshot.get(order.direction), order.expiry_block)
      } else {
        (pool.order_pools.get(order.direction).scaled_proceeds, now)
      };

      let earned =
        execution::proceeds_between(order.scaled_proceeds_checkpoint, accumulator, order.sales_rate)?;
      order.proceeds = order
        .proceeds
        .checked_add(earned)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      order.scaled_proceeds_checkpoint = accumulator;
      if until > order.checkpoint_block {
        let blocks: Balance = (until - order.checkpoint_block).saturated_into();
        order.unsold = order
          .unsold
          .saturating_sub(blocks.saturating_mul(order.sales_rate));
        order.checkpoint_block = until;
      }
      Ok(())
    }

    fn withdraw_rate(pool: &mut PoolInfoOf<T>, order: &OrderOf<T>) -> DispatchResult {
      let order_pool = pool.order_pools.get_mut(order.direction);
      order_pool.sales_rate = order_pool
        .sales_rate
        .checked_sub(order.sales_rate)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      ExpiryBuckets::<T>::mutate(order.pool_id, order.expiry_block, |maybe| {
        if let Some(bucket) = maybe {
          let ending = bucket.ending_sales_rate.get_mut(order.direction);
          *ending = ending.saturating_sub(order.sales_rate);
        }
      });
      Ok(())
    }

    fn restore_rate(pool: &mut PoolInfoOf<T>, order: &OrderOf<T>) -> DispatchResult {
      let order_pool = pool.order_pools.get_mut(order.direction);
      order_pool.sales_rate = order_pool
        .sales_rate
        .checked_add(order.sales_rate)
        .ok_or(Error::<T>::ArithmeticOverflow)?;
      ExpiryBuckets::<T>::try_mutate(order.pool_id, order.expiry_block, |maybe| -> DispatchResult {
        let bucket = maybe.get_or_insert_with(Default::default);
        let ending = bucket.ending_sales_rate.get_mut(order.direction);
        *ending = ending
          .checked_add(order.sales_rate)
          .ok_or(Error::<T>::ArithmeticOverflow)?;
        Ok(())
      })
    }

    fn register_expiry(
      pool_id: PoolId,
      expiry: BlockNumberFor<T>,
      direction: OrderDirection,
      sales_rate: Balance,
    ) -> DispatchResult {
      PendingExpiries::<T>::try_mutate(pool_id, |queue| -> DispatchResult {
        if let Err(index) = queue.binary_search(&expiry) {
          queue
            .try_insert(index, expiry)
            .map_err(|_| Error::<T>::ExpiryQueueFull)?;
        }
        Ok(())
      })?;
      ExpiryBuckets::<T>::try_mutate(pool_id, expiry, |maybe| -> DispatchResult {
        let bucket = maybe.get_or_insert_with(Default::default);
        let ending = bucket.ending_sales_rate.get_mut(direction);
        *ending = ending
          .checked_add(sales_rate)
          .ok_or(Error::<T>::ArithmeticOverflow)?;
        bucket.open_orders = bucket
          .open_orders
          .checked_add(1)
          .ok_or(Error::<T>::ArithmeticOverflow)?;
        Ok(())
      })
    }

    fn pay_out(
      pool: &PoolInfoOf<T>,
      direction: OrderDirection,
      recipient: &T::AccountId,
      refunded: Balance,
      proceeds: Balance,
    ) -> DispatchResult {
      let custody = Self::account_id();
      if !refunded.is_zero() {
        T::Vault::transfer(&custody, recipient, pool.sell_asset(direction), refunded)?;
      }
      if !proceeds.is_zero() {
        T::Vault::transfer(&custody, recipient, pool.buy_asset(direction), proceeds)?;
      }
      Ok(())
    }

    /// Drops the owner and delegate, unindexes the order and releases its
    /// expiry bucket slot.
    fn clear_order(order_id: OrderId, order: &mut OrderOf<T>) {
      if let Some(owner) = order.owner.take() {
        AccountOrders::<T>::remove(&owner, order_id);
      }
      if let Some(delegate) = order.delegate.take() {
        AccountOrders::<T>::remove(&delegate, order_id);
      }
      order.paused = false;
      order.proceeds = 0;
      order.unsold = 0;

      let (pool_id, expiry) = (order.pool_id, order.expiry_block);
      let mut dequeue = false;
      ExpiryBuckets::<T>::mutate_exists(pool_id, expiry, |maybe| {
        let Some(bucket) = maybe.as_mut() else {
          return;
        };
        bucket.open_orders = bucket.open_orders.saturating_sub(1);
        if bucket.open_orders == 0 {
          // Never crossed: the expiry no longer needs a chunk boundary.
          dequeue = bucket.scaled_proceeds_at_expiry.is_none();
          *maybe = None;
        }
      });
      if dequeue {
        PendingExpiries::<T>::mutate(pool_id, |queue| queue.retain(|e| *e != expiry));
      }
    }

    /// Every pool's running sales rate equals the sum of its active,
    /// unexpired orders, and its expiry queue is sorted and ahead of
    /// execution.
    #[cfg(any(test, feature = "try-runtime"))]
    pub fn do_try_state() -> Result<(), DispatchError> {
      for (pool_id, pool) in Pools::<T>::iter() {
        let mut expected = DirectionalPair::<Balance>::default();
        for (_, order) in Orders::<T>::iter() {
          if order.pool_id != pool_id || order.expiry_block <= pool.last_executed_block {
            continue;
          }
          let rate = expected.get_mut(order.direction);
          *rate = rate.saturating_add(order.effective_sales_rate());
        }
        for direction in OrderDirection::BOTH {
          ensure!(
            *expected.get(direction) == pool.order_pools.get(direction).sales_rate,
            "order pool sales rate does not match its active orders"
          );
        }

        let queue = PendingExpiries::<T>::get(pool_id);
        ensure!(
          queue.windows(2).all(|pair| pair[0] < pair[1]),
          "pending expiries are not strictly sorted"
        );
        ensure!(
          queue
            .first()
            .map_or(true, |first| *first > pool.last_executed_block),
          "pending expiry left behind by execution"
        );
      }
      Ok(())
    }
  }

  #[pallet::genesis_config]
  #[derive(frame::prelude::DefaultNoBound)]
  pub struct GenesisConfig<T: Config> {
    #[serde(skip)]
    pub _marker: core::marker::PhantomData<T>,
  }

  #[pallet::genesis_build]
  impl<T: Config> BuildGenesisConfig for GenesisConfig<T> {
    fn build(&self) {
      frame_system::Pallet::<T>::inc_providers(&Pallet::<T>::account_id());
    }
  }
}

/// Both hooks run inside their own storage layer: the catch-up they start
/// with is discarded when the reserve change itself is rejected.
impl<T: Config> ReserveLedger<PoolId, Balance> for Pallet<T> {
  fn deposit_reserves(pool_id: PoolId, amount0: Balance, amount1: Balance) -> DispatchResult {
    with_storage_layer(|| Self::do_deposit_reserves(pool_id, amount0, amount1))
  }

  fn withdraw_reserves(pool_id: PoolId, amount0: Balance, amount1: Balance) -> DispatchResult {
    with_storage_layer(|| Self::do_withdraw_reserves(pool_id, amount0, amount1))
  }

  fn reserves(pool_id: PoolId) -> Option<(Balance, Balance)> {
    Pools::<T>::get(pool_id).map(|pool| pool.reserves)
  }
}

impl<T: Config> Pallet<T> {
  fn do_deposit_reserves(pool_id: PoolId, amount0: Balance, amount1: Balance) -> DispatchResult {
    let mut pool = Self::catch_up(pool_id)?;
    ensure!(!pool.paused, Error::<T>::PoolPaused);
    pool.reserves.0 = pool
      .reserves
      .0
      .checked_add(amount0)
      .ok_or(Error::<T>::ArithmeticOverflow)?;
    pool.reserves.1 = pool
      .reserves
      .1
      .checked_add(amount1)
      .ok_or(Error::<T>::ArithmeticOverflow)?;
    Pools::<T>::insert(pool_id, pool);
    Self::deposit_event(Event::ReservesDeposited {
      pool_id,
      amount0,
      amount1,
    });
    Ok(())
  }

  fn do_withdraw_reserves(pool_id: PoolId, amount0: Balance, amount1: Balance) -> DispatchResult {
    let mut pool = Self::catch_up(pool_id)?;
    pool.reserves.0 = pool
      .reserves
      .0
      .checked_sub(amount0)
      .ok_or(Error::<T>::InsufficientLiquidity)?;
    pool.reserves.1 = pool
      .reserves
      .1
      .checked_sub(amount1)
      .ok_or(Error::<T>::InsufficientLiquidity)?;
    Pools::<T>::insert(pool_id, pool);
    Self::deposit_event(Event::ReservesWithdrawn {
      pool_id,
      amount0,
      amount1,
    });
    Ok(())
  }
}
