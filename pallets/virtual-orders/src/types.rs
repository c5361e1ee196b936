use codec::{Decode, DecodeWithMemTracking, Encode, MaxEncodedLen};
use frame::deps::sp_core::U256;
use polkadot_sdk::sp_runtime::Permill;
use scale_info::{TypeInfo, prelude::vec::Vec};

pub use primitives::Balance;

/// Monotonic order identifier, never reused
pub type OrderId = u64;

/// Pool identifier
pub type PoolId = u32;

/// Trade direction of a long-term order
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  PartialEq,
  TypeInfo,
  MaxEncodedLen,
)]
pub enum OrderDirection {
  /// Sells token0, buys token1
  Token0To1,
  /// Sells token1, buys token0
  Token1To0,
}

impl OrderDirection {
  pub const BOTH: [OrderDirection; 2] = [OrderDirection::Token0To1, OrderDirection::Token1To0];

  pub fn opposite(self) -> Self {
    match self {
      OrderDirection::Token0To1 => OrderDirection::Token1To0,
      OrderDirection::Token1To0 => OrderDirection::Token0To1,
    }
  }
}

/// A value held once per trade direction
#[derive(
  Clone,
  Copy,
  Debug,
  Default,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  PartialEq,
  TypeInfo,
  MaxEncodedLen,
)]
pub struct DirectionalPair<V> {
  pub token0_to_1: V,
  pub token1_to_0: V,
}

impl<V> DirectionalPair<V> {
  pub fn new(token0_to_1: V, token1_to_0: V) -> Self {
    Self {
      token0_to_1,
      token1_to_0,
    }
  }

  pub fn get(&self, direction: OrderDirection) -> &V {
    match direction {
      OrderDirection::Token0To1 => &self.token0_to_1,
      OrderDirection::Token1To0 => &self.token1_to_0,
    }
  }

  pub fn get_mut(&mut self, direction: OrderDirection) -> &mut V {
    match direction {
      OrderDirection::Token0To1 => &mut self.token0_to_1,
      OrderDirection::Token1To0 => &mut self.token1_to_0,
    }
  }
}

/// Volatility class of a pool; selects the order block interval
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  PartialEq,
  TypeInfo,
  MaxEncodedLen,
)]
pub enum PoolKind {
  Stable,
  Liquid,
  Volatile,
}

/// Pricing curve used by the pool's pricing primitive
#[derive(
  Clone,
  Copy,
  Debug,
  Decode,
  DecodeWithMemTracking,
  Encode,
  Eq,
  PartialEq,
  TypeInfo,
  MaxEncodedLen,
)]
pub enum CurveKind {
  /// x * y = k
  ConstantProduct,
  /// Two-asset StableSwap invariant with amplification `A`
  Stable { amplification: u32 },
}

/// Aggregate of all active orders selling in one direction
#[derive(Clone, Copy, Debug, Default, Decode, Encode, Eq, PartialEq, TypeInfo, MaxEncodedLen)]
pub struct OrderPool {
  /// Sum of sales rates of active, unexpired orders
  pub sales_rate: Balance,
  /// Output earned per unit of sales rate, scaled by `PROCEEDS_SCALE`
  pub scaled_proceeds: U256,
}

/// Orders sharing one expiry block
#[derive(Clone, Copy, Debug, Default, Decode, Encode, Eq, PartialEq, TypeInfo, MaxEncodedLen)]
pub struct ExpiryBucket {
  /// Active sales rate leaving the order pools at this block
  pub ending_sales_rate: DirectionalPair<Balance>,
  /// Uncleared orders (active or paused) expiring at this block
  pub open_orders: u32,
  /// Accumulator values recorded when execution crossed the boundary
  pub scaled_proceeds_at_expiry: Option<DirectionalPair<U256>>,
}

/// Pool state owned by the virtual order engine
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq, TypeInfo, MaxEncodedLen)]
pub struct PoolInfo<AssetId, BlockNumber> {
  pub token0: AssetId,
  pub token1: AssetId,
  pub kind: PoolKind,
  pub curve: CurveKind,
  /// Block distance between consecutive expiry boundaries
  pub order_interval: u32,
  pub reserves: (Balance, Balance),
  pub last_executed_block: BlockNumber,
  pub order_pools: DirectionalPair<OrderPool>,
  pub long_term_fee: Permill,
  pub paused: bool,
}

impl<AssetId: Copy, BlockNumber> PoolInfo<AssetId, BlockNumber> {
  /// Token an order in `direction` deposits and sells
  pub fn sell_asset(&self, direction: OrderDirection) -> AssetId {
    match direction {
      OrderDirection::Token0To1 => self.token0,
      OrderDirection::Token1To0 => self.token1,
    }
  }

  /// Token an order in `direction` receives as proceeds
  pub fn buy_asset(&self, direction: OrderDirection) -> AssetId {
    self.sell_asset(direction.opposite())
  }

  pub fn scaled_proceeds(&self) -> DirectionalPair<U256> {
    DirectionalPair::new(
      self.order_pools.token0_to_1.scaled_proceeds,
      self.order_pools.token1_to_0.scaled_proceeds,
    )
  }

  pub fn has_liquidity(&self) -> bool {
    self.reserves.0 > 0 && self.reserves.1 > 0
  }
}

/// Caller's relationship to an order
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Authority {
  /// Full control, may direct funds anywhere
  Owner,
  /// May act on the order but only pay out to the owner
  Delegate,
}

/// A long-term order record. Cleared orders keep their slot with
/// `owner` and `delegate` set to `None`.
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq, TypeInfo, MaxEncodedLen)]
pub struct LongTermOrder<AccountId, BlockNumber> {
  pub pool_id: PoolId,
  pub owner: Option<AccountId>,
  pub delegate: Option<AccountId>,
  pub direction: OrderDirection,
  /// Input released per block while active, fixed at creation
  pub sales_rate: Balance,
  pub created_at: BlockNumber,
  pub expiry_block: BlockNumber,
  pub paused: bool,
  /// Output credited and not yet withdrawn
  pub proceeds: Balance,
  /// Input not yet sold as of `checkpoint_block`
  pub unsold: Balance,
  pub checkpoint_block: BlockNumber,
  pub scaled_proceeds_checkpoint: U256,
}

impl<AccountId: PartialEq, BlockNumber: PartialOrd> LongTermOrder<AccountId, BlockNumber> {
  pub fn is_cleared(&self) -> bool {
    self.owner.is_none()
  }

  pub fn is_expired(&self, now: BlockNumber) -> bool {
    now >= self.expiry_block
  }

  /// Rate the order contributes to its order pool right now
  pub fn effective_sales_rate(&self) -> Balance {
    if self.paused || self.is_cleared() {
      0
    } else {
      self.sales_rate
    }
  }

  pub fn authority_of(&self, who: &AccountId) -> Option<Authority> {
    if self.owner.as_ref() == Some(who) {
      Some(Authority::Owner)
    } else if self.delegate.as_ref() == Some(who) {
      Some(Authority::Delegate)
    } else {
      None
    }
  }
}

/// Read-only projection of an order at the current block
#[derive(Clone, Debug, Decode, Encode, Eq, PartialEq, TypeInfo)]
pub struct OrderView<AccountId, BlockNumber> {
  pub order_id: OrderId,
  pub pool_id: PoolId,
  pub owner: Option<AccountId>,
  pub delegate: Option<AccountId>,
  pub direction: OrderDirection,
  pub paused: bool,
  pub expired: bool,
  pub sales_rate: Balance,
  pub effective_sales_rate: Balance,
  pub created_at: BlockNumber,
  pub expiry_block: BlockNumber,
  pub proceeds: Balance,
  pub unsold: Balance,
}

/// One page of `get_order_ids`
#[derive(Clone, Debug, Default, Decode, Encode, Eq, PartialEq, TypeInfo)]
pub struct OrderIdsPage {
  pub ids: Vec<OrderId>,
  /// Number of ids in this page
  pub num_results: u32,
  /// Number of ids indexed for the account
  pub total_results: u32,
}

/// Result of one pricing primitive call
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SwapOutcome {
  pub amount_out: Balance,
  pub reserve_in: Balance,
  pub reserve_out: Balance,
}
