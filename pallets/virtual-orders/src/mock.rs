use crate as pallet_virtual_orders;
use frame::prelude::*;
use polkadot_sdk::{
  frame_support::{
    PalletId, construct_runtime,
    traits::{ConstU32, ConstU128, Get},
  },
  frame_system::EnsureRoot,
  sp_runtime::{
    BuildStorage,
    traits::{BlakeTwo256, IdentityLookup},
  },
};
use primitives::AssetKind;

use alloc::vec;
use core::cell::RefCell;

use crate::{CurveKind, OrderVault, PoolId, PoolKind, ReserveLedger, StandardCurves};

type Block = polkadot_sdk::frame_system::mocking::MockBlock<Test>;
pub type AccountId = u64;
pub type Balance = u128;

pub const ALICE: AccountId = 1;
pub const BOB: AccountId = 2;
pub const CHARLIE: AccountId = 3;

pub const TOKEN0: AssetKind = AssetKind::Local(1);
pub const TOKEN1: AssetKind = AssetKind::Local(2);

construct_runtime!(
  pub enum Test {
    System: polkadot_sdk::frame_system,
    Balances: polkadot_sdk::pallet_balances,
    VirtualOrders: pallet_virtual_orders,
  }
);

impl polkadot_sdk::frame_system::Config for Test {
  type BaseCallFilter = polkadot_sdk::frame_support::traits::Everything;
  type BlockWeights = ();
  type BlockLength = ();
  type DbWeight = ();
  type RuntimeOrigin = RuntimeOrigin;
  type RuntimeCall = RuntimeCall;
  type Nonce = u64;
  type Hash = polkadot_sdk::sp_core::H256;
  type Hashing = BlakeTwo256;
  type AccountId = AccountId;
  type Lookup = IdentityLookup<Self::AccountId>;
  type Block = Block;
  type RuntimeEvent = RuntimeEvent;
  type BlockHashCount = polkadot_sdk::frame_support::traits::ConstU64<250>;
  type Version = ();
  type PalletInfo = PalletInfo;
  type AccountData = polkadot_sdk::pallet_balances::AccountData<Balance>;
  type OnNewAccount = ();
  type OnKilledAccount = ();
  type SystemWeightInfo = ();
  type SS58Prefix = ();
  type OnSetCode = ();
  type MaxConsumers = ConstU32<16>;
  type RuntimeTask = ();
  type ExtensionsWeightInfo = ();
  type SingleBlockMigrations = ();
  type MultiBlockMigrator = ();
  type PreInherents = ();
  type PostInherents = ();
  type PostTransactions = ();
}

impl polkadot_sdk::pallet_balances::Config for Test {
  type MaxLocks = ConstU32<50>;
  type MaxReserves = ();
  type ReserveIdentifier = [u8; 8];
  type Balance = Balance;
  type RuntimeEvent = RuntimeEvent;
  type DustRemoval = ();
  type ExistentialDeposit = ConstU128<1>;
  type AccountStore = System;
  type WeightInfo = ();
  type FreezeIdentifier = ();
  type MaxFreezes = ();
  type RuntimeHoldReason = RuntimeHoldReason;
  type RuntimeFreezeReason = RuntimeFreezeReason;
  type DoneSlashHandler = ();
}

pub struct VirtualOrdersPalletId;
impl Get<PalletId> for VirtualOrdersPalletId {
  fn get() -> PalletId {
    PalletId(*primitives::ecosystem::pallet_ids::VIRTUAL_ORDERS_PALLET_ID)
  }
}

thread_local! {
  static LONG_TERM_FEE: RefCell<Permill> = RefCell::new(Permill::zero());

  static MAX_PENDING_EXPIRIES: RefCell<u32> = const { RefCell::new(6) };

  static ASSET_BALANCES: RefCell<alloc::collections::BTreeMap<(AccountId, AssetKind), Balance>> =
    RefCell::new(alloc::collections::BTreeMap::new());
}

/// Fee new pools start with; zero keeps expected amounts exact
pub struct TestLongTermFee;
impl Get<Permill> for TestLongTermFee {
  fn get() -> Permill {
    LONG_TERM_FEE.with(|f| *f.borrow())
  }
}

pub fn set_default_long_term_fee(fee: Permill) {
  LONG_TERM_FEE.with(|f| *f.borrow_mut() = fee);
}

pub struct TestMaxLongTermFee;
impl Get<Permill> for TestMaxLongTermFee {
  fn get() -> Permill {
    Permill::from_percent(5)
  }
}

/// Expiry queue bound; lowering it below `MaxOrderIntervals + 1` breaks
/// the integrity check
pub struct TestMaxPendingExpiries;
impl Get<u32> for TestMaxPendingExpiries {
  fn get() -> u32 {
    MAX_PENDING_EXPIRIES.with(|m| *m.borrow())
  }
}

pub fn set_max_pending_expiries(max: u32) {
  MAX_PENDING_EXPIRIES.with(|m| *m.borrow_mut() = max);
}

pub fn reset_mock_vault() {
  ASSET_BALANCES.with(|b| b.borrow_mut().clear());
  LONG_TERM_FEE.with(|f| *f.borrow_mut() = Permill::zero());
  MAX_PENDING_EXPIRIES.with(|m| *m.borrow_mut() = 6);
}

pub fn set_asset_balance(who: AccountId, asset: AssetKind, amount: Balance) {
  ASSET_BALANCES.with(|b| {
    b.borrow_mut().insert((who, asset), amount);
  });
}

pub fn asset_balance(who: AccountId, asset: AssetKind) -> Balance {
  MockVault::balance(&who, asset)
}

pub struct MockVault;

impl OrderVault<AccountId, AssetKind, Balance> for MockVault {
  fn transfer(
    from: &AccountId,
    to: &AccountId,
    asset: AssetKind,
    amount: Balance,
  ) -> Result<(), DispatchError> {
    match asset {
      AssetKind::Native => {
        use polkadot_sdk::frame_support::traits::Currency;
        <Balances as Currency<AccountId>>::transfer(
          from,
          to,
          amount,
          polkadot_sdk::frame_support::traits::ExistenceRequirement::AllowDeath,
        )
      }
      _ => ASSET_BALANCES.with(|b| {
        let mut map = b.borrow_mut();
        let src = map.get(&(*from, asset)).copied().unwrap_or(0);
        if src < amount {
          return Err(DispatchError::Token(
            polkadot_sdk::sp_runtime::TokenError::FundsUnavailable,
          ));
        }
        map.insert((*from, asset), src - amount);
        let dst = map.get(&(*to, asset)).copied().unwrap_or(0);
        map.insert((*to, asset), dst + amount);
        Ok(())
      }),
    }
  }

  fn balance(who: &AccountId, asset: AssetKind) -> Balance {
    match asset {
      AssetKind::Native => {
        use polkadot_sdk::frame_support::traits::Currency;
        <Balances as Currency<AccountId>>::free_balance(who)
      }
      _ => ASSET_BALANCES.with(|b| b.borrow().get(&(*who, asset)).copied().unwrap_or(0)),
    }
  }
}

#[cfg(feature = "runtime-benchmarks")]
pub struct MockBenchmarkHelper;

#[cfg(feature = "runtime-benchmarks")]
impl crate::BenchmarkHelper<AccountId, AssetKind> for MockBenchmarkHelper {
  fn asset_pair() -> (AssetKind, AssetKind) {
    (TOKEN0, TOKEN1)
  }

  fn fund(who: &AccountId, asset: AssetKind, amount: Balance) -> Result<(), DispatchError> {
    let current = MockVault::balance(who, asset);
    set_asset_balance(*who, asset, current.saturating_add(amount));
    Ok(())
  }
}

impl pallet_virtual_orders::Config for Test {
  type AssetId = AssetKind;
  type Vault = MockVault;
  type Pricing = StandardCurves;
  type AdminOrigin = EnsureRoot<AccountId>;
  type PalletId = VirtualOrdersPalletId;
  type StableOrderInterval = ConstU32<10>;
  type LiquidOrderInterval = ConstU32<20>;
  type VolatileOrderInterval = ConstU32<50>;
  type MaxOrderIntervals = ConstU32<5>;
  type MaxPendingExpiries = TestMaxPendingExpiries;
  type DefaultLongTermFee = TestLongTermFee;
  type MaxLongTermFee = TestMaxLongTermFee;
  type WeightInfo = ();
  #[cfg(feature = "runtime-benchmarks")]
  type BenchmarkHelper = MockBenchmarkHelper;
}

pub const TEST_INITIAL_BALANCE: Balance = 10_000_000_000_000;
pub const TEST_TOKEN_BALANCE: Balance = 1_000_000_000;

pub fn new_test_ext() -> polkadot_sdk::sp_io::TestExternalities {
  let mut t = polkadot_sdk::frame_system::GenesisConfig::<Test>::default()
    .build_storage()
    .unwrap();

  polkadot_sdk::pallet_balances::GenesisConfig::<Test> {
    balances: vec![
      (ALICE, TEST_INITIAL_BALANCE),
      (BOB, TEST_INITIAL_BALANCE),
      (CHARLIE, TEST_INITIAL_BALANCE),
    ],
    dev_accounts: None,
  }
  .assimilate_storage(&mut t)
  .unwrap();

  pallet_virtual_orders::GenesisConfig::<Test>::default()
    .assimilate_storage(&mut t)
    .unwrap();

  let mut ext = polkadot_sdk::sp_io::TestExternalities::new(t);
  ext.execute_with(|| {
    reset_mock_vault();
    for who in [ALICE, BOB, CHARLIE] {
      set_asset_balance(who, TOKEN0, TEST_TOKEN_BALANCE);
      set_asset_balance(who, TOKEN1, TEST_TOKEN_BALANCE);
    }
    System::set_block_number(1);
  });
  ext
}

/// Creates a constant-product pool for (TOKEN0, TOKEN1) and seeds its
/// reserves; the reserve tokens are minted straight into custody.
pub fn create_pool_with_liquidity(kind: PoolKind, reserve0: Balance, reserve1: Balance) -> PoolId {
  create_pool_with_curve(kind, CurveKind::ConstantProduct, reserve0, reserve1)
}

pub fn create_pool_with_curve(
  kind: PoolKind,
  curve: CurveKind,
  reserve0: Balance,
  reserve1: Balance,
) -> PoolId {
  let pool_id = VirtualOrders::next_pool_id();
  VirtualOrders::create_pool(RuntimeOrigin::root(), TOKEN0, TOKEN1, kind, curve).unwrap();
  seed_reserves(pool_id, reserve0, reserve1);
  pool_id
}

pub fn seed_reserves(pool_id: PoolId, amount0: Balance, amount1: Balance) {
  let custody = VirtualOrders::account_id();
  let pool = VirtualOrders::pools(pool_id).unwrap();
  set_asset_balance(
    custody,
    pool.token0,
    asset_balance(custody, pool.token0) + amount0,
  );
  set_asset_balance(
    custody,
    pool.token1,
    asset_balance(custody, pool.token1) + amount1,
  );
  <VirtualOrders as ReserveLedger<PoolId, Balance>>::deposit_reserves(pool_id, amount0, amount1)
    .unwrap();
}

pub fn run_to_block(n: u64) {
  System::set_block_number(n);
}
