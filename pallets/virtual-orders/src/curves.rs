//! Reference pricing primitives
//!
//! `StandardCurves` implements [`PricingPrimitive`] for the two curve kinds a
//! pool may be created with. All intermediate math runs in `U256`; results
//! that do not fit the balance type fail with an arithmetic error instead of
//! saturating.

use crate::{
  adapters::PricingPrimitive,
  types::{Balance, CurveKind, SwapOutcome},
};
use frame::deps::sp_core::U256;
use polkadot_sdk::sp_runtime::{ArithmeticError, DispatchError};

/// Newton iteration cap for the StableSwap solvers
const MAX_ITERATIONS: u32 = 255;

/// Constant product and two-asset StableSwap pricing.
pub struct StandardCurves;

impl PricingPrimitive<Balance> for StandardCurves {
  fn swap(
    curve: CurveKind,
    reserve_in: Balance,
    reserve_out: Balance,
    amount_in: Balance,
  ) -> Result<SwapOutcome, DispatchError> {
    let new_reserve_in = reserve_in
      .checked_add(amount_in)
      .ok_or(ArithmeticError::Overflow)?;

    // A drained side cannot price anything; the input is absorbed.
    if amount_in == 0 || reserve_in == 0 || reserve_out == 0 {
      return Ok(SwapOutcome {
        amount_out: 0,
        reserve_in: new_reserve_in,
        reserve_out,
      });
    }

    let amount_out = match curve {
      CurveKind::ConstantProduct => constant_product_out(reserve_in, reserve_out, amount_in)?,
      CurveKind::Stable { amplification } => {
        stable_swap_out(amplification, reserve_in, reserve_out, amount_in)?
      }
    };

    Ok(SwapOutcome {
      amount_out,
      reserve_in: new_reserve_in,
      reserve_out: reserve_out.saturating_sub(amount_out),
    })
  }
}

/// `out = reserve_out * amount_in / (reserve_in + amount_in)`
pub fn constant_product_out(
  reserve_in: Balance,
  reserve_out: Balance,
  amount_in: Balance,
) -> Result<Balance, DispatchError> {
  let numerator = U256::from(reserve_out)
    .checked_mul(U256::from(amount_in))
    .ok_or(ArithmeticError::Overflow)?;
  let denominator = U256::from(reserve_in).saturating_add(U256::from(amount_in));
  let out = numerator
    .checked_div(denominator)
    .ok_or(ArithmeticError::DivisionByZero)?;
  to_balance(out)
}

/// Output of a two-asset StableSwap trade, rounded down by one unit in the
/// pool's favour.
pub fn stable_swap_out(
  amplification: u32,
  reserve_in: Balance,
  reserve_out: Balance,
  amount_in: Balance,
) -> Result<Balance, DispatchError> {
  if amplification == 0 {
    return Err(DispatchError::Other("StableSwap amplification is zero"));
  }
  // Ann = A * n^n with n = 2
  let ann = U256::from(amplification).saturating_mul(U256::from(4u8));
  let x = U256::from(reserve_in);
  let y = U256::from(reserve_out);

  let d = stable_invariant(x, y, ann)
    .ok_or(DispatchError::Other("StableSwap invariant did not converge"))?;
  let new_x = x.saturating_add(U256::from(amount_in));
  let new_y =
    stable_y(new_x, d, ann).ok_or(DispatchError::Other("StableSwap balance did not converge"))?;

  let out = y.saturating_sub(new_y).saturating_sub(U256::one());
  // Never hand out the whole side.
  let out = out.min(y.saturating_sub(U256::one()));
  to_balance(out)
}

/// Solves `4A(x + y) + D = 4AD + D^3 / (4xy)` for `D`.
fn stable_invariant(x: U256, y: U256, ann: U256) -> Option<U256> {
  let sum = x.checked_add(y)?;
  if sum.is_zero() {
    return Some(U256::zero());
  }
  let two = U256::from(2u8);
  let mut d = sum;
  for _ in 0..MAX_ITERATIONS {
    // D^3 / (4xy), built stepwise to keep intermediates small
    let d_p = d
      .checked_mul(d)?
      .checked_div(x.checked_mul(two)?)?
      .checked_mul(d)?
      .checked_div(y.checked_mul(two)?)?;
    let previous = d;
    let numerator = ann
      .checked_mul(sum)?
      .checked_add(d_p.checked_mul(two)?)?
      .checked_mul(d)?;
    let denominator = ann
      .checked_sub(U256::one())?
      .checked_mul(d)?
      .checked_add(d_p.checked_mul(U256::from(3u8))?)?;
    d = numerator.checked_div(denominator)?;
    if abs_diff(d, previous) <= U256::one() {
      return Some(d);
    }
  }
  None
}

/// Solves the invariant for the out-side balance given the in-side balance.
fn stable_y(x: U256, d: U256, ann: U256) -> Option<U256> {
  let two = U256::from(2u8);
  // c = D^3 / (4 * x * Ann), b = x + D / Ann
  let c = d
    .checked_mul(d)?
    .checked_div(x.checked_mul(two)?)?
    .checked_mul(d)?
    .checked_div(ann.checked_mul(two)?)?;
  let b = x.checked_add(d.checked_div(ann)?)?;
  let mut y = d;
  for _ in 0..MAX_ITERATIONS {
    let previous = y;
    let numerator = y.checked_mul(y)?.checked_add(c)?;
    let denominator = y.checked_mul(two)?.checked_add(b)?.checked_sub(d)?;
    y = numerator.checked_div(denominator)?;
    if abs_diff(y, previous) <= U256::one() {
      return Some(y);
    }
  }
  None
}

fn abs_diff(a: U256, b: U256) -> U256 {
  if a > b { a - b } else { b - a }
}

pub(crate) fn to_balance(value: U256) -> Result<Balance, DispatchError> {
  if value > U256::from(u128::MAX) {
    return Err(ArithmeticError::Overflow.into());
  }
  Ok(value.as_u128())
}

#[cfg(test)]
mod tests {
  use super::*;

  const UNIT: Balance = 1_000_000_000_000;

  #[test]
  fn constant_product_matches_closed_form() {
    let outcome = StandardCurves::swap(CurveKind::ConstantProduct, 1_000, 1_000, 1_000).unwrap();
    assert_eq!(outcome.amount_out, 500);
    assert_eq!(outcome.reserve_in, 2_000);
    assert_eq!(outcome.reserve_out, 500);
  }

  #[test]
  fn constant_product_preserves_k() {
    let (r_in, r_out) = (7_000 * UNIT, 3_000 * UNIT);
    let outcome =
      StandardCurves::swap(CurveKind::ConstantProduct, r_in, r_out, 123 * UNIT).unwrap();
    let k_before = U256::from(r_in) * U256::from(r_out);
    let k_after = U256::from(outcome.reserve_in) * U256::from(outcome.reserve_out);
    assert!(k_after >= k_before);
  }

  #[test]
  fn zero_input_or_empty_side_yields_nothing() {
    let outcome = StandardCurves::swap(CurveKind::ConstantProduct, 1_000, 1_000, 0).unwrap();
    assert_eq!(outcome.amount_out, 0);
    assert_eq!((outcome.reserve_in, outcome.reserve_out), (1_000, 1_000));

    let outcome = StandardCurves::swap(CurveKind::ConstantProduct, 1_000, 0, 50).unwrap();
    assert_eq!(outcome.amount_out, 0);
    assert_eq!((outcome.reserve_in, outcome.reserve_out), (1_050, 0));
  }

  #[test]
  fn stable_curve_beats_constant_product_near_peg() {
    let reserves = 1_000_000 * UNIT;
    let amount_in = 1_000 * UNIT;
    let stable = StandardCurves::swap(
      CurveKind::Stable { amplification: 100 },
      reserves,
      reserves,
      amount_in,
    )
    .unwrap();
    let product =
      StandardCurves::swap(CurveKind::ConstantProduct, reserves, reserves, amount_in).unwrap();

    assert!(stable.amount_out > product.amount_out);
    assert!(stable.amount_out < amount_in);
    assert_eq!(stable.reserve_out, reserves - stable.amount_out);
  }

  #[test]
  fn stable_invariant_of_balanced_pool_is_sum() {
    let x = U256::from(500 * UNIT);
    let d = stable_invariant(x, x, U256::from(400u32)).unwrap();
    assert!(abs_diff(d, x * 2) <= U256::one());
  }

  #[test]
  fn stable_curve_never_drains_out_side() {
    let outcome = StandardCurves::swap(
      CurveKind::Stable { amplification: 10 },
      1_000 * UNIT,
      1_000 * UNIT,
      1_000_000 * UNIT,
    )
    .unwrap();
    assert!(outcome.amount_out < 1_000 * UNIT);
    assert!(outcome.reserve_out > 0);
  }

  #[test]
  fn zero_amplification_is_rejected() {
    assert!(StandardCurves::swap(CurveKind::Stable { amplification: 0 }, 10, 10, 1).is_err());
  }
}
