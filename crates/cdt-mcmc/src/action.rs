//! Discretised bulk action in 256-bit floating point.
//!
//! The count terms are large and of opposite sign, so every sum is formed in
//! [`BigFloat`] and only the final value is rounded to `f64`.

use astro_float::{BigFloat, Consts, RoundingMode};
use cdt_core::errors::CdtError;
use cdt_core::Couplings;
use cdt_foliation::Geometry3;
use serde::{Deserialize, Serialize};

use crate::errors::precision_error;
use crate::moves::MoveDelta;

/// Working precision in bits.
pub const PRECISION: usize = 256;

const RM: RoundingMode = RoundingMode::ToEven;

/// The three counts the action depends on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCounts {
    /// Timelike edges.
    pub n1_tl: u64,
    /// (3,1) plus (1,3) cells.
    pub n3_31_13: u64,
    /// (2,2) cells.
    pub n3_22: u64,
}

impl ActionCounts {
    /// Reads the counts from a geometry snapshot.
    pub fn from_geometry(geometry: &Geometry3) -> Self {
        Self {
            n1_tl: geometry.n1_tl as u64,
            n3_31_13: geometry.n3_31_13 as u64,
            n3_22: geometry.n3_22 as u64,
        }
    }

    /// Counts after applying `delta`, saturating at zero.
    pub fn after(&self, delta: &MoveDelta) -> Self {
        let shift = |count: u64, change: i64| {
            if change < 0 {
                count.saturating_sub(change.unsigned_abs())
            } else {
                count.saturating_add(change as u64)
            }
        };
        Self {
            n1_tl: shift(self.n1_tl, delta.n1_tl),
            n3_31_13: shift(self.n3_31_13, delta.n3_31_13),
            n3_22: shift(self.n3_22, delta.n3_22),
        }
    }
}

/// Closed form at α = −1.
pub fn bulk_action_alpha_minus_one(
    n1_tl: u64,
    n3_31_13: u64,
    n3_22: u64,
    k: f64,
    lambda: f64,
) -> Result<f64, CdtError> {
    let mut cc = constants()?;
    to_f64(&alpha_minus_one(&mut cc, &ActionCounts { n1_tl, n3_31_13, n3_22 }, k, lambda))
}

/// Closed form at α = +1.
pub fn bulk_action_alpha_one(
    n1_tl: u64,
    n3_31_13: u64,
    n3_22: u64,
    k: f64,
    lambda: f64,
) -> Result<f64, CdtError> {
    let mut cc = constants()?;
    to_f64(&alpha_one(&mut cc, &ActionCounts { n1_tl, n3_31_13, n3_22 }, k, lambda))
}

/// General form, defined for α > 0.
pub fn bulk_action(
    n1_tl: u64,
    n3_31_13: u64,
    n3_22: u64,
    alpha: f64,
    k: f64,
    lambda: f64,
) -> Result<f64, CdtError> {
    let mut cc = constants()?;
    to_f64(&general(
        &mut cc,
        &ActionCounts { n1_tl, n3_31_13, n3_22 },
        alpha,
        k,
        lambda,
    ))
}

/// Action of `counts` under `couplings`, using the α = −1 closed form when it applies.
pub fn action(counts: &ActionCounts, couplings: &Couplings) -> Result<f64, CdtError> {
    let mut cc = constants()?;
    to_f64(&dispatch(&mut cc, counts, couplings))
}

/// `S(current) - S(proposed)`, with the subtraction performed before rounding.
pub fn action_difference(
    current: &ActionCounts,
    proposed: &ActionCounts,
    couplings: &Couplings,
) -> Result<f64, CdtError> {
    let mut cc = constants()?;
    let before = dispatch(&mut cc, current, couplings);
    let after = dispatch(&mut cc, proposed, couplings);
    to_f64(&before.sub(&after, PRECISION, RM))
}

fn constants() -> Result<Consts, CdtError> {
    Consts::new().map_err(|err| precision_error("constants-init", format!("{err:?}")))
}

fn dispatch(cc: &mut Consts, counts: &ActionCounts, couplings: &Couplings) -> BigFloat {
    if couplings.alpha == -1.0 {
        alpha_minus_one(cc, counts, couplings.k, couplings.lambda)
    } else {
        general(cc, counts, couplings.alpha, couplings.k, couplings.lambda)
    }
}

fn alpha_minus_one(cc: &mut Consts, counts: &ActionCounts, k: f64, lambda: f64) -> BigFloat {
    let k = float(k);
    let lambda = float(lambda);
    let two_pi_k = float(2.0).mul(&cc.pi(PRECISION, RM), PRECISION, RM).mul(&k, PRECISION, RM);
    let tl = neg(&two_pi_k);
    let w31 = linear(&ratio(2673, 1000), &k, &ratio(118, 1000), &lambda);
    let w22 = linear(&ratio(7386, 1000), &k, &ratio(118, 1000), &lambda);
    weighted_sum(counts, &tl, &w31, &w22)
}

fn alpha_one(cc: &mut Consts, counts: &ActionCounts, k: f64, lambda: f64) -> BigFloat {
    let k = float(k);
    let lambda = float(lambda);
    let tl = float(2.0).mul(&cc.pi(PRECISION, RM), PRECISION, RM).mul(&k, PRECISION, RM);
    let w31 = linear(&ratio(-3548, 1000), &k, &ratio(-167, 1000), &lambda);
    let w22 = linear(&ratio(-5355, 1000), &k, &ratio(-204, 1000), &lambda);
    weighted_sum(counts, &tl, &w31, &w22)
}

fn general(cc: &mut Consts, counts: &ActionCounts, alpha: f64, k: f64, lambda: f64) -> BigFloat {
    let a = float(alpha);
    let k = float(k);
    let lambda_twelfth = float(lambda).div(&float(12.0), PRECISION, RM);
    let sqrt_a = a.sqrt(PRECISION, RM);
    let four_a_one = scale_add(&a, 4.0, 1.0);
    let pi = cc.pi(PRECISION, RM);

    let tl = float(2.0)
        .mul(&pi, PRECISION, RM)
        .mul(&k, PRECISION, RM)
        .mul(&sqrt_a, PRECISION, RM);

    // (3,1) and (1,3)
    let asinh_arg = one().div(
        &float(3.0)
            .sqrt(PRECISION, RM)
            .mul(&four_a_one.sqrt(PRECISION, RM), PRECISION, RM),
        PRECISION,
        RM,
    );
    let acos_arg = scale_add(&a, 2.0, 1.0).div(&four_a_one, PRECISION, RM);
    let w31 = neg(&float(3.0).mul(&k, PRECISION, RM).mul(
        &asinh_arg.asinh(PRECISION, RM, cc),
        PRECISION,
        RM,
    ))
    .sub(
        &float(3.0)
            .mul(&k, PRECISION, RM)
            .mul(&sqrt_a, PRECISION, RM)
            .mul(&acos_arg.acos(PRECISION, RM, cc), PRECISION, RM),
        PRECISION,
        RM,
    )
    .sub(
        &lambda_twelfth.mul(&scale_add(&a, 3.0, 1.0).sqrt(PRECISION, RM), PRECISION, RM),
        PRECISION,
        RM,
    );

    // (2,2)
    let asinh_arg = float(2.0)
        .mul(&float(2.0).sqrt(PRECISION, RM), PRECISION, RM)
        .mul(&scale_add(&a, 2.0, 1.0).sqrt(PRECISION, RM), PRECISION, RM)
        .div(&four_a_one, PRECISION, RM);
    let acos_arg = neg(&one().div(&four_a_one, PRECISION, RM));
    let w22 = float(2.0)
        .mul(&k, PRECISION, RM)
        .mul(&asinh_arg.asinh(PRECISION, RM, cc), PRECISION, RM)
        .sub(
            &float(4.0)
                .mul(&k, PRECISION, RM)
                .mul(&sqrt_a, PRECISION, RM)
                .mul(&acos_arg.acos(PRECISION, RM, cc), PRECISION, RM),
            PRECISION,
            RM,
        )
        .sub(
            &lambda_twelfth.mul(&scale_add(&a, 4.0, 2.0).sqrt(PRECISION, RM), PRECISION, RM),
            PRECISION,
            RM,
        );

    weighted_sum(counts, &tl, &w31, &w22)
}

fn weighted_sum(counts: &ActionCounts, tl: &BigFloat, w31: &BigFloat, w22: &BigFloat) -> BigFloat {
    BigFloat::from_u64(counts.n1_tl, PRECISION)
        .mul(tl, PRECISION, RM)
        .add(
            &BigFloat::from_u64(counts.n3_31_13, PRECISION).mul(w31, PRECISION, RM),
            PRECISION,
            RM,
        )
        .add(
            &BigFloat::from_u64(counts.n3_22, PRECISION).mul(w22, PRECISION, RM),
            PRECISION,
            RM,
        )
}

/// `a·k + b·lambda`
fn linear(a: &BigFloat, k: &BigFloat, b: &BigFloat, lambda: &BigFloat) -> BigFloat {
    a.mul(k, PRECISION, RM)
        .add(&b.mul(lambda, PRECISION, RM), PRECISION, RM)
}

/// `factor·x + offset`
fn scale_add(x: &BigFloat, factor: f64, offset: f64) -> BigFloat {
    float(factor)
        .mul(x, PRECISION, RM)
        .add(&float(offset), PRECISION, RM)
}

fn ratio(numerator: i64, denominator: u64) -> BigFloat {
    BigFloat::from_i64(numerator, PRECISION).div(
        &BigFloat::from_u64(denominator, PRECISION),
        PRECISION,
        RM,
    )
}

fn float(value: f64) -> BigFloat {
    BigFloat::from_f64(value, PRECISION)
}

fn one() -> BigFloat {
    float(1.0)
}

fn neg(value: &BigFloat) -> BigFloat {
    float(0.0).sub(value, PRECISION, RM)
}

fn to_f64(value: &BigFloat) -> Result<f64, CdtError> {
    if value.is_nan() {
        return Err(precision_error("nan", "action evaluated to NaN"));
    }
    if value.is_inf() {
        return Err(precision_error("infinite", "action evaluated to infinity"));
    }
    let rendered = value.to_string();
    let parsed: f64 = rendered
        .parse()
        .map_err(|_| precision_error("conversion", format!("cannot read back {rendered}")))?;
    if !parsed.is_finite() {
        return Err(precision_error("overflow", "action does not fit in f64"));
    }
    Ok(parsed)
}
